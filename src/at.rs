//! Raw AT transaction engine.
//!
//! One transaction is: write `command` + CRLF, then collect whatever bytes the
//! modem produces inside a bounded reply window. The engine never interprets
//! the bytes; classification belongs to the caller, which is what lets every
//! AT concern this crate does not model run through [`execute`].
//!
//! [`execute`]: AtChannel::execute

use embassy_time::{with_timeout, Duration, Instant};
use heapless::Vec;

use crate::config::Transport;
use crate::error::Error;
use crate::fmt::LossyStr;

/// Capacity of one reply window.
pub const MAX_REPLY_LEN: usize = 1536;

/// One transaction's raw reply: whatever arrived before the window closed,
/// unmodified. An empty reply is the normal shape of a timeout, not an error.
pub struct RawReply {
    buf: Vec<u8, MAX_REPLY_LEN>,
}

impl RawReply {
    pub(crate) const fn new() -> Self {
        RawReply { buf: Vec::new() }
    }

    #[cfg(test)]
    pub(crate) fn from_slice(bytes: &[u8]) -> Self {
        RawReply {
            buf: Vec::from_slice(bytes).unwrap(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// True when `token` occurs anywhere in the reply.
    pub fn contains(&self, token: &str) -> bool {
        let pat = token.as_bytes();
        !pat.is_empty() && self.buf.windows(pat.len()).any(|w| w == pat)
    }

    /// True when the modem acknowledged the command with its success token.
    pub fn is_success(&self) -> bool {
        self.contains(crate::command::OK_TOKEN)
    }
}

impl core::fmt::Debug for RawReply {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(&LossyStr(&self.buf), f)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for RawReply {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", LossyStr(&self.buf));
    }
}

/// The serial side of the driver: owns the transport and runs one transaction
/// at a time over it.
pub(crate) struct AtChannel<T: Transport> {
    transport: T,
}

impl<T: Transport> AtChannel<T> {
    pub fn new(transport: T) -> Self {
        AtChannel { transport }
    }

    pub fn release(self) -> T {
        self.transport
    }

    /// Sends `command` + CRLF, then collects the reply window.
    pub async fn execute(&mut self, command: &str, timeout: Duration) -> Result<RawReply, Error> {
        trace!("Sending command: {:?}", LossyStr(command.as_bytes()));
        self.transport
            .write_all(command.as_bytes())
            .await
            .map_err(Error::transport)?;
        self.transport
            .write_all(b"\r\n")
            .await
            .map_err(Error::transport)?;
        self.collect(timeout).await
    }

    /// Collects a reply window without sending anything first; also used to
    /// drain trailing status lines after payload phases.
    pub async fn collect(&mut self, timeout: Duration) -> Result<RawReply, Error> {
        let mut reply = RawReply::new();
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; 128];
        loop {
            let space = MAX_REPLY_LEN - reply.buf.len();
            if space == 0 {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let len = space.min(chunk.len());
            match with_timeout(deadline - now, self.transport.read(&mut chunk[..len])).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => unwrap!(reply.buf.extend_from_slice(&chunk[..n])),
                Ok(Err(e)) => return Err(Error::transport(e)),
                Err(_) => break,
            }
        }
        if !reply.is_empty() {
            trace!("Received reply: {:?}", LossyStr(reply.as_bytes()));
        }
        Ok(reply)
    }

    /// Writes payload bytes as-is, bypassing line framing.
    pub async fn write_raw(&mut self, buf: &[u8]) -> Result<(), Error> {
        trace!("Sending {} raw payload bytes", buf.len());
        self.transport.write_all(buf).await.map_err(Error::transport)
    }

    /// Waits until the transport has drained its transmit path.
    pub async fn flush(&mut self) -> Result<(), Error> {
        self.transport.flush().await.map_err(Error::transport)
    }

    /// Bytes the transport holds right now, readable without blocking.
    pub fn buffered(&mut self) -> usize {
        self.transport.buffered()
    }

    /// Reads one byte; meant to be called once `buffered()` reports data.
    pub async fn read_byte(&mut self) -> Result<u8, Error> {
        let mut byte = [0u8; 1];
        let n = self
            .transport
            .read(&mut byte)
            .await
            .map_err(Error::transport)?;
        if n == 0 {
            return Err(Error::Transport(embedded_io_async::ErrorKind::BrokenPipe));
        }
        Ok(byte[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockTransport;
    use embedded_io_async::ErrorKind;

    fn short(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn classification_is_substring_based() {
        assert!(RawReply::from_slice(b"\r\nOK\r\n").is_success());
        assert!(RawReply::from_slice(b"garbage OK garbage").is_success());
        assert!(!RawReply::from_slice(b"\r\nERROR\r\n").is_success());
        assert!(!RawReply::from_slice(b"").is_success());
        assert!(RawReply::from_slice(b"+CIPOPEN: 1,0").contains("+CIPOPEN:"));
        assert!(!RawReply::from_slice(b"+CIPOPEN: 1,0").contains("+CIPSEND:"));
    }

    #[tokio::test]
    async fn execute_appends_line_terminator() {
        let (transport, handle) = MockTransport::new();
        handle.expect("ATI", b"\r\nA7670E\r\n\r\nOK\r\n");
        let mut at = AtChannel::new(transport);

        let reply = at.execute("ATI", short(20)).await.unwrap();

        assert!(reply.is_success());
        assert_eq!(handle.writes(), [b"ATI".to_vec(), b"\r\n".to_vec()]);
    }

    #[tokio::test]
    async fn empty_window_is_a_normal_outcome() {
        let (transport, _handle) = MockTransport::new();
        let mut at = AtChannel::new(transport);

        let reply = at.execute("AT", short(20)).await.unwrap();

        assert!(reply.is_empty());
        assert!(!reply.is_success());
    }

    #[tokio::test]
    async fn reply_window_stops_at_capacity() {
        let (transport, handle) = MockTransport::new();
        let oversized = vec![b'x'; MAX_REPLY_LEN + 400];
        handle.expect("AT+BIG", &oversized);
        let mut at = AtChannel::new(transport);

        let reply = at.execute("AT+BIG", short(50)).await.unwrap();

        assert_eq!(reply.len(), MAX_REPLY_LEN);
    }

    #[tokio::test]
    async fn write_failure_surfaces_as_transport_error() {
        let (transport, handle) = MockTransport::new();
        handle.fail_next_write(ErrorKind::Other);
        let mut at = AtChannel::new(transport);

        let result = at.execute("AT", short(20)).await;

        assert_eq!(result.unwrap_err(), Error::Transport(ErrorKind::Other));
    }
}
