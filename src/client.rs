//! Multiplexed socket operations on top of the AT transaction engine.
//!
//! [`A76xxClient`] owns the transport, the engine and the slot table, and
//! every operation takes `&mut self`, so one client can never interleave two
//! AT transactions. Cross-task sharing goes through
//! [`SharedA76xx`](crate::SharedA76xx) instead.
//!
//! Timeouts, missing reply lines and unallocated-slot use are ordinary
//! protocol outcomes and come back as `Ok(false)` / `Ok(0)`; `Err` always
//! means the serial link itself failed (or a command overflowed its buffer).

use embassy_time::{Duration, Instant, Timer};

use crate::at::{AtChannel, RawReply};
use crate::command::{tcpip, DATA_PROMPT};
use crate::config::{Config, Transport};
use crate::error::Error;
use crate::parser;
use crate::socket::{SocketSet, SocketState, MUX_COUNT};

/// Driver handle for one SIMCom A76xx modem.
pub struct A76xxClient<T: Transport> {
    pub(crate) at: AtChannel<T>,
    pub(crate) sockets: SocketSet,
    pub(crate) config: Config,
}

impl<T: Transport> A76xxClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, Config::new())
    }

    pub fn with_config(transport: T, config: Config) -> Self {
        A76xxClient {
            at: AtChannel::new(transport),
            sockets: SocketSet::new(config.receive_timeout),
            config,
        }
    }

    /// Tears the driver down and hands the transport back.
    pub fn release(self) -> T {
        self.at.release()
    }

    /// Runs one raw AT transaction.
    ///
    /// This is the escape hatch for every modem concern the socket layer does
    /// not model (SIM, registration, GNSS, SMS, power): send any command,
    /// classify and parse the reply with [`RawReply`] and [`parser`].
    pub async fn execute(&mut self, command: &str, timeout: Duration) -> Result<RawReply, Error> {
        self.at.execute(command, timeout).await
    }

    /// Opens a TCP connection on channel `mux`.
    ///
    /// Manual receive mode is (re-)enabled first, then `AT+CIPOPEN` is given
    /// `timeout` to come back with a matching zero-result `+CIPOPEN:` line.
    /// The firmware this targets has no workable TLS, so `secure` only logs a
    /// warning and proceeds over plain TCP.
    ///
    /// `Ok(false)` covers every refusal shape: rejected receive mode, plain
    /// `OK` without a result line, result for another channel, nonzero result
    /// code, or a silent window. A failed reconnect of a previously allocated
    /// slot leaves it `Closed`; a fresh slot falls back to `Unallocated`.
    pub async fn connect(
        &mut self,
        mux: u8,
        host: &str,
        port: u16,
        secure: bool,
        timeout: Duration,
    ) -> Result<bool, Error> {
        let Some(slot) = self.sockets.get_mut(mux) else {
            return Ok(false);
        };
        if secure {
            warn!("Channel {}: TLS is not supported, using plain TCP", mux);
        }
        let previous = slot.state;
        slot.state = SocketState::Connecting;
        debug!("Connecting channel {} to {}:{}", mux, host, port);

        match self.open_plain(mux, host, port, timeout).await {
            Ok(true) => {
                let slot = unwrap!(self.sockets.get_mut(mux));
                slot.reset();
                slot.state = SocketState::Connected;
                Ok(true)
            }
            outcome => {
                let slot = unwrap!(self.sockets.get_mut(mux));
                slot.state = match previous {
                    SocketState::Unallocated | SocketState::Closed => previous,
                    _ => SocketState::Closed,
                };
                outcome
            }
        }
    }

    async fn open_plain(
        &mut self,
        mux: u8,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<bool, Error> {
        let command_timeout = self.config.command_timeout;
        let reply = self.at.execute(tcpip::MANUAL_RX_MODE, command_timeout).await?;
        if !reply.is_success() {
            warn!("Manual receive mode was not acknowledged");
            return Ok(false);
        }
        let command = tcpip::open(mux, host, port)?;
        let reply = self.at.execute(command.as_str(), timeout).await?;
        if !reply.contains(tcpip::OPEN_RESULT) {
            return Ok(false);
        }
        match parse_open_result(reply.as_bytes()) {
            Some((id, 0)) if id == i32::from(mux) => Ok(true),
            _ => Ok(false),
        }
    }

    /// Sends `data` on channel `mux` and returns the byte count the modem
    /// confirmed, which can be less than `data.len()`.
    ///
    /// An empty buffer or an unallocated slot returns `Ok(0)` without
    /// touching the transport. A missing `>` prompt aborts before any payload
    /// byte is written; a missing or garbled `+CIPSEND:` confirmation counts
    /// as zero.
    pub async fn send(&mut self, mux: u8, data: &[u8]) -> Result<usize, Error> {
        if data.is_empty() || self.sockets.allocated_mut(mux).is_none() {
            return Ok(0);
        }
        let timeout = self.config.command_timeout;
        debug!("Channel {}: sending {} bytes", mux, data.len());
        let request = tcpip::send_request(mux, data.len());
        let reply = self.at.execute(request.as_str(), timeout).await?;
        if !reply.contains(DATA_PROMPT) {
            warn!("Channel {}: no data prompt for a {} byte send", mux, data.len());
            return Ok(0);
        }
        self.at.write_raw(data).await?;
        self.at.flush().await?;
        let confirm = self.at.collect(timeout).await?;
        if !confirm.contains(tcpip::SEND_RESULT) {
            return Ok(0);
        }
        let sent = parse_send_result(confirm.as_bytes())
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        Ok(sent)
    }

    /// Asks the modem for up to `size` buffered bytes on channel `mux` and
    /// stages whatever arrives into the slot's ring buffer.
    ///
    /// The modem answers `AT+CIPRXGET=3` with how many bytes it will deliver
    /// and how many remain buffered on its side. Payload bytes are then taken
    /// one at a time: each byte gets the slot's `receive_timeout`, polled at
    /// `poll_interval`, and a byte that never shows up is skipped. The return
    /// value is the delivery count the modem announced, not the count
    /// captured; [`buffered_len`](Self::buffered_len) tells them apart.
    pub async fn read(&mut self, mux: u8, size: usize) -> Result<usize, Error> {
        if size == 0 {
            return Ok(0);
        }
        let Some(slot) = self.sockets.allocated_mut(mux) else {
            return Ok(0);
        };
        let receive_timeout = slot.receive_timeout;
        let command_timeout = self.config.command_timeout;
        let poll_interval = self.config.poll_interval;

        let request = tcpip::read_chunk(mux, size);
        let reply = self.at.execute(request.as_str(), command_timeout).await?;
        if !reply.contains(tcpip::RXGET_RESULT) {
            return Ok(0);
        }
        let Some((to_read, remaining)) = parse_read_lengths(reply.as_bytes()) else {
            return Ok(0);
        };
        let to_read = usize::try_from(to_read).unwrap_or(0);

        let mut captured = 0usize;
        'bytes: for _ in 0..to_read {
            let deadline = Instant::now() + receive_timeout;
            while self.at.buffered() == 0 {
                if Instant::now() >= deadline {
                    // Byte never arrived; move on to the next one.
                    continue 'bytes;
                }
                Timer::after(poll_interval).await;
            }
            let byte = self.at.read_byte().await?;
            unwrap!(self.sockets.get_mut(mux)).rx.push(byte);
            captured += 1;
        }
        if captured < to_read {
            warn!(
                "Channel {}: modem announced {} bytes, captured {}",
                mux, to_read, captured
            );
        }
        unwrap!(self.sockets.get_mut(mux)).available = usize::try_from(remaining).unwrap_or(0);
        self.at.collect(command_timeout).await?;
        Ok(to_read)
    }

    /// Queries `AT+CIPCLOSE?` and refreshes the link state of every allocated
    /// slot from the per-channel state list, then reports channel `mux`.
    ///
    /// A list shorter than the slot table updates only the channels it covers.
    pub async fn get_connected(&mut self, mux: u8) -> Result<bool, Error> {
        if self.sockets.allocated_mut(mux).is_none() {
            return Ok(false);
        }
        let timeout = self.config.command_timeout;
        let reply = self.at.execute(tcpip::CONNECTION_STATES, timeout).await?;
        if !reply.contains(tcpip::CLOSE_STATES) {
            return Ok(false);
        }
        let bytes = reply.as_bytes();
        let mut cursor = parser::find_field(bytes, tcpip::CLOSE_STATES);
        for id in 0..MUX_COUNT as u8 {
            let Some(at) = cursor else { break };
            let Some((state, next)) = parser::next_int(bytes, at) else { break };
            if let Some(slot) = self.sockets.allocated_mut(id) {
                slot.state = if state != 0 {
                    SocketState::Connected
                } else {
                    SocketState::Disconnected
                };
            }
            cursor = parser::skip_fields(bytes, next, 1);
        }
        self.at.collect(timeout).await?;
        Ok(self.sockets.get(mux).is_some_and(|s| s.is_connected()))
    }

    /// Asks how many bytes the modem holds for channel `mux` and caches the
    /// answer on the slot.
    ///
    /// A zero answer (including a missing or garbled reply) additionally runs
    /// a [`get_connected`](Self::get_connected) pass so that "no data" and
    /// "link gone" stay distinguishable through [`state`](Self::state).
    pub async fn get_available(&mut self, mux: u8) -> Result<usize, Error> {
        if self.sockets.allocated_mut(mux).is_none() {
            return Ok(0);
        }
        let timeout = self.config.command_timeout;
        let request = tcpip::query_available(mux);
        let reply = self.at.execute(request.as_str(), timeout).await?;
        let mut count = 0usize;
        if reply.contains(tcpip::RXGET_RESULT) {
            count = parse_available(reply.as_bytes())
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(0);
            unwrap!(self.sockets.get_mut(mux)).available = count;
            self.at.collect(timeout).await?;
        }
        if count == 0 {
            let connected = self.get_connected(mux).await?;
            if let Some(slot) = self.sockets.allocated_mut(mux) {
                slot.state = if connected {
                    SocketState::Connected
                } else {
                    SocketState::Disconnected
                };
            }
        }
        Ok(count)
    }

    /// Closes channel `mux`.
    ///
    /// The slot is marked `Closed` and its buffer dropped no matter what the
    /// modem answers; the returned flag only says whether the close was
    /// acknowledged with `OK`.
    pub async fn close(&mut self, mux: u8) -> Result<bool, Error> {
        if self.sockets.allocated_mut(mux).is_none() {
            return Ok(false);
        }
        debug!("Closing channel {}", mux);
        let timeout = self.config.command_timeout;
        let request = tcpip::close(mux);
        let result = self.at.execute(request.as_str(), timeout).await;
        let slot = unwrap!(self.sockets.get_mut(mux));
        slot.reset();
        slot.state = SocketState::Closed;
        Ok(result?.is_success())
    }

    /// Moves staged bytes out of channel `mux`'s ring buffer into `out`,
    /// oldest first, and returns how many were copied. Never touches the
    /// transport.
    pub fn recv_slice(&mut self, mux: u8, out: &mut [u8]) -> usize {
        match self.sockets.allocated_mut(mux) {
            Some(slot) => slot.rx.pop_slice(out),
            None => 0,
        }
    }

    /// Last known lifecycle state of channel `mux`.
    pub fn state(&self, mux: u8) -> SocketState {
        self.sockets
            .get(mux)
            .map(|s| s.state)
            .unwrap_or(SocketState::Unallocated)
    }

    /// Byte count the modem last reported pending for channel `mux`.
    pub fn available(&self, mux: u8) -> usize {
        self.sockets.get(mux).map(|s| s.available).unwrap_or(0)
    }

    /// Bytes currently staged in channel `mux`'s ring buffer.
    pub fn buffered_len(&self, mux: u8) -> usize {
        self.sockets.get(mux).map(|s| s.rx.len()).unwrap_or(0)
    }

    /// Adjusts the per-byte wait bound used by [`read`](Self::read) on
    /// channel `mux`.
    pub fn set_receive_timeout(&mut self, mux: u8, timeout: Duration) {
        if let Some(slot) = self.sockets.get_mut(mux) {
            slot.receive_timeout = timeout;
        }
    }
}

fn parse_open_result(reply: &[u8]) -> Option<(i32, i32)> {
    let at = parser::find_field(reply, tcpip::OPEN_RESULT)?;
    let (mux, at) = parser::next_int(reply, at)?;
    let at = parser::skip_fields(reply, at, 1)?;
    let (result, _) = parser::next_int(reply, at)?;
    Some((mux, result))
}

fn parse_send_result(reply: &[u8]) -> Option<i32> {
    let at = parser::find_field(reply, tcpip::SEND_RESULT)?;
    let at = parser::skip_fields(reply, at, 2)?;
    let (sent, _) = parser::next_int(reply, at)?;
    Some(sent)
}

fn parse_read_lengths(reply: &[u8]) -> Option<(i32, i32)> {
    let at = parser::find_field(reply, tcpip::RXGET_RESULT)?;
    let at = parser::skip_fields(reply, at, 2)?;
    let (to_read, at) = parser::next_int(reply, at)?;
    let at = parser::skip_fields(reply, at, 1)?;
    let (remaining, _) = parser::next_int(reply, at)?;
    Some((to_read, remaining))
}

fn parse_available(reply: &[u8]) -> Option<i32> {
    let at = parser::find_field(reply, tcpip::RXGET_RESULT)?;
    let at = parser::skip_fields(reply, at, 2)?;
    let (available, _) = parser::next_int(reply, at)?;
    Some(available)
}
