//! TCP/IP application commands (`AT+CIP*`).

use core::fmt::Write;

use heapless::String;

use crate::error::Error;

/// Reply line announcing the outcome of `AT+CIPOPEN`.
pub const OPEN_RESULT: &str = "+CIPOPEN:";
/// Reply line confirming how many payload bytes the modem accepted.
pub const SEND_RESULT: &str = "+CIPSEND:";
/// Reply line carrying retrieved-data lengths and counters.
pub const RXGET_RESULT: &str = "+CIPRXGET:";
/// Reply line listing per-link connection states.
pub const CLOSE_STATES: &str = "+CIPCLOSE:";

/// Puts received data under manual retrieval; the modem buffers inbound
/// bytes until they are fetched with `AT+CIPRXGET=3`.
pub const MANUAL_RX_MODE: &str = "AT+CIPRXGET=1";

/// Queries the connection state of every link.
pub const CONNECTION_STATES: &str = "AT+CIPCLOSE?";

/// `AT+CIPOPEN=<mux>,"TCP","<host>",<port>`
///
/// The host name is caller-supplied and unbounded, so this is the one TCP/IP
/// builder that can overflow its buffer.
pub fn open(mux: u8, host: &str, port: u16) -> Result<String<160>, Error> {
    let mut buffer = String::new();
    write!(buffer, "AT+CIPOPEN={},\"TCP\",\"{}\",{}", mux, host, port)
        .map_err(|_| Error::Overflow)?;
    Ok(buffer)
}

/// `AT+CIPSEND=<mux>,<len>`
pub fn send_request(mux: u8, len: usize) -> String<40> {
    let mut buffer = String::new();
    write!(buffer, "AT+CIPSEND={},{}", mux, len).unwrap();
    buffer
}

/// `AT+CIPRXGET=3,<mux>,<len>`
pub fn read_chunk(mux: u8, len: usize) -> String<40> {
    let mut buffer = String::new();
    write!(buffer, "AT+CIPRXGET=3,{},{}", mux, len).unwrap();
    buffer
}

/// `AT+CIPRXGET=4,<mux>`
pub fn query_available(mux: u8) -> String<24> {
    let mut buffer = String::new();
    write!(buffer, "AT+CIPRXGET=4,{}", mux).unwrap();
    buffer
}

/// `AT+CIPCLOSE=<mux>`
pub fn close(mux: u8) -> String<24> {
    let mut buffer = String::new();
    write!(buffer, "AT+CIPCLOSE={}", mux).unwrap();
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_renders_quoted_host() {
        let cmd = open(2, "example.com", 8080).unwrap();
        assert_eq!(cmd.as_str(), "AT+CIPOPEN=2,\"TCP\",\"example.com\",8080");
    }

    #[test]
    fn open_rejects_oversized_host() {
        let long = core::str::from_utf8(&[b'a'; 200]).unwrap();
        assert_eq!(open(0, long, 80), Err(Error::Overflow));
    }

    #[test]
    fn data_phase_builders() {
        assert_eq!(send_request(0, 18).as_str(), "AT+CIPSEND=0,18");
        assert_eq!(read_chunk(3, 1024).as_str(), "AT+CIPRXGET=3,3,1024");
        assert_eq!(query_available(9).as_str(), "AT+CIPRXGET=4,9");
        assert_eq!(close(1).as_str(), "AT+CIPCLOSE=1");
    }
}
