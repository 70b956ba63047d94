//! Packet domain and socket-service setup commands.
//!
//! The fixed profile values (`AT+CIPCCFG`, `AT+CIPTIMEOUT`) match the vendor
//! application note for manual-retrieval TCP operation.

use core::fmt::Write;

use heapless::String;

use crate::error::Error;

/// Reply line reporting the socket service state.
pub const NETOPEN_RESULT: &str = "+NETOPEN:";

/// Opens the packet network socket service.
pub const NET_OPEN: &str = "AT+NETOPEN";
/// Closes the packet network socket service.
pub const NET_CLOSE: &str = "AT+NETCLOSE";
/// Queries whether the socket service is open.
pub const NET_QUERY: &str = "AT+NETOPEN?";

/// Command mode rather than transparent mode.
pub const TRANSPARENT_MODE_OFF: &str = "AT+CIPMODE=0";
/// Sends take effect on length match rather than on a terminator.
pub const MANUAL_SEND_OFF: &str = "AT+CIPSENDMODE=0";
/// Retransmission and buffering profile for the socket service.
pub const SOCKET_PROFILE: &str = "AT+CIPCCFG=10,0,0,0,1,0,75000";
/// Connect, send and receive limits in milliseconds.
pub const TIMEOUT_PROFILE: &str = "AT+CIPTIMEOUT=75000,15000,15000";
/// Activates PDP context 1.
pub const ACTIVATE_CONTEXT: &str = "AT+CGACT=1,1";

/// `AT+CGDCONT=1,"IP","<apn>","0.0.0.0",0,0`
pub fn define_pdp(apn: &str) -> Result<String<160>, Error> {
    let mut buffer = String::new();
    write!(buffer, "AT+CGDCONT=1,\"IP\",\"{}\",\"0.0.0.0\",0,0", apn)
        .map_err(|_| Error::Overflow)?;
    Ok(buffer)
}

/// `AT+CGAUTH=1,0,"<user>","<password>"`
pub fn auth(user: &str, password: &str) -> Result<String<160>, Error> {
    let mut buffer = String::new();
    write!(buffer, "AT+CGAUTH=1,0,\"{}\",\"{}\"", user, password).map_err(|_| Error::Overflow)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdp_context_renders_placeholder_address() {
        let cmd = define_pdp("internet").unwrap();
        assert_eq!(cmd.as_str(), "AT+CGDCONT=1,\"IP\",\"internet\",\"0.0.0.0\",0,0");
    }

    #[test]
    fn auth_renders_user_then_password() {
        let cmd = auth("alice", "secret").unwrap();
        assert_eq!(cmd.as_str(), "AT+CGAUTH=1,0,\"alice\",\"secret\"");
    }

    #[test]
    fn oversized_apn_is_rejected() {
        let long = core::str::from_utf8(&[b'n'; 200]).unwrap();
        assert_eq!(define_pdp(long), Err(Error::Overflow));
    }
}
