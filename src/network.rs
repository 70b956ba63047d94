//! Packet-data session bring-up.
//!
//! Sockets need an open socket service (`AT+NETOPEN`) on an active PDP
//! context before any `AT+CIPOPEN` can succeed. This module runs that
//! sequence; it sits beside the socket layer as an ordinary caller of the
//! transaction engine.

use embassy_time::Instant;

use crate::client::A76xxClient;
use crate::command::psn;
use crate::config::Transport;
use crate::error::Error;
use crate::parser;

/// Access point configuration for [`attach`](A76xxClient::attach).
///
/// An empty `user` means the context authenticates anonymously and no
/// `AT+CGAUTH` is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ApnInfo<'a> {
    pub apn: &'a str,
    pub user: &'a str,
    pub password: &'a str,
}

impl<'a> ApnInfo<'a> {
    pub const fn new(apn: &'a str) -> Self {
        ApnInfo {
            apn,
            user: "",
            password: "",
        }
    }

    pub const fn with_credentials(apn: &'a str, user: &'a str, password: &'a str) -> Self {
        ApnInfo {
            apn,
            user,
            password,
        }
    }
}

impl<T: Transport> A76xxClient<T> {
    /// Brings the packet-data session up: defines the PDP context, applies
    /// the TCP/IP service profile, activates the context and opens the socket
    /// service.
    ///
    /// The open result (`+NETOPEN: <code>`) is reported asynchronously and on
    /// a cold network can take tens of seconds; the wait is bounded by
    /// `Config::netopen_timeout`. Refused profile steps are logged and
    /// tolerated; a refused PDP definition, context activation or service
    /// open returns `Ok(false)`.
    pub async fn attach(&mut self, apn: &ApnInfo<'_>) -> Result<bool, Error> {
        let timeout = self.config.command_timeout;
        info!("Attaching packet data on APN {}", apn.apn);

        // Tear down any previous session; a refusal here just means there
        // was none.
        let _ = self.at.execute(psn::NET_CLOSE, timeout).await?;

        if !apn.user.is_empty() {
            let command = psn::auth(apn.user, apn.password)?;
            let reply = self.at.execute(command.as_str(), timeout).await?;
            if !reply.is_success() {
                warn!("Authentication setup was not accepted");
            }
        }

        let command = psn::define_pdp(apn.apn)?;
        let reply = self.at.execute(command.as_str(), timeout).await?;
        if !reply.is_success() {
            warn!("PDP context definition was refused");
            return Ok(false);
        }

        for step in [
            psn::TRANSPARENT_MODE_OFF,
            psn::MANUAL_SEND_OFF,
            psn::SOCKET_PROFILE,
            psn::TIMEOUT_PROFILE,
        ] {
            let reply = self.at.execute(step, timeout).await?;
            if !reply.is_success() {
                warn!("Setup step {} was not accepted", step);
            }
        }

        let reply = self.at.execute(psn::ACTIVATE_CONTEXT, timeout).await?;
        if !reply.is_success() {
            warn!("PDP context activation failed");
            return Ok(false);
        }

        // `+NETOPEN: 0` is a result code here (0 = opened), not the state
        // flag the query form reports.
        let reply = self.at.execute(psn::NET_OPEN, timeout).await?;
        if let Some(code) = parse_netopen(reply.as_bytes()) {
            return Ok(code == 0);
        }
        let deadline = Instant::now() + self.config.netopen_timeout;
        while Instant::now() < deadline {
            let window = self.at.collect(timeout).await?;
            if let Some(code) = parse_netopen(window.as_bytes()) {
                if code == 0 {
                    info!("Packet data attached");
                    return Ok(true);
                }
                warn!("Socket service open failed with code {}", code);
                return Ok(false);
            }
        }
        warn!("Timed out waiting for the socket service to open");
        Ok(false)
    }

    /// Closes the socket service.
    pub async fn detach(&mut self) -> Result<bool, Error> {
        info!("Detaching packet data");
        let timeout = self.config.command_timeout;
        let reply = self.at.execute(psn::NET_CLOSE, timeout).await?;
        Ok(reply.is_success())
    }

    /// True while the socket service reports itself open.
    pub async fn is_attached(&mut self) -> Result<bool, Error> {
        let timeout = self.config.command_timeout;
        let reply = self.at.execute(psn::NET_QUERY, timeout).await?;
        // The query form answers with a state flag: 1 = open.
        Ok(parse_netopen(reply.as_bytes()) == Some(1))
    }
}

fn parse_netopen(reply: &[u8]) -> Option<i32> {
    let at = parser::find_field(reply, psn::NETOPEN_RESULT)?;
    let (value, _) = parser::next_int(reply, at)?;
    Some(value)
}
