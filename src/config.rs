use embassy_time::Duration;
use embedded_io_async::{Read, Write};

/// Serial link to the modem, implemented by the application for its UART.
///
/// The AT interface admits exactly one transaction at a time, so the driver
/// takes exclusive ownership of the transport for its whole lifetime.
pub trait Transport: Write + Read {
    /// Number of bytes the link currently holds, readable without blocking.
    fn buffered(&mut self) -> usize;
}

/// Driver timing parameters.
///
/// The defaults match the modem's documented behavior; tests and unusual
/// deployments tighten or relax them through the `with_*` builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Reply window for ordinary command transactions.
    pub command_timeout: Duration,
    /// Initial per-socket wait bound for each byte of a chunked read.
    pub receive_timeout: Duration,
    /// Sleep between transport depth polls in the receive hot path.
    pub poll_interval: Duration,
    /// Bound for the packet-data session open result, which the modem reports
    /// asynchronously and can take tens of seconds on a cold network.
    pub netopen_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            command_timeout: Duration::from_secs(1),
            receive_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(1),
            netopen_timeout: Duration::from_secs(75),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command_timeout(self, command_timeout: Duration) -> Self {
        Config {
            command_timeout,
            ..self
        }
    }

    pub fn with_receive_timeout(self, receive_timeout: Duration) -> Self {
        Config {
            receive_timeout,
            ..self
        }
    }

    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        Config {
            poll_interval,
            ..self
        }
    }

    pub fn with_netopen_timeout(self, netopen_timeout: Duration) -> Self {
        Config {
            netopen_timeout,
            ..self
        }
    }
}
