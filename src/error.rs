use embedded_io_async::ErrorKind;

/// Driver fault conditions.
///
/// Deliberately narrow: timeouts, missing reply lines and use of unallocated
/// sockets are ordinary outcomes of the AT protocol and are surfaced as
/// empty/zero/false results by the operations themselves. `Error` is reserved
/// for faults the reply cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A formatted command did not fit its fixed-capacity buffer.
    Overflow,
    /// The serial transport failed while reading or writing.
    Transport(ErrorKind),
}

impl Error {
    pub(crate) fn transport<E: embedded_io_async::Error>(e: E) -> Self {
        Error::Transport(e.kind())
    }
}
