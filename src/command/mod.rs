//! AT command text for the A76xx TCP/IP application and packet domain.
//!
//! Commands are rendered into fixed-capacity [`heapless::String`]s by the
//! builder functions in the submodules. Replies come back untyped, so each
//! submodule also names the `+PREFIX:` tokens its callers search for.

pub mod psn;
pub mod tcpip;

/// Final result code the modem appends to an accepted command.
pub const OK_TOKEN: &str = "OK";

/// Prompt character the modem prints when it is ready for payload bytes.
pub const DATA_PROMPT: &str = ">";
