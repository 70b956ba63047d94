#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("You may not enable both `defmt` and `log` features.");

mod fmt;

mod at;
mod client;
mod config;
mod error;
mod network;
mod shared;
mod socket;

pub mod command;
pub mod parser;

#[cfg(test)]
mod test_helpers;

pub use at::{RawReply, MAX_REPLY_LEN};
pub use client::A76xxClient;
pub use config::{Config, Transport};
pub use error::Error;
pub use network::ApnInfo;
pub use shared::SharedA76xx;
pub use socket::{SocketState, MUX_COUNT, SOCKET_BUFFER_SIZE};
