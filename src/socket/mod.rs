//! Per-channel socket records.

pub mod ring_buffer;

use embassy_time::Duration;

use ring_buffer::RingBuffer;

/// Number of logical channels the modem multiplexes over one serial link.
pub const MUX_COUNT: usize = 10;

/// Capacity of each socket's staging buffer.
pub const SOCKET_BUFFER_SIZE: usize = 1024;

/// Lifecycle of one mux slot.
///
/// `Connected` and `Disconnected` mirror the modem's last reported link state
/// and may be stale between [`get_connected`](crate::A76xxClient::get_connected)
/// queries. `Closed` marks a slot torn down locally; it behaves like
/// `Unallocated` for every socket operation until the next connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketState {
    Unallocated,
    Connecting,
    Connected,
    Disconnected,
    Closed,
}

pub(crate) struct Socket {
    pub state: SocketState,
    /// Last byte count the modem reported pending for this channel.
    pub available: usize,
    /// Wait bound for each byte of a chunked read.
    pub receive_timeout: Duration,
    pub rx: RingBuffer<SOCKET_BUFFER_SIZE>,
}

impl Socket {
    pub const fn new(receive_timeout: Duration) -> Self {
        Socket {
            state: SocketState::Unallocated,
            available: 0,
            receive_timeout,
            rx: RingBuffer::new(),
        }
    }

    /// A slot takes part in socket operations only while allocated.
    pub fn is_allocated(&self) -> bool {
        !matches!(self.state, SocketState::Unallocated | SocketState::Closed)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, SocketState::Connected)
    }

    /// Drops staged data and the pending-byte count, keeping `state` and the
    /// configured timeout.
    pub fn reset(&mut self) {
        self.available = 0;
        self.rx.clear();
    }
}

/// The fixed slot table; identity is the mux id itself.
pub(crate) struct SocketSet {
    slots: [Socket; MUX_COUNT],
}

impl SocketSet {
    pub fn new(receive_timeout: Duration) -> Self {
        SocketSet {
            slots: core::array::from_fn(|_| Socket::new(receive_timeout)),
        }
    }

    pub fn get(&self, mux: u8) -> Option<&Socket> {
        self.slots.get(usize::from(mux))
    }

    pub fn get_mut(&mut self, mux: u8) -> Option<&mut Socket> {
        self.slots.get_mut(usize::from(mux))
    }

    /// Slot lookup that additionally requires the slot to be allocated; the
    /// `None` it returns for unknown or unallocated muxes is what keeps those
    /// operations free of transport I/O.
    pub fn allocated_mut(&mut self, mux: u8) -> Option<&mut Socket> {
        self.get_mut(mux).filter(|s| s.is_allocated())
    }
}
