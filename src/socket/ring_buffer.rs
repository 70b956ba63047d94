//! Per-socket staging ring for received payload bytes.

/// Fixed-capacity byte ring with lossy overflow.
///
/// `push` on a full ring overwrites the oldest byte and advances the read
/// side, so the ring always holds the newest `N` bytes seen. It never grows.
pub struct RingBuffer<const N: usize> {
    buf: [u8; N],
    /// Next write position.
    head: usize,
    /// Oldest unread position.
    tail: usize,
    size: usize,
}

impl<const N: usize> RingBuffer<N> {
    pub const fn new() -> Self {
        RingBuffer {
            buf: [0; N],
            head: 0,
            tail: 0,
            size: 0,
        }
    }

    pub fn push(&mut self, byte: u8) {
        self.buf[self.head] = byte;
        self.head = (self.head + 1) % N;
        if self.size < N {
            self.size += 1;
        } else {
            self.tail = (self.tail + 1) % N;
        }
    }

    pub fn pop(&mut self) -> Option<u8> {
        if self.size == 0 {
            return None;
        }
        let byte = self.buf[self.tail];
        self.tail = (self.tail + 1) % N;
        self.size -= 1;
        Some(byte)
    }

    /// Moves as many staged bytes as fit into `out`, oldest first, returning
    /// the count moved.
    pub fn pop_slice(&mut self, out: &mut [u8]) -> usize {
        let mut n = 0;
        while n < out.len() {
            match self.pop() {
                Some(byte) => {
                    out[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.size = 0;
    }

    pub const fn len(&self) -> usize {
        self.size
    }

    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub const fn is_full(&self) -> bool {
        self.size == N
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
