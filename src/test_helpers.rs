//! Scripted serial endpoint for driver tests.
//!
//! [`MockTransport`] plays the modem side of the wire. A test enqueues
//! expectations: when a write containing `pattern` arrives, `reply` becomes
//! readable immediately and `deferred` chunks are held back until the driver
//! polls [`buffered`]. That split keeps payload bytes out of the reply window
//! and hands them to the per-byte retrieval loop instead, the same shape the
//! stream has on hardware once the window has closed.
//!
//! Reads block forever while nothing is readable, so reply windows end by
//! timeout exactly as they do on a quiet UART.
//!
//! [`buffered`]: crate::config::Transport::buffered

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_io_async::ErrorKind;

use crate::config::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockIoError(pub ErrorKind);

impl embedded_io_async::Error for MockIoError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

struct Exchange {
    pattern: Vec<u8>,
    reply: Vec<u8>,
    deferred: Vec<Vec<u8>>,
}

#[derive(Default)]
struct Inner {
    script: VecDeque<Exchange>,
    rx: VecDeque<u8>,
    deferred: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    fail_next_write: Option<ErrorKind>,
    fail_next_read: Option<ErrorKind>,
}

pub struct MockTransport {
    inner: Rc<RefCell<Inner>>,
}

/// Test-side handle onto the same state as the transport handed to the driver.
#[derive(Clone)]
pub struct MockHandle {
    inner: Rc<RefCell<Inner>>,
}

impl MockTransport {
    pub fn new() -> (Self, MockHandle) {
        let inner = Rc::new(RefCell::new(Inner::default()));
        (
            MockTransport {
                inner: inner.clone(),
            },
            MockHandle { inner },
        )
    }
}

impl MockHandle {
    /// Replies with `reply` once a write containing `pattern` is seen.
    pub fn expect(&self, pattern: &str, reply: &[u8]) {
        self.expect_deferred(pattern, reply, &[]);
    }

    /// Like [`expect`], but additionally queues chunks that become readable
    /// one at a time, each released by a `buffered()` poll that finds the
    /// receive side empty.
    ///
    /// [`expect`]: MockHandle::expect
    pub fn expect_deferred(&self, pattern: &str, reply: &[u8], chunks: &[&[u8]]) {
        self.inner.borrow_mut().script.push_back(Exchange {
            pattern: pattern.as_bytes().to_vec(),
            reply: reply.to_vec(),
            deferred: chunks.iter().map(|c| c.to_vec()).collect(),
        });
    }

    /// Makes `bytes` readable immediately, outside any expectation. Used to
    /// model unsolicited lines that arrive on their own schedule.
    pub fn push_rx(&self, bytes: &[u8]) {
        self.inner.borrow_mut().rx.extend(bytes.iter().copied());
    }

    pub fn fail_next_write(&self, kind: ErrorKind) {
        self.inner.borrow_mut().fail_next_write = Some(kind);
    }

    pub fn fail_next_read(&self, kind: ErrorKind) {
        self.inner.borrow_mut().fail_next_read = Some(kind);
    }

    /// Every write the driver made, in order, including CRLF and payload.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.inner.borrow().writes.clone()
    }

    /// The AT command lines sent, in order, with framing and payload writes
    /// filtered out.
    pub fn commands(&self) -> Vec<String> {
        self.inner
            .borrow()
            .writes
            .iter()
            .filter(|w| w.starts_with(b"AT"))
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    pub fn remaining_expectations(&self) -> usize {
        self.inner.borrow().script.len()
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

impl embedded_io_async::ErrorType for MockTransport {
    type Error = MockIoError;
}

impl embedded_io_async::Read for MockTransport {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        {
            let mut inner = self.inner.borrow_mut();
            if let Some(kind) = inner.fail_next_read.take() {
                return Err(MockIoError(kind));
            }
            if !inner.rx.is_empty() {
                let n = buf.len().min(inner.rx.len());
                for slot in buf.iter_mut().take(n) {
                    *slot = inner.rx.pop_front().unwrap();
                }
                return Ok(n);
            }
        }
        core::future::pending().await
    }
}

impl embedded_io_async::Write for MockTransport {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut inner = self.inner.borrow_mut();
        if let Some(kind) = inner.fail_next_write.take() {
            return Err(MockIoError(kind));
        }
        inner.writes.push(buf.to_vec());
        let matched = inner
            .script
            .front()
            .is_some_and(|ex| contains(buf, &ex.pattern));
        if matched {
            let ex = inner.script.pop_front().unwrap();
            inner.rx.extend(ex.reply);
            inner.deferred.extend(ex.deferred);
        }
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Transport for MockTransport {
    fn buffered(&mut self) -> usize {
        let mut inner = self.inner.borrow_mut();
        if inner.rx.is_empty() {
            if let Some(chunk) = inner.deferred.pop_front() {
                inner.rx.extend(chunk);
            }
        }
        inner.rx.len()
    }
}
