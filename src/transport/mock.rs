//! Mock transport for testing protocol and coordinator logic without hardware.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::traits::{I2cTransport, TransportError};

#[derive(Default)]
struct Inner {
    replies: VecDeque<Vec<u8>>,
    writes: Vec<(u16, u8, Vec<u8>)>,
    write_attempts: usize,
    read_attempts: usize,
    fail_writes: bool,
    fail_reads: bool,
    read_delay: Duration,
}

/// In-memory channel that records writes and plays back queued replies.
///
/// Cloning returns a second handle to the same channel, so a test can keep
/// one handle for inspection while the registry owns the other.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply to be returned by the next successful read.
    pub fn queue_reply(&self, bytes: Vec<u8>) {
        self.inner.lock().unwrap().replies.push_back(bytes);
    }

    /// Make every write fail until told otherwise.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_writes = fail;
    }

    /// Make every read fail until told otherwise.
    pub fn fail_reads(&self, fail: bool) {
        self.inner.lock().unwrap().fail_reads = fail;
    }

    /// Make every read block for `delay` before returning its reply, so
    /// tests can hold an operation in flight.
    pub fn delay_reads(&self, delay: Duration) {
        self.inner.lock().unwrap().read_delay = delay;
    }

    /// All captured writes as `(address, sub_address, data)`.
    pub fn writes(&self) -> Vec<(u16, u8, Vec<u8>)> {
        self.inner.lock().unwrap().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.inner.lock().unwrap().writes.clear();
    }

    /// Number of write calls, including failed ones.
    pub fn write_attempts(&self) -> usize {
        self.inner.lock().unwrap().write_attempts
    }

    /// Number of read calls, including failed ones.
    pub fn read_attempts(&self) -> usize {
        self.inner.lock().unwrap().read_attempts
    }
}

impl I2cTransport for MockTransport {
    fn write(&mut self, address: u16, sub_address: u8, data: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.write_attempts += 1;
        if inner.fail_writes {
            return Err(TransportError::WriteFailed("injected failure".into()));
        }
        inner.writes.push((address, sub_address, data.to_vec()));
        Ok(())
    }

    fn read(&mut self, _address: u16, len: usize) -> Result<Vec<u8>, TransportError> {
        let delay = {
            let mut inner = self.inner.lock().unwrap();
            inner.read_attempts += 1;
            if inner.fail_reads {
                return Err(TransportError::ReadFailed("injected failure".into()));
            }
            inner.read_delay
        };
        // Sleep without holding the lock; other handles stay usable.
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut inner = self.inner.lock().unwrap();
        let reply = inner
            .replies
            .pop_front()
            .ok_or_else(|| TransportError::ReadFailed("no reply queued".into()))?;
        if reply.len() < len {
            return Err(TransportError::ShortRead {
                expected: len,
                actual: reply.len(),
            });
        }
        Ok(reply)
    }
}
