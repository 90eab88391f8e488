//! Mock transport for testing and development
//!
//! Responses are scripted per command: writing a stubbed command queues its
//! answer in the input buffer, which `read` then drains.

use crate::hardware::{Transport, TransportError, TransportResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

type Responder = Box<dyn FnMut(usize) -> Vec<u8> + Send>;

struct Stub {
    name: String,
    receive: Vec<u8>,
    respond: Responder,
    calls: usize,
}

#[derive(Default)]
struct MockInner {
    open: bool,
    stubs: Vec<Stub>,
    input: VecDeque<u8>,
    written: Vec<Vec<u8>>,
    opened: usize,
    closed: usize,
    cleared: usize,
}

/// Mock serial device
///
/// Clones share state, so a test can keep a handle while the stream under
/// test owns another.
#[derive(Clone)]
pub struct MockTransport {
    port: String,
    inner: Arc<Mutex<MockInner>>,
}

impl MockTransport {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            inner: Arc::new(Mutex::new(MockInner::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Answer `receive` with a fixed `send`, replacing any stub of the same name
    pub fn stub(&self, name: &str, receive: &[u8], send: &[u8]) {
        let send = send.to_vec();
        self.stub_fn(name, receive, move |_| send.clone());
    }

    /// Answer `receive` with `send(n)`, where `n` counts calls starting at 1
    pub fn stub_fn<F>(&self, name: &str, receive: &[u8], send: F)
    where
        F: FnMut(usize) -> Vec<u8> + Send + 'static,
    {
        let mut inner = self.lock();
        inner.stubs.retain(|s| s.name != name);
        inner.stubs.push(Stub {
            name: name.to_string(),
            receive: receive.to_vec(),
            respond: Box::new(send),
            calls: 0,
        });
    }

    /// Number of times the named stub has been triggered
    pub fn calls(&self, name: &str) -> usize {
        self.lock()
            .stubs
            .iter()
            .find(|s| s.name == name)
            .map_or(0, |s| s.calls)
    }

    pub fn called(&self, name: &str) -> bool {
        self.calls(name) > 0
    }

    /// Queue unsolicited bytes, as a continuously streaming sensor would
    pub fn inject(&self, data: &[u8]) {
        self.lock().input.extend(data);
    }

    /// Every write, in order
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.lock().written.clone()
    }

    pub fn open_count(&self) -> usize {
        self.lock().opened
    }

    pub fn close_count(&self) -> usize {
        self.lock().closed
    }

    /// Number of times pending input was discarded
    pub fn clear_count(&self) -> usize {
        self.lock().cleared
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new("/dev/mock")
    }
}

impl Transport for MockTransport {
    fn port(&self) -> &str {
        &self.port
    }

    fn is_open(&self) -> bool {
        self.lock().open
    }

    fn open(&mut self) -> TransportResult<()> {
        let mut inner = self.lock();
        if !inner.open {
            inner.open = true;
            inner.opened += 1;
            inner.input.clear();
        }
        Ok(())
    }

    fn close(&mut self) {
        let mut inner = self.lock();
        if inner.open {
            inner.open = false;
            inner.closed += 1;
        }
    }

    fn write(&mut self, data: &[u8]) -> TransportResult<()> {
        let mut inner = self.lock();
        if !inner.open {
            return Err(TransportError::NotOpen {
                port: self.port.clone(),
            });
        }
        inner.written.push(data.to_vec());

        let answer = inner
            .stubs
            .iter_mut()
            .find(|s| s.receive == data)
            .map(|stub| {
                stub.calls += 1;
                (stub.respond)(stub.calls)
            });
        if let Some(answer) = answer {
            inner.input.extend(answer);
        }
        Ok(())
    }

    fn flush(&mut self) -> TransportResult<()> {
        Ok(())
    }

    fn bytes_to_read(&mut self) -> TransportResult<usize> {
        Ok(self.lock().input.len())
    }

    fn read(&mut self, len: usize) -> TransportResult<Vec<u8>> {
        let mut inner = self.lock();
        if !inner.open {
            return Err(TransportError::NotOpen {
                port: self.port.clone(),
            });
        }
        let available = inner.input.len().min(len);
        Ok(inner.input.drain(..available).collect())
    }

    fn clear_input(&mut self) -> TransportResult<()> {
        let mut inner = self.lock();
        inner.input.clear();
        inner.cleared += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stubbed_command_queues_answer() {
        let mut mock = MockTransport::default();
        mock.stub("ping", b"PING", b"PONG");
        mock.open().unwrap();

        mock.write(b"PING").unwrap();
        assert_eq!(mock.bytes_to_read().unwrap(), 4);
        assert_eq!(mock.read(2).unwrap(), b"PO");
        assert_eq!(mock.read(10).unwrap(), b"NG");
        assert!(mock.read(10).unwrap().is_empty());
        assert_eq!(mock.calls("ping"), 1);
    }

    #[test]
    fn test_unknown_command_gets_no_answer() {
        let mut mock = MockTransport::default();
        mock.open().unwrap();
        mock.write(b"????").unwrap();
        assert_eq!(mock.bytes_to_read().unwrap(), 0);
        assert_eq!(mock.written(), vec![b"????".to_vec()]);
    }

    #[test]
    fn test_stub_fn_sees_call_number() {
        let mut mock = MockTransport::default();
        mock.stub_fn("count", b"C", |n| vec![n as u8]);
        mock.open().unwrap();

        mock.write(b"C").unwrap();
        mock.write(b"C").unwrap();
        assert_eq!(mock.read(2).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_restub_replaces_by_name() {
        let mut mock = MockTransport::default();
        mock.stub("cmd", b"X", b"first");
        mock.stub("cmd", b"X", b"second");
        mock.open().unwrap();

        mock.write(b"X").unwrap();
        assert_eq!(mock.read(16).unwrap(), b"second");
    }

    #[test]
    fn test_clones_share_state() {
        let handle = MockTransport::default();
        let mut owned = handle.clone();
        owned.open().unwrap();
        owned.inject(b"abc");
        owned.clear_input().unwrap();
        owned.close();

        assert!(!handle.is_open());
        assert_eq!(handle.open_count(), 1);
        assert_eq!(handle.close_count(), 1);
        assert_eq!(handle.clear_count(), 1);
    }

    #[test]
    fn test_closed_mock_rejects_io() {
        let mut mock = MockTransport::default();
        assert!(matches!(mock.write(b"X"), Err(TransportError::NotOpen { .. })));
        assert!(matches!(mock.read(1), Err(TransportError::NotOpen { .. })));
    }
}
