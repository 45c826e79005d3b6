//! Scripted transport for driving sessions in tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::{DialRequest, EventHandler, HandshakeResponse, Socket, Transport, TransportEvent};

/// Socket recording every write and close.
#[derive(Default)]
pub(crate) struct MockSocket {
    pub writes: Mutex<Vec<String>>,
    pub closes: Mutex<Vec<(u16, String)>>,
    pub fail_writes: AtomicBool,
}

impl Socket for MockSocket {
    fn write(&self, text: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::send("broken pipe"));
        }
        self.writes.lock().push(text.to_string());
        Ok(())
    }

    fn close(&self, code: u16, reason: &str) {
        self.closes.lock().push((code, reason.to_string()));
    }
}

/// Transport that records dials and lets the test fire events.
#[derive(Default)]
pub(crate) struct MockTransport {
    dials: Mutex<Vec<(DialRequest, EventHandler)>>,
}

impl Transport for MockTransport {
    fn dial(&self, request: DialRequest, handler: EventHandler) {
        self.dials.lock().push((request, handler));
    }
}

impl MockTransport {
    pub fn dial_count(&self) -> usize {
        self.dials.lock().len()
    }

    pub fn last_request(&self) -> DialRequest {
        self.dials.lock().last().expect("no dial recorded").0.clone()
    }

    /// Delivers `event` to the handler of dial number `index`.
    pub fn emit_to(&self, index: usize, event: TransportEvent) {
        let handler = Arc::clone(&self.dials.lock()[index].1);
        handler(event);
    }

    /// Delivers `event` to the most recent dial.
    pub fn emit(&self, event: TransportEvent) {
        let index = self.dial_count() - 1;
        self.emit_to(index, event);
    }

    /// Completes the most recent dial with a fresh socket.
    pub fn open(&self, set_cookies: &[&str]) -> Arc<MockSocket> {
        let socket = Arc::new(MockSocket::default());
        let response = HandshakeResponse {
            set_cookies: set_cookies.iter().map(|c| c.to_string()).collect(),
            ..HandshakeResponse::switching_protocols()
        };
        self.emit(TransportEvent::Opened {
            socket: socket.clone(),
            response,
        });
        socket
    }
}
