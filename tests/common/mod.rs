#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use libhttpc::client::{CloseStatus, Conn, ConnState, Error, EventHandler, Response};
use libhttpc::http::{ContentType, HeaderField};
use libhttpc::transport::{
    Connect, ConnectCfg, Error as SockError, Interest, Readiness, Socket,
};

/// Captured wire output, shared so it survives the socket being closed.
#[derive(Clone, Default)]
pub struct Wire(pub Rc<RefCell<Vec<u8>>>);

impl Wire {
    pub fn bytes(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }
}

/// Scripted in-memory socket.
///
/// Each entry of the receive script is handed out by one `receive` call, so
/// tests control exactly how response bytes are split. Written bytes are
/// appended to the shared [`Wire`]. `max_tx` caps how much one `send`
/// accepts, to exercise partial-write resumption.
pub struct MockSocket {
    sent: Wire,
    rx: VecDeque<Vec<u8>>,
    pub max_tx: usize,
    /// Report `Closed` from `receive` once the script is exhausted.
    pub closed_after_script: bool,
    pub half_closed: bool,
}

impl MockSocket {
    pub fn new(wire: &Wire) -> Self {
        Self {
            sent: wire.clone(),
            rx: VecDeque::new(),
            max_tx: usize::MAX,
            closed_after_script: false,
            half_closed: false,
        }
    }

    /// Script the response as one contiguous delivery.
    pub fn respond(self, bytes: &[u8]) -> Self {
        self.respond_split(&[bytes])
    }

    /// Script the response split into the given receive-call slices.
    pub fn respond_split(mut self, chunks: &[&[u8]]) -> Self {
        for c in chunks {
            self.rx.push_back(c.to_vec());
        }
        self
    }

    pub fn max_tx(mut self, n: usize) -> Self {
        self.max_tx = n;
        self
    }

    pub fn close_after_script(mut self) -> Self {
        self.closed_after_script = true;
        self
    }
}

impl Socket for MockSocket {
    fn send(&mut self, data: &[u8]) -> Result<usize, SockError> {
        let n = data.len().min(self.max_tx);
        self.sent.0.borrow_mut().extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, SockError> {
        match self.rx.front_mut() {
            None => {
                if self.closed_after_script {
                    Err(SockError::Closed)
                } else {
                    Err(SockError::WouldBlock)
                }
            }
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                chunk.drain(..n);
                if chunk.is_empty() {
                    self.rx.pop_front();
                }
                Ok(n)
            }
        }
    }

    fn poll(&mut self, _interest: Interest, _timeout_ms: u32) -> Result<Readiness, SockError> {
        Ok(Readiness { readable: !self.rx.is_empty(), writable: true, error: false })
    }

    fn is_rx_closed(&mut self) -> bool {
        self.half_closed
    }

    fn close(self) -> Result<(), SockError> {
        Ok(())
    }
}

/// Connector handing out one prepared [`MockSocket`].
pub struct MockNet {
    sock: Option<MockSocket>,
    pub refuse: bool,
    pub connects: usize,
}

impl MockNet {
    pub fn new(sock: MockSocket) -> Self {
        Self { sock: Some(sock), refuse: false, connects: 0 }
    }

    pub fn refusing() -> Self {
        Self { sock: None, refuse: true, connects: 0 }
    }
}

impl Connect for MockNet {
    type Socket = MockSocket;

    fn connect(
        &mut self,
        _hostname: &str,
        _port: u16,
        _cfg: &ConnectCfg<'_>,
    ) -> Result<MockSocket, SockError> {
        self.connects += 1;
        if self.refuse {
            return Err(SockError::Refused);
        }
        self.sock.take().ok_or(SockError::Refused)
    }
}

/// Event recorder used by most tests.
#[derive(Default)]
pub struct Capture {
    pub connect: Option<bool>,
    pub headers: Vec<(HeaderField, Vec<u8>)>,
    pub body: Vec<u8>,
    pub body_calls: usize,
    pub last_flags: usize,
    pub completions: Vec<(Response, bool)>,
    pub errors: Vec<Error>,
    pub closed: Option<CloseStatus>,
}

impl EventHandler for Capture {
    fn on_connect(&mut self, ok: bool) {
        self.connect = Some(ok);
    }

    fn on_header(&mut self, field: HeaderField, value: &[u8]) {
        self.headers.push((field, value.to_vec()));
    }

    fn on_body(&mut self, _ct: Option<ContentType>, data: &[u8], last: bool) -> usize {
        self.body.extend_from_slice(data);
        self.body_calls += 1;
        if last {
            self.last_flags += 1;
        }
        data.len()
    }

    fn on_trans_complete(&mut self, resp: &Response, ok: bool) {
        self.completions.push((resp.clone(), ok));
    }

    fn on_trans_err(&mut self, err: Error) {
        self.errors.push(err);
    }

    fn on_close(&mut self, status: CloseStatus) {
        self.closed = Some(status);
    }
}

/// Step the machine until it settles (idle or released), panicking if it
/// never does.
pub fn drive<H: EventHandler>(conn: &mut Conn<'_, MockSocket>, net: &mut MockNet, h: &mut H) {
    for _ in 0..100_000 {
        conn.process(net, h);
        match conn.state() {
            ConnState::None => return,
            ConnState::ParamValidate if conn.pending_requests() == 0 => return,
            _ => {}
        }
    }
    panic!("state machine did not settle, stuck in {:?}", conn.state());
}

/// Split captured wire bytes into (head, body) at the header terminator.
pub fn split_wire(wire: &[u8]) -> (String, Vec<u8>) {
    let pos = wire
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("no header terminator in wire output");
    let head = String::from_utf8(wire[..pos + 4].to_vec()).expect("head not utf-8");
    (head, wire[pos + 4..].to_vec())
}

/// Value of a header line in a request head, if present.
pub fn header_value(head: &str, name: &str) -> Option<String> {
    for line in head.split("\r\n") {
        if let Some((n, v)) = line.split_once(':') {
            if n.eq_ignore_ascii_case(name) {
                return Some(v.trim().to_string());
            }
        }
    }
    None
}

/// A canned minimal OK response.
pub const SIMPLE_OK: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";
