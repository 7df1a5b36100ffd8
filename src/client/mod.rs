//! HTTP/1.1 client core.
//!
//! The non-blocking heart of the crate is [`Conn`]: one connection object
//! owning a caller-provided buffer, a FIFO of pending [`Request`]s and the
//! state machine that streams them out and parses the responses back in.
//! [`Client`] wraps it with blocking convenience calls for applications that
//! can spin on a socket; [`Runner`] drives several connections
//! cooperatively, one state-machine step per tick.
//!
//! Decoded results arrive two ways: the [`Response`] value carries the
//! status line and entity headers, while body bytes stream through
//! [`EventHandler::on_body`] as they are received, so a response never has
//! to fit in memory.

mod conn;
mod req;
mod resp;
mod runner;

/// Error and close-status types of the client.
pub mod error;

/// Request body, query-string and extra-header source types.
pub mod form;

pub use conn::{Conn, ConnState};
pub use error::{CloseStatus, Error};
pub use form::{
    BOUNDARY, Body, BodySource, ExtHeader, FormField, HeaderSource, Pulled, QueryPair,
    QuerySource, SliceSource, SourceError,
};
pub use runner::Runner;

use crate::http::{ContentType, HeaderField, Method, ProtocolVer, StatusCode};
use crate::transport::{Connect, ConnectCfg};

/// Smallest shared buffer a connection accepts.
pub const BUF_LEN_MIN: usize = 256;

/// Pending requests one connection can hold (including the active one).
pub const REQ_QUEUE_CAP: usize = 4;

/// Readiness-poll timeout used between steps by the blocking calls, in
/// milliseconds.
pub const SEL_TIMEOUT_MS: u32 = 1;

/// The decoded result of one request.
///
/// Fields are populated as parsing advances and are only meaningful once the
/// transaction completes successfully.
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// Protocol version of the response (always HTTP/1.1 when accepted).
    pub protocol_ver: Option<ProtocolVer>,
    /// Decoded status code.
    pub status: Option<StatusCode>,
    /// Canonical reason phrase for the status code.
    pub reason: &'static str,
    /// Declared content type, when present and recognized.
    pub content_type: Option<ContentType>,
    /// Declared content length, when present.
    pub content_len: Option<usize>,
}

/// Application hooks for connection and transaction events.
///
/// All hooks have empty defaults; implement only what the application needs.
/// Hooks are invoked from within [`Conn::process`], on whichever thread (or
/// loop) drives the connection.
pub trait EventHandler {
    /// The transport connect finished.
    fn on_connect(&mut self, ok: bool) {
        let _ = ok;
    }

    /// A response header outside the set interpreted by the core was
    /// received.
    fn on_header(&mut self, field: HeaderField, value: &[u8]) {
        let _ = (field, value);
    }

    /// A run of response body bytes arrived. `last` is set exactly once, on
    /// the final delivery. Returns how many bytes were consumed; bytes not
    /// consumed are offered again on the next step.
    fn on_body(&mut self, content_type: Option<ContentType>, data: &[u8], last: bool) -> usize {
        let _ = (content_type, last);
        data.len()
    }

    /// The active transaction finished; `ok` reflects whether the response
    /// was decoded to completion.
    fn on_trans_complete(&mut self, resp: &Response, ok: bool) {
        let _ = (resp, ok);
    }

    /// The active transaction failed.
    fn on_trans_err(&mut self, err: Error) {
        let _ = err;
    }

    /// The connection closed.
    fn on_close(&mut self, status: CloseStatus) {
        let _ = status;
    }
}

/// An [`EventHandler`] that ignores every event.
#[derive(Debug, Default)]
pub struct NullHandler;

impl EventHandler for NullHandler {}

/// One HTTP request: method, path, and the sources its variable parts are
/// drawn from. Built with [`RequestBuilder`], consumed by [`Conn::submit`].
pub struct Request<'a> {
    pub(crate) method: Method,
    pub(crate) uri: &'a str,
    pub(crate) query: QuerySource<'a>,
    pub(crate) headers: HeaderSource<'a>,
    pub(crate) body: Body<'a>,
    pub(crate) chunked: bool,
}

/// Builder for [`Request`].
pub struct RequestBuilder<'a> {
    method: Method,
    uri: &'a str,
    query: QuerySource<'a>,
    headers: HeaderSource<'a>,
    body: Body<'a>,
    chunked: bool,
}

impl<'a> RequestBuilder<'a> {
    /// Start a request with a method and resource path.
    pub fn new(method: Method, uri: &'a str) -> Self {
        Self {
            method,
            uri,
            query: QuerySource::None,
            headers: HeaderSource::None,
            body: Body::Empty,
            chunked: false,
        }
    }

    /// Attach a query-string table. Pairs are percent-encoded on the wire.
    pub fn query_table(mut self, table: &'a [QueryPair<'a>]) -> Self {
        self.query = QuerySource::Table(table);
        self
    }

    /// Attach a query-string iterator, pulled pair by pair while encoding.
    pub fn query_iter(mut self, iter: &'a mut dyn Iterator<Item = QueryPair<'a>>) -> Self {
        self.query = QuerySource::Iter(iter);
        self
    }

    /// Attach an extra-header table. The core-owned fields (`Host`,
    /// `Connection`, `Content-Type`, `Content-Length`, `Transfer-Encoding`)
    /// are rejected at send time.
    pub fn header_table(mut self, table: &'a [ExtHeader<'a>]) -> Self {
        self.headers = HeaderSource::Table(table);
        self
    }

    /// Attach an extra-header iterator.
    pub fn header_iter(mut self, iter: &'a mut dyn Iterator<Item = ExtHeader<'a>>) -> Self {
        self.headers = HeaderSource::Iter(iter);
        self
    }

    /// Attach a body.
    pub fn body(mut self, body: Body<'a>) -> Self {
        self.body = body;
        self
    }

    /// Use chunked transfer encoding for the body. Ignored for form bodies,
    /// whose exact size is always precomputed.
    pub fn chunked(mut self, enable: bool) -> Self {
        self.chunked = enable;
        self
    }

    /// Validate and build the request.
    pub fn build(self) -> Result<Request<'a>, Error> {
        if self.uri.is_empty() {
            return Err(Error::PathInvalid);
        }
        Ok(Request {
            method: self.method,
            uri: self.uri,
            query: self.query,
            headers: self.headers,
            body: self.body,
            chunked: self.chunked,
        })
    }
}

/// Blocking facade over the non-blocking connection core.
///
/// Owns the network connector and drives a [`Conn`]'s state machine in a
/// tight loop (with short readiness polls between steps) until the requested
/// operation completes. For cooperative operation use [`Conn::process`]
/// directly or a [`Runner`].
pub struct Client<N: Connect> {
    net: N,
}

impl<N: Connect> Client<N> {
    /// Wrap a network connector.
    pub fn new(net: N) -> Self {
        Self { net }
    }

    /// Access the wrapped connector.
    pub fn network_mut(&mut self) -> &mut N {
        &mut self.net
    }

    /// Open a connection and block until the transport connect resolves.
    ///
    /// `persistent` selects HTTP keep-alive; a non-persistent connection
    /// sends `Connection: close` with each request and closes after one
    /// transaction.
    pub fn open<'a, H: EventHandler>(
        &mut self,
        conn: &mut Conn<'a, N::Socket>,
        hostname: &'a str,
        port: u16,
        cfg: ConnectCfg<'a>,
        persistent: bool,
        h: &mut H,
    ) -> Result<(), Error> {
        conn.open(hostname, port, cfg, persistent)?;
        while !matches!(conn.state(), ConnState::ParamValidate | ConnState::None) {
            conn.process(&mut self.net, h);
        }
        if conn.state() == ConnState::None {
            Err(conn.last_err().unwrap_or(Error::SockConnectFailed))
        } else {
            Ok(())
        }
    }

    /// Submit a request and block until its transaction completes, returning
    /// the decoded response.
    ///
    /// Body bytes are streamed through `h.on_body` while the call runs.
    pub fn send<'a, H: EventHandler>(
        &mut self,
        conn: &mut Conn<'a, N::Socket>,
        req: Request<'a>,
        h: &mut H,
    ) -> Result<Response, Error> {
        conn.submit(req)?;
        loop {
            conn.poll_ready(SEL_TIMEOUT_MS);
            conn.process(&mut self.net, h);
            match conn.state() {
                ConnState::ParamValidate if conn.pending_requests() == 0 => break,
                ConnState::None => break,
                _ => {}
            }
        }
        if conn.response_complete_ok() {
            Ok(conn.response().clone())
        } else {
            Err(conn.last_err().unwrap_or(Error::SockClosed))
        }
    }

    /// Close a persistent connection and block until it is released.
    pub fn close<H: EventHandler>(
        &mut self,
        conn: &mut Conn<'_, N::Socket>,
        h: &mut H,
    ) -> Result<(), Error> {
        conn.request_close()?;
        while conn.state() != ConnState::None {
            conn.process(&mut self.net, h);
        }
        Ok(())
    }
}
