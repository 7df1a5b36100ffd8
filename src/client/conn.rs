//! Connection state machine.
//!
//! A [`Conn`] owns one caller-provided buffer shared by the transmit and
//! receive paths, the FIFO of pending requests, and every cursor and resume
//! index a suspended transaction needs. [`Conn::process`] advances the
//! machine by one step; it never blocks. The request encoder and response
//! decoder plug into the `Req*`/`Resp*` state families and report transient
//! conditions (buffer full, more data required, socket busy) by returning,
//! so the same step can be retried on the next tick.

use heapless::Deque;

use crate::http::{DFLT_PORT, DFLT_PORT_SECURE, HeaderField, codec};
use crate::transport::{Connect, ConnectCfg, Error as SockError, Interest, Socket};

use super::error::{CloseStatus, Error};
use super::form::{Body, ExtHeader, QueryPair};
use super::{BUF_LEN_MIN, EventHandler, REQ_QUEUE_CAP, Request, Response, req, resp};

/// States of a connection.
///
/// The request and response families are driven by the encoder and decoder
/// sub-machines; the remaining states manage the connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ConnState {
    None,
    Connect,
    ParamValidate,
    ReqLineMethod,
    ReqLineUri,
    ReqLineQuery,
    ReqLineProtoVer,
    ReqHdrHost,
    ReqHdrConn,
    ReqHdrContentType,
    ReqHdrTransferEncoding,
    ReqHdrContentLen,
    ReqHdrExt,
    ReqHdrLast,
    ReqBody,
    ReqBodyData,
    ReqChunkSize,
    ReqChunkData,
    ReqChunkEnd,
    ReqFormApp,
    ReqMultipartBoundary,
    ReqMultipartDispo,
    ReqMultipartType,
    ReqMultipartData,
    ReqMultipartDataEnd,
    ReqMultipartBoundaryEnd,
    ReqEnd,
    RespInit,
    RespStatusLine,
    RespHdr,
    RespBody,
    RespChunkSize,
    RespChunkData,
    RespChunkCrlf,
    RespChunkLast,
    RespCompleted,
    Completed,
    Err,
    Close,
}

impl ConnState {
    pub(crate) fn is_req_line(&self) -> bool {
        matches!(
            self,
            ConnState::ReqLineMethod
                | ConnState::ReqLineUri
                | ConnState::ReqLineQuery
                | ConnState::ReqLineProtoVer
        )
    }

    pub(crate) fn is_req_hdr(&self) -> bool {
        matches!(
            self,
            ConnState::ReqHdrHost
                | ConnState::ReqHdrConn
                | ConnState::ReqHdrContentType
                | ConnState::ReqHdrTransferEncoding
                | ConnState::ReqHdrContentLen
                | ConnState::ReqHdrExt
                | ConnState::ReqHdrLast
        )
    }

    pub(crate) fn is_req_body(&self) -> bool {
        matches!(
            self,
            ConnState::ReqBody
                | ConnState::ReqBodyData
                | ConnState::ReqChunkSize
                | ConnState::ReqChunkData
                | ConnState::ReqChunkEnd
                | ConnState::ReqFormApp
                | ConnState::ReqMultipartBoundary
                | ConnState::ReqMultipartDispo
                | ConnState::ReqMultipartType
                | ConnState::ReqMultipartData
                | ConnState::ReqMultipartDataEnd
                | ConnState::ReqMultipartBoundaryEnd
        )
    }

    /// Whether the connection is encoding/transmitting a request.
    pub fn is_req(&self) -> bool {
        self.is_req_line() || self.is_req_hdr() || self.is_req_body() || *self == ConnState::ReqEnd
    }

    /// Whether the connection is receiving/parsing a response.
    pub fn is_resp(&self) -> bool {
        matches!(
            self,
            ConnState::RespInit
                | ConnState::RespStatusLine
                | ConnState::RespHdr
                | ConnState::RespBody
                | ConnState::RespChunkSize
                | ConnState::RespChunkData
                | ConnState::RespChunkCrlf
                | ConnState::RespChunkLast
                | ConnState::RespCompleted
        )
    }
}

/// Where the bytes currently queued for transmission live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TxSrc {
    /// The shared buffer, starting at `sent`.
    Buf { sent: usize },
    /// The active request's URI, starting at `pos`. Used when the URI is
    /// longer than the buffer.
    Uri { pos: usize },
    /// The active request's body slice, starting at `pos`.
    Body { pos: usize },
}

/// Transmit-side cursor state.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TxState {
    pub src: TxSrc,
    /// Bytes not yet handed to the socket.
    pub pending: usize,
}

impl Default for TxState {
    fn default() -> Self {
        Self { src: TxSrc::Buf { sent: 0 }, pending: 0 }
    }
}

impl TxState {
    /// The encoder may only append while the buffer write index is valid:
    /// either nothing is pending, or the pending bytes sit at the start of
    /// the shared buffer with no partial send in flight.
    pub fn can_append(&self) -> bool {
        self.pending == 0 || matches!(self.src, TxSrc::Buf { sent: 0 })
    }

    pub fn write_index(&self) -> usize {
        match self.src {
            TxSrc::Buf { sent } => sent + self.pending,
            _ => 0,
        }
    }
}

/// Receive-side cursor state.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RxState {
    /// Offset of the first unconsumed received byte.
    pub start: usize,
    /// Unconsumed received bytes.
    pub len: usize,
    /// Body bytes delivered so far (content-length mode).
    pub body_total: usize,
    /// Bytes remaining in the current chunk (chunked mode).
    pub chunk_rem: usize,
}

/// Per-transaction scratch: resume indices and header-injection flags,
/// reset before each request.
#[derive(Default)]
pub(crate) struct ReqScratch<'a> {
    pub query_ix: usize,
    pub query_pending: Option<QueryPair<'a>>,
    pub query_begun: bool,
    pub hdr_ix: usize,
    pub hdr_pending: Option<ExtHeader<'a>>,
    pub form_ix: usize,
    pub data_off: usize,
    pub chunk_len: usize,
    pub chunk_last: bool,
    /// Value of the Content-Length header, when one is emitted.
    pub content_len: usize,
    /// Body bytes still to be queued for transmission.
    pub content_rem: usize,
    pub hdr_host: bool,
    pub hdr_conn: bool,
    pub hdr_content_type: bool,
    pub hdr_transfer_enc: bool,
    pub hdr_content_len: bool,
}

/// One HTTP connection: socket, shared buffer, pending-request FIFO and all
/// per-transaction state.
pub struct Conn<'a, S: Socket> {
    pub(crate) sock: Option<S>,
    pub(crate) state: ConnState,
    pub(crate) buf: &'a mut [u8],
    pub(crate) hostname: &'a str,
    pub(crate) port: u16,
    pub(crate) cfg: ConnectCfg<'a>,
    pub(crate) persistent: bool,
    pub(crate) connected: bool,
    pub(crate) in_use: bool,
    pub(crate) to_close: bool,
    pub(crate) err: Option<Error>,
    pub(crate) close_status: CloseStatus,
    pub(crate) queue: Deque<Request<'a>, REQ_QUEUE_CAP>,
    pub(crate) resp: Response,
    pub(crate) resp_chunked: bool,
    pub(crate) rx_more_data: bool,
    pub(crate) resp_complete_ok: bool,
    pub(crate) tx: TxState,
    pub(crate) rx: RxState,
    pub(crate) scratch: ReqScratch<'a>,
}

impl<'a, S: Socket> Conn<'a, S> {
    /// Create a connection around a caller-owned buffer.
    ///
    /// The buffer is shared by the transmit and receive paths and bounds the
    /// largest atomic wire element (header line, query pair, form field
    /// headers) the connection can handle.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            sock: None,
            state: ConnState::None,
            buf,
            hostname: "",
            port: DFLT_PORT,
            cfg: ConnectCfg::default(),
            persistent: false,
            connected: false,
            in_use: false,
            to_close: false,
            err: None,
            close_status: CloseStatus::None,
            queue: Deque::new(),
            resp: Response::default(),
            resp_chunked: false,
            rx_more_data: false,
            resp_complete_ok: false,
            tx: TxState::default(),
            rx: RxState::default(),
            scratch: ReqScratch::default(),
        }
    }

    /// Reset the connection to its defaults. Fails while a transaction or
    /// open socket is using it.
    pub fn clear(&mut self) -> Result<(), Error> {
        if self.in_use {
            return Err(Error::InUse);
        }
        self.sock = None;
        self.state = ConnState::None;
        self.hostname = "";
        self.port = DFLT_PORT;
        self.cfg = ConnectCfg::default();
        self.persistent = false;
        self.connected = false;
        self.to_close = false;
        self.err = None;
        self.close_status = CloseStatus::None;
        while self.queue.pop_front().is_some() {}
        self.resp = Response::default();
        self.trans_param_reset();
        Ok(())
    }

    /// Bind the connection parameters and schedule the transport connect.
    ///
    /// The socket is opened on the next [`Conn::process`] step. When a
    /// [`crate::transport::SecureCfg`] is present and `port` is the default
    /// HTTP port, the default HTTPS port is used instead.
    pub fn open(
        &mut self,
        hostname: &'a str,
        port: u16,
        cfg: ConnectCfg<'a>,
        persistent: bool,
    ) -> Result<(), Error> {
        if self.in_use {
            return Err(Error::InUse);
        }
        if self.buf.len() < BUF_LEN_MIN {
            return Err(Error::BufTooSmall);
        }
        if hostname.is_empty() {
            return Err(Error::HostnameInvalid);
        }
        self.hostname = hostname;
        self.port = if cfg.secure.is_some() && port == DFLT_PORT { DFLT_PORT_SECURE } else { port };
        self.cfg = cfg;
        self.persistent = persistent;
        self.err = None;
        self.close_status = CloseStatus::None;
        self.in_use = true;
        self.state = ConnState::Connect;
        Ok(())
    }

    /// Append a request to the connection's FIFO.
    ///
    /// Requests are processed strictly in submission order; only the head of
    /// the queue is ever active.
    pub fn submit(&mut self, req: Request<'a>) -> Result<(), Error> {
        if !self.in_use {
            return Err(Error::NotOpen);
        }
        self.queue.push_back(req).map_err(|_| Error::QueueFull)
    }

    /// Ask the connection to close. Any active or queued request is failed
    /// out with a socket-closed error on the next processing steps.
    pub fn request_close(&mut self) -> Result<(), Error> {
        if !self.in_use {
            return Err(Error::NotOpen);
        }
        self.close_status = CloseStatus::App;
        self.state = ConnState::Close;
        Ok(())
    }

    /// Current state of the connection machine.
    pub fn state(&self) -> ConnState {
        self.state
    }

    /// Error recorded for the current/last transaction, if any.
    pub fn last_err(&self) -> Option<Error> {
        self.err
    }

    /// Why the connection closed (or is about to).
    pub fn close_status(&self) -> CloseStatus {
        self.close_status
    }

    /// Whether the transport connection is established.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Whether the connection is bound to a session (opened and not yet
    /// closed).
    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    /// The response decoded for the most recent transaction.
    pub fn response(&self) -> &Response {
        &self.resp
    }

    /// Number of requests waiting in the FIFO (including the active one).
    pub fn pending_requests(&self) -> usize {
        self.queue.len()
    }

    /// Whether the last transaction's response was decoded to completion
    /// without error.
    pub fn response_complete_ok(&self) -> bool {
        self.resp_complete_ok
    }

    /// Advance the connection by one state-machine step.
    ///
    /// Never blocks: socket would-block conditions, full transmit buffers
    /// and incomplete received data all leave the state unchanged for the
    /// next call. Events are delivered through `h` as they occur.
    pub fn process<N, H>(&mut self, net: &mut N, h: &mut H)
    where
        N: Connect<Socket = S>,
        H: EventHandler,
    {
        match self.state {
            ConnState::None => {}
            ConnState::Connect => self.step_connect(net, h),
            ConnState::ParamValidate => self.step_validate(),
            ConnState::Err => {
                if let Some(e) = self.err {
                    h.on_trans_err(e);
                }
                self.state = ConnState::Completed;
            }
            ConnState::Completed => self.step_completed(h),
            ConnState::Close => self.step_close(h),
            s if s.is_req() => {
                if let Err(e) = req::process(self) {
                    self.fail_trans(e);
                }
            }
            s if s.is_resp() => {
                if let Err(e) = resp::process(self, h) {
                    self.resp_complete_ok = false;
                    self.fail_trans(e);
                }
            }
            _ => {}
        }
    }

    /// Sleep until the socket is actionable for the current state family,
    /// at most `timeout_ms`. Used by blocking drivers between steps.
    pub fn poll_ready(&mut self, timeout_ms: u32) {
        let interest = if self.state.is_resp() { Interest::READ } else { Interest::WRITE };
        if let Some(s) = self.sock.as_mut() {
            let _ = s.poll(interest, timeout_ms);
        }
    }

    fn step_connect<N, H>(&mut self, net: &mut N, h: &mut H)
    where
        N: Connect<Socket = S>,
        H: EventHandler,
    {
        if self.connected {
            self.state = ConnState::ParamValidate;
            return;
        }
        match net.connect(self.hostname, self.port, &self.cfg) {
            Ok(sock) => {
                self.sock = Some(sock);
                self.connected = true;
                self.state = ConnState::ParamValidate;
                h.on_connect(true);
            }
            Err(_) => {
                self.err = Some(Error::SockConnectFailed);
                self.close_status = CloseStatus::None;
                self.state = ConnState::None;
                self.in_use = false;
                h.on_connect(false);
            }
        }
    }

    fn step_validate(&mut self) {
        let half_closed = match self.sock.as_mut() {
            Some(s) => s.is_rx_closed(),
            None => true,
        };
        if half_closed {
            self.err = None;
            self.resp_complete_ok = false;
            self.close_status = CloseStatus::Server;
            self.state = ConnState::Completed;
            return;
        }
        if self.queue.is_empty() {
            return;
        }
        self.trans_param_reset();
        match req::prepare(self) {
            Ok(()) => self.state = ConnState::ReqLineMethod,
            Err(e) => {
                self.err = Some(e);
                self.close_status = CloseStatus::None;
                self.state = ConnState::Err;
            }
        }
    }

    fn step_completed<H: EventHandler>(&mut self, h: &mut H) {
        if self.queue.pop_front().is_some() {
            h.on_trans_complete(&self.resp, self.resp_complete_ok);
        }
        if self.must_close() {
            self.state = ConnState::Close;
        } else {
            self.state = ConnState::ParamValidate;
        }
    }

    fn step_close<H: EventHandler>(&mut self, h: &mut H) {
        while self.queue.pop_front().is_some() {
            h.on_trans_complete(&self.resp, false);
            h.on_trans_err(Error::SockClosed);
        }
        self.connected = false;
        self.in_use = false;
        if let Some(s) = self.sock.take() {
            let _ = s.close();
        }
        h.on_close(self.close_status);
        self.state = ConnState::None;
    }

    fn fail_trans(&mut self, e: Error) {
        self.err = Some(e);
        self.close_status =
            if e == Error::SockClosed { CloseStatus::Server } else { CloseStatus::Internal };
        self.state = ConnState::Err;
    }

    /// Clear everything scoped to a single transaction: cursors, resume
    /// indices, per-request flags.
    pub(crate) fn trans_param_reset(&mut self) {
        self.err = None;
        self.close_status = CloseStatus::None;
        self.to_close = false;
        self.tx = TxState::default();
        self.rx = RxState::default();
        self.scratch = ReqScratch::default();
        self.resp_chunked = false;
        self.rx_more_data = false;
        self.resp_complete_ok = false;
    }

    /// Whether the connection must close after the current transaction.
    pub(crate) fn must_close(&self) -> bool {
        (self.to_close && self.connected) || self.close_status != CloseStatus::None
    }

    /// Hand pending transmit bytes to the socket. Returns `Ok(true)` once
    /// nothing is pending.
    pub(crate) fn tx_drain(&mut self) -> Result<bool, Error> {
        if self.tx.pending == 0 {
            return Ok(true);
        }
        let sock = self.sock.as_mut().ok_or(Error::InvalidState)?;
        let data: &[u8] = match self.tx.src {
            TxSrc::Buf { sent } => &self.buf[sent..sent + self.tx.pending],
            TxSrc::Uri { pos } => {
                let req = self.queue.front().ok_or(Error::InvalidState)?;
                &req.uri.as_bytes()[pos..pos + self.tx.pending]
            }
            TxSrc::Body { pos } => {
                let req = self.queue.front().ok_or(Error::InvalidState)?;
                match &req.body {
                    Body::Slice { data, .. } => &data[pos..pos + self.tx.pending],
                    _ => return Err(Error::InvalidState),
                }
            }
        };
        let n = match sock.send(data) {
            Ok(n) => n,
            Err(SockError::WouldBlock) => return Ok(false),
            Err(SockError::Closed) => return Err(Error::SockClosed),
            Err(_) => return Err(Error::SockFatal),
        };
        self.tx.pending -= n;
        match &mut self.tx.src {
            TxSrc::Buf { sent } => *sent += n,
            TxSrc::Uri { pos } | TxSrc::Body { pos } => *pos += n,
        }
        if self.tx.pending == 0 {
            self.tx = TxState::default();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Pull received bytes from the socket into the shared buffer.
    ///
    /// Unconsumed data is first compacted to the start of the buffer, then
    /// the free tail is filled. Returns `Ok(true)` when the parser has data
    /// to work with (new or already buffered), `Ok(false)` on would-block.
    pub(crate) fn rx_fill(&mut self) -> Result<bool, Error> {
        let sock = self.sock.as_mut().ok_or(Error::InvalidState)?;
        if self.rx.start > 0 && self.rx.len > 0 {
            self.buf.copy_within(self.rx.start..self.rx.start + self.rx.len, 0);
        }
        self.rx.start = 0;
        let cap = self.buf.len() - self.tx.pending;
        if self.rx.len >= cap {
            return Ok(true);
        }
        match sock.receive(&mut self.buf[self.rx.len..cap]) {
            Ok(0) => Err(Error::SockClosed),
            Ok(n) => {
                self.rx.len += n;
                Ok(true)
            }
            Err(SockError::WouldBlock) => Ok(false),
            Err(SockError::Closed) => Err(Error::SockClosed),
            Err(_) => Err(Error::SockFatal),
        }
    }

    /// The unconsumed received bytes.
    pub(crate) fn rx_window(&self) -> &[u8] {
        &self.buf[self.rx.start..self.rx.start + self.rx.len]
    }

    /// Mark `n` received bytes as consumed.
    pub(crate) fn rx_consume(&mut self, n: usize) {
        self.rx.start += n;
        self.rx.len -= n;
    }
}

/// Append-side view of the shared buffer used by the request encoder.
///
/// Centralizes the two-level size check: an element larger than the whole
/// buffer is a fatal configuration error, one larger than the remaining
/// space asks the caller to flush and retry.
pub(crate) struct TxWriter<'w> {
    buf: &'w mut [u8],
    tx: &'w mut TxState,
}

impl<'w> TxWriter<'w> {
    pub fn new(buf: &'w mut [u8], tx: &'w mut TxState) -> Self {
        debug_assert!(tx.can_append());
        Self { buf, tx }
    }

    pub fn cap(&self) -> usize {
        self.buf.len()
    }

    pub fn index(&self) -> usize {
        self.tx.write_index()
    }

    pub fn rem(&self) -> usize {
        self.cap() - self.index()
    }

    pub fn pending(&self) -> usize {
        self.tx.pending
    }

    pub fn check_atomic(&self, need: usize) -> Result<(), Error> {
        if need > self.cap() {
            return Err(Error::BufTooSmall);
        }
        if need > self.rem() {
            return Err(Error::TxBufFull);
        }
        Ok(())
    }

    pub fn push(&mut self, bytes: &[u8]) {
        let at = self.index();
        self.buf[at..at + bytes.len()].copy_from_slice(bytes);
        self.tx.pending += bytes.len();
    }

    pub fn push_byte(&mut self, b: u8) {
        let at = self.index();
        self.buf[at] = b;
        self.tx.pending += 1;
    }

    /// Percent-encode `src` at the write index. Space was checked by the
    /// caller as part of the surrounding atomic element.
    pub fn push_url_encoded(&mut self, src: &[u8]) -> Result<(), Error> {
        let at = self.index();
        let n = codec::url_encode(src, &mut self.buf[at..]).map_err(|_| Error::TxBufFull)?;
        self.tx.pending += n;
        Ok(())
    }

    /// Write a `Name: value` header line.
    pub fn header(&mut self, field: HeaderField, value: &[u8], crlf: bool) -> Result<(), Error> {
        let cap = self.cap();
        let at = self.index();
        let n = codec::header_line(&mut self.buf[at..], cap, field, value, crlf).map_err(|e| {
            match e {
                codec::SizeError::Capacity => Error::BufTooSmall,
                codec::SizeError::Space => Error::TxBufFull,
            }
        })?;
        self.tx.pending += n;
        Ok(())
    }

    /// The uncommitted tail of the buffer, starting `skip` bytes past the
    /// write index. Bytes written there become pending via
    /// [`TxWriter::commit`].
    pub fn tail(&mut self, skip: usize) -> &mut [u8] {
        let at = self.index() + skip;
        &mut self.buf[at..]
    }

    /// Account for `n` bytes written directly into [`TxWriter::tail`].
    pub fn commit(&mut self, n: usize) {
        self.tx.pending += n;
    }
}
