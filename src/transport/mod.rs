//! A transport abstraction layer for the HTTP client
//!
//! The client never talks to an operating system or a TCP/IP stack directly.
//! Everything it needs from the outside world is expressed by two traits:
//! [`Connect`], which opens a byte stream to a `host:port`, and [`Socket`],
//! the non-blocking stream itself. Any stack able to provide these (a BSD
//! socket, smoltcp, a cellular modem AT channel, a loopback mock in tests)
//! can carry HTTP transactions.
//!
//! All socket operations are non-blocking: when no progress can be made the
//! implementation returns [`Error::WouldBlock`] and the caller retries on a
//! later tick. [`Socket::poll`] is the readiness check used by drivers to
//! sleep until a socket becomes actionable instead of spinning.

#![allow(missing_docs)]
#![deny(unsafe_code)]

/// Common error types for transport operations
pub mod error;

pub use error::Error;

/// What a caller is about to do with a socket, for readiness polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interest {
    /// Wait for the socket to become readable.
    pub read: bool,
    /// Wait for the socket to become writable.
    pub write: bool,
}

impl Interest {
    /// Readiness for receiving.
    pub const READ: Interest = Interest { read: true, write: false };
    /// Readiness for sending.
    pub const WRITE: Interest = Interest { read: false, write: true };
}

/// The outcome of a readiness poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    /// Data can be received without blocking.
    pub readable: bool,
    /// Data can be sent without blocking.
    pub writable: bool,
    /// The socket is in an error state.
    pub error: bool,
}

impl Readiness {
    /// Whether any polled condition is set.
    pub fn any(&self) -> bool {
        self.readable || self.writable || self.error
    }
}

/// TLS parameters forwarded verbatim to the transport.
///
/// The client does not implement TLS; a transport that does can use the
/// expected peer name during certificate validation. When `common_name` is
/// `None` the transport should fall back to the hostname given to
/// [`Connect::connect`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureCfg<'a> {
    /// Expected certificate common name, if different from the hostname.
    pub common_name: Option<&'a str>,
}

/// Socket policy applied while establishing a connection.
#[derive(Debug, Clone, Copy)]
pub struct ConnectCfg<'a> {
    /// Maximum time to wait for the TCP handshake, in milliseconds.
    pub connect_timeout_ms: u32,
    /// Connection inactivity timeout, in seconds.
    pub inactivity_timeout_s: u16,
    /// Enable TCP keep-alive probes.
    pub keep_alive: bool,
    /// TLS parameters; `None` for a plaintext connection.
    pub secure: Option<SecureCfg<'a>>,
}

impl Default for ConnectCfg<'_> {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 2000,
            inactivity_timeout_s: 60,
            keep_alive: false,
            secure: None,
        }
    }
}

/// A non-blocking byte stream to an HTTP server.
pub trait Socket {
    /// Send bytes from `data`.
    ///
    /// Returns the number of bytes accepted by the stack, which may be less
    /// than `data.len()`. Returns [`Error::WouldBlock`] when nothing can be
    /// sent right now and [`Error::Closed`] once the peer connection is gone.
    fn send(&mut self, data: &[u8]) -> Result<usize, Error>;

    /// Receive bytes into `buf`.
    ///
    /// Returns the number of bytes read (always `> 0`),
    /// [`Error::WouldBlock`] when no data is available yet, or
    /// [`Error::Closed`] once the peer has shut the stream down.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    /// Wait up to `timeout_ms` for the socket to satisfy `interest`.
    ///
    /// A zero timeout is a pure readiness probe.
    fn poll(&mut self, interest: Interest, timeout_ms: u32) -> Result<Readiness, Error>;

    /// Whether the peer has half-closed the stream (TCP FIN received) while
    /// the local side may still be mid-transaction.
    fn is_rx_closed(&mut self) -> bool;

    /// Close the connection.
    fn close(self) -> Result<(), Error>;
}

/// A connector able to open sockets toward HTTP servers.
pub trait Connect {
    /// Associated socket type
    type Socket: Socket;

    /// Resolve `hostname`, connect to `port`, and apply the socket policy in
    /// `cfg`. The returned socket must be in non-blocking mode.
    fn connect(
        &mut self,
        hostname: &str,
        port: u16,
        cfg: &ConnectCfg<'_>,
    ) -> Result<Self::Socket, Error>;
}
