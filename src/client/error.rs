//! Error taxonomy of the HTTP client.

/// Errors reported by the HTTP client.
///
/// Four kinds share the enum:
///
/// - **Configuration** errors are returned synchronously from the facade or
///   from request preparation and never enter the state machine; the caller
///   must fix the parameters before retrying.
/// - **Transient** conditions ([`Error::TxBufFull`], [`Error::RxMoreData`],
///   [`Error::SockBusy`]) drive a retry on the next processing step and are
///   never surfaced to the application.
/// - **Protocol violations** are fatal to the current transaction but not to
///   the process.
/// - **Transport failures** map socket faults onto the transaction.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    // ---- configuration ----
    /// The object is currently processing a transaction and cannot be
    /// reconfigured or reopened.
    InUse,
    /// The connection is not open.
    NotOpen,
    /// The connection's pending-request queue is full.
    QueueFull,
    /// The shared buffer can never hold one atomic wire element (or is below
    /// the minimum size). The connection must be reconfigured with a larger
    /// buffer.
    BufTooSmall,
    /// The hostname is empty or otherwise unusable.
    HostnameInvalid,
    /// The resource path is empty.
    PathInvalid,
    /// A body was supplied without a usable length and chunked transfer was
    /// not requested, or a declared length is zero.
    ContentLenInvalid,
    /// The declared content type does not match the body kind.
    ContentTypeInvalid,
    /// The extra-header table contains a field owned by the client core
    /// (`Host`, `Connection`, `Content-Type`, `Content-Length`,
    /// `Transfer-Encoding`).
    HdrUnauthorized,
    /// A form field is malformed (empty key or filename, wrong field kind
    /// for the form content type).
    FormFieldInvalid,
    /// A body source misbehaved (produced no data for a chunk, overran its
    /// declared length, or finished early).
    BodyInvalid,

    // ---- transient ----
    /// The transmit side of the shared buffer is full; drain and retry.
    TxBufFull,
    /// More received bytes are required before parsing can continue.
    RxMoreData,
    /// The socket cannot make progress right now.
    SockBusy,

    // ---- protocol violations ----
    /// The response status line is malformed.
    RespFormatInvalid,
    /// The response protocol version is not HTTP/1.1.
    RespProtocolVerInvalid,
    /// The response status code is outside the accepted set.
    RespStatusCodeInvalid,
    /// A response header line is malformed.
    RespHdrMalformed,
    /// A response header carries a value the client cannot accept.
    RespHdrInvalid,
    /// The response `Content-Type` is unknown.
    RespContentTypeInvalid,
    /// The response `Content-Length` is invalid.
    RespContentLenInvalid,
    /// Chunked-body framing is invalid.
    RespChunkInvalid,

    // ---- transport failures ----
    /// The peer closed the connection mid-transaction.
    SockClosed,
    /// Connecting to the server failed.
    SockConnectFailed,
    /// An unrecoverable socket fault.
    SockFatal,

    // ---- internal ----
    /// The state machine was driven from an unexpected state.
    InvalidState,
}

impl Error {
    /// Whether the condition only means "retry on the next step".
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TxBufFull | Error::RxMoreData | Error::SockBusy)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::InUse => defmt::write!(f, "InUse"),
            Error::NotOpen => defmt::write!(f, "NotOpen"),
            Error::QueueFull => defmt::write!(f, "QueueFull"),
            Error::BufTooSmall => defmt::write!(f, "BufTooSmall"),
            Error::HostnameInvalid => defmt::write!(f, "HostnameInvalid"),
            Error::PathInvalid => defmt::write!(f, "PathInvalid"),
            Error::ContentLenInvalid => defmt::write!(f, "ContentLenInvalid"),
            Error::ContentTypeInvalid => defmt::write!(f, "ContentTypeInvalid"),
            Error::HdrUnauthorized => defmt::write!(f, "HdrUnauthorized"),
            Error::FormFieldInvalid => defmt::write!(f, "FormFieldInvalid"),
            Error::BodyInvalid => defmt::write!(f, "BodyInvalid"),
            Error::TxBufFull => defmt::write!(f, "TxBufFull"),
            Error::RxMoreData => defmt::write!(f, "RxMoreData"),
            Error::SockBusy => defmt::write!(f, "SockBusy"),
            Error::RespFormatInvalid => defmt::write!(f, "RespFormatInvalid"),
            Error::RespProtocolVerInvalid => defmt::write!(f, "RespProtocolVerInvalid"),
            Error::RespStatusCodeInvalid => defmt::write!(f, "RespStatusCodeInvalid"),
            Error::RespHdrMalformed => defmt::write!(f, "RespHdrMalformed"),
            Error::RespHdrInvalid => defmt::write!(f, "RespHdrInvalid"),
            Error::RespContentTypeInvalid => defmt::write!(f, "RespContentTypeInvalid"),
            Error::RespContentLenInvalid => defmt::write!(f, "RespContentLenInvalid"),
            Error::RespChunkInvalid => defmt::write!(f, "RespChunkInvalid"),
            Error::SockClosed => defmt::write!(f, "SockClosed"),
            Error::SockConnectFailed => defmt::write!(f, "SockConnectFailed"),
            Error::SockFatal => defmt::write!(f, "SockFatal"),
            Error::InvalidState => defmt::write!(f, "InvalidState"),
        }
    }
}

/// Why a connection was (or is being) closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseStatus {
    /// The connection is not closing.
    #[default]
    None,
    /// The connection is not persistent and closes after each transaction.
    NotPersistent,
    /// The server closed its side of the connection.
    Server,
    /// An internal or protocol fault forced the close.
    Internal,
    /// The application requested the close.
    App,
}

#[cfg(feature = "defmt")]
impl defmt::Format for CloseStatus {
    fn format(&self, f: defmt::Formatter) {
        match self {
            CloseStatus::None => defmt::write!(f, "None"),
            CloseStatus::NotPersistent => defmt::write!(f, "NotPersistent"),
            CloseStatus::Server => defmt::write!(f, "Server"),
            CloseStatus::Internal => defmt::write!(f, "Internal"),
            CloseStatus::App => defmt::write!(f, "App"),
        }
    }
}
