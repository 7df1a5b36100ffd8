//! Static HTTP/1.1 vocabulary shared by the encoder and the decoder.
//!
//! Every token the client emits or accepts on the wire comes from the closed
//! enums in this module: request methods, protocol versions, status codes
//! with their canonical reason phrases, content types, header field names and
//! the small value vocabularies of the `Connection` and `Transfer-Encoding`
//! headers. Lookups are table-driven and case-insensitive where the protocol
//! requires it; anything outside the tables is rejected or skipped by the
//! caller, never passed through verbatim.

pub mod auth;
pub mod codec;

/// End-of-line marker used throughout HTTP/1.1.
pub const CRLF: &[u8] = b"\r\n";

/// Default HTTP port.
pub const DFLT_PORT: u16 = 80;

/// Default HTTPS port.
pub const DFLT_PORT_SECURE: u16 = 443;

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `HEAD`
    Head,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `TRACE`
    Trace,
    /// `CONNECT`
    Connect,
    /// `OPTIONS`
    Options,
}

impl Method {
    /// Wire keyword for the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Head => "HEAD",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
        }
    }
}

/// HTTP protocol versions the parser can recognize.
///
/// Only [`ProtocolVer::Http11`] is accepted in responses; the older versions
/// exist so a downgraded peer is reported precisely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVer {
    /// `HTTP/0.9`
    Http09,
    /// `HTTP/1.0`
    Http10,
    /// `HTTP/1.1`
    Http11,
}

impl ProtocolVer {
    /// Wire form of the version token.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolVer::Http09 => "HTTP/0.9",
            ProtocolVer::Http10 => "HTTP/1.0",
            ProtocolVer::Http11 => "HTTP/1.1",
        }
    }

    /// Match the version token at the start of `s`.
    pub fn from_bytes(s: &[u8]) -> Option<ProtocolVer> {
        const VERSIONS: [ProtocolVer; 3] =
            [ProtocolVer::Http11, ProtocolVer::Http10, ProtocolVer::Http09];
        VERSIONS
            .into_iter()
            .find(|v| s.len() >= 8 && s[..8].eq_ignore_ascii_case(v.as_str().as_bytes()))
    }
}

/// The closed set of HTTP status codes the client accepts.
///
/// A response carrying a code outside this set fails the transaction with a
/// protocol error rather than being passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum StatusCode {
    Continue,
    SwitchingProtocols,
    Processing,
    EarlyHints,
    Ok,
    Created,
    Accepted,
    NonAuthoritativeInformation,
    NoContent,
    ResetContent,
    PartialContent,
    MultiStatus,
    AlreadyReported,
    ImUsed,
    MultipleChoices,
    MovedPermanently,
    Found,
    SeeOther,
    NotModified,
    UseProxy,
    SwitchProxy,
    TemporaryRedirect,
    PermanentRedirect,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    ProxyAuthenticationRequired,
    RequestTimeout,
    Conflict,
    Gone,
    LengthRequired,
    PreconditionFailed,
    RequestEntityTooLarge,
    RequestUriTooLong,
    UnsupportedMediaType,
    RequestedRangeNotSatisfiable,
    ExpectationFailed,
    MisdirectedRequest,
    UnprocessableEntity,
    Locked,
    FailedDependency,
    UpgradeRequired,
    PreconditionRequired,
    TooManyRequests,
    RequestHeaderFieldsTooLarge,
    UnavailableForLegalReasons,
    InternalServerError,
    NotImplemented,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    HttpVersionNotSupported,
    VariantAlsoNegotiates,
    InsufficientStorage,
    LoopDetected,
    NotExtended,
    NetworkAuthenticationRequired,
}

impl StatusCode {
    /// Numeric value of the status code.
    pub fn code(&self) -> u16 {
        match self {
            StatusCode::Continue => 100,
            StatusCode::SwitchingProtocols => 101,
            StatusCode::Processing => 102,
            StatusCode::EarlyHints => 103,
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::Accepted => 202,
            StatusCode::NonAuthoritativeInformation => 203,
            StatusCode::NoContent => 204,
            StatusCode::ResetContent => 205,
            StatusCode::PartialContent => 206,
            StatusCode::MultiStatus => 207,
            StatusCode::AlreadyReported => 208,
            StatusCode::ImUsed => 226,
            StatusCode::MultipleChoices => 300,
            StatusCode::MovedPermanently => 301,
            StatusCode::Found => 302,
            StatusCode::SeeOther => 303,
            StatusCode::NotModified => 304,
            StatusCode::UseProxy => 305,
            StatusCode::SwitchProxy => 306,
            StatusCode::TemporaryRedirect => 307,
            StatusCode::PermanentRedirect => 308,
            StatusCode::BadRequest => 400,
            StatusCode::Unauthorized => 401,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::NotAcceptable => 406,
            StatusCode::ProxyAuthenticationRequired => 407,
            StatusCode::RequestTimeout => 408,
            StatusCode::Conflict => 409,
            StatusCode::Gone => 410,
            StatusCode::LengthRequired => 411,
            StatusCode::PreconditionFailed => 412,
            StatusCode::RequestEntityTooLarge => 413,
            StatusCode::RequestUriTooLong => 414,
            StatusCode::UnsupportedMediaType => 415,
            StatusCode::RequestedRangeNotSatisfiable => 416,
            StatusCode::ExpectationFailed => 417,
            StatusCode::MisdirectedRequest => 421,
            StatusCode::UnprocessableEntity => 422,
            StatusCode::Locked => 423,
            StatusCode::FailedDependency => 424,
            StatusCode::UpgradeRequired => 426,
            StatusCode::PreconditionRequired => 428,
            StatusCode::TooManyRequests => 429,
            StatusCode::RequestHeaderFieldsTooLarge => 431,
            StatusCode::UnavailableForLegalReasons => 451,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
            StatusCode::BadGateway => 502,
            StatusCode::ServiceUnavailable => 503,
            StatusCode::GatewayTimeout => 504,
            StatusCode::HttpVersionNotSupported => 505,
            StatusCode::VariantAlsoNegotiates => 506,
            StatusCode::InsufficientStorage => 507,
            StatusCode::LoopDetected => 508,
            StatusCode::NotExtended => 510,
            StatusCode::NetworkAuthenticationRequired => 511,
        }
    }

    /// Map a numeric code onto the closed set; `None` for anything unknown.
    pub fn from_u16(code: u16) -> Option<StatusCode> {
        let s = match code {
            100 => StatusCode::Continue,
            101 => StatusCode::SwitchingProtocols,
            102 => StatusCode::Processing,
            103 => StatusCode::EarlyHints,
            200 => StatusCode::Ok,
            201 => StatusCode::Created,
            202 => StatusCode::Accepted,
            203 => StatusCode::NonAuthoritativeInformation,
            204 => StatusCode::NoContent,
            205 => StatusCode::ResetContent,
            206 => StatusCode::PartialContent,
            207 => StatusCode::MultiStatus,
            208 => StatusCode::AlreadyReported,
            226 => StatusCode::ImUsed,
            300 => StatusCode::MultipleChoices,
            301 => StatusCode::MovedPermanently,
            302 => StatusCode::Found,
            303 => StatusCode::SeeOther,
            304 => StatusCode::NotModified,
            305 => StatusCode::UseProxy,
            306 => StatusCode::SwitchProxy,
            307 => StatusCode::TemporaryRedirect,
            308 => StatusCode::PermanentRedirect,
            400 => StatusCode::BadRequest,
            401 => StatusCode::Unauthorized,
            403 => StatusCode::Forbidden,
            404 => StatusCode::NotFound,
            405 => StatusCode::MethodNotAllowed,
            406 => StatusCode::NotAcceptable,
            407 => StatusCode::ProxyAuthenticationRequired,
            408 => StatusCode::RequestTimeout,
            409 => StatusCode::Conflict,
            410 => StatusCode::Gone,
            411 => StatusCode::LengthRequired,
            412 => StatusCode::PreconditionFailed,
            413 => StatusCode::RequestEntityTooLarge,
            414 => StatusCode::RequestUriTooLong,
            415 => StatusCode::UnsupportedMediaType,
            416 => StatusCode::RequestedRangeNotSatisfiable,
            417 => StatusCode::ExpectationFailed,
            421 => StatusCode::MisdirectedRequest,
            422 => StatusCode::UnprocessableEntity,
            423 => StatusCode::Locked,
            424 => StatusCode::FailedDependency,
            426 => StatusCode::UpgradeRequired,
            428 => StatusCode::PreconditionRequired,
            429 => StatusCode::TooManyRequests,
            431 => StatusCode::RequestHeaderFieldsTooLarge,
            451 => StatusCode::UnavailableForLegalReasons,
            500 => StatusCode::InternalServerError,
            501 => StatusCode::NotImplemented,
            502 => StatusCode::BadGateway,
            503 => StatusCode::ServiceUnavailable,
            504 => StatusCode::GatewayTimeout,
            505 => StatusCode::HttpVersionNotSupported,
            506 => StatusCode::VariantAlsoNegotiates,
            507 => StatusCode::InsufficientStorage,
            508 => StatusCode::LoopDetected,
            510 => StatusCode::NotExtended,
            511 => StatusCode::NetworkAuthenticationRequired,
            _ => return None,
        };
        Some(s)
    }

    /// Canonical reason phrase for the status code.
    ///
    /// The phrase a server sends on the wire is never used; responses always
    /// carry the phrase from this table.
    pub fn reason(&self) -> &'static str {
        match self {
            StatusCode::Continue => "Continue",
            StatusCode::SwitchingProtocols => "Switching Protocols",
            StatusCode::Processing => "Processing",
            StatusCode::EarlyHints => "Early Hints",
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::Accepted => "Accepted",
            StatusCode::NonAuthoritativeInformation => "Non-Authoritative Information",
            StatusCode::NoContent => "No Content",
            StatusCode::ResetContent => "Reset Content",
            StatusCode::PartialContent => "Partial Content",
            StatusCode::MultiStatus => "Multi-Status",
            StatusCode::AlreadyReported => "Already Reported",
            StatusCode::ImUsed => "IM Used",
            StatusCode::MultipleChoices => "Multiple Choices",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::Found => "Found",
            StatusCode::SeeOther => "See Other",
            StatusCode::NotModified => "Not Modified",
            StatusCode::UseProxy => "Use Proxy",
            StatusCode::SwitchProxy => "Switch Proxy",
            StatusCode::TemporaryRedirect => "Temporary Redirect",
            StatusCode::PermanentRedirect => "Permanent Redirect",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::NotAcceptable => "Not Acceptable",
            StatusCode::ProxyAuthenticationRequired => "Proxy Authentication Required",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::Conflict => "Conflict",
            StatusCode::Gone => "Gone",
            StatusCode::LengthRequired => "Length Required",
            StatusCode::PreconditionFailed => "Precondition Failed",
            StatusCode::RequestEntityTooLarge => "Payload Too Large",
            StatusCode::RequestUriTooLong => "URI Too Long",
            StatusCode::UnsupportedMediaType => "Unsupported Media Type",
            StatusCode::RequestedRangeNotSatisfiable => "Range Not Satisfiable",
            StatusCode::ExpectationFailed => "Expectation Failed",
            StatusCode::MisdirectedRequest => "Misdirected Request",
            StatusCode::UnprocessableEntity => "Unprocessable Entity",
            StatusCode::Locked => "Locked",
            StatusCode::FailedDependency => "Failed Dependency",
            StatusCode::UpgradeRequired => "Upgrade Required",
            StatusCode::PreconditionRequired => "Precondition Required",
            StatusCode::TooManyRequests => "Too Many Requests",
            StatusCode::RequestHeaderFieldsTooLarge => "Request Header Fields Too Large",
            StatusCode::UnavailableForLegalReasons => "Unavailable For Legal Reasons",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::BadGateway => "Bad Gateway",
            StatusCode::ServiceUnavailable => "Service Unavailable",
            StatusCode::GatewayTimeout => "Gateway Timeout",
            StatusCode::HttpVersionNotSupported => "HTTP Version Not Supported",
            StatusCode::VariantAlsoNegotiates => "Variant Also Negotiates",
            StatusCode::InsufficientStorage => "Insufficient Storage",
            StatusCode::LoopDetected => "Loop Detected",
            StatusCode::NotExtended => "Not Extended",
            StatusCode::NetworkAuthenticationRequired => "Network Authentication Required",
        }
    }
}

/// Content types known to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// `application/x-www-form-urlencoded`
    AppForm,
    /// `multipart/form-data`
    MultipartForm,
    /// `application/json`
    Json,
    /// `application/octet-stream`
    OctetStream,
    /// `application/pdf`
    Pdf,
    /// `application/zip`
    Zip,
    /// `application/xml`
    Xml,
    /// `text/plain`
    TextPlain,
    /// `text/html`
    TextHtml,
    /// `text/css`
    TextCss,
    /// `text/javascript`
    TextJs,
    /// `image/gif`
    Gif,
    /// `image/jpeg`
    Jpeg,
    /// `image/png`
    Png,
}

impl ContentType {
    /// Wire form of the media type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::AppForm => "application/x-www-form-urlencoded",
            ContentType::MultipartForm => "multipart/form-data",
            ContentType::Json => "application/json",
            ContentType::OctetStream => "application/octet-stream",
            ContentType::Pdf => "application/pdf",
            ContentType::Zip => "application/zip",
            ContentType::Xml => "application/xml",
            ContentType::TextPlain => "text/plain",
            ContentType::TextHtml => "text/html",
            ContentType::TextCss => "text/css",
            ContentType::TextJs => "text/javascript",
            ContentType::Gif => "image/gif",
            ContentType::Jpeg => "image/jpeg",
            ContentType::Png => "image/png",
        }
    }

    const ALL: [ContentType; 14] = [
        ContentType::AppForm,
        ContentType::MultipartForm,
        ContentType::Json,
        ContentType::OctetStream,
        ContentType::Pdf,
        ContentType::Zip,
        ContentType::Xml,
        ContentType::TextPlain,
        ContentType::TextHtml,
        ContentType::TextCss,
        ContentType::TextJs,
        ContentType::Gif,
        ContentType::Jpeg,
        ContentType::Png,
    ];

    /// Match the media type at the start of `s`, ignoring any parameters
    /// (`; charset=...`) that may follow.
    pub fn from_bytes(s: &[u8]) -> Option<ContentType> {
        ContentType::ALL.into_iter().find(|ct| {
            let t = ct.as_str().as_bytes();
            s.len() >= t.len() && s[..t.len()].eq_ignore_ascii_case(t)
        })
    }

    /// Guess a media type from a filename extension.
    ///
    /// Unknown or missing extensions map to
    /// [`ContentType::OctetStream`].
    pub fn from_file_ext(filename: &str) -> ContentType {
        let ext = match filename.rsplit_once('.') {
            Some((_, e)) if !e.is_empty() => e,
            _ => return ContentType::OctetStream,
        };
        let table: [(&str, ContentType); 11] = [
            ("html", ContentType::TextHtml),
            ("htm", ContentType::TextHtml),
            ("css", ContentType::TextCss),
            ("js", ContentType::TextJs),
            ("json", ContentType::Json),
            ("txt", ContentType::TextPlain),
            ("xml", ContentType::Xml),
            ("pdf", ContentType::Pdf),
            ("zip", ContentType::Zip),
            ("gif", ContentType::Gif),
            ("png", ContentType::Png),
        ];
        for (e, ct) in table {
            if ext.eq_ignore_ascii_case(e) {
                return ct;
            }
        }
        if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") {
            return ContentType::Jpeg;
        }
        ContentType::OctetStream
    }
}

/// Header field names known to the client.
///
/// Fields outside this table are skipped on receive and cannot be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    /// `Host`
    Host,
    /// `Connection`
    Connection,
    /// `Content-Type`
    ContentType,
    /// `Content-Length`
    ContentLength,
    /// `Transfer-Encoding`
    TransferEncoding,
    /// `Content-Disposition`
    ContentDisposition,
    /// `Accept`
    Accept,
    /// `Authorization`
    Authorization,
    /// `Cache-Control`
    CacheControl,
    /// `Cookie`
    Cookie,
    /// `Date`
    Date,
    /// `ETag`
    Etag,
    /// `Last-Modified`
    LastModified,
    /// `Location`
    Location,
    /// `Server`
    Server,
    /// `Set-Cookie`
    SetCookie,
    /// `Upgrade`
    Upgrade,
    /// `User-Agent`
    UserAgent,
    /// `WWW-Authenticate`
    WwwAuthenticate,
}

impl HeaderField {
    /// Canonical wire spelling of the field name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderField::Host => "Host",
            HeaderField::Connection => "Connection",
            HeaderField::ContentType => "Content-Type",
            HeaderField::ContentLength => "Content-Length",
            HeaderField::TransferEncoding => "Transfer-Encoding",
            HeaderField::ContentDisposition => "Content-Disposition",
            HeaderField::Accept => "Accept",
            HeaderField::Authorization => "Authorization",
            HeaderField::CacheControl => "Cache-Control",
            HeaderField::Cookie => "Cookie",
            HeaderField::Date => "Date",
            HeaderField::Etag => "ETag",
            HeaderField::LastModified => "Last-Modified",
            HeaderField::Location => "Location",
            HeaderField::Server => "Server",
            HeaderField::SetCookie => "Set-Cookie",
            HeaderField::Upgrade => "Upgrade",
            HeaderField::UserAgent => "User-Agent",
            HeaderField::WwwAuthenticate => "WWW-Authenticate",
        }
    }

    const ALL: [HeaderField; 19] = [
        HeaderField::Host,
        HeaderField::Connection,
        HeaderField::ContentType,
        HeaderField::ContentLength,
        HeaderField::TransferEncoding,
        HeaderField::ContentDisposition,
        HeaderField::Accept,
        HeaderField::Authorization,
        HeaderField::CacheControl,
        HeaderField::Cookie,
        HeaderField::Date,
        HeaderField::Etag,
        HeaderField::LastModified,
        HeaderField::Location,
        HeaderField::Server,
        HeaderField::SetCookie,
        HeaderField::Upgrade,
        HeaderField::UserAgent,
        HeaderField::WwwAuthenticate,
    ];

    /// Case-insensitive exact match of a field name.
    pub fn from_bytes(s: &[u8]) -> Option<HeaderField> {
        HeaderField::ALL
            .into_iter()
            .find(|h| s.eq_ignore_ascii_case(h.as_str().as_bytes()))
    }
}

/// Values of the `Connection` header the client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnHdrVal {
    /// `close`
    Close,
    /// `keep-alive`
    KeepAlive,
    /// `upgrade`
    Upgrade,
}

impl ConnHdrVal {
    /// Wire form of the value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnHdrVal::Close => "close",
            ConnHdrVal::KeepAlive => "keep-alive",
            ConnHdrVal::Upgrade => "upgrade",
        }
    }

    /// Match the value at the start of `s`, case-insensitively.
    pub fn from_bytes(s: &[u8]) -> Option<ConnHdrVal> {
        [ConnHdrVal::Close, ConnHdrVal::KeepAlive, ConnHdrVal::Upgrade]
            .into_iter()
            .find(|v| {
                let t = v.as_str().as_bytes();
                s.len() >= t.len() && s[..t.len()].eq_ignore_ascii_case(t)
            })
    }
}

/// Transfer codings the client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// `chunked`
    Chunked,
}

impl TransferEncoding {
    /// Wire form of the coding name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferEncoding::Chunked => "chunked",
        }
    }

    /// Match the coding at the start of `s`, case-insensitively.
    pub fn from_bytes(s: &[u8]) -> Option<TransferEncoding> {
        let t = TransferEncoding::Chunked.as_str().as_bytes();
        if s.len() >= t.len() && s[..t.len()].eq_ignore_ascii_case(t) {
            Some(TransferEncoding::Chunked)
        } else {
            None
        }
    }
}
