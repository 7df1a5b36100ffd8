//! Common error types for transport operations

/// A common error type for transport operations.
///
/// This enum defines the set of conditions the HTTP client distinguishes
/// when driving a socket. It is designed to be simple and portable for
/// `no_std` environments; transports map their native error codes onto it.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The operation cannot make progress right now; retry later.
    WouldBlock,
    /// The peer refused the connection attempt.
    Refused,
    /// A timeout expired before the operation completed.
    Timeout,
    /// The connection was closed by the peer.
    Closed,
    /// The hostname or address could not be resolved.
    InvalidAddress,
    /// An unrecoverable transport fault.
    Fatal,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::WouldBlock => defmt::write!(f, "WouldBlock"),
            Error::Refused => defmt::write!(f, "Refused"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::Closed => defmt::write!(f, "Closed"),
            Error::InvalidAddress => defmt::write!(f, "InvalidAddress"),
            Error::Fatal => defmt::write!(f, "Fatal"),
        }
    }
}
