//! Credential helpers for the `Authorization` request header.

use base64ct::{Base64, Encoding as B64Encoding};

use super::codec::SizeError;

/// Longest `user:password` pair accepted by [`basic_auth`].
pub const BASIC_AUTH_CRED_MAX: usize = 96;

/// Format a `Basic` authorization header value (`Basic dXNlcjpwYXNz`) into
/// `dst`, returning the number of bytes written.
///
/// The combined `user:password` pair must fit in
/// [`BASIC_AUTH_CRED_MAX`] bytes.
pub fn basic_auth(user: &str, password: &str, dst: &mut [u8]) -> Result<usize, SizeError> {
    const PREFIX: &[u8] = b"Basic ";

    let cred_len = user.len() + 1 + password.len();
    if cred_len > BASIC_AUTH_CRED_MAX {
        return Err(SizeError::Capacity);
    }

    let mut cred = [0u8; BASIC_AUTH_CRED_MAX];
    cred[..user.len()].copy_from_slice(user.as_bytes());
    cred[user.len()] = b':';
    cred[user.len() + 1..cred_len].copy_from_slice(password.as_bytes());

    let enc_len = Base64::encoded_len(&cred[..cred_len]);
    if PREFIX.len() + enc_len > dst.len() {
        return Err(SizeError::Space);
    }

    dst[..PREFIX.len()].copy_from_slice(PREFIX);
    let written = Base64::encode(&cred[..cred_len], &mut dst[PREFIX.len()..])
        .map_err(|_| SizeError::Space)?
        .len();
    Ok(PREFIX.len() + written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_rfc_example() {
        let mut dst = [0u8; 64];
        let n = basic_auth("Aladdin", "open sesame", &mut dst).unwrap();
        assert_eq!(&dst[..n], b"Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
    }

    #[test]
    fn rejects_oversized_credentials() {
        let mut dst = [0u8; 256];
        let long = core::str::from_utf8(&[b'a'; 97]).unwrap();
        assert_eq!(basic_auth(long, "", &mut dst), Err(SizeError::Capacity));
    }

    #[test]
    fn rejects_small_destination() {
        let mut dst = [0u8; 8];
        assert_eq!(basic_auth("user", "pass", &mut dst), Err(SizeError::Space));
    }
}
