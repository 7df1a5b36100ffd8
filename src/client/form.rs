//! Request body, query-string and extra-header sources.
//!
//! All variable request content is described by tagged types owned by the
//! caller: the encoder walks them with saved resume indices, so tables and
//! pull sources of any size stream through the shared buffer.

use crate::http::codec::url_encoded_len;
use crate::http::{ContentType, HeaderField};

use super::error::Error;

/// Fixed multipart boundary token used in every `multipart/form-data` body.
pub const BOUNDARY: &str = "4smbqjrCvdnKlPxX";

/// The error type returned by a failing [`BodySource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceError;

/// One pull from a [`BodySource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulled {
    /// Bytes written into the destination slice.
    pub len: usize,
    /// Whether the source is exhausted.
    pub done: bool,
}

/// A finite, non-restartable producer of body bytes.
///
/// The encoder calls [`BodySource::pull`] with whatever space remains in the
/// shared buffer; the source fills as much of it as it wants and reports
/// whether it has more. A pull of zero bytes with `done == false` means "no
/// data available right now" for a plain body and is a fault inside chunked
/// or multipart framing, where every produced chunk must carry bytes.
pub trait BodySource {
    /// Produce the next run of body bytes into `out`.
    fn pull(&mut self, out: &mut [u8]) -> Result<Pulled, SourceError>;
}

/// A [`BodySource`] streaming from a byte slice.
///
/// Useful when the data already lives in memory but must be fed through the
/// pull interface (extended form fields, file uploads in tests).
#[derive(Debug)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    at: usize,
}

impl<'a> SliceSource<'a> {
    /// Stream the given slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, at: 0 }
    }
}

impl BodySource for SliceSource<'_> {
    fn pull(&mut self, out: &mut [u8]) -> Result<Pulled, SourceError> {
        let n = out.len().min(self.data.len() - self.at);
        out[..n].copy_from_slice(&self.data[self.at..self.at + n]);
        self.at += n;
        Ok(Pulled { len: n, done: self.at == self.data.len() })
    }
}

/// The body of a request.
pub enum Body<'a> {
    /// No body.
    Empty,
    /// A body already in caller memory. Transmitted without copying into the
    /// shared buffer.
    Slice {
        /// The body bytes.
        data: &'a [u8],
        /// Declared media type.
        content_type: ContentType,
    },
    /// A body produced on demand by a pull source.
    Source {
        /// The producer.
        source: &'a mut dyn BodySource,
        /// Declared media type.
        content_type: ContentType,
        /// Total body length. Required unless the request uses chunked
        /// transfer encoding.
        len: Option<usize>,
    },
    /// An `application/x-www-form-urlencoded` form. Only
    /// [`FormField::KeyVal`] entries are allowed.
    FormUrlEncoded {
        /// Ordered form fields.
        fields: &'a mut [FormField<'a>],
    },
    /// A `multipart/form-data` form.
    Multipart {
        /// Ordered form fields.
        fields: &'a mut [FormField<'a>],
    },
}

impl Body<'_> {
    /// Media type the body declares on the wire.
    pub(crate) fn content_type(&self) -> Option<ContentType> {
        match self {
            Body::Empty => None,
            Body::Slice { content_type, .. } | Body::Source { content_type, .. } => {
                Some(*content_type)
            }
            Body::FormUrlEncoded { .. } => Some(ContentType::AppForm),
            Body::Multipart { .. } => Some(ContentType::MultipartForm),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    pub(crate) fn is_form(&self) -> bool {
        matches!(self, Body::FormUrlEncoded { .. } | Body::Multipart { .. })
    }
}

/// One entry of a form-field table.
pub enum FormField<'a> {
    /// A small key/value pair held in caller memory.
    KeyVal {
        /// Field name.
        key: &'a str,
        /// Field value.
        val: &'a str,
    },
    /// A key whose value is produced by a pull source (for values larger
    /// than the shared buffer). Multipart only.
    KeyValExt {
        /// Field name.
        key: &'a str,
        /// Exact value length in bytes.
        len: usize,
        /// Value producer.
        source: &'a mut dyn BodySource,
    },
    /// A file upload. Multipart only.
    File {
        /// Field name.
        name: &'a str,
        /// File name reported to the server.
        filename: &'a str,
        /// Media type of the file data.
        content_type: ContentType,
        /// Exact file length in bytes.
        len: usize,
        /// File data producer.
        source: &'a mut dyn BodySource,
    },
}

impl<'a> FormField<'a> {
    /// Build a key/value field, rejecting an empty key.
    pub fn key_val(key: &'a str, val: &'a str) -> Result<Self, Error> {
        if key.is_empty() {
            return Err(Error::FormFieldInvalid);
        }
        Ok(FormField::KeyVal { key, val })
    }

    /// Build an extended key/value field whose value streams from `source`.
    pub fn key_val_ext(
        key: &'a str,
        len: usize,
        source: &'a mut dyn BodySource,
    ) -> Result<Self, Error> {
        if key.is_empty() {
            return Err(Error::FormFieldInvalid);
        }
        Ok(FormField::KeyValExt { key, len, source })
    }

    /// Build a file-upload field.
    pub fn file(
        name: &'a str,
        filename: &'a str,
        content_type: ContentType,
        len: usize,
        source: &'a mut dyn BodySource,
    ) -> Result<Self, Error> {
        if name.is_empty() || filename.is_empty() {
            return Err(Error::FormFieldInvalid);
        }
        Ok(FormField::File { name, filename, content_type, len, source })
    }
}

/// One query-string pair. A `None` value emits the bare key.
#[derive(Debug, Clone, Copy)]
pub struct QueryPair<'a> {
    /// Query key, percent-encoded on the wire.
    pub key: &'a str,
    /// Query value, percent-encoded on the wire.
    pub val: Option<&'a str>,
}

/// Where the request's query string comes from.
pub enum QuerySource<'a> {
    /// No query string.
    None,
    /// An ordered table of pairs.
    Table(&'a [QueryPair<'a>]),
    /// A pull iterator, for query strings assembled on the fly.
    Iter(&'a mut dyn Iterator<Item = QueryPair<'a>>),
}

/// One caller-supplied request header.
#[derive(Debug, Clone, Copy)]
pub struct ExtHeader<'a> {
    /// Field name. Must not be one of the core-owned fields.
    pub field: HeaderField,
    /// Field value.
    pub value: &'a str,
}

/// Where the request's extra headers come from.
pub enum HeaderSource<'a> {
    /// No extra headers.
    None,
    /// An ordered table of headers.
    Table(&'a [ExtHeader<'a>]),
    /// A pull iterator.
    Iter(&'a mut dyn Iterator<Item = ExtHeader<'a>>),
}

// Exact sizes the body writers will later emit. Any drift between these and
// the writers corrupts Content-Length, so both sides are kept textually
// close to each other.

/// Exact encoded length of an `application/x-www-form-urlencoded` body.
pub(crate) fn form_app_len(fields: &[FormField<'_>]) -> Result<usize, Error> {
    let mut total = 0;
    for field in fields {
        let FormField::KeyVal { key, val } = field else {
            return Err(Error::FormFieldInvalid);
        };
        total += url_encoded_len(key.as_bytes()) + 1 + url_encoded_len(val.as_bytes());
    }
    if !fields.is_empty() {
        total += fields.len() - 1; // "&" separators
    }
    Ok(total)
}

const CRLF_LEN: usize = 2;

/// Exact length of a `multipart/form-data` body with the fixed boundary.
pub(crate) fn form_multipart_len(fields: &[FormField<'_>]) -> Result<usize, Error> {
    let dispo = HeaderField::ContentDisposition.as_str().len();
    let ctype = HeaderField::ContentType.as_str().len();
    let mut total = 0;
    for field in fields {
        // "--BOUNDARY\r\n"
        total += 2 + BOUNDARY.len() + CRLF_LEN;
        // `Content-Disposition: form-data; name="..."` + CRLF
        total += dispo + 2 + "form-data".len() + 2 + "name".len() + 3 + CRLF_LEN;
        match field {
            FormField::KeyVal { key, val } => {
                total += url_encoded_len(key.as_bytes());
                total += val.len() + 2 * CRLF_LEN;
            }
            FormField::KeyValExt { key, len, .. } => {
                total += url_encoded_len(key.as_bytes());
                total += len + 2 * CRLF_LEN;
            }
            FormField::File { name, filename, content_type, len, .. } => {
                total += url_encoded_len(name.as_bytes());
                // `; filename="..."`
                total += 2 + "filename".len() + 3 + url_encoded_len(filename.as_bytes());
                // `Content-Type: ...` + CRLF
                total += ctype + 2 + content_type.as_str().len() + CRLF_LEN;
                total += len + 2 * CRLF_LEN;
            }
        }
    }
    // "--BOUNDARY--\r\n"
    total += 2 + BOUNDARY.len() + 2 + CRLF_LEN;
    Ok(total)
}
