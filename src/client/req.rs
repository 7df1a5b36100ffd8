//! Request encoder state machine.
//!
//! A resumable byte producer. Each sub-state writes as much as fits in the
//! space remaining in the shared buffer, then either advances or records a
//! resume point (table index, pending pair, byte offset) and asks the
//! connection to drain the buffer. Atomic wire elements (one header line,
//! one query pair, one form-field header block) are written whole or not at
//! all: an element bigger than the whole buffer is a fatal configuration
//! error, one bigger than the space left is a flush-and-retry.
//!
//! URIs and body slices longer than the buffer are never copied: the
//! transmit cursor is pointed at caller memory instead.

use crate::http::codec::{self, url_encoded_len};
use crate::http::{
    CRLF, ConnHdrVal, ContentType, DFLT_PORT, DFLT_PORT_SECURE, HeaderField, Method, ProtocolVer,
    TransferEncoding,
};
use crate::transport::Socket;

use super::conn::{Conn, ConnState, ReqScratch, TxSrc, TxState, TxWriter};
use super::error::{CloseStatus, Error};
use super::form::{
    BOUNDARY, Body, ExtHeader, FormField, HeaderSource, QueryPair, QuerySource, form_app_len,
    form_multipart_len,
};

/// Fields the client core writes itself; finding one in the caller's extra
/// header table is a configuration error.
const CORE_OWNED: [HeaderField; 5] = [
    HeaderField::Host,
    HeaderField::Connection,
    HeaderField::ContentType,
    HeaderField::ContentLength,
    HeaderField::TransferEncoding,
];

/// One-time request preparation: validate the caller's parameters and decide
/// which core headers the encoder will inject.
pub(crate) fn prepare<S: Socket>(conn: &mut Conn<'_, S>) -> Result<(), Error> {
    let Conn { queue, scratch, persistent, to_close, close_status, .. } = conn;
    let req = queue.front().ok_or(Error::InvalidState)?;

    if let HeaderSource::Table(tbl) = &req.headers {
        for hdr in *tbl {
            if CORE_OWNED.contains(&hdr.field) {
                return Err(Error::HdrUnauthorized);
            }
        }
    }

    let mut content_len = 0usize;
    match &req.body {
        Body::Empty => {}
        Body::Slice { data, .. } => {
            if !req.chunked && data.is_empty() {
                return Err(Error::ContentLenInvalid);
            }
            content_len = data.len();
        }
        Body::Source { len, .. } => {
            if !req.chunked {
                match len {
                    Some(n) if *n > 0 => content_len = *n,
                    _ => return Err(Error::ContentLenInvalid),
                }
            }
        }
        Body::FormUrlEncoded { fields } => content_len = form_app_len(fields)?,
        Body::Multipart { fields } => content_len = form_multipart_len(fields)?,
    }

    scratch.hdr_host = true;

    if !*persistent {
        scratch.hdr_conn = true;
        *to_close = true;
        *close_status = CloseStatus::NotPersistent;
    }

    if !req.body.is_empty() {
        scratch.hdr_content_type = true;
        if req.body.is_form() {
            // form sizes are precomputed exactly; chunking is never used
            scratch.hdr_content_len = true;
        } else if req.chunked {
            scratch.hdr_transfer_enc = true;
        } else {
            scratch.hdr_content_len = true;
        }
    }

    scratch.content_len = content_len;
    scratch.content_rem = content_len;
    Ok(())
}

/// Drive the request states: drain pending transmit bytes, then encode as
/// much of the request as fits. Transient conditions leave the state
/// unchanged for the next step.
pub(crate) fn process<S: Socket>(conn: &mut Conn<'_, S>) -> Result<(), Error> {
    if conn.tx.pending > 0 {
        conn.tx_drain()?;
    }
    // A partial send or an in-flight zero-copy source invalidates the
    // buffer write index; wait for the drain to finish.
    if !conn.tx.can_append() {
        return Ok(());
    }
    let r = if conn.state.is_req_line() {
        line(conn)
    } else if conn.state.is_req_hdr() {
        hdr(conn)
    } else if conn.state.is_req_body() {
        body(conn)
    } else if conn.state == ConnState::ReqEnd {
        if conn.tx.pending == 0 {
            conn.state = ConnState::RespInit;
        }
        Ok(())
    } else {
        Err(Error::InvalidState)
    };
    match r {
        Err(Error::TxBufFull) => Ok(()),
        other => other,
    }
}

fn line<S: Socket>(conn: &mut Conn<'_, S>) -> Result<(), Error> {
    let Conn { buf, tx, queue, scratch, state, .. } = conn;
    let req = queue.front_mut().ok_or(Error::InvalidState)?;
    let mut w = TxWriter::new(buf, tx);

    if *state == ConnState::ReqLineMethod {
        let method = req.method.as_str().as_bytes();
        w.check_atomic(method.len() + 1)?;
        w.push(method);
        w.push_byte(b' ');
        *state = ConnState::ReqLineUri;
    }

    if *state == ConnState::ReqLineUri {
        let uri = req.uri.as_bytes();
        if uri.len() <= w.rem() {
            w.push(uri);
            *state = ConnState::ReqLineQuery;
        } else if w.pending() > 0 {
            // make room first, then decide between copy and zero-copy
            return Err(Error::TxBufFull);
        } else {
            // URI longer than the whole buffer: transmit from caller memory
            let len = uri.len();
            drop(w);
            *tx = TxState { src: TxSrc::Uri { pos: 0 }, pending: len };
            *state = ConnState::ReqLineQuery;
            return Ok(());
        }
    }

    if *state == ConnState::ReqLineQuery {
        match &mut req.query {
            QuerySource::None => {}
            QuerySource::Table(tbl) => query_table(&mut w, scratch, tbl)?,
            QuerySource::Iter(it) => query_iter(&mut w, scratch, &mut **it)?,
        }
        *state = ConnState::ReqLineProtoVer;
    }

    if *state == ConnState::ReqLineProtoVer {
        let ver = ProtocolVer::Http11.as_str().as_bytes();
        w.check_atomic(1 + ver.len() + CRLF.len())?;
        w.push_byte(b' ');
        w.push(ver);
        w.push(CRLF);
        *state = ConnState::ReqHdrHost;
    }
    Ok(())
}

/// Write the query pairs of a table, `?k=v&k=v...`, each pair atomic, with
/// the table index saved across suspensions.
fn query_table(
    w: &mut TxWriter<'_>,
    scratch: &mut ReqScratch<'_>,
    tbl: &[QueryPair<'_>],
) -> Result<(), Error> {
    for i in scratch.query_ix..tbl.len() {
        let pair = &tbl[i];
        if !scratch.query_begun {
            w.check_atomic(1)?;
            w.push_byte(b'?');
            scratch.query_begun = true;
        }
        let mut space = url_encoded_len(pair.key.as_bytes());
        if let Some(val) = pair.val {
            space += 1 + url_encoded_len(val.as_bytes());
        }
        space += 1; // separator
        if space > w.cap() {
            return Err(Error::BufTooSmall);
        }
        if space > w.rem() {
            scratch.query_ix = i;
            return Err(Error::TxBufFull);
        }
        w.push_url_encoded(pair.key.as_bytes())?;
        if let Some(val) = pair.val {
            w.push_byte(b'=');
            w.push_url_encoded(val.as_bytes())?;
        }
        if i + 1 < tbl.len() {
            w.push_byte(b'&');
        } else {
            scratch.query_ix = 0;
        }
    }
    Ok(())
}

/// Write query pairs pulled from an iterator. The pair that did not fit is
/// parked in the scratch slot and re-tried after the buffer drains.
fn query_iter<'a>(
    w: &mut TxWriter<'_>,
    scratch: &mut ReqScratch<'a>,
    it: &mut dyn Iterator<Item = QueryPair<'a>>,
) -> Result<(), Error> {
    loop {
        let pair = match scratch.query_pending.take() {
            Some(p) => p,
            None => match it.next() {
                Some(p) => p,
                None => return Ok(()),
            },
        };
        let mut space = 1; // '?' or '&'
        space += url_encoded_len(pair.key.as_bytes());
        if let Some(val) = pair.val {
            space += 1 + url_encoded_len(val.as_bytes());
        }
        if space > w.cap() {
            return Err(Error::BufTooSmall);
        }
        if space > w.rem() {
            scratch.query_pending = Some(pair);
            return Err(Error::TxBufFull);
        }
        if scratch.query_begun {
            w.push_byte(b'&');
        } else {
            w.push_byte(b'?');
            scratch.query_begun = true;
        }
        w.push_url_encoded(pair.key.as_bytes())?;
        if let Some(val) = pair.val {
            w.push_byte(b'=');
            w.push_url_encoded(val.as_bytes())?;
        }
    }
}

fn hdr<S: Socket>(conn: &mut Conn<'_, S>) -> Result<(), Error> {
    let Conn { buf, tx, queue, scratch, state, hostname, port, .. } = conn;
    let req = queue.front_mut().ok_or(Error::InvalidState)?;
    let mut w = TxWriter::new(buf, tx);

    if *state == ConnState::ReqHdrHost {
        if scratch.hdr_host {
            if *port == DFLT_PORT || *port == DFLT_PORT_SECURE {
                w.header(HeaderField::Host, hostname.as_bytes(), true)?;
            } else {
                let mut digits = [0u8; 5];
                let ndig = codec::fmt_dec(usize::from(*port), &mut digits);
                let need = HeaderField::Host.as_str().len() + 2 + hostname.len() + 1 + ndig + 2;
                w.check_atomic(need)?;
                w.header(HeaderField::Host, hostname.as_bytes(), false)?;
                w.push_byte(b':');
                w.push(&digits[..ndig]);
                w.push(CRLF);
            }
        }
        *state = ConnState::ReqHdrConn;
    }

    if *state == ConnState::ReqHdrConn {
        if scratch.hdr_conn {
            w.header(HeaderField::Connection, ConnHdrVal::Close.as_str().as_bytes(), true)?;
        }
        *state = ConnState::ReqHdrContentType;
    }

    if *state == ConnState::ReqHdrContentType {
        if scratch.hdr_content_type {
            let ct = req.body.content_type().ok_or(Error::InvalidState)?;
            if ct == ContentType::MultipartForm {
                let param = b"; boundary=";
                let need = HeaderField::ContentType.as_str().len()
                    + 2
                    + ct.as_str().len()
                    + param.len()
                    + BOUNDARY.len()
                    + CRLF.len();
                w.check_atomic(need)?;
                w.header(HeaderField::ContentType, ct.as_str().as_bytes(), false)?;
                w.push(param);
                w.push(BOUNDARY.as_bytes());
                w.push(CRLF);
            } else {
                w.header(HeaderField::ContentType, ct.as_str().as_bytes(), true)?;
            }
        }
        *state = ConnState::ReqHdrTransferEncoding;
    }

    if *state == ConnState::ReqHdrTransferEncoding {
        if scratch.hdr_transfer_enc {
            w.header(
                HeaderField::TransferEncoding,
                TransferEncoding::Chunked.as_str().as_bytes(),
                true,
            )?;
        }
        *state = ConnState::ReqHdrContentLen;
    }

    if *state == ConnState::ReqHdrContentLen {
        if scratch.hdr_content_len {
            let mut digits = [0u8; 20];
            let ndig = codec::fmt_dec(scratch.content_len, &mut digits);
            w.header(HeaderField::ContentLength, &digits[..ndig], true)?;
        }
        *state = ConnState::ReqHdrExt;
    }

    if *state == ConnState::ReqHdrExt {
        match &mut req.headers {
            HeaderSource::None => {}
            HeaderSource::Table(tbl) => hdr_table(&mut w, scratch, tbl)?,
            HeaderSource::Iter(it) => hdr_iter(&mut w, scratch, &mut **it)?,
        }
        *state = ConnState::ReqHdrLast;
    }

    if *state == ConnState::ReqHdrLast {
        w.check_atomic(CRLF.len())?;
        w.push(CRLF);
        *state = ConnState::ReqBody;
    }
    Ok(())
}

fn hdr_table(
    w: &mut TxWriter<'_>,
    scratch: &mut ReqScratch<'_>,
    tbl: &[ExtHeader<'_>],
) -> Result<(), Error> {
    for i in scratch.hdr_ix..tbl.len() {
        let hd = &tbl[i];
        match w.header(hd.field, hd.value.as_bytes(), true) {
            Ok(()) => {}
            Err(Error::TxBufFull) => {
                scratch.hdr_ix = i;
                return Err(Error::TxBufFull);
            }
            Err(e) => return Err(e),
        }
        if i + 1 == tbl.len() {
            scratch.hdr_ix = 0;
        }
    }
    Ok(())
}

fn hdr_iter<'a>(
    w: &mut TxWriter<'_>,
    scratch: &mut ReqScratch<'a>,
    it: &mut dyn Iterator<Item = ExtHeader<'a>>,
) -> Result<(), Error> {
    loop {
        let hd = match scratch.hdr_pending.take() {
            Some(h) => h,
            None => match it.next() {
                Some(h) => h,
                None => return Ok(()),
            },
        };
        match w.header(hd.field, hd.value.as_bytes(), true) {
            Ok(()) => {}
            Err(Error::TxBufFull) => {
                scratch.hdr_pending = Some(hd);
                return Err(Error::TxBufFull);
            }
            Err(e) => return Err(e),
        }
    }
}

fn body<S: Socket>(conn: &mut Conn<'_, S>) -> Result<(), Error> {
    if conn.state == ConnState::ReqBody {
        let req = conn.queue.front().ok_or(Error::InvalidState)?;
        conn.state = match req.method {
            // these methods never carry an entity
            Method::Trace | Method::Connect => ConnState::ReqEnd,
            _ if req.body.is_empty() => ConnState::ReqEnd,
            _ => match &req.body {
                Body::FormUrlEncoded { .. } => ConnState::ReqFormApp,
                Body::Multipart { .. } => ConnState::ReqMultipartBoundary,
                _ => ConnState::ReqBodyData,
            },
        };
        return Ok(());
    }
    match conn.state {
        ConnState::ReqBodyData
        | ConnState::ReqChunkSize
        | ConnState::ReqChunkData
        | ConnState::ReqChunkEnd => body_data(conn),
        ConnState::ReqFormApp => {
            form_app(conn)?;
            conn.state = ConnState::ReqEnd;
            Ok(())
        }
        ConnState::ReqMultipartBoundary
        | ConnState::ReqMultipartDispo
        | ConnState::ReqMultipartType
        | ConnState::ReqMultipartData
        | ConnState::ReqMultipartDataEnd
        | ConnState::ReqMultipartBoundaryEnd => form_multipart(conn),
        _ => Err(Error::InvalidState),
    }
}

fn body_data<S: Socket>(conn: &mut Conn<'_, S>) -> Result<(), Error> {
    let chunked = conn.queue.front().ok_or(Error::InvalidState)?.chunked;
    if chunked { body_data_chunked(conn) } else { body_data_std(conn) }
}

fn body_data_std<S: Socket>(conn: &mut Conn<'_, S>) -> Result<(), Error> {
    let Conn { buf, tx, queue, scratch, state, .. } = conn;
    let req = queue.front_mut().ok_or(Error::InvalidState)?;
    match &mut req.body {
        Body::Slice { .. } => {
            if scratch.content_rem > 0 {
                if tx.pending > 0 {
                    // headers must leave the buffer before the cursor moves
                    // to caller memory
                    return Ok(());
                }
                *tx = TxState { src: TxSrc::Body { pos: 0 }, pending: scratch.content_rem };
                scratch.content_rem = 0;
            } else if tx.pending == 0 {
                *state = ConnState::ReqEnd;
            }
            Ok(())
        }
        Body::Source { source, .. } => {
            if scratch.content_rem == 0 {
                *state = ConnState::ReqEnd;
                return Ok(());
            }
            let mut w = TxWriter::new(buf, tx);
            if w.rem() == 0 {
                return Err(Error::TxBufFull);
            }
            let limit = w.rem().min(scratch.content_rem);
            let pulled =
                source.pull(&mut w.tail(0)[..limit]).map_err(|_| Error::BodyInvalid)?;
            if pulled.len > limit {
                return Err(Error::BodyInvalid);
            }
            w.commit(pulled.len);
            scratch.content_rem -= pulled.len;
            if pulled.done && scratch.content_rem > 0 {
                return Err(Error::BodyInvalid);
            }
            if scratch.content_rem == 0 {
                *state = ConnState::ReqEnd;
            }
            Ok(())
        }
        _ => Err(Error::InvalidState),
    }
}

fn body_data_chunked<S: Socket>(conn: &mut Conn<'_, S>) -> Result<(), Error> {
    let Conn { buf, tx, queue, scratch, state, .. } = conn;
    let req = queue.front_mut().ok_or(Error::InvalidState)?;
    let digits = codec::hex_digits_for(buf.len());
    let prefix = digits + CRLF.len();
    let mut w = TxWriter::new(buf, tx);

    if *state == ConnState::ReqBodyData {
        // room for a size line plus either one payload byte or the
        // terminating CRLF
        if prefix + CRLF.len() > w.cap() {
            return Err(Error::BufTooSmall);
        }
        if prefix + CRLF.len() > w.rem() {
            return Err(Error::TxBufFull);
        }
        match &mut req.body {
            Body::Source { source, .. } => {
                let avail = w.rem() - prefix;
                let pulled =
                    source.pull(&mut w.tail(prefix)[..avail]).map_err(|_| Error::BodyInvalid)?;
                if pulled.len > avail {
                    return Err(Error::BodyInvalid);
                }
                if pulled.len == 0 {
                    if !pulled.done {
                        return Err(Error::BodyInvalid);
                    }
                    // nothing left to send: terminating chunk only
                    let n = codec::chunk_size_line(w.tail(0), digits, 0)
                        .map_err(|_| Error::TxBufFull)?;
                    w.commit(n);
                    w.push(CRLF);
                    *state = ConnState::ReqEnd;
                    return Ok(());
                }
                let n = codec::chunk_size_line(w.tail(0), digits, pulled.len)
                    .map_err(|_| Error::TxBufFull)?;
                debug_assert_eq!(n, prefix);
                w.commit(prefix + pulled.len);
                scratch.chunk_last = pulled.done;
                *state = ConnState::ReqChunkEnd;
            }
            Body::Slice { .. } => {
                if scratch.content_rem == 0 {
                    let n = codec::chunk_size_line(w.tail(0), digits, 0)
                        .map_err(|_| Error::TxBufFull)?;
                    w.commit(n);
                    w.push(CRLF);
                    *state = ConnState::ReqEnd;
                    return Ok(());
                }
                // cap each chunk at the buffer size so the fixed-width size
                // line always has enough digits
                scratch.chunk_len = scratch.content_rem.min(w.cap());
                scratch.chunk_last = scratch.chunk_len == scratch.content_rem;
                *state = ConnState::ReqChunkSize;
            }
            _ => return Err(Error::InvalidState),
        }
    }

    if *state == ConnState::ReqChunkSize {
        if prefix > w.cap() {
            return Err(Error::BufTooSmall);
        }
        if prefix > w.rem() {
            return Err(Error::TxBufFull);
        }
        let n = codec::chunk_size_line(w.tail(0), digits, scratch.chunk_len)
            .map_err(|_| Error::TxBufFull)?;
        w.commit(n);
        *state = ConnState::ReqChunkData;
    }

    if *state == ConnState::ReqChunkData {
        if w.pending() > 0 {
            // size line still draining; the chunk itself follows zero-copy
            return Ok(());
        }
        drop(w);
        *tx = TxState { src: TxSrc::Body { pos: scratch.data_off }, pending: scratch.chunk_len };
        scratch.data_off += scratch.chunk_len;
        scratch.content_rem -= scratch.chunk_len;
        *state = ConnState::ReqChunkEnd;
        return Ok(());
    }

    if *state == ConnState::ReqChunkEnd {
        let need = if scratch.chunk_last {
            CRLF.len() + prefix + CRLF.len()
        } else {
            CRLF.len()
        };
        if need > w.cap() {
            return Err(Error::BufTooSmall);
        }
        if need > w.rem() {
            return Err(Error::TxBufFull);
        }
        w.push(CRLF);
        if scratch.chunk_last {
            let n = codec::chunk_size_line(w.tail(0), digits, 0).map_err(|_| Error::TxBufFull)?;
            w.commit(n);
            w.push(CRLF);
            *state = ConnState::ReqEnd;
        } else {
            *state = ConnState::ReqBodyData;
        }
    }
    Ok(())
}

fn form_app<S: Socket>(conn: &mut Conn<'_, S>) -> Result<(), Error> {
    let Conn { buf, tx, queue, scratch, .. } = conn;
    let req = queue.front_mut().ok_or(Error::InvalidState)?;
    let Body::FormUrlEncoded { fields } = &mut req.body else {
        return Err(Error::InvalidState);
    };
    let mut w = TxWriter::new(buf, tx);
    let n = fields.len();
    for i in scratch.form_ix..n {
        let FormField::KeyVal { key, val } = &fields[i] else {
            return Err(Error::FormFieldInvalid);
        };
        let mut space = url_encoded_len(key.as_bytes()) + 1 + url_encoded_len(val.as_bytes());
        if i + 1 < n {
            space += 1; // '&'
        }
        if space > w.cap() {
            return Err(Error::BufTooSmall);
        }
        if space > w.rem() {
            scratch.form_ix = i;
            return Err(Error::TxBufFull);
        }
        w.push_url_encoded(key.as_bytes())?;
        w.push_byte(b'=');
        w.push_url_encoded(val.as_bytes())?;
        if i + 1 < n {
            w.push_byte(b'&');
        } else {
            scratch.form_ix = 0;
        }
    }
    Ok(())
}

fn form_multipart<S: Socket>(conn: &mut Conn<'_, S>) -> Result<(), Error> {
    let Conn { buf, tx, queue, scratch, state, .. } = conn;
    let req = queue.front_mut().ok_or(Error::InvalidState)?;
    let Body::Multipart { fields } = &mut req.body else {
        return Err(Error::InvalidState);
    };
    let mut w = TxWriter::new(buf, tx);
    let n = fields.len();

    for i in scratch.form_ix..n {
        if *state == ConnState::ReqMultipartBoundary {
            let need = 2 + BOUNDARY.len() + CRLF.len();
            if need > w.cap() {
                return Err(Error::BufTooSmall);
            }
            if need > w.rem() {
                scratch.form_ix = i;
                return Err(Error::TxBufFull);
            }
            w.push(b"--");
            w.push(BOUNDARY.as_bytes());
            w.push(CRLF);
            *state = ConnState::ReqMultipartDispo;
        }

        if *state == ConnState::ReqMultipartDispo {
            let (name, filename) = match &fields[i] {
                FormField::KeyVal { key, .. } => (*key, None),
                FormField::KeyValExt { key, .. } => (*key, None),
                FormField::File { name, filename, .. } => (*name, Some(*filename)),
            };
            let mut need = HeaderField::ContentDisposition.as_str().len()
                + 2
                + "form-data".len()
                + 2
                + "name".len()
                + 3
                + url_encoded_len(name.as_bytes())
                + CRLF.len();
            if let Some(fname) = filename {
                need += 2 + "filename".len() + 3 + url_encoded_len(fname.as_bytes());
            }
            if need > w.cap() {
                return Err(Error::BufTooSmall);
            }
            if need > w.rem() {
                scratch.form_ix = i;
                return Err(Error::TxBufFull);
            }
            w.header(HeaderField::ContentDisposition, b"form-data", false)?;
            w.push(b"; name=\"");
            w.push_url_encoded(name.as_bytes())?;
            w.push_byte(b'"');
            if let Some(fname) = filename {
                w.push(b"; filename=\"");
                w.push_url_encoded(fname.as_bytes())?;
                w.push_byte(b'"');
            }
            w.push(CRLF);
            *state = ConnState::ReqMultipartType;
        }

        if *state == ConnState::ReqMultipartType {
            // the part's Content-Type line (files only) and the blank line
            // ending the part headers are one atomic piece
            let ct = match &fields[i] {
                FormField::File { content_type, .. } => Some(*content_type),
                _ => None,
            };
            let mut need = CRLF.len();
            if let Some(ct) = ct {
                need += HeaderField::ContentType.as_str().len() + 2 + ct.as_str().len()
                    + CRLF.len();
            }
            if need > w.cap() {
                return Err(Error::BufTooSmall);
            }
            if need > w.rem() {
                scratch.form_ix = i;
                return Err(Error::TxBufFull);
            }
            if let Some(ct) = ct {
                w.header(HeaderField::ContentType, ct.as_str().as_bytes(), true)?;
            }
            w.push(CRLF);
            *state = ConnState::ReqMultipartData;
        }

        if *state == ConnState::ReqMultipartData {
            match &mut fields[i] {
                FormField::KeyVal { val, .. } => {
                    let vb = val.as_bytes();
                    if vb.len() > w.cap() {
                        return Err(Error::BufTooSmall);
                    }
                    if vb.len() > w.rem() {
                        scratch.form_ix = i;
                        return Err(Error::TxBufFull);
                    }
                    w.push(vb);
                }
                FormField::KeyValExt { len, source, .. }
                | FormField::File { len, source, .. } => {
                    if w.rem() == 0 {
                        scratch.form_ix = i;
                        return Err(Error::TxBufFull);
                    }
                    let limit = w.rem().min(*len - scratch.data_off);
                    let pulled =
                        source.pull(&mut w.tail(0)[..limit]).map_err(|_| Error::BodyInvalid)?;
                    if pulled.len > limit {
                        return Err(Error::BodyInvalid);
                    }
                    w.commit(pulled.len);
                    scratch.data_off += pulled.len;
                    if pulled.done && scratch.data_off < *len {
                        return Err(Error::BodyInvalid);
                    }
                    if !pulled.done {
                        if limit == 0 && pulled.len == 0 {
                            // declared length reached but the source keeps
                            // going
                            return Err(Error::BodyInvalid);
                        }
                        scratch.form_ix = i;
                        return Err(Error::TxBufFull);
                    }
                    scratch.data_off = 0;
                }
            }
            *state = ConnState::ReqMultipartDataEnd;
        }

        if *state == ConnState::ReqMultipartDataEnd {
            if CRLF.len() > w.rem() {
                scratch.form_ix = i;
                return Err(Error::TxBufFull);
            }
            w.push(CRLF);
            *state = ConnState::ReqMultipartBoundaryEnd;
        }

        if *state == ConnState::ReqMultipartBoundaryEnd {
            if i + 1 == n {
                let need = 2 + BOUNDARY.len() + 2 + CRLF.len();
                if need > w.cap() {
                    return Err(Error::BufTooSmall);
                }
                if need > w.rem() {
                    scratch.form_ix = i;
                    return Err(Error::TxBufFull);
                }
                w.push(b"--");
                w.push(BOUNDARY.as_bytes());
                w.push(b"--");
                w.push(CRLF);
            }
            *state = ConnState::ReqMultipartBoundary;
        }
    }

    if n == 0 {
        // a form with no fields still carries the closing boundary
        let need = 2 + BOUNDARY.len() + 2 + CRLF.len();
        if need > w.cap() {
            return Err(Error::BufTooSmall);
        }
        if need > w.rem() {
            return Err(Error::TxBufFull);
        }
        w.push(b"--");
        w.push(BOUNDARY.as_bytes());
        w.push(b"--");
        w.push(CRLF);
    }

    scratch.form_ix = 0;
    *state = ConnState::ReqEnd;
    Ok(())
}
