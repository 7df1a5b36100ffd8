//! Response decoder state machine.
//!
//! Parses a response incrementally from whatever bytes the socket has placed
//! into the shared buffer. Truncated input is never an error: the decoder
//! signals "more data required", the connection tops the buffer up on a
//! later step, and parsing resumes on the same state. Only HTTP/1.1
//! responses with CRLF line endings and status codes from the static
//! dictionary are accepted; reason phrases are substituted from that
//! dictionary, never taken from the wire.

use crate::http::codec;
use crate::http::{CRLF, ConnHdrVal, ContentType, HeaderField, ProtocolVer, StatusCode,
    TransferEncoding};
use crate::transport::Socket;

use super::conn::{Conn, ConnState};
use super::error::{CloseStatus, Error};
use super::{EventHandler, Response};

/// Drive the response states: top the buffer up when the previous step ran
/// dry, then parse as far as the buffered bytes allow.
pub(crate) fn process<S: Socket, H: EventHandler>(
    conn: &mut Conn<'_, S>,
    h: &mut H,
) -> Result<(), Error> {
    let mut got = false;
    if conn.rx_more_data {
        got = conn.rx_fill()?;
    }
    match conn.state {
        ConnState::RespInit => {
            if got {
                conn.rx_more_data = false;
                conn.state = ConnState::RespStatusLine;
            } else {
                conn.rx_more_data = true;
            }
            Ok(())
        }
        ConnState::RespStatusLine => match status_line(conn) {
            Ok(()) => {
                conn.rx_more_data = false;
                conn.state = ConnState::RespHdr;
                Ok(())
            }
            Err(Error::RxMoreData) => {
                conn.rx_more_data = true;
                Ok(())
            }
            Err(e) => Err(e),
        },
        ConnState::RespHdr => match headers(conn, h) {
            Ok(()) => {
                conn.rx_more_data = false;
                conn.state = ConnState::RespBody;
                Ok(())
            }
            Err(Error::RxMoreData) => {
                conn.rx_more_data = true;
                Ok(())
            }
            Err(e) => Err(e),
        },
        ConnState::RespBody
        | ConnState::RespChunkSize
        | ConnState::RespChunkData
        | ConnState::RespChunkCrlf
        | ConnState::RespChunkLast => {
            let r = if conn.resp_chunked { body_chunk(conn, h) } else { body_std(conn, h) };
            match r {
                Ok(()) => {
                    conn.rx_more_data = false;
                    conn.state = ConnState::RespCompleted;
                    Ok(())
                }
                Err(Error::RxMoreData) => {
                    conn.rx_more_data = true;
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        ConnState::RespCompleted => {
            conn.resp_complete_ok = true;
            conn.state = ConnState::Completed;
            Ok(())
        }
        _ => Err(Error::InvalidState),
    }
}

fn status_line<S: Socket>(conn: &mut Conn<'_, S>) -> Result<(), Error> {
    conn.resp = Response::default();
    let buf_full = conn.rx.len >= conn.buf.len();
    let (ver, status, consumed) = {
        let win = conn.rx_window();
        // not enough for even the shortest token yet
        if win.len() <= 4 {
            return Err(Error::RxMoreData);
        }
        // skip anything non-graphic left over before the status line
        let lead = match win.iter().position(|b| b.is_ascii_graphic()) {
            Some(p) => p,
            None => return Err(Error::RxMoreData),
        };
        let area = &win[lead..];
        let eol = match codec::find_crlf(area) {
            Some(p) => p,
            None if buf_full => return Err(Error::RespFormatInvalid),
            None => return Err(Error::RxMoreData),
        };
        let line = &area[..eol];
        let ver = ProtocolVer::from_bytes(line).ok_or(Error::RespProtocolVerInvalid)?;
        if ver != ProtocolVer::Http11 {
            return Err(Error::RespProtocolVerInvalid);
        }
        let sp = line.iter().position(|&b| b == b' ').ok_or(Error::RespFormatInvalid)?;
        let (code, _) = codec::parse_dec(&line[sp + 1..]).ok_or(Error::RespFormatInvalid)?;
        let code = u16::try_from(code).map_err(|_| Error::RespStatusCodeInvalid)?;
        let status = StatusCode::from_u16(code).ok_or(Error::RespStatusCodeInvalid)?;
        (ver, status, lead + eol + CRLF.len())
    };
    conn.resp.protocol_ver = Some(ver);
    conn.resp.status = Some(status);
    conn.resp.reason = status.reason();
    conn.rx_consume(consumed);
    Ok(())
}

/// What a parsed header line asks the connection to remember.
enum HdrAction {
    None,
    ToClose,
    Chunked,
    ContentType(ContentType),
    ContentLen(usize),
}

fn headers<S: Socket, H: EventHandler>(conn: &mut Conn<'_, S>, h: &mut H) -> Result<(), Error> {
    loop {
        let buf_full = conn.rx.len >= conn.buf.len();
        let (action, consumed) = {
            let win = conn.rx_window();
            let eol = match codec::find_crlf(win) {
                Some(p) => p,
                None if buf_full => return Err(Error::RespHdrMalformed),
                None => return Err(Error::RxMoreData),
            };
            if eol == 0 {
                // empty line: end of the header block
                conn.rx_consume(CRLF.len());
                return Ok(());
            }
            let line = &win[..eol];
            let colon = line.iter().position(|&b| b == b':').ok_or(Error::RespHdrMalformed)?;
            let name = trim(&line[..colon]);
            let value = lead_graphic(&line[colon + 1..]).ok_or(Error::RespHdrMalformed)?;
            let action = match HeaderField::from_bytes(name) {
                Some(HeaderField::Connection) => {
                    match ConnHdrVal::from_bytes(value) {
                        Some(ConnHdrVal::Close) => HdrAction::ToClose,
                        Some(ConnHdrVal::KeepAlive) => HdrAction::None,
                        _ => return Err(Error::RespHdrInvalid),
                    }
                }
                Some(HeaderField::ContentType) => {
                    let ct = ContentType::from_bytes(value)
                        .ok_or(Error::RespContentTypeInvalid)?;
                    HdrAction::ContentType(ct)
                }
                Some(HeaderField::ContentLength) => {
                    let (len, _) =
                        codec::parse_dec(value).ok_or(Error::RespContentLenInvalid)?;
                    if len == 0 {
                        return Err(Error::RespContentLenInvalid);
                    }
                    HdrAction::ContentLen(len)
                }
                Some(HeaderField::TransferEncoding) => {
                    if TransferEncoding::from_bytes(value).is_none() {
                        return Err(Error::RespHdrInvalid);
                    }
                    HdrAction::Chunked
                }
                Some(field) => {
                    h.on_header(field, value);
                    HdrAction::None
                }
                None => HdrAction::None, // outside the dictionary: skip
            };
            (action, eol + CRLF.len())
        };
        match action {
            HdrAction::None => {}
            HdrAction::ToClose => {
                conn.to_close = true;
                conn.close_status = CloseStatus::NotPersistent;
            }
            HdrAction::Chunked => conn.resp_chunked = true,
            HdrAction::ContentType(ct) => conn.resp.content_type = Some(ct),
            HdrAction::ContentLen(len) => conn.resp.content_len = Some(len),
        }
        conn.rx_consume(consumed);
    }
}

fn trim(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(s.len());
    let end = s.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |p| p + 1);
    &s[start..end]
}

/// Skip leading whitespace; a value with no graphic character is malformed.
fn lead_graphic(s: &[u8]) -> Option<&[u8]> {
    s.iter().position(|b| b.is_ascii_graphic()).map(|p| &s[p..])
}

/// Content-length delimited body: hand `min(remaining, buffered)` bytes to
/// the sink per step; the final delivery is flagged. The sink may consume
/// fewer bytes than offered; the rest is re-offered on the next step.
fn body_std<S: Socket, H: EventHandler>(conn: &mut Conn<'_, S>, h: &mut H) -> Result<(), Error> {
    let content_len = conn.resp.content_len.unwrap_or(0);
    let ct = conn.resp.content_type;
    let rem = content_len - conn.rx.body_total;
    let chunk = rem.min(conn.rx.len);
    let last = conn.rx.body_total + chunk == content_len;
    let consumed = {
        let win = conn.rx_window();
        h.on_body(ct, &win[..chunk], last).min(chunk)
    };
    conn.rx.body_total += consumed;
    conn.rx_consume(consumed);
    if conn.rx.body_total == content_len { Ok(()) } else { Err(Error::RxMoreData) }
}

/// Chunked body sub-machine: size line, payload, trailing CRLF, repeated
/// until the zero-size terminating chunk.
fn body_chunk<S: Socket, H: EventHandler>(conn: &mut Conn<'_, S>, h: &mut H) -> Result<(), Error> {
    loop {
        match conn.state {
            ConnState::RespBody | ConnState::RespChunkSize => {
                let buf_full = conn.rx.len >= conn.buf.len();
                let (len, consumed) = {
                    let win = conn.rx_window();
                    let eol = match codec::find_crlf(win) {
                        Some(p) => p,
                        None if buf_full => return Err(Error::RespChunkInvalid),
                        None => return Err(Error::RxMoreData),
                    };
                    // hex digits first; anything between them and the CRLF
                    // (chunk extensions) is ignored
                    let (val, _) = codec::parse_hex(win).ok_or(Error::RespChunkInvalid)?;
                    (val, eol + CRLF.len())
                };
                conn.rx_consume(consumed);
                conn.rx.chunk_rem = len;
                conn.state =
                    if len == 0 { ConnState::RespChunkLast } else { ConnState::RespChunkData };
            }
            ConnState::RespChunkData => {
                if conn.rx.len < conn.rx.chunk_rem && conn.rx.len < conn.buf.len() {
                    // partial chunk and room to receive more: top up before
                    // delivering
                    return Err(Error::RxMoreData);
                }
                let data_len = conn.rx.chunk_rem.min(conn.rx.len);
                let ct = conn.resp.content_type;
                let consumed = {
                    let win = conn.rx_window();
                    h.on_body(ct, &win[..data_len], false).min(data_len)
                };
                conn.rx_consume(consumed);
                conn.rx.chunk_rem -= consumed;
                if consumed < data_len {
                    return Err(Error::RxMoreData);
                }
                if conn.rx.chunk_rem == 0 {
                    conn.state = ConnState::RespChunkCrlf;
                } else {
                    return Err(Error::RxMoreData);
                }
            }
            ConnState::RespChunkCrlf => {
                if conn.rx.len < CRLF.len() {
                    return Err(Error::RxMoreData);
                }
                if &conn.rx_window()[..CRLF.len()] != CRLF {
                    return Err(Error::RespChunkInvalid);
                }
                conn.rx_consume(CRLF.len());
                conn.state = ConnState::RespChunkSize;
            }
            ConnState::RespChunkLast => {
                let ct = conn.resp.content_type;
                let _ = h.on_body(ct, &[], true);
                return Ok(());
            }
            _ => return Err(Error::InvalidState),
        }
    }
}
