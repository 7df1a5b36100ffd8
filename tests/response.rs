mod common;

use common::{Capture, MockNet, MockSocket, Wire, drive};
use libhttpc::client::{CloseStatus, Conn, Error, RequestBuilder};
use libhttpc::http::{HeaderField, Method, StatusCode};
use libhttpc::transport::ConnectCfg;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn run(resp_chunks: &[&[u8]], persistent: bool) -> (Capture, Option<Error>) {
    let wire = Wire::default();
    let mut net = MockNet::new(MockSocket::new(&wire).respond_split(resp_chunks));
    let mut buf = [0u8; 512];
    let mut conn = Conn::new(&mut buf);
    let mut cap = Capture::default();
    conn.open("example.com", 80, ConnectCfg::default(), persistent).unwrap();
    conn.process(&mut net, &mut cap);
    conn.submit(RequestBuilder::new(Method::Get, "/").build().unwrap()).unwrap();
    drive(&mut conn, &mut net, &mut cap);
    let err = conn.last_err();
    (cap, err)
}

#[test]
fn content_length_body_across_three_receives() {
    let full = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nHello";
    let (cap, _) = run(&[&full[..10], &full[10..15], &full[15..]], true);

    assert_eq!(cap.completions.len(), 1);
    let (resp, ok) = &cap.completions[0];
    assert!(ok);
    assert_eq!(resp.status, Some(StatusCode::Ok));
    assert_eq!(resp.content_len, Some(5));
    assert_eq!(cap.body, b"Hello");
    assert_eq!(cap.last_flags, 1);
}

#[test]
fn chunked_body_fed_one_byte_at_a_time() {
    let full = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";
    let chunks: Vec<&[u8]> = full.chunks(1).collect();
    let (cap, _) = run(&chunks, true);

    assert_eq!(cap.body, b"Wikipedia");
    assert_eq!(cap.last_flags, 1);
    assert!(cap.completions[0].1);
    // the final-chunk flag arrived on the very last delivery
    assert!(cap.body_calls >= 3);
}

#[test]
fn chunked_body_under_random_splits() {
    let full: &[u8] =
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n6\r\nabcdef\r\n10\r\n0123456789ABCDEF\r\n1\r\n!\r\n0\r\n\r\n";
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..50 {
        let mut chunks: Vec<&[u8]> = Vec::new();
        let mut rest = full;
        while !rest.is_empty() {
            let n = rng.gen_range(1..=rest.len().min(9));
            chunks.push(&rest[..n]);
            rest = &rest[n..];
        }
        let (cap, err) = run(&chunks, true);
        assert_eq!(err, None);
        assert_eq!(cap.body, b"abcdef0123456789ABCDEF!");
        assert_eq!(cap.last_flags, 1);
        assert!(cap.completions[0].1);
    }
}

#[test]
fn reason_phrase_comes_from_the_dictionary() {
    let (cap, _) = run(&[b"HTTP/1.1 404 Whatever The Server Says\r\nContent-Length: 1\r\n\r\nx"], true);
    let (resp, ok) = &cap.completions[0];
    assert!(ok);
    assert_eq!(resp.status, Some(StatusCode::NotFound));
    assert_eq!(resp.reason, "Not Found");
}

#[test]
fn http10_response_is_rejected() {
    let (cap, err) = run(&[b"HTTP/1.0 200 OK\r\nContent-Length: 1\r\n\r\nx"], true);
    assert_eq!(err, Some(Error::RespProtocolVerInvalid));
    assert_eq!(cap.errors, vec![Error::RespProtocolVerInvalid]);
    assert!(!cap.completions[0].1);
}

#[test]
fn unknown_status_code_is_rejected() {
    let (_, err) = run(&[b"HTTP/1.1 299 Custom\r\nContent-Length: 1\r\n\r\nx"], true);
    assert_eq!(err, Some(Error::RespStatusCodeInvalid));
}

#[test]
fn header_without_colon_is_malformed() {
    let (_, err) = run(&[b"HTTP/1.1 200 OK\r\nBroken header line\r\n\r\n"], true);
    assert_eq!(err, Some(Error::RespHdrMalformed));
}

#[test]
fn zero_content_length_is_rejected() {
    let (_, err) = run(&[b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n"], true);
    assert_eq!(err, Some(Error::RespContentLenInvalid));
}

#[test]
fn non_chunked_transfer_encoding_is_rejected() {
    let (_, err) = run(&[b"HTTP/1.1 200 OK\r\nTransfer-Encoding: gzip\r\n\r\n"], true);
    assert_eq!(err, Some(Error::RespHdrInvalid));
}

#[test]
fn invalid_chunk_size_is_rejected() {
    let (_, err) = run(
        &[b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\nWiki\r\n0\r\n\r\n"],
        true,
    );
    assert_eq!(err, Some(Error::RespChunkInvalid));
}

#[test]
fn missing_chunk_crlf_is_rejected() {
    let (_, err) = run(
        &[b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWikiXX5\r\npedia\r\n0\r\n\r\n"],
        true,
    );
    assert_eq!(err, Some(Error::RespChunkInvalid));
}

#[test]
fn connection_close_header_closes_after_transaction() {
    let (cap, _) = run(
        &[b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 2\r\n\r\nok"],
        true,
    );
    assert!(cap.completions[0].1);
    assert_eq!(cap.closed, Some(CloseStatus::NotPersistent));
}

#[test]
fn keep_alive_header_leaves_connection_open() {
    let wire = Wire::default();
    let mut net = MockNet::new(MockSocket::new(&wire).respond(
        b"HTTP/1.1 200 OK\r\nConnection: keep-alive\r\nContent-Length: 2\r\n\r\nok",
    ));
    let mut buf = [0u8; 512];
    let mut conn = Conn::new(&mut buf);
    let mut cap = Capture::default();
    conn.open("example.com", 80, ConnectCfg::default(), true).unwrap();
    conn.process(&mut net, &mut cap);
    conn.submit(RequestBuilder::new(Method::Get, "/").build().unwrap()).unwrap();
    drive(&mut conn, &mut net, &mut cap);

    assert!(conn.is_connected());
    assert_eq!(cap.closed, None);
}

#[test]
fn uninterpreted_dictionary_header_reaches_the_hook() {
    let (cap, _) =
        run(&[b"HTTP/1.1 200 OK\r\nServer: mock/1.0\r\nContent-Length: 2\r\n\r\nok"], true);
    assert!(
        cap.headers
            .iter()
            .any(|(f, v)| *f == HeaderField::Server && v == b"mock/1.0")
    );
}

#[test]
fn headers_outside_the_dictionary_are_skipped() {
    let (cap, err) =
        run(&[b"HTTP/1.1 200 OK\r\nX-Custom-Thing: 42\r\nContent-Length: 2\r\n\r\nok"], true);
    assert_eq!(err, None);
    assert!(cap.headers.is_empty());
    assert!(cap.completions[0].1);
}

#[test]
fn peer_close_mid_body_fails_the_transaction() {
    let wire = Wire::default();
    let mut net = MockNet::new(
        MockSocket::new(&wire)
            .respond(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nHel")
            .close_after_script(),
    );
    let mut buf = [0u8; 512];
    let mut conn = Conn::new(&mut buf);
    let mut cap = Capture::default();
    conn.open("example.com", 80, ConnectCfg::default(), true).unwrap();
    conn.process(&mut net, &mut cap);
    conn.submit(RequestBuilder::new(Method::Get, "/").build().unwrap()).unwrap();
    drive(&mut conn, &mut net, &mut cap);

    assert_eq!(cap.errors, vec![Error::SockClosed]);
    assert!(!cap.completions[0].1);
    assert_eq!(cap.closed, Some(CloseStatus::Server));
}

#[test]
fn status_line_split_mid_token_still_parses() {
    let full = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";
    // split inside "HTTP/1.1" and inside the CRLF pair
    let (cap, err) = run(&[&full[..4], &full[4..16], &full[16..]], true);
    assert_eq!(err, None);
    assert_eq!(cap.completions[0].0.status, Some(StatusCode::Ok));
    assert!(cap.completions[0].1);
}
