mod common;

use common::{Capture, MockNet, MockSocket, SIMPLE_OK, Wire, drive, split_wire};
use libhttpc::client::{
    BUF_LEN_MIN, Client, CloseStatus, Conn, ConnState, Error, NullHandler, REQ_QUEUE_CAP,
    RequestBuilder,
};
use libhttpc::http::Method;
use libhttpc::transport::ConnectCfg;

#[test]
fn open_rejects_undersized_buffer() {
    let mut buf = [0u8; BUF_LEN_MIN - 1];
    let mut conn: Conn<'_, MockSocket> = Conn::new(&mut buf);
    assert_eq!(
        conn.open("example.com", 80, ConnectCfg::default(), false),
        Err(Error::BufTooSmall)
    );
}

#[test]
fn open_rejects_empty_hostname() {
    let mut buf = [0u8; 512];
    let mut conn: Conn<'_, MockSocket> = Conn::new(&mut buf);
    assert_eq!(conn.open("", 80, ConnectCfg::default(), false), Err(Error::HostnameInvalid));
}

#[test]
fn open_rejects_reuse_while_in_use() {
    let mut buf = [0u8; 512];
    let mut conn: Conn<'_, MockSocket> = Conn::new(&mut buf);
    conn.open("example.com", 80, ConnectCfg::default(), false).unwrap();
    assert_eq!(conn.open("example.com", 80, ConnectCfg::default(), false), Err(Error::InUse));
    assert_eq!(conn.clear(), Err(Error::InUse));
}

#[test]
fn submit_requires_open_connection() {
    let mut buf = [0u8; 512];
    let mut conn: Conn<'_, MockSocket> = Conn::new(&mut buf);
    let req = RequestBuilder::new(Method::Get, "/").build().unwrap();
    assert_eq!(conn.submit(req), Err(Error::NotOpen));
}

#[test]
fn queue_capacity_is_bounded() {
    let mut buf = [0u8; 512];
    let mut conn: Conn<'_, MockSocket> = Conn::new(&mut buf);
    conn.open("example.com", 80, ConnectCfg::default(), true).unwrap();
    for _ in 0..REQ_QUEUE_CAP {
        conn.submit(RequestBuilder::new(Method::Get, "/").build().unwrap()).unwrap();
    }
    let overflow = RequestBuilder::new(Method::Get, "/").build().unwrap();
    assert_eq!(conn.submit(overflow), Err(Error::QueueFull));
}

#[test]
fn empty_path_is_rejected_at_build_time() {
    assert!(matches!(RequestBuilder::new(Method::Get, "").build(), Err(Error::PathInvalid)));
}

#[test]
fn refused_connect_releases_the_connection() {
    let mut net = MockNet::refusing();
    let mut buf = [0u8; 512];
    let mut conn = Conn::new(&mut buf);
    let mut cap = Capture::default();
    conn.open("example.com", 80, ConnectCfg::default(), false).unwrap();
    conn.process(&mut net, &mut cap);

    assert_eq!(cap.connect, Some(false));
    assert_eq!(conn.state(), ConnState::None);
    assert!(!conn.is_in_use());
    assert_eq!(conn.last_err(), Some(Error::SockConnectFailed));
}

#[test]
fn requests_are_processed_fifo_on_one_connection() {
    let first = b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\none";
    let second = b"HTTP/1.1 201 Created\r\nContent-Length: 3\r\n\r\ntwo";
    let mut script = Vec::new();
    script.extend_from_slice(first);
    script.extend_from_slice(second);

    let wire = Wire::default();
    let mut net = MockNet::new(MockSocket::new(&wire).respond(&script));
    let mut buf = [0u8; 512];
    let mut conn = Conn::new(&mut buf);
    let mut cap = Capture::default();
    conn.open("example.com", 80, ConnectCfg::default(), true).unwrap();
    conn.process(&mut net, &mut cap);

    conn.submit(RequestBuilder::new(Method::Get, "/one").build().unwrap()).unwrap();
    conn.submit(RequestBuilder::new(Method::Get, "/two").build().unwrap()).unwrap();
    assert_eq!(conn.pending_requests(), 2);
    drive(&mut conn, &mut net, &mut cap);

    assert_eq!(cap.completions.len(), 2);
    assert!(cap.completions.iter().all(|(_, ok)| *ok));
    assert_eq!(cap.completions[0].0.status.unwrap().code(), 200);
    assert_eq!(cap.completions[1].0.status.unwrap().code(), 201);
    assert_eq!(cap.body, b"onetwo");

    let wire_bytes = wire.bytes();
    let text = String::from_utf8(wire_bytes).unwrap();
    let one = text.find("GET /one").unwrap();
    let two = text.find("GET /two").unwrap();
    assert!(one < two);
    assert!(conn.is_connected());
}

#[test]
fn non_persistent_connection_closes_after_one_transaction() {
    let wire = Wire::default();
    let mut net = MockNet::new(MockSocket::new(&wire).respond(SIMPLE_OK));
    let mut buf = [0u8; 512];
    let mut conn = Conn::new(&mut buf);
    let mut cap = Capture::default();
    conn.open("example.com", 80, ConnectCfg::default(), false).unwrap();
    conn.process(&mut net, &mut cap);
    conn.submit(RequestBuilder::new(Method::Get, "/").build().unwrap()).unwrap();
    drive(&mut conn, &mut net, &mut cap);

    let (head, _) = split_wire(&wire.bytes());
    assert!(head.contains("Connection: close\r\n"));
    assert!(cap.completions[0].1);
    assert_eq!(cap.closed, Some(CloseStatus::NotPersistent));
    assert_eq!(conn.state(), ConnState::None);
    assert!(!conn.is_in_use());
}

#[test]
fn connection_is_reusable_after_close_and_clear() {
    let wire = Wire::default();
    let mut net = MockNet::new(MockSocket::new(&wire).respond(SIMPLE_OK));
    let mut buf = [0u8; 512];
    let mut conn = Conn::new(&mut buf);
    let mut cap = Capture::default();
    conn.open("example.com", 80, ConnectCfg::default(), false).unwrap();
    conn.process(&mut net, &mut cap);
    conn.submit(RequestBuilder::new(Method::Get, "/").build().unwrap()).unwrap();
    drive(&mut conn, &mut net, &mut cap);
    assert_eq!(conn.state(), ConnState::None);

    conn.clear().unwrap();
    let wire2 = Wire::default();
    let mut net2 = MockNet::new(MockSocket::new(&wire2).respond(SIMPLE_OK));
    conn.open("example.com", 80, ConnectCfg::default(), false).unwrap();
    conn.process(&mut net2, &mut cap);
    conn.submit(RequestBuilder::new(Method::Get, "/again").build().unwrap()).unwrap();
    drive(&mut conn, &mut net2, &mut cap);

    let (head, _) = split_wire(&wire2.bytes());
    assert!(head.starts_with("GET /again"));
}

#[test]
fn requested_close_fails_out_queued_requests() {
    let wire = Wire::default();
    let mut net = MockNet::new(MockSocket::new(&wire).respond(SIMPLE_OK));
    let mut buf = [0u8; 512];
    let mut conn = Conn::new(&mut buf);
    let mut cap = Capture::default();
    conn.open("example.com", 80, ConnectCfg::default(), true).unwrap();
    conn.process(&mut net, &mut cap);
    conn.submit(RequestBuilder::new(Method::Get, "/never").build().unwrap()).unwrap();

    conn.request_close().unwrap();
    drive(&mut conn, &mut net, &mut cap);

    assert_eq!(cap.errors, vec![Error::SockClosed]);
    assert_eq!(cap.closed, Some(CloseStatus::App));
    assert_eq!(conn.state(), ConnState::None);
}

#[test]
fn server_half_close_aborts_the_next_request() {
    let wire = Wire::default();
    let mut sock = MockSocket::new(&wire);
    sock.half_closed = true;
    let mut net = MockNet::new(sock);
    let mut buf = [0u8; 512];
    let mut conn = Conn::new(&mut buf);
    let mut cap = Capture::default();
    conn.open("example.com", 80, ConnectCfg::default(), true).unwrap();
    conn.process(&mut net, &mut cap);
    conn.submit(RequestBuilder::new(Method::Get, "/late").build().unwrap()).unwrap();
    drive(&mut conn, &mut net, &mut cap);

    assert_eq!(cap.completions.len(), 1);
    assert!(!cap.completions[0].1);
    assert_eq!(cap.closed, Some(CloseStatus::Server));
    assert!(wire.bytes().is_empty());
}

#[test]
fn blocking_client_send_returns_the_response() {
    let wire = Wire::default();
    let sock = MockSocket::new(&wire)
        .respond(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nHello");
    let mut client = Client::new(MockNet::new(sock));
    let mut buf = [0u8; 512];
    let mut conn = Conn::new(&mut buf);
    let mut cap = Capture::default();

    client
        .open(&mut conn, "example.com", 80, ConnectCfg::default(), true, &mut cap)
        .unwrap();
    let req = RequestBuilder::new(Method::Get, "/hello").build().unwrap();
    let resp = client.send(&mut conn, req, &mut cap).unwrap();

    assert_eq!(resp.status.unwrap().code(), 200);
    assert_eq!(resp.content_len, Some(5));
    assert_eq!(cap.body, b"Hello");

    client.close(&mut conn, &mut NullHandler).unwrap();
    assert_eq!(conn.state(), ConnState::None);
}

#[test]
fn blocking_client_surfaces_connect_failure() {
    let mut client = Client::new(MockNet::refusing());
    let mut buf = [0u8; 512];
    let mut conn = Conn::new(&mut buf);
    let err = client
        .open(&mut conn, "example.com", 80, ConnectCfg::default(), true, &mut NullHandler)
        .unwrap_err();
    assert_eq!(err, Error::SockConnectFailed);
}

#[test]
fn runner_drives_two_connections_cooperatively() {
    use libhttpc::client::Runner;

    let wire_a = Wire::default();
    let wire_b = Wire::default();

    let mut buf_a = [0u8; 512];
    let mut buf_b = [0u8; 512];
    let mut conn_a = Conn::new(&mut buf_a);
    let mut conn_b = Conn::new(&mut buf_b);
    conn_a.open("a.example.com", 80, ConnectCfg::default(), false).unwrap();
    conn_b.open("b.example.com", 80, ConnectCfg::default(), false).unwrap();
    conn_a.submit(RequestBuilder::new(Method::Get, "/a").build().unwrap()).unwrap();
    conn_b.submit(RequestBuilder::new(Method::Get, "/b").build().unwrap()).unwrap();

    // one connector per runner tick set: sockets are handed out in add order
    struct TwoNet {
        socks: Vec<MockSocket>,
    }
    impl libhttpc::transport::Connect for TwoNet {
        type Socket = MockSocket;
        fn connect(
            &mut self,
            _h: &str,
            _p: u16,
            _c: &libhttpc::transport::ConnectCfg<'_>,
        ) -> Result<MockSocket, libhttpc::transport::Error> {
            self.socks.pop().ok_or(libhttpc::transport::Error::Refused)
        }
    }

    let net = TwoNet {
        socks: vec![
            MockSocket::new(&wire_b).respond(SIMPLE_OK),
            MockSocket::new(&wire_a).respond(SIMPLE_OK),
        ],
    };

    let mut runner: Runner<'_, '_, TwoNet, Capture, 4> = Runner::new(net);
    let a = runner.add(&mut conn_a, Capture::default()).unwrap();
    let b = runner.add(&mut conn_b, Capture::default()).unwrap();

    let mut ticks = 0;
    while runner.tick() {
        ticks += 1;
        assert!(ticks < 10_000, "runner never settled");
    }

    assert!(runner.handler_mut(a).unwrap().completions[0].1);
    assert!(runner.handler_mut(b).unwrap().completions[0].1);
    let head_a = String::from_utf8(wire_a.bytes()).unwrap();
    let head_b = String::from_utf8(wire_b.bytes()).unwrap();
    assert!(head_a.starts_with("GET /a HTTP/1.1"));
    assert!(head_b.starts_with("GET /b HTTP/1.1"));
}
