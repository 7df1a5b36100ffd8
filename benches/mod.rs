use criterion::{Criterion, criterion_group, criterion_main};

use libhttpc::client::{Body, Conn, ConnState, FormField, NullHandler, RequestBuilder};
use libhttpc::http::Method;
use libhttpc::transport::{Connect, ConnectCfg, Error, Interest, Readiness, Socket};

/// Socket that swallows writes and replays a canned response.
struct BenchSocket {
    resp: Vec<u8>,
    at: usize,
}

impl Socket for BenchSocket {
    fn send(&mut self, data: &[u8]) -> Result<usize, Error> {
        Ok(data.len())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if self.at == self.resp.len() {
            return Err(Error::WouldBlock);
        }
        let n = (self.resp.len() - self.at).min(buf.len());
        buf[..n].copy_from_slice(&self.resp[self.at..self.at + n]);
        self.at += n;
        Ok(n)
    }

    fn poll(&mut self, _interest: Interest, _timeout_ms: u32) -> Result<Readiness, Error> {
        Ok(Readiness { readable: true, writable: true, error: false })
    }

    fn is_rx_closed(&mut self) -> bool {
        false
    }

    fn close(self) -> Result<(), Error> {
        Ok(())
    }
}

struct BenchNet {
    resp: Vec<u8>,
}

impl Connect for BenchNet {
    type Socket = BenchSocket;

    fn connect(
        &mut self,
        _hostname: &str,
        _port: u16,
        _cfg: &ConnectCfg<'_>,
    ) -> Result<BenchSocket, Error> {
        Ok(BenchSocket { resp: self.resp.clone(), at: 0 })
    }
}

fn drive(conn: &mut Conn<'_, BenchSocket>, net: &mut BenchNet) {
    loop {
        conn.process(net, &mut NullHandler);
        match conn.state() {
            ConnState::None => return,
            ConnState::ParamValidate if conn.pending_requests() == 0 => return,
            _ => {}
        }
    }
}

fn bench_encode_form_post(c: &mut Criterion) {
    let resp = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok".to_vec();
    c.bench_function("encode_form_post_512B_buffer", |b| {
        b.iter(|| {
            let mut net = BenchNet { resp: resp.clone() };
            let mut fields = [
                FormField::key_val("From", "+15551234567").unwrap(),
                FormField::key_val("To", "+15557654321").unwrap(),
                FormField::key_val("Body", "Hello from the bench harness").unwrap(),
            ];
            let mut buf = [0u8; 512];
            let mut conn = Conn::new(&mut buf);
            conn.open("example.com", 80, ConnectCfg::default(), true).unwrap();
            conn.process(&mut net, &mut NullHandler);
            let req = RequestBuilder::new(Method::Post, "/Messages")
                .body(Body::FormUrlEncoded { fields: &mut fields })
                .build()
                .unwrap();
            conn.submit(req).unwrap();
            drive(&mut conn, &mut net);
        })
    });
}

fn bench_decode_chunked(c: &mut Criterion) {
    let mut resp = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
    for _ in 0..64 {
        resp.extend_from_slice(b"20\r\nabcdefghijklmnopqrstuvwxyz012345\r\n");
    }
    resp.extend_from_slice(b"0\r\n\r\n");

    c.bench_function("decode_chunked_2KiB_body", |b| {
        b.iter(|| {
            let mut net = BenchNet { resp: resp.clone() };
            let mut buf = [0u8; 512];
            let mut conn = Conn::new(&mut buf);
            conn.open("example.com", 80, ConnectCfg::default(), true).unwrap();
            conn.process(&mut net, &mut NullHandler);
            let req = RequestBuilder::new(Method::Get, "/stream").build().unwrap();
            conn.submit(req).unwrap();
            drive(&mut conn, &mut net);
        })
    });
}

criterion_group!(benches, bench_encode_form_post, bench_decode_chunked);
criterion_main!(benches);
