//! # libhttpc - Embedded HTTP/1.1 Client
//!
//! A lightweight HTTP/1.1 client designed for embedded systems and `no_std`
//! environments. The entire request/response cycle is driven through a single
//! caller-owned byte buffer, so requests and responses of unbounded size can
//! be streamed through a device with only a few hundred bytes of RAM to spare.
//!
//! ## Features
//!
//! - HTTP/1.1 request encoding: request line, query strings, headers,
//!   raw bodies, chunked transfer encoding, URL-encoded and multipart forms
//! - Incremental HTTP/1.1 response parsing: status line, headers,
//!   content-length and chunked bodies
//! - Non-blocking, state-machine driven core: every "buffer full" or "need
//!   more data" condition is a return, never a wait, and processing resumes
//!   exactly where it stopped
//! - Persistent (keep-alive) connections with a FIFO of pending requests
//! - Connection agnostic: works with any transport implementing the
//!   [`transport`] traits
//! - Fixed-size buffers for predictable memory usage
//!
//! ## Design
//!
//! The [`client::Conn`] object owns one shared transmit/receive buffer and a
//! queue of pending requests. Calling [`client::Conn::process`] advances the
//! connection by one state-machine step: connecting, encoding a slice of the
//! request into the buffer, draining the buffer into the socket, or parsing
//! response bytes the socket placed into the same buffer. Oversized pieces of
//! a transaction (long URIs, large body slices) are transmitted straight from
//! caller memory without ever being copied into the buffer.
//!
//! Two execution modes are built on the same core:
//!
//! - **Blocking**: [`client::Client`] drives `process` in a loop until the
//!   transaction completes and returns the decoded [`client::Response`].
//! - **Cooperative**: [`client::Runner`] advances many connections one step
//!   per tick, for firmware main loops that cannot block.
//!
//! ## Usage
//!
//! ```text
//! let mut buf = [0u8; 512];
//! let mut conn = Conn::new(&mut buf);
//! let mut client = Client::new(network);
//!
//! client.open(&mut conn, "example.com", 80, ConnectCfg::default(), false, &mut handler)?;
//!
//! let req = RequestBuilder::new(Method::Get, "/api/data").build()?;
//! let resp = client.send(&mut conn, req, &mut handler)?;
//! ```
//!
//! Body bytes are delivered incrementally through the
//! [`client::EventHandler::on_body`] hook as they arrive; the returned
//! [`client::Response`] carries the decoded status line and entity headers.
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Linux-based devices (Raspberry Pi, etc.)
//! - Any platform supporting Rust's `core` library
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `defmt`: Enable defmt formatting of errors for embedded debugging

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]

/// Transport abstraction consumed by the client: a connector plus a
/// non-blocking TCP-like byte stream with readiness polling and half-close
/// detection.
pub mod transport;

/// Static HTTP dictionary (methods, status codes, header fields, content
/// types) and pure wire-format helpers (URL encoding, chunk-size lines,
/// header lines).
pub mod http;

/// The HTTP client itself: connection state machine, request encoder,
/// response decoder, and the blocking/cooperative facades.
pub mod client;
