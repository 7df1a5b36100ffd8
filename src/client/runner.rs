//! Cooperative driver for multiple connections.
//!
//! For firmware main loops that cannot block: each [`Runner::tick`] advances
//! every registered connection by exactly one state-machine step, so no
//! connection can starve another. Events are delivered through the handler
//! paired with each connection at registration time.

use heapless::Vec;

use crate::transport::Connect;

use super::conn::{Conn, ConnState};
use super::error::Error;
use super::EventHandler;

/// Drives up to `MAX` connections one step per tick.
pub struct Runner<'c, 'a, N: Connect, H: EventHandler, const MAX: usize> {
    net: N,
    slots: Vec<(&'c mut Conn<'a, N::Socket>, H), MAX>,
}

impl<'c, 'a, N: Connect, H: EventHandler, const MAX: usize> Runner<'c, 'a, N, H, MAX> {
    /// Wrap a network connector.
    pub fn new(net: N) -> Self {
        Self { net, slots: Vec::new() }
    }

    /// Register a connection and its event handler. Returns the slot index.
    pub fn add(&mut self, conn: &'c mut Conn<'a, N::Socket>, handler: H) -> Result<usize, Error> {
        let ix = self.slots.len();
        self.slots.push((conn, handler)).map_err(|_| Error::QueueFull)?;
        Ok(ix)
    }

    /// Handler registered at `ix`, for retrieving accumulated results.
    pub fn handler_mut(&mut self, ix: usize) -> Option<&mut H> {
        self.slots.get_mut(ix).map(|(_, h)| h)
    }

    /// Connection registered at `ix`.
    pub fn conn_mut(&mut self, ix: usize) -> Option<&mut Conn<'a, N::Socket>> {
        self.slots.get_mut(ix).map(|(c, _)| &mut **c)
    }

    /// Advance every connection by one step. Returns `true` while any
    /// connection still has work in flight.
    pub fn tick(&mut self) -> bool {
        let Self { net, slots } = self;
        let mut active = false;
        for (conn, handler) in slots.iter_mut() {
            conn.process(net, handler);
            if conn.state() != ConnState::None
                && (conn.state() != ConnState::ParamValidate || conn.pending_requests() > 0)
            {
                active = true;
            }
        }
        active
    }

    /// Briefly poll each connection's socket for readiness, so an idle loop
    /// sleeps in the transport instead of spinning.
    pub fn idle_poll(&mut self, timeout_ms: u32) {
        for (conn, _) in self.slots.iter_mut() {
            conn.poll_ready(timeout_ms);
        }
    }
}
