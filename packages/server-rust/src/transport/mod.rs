//! Per-operation ZeroMQ endpoints.
//!
//! Each bound operation owns exactly one socket. A `pull@` binding receives
//! fire-and-forget messages; a `rep@` binding answers every request with the
//! operation's result.

pub mod binder;
pub mod reply;

use std::fmt;

use metrics::Counter;

use crate::error::GatewayError;

pub use binder::BindingSpec;
pub use reply::{ReplySink, ReplyTracer};

/// Messaging pattern of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Push/pull: the peer never waits for a reply.
    Pull,
    /// Request/reply: the peer blocks until the operation replies.
    Rep,
}

impl Scheme {
    /// Splits `scheme@address` into its parts.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownScheme`] unless the prefix is exactly
    /// `pull` or `rep`, and [`GatewayError::InvalidBinding`] if no address
    /// follows the `@`.
    pub fn parse(spec: &str) -> Result<(Self, &str), GatewayError> {
        let unknown = || GatewayError::UnknownScheme {
            spec: spec.to_string(),
        };
        let (prefix, address) = spec.split_once('@').ok_or_else(unknown)?;
        let scheme = match prefix {
            "pull" => Self::Pull,
            "rep" => Self::Rep,
            _ => return Err(unknown()),
        };
        if address.is_empty() {
            return Err(GatewayError::InvalidBinding {
                arg: spec.to_string(),
            });
        }
        Ok((scheme, address))
    }

    /// Socket type bound for this scheme.
    #[must_use]
    pub fn socket_type(self) -> zmq::SocketType {
        match self {
            Self::Pull => zmq::PULL,
            Self::Rep => zmq::REP,
        }
    }

    /// Whether the peer waits for a reply to every message.
    #[must_use]
    pub fn expects_reply(self) -> bool {
        matches!(self, Self::Rep)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pull => "pull",
            Self::Rep => "rep",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traffic counters of one binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Messages received and dispatched.
    pub calls: u64,
    /// Bytes received.
    pub bytes_in: u64,
    /// Bytes successfully sent back as replies.
    pub bytes_out: u64,
}

/// A bound socket serving one operation.
pub struct TransportHandle {
    socket: zmq::Socket,
    scheme: Scheme,
    address: String,
    op: String,
    stats: TransportStats,
    calls_total: Counter,
    bytes_in_total: Counter,
    bytes_out_total: Counter,
}

impl TransportHandle {
    pub(crate) fn new(socket: zmq::Socket, scheme: Scheme, address: &str, op: &str) -> Self {
        let label = op.to_string();
        Self {
            socket,
            scheme,
            address: address.to_string(),
            op: op.to_string(),
            stats: TransportStats::default(),
            calls_total: metrics::counter!("dbzmq_calls_total", "op" => label.clone()),
            bytes_in_total: metrics::counter!("dbzmq_bytes_in_total", "op" => label.clone()),
            bytes_out_total: metrics::counter!("dbzmq_bytes_out_total", "op" => label),
        }
    }

    #[must_use]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Address the socket was bound to, as given on the command line.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Name of the operation this binding serves.
    #[must_use]
    pub fn op(&self) -> &str {
        &self.op
    }

    #[must_use]
    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    /// Readiness probe for the poll set.
    #[must_use]
    pub fn poll_item(&self) -> zmq::PollItem<'_> {
        self.socket.as_poll_item(zmq::POLLIN)
    }

    /// Takes one pending message without blocking.
    ///
    /// Returns `Ok(None)` when nothing is pending.
    ///
    /// # Errors
    ///
    /// Returns the socket error for anything other than "would block".
    pub fn try_recv(&self) -> Result<Option<Vec<u8>>, zmq::Error> {
        match self.socket.recv_bytes(zmq::DONTWAIT) {
            Ok(message) => Ok(Some(message)),
            Err(zmq::Error::EAGAIN) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Counts one received message of `len` bytes.
    pub fn record_inbound(&mut self, len: usize) {
        let len = len as u64;
        self.stats.calls += 1;
        self.stats.bytes_in += len;
        self.calls_total.increment(1);
        self.bytes_in_total.increment(len);
    }

    /// Sends `data` back to the peer.
    ///
    /// On a `pull@` binding there is no peer waiting, so the reply is
    /// dropped and `Ok(false)` returned. Outbound bytes are counted only
    /// when the send succeeds.
    ///
    /// # Errors
    ///
    /// Returns the socket error if the send failed.
    pub fn send(&mut self, data: &[u8]) -> Result<bool, zmq::Error> {
        if !self.scheme.expects_reply() {
            return Ok(false);
        }
        self.socket.send(data, 0)?;
        let len = data.len() as u64;
        self.stats.bytes_out += len;
        self.bytes_out_total.increment(len);
        Ok(true)
    }

    /// Answers a pending request with an empty frame so the `rep@` socket
    /// accepts its next request. Not counted as outbound bytes. No-op on
    /// `pull@` bindings.
    ///
    /// # Errors
    ///
    /// Returns the socket error if the send failed.
    pub fn release(&mut self) -> Result<(), zmq::Error> {
        if self.scheme.expects_reply() {
            self.socket.send(&b""[..], 0)?;
        }
        Ok(())
    }
}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportHandle")
            .field("op", &self.op)
            .field("scheme", &self.scheme)
            .field("address", &self.address)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
