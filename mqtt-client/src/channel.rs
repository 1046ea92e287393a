// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

//! The transport abstraction the Client Engine drives: an ordered,
//! duplex byte pipe with no knowledge of MQTT framing. Concrete
//! transports (TCP, TLS, WebSocket, ...) implement [`Channel`];
//! [`crate::encoded_channel::EncodedChannel`] is the only thing in
//! this crate that talks to one directly.

use async_trait::async_trait;

use crate::error::ChannelError;

/// An event a [`Channel`] delivers asynchronously. `Closed` and
/// `Error` are terminal: a well-behaved implementation never yields
/// `IncomingData` after either.
#[derive(Debug)]
pub enum ChannelEvent {
    /// Bytes arrived from the peer, in the order it wrote them.
    IncomingData(Vec<u8>),
    /// The peer closed the connection; no more events will follow.
    Closed,
    /// The transport failed; no more events will follow.
    Error(ChannelError),
}

/// A duplex byte pipe. Implementations live outside the protocol
/// core: a TCP socket, a TLS session, a WebSocket frame stream, or (in
/// tests) an in-memory pair.
#[async_trait]
pub trait Channel: Send {
    /// Write `bytes` to the peer. Ordering with prior `send` calls is
    /// preserved on the wire.
    async fn send(&mut self, bytes: Vec<u8>) -> Result<(), ChannelError>;

    /// Wait for the next event. Implementations should keep returning
    /// `Closed` (or the original `Error`) once the channel has ended,
    /// rather than hanging forever.
    async fn recv(&mut self) -> ChannelEvent;

    /// Best-effort, idempotent teardown. Never fails observably.
    async fn shutdown(&mut self);
}

/// Produces a fresh [`Channel`] on demand. The engine calls this once
/// per `connect()` attempt; a new attempt after a failed or dropped
/// connection gets a brand new channel.
#[async_trait]
pub trait ChannelFactory: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Channel>, ChannelError>;
}
