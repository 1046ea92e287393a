// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

//! In-memory [`Channel`] pair used to drive the Client Engine's state
//! machine in tests without a real socket -- the "channel interface +
//! fake test transport" share of the implementation budget.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::channel::{Channel, ChannelEvent, ChannelFactory};
use crate::error::ChannelError;

/// The engine-facing end of a fake connection: bytes written here
/// arrive on the paired [`FakeServerHandle`], and bytes pushed on that
/// handle surface here as [`ChannelEvent::IncomingData`].
pub struct FakeChannel {
    outgoing_tx: mpsc::UnboundedSender<Vec<u8>>,
    incoming_rx: mpsc::UnboundedReceiver<ChannelEvent>,
}

/// The test-harness-facing end of a fake connection: the "server"
/// side of the pipe.
pub struct FakeServerHandle {
    outgoing_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    incoming_tx: mpsc::UnboundedSender<ChannelEvent>,
}

#[must_use]
pub fn fake_channel_pair() -> (FakeChannel, FakeServerHandle) {
    let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
    let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
    (
        FakeChannel {
            outgoing_tx,
            incoming_rx,
        },
        FakeServerHandle {
            outgoing_rx,
            incoming_tx,
        },
    )
}

#[async_trait]
impl Channel for FakeChannel {
    async fn send(&mut self, bytes: Vec<u8>) -> Result<(), ChannelError> {
        self.outgoing_tx
            .send(bytes)
            .map_err(|_| ChannelError::SendFailed("fake peer dropped".into()))
    }

    async fn recv(&mut self) -> ChannelEvent {
        self.incoming_rx.recv().await.unwrap_or(ChannelEvent::Closed)
    }

    async fn shutdown(&mut self) {
        // Dropping the sender is the only observable effect: the peer
        // sees its next `recv_sent()` resolve to `None`.
    }
}

impl FakeServerHandle {
    /// Next chunk of bytes the client side sent, in order. Resolves
    /// to `None` once the client has shut the channel down.
    pub async fn recv_sent(&mut self) -> Option<Vec<u8>> {
        self.outgoing_rx.recv().await
    }

    /// Push a raw byte chunk to the client as `IncomingData`.
    pub fn push_bytes(&self, bytes: Vec<u8>) {
        let _ = self.incoming_tx.send(ChannelEvent::IncomingData(bytes));
    }

    /// Signal a clean close to the client.
    pub fn close(&self) {
        let _ = self.incoming_tx.send(ChannelEvent::Closed);
    }

    /// Signal a transport error to the client.
    pub fn error(&self, info: impl Into<String>) {
        let _ = self
            .incoming_tx
            .send(ChannelEvent::Error(ChannelError::TransportError(info.into())));
    }
}

/// Builds a fresh [`FakeChannel`] pair on every `connect()` call and
/// hands the matching [`FakeServerHandle`] back to the test harness
/// through an unbounded channel -- one handle per connection attempt,
/// in the order `connect()` was invoked.
pub struct FakeChannelFactory {
    handles_tx: mpsc::UnboundedSender<FakeServerHandle>,
}

impl FakeChannelFactory {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FakeServerHandle>) {
        let (handles_tx, handles_rx) = mpsc::unbounded_channel();
        (FakeChannelFactory { handles_tx }, handles_rx)
    }
}

impl Default for FakeChannelFactory {
    fn default() -> Self {
        Self::new().0
    }
}

#[async_trait]
impl ChannelFactory for FakeChannelFactory {
    async fn connect(&self) -> Result<Box<dyn Channel>, ChannelError> {
        let (channel, handle) = fake_channel_pair();
        self.handles_tx
            .send(handle)
            .map_err(|_| ChannelError::TransportError("test harness dropped".into()))?;
        Ok(Box::new(channel))
    }
}
