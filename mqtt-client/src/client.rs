// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::Stream;
use futures::StreamExt;
use mqtt_codec::{PublishData, SubscribeRequest};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_stream::wrappers::BroadcastStream;

use crate::channel::ChannelFactory;
use crate::connect_options::ConnectOptions;
use crate::engine::{Engine, EngineRequest};
use crate::error::{ConnectError, PublishError, SubscribeError, UnsubscribeError};
use crate::transport_options::TransportOptions;
use crate::update::{Subscription, Update};

/// Capacity of the request inbox. Requests are one-shot-correlated
/// (each carries its own reply channel), so a small bound is enough
/// to smooth out bursts without the engine ever needing to apply
/// backpressure mid-protocol-transition.
const REQUEST_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the updates broadcast channel. A slow or absent
/// `updates()` subscriber drops the oldest update rather than
/// blocking the engine -- `tokio::sync::broadcast`'s usual tradeoff.
const UPDATES_CHANNEL_CAPACITY: usize = 256;

/// A cheaply-`Clone`-able handle to a running Client Engine task. The
/// engine itself owns all protocol state; every method here is a
/// request/reply exchange across an mpsc inbox, as `spec.md` §5
/// describes.
#[derive(Clone)]
pub struct Client {
    requests_tx: mpsc::Sender<EngineRequest>,
    updates_tx: broadcast::Sender<Update>,
}

/// Start the Client Engine as a background task and return a handle
/// to it. The engine begins `NotConnected`; call [`Client::connect`]
/// to drive it towards a live connection.
#[must_use]
pub fn start(connect_options: ConnectOptions, transport_options: TransportOptions) -> Client {
    start_with_factory(connect_options, transport_options.into_factory())
}

/// Same as [`start`] but with the channel factory supplied directly,
/// bypassing [`TransportOptions`] -- the seam integration tests use to
/// drive the engine against [`crate::fake_channel::FakeChannel`]
/// instead of a real socket.
#[cfg(any(test, feature = "test-util"))]
#[must_use]
pub fn start_with_channel_factory(
    connect_options: ConnectOptions,
    factory: Arc<dyn ChannelFactory>,
) -> Client {
    start_with_factory(connect_options, factory)
}

fn start_with_factory(connect_options: ConnectOptions, factory: Arc<dyn ChannelFactory>) -> Client {
    let (requests_tx, requests_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
    let (updates_tx, _) = broadcast::channel(UPDATES_CHANNEL_CAPACITY);

    let engine = Engine::new(connect_options, factory, updates_tx.clone());
    tokio::spawn(engine.run(requests_rx));

    Client {
        requests_tx,
        updates_tx,
    }
}

impl Client {
    /// Connect to the server. Resolves once a ConnAck arrives, the
    /// channel factory fails, or `timeout` elapses -- a timeout also
    /// asks the engine to disconnect, matching `spec.md` §5's rule
    /// that `ConnectTimedOut` is the one caller-side timeout that
    /// notifies the engine.
    pub async fn connect(&self, timeout: Duration) -> Result<bool, ConnectError> {
        let (reply_to, reply_rx) = oneshot::channel();
        if self
            .requests_tx
            .send(EngineRequest::Connect(reply_to))
            .await
            .is_err()
        {
            return Err(ConnectError::Killed);
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ConnectError::Killed),
            Err(_) => {
                let _ = self.requests_tx.send(EngineRequest::Disconnect).await;
                Err(ConnectError::ConnectTimedOut)
            }
        }
    }

    /// Hand a publish to the engine. Resolves `Ok(())` once the bytes
    /// are handed to the channel -- this is not a delivery
    /// acknowledgment for QoS 1/2, just confirmation the write
    /// happened.
    pub async fn publish(&self, data: PublishData, timeout: Duration) -> Result<(), PublishError> {
        if !data.is_valid() {
            return Err(PublishError("PublishData violates the dup/packet_id/qos invariant".into()));
        }

        let (reply_to, reply_rx) = oneshot::channel();
        if self
            .requests_tx
            .send(EngineRequest::Publish(data, reply_to))
            .await
            .is_err()
        {
            return Err(PublishError("engine task is not running".into()));
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(PublishError("engine task ended before replying".into())),
            Err(_) => Err(PublishError("timed out waiting for a reply".into())),
        }
    }

    /// Subscribe to a non-empty list of topic filters. The result
    /// list is aligned 1-1 with `topics`.
    pub async fn subscribe(
        &self,
        topics: Vec<SubscribeRequest>,
        timeout: Duration,
    ) -> Result<Vec<Subscription>, SubscribeError> {
        if topics.is_empty() {
            return Err(SubscribeError("topic filter list is empty".into()));
        }

        let (reply_to, reply_rx) = oneshot::channel();
        if self
            .requests_tx
            .send(EngineRequest::Subscribe(topics, reply_to))
            .await
            .is_err()
        {
            return Err(SubscribeError("engine task is not running".into()));
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SubscribeError("engine task ended before replying".into())),
            Err(_) => Err(SubscribeError("timed out waiting for a reply".into())),
        }
    }

    /// Unsubscribe a non-empty list of topic filters.
    pub async fn unsubscribe(
        &self,
        filters: Vec<String>,
        timeout: Duration,
    ) -> Result<(), UnsubscribeError> {
        if filters.is_empty() {
            return Err(UnsubscribeError("topic filter list is empty".into()));
        }

        let (reply_to, reply_rx) = oneshot::channel();
        if self
            .requests_tx
            .send(EngineRequest::Unsubscribe(filters, reply_to))
            .await
            .is_err()
        {
            return Err(UnsubscribeError("engine task is not running".into()));
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(UnsubscribeError("engine task ended before replying".into())),
            Err(_) => Err(UnsubscribeError("timed out waiting for a reply".into())),
        }
    }

    /// Fire-and-forget disconnect. Does not wait for the engine to
    /// finish tearing the connection down.
    pub async fn disconnect(&self) {
        let _ = self.requests_tx.send(EngineRequest::Disconnect).await;
    }

    /// A fresh stream of [`Update`]s from this point on. Each call
    /// gets its own `broadcast` subscription; an update that arrives
    /// before the first poll is still delivered, but updates emitted
    /// before `updates()` was called are not replayed.
    pub fn updates(&self) -> impl Stream<Item = Update> + Send + 'static {
        BroadcastStream::new(self.updates_tx.subscribe()).filter_map(|result| async move { result.ok() })
    }
}
