// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

//! The Client Engine: a single-threaded, message-driven task owning
//! all mutable connection state (`spec.md` §4.4/§5). Every transition
//! is driven by one of four event sources multiplexed in
//! [`Engine::run`]'s `tokio::select!`: user requests, channel events,
//! the keep-alive ping timer, and the PingResp deadline timer.
//!
//! `channel`/`ping_deadline`/`disconnect_deadline` live as sibling
//! `Option` fields next to a state tag rather than embedded inside
//! the tag's variants (as `spec.md` §9's "tagged sum" note suggests):
//! `tokio::select!` needs a disjoint `&mut` borrow of each field for
//! its conditional branches, and borrowing through a `match` on an
//! enum field does not give the borrow checker that. The same
//! invariants hold ("timer armed iff Connected", "channel live iff
//! Connecting/Connected") -- they are just enforced by the transition
//! functions below instead of by the type system. See `DESIGN.md`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use mqtt_codec::{Incoming, MessageData, Outgoing, PublishData, QoS, SubscribeRequest};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;

use crate::channel::ChannelFactory;
use crate::connect_options::ConnectOptions;
use crate::encoded_channel::{EncodedChannel, EncodedChannelEvent};
use crate::error::{ConnectError, PublishError, SubscribeError, UnsubscribeError};
use crate::update::{ConnectionState, Subscription, Update};

/// Request posted by a [`crate::Client`] handle to the engine task.
pub(crate) enum EngineRequest {
    Connect(oneshot::Sender<Result<bool, ConnectError>>),
    Publish(PublishData, oneshot::Sender<Result<(), PublishError>>),
    Subscribe(
        Vec<SubscribeRequest>,
        oneshot::Sender<Result<Vec<Subscription>, SubscribeError>>,
    ),
    Unsubscribe(Vec<String>, oneshot::Sender<Result<(), UnsubscribeError>>),
    Disconnect,
}

/// Connection phase. Carries only the data that has no natural home
/// in a sibling field (the reply slot for an in-flight connect).
enum ConnState {
    NotConnected,
    ConnectingToServer {
        reply_to: oneshot::Sender<Result<bool, ConnectError>>,
    },
    Connected,
}

struct PendingSubscription {
    topics: Vec<SubscribeRequest>,
    reply_to: oneshot::Sender<Result<Vec<Subscription>, SubscribeError>>,
}

struct PendingUnsubscription {
    reply_to: oneshot::Sender<Result<(), UnsubscribeError>>,
}

pub(crate) struct Engine {
    state: ConnState,
    channel: Option<EncodedChannel>,
    ping_deadline: Option<Instant>,
    disconnect_deadline: Option<Instant>,

    pending_subs: HashMap<u16, PendingSubscription>,
    pending_unsubs: HashMap<u16, PendingUnsubscription>,
    /// Inbound QoS-2 publishes PubRec'd but not yet PubRel'd.
    inbound_qos2: HashSet<u16>,
    /// Outbound QoS-1/QoS-2 publishes sent but not yet fully acked.
    /// Populated and drained; resend-on-reconnect is explicitly out
    /// of scope for this revision (`spec.md` §9).
    outbound_unacked: HashMap<u16, PublishData>,
    next_packet_id: u16,

    updates_tx: broadcast::Sender<Update>,
    keep_alive: Duration,
    keep_alive_seconds: u16,
    server_timeout: Duration,
    client_id: String,
    factory: Arc<dyn ChannelFactory>,
}

impl Engine {
    pub(crate) fn new(
        connect_options: ConnectOptions,
        factory: Arc<dyn ChannelFactory>,
        updates_tx: broadcast::Sender<Update>,
    ) -> Self {
        Engine {
            state: ConnState::NotConnected,
            channel: None,
            ping_deadline: None,
            disconnect_deadline: None,
            pending_subs: HashMap::new(),
            pending_unsubs: HashMap::new(),
            inbound_qos2: HashSet::new(),
            outbound_unacked: HashMap::new(),
            next_packet_id: 1,
            updates_tx,
            keep_alive: connect_options.keep_alive(),
            keep_alive_seconds: connect_options.keep_alive_seconds(),
            server_timeout: connect_options.server_timeout(),
            client_id: connect_options.client_id().to_string(),
            factory,
        }
    }

    pub(crate) async fn run(mut self, mut requests_rx: mpsc::Receiver<EngineRequest>) {
        loop {
            let ping_deadline = self.ping_deadline;
            let disconnect_deadline = self.disconnect_deadline;

            tokio::select! {
                maybe_req = requests_rx.recv() => {
                    match maybe_req {
                        Some(req) => self.handle_request(req).await,
                        None => {
                            log::debug!("engine: all client handles dropped, shutting down");
                            self.handle_disconnect().await;
                            break;
                        }
                    }
                }
                event = recv_channel_event(&mut self.channel) => {
                    self.handle_channel_event(event).await;
                }
                () = sleep_until_opt(ping_deadline) => {
                    self.handle_ping_timer().await;
                }
                () = sleep_until_opt(disconnect_deadline) => {
                    self.handle_disconnect_timer().await;
                }
            }
        }
    }

    async fn handle_request(&mut self, req: EngineRequest) {
        match req {
            EngineRequest::Connect(reply_to) => self.handle_connect(reply_to).await,
            EngineRequest::Publish(data, reply_to) => self.handle_publish(data, reply_to).await,
            EngineRequest::Subscribe(topics, reply_to) => {
                self.handle_subscribe(topics, reply_to).await;
            }
            EngineRequest::Unsubscribe(filters, reply_to) => {
                self.handle_unsubscribe(filters, reply_to).await;
            }
            EngineRequest::Disconnect => self.handle_disconnect().await,
        }
    }

    async fn handle_connect(&mut self, reply_to: oneshot::Sender<Result<bool, ConnectError>>) {
        match self.state {
            ConnState::NotConnected => {
                match self.factory.connect().await {
                    Ok(raw_channel) => {
                        let mut channel = EncodedChannel::new(raw_channel);
                        let packet = Outgoing::Connect {
                            client_id: self.client_id.clone(),
                            keep_alive_seconds: self.keep_alive_seconds,
                        };
                        match channel.send(&packet).await {
                            Ok(()) => {
                                self.channel = Some(channel);
                                self.state = ConnState::ConnectingToServer { reply_to };
                            }
                            Err(err) => {
                                log::warn!("engine: failed to send Connect: {err}");
                                channel.shutdown().await;
                                let _ = reply_to.send(Err(ConnectError::Killed));
                            }
                        }
                    }
                    Err(err) => {
                        log::warn!("engine: channel factory failed: {err}");
                        let _ = reply_to.send(Err(ConnectError::Killed));
                    }
                }
            }
            ConnState::ConnectingToServer { .. } => {
                let _ = reply_to.send(Err(ConnectError::ConnectInProgress));
            }
            ConnState::Connected => {
                let _ = reply_to.send(Err(ConnectError::AlreadyConnected));
            }
        }
    }

    async fn handle_publish(
        &mut self,
        mut data: PublishData,
        reply_to: oneshot::Sender<Result<(), PublishError>>,
    ) {
        if self.channel.is_none()
            || !matches!(
                self.state,
                ConnState::Connected | ConnState::ConnectingToServer { .. }
            )
        {
            let _ = reply_to.send(Err(PublishError("not connected".into())));
            return;
        }

        if data.message.qos != QoS::AtMostOnce {
            data.packet_id = Some(self.reserve_packet_id());
        }

        let channel = self.channel.as_mut().expect("checked above");
        match channel.send(&Outgoing::Publish(data.clone())).await {
            Ok(()) => {
                self.reset_ping_timer();
                if data.message.qos != QoS::AtMostOnce {
                    let id = data.packet_id.expect("qos > 0 reserved a packet id above");
                    self.outbound_unacked.insert(id, data);
                }
                let _ = reply_to.send(Ok(()));
            }
            Err(err) => {
                let _ = reply_to.send(Err(PublishError(err.to_string())));
            }
        }
    }

    async fn handle_subscribe(
        &mut self,
        topics: Vec<SubscribeRequest>,
        reply_to: oneshot::Sender<Result<Vec<Subscription>, SubscribeError>>,
    ) {
        if !matches!(self.state, ConnState::Connected) || self.channel.is_none() {
            let _ = reply_to.send(Err(SubscribeError("not connected".into())));
            return;
        }

        let packet_id = self.reserve_packet_id();
        let channel = self.channel.as_mut().expect("checked above");
        match channel.send(&Outgoing::Subscribe(packet_id, topics.clone())).await {
            Ok(()) => {
                self.reset_ping_timer();
                self.pending_subs
                    .insert(packet_id, PendingSubscription { topics, reply_to });
            }
            Err(err) => {
                let _ = reply_to.send(Err(SubscribeError(err.to_string())));
            }
        }
    }

    async fn handle_unsubscribe(
        &mut self,
        filters: Vec<String>,
        reply_to: oneshot::Sender<Result<(), UnsubscribeError>>,
    ) {
        if !matches!(self.state, ConnState::Connected) || self.channel.is_none() {
            let _ = reply_to.send(Err(UnsubscribeError("not connected".into())));
            return;
        }

        let packet_id = self.reserve_packet_id();
        let channel = self.channel.as_mut().expect("checked above");
        match channel.send(&Outgoing::Unsubscribe(packet_id, filters)).await {
            Ok(()) => {
                self.reset_ping_timer();
                self.pending_unsubs
                    .insert(packet_id, PendingUnsubscription { reply_to });
            }
            Err(err) => {
                let _ = reply_to.send(Err(UnsubscribeError(err.to_string())));
            }
        }
    }

    async fn handle_disconnect(&mut self) {
        match std::mem::replace(&mut self.state, ConnState::NotConnected) {
            ConnState::NotConnected => {}
            ConnState::ConnectingToServer { reply_to } => {
                let _ = reply_to.send(Err(ConnectError::DisconnectRequested));
                self.teardown_channel().await;
                self.clear_timers();
                self.reset_session_state();
                self.emit(Update::ConnectionStateChanged(ConnectionState::Disconnected));
            }
            ConnState::Connected => {
                if let Some(channel) = self.channel.as_mut() {
                    // Best effort: the connection is going away either way.
                    let _ = channel.send(&Outgoing::Disconnect).await;
                }
                self.teardown_channel().await;
                self.clear_timers();
                self.reset_session_state();
                self.emit(Update::ConnectionStateChanged(ConnectionState::Disconnected));
            }
        }
    }

    async fn handle_channel_event(&mut self, event: EncodedChannelEvent) {
        match event {
            EncodedChannelEvent::PacketsReceived(Ok(packets)) => {
                for packet in packets {
                    self.handle_incoming(packet).await;
                }
            }
            EncodedChannelEvent::PacketsReceived(Err(err)) => {
                log::warn!("engine: decode error, disconnecting: {err}");
                self.force_disconnect(&format!("decode error: {err}")).await;
            }
            EncodedChannelEvent::Closed => {
                log::debug!("engine: channel closed by peer");
                self.force_disconnect("channel closed").await;
            }
            EncodedChannelEvent::Error(err) => {
                log::warn!("engine: channel error: {err}");
                self.force_disconnect(&format!("channel error: {err}")).await;
            }
        }
    }

    async fn handle_incoming(&mut self, packet: Incoming) {
        match packet {
            Incoming::ConnAck {
                session_present,
                result,
            } => self.handle_connack(session_present, result).await,
            Incoming::Publish(data) => self.handle_incoming_publish(data).await,
            Incoming::PubAck(id) => {
                self.outbound_unacked.remove(&id);
            }
            Incoming::PubRec(id) => {
                if let Some(channel) = self.channel.as_mut() {
                    let _ = channel.send(&Outgoing::PubRel(id)).await;
                }
            }
            Incoming::PubRel(id) => {
                self.inbound_qos2.remove(&id);
                if let Some(channel) = self.channel.as_mut() {
                    let _ = channel.send(&Outgoing::PubComp(id)).await;
                }
            }
            Incoming::PubComp(id) => {
                self.outbound_unacked.remove(&id);
            }
            Incoming::SubAck(id, results) => self.handle_suback(id, results).await,
            Incoming::UnsubAck(id) => self.handle_unsuback(id).await,
            Incoming::PingResp => self.handle_pingresp(),
        }
    }

    async fn handle_connack(
        &mut self,
        session_present: bool,
        result: Result<(), mqtt_codec::ConnectError>,
    ) {
        let reply_to = match std::mem::replace(&mut self.state, ConnState::NotConnected) {
            ConnState::ConnectingToServer { reply_to } => reply_to,
            other => {
                self.state = other;
                self.force_disconnect("unexpected ConnAck for current state").await;
                return;
            }
        };

        match result {
            Ok(()) => {
                self.state = ConnState::Connected;
                self.arm_ping_timer();
                let _ = reply_to.send(Ok(session_present));
                self.emit(Update::ConnectionStateChanged(ConnectionState::ConnectAccepted(
                    session_present,
                )));
            }
            Err(wire_err) => {
                let mapped: ConnectError = wire_err.into();
                let _ = reply_to.send(Err(mapped));
                self.teardown_channel().await;
                self.reset_session_state();
                self.emit(Update::ConnectionStateChanged(ConnectionState::Disconnected));
            }
        }
    }

    async fn handle_incoming_publish(&mut self, data: PublishData) {
        if !matches!(self.state, ConnState::Connected) {
            self.force_disconnect("Publish received outside Connected state").await;
            return;
        }

        let MessageData {
            topic,
            payload,
            qos,
            retain,
        } = data.message.clone();
        self.emit(Update::ReceivedMessage {
            topic,
            payload,
            qos,
            retained: retain,
        });

        match data.message.qos {
            QoS::AtMostOnce => {}
            QoS::AtLeastOnce => {
                if let (Some(id), Some(channel)) = (data.packet_id, self.channel.as_mut()) {
                    let _ = channel.send(&Outgoing::PubAck(id)).await;
                }
            }
            QoS::ExactlyOnce => {
                if let Some(id) = data.packet_id {
                    self.inbound_qos2.insert(id);
                    if let Some(channel) = self.channel.as_mut() {
                        let _ = channel.send(&Outgoing::PubRec(id)).await;
                    }
                }
            }
        }
    }

    async fn handle_suback(&mut self, id: u16, results: Vec<Subscription>) {
        let Some(pending) = self.pending_subs.remove(&id) else {
            self.force_disconnect("SubAck for unknown packet id").await;
            return;
        };

        if pending.topics.len() != results.len() {
            let _ = pending
                .reply_to
                .send(Err(SubscribeError("SubAck result count did not match request".into())));
            self.force_disconnect("SubAck length mismatch").await;
            return;
        }

        let _ = pending.reply_to.send(Ok(results));
    }

    async fn handle_unsuback(&mut self, id: u16) {
        let Some(pending) = self.pending_unsubs.remove(&id) else {
            self.force_disconnect("UnsubAck for unknown packet id").await;
            return;
        };
        let _ = pending.reply_to.send(Ok(()));
    }

    fn handle_pingresp(&mut self) {
        if matches!(self.state, ConnState::Connected) && self.disconnect_deadline.is_some() {
            self.arm_ping_timer();
        } else {
            log::warn!("engine: unexpected PingResp with no outstanding ping");
        }
    }

    async fn handle_ping_timer(&mut self) {
        if !matches!(self.state, ConnState::Connected) {
            return;
        }
        let Some(channel) = self.channel.as_mut() else {
            return;
        };
        match channel.send(&Outgoing::PingReq).await {
            Ok(()) => self.arm_disconnect_timer(),
            Err(err) => {
                self.force_disconnect(&format!("PingReq send failed: {err}")).await;
            }
        }
    }

    async fn handle_disconnect_timer(&mut self) {
        if matches!(self.state, ConnState::Connected) {
            self.force_disconnect("PingResp deadline elapsed").await;
        }
    }

    /// Abort whatever the connection was doing and drop back to
    /// `NotConnected`, notifying every in-flight waiter.
    async fn force_disconnect(&mut self, info: &str) {
        match std::mem::replace(&mut self.state, ConnState::NotConnected) {
            ConnState::NotConnected => {}
            ConnState::ConnectingToServer { reply_to } => {
                let _ = reply_to.send(Err(ConnectError::Killed));
            }
            ConnState::Connected => {}
        }
        self.teardown_channel().await;
        self.clear_timers();
        for (_, pending) in self.pending_subs.drain() {
            let _ = pending.reply_to.send(Err(SubscribeError(info.to_string())));
        }
        for (_, pending) in self.pending_unsubs.drain() {
            let _ = pending.reply_to.send(Err(UnsubscribeError(info.to_string())));
        }
        self.reset_session_state();
        self.emit(Update::ConnectionStateChanged(ConnectionState::Disconnected));
    }

    async fn teardown_channel(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.shutdown().await;
        }
    }

    fn reset_session_state(&mut self) {
        self.pending_subs.clear();
        self.pending_unsubs.clear();
        self.inbound_qos2.clear();
        self.outbound_unacked.clear();
    }

    fn arm_ping_timer(&mut self) {
        self.ping_deadline = Some(Instant::now() + self.keep_alive);
        self.disconnect_deadline = None;
    }

    fn arm_disconnect_timer(&mut self) {
        self.disconnect_deadline = Some(Instant::now() + self.server_timeout);
        self.ping_deadline = None;
    }

    fn clear_timers(&mut self) {
        self.ping_deadline = None;
        self.disconnect_deadline = None;
    }

    /// Any user-initiated outbound packet postpones the next ping --
    /// but only while idle (no PingReq currently outstanding); a
    /// PingResp still already owed is not forgiven by unrelated
    /// traffic.
    fn reset_ping_timer(&mut self) {
        if matches!(self.state, ConnState::Connected) && self.disconnect_deadline.is_none() {
            self.arm_ping_timer();
        }
    }

    /// Packet ids start at 1, wrap at `u16::MAX` back to 1, and skip
    /// every id currently live in any pending table. Id 0 is reserved
    /// and never handed out.
    fn reserve_packet_id(&mut self) -> u16 {
        loop {
            let id = self.next_packet_id;
            self.next_packet_id = if self.next_packet_id == u16::MAX {
                1
            } else {
                self.next_packet_id + 1
            };
            if id != 0 && !self.packet_id_in_use(id) {
                return id;
            }
        }
    }

    fn packet_id_in_use(&self, id: u16) -> bool {
        self.pending_subs.contains_key(&id)
            || self.pending_unsubs.contains_key(&id)
            || self.inbound_qos2.contains(&id)
            || self.outbound_unacked.contains_key(&id)
    }

    fn emit(&self, update: Update) {
        // No subscribers is a normal outcome (nobody called
        // `updates()` yet); the engine is a write-only producer.
        let _ = self.updates_tx.send(update);
    }
}

async fn recv_channel_event(channel: &mut Option<EncodedChannel>) -> EncodedChannelEvent {
    match channel {
        Some(channel) => channel.recv().await,
        None => futures::future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => futures::future::pending().await,
    }
}
