// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

//! Async MQTT 3.1.1 client protocol engine: a single-connection state
//! machine that frames/parses packets (via [`mqtt_codec`]), drives
//! the connection lifecycle, correlates requests with replies by
//! packet identifier, keeps the connection alive with PingReq/PingResp,
//! and surfaces connection and message updates on a stream.
//!
//! The wire codec, the concrete transport, and this crate's state
//! machine are deliberately separate: see [`channel::Channel`] for
//! the transport seam and [`encoded_channel::EncodedChannel`] for the
//! adapter between raw bytes and decoded packets.

mod channel;
mod client;
mod connect_options;
mod encoded_channel;
mod engine;
mod error;
mod tcp_channel;
mod transport_options;
mod update;

#[cfg(any(test, feature = "test-util"))]
pub mod fake_channel;

pub use channel::{Channel, ChannelEvent, ChannelFactory};
pub use client::{start, Client};
#[cfg(any(test, feature = "test-util"))]
pub use client::start_with_channel_factory;
pub use connect_options::ConnectOptions;
pub use error::{ChannelError, ConnectError, PublishError, SubscribeError, UnsubscribeError};
pub use transport_options::TransportOptions;
pub use update::{ConnectionState, Subscription, Update};

pub use mqtt_codec::{MessageData, PublishData, QoS, SubscribeRequest};
