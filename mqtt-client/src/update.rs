// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

use mqtt_codec::QoS;

use crate::error::ConnectError;

/// One broker's answer to one requested topic filter, aligned 1-1
/// with the `SubscribeRequest` list a `subscribe()` call was given.
pub type Subscription = mqtt_codec::SubscribeResult;

/// A transition the connection just made, as surfaced on the
/// [`crate::Client::updates`] stream.
#[derive(Clone, Debug, PartialEq)]
pub enum ConnectionState {
    /// ConnAck accepted the connection. `session_present` is always
    /// `false` in this revision since clean-session is forced.
    ConnectAccepted(bool),
    /// ConnAck rejected the connection, or the attempt otherwise
    /// failed (timeout, disconnect requested, channel error).
    ConnectFailed(ConnectError),
    /// The connection ended, however it got there (requested,
    /// rejected, timed out, or the transport dropped).
    Disconnected,
}

/// Everything the engine pushes to callers outside of direct
/// request/reply: connection lifecycle transitions and delivered
/// application messages.
#[derive(Clone, Debug, PartialEq)]
pub enum Update {
    ConnectionStateChanged(ConnectionState),
    ReceivedMessage {
        topic: String,
        payload: Vec<u8>,
        qos: QoS,
        retained: bool,
    },
}
