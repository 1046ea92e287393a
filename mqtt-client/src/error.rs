// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

use std::fmt;

/// Transport-level failure reported by a [`crate::channel::Channel`].
#[derive(Debug, Clone)]
pub enum ChannelError {
    /// `send()` itself could not hand the bytes to the transport.
    SendFailed(String),
    /// The transport reported an error asynchronously (read failure,
    /// reset connection, TLS failure, ...).
    TransportError(String),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::SendFailed(info) => write!(f, "send failed: {info}"),
            Self::TransportError(info) => write!(f, "transport error: {info}"),
        }
    }
}

impl std::error::Error for ChannelError {}

/// Outcome of a `connect()` call on the [`crate::Client`] handle.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ConnectError {
    UnacceptableProtocolVersion,
    IdentifierRefused,
    ServerUnavailable,
    BadUsernameOrPassword,
    NotAuthorized,

    /// The caller's timeout elapsed before a ConnAck arrived.
    ConnectTimedOut,

    /// `disconnect()` was called while the connect attempt was still
    /// in flight.
    DisconnectRequested,

    /// The engine task ended (channel factory failed, or it was
    /// dropped) before it could reply.
    Killed,

    /// `connect()` was called while already `Connected` (open
    /// question in the source spec; this revision rejects rather than
    /// silently succeeding — see `DESIGN.md`).
    AlreadyConnected,

    /// `connect()` was called while a previous connect attempt was
    /// still pending.
    ConnectInProgress,
}

impl From<mqtt_codec::ConnectError> for ConnectError {
    fn from(err: mqtt_codec::ConnectError) -> Self {
        match err {
            mqtt_codec::ConnectError::UnacceptableProtocolVersion => Self::UnacceptableProtocolVersion,
            mqtt_codec::ConnectError::IdentifierRefused => Self::IdentifierRefused,
            mqtt_codec::ConnectError::ServerUnavailable => Self::ServerUnavailable,
            mqtt_codec::ConnectError::BadUsernameOrPassword => Self::BadUsernameOrPassword,
            mqtt_codec::ConnectError::NotAuthorized => Self::NotAuthorized,
        }
    }
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for ConnectError {}

/// Outcome of a `publish()` call.
#[derive(Debug, Clone)]
pub struct PublishError(pub String);

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "publish failed: {}", self.0)
    }
}

impl std::error::Error for PublishError {}

/// Outcome of a `subscribe()` call.
#[derive(Debug, Clone)]
pub struct SubscribeError(pub String);

impl fmt::Display for SubscribeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "subscribe failed: {}", self.0)
    }
}

impl std::error::Error for SubscribeError {}

/// Outcome of an `unsubscribe()` call.
#[derive(Debug, Clone)]
pub struct UnsubscribeError(pub String);

impl fmt::Display for UnsubscribeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unsubscribe failed: {}", self.0)
    }
}

impl std::error::Error for UnsubscribeError {}
