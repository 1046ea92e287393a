// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

//! Fundamental data types shared by every MQTT 3.1.1 control packet.

/// Quality of Service level requested for a publish or subscription.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum QoS {
    #[default]
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl QoS {
    #[must_use]
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::AtMostOnce),
            1 => Some(Self::AtLeastOnce),
            2 => Some(Self::ExactlyOnce),
            _ => None,
        }
    }
}

/// A single application message as the codec/engine sees it: topic,
/// payload, QoS and retain flag, without the publish-specific `dup`
/// bit or packet identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageData {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

/// A Publish packet's content.
///
/// Invariant: `dup == false && packet_id.is_none()` iff
/// `message.qos == QoS::AtMostOnce`; otherwise `packet_id` is present
/// and non-zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishData {
    pub message: MessageData,
    pub dup: bool,
    pub packet_id: Option<u16>,
}

impl PublishData {
    /// Build a QoS-0 publish: no packet id, dup forced false.
    #[must_use]
    pub fn at_most_once(topic: impl Into<String>, payload: impl Into<Vec<u8>>, retain: bool) -> Self {
        Self {
            message: MessageData {
                topic: topic.into(),
                payload: payload.into(),
                qos: QoS::AtMostOnce,
                retain,
            },
            dup: false,
            packet_id: None,
        }
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        match self.message.qos {
            QoS::AtMostOnce => !self.dup && self.packet_id.is_none(),
            QoS::AtLeastOnce | QoS::ExactlyOnce => matches!(self.packet_id, Some(id) if id != 0),
        }
    }
}

/// One entry of a Subscribe request's topic list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribeRequest {
    pub filter: String,
    pub qos: QoS,
}

/// The broker's per-topic answer to a Subscribe request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscribeResult {
    Success(QoS),
    Failure,
}

/// Wire-level reasons a Connect attempt can be rejected, per MQTT 3.1.1
/// section 3.2.2.3.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ConnectError {
    UnacceptableProtocolVersion = 1,
    IdentifierRefused = 2,
    ServerUnavailable = 3,
    BadUsernameOrPassword = 4,
    NotAuthorized = 5,
}

impl ConnectError {
    #[must_use]
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::UnacceptableProtocolVersion),
            2 => Some(Self::IdentifierRefused),
            3 => Some(Self::ServerUnavailable),
            4 => Some(Self::BadUsernameOrPassword),
            5 => Some(Self::NotAuthorized),
            _ => None,
        }
    }
}

/// MQTT Control Packet type ids, high nibble of the fixed header's
/// first byte (MQTT 3.1.1 section 2.2.1).
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PacketType {
    Connect = 1,
    ConnAck = 2,
    Publish = 3,
    PubAck = 4,
    PubRec = 5,
    PubRel = 6,
    PubComp = 7,
    Subscribe = 8,
    SubAck = 9,
    Unsubscribe = 10,
    UnsubAck = 11,
    PingReq = 12,
    PingResp = 13,
    Disconnect = 14,
}

impl PacketType {
    #[must_use]
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Connect),
            2 => Some(Self::ConnAck),
            3 => Some(Self::Publish),
            4 => Some(Self::PubAck),
            5 => Some(Self::PubRec),
            6 => Some(Self::PubRel),
            7 => Some(Self::PubComp),
            8 => Some(Self::Subscribe),
            9 => Some(Self::SubAck),
            10 => Some(Self::Unsubscribe),
            11 => Some(Self::UnsubAck),
            12 => Some(Self::PingReq),
            13 => Some(Self::PingResp),
            14 => Some(Self::Disconnect),
            _ => None,
        }
    }
}

/// A Control Packet the client sends to the server.
#[derive(Clone, Debug, PartialEq)]
pub enum Outgoing {
    Connect { client_id: String, keep_alive_seconds: u16 },
    Publish(PublishData),
    PubAck(u16),
    PubRec(u16),
    PubRel(u16),
    PubComp(u16),
    Subscribe(u16, Vec<SubscribeRequest>),
    Unsubscribe(u16, Vec<String>),
    PingReq,
    Disconnect,
}

/// A Control Packet received from the server.
#[derive(Clone, Debug, PartialEq)]
pub enum Incoming {
    ConnAck {
        session_present: bool,
        result: Result<(), ConnectError>,
    },
    Publish(PublishData),
    PubAck(u16),
    PubRec(u16),
    PubRel(u16),
    PubComp(u16),
    SubAck(u16, Vec<SubscribeResult>),
    UnsubAck(u16),
    PingResp,
}
