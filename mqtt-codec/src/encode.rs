// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

use crate::error::EncodeError;
use crate::header::{FixedHeader, FLAGS_RESERVED_TWO, FLAGS_RESERVED_ZERO};
use crate::packet::{Outgoing, PacketType};
use crate::{ack, connect, publish, subscribe, unsubscribe};

/// Encode a single outgoing packet and append its bytes to `buf`.
pub fn encode_packet(packet: &Outgoing, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    match packet {
        Outgoing::Connect { client_id, keep_alive_seconds } => {
            connect::encode(client_id, *keep_alive_seconds, buf)
        }
        Outgoing::Publish(publish_data) => publish::encode(publish_data, buf),
        Outgoing::PubAck(id) => ack::encode(PacketType::PubAck, FLAGS_RESERVED_ZERO, *id, buf),
        Outgoing::PubRec(id) => ack::encode(PacketType::PubRec, FLAGS_RESERVED_ZERO, *id, buf),
        Outgoing::PubRel(id) => ack::encode(PacketType::PubRel, FLAGS_RESERVED_TWO, *id, buf),
        Outgoing::PubComp(id) => ack::encode(PacketType::PubComp, FLAGS_RESERVED_ZERO, *id, buf),
        Outgoing::Subscribe(id, topics) => subscribe::encode(*id, topics, buf),
        Outgoing::Unsubscribe(id, filters) => unsubscribe::encode(*id, filters, buf),
        Outgoing::PingReq => {
            FixedHeader::encode(PacketType::PingReq, FLAGS_RESERVED_ZERO, 0, buf)
        }
        Outgoing::Disconnect => {
            FixedHeader::encode(PacketType::Disconnect, FLAGS_RESERVED_ZERO, 0, buf)
        }
    }
}
