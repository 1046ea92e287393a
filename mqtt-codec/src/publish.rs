// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

use crate::byte_array::{write_str, write_u16, ByteArray};
use crate::error::{DecodeError, EncodeError};
use crate::header::FixedHeader;
use crate::packet::{MessageData, PacketType, PublishData, QoS};

fn flags(dup: bool, qos: QoS, retain: bool) -> u8 {
    let dup_bit = if dup { 0b1000 } else { 0 };
    let qos_bits = match qos {
        QoS::AtMostOnce => 0b000,
        QoS::AtLeastOnce => 0b010,
        QoS::ExactlyOnce => 0b100,
    };
    let retain_bit = u8::from(retain);
    dup_bit | qos_bits | retain_bit
}

/// Encode a Publish packet. The wire can never carry the `dup` bit for
/// QoS 0 (it is meaningless there); callers are expected to have
/// already enforced [`PublishData::is_valid`].
pub fn encode(publish: &PublishData, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    let mut body = Vec::new();
    write_str(&mut body, &publish.message.topic)?;
    if publish.message.qos != QoS::AtMostOnce {
        let packet_id = publish.packet_id.unwrap_or(0);
        write_u16(&mut body, packet_id);
    }
    body.extend_from_slice(&publish.message.payload);

    let dup = publish.message.qos != QoS::AtMostOnce && publish.dup;
    let flags = flags(dup, publish.message.qos, publish.message.retain);
    FixedHeader::encode(PacketType::Publish, flags, body.len(), buf)?;
    buf.extend_from_slice(&body);
    Ok(())
}

pub fn decode(flags: u8, body: &[u8]) -> Result<PublishData, DecodeError> {
    let dup = flags & 0b1000 != 0;
    let retain = flags & 0b0001 != 0;
    let qos = match (flags >> 1) & 0b11 {
        0b00 => QoS::AtMostOnce,
        0b01 => QoS::AtLeastOnce,
        0b10 => QoS::ExactlyOnce,
        _ => {
            log::warn!("publish: reserved qos bits 0b11 in flags {flags:#06b}");
            return Err(DecodeError::InvalidData);
        }
    };

    let mut ba = ByteArray::new(body);
    let topic = ba.read_str()?.to_string();
    let packet_id = if qos == QoS::AtMostOnce {
        None
    } else {
        let id = ba.read_u16()?;
        if id == 0 {
            return Err(DecodeError::InvalidData);
        }
        Some(id)
    };
    let payload = ba.read_remaining().to_vec();

    Ok(PublishData {
        message: MessageData {
            topic,
            payload,
            qos,
            retain,
        },
        dup: dup && qos != QoS::AtMostOnce,
        packet_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_qos0_publish_bytes() {
        let publish = PublishData::at_most_once("topic", b"payload".to_vec(), false);
        let mut buf = Vec::new();
        encode(&publish, &mut buf).unwrap();

        let mut expected = vec![0x30, 14, 0x00, 0x05];
        expected.extend_from_slice(b"topic");
        expected.extend_from_slice(b"payload");
        assert_eq!(buf, expected);
    }

    #[test]
    fn round_trips_qos1_publish() {
        let publish = PublishData {
            message: MessageData {
                topic: "a/b".into(),
                payload: b"hi".to_vec(),
                qos: QoS::AtLeastOnce,
                retain: true,
            },
            dup: true,
            packet_id: Some(7),
        };
        let mut buf = Vec::new();
        encode(&publish, &mut buf).unwrap();

        let (header, consumed) = FixedHeader::decode(&buf).unwrap();
        let decoded = decode(header.flags, &buf[consumed..consumed + header.remaining_length]).unwrap();
        assert_eq!(decoded, publish);
    }

    #[test]
    fn rejects_reserved_qos_bits() {
        assert_eq!(decode(0b0000_0110, &[0x00, 0x01, b'a']), Err(DecodeError::InvalidData));
    }

    #[test]
    fn rejects_zero_packet_id_for_qos1() {
        let mut body = Vec::new();
        write_str(&mut body, "t").unwrap();
        write_u16(&mut body, 0);
        assert_eq!(decode(0b0000_0010, &body), Err(DecodeError::InvalidData));
    }
}
