// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

use crate::byte_array::{write_str, write_u16, ByteArray};
use crate::error::{DecodeError, EncodeError};
use crate::header::{FixedHeader, FLAGS_RESERVED_TWO};
use crate::packet::{PacketType, QoS, SubscribeRequest, SubscribeResult};

pub fn encode(packet_id: u16, topics: &[SubscribeRequest], buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    if topics.is_empty() {
        return Err(EncodeError::EmptySubscribeList);
    }

    let mut body = Vec::new();
    write_u16(&mut body, packet_id);
    for topic in topics {
        write_str(&mut body, &topic.filter)?;
        body.push(topic.qos as u8);
    }

    FixedHeader::encode(PacketType::Subscribe, FLAGS_RESERVED_TWO, body.len(), buf)?;
    buf.extend_from_slice(&body);
    Ok(())
}

pub fn decode_suback(body: &[u8]) -> Result<(u16, Vec<SubscribeResult>), DecodeError> {
    let mut ba = ByteArray::new(body);
    let packet_id = ba.read_u16()?;

    let mut results = Vec::new();
    while !ba.is_empty() {
        let code = ba.read_u8()?;
        let result = match code {
            0x80 => SubscribeResult::Failure,
            other => SubscribeResult::Success(QoS::from_u8(other).ok_or(DecodeError::InvalidData)?),
        };
        results.push(result);
    }

    Ok((packet_id, results))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_subscribe_bytes() {
        let topics = vec![
            SubscribeRequest { filter: "topic0".into(), qos: QoS::AtMostOnce },
            SubscribeRequest { filter: "topic1".into(), qos: QoS::AtLeastOnce },
            SubscribeRequest { filter: "topic2".into(), qos: QoS::ExactlyOnce },
        ];
        let mut buf = Vec::new();
        encode(1, &topics, &mut buf).unwrap();

        assert_eq!(buf[0], 0x82);
        let (header, consumed) = FixedHeader::decode(&buf).unwrap();
        assert_eq!(header.packet_type, PacketType::Subscribe);
        let body = &buf[consumed..consumed + header.remaining_length];
        assert_eq!(&body[0..2], &[0x00, 0x01]);
        assert_eq!(&body[2..], [0x00, 0x06, b't', b'o', b'p', b'i', b'c', b'0', 0x00,
                                 0x00, 0x06, b't', b'o', b'p', b'i', b'c', b'1', 0x01,
                                 0x00, 0x06, b't', b'o', b'p', b'i', b'c', b'2', 0x02]);
    }

    #[test]
    fn rejects_empty_subscribe_list() {
        let mut buf = Vec::new();
        assert_eq!(encode(1, &[], &mut buf), Err(EncodeError::EmptySubscribeList));
    }

    #[test]
    fn decodes_mixed_suback() {
        let (packet_id, results) = decode_suback(&[0x00, 0x01, 0x00, 0x01, 0x80]).unwrap();
        assert_eq!(packet_id, 1);
        assert_eq!(
            results,
            vec![
                SubscribeResult::Success(QoS::AtMostOnce),
                SubscribeResult::Success(QoS::AtLeastOnce),
                SubscribeResult::Failure,
            ]
        );
    }

    #[test]
    fn rejects_invalid_suback_code() {
        assert_eq!(decode_suback(&[0x00, 0x01, 0x03]), Err(DecodeError::InvalidData));
    }
}
