// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

use crate::error::DecodeError;
use crate::header::FixedHeader;
use crate::packet::{Incoming, PacketType};
use crate::{ack, connect, publish, subscribe};

/// Decode a single incoming packet from the front of `buf`.
///
/// Returns `(packet, bytes_consumed)` on success. [`DecodeError::DataTooShort`]
/// means `buf` does not yet hold a complete packet; the caller must
/// hold on to the bytes and retry once more have arrived. Any other
/// error is fatal for the connection.
pub fn decode_packet(buf: &[u8]) -> Result<(Incoming, usize), DecodeError> {
    let (header, header_len) = FixedHeader::decode(buf)?;
    let total_len = header_len + header.remaining_length;
    if buf.len() < total_len {
        return Err(DecodeError::DataTooShort);
    }
    let body = &buf[header_len..total_len];

    let packet = match header.packet_type {
        PacketType::ConnAck => {
            let (session_present, result) = connect::decode_connack(body)?;
            Incoming::ConnAck { session_present, result }
        }
        PacketType::Publish => Incoming::Publish(publish::decode(header.flags, body)?),
        PacketType::PubAck => Incoming::PubAck(ack::decode(body)?),
        PacketType::PubRec => Incoming::PubRec(ack::decode(body)?),
        PacketType::PubRel => Incoming::PubRel(ack::decode(body)?),
        PacketType::PubComp => Incoming::PubComp(ack::decode(body)?),
        PacketType::SubAck => {
            let (id, results) = subscribe::decode_suback(body)?;
            Incoming::SubAck(id, results)
        }
        PacketType::UnsubAck => Incoming::UnsubAck(ack::decode(body)?),
        PacketType::PingResp => {
            if !body.is_empty() {
                return Err(DecodeError::InvalidData);
            }
            Incoming::PingResp
        }
        PacketType::Connect
        | PacketType::Subscribe
        | PacketType::Unsubscribe
        | PacketType::PingReq
        | PacketType::Disconnect => {
            // These are client-to-server only; a server never sends them.
            return Err(DecodeError::InvalidData);
        }
    };

    Ok((packet, total_len))
}

/// Decode as many whole packets as possible from the front of `buf`.
///
/// Returns the decoded packets plus the unconsumed suffix of `buf`.
/// Stops (without error) at the first `DataTooShort`; any other
/// decode error is propagated and the stream must be considered dead.
pub fn decode_many(buf: &[u8]) -> Result<(Vec<Incoming>, Vec<u8>), DecodeError> {
    let mut packets = Vec::new();
    let mut offset = 0;

    loop {
        match decode_packet(&buf[offset..]) {
            Ok((packet, consumed)) => {
                packets.push(packet);
                offset += consumed;
            }
            Err(DecodeError::DataTooShort) => break,
            Err(err) => return Err(err),
        }
    }

    Ok((packets, buf[offset..].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{ConnectError, SubscribeResult};

    #[test]
    fn decodes_connack_scenario() {
        let buf = [0x20, 0x02, 0x00, 0x00];
        let (packet, consumed) = decode_packet(&buf).unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(
            packet,
            Incoming::ConnAck { session_present: false, result: Ok(()) }
        );
    }

    #[test]
    fn decodes_rejected_connack() {
        let buf = [0x20, 0x02, 0x00, 0x04];
        let (packet, _) = decode_packet(&buf).unwrap();
        assert_eq!(
            packet,
            Incoming::ConnAck { session_present: false, result: Err(ConnectError::BadUsernameOrPassword) }
        );
    }

    #[test]
    fn reports_data_too_short_for_partial_fixed_header() {
        assert_eq!(decode_packet(&[0x20]), Err(DecodeError::DataTooShort));
    }

    #[test]
    fn reports_data_too_short_for_partial_body() {
        assert_eq!(decode_packet(&[0x20, 0x02, 0x00]), Err(DecodeError::DataTooShort));
    }

    #[test]
    fn rejects_unknown_packet_type() {
        assert_eq!(decode_packet(&[0x00, 0x00]), Err(DecodeError::InvalidPacketIdentifier(0)));
    }

    #[test]
    fn decode_many_consumes_a_prefix_and_returns_leftover() {
        let mut buf = vec![0x20, 0x02, 0x00, 0x00]; // ConnAck
        buf.extend_from_slice(&[0xd0, 0x00]); // PingResp
        buf.extend_from_slice(&[0x20, 0x02]); // partial ConnAck

        let (packets, leftover) = decode_many(&buf).unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[1], Incoming::PingResp);
        assert_eq!(leftover, vec![0x20, 0x02]);
    }

    #[test]
    fn decode_many_is_equivalent_across_a_split_buffer() {
        let buf = [0x20, 0x02, 0x00, 0x00, 0xd0, 0x00];
        let (whole_packets, whole_leftover) = decode_many(&buf).unwrap();
        assert!(whole_leftover.is_empty());

        let (first_packets, leftover) = decode_many(&buf[..3]).unwrap();
        assert!(first_packets.is_empty());
        let mut rejoined = leftover;
        rejoined.extend_from_slice(&buf[3..]);
        let (second_packets, second_leftover) = decode_many(&rejoined).unwrap();

        assert_eq!(second_packets, whole_packets);
        assert!(second_leftover.is_empty());
    }

    #[test]
    fn decode_many_propagates_fatal_errors() {
        let buf = [0x00, 0x00];
        assert_eq!(decode_many(&buf), Err(DecodeError::InvalidPacketIdentifier(0)));
    }

    #[test]
    fn decodes_suback_with_mixed_results() {
        let mut buf = vec![0x90, 0x05, 0x00, 0x01];
        buf.extend_from_slice(&[0x00, 0x01, 0x80]);
        let (packet, _) = decode_packet(&buf).unwrap();
        assert_eq!(
            packet,
            Incoming::SubAck(
                1,
                vec![
                    SubscribeResult::Success(crate::packet::QoS::AtMostOnce),
                    SubscribeResult::Success(crate::packet::QoS::AtLeastOnce),
                    SubscribeResult::Failure,
                ]
            )
        );
    }
}
