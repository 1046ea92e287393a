// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

use crate::error::DecodeError;
use crate::packet::PacketType;
use crate::var_int;

/// Fixed header shared by every MQTT control packet: one byte of
/// packet type + flags, followed by a variable length "Remaining
/// Length" field (MQTT 3.1.1 section 2.2).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FixedHeader {
    pub packet_type: PacketType,
    pub flags: u8,
    pub remaining_length: usize,
}

impl FixedHeader {
    /// Decode a fixed header from the front of `buf`.
    ///
    /// Returns `(header, bytes_consumed)`. [`DecodeError::DataTooShort`]
    /// means `buf` might hold a valid prefix and the caller should
    /// retry once more bytes have arrived.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), DecodeError> {
        let &first = buf.first().ok_or(DecodeError::DataTooShort)?;
        let type_id = (first >> 4) & 0x0f;
        let flags = first & 0x0f;
        let packet_type = PacketType::from_u8(type_id).ok_or_else(|| {
            log::warn!("header: unknown packet type id {type_id:#x}");
            DecodeError::InvalidPacketIdentifier(type_id)
        })?;

        let (remaining_length, varint_len) = var_int::decode(&buf[1..])?;

        Ok((
            Self {
                packet_type,
                flags,
                remaining_length,
            },
            1 + varint_len,
        ))
    }

    pub fn encode(packet_type: PacketType, flags: u8, remaining_length: usize, buf: &mut Vec<u8>) -> Result<(), crate::error::EncodeError> {
        let first = ((packet_type as u8) << 4) | (flags & 0x0f);
        buf.push(first);
        var_int::encode(buf, remaining_length)
    }
}

/// Fixed nibble of flags for packet types whose flags carry no
/// information (everything except Publish, PubRel, Subscribe,
/// Unsubscribe).
pub const FLAGS_RESERVED_ZERO: u8 = 0x0;

/// Fixed flags nibble for `PubRel`/`Subscribe`/`Unsubscribe`.
pub const FLAGS_RESERVED_TWO: u8 = 0x2;
