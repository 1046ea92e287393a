// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

//! `PubAck`/`PubRec`/`PubRel`/`PubComp`/`UnsubAck` share an identical
//! shape: a fixed header and a two-byte packet identifier, nothing
//! else.

use crate::byte_array::{write_u16, ByteArray};
use crate::error::{DecodeError, EncodeError};
use crate::header::FixedHeader;
use crate::packet::PacketType;

pub fn encode(packet_type: PacketType, flags: u8, packet_id: u16, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    FixedHeader::encode(packet_type, flags, 2, buf)?;
    write_u16(buf, packet_id);
    Ok(())
}

pub fn decode(body: &[u8]) -> Result<u16, DecodeError> {
    if body.len() != 2 {
        return Err(DecodeError::InvalidData);
    }
    ByteArray::new(body).read_u16()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FLAGS_RESERVED_ZERO;

    #[test]
    fn round_trips_puback() {
        let mut buf = Vec::new();
        encode(PacketType::PubAck, FLAGS_RESERVED_ZERO, 42, &mut buf).unwrap();
        assert_eq!(buf, vec![0x40, 0x02, 0x00, 0x2a]);
        assert_eq!(decode(&buf[2..]), Ok(42));
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(decode(&[0x00]), Err(DecodeError::InvalidData));
        assert_eq!(decode(&[0x00, 0x01, 0x02]), Err(DecodeError::InvalidData));
    }
}
