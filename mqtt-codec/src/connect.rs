// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

use crate::byte_array::{write_str, write_u16, ByteArray};
use crate::error::{DecodeError, EncodeError};
use crate::header::{FixedHeader, FLAGS_RESERVED_ZERO};
use crate::packet::{ConnectError, PacketType};

const PROTOCOL_NAME: &str = "MQTT";
const PROTOCOL_LEVEL: u8 = 4;

/// Connect flags byte this client always emits: clean-session bit set
/// (bit 1), every other bit zero — no Will, no username/password in
/// this revision.
const CONNECT_FLAGS: u8 = 0b0000_0010;

/// Encode a Connect packet. Fails if `client_id` is empty.
pub fn encode(client_id: &str, keep_alive_seconds: u16, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    if client_id.is_empty() {
        return Err(EncodeError::EmptyClientId);
    }

    let mut variable_and_payload = Vec::new();
    write_str(&mut variable_and_payload, PROTOCOL_NAME)?;
    variable_and_payload.push(PROTOCOL_LEVEL);
    variable_and_payload.push(CONNECT_FLAGS);
    write_u16(&mut variable_and_payload, keep_alive_seconds);
    write_str(&mut variable_and_payload, client_id)?;

    FixedHeader::encode(PacketType::Connect, FLAGS_RESERVED_ZERO, variable_and_payload.len(), buf)?;
    buf.extend_from_slice(&variable_and_payload);
    Ok(())
}

/// Decode a ConnAck packet body (the fixed header has already been
/// consumed by the caller).
pub fn decode_connack(body: &[u8]) -> Result<(bool, Result<(), ConnectError>), DecodeError> {
    if body.len() != 2 {
        return Err(DecodeError::InvalidData);
    }

    let mut ba = ByteArray::new(body);
    let flags = ba.read_u8()?;
    if flags & !0x01 != 0 {
        return Err(DecodeError::InvalidData);
    }
    let session_present = flags & 0x01 != 0;

    let code = ba.read_u8()?;
    let result = match code {
        0 => Ok(()),
        other => Err(ConnectError::from_u8(other).ok_or(DecodeError::InvalidData)?),
    };

    Ok((session_present, result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_connect_bytes() {
        let mut buf = Vec::new();
        encode("test-client-id", 15, &mut buf).unwrap();

        let mut expected = vec![0x10];
        expected.push(12 + "test-client-id".len() as u8);
        expected.extend_from_slice(&[0x00, 0x04, b'M', b'Q', b'T', b'T', 0x04, 0x02, 0x00, 0x0f]);
        expected.extend_from_slice(&[0x00, 0x0e]);
        expected.extend_from_slice(b"test-client-id");

        assert_eq!(buf, expected);
    }

    #[test]
    fn rejects_empty_client_id() {
        let mut buf = Vec::new();
        assert_eq!(encode("", 15, &mut buf), Err(EncodeError::EmptyClientId));
    }

    #[test]
    fn decodes_accepted_connack() {
        let (session_present, result) = decode_connack(&[0x00, 0x00]).unwrap();
        assert!(!session_present);
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn decodes_bad_username_password_connack() {
        let (_, result) = decode_connack(&[0x00, 0x04]).unwrap();
        assert_eq!(result, Err(ConnectError::BadUsernameOrPassword));
    }

    #[test]
    fn rejects_reserved_connack_flag_bits() {
        assert_eq!(decode_connack(&[0x02, 0x00]), Err(DecodeError::InvalidData));
    }

    #[test]
    fn rejects_wrong_length_connack() {
        assert_eq!(decode_connack(&[0x00]), Err(DecodeError::InvalidData));
    }
}
