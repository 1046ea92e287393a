// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

use crate::byte_array::{write_str, write_u16};
use crate::error::EncodeError;
use crate::header::{FixedHeader, FLAGS_RESERVED_TWO};
use crate::packet::PacketType;

pub fn encode(packet_id: u16, filters: &[String], buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    if filters.is_empty() {
        return Err(EncodeError::EmptyUnsubscribeList);
    }

    let mut body = Vec::new();
    write_u16(&mut body, packet_id);
    for filter in filters {
        write_str(&mut body, filter)?;
    }

    FixedHeader::encode(PacketType::Unsubscribe, FLAGS_RESERVED_TWO, body.len(), buf)?;
    buf.extend_from_slice(&body);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_unsubscribe_bytes() {
        let filters = vec!["topic0".to_string(), "topic1".to_string()];
        let mut buf = Vec::new();
        encode(3, &filters, &mut buf).unwrap();
        assert_eq!(buf[0], 0xa2);
    }

    #[test]
    fn rejects_empty_unsubscribe_list() {
        let mut buf = Vec::new();
        assert_eq!(encode(1, &[], &mut buf), Err(EncodeError::EmptyUnsubscribeList));
    }
}
