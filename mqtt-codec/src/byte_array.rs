// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

use byteorder::{BigEndian, ByteOrder};

use crate::error::DecodeError;

/// A cursor over a byte slice that is already known to hold exactly one
/// packet's variable header + payload (`remaining_length` bytes).
///
/// Any read that runs past the end of the slice is a malformed packet,
/// not a framing shortfall — by the time a `ByteArray` is handed a
/// slice, the caller has already confirmed the full packet arrived.
pub struct ByteArray<'a> {
    offset: usize,
    data: &'a [u8],
}

impl<'a> ByteArray<'a> {
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        ByteArray { offset: 0, data }
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = *self.data.get(self.offset).ok_or(DecodeError::InvalidData)?;
        self.offset += 1;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_bytes(2)?;
        Ok(BigEndian::read_u16(bytes))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.offset.checked_add(len).ok_or(DecodeError::InvalidData)?;
        let bytes = self.data.get(self.offset..end).ok_or(DecodeError::InvalidData)?;
        self.offset = end;
        Ok(bytes)
    }

    /// The rest of the slice, consuming it entirely. Used for Publish
    /// payloads, which run to the end of the packet.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let bytes = &self.data[self.offset..];
        self.offset = self.data.len();
        bytes
    }

    /// Length-prefixed UTF-8 string, per MQTT 3.1.1 section 1.5.3.
    pub fn read_str(&mut self) -> Result<&'a str, DecodeError> {
        let len = self
            .read_u16()
            .map_err(|_| DecodeError::InvalidStringLength)? as usize;
        let bytes = self
            .data
            .get(self.offset..self.offset + len)
            .ok_or(DecodeError::InvalidStringLength)?;
        self.offset += len;
        std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
    }
}

pub fn write_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_be_bytes());
}

pub fn write_str(buf: &mut Vec<u8>, value: &str) -> Result<(), crate::error::EncodeError> {
    if value.len() > u16::MAX as usize {
        return Err(crate::error::EncodeError::StringTooLong);
    }
    write_u16(buf, value.len() as u16);
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}
