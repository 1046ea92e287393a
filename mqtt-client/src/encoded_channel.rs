// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

//! Thin adapter that wraps a raw [`Channel`], owns the inbound byte
//! accumulator, and turns raw byte events into decoded-packet events.

use mqtt_codec::{decode_many, encode_packet, DecodeError, Incoming, Outgoing};

use crate::channel::{Channel, ChannelEvent};
use crate::error::ChannelError;

/// What [`EncodedChannel::recv`] yields.
pub enum EncodedChannelEvent {
    /// Zero or more complete packets decoded from the bytes that just
    /// arrived, or the decode error that makes the connection
    /// unusable. An empty packet list is a normal outcome (a chunk
    /// that only extends a still-incomplete packet).
    PacketsReceived(Result<Vec<Incoming>, DecodeError>),
    Closed,
    Error(ChannelError),
}

/// Owns the accumulator described in `spec.md` §4.3: on every
/// `IncomingData` chunk, concatenate with the held tail, decode as
/// many whole packets as possible, and keep the new tail.
pub struct EncodedChannel {
    channel: Box<dyn Channel>,
    carry: Vec<u8>,
}

impl EncodedChannel {
    #[must_use]
    pub fn new(channel: Box<dyn Channel>) -> Self {
        EncodedChannel {
            channel,
            carry: Vec::new(),
        }
    }

    pub async fn send(&mut self, packet: &Outgoing) -> Result<(), ChannelError> {
        let mut buf = Vec::new();
        encode_packet(packet, &mut buf)
            .map_err(|err| ChannelError::SendFailed(err.to_string()))?;
        self.channel.send(buf).await
    }

    pub async fn recv(&mut self) -> EncodedChannelEvent {
        match self.channel.recv().await {
            ChannelEvent::IncomingData(chunk) => {
                self.carry.extend_from_slice(&chunk);
                match decode_many(&self.carry) {
                    Ok((packets, leftover)) => {
                        self.carry = leftover;
                        EncodedChannelEvent::PacketsReceived(Ok(packets))
                    }
                    Err(err) => EncodedChannelEvent::PacketsReceived(Err(err)),
                }
            }
            ChannelEvent::Closed => EncodedChannelEvent::Closed,
            ChannelEvent::Error(err) => EncodedChannelEvent::Error(err),
        }
    }

    pub async fn shutdown(&mut self) {
        self.channel.shutdown().await;
    }
}
