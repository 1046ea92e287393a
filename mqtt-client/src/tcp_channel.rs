// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

//! `TransportOptions::Tcp` channel, the way `ruo::stream::Stream`
//! wraps a concrete transport behind a small async read/write surface
//! -- generalized here to the `Channel` trait so the engine never
//! sees a raw `TcpStream`.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::channel::{Channel, ChannelEvent, ChannelFactory};
use crate::error::ChannelError;

pub struct TcpChannelFactory {
    host: String,
    port: u16,
    connect_timeout: Duration,
}

impl TcpChannelFactory {
    #[must_use]
    pub fn new(host: String, port: u16, connect_timeout: Duration) -> Self {
        TcpChannelFactory {
            host,
            port,
            connect_timeout,
        }
    }
}

#[async_trait]
impl ChannelFactory for TcpChannelFactory {
    async fn connect(&self) -> Result<Box<dyn Channel>, ChannelError> {
        let addr = format!("{}:{}", self.host, self.port);
        log::info!("tcp_channel: connecting to {addr}");
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| ChannelError::TransportError(format!("connect to {addr} timed out")))?
            .map_err(|err| ChannelError::TransportError(format!("connect to {addr} failed: {err}")))?;

        Ok(Box::new(TcpChannel::new(stream)))
    }
}

/// Splits a `TcpStream` into a write half kept on the struct and a
/// read half driven by a background task that forwards bytes (or the
/// terminal close/error) over an mpsc channel -- `recv()` just drains
/// that channel.
pub struct TcpChannel {
    write_half: tokio::net::tcp::OwnedWriteHalf,
    events_rx: mpsc::Receiver<ChannelEvent>,
}

impl TcpChannel {
    fn new(stream: TcpStream) -> Self {
        let (mut read_half, write_half) = stream.into_split();
        let (events_tx, events_rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            loop {
                match read_half.read(&mut buf).await {
                    Ok(0) => {
                        let _ = events_tx.send(ChannelEvent::Closed).await;
                        break;
                    }
                    Ok(n) => {
                        if events_tx
                            .send(ChannelEvent::IncomingData(buf[..n].to_vec()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(err) => {
                        let _ = events_tx
                            .send(ChannelEvent::Error(ChannelError::TransportError(err.to_string())))
                            .await;
                        break;
                    }
                }
            }
        });

        TcpChannel {
            write_half,
            events_rx,
        }
    }
}

#[async_trait]
impl Channel for TcpChannel {
    async fn send(&mut self, bytes: Vec<u8>) -> Result<(), ChannelError> {
        self.write_half
            .write_all(&bytes)
            .await
            .map_err(|err| ChannelError::SendFailed(err.to_string()))
    }

    async fn recv(&mut self) -> ChannelEvent {
        self.events_rx.recv().await.unwrap_or(ChannelEvent::Closed)
    }

    async fn shutdown(&mut self) {
        let _ = self.write_half.shutdown().await;
    }
}
