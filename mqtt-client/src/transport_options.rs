// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

use std::sync::Arc;
use std::time::Duration;

use crate::channel::ChannelFactory;
use crate::tcp_channel::TcpChannelFactory;

/// Recognized transports a [`crate::Client`] can be started over.
/// Each variant knows how to build its own [`ChannelFactory`].
#[derive(Clone, Debug)]
pub enum TransportOptions {
    Tcp {
        host: String,
        port: u16,
        connect_timeout_ms: u64,
    },
}

impl TransportOptions {
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16, connect_timeout_ms: u64) -> Self {
        TransportOptions::Tcp {
            host: host.into(),
            port,
            connect_timeout_ms,
        }
    }

    pub(crate) fn into_factory(self) -> Arc<dyn ChannelFactory> {
        match self {
            TransportOptions::Tcp {
                host,
                port,
                connect_timeout_ms,
            } => Arc::new(TcpChannelFactory::new(
                host,
                port,
                Duration::from_millis(connect_timeout_ms),
            )),
        }
    }
}
