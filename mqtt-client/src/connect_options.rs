// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

use std::time::Duration;

/// Configuration for a single MQTT connection. Sessions are always
/// clean in this revision (no persisted state across `connect()`
/// calls), so there is no `clean_session` knob to set.
#[derive(Clone, Debug)]
pub struct ConnectOptions {
    client_id: String,
    keep_alive: Duration,
    server_timeout: Duration,
}

impl ConnectOptions {
    /// `keep_alive` defaults to 60s and `server_timeout` to 5s,
    /// matching common broker defaults; override with
    /// [`Self::set_keep_alive`] / [`Self::set_server_timeout`].
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        ConnectOptions {
            client_id: client_id.into(),
            keep_alive: Duration::from_secs(60),
            server_timeout: Duration::from_secs(5),
        }
    }

    pub fn set_client_id(&mut self, client_id: impl Into<String>) -> &mut Self {
        self.client_id = client_id.into();
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Maximum idle interval before the engine must send a PingReq.
    /// Encoded on the wire as whole seconds (MQTT 3.1.1 keep-alive is
    /// a u16 seconds field); the engine keeps the full `Duration`
    /// internally so tests can run sub-second keep-alive intervals.
    pub fn set_keep_alive(&mut self, keep_alive: Duration) -> &mut Self {
        self.keep_alive = keep_alive;
        self
    }

    #[must_use]
    pub const fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    /// Wire value sent in the Connect packet: `keep_alive` rounded
    /// down to whole seconds, saturating at `u16::MAX`.
    #[must_use]
    pub fn keep_alive_seconds(&self) -> u16 {
        u16::try_from(self.keep_alive.as_secs()).unwrap_or(u16::MAX)
    }

    /// How long the engine waits for a PingResp after sending a
    /// PingReq before declaring the connection dead.
    pub fn set_server_timeout(&mut self, server_timeout: Duration) -> &mut Self {
        self.server_timeout = server_timeout;
        self
    }

    #[must_use]
    pub const fn server_timeout(&self) -> Duration {
        self.server_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_alive_seconds_rounds_down() {
        let mut opts = ConnectOptions::new("c");
        opts.set_keep_alive(Duration::from_millis(1_500));
        assert_eq!(opts.keep_alive_seconds(), 1);
    }
}
