/*
 * config.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Wavelink, a WebSocket telemetry client.
 *
 * Wavelink is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Wavelink is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Wavelink.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Connection options. Timeouts belong to the transport; the protocol layer never retries.

use std::time::Duration;

/// Default cap on a single frame payload (16 MiB).
pub const DEFAULT_MAX_PAYLOAD: u64 = 16 * 1024 * 1024;

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Options used when opening a connection with `connect_with`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// TCP connect timeout per resolved address. None blocks until the OS gives up.
    pub connect_timeout: Option<Duration>,
    /// Socket read timeout. None blocks indefinitely.
    pub read_timeout: Option<Duration>,
    /// Socket write timeout. None blocks indefinitely.
    pub write_timeout: Option<Duration>,
    /// Check Sec-WebSocket-Accept against the key we sent.
    pub verify_accept: bool,
    /// Largest frame payload accepted by read_frame.
    pub max_payload: u64,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            read_timeout: None,
            write_timeout: None,
            verify_accept: true,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Disable only for servers known to send a wrong or missing Sec-WebSocket-Accept.
    pub fn with_verify_accept(mut self, verify: bool) -> Self {
        self.verify_accept = verify;
        self
    }

    pub fn with_max_payload(mut self, max: u64) -> Self {
        self.max_payload = max;
        self
    }
}
