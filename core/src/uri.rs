/*
 * uri.rs
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

//! WebSocket URIs: `ws://host[:port][/path]` and `wss://host[:port][/path]`.
//! Host is alphanumerics, dots and hyphens only. No userinfo, IPv6 literals, query or fragment
//! outside the path, and no percent-decoding: input that does not fit fails rather than being
//! silently trimmed.

use std::fmt;
use std::str::FromStr;

use crate::error::WsError;

/// URI scheme: plain or TLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Ws,
    Wss,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Ws => 80,
            Scheme::Wss => 443,
        }
    }
}

/// Parsed WebSocket URI. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsUri {
    scheme: Scheme,
    host: String,
    port: u16,
    path: String,
}

impl WsUri {
    /// Parse a ws:// or wss:// URI. Port defaults to 80/443, path to `/`.
    pub fn parse(uri: &str) -> Result<Self, WsError> {
        let invalid = |why: &str| WsError::InvalidUri(format!("{}: {}", why, uri));

        let (scheme, rest) = if let Some(r) = uri.strip_prefix("wss://") {
            (Scheme::Wss, r)
        } else if let Some(r) = uri.strip_prefix("ws://") {
            (Scheme::Ws, r)
        } else {
            return Err(invalid("scheme must be ws or wss"));
        };

        let host_end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '.' || c == '-'))
            .unwrap_or(rest.len());
        let host = &rest[..host_end];
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        let mut rest = &rest[host_end..];

        let port = match rest.strip_prefix(':') {
            Some(after) => {
                let digits_end = after
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after.len());
                let digits = &after[..digits_end];
                if digits.is_empty() {
                    return Err(invalid("empty port"));
                }
                let port = digits
                    .parse::<u16>()
                    .map_err(|_| invalid("port out of range"))?;
                rest = &after[digits_end..];
                port
            }
            None => scheme.default_port(),
        };

        let path = if rest.is_empty() {
            "/".to_string()
        } else if rest.starts_with('/') {
            rest.to_string()
        } else {
            return Err(invalid("unexpected characters after host"));
        };

        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
            path,
        })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// True for wss:// (TLS).
    pub fn is_secure(&self) -> bool {
        self.scheme == Scheme::Wss
    }
}

impl FromStr for WsUri {
    type Err = WsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WsUri::parse(s)
    }
}

impl fmt::Display for WsUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}:{}{}",
            self.scheme.as_str(),
            self.host,
            self.port,
            self.path
        )
    }
}
