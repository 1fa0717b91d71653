/*
 * handshake.rs
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

//! WebSocket opening handshake (RFC 6455 §4): GET with Upgrade, read the 101 status line,
//! skip headers, verify Sec-WebSocket-Accept.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::io::{BufRead, Read};

use crate::error::{Result, WsError};
use crate::uri::WsUri;

/// Magic string for Sec-WebSocket-Accept (RFC 6455 §4.2.2).
const WS_ACCEPT_MAGIC: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Status line prefix of a successful upgrade. The trailing space is required.
const STATUS_101_PREFIX: &[u8] = b"HTTP/1.1 101 ";

/// Longest response line we read before giving up.
const MAX_LINE: usize = 8192;

/// Sec-WebSocket-Key: base64 of 16 random bytes, no trailing newline.
pub fn generate_key() -> Result<String> {
    let mut raw = [0u8; 16];
    getrandom::getrandom(&mut raw).map_err(WsError::handshake)?;
    Ok(STANDARD.encode(raw))
}

/// Build the HTTP GET request for the WebSocket handshake. Caller writes this to the stream.
pub fn build_handshake_request(uri: &WsUri, key: &str) -> Vec<u8> {
    let mut req = Vec::with_capacity(160 + uri.path().len() + uri.host().len());
    req.extend_from_slice(b"GET ");
    req.extend_from_slice(uri.path().as_bytes());
    req.extend_from_slice(b" HTTP/1.1\r\nHost: ");
    req.extend_from_slice(format!("{}:{}", uri.host(), uri.port()).as_bytes());
    req.extend_from_slice(b"\r\nConnection: Upgrade\r\nUpgrade: websocket\r\nSec-WebSocket-Key: ");
    req.extend_from_slice(key.as_bytes());
    req.extend_from_slice(b"\r\nSec-WebSocket-Version: 13\r\n\r\n");
    req
}

/// Compute expected Sec-WebSocket-Accept from the base64 key sent in Sec-WebSocket-Key:
/// base64(SHA-1(key + magic)).
pub fn compute_accept(key: &str) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_ACCEPT_MAGIC);
    STANDARD.encode(hasher.finalize())
}

/// What we keep from the server's upgrade response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub status_line: String,
    pub accept: Option<String>,
}

/// Read one CRLF-terminated line without the terminator. Ok(None) at end of stream.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    let n = reader
        .by_ref()
        .take(MAX_LINE as u64)
        .read_until(b'\n', &mut line)
        .map_err(WsError::handshake)?;
    if n == 0 {
        return Ok(None);
    }
    if line.last() != Some(&b'\n') {
        if n >= MAX_LINE {
            return Err(WsError::HandshakeFailed("response line too long".to_string()));
        }
        return Ok(None);
    }
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some(line))
}

/// Read the status line and headers up to the blank line. Fails unless the status line starts
/// with `HTTP/1.1 101 `. Headers are discarded except Sec-WebSocket-Accept.
/// The reader is left positioned at the first frame byte.
pub fn read_response<R: BufRead>(reader: &mut R) -> Result<HandshakeResponse> {
    let status = read_line(reader)?.ok_or_else(|| {
        WsError::HandshakeFailed("connection closed before status line".to_string())
    })?;
    let status_line = String::from_utf8_lossy(&status).into_owned();
    if !status.starts_with(STATUS_101_PREFIX) {
        return Err(WsError::HandshakeFailed(format!(
            "WebSocket upgrade failed: {}",
            status_line
        )));
    }

    let mut accept = None;
    loop {
        let line = read_line(reader)?.ok_or_else(|| {
            WsError::HandshakeFailed("connection closed during headers".to_string())
        })?;
        if line.is_empty() {
            break;
        }
        let line = String::from_utf8_lossy(&line);
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("Sec-WebSocket-Accept") {
                accept = Some(value.trim().to_string());
            }
        }
    }
    Ok(HandshakeResponse {
        status_line,
        accept,
    })
}

/// Verify the server's Sec-WebSocket-Accept header matches our key.
pub fn verify_accept(accept_header: Option<&str>, key: &str) -> Result<()> {
    let expected = compute_accept(key);
    match accept_header {
        Some(h) if h.trim() == expected => Ok(()),
        Some(_) => Err(WsError::HandshakeFailed(
            "Sec-WebSocket-Accept mismatch".to_string(),
        )),
        None => Err(WsError::HandshakeFailed(
            "missing Sec-WebSocket-Accept".to_string(),
        )),
    }
}
