/*
 * error.rs
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

//! WebSocket client errors.

use std::io;

/// Errors from URI parsing, the opening handshake, or frame I/O on a connection.
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    /// Input is not `ws://host[:port][/path]` or `wss://...`.
    #[error("invalid WebSocket URI: {0}")]
    InvalidUri(String),
    /// Non-101 status, bad accept key, or transport failure before the upgrade completed.
    #[error("WebSocket handshake failed: {0}")]
    HandshakeFailed(String),
    /// Stream ended before the first byte of a frame header. Nothing to read yet.
    #[error("no data")]
    NoData,
    /// Connection is no longer open, or the stream ended in the middle of a frame.
    #[error("connection closed")]
    ConnectionClosed,
    /// Message is neither text nor binary.
    #[error("unsupported message type")]
    UnsupportedMessageType,
    /// Declared payload length exceeds the configured maximum.
    #[error("frame payload too large: {0} bytes")]
    PayloadTooLarge(u64),
    /// Peer sent something this client does not accept.
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WsError {
    /// Map an I/O error that happened in the middle of a frame. End of stream there means the
    /// peer went away.
    pub(crate) fn mid_frame(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            WsError::ConnectionClosed
        } else {
            WsError::Io(err)
        }
    }

    pub(crate) fn handshake(err: impl std::fmt::Display) -> Self {
        WsError::HandshakeFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WsError>;
