/*
 * mod.rs
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

//! WebSocket client (RFC 6455 subset).
//!
//! - Blocking: one connection owns one stream; reads and writes block on the transport.
//! - Frames: FIN always set on send, client frames masked, no extensions, no reassembly.
//! - Handshake: HTTP/1.1 Upgrade with a random key; Sec-WebSocket-Accept checked unless disabled.
//! - `recv` answers pings and skips pongs; `read_frame` gives raw access.

pub mod client;
pub mod connection;
pub mod frame;
pub mod handshake;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{connect, connect_with, handshake};
pub use connection::{Message, Role, WebSocketConnection, CLOSE_NORMAL, CLOSE_TOO_BIG};
pub use frame::{Frame, OpCode};
