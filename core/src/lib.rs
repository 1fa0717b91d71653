/*
 * lib.rs
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

//! Wavelink core: a small blocking WebSocket client (RFC 6455 subset) for pushing telemetry
//! from devices, plus the JSON report helpers built on it.

pub mod config;
pub mod error;
pub mod net;
pub mod protocol;
pub mod telemetry;
pub mod uri;

pub use config::ConnectOptions;
pub use error::{Result, WsError};
pub use protocol::websocket::{connect, connect_with, Message, WebSocketConnection};
pub use uri::WsUri;
