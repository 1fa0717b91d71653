/*
 * telemetry.rs
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

//! Telemetry reports pushed by device code: location fixes, motion readings, notifications.
//!
//! Each report goes out on its own connection (connect, one text frame, close). Failures are
//! returned to the caller, which is expected to log them and carry on with its loop.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ConnectOptions;
use crate::error::{Result, WsError};
use crate::net::Stream;
use crate::protocol::websocket::{connect_with, OpCode, WebSocketConnection, CLOSE_NORMAL};

/// One JSON telemetry message, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Report {
    /// GPS fix in decimal degrees.
    Location { latitude: f64, longitude: f64 },
    /// Accelerometer (g) and orientation (degrees).
    Motion {
        x: f64,
        y: f64,
        z: f64,
        roll: f64,
        pitch: f64,
    },
    Notification { message: String },
}

impl Report {
    pub fn location(latitude: f64, longitude: f64) -> Self {
        Report::Location {
            latitude,
            longitude,
        }
    }

    pub fn notification(message: impl Into<String>) -> Self {
        Report::Notification {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Server reply to a notification.
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyReply {
    /// Value of the reply's `status` field, if it is a string.
    pub status: Option<String>,
    pub body: serde_json::Value,
}

impl NotifyReply {
    /// True when the server answered `{"status": "ok", ...}`.
    pub fn acknowledged(&self) -> bool {
        self.status.as_deref() == Some("ok")
    }
}

/// Send one report on an open connection, then close it. The connection is released even
/// when the send fails.
pub fn report_once<S: Stream>(mut conn: WebSocketConnection<S>, report: &Report) -> Result<()> {
    let payload = report.to_json()?;
    let sent = conn.send_text(&payload);
    let closed = conn.close(CLOSE_NORMAL, "");
    if let (Ok(()), Err(e)) = (&sent, &closed) {
        warn!(error = %e, "report sent but close failed");
    }
    sent?;
    closed?;
    debug!(%payload, "report sent");
    Ok(())
}

/// Connect to `uri`, send one report, close.
pub fn send_report(uri: &str, report: &Report, options: &ConnectOptions) -> Result<()> {
    let conn = connect_with(uri, options)?;
    report_once(conn, report).map_err(|e| {
        warn!(%uri, error = %e, "report failed");
        e
    })
}

/// Send a notification and read exactly one raw frame back as the JSON reply, then close.
///
/// This treats WebSocket as request/response: the next frame from the server is assumed to
/// be the answer. Servers that interleave other messages will confuse it.
pub fn notify_once<S: Stream>(
    mut conn: WebSocketConnection<S>,
    message: &str,
) -> Result<NotifyReply> {
    let result = exchange(&mut conn, message);
    let closed = conn.close(CLOSE_NORMAL, "");
    let reply = result?;
    closed?;
    Ok(reply)
}

fn exchange<S: Stream>(conn: &mut WebSocketConnection<S>, message: &str) -> Result<NotifyReply> {
    conn.send_text(&Report::notification(message).to_json()?)?;
    let frame = conn.read_frame()?;
    if !matches!(frame.opcode, OpCode::Text | OpCode::Binary) {
        return Err(WsError::Protocol(format!(
            "expected a data frame as notification reply, got {:?}",
            frame.opcode
        )));
    }
    let body: serde_json::Value = serde_json::from_slice(&frame.payload)
        .map_err(|e| WsError::Protocol(format!("notification reply is not JSON: {}", e)))?;
    let status = body
        .get("status")
        .and_then(|s| s.as_str())
        .map(str::to_string);
    debug!(?status, "notification reply");
    Ok(NotifyReply { status, body })
}

/// Connect to `uri`, send a notification, wait for the JSON reply, close.
pub fn notify(uri: &str, message: &str, options: &ConnectOptions) -> Result<NotifyReply> {
    let conn = connect_with(uri, options)?;
    notify_once(conn, message).map_err(|e| {
        warn!(%uri, error = %e, "notification failed");
        e
    })
}
