/*
 * connection.rs
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

//! WebSocket connection: owns the stream after the handshake, reads and writes frames,
//! exposes recv/send/close.
//!
//! `open` goes from true to false exactly once. Receiving a close frame only marks the
//! connection closed; the transport stays allocated until `close()` or `release()`.

use bytes::BytesMut;
use std::io::{self, BufReader};
use tracing::{debug, warn};

use crate::config::DEFAULT_MAX_PAYLOAD;
use crate::error::{Result, WsError};
use crate::net::{Stream, WsStream};
use crate::protocol::websocket::frame::{
    decode_frame, encode_frame, Frame, OpCode, MAX_CONTROL_PAYLOAD,
};

/// Normal closure status code.
pub const CLOSE_NORMAL: u16 = 1000;
/// Message too big status code.
pub const CLOSE_TOO_BIG: u16 = 1009;

/// Which end of the connection we are. Clients mask outgoing frames, servers do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

/// Logical message returned by `recv` and accepted by `send`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
    /// Peer sent a close frame. Not sendable.
    Closed,
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::Text(s)
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Message {
    fn from(b: Vec<u8>) -> Self {
        Message::Binary(b)
    }
}

/// WebSocket connection after a successful handshake (or wrapped directly around a stream for
/// the server role).
pub struct WebSocketConnection<S: Stream = WsStream> {
    transport: Option<BufReader<S>>,
    role: Role,
    open: bool,
    max_payload: u64,
}

impl<S: Stream> WebSocketConnection<S> {
    /// Wrap an already upgraded stream.
    pub fn new(stream: S, role: Role) -> Self {
        Self::from_reader(BufReader::new(stream), role)
    }

    /// Wrap a buffered stream, keeping any bytes already read ahead (e.g. after the handshake).
    pub(crate) fn from_reader(reader: BufReader<S>, role: Role) -> Self {
        Self {
            transport: Some(reader),
            role,
            open: true,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }

    /// Largest payload read_frame accepts.
    pub fn with_max_payload(mut self, max_payload: u64) -> Self {
        self.max_payload = max_payload;
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn transport(&mut self) -> Result<&mut BufReader<S>> {
        if !self.open {
            return Err(WsError::ConnectionClosed);
        }
        self.transport.as_mut().ok_or(WsError::ConnectionClosed)
    }

    /// Read one raw frame, bypassing opcode handling. Control frames are not answered here.
    ///
    /// This is an escape hatch: `recv` is the normal receive path. Reading a reply frame right
    /// after a send treats WebSocket as request/response, which the protocol does not promise.
    ///
    /// An oversize frame leaves its payload unread on the wire, so the connection answers with
    /// close 1009 (best effort) and is marked closed before `PayloadTooLarge` is returned.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let max_payload = self.max_payload;
        let reader = self.transport()?;
        let frame = match decode_frame(reader, max_payload) {
            Ok(frame) => frame,
            Err(WsError::PayloadTooLarge(len)) => {
                warn!(len, max_payload, "oversize frame, closing");
                if let Err(e) = self.write_frame(OpCode::Close, &CLOSE_TOO_BIG.to_be_bytes()) {
                    debug!(error = %e, "close 1009 not sent");
                }
                self.mark_closed();
                return Err(WsError::PayloadTooLarge(len));
            }
            Err(e) => return Err(e),
        };
        debug!(opcode = ?frame.opcode, fin = frame.fin, len = frame.payload.len(), "frame received");
        Ok(frame)
    }

    /// Write one frame with FIN set. Client role masks with a fresh random key.
    /// Header and payload go out in a single write.
    pub fn write_frame(&mut self, opcode: OpCode, payload: &[u8]) -> Result<()> {
        let mask_key = match self.role {
            Role::Client => {
                let mut key = [0u8; 4];
                getrandom::getrandom(&mut key)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
                Some(key)
            }
            Role::Server => None,
        };
        let mut out = BytesMut::with_capacity(14 + payload.len());
        encode_frame(opcode, payload, mask_key, &mut out);

        let stream = self.transport()?.get_mut();
        stream.write_all(&out)?;
        stream.flush()?;
        debug!(?opcode, len = payload.len(), "frame sent");
        Ok(())
    }

    /// Receive the next text or binary message. Pings are answered with a pong carrying the same
    /// payload and pongs are dropped; neither returns to the caller. A close frame marks the
    /// connection closed and yields `Message::Closed`.
    ///
    /// Continuation frames are not reassembled and fail with a protocol error.
    pub fn recv(&mut self) -> Result<Message> {
        while self.open {
            let frame = self.read_frame()?;
            match frame.opcode {
                OpCode::Text => {
                    let text = String::from_utf8(frame.payload).map_err(|_| {
                        WsError::Protocol("text frame is not valid UTF-8".to_string())
                    })?;
                    return Ok(Message::Text(text));
                }
                OpCode::Binary => return Ok(Message::Binary(frame.payload)),
                OpCode::Close => {
                    debug!("close frame received");
                    self.mark_closed();
                    return Ok(Message::Closed);
                }
                OpCode::Ping => self.write_frame(OpCode::Pong, &frame.payload)?,
                OpCode::Pong => {}
                OpCode::Continuation => {
                    return Err(WsError::Protocol(
                        "unexpected continuation frame".to_string(),
                    ));
                }
            }
        }
        Err(WsError::ConnectionClosed)
    }

    /// Send a text or binary message. `Message::Closed` is not a sendable message; use `close`.
    pub fn send(&mut self, message: Message) -> Result<()> {
        match message {
            Message::Text(text) => self.write_frame(OpCode::Text, text.as_bytes()),
            Message::Binary(data) => self.write_frame(OpCode::Binary, &data),
            Message::Closed => Err(WsError::UnsupportedMessageType),
        }
    }

    /// Send a text frame.
    pub fn send_text(&mut self, text: &str) -> Result<()> {
        self.write_frame(OpCode::Text, text.as_bytes())
    }

    /// Send a binary frame.
    pub fn send_binary(&mut self, data: &[u8]) -> Result<()> {
        self.write_frame(OpCode::Binary, data)
    }

    /// Send a ping frame. The pong is consumed by `recv`.
    pub fn ping(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > MAX_CONTROL_PAYLOAD {
            return Err(WsError::Protocol("ping payload max 125 bytes".to_string()));
        }
        self.write_frame(OpCode::Ping, data)
    }

    /// Send a close frame (2-byte big-endian code + UTF-8 reason), mark the connection closed
    /// and release the transport. The transport is released even when the write fails; the
    /// write error is then returned. If the connection was already marked closed (peer close
    /// seen by `recv`) no frame is written. A reason that does not fit a control frame is not
    /// sent either; the connection is still closed and `Protocol` is returned.
    pub fn close(&mut self, code: u16, reason: &str) -> Result<()> {
        let written = if 2 + reason.len() > MAX_CONTROL_PAYLOAD {
            Err(WsError::Protocol("close payload max 125 bytes".to_string()))
        } else if self.open {
            let mut payload = Vec::with_capacity(2 + reason.len());
            payload.extend_from_slice(&code.to_be_bytes());
            payload.extend_from_slice(reason.as_bytes());
            self.write_frame(OpCode::Close, &payload)
        } else {
            Ok(())
        };
        self.mark_closed();
        let released = self.release();
        written.and(released)
    }

    /// Flip the connection to closed without touching the transport.
    pub fn mark_closed(&mut self) {
        self.open = false;
    }

    /// Shut down and drop the transport. Marks the connection closed. Idempotent.
    pub fn release(&mut self) -> Result<()> {
        self.open = false;
        match self.transport.take() {
            Some(mut reader) => match reader.get_mut().shutdown() {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
                Err(e) => Err(WsError::Io(e)),
            },
            None => Ok(()),
        }
    }

    /// True while the transport has not been released.
    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }
}
