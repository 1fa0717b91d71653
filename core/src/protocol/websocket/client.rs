/*
 * client.rs
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

//! WebSocket client: connect to ws:// or wss:// URL, perform handshake, return WebSocketConnection.

use std::io::BufReader;
use tracing::debug;

use crate::config::ConnectOptions;
use crate::error::{Result, WsError};
use crate::net::{open_stream, Stream, WsStream};
use crate::protocol::websocket::connection::{Role, WebSocketConnection};
use crate::protocol::websocket::handshake::{
    build_handshake_request, generate_key, read_response, verify_accept,
};
use crate::uri::WsUri;

/// Connect with default options. See `connect_with`.
pub fn connect(uri: &str) -> Result<WebSocketConnection<WsStream>> {
    connect_with(uri, &ConnectOptions::default())
}

/// Connect to the given WebSocket URL (ws:// or wss://), perform the opening handshake,
/// and return a client-role connection. A malformed URL fails with `InvalidUri`; anything
/// that goes wrong while connecting or upgrading fails with `HandshakeFailed`.
pub fn connect_with(uri: &str, options: &ConnectOptions) -> Result<WebSocketConnection<WsStream>> {
    let uri = WsUri::parse(uri)?;
    debug!(%uri, "connecting");
    let stream = open_stream(&uri, options).map_err(WsError::handshake)?;
    handshake(stream, &uri, options)
}

/// Run the client opening handshake over an already connected stream (plain or TLS).
pub fn handshake<S: Stream>(
    stream: S,
    uri: &WsUri,
    options: &ConnectOptions,
) -> Result<WebSocketConnection<S>> {
    let key = generate_key()?;
    let request = build_handshake_request(uri, &key);

    let mut reader = BufReader::new(stream);
    let stream = reader.get_mut();
    stream.write_all(&request).map_err(WsError::handshake)?;
    stream.flush().map_err(WsError::handshake)?;

    let response = read_response(&mut reader)?;
    if options.verify_accept {
        verify_accept(response.accept.as_deref(), &key)?;
    }
    debug!(%uri, status = %response.status_line, "websocket upgraded");

    Ok(WebSocketConnection::from_reader(reader, Role::Client).with_max_payload(options.max_payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::websocket::connection::Message;
    use crate::protocol::websocket::frame::OpCode;
    use crate::protocol::websocket::mock::{server_frame, MockStream};

    fn no_verify() -> ConnectOptions {
        ConnectOptions::default().with_verify_accept(false)
    }

    #[test]
    fn handshake_writes_request_and_keeps_read_ahead() {
        let mut input = b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\n\r\n".to_vec();
        input.extend(server_frame(OpCode::Text, b"welcome"));
        let stream = MockStream::new(input);
        let handle = stream.clone();
        let uri = WsUri::parse("ws://example.com:8080/ws").unwrap();

        let mut conn = handshake(stream, &uri, &no_verify()).unwrap();
        assert!(conn.is_open());
        assert_eq!(conn.role(), Role::Client);
        assert_eq!(conn.recv().unwrap(), Message::Text("welcome".to_string()));

        let req = String::from_utf8(handle.written()).unwrap();
        assert!(req.starts_with("GET /ws HTTP/1.1\r\nHost: example.com:8080\r\n"));
        assert!(req.contains("\r\nSec-WebSocket-Version: 13\r\n\r\n"));
        assert!(req.ends_with("\r\n\r\n"));
    }

    #[test]
    fn handshake_rejects_non_101() {
        for status in ["HTTP/1.1 200 OK\r\n\r\n", "HTTP/1.1 101\r\n\r\n"] {
            let stream = MockStream::new(status.as_bytes().to_vec());
            let uri = WsUri::parse("ws://example.com").unwrap();
            let err = handshake(stream, &uri, &no_verify()).err().unwrap();
            assert!(matches!(err, WsError::HandshakeFailed(_)), "{}", status);
        }
    }

    #[test]
    fn handshake_verifies_accept_by_default() {
        let stream = MockStream::new(
            b"HTTP/1.1 101 Switching Protocols\r\nSec-WebSocket-Accept: bogus\r\n\r\n".to_vec(),
        );
        let uri = WsUri::parse("ws://example.com").unwrap();
        let err = handshake(stream, &uri, &ConnectOptions::default()).err().unwrap();
        assert!(matches!(err, WsError::HandshakeFailed(_)));
    }

    #[test]
    fn handshake_fails_when_request_cannot_be_written() {
        let stream = MockStream::new(Vec::new());
        stream.fail_writes();
        let uri = WsUri::parse("ws://example.com").unwrap();
        let err = handshake(stream, &uri, &no_verify()).err().unwrap();
        assert!(matches!(err, WsError::HandshakeFailed(_)));
    }

    #[test]
    fn connect_rejects_bad_uri_before_any_io() {
        assert!(matches!(connect("ftp://example.com"), Err(WsError::InvalidUri(_))));
    }

    #[test]
    fn connect_to_closed_port_is_handshake_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let err = connect(&format!("ws://127.0.0.1:{}/", port)).err().unwrap();
        assert!(matches!(err, WsError::HandshakeFailed(_)));
    }
}
