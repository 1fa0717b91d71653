/*
 * net.rs
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

//! Blocking transport: TCP connect with timeouts, optional rustls wrapping for wss://.
//!
//! The connection can be plain or secure; for wss:// the TLS session verifies the server
//! certificate against the URI host. Everything is blocking; timeouts are socket options.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::{Arc, OnceLock};

use rustls::client::ClientConfig;
use rustls::pki_types::ServerName;
use rustls::{ClientConnection, RootCertStore, StreamOwned};
use tracing::debug;

use crate::config::ConnectOptions;
use crate::uri::WsUri;

/// Byte stream a WebSocket connection runs over: blocking read, write, and an explicit
/// shutdown used when the connection releases its transport.
pub trait Stream: Read + Write {
    fn shutdown(&mut self) -> io::Result<()>;
}

impl Stream for TcpStream {
    fn shutdown(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

impl<S: Stream + ?Sized> Stream for Box<S> {
    fn shutdown(&mut self) -> io::Result<()> {
        (**self).shutdown()
    }
}

/// Build a root certificate store: platform native certs first, then webpki-roots as fallback.
fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    match rustls_native_certs::load_native_certs() {
        Ok(certs) => {
            let (added, skipped) = root_store.add_parsable_certificates(certs);
            debug!(added, skipped, "native root certificates loaded");
        }
        Err(e) => debug!(error = %e, "native root certificates unavailable"),
    }
    if root_store.is_empty() {
        debug!("falling back to webpki roots");
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    root_store
}

static CLIENT_CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();

/// Shared TLS client config (native + Mozilla roots, no client auth). No ALPN: the upgrade
/// request is plain HTTP/1.1.
pub fn tls_client_config() -> Arc<ClientConfig> {
    CLIENT_CONFIG
        .get_or_init(|| {
            let config = ClientConfig::builder()
                .with_root_certificates(build_root_store())
                .with_no_client_auth();
            Arc::new(config)
        })
        .clone()
}

/// Stream opened by `connect`: plain TCP for ws://, rustls over TCP for wss://.
pub enum WsStream {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl WsStream {
    /// The underlying TCP socket (e.g. to adjust timeouts after connect).
    pub fn tcp(&self) -> &TcpStream {
        match self {
            WsStream::Plain(s) => s,
            WsStream::Tls(s) => &s.sock,
        }
    }
}

impl Read for WsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            WsStream::Plain(s) => s.read(buf),
            WsStream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for WsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            WsStream::Plain(s) => s.write(buf),
            WsStream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            WsStream::Plain(s) => s.flush(),
            WsStream::Tls(s) => s.flush(),
        }
    }
}

impl Stream for WsStream {
    fn shutdown(&mut self) -> io::Result<()> {
        match self {
            WsStream::Plain(s) => TcpStream::shutdown(s, Shutdown::Both),
            WsStream::Tls(s) => {
                s.conn.send_close_notify();
                // close_notify is best effort; the peer may already be gone
                let _ = s.flush();
                TcpStream::shutdown(&s.sock, Shutdown::Both)
            }
        }
    }
}

/// Resolve host:port and connect to the first address that accepts, applying timeouts.
pub fn connect_tcp(host: &str, port: u16, options: &ConnectOptions) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        let attempt = match options.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(tcp) => {
                tcp.set_read_timeout(options.read_timeout)?;
                tcp.set_write_timeout(options.write_timeout)?;
                tcp.set_nodelay(true)?;
                debug!(%addr, "tcp connected");
                return Ok(tcp);
            }
            Err(e) => {
                debug!(%addr, error = %e, "tcp connect failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} did not resolve to any address", host),
        )
    }))
}

/// Wrap a connected socket in a TLS client session verifying `host`. The TLS handshake itself
/// runs on the first read or write.
pub fn wrap_tls(tcp: TcpStream, host: &str) -> io::Result<WsStream> {
    let server_name = ServerName::try_from(host)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid host name"))?
        .to_owned();
    let conn = ClientConnection::new(tls_client_config(), server_name)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Ok(WsStream::Tls(Box::new(StreamOwned::new(conn, tcp))))
}

/// Open the transport for `uri`: TCP, plus TLS when the scheme is wss.
pub fn open_stream(uri: &WsUri, options: &ConnectOptions) -> io::Result<WsStream> {
    let tcp = connect_tcp(uri.host(), uri.port(), options)?;
    if uri.is_secure() {
        wrap_tls(tcp, uri.host())
    } else {
        Ok(WsStream::Plain(tcp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn plain_stream_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut buf = [0u8; 5];
            sock.read_exact(&mut buf).unwrap();
            sock.write_all(&buf).unwrap();
        });

        let uri = WsUri::parse(&format!("ws://127.0.0.1:{}/", port)).unwrap();
        let mut stream = open_stream(&uri, &ConnectOptions::default()).unwrap();
        assert!(matches!(stream, WsStream::Plain(_)));
        stream.write_all(b"hello").unwrap();
        let mut echo = [0u8; 5];
        stream.read_exact(&mut echo).unwrap();
        assert_eq!(&echo, b"hello");
        stream.shutdown().unwrap();
        server.join().unwrap();
    }

    #[test]
    fn timeouts_applied() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let options = ConnectOptions::default()
            .with_read_timeout(Some(std::time::Duration::from_millis(300)));
        let tcp = connect_tcp("127.0.0.1", port, &options).unwrap();
        assert_eq!(
            tcp.read_timeout().unwrap(),
            Some(std::time::Duration::from_millis(300))
        );
        drop(listener);
    }

    #[test]
    fn root_store_is_never_empty() {
        assert!(!build_root_store().is_empty());
    }

    #[test]
    fn tls_wrap_rejects_bad_name() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let tcp = TcpStream::connect(("127.0.0.1", port)).unwrap();
        assert!(wrap_tls(tcp, "not a host").is_err());
    }
}
