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

//! C FFI for wavelink core. Device code opens a connection handle, sends and receives
//! messages, and closes it; or uses the one-shot report helpers that do all three.
//! All string parameters are UTF-8 NUL-terminated. Calls block on the network.
//! Failed calls return a negative code; wavelink_last_error() describes the failure.

use libc::{c_char, c_int, size_t};
use once_cell::sync::Lazy;
use std::ffi::{CStr, CString};
use std::ptr;
use std::sync::RwLock;
use std::time::Duration;

use wavelink_core::net::WsStream;
use wavelink_core::telemetry::{notify, send_report, Report};
use wavelink_core::{connect_with, ConnectOptions, Message, WebSocketConnection, WsError};

/// Success.
pub const WAVELINK_OK: c_int = 0;
/// Failure; see wavelink_last_error.
pub const WAVELINK_ERROR: c_int = -1;
/// Bad argument (NULL pointer or invalid UTF-8).
pub const WAVELINK_INVALID_ARGUMENT: c_int = -2;
/// Stream ended before any frame byte arrived.
pub const WAVELINK_NO_DATA: c_int = -3;
/// Connection is closed.
pub const WAVELINK_CLOSED: c_int = -4;

/// Message kinds in WavelinkMessage.kind.
pub const WAVELINK_MESSAGE_TEXT: c_int = 1;
pub const WAVELINK_MESSAGE_BINARY: c_int = 2;
pub const WAVELINK_MESSAGE_CLOSED: c_int = 8;

/// Opaque connection handle.
pub struct WavelinkConnection {
    inner: WebSocketConnection<WsStream>,
}

/// Received message. data/len are NULL/0 for WAVELINK_MESSAGE_CLOSED. Text is UTF-8 and not
/// NUL-terminated. Free with wavelink_free_message.
#[repr(C)]
pub struct WavelinkMessage {
    pub kind: c_int,
    pub data: *mut u8,
    pub len: size_t,
}

/// Options applied to every connect made through this library.
static OPTIONS: Lazy<RwLock<ConnectOptions>> = Lazy::new(|| RwLock::new(ConnectOptions::default()));

fn current_options() -> ConnectOptions {
    OPTIONS.read().map(|o| o.clone()).unwrap_or_default()
}

thread_local! {
    static LAST_ERROR: std::cell::RefCell<Option<CString>> = std::cell::RefCell::new(None);
}

fn set_last_error(err: &WsError) {
    set_last_error_message(&err.to_string());
}

fn set_last_error_message(msg: &str) {
    let msg = CString::new(msg).unwrap_or_else(|_| CString::from(c"(error)"));
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(msg));
}

fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

fn error_code(err: &WsError) -> c_int {
    match err {
        WsError::NoData => WAVELINK_NO_DATA,
        WsError::ConnectionClosed => WAVELINK_CLOSED,
        _ => WAVELINK_ERROR,
    }
}

/// Record the outcome of a call and turn it into a return code.
fn status(result: Result<(), WsError>) -> c_int {
    match result {
        Ok(()) => {
            clear_last_error();
            WAVELINK_OK
        }
        Err(e) => {
            set_last_error(&e);
            error_code(&e)
        }
    }
}

fn ptr_to_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string()) }
}

fn invalid_argument(name: &str) -> c_int {
    set_last_error_message(&format!("{} is null or not valid UTF-8", name));
    WAVELINK_INVALID_ARGUMENT
}

fn millis(ms: u32) -> Option<Duration> {
    if ms == 0 {
        None
    } else {
        Some(Duration::from_millis(ms as u64))
    }
}

/// Version string (static, do not free).
#[no_mangle]
pub extern "C" fn wavelink_version() -> *const c_char {
    c"0.1.0".as_ptr()
}

/// Last error message from a failed call on this thread. Valid until the next FFI call.
/// Do not free. NULL if the last call succeeded.
#[no_mangle]
pub extern "C" fn wavelink_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(ptr::null())
    })
}

/// Set transport timeouts in milliseconds for subsequent connects. 0 means no timeout.
#[no_mangle]
pub extern "C" fn wavelink_set_timeouts(connect_ms: u32, read_ms: u32, write_ms: u32) {
    if let Ok(mut o) = OPTIONS.write() {
        o.connect_timeout = millis(connect_ms);
        o.read_timeout = millis(read_ms);
        o.write_timeout = millis(write_ms);
    }
}

/// Enable (non-zero) or disable (0) Sec-WebSocket-Accept verification for subsequent connects.
#[no_mangle]
pub extern "C" fn wavelink_set_verify_accept(verify: c_int) {
    if let Ok(mut o) = OPTIONS.write() {
        o.verify_accept = verify != 0;
    }
}

// ---------- Connection ----------

/// Connect to a ws:// or wss:// URI and perform the handshake. Returns a handle (close with
/// wavelink_close or wavelink_free_connection), or NULL on error.
#[no_mangle]
pub unsafe extern "C" fn wavelink_connect(uri: *const c_char) -> *mut WavelinkConnection {
    let uri = match ptr_to_str(uri) {
        Some(s) => s,
        None => {
            invalid_argument("uri");
            return ptr::null_mut();
        }
    };
    match connect_with(&uri, &current_options()) {
        Ok(inner) => {
            clear_last_error();
            Box::into_raw(Box::new(WavelinkConnection { inner }))
        }
        Err(e) => {
            set_last_error(&e);
            ptr::null_mut()
        }
    }
}

/// Send a text frame.
#[no_mangle]
pub unsafe extern "C" fn wavelink_send_text(
    conn: *mut WavelinkConnection,
    text: *const c_char,
) -> c_int {
    let conn = match conn.as_mut() {
        Some(c) => c,
        None => return invalid_argument("conn"),
    };
    let text = match ptr_to_str(text) {
        Some(s) => s,
        None => return invalid_argument("text"),
    };
    status(conn.inner.send(Message::Text(text)))
}

/// Send a binary frame of len bytes. data may be NULL when len is 0.
#[no_mangle]
pub unsafe extern "C" fn wavelink_send_binary(
    conn: *mut WavelinkConnection,
    data: *const u8,
    len: size_t,
) -> c_int {
    let conn = match conn.as_mut() {
        Some(c) => c,
        None => return invalid_argument("conn"),
    };
    let bytes = if len == 0 {
        &[][..]
    } else if data.is_null() {
        return invalid_argument("data");
    } else {
        std::slice::from_raw_parts(data, len)
    };
    status(conn.inner.send_binary(bytes))
}

fn into_raw_bytes(bytes: Vec<u8>) -> (*mut u8, size_t) {
    if bytes.is_empty() {
        return (ptr::null_mut(), 0);
    }
    let len = bytes.len();
    let data = Box::into_raw(bytes.into_boxed_slice()) as *mut u8;
    (data, len)
}

/// Block until the next text or binary message, or the peer's close frame.
/// Pings are answered internally. On success fills `out` (free with wavelink_free_message).
/// Returns WAVELINK_NO_DATA when the stream ended before a frame started.
#[no_mangle]
pub unsafe extern "C" fn wavelink_recv(
    conn: *mut WavelinkConnection,
    out: *mut WavelinkMessage,
) -> c_int {
    let conn = match conn.as_mut() {
        Some(c) => c,
        None => return invalid_argument("conn"),
    };
    let out = match out.as_mut() {
        Some(o) => o,
        None => return invalid_argument("out"),
    };
    match conn.inner.recv() {
        Ok(message) => {
            let (kind, payload) = match message {
                Message::Text(t) => (WAVELINK_MESSAGE_TEXT, t.into_bytes()),
                Message::Binary(b) => (WAVELINK_MESSAGE_BINARY, b),
                Message::Closed => (WAVELINK_MESSAGE_CLOSED, Vec::new()),
            };
            let (data, len) = into_raw_bytes(payload);
            *out = WavelinkMessage { kind, data, len };
            clear_last_error();
            WAVELINK_OK
        }
        Err(e) => {
            set_last_error(&e);
            error_code(&e)
        }
    }
}

/// Free the payload of a message filled by wavelink_recv. The struct itself is caller-owned.
#[no_mangle]
pub unsafe extern "C" fn wavelink_free_message(msg: *mut WavelinkMessage) {
    let msg = match msg.as_mut() {
        Some(m) => m,
        None => return,
    };
    if !msg.data.is_null() && msg.len > 0 {
        let slice = ptr::slice_from_raw_parts_mut(msg.data, msg.len);
        drop(Box::from_raw(slice));
    }
    msg.data = ptr::null_mut();
    msg.len = 0;
}

/// Send a close frame with code and reason (reason may be NULL), release the connection and
/// free the handle. The handle is invalid after this call whatever the result.
#[no_mangle]
pub unsafe extern "C" fn wavelink_close(
    conn: *mut WavelinkConnection,
    code: u16,
    reason: *const c_char,
) -> c_int {
    if conn.is_null() {
        return invalid_argument("conn");
    }
    let mut conn = Box::from_raw(conn);
    let reason = if reason.is_null() {
        String::new()
    } else {
        match ptr_to_str(reason) {
            Some(s) => s,
            None => {
                let _ = conn.inner.release();
                return invalid_argument("reason");
            }
        }
    };
    status(conn.inner.close(code, &reason))
}

/// Free a handle without sending a close frame. No-op if conn is NULL.
#[no_mangle]
pub unsafe extern "C" fn wavelink_free_connection(conn: *mut WavelinkConnection) {
    if !conn.is_null() {
        let mut conn = Box::from_raw(conn);
        let _ = conn.inner.release();
    }
}

// ---------- One-shot reports ----------

fn report_to(uri: *const c_char, report: Report) -> c_int {
    let uri = match ptr_to_str(uri) {
        Some(s) => s,
        None => return invalid_argument("uri"),
    };
    status(send_report(&uri, &report, &current_options()))
}

/// Open a connection, send {"type":"location",...}, close.
#[no_mangle]
pub unsafe extern "C" fn wavelink_send_location(
    uri: *const c_char,
    latitude: f64,
    longitude: f64,
) -> c_int {
    report_to(uri, Report::location(latitude, longitude))
}

/// Open a connection, send {"type":"motion",...} (acceleration in g, roll/pitch in degrees), close.
#[no_mangle]
pub unsafe extern "C" fn wavelink_send_motion(
    uri: *const c_char,
    x: f64,
    y: f64,
    z: f64,
    roll: f64,
    pitch: f64,
) -> c_int {
    report_to(uri, Report::Motion { x, y, z, roll, pitch })
}

/// Open a connection, send {"type":"notification","message":...}, read one JSON reply, close.
/// Returns 1 if the server replied with status "ok", 0 if it replied otherwise, or a negative
/// code on error.
#[no_mangle]
pub unsafe extern "C" fn wavelink_notify(uri: *const c_char, message: *const c_char) -> c_int {
    let uri = match ptr_to_str(uri) {
        Some(s) => s,
        None => return invalid_argument("uri"),
    };
    let message = match ptr_to_str(message) {
        Some(s) => s,
        None => return invalid_argument("message"),
    };
    match notify(&uri, &message, &current_options()) {
        Ok(reply) => {
            clear_last_error();
            if reply.acknowledged() {
                1
            } else {
                0
            }
        }
        Err(e) => {
            set_last_error(&e);
            error_code(&e)
        }
    }
}
