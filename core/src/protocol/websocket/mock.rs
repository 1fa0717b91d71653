/*
 * mock.rs
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

//! In-memory stream for unit tests: scripted input, recorded output, shared with the test
//! through a cloned handle.

use bytes::BytesMut;
use std::cell::RefCell;
use std::io::{self, Cursor, Read, Write};
use std::rc::Rc;

use crate::net::Stream;
use crate::protocol::websocket::frame::{decode_frame, encode_frame, Frame, OpCode};

#[derive(Default)]
struct State {
    input: Cursor<Vec<u8>>,
    written: Vec<u8>,
    shutdown: bool,
    fail_writes: bool,
}

#[derive(Clone)]
pub(crate) struct MockStream {
    state: Rc<RefCell<State>>,
}

impl MockStream {
    pub(crate) fn new(input: Vec<u8>) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                input: Cursor::new(input),
                ..State::default()
            })),
        }
    }

    pub(crate) fn written(&self) -> Vec<u8> {
        self.state.borrow().written.clone()
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.state.borrow().shutdown
    }

    pub(crate) fn fail_writes(&self) {
        self.state.borrow_mut().fail_writes = true;
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.state.borrow_mut().input.read(buf)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes || state.shutdown {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"));
        }
        state.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Stream for MockStream {
    fn shutdown(&mut self) -> io::Result<()> {
        self.state.borrow_mut().shutdown = true;
        Ok(())
    }
}

/// Unmasked frame as a server would send it.
pub(crate) fn server_frame(opcode: OpCode, payload: &[u8]) -> Vec<u8> {
    let mut out = BytesMut::new();
    encode_frame(opcode, payload, None, &mut out);
    out.to_vec()
}

/// Decode every frame the client wrote to the mock.
pub(crate) fn written_frames(stream: &MockStream) -> Vec<Frame> {
    written_frames_from(&stream.written())
}

pub(crate) fn written_frames_from(bytes: &[u8]) -> Vec<Frame> {
    let mut cur = Cursor::new(bytes);
    let mut frames = Vec::new();
    while (cur.position() as usize) < bytes.len() {
        frames.push(decode_frame(&mut cur, u64::MAX).expect("well-formed frame"));
    }
    frames
}
