/*
 * frame.rs
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

//! WebSocket frame format (RFC 6455 §5): blocking decoder for receive, encoder for send
//! (masking when the caller supplies a key). RSV bits are ignored; no extensions.

use bytes::{BufMut, BytesMut};
use std::io::{self, Read};

use crate::error::{Result, WsError};

/// Longest payload allowed in a control frame (close, ping, pong).
pub const MAX_CONTROL_PAYLOAD: usize = 125;

/// Frame opcode (4 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl OpCode {
    pub fn as_u8(self) -> u8 {
        match self {
            OpCode::Continuation => 0x0,
            OpCode::Text => 0x1,
            OpCode::Binary => 0x2,
            OpCode::Close => 0x8,
            OpCode::Ping => 0x9,
            OpCode::Pong => 0xA,
        }
    }

    pub fn is_control(self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }
}

impl TryFrom<u8> for OpCode {
    type Error = WsError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x0 => Ok(OpCode::Continuation),
            0x1 => Ok(OpCode::Text),
            0x2 => Ok(OpCode::Binary),
            0x8 => Ok(OpCode::Close),
            0x9 => Ok(OpCode::Ping),
            0xA => Ok(OpCode::Pong),
            other => Err(WsError::Protocol(format!("reserved opcode 0x{:x}", other))),
        }
    }
}

/// One decoded frame. Payload is already unmasked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: OpCode,
    pub masked: bool,
    pub payload: Vec<u8>,
}

/// XOR `data` in place with the 4-byte key. Applying it twice restores the input.
pub fn apply_mask(data: &mut [u8], key: [u8; 4]) {
    for (i, b) in data.iter_mut().enumerate() {
        *b ^= key[i % 4];
    }
}

/// Encode one frame with FIN set. With `mask_key` the mask bit and key are written and the
/// payload is masked (client role); without, the payload goes out as is (server role).
pub fn encode_frame(opcode: OpCode, payload: &[u8], mask_key: Option<[u8; 4]>, out: &mut BytesMut) {
    let len = payload.len();
    let mask_bit: u8 = if mask_key.is_some() { 0x80 } else { 0 };
    out.reserve(14 + len);
    out.put_u8(0x80 | opcode.as_u8());
    if len < 126 {
        out.put_u8(mask_bit | len as u8);
    } else if len < 65536 {
        out.put_u8(mask_bit | 126);
        out.put_u16(len as u16);
    } else {
        out.put_u8(mask_bit | 127);
        out.put_u64(len as u64);
    }
    match mask_key {
        Some(key) => {
            out.put_slice(&key);
            for (i, &b) in payload.iter().enumerate() {
                out.put_u8(b ^ key[i % 4]);
            }
        }
        None => out.put_slice(payload),
    }
}

/// Read the first header byte. Ok(None) means the stream ended before any byte, whether the
/// reader signals that with a zero-byte read or with `UnexpectedEof` (rustls does the latter
/// when the peer drops TCP without close_notify).
fn read_first_byte<R: Read>(reader: &mut R) -> io::Result<Option<u8>> {
    let mut b = [0u8; 1];
    loop {
        match reader.read(&mut b) {
            Ok(0) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Ok(_) => return Ok(Some(b[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

fn read_array<R: Read, const N: usize>(reader: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(WsError::mid_frame)?;
    Ok(buf)
}

/// Read and decode one frame.
///
/// End of stream before the first header byte is `NoData`; anywhere later it is
/// `ConnectionClosed`. A declared length above `max_payload` fails before the payload is read.
/// Reserved opcodes fail after the payload has been consumed, so the stream stays aligned on
/// a frame boundary.
pub fn decode_frame<R: Read>(reader: &mut R, max_payload: u64) -> Result<Frame> {
    let b0 = match read_first_byte(reader)? {
        Some(b) => b,
        None => return Err(WsError::NoData),
    };
    let [b1] = read_array::<R, 1>(reader)?;

    let fin = (b0 & 0x80) != 0;
    let raw_opcode = b0 & 0x0f;
    let masked = (b1 & 0x80) != 0;
    let len = match b1 & 0x7f {
        126 => u16::from_be_bytes(read_array::<R, 2>(reader)?) as u64,
        127 => u64::from_be_bytes(read_array::<R, 8>(reader)?),
        n => n as u64,
    };
    if len > max_payload {
        return Err(WsError::PayloadTooLarge(len));
    }

    let mask_key = if masked {
        Some(read_array::<R, 4>(reader)?)
    } else {
        None
    };

    let size = usize::try_from(len).map_err(|_| WsError::PayloadTooLarge(len))?;
    let mut payload = vec![0u8; size];
    reader.read_exact(&mut payload).map_err(WsError::mid_frame)?;
    if let Some(key) = mask_key {
        apply_mask(&mut payload, key);
    }

    let opcode = OpCode::try_from(raw_opcode)?;
    Ok(Frame {
        fin,
        opcode,
        masked,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const KEY: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];

    fn encode(opcode: OpCode, payload: &[u8], mask: Option<[u8; 4]>) -> Vec<u8> {
        let mut out = BytesMut::new();
        encode_frame(opcode, payload, mask, &mut out);
        out.to_vec()
    }

    #[test]
    fn boundary_lengths_survive_encode_decode() {
        for &len in &[0usize, 1, 125, 126, 65535, 65536] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            for mask in [None, Some(KEY)] {
                let wire = encode(OpCode::Binary, &payload, mask);
                let frame = decode_frame(&mut Cursor::new(wire), u64::MAX).unwrap();
                assert_eq!(frame.payload, payload, "len {} mask {:?}", len, mask);
                assert_eq!(frame.opcode, OpCode::Binary);
                assert!(frame.fin);
                assert_eq!(frame.masked, mask.is_some());
            }
        }
    }

    #[test]
    fn length_field_widths() {
        let w = encode(OpCode::Text, &[0u8; 125], None);
        assert_eq!(w[1], 125);
        assert_eq!(w.len(), 2 + 125);

        let w = encode(OpCode::Text, &[0u8; 126], None);
        assert_eq!(w[1], 126);
        assert_eq!(&w[2..4], &[0x00, 0x7e]);
        assert_eq!(w.len(), 4 + 126);

        let w = encode(OpCode::Text, &[0u8; 65535], None);
        assert_eq!(w[1], 126);
        assert_eq!(&w[2..4], &[0xff, 0xff]);

        let w = encode(OpCode::Text, &[0u8; 65536], None);
        assert_eq!(w[1], 127);
        assert_eq!(&w[2..10], &[0, 0, 0, 0, 0, 1, 0, 0]);
        assert_eq!(w.len(), 10 + 65536);
    }

    #[test]
    fn masked_header_carries_key() {
        let w = encode(OpCode::Text, b"Hello", Some(KEY));
        assert_eq!(w[0], 0x81);
        assert_eq!(w[1], 0x80 | 5);
        assert_eq!(&w[2..6], &KEY);
        let mut body = w[6..].to_vec();
        assert_ne!(&body[..], b"Hello");
        apply_mask(&mut body, KEY);
        assert_eq!(&body[..], b"Hello");
    }

    #[test]
    fn unmasked_header_has_no_mask_bit() {
        let w = encode(OpCode::Pong, b"abc", None);
        assert_eq!(w, vec![0x8a, 0x03, b'a', b'b', b'c']);
    }

    #[test]
    fn mask_is_an_involution() {
        let keys = [[0u8; 4], [0xff; 4], KEY, [1, 2, 3, 4]];
        let data: Vec<u8> = (0..=255u8).chain(0..7).collect();
        for key in keys {
            for n in [0, 1, 3, 4, 5, data.len()] {
                let mut buf = data[..n].to_vec();
                apply_mask(&mut buf, key);
                apply_mask(&mut buf, key);
                assert_eq!(&buf[..], &data[..n]);
            }
        }
    }

    #[test]
    fn rfc_masked_hello_sample() {
        // RFC 6455 §5.7: single-frame masked text "Hello"
        let wire = [0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58];
        let frame = decode_frame(&mut Cursor::new(&wire[..]), 1024).unwrap();
        assert_eq!(frame.opcode, OpCode::Text);
        assert!(frame.masked);
        assert_eq!(frame.payload, b"Hello");
        assert_eq!(encode(OpCode::Text, b"Hello", Some(KEY)), wire.to_vec());
    }

    #[test]
    fn fin_and_rsv_bits() {
        // FIN clear, RSV1 set, continuation opcode
        let wire = [0x40, 0x01, b'x'];
        let frame = decode_frame(&mut Cursor::new(&wire[..]), 1024).unwrap();
        assert!(!frame.fin);
        assert_eq!(frame.opcode, OpCode::Continuation);
        assert_eq!(frame.payload, b"x");
    }

    #[test]
    fn empty_stream_is_no_data() {
        let err = decode_frame(&mut Cursor::new(Vec::<u8>::new()), 1024).unwrap_err();
        assert!(matches!(err, WsError::NoData));
    }

    struct EofError;

    impl Read for EofError {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed connection without sending TLS close_notify",
            ))
        }
    }

    #[test]
    fn eof_error_before_header_is_no_data() {
        let err = decode_frame(&mut EofError, 1024).unwrap_err();
        assert!(matches!(err, WsError::NoData));
    }

    #[test]
    fn eof_error_mid_header_is_connection_closed() {
        let mut reader = Cursor::new(vec![0x81u8]).chain(EofError);
        let err = decode_frame(&mut reader, 1024).unwrap_err();
        assert!(matches!(err, WsError::ConnectionClosed));
    }

    #[test]
    fn truncated_frames_are_connection_closed() {
        let cases: [&[u8]; 4] = [
            &[0x81],
            &[0x81, 0x7e, 0x00],
            &[0x81, 0x85, 0x37, 0xfa],
            &[0x82, 0x05, 1, 2, 3],
        ];
        for wire in cases {
            let err = decode_frame(&mut Cursor::new(wire), 1024).unwrap_err();
            assert!(matches!(err, WsError::ConnectionClosed), "{:?}", wire);
        }
    }

    #[test]
    fn oversize_length_rejected_before_read() {
        let wire = [0x82, 0x7f, 0, 0, 0, 1, 0, 0, 0, 0];
        let err = decode_frame(&mut Cursor::new(&wire[..]), 65536).unwrap_err();
        assert!(matches!(err, WsError::PayloadTooLarge(4294967296)));
    }

    #[test]
    fn reserved_opcode_consumes_payload() {
        let mut wire = vec![0x83, 0x02, 9, 9];
        wire.extend_from_slice(&[0x81, 0x01, b'k']);
        let mut cur = Cursor::new(wire);
        assert!(matches!(
            decode_frame(&mut cur, 1024),
            Err(WsError::Protocol(_))
        ));
        let next = decode_frame(&mut cur, 1024).unwrap();
        assert_eq!(next.payload, b"k");
    }

    #[test]
    fn opcode_values() {
        for op in [
            OpCode::Continuation,
            OpCode::Text,
            OpCode::Binary,
            OpCode::Close,
            OpCode::Ping,
            OpCode::Pong,
        ] {
            assert_eq!(OpCode::try_from(op.as_u8()).unwrap(), op);
        }
        assert!(OpCode::Ping.is_control());
        assert!(!OpCode::Text.is_control());
    }
}
