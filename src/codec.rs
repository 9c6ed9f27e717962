// MIT License - Copyright (c) 2026 Peter Wright
// Frame encoding, checksum validation and line framing

use crate::constants::CRLF;
use crate::error::DecodeError;
use tracing::trace;

/// A checksum-valid frame received from the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Three digit command code, e.g. "609".
    pub code: String,
    /// Payload between the code and the checksum. May be empty.
    pub data: String,
    /// Transmitted checksum (already verified).
    pub checksum: u8,
}

impl Packet {
    /// Re-render the packet as it appeared on the wire, without the terminator.
    pub fn to_frame(&self) -> String {
        format!("{}{}{:02X}", self.code, self.data, self.checksum)
    }
}

/// Sum of the byte values of `payload`, modulo 256.
pub fn checksum(payload: &str) -> u8 {
    payload.bytes().fold(0u8, |acc, b| acc.wrapping_add(b))
}

/// Frame an outbound payload: `payload ‖ HH ‖ CR LF`.
pub fn encode(payload: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.extend_from_slice(payload.as_bytes());
    frame.extend_from_slice(format!("{:02X}", checksum(payload)).as_bytes());
    frame.extend_from_slice(CRLF);
    frame
}

/// Parse and validate one inbound line.
///
/// Surrounding whitespace (including a trailing CR LF) is ignored. The line
/// must be ASCII, at least five characters long, start with a three digit
/// code and end with two hex digits that match the checksum of everything
/// before them.
pub fn decode(line: &str) -> Result<Packet, DecodeError> {
    let line = line.trim();
    let malformed = || DecodeError::MalformedFrame {
        line: line.to_string(),
    };

    if !line.is_ascii() || line.len() < 5 {
        return Err(malformed());
    }

    let (body, chk) = line.split_at(line.len() - 2);
    let code = &body[..3];
    if !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    if !chk.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed());
    }
    let received = u8::from_str_radix(chk, 16).map_err(|_| malformed())?;
    let expected = checksum(body);
    if expected != received {
        return Err(DecodeError::ChecksumMismatch { expected, received });
    }

    Ok(Packet {
        code: code.to_string(),
        data: body[3..].to_string(),
        checksum: received,
    })
}

/// Incremental byte-to-line splitter.
///
/// Bytes accumulate until `\n`; the completed line is returned without its
/// `\r\n` terminator. A partial line survives across calls, so a read that
/// times out halfway through a frame loses nothing.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
    ready: std::collections::VecDeque<String>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from the link.
    pub fn push(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if b == b'\n' {
                if self.buffer.last() == Some(&b'\r') {
                    self.buffer.pop();
                }
                let line = String::from_utf8_lossy(&self.buffer).into_owned();
                trace!("RX line {:?}", line);
                self.ready.push_back(line);
                self.buffer.clear();
            } else {
                self.buffer.push(b);
            }
        }
    }

    /// Take the oldest completed line, if any.
    pub fn next_line(&mut self) -> Option<String> {
        self.ready.pop_front()
    }

    /// Drop any buffered partial or complete lines.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.ready.clear();
    }
}
