//! Frame codec primitives shared by the request builders and the decoder.
//!
//! Wire format:
//! ```text
//! [header:1][len:1][id:1][sub:1][payload:N][checksum:1|2]
//! ```
//! `len` is the total frame length minus one.  Multi-byte integers are
//! big-endian.  The checksum covers every byte in front of it.

use thiserror::Error;

use crate::protocol::messages::{FRAME_HEADER, LENGTH_INDEX};
use crate::protocol::variant::ProtocolStrategy;

/// Errors raised while building or decoding a frame.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the minimum required length.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The command does not exist on the session's protocol generation.
    #[error("{command} is not supported by {variant:?} machines")]
    UnsupportedCommand {
        command: &'static str,
        variant: crate::protocol::variant::ProtocolVariant,
    },

    /// A builder argument is out of range (short PIN, too many names, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The payload could not be parsed.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The declared length byte disagrees with the bytes available.
    #[error("payload length mismatch: header says {declared}, available is {available}")]
    PayloadLengthMismatch { declared: usize, available: usize },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Returns the total frame length announced by the length byte, or `None`
/// when the slice is too short to carry one.
///
/// # Examples
///
/// ```rust
/// use ecam_core::protocol::frame_declared_length;
///
/// assert_eq!(frame_declared_length(&[0xD0, 0x0A]), Some(11));
/// assert_eq!(frame_declared_length(&[0xD0]), None);
/// ```
pub fn frame_declared_length(frame: &[u8]) -> Option<usize> {
    frame.get(LENGTH_INDEX).map(|&len| usize::from(len) + 1)
}

/// Returns `true` when the checksum trailer of `frame` is valid for the
/// strategy's checksum algorithm.
pub fn validate_checksum(strategy: &ProtocolStrategy, frame: &[u8]) -> bool {
    strategy.validate_checksum(frame)
}

/// Incrementally assembles one outbound frame.
///
/// The header, length byte and checksum are filled in by [`FrameWriter::finish`],
/// so builders only push the identifier and payload.
#[derive(Debug)]
pub struct FrameWriter {
    strategy: ProtocolStrategy,
    buf: Vec<u8>,
}

impl FrameWriter {
    /// Starts a frame for command `id` with sub-identifier `sub`.
    pub fn new(strategy: ProtocolStrategy, id: u8, sub: u8) -> Self {
        let mut buf = Vec::with_capacity(16);
        buf.push(FRAME_HEADER);
        buf.push(0x00); // length, patched in finish()
        buf.push(id);
        buf.push(sub);
        Self { strategy, buf }
    }

    pub fn push(&mut self, byte: u8) -> &mut Self {
        self.buf.push(byte);
        self
    }

    pub fn push_u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn push_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn extend(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Appends the checksum trailer, patches the length byte and returns the
    /// sealed frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidInput`] if the frame would not fit the
    /// one-byte length field.
    pub fn finish(mut self) -> Result<Vec<u8>, ProtocolError> {
        let width = self.strategy.checksum().width();
        let total = self.buf.len() + width;
        if total > usize::from(u8::MAX) + 1 {
            return Err(ProtocolError::InvalidInput(format!(
                "frame of {total} bytes exceeds the 256-byte limit"
            )));
        }
        self.buf.resize(total, 0x00);
        self.buf[LENGTH_INDEX] = (total - 1) as u8;
        self.strategy.seal(&mut self.buf);
        Ok(self.buf)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

pub(crate) fn require_len(buf: &[u8], needed: usize, context: &str) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        Err(ProtocolError::MalformedPayload(format!(
            "{context}: need {needed} bytes, got {}",
            buf.len()
        )))
    } else {
        Ok(())
    }
}

pub(crate) fn read_u8(buf: &[u8], offset: usize) -> Result<u8, ProtocolError> {
    buf.get(offset)
        .copied()
        .ok_or(ProtocolError::InsufficientData {
            needed: offset + 1,
            available: buf.len(),
        })
}

pub(crate) fn read_u16(buf: &[u8], offset: usize) -> Result<u16, ProtocolError> {
    if buf.len() < offset + 2 {
        return Err(ProtocolError::InsufficientData {
            needed: offset + 2,
            available: buf.len(),
        });
    }
    Ok(u16::from_be_bytes([buf[offset], buf[offset + 1]]))
}

pub(crate) fn read_array<const N: usize>(
    buf: &[u8],
    offset: usize,
) -> Result<[u8; N], ProtocolError> {
    let end = offset + N;
    let slice = buf.get(offset..end).ok_or(ProtocolError::InsufficientData {
        needed: end,
        available: buf.len(),
    })?;
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    Ok(out)
}

/// Ensures the declared length byte matches the bytes actually present.
pub(crate) fn require_declared_length(frame: &[u8]) -> Result<(), ProtocolError> {
    match frame_declared_length(frame) {
        Some(declared) if declared == frame.len() => Ok(()),
        Some(declared) => Err(ProtocolError::PayloadLengthMismatch {
            declared,
            available: frame.len(),
        }),
        None => Err(ProtocolError::InsufficientData {
            needed: 2,
            available: frame.len(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
