//! Frame checksums for both protocol generations.
//!
//! Every ECAM frame ends with a checksum computed over all preceding bytes:
//!
//! ```text
//! V1: [0x0D][len][id][sub][payload...][xor:1]
//! V2: [0x0D][len][id][sub][payload...][crc_hi:1][crc_lo:1]
//! ```
//!
//! # Two algorithms (for beginners)
//!
//! First-generation machines use a one-byte XOR: start from `0x55` and XOR
//! every byte of the frame into it.  XOR is cheap but weak; swapping two bytes
//! produces the same checksum.
//!
//! Second-generation machines use a 16-bit CRC (the CCITT polynomial `0x1021`
//! seeded with `0x1D0F`, computed with the byte-at-a-time shift formulation
//! instead of a lookup table).  A CRC detects reordering and all burst errors
//! shorter than 16 bits.

use serde::{Deserialize, Serialize};

/// Seed for the V1 XOR checksum.
pub const XOR_SEED: u8 = 0x55;

/// Seed for the V2 CRC-16 checksum.
pub const CRC_SEED: u16 = 0x1D0F;

/// Which checksum algorithm terminates a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChecksumKind {
    /// One trailing byte, XOR seeded with [`XOR_SEED`].
    Xor8,
    /// Two trailing bytes (big-endian), CRC seeded with [`CRC_SEED`].
    Crc16,
}

impl ChecksumKind {
    /// Number of trailing bytes the checksum occupies.
    pub const fn width(self) -> usize {
        match self {
            ChecksumKind::Xor8 => 1,
            ChecksumKind::Crc16 => 2,
        }
    }

    /// Computes the checksum of `body` (the frame without its checksum bytes).
    pub fn compute(self, body: &[u8]) -> u16 {
        match self {
            ChecksumKind::Xor8 => u16::from(xor8(body)),
            ChecksumKind::Crc16 => crc16(body),
        }
    }

    /// Overwrites the trailing checksum bytes of `frame` with the checksum of
    /// the bytes in front of them.
    ///
    /// Frames shorter than the checksum width are left untouched.
    pub fn seal(self, frame: &mut [u8]) {
        let width = self.width();
        if frame.len() < width {
            return;
        }
        let split = frame.len() - width;
        let value = self.compute(&frame[..split]);
        match self {
            ChecksumKind::Xor8 => frame[split] = value as u8,
            ChecksumKind::Crc16 => frame[split..].copy_from_slice(&value.to_be_bytes()),
        }
    }

    /// Returns `true` when the trailing checksum bytes match the recomputed
    /// value.  A frame too short to carry a checksum never validates.
    pub fn validate(self, frame: &[u8]) -> bool {
        let width = self.width();
        if frame.len() <= width {
            return false;
        }
        let split = frame.len() - width;
        let expected = self.compute(&frame[..split]);
        let actual = match self {
            ChecksumKind::Xor8 => u16::from(frame[split]),
            ChecksumKind::Crc16 => u16::from_be_bytes([frame[split], frame[split + 1]]),
        };
        expected == actual
    }
}

/// XOR checksum used by V1 frames.
pub fn xor8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(XOR_SEED, |acc, b| acc ^ b)
}

/// CRC-16 checksum used by V2 frames.
pub fn crc16(bytes: &[u8]) -> u16 {
    bytes.iter().fold(CRC_SEED, |crc, &b| {
        let mut v = crc.rotate_left(8) ^ u16::from(b);
        v ^= (v & 0x00FF) >> 4;
        v ^= v << 12;
        v ^ ((v & 0x00FF) << 5)
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
