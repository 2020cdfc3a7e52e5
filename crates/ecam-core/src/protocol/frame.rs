//! Reassembly of answer frames from transport fragments.
//!
//! BLE notifications carry at most a few dozen bytes, so a long answer (a
//! full list of recipe names, say) arrives as several fragments.  The
//! reassembler glues them together until the length byte says the frame is
//! complete:
//!
//! ```text
//! fragment 1: [D0][0A][95][0F][00][64]        -> 6 bytes, declared 11, wait
//! fragment 2: [00][00][00][01][xx]            -> 11 bytes, complete
//! ```

use tracing::{debug, trace};

use crate::protocol::codec::frame_declared_length;

/// Accumulates fragments into complete frames.
///
/// The reassembler never inspects anything but the length byte; checksum and
/// correlation checks happen after a frame is returned.
#[derive(Debug, Default)]
pub struct FrameReassembler {
    buf: Vec<u8>,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one fragment and returns the completed frame, if any.
    ///
    /// After a frame is returned the reassembler is empty again, so the next
    /// fragment starts a new frame.  Fragments that push the buffer past its
    /// declared length can never complete; the buffer is dropped.
    pub fn feed(&mut self, fragment: &[u8]) -> Option<Vec<u8>> {
        self.buf.extend_from_slice(fragment);
        trace!(buffered = self.buf.len(), "fragment received");

        if is_complete(&self.buf) {
            return Some(std::mem::take(&mut self.buf));
        }
        let declared = frame_declared_length(&self.buf)?;
        if self.buf.len() > declared {
            debug!(
                declared,
                buffered = self.buf.len(),
                "discarding overlong response buffer"
            );
            self.buf.clear();
        }
        None
    }

    /// Drops any partially received frame.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Number of bytes waiting for the rest of their frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Returns `true` when `buf` holds exactly one complete frame.
pub fn is_complete(buf: &[u8]) -> bool {
    frame_declared_length(buf) == Some(buf.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_fragment_frame_completes_immediately() {
        let mut reassembler = FrameReassembler::new();

        let frame = reassembler.feed(&[0xD0, 0x04, 0xE2, 0x00, 0x12]);

        assert_eq!(frame, Some(vec![0xD0, 0x04, 0xE2, 0x00, 0x12]));
        assert!(reassembler.is_empty());
    }

    #[test]
    fn test_declared_ten_stays_incomplete_at_eight_bytes() {
        // Arrange
        let mut reassembler = FrameReassembler::new();
        let full: Vec<u8> = vec![0xD0, 0x0A, 0x95, 0x0F, 0x00, 0x64, 0x00, 0x00, 0x00, 0x01, 0x5C];

        // Act
        let partial = reassembler.feed(&full[..8]);
        let rest = reassembler.feed(&full[8..]);

        // Assert
        assert_eq!(partial, None);
        assert_eq!(reassembler.buffered(), 0);
        assert_eq!(rest, Some(full));
    }

    #[test]
    fn test_byte_by_byte_feeding_yields_exactly_one_frame() {
        let full: Vec<u8> = (0..20u8)
            .map(|i| match i {
                0 => 0xD0,
                1 => 19,
                _ => i,
            })
            .collect();
        let mut reassembler = FrameReassembler::new();

        let frames: Vec<Vec<u8>> = full
            .iter()
            .filter_map(|b| reassembler.feed(std::slice::from_ref(b)))
            .collect();

        assert_eq!(frames, vec![full]);
    }

    #[test]
    fn test_empty_and_one_byte_fragments_stay_incomplete() {
        let mut reassembler = FrameReassembler::new();

        assert_eq!(reassembler.feed(&[]), None);
        assert_eq!(reassembler.feed(&[0xD0]), None);
        assert_eq!(reassembler.buffered(), 1);
    }

    #[test]
    fn test_overlong_buffer_is_discarded() {
        let mut reassembler = FrameReassembler::new();

        // Declares 3 bytes but delivers 5.
        assert_eq!(reassembler.feed(&[0xD0, 0x02, 0x00, 0x00, 0x00]), None);
        assert!(reassembler.is_empty());

        // The next frame is unaffected.
        assert_eq!(
            reassembler.feed(&[0xD0, 0x02, 0xE1]),
            Some(vec![0xD0, 0x02, 0xE1])
        );
    }

    #[test]
    fn test_reset_drops_partial_frame() {
        let mut reassembler = FrameReassembler::new();
        reassembler.feed(&[0xD0, 0x09, 0x95]);

        reassembler.reset();

        assert!(reassembler.is_empty());
        assert_eq!(
            reassembler.feed(&[0xD0, 0x03, 0xE2, 0x00]),
            Some(vec![0xD0, 0x03, 0xE2, 0x00])
        );
    }

    #[test]
    fn test_is_complete() {
        assert!(!is_complete(&[]));
        assert!(!is_complete(&[0xD0]));
        assert!(is_complete(&[0xD0, 0x01]));
        assert!(!is_complete(&[0xD0, 0x0A, 0x00]));
    }
}
