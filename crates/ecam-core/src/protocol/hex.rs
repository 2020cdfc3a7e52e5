//! Hex rendering for log fields.

use std::fmt;

/// Displays a byte slice as space-separated upper-case hex pairs.
///
/// ```rust
/// use ecam_core::protocol::HexBytes;
///
/// assert_eq!(HexBytes(&[0x0D, 0x04, 0x60]).to_string(), "0D 04 60");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_slice_renders_nothing() {
        assert_eq!(HexBytes(&[]).to_string(), "");
    }

    #[test]
    fn test_single_byte_has_no_separator() {
        assert_eq!(HexBytes(&[0xE1]).to_string(), "E1");
    }
}
