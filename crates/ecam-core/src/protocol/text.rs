//! Fixed-width UTF-16BE name fields.
//!
//! Profile, recipe and bean-system names travel as UTF-16 big-endian text in
//! a fixed window (20 bytes for profiles and recipes, 40 for bean systems).
//! Shorter names are zero padded; an all-zero window means "no name".

/// Window of a profile or recipe name.
pub const NAME_WIDTH: usize = 20;

/// Window of a bean-system name.
pub const BEAN_NAME_WIDTH: usize = 40;

/// Encodes `name` into exactly `width` bytes, truncating at a code unit
/// boundary and zero padding the rest.
pub fn encode_name(name: &str, width: usize) -> Vec<u8> {
    let mut out: Vec<u8> = name
        .encode_utf16()
        .flat_map(u16::to_be_bytes)
        .take(width - width % 2)
        .collect();
    out.resize(width, 0x00);
    out
}

/// Decodes a fixed-width name window.
///
/// Returns `None` for an all-zero window.  Trailing zero code units are
/// trimmed; invalid surrogates are replaced rather than rejected.
pub fn decode_name(window: &[u8]) -> Option<String> {
    if window.iter().all(|&b| b == 0) {
        return None;
    }
    let mut units: Vec<u16> = window
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    while units.last() == Some(&0) {
        units.pop();
    }
    Some(String::from_utf16_lossy(&units))
}
