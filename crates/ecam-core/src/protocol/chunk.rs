//! Splitting of oversized requests into link-sized chunks.

/// Packet size used when the link does not report one.
pub const DEFAULT_BLE_PACKET_SIZE: usize = 20;

/// Splits `payload` into ordered chunks of at most `max_packet_size` bytes.
///
/// A zero packet size falls back to [`DEFAULT_BLE_PACKET_SIZE`].  An empty
/// payload yields no chunks.
pub fn split_into_chunks(payload: &[u8], max_packet_size: usize) -> Vec<Vec<u8>> {
    let size = if max_packet_size == 0 {
        DEFAULT_BLE_PACKET_SIZE
    } else {
        max_packet_size
    };
    payload.chunks(size).map(<[u8]>::to_vec).collect()
}

/// Write cursor over the chunks of one request.
///
/// The cursor only advances when the link acknowledges the previous chunk,
/// so at most one chunk is ever outstanding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkCursor {
    chunks: Vec<Vec<u8>>,
    next: usize,
}

impl ChunkCursor {
    pub fn new(payload: &[u8], max_packet_size: usize) -> Self {
        Self {
            chunks: split_into_chunks(payload, max_packet_size),
            next: 0,
        }
    }

    /// Returns the next chunk to write and advances the cursor.
    pub fn next_chunk(&mut self) -> Option<&[u8]> {
        let chunk = self.chunks.get(self.next)?;
        self.next += 1;
        Some(chunk)
    }

    /// `true` once every chunk has been handed out.
    pub fn is_finished(&self) -> bool {
        self.next >= self.chunks.len()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of chunks already handed out.
    pub fn sent(&self) -> usize {
        self.next
    }
}
