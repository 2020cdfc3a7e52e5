//! Machine parameters (registers) and statistics counters.

use serde::{Deserialize, Serialize};

/// Register addresses at or above this value use the `0xF0` sub-id.
pub const EXTENDED_ADDRESS_BASE: u16 = 1000;

/// Most registers a single read request may ask for.
pub const MAX_PARAMETERS_PER_READ: u8 = 10;

/// Reads of more registers than this use the extended read command.
pub const PLAIN_READ_LIMIT: u8 = 4;

/// One 4-byte machine register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub id: u16,
    pub value: [u8; 4],
}

impl Parameter {
    pub const fn new(id: u16, value: [u8; 4]) -> Self {
        Self { id, value }
    }

    /// The register value as a big-endian integer.
    pub const fn as_u32(&self) -> u32 {
        u32::from_be_bytes(self.value)
    }
}

/// Outcome of a parameter write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterWritten {
    pub id: u16,
    pub success: bool,
}
