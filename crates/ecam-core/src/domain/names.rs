//! Profile and recipe names plus the checksums used to sync them.

use serde::{Deserialize, Serialize};

/// Which name table an answer describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameKind {
    Profile,
    Recipe,
}

/// One record of a names answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileNameEntry {
    /// `None` when the machine reports an all-zero name block.
    pub name: Option<String>,
    pub icon: u8,
    /// Mug type; only striker machines carry it.
    pub mug: Option<u8>,
}

/// Name to write into one slot of a names table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    pub name: String,
    pub icon: u8,
    /// Written only for the striker layout; defaults to zero there.
    pub mug: Option<u8>,
}

impl NameRecord {
    pub fn new(name: impl Into<String>, icon: u8) -> Self {
        Self {
            name: name.into(),
            icon,
            mug: None,
        }
    }

    pub fn with_mug(mut self, mug: u8) -> Self {
        self.mug = Some(mug);
        self
    }
}

/// Checksums the machine reports for its name and recipe tables.
///
/// The application compares them with cached values and only re-reads the
/// tables that changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumTriple {
    pub names: u16,
    pub recipes: u16,
    /// One checksum per recipe quantity block.
    pub quantities: Vec<u16>,
}
