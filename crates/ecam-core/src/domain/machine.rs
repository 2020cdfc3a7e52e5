//! Capability defaults of a machine model.

use serde::{Deserialize, Serialize};

use crate::protocol::variant::{LinkKind, ProtocolStrategy, ProtocolVariant};

/// What the engine needs to know about a model before talking to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineCapabilities {
    pub model: String,
    pub variant: ProtocolVariant,
    pub link: LinkKind,
    pub striker: bool,
    pub profile_count: u8,
    pub recipe_count: u8,
}

impl MachineCapabilities {
    /// Strategy the session uses for this model.
    pub fn strategy(&self) -> ProtocolStrategy {
        ProtocolStrategy::new(self.variant, self.link).with_striker(self.striker)
    }
}
