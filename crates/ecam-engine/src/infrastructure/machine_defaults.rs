//! Model-keyed machine capability defaults.
//!
//! The host application normally ships these in its own database.  This
//! module provides the lookup seam plus a table that can be filled from TOML:
//!
//! ```toml
//! [[machine]]
//! model = "ecam-v2-ble"
//! variant = "V2"
//! link = "Ble"
//! striker = false
//! profile_count = 4
//! recipe_count = 20
//! ```

use std::collections::HashMap;

use ecam_core::domain::MachineCapabilities;
use ecam_core::protocol::{LinkKind, ProtocolVariant};
use serde::{Deserialize, Serialize};

/// Looks up what the engine needs to know about a model.
pub trait CapabilityLookup: Send + Sync {
    fn capabilities(&self, model: &str) -> Option<MachineCapabilities>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DefaultsFile {
    #[serde(default)]
    machine: Vec<MachineCapabilities>,
}

/// In-memory capability table keyed by model name.
#[derive(Debug, Clone, Default)]
pub struct MachineDefaults {
    models: HashMap<String, MachineCapabilities>,
}

impl MachineDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// One entry per protocol family, used by the simulator and tests.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (model, variant, link, striker, profiles, recipes) in [
            ("ecam-v1", ProtocolVariant::V1, LinkKind::Ble, false, 3, 12),
            ("ecam-v2-ble", ProtocolVariant::V2, LinkKind::Ble, false, 4, 20),
            ("ecam-v2-wifi", ProtocolVariant::V2, LinkKind::Wifi, false, 4, 20),
            ("ecam-striker", ProtocolVariant::V2, LinkKind::Wifi, true, 6, 30),
        ] {
            table.insert(MachineCapabilities {
                model: model.to_string(),
                variant,
                link,
                striker,
                profile_count: profiles,
                recipe_count: recipes,
            });
        }
        table
    }

    /// Parses a `[[machine]]` table list.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let file: DefaultsFile = toml::from_str(content)?;
        let mut table = Self::new();
        for caps in file.machine {
            table.insert(caps);
        }
        Ok(table)
    }

    /// Adds or replaces the entry for `caps.model`.
    pub fn insert(&mut self, caps: MachineCapabilities) {
        self.models.insert(caps.model.clone(), caps);
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl CapabilityLookup for MachineDefaults {
    fn capabilities(&self, model: &str) -> Option<MachineCapabilities> {
        self.models.get(model).cloned()
    }
}
