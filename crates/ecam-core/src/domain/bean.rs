//! Bean systems (V2): named grinder presets stored on the machine.

use serde::{Deserialize, Serialize};

/// One bean-system slot as reported by the machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeanSystem {
    pub id: u8,
    pub name: Option<String>,
    pub enabled: bool,
    /// Whether this slot is the one currently in use.
    pub selected: bool,
    pub temperature: u8,
    /// Grinder byte as sent by the machine; see [`BeanSystem::grinder_setting`].
    pub grinder: u8,
    pub aroma: u8,
}

impl BeanSystem {
    /// Grinder setting as shown to the user.  Striker machines store half
    /// steps and report 13 for the top setting 7.
    pub fn grinder_setting(&self, striker: bool) -> f32 {
        if striker {
            let raw = if self.grinder == 13 { 14 } else { self.grinder };
            f32::from(raw) / 2.0
        } else {
            f32::from(self.grinder)
        }
    }
}

/// Values written by a bean-system save request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeanSystemUpdate {
    pub id: u8,
    pub name: String,
    pub temperature: u8,
    /// Grinder setting as shown to the user; striker machines store it doubled.
    pub grinder: u8,
    pub aroma: u8,
    /// Disabled slots are hidden from the beverage menu.
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(grinder: u8) -> BeanSystem {
        BeanSystem {
            id: 1,
            name: None,
            enabled: true,
            selected: false,
            temperature: 2,
            grinder,
            aroma: 3,
        }
    }

    #[test]
    fn test_grinder_setting_plain_machine() {
        assert_eq!(slot(5).grinder_setting(false), 5.0);
    }

    #[test]
    fn test_grinder_setting_striker_halves_and_fixes_top_step() {
        assert_eq!(slot(9).grinder_setting(true), 4.5);
        assert_eq!(slot(13).grinder_setting(true), 7.0);
    }
}
