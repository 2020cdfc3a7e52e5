//! Domain entities decoded from (or encoded into) ECAM frames.
//!
//! This module contains plain data types with no I/O.  Every entity here is
//! produced only from a frame whose checksum has been validated, and handed
//! to the application for caching or display.
//!
//! # What lives here? (for beginners)
//!
//! The codec in [`crate::protocol`] knows *where* a value sits in a frame; the
//! types in this module know *what* the value means.  A [`MonitorSnapshot`],
//! for example, keeps the raw answer bytes and offers accessors such as
//! `heater_temperature()` that pick the right offset for the monitor block it
//! came from.  Keeping the two apart lets the same entity be built from a
//! BLE notification or from a cloud relay property without duplicating the
//! interpretation.

pub mod bean;
pub mod machine;
pub mod monitor;
pub mod names;
pub mod parameter;
pub mod recipe;

pub use bean::{BeanSystem, BeanSystemUpdate};
pub use machine::MachineCapabilities;
pub use monitor::{Accessory, MachineState, MonitorBlock, MonitorSnapshot};
pub use names::{ChecksumTriple, NameKind, NameRecord, ProfileNameEntry};
pub use parameter::{Parameter, ParameterWritten};
pub use recipe::{
    DispenseV1, DispenseV2, Ingredient, IngredientValue, OperationTrigger, PriorityList,
    RecipeData, RecipeQuantity, TasteType,
};
