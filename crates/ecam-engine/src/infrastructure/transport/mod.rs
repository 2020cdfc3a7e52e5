//! Byte channel adapters.
//!
//! - **`wifi`** – posts requests to the cloud relay as base64 device
//!   properties and decodes the answers the relay pushes back.
//! - **`mock`** – records writes in memory for tests and the simulator.
//!
//! BLE is driven by the host platform, which owns the GATT connection and
//! feeds notifications straight into [`EngineHandle`].
//!
//! [`EngineHandle`]: crate::application::engine::EngineHandle

pub mod mock;
pub mod wifi;

pub use mock::RecordingChannel;
pub use wifi::{decode_property, CloudRelay, RelayError, WifiChannel};
