//! Infrastructure layer for the protocol engine.
//!
//! Contains the adapters around the application layer: byte channels,
//! the connection lifecycle, configuration storage and the machine
//! capability table, plus an in-memory simulated machine.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `ecam_core`, but MUST NOT be imported by the `application` layer.

pub mod connection;
pub mod machine_defaults;
pub mod simulator;
pub mod storage;
pub mod transport;
