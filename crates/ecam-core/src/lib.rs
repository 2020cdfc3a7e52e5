//! # ecam-core
//!
//! Protocol library for ECAM coffee machines: checksums, frame reassembly,
//! request builders, answer decoding and the domain entities they carry.
//!
//! This crate does no I/O.  It is used by the engine crate, which owns the
//! transport, the request queue and the retry timers.
//!
//! # Architecture overview (for beginners)
//!
//! A phone app talks to the machine by exchanging short binary frames, over
//! Bluetooth LE or through a cloud relay.  This crate is the shared
//! foundation for both links:
//!
//! - **`protocol`** – How bytes travel.  Requests are built into sealed
//!   frames, answers are reassembled from fragments, checksum-validated and
//!   decoded into typed events.  A `ProtocolStrategy` captures everything
//!   that differs between the V1 and V2 machine generations.
//!
//! - **`domain`** – What the bytes mean: monitor snapshots, parameters,
//!   recipes, names and bean systems.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `ecam_core::ProtocolStrategy` instead of `ecam_core::protocol::variant::ProtocolStrategy`.
pub use domain::{MachineCapabilities, MonitorSnapshot};
pub use protocol::{
    build_request, decode, validate_checksum, Command, DecodedEvent, FrameReassembler, HexBytes,
    LinkKind, Priority, ProtocolError, ProtocolStrategy, ProtocolVariant, Request,
};
