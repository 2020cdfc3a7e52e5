//! ECAM wire protocol: checksums, framing, request builders and the answer
//! decoder.
//!
//! Every frame, in both directions, has the same shape:
//!
//! ```text
//! [header][len][id][sub][payload...][checksum]
//! ```
//!
//! Requests start with `0x0D`, answers with `0xD0`.  First-generation (V1)
//! machines close the frame with a one-byte XOR checksum, second-generation
//! (V2) machines with a two-byte CRC-16.  Everything that differs between the
//! two generations is answered by a [`ProtocolStrategy`].

pub mod checksum;
pub mod chunk;
pub mod codec;
pub mod decode;
pub mod frame;
pub mod hex;
pub mod messages;
pub mod request;
pub mod text;
pub mod variant;

pub use checksum::ChecksumKind;
pub use chunk::{split_into_chunks, ChunkCursor, DEFAULT_BLE_PACKET_SIZE};
pub use codec::{frame_declared_length, validate_checksum, FrameWriter, ProtocolError};
pub use decode::{decode, DecodedEvent};
pub use frame::FrameReassembler;
pub use hex::HexBytes;
pub use messages::*;
pub use request::{build_queued_request, build_request, Command, Priority, Request};
pub use variant::{LinkKind, ProtocolStrategy, ProtocolVariant};
