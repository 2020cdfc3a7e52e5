//! Application layer: request scheduling and answer handling.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (here, the `ecam-core` codec and entities) and the infrastructure
//! (radios, cloud relay, files).  Code in this layer:
//!
//! - **Orchestrates** the codec to fulfil a goal such as "read these
//!   parameters and report them".
//! - **Depends on abstractions** (the [`engine::ByteChannel`] and
//!   [`listener::EcamListener`] traits) rather than concrete transports.
//! - **Performs no OS calls** beyond Tokio tasks and timers.
//!
//! # Sub-modules
//!
//! - **`queue`**     – Priority queue of outgoing requests, FIFO within a
//!   priority.
//! - **`correlate`** – Classifies a received frame as echo, busy, mismatch
//!   or match for the in-flight request.
//! - **`exchange`**  – The single-flight dispatcher: chunking, retry
//!   counters, timers, checksum validation and decoding.  Pure state machine.
//! - **`engine`**    – The Tokio task that runs an exchange against a
//!   transport and the handle used to talk to it.
//! - **`listener`**  – Callback trait the host implements to receive
//!   decoded answers and lifecycle events.

pub mod correlate;
pub mod engine;
pub mod exchange;
pub mod listener;
pub mod queue;
