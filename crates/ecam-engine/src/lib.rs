//! ecam-engine library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the `ecam-sim` binary share the same module tree.

pub mod application;
pub mod infrastructure;
pub mod session;

pub use application::engine::{spawn_engine, ByteChannel, EngineError, EngineHandle};
pub use application::exchange::RetryPolicy;
pub use application::listener::{ChannelListener, DiscoveredMachine, EcamListener, EngineEvent};
pub use session::{MachineSession, SessionError};
