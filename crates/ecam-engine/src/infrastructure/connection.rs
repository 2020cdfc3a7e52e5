//! Machine connection lifecycle.
//!
//! # States (for beginners)
//!
//! ```text
//! Disconnected ──► Discovering ──► Ready ──► Connected
//!       ▲               │            │            │
//!       └── no machine ─┘            └─ rescan ───┤
//!       └──────────────────── disconnect ─────────┘
//! ```
//!
//! - `Discovering`: a scan is running and machines are being reported.
//! - `Ready`: the scan found at least one machine; the host may connect.
//! - `Connected`: the link is up and the engine may send requests.
//!
//! The platform owns the radio; this type only validates the order of events
//! and tells the listener about them.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::application::listener::{DiscoveredMachine, EcamListener};

/// Where the link to the machine currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Discovering,
    Ready,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Discovering => "discovering",
            ConnectionState::Ready => "ready",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: ConnectionState,
        action: &'static str,
    },
    #[error("machine {0} was not found by the last scan")]
    UnknownMachine(String),
}

/// Validates connection events and reports them to the listener.
pub struct ConnectionStateMachine {
    state: ConnectionState,
    found: Vec<DiscoveredMachine>,
    connected_to: Option<DiscoveredMachine>,
    listener: Arc<dyn EcamListener>,
}

impl ConnectionStateMachine {
    pub fn new(listener: Arc<dyn EcamListener>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            found: Vec::new(),
            connected_to: None,
            listener,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Machines reported by the current or last scan.
    pub fn found(&self) -> &[DiscoveredMachine] {
        &self.found
    }

    pub fn connected_to(&self) -> Option<&DiscoveredMachine> {
        self.connected_to.as_ref()
    }

    fn transition(&mut self, to: ConnectionState) {
        debug!(from = %self.state, to = %to, "connection state changed");
        self.state = to;
    }

    fn require(
        &self,
        allowed: &[ConnectionState],
        action: &'static str,
    ) -> Result<(), ConnectionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ConnectionError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    /// Starts a new scan, forgetting the previous results.
    pub fn start_scan(&mut self) -> Result<(), ConnectionError> {
        self.require(
            &[ConnectionState::Disconnected, ConnectionState::Ready],
            "start a scan",
        )?;
        self.found.clear();
        self.transition(ConnectionState::Discovering);
        Ok(())
    }

    /// Records a machine seen by the running scan.  Repeated advertisements
    /// from the same address are reported once.
    pub fn machine_found(&mut self, machine: DiscoveredMachine) -> Result<(), ConnectionError> {
        self.require(&[ConnectionState::Discovering], "report a machine")?;
        if self.found.iter().any(|m| m.address == machine.address) {
            return Ok(());
        }
        info!(name = %machine.name, address = %machine.address, "machine found");
        self.listener.machine_found(&machine);
        self.found.push(machine);
        Ok(())
    }

    /// Ends the scan.  Returns the number of machines found.
    pub fn scan_finished(&mut self) -> Result<usize, ConnectionError> {
        self.require(&[ConnectionState::Discovering], "finish a scan")?;
        let found = self.found.len();
        self.listener.scan_finished(found);
        if found == 0 {
            self.transition(ConnectionState::Disconnected);
        } else {
            self.transition(ConnectionState::Ready);
        }
        Ok(found)
    }

    /// Marks the link to the machine at `address` as up.
    pub fn connect(&mut self, address: &str) -> Result<(), ConnectionError> {
        self.require(&[ConnectionState::Ready], "connect")?;
        let machine = self
            .found
            .iter()
            .find(|m| m.address == address)
            .cloned()
            .ok_or_else(|| ConnectionError::UnknownMachine(address.to_owned()))?;
        info!(name = %machine.name, address = %machine.address, "machine connected");
        self.connected_to = Some(machine);
        self.transition(ConnectionState::Connected);
        self.listener.machine_connected();
        Ok(())
    }

    /// Drops back to `Disconnected` from any state.  Returns `true` if the
    /// link had been up, in which case the listener was told.
    pub fn disconnect(&mut self) -> bool {
        let was_connected = self.state == ConnectionState::Connected;
        self.transition(ConnectionState::Disconnected);
        self.found.clear();
        if let Some(machine) = self.connected_to.take() {
            info!(name = %machine.name, "machine disconnected");
        }
        if was_connected {
            self.listener.machine_disconnected();
        }
        was_connected
    }
}
