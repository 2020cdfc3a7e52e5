//! One connected machine: capabilities, engine and connection lifecycle.
//!
//! A [`MachineSession`] is what the host application holds on to.  It picks
//! the [`ProtocolStrategy`] from the model's capabilities, spawns the engine
//! with the configured retry policy, and exposes one typed method per
//! machine command.  Every command method builds the frame for the session's
//! strategy and queues it at the command's default priority; answers arrive
//! on the listener.

use std::sync::Arc;

use ecam_core::domain::{
    BeanSystemUpdate, DispenseV1, DispenseV2, MachineCapabilities, MonitorBlock, NameKind,
    NameRecord,
};
use ecam_core::protocol::request::FAVORITES_LEN;
use ecam_core::protocol::{build_queued_request, Command, ProtocolError, ProtocolStrategy};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::application::engine::{spawn_engine, ByteChannel, EngineError, EngineHandle};
use crate::application::listener::{DiscoveredMachine, EcamListener};
use crate::infrastructure::connection::{ConnectionError, ConnectionState, ConnectionStateMachine};
use crate::infrastructure::machine_defaults::CapabilityLookup;
use crate::infrastructure::storage::config::EngineConfig;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no capability defaults for model {0}")]
    UnknownModel(String),
    #[error("machine is not connected")]
    NotConnected,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

pub struct MachineSession {
    caps: MachineCapabilities,
    strategy: ProtocolStrategy,
    engine: EngineHandle,
    connection: ConnectionStateMachine,
}

impl MachineSession {
    /// Looks up `model`, then spawns an engine over `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownModel`] if the lookup has no entry.
    pub fn start<C>(
        lookup: &dyn CapabilityLookup,
        model: &str,
        config: &EngineConfig,
        channel: C,
        listener: Arc<dyn EcamListener>,
    ) -> Result<(Self, JoinHandle<()>), SessionError>
    where
        C: ByteChannel + 'static,
    {
        let caps = lookup
            .capabilities(model)
            .ok_or_else(|| SessionError::UnknownModel(model.to_owned()))?;
        let strategy = caps.strategy();
        if channel.link() != strategy.link {
            warn!(
                model,
                expected = ?strategy.link,
                actual = ?channel.link(),
                "channel link differs from model defaults"
            );
        }

        let policy = config.retry_policy(&strategy);
        let (engine, join) = spawn_engine(strategy, policy, channel, Arc::clone(&listener));
        let session = Self {
            caps,
            strategy,
            engine,
            connection: ConnectionStateMachine::new(listener),
        };
        Ok((session, join))
    }

    pub fn capabilities(&self) -> &MachineCapabilities {
        &self.caps
    }

    pub fn strategy(&self) -> &ProtocolStrategy {
        &self.strategy
    }

    /// Handle for feeding link notifications into the engine.
    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    // ── Connection lifecycle ──────────────────────────────────────────────────

    pub fn start_scan(&mut self) -> Result<(), SessionError> {
        Ok(self.connection.start_scan()?)
    }

    pub fn machine_found(&mut self, machine: DiscoveredMachine) -> Result<(), SessionError> {
        Ok(self.connection.machine_found(machine)?)
    }

    pub fn scan_finished(&mut self) -> Result<usize, SessionError> {
        Ok(self.connection.scan_finished()?)
    }

    pub fn connect(&mut self, address: &str) -> Result<(), SessionError> {
        Ok(self.connection.connect(address)?)
    }

    /// Drops the link.  Queued and in-flight requests are discarded.
    pub fn disconnect(&mut self) -> Result<(), SessionError> {
        if self.connection.disconnect() {
            self.engine.disconnect()?;
        }
        Ok(())
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Builds `command` for this session and queues it.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`] before [`connect`](Self::connect),
    /// [`SessionError::Protocol`] when the command is invalid or unsupported
    /// by the machine generation.
    pub fn send(&self, command: Command) -> Result<(), SessionError> {
        if self.connection.state() != ConnectionState::Connected {
            return Err(SessionError::NotConnected);
        }
        let request = build_queued_request(&self.strategy, &command)?;
        debug!(command = command.name(), priority = ?request.priority, "command queued");
        self.engine.enqueue(request)?;
        Ok(())
    }

    pub fn request_monitor(&self, block: MonitorBlock) -> Result<(), SessionError> {
        self.send(Command::Monitor(block))
    }

    pub fn read_parameters(&self, address: u16, count: u8) -> Result<(), SessionError> {
        self.send(Command::ReadParameters { address, count })
    }

    pub fn write_parameter(&self, address: u16, value: u32) -> Result<(), SessionError> {
        self.send(Command::WriteParameter { address, value })
    }

    pub fn verify_checksums(&self) -> Result<(), SessionError> {
        self.send(Command::ChecksumVerification)
    }

    /// Reads every profile name slot the model has.
    pub fn read_profile_names(&self) -> Result<(), SessionError> {
        self.send(Command::ReadNames {
            kind: NameKind::Profile,
            first: 1,
            last: self.caps.profile_count.max(1),
        })
    }

    pub fn read_recipe_names(&self, first: u8, last: u8) -> Result<(), SessionError> {
        self.send(Command::ReadNames {
            kind: NameKind::Recipe,
            first,
            last,
        })
    }

    pub fn write_names(
        &self,
        kind: NameKind,
        first: u8,
        records: Vec<NameRecord>,
    ) -> Result<(), SessionError> {
        self.send(Command::WriteNames {
            kind,
            first,
            records,
        })
    }

    /// V1: quantities of every beverage for `profile`.
    pub fn read_recipe_quantities(&self, profile: u8) -> Result<(), SessionError> {
        self.send(Command::ReadRecipeQuantities {
            profile,
            first: 1,
            last: self.caps.recipe_count.max(1),
        })
    }

    /// V2: ingredients of one beverage for `profile`.
    pub fn read_recipe(&self, profile: u8, beverage: u8) -> Result<(), SessionError> {
        self.send(Command::ReadRecipe { profile, beverage })
    }

    pub fn read_recipe_priorities(&self, profile: u8) -> Result<(), SessionError> {
        self.send(Command::ReadRecipePriorities { profile })
    }

    pub fn select_profile(&self, profile: u8) -> Result<(), SessionError> {
        self.send(Command::SelectProfile { profile })
    }

    pub fn turn_on(&self) -> Result<(), SessionError> {
        self.send(Command::TurnOn)
    }

    pub fn set_pin_activation(&self, enabled: bool) -> Result<(), SessionError> {
        self.send(Command::PinActivation { enabled })
    }

    pub fn set_pin(&self, pin: &str) -> Result<(), SessionError> {
        self.send(Command::SetPin {
            pin: pin.to_owned(),
        })
    }

    pub fn set_time(&self, hour: u8, minute: u8) -> Result<(), SessionError> {
        self.send(Command::SetTime { hour, minute })
    }

    pub fn dispense_v1(&self, dispense: DispenseV1) -> Result<(), SessionError> {
        self.send(Command::DispenseV1(dispense))
    }

    pub fn dispense_v2(&self, dispense: DispenseV2) -> Result<(), SessionError> {
        self.send(Command::DispenseV2(dispense))
    }

    pub fn read_statistics(&self, address: u16, count: u8) -> Result<(), SessionError> {
        self.send(Command::ReadStatistics { address, count })
    }

    pub fn read_bean_system(&self, index: u8) -> Result<(), SessionError> {
        self.send(Command::ReadBeanSystem { index })
    }

    pub fn write_bean_system(&self, update: BeanSystemUpdate) -> Result<(), SessionError> {
        self.send(Command::WriteBeanSystem(update))
    }

    pub fn select_bean_system(&self, id: u8) -> Result<(), SessionError> {
        self.send(Command::SelectBeanSystem { id })
    }

    pub fn refresh_app_id(&self) -> Result<(), SessionError> {
        self.send(Command::RefreshAppId)
    }

    pub fn set_favorites(
        &self,
        profile: u8,
        favorites: [u8; FAVORITES_LEN],
    ) -> Result<(), SessionError> {
        self.send(Command::SetFavorites { profile, favorites })
    }
}
