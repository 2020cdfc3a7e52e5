//! Listener interface through which the engine reports to the application.
//!
//! Nothing the engine does surfaces as an error: timeouts, checksum failures
//! and decoded answers all arrive as callbacks on an [`EcamListener`].  Every
//! method has an empty default body, so an implementation only overrides
//! what it cares about.
//!
//! [`ChannelListener`] forwards everything as [`EngineEvent`] values over a
//! tokio channel, which is what the simulator binary and the tests use.

use std::sync::Arc;

use ecam_core::domain::{
    BeanSystem, ChecksumTriple, MonitorSnapshot, NameKind, Parameter, ParameterWritten,
    PriorityList, ProfileNameEntry, RecipeData, RecipeQuantity,
};
use ecam_core::protocol::DecodedEvent;
use tokio::sync::mpsc;

/// A machine seen while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredMachine {
    /// Advertised model name, used for the capability lookup.
    pub name: String,
    /// Link-level address (BLE MAC or relay device id).
    pub address: String,
}

/// Everything the engine and the connection state machine report.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Decoded(DecodedEvent),
    /// Retries are exhausted; carries the command byte of the request.
    RequestTimeout { command: u8 },
    /// A correlated answer failed its checksum; carries the answer byte.
    ChecksumKo { answer: u8 },
    MachineFound(DiscoveredMachine),
    MachineConnected,
    MachineDisconnected,
    ScanFinished { found: usize },
}

/// Callbacks invoked by the engine.  Implementations must be cheap; they run
/// on the engine task.
pub trait EcamListener: Send + Sync {
    // ── Lifecycle ─────────────────────────────────────────────────────────────

    fn machine_found(&self, _machine: &DiscoveredMachine) {}
    fn machine_connected(&self) {}
    fn machine_disconnected(&self) {}
    fn scan_finished(&self, _found: usize) {}

    /// A request failed after all retries.
    fn request_timeout(&self, _command: u8) {}

    /// An answer was correlated but its checksum was wrong.
    fn checksum_ko(&self, _answer: u8) {}

    // ── Decoded answers ───────────────────────────────────────────────────────

    fn parameters_read(&self, _parameters: &[Parameter]) {}
    fn parameter_written(&self, _result: &ParameterWritten) {}
    fn monitor_data(&self, _snapshot: &MonitorSnapshot) {}
    fn checksums(&self, _checksums: &ChecksumTriple) {}
    fn names_read(&self, _kind: NameKind, _entries: &[ProfileNameEntry]) {}
    fn names_written(&self, _kind: NameKind, _success: bool) {}
    fn recipe_quantities(&self, _profile_id: u8, _quantities: &[RecipeQuantity]) {}
    fn recipe_data(&self, _recipe: &RecipeData) {}
    fn recipe_priorities(&self, _priorities: &PriorityList) {}
    fn profile_selected(&self, _profile_id: u8, _success: bool) {}
    fn time_set(&self, _success: bool) {}
    fn pin_set(&self, _success: bool) {}
    fn pin_activation(&self, _success: bool) {}
    fn bean_system(&self, _bean: &BeanSystem) {}
    fn bean_system_selected(&self, _id: u8) {}
    fn bean_system_written(&self, _id: u8) {}
    fn beverage_dispensing(&self, _beverage_id: u8) {}
    fn statistics(&self, _counters: &[Parameter]) {}
    fn remote_control(&self, _enabled: bool) {}
}

impl<T: EcamListener + ?Sized> EcamListener for Arc<T> {
    fn machine_found(&self, machine: &DiscoveredMachine) {
        (**self).machine_found(machine)
    }
    fn machine_connected(&self) {
        (**self).machine_connected()
    }
    fn machine_disconnected(&self) {
        (**self).machine_disconnected()
    }
    fn scan_finished(&self, found: usize) {
        (**self).scan_finished(found)
    }
    fn request_timeout(&self, command: u8) {
        (**self).request_timeout(command)
    }
    fn checksum_ko(&self, answer: u8) {
        (**self).checksum_ko(answer)
    }
    fn parameters_read(&self, parameters: &[Parameter]) {
        (**self).parameters_read(parameters)
    }
    fn parameter_written(&self, result: &ParameterWritten) {
        (**self).parameter_written(result)
    }
    fn monitor_data(&self, snapshot: &MonitorSnapshot) {
        (**self).monitor_data(snapshot)
    }
    fn checksums(&self, checksums: &ChecksumTriple) {
        (**self).checksums(checksums)
    }
    fn names_read(&self, kind: NameKind, entries: &[ProfileNameEntry]) {
        (**self).names_read(kind, entries)
    }
    fn names_written(&self, kind: NameKind, success: bool) {
        (**self).names_written(kind, success)
    }
    fn recipe_quantities(&self, profile_id: u8, quantities: &[RecipeQuantity]) {
        (**self).recipe_quantities(profile_id, quantities)
    }
    fn recipe_data(&self, recipe: &RecipeData) {
        (**self).recipe_data(recipe)
    }
    fn recipe_priorities(&self, priorities: &PriorityList) {
        (**self).recipe_priorities(priorities)
    }
    fn profile_selected(&self, profile_id: u8, success: bool) {
        (**self).profile_selected(profile_id, success)
    }
    fn time_set(&self, success: bool) {
        (**self).time_set(success)
    }
    fn pin_set(&self, success: bool) {
        (**self).pin_set(success)
    }
    fn pin_activation(&self, success: bool) {
        (**self).pin_activation(success)
    }
    fn bean_system(&self, bean: &BeanSystem) {
        (**self).bean_system(bean)
    }
    fn bean_system_selected(&self, id: u8) {
        (**self).bean_system_selected(id)
    }
    fn bean_system_written(&self, id: u8) {
        (**self).bean_system_written(id)
    }
    fn beverage_dispensing(&self, beverage_id: u8) {
        (**self).beverage_dispensing(beverage_id)
    }
    fn statistics(&self, counters: &[Parameter]) {
        (**self).statistics(counters)
    }
    fn remote_control(&self, enabled: bool) {
        (**self).remote_control(enabled)
    }
}

/// Routes one event to the matching listener callback.
pub fn notify(listener: &dyn EcamListener, event: &EngineEvent) {
    match event {
        EngineEvent::Decoded(decoded) => notify_decoded(listener, decoded),
        EngineEvent::RequestTimeout { command } => listener.request_timeout(*command),
        EngineEvent::ChecksumKo { answer } => listener.checksum_ko(*answer),
        EngineEvent::MachineFound(machine) => listener.machine_found(machine),
        EngineEvent::MachineConnected => listener.machine_connected(),
        EngineEvent::MachineDisconnected => listener.machine_disconnected(),
        EngineEvent::ScanFinished { found } => listener.scan_finished(*found),
    }
}

fn notify_decoded(listener: &dyn EcamListener, event: &DecodedEvent) {
    match event {
        DecodedEvent::ParametersRead(p) => listener.parameters_read(p),
        DecodedEvent::ParameterWritten(w) => listener.parameter_written(w),
        DecodedEvent::MonitorData(s) => listener.monitor_data(s),
        DecodedEvent::Checksums(c) => listener.checksums(c),
        DecodedEvent::ProfileNames(n) => listener.names_read(NameKind::Profile, n),
        DecodedEvent::RecipeNames(n) => listener.names_read(NameKind::Recipe, n),
        DecodedEvent::NamesWritten { kind, success } => listener.names_written(*kind, *success),
        DecodedEvent::RecipeQuantities {
            profile_id,
            quantities,
        } => listener.recipe_quantities(*profile_id, quantities),
        DecodedEvent::RecipeData(r) => listener.recipe_data(r),
        DecodedEvent::RecipePriorities(p) => listener.recipe_priorities(p),
        DecodedEvent::ProfileSelected {
            profile_id,
            success,
        } => listener.profile_selected(*profile_id, *success),
        DecodedEvent::TimeSet { success } => listener.time_set(*success),
        DecodedEvent::PinSet { success } => listener.pin_set(*success),
        DecodedEvent::PinActivation { success } => listener.pin_activation(*success),
        DecodedEvent::BeanSystem(b) => listener.bean_system(b),
        DecodedEvent::BeanSystemSelected { id } => listener.bean_system_selected(*id),
        DecodedEvent::BeanSystemWritten { id } => listener.bean_system_written(*id),
        DecodedEvent::BeverageDispensing { beverage_id } => {
            listener.beverage_dispensing(*beverage_id)
        }
        DecodedEvent::Statistics(s) => listener.statistics(s),
        DecodedEvent::RemoteControl { enabled } => listener.remote_control(*enabled),
    }
}

// ── Channel listener ──────────────────────────────────────────────────────────

/// Forwards every callback as an [`EngineEvent`] over an unbounded channel.
///
/// Events are dropped silently once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelListener {
    /// Creates a listener and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    fn decoded(&self, event: DecodedEvent) {
        self.send(EngineEvent::Decoded(event));
    }
}

impl EcamListener for ChannelListener {
    fn machine_found(&self, machine: &DiscoveredMachine) {
        self.send(EngineEvent::MachineFound(machine.clone()));
    }
    fn machine_connected(&self) {
        self.send(EngineEvent::MachineConnected);
    }
    fn machine_disconnected(&self) {
        self.send(EngineEvent::MachineDisconnected);
    }
    fn scan_finished(&self, found: usize) {
        self.send(EngineEvent::ScanFinished { found });
    }
    fn request_timeout(&self, command: u8) {
        self.send(EngineEvent::RequestTimeout { command });
    }
    fn checksum_ko(&self, answer: u8) {
        self.send(EngineEvent::ChecksumKo { answer });
    }
    fn parameters_read(&self, parameters: &[Parameter]) {
        self.decoded(DecodedEvent::ParametersRead(parameters.to_vec()));
    }
    fn parameter_written(&self, result: &ParameterWritten) {
        self.decoded(DecodedEvent::ParameterWritten(*result));
    }
    fn monitor_data(&self, snapshot: &MonitorSnapshot) {
        self.decoded(DecodedEvent::MonitorData(snapshot.clone()));
    }
    fn checksums(&self, checksums: &ChecksumTriple) {
        self.decoded(DecodedEvent::Checksums(checksums.clone()));
    }
    fn names_read(&self, kind: NameKind, entries: &[ProfileNameEntry]) {
        let entries = entries.to_vec();
        self.decoded(match kind {
            NameKind::Profile => DecodedEvent::ProfileNames(entries),
            NameKind::Recipe => DecodedEvent::RecipeNames(entries),
        });
    }
    fn names_written(&self, kind: NameKind, success: bool) {
        self.decoded(DecodedEvent::NamesWritten { kind, success });
    }
    fn recipe_quantities(&self, profile_id: u8, quantities: &[RecipeQuantity]) {
        self.decoded(DecodedEvent::RecipeQuantities {
            profile_id,
            quantities: quantities.to_vec(),
        });
    }
    fn recipe_data(&self, recipe: &RecipeData) {
        self.decoded(DecodedEvent::RecipeData(recipe.clone()));
    }
    fn recipe_priorities(&self, priorities: &PriorityList) {
        self.decoded(DecodedEvent::RecipePriorities(priorities.clone()));
    }
    fn profile_selected(&self, profile_id: u8, success: bool) {
        self.decoded(DecodedEvent::ProfileSelected {
            profile_id,
            success,
        });
    }
    fn time_set(&self, success: bool) {
        self.decoded(DecodedEvent::TimeSet { success });
    }
    fn pin_set(&self, success: bool) {
        self.decoded(DecodedEvent::PinSet { success });
    }
    fn pin_activation(&self, success: bool) {
        self.decoded(DecodedEvent::PinActivation { success });
    }
    fn bean_system(&self, bean: &BeanSystem) {
        self.decoded(DecodedEvent::BeanSystem(bean.clone()));
    }
    fn bean_system_selected(&self, id: u8) {
        self.decoded(DecodedEvent::BeanSystemSelected { id });
    }
    fn bean_system_written(&self, id: u8) {
        self.decoded(DecodedEvent::BeanSystemWritten { id });
    }
    fn beverage_dispensing(&self, beverage_id: u8) {
        self.decoded(DecodedEvent::BeverageDispensing { beverage_id });
    }
    fn statistics(&self, counters: &[Parameter]) {
        self.decoded(DecodedEvent::Statistics(counters.to_vec()));
    }
    fn remote_control(&self, enabled: bool) {
        self.decoded(DecodedEvent::RemoteControl { enabled });
    }
}
