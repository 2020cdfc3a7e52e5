//! Monitor-mode snapshots.
//!
//! While a client is connected the machine is polled with monitor requests.
//! The answer is a status block whose layout depends on which data block was
//! requested (0, 1 or 2).  [`MonitorSnapshot`] keeps the raw frame and
//! exposes typed accessors that know the offsets for each block; an accessor
//! returns `None` when the block does not carry that field or the frame is
//! too short.
//!
//! ```text
//! block 1: [D0][len][70][0F][alarm0][alarm1][load0][load1][state][progress][model][heater][steamer][beverage][waste][sw]...
//! block 2: [D0][len][75][0F][accessory][sw0][sw1][alarm0][alarm1][state][progress][percent][alarm2][alarm3/load0][load1]...
//! ```

use serde::{Deserialize, Serialize};

use crate::protocol::variant::ProtocolVariant;

/// Which monitor data block a snapshot carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonitorBlock {
    /// Block 0: pressed keys and accessory.
    Data0,
    /// Block 1: alarms, loads and temperatures.
    Data1,
    /// Block 2: switches, alarms, state and dispensing progress.
    Data2,
}

impl MonitorBlock {
    pub const fn index(self) -> u8 {
        match self {
            MonitorBlock::Data0 => 0,
            MonitorBlock::Data1 => 1,
            MonitorBlock::Data2 => 2,
        }
    }
}

/// Machine activity reported in the "function ongoing" byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineState {
    StandBy,
    TurningOn,
    ShuttingDown,
    Descaling,
    SteamPreparation,
    Recovery,
    ReadyOrDispensing,
    Rinsing,
    MilkPreparation,
    HotWaterDelivery,
    MilkCleaning,
    ChocolatePreparation,
    /// A state byte this codec does not know.
    Other(u8),
}

impl From<u8> for MachineState {
    fn from(value: u8) -> Self {
        match value {
            0 => MachineState::StandBy,
            1 => MachineState::TurningOn,
            2 => MachineState::ShuttingDown,
            4 => MachineState::Descaling,
            5 => MachineState::SteamPreparation,
            6 => MachineState::Recovery,
            7 => MachineState::ReadyOrDispensing,
            8 => MachineState::Rinsing,
            10 => MachineState::MilkPreparation,
            11 => MachineState::HotWaterDelivery,
            12 => MachineState::MilkCleaning,
            16 => MachineState::ChocolatePreparation,
            other => MachineState::Other(other),
        }
    }
}

/// Accessory plugged into the machine's spout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accessory {
    None,
    Water,
    Milk,
    Chocolate,
    MilkClean,
    Other(u8),
}

impl From<u8> for Accessory {
    fn from(value: u8) -> Self {
        match value {
            0 => Accessory::None,
            1 => Accessory::Water,
            2 => Accessory::Milk,
            3 => Accessory::Chocolate,
            4 => Accessory::MilkClean,
            other => Accessory::Other(other),
        }
    }
}

/// One monitor answer plus typed accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub variant: ProtocolVariant,
    pub block: MonitorBlock,
    /// The complete answer frame, header and checksum included.
    pub raw: Vec<u8>,
}

impl MonitorSnapshot {
    pub fn new(variant: ProtocolVariant, block: MonitorBlock, raw: Vec<u8>) -> Self {
        Self {
            variant,
            block,
            raw,
        }
    }

    fn byte(&self, index: usize) -> Option<u8> {
        self.raw.get(index).copied()
    }

    fn byte_for(&self, data1: usize, data2: usize) -> Option<u8> {
        match self.block {
            MonitorBlock::Data0 => None,
            MonitorBlock::Data1 => self.byte(data1),
            MonitorBlock::Data2 => self.byte(data2),
        }
    }

    /// Bit mask of pressed front-panel keys (block 0 only, little-endian).
    pub fn pressed_keys(&self) -> Option<u64> {
        if self.block != MonitorBlock::Data0 {
            return None;
        }
        let bytes = self.raw.get(4..9)?;
        Some(
            bytes
                .iter()
                .enumerate()
                .fold(0u64, |acc, (i, &b)| acc | (u64::from(b) << (8 * i))),
        )
    }

    /// Accessory currently attached (blocks 0 and 2).
    pub fn accessory(&self) -> Option<Accessory> {
        if self.block == MonitorBlock::Data1 {
            return None;
        }
        self.byte(4).map(Accessory::from)
    }

    /// Switch bit mask, little-endian over bytes 5..7 (blocks 0 and 2).
    pub fn switches(&self) -> Option<u16> {
        if self.block == MonitorBlock::Data1 {
            return None;
        }
        Some(u16::from_le_bytes([self.byte(5)?, self.byte(6)?]))
    }

    pub fn is_switch_on(&self, bit: u8) -> bool {
        bit < 16 && self.switches().map_or(false, |s| s & (1 << bit) != 0)
    }

    /// Indices of the switches that are on.
    pub fn active_switches(&self) -> Vec<u8> {
        self.switches()
            .map(|s| (0..16).filter(|bit| s & (1 << bit) != 0).collect())
            .unwrap_or_default()
    }

    /// Alarm word: two low bytes at block-dependent offsets plus bytes 12, 13.
    pub fn alarms(&self) -> Option<u32> {
        let (lo, hi) = match self.block {
            MonitorBlock::Data0 => return None,
            MonitorBlock::Data1 => (self.byte(4)?, self.byte(5)?),
            MonitorBlock::Data2 => (self.byte(7)?, self.byte(8)?),
        };
        Some(u32::from_le_bytes([lo, hi, self.byte(12)?, self.byte(13)?]))
    }

    pub fn is_alarm_active(&self, bit: u8) -> bool {
        bit < 32 && self.alarms().map_or(false, |a| a & (1 << bit) != 0)
    }

    /// Indices of the alarms that are raised.
    pub fn active_alarms(&self) -> Vec<u8> {
        self.alarms()
            .map(|a| (0..32).filter(|bit| a & (1 << bit) != 0).collect())
            .unwrap_or_default()
    }

    /// Load bit mask (blocks 1 and 2).
    pub fn loads(&self) -> Option<u16> {
        let lo = self.byte_for(6, 13)?;
        let hi = self.byte_for(7, 14)?;
        Some(u16::from_le_bytes([lo, hi]))
    }

    /// Indices of the loads that are on; index 0 is the most significant bit.
    pub fn active_loads(&self) -> Vec<u8> {
        self.loads()
            .map(|l| (0..16).filter(|i| l & (0x8000 >> i) != 0).collect())
            .unwrap_or_default()
    }

    /// Raw "function ongoing" byte.
    pub fn function_ongoing(&self) -> Option<u8> {
        self.byte_for(8, 9)
    }

    pub fn machine_state(&self) -> Option<MachineState> {
        self.function_ongoing().map(MachineState::from)
    }

    /// Progress of the current function.
    pub fn progress(&self) -> Option<u8> {
        self.byte_for(9, 10)
    }

    /// Dispensing percentage (block 2 only).
    pub fn dispensing_percentage(&self) -> Option<u8> {
        match self.block {
            MonitorBlock::Data2 => self.byte(11),
            _ => None,
        }
    }

    /// Machine model id (block 1 only).
    pub fn machine_model_id(&self) -> Option<u8> {
        match self.block {
            MonitorBlock::Data1 => self.byte(10),
            _ => None,
        }
    }

    /// Heater temperature in °C; negative readings clamp to zero.
    pub fn heater_temperature(&self) -> Option<u8> {
        self.byte_for(11, 21).map(clamp_signed)
    }

    /// Steamer temperature in °C; negative readings clamp to zero.
    pub fn steamer_temperature(&self) -> Option<u8> {
        self.byte_for(12, 22).map(clamp_signed)
    }

    /// Beverage currently being prepared.
    pub fn beverage_type(&self) -> Option<u8> {
        self.byte_for(13, 23)
    }

    pub fn coffee_waste_counter(&self) -> Option<u8> {
        self.byte_for(14, 24)
    }

    /// Main board firmware release (blocks 1 and 2).
    pub fn main_board_sw_release(&self) -> Option<u8> {
        match self.block {
            MonitorBlock::Data0 => None,
            _ => self.byte(15),
        }
    }

    pub fn is_ready_to_work(&self) -> bool {
        self.machine_state() == Some(MachineState::ReadyOrDispensing) && self.progress() == Some(0)
    }

    pub fn is_in_stand_by(&self) -> bool {
        self.machine_state() == Some(MachineState::StandBy)
    }

    pub fn is_turning_on(&self) -> bool {
        self.machine_state() == Some(MachineState::TurningOn)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.machine_state() == Some(MachineState::ShuttingDown)
    }

    pub fn is_in_recovery_mode(&self) -> bool {
        self.machine_state() == Some(MachineState::Recovery)
    }
}

fn clamp_signed(b: u8) -> u8 {
    if (b as i8) < 0 {
        0
    } else {
        b
    }
}
