//! Command and answer identifiers carried in byte 2 of every ECAM frame.
//!
//! Requests and their answers share the same identifier: a "read parameters"
//! request carries `0x95` and the machine answers with a `0x95` frame.  The
//! exceptions are the busy sentinel `0xE1`, which can answer any request, and
//! the extended parameter read `0xA1`, which the machine may downgrade to a
//! plain `0x95` answer.

use serde::{Deserialize, Serialize};

// ── Frame constants ───────────────────────────────────────────────────────────

/// First byte of every frame written to the machine.
pub const FRAME_HEADER: u8 = 0x0D;

/// First byte of every answer frame sent by the machine.
pub const ANSWER_HEADER: u8 = 0xD0;

/// Index of the length byte (`total length - 1`).
pub const LENGTH_INDEX: usize = 1;

/// Index of the command / answer identifier.
pub const ID_INDEX: usize = 2;

/// Index of the sub-identifier (`0x0F` or `0xF0`).
pub const SUB_ID_INDEX: usize = 3;

/// Sub-identifier used by most write-style commands.
pub const SUB_ID_WRITE: u8 = 0xF0;

/// Sub-identifier used by monitor and low-address reads.
pub const SUB_ID_READ: u8 = 0x0F;

// ── Message identifiers ───────────────────────────────────────────────────────

/// Every command / answer identifier understood by the codec.
///
/// Some identifiers only exist on one protocol generation; see
/// [`crate::protocol::variant::ProtocolStrategy`] for which are valid where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageId {
    /// Remote control key press (V2).
    RemoteControl = 0x0C,
    /// Monitor mode, data block 0 (V1 machines).
    MonitorData0 = 0x60,
    /// Monitor mode, data block 1.
    MonitorData1 = 0x70,
    /// Monitor mode, data block 2 (V2 machines).
    MonitorData2 = 0x75,
    /// Beverage dispensing on V1, also used to power the machine on.
    BeverageDispensingV1 = 0x82,
    /// Beverage dispensing on V2.
    BeverageDispensingV2 = 0x83,
    /// Application control on V2 (power on, refresh app id).
    AppControl = 0x84,
    /// Parameter write.
    ParameterWrite = 0x90,
    /// Parameter read of up to four registers.
    ParameterRead = 0x95,
    /// Parameter read of up to ten registers.
    ParameterReadExtended = 0xA1,
    /// Statistics read (V2).
    StatisticsRead = 0xA2,
    /// Names / recipes checksum verification.
    ChecksumVerification = 0xA3,
    /// Profile names read.
    ProfileNameRead = 0xA4,
    /// Profile names write.
    ProfileNameWrite = 0xA5,
    /// Recipe quantities read.
    RecipeQuantityRead = 0xA6,
    /// Recipe priorities read.
    RecipePriorityRead = 0xA8,
    /// Profile selection.
    ProfileSelection = 0xA9,
    /// Recipe names read.
    RecipeNameRead = 0xAA,
    /// Recipe names write.
    RecipeNameWrite = 0xAB,
    /// Favourite beverages write (V2).
    SetFavorite = 0xAD,
    /// PIN activation.
    PinActivation = 0xB0,
    /// PIN set.
    PinSet = 0xB1,
    /// Bean system select (V2).
    BeanSystemSelect = 0xB9,
    /// Bean system read (V2).
    BeanSystemRead = 0xBA,
    /// Bean system write (V2).
    BeanSystemWrite = 0xBB,
    /// PIN read (V2).
    PinRead = 0xD2,
    /// Device busy; the request should be retried.
    Busy = 0xE1,
    /// Clock set.
    SetTime = 0xE2,
}

impl MessageId {
    /// Returns the wire byte for this identifier.
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MessageId {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x0C => Ok(MessageId::RemoteControl),
            0x60 => Ok(MessageId::MonitorData0),
            0x70 => Ok(MessageId::MonitorData1),
            0x75 => Ok(MessageId::MonitorData2),
            0x82 => Ok(MessageId::BeverageDispensingV1),
            0x83 => Ok(MessageId::BeverageDispensingV2),
            0x84 => Ok(MessageId::AppControl),
            0x90 => Ok(MessageId::ParameterWrite),
            0x95 => Ok(MessageId::ParameterRead),
            0xA1 => Ok(MessageId::ParameterReadExtended),
            0xA2 => Ok(MessageId::StatisticsRead),
            0xA3 => Ok(MessageId::ChecksumVerification),
            0xA4 => Ok(MessageId::ProfileNameRead),
            0xA5 => Ok(MessageId::ProfileNameWrite),
            0xA6 => Ok(MessageId::RecipeQuantityRead),
            0xA8 => Ok(MessageId::RecipePriorityRead),
            0xA9 => Ok(MessageId::ProfileSelection),
            0xAA => Ok(MessageId::RecipeNameRead),
            0xAB => Ok(MessageId::RecipeNameWrite),
            0xAD => Ok(MessageId::SetFavorite),
            0xB0 => Ok(MessageId::PinActivation),
            0xB1 => Ok(MessageId::PinSet),
            0xB9 => Ok(MessageId::BeanSystemSelect),
            0xBA => Ok(MessageId::BeanSystemRead),
            0xBB => Ok(MessageId::BeanSystemWrite),
            0xD2 => Ok(MessageId::PinRead),
            0xE1 => Ok(MessageId::Busy),
            0xE2 => Ok(MessageId::SetTime),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_round_trips_every_known_id() {
        let ids = [
            MessageId::RemoteControl,
            MessageId::MonitorData0,
            MessageId::MonitorData1,
            MessageId::MonitorData2,
            MessageId::BeverageDispensingV1,
            MessageId::BeverageDispensingV2,
            MessageId::AppControl,
            MessageId::ParameterWrite,
            MessageId::ParameterRead,
            MessageId::ParameterReadExtended,
            MessageId::StatisticsRead,
            MessageId::ChecksumVerification,
            MessageId::ProfileNameRead,
            MessageId::ProfileNameWrite,
            MessageId::RecipeQuantityRead,
            MessageId::RecipePriorityRead,
            MessageId::ProfileSelection,
            MessageId::RecipeNameRead,
            MessageId::RecipeNameWrite,
            MessageId::SetFavorite,
            MessageId::PinActivation,
            MessageId::PinSet,
            MessageId::BeanSystemSelect,
            MessageId::BeanSystemRead,
            MessageId::BeanSystemWrite,
            MessageId::PinRead,
            MessageId::Busy,
            MessageId::SetTime,
        ];
        for id in ids {
            assert_eq!(MessageId::try_from(id.as_byte()), Ok(id));
        }
    }

    #[test]
    fn test_try_from_rejects_unassigned_byte() {
        assert_eq!(MessageId::try_from(0x00), Err(()));
        assert_eq!(MessageId::try_from(0xFF), Err(()));
    }
}
