//! Protocol generation strategy.
//!
//! ECAM machines speak one of two incompatible wire formats.  Rather than
//! keeping two copies of the codec and the engine, every place where the
//! formats differ asks a [`ProtocolStrategy`] value:
//!
//! | Concern                        | V1            | V2 (BLE)       | V2 (WiFi relay) |
//! |--------------------------------|---------------|----------------|-----------------|
//! | Checksum                       | XOR, 1 byte   | CRC-16, 2 bytes| CRC-16, 2 bytes |
//! | Dispense command               | `0x82`        | `0x83`         | `0x83`          |
//! | Name record offset in answers  | 4             | 4              | 6               |
//! | Name record width              | 21            | 21 (22 striker)| 21 (22 striker) |
//! | Request chunking               | yes           | yes            | no              |
//! | Bean-system sub-id correlation | n/a           | yes            | yes             |
//! | Mismatch retries               | yes           | yes            | no              |
//!
//! The strategy is chosen once per session from the machine's capability
//! defaults and never changes while the session is alive.

use serde::{Deserialize, Serialize};

use crate::protocol::checksum::ChecksumKind;
use crate::protocol::messages::{MessageId, ID_INDEX};

/// Wire-format generation of the connected machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVariant {
    V1,
    V2,
}

/// How bytes reach the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    /// Bluetooth LE characteristic writes; requests are chunked.
    Ble,
    /// Cloud relay property updates; requests are sent whole.
    Wifi,
}

/// Selects checksum, field layout and correlation rules for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtocolStrategy {
    pub variant: ProtocolVariant,
    pub link: LinkKind,
    /// Striker machines carry a mug byte in every name record.
    pub striker: bool,
}

impl ProtocolStrategy {
    pub const fn new(variant: ProtocolVariant, link: LinkKind) -> Self {
        Self {
            variant,
            link,
            striker: false,
        }
    }

    /// First-generation machine over BLE.
    pub const fn v1() -> Self {
        Self::new(ProtocolVariant::V1, LinkKind::Ble)
    }

    /// Second-generation machine over BLE.
    pub const fn v2_ble() -> Self {
        Self::new(ProtocolVariant::V2, LinkKind::Ble)
    }

    /// Second-generation machine behind the cloud relay.
    pub const fn v2_wifi() -> Self {
        Self::new(ProtocolVariant::V2, LinkKind::Wifi)
    }

    /// Returns a copy with the striker name layout toggled.
    pub const fn with_striker(mut self, striker: bool) -> Self {
        self.striker = striker;
        self
    }

    pub const fn is_v2(&self) -> bool {
        matches!(self.variant, ProtocolVariant::V2)
    }

    // ── Checksums ─────────────────────────────────────────────────────────────

    pub const fn checksum(&self) -> ChecksumKind {
        match self.variant {
            ProtocolVariant::V1 => ChecksumKind::Xor8,
            ProtocolVariant::V2 => ChecksumKind::Crc16,
        }
    }

    /// Writes the checksum into the trailing bytes of `frame`.
    pub fn seal(&self, frame: &mut [u8]) {
        self.checksum().seal(frame);
    }

    /// Recomputes the checksum of `frame` and compares it with its trailer.
    pub fn validate_checksum(&self, frame: &[u8]) -> bool {
        self.checksum().validate(frame)
    }

    // ── Field layout ──────────────────────────────────────────────────────────

    /// Command that dispenses a beverage.  Any dispensing answer correlates
    /// with it, whatever the answer id.
    pub const fn dispense_id(&self) -> MessageId {
        match self.variant {
            ProtocolVariant::V1 => MessageId::BeverageDispensingV1,
            ProtocolVariant::V2 => MessageId::BeverageDispensingV2,
        }
    }

    /// Offset of the first name record in a names answer.
    pub const fn name_records_offset(&self) -> usize {
        match (self.variant, self.link) {
            (ProtocolVariant::V2, LinkKind::Wifi) => 6,
            _ => 4,
        }
    }

    /// Width of one name record: 20 name bytes, the icon byte and, on striker
    /// machines, the mug byte.
    pub const fn name_record_width(&self) -> usize {
        if self.striker && self.is_v2() {
            22
        } else {
            21
        }
    }

    /// Whether requests larger than the link's packet size are chunked.
    pub const fn chunks_requests(&self) -> bool {
        matches!(self.link, LinkKind::Ble)
    }

    /// Whether a mismatched answer is retried.  Relay answers are not ordered
    /// against requests, so the WiFi link accepts them as they come.
    pub const fn retries_mismatches(&self) -> bool {
        matches!(self.link, LinkKind::Ble)
    }

    // ── Correlation ───────────────────────────────────────────────────────────

    /// Returns `true` when `answer` is an acceptable answer to `request`.
    ///
    /// Both frames must be at least three bytes long; shorter frames never
    /// correlate.  Busy answers are handled by the caller before this check.
    pub fn answers_request(&self, request: &[u8], answer: &[u8]) -> bool {
        let (Some(&request_id), Some(&answer_id)) = (request.get(ID_INDEX), answer.get(ID_INDEX))
        else {
            return false;
        };

        if self.is_v2() && answer_id == MessageId::BeanSystemRead.as_byte() {
            // Bean system answers also echo the slot index they describe.
            return request_id == answer_id && request.get(4) == answer.get(4);
        }

        answer_id == request_id
            || request_id == self.dispense_id().as_byte()
            || (request_id == MessageId::ParameterReadExtended.as_byte()
                && answer_id == MessageId::ParameterRead.as_byte())
    }
}

impl Default for ProtocolStrategy {
    fn default() -> Self {
        Self::v2_ble()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_kind_follows_variant() {
        assert_eq!(ProtocolStrategy::v1().checksum(), ChecksumKind::Xor8);
        assert_eq!(ProtocolStrategy::v2_ble().checksum(), ChecksumKind::Crc16);
        assert_eq!(ProtocolStrategy::v2_wifi().checksum(), ChecksumKind::Crc16);
    }

    #[test]
    fn test_name_layout_per_strategy() {
        assert_eq!(ProtocolStrategy::v1().name_records_offset(), 4);
        assert_eq!(ProtocolStrategy::v2_ble().name_records_offset(), 4);
        assert_eq!(ProtocolStrategy::v2_wifi().name_records_offset(), 6);
        assert_eq!(ProtocolStrategy::v2_ble().name_record_width(), 21);
        assert_eq!(
            ProtocolStrategy::v2_wifi().with_striker(true).name_record_width(),
            22
        );
        // The mug byte only exists on second-generation machines.
        assert_eq!(ProtocolStrategy::v1().with_striker(true).name_record_width(), 21);
    }

    #[test]
    fn test_answers_request_when_ids_match() {
        let request = [0x0D, 0x05, 0xA9, 0xF0, 0x02, 0x00];
        let answer = [0xD0, 0x06, 0xA9, 0xF0, 0x02, 0x00, 0x00];
        assert!(ProtocolStrategy::v1().answers_request(&request, &answer));
    }

    #[test]
    fn test_answers_request_rejects_different_id() {
        let request = [0x0D, 0x05, 0xA9, 0xF0, 0x02, 0x00];
        let answer = [0xD0, 0x05, 0xA4, 0xF0, 0x00, 0x00];
        assert!(!ProtocolStrategy::v2_ble().answers_request(&request, &answer));
    }

    #[test]
    fn test_dispense_request_accepts_any_answer() {
        let v1_request = [0x0D, 0x0B, 0x82, 0xF0, 0x01, 0x01, 0, 0, 0, 0, 0, 0];
        let v2_request = [0x0D, 0x08, 0x83, 0xF0, 0x01, 0x01, 0x08, 0, 0];
        let status = [0xD0, 0x05, 0x70, 0x0F, 0x00, 0x00];

        assert!(ProtocolStrategy::v1().answers_request(&v1_request, &status));
        assert!(ProtocolStrategy::v2_ble().answers_request(&v2_request, &status));
        // The other generation's dispense id is not a sentinel.
        assert!(!ProtocolStrategy::v2_ble().answers_request(&v1_request, &status));
    }

    #[test]
    fn test_extended_parameter_read_accepts_plain_read_answer() {
        let request = [0x0D, 0x07, 0xA1, 0x0F, 0x00, 0x64, 0x08, 0x00];
        let answer = [0xD0, 0x0A, 0x95, 0x0F, 0x00, 0x64, 0, 0, 0, 1, 0x00];
        assert!(ProtocolStrategy::v1().answers_request(&request, &answer));
    }

    #[test]
    fn test_plain_read_does_not_accept_extended_answer() {
        let request = [0x0D, 0x07, 0x95, 0x0F, 0x00, 0x64, 0x01, 0x00];
        let answer = [0xD0, 0x0A, 0xA1, 0x0F, 0x00, 0x64, 0, 0, 0, 1, 0x00];
        assert!(!ProtocolStrategy::v1().answers_request(&request, &answer));
    }

    #[test]
    fn test_v2_bean_answer_requires_matching_slot() {
        let request = [0x0D, 0x06, 0xBA, 0xF0, 0x03, 0x00, 0x00];
        let same_slot = [0xD0, 0x08, 0xBA, 0xF0, 0x03, 0x00, 0x00, 0x00, 0x00];
        let other_slot = [0xD0, 0x08, 0xBA, 0xF0, 0x04, 0x00, 0x00, 0x00, 0x00];

        let strategy = ProtocolStrategy::v2_ble();
        assert!(strategy.answers_request(&request, &same_slot));
        assert!(!strategy.answers_request(&request, &other_slot));
    }

    #[test]
    fn test_v1_ignores_bean_slot_rule() {
        let request = [0x0D, 0x06, 0xBA, 0xF0, 0x03, 0x00];
        let other_slot = [0xD0, 0x08, 0xBA, 0xF0, 0x04, 0x00, 0x00, 0x00];
        assert!(ProtocolStrategy::v1().answers_request(&request, &other_slot));
    }

    #[test]
    fn test_short_frames_never_correlate() {
        assert!(!ProtocolStrategy::v1().answers_request(&[0x0D, 0x04], &[0xD0, 0x04, 0x60]));
        assert!(!ProtocolStrategy::v1().answers_request(&[0x0D, 0x04, 0x60], &[]));
    }

    #[test]
    fn test_only_ble_chunks_and_retries_mismatches() {
        assert!(ProtocolStrategy::v1().chunks_requests());
        assert!(ProtocolStrategy::v2_ble().retries_mismatches());
        assert!(!ProtocolStrategy::v2_wifi().chunks_requests());
        assert!(!ProtocolStrategy::v2_wifi().retries_mismatches());
    }
}
