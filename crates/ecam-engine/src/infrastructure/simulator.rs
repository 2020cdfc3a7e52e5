//! In-memory machine that answers monitor and parameter requests.
//!
//! Used by the `ecam-sim` binary and the integration tests.  The machine
//! walks through a short power-on sequence as it is polled: a few monitor
//! answers in stand-by, then turning on with rising progress, then ready.
//! Parameters live in a map and default to zero.  Anything else gets a busy
//! answer, which exercises the engine's retry path.

use std::collections::HashMap;

use ecam_core::domain::MachineState;
use ecam_core::protocol::{
    FrameReassembler, FrameWriter, MessageId, ProtocolStrategy, ANSWER_HEADER, ID_INDEX,
    SUB_ID_READ, SUB_ID_WRITE,
};
use tracing::debug;

const STANDBY_POLLS: u32 = 3;
const TURNING_ON_POLLS: u32 = 5;

/// Simulated machine state.
#[derive(Debug)]
pub struct SimulatedMachine {
    strategy: ProtocolStrategy,
    reassembler: FrameReassembler,
    parameters: HashMap<u16, u32>,
    polls: u32,
}

impl SimulatedMachine {
    pub fn new(strategy: ProtocolStrategy) -> Self {
        Self {
            strategy,
            reassembler: FrameReassembler::new(),
            parameters: HashMap::new(),
            polls: 0,
        }
    }

    /// Presets a parameter register.
    pub fn set_parameter(&mut self, address: u16, value: u32) {
        self.parameters.insert(address, value);
    }

    /// Feeds one written packet; returns the answer once a whole request has
    /// arrived.
    pub fn receive(&mut self, packet: &[u8]) -> Option<Vec<u8>> {
        let request = self.reassembler.feed(packet)?;
        Some(self.answer(&request))
    }

    /// Builds the answer to one complete request.
    pub fn answer(&mut self, request: &[u8]) -> Vec<u8> {
        let id = request.get(ID_INDEX).copied().unwrap_or_default();
        let answer = match MessageId::try_from(id) {
            Ok(MessageId::MonitorData0 | MessageId::MonitorData1 | MessageId::MonitorData2) => {
                self.monitor(id)
            }
            Ok(MessageId::ParameterRead | MessageId::ParameterReadExtended) => {
                self.read_parameters(request)
            }
            Ok(MessageId::ParameterWrite) => self.write_parameter(request),
            _ => None,
        };
        answer.unwrap_or_else(|| {
            debug!(id = format_args!("0x{id:02X}"), "simulator answers busy");
            self.seal(FrameWriter::new(
                self.strategy,
                MessageId::Busy.as_byte(),
                SUB_ID_READ,
            ))
        })
    }

    fn state(&self) -> (MachineState, u8) {
        if self.polls < STANDBY_POLLS {
            (MachineState::StandBy, 0)
        } else if self.polls < STANDBY_POLLS + TURNING_ON_POLLS {
            let step = (self.polls - STANDBY_POLLS) as u8;
            (MachineState::TurningOn, step * 20)
        } else {
            (MachineState::ReadyOrDispensing, 0)
        }
    }

    fn monitor(&mut self, id: u8) -> Option<Vec<u8>> {
        let (state, progress) = self.state();
        self.polls += 1;
        let state = match state {
            MachineState::StandBy => 0,
            MachineState::TurningOn => 1,
            _ => 7,
        };

        let mut w = FrameWriter::new(self.strategy, id, SUB_ID_READ);
        if id == MessageId::MonitorData2.as_byte() {
            // accessory, switches, alarms, state, progress, percentage
            w.extend(&[0, 0, 0, 0, 0, state, progress, progress]);
            w.extend(&[0; 4]);
        } else {
            // alarms, loads, state, progress, model, heater, steamer
            w.extend(&[0, 0, 0, 0, state, progress, 1, 90, 0]);
            w.extend(&[0; 3]);
        }
        Some(self.seal(w))
    }

    fn read_parameters(&self, request: &[u8]) -> Option<Vec<u8>> {
        let address = u16::from_be_bytes([*request.get(4)?, *request.get(5)?]);
        let count = *request.get(6)?;
        let mut w = FrameWriter::new(
            self.strategy,
            MessageId::ParameterRead.as_byte(),
            request.get(3).copied().unwrap_or(SUB_ID_READ),
        );
        w.push_u16(address);
        for i in 0..u16::from(count) {
            let value = self
                .parameters
                .get(&address.wrapping_add(i))
                .copied()
                .unwrap_or_default();
            w.push_u32(value);
        }
        Some(self.seal(w))
    }

    fn write_parameter(&mut self, request: &[u8]) -> Option<Vec<u8>> {
        let address = u16::from_be_bytes([*request.get(4)?, *request.get(5)?]);
        let value = u32::from_be_bytes([
            *request.get(6)?,
            *request.get(7)?,
            *request.get(8)?,
            *request.get(9)?,
        ]);
        self.parameters.insert(address, value);
        let mut w = FrameWriter::new(self.strategy, MessageId::ParameterWrite.as_byte(), SUB_ID_WRITE);
        w.push_u16(address).push(0);
        Some(self.seal(w))
    }

    /// Finishes `w` as an answer frame.
    fn seal(&self, w: FrameWriter) -> Vec<u8> {
        match w.finish() {
            Ok(mut frame) => {
                frame[0] = ANSWER_HEADER;
                self.strategy.seal(&mut frame);
                frame
            }
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecam_core::domain::MonitorBlock;
    use ecam_core::protocol::{build_request, decode, validate_checksum, Command, DecodedEvent};

    fn decode_answer(strategy: &ProtocolStrategy, frame: &[u8]) -> DecodedEvent {
        assert!(validate_checksum(strategy, frame), "answer must be sealed");
        decode(strategy, frame)
            .expect("decodes")
            .expect("known answer")
    }

    #[test]
    fn test_monitor_walks_through_power_on() {
        // Arrange
        let s = ProtocolStrategy::v2_ble();
        let mut sim = SimulatedMachine::new(s);
        let request = build_request(&s, &Command::Monitor(MonitorBlock::Data2)).unwrap();

        // Act
        let states: Vec<_> = (0..10)
            .map(|_| match decode_answer(&s, &sim.answer(&request)) {
                DecodedEvent::MonitorData(snap) => snap.machine_state(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();

        // Assert
        assert_eq!(states[0], Some(MachineState::StandBy));
        assert_eq!(states[STANDBY_POLLS as usize], Some(MachineState::TurningOn));
        assert_eq!(states[9], Some(MachineState::ReadyOrDispensing));
    }

    #[test]
    fn test_parameter_write_then_read() {
        // Arrange
        let s = ProtocolStrategy::v1();
        let mut sim = SimulatedMachine::new(s);
        let write = build_request(
            &s,
            &Command::WriteParameter {
                address: 120,
                value: 0x0102_0304,
            },
        )
        .unwrap();
        let read = build_request(
            &s,
            &Command::ReadParameters {
                address: 120,
                count: 2,
            },
        )
        .unwrap();

        // Act
        let written = decode_answer(&s, &sim.answer(&write));
        let values = decode_answer(&s, &sim.answer(&read));

        // Assert
        assert!(matches!(written, DecodedEvent::ParameterWritten(w) if w.id == 120 && w.success));
        match values {
            DecodedEvent::ParametersRead(p) => {
                assert_eq!(p.len(), 2);
                assert_eq!(p[0].as_u32(), 0x0102_0304);
                assert_eq!(p[1].as_u32(), 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_request_is_answered_busy() {
        let s = ProtocolStrategy::v1();
        let mut sim = SimulatedMachine::new(s);
        let request = build_request(&s, &Command::TurnOn).unwrap();

        let answer = sim.answer(&request);

        assert_eq!(answer[ID_INDEX], 0xE1);
        assert!(validate_checksum(&s, &answer));
    }

    #[test]
    fn test_chunked_request_is_reassembled() {
        let s = ProtocolStrategy::v2_ble();
        let mut sim = SimulatedMachine::new(s);
        let request = build_request(
            &s,
            &Command::ReadParameters {
                address: 1,
                count: 1,
            },
        )
        .unwrap();

        assert!(sim.receive(&request[..4]).is_none());
        let answer = sim.receive(&request[4..]).expect("complete request");

        assert_eq!(answer[ID_INDEX], 0x95);
    }
}
