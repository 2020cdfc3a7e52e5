//! Integration tests for the ecam-core codec.
//!
//! These tests drive the public API end to end: every buildable command is
//! sealed and validated for both protocol generations, answers are fed back
//! through the reassembler in fragments, and decoding is checked to be
//! stable.

use ecam_core::{
    domain::{
        bean::BeanSystemUpdate,
        monitor::MonitorBlock,
        names::{NameKind, NameRecord},
        recipe::{
            DispenseV1, DispenseV2, Ingredient, IngredientValue, OperationTrigger, TasteType,
        },
    },
    protocol::{
        build_request, decode, frame_declared_length, validate_checksum, Command, DecodedEvent,
        FrameReassembler, ProtocolError, ProtocolStrategy, ProtocolVariant,
    },
};

fn all_strategies() -> Vec<ProtocolStrategy> {
    vec![
        ProtocolStrategy::v1(),
        ProtocolStrategy::v2_ble(),
        ProtocolStrategy::v2_wifi(),
        ProtocolStrategy::v2_wifi().with_striker(true),
    ]
}

/// One instance of every command the builders know.
fn every_command() -> Vec<Command> {
    vec![
        Command::Monitor(MonitorBlock::Data0),
        Command::Monitor(MonitorBlock::Data1),
        Command::Monitor(MonitorBlock::Data2),
        Command::ReadParameters {
            address: 100,
            count: 3,
        },
        Command::ReadParameters {
            address: 2000,
            count: 8,
        },
        Command::WriteParameter {
            address: 177,
            value: 12,
        },
        Command::ChecksumVerification,
        Command::ReadNames {
            kind: NameKind::Recipe,
            first: 1,
            last: 6,
        },
        Command::WriteNames {
            kind: NameKind::Profile,
            first: 1,
            records: vec![NameRecord::new("Giulia", 2), NameRecord::new("Marco", 5)],
        },
        Command::ReadRecipeQuantities {
            profile: 1,
            first: 1,
            last: 12,
        },
        Command::ReadRecipe {
            profile: 1,
            beverage: 7,
        },
        Command::ReadRecipePriorities { profile: 2 },
        Command::SelectProfile { profile: 3 },
        Command::TurnOn,
        Command::PinActivation { enabled: true },
        Command::SetPin {
            pin: "2468".into(),
        },
        Command::SetTime {
            hour: 23,
            minute: 59,
        },
        Command::DispenseV1(DispenseV1 {
            beverage_id: 1,
            trigger: OperationTrigger::Start,
            coffee_qty: 40,
            milk_qty: 0,
            taste_type: TasteType::Prepare,
            taste_value: 0x10,
        }),
        Command::DispenseV2(DispenseV2 {
            beverage_id: 7,
            profile_id: 1,
            trigger: OperationTrigger::Start,
            ingredients: vec![
                IngredientValue::new(Ingredient::Coffee, 60),
                IngredientValue::new(Ingredient::Milk, 120),
                IngredientValue::new(Ingredient::Temp, 2),
            ],
            taste_type: TasteType::Prepare,
            save: false,
        }),
        Command::ReadStatistics {
            address: 1000,
            count: 4,
        },
        Command::ReadBeanSystem { index: 0 },
        Command::WriteBeanSystem(BeanSystemUpdate {
            id: 1,
            name: "House blend".into(),
            temperature: 2,
            grinder: 4,
            aroma: 3,
            enabled: true,
        }),
        Command::SelectBeanSystem { id: 1 },
        Command::RefreshAppId,
        Command::SetFavorites {
            profile: 1,
            favorites: [1, 2, 3, 7, 0, 0, 0, 0, 0, 0, 0, 0],
        },
    ]
}

#[test]
fn test_every_buildable_command_validates_on_every_strategy() {
    let mut built = 0;
    for strategy in all_strategies() {
        for command in every_command() {
            match build_request(&strategy, &command) {
                Ok(frame) => {
                    built += 1;
                    assert_eq!(frame[0], 0x0D, "{} header", command.name());
                    assert_eq!(
                        frame_declared_length(&frame),
                        Some(frame.len()),
                        "{} length byte",
                        command.name()
                    );
                    assert!(
                        validate_checksum(&strategy, &frame),
                        "{} checksum on {:?}",
                        command.name(),
                        strategy
                    );
                }
                Err(ProtocolError::UnsupportedCommand { variant, .. }) => {
                    assert_eq!(variant, strategy.variant);
                }
                Err(other) => panic!("{} failed unexpectedly: {other}", command.name()),
            }
        }
    }
    assert!(built > every_command().len());
}

#[test]
fn test_v2_only_commands_are_unsupported_on_v1() {
    let v1 = ProtocolStrategy::v1();
    let result = build_request(&v1, &Command::RefreshAppId);

    assert_eq!(
        result,
        Err(ProtocolError::UnsupportedCommand {
            command: "refresh app id",
            variant: ProtocolVariant::V1,
        })
    );
}

#[test]
fn test_answer_fed_in_fragments_decodes_once() {
    // Arrange: a V2 parameter answer with three registers, sealed.
    let strategy = ProtocolStrategy::v2_ble();
    let mut frame = vec![0xD0, 0x00, 0x95, 0x0F, 0x00, 0x64];
    frame.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3]);
    frame.extend_from_slice(&[0, 0]);
    frame[1] = (frame.len() - 1) as u8;
    strategy.seal(&mut frame);
    let mut reassembler = FrameReassembler::new();

    // Act
    let mut completed = Vec::new();
    for fragment in frame.chunks(7) {
        if let Some(done) = reassembler.feed(fragment) {
            completed.push(done);
        }
    }

    // Assert
    assert_eq!(completed.len(), 1);
    let complete = &completed[0];
    assert_eq!(complete, &frame);
    assert!(validate_checksum(&strategy, complete));

    let first = decode(&strategy, complete).expect("decode");
    let second = decode(&strategy, complete).expect("decode again");
    assert_eq!(first, second);
    match first {
        Some(DecodedEvent::ParametersRead(params)) => {
            let ids: Vec<u16> = params.iter().map(|p| p.id).collect();
            assert_eq!(ids, vec![100, 101, 102]);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn test_corrupted_answer_fails_checksum() {
    let strategy = ProtocolStrategy::v1();
    let mut frame = vec![0xD0, 0x05, 0xA9, 0xF0, 0x01, 0x00];
    strategy.seal(&mut frame);

    frame[4] ^= 0x01;

    assert!(!validate_checksum(&strategy, &frame));
}
