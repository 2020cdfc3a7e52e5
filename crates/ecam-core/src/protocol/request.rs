//! Request builders.
//!
//! Every command the application can send is a [`Command`] value.
//! [`build_request`] turns it into a sealed frame for the session's
//! [`ProtocolStrategy`], and [`Command::default_priority`] says how urgently
//! it should be queued.
//!
//! # Example
//!
//! ```rust
//! use ecam_core::protocol::{build_request, validate_checksum, Command, ProtocolStrategy};
//!
//! let strategy = ProtocolStrategy::v1();
//! let frame = build_request(&strategy, &Command::ReadParameters { address: 100, count: 3 }).unwrap();
//! assert_eq!(frame[1] as usize, frame.len() - 1);
//! assert!(validate_checksum(&strategy, &frame));
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::bean::BeanSystemUpdate;
use crate::domain::monitor::MonitorBlock;
use crate::domain::names::{NameKind, NameRecord};
use crate::domain::parameter::{
    EXTENDED_ADDRESS_BASE, MAX_PARAMETERS_PER_READ, PLAIN_READ_LIMIT,
};
use crate::domain::recipe::{DispenseV1, DispenseV2};
use crate::protocol::codec::{FrameWriter, ProtocolError};
use crate::protocol::messages::{MessageId, ID_INDEX, SUB_ID_READ, SUB_ID_WRITE};
use crate::protocol::text::{encode_name, BEAN_NAME_WIDTH, NAME_WIDTH};
use crate::protocol::variant::{ProtocolStrategy, ProtocolVariant};

/// Length of a favourite-beverages block.
pub const FAVORITES_LEN: usize = 12;

/// Dispatch priority; lower values are sent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Priority {
    High = 1,
    Normal = 2,
    Low = 3,
}

/// A built frame waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub payload: Vec<u8>,
    pub priority: Priority,
}

impl Request {
    pub fn new(payload: Vec<u8>, priority: Priority) -> Self {
        Self { payload, priority }
    }

    /// Command byte of the frame, reported back on terminal failures.
    pub fn command_byte(&self) -> u8 {
        self.payload.get(ID_INDEX).copied().unwrap_or_default()
    }
}

/// Every command the codec can build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Poll one monitor data block.
    Monitor(MonitorBlock),
    /// Read `count` consecutive registers starting at `address` (at most 10).
    ReadParameters { address: u16, count: u8 },
    WriteParameter { address: u16, value: u32 },
    /// Ask for the names / recipes checksums.
    ChecksumVerification,
    ReadNames { kind: NameKind, first: u8, last: u8 },
    /// Overwrite consecutive name slots starting at `first`.
    WriteNames {
        kind: NameKind,
        first: u8,
        records: Vec<NameRecord>,
    },
    /// V1: quantities of beverages `first..=last` for a profile.
    ReadRecipeQuantities { profile: u8, first: u8, last: u8 },
    /// V2: the full ingredient list of one beverage for a profile.
    ReadRecipe { profile: u8, beverage: u8 },
    ReadRecipePriorities { profile: u8 },
    SelectProfile { profile: u8 },
    TurnOn,
    PinActivation { enabled: bool },
    /// The first four characters of `pin` are sent.
    SetPin { pin: String },
    SetTime { hour: u8, minute: u8 },
    DispenseV1(DispenseV1),
    DispenseV2(DispenseV2),
    /// V2 statistics counters; answered like a parameter read.
    ReadStatistics { address: u16, count: u8 },
    ReadBeanSystem { index: u8 },
    WriteBeanSystem(BeanSystemUpdate),
    SelectBeanSystem { id: u8 },
    /// V2: re-register the application id with the machine.
    RefreshAppId,
    SetFavorites {
        profile: u8,
        favorites: [u8; FAVORITES_LEN],
    },
}

impl Command {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Monitor(_) => "monitor",
            Command::ReadParameters { .. } => "read parameters",
            Command::WriteParameter { .. } => "write parameter",
            Command::ChecksumVerification => "checksum verification",
            Command::ReadNames { .. } => "read names",
            Command::WriteNames { .. } => "write names",
            Command::ReadRecipeQuantities { .. } => "read recipe quantities",
            Command::ReadRecipe { .. } => "read recipe",
            Command::ReadRecipePriorities { .. } => "read recipe priorities",
            Command::SelectProfile { .. } => "select profile",
            Command::TurnOn => "turn on",
            Command::PinActivation { .. } => "pin activation",
            Command::SetPin { .. } => "set pin",
            Command::SetTime { .. } => "set time",
            Command::DispenseV1(_) => "dispense (v1)",
            Command::DispenseV2(_) => "dispense (v2)",
            Command::ReadStatistics { .. } => "read statistics",
            Command::ReadBeanSystem { .. } => "read bean system",
            Command::WriteBeanSystem(_) => "write bean system",
            Command::SelectBeanSystem { .. } => "select bean system",
            Command::RefreshAppId => "refresh app id",
            Command::SetFavorites { .. } => "set favorites",
        }
    }

    /// Queue priority the command is sent with.
    pub fn default_priority(&self) -> Priority {
        match self {
            Command::ReadRecipePriorities { .. }
            | Command::WriteBeanSystem(_)
            | Command::SelectBeanSystem { .. } => Priority::High,
            _ => Priority::Normal,
        }
    }

    /// Protocol generation the command is restricted to, if any.
    fn required_variant(&self) -> Option<ProtocolVariant> {
        match self {
            Command::ReadRecipeQuantities { .. } | Command::DispenseV1(_) => {
                Some(ProtocolVariant::V1)
            }
            Command::ReadRecipe { .. }
            | Command::DispenseV2(_)
            | Command::ReadStatistics { .. }
            | Command::ReadBeanSystem { .. }
            | Command::WriteBeanSystem(_)
            | Command::SelectBeanSystem { .. }
            | Command::RefreshAppId
            | Command::SetFavorites { .. } => Some(ProtocolVariant::V2),
            _ => None,
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Builds the sealed frame for `command`.
///
/// # Errors
///
/// - [`ProtocolError::UnsupportedCommand`] if the command does not exist on
///   the strategy's protocol generation.
/// - [`ProtocolError::InvalidInput`] for out-of-range arguments.
pub fn build_request(
    strategy: &ProtocolStrategy,
    command: &Command,
) -> Result<Vec<u8>, ProtocolError> {
    if let Some(required) = command.required_variant() {
        if required != strategy.variant {
            return Err(ProtocolError::UnsupportedCommand {
                command: command.name(),
                variant: strategy.variant,
            });
        }
    }

    let s = *strategy;
    match command {
        Command::Monitor(block) => {
            let id = match block {
                MonitorBlock::Data0 => MessageId::MonitorData0,
                MonitorBlock::Data1 => MessageId::MonitorData1,
                MonitorBlock::Data2 => MessageId::MonitorData2,
            };
            FrameWriter::new(s, id.as_byte(), SUB_ID_READ).finish()
        }
        Command::ReadParameters { address, count } => read_parameters(s, *address, *count),
        Command::WriteParameter { address, value } => {
            let mut w = FrameWriter::new(
                s,
                MessageId::ParameterWrite.as_byte(),
                address_sub_id(*address),
            );
            w.push_u16(*address).push_u32(*value);
            w.finish()
        }
        Command::ChecksumVerification => {
            FrameWriter::new(s, MessageId::ChecksumVerification.as_byte(), SUB_ID_WRITE).finish()
        }
        Command::ReadNames { kind, first, last } => {
            if first > last {
                return Err(ProtocolError::InvalidInput(format!(
                    "name range {first}..={last} is empty"
                )));
            }
            let id = match kind {
                NameKind::Profile => MessageId::ProfileNameRead,
                NameKind::Recipe => MessageId::RecipeNameRead,
            };
            let mut w = FrameWriter::new(s, id.as_byte(), SUB_ID_WRITE);
            w.push(*first).push(*last);
            w.finish()
        }
        Command::WriteNames {
            kind,
            first,
            records,
        } => write_names(s, *kind, *first, records),
        Command::ReadRecipeQuantities {
            profile,
            first,
            last,
        } => {
            let mut w = FrameWriter::new(s, MessageId::RecipeQuantityRead.as_byte(), SUB_ID_WRITE);
            w.push(*profile).push(*first).push(*last);
            w.finish()
        }
        Command::ReadRecipe { profile, beverage } => {
            let mut w = FrameWriter::new(s, MessageId::RecipeQuantityRead.as_byte(), SUB_ID_WRITE);
            w.push(*profile).push(*beverage);
            w.finish()
        }
        Command::ReadRecipePriorities { profile } => {
            single_byte(s, MessageId::RecipePriorityRead, *profile)
        }
        Command::SelectProfile { profile } => single_byte(s, MessageId::ProfileSelection, *profile),
        Command::TurnOn => match s.variant {
            ProtocolVariant::V1 => {
                let mut w =
                    FrameWriter::new(s, MessageId::BeverageDispensingV1.as_byte(), SUB_ID_READ);
                w.extend(&[0x28, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);
                w.finish()
            }
            ProtocolVariant::V2 => app_control(s, [0x02, 0x01]),
        },
        Command::RefreshAppId => app_control(s, [0x03, 0x02]),
        Command::PinActivation { enabled } => {
            single_byte(s, MessageId::PinActivation, u8::from(*enabled))
        }
        Command::SetPin { pin } => {
            let digits: Vec<u8> = pin.chars().take(4).map(|c| c as u32 as u8).collect();
            if digits.len() < 4 || !pin.chars().take(4).all(|c| c.is_ascii()) {
                return Err(ProtocolError::InvalidInput(
                    "PIN needs at least four ASCII characters".into(),
                ));
            }
            let mut w = FrameWriter::new(s, MessageId::PinSet.as_byte(), SUB_ID_WRITE);
            w.extend(&digits);
            w.finish()
        }
        Command::SetTime { hour, minute } => {
            if *hour > 23 || *minute > 59 {
                return Err(ProtocolError::InvalidInput(format!(
                    "{hour:02}:{minute:02} is not a valid time of day"
                )));
            }
            let mut w = FrameWriter::new(s, MessageId::SetTime.as_byte(), SUB_ID_WRITE);
            w.push(*hour).push(*minute);
            w.finish()
        }
        Command::DispenseV1(d) => {
            let mut w =
                FrameWriter::new(s, MessageId::BeverageDispensingV1.as_byte(), SUB_ID_WRITE);
            w.push(d.beverage_id)
                .push(d.trigger as u8)
                .push_u16(d.coffee_qty)
                .push_u16(d.milk_qty)
                .push(d.taste_type as u8 ^ d.taste_value);
            w.finish()
        }
        Command::DispenseV2(d) => dispense_v2(s, d),
        Command::ReadStatistics { address, count } => {
            if *count == 0 {
                return Err(ProtocolError::InvalidInput("statistics count is zero".into()));
            }
            let mut w = FrameWriter::new(s, MessageId::StatisticsRead.as_byte(), SUB_ID_READ);
            w.push_u16(*address).push(*count);
            w.finish()
        }
        Command::ReadBeanSystem { index } => single_byte(s, MessageId::BeanSystemRead, *index),
        Command::WriteBeanSystem(update) => write_bean_system(s, update),
        Command::SelectBeanSystem { id } => single_byte(s, MessageId::BeanSystemSelect, *id),
        Command::SetFavorites { profile, favorites } => {
            let mut w = FrameWriter::new(s, MessageId::SetFavorite.as_byte(), SUB_ID_WRITE);
            w.push(*profile).extend(favorites);
            w.finish()
        }
    }
}

/// Builds `command` and pairs it with its default priority.
///
/// # Errors
///
/// See [`build_request`].
pub fn build_queued_request(
    strategy: &ProtocolStrategy,
    command: &Command,
) -> Result<Request, ProtocolError> {
    Ok(Request::new(
        build_request(strategy, command)?,
        command.default_priority(),
    ))
}

// ── Builders ──────────────────────────────────────────────────────────────────

fn address_sub_id(address: u16) -> u8 {
    if address < EXTENDED_ADDRESS_BASE {
        SUB_ID_READ
    } else {
        SUB_ID_WRITE
    }
}

fn single_byte(s: ProtocolStrategy, id: MessageId, value: u8) -> Result<Vec<u8>, ProtocolError> {
    let mut w = FrameWriter::new(s, id.as_byte(), SUB_ID_WRITE);
    w.push(value);
    w.finish()
}

fn app_control(s: ProtocolStrategy, body: [u8; 2]) -> Result<Vec<u8>, ProtocolError> {
    let mut w = FrameWriter::new(s, MessageId::AppControl.as_byte(), SUB_ID_READ);
    w.extend(&body);
    w.finish()
}

fn read_parameters(s: ProtocolStrategy, address: u16, count: u8) -> Result<Vec<u8>, ProtocolError> {
    if count == 0 {
        return Err(ProtocolError::InvalidInput("parameter count is zero".into()));
    }
    let count = count.min(MAX_PARAMETERS_PER_READ);
    let id = if count > PLAIN_READ_LIMIT {
        MessageId::ParameterReadExtended
    } else {
        MessageId::ParameterRead
    };
    let mut w = FrameWriter::new(s, id.as_byte(), address_sub_id(address));
    w.push_u16(address).push(count);
    w.finish()
}

fn write_names(
    s: ProtocolStrategy,
    kind: NameKind,
    first: u8,
    records: &[NameRecord],
) -> Result<Vec<u8>, ProtocolError> {
    if records.is_empty() {
        return Err(ProtocolError::InvalidInput("no names to write".into()));
    }
    let last = u8::try_from(usize::from(first) + records.len() - 1).map_err(|_| {
        ProtocolError::InvalidInput(format!(
            "{} names starting at slot {first} overflow the slot range",
            records.len()
        ))
    })?;
    let id = match kind {
        NameKind::Profile => MessageId::ProfileNameWrite,
        NameKind::Recipe => MessageId::RecipeNameWrite,
    };
    let with_mug = s.name_record_width() > NAME_WIDTH + 1;

    let mut w = FrameWriter::new(s, id.as_byte(), SUB_ID_WRITE);
    w.push(first).push(last);
    for record in records {
        w.extend(&encode_name(&record.name, NAME_WIDTH)).push(record.icon);
        if with_mug {
            w.push(record.mug.unwrap_or_default());
        }
    }
    w.finish()
}

fn dispense_v2(s: ProtocolStrategy, d: &DispenseV2) -> Result<Vec<u8>, ProtocolError> {
    if d.profile_id > 0x3F {
        return Err(ProtocolError::InvalidInput(format!(
            "profile {} does not fit the six profile bits",
            d.profile_id
        )));
    }
    let trigger = if d.save {
        d.trigger as u8 | 0x80
    } else {
        d.trigger as u8
    };
    let mut body = Vec::with_capacity(d.ingredients.len() * 3);
    for iv in d.wire_ingredients() {
        iv.encode_into(&mut body);
    }

    let mut w = FrameWriter::new(s, MessageId::BeverageDispensingV2.as_byte(), SUB_ID_WRITE);
    w.push(d.beverage_id)
        .push(trigger)
        .extend(&body)
        .push((d.profile_id << 2) | d.taste_type as u8);
    w.finish()
}

fn write_bean_system(s: ProtocolStrategy, u: &BeanSystemUpdate) -> Result<Vec<u8>, ProtocolError> {
    let grinder = if s.striker {
        u.grinder.saturating_mul(2)
    } else {
        u.grinder
    };
    let mut w = FrameWriter::new(s, MessageId::BeanSystemWrite.as_byte(), SUB_ID_WRITE);
    w.push(u.id)
        .extend(&encode_name(&u.name, BEAN_NAME_WIDTH))
        .push(grinder)
        .push(u.temperature)
        .push(u.aroma)
        .push(0x00)
        .push(if u.enabled { 0x00 } else { 0x01 });
    w.finish()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
