//! Answer decoder.
//!
//! [`decode`] turns one complete, checksum-validated answer frame into a
//! typed [`DecodedEvent`].  It matches over a closed set of answer ids;
//! anything else yields `Ok(None)` so the engine can drop it quietly.
//!
//! # Record counts (for beginners)
//!
//! Answers that carry repeated records (parameters, names, quantities) do not
//! state how many records follow.  The count is derived from the frame size:
//!
//! ```text
//! records = (frame_len - header_bytes - checksum_width) / record_width
//! ```
//!
//! where `header_bytes` covers everything in front of the first record.  The
//! same formula works for V1 (1-byte checksum) and V2 (2-byte checksum).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::bean::BeanSystem;
use crate::domain::monitor::{MonitorBlock, MonitorSnapshot};
use crate::domain::names::{ChecksumTriple, NameKind, ProfileNameEntry};
use crate::domain::parameter::{Parameter, ParameterWritten};
use crate::domain::recipe::{Ingredient, IngredientValue, PriorityList, RecipeData, RecipeQuantity};
use crate::protocol::codec::{
    read_array, read_u16, read_u8, require_declared_length, require_len, ProtocolError,
};
use crate::protocol::messages::{MessageId, ID_INDEX};
use crate::protocol::text::{decode_name, BEAN_NAME_WIDTH, NAME_WIDTH};
use crate::protocol::variant::{ProtocolStrategy, ProtocolVariant};

/// Byte of the remote-control answer that reports the mode.
const REMOTE_CONTROL_INDEX: usize = 9;
const REMOTE_CONTROL_ENABLED: u8 = 3;

/// Bytes per V1 recipe quantity record: coffee u16, milk u16, flags.
const QUANTITY_RECORD_WIDTH: usize = 5;

/// Quantity checksums carried by a checksum answer.
const QUANTITY_CHECKSUMS: usize = 6;

/// Everything the decoder can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DecodedEvent {
    ParametersRead(Vec<Parameter>),
    ParameterWritten(ParameterWritten),
    MonitorData(MonitorSnapshot),
    Checksums(ChecksumTriple),
    ProfileNames(Vec<ProfileNameEntry>),
    RecipeNames(Vec<ProfileNameEntry>),
    NamesWritten { kind: NameKind, success: bool },
    /// V1 answer: quantities of a range of beverages for one profile.
    RecipeQuantities {
        profile_id: u8,
        quantities: Vec<RecipeQuantity>,
    },
    /// V2 answer: one beverage with its ingredient list.
    RecipeData(RecipeData),
    RecipePriorities(PriorityList),
    ProfileSelected { profile_id: u8, success: bool },
    TimeSet { success: bool },
    PinSet { success: bool },
    PinActivation { success: bool },
    BeanSystem(BeanSystem),
    BeanSystemSelected { id: u8 },
    BeanSystemWritten { id: u8 },
    /// The machine acknowledged a dispense (or turn-on) request.
    BeverageDispensing { beverage_id: u8 },
    /// V2 statistics counters, laid out like parameters.
    Statistics(Vec<Parameter>),
    RemoteControl { enabled: bool },
}

impl DecodedEvent {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            DecodedEvent::ParametersRead(_) => "parameters read",
            DecodedEvent::ParameterWritten(_) => "parameter written",
            DecodedEvent::MonitorData(_) => "monitor data",
            DecodedEvent::Checksums(_) => "checksums",
            DecodedEvent::ProfileNames(_) => "profile names",
            DecodedEvent::RecipeNames(_) => "recipe names",
            DecodedEvent::NamesWritten { .. } => "names written",
            DecodedEvent::RecipeQuantities { .. } => "recipe quantities",
            DecodedEvent::RecipeData(_) => "recipe data",
            DecodedEvent::RecipePriorities(_) => "recipe priorities",
            DecodedEvent::ProfileSelected { .. } => "profile selected",
            DecodedEvent::TimeSet { .. } => "time set",
            DecodedEvent::PinSet { .. } => "pin set",
            DecodedEvent::PinActivation { .. } => "pin activation",
            DecodedEvent::BeanSystem(_) => "bean system",
            DecodedEvent::BeanSystemSelected { .. } => "bean system selected",
            DecodedEvent::BeanSystemWritten { .. } => "bean system written",
            DecodedEvent::BeverageDispensing { .. } => "beverage dispensing",
            DecodedEvent::Statistics(_) => "statistics",
            DecodedEvent::RemoteControl { .. } => "remote control",
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes one complete answer frame.
///
/// The caller validates the checksum first; this function only checks that
/// the length byte agrees with the slice and that every field it reads is
/// present.
///
/// # Errors
///
/// Returns a [`ProtocolError`] when the frame is truncated or carries
/// values that cannot be represented (an unknown ingredient id, say).
pub fn decode(
    strategy: &ProtocolStrategy,
    frame: &[u8],
) -> Result<Option<DecodedEvent>, ProtocolError> {
    require_declared_length(frame)?;
    let answer_id = read_u8(frame, ID_INDEX)?;

    let Ok(id) = MessageId::try_from(answer_id) else {
        debug!(answer_id = format_args!("0x{answer_id:02X}"), "unknown answer id dropped");
        return Ok(None);
    };

    let event = match id {
        MessageId::ParameterRead | MessageId::ParameterReadExtended => {
            DecodedEvent::ParametersRead(decode_parameters(strategy, frame)?)
        }
        MessageId::StatisticsRead => DecodedEvent::Statistics(decode_parameters(strategy, frame)?),
        MessageId::ParameterWrite => DecodedEvent::ParameterWritten(ParameterWritten {
            id: read_u16(frame, 4)?,
            success: read_u8(frame, 6)? == 0,
        }),
        MessageId::MonitorData0 => monitor(strategy, MonitorBlock::Data0, frame)?,
        MessageId::MonitorData1 => monitor(strategy, MonitorBlock::Data1, frame)?,
        MessageId::MonitorData2 => monitor(strategy, MonitorBlock::Data2, frame)?,
        MessageId::ChecksumVerification => DecodedEvent::Checksums(decode_checksums(frame)?),
        MessageId::ProfileNameRead => DecodedEvent::ProfileNames(decode_names(strategy, frame)?),
        MessageId::RecipeNameRead => DecodedEvent::RecipeNames(decode_names(strategy, frame)?),
        MessageId::ProfileNameWrite => DecodedEvent::NamesWritten {
            kind: NameKind::Profile,
            success: read_u8(frame, 4)? == 0,
        },
        MessageId::RecipeNameWrite => DecodedEvent::NamesWritten {
            kind: NameKind::Recipe,
            success: read_u8(frame, 4)? == 0,
        },
        MessageId::RecipeQuantityRead => match strategy.variant {
            ProtocolVariant::V1 => decode_quantities(strategy, frame)?,
            ProtocolVariant::V2 => DecodedEvent::RecipeData(decode_recipe(strategy, frame)?),
        },
        MessageId::RecipePriorityRead => {
            DecodedEvent::RecipePriorities(decode_priorities(strategy, frame)?)
        }
        MessageId::ProfileSelection => DecodedEvent::ProfileSelected {
            profile_id: read_u8(frame, 4)?,
            success: read_u8(frame, 5)? == 0,
        },
        MessageId::SetTime => DecodedEvent::TimeSet {
            success: read_u8(frame, 4)? == 0,
        },
        MessageId::PinSet => DecodedEvent::PinSet {
            success: read_u8(frame, 4)? == 0,
        },
        MessageId::PinActivation => DecodedEvent::PinActivation {
            success: read_u8(frame, 4)? == 0,
        },
        MessageId::BeanSystemRead => DecodedEvent::BeanSystem(decode_bean_system(frame)?),
        MessageId::BeanSystemSelect => DecodedEvent::BeanSystemSelected {
            id: read_u8(frame, 4)?,
        },
        MessageId::BeanSystemWrite => DecodedEvent::BeanSystemWritten {
            id: read_u8(frame, 4)?,
        },
        MessageId::BeverageDispensingV1 | MessageId::BeverageDispensingV2 => {
            DecodedEvent::BeverageDispensing {
                beverage_id: read_u8(frame, 4)?,
            }
        }
        MessageId::RemoteControl => DecodedEvent::RemoteControl {
            enabled: read_u8(frame, REMOTE_CONTROL_INDEX)? == REMOTE_CONTROL_ENABLED,
        },
        MessageId::AppControl
        | MessageId::SetFavorite
        | MessageId::PinRead
        | MessageId::Busy => {
            debug!(answer_id = format_args!("0x{answer_id:02X}"), "answer carries no event");
            return Ok(None);
        }
    };
    Ok(Some(event))
}

// ── Record decoders ───────────────────────────────────────────────────────────

/// Number of `width`-byte records between `offset` and the checksum.
fn record_count(strategy: &ProtocolStrategy, frame: &[u8], offset: usize, width: usize) -> usize {
    let end = frame.len().saturating_sub(strategy.checksum().width());
    end.saturating_sub(offset) / width
}

/// Payload bytes between `offset` and the checksum.
fn payload<'a>(strategy: &ProtocolStrategy, frame: &'a [u8], offset: usize) -> &'a [u8] {
    let end = frame.len().saturating_sub(strategy.checksum().width());
    frame.get(offset..end).unwrap_or_default()
}

fn monitor(
    strategy: &ProtocolStrategy,
    block: MonitorBlock,
    frame: &[u8],
) -> Result<DecodedEvent, ProtocolError> {
    require_len(frame, 4 + strategy.checksum().width(), "monitor data")?;
    Ok(DecodedEvent::MonitorData(MonitorSnapshot::new(
        strategy.variant,
        block,
        frame.to_vec(),
    )))
}

/// `[first id:u16][value:4]...`; ids increment from the first one.
fn decode_parameters(
    strategy: &ProtocolStrategy,
    frame: &[u8],
) -> Result<Vec<Parameter>, ProtocolError> {
    let first = read_u16(frame, 4)?;
    let count = record_count(strategy, frame, 6, 4);
    (0..count)
        .map(|i| {
            let value = read_array::<4>(frame, 6 + i * 4)?;
            Ok(Parameter::new(first.wrapping_add(i as u16), value))
        })
        .collect()
}

fn decode_checksums(frame: &[u8]) -> Result<ChecksumTriple, ProtocolError> {
    require_len(frame, 20, "checksum answer")?;
    let quantities = (0..QUANTITY_CHECKSUMS)
        .map(|i| read_u16(frame, 4 + i * 2))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ChecksumTriple {
        names: read_u16(frame, 18)?,
        recipes: read_u16(frame, 16)?,
        quantities,
    })
}

fn decode_names(
    strategy: &ProtocolStrategy,
    frame: &[u8],
) -> Result<Vec<ProfileNameEntry>, ProtocolError> {
    let offset = strategy.name_records_offset();
    let width = strategy.name_record_width();
    let with_mug = width > NAME_WIDTH + 1;
    let count = record_count(strategy, frame, offset, width);

    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let start = offset + i * width;
        let block = frame
            .get(start..start + NAME_WIDTH)
            .ok_or(ProtocolError::InsufficientData {
                needed: start + NAME_WIDTH,
                available: frame.len(),
            })?;
        entries.push(ProfileNameEntry {
            name: decode_name(block),
            icon: read_u8(frame, start + NAME_WIDTH)?,
            mug: if with_mug {
                Some(read_u8(frame, start + NAME_WIDTH + 1)?)
            } else {
                None
            },
        });
    }
    Ok(entries)
}

/// V1: `[profile][coffee:u16][milk:u16][flags]...`.  Records are numbered
/// from beverage 1.
fn decode_quantities(
    strategy: &ProtocolStrategy,
    frame: &[u8],
) -> Result<DecodedEvent, ProtocolError> {
    let profile_id = read_u8(frame, 4)?;
    let count = record_count(strategy, frame, 5, QUANTITY_RECORD_WIDTH);
    let quantities = (0..count)
        .map(|i| {
            let at = 5 + i * QUANTITY_RECORD_WIDTH;
            let flags = read_u8(frame, at + 4)?;
            Ok(RecipeQuantity {
                beverage_id: (i + 1) as u8,
                coffee_qty: read_u16(frame, at)?,
                milk_qty: read_u16(frame, at + 2)?,
                taste: flags & 0xF0,
                inversion: flags & 0x04 != 0,
            })
        })
        .collect::<Result<Vec<_>, ProtocolError>>()?;
    Ok(DecodedEvent::RecipeQuantities {
        profile_id,
        quantities,
    })
}

/// V2: `[profile][beverage]([ingredient][value:1|2])...`.  A repeated
/// ingredient overwrites the earlier value.
fn decode_recipe(strategy: &ProtocolStrategy, frame: &[u8]) -> Result<RecipeData, ProtocolError> {
    let profile_id = read_u8(frame, 4)?;
    let beverage_id = read_u8(frame, 5)?;
    let body = payload(strategy, frame, 6);

    let mut ingredients: Vec<IngredientValue> = Vec::new();
    let mut pos = 0;
    while pos < body.len() {
        let raw_id = body[pos];
        let ingredient = Ingredient::try_from(raw_id).map_err(|_| {
            ProtocolError::MalformedPayload(format!("unknown ingredient id {raw_id}"))
        })?;
        let width = ingredient.value_width();
        let value = match body.get(pos + 1..pos + 1 + width) {
            Some([hi, lo]) => u16::from_be_bytes([*hi, *lo]),
            Some([v]) => u16::from(*v),
            _ => {
                return Err(ProtocolError::MalformedPayload(format!(
                    "ingredient {raw_id} is missing its value"
                )))
            }
        };
        match ingredients.iter_mut().find(|iv| iv.ingredient == ingredient) {
            Some(existing) => existing.value = value,
            None => ingredients.push(IngredientValue::new(ingredient, value)),
        }
        pos += 1 + width;
    }

    Ok(RecipeData {
        profile_id,
        beverage_id,
        ingredients,
    })
}

fn decode_priorities(
    strategy: &ProtocolStrategy,
    frame: &[u8],
) -> Result<PriorityList, ProtocolError> {
    Ok(PriorityList {
        profile_id: read_u8(frame, 4)?,
        beverages: payload(strategy, frame, 5).to_vec(),
    })
}

/// `[id][name:40][grinder][temperature][aroma][_][hidden][selected]`.
fn decode_bean_system(frame: &[u8]) -> Result<BeanSystem, ProtocolError> {
    require_len(frame, 51, "bean system answer")?;
    Ok(BeanSystem {
        id: frame[4],
        name: decode_name(&frame[5..5 + BEAN_NAME_WIDTH]),
        grinder: frame[45],
        temperature: frame[46],
        aroma: frame[47],
        enabled: frame[49] != 1,
        selected: frame[50] != 0,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
