//! The options string: the whole game setup as one line of text.
//!
//! The host broadcasts this string whenever anything changes, and every
//! other participant replaces its copy of the setup with what it parses.
//! The format is a sequence of `KEY=value;` fields:
//!
//! ```text
//! US=1;M=00maps/desert;MC=1A2B;MS=4096;SD=42;C=100;SR=0;SC=10000;O=N;S=H...:O:X:...;
//! ```
//!
//! The slot list `S` holds exactly [`MAX_SLOTS`] records separated by `:`:
//!
//! | record | meaning |
//! |--------|---------|
//! | `H<name>,<hex ip>,<port>,<acc><map>,<color>,<template>,<start>,<team>,<nat>` | human |
//! | `C<E\|M\|H>,<color>,<template>,<start>,<team>` | computer |
//! | `O` | open |
//! | `X` | closed |
//!
//! Parsing is all or nothing: the first problem rejects the string and
//! the caller's setup stays as it was.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::str::FromStr;

use lanlobby_protocol::{text, MAX_OPTIONS_LEN};

use crate::{
    GameInfo, GameSlot, MapInfo, OptionsError, SetupError, SetupLimits, SlotIdentity, SlotState,
    MAX_SLOTS,
};

const HEADER_KEYS: [&str; 10] = ["US", "M", "MC", "MS", "SD", "C", "SR", "SC", "O", "S"];

// ---------------------------------------------------------------------------
// Serialize
// ---------------------------------------------------------------------------

/// Renders `game` as an options string.
///
/// The map travels as its directory (see [`MapInfo`]); a path that
/// doesn't follow the map layout travels whole. Human names are
/// shortened so that the string stays within the packet's options field:
/// the fixed part of every record is laid out first, and whatever room is
/// left is shared among the humans in seat order, each getting an equal
/// part of what the earlier ones left over. A name never shrinks below
/// its first character, so a setup that fails [`check_fits`] comes out
/// too long.
pub fn serialize(game: &GameInfo) -> String {
    let layout = Layout::of(game);
    let mut room = MAX_OPTIONS_LEN.saturating_sub(layout.fixed);
    let mut reserved = layout.reserved;
    let mut humans_left = layout.records.iter().filter(|(_, human)| *human).count();

    let mut out = layout.header;
    out.push_str("S=");
    for (slot, (record, human)) in game.slots().iter().zip(&layout.records) {
        if *human {
            let own = first_char_len(slot.name());
            reserved -= own;
            let budget = (room / humans_left).min(room.saturating_sub(reserved));
            let name = fit_name(slot.name(), budget);
            room = room.saturating_sub(name.len());
            humans_left -= 1;
            out.push('H');
            out.push_str(name);
        }
        out.push_str(record);
    }
    out.push(';');
    out
}

/// Length of the shortest options string `game` can be rendered as: every
/// human name cut to its first character.
pub fn min_len(game: &GameInfo) -> usize {
    let layout = Layout::of(game);
    layout.fixed + layout.reserved
}

/// Checks that `game` can be rendered within the packet's options field.
///
/// # Errors
/// [`SetupError::OptionsTooLong`] with the shortest possible length.
pub fn check_fits(game: &GameInfo) -> Result<(), SetupError> {
    let len = min_len(game);
    if len > MAX_OPTIONS_LEN {
        return Err(SetupError::OptionsTooLong {
            len,
            max: MAX_OPTIONS_LEN,
        });
    }
    Ok(())
}

/// Everything in an options string except the human names.
struct Layout {
    header: String,
    /// Each slot's record without its leading `H` and name, and whether
    /// it is a human's.
    records: Vec<(String, bool)>,
    /// Bytes of the string outside the names.
    fixed: usize,
    /// Bytes needed to give every human one character.
    reserved: usize,
}

impl Layout {
    fn of(game: &GameInfo) -> Self {
        let map = game.map();
        let header = format!(
            "US={};M={:02x}{};MC={:X};MS={};SD={};C={};SR={};SC={};O={};",
            game.use_stats,
            map.content_mask,
            map.directory().unwrap_or(&map.path),
            map.crc,
            map.size,
            game.seed,
            game.crc_interval,
            game.superweapon_restriction,
            game.starting_cash,
            if game.old_factions_only { 'Y' } else { 'N' },
        );
        let records: Vec<(String, bool)> = game.slots().iter().map(record_without_name).collect();
        // +3 for `S=` and the closing `;`, +1 per human for the `H`
        let fixed = header.len()
            + 3
            + records
                .iter()
                .map(|(r, human)| r.len() + usize::from(*human))
                .sum::<usize>();
        let reserved = game
            .slots()
            .iter()
            .filter(|s| s.is_human())
            .map(|s| first_char_len(s.name()))
            .sum();
        Self {
            header,
            records,
            fixed,
            reserved,
        }
    }
}

fn record_without_name(slot: &GameSlot) -> (String, bool) {
    match slot.state() {
        SlotState::Human => {
            let identity = slot.identity().cloned().unwrap_or_default();
            let record = format!(
                ",{:X},{},{}{},{},{},{},{},{}:",
                u32::from(identity.ip),
                identity.port,
                flag(slot.is_accepted()),
                flag(slot.has_map()),
                slot.color(),
                slot.player_template(),
                slot.start_position(),
                slot.team(),
                identity.nat_behavior,
            );
            // the leading `H` is written with the name
            (record, true)
        }
        SlotState::EasyAi | SlotState::MediumAi | SlotState::BrutalAi => {
            let level = match slot.state() {
                SlotState::EasyAi => 'E',
                SlotState::MediumAi => 'M',
                _ => 'H',
            };
            let record = format!(
                "C{},{},{},{},{}:",
                level,
                slot.color(),
                slot.player_template(),
                slot.start_position(),
                slot.team(),
            );
            (record, false)
        }
        SlotState::Open => ("O:".to_owned(), false),
        SlotState::Closed => ("X:".to_owned(), false),
    }
}

fn first_char_len(name: &str) -> usize {
    name.chars().next().map_or(0, char::len_utf8)
}

fn fit_name(name: &str, budget: usize) -> &str {
    let fitted = text::truncate_utf8(name, budget);
    if !fitted.is_empty() {
        return fitted;
    }
    match name.chars().next() {
        Some(first) => &name[..first.len_utf8()],
        None => name,
    }
}

fn flag(value: bool) -> char {
    if value { 'T' } else { 'F' }
}

// ---------------------------------------------------------------------------
// Parse
// ---------------------------------------------------------------------------

/// Parses an options string into a detached [`GameInfo`].
///
/// The result carries only what the string carries; commit it with
/// [`GameInfo::apply_options`].
///
/// # Errors
/// An [`OptionsError`] for the first problem found: an empty value, an
/// unknown or missing key, a malformed number, a malformed slot record,
/// the wrong number of slots, or a pick that is out of range or clashes
/// with another slot.
pub fn parse(options: &str, limits: &SetupLimits) -> Result<GameInfo, OptionsError> {
    let mut fields: HashMap<&str, &str> = HashMap::new();
    for field in options.split(';').filter(|f| !f.is_empty()) {
        let (key, value) = field.split_once('=').unwrap_or((field, ""));
        if !HEADER_KEYS.contains(&key) {
            return Err(OptionsError::UnknownKey(key.to_owned()));
        }
        if value.is_empty() {
            return Err(OptionsError::EmptyValue(key.to_owned()));
        }
        fields.insert(key, value);
    }
    let get = |key: &'static str| fields.get(key).copied().ok_or(OptionsError::MissingKey(key));

    let mut game = GameInfo::new();
    game.use_stats = number("US", get("US")?)?;
    game.set_map(parse_map(get("M")?, get("MC")?, get("MS")?)?);
    game.seed = number("SD", get("SD")?)?;
    game.crc_interval = number("C", get("C")?)?;
    game.superweapon_restriction = number("SR", get("SR")?)?;
    game.starting_cash = number("SC", get("SC")?)?;
    game.old_factions_only = match get("O")? {
        "Y" => true,
        "N" => false,
        other => {
            return Err(OptionsError::BadNumber {
                field: "O",
                value: other.to_owned(),
            });
        }
    };

    let slots = get("S")?;
    let records: Vec<&str> = slots.strip_suffix(':').unwrap_or(slots).split(':').collect();
    if records.len() != MAX_SLOTS {
        return Err(OptionsError::SlotCount(records.len()));
    }
    for (i, record) in records.into_iter().enumerate() {
        let slot = parse_slot(i, record)?;
        game.set_slot(i, slot)
            .map_err(|source| OptionsError::SlotValue { slot: i, source })?;
    }

    game.validate(limits)
        .map_err(|(slot, source)| OptionsError::SlotValue { slot, source })?;
    Ok(game)
}

fn number<T: FromStr>(field: &'static str, value: &str) -> Result<T, OptionsError> {
    value.parse().map_err(|_| OptionsError::BadNumber {
        field,
        value: value.to_owned(),
    })
}

fn hex(field: &'static str, value: &str) -> Result<u32, OptionsError> {
    u32::from_str_radix(value, 16).map_err(|_| OptionsError::BadNumber {
        field,
        value: value.to_owned(),
    })
}

fn parse_map(m: &str, crc: &str, size: &str) -> Result<MapInfo, OptionsError> {
    let (Some(mask), Some(path)) = (m.get(..2), m.get(2..)) else {
        return Err(OptionsError::BadMap(m.to_owned()));
    };
    let content_mask =
        u8::from_str_radix(mask, 16).map_err(|_| OptionsError::BadMap(m.to_owned()))?;
    let path = if path.is_empty() || MapInfo::is_map_file(path) {
        path.to_owned()
    } else {
        MapInfo::path_in_directory(path)
    };
    Ok(MapInfo::new(
        path,
        hex("MC", crc)?,
        number("MS", size)?,
        content_mask,
    ))
}

fn parse_slot(slot: usize, record: &str) -> Result<GameSlot, OptionsError> {
    let bad = |reason: &'static str| OptionsError::BadSlot { slot, reason };
    let mut chars = record.chars();
    let Some(tag) = chars.next() else {
        return Err(bad("empty record"));
    };
    let rest = chars.as_str();

    match tag {
        'O' | 'X' => {
            if !rest.is_empty() {
                return Err(bad("trailing data after open/closed marker"));
            }
            let state = if tag == 'O' { SlotState::Open } else { SlotState::Closed };
            Ok(GameSlot::with_state(state))
        }
        'H' => {
            let parts: Vec<&str> = rest.split(',').collect();
            let [name, ip, port, flags, color, template, start, team, nat] = parts[..] else {
                return Err(bad("human record needs 9 fields"));
            };
            if name.is_empty() {
                return Err(bad("empty player name"));
            }
            let identity = SlotIdentity {
                name: name.to_owned(),
                ip: Ipv4Addr::from(hex("ip", ip)?),
                port: number("port", port)?,
                nat_behavior: number("nat", nat)?,
                ..SlotIdentity::default()
            };
            let mut flags = flags.chars();
            let (Some(accepted), Some(has_map), None) = (flags.next(), flags.next(), flags.next())
            else {
                return Err(bad("accepted field must be two of T/F"));
            };
            let mut slot = GameSlot::human(identity);
            match accepted {
                'T' => slot.set_accept(),
                'F' => slot.unaccept(),
                _ => return Err(bad("accepted field must be two of T/F")),
            }
            match has_map {
                'T' => slot.set_map_availability(true),
                'F' => slot.set_map_availability(false),
                _ => return Err(bad("accepted field must be two of T/F")),
            }
            set_picks(&mut slot, color, template, start, team)?;
            Ok(slot)
        }
        'C' => {
            let parts: Vec<&str> = rest.split(',').collect();
            let [level, color, template, start, team] = parts[..] else {
                return Err(bad("computer record needs 5 fields"));
            };
            let state = match level {
                "E" => SlotState::EasyAi,
                "M" => SlotState::MediumAi,
                "H" => SlotState::BrutalAi,
                _ => return Err(bad("unknown computer difficulty")),
            };
            let mut slot = GameSlot::with_state(state);
            set_picks(&mut slot, color, template, start, team)?;
            Ok(slot)
        }
        _ => Err(bad("unknown slot type")),
    }
}

fn set_picks(
    slot: &mut GameSlot,
    color: &str,
    template: &str,
    start: &str,
    team: &str,
) -> Result<(), OptionsError> {
    slot.set_color(number("color", color)?);
    slot.set_player_template(number("template", template)?);
    slot.set_start_position(number("start", start)?);
    slot.set_team(number("team", team)?);
    Ok(())
}
