//! The replicated game setup: eight slots plus map and match settings.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::{GameSlot, SetupError, SetupLimits, SlotPicks, SlotState, MAX_SLOTS, UNSET};

/// Extension of map files.
pub const MAP_EXTENSION: &str = "map";

/// Which map a game is played on.
///
/// Every map lives in a directory of its own and its file is named after
/// that directory: `maps/tournament desert/tournament desert.map`. The
/// options string carries only the directory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MapInfo {
    /// Portable path of the map file, `/`-separated.
    pub path: String,
    /// Checksum of the map file, as reported by the map cache.
    pub crc: u32,
    /// Size of the map file in bytes.
    pub size: u32,
    /// Which content packs the map needs.
    pub content_mask: u8,
}

impl MapInfo {
    pub fn new(path: impl Into<String>, crc: u32, size: u32, content_mask: u8) -> Self {
        // `;` terminates an options field.
        let path = path.into().replace(';', "_").replace('\\', "/");
        Self {
            path,
            crc,
            size,
            content_mask,
        }
    }

    /// The directory holding the map file, or `None` when the path doesn't
    /// follow the `<dir>/<name>/<name>.map` layout.
    pub fn directory(&self) -> Option<&str> {
        let (dir, file) = self.path.rsplit_once('/')?;
        let stem = file.strip_suffix(MAP_EXTENSION)?.strip_suffix('.')?;
        let name = dir.rsplit('/').next()?;
        (!stem.is_empty() && stem == name).then_some(dir)
    }

    /// Whether `path` names a map file rather than a directory.
    pub fn is_map_file(path: &str) -> bool {
        path.strip_suffix(MAP_EXTENSION)
            .and_then(|rest| rest.strip_suffix('.'))
            .is_some_and(|stem| !stem.is_empty() && !stem.ends_with('/'))
    }

    /// The map file inside `dir`.
    pub fn path_in_directory(dir: &str) -> String {
        let name = dir.rsplit('/').next().unwrap_or(dir);
        format!("{dir}/{name}.{MAP_EXTENSION}")
    }
}

/// Starting cash when nothing else was chosen.
pub const DEFAULT_STARTING_CASH: u32 = 10_000;

/// Frames between simulation CRC checks when nothing else was chosen.
pub const DEFAULT_CRC_INTERVAL: i32 = 100;

/// One game's setup.
///
/// Slot 0 is always the host. Everything except `local_ip`, `in_game` and
/// `in_progress` travels in the options string; those three describe this
/// participant's relationship to the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    slots: [GameSlot; MAX_SLOTS],
    map: MapInfo,
    pub seed: i32,
    pub crc_interval: i32,
    pub use_stats: i32,
    pub superweapon_restriction: u16,
    pub starting_cash: u32,
    pub old_factions_only: bool,
    local_ip: Ipv4Addr,
    in_game: bool,
    in_progress: bool,
}

impl Default for GameInfo {
    fn default() -> Self {
        Self {
            slots: Default::default(),
            map: MapInfo::default(),
            seed: 0,
            crc_interval: DEFAULT_CRC_INTERVAL,
            use_stats: 1,
            superweapon_restriction: 0,
            starting_cash: DEFAULT_STARTING_CASH,
            old_factions_only: false,
            local_ip: Ipv4Addr::UNSPECIFIED,
            in_game: false,
            in_progress: false,
        }
    }
}

impl GameInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to an empty setup. The local address is kept.
    pub fn reset(&mut self) {
        let local_ip = self.local_ip;
        *self = Self::default();
        self.local_ip = local_ip;
    }

    // -----------------------------------------------------------------------
    // Slot access
    // -----------------------------------------------------------------------

    pub fn slots(&self) -> &[GameSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&GameSlot> {
        self.slots.get(index)
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut GameSlot> {
        self.slots.get_mut(index)
    }

    /// Replaces a slot.
    ///
    /// Slot 0 is always treated as accepted and as having the map. Once a
    /// game is entered, slot 0 can't be handed to a different human.
    ///
    /// # Errors
    /// [`SetupError::NoSuchSlot`] for an index past the end,
    /// [`SetupError::HostSlot`] for an attempt to replace the host.
    pub fn set_slot(&mut self, index: usize, mut slot: GameSlot) -> Result<(), SetupError> {
        if index >= MAX_SLOTS {
            return Err(SetupError::NoSuchSlot(index));
        }
        if index == 0 {
            if let Some(host_ip) = self.host_ip() {
                if self.in_game && slot.ip() != Some(host_ip) {
                    return Err(SetupError::HostSlot);
                }
            }
            slot.set_accept();
            slot.set_map_availability(true);
        }
        self.slots[index] = slot;
        Ok(())
    }

    /// Address of the human in slot 0.
    pub fn host_ip(&self) -> Option<Ipv4Addr> {
        self.slots[0].ip()
    }

    pub fn local_ip(&self) -> Ipv4Addr {
        self.local_ip
    }

    pub fn set_local_ip(&mut self, ip: Ipv4Addr) {
        self.local_ip = ip;
    }

    pub fn am_i_host(&self) -> bool {
        self.host_ip() == Some(self.local_ip)
    }

    pub fn local_slot_num(&self) -> Option<usize> {
        self.slot_num_by_ip(self.local_ip)
    }

    pub fn slot_num_by_ip(&self, ip: Ipv4Addr) -> Option<usize> {
        self.slots.iter().position(|s| s.is_human() && s.is_player(ip))
    }

    /// Finds a human by name, ignoring case.
    pub fn slot_num_by_name(&self, name: &str) -> Option<usize> {
        let wanted = name.to_lowercase();
        self.slots
            .iter()
            .position(|s| s.is_human() && s.name().to_lowercase() == wanted)
    }

    pub fn first_open_slot(&self) -> Option<usize> {
        self.slots.iter().position(GameSlot::is_open)
    }

    // -----------------------------------------------------------------------
    // Map
    // -----------------------------------------------------------------------

    pub fn map(&self) -> &MapInfo {
        &self.map
    }

    pub fn set_map(&mut self, map: MapInfo) {
        self.map = MapInfo::new(map.path, map.crc, map.size, map.content_mask);
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub fn enter_game(&mut self) {
        self.in_game = true;
        self.in_progress = false;
    }

    pub fn leave_game(&mut self) {
        self.in_game = false;
        self.in_progress = false;
    }

    /// Freezes the seat list: unfilled seats close and the game runs.
    pub fn start_game(&mut self) {
        self.close_open_slots();
        self.in_progress = true;
    }

    pub fn is_in_game(&self) -> bool {
        self.in_game
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    /// Used for discovered games, whose progress is only known from
    /// announcements.
    pub fn set_in_progress(&mut self, in_progress: bool) {
        self.in_progress = in_progress;
    }

    // -----------------------------------------------------------------------
    // Draft bookkeeping
    // -----------------------------------------------------------------------

    /// The occupied slot (other than `ignore`) holding `color`, if any.
    pub fn is_color_taken(&self, color: i32, ignore: Option<usize>) -> Option<usize> {
        if color == UNSET {
            return None;
        }
        self.slots.iter().enumerate().position(|(i, s)| {
            Some(i) != ignore && s.is_occupied() && s.color() == color
        })
    }

    /// The occupied slot (other than `ignore`) starting at `position`, if any.
    pub fn is_start_position_taken(&self, position: i32, ignore: Option<usize>) -> Option<usize> {
        if position == UNSET {
            return None;
        }
        self.slots.iter().enumerate().position(|(i, s)| {
            Some(i) != ignore && s.is_occupied() && s.start_position() == position
        })
    }

    /// Checks every occupied slot's picks against `limits` and against
    /// each other.
    ///
    /// # Errors
    /// Returns the first out-of-range or duplicated pick found, along with
    /// its slot.
    pub fn validate(&self, limits: &SetupLimits) -> Result<(), (usize, SetupError)> {
        for (i, slot) in self.slots.iter().enumerate() {
            if !slot.is_occupied() {
                continue;
            }
            if !limits.color_in_range(slot.color()) {
                return Err((i, SetupError::ColorOutOfRange(slot.color())));
            }
            if !limits.template_in_range(slot.player_template()) {
                return Err((i, SetupError::TemplateOutOfRange(slot.player_template())));
            }
            if !limits.start_position_in_range(slot.start_position()) {
                return Err((i, SetupError::StartPositionOutOfRange(slot.start_position())));
            }
            if !limits.team_in_range(slot.team()) {
                return Err((i, SetupError::TeamOutOfRange(slot.team())));
            }
            if let Some(holder) = self.is_color_taken(slot.color(), Some(i)) {
                return Err((
                    i,
                    SetupError::ColorTaken {
                        color: slot.color(),
                        holder,
                    },
                ));
            }
            if let Some(holder) = self.is_start_position_taken(slot.start_position(), Some(i)) {
                return Err((
                    i,
                    SetupError::StartPositionTaken {
                        position: slot.start_position(),
                        holder,
                    },
                ));
            }
        }
        Ok(())
    }

    /// Invalidates every agreement except the host's own.
    pub fn reset_accepted(&mut self) {
        self.slots[0].set_accept();
        for slot in &mut self.slots[1..] {
            slot.unaccept();
        }
    }

    /// Opens or closes unoccupied seats so the game offers exactly
    /// `capacity` seats, counting the ones already taken.
    pub fn adjust_slots_for_map(&mut self, capacity: usize) {
        let mut seats = self.slots.iter().filter(|s| s.is_occupied()).count();
        for slot in &mut self.slots {
            if slot.is_occupied() {
                continue;
            }
            let state = if seats < capacity {
                seats += 1;
                SlotState::Open
            } else {
                SlotState::Closed
            };
            if slot.state() != state {
                slot.set_state(state, None);
            }
        }
    }

    pub fn close_open_slots(&mut self) {
        for slot in &mut self.slots {
            if slot.is_open() {
                slot.set_state(SlotState::Closed, None);
            }
        }
    }

    /// Humans and AIs.
    pub fn num_players(&self) -> usize {
        self.slots.iter().filter(|s| s.is_occupied()).count()
    }

    /// Occupied slots that actually play.
    pub fn num_non_observer_players(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.is_occupied() && !s.is_observer())
            .count()
    }

    /// Distinct sides among the players: each team counts once, each
    /// player without a team counts on their own.
    pub fn num_sides(&self) -> usize {
        let mut teams = Vec::new();
        let mut loners = 0;
        for slot in self.slots.iter().filter(|s| s.is_occupied() && !s.is_observer()) {
            if slot.team() == UNSET {
                loners += 1;
            } else if !teams.contains(&slot.team()) {
                teams.push(slot.team());
            }
        }
        teams.len() + loners
    }

    // -----------------------------------------------------------------------
    // Apparent values
    // -----------------------------------------------------------------------

    /// Snapshots every slot's picks for display to non-allies.
    pub fn save_original_picks(&mut self) {
        for slot in &mut self.slots {
            slot.save_original_picks();
        }
    }

    /// Whether the player in `viewer` may see `target`'s real picks.
    pub fn is_ally(&self, viewer: usize, target: usize) -> bool {
        let (Some(v), Some(t)) = (self.slots.get(viewer), self.slots.get(target)) else {
            return false;
        };
        viewer == target || v.is_observer() || (v.team() != UNSET && v.team() == t.team())
    }

    /// The picks of `target` as this participant should see them.
    pub fn apparent_picks(&self, target: usize) -> Option<SlotPicks> {
        let slot = self.slots.get(target)?;
        let ally = self
            .local_slot_num()
            .is_some_and(|viewer| self.is_ally(viewer, target));
        Some(slot.apparent_picks(ally))
    }

    // -----------------------------------------------------------------------
    // Replication
    // -----------------------------------------------------------------------

    /// Adopts a setup received from the host.
    ///
    /// Takes every field the options string carries from `parsed`; keeps
    /// this participant's own relationship to the game, and per-slot data
    /// that only exists locally (login, host name, serial, liveness) for
    /// humans who are still in the same seat.
    pub fn apply_options(&mut self, parsed: GameInfo) {
        let GameInfo {
            slots,
            map,
            seed,
            crc_interval,
            use_stats,
            superweapon_restriction,
            starting_cash,
            old_factions_only,
            ..
        } = parsed;
        for (current, mut incoming) in self.slots.iter_mut().zip(slots) {
            incoming.inherit_local_fields(current);
            *current = incoming;
        }
        self.map = map;
        self.seed = seed;
        self.crc_interval = crc_interval;
        self.use_stats = use_stats;
        self.superweapon_restriction = superweapon_restriction;
        self.starting_cash = starting_cash;
        self.old_factions_only = old_factions_only;
    }
}
