//! One seat in a game.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::{TEMPLATE_OBSERVER, UNSET};

// ---------------------------------------------------------------------------
// SlotState
// ---------------------------------------------------------------------------

/// Who (if anyone) sits in a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SlotState {
    /// Available for a human to join.
    Open,
    /// Not available.
    #[default]
    Closed,
    EasyAi,
    MediumAi,
    BrutalAi,
    Human,
}

impl SlotState {
    pub fn is_ai(self) -> bool {
        matches!(self, Self::EasyAi | Self::MediumAi | Self::BrutalAi)
    }

    /// Human or computer player. Open and closed seats are unoccupied.
    pub fn is_occupied(self) -> bool {
        self == Self::Human || self.is_ai()
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Open => "Open",
            Self::Closed => "Closed",
            Self::EasyAi => "Easy AI",
            Self::MediumAi => "Medium AI",
            Self::BrutalAi => "Brutal AI",
            Self::Human => "Human",
        };
        f.write_str(text)
    }
}

// ---------------------------------------------------------------------------
// Identity and picks
// ---------------------------------------------------------------------------

/// Who a human slot belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotIdentity {
    pub name: String,
    pub ip: Ipv4Addr,
    /// Port the match itself will use once the game starts.
    pub port: u16,
    pub login: String,
    pub host: String,
    /// Only known to the host, never broadcast.
    pub serial: String,
    /// NAT traversal class reported by the player's machine.
    pub nat_behavior: u8,
}

impl Default for SlotIdentity {
    fn default() -> Self {
        Self {
            name: String::new(),
            ip: Ipv4Addr::UNSPECIFIED,
            port: 0,
            login: String::new(),
            host: String::new(),
            serial: String::new(),
            nat_behavior: 0,
        }
    }
}

impl SlotIdentity {
    pub fn new(name: impl Into<String>, ip: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            ip,
            ..Self::default()
        }
    }
}

/// Characters that delimit the options string and can't appear in a name.
const RESERVED: [char; 4] = [',', ':', ';', '='];

/// Replaces options-string delimiters in a player name with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if RESERVED.contains(&c) { '_' } else { c })
        .collect()
}

/// The draft choices of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotPicks {
    pub color: i32,
    pub player_template: i32,
    pub start_position: i32,
}

impl SlotPicks {
    /// Nothing chosen yet.
    pub const UNSET: Self = Self {
        color: UNSET,
        player_template: UNSET,
        start_position: UNSET,
    };
}

impl Default for SlotPicks {
    fn default() -> Self {
        Self::UNSET
    }
}

// ---------------------------------------------------------------------------
// GameSlot
// ---------------------------------------------------------------------------

/// One of the fixed seats in a game.
///
/// A slot carries two copies of its draft picks: `committed` is what the
/// match actually uses, `display_override` is a snapshot taken when the
/// match starts and shown to non-allies in its place. Randomized picks
/// are resolved after the snapshot, so opponents keep seeing "random"
/// while allies see the real faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSlot {
    state: SlotState,
    identity: Option<SlotIdentity>,
    committed: SlotPicks,
    team: i32,
    display_override: Option<SlotPicks>,
    accepted: bool,
    has_map: bool,
    /// Engine-clock milliseconds of the last packet from this slot.
    last_heard: u64,
}

impl Default for GameSlot {
    fn default() -> Self {
        Self {
            state: SlotState::Closed,
            identity: None,
            committed: SlotPicks::UNSET,
            team: UNSET,
            display_override: None,
            accepted: false,
            has_map: true,
            last_heard: 0,
        }
    }
}

impl GameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A human slot for `identity`, with nothing picked.
    pub fn human(identity: SlotIdentity) -> Self {
        let mut slot = Self::new();
        slot.set_state(SlotState::Human, Some(identity));
        slot
    }

    /// An open or closed or AI slot.
    pub fn with_state(state: SlotState) -> Self {
        let mut slot = Self::new();
        slot.set_state(state, None);
        slot
    }

    /// Back to a closed, empty seat.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    /// Changes who sits in the slot.
    ///
    /// Picks and team are cleared unless the slot goes from one AI level
    /// to another. A human slot starts unaccepted; everything else counts
    /// as accepted and as having the map. `identity` is only used for
    /// [`SlotState::Human`]; a human slot without one keeps its previous
    /// identity.
    pub fn set_state(&mut self, state: SlotState, identity: Option<SlotIdentity>) {
        if !(self.state.is_ai() && state.is_ai()) {
            self.committed = SlotPicks::UNSET;
            self.team = UNSET;
        }
        self.display_override = None;

        if state == SlotState::Human {
            let mut identity = identity.or_else(|| self.identity.take()).unwrap_or_default();
            identity.name = sanitize_name(&identity.name);
            self.identity = Some(identity);
            self.accepted = false;
            self.has_map = true;
        } else {
            self.identity = None;
            self.accepted = true;
            self.has_map = true;
        }
        self.state = state;
    }

    pub fn is_human(&self) -> bool {
        self.state == SlotState::Human
    }

    pub fn is_ai(&self) -> bool {
        self.state.is_ai()
    }

    pub fn is_occupied(&self) -> bool {
        self.state.is_occupied()
    }

    pub fn is_open(&self) -> bool {
        self.state == SlotState::Open
    }

    pub fn identity(&self) -> Option<&SlotIdentity> {
        self.identity.as_ref()
    }

    pub fn identity_mut(&mut self) -> Option<&mut SlotIdentity> {
        self.identity.as_mut()
    }

    /// The human's name, or an empty string.
    pub fn name(&self) -> &str {
        self.identity.as_ref().map_or("", |id| id.name.as_str())
    }

    /// What a slot list should show for this seat.
    pub fn display_name(&self) -> String {
        match &self.identity {
            Some(id) => id.name.clone(),
            None => self.state.to_string(),
        }
    }

    pub fn ip(&self) -> Option<Ipv4Addr> {
        self.identity.as_ref().map(|id| id.ip)
    }

    /// Whether this is the human at `ip`.
    pub fn is_player(&self, ip: Ipv4Addr) -> bool {
        self.ip() == Some(ip)
    }

    // --- picks -------------------------------------------------------------

    pub fn picks(&self) -> SlotPicks {
        self.committed
    }

    pub fn color(&self) -> i32 {
        self.committed.color
    }

    pub fn set_color(&mut self, color: i32) {
        self.committed.color = color;
    }

    pub fn player_template(&self) -> i32 {
        self.committed.player_template
    }

    pub fn set_player_template(&mut self, template: i32) {
        self.committed.player_template = template;
    }

    pub fn start_position(&self) -> i32 {
        self.committed.start_position
    }

    pub fn set_start_position(&mut self, position: i32) {
        self.committed.start_position = position;
    }

    pub fn team(&self) -> i32 {
        self.team
    }

    pub fn set_team(&mut self, team: i32) {
        self.team = team;
    }

    pub fn is_observer(&self) -> bool {
        self.committed.player_template == TEMPLATE_OBSERVER
    }

    pub fn nat_behavior(&self) -> u8 {
        self.identity.as_ref().map_or(0, |id| id.nat_behavior)
    }

    // --- acceptance and map ------------------------------------------------

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    pub fn set_accept(&mut self) {
        self.accepted = true;
    }

    /// Clears the accepted flag. Only humans can be unaccepted.
    pub fn unaccept(&mut self) {
        if self.is_human() {
            self.accepted = false;
        }
    }

    pub fn has_map(&self) -> bool {
        self.has_map
    }

    /// Records whether the player has the map. Only meaningful for humans.
    pub fn set_map_availability(&mut self, has_map: bool) {
        if self.is_human() {
            self.has_map = has_map;
        }
    }

    // --- liveness ----------------------------------------------------------

    pub fn last_heard(&self) -> u64 {
        self.last_heard
    }

    pub fn set_last_heard(&mut self, now_ms: u64) {
        self.last_heard = now_ms;
    }

    // --- apparent picks ----------------------------------------------------

    /// Snapshots the committed picks for display to non-allies.
    pub fn save_original_picks(&mut self) {
        self.display_override = Some(self.committed);
    }

    pub fn display_override(&self) -> Option<SlotPicks> {
        self.display_override
    }

    /// The picks a viewer gets to see.
    pub fn apparent_picks(&self, viewer_is_ally: bool) -> SlotPicks {
        match self.display_override {
            Some(shown) if !viewer_is_ally => shown,
            _ => self.committed,
        }
    }

    /// Carries fields that aren't part of the options string over from the
    /// previous occupant, when it's the same human.
    pub(crate) fn inherit_local_fields(&mut self, previous: &GameSlot) {
        let (Some(mine), Some(theirs)) = (self.identity.as_mut(), previous.identity.as_ref()) else {
            return;
        };
        if mine.ip != theirs.ip {
            return;
        }
        if mine.login.is_empty() {
            mine.login.clone_from(&theirs.login);
        }
        if mine.host.is_empty() {
            mine.host.clone_from(&theirs.host);
        }
        if mine.serial.is_empty() {
            mine.serial.clone_from(&theirs.serial);
        }
        self.last_heard = previous.last_heard;
        if self.display_override.is_none() {
            self.display_override = previous.display_override;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> SlotIdentity {
        SlotIdentity::new("Alice", Ipv4Addr::new(10, 0, 0, 2))
    }

    #[test]
    fn test_default_slot_is_closed_and_unpicked() {
        let slot = GameSlot::new();
        assert_eq!(slot.state(), SlotState::Closed);
        assert_eq!(slot.picks(), SlotPicks::UNSET);
        assert_eq!(slot.team(), UNSET);
        assert!(!slot.is_accepted());
        assert!(slot.has_map());
        assert!(!slot.is_occupied());
    }

    #[test]
    fn test_state_occupancy() {
        assert!(SlotState::Human.is_occupied());
        assert!(SlotState::BrutalAi.is_occupied());
        assert!(!SlotState::Open.is_occupied());
        assert!(!SlotState::Closed.is_occupied());
        assert!(SlotState::MediumAi.is_ai());
        assert!(!SlotState::Human.is_ai());
    }

    #[test]
    fn test_becoming_human_clears_picks() {
        let mut slot = GameSlot::with_state(SlotState::EasyAi);
        slot.set_color(3);
        slot.set_team(1);
        slot.set_state(SlotState::Human, Some(alice()));
        assert_eq!(slot.color(), UNSET);
        assert_eq!(slot.team(), UNSET);
        assert!(!slot.is_accepted());
        assert_eq!(slot.name(), "Alice");
    }

    #[test]
    fn test_ai_to_ai_keeps_picks() {
        let mut slot = GameSlot::with_state(SlotState::EasyAi);
        slot.set_color(4);
        slot.set_start_position(2);
        slot.set_state(SlotState::BrutalAi, None);
        assert_eq!(slot.color(), 4);
        assert_eq!(slot.start_position(), 2);
        assert!(slot.is_accepted());
    }

    #[test]
    fn test_human_name_is_sanitized() {
        let slot = GameSlot::human(SlotIdentity::new("a,b:c;d=e", Ipv4Addr::LOCALHOST));
        assert_eq!(slot.name(), "a_b_c_d_e");
    }

    #[test]
    fn test_unaccept_and_map_only_affect_humans() {
        let mut ai = GameSlot::with_state(SlotState::MediumAi);
        ai.unaccept();
        ai.set_map_availability(false);
        assert!(ai.is_accepted());
        assert!(ai.has_map());

        let mut human = GameSlot::human(alice());
        human.set_accept();
        human.unaccept();
        human.set_map_availability(false);
        assert!(!human.is_accepted());
        assert!(!human.has_map());
    }

    #[test]
    fn test_apparent_picks_hide_from_non_allies() {
        let mut slot = GameSlot::human(alice());
        slot.set_player_template(crate::TEMPLATE_RANDOM);
        slot.save_original_picks();
        // randomization resolved after the snapshot
        slot.set_player_template(4);

        assert_eq!(slot.apparent_picks(false).player_template, crate::TEMPLATE_RANDOM);
        assert_eq!(slot.apparent_picks(true).player_template, 4);
    }

    #[test]
    fn test_apparent_picks_without_snapshot_are_committed() {
        let mut slot = GameSlot::human(alice());
        slot.set_color(2);
        assert_eq!(slot.apparent_picks(false).color, 2);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(GameSlot::with_state(SlotState::Open).display_name(), "Open");
        assert_eq!(GameSlot::human(alice()).display_name(), "Alice");
    }

    #[test]
    fn test_inherit_local_fields_same_ip() {
        let mut old = GameSlot::human(SlotIdentity {
            login: "alice".into(),
            host: "pc".into(),
            ..alice()
        });
        old.set_last_heard(500);
        let mut new = GameSlot::human(alice());
        new.inherit_local_fields(&old);
        assert_eq!(new.identity().unwrap().login, "alice");
        assert_eq!(new.last_heard(), 500);
    }

    #[test]
    fn test_inherit_local_fields_different_ip_ignored() {
        let old = GameSlot::human(SlotIdentity {
            login: "alice".into(),
            ..alice()
        });
        let mut new = GameSlot::human(SlotIdentity::new("Bob", Ipv4Addr::new(10, 0, 0, 3)));
        new.inherit_local_fields(&old);
        assert!(new.identity().unwrap().login.is_empty());
    }
}
