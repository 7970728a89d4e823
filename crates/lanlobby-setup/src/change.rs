//! Single-field change requests a player sends to the host.
//!
//! Only the host edits the shared setup. Everyone else asks for one field
//! at a time with a `Key=value` string carried in a game-options message;
//! the host validates the request against the whole setup, applies it,
//! and rebroadcasts the full options string. A refused request changes
//! nothing, and the requester simply never sees its pick appear.

use std::fmt;

use crate::{options, GameInfo, OptionsError, SetupError, SetupLimits, TEMPLATE_OBSERVER, UNSET};

/// One requested change to the requester's own slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotChange {
    Color(i32),
    PlayerTemplate(i32),
    StartPos(i32),
    Team(i32),
    Nat(u8),
    /// The requester's login name.
    Login(String),
    /// The requester's machine name.
    Host(String),
    /// "Send me the current options."
    Hello,
}

impl SlotChange {
    /// Parses `Key=value` (or the bare word `HELLO`).
    ///
    /// # Errors
    /// [`OptionsError::UnknownKey`] for anything that isn't a known change,
    /// [`OptionsError::EmptyValue`] / [`OptionsError::BadNumber`] for a
    /// numeric key with an unusable value.
    pub fn parse(text: &str) -> Result<Self, OptionsError> {
        if text == "HELLO" {
            return Ok(Self::Hello);
        }
        let Some((key, value)) = text.split_once('=') else {
            return Err(OptionsError::UnknownKey(text.to_owned()));
        };
        match key {
            "User" => Ok(Self::Login(value.to_owned())),
            "Host" => Ok(Self::Host(value.to_owned())),
            "Color" => number("Color", value).map(Self::Color),
            "PlayerTemplate" => number("PlayerTemplate", value).map(Self::PlayerTemplate),
            "StartPos" => number("StartPos", value).map(Self::StartPos),
            "Team" => number("Team", value).map(Self::Team),
            "NAT" => number("NAT", value).map(Self::Nat),
            other => Err(OptionsError::UnknownKey(other.to_owned())),
        }
    }
}

fn number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, OptionsError> {
    if value.is_empty() {
        return Err(OptionsError::EmptyValue(field.to_owned()));
    }
    value.parse().map_err(|_| OptionsError::BadNumber {
        field,
        value: value.to_owned(),
    })
}

impl fmt::Display for SlotChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color(v) => write!(f, "Color={v}"),
            Self::PlayerTemplate(v) => write!(f, "PlayerTemplate={v}"),
            Self::StartPos(v) => write!(f, "StartPos={v}"),
            Self::Team(v) => write!(f, "Team={v}"),
            Self::Nat(v) => write!(f, "NAT={v}"),
            Self::Login(v) => write!(f, "User={v}"),
            Self::Host(v) => write!(f, "Host={v}"),
            Self::Hello => f.write_str("HELLO"),
        }
    }
}

/// What the host has to do after applying a [`SlotChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Nothing that other players can see changed.
    Unchanged,
    /// A broadcast field changed; rebroadcast the options.
    Rebroadcast,
    /// A draft pick changed. Acceptance has been reset; rebroadcast.
    PicksChanged,
    /// The requester wants the current options.
    Hello,
}

impl GameInfo {
    /// Validates and applies a change requested for `slot`.
    ///
    /// # Errors
    /// Any [`SetupError`] describing why the change is illegal. On error
    /// the setup is untouched.
    pub fn apply_slot_change(
        &mut self,
        slot: usize,
        change: &SlotChange,
        limits: &SetupLimits,
    ) -> Result<ChangeOutcome, SetupError> {
        if self.is_in_progress() {
            return Err(SetupError::InProgress);
        }
        let current = self.slot(slot).ok_or(SetupError::NoSuchSlot(slot))?;
        if !current.is_human() {
            return Err(SetupError::NotHuman(slot));
        }
        let observer = current.is_observer();
        let previous = current.clone();

        match change {
            SlotChange::Color(color) => {
                let color = *color;
                if observer && color != UNSET {
                    return Err(SetupError::ObserverPick("color"));
                }
                if !limits.color_in_range(color) {
                    return Err(SetupError::ColorOutOfRange(color));
                }
                if let Some(holder) = self.is_color_taken(color, Some(slot)) {
                    return Err(SetupError::ColorTaken { color, holder });
                }
            }
            SlotChange::StartPos(position) => {
                let position = *position;
                if observer && position != UNSET {
                    return Err(SetupError::ObserverPick("start position"));
                }
                if !limits.start_position_in_range(position) {
                    return Err(SetupError::StartPositionOutOfRange(position));
                }
                if let Some(holder) = self.is_start_position_taken(position, Some(slot)) {
                    return Err(SetupError::StartPositionTaken { position, holder });
                }
            }
            SlotChange::Team(team) => {
                if observer && *team != UNSET {
                    return Err(SetupError::ObserverPick("team"));
                }
                if !limits.team_in_range(*team) {
                    return Err(SetupError::TeamOutOfRange(*team));
                }
            }
            SlotChange::PlayerTemplate(template) => {
                if !limits.template_in_range(*template) {
                    return Err(SetupError::TemplateOutOfRange(*template));
                }
            }
            SlotChange::Nat(_) | SlotChange::Login(_) | SlotChange::Host(_) | SlotChange::Hello => {}
        }

        let Some(target) = self.slot_mut(slot) else {
            return Err(SetupError::NoSuchSlot(slot));
        };
        let outcome = match change {
            SlotChange::Color(color) => {
                target.set_color(*color);
                ChangeOutcome::PicksChanged
            }
            SlotChange::StartPos(position) => {
                target.set_start_position(*position);
                ChangeOutcome::PicksChanged
            }
            SlotChange::Team(team) => {
                target.set_team(*team);
                ChangeOutcome::PicksChanged
            }
            SlotChange::PlayerTemplate(template) => {
                target.set_player_template(*template);
                if *template == TEMPLATE_OBSERVER {
                    target.set_color(UNSET);
                    target.set_start_position(UNSET);
                    target.set_team(UNSET);
                }
                ChangeOutcome::PicksChanged
            }
            SlotChange::Nat(nat) => {
                if let Some(identity) = target.identity_mut() {
                    identity.nat_behavior = *nat;
                }
                ChangeOutcome::Rebroadcast
            }
            SlotChange::Login(login) => {
                if let Some(identity) = target.identity_mut() {
                    identity.login.clone_from(login);
                }
                ChangeOutcome::Unchanged
            }
            SlotChange::Host(host) => {
                if let Some(identity) = target.identity_mut() {
                    identity.host.clone_from(host);
                }
                ChangeOutcome::Unchanged
            }
            SlotChange::Hello => ChangeOutcome::Hello,
        };

        if let Err(e) = options::check_fits(self) {
            if let Some(target) = self.slot_mut(slot) {
                *target = previous;
            }
            return Err(e);
        }
        if outcome == ChangeOutcome::PicksChanged {
            self.reset_accepted();
        }
        Ok(outcome)
    }
}
