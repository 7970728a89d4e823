//! The game setup every participant of a LAN game shares.
//!
//! A game has eight slots. The host owns the authoritative copy and is
//! the only one who edits it; everybody else holds a replica that is
//! replaced wholesale whenever the host broadcasts a new options string.
//!
//! # Key types
//!
//! - [`GameSlot`]: one seat: who sits there and what they picked
//! - [`GameInfo`]: the eight slots plus map and match settings
//! - [`SlotChange`]: a single-field change a player asks the host for
//! - [`options`]: the text codec the setup travels in
//!
//! # Replication
//!
//! ```text
//! player ── "Color=3" ──▶ host: apply_slot_change()
//!                          │
//!                          ▼
//!             options::serialize() ── broadcast ──▶ options::parse()
//!                                                     │
//!                                                     ▼
//!                                         GameInfo::apply_options()
//! ```

mod change;
mod config;
mod error;
mod game;
pub mod options;
mod slot;

pub use change::{ChangeOutcome, SlotChange};
pub use config::{SetupLimits, MAX_SLOTS, MAX_TEAMS, TEMPLATE_OBSERVER, TEMPLATE_RANDOM, UNSET};
pub use error::{OptionsError, SetupError};
pub use game::{GameInfo, MapInfo, DEFAULT_CRC_INTERVAL, DEFAULT_STARTING_CASH, MAP_EXTENSION};
pub use slot::{sanitize_name, GameSlot, SlotIdentity, SlotPicks, SlotState};
