//! Who is on the LAN, and which games they are hosting.
//!
//! Everything in this crate is learned from broadcasts. A player exists
//! because they announced themselves recently; a game exists because its
//! host announced it recently. When the announcements stop, the entries
//! age out through [`Roster::expire_players`] and [`Roster::expire_games`].
//!
//! # How it fits in the stack
//!
//! ```text
//! Engine (above)   ← feeds announcements in, reads sorted lists out
//!     ↕
//! Roster (this crate)   ← lobby players and discovered games
//!     ↕
//! Setup (below)    ← GameInfo carried by each discovered game
//! ```

mod error;
mod game;
mod player;
mod roster;

pub use error::RosterError;
pub use game::LanGameInfo;
pub use player::{LanPlayer, PlayerUpdate};
pub use roster::{GameUpdate, Roster};
