//! # lanlobby
//!
//! Peer-to-peer game lobby for a local network.
//!
//! Every machine runs one [`LanApi`]. Machines find each other by UDP
//! broadcast, a host advertises a game, joiners ask for a seat, and the
//! host replicates the game setup to everyone until the match starts.
//! There is no server: the host of a game is its single source of truth.
//!
//! The application plugs in a [`LobbyFrontend`] (UI callbacks, the local
//! map library, and the hand-off to the simulation) and calls
//! [`LanApi::update`] on a steady cadence, or lets [`run_lobby`] do it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lanlobby::prelude::*;
//!
//! // Implement LobbyEvents, MapCache and GameBootstrap for your frontend, then:
//! // let transport = UdpTransport::bind(8086).await?;
//! // let api = LanApi::builder(LanConfig::default())
//! //     .name("Ann")
//! //     .build(transport, frontend)?;
//! // let (tx, rx) = tokio::sync::mpsc::channel(32);
//! // tokio::spawn(run_lobby(api, rx));
//! // tx.send(LobbyCommand::EnterLobby).await?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//!  LobbyCommand ──▶ run_lobby ──▶ LanApi ──▶ LobbyFrontend
//!                      │           │  ▲        (events, maps, start)
//!            UpdateScheduler       ▼  │
//!                               Codec (packet / json)
//!                                  │  ▲
//!                                  ▼  │
//!                              Transport (udp / memory)
//! ```

mod api;
mod config;
mod error;
mod events;
mod handlers;
mod prefs;
mod requests;
mod runner;

pub use api::{LanApi, LanApiBuilder, PendingAction, SessionPhase};
pub use config::LanConfig;
pub use error::{LanError, PrefsError, StartBlocker};
pub use events::{GameBootstrap, LobbyEvents, LobbyFrontend, MapCache, MapMetadata};
pub use prefs::LanPreferences;
pub use runner::{run_lobby, LobbyCommand};

/// Convenience re-exports for frontends.
pub mod prelude {
    pub use crate::{
        run_lobby, GameBootstrap, LanApi, LanConfig, LanError, LobbyCommand, LobbyEvents,
        LobbyFrontend, MapCache, MapMetadata, SessionPhase, StartBlocker,
    };
    pub use lanlobby_protocol::{ChatKind, ReturnCode};
    pub use lanlobby_roster::{LanGameInfo, LanPlayer};
    pub use lanlobby_setup::{GameInfo, GameSlot, MapInfo, SetupLimits, SlotChange, SlotState};
    pub use lanlobby_tick::{ManualClock, SystemClock};
    pub use lanlobby_transport::{MemoryNetwork, MemoryTransport, Transport};
    #[cfg(feature = "udp")]
    pub use lanlobby_transport::UdpTransport;
}
