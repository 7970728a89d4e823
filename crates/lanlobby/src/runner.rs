//! Driving a [`LanApi`] from an async task.
//!
//! The engine itself is synchronous. [`run_lobby`] puts it inside the
//! usual actor loop: player actions arrive as [`LobbyCommand`]s on a
//! channel, and an [`UpdateScheduler`] wakes the engine on its cadence.
//!
//! ```ignore
//! let (tx, rx) = tokio::sync::mpsc::channel(32);
//! let task = tokio::spawn(run_lobby(api, rx));
//! tx.send(LobbyCommand::EnterLobby).await?;
//! // ...
//! tx.send(LobbyCommand::Shutdown).await?;
//! let api = task.await??;
//! ```

use std::net::Ipv4Addr;

use lanlobby_protocol::{ChatKind, Codec, MessageBody};
use lanlobby_setup::{SlotChange, SlotState};
use lanlobby_tick::{UpdateConfig, UpdateScheduler};
use lanlobby_transport::Transport;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{LanApi, LanError, LobbyFrontend};

/// A player action, as sent to [`run_lobby`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyCommand {
    EnterLobby,
    LeaveLobby,
    SetName(String),
    CreateGame { name: String, direct: bool },
    JoinGame(String),
    JoinDirect(Ipv4Addr),
    LeaveGame,
    Accept,
    HasMap,
    Chat { text: String, kind: ChatKind },
    ChangeSlot(SlotChange),
    SetSlotState { slot: usize, state: SlotState },
    SelectMap(String),
    StartGame,
    SetActive(bool),
    /// Leave whatever we're in and stop the loop.
    Shutdown,
}

impl<T, F, C> LanApi<T, F, C>
where
    T: Transport,
    F: LobbyFrontend,
    C: Codec,
{
    /// Runs one command. Requests the engine refuses locally are logged;
    /// their outcome reaches the frontend the same way as any other.
    pub fn execute(&mut self, command: LobbyCommand) {
        debug!(?command, "executing");
        let refused = match command {
            LobbyCommand::EnterLobby => {
                self.request_lobby_enter();
                None
            }
            LobbyCommand::LeaveLobby => {
                self.request_lobby_leave();
                None
            }
            LobbyCommand::SetName(name) => {
                self.request_set_name(&name);
                None
            }
            LobbyCommand::CreateGame { name, direct } => {
                self.request_game_create(&name, direct);
                None
            }
            LobbyCommand::JoinGame(name) => {
                self.request_game_join(&name);
                None
            }
            LobbyCommand::JoinDirect(ip) => {
                self.request_game_join_direct(ip);
                None
            }
            LobbyCommand::LeaveGame => {
                self.request_game_leave();
                None
            }
            LobbyCommand::Accept => {
                self.request_accept();
                None
            }
            LobbyCommand::HasMap => {
                self.request_has_map();
                None
            }
            LobbyCommand::Chat { text, kind } => {
                self.request_chat(&text, kind);
                None
            }
            LobbyCommand::ChangeSlot(change) => self.request_game_options(change).err(),
            LobbyCommand::SetSlotState { slot, state } => self.request_slot_state(slot, state).err(),
            LobbyCommand::SelectMap(path) => self.request_map(&path).err(),
            LobbyCommand::StartGame => {
                if let Err(blocker) = self.request_game_start() {
                    info!(%blocker, "cannot start yet");
                }
                None
            }
            LobbyCommand::SetActive(active) => {
                self.set_is_active(active);
                None
            }
            LobbyCommand::Shutdown => {
                self.shut_down();
                None
            }
        };
        if let Some(e) = refused {
            warn!(error = %e, "request refused");
        }
    }

    /// Leaves the current game and the lobby, telling the LAN.
    ///
    /// Unlike [`request_game_leave`](LanApi::request_game_leave) this
    /// never re-enters the lobby on the way out.
    fn shut_down(&mut self) {
        if let Some(game_name) = self.current.as_ref().map(|g| g.name.clone()) {
            info!(game = %game_name, "leaving game to shut down");
            self.save_prefs();
            self.broadcast(MessageBody::RequestGameLeave { game_name });
            // A joiner's leave is normally confirmed by the host; there is
            // nobody left to wait for it.
            self.pending = None;
            self.current = None;
            self.countdown = None;
        }
        if self.in_lobby {
            self.request_lobby_leave();
        }
    }
}

/// Runs `api` until [`LobbyCommand::Shutdown`] arrives or every sender
/// is dropped, then hands the engine back.
///
/// # Errors
/// A hard transport failure from [`LanApi::update`].
pub async fn run_lobby<T, F, C>(
    mut api: LanApi<T, F, C>,
    mut commands: mpsc::Receiver<LobbyCommand>,
) -> Result<LanApi<T, F, C>, LanError>
where
    T: Transport,
    F: LobbyFrontend,
    C: Codec,
{
    let mut scheduler =
        UpdateScheduler::new(UpdateConfig::with_interval(api.config().update_interval_ms));
    info!(ip = %api.local_ip(), name = %api.name(), "lobby loop started");

    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(LobbyCommand::Shutdown) | None => {
                        api.execute(LobbyCommand::Shutdown);
                        break;
                    }
                    Some(command) => api.execute(command),
                }
            }
            _ = scheduler.wait_for_update() => {
                api.update()?;
                scheduler.record_update_end();
            }
        }
    }

    info!(updates = scheduler.update_count(), "lobby loop stopped");
    Ok(api)
}
