//! `LanApi`: the per-participant protocol engine.
//!
//! One `LanApi` is one machine on the LAN. It owns the transport, the
//! lobby roster and (once created or joined) the current game, and it is
//! driven by two kinds of calls:
//!
//! - `request_*` methods, issued by the frontend when the player does
//!   something (see `requests.rs`);
//! - [`update()`](LanApi::update), called on a steady cadence, which
//!   drains the socket, dispatches every datagram to its handler (see
//!   `handlers.rs`), re-announces, prunes, and runs the timers.
//!
//! Nothing here blocks and nothing is shared between threads. The only
//! "concurrency" is between machines, which converge because the host is
//! the sole writer of the setup and rebroadcasts it in full.
//!
//! ## Session phases
//!
//! ```text
//!            request_lobby_enter
//!   Idle ───────────────────────────→ InLobby ←───────────────────────┐
//!                                      │  │                           │
//!          request_game_create ────────┘  └──── request_game_join     │
//!                 │                                  │                │
//!                 ▼                                  ▼                │
//!        InGameSetup{host}            PendingJoin ──(deny / timeout)──┤
//!                 │                        │ JoinAccept               │
//!                 │                        ▼                          │
//!                 │                 InGameSetup{joiner} ─→ PendingLeave
//!                 ▼ GameStart              ▼ GameStart                │
//!          InGameRunning ←─────────────────┘    (host left) ──────────┘
//! ```

use std::net::Ipv4Addr;
use std::path::PathBuf;

use lanlobby_protocol::text::{truncate_utf8, truncate_utf16};
use lanlobby_protocol::{
    ChatKind, Codec, LanMessage, MessageBody, PacketCodec, ReturnCode, SenderInfo, HOST_NAME_LEN,
    LOGIN_NAME_LEN, PLAYER_NAME_LEN,
};
use lanlobby_roster::{LanGameInfo, LanPlayer, Roster};
use lanlobby_setup::{options, sanitize_name, GameInfo, SlotIdentity, SlotState, MAX_SLOTS};
use lanlobby_tick::{Cadence, Clock, SystemClock};
use lanlobby_transport::{Datagram, Destination, Transport};
use tracing::{debug, info, trace, warn};

use crate::{LanConfig, LanError, LanPreferences, LobbyFrontend};

const DEFAULT_PLAYER_NAME: &str = "Player";

// ---------------------------------------------------------------------------
// Phases and pending actions
// ---------------------------------------------------------------------------

/// Where this participant is in the lobby lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Not in the lobby and not in a game.
    Idle,
    InLobby,
    PendingJoin,
    /// Waiting for a host reached by address to describe its game.
    PendingDirectConnect,
    PendingLeave,
    InGameSetup { is_host: bool },
    InGameRunning { is_host: bool },
}

/// The one outstanding action that awaits a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Join { game_name: String, host_ip: Ipv4Addr },
    JoinDirect { ip: Ipv4Addr },
    Leave,
}

#[derive(Debug, Clone)]
pub(crate) struct Pending {
    pub(crate) action: PendingAction,
    pub(crate) expires_at: u64,
}

/// Host-side start countdown.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Countdown {
    pub(crate) next_ms: u64,
    /// Seconds to announce at `next_ms`. Zero means start.
    pub(crate) seconds: i32,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for a [`LanApi`].
///
/// # Example
///
/// ```rust,ignore
/// let api = LanApi::builder(LanConfig::default())
///     .name("Ann")
///     .preferences("lanlobby.ini")
///     .build(UdpTransport::bind(8086).await?, MyFrontend::new())?;
/// ```
pub struct LanApiBuilder {
    config: LanConfig,
    name: String,
    login: String,
    host: String,
    clock: Option<Box<dyn Clock>>,
    prefs_path: Option<PathBuf>,
}

impl LanApiBuilder {
    pub fn new(config: LanConfig) -> Self {
        Self {
            config,
            name: String::new(),
            login: String::new(),
            host: String::new(),
            clock: None,
            prefs_path: None,
        }
    }

    /// Display name. Falls back to the `UserName` preference, then to
    /// `"Player"`.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// OS login reported to other participants.
    pub fn login(mut self, login: &str) -> Self {
        self.login = login.to_string();
        self
    }

    /// Machine name reported to other participants.
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Replaces the system clock, e.g. with a `ManualClock` in tests.
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Loads preferences from `path` and writes them back there on join,
    /// leave and start.
    pub fn preferences(mut self, path: impl Into<PathBuf>) -> Self {
        self.prefs_path = Some(path.into());
        self
    }

    /// Builds an engine speaking the binary packet format.
    ///
    /// # Errors
    /// [`LanError::Prefs`] if a preference file was given and can't be read.
    pub fn build<T, F>(self, transport: T, frontend: F) -> Result<LanApi<T, F>, LanError>
    where
        T: Transport,
        F: LobbyFrontend,
    {
        self.build_with_codec(transport, frontend, PacketCodec)
    }

    pub fn build_with_codec<T, F, C>(
        self,
        transport: T,
        frontend: F,
        codec: C,
    ) -> Result<LanApi<T, F, C>, LanError>
    where
        T: Transport,
        F: LobbyFrontend,
        C: Codec,
    {
        let config = self.config.validated();
        let prefs = match &self.prefs_path {
            Some(path) => LanPreferences::load(path)?,
            None => LanPreferences::new(),
        };

        let mut name = normalize_name(&self.name);
        if name.is_empty() {
            name = normalize_name(prefs.user_name().unwrap_or(DEFAULT_PLAYER_NAME));
        }
        let local_ip = transport.local_ip();
        info!(%local_ip, %name, "lan engine created");

        Ok(LanApi {
            throttle: Cadence::new(config.update_interval_ms),
            resend: Cadence::new(config.resend_interval_ms),
            transport,
            codec,
            frontend,
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock::new())),
            local_ip,
            name,
            login: truncate_utf8(self.login.trim(), LOGIN_NAME_LEN).to_string(),
            host: truncate_utf8(self.host.trim(), HOST_NAME_LEN).to_string(),
            roster: Roster::new(),
            current: None,
            in_lobby: false,
            pending: None,
            countdown: None,
            is_active: true,
            prefs,
            prefs_path: self.prefs_path,
            config,
        })
    }
}

/// Trims a display name, replaces options-string delimiters and cuts it to
/// what the packet header can carry.
pub(crate) fn normalize_name(name: &str) -> String {
    let clean = sanitize_name(name.trim());
    truncate_utf16(&clean, PLAYER_NAME_LEN).to_string()
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// A lobby participant.
pub struct LanApi<T, F, C = PacketCodec> {
    pub(crate) transport: T,
    pub(crate) codec: C,
    pub(crate) frontend: F,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) config: LanConfig,
    pub(crate) local_ip: Ipv4Addr,
    pub(crate) name: String,
    pub(crate) login: String,
    pub(crate) host: String,
    pub(crate) roster: Roster,
    /// The game this participant hosts or joined. Kept apart from the
    /// roster, which only lists other people's games.
    pub(crate) current: Option<LanGameInfo>,
    pub(crate) in_lobby: bool,
    pub(crate) pending: Option<Pending>,
    pub(crate) countdown: Option<Countdown>,
    pub(crate) throttle: Cadence,
    pub(crate) resend: Cadence,
    pub(crate) is_active: bool,
    pub(crate) prefs: LanPreferences,
    pub(crate) prefs_path: Option<PathBuf>,
}

impl LanApi<(), ()> {
    pub fn builder(config: LanConfig) -> LanApiBuilder {
        LanApiBuilder::new(config)
    }
}

impl<T, F, C> LanApi<T, F, C>
where
    T: Transport,
    F: LobbyFrontend,
    C: Codec,
{
    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn local_ip(&self) -> Ipv4Addr {
        self.local_ip
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &LanConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        if let Some(pending) = &self.pending {
            return match pending.action {
                PendingAction::Join { .. } => SessionPhase::PendingJoin,
                PendingAction::JoinDirect { .. } => SessionPhase::PendingDirectConnect,
                PendingAction::Leave => SessionPhase::PendingLeave,
            };
        }
        match &self.current {
            Some(game) if game.is_in_progress() => SessionPhase::InGameRunning {
                is_host: game.info.am_i_host(),
            },
            Some(game) => SessionPhase::InGameSetup {
                is_host: game.info.am_i_host(),
            },
            None if self.in_lobby => SessionPhase::InLobby,
            None => SessionPhase::Idle,
        }
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref().map(|p| &p.action)
    }

    pub fn current_game(&self) -> Option<&LanGameInfo> {
        self.current.as_ref()
    }

    /// Whether this participant hosts the current game.
    pub fn is_host(&self) -> bool {
        self.current.as_ref().is_some_and(|g| g.info.am_i_host())
    }

    pub fn is_in_lobby(&self) -> bool {
        self.in_lobby
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Other people's games, ordered by name.
    pub fn games(&self) -> Vec<&LanGameInfo> {
        self.roster.games()
    }

    /// Lobby players, this participant included, ordered by name.
    pub fn players(&self) -> Vec<&LanPlayer> {
        self.roster.players()
    }

    /// Seconds the running countdown will announce next.
    pub fn countdown(&self) -> Option<i32> {
        self.countdown.map(|c| c.seconds)
    }

    pub fn preferences(&self) -> &LanPreferences {
        &self.prefs
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Runs one engine pass, unless the previous one was less than
    /// `update_interval_ms` ago.
    ///
    /// # Errors
    /// Only a hard socket failure. Bad datagrams are logged and dropped.
    pub fn update(&mut self) -> Result<(), LanError> {
        let now = self.clock.now_ms();
        if !self.throttle.due(now) {
            return Ok(());
        }

        while let Some(datagram) = self.transport.poll_recv()? {
            self.receive(datagram, now);
        }

        if self.resend.due(now) {
            self.resend_presence(now);
        }
        self.prune_lobby(now);
        self.check_liveness(now);
        self.check_pending(now);
        self.run_countdown(now);
        Ok(())
    }

    fn receive(&mut self, datagram: Datagram, now: u64) {
        let Datagram { from, data } = datagram;
        if from == self.local_ip {
            trace!("ignoring own datagram");
            return;
        }
        let msg = match self.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(%from, error = %e, "dropping undecodable datagram");
                return;
            }
        };
        debug!(%from, kind = ?msg.kind(), sender = %msg.sender.name, "dispatching");
        self.refresh_liveness(from, now);
        self.dispatch(from, msg, now);
    }

    /// Any datagram from an address counts as a sign of life for
    /// everything that address stands for.
    fn refresh_liveness(&mut self, from: Ipv4Addr, now: u64) {
        self.roster.touch_player(from, now);
        self.roster.touch_game_by_host(from, now);
        if let Some(game) = self.current.as_mut() {
            if let Some(slot) = game.info.slot_num_by_ip(from) {
                if let Some(seat) = game.info.slot_mut(slot) {
                    seat.set_last_heard(now);
                }
                if slot == 0 {
                    game.last_heard = now;
                }
            }
        }
    }

    fn resend_presence(&mut self, now: u64) {
        let Some(game) = &self.current else {
            if self.in_lobby {
                self.roster.touch_player(self.local_ip, now);
                self.broadcast(MessageBody::LobbyAnnounce);
            }
            return;
        };

        if game.info.am_i_host() {
            if !game.is_in_progress() {
                self.broadcast_options();
            }
            self.request_game_announce();
            return;
        }
        if game.is_in_progress() || self.pending.is_some() {
            return;
        }
        let Some(host_ip) = game.host_ip() else {
            return;
        };
        let mut hello = Vec::with_capacity(3);
        if !self.login.is_empty() {
            hello.push(format!("User={}", self.login));
        }
        if !self.host.is_empty() {
            hello.push(format!("Host={}", self.host));
        }
        hello.push("HELLO".to_string());
        for options in hello {
            self.send(Destination::Unicast(host_ip), MessageBody::GameOptions { options });
        }
    }

    fn prune_lobby(&mut self, now: u64) {
        let max_age = self.config.lobby_stale_ms();
        let keep = self.current.as_ref().map(|g| g.name.clone());
        if !self.roster.expire_players(now, max_age).is_empty() {
            self.notify_player_list();
        }
        if !self
            .roster
            .expire_games(now, max_age, keep.as_deref())
            .is_empty()
        {
            self.notify_game_list();
        }
    }

    /// Host: drop joiners gone silent. Joiner: give up on a silent host.
    fn check_liveness(&mut self, now: u64) {
        let Some(game) = &self.current else {
            return;
        };
        if game.is_in_progress() || self.pending.is_some() {
            return;
        }

        if !game.info.am_i_host() {
            let limit = self.config.host_drop_ms();
            let host_silent = game
                .info
                .slot(0)
                .is_some_and(|host| host.last_heard().saturating_add(limit) < now);
            if host_silent {
                warn!(game = %game.name, "host not responding, leaving game");
                self.system_chat("host not responding");
                self.host_left();
            }
            return;
        }

        let limit = self.config.player_drop_ms();
        let silent: Vec<usize> = game
            .info
            .slots()
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, s)| s.is_human() && s.last_heard().saturating_add(limit) < now)
            .map(|(i, _)| i)
            .collect();
        if silent.is_empty() {
            return;
        }
        for slot in silent {
            if let Some(name) = self.free_slot(slot) {
                warn!(slot, %name, "player not responding, dropping");
                self.system_chat(&format!("{name} dropped"));
                self.frontend.on_player_leave(&name);
            }
        }
        self.broadcast_options();
        self.notify_slot_list();
    }

    fn check_pending(&mut self, now: u64) {
        if !self.pending.as_ref().is_some_and(|p| now > p.expires_at) {
            return;
        }
        let Some(pending) = self.pending.take() else {
            return;
        };
        match pending.action {
            PendingAction::Join { game_name, .. } => {
                info!(game = %game_name, "join timed out");
                self.frontend.on_game_join(ReturnCode::Timeout, None);
            }
            PendingAction::JoinDirect { ip } => {
                info!(%ip, "direct connect timed out");
                self.frontend.on_game_join(ReturnCode::Timeout, None);
            }
            PendingAction::Leave => {
                info!("leave not confirmed, leaving anyway");
                self.finish_leave();
            }
        }
    }

    fn run_countdown(&mut self, now: u64) {
        let Some(countdown) = self.countdown else {
            return;
        };
        if now < countdown.next_ms {
            return;
        }
        if countdown.seconds > 0 {
            self.request_game_start_timer(countdown.seconds);
        } else {
            self.countdown = None;
            self.launch();
        }
    }

    // -----------------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------------

    pub(crate) fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    fn sender_info(&self) -> SenderInfo {
        SenderInfo {
            name: self.name.clone(),
            login: self.login.clone(),
            host: self.host.clone(),
        }
    }

    /// Fire and forget: a send failure is logged, never returned.
    pub(crate) fn send(&mut self, to: Destination, body: MessageBody) {
        let msg = LanMessage::new(self.sender_info(), body);
        let bytes = match self.codec.encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(kind = ?msg.kind(), error = %e, "cannot encode message");
                return;
            }
        };
        trace!(%to, kind = ?msg.kind(), len = bytes.len(), "sending");
        if let Err(e) = self.transport.send(to, &bytes) {
            warn!(%to, kind = ?msg.kind(), error = %e, "send failed");
        }
    }

    pub(crate) fn broadcast(&mut self, body: MessageBody) {
        self.send(Destination::Broadcast, body);
    }

    pub(crate) fn set_pending(&mut self, action: PendingAction) {
        let expires_at = self.now().saturating_add(self.config.action_timeout_ms);
        debug!(?action, expires_at, "action pending");
        self.pending = Some(Pending { action, expires_at });
    }

    pub(crate) fn local_identity(&self) -> SlotIdentity {
        SlotIdentity {
            name: self.name.clone(),
            ip: self.local_ip,
            port: self.config.game_port,
            login: self.login.clone(),
            host: self.host.clone(),
            serial: self.config.serial.clone(),
            nat_behavior: 0,
        }
    }

    pub(crate) fn local_player(&self, now: u64) -> LanPlayer {
        LanPlayer::new(self.local_ip, &self.name, self.login.clone(), self.host.clone(), now)
    }

    /// Seats the current map provides, or every slot if the map is unknown.
    pub(crate) fn map_capacity(&self, info: &GameInfo) -> usize {
        self.frontend
            .find_map(&info.map().path)
            .map_or(MAX_SLOTS, |meta| meta.num_players.min(MAX_SLOTS))
    }

    pub(crate) fn options_string(&self) -> Option<String> {
        self.current.as_ref().map(|g| options::serialize(&g.info))
    }

    /// Host only: sends the full setup to everyone.
    pub(crate) fn broadcast_options(&mut self) {
        if !self.is_host() {
            return;
        }
        if let Some(options) = self.options_string() {
            self.broadcast(MessageBody::GameOptions { options });
        }
    }

    pub(crate) fn game_announce(&self) -> Option<MessageBody> {
        let game = self.current.as_ref()?;
        Some(MessageBody::GameAnnounce {
            game_name: game.name.clone(),
            in_progress: game.is_in_progress(),
            is_direct_connect: game.is_direct_connect,
            options: options::serialize(&game.info),
        })
    }

    /// Host only: opens `slot` again. Returns who sat there.
    pub(crate) fn free_slot(&mut self, slot: usize) -> Option<String> {
        let game = self.current.as_mut()?;
        let in_progress = game.info.is_in_progress();
        let seat = game.info.slot_mut(slot)?;
        if !seat.is_human() {
            return None;
        }
        let name = seat.name().to_string();
        if !in_progress {
            seat.set_state(SlotState::Open, None);
            game.info.reset_accepted();
        }
        Some(name)
    }

    pub(crate) fn notify_game_list(&mut self) {
        let games = self.roster.games();
        self.frontend.on_game_list(&games);
    }

    pub(crate) fn notify_player_list(&mut self) {
        let players = self.roster.players();
        self.frontend.on_player_list(&players);
    }

    pub(crate) fn notify_slot_list(&mut self) {
        if let Some(game) = &self.current {
            self.frontend.on_slot_list(&game.info);
        }
    }

    pub(crate) fn system_chat(&mut self, text: &str) {
        self.frontend
            .on_chat(&self.name, self.local_ip, text, ChatKind::System);
    }

    /// Drops the current game and any pending action, and re-enters the
    /// lobby.
    pub(crate) fn return_to_lobby(&mut self) {
        if let Some(game) = self.current.take() {
            info!(game = %game.name, "left game");
        }
        self.pending = None;
        self.countdown = None;
        self.request_lobby_enter();
    }

    /// A joiner's leave completed, by confirmation or timeout.
    pub(crate) fn finish_leave(&mut self) {
        self.save_prefs();
        let name = self.name.clone();
        self.return_to_lobby();
        self.frontend.on_player_leave(&name);
    }

    /// The host of the current game is gone. No one takes over.
    pub(crate) fn host_left(&mut self) {
        if let Some(game) = &self.current {
            let name = game.name.clone();
            self.roster.remove_game(&name);
        }
        self.return_to_lobby();
        self.frontend.on_host_leave();
    }

    /// Records the local picks and writes the preference file, if any.
    pub(crate) fn save_prefs(&mut self) {
        self.prefs.set_user_name(&self.name);
        if let Some(game) = &self.current {
            let info = &game.info;
            if let Some(slot) = info.local_slot_num().and_then(|i| info.slot(i)) {
                self.prefs.set_color(slot.color());
                self.prefs.set_player_template(slot.player_template());
            }
            if info.am_i_host() {
                if !info.map().path.is_empty() {
                    self.prefs.set_map(&info.map().path);
                }
                self.prefs.set_starting_cash(info.starting_cash);
                self.prefs.set_superweapon_restriction(info.superweapon_restriction);
            }
        }
        let Some(path) = &self.prefs_path else {
            return;
        };
        if let Err(e) = self.prefs.save(path) {
            warn!(error = %e, "could not save preferences");
        }
    }
}
