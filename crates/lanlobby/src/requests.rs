//! Things the local player asks for.
//!
//! Requests never block and never wait for replies. Outcomes that depend
//! on another machine (joining, creating) arrive later through
//! [`LobbyEvents`](crate::LobbyEvents); requests that are only legal for
//! the host return a `Result` so the frontend can grey out the button.

use std::net::Ipv4Addr;

use lanlobby_protocol::text::truncate_utf16;
use lanlobby_protocol::{ChatKind, Codec, MessageBody, ReturnCode, CHAT_LEN, GAME_NAME_LEN};
use lanlobby_roster::LanGameInfo;
use lanlobby_setup::{
    options, ChangeOutcome, GameInfo, GameSlot, MapInfo, SetupError, SlotChange, SlotState,
    MAX_SLOTS,
};
use lanlobby_transport::{Destination, Transport};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::api::{normalize_name, Countdown, PendingAction};
use crate::{LanApi, LanError, LobbyFrontend, StartBlocker};

impl<T, F, C> LanApi<T, F, C>
where
    T: Transport,
    F: LobbyFrontend,
    C: Codec,
{
    // -----------------------------------------------------------------------
    // Lobby
    // -----------------------------------------------------------------------

    /// Asks everyone in the lobby to announce themselves.
    pub fn request_locations(&mut self) {
        self.broadcast(MessageBody::RequestLocations);
    }

    /// Joins the lobby: starts a fresh roster, announces this player and
    /// asks everyone else to do the same.
    pub fn request_lobby_enter(&mut self) {
        if self.current.is_some() {
            warn!("still in a game, not entering the lobby");
            return;
        }
        info!(name = %self.name, "entering lobby");
        let now = self.now();
        self.in_lobby = true;
        self.roster.clear();
        self.roster.upsert_player(self.local_player(now));
        self.request_locations();
        self.broadcast(MessageBody::LobbyAnnounce);
        self.resend.reset(now);
        self.notify_player_list();
        self.notify_game_list();
    }

    pub fn request_lobby_leave(&mut self) {
        if !self.in_lobby {
            return;
        }
        info!("leaving lobby");
        self.broadcast(MessageBody::RequestLobbyLeave);
        self.in_lobby = false;
        self.roster.clear();
    }

    /// Tells the lobby this player is now in a game.
    pub(crate) fn leave_lobby_for_game(&mut self) {
        if self.in_lobby {
            self.broadcast(MessageBody::RequestLobbyLeave);
            self.in_lobby = false;
        }
    }

    /// Changes the display name.
    ///
    /// Refused while a join or leave is pending: the frontend gets the
    /// unchanged name back through `on_name_change`.
    pub fn request_set_name(&mut self, name: &str) {
        let name = normalize_name(name);
        if name.is_empty() {
            return;
        }
        if self.pending.is_some() {
            debug!(%name, "rename refused while an action is pending");
            self.frontend.on_name_change(self.local_ip, &self.name);
            return;
        }
        info!(old = %self.name, new = %name, "renamed");
        self.name = name;
        self.save_prefs();
        if self.in_lobby && self.current.is_none() {
            let now = self.now();
            self.broadcast(MessageBody::LobbyAnnounce);
            self.roster.upsert_player(self.local_player(now));
            self.frontend.on_name_change(self.local_ip, &self.name);
            self.notify_player_list();
        }
    }

    pub fn request_chat(&mut self, text: &str, kind: ChatKind) {
        let text = truncate_utf16(text, CHAT_LEN).to_string();
        let game_name = self
            .current
            .as_ref()
            .map(|g| g.name.clone())
            .unwrap_or_default();
        self.broadcast(MessageBody::Chat {
            game_name,
            kind,
            text: text.clone(),
        });
        self.frontend.on_chat(&self.name, self.local_ip, &text, kind);
    }

    // -----------------------------------------------------------------------
    // Creating, joining, leaving
    // -----------------------------------------------------------------------

    /// Hosts a new game named `game_name` (or after the player, if blank).
    ///
    /// A direct-connect game isn't announced to the lobby and can be
    /// created without entering it.
    pub fn request_game_create(&mut self, game_name: &str, is_direct_connect: bool) {
        let not_ready = !self.in_lobby && !is_direct_connect;
        if self.pending.is_some() || self.current.is_some() || not_ready {
            self.frontend.on_game_create(ReturnCode::Busy);
            return;
        }
        let trimmed = game_name.trim();
        let requested = if trimmed.is_empty() { self.name.as_str() } else { trimmed };
        let name = truncate_utf16(requested, GAME_NAME_LEN).to_string();
        if self.roster.game(&name).is_some() {
            info!(game = %name, "game name already in use");
            self.frontend.on_game_create(ReturnCode::GameExists);
            return;
        }

        let now = self.now();
        let info = self.new_hosted_game(now);
        let game = LanGameInfo::new(name, info, is_direct_connect, now);
        info!(game = %game.name, direct = is_direct_connect, seed = game.info.seed, "game created");
        self.current = Some(game);
        self.countdown = None;
        self.leave_lobby_for_game();

        self.frontend.on_game_create(ReturnCode::Ok);
        self.notify_slot_list();
        self.request_game_announce();
        self.resend.reset(now);
    }

    /// A setup with the local player in slot 0 and the preferred map and
    /// settings.
    fn new_hosted_game(&self, now: u64) -> GameInfo {
        let mut info = GameInfo::new();
        info.set_local_ip(self.local_ip);
        info.seed = rand::rng().random_range(0..i32::MAX);
        info.starting_cash = self.prefs.starting_cash();
        info.superweapon_restriction = self.prefs.superweapon_restriction();

        let mut host = GameSlot::human(self.local_identity());
        host.set_last_heard(now);
        let limits = &self.config.limits;
        let color = self.prefs.color();
        if color >= 0 && limits.color_in_range(color) {
            host.set_color(color);
        }
        let template = self.prefs.player_template();
        if limits.template_in_range(template) {
            host.set_player_template(template);
        }
        let slots = [host]
            .into_iter()
            .chain(std::iter::repeat_with(|| GameSlot::with_state(SlotState::Open)));
        for (index, slot) in slots.take(MAX_SLOTS).enumerate() {
            if let Err(e) = info.set_slot(index, slot) {
                warn!(index, error = %e, "cannot seat slot");
            }
        }

        let mut capacity = MAX_SLOTS;
        if let Some(path) = self.prefs.map() {
            match self.frontend.find_map(path) {
                Some(meta) if MapInfo::is_map_file(path) => {
                    let mut candidate = info.clone();
                    candidate.set_map(MapInfo::new(path, meta.crc, meta.size, 0));
                    match options::check_fits(&candidate) {
                        Ok(()) => {
                            info = candidate;
                            capacity = meta.num_players.min(MAX_SLOTS);
                        }
                        Err(e) => debug!(map = %path, error = %e, "preferred map skipped"),
                    }
                }
                Some(_) => debug!(map = %path, "preferred map is not a map file"),
                None => debug!(map = %path, "preferred map not installed"),
            }
        }
        info.adjust_slots_for_map(capacity);
        info.enter_game();
        info
    }

    /// Asks the host of a listed game for a seat.
    pub fn request_game_join(&mut self, game_name: &str) {
        let busy = self.current.is_some()
            || matches!(
                self.pending(),
                Some(PendingAction::Join { .. } | PendingAction::Leave)
            );
        if busy {
            self.frontend.on_game_join(ReturnCode::Busy, None);
            return;
        }
        let Some(host_ip) = self.roster.game(game_name).and_then(LanGameInfo::host_ip) else {
            self.frontend.on_game_join(ReturnCode::GameGone, None);
            return;
        };
        self.send_join_request(game_name.to_string(), host_ip);
    }

    pub(crate) fn send_join_request(&mut self, game_name: String, host_ip: Ipv4Addr) {
        info!(game = %game_name, host = %host_ip, "requesting to join");
        let body = MessageBody::RequestJoin {
            game_ip: host_ip,
            exe_crc: self.config.exe_crc,
            ini_crc: self.config.ini_crc,
            serial: self.config.serial.clone(),
        };
        self.send(Destination::Unicast(host_ip), body);
        self.set_pending(PendingAction::Join { game_name, host_ip });
    }

    /// Joins the game hosted at `ip` without finding it in the lobby
    /// first.
    pub fn request_game_join_direct(&mut self, ip: Ipv4Addr) {
        if self.pending.is_some() || self.current.is_some() {
            self.frontend.on_game_join(ReturnCode::Busy, None);
            return;
        }
        if ip.is_unspecified() {
            self.frontend.on_game_join(ReturnCode::GameGone, None);
            return;
        }
        info!(%ip, "asking for game info");
        self.send(
            Destination::Unicast(ip),
            MessageBody::RequestGameInfo {
                requester_ip: self.local_ip,
            },
        );
        self.set_pending(PendingAction::JoinDirect { ip });
    }

    /// Leaves the current game.
    ///
    /// A host leaves at once and the game ends for everyone. A joiner
    /// waits for the host to drop it from the setup, or for the action
    /// timeout.
    pub fn request_game_leave(&mut self) {
        let Some(game) = &self.current else {
            return;
        };
        if matches!(self.pending(), Some(PendingAction::Leave)) {
            return;
        }
        let game_name = game.name.clone();
        let is_host = game.info.am_i_host();
        self.broadcast(MessageBody::RequestGameLeave { game_name });
        if is_host {
            self.save_prefs();
            let name = self.name.clone();
            self.return_to_lobby();
            self.frontend.on_player_leave(&name);
        } else {
            self.set_pending(PendingAction::Leave);
        }
    }

    // -----------------------------------------------------------------------
    // In a game
    // -----------------------------------------------------------------------

    /// Agrees to the setup as it stands.
    pub fn request_accept(&mut self) {
        let Some(game) = self.current.as_mut() else {
            return;
        };
        if game.is_in_progress() {
            return;
        }
        if let Some(seat) = game.info.local_slot_num().and_then(|i| game.info.slot_mut(i)) {
            seat.set_accept();
        }
        let game_name = game.name.clone();
        self.broadcast(MessageBody::SetAccept {
            game_name,
            accepted: true,
        });
        self.frontend.on_accept(self.local_ip, true);
    }

    /// Checks the local map cache for the current map and tells everyone
    /// the result.
    pub fn request_has_map(&mut self) {
        let Some(game) = &self.current else {
            return;
        };
        let map = game.info.map().clone();
        let game_name = game.name.clone();
        let has_map = self.frontend.has_map(&map.path, map.crc);
        if let Some(game) = self.current.as_mut() {
            if let Some(seat) = game.info.local_slot_num().and_then(|i| game.info.slot_mut(i)) {
                seat.set_map_availability(has_map);
            }
        }
        self.broadcast(MessageBody::MapAvailability {
            game_name,
            map_crc: map.crc,
            has_map,
        });
        if !has_map {
            self.system_chat(&format!("you don't have the map {}", map.path));
        }
    }

    /// Changes one field of the local slot.
    ///
    /// A joiner sends the change to the host and sees it once the host
    /// rebroadcasts. The host applies it directly.
    ///
    /// # Errors
    /// [`LanError::NotInGame`], or the [`SetupError`] a host's own change
    /// was refused with.
    pub fn request_game_options(&mut self, change: SlotChange) -> Result<(), LanError> {
        let game = self.current.as_ref().ok_or(LanError::NotInGame)?;
        if game.info.am_i_host() {
            self.apply_change(0, &change)?;
            return Ok(());
        }
        let host_ip = game.host_ip().ok_or(LanError::NotInGame)?;
        self.send(
            Destination::Unicast(host_ip),
            MessageBody::GameOptions {
                options: change.to_string(),
            },
        );
        Ok(())
    }

    /// Host: validates a change for `slot`, applies it and rebroadcasts.
    pub(crate) fn apply_change(
        &mut self,
        slot: usize,
        change: &SlotChange,
    ) -> Result<ChangeOutcome, SetupError> {
        let limits = self.config.limits;
        let game = self.current.as_mut().ok_or(SetupError::NoSuchSlot(slot))?;
        let outcome = game.info.apply_slot_change(slot, change, &limits)?;
        debug!(slot, %change, ?outcome, "slot change applied");
        if matches!(outcome, ChangeOutcome::PicksChanged | ChangeOutcome::Rebroadcast) {
            self.broadcast_options();
            self.notify_slot_list();
        }
        Ok(outcome)
    }

    fn hosted_game_mut(&mut self) -> Result<&mut LanGameInfo, LanError> {
        let game = self.current.as_mut().ok_or(LanError::NotInGame)?;
        if !game.info.am_i_host() {
            return Err(LanError::NotHost);
        }
        if game.is_in_progress() {
            return Err(SetupError::InProgress.into());
        }
        Ok(game)
    }

    /// Host: opens, closes or seats an AI in `slot`. Closing or opening a
    /// human's slot removes that player.
    ///
    /// # Errors
    /// [`LanError::NotHost`], [`SetupError::HostSlot`] for slot 0,
    /// [`LanError::SeatReserved`] for [`SlotState::Human`], and
    /// [`SetupError::OptionsTooLong`] when the new seat doesn't fit in the
    /// options string.
    pub fn request_slot_state(&mut self, slot: usize, state: SlotState) -> Result<(), LanError> {
        let game = self.hosted_game_mut()?;
        if slot == 0 {
            return Err(SetupError::HostSlot.into());
        }
        if state == SlotState::Human {
            return Err(LanError::SeatReserved(slot));
        }
        let mut candidate = game.info.clone();
        let seat = candidate.slot_mut(slot).ok_or(SetupError::NoSuchSlot(slot))?;
        let removed = seat.is_human().then(|| seat.name().to_string());
        seat.set_state(state, None);
        options::check_fits(&candidate)?;
        candidate.reset_accepted();
        game.info = candidate;
        info!(slot, ?state, "slot changed");

        self.broadcast_options();
        self.notify_slot_list();
        if let Some(name) = removed {
            self.frontend.on_player_leave(&name);
        }
        Ok(())
    }

    /// Host: switches the map. Seats are opened or closed to match its
    /// capacity and every joiner has to confirm they have it.
    ///
    /// # Errors
    /// [`LanError::UnknownMap`] if the local cache doesn't have it,
    /// [`SetupError::BadMapPath`] if `path` isn't a map file, and
    /// [`SetupError::OptionsTooLong`] if the setup would no longer fit in
    /// an options string. The setup is untouched on error.
    pub fn request_map(&mut self, path: &str) -> Result<(), LanError> {
        let meta = self
            .frontend
            .find_map(path)
            .ok_or_else(|| LanError::UnknownMap(path.to_string()))?;
        if !MapInfo::is_map_file(path) {
            return Err(SetupError::BadMapPath(path.to_string()).into());
        }
        let game = self.hosted_game_mut()?;
        let mut candidate = game.info.clone();
        candidate.set_map(MapInfo::new(path, meta.crc, meta.size, 0));
        candidate.adjust_slots_for_map(meta.num_players.min(MAX_SLOTS));
        options::check_fits(&candidate)?;
        candidate.reset_accepted();
        for index in 1..MAX_SLOTS {
            if let Some(seat) = candidate.slot_mut(index) {
                seat.set_map_availability(false);
            }
        }
        game.info = candidate;
        info!(map = %path, capacity = meta.num_players, "map changed");
        self.prefs.set_map(path);

        self.broadcast_options();
        self.notify_slot_list();
        Ok(())
    }

    /// Host: announces the game to the lobby. Direct-connect games are
    /// never announced.
    pub fn request_game_announce(&mut self) {
        let announce = match &self.current {
            Some(game) if game.info.am_i_host() && !game.is_direct_connect => self.game_announce(),
            _ => None,
        };
        if let Some(body) = announce {
            self.broadcast(body);
        }
    }

    /// Reports that the player switched away from (or back to) the game.
    ///
    /// Going inactive withdraws a joiner's acceptance.
    pub fn set_is_active(&mut self, active: bool) {
        if self.is_active == active {
            return;
        }
        self.is_active = active;
        if active {
            return;
        }
        let Some(game) = self.current.as_mut() else {
            return;
        };
        if game.is_in_progress() {
            return;
        }
        if !game.info.am_i_host() {
            if let Some(seat) = game.info.local_slot_num().and_then(|i| game.info.slot_mut(i)) {
                seat.unaccept();
            }
        }
        self.broadcast(MessageBody::Inactive);
    }

    // -----------------------------------------------------------------------
    // Starting
    // -----------------------------------------------------------------------

    /// Host: checks that the game can start, freezes the seat list and
    /// begins the countdown.
    ///
    /// # Errors
    /// The first [`StartBlocker`] found. It is also posted to the local
    /// chat.
    pub fn request_game_start(&mut self) -> Result<(), StartBlocker> {
        if let Err(blocker) = self.start_blocker() {
            info!(%blocker, "cannot start");
            self.system_chat(&blocker.to_string());
            return Err(blocker);
        }
        if let Some(game) = self.current.as_mut() {
            game.info.close_open_slots();
            game.info.save_original_picks();
        }
        self.broadcast_options();
        self.notify_slot_list();

        let seconds = self.config.start_countdown_secs;
        if seconds > 0 {
            self.request_game_start_timer(seconds);
        } else {
            self.launch();
        }
        Ok(())
    }

    /// Host: announces `seconds` left and schedules the next announcement
    /// one second from now.
    pub fn request_game_start_timer(&mut self, seconds: i32) {
        if !self.is_host() {
            return;
        }
        let now = self.now();
        self.countdown = Some(Countdown {
            next_ms: now.saturating_add(1000),
            seconds: seconds - 1,
        });
        self.broadcast(MessageBody::GameStartTimer { seconds });
        self.frontend.on_game_start_timer(seconds);
    }

    pub(crate) fn start_blocker(&self) -> Result<(), StartBlocker> {
        let game = self.current.as_ref().ok_or(StartBlocker::NotInGame)?;
        let info = &game.info;
        if !info.am_i_host() {
            return Err(StartBlocker::NotHost);
        }
        if info.is_in_progress() || self.countdown.is_some() {
            return Err(StartBlocker::AlreadyStarted);
        }
        if !info.slot(0).is_some_and(GameSlot::is_accepted) {
            return Err(StartBlocker::HostNotAccepted);
        }

        let players = info.num_non_observer_players();
        let capacity = self.map_capacity(info);
        if players > capacity {
            return Err(StartBlocker::TooManyPlayers { players, capacity });
        }
        let needed = self.config.min_players;
        let any_human = info.slots().iter().any(|s| s.is_human() && !s.is_observer());
        if needed > 0 && !any_human {
            return Err(StartBlocker::NoHumanPlayers);
        }
        if players < needed {
            return Err(StartBlocker::NotEnoughPlayers { players, needed });
        }
        for seat in info.slots().iter().filter(|s| s.is_human()) {
            if !seat.is_accepted() {
                return Err(StartBlocker::NotAccepted(seat.name().to_string()));
            }
            if !seat.has_map() {
                return Err(StartBlocker::MissingMap(seat.name().to_string()));
            }
        }
        Ok(())
    }

    /// Host: the countdown ran out.
    pub(crate) fn launch(&mut self) {
        if let Err(blocker) = self.start_blocker() {
            warn!(%blocker, "start cancelled");
            self.system_chat(&format!("start cancelled: {blocker}"));
            let capacity = self.current.as_ref().map(|g| self.map_capacity(&g.info));
            if let (Some(game), Some(capacity)) = (self.current.as_mut(), capacity) {
                game.info.adjust_slots_for_map(capacity);
            }
            self.broadcast_options();
            self.notify_slot_list();
            return;
        }
        self.broadcast(MessageBody::GameStart);
        self.begin_match();
        self.request_game_announce();
    }

    /// Freezes the setup and hands it to the simulation.
    pub(crate) fn begin_match(&mut self) {
        let Some(game) = self.current.as_mut() else {
            return;
        };
        game.info.save_original_picks();
        game.info.start_game();
        let seed = game.info.seed;
        info!(game = %game.name, seed, players = game.info.num_players(), "match starting");
        self.frontend.start_simulation(&game.info, seed);
        self.frontend.on_game_start();
        self.save_prefs();
    }
}
