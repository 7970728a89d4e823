//! Inbound message handling.
//!
//! [`dispatch`](LanApi::dispatch) routes each decoded message by kind.
//! Handlers check that a message is meant for them (right game, right
//! sender, right phase) and silently ignore it otherwise: on a shared
//! broadcast domain most traffic is somebody else's business.
//!
//! Only the host mutates a game's setup from the network. Joiners replace
//! their copy wholesale when the host's options string parses cleanly,
//! and ignore it when it doesn't.

use std::net::Ipv4Addr;

use lanlobby_protocol::{ChatKind, Codec, LanMessage, MessageBody, ReturnCode, SenderInfo};
use lanlobby_roster::{GameUpdate, LanGameInfo, LanPlayer, PlayerUpdate};
use lanlobby_setup::{
    options, sanitize_name, ChangeOutcome, GameInfo, GameSlot, SlotChange, SlotIdentity,
    MAX_SLOTS,
};
use lanlobby_transport::{Destination, Transport};
use tracing::{debug, info, warn};

use crate::api::{Pending, PendingAction};
use crate::{LanApi, LobbyFrontend};

/// The fields of a join request.
struct JoinRequest {
    game_ip: Ipv4Addr,
    exe_crc: u32,
    ini_crc: u32,
    serial: String,
}

/// What the host did with a join request it accepted.
enum Admission {
    Seated(usize),
    /// The requester already had this seat; the accept was lost.
    Repeat(usize),
}

impl<T, F, C> LanApi<T, F, C>
where
    T: Transport,
    F: LobbyFrontend,
    C: Codec,
{
    pub(crate) fn dispatch(&mut self, from: Ipv4Addr, msg: LanMessage, now: u64) {
        let LanMessage { sender, body } = msg;
        match body {
            MessageBody::RequestLocations => self.handle_request_locations(from, &sender, now),
            MessageBody::GameAnnounce {
                game_name,
                in_progress,
                is_direct_connect,
                options,
            } => self.handle_game_announce(
                from,
                game_name,
                in_progress,
                is_direct_connect,
                &options,
                now,
            ),
            MessageBody::LobbyAnnounce => self.handle_lobby_announce(from, &sender, now),
            MessageBody::RequestJoin {
                game_ip,
                exe_crc,
                ini_crc,
                serial,
            } => {
                let request = JoinRequest {
                    game_ip,
                    exe_crc,
                    ini_crc,
                    serial,
                };
                self.handle_request_join(from, &sender, &request, now);
            }
            MessageBody::JoinAccept {
                game_name,
                player_ip,
                slot,
            } => self.handle_join_accept(from, &sender, &game_name, player_ip, slot, now),
            MessageBody::JoinDeny { game_name, reason } => {
                self.handle_join_deny(from, &game_name, reason)
            }
            MessageBody::RequestGameLeave { game_name } => self.handle_game_leave(from, &game_name),
            MessageBody::RequestLobbyLeave => self.handle_lobby_leave(from),
            MessageBody::SetAccept {
                game_name,
                accepted,
            } => self.handle_set_accept(from, &game_name, accepted),
            MessageBody::MapAvailability {
                game_name,
                map_crc,
                has_map,
            } => self.handle_map_availability(from, &game_name, map_crc, has_map),
            MessageBody::Chat {
                game_name,
                kind,
                text,
            } => self.handle_chat(from, &sender, &game_name, kind, &text),
            MessageBody::GameStart => self.handle_game_start(from),
            MessageBody::GameStartTimer { seconds } => self.handle_game_start_timer(from, seconds),
            MessageBody::GameOptions { options } => self.handle_game_options(from, &options, now),
            MessageBody::Inactive => self.handle_inactive(from),
            MessageBody::RequestGameInfo { requester_ip } => {
                self.handle_request_game_info(from, requester_ip)
            }
        }
    }

    /// The current game, if it is called `game_name`.
    fn current_named(&self, game_name: &str) -> Option<&LanGameInfo> {
        self.current.as_ref().filter(|g| g.name == game_name)
    }

    // -----------------------------------------------------------------------
    // Lobby presence
    // -----------------------------------------------------------------------

    fn upsert_lobby_player(&mut self, from: Ipv4Addr, sender: &SenderInfo, now: u64) {
        let player = LanPlayer::new(from, &sender.name, sender.login.clone(), sender.host.clone(), now);
        match self.roster.upsert_player(player) {
            PlayerUpdate::Added => self.notify_player_list(),
            PlayerUpdate::Renamed { .. } => {
                let name = sanitize_name(&sender.name);
                self.frontend.on_name_change(from, &name);
                self.notify_player_list();
            }
            PlayerUpdate::Refreshed => {}
        }
    }

    /// Someone entered the lobby and wants to know who's around.
    fn handle_request_locations(&mut self, from: Ipv4Addr, sender: &SenderInfo, now: u64) {
        self.upsert_lobby_player(from, sender, now);
        let hosting_listed = self
            .current
            .as_ref()
            .is_some_and(|g| g.info.am_i_host() && !g.is_direct_connect);
        if hosting_listed {
            if let Some(body) = self.game_announce() {
                self.send(Destination::Unicast(from), body);
            }
        } else if self.current.is_none() && self.in_lobby {
            self.send(Destination::Unicast(from), MessageBody::LobbyAnnounce);
        }
    }

    fn handle_lobby_announce(&mut self, from: Ipv4Addr, sender: &SenderInfo, now: u64) {
        self.upsert_lobby_player(from, sender, now);

        // Someone announcing in the lobby isn't hosting anymore.
        let abandoned = self
            .roster
            .game_by_host(from)
            .map(|g| g.name.clone())
            .filter(|name| self.current_named(name).is_none());
        if let Some(name) = abandoned {
            self.roster.remove_game(&name);
            self.notify_game_list();
        }
    }

    fn handle_lobby_leave(&mut self, from: Ipv4Addr) {
        if self.roster.remove_player(from).is_some() {
            self.notify_player_list();
        }
    }

    fn handle_chat(
        &mut self,
        from: Ipv4Addr,
        sender: &SenderInfo,
        game_name: &str,
        kind: ChatKind,
        text: &str,
    ) {
        let relevant = if game_name.is_empty() {
            self.in_lobby
        } else {
            self.current_named(game_name).is_some()
        };
        if relevant {
            self.frontend.on_chat(&sender.name, from, text, kind);
        }
    }

    // -----------------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------------

    fn handle_game_announce(
        &mut self,
        from: Ipv4Addr,
        game_name: String,
        in_progress: bool,
        is_direct_connect: bool,
        options: &str,
        now: u64,
    ) {
        if self.current_named(&game_name).is_some() {
            return;
        }
        let direct_target = matches!(
            self.pending(),
            Some(PendingAction::JoinDirect { ip }) if *ip == from
        );
        if is_direct_connect && !direct_target {
            return;
        }

        let mut info = match options::parse(options, &self.config.limits) {
            Ok(info) => info,
            Err(e) => {
                debug!(%from, game = %game_name, error = %e, "dropping announce with bad options");
                return;
            }
        };
        if info.host_ip() != Some(from) {
            debug!(%from, game = %game_name, "announce not sent by the game's host");
            return;
        }
        info.set_local_ip(self.local_ip);
        info.set_in_progress(in_progress);
        let game = LanGameInfo::new(game_name.clone(), info, is_direct_connect, now);

        match self.roster.upsert_game(game) {
            Ok(GameUpdate::Added) => {
                info!(game = %game_name, host = %from, "game discovered");
                self.notify_game_list();
            }
            Ok(GameUpdate::Updated) => self.notify_game_list(),
            Err(e) => {
                debug!(%from, error = %e, "ignoring announce");
                if direct_target {
                    self.pending = None;
                    self.frontend.on_game_join(ReturnCode::GameExists, None);
                }
                return;
            }
        }

        if direct_target {
            self.send_join_request(game_name, from);
        }
    }

    fn handle_request_game_info(&mut self, from: Ipv4Addr, requester_ip: Ipv4Addr) {
        let Some(game) = &self.current else {
            return;
        };
        if !game.info.am_i_host() || !game.is_direct_connect {
            return;
        }
        let to = if requester_ip.is_unspecified() {
            from
        } else {
            requester_ip
        };
        if let Some(body) = self.game_announce() {
            debug!(%to, "answering direct connect");
            self.send(Destination::Unicast(to), body);
        }
    }

    // -----------------------------------------------------------------------
    // Joining (host side)
    // -----------------------------------------------------------------------

    fn handle_request_join(
        &mut self,
        from: Ipv4Addr,
        sender: &SenderInfo,
        request: &JoinRequest,
        now: u64,
    ) {
        let Some(game) = &self.current else {
            return;
        };
        if !game.info.am_i_host() || request.game_ip != self.local_ip {
            return;
        }
        let game_name = game.name.clone();

        match self.admit(from, sender, request, now) {
            Ok(Admission::Repeat(slot)) => {
                debug!(%from, slot, "repeated join request, resending accept");
                self.send_accept(game_name, from, slot);
            }
            Ok(Admission::Seated(slot)) => {
                let name = sanitize_name(&sender.name);
                info!(%from, %name, slot, "player joined");
                self.send_accept(game_name, from, slot);
                self.broadcast_options();
                self.frontend.on_player_join(slot, &name);
                self.notify_slot_list();
            }
            Err(reason) => {
                warn!(%from, name = %sender.name, %reason, "join refused");
                self.send(
                    Destination::Unicast(from),
                    MessageBody::JoinDeny { game_name, reason },
                );
            }
        }
    }

    fn send_accept(&mut self, game_name: String, player_ip: Ipv4Addr, slot: usize) {
        let body = MessageBody::JoinAccept {
            game_name,
            player_ip,
            slot: slot as i32,
        };
        self.send(Destination::Unicast(player_ip), body);
    }

    /// Seats a joiner, or says why not.
    ///
    /// The checks run in a fixed order so a requester always gets the
    /// same answer for the same situation.
    fn admit(
        &mut self,
        from: Ipv4Addr,
        sender: &SenderInfo,
        request: &JoinRequest,
        now: u64,
    ) -> Result<Admission, ReturnCode> {
        let capacity = match &self.current {
            Some(game) => self.map_capacity(&game.info),
            None => return Err(ReturnCode::GameGone),
        };
        let config = &self.config;
        let Some(game) = self.current.as_mut() else {
            return Err(ReturnCode::GameGone);
        };
        let info = &mut game.info;

        if info.is_in_progress() {
            return Err(ReturnCode::GameStarted);
        }
        if config.check_crc && (request.exe_crc != config.exe_crc || request.ini_crc != config.ini_crc)
        {
            return Err(ReturnCode::CrcMismatch);
        }
        if let Some(slot) = info.slot_num_by_ip(from) {
            return Ok(Admission::Repeat(slot));
        }
        if !request.serial.is_empty()
            && info
                .slots()
                .iter()
                .filter_map(GameSlot::identity)
                .any(|id| id.serial == request.serial)
        {
            return Err(ReturnCode::SerialDupe);
        }
        let name = sanitize_name(&sender.name);
        if info.slot_num_by_name(&name).is_some() {
            return Err(ReturnCode::DuplicateName);
        }
        let Some(slot) = info.first_open_slot() else {
            return Err(ReturnCode::GameFull);
        };
        if info.num_players() >= capacity {
            return Err(ReturnCode::GameFull);
        }

        let identity = SlotIdentity {
            name,
            ip: from,
            port: config.game_port,
            login: sender.login.clone(),
            host: sender.host.clone(),
            serial: request.serial.clone(),
            nat_behavior: 0,
        };
        let mut seat = GameSlot::human(identity);
        seat.set_last_heard(now);
        let mut candidate = info.clone();
        candidate
            .set_slot(slot, seat)
            .map_err(|_| ReturnCode::Unknown)?;
        if let Err(e) = options::check_fits(&candidate) {
            debug!(%from, error = %e, "no room in the options string");
            return Err(ReturnCode::GameFull);
        }
        candidate.reset_accepted();
        *info = candidate;
        Ok(Admission::Seated(slot))
    }

    // -----------------------------------------------------------------------
    // Joining (joiner side)
    // -----------------------------------------------------------------------

    /// The host we asked for `game_name`, if a join for it is pending.
    fn pending_join_host(&self, game_name: &str) -> Option<Ipv4Addr> {
        match &self.pending {
            Some(Pending {
                action: PendingAction::Join { game_name: wanted, host_ip },
                ..
            }) if wanted == game_name => Some(*host_ip),
            _ => None,
        }
    }

    fn handle_join_accept(
        &mut self,
        from: Ipv4Addr,
        sender: &SenderInfo,
        game_name: &str,
        player_ip: Ipv4Addr,
        slot: i32,
        now: u64,
    ) {
        if player_ip != self.local_ip {
            return;
        }
        if self.pending_join_host(game_name) != Some(from) {
            debug!(%from, game = %game_name, "accept without a matching pending join");
            return;
        }
        let slot = match usize::try_from(slot) {
            Ok(slot) if (1..MAX_SLOTS).contains(&slot) => slot,
            _ => {
                debug!(%from, slot, "accept for an impossible slot");
                return;
            }
        };

        let mut game = match self.roster.game(game_name) {
            Some(found) => found.clone(),
            None => {
                let mut info = GameInfo::new();
                let host = GameSlot::human(SlotIdentity::new(sender.name.clone(), from));
                if let Err(e) = info.set_slot(0, host) {
                    debug!(error = %e, "cannot seat host");
                    return;
                }
                LanGameInfo::new(game_name, info, false, now)
            }
        };
        game.info.set_local_ip(self.local_ip);
        game.info.set_in_progress(false);
        game.info.enter_game();
        if let Some(host) = game.info.slot_mut(0) {
            host.set_last_heard(now);
            if let Some(identity) = host.identity_mut() {
                identity.login.clone_from(&sender.login);
                identity.host.clone_from(&sender.host);
            }
        }
        let mut seat = GameSlot::human(self.local_identity());
        seat.set_last_heard(now);
        if let Err(e) = game.info.set_slot(slot, seat) {
            debug!(error = %e, "cannot take the offered slot");
            return;
        }
        game.last_heard = now;

        info!(game = %game_name, host = %from, slot, "joined game");
        self.pending = None;
        self.countdown = None;
        self.current = Some(game);
        self.leave_lobby_for_game();
        self.frontend.on_game_join(ReturnCode::Ok, self.current.as_ref());
        self.notify_slot_list();
        self.save_prefs();
        self.sync_map_availability();
        self.resend.force();
    }

    fn handle_join_deny(&mut self, from: Ipv4Addr, game_name: &str, reason: ReturnCode) {
        if self.pending_join_host(game_name) != Some(from) {
            debug!(%from, game = %game_name, "deny without a matching pending join");
            return;
        }
        info!(game = %game_name, %reason, "join refused");
        self.pending = None;
        self.frontend.on_game_join(reason, None);
    }

    // -----------------------------------------------------------------------
    // Leaving
    // -----------------------------------------------------------------------

    fn handle_game_leave(&mut self, from: Ipv4Addr, game_name: &str) {
        let Some(game) = self.current_named(game_name) else {
            // A listed game whose host went home.
            let hosted_by_sender = self
                .roster
                .game(game_name)
                .is_some_and(|g| g.host_ip() == Some(from));
            if hosted_by_sender {
                info!(game = %game_name, "game closed by its host");
                self.roster.remove_game(game_name);
                self.notify_game_list();
            }
            return;
        };

        let am_host = game.info.am_i_host();
        let Some(slot) = game.info.slot_num_by_ip(from) else {
            return;
        };
        if slot == 0 && !am_host {
            info!(game = %game_name, "host left");
            self.host_left();
            return;
        }
        if !am_host {
            let name = game.info.slot(slot).map(|s| s.name().to_string());
            if let Some(name) = name {
                self.frontend.on_player_leave(&name);
            }
            return;
        }

        if let Some(name) = self.free_slot(slot) {
            info!(%from, %name, slot, "player left");
            self.broadcast_options();
            self.frontend.on_player_leave(&name);
            self.notify_slot_list();
        }
    }

    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    fn handle_set_accept(&mut self, from: Ipv4Addr, game_name: &str, accepted: bool) {
        if self.current_named(game_name).is_none() {
            return;
        }
        let Some(game) = self.current.as_mut() else {
            return;
        };
        let Some(seat) = game.info.slot_num_by_ip(from).and_then(|i| game.info.slot_mut(i)) else {
            return;
        };
        if accepted {
            seat.set_accept();
        } else {
            seat.unaccept();
        }
        self.frontend.on_accept(from, accepted);
    }

    fn handle_map_availability(
        &mut self,
        from: Ipv4Addr,
        game_name: &str,
        map_crc: u32,
        has_map: bool,
    ) {
        let Some(game) = self.current_named(game_name) else {
            return;
        };
        if game.info.map().crc != map_crc {
            debug!(%from, map_crc, "map availability for a different map");
            return;
        }
        let am_host = game.info.am_i_host();
        let Some(game) = self.current.as_mut() else {
            return;
        };
        let Some(seat) = game.info.slot_num_by_ip(from).and_then(|i| game.info.slot_mut(i)) else {
            return;
        };
        seat.set_map_availability(has_map);
        let name = seat.name().to_string();

        self.frontend.on_has_map(from, has_map);
        if am_host && !has_map {
            self.system_chat(&format!("{name} does not have the map"));
        }
    }

    /// Full setup from the host (joiner), or a one-field change request
    /// from a member (host).
    fn handle_game_options(&mut self, from: Ipv4Addr, text: &str, now: u64) {
        let Some(game) = &self.current else {
            return;
        };
        if game.is_in_progress() {
            return;
        }
        if game.info.am_i_host() {
            self.handle_slot_change(from, text);
        } else if game.host_ip() == Some(from) {
            self.handle_host_options(from, text, now);
        } else {
            debug!(%from, "options from someone other than the host");
        }
    }

    fn handle_slot_change(&mut self, from: Ipv4Addr, text: &str) {
        let Some(slot) = self
            .current
            .as_ref()
            .and_then(|g| g.info.slot_num_by_ip(from))
        else {
            debug!(%from, "change request from outside the game");
            return;
        };
        let change = match SlotChange::parse(text) {
            Ok(change) => change,
            Err(e) => {
                debug!(%from, error = %e, "dropping malformed change request");
                return;
            }
        };
        match self.apply_change(slot, &change) {
            Ok(ChangeOutcome::Hello) => {
                if let Some(options) = self.options_string() {
                    self.send(Destination::Unicast(from), MessageBody::GameOptions { options });
                }
            }
            Ok(ChangeOutcome::PicksChanged) => self.frontend.on_game_options(from, slot, text),
            Ok(ChangeOutcome::Rebroadcast | ChangeOutcome::Unchanged) => {}
            Err(e) => warn!(%from, slot, %change, error = %e, "change refused"),
        }
    }

    fn handle_host_options(&mut self, from: Ipv4Addr, text: &str, now: u64) {
        let parsed = match options::parse(text, &self.config.limits) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(%from, error = %e, "dropping bad options from host");
                return;
            }
        };
        if parsed.host_ip() != Some(from) {
            debug!(%from, "options name a different host");
            return;
        }
        if parsed.slot_num_by_ip(self.local_ip).is_none() {
            if matches!(self.pending(), Some(PendingAction::Leave)) {
                info!("leave confirmed by host");
            } else {
                info!("removed from the game by the host");
            }
            self.finish_leave();
            return;
        }

        let Some(game) = self.current.as_mut() else {
            return;
        };
        game.info.apply_options(parsed);
        game.last_heard = now;
        self.frontend.on_game_options(from, 0, text);
        self.notify_slot_list();
        self.sync_map_availability();
    }

    /// Joiner: tells everyone if the host's idea of whether we have the
    /// map is wrong.
    fn sync_map_availability(&mut self) {
        let Some(game) = &self.current else {
            return;
        };
        if game.info.am_i_host() || game.is_in_progress() || self.pending.is_some() {
            return;
        }
        let Some(seat) = game.info.local_slot_num().and_then(|i| game.info.slot(i)) else {
            return;
        };
        let map = game.info.map();
        if seat.has_map() != self.frontend.has_map(&map.path, map.crc) {
            self.request_has_map();
        }
    }

    fn handle_inactive(&mut self, from: Ipv4Addr) {
        let Some(game) = self.current.as_mut() else {
            return;
        };
        let Some(slot) = game.info.slot_num_by_ip(from) else {
            return;
        };
        let host_should_unaccept = game.info.am_i_host() && slot != 0 && !game.is_in_progress();
        if host_should_unaccept {
            if let Some(seat) = game.info.slot_mut(slot) {
                seat.unaccept();
            }
            info!(%from, slot, "player went inactive");
            self.broadcast_options();
            self.notify_slot_list();
        }
        self.frontend.on_inactive(from);
    }

    // -----------------------------------------------------------------------
    // Starting (joiner side)
    // -----------------------------------------------------------------------

    fn handle_game_start_timer(&mut self, from: Ipv4Addr, seconds: i32) {
        let from_host = self
            .current
            .as_ref()
            .is_some_and(|g| !g.info.am_i_host() && g.host_ip() == Some(from));
        if from_host {
            self.frontend.on_game_start_timer(seconds);
        }
    }

    fn handle_game_start(&mut self, from: Ipv4Addr) {
        let Some(game) = &self.current else {
            return;
        };
        if game.info.am_i_host() || game.host_ip() != Some(from) || game.is_in_progress() {
            return;
        }
        if self.pending.is_some() {
            return;
        }
        let map = game.info.map().clone();
        let game_name = game.name.clone();
        if !self.frontend.has_map(&map.path, map.crc) {
            warn!(game = %game_name, map = %map.path, "match started without the map, leaving");
            self.broadcast(MessageBody::RequestGameLeave { game_name });
            self.save_prefs();
            self.return_to_lobby();
            self.frontend.on_map_transfer_failed(&map.path);
            return;
        }
        self.begin_match();
    }
}
