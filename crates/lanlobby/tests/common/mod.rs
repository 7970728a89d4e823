//! Shared harness: a recording frontend and a simulated LAN segment.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::Ipv4Addr;

use lanlobby::prelude::*;

pub const MAP_ALPINE: &str = "maps/alpine assault/alpine assault.map";
pub const MAP_DUEL: &str = "maps/duel/duel.map";

/// Steps of this size make every `update()` call do a full pass.
pub const STEP_MS: u64 = 200;

pub type Peer = LanApi<MemoryTransport, RecordingFrontend>;

pub fn ip(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(192, 168, 1, last)
}

// =========================================================================
// Recording frontend
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    GameList(Vec<String>),
    PlayerList(Vec<String>),
    GameCreate(ReturnCode),
    GameJoin(ReturnCode),
    PlayerJoin(usize, String),
    PlayerLeave(String),
    HostLeave,
    SlotList,
    Accept(Ipv4Addr, bool),
    HasMap(Ipv4Addr, bool),
    Chat {
        name: String,
        text: String,
        kind: ChatKind,
    },
    GameOptions(Ipv4Addr, usize),
    StartTimer(i32),
    GameStart,
    NameChange(Ipv4Addr, String),
    Inactive(Ipv4Addr),
    MapTransferFailed(String),
}

/// Records every callback and serves a fixed map collection.
#[derive(Debug, Default)]
pub struct RecordingFrontend {
    pub events: Vec<Event>,
    pub maps: HashMap<String, MapMetadata>,
    pub started: Vec<(GameInfo, i32)>,
}

impl RecordingFrontend {
    /// A frontend with [`MAP_ALPINE`] (8 seats) and [`MAP_DUEL`] (3 seats).
    pub fn with_maps() -> Self {
        let mut maps = HashMap::new();
        maps.insert(
            MAP_ALPINE.to_string(),
            MapMetadata {
                crc: 0xA1B2_C3D4,
                size: 48_000,
                num_players: 8,
            },
        );
        maps.insert(
            MAP_DUEL.to_string(),
            MapMetadata {
                crc: 0x0D0E_0D0E,
                size: 12_000,
                num_players: 3,
            },
        );
        Self {
            maps,
            ..Self::default()
        }
    }

    pub fn count(&self, wanted: &Event) -> usize {
        self.events.iter().filter(|e| *e == wanted).count()
    }

    pub fn saw(&self, wanted: &Event) -> bool {
        self.count(wanted) > 0
    }

    /// Every join outcome, in order.
    pub fn join_results(&self) -> Vec<ReturnCode> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::GameJoin(code) => Some(*code),
                _ => None,
            })
            .collect()
    }

    pub fn system_lines(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Chat {
                    text,
                    kind: ChatKind::System,
                    ..
                } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn timer_ticks(&self) -> Vec<i32> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::StartTimer(s) => Some(*s),
                _ => None,
            })
            .collect()
    }
}

impl LobbyEvents for RecordingFrontend {
    fn on_game_list(&mut self, games: &[&LanGameInfo]) {
        let names = games.iter().map(|g| g.name.clone()).collect();
        self.events.push(Event::GameList(names));
    }

    fn on_player_list(&mut self, players: &[&LanPlayer]) {
        let names = players.iter().map(|p| p.name.clone()).collect();
        self.events.push(Event::PlayerList(names));
    }

    fn on_game_create(&mut self, result: ReturnCode) {
        self.events.push(Event::GameCreate(result));
    }

    fn on_game_join(&mut self, result: ReturnCode, _game: Option<&LanGameInfo>) {
        self.events.push(Event::GameJoin(result));
    }

    fn on_player_join(&mut self, slot: usize, name: &str) {
        self.events.push(Event::PlayerJoin(slot, name.to_string()));
    }

    fn on_player_leave(&mut self, name: &str) {
        self.events.push(Event::PlayerLeave(name.to_string()));
    }

    fn on_host_leave(&mut self) {
        self.events.push(Event::HostLeave);
    }

    fn on_slot_list(&mut self, _game: &GameInfo) {
        self.events.push(Event::SlotList);
    }

    fn on_accept(&mut self, ip: Ipv4Addr, accepted: bool) {
        self.events.push(Event::Accept(ip, accepted));
    }

    fn on_has_map(&mut self, ip: Ipv4Addr, has_map: bool) {
        self.events.push(Event::HasMap(ip, has_map));
    }

    fn on_chat(&mut self, name: &str, _ip: Ipv4Addr, text: &str, kind: ChatKind) {
        self.events.push(Event::Chat {
            name: name.to_string(),
            text: text.to_string(),
            kind,
        });
    }

    fn on_game_options(&mut self, ip: Ipv4Addr, slot: usize, _options: &str) {
        self.events.push(Event::GameOptions(ip, slot));
    }

    fn on_game_start_timer(&mut self, seconds: i32) {
        self.events.push(Event::StartTimer(seconds));
    }

    fn on_game_start(&mut self) {
        self.events.push(Event::GameStart);
    }

    fn on_name_change(&mut self, ip: Ipv4Addr, name: &str) {
        self.events.push(Event::NameChange(ip, name.to_string()));
    }

    fn on_inactive(&mut self, ip: Ipv4Addr) {
        self.events.push(Event::Inactive(ip));
    }

    fn on_map_transfer_failed(&mut self, map: &str) {
        self.events.push(Event::MapTransferFailed(map.to_string()));
    }
}

impl MapCache for RecordingFrontend {
    fn find_map(&self, path: &str) -> Option<MapMetadata> {
        self.maps.get(path).copied()
    }
}

impl GameBootstrap for RecordingFrontend {
    fn start_simulation(&mut self, game: &GameInfo, seed: i32) {
        self.started.push((game.clone(), seed));
    }
}

// =========================================================================
// Simulated LAN
// =========================================================================

/// One broadcast segment with one shared clock.
pub struct Lan {
    pub net: MemoryNetwork,
    pub clock: ManualClock,
}

impl Lan {
    pub fn new() -> Self {
        Self {
            net: MemoryNetwork::new(),
            clock: ManualClock::new(1_000),
        }
    }

    pub fn peer(&self, last: u8, name: &str) -> Peer {
        self.peer_with(last, name, LanConfig::default(), RecordingFrontend::with_maps())
    }

    pub fn peer_with_config(&self, last: u8, name: &str, config: LanConfig) -> Peer {
        self.peer_with(last, name, config, RecordingFrontend::with_maps())
    }

    pub fn peer_with(
        &self,
        last: u8,
        name: &str,
        config: LanConfig,
        frontend: RecordingFrontend,
    ) -> Peer {
        LanApi::builder(config)
            .name(name)
            .clock(self.clock.clone())
            .build(self.net.join(ip(last)), frontend)
            .expect("build peer")
    }

    /// Moves time on by one update interval and runs every peer once, in
    /// order.
    pub fn step(&self, peers: &mut [&mut Peer]) {
        self.clock.advance(STEP_MS);
        for peer in peers.iter_mut() {
            peer.update().expect("update");
        }
    }

    pub fn settle(&self, peers: &mut [&mut Peer], steps: usize) {
        for _ in 0..steps {
            self.step(peers);
        }
    }

    /// Steps until `ms` of engine time have passed.
    pub fn run_for(&self, peers: &mut [&mut Peer], ms: u64) {
        self.settle(peers, ms.div_ceil(STEP_MS) as usize);
    }
}

// =========================================================================
// Scenarios
// =========================================================================

/// `host` enters the lobby and hosts `game` on [`MAP_ALPINE`]; every
/// joiner enters the lobby and sees it.
pub fn hosted_lobby(lan: &Lan, host: &mut Peer, joiners: &mut [&mut Peer], game: &str) {
    host.request_lobby_enter();
    for joiner in joiners.iter_mut() {
        joiner.request_lobby_enter();
    }
    lan.clock.advance(STEP_MS);
    host.update().expect("update");
    for joiner in joiners.iter_mut() {
        joiner.update().expect("update");
    }

    host.request_game_create(game, false);
    host.request_map(MAP_ALPINE).expect("select map");
    lan.clock.advance(STEP_MS);
    host.update().expect("update");
    for joiner in joiners.iter_mut() {
        joiner.update().expect("update");
        assert!(
            joiner.games().iter().any(|g| g.name == game),
            "{} did not see {game}",
            joiner.name()
        );
    }
}

/// Runs `joiner`'s join of `game` to completion.
pub fn join(lan: &Lan, host: &mut Peer, joiner: &mut Peer, game: &str) {
    joiner.request_game_join(game);
    lan.settle(&mut [&mut *host, &mut *joiner], 3);
    assert_eq!(
        joiner.phase(),
        SessionPhase::InGameSetup { is_host: false },
        "{} failed to join: {:?}",
        joiner.name(),
        joiner.frontend().join_results()
    );
}

/// The host's view of the slot `ip` sits in.
pub fn host_slot<'a>(host: &'a Peer, ip: Ipv4Addr) -> &'a GameSlot {
    let info = &host.current_game().expect("host has a game").info;
    let slot = info.slot_num_by_ip(ip).expect("seated");
    info.slot(slot).expect("slot")
}
