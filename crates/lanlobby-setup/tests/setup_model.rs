//! Host and joiner replicas kept in step through the options string.

use std::net::Ipv4Addr;

use lanlobby_setup::{
    options, GameInfo, GameSlot, MapInfo, SetupError, SetupLimits, SlotChange, SlotIdentity,
    SlotState, TEMPLATE_OBSERVER, UNSET,
};

const HOST: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 10);
const JOE: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 11);
const ANN: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 12);

fn limits() -> SetupLimits {
    SetupLimits::default()
}

/// The host's authoritative copy with Joe and Ann seated.
fn host_copy() -> GameInfo {
    let mut game = GameInfo::new();
    game.set_local_ip(HOST);
    game.set_map(MapInfo::new("maps/alpine assault/alpine assault.map", 0xCAFE, 2048, 0));
    game.set_slot(0, GameSlot::human(SlotIdentity::new("Host", HOST)))
        .unwrap();
    game.adjust_slots_for_map(4);
    game.enter_game();
    game.set_slot(1, GameSlot::human(SlotIdentity::new("Joe", JOE)))
        .unwrap();
    game.set_slot(2, GameSlot::human(SlotIdentity::new("Ann", ANN)))
        .unwrap();
    game
}

/// A joiner's replica, built only from what the host broadcast.
fn replica_of(host: &GameInfo, local: Ipv4Addr) -> GameInfo {
    let mut game = GameInfo::new();
    game.set_local_ip(local);
    game.enter_game();
    game.apply_options(options::parse(&options::serialize(host), &limits()).unwrap());
    game
}

// =========================================================================
// Replication
// =========================================================================

#[test]
fn test_replica_matches_host_after_broadcast() {
    let host = host_copy();
    let joe = replica_of(&host, JOE);

    assert_eq!(options::serialize(&joe), options::serialize(&host));
    assert_eq!(joe.local_slot_num(), Some(1));
    assert!(!joe.am_i_host());
    assert_eq!(joe.host_ip(), Some(HOST));
    assert_eq!(joe.first_open_slot(), Some(3));
}

/// What a joiner does with a broadcast: commit it only if it parses.
fn receive(replica: &mut GameInfo, text: &str) -> bool {
    match options::parse(text, &limits()) {
        Ok(parsed) => {
            replica.apply_options(parsed);
            true
        }
        Err(_) => false,
    }
}

#[test]
fn test_bad_options_leave_replica_untouched() {
    let mut host = host_copy();
    let mut joe = replica_of(&host, JOE);
    let before = joe.clone();

    // The host moves on, but the broadcast carrying it is corrupt.
    host.apply_slot_change(2, &SlotChange::Color(4), &limits())
        .unwrap();
    let broken = options::serialize(&host).replace("O:", "Q:");
    assert!(!receive(&mut joe, &broken));
    assert_eq!(joe, before);
    assert_eq!(joe.slot(2).unwrap().color(), UNSET);

    // The next good broadcast catches the replica up.
    assert!(receive(&mut joe, &options::serialize(&host)));
    assert_eq!(joe.slot(2).unwrap().color(), 4);
    assert_eq!(joe.local_slot_num(), Some(1));
}

#[test]
fn test_map_path_survives_replication() {
    let host = host_copy();
    let text = options::serialize(&host);
    assert!(text.contains("M=00maps/alpine assault;"));

    let joe = replica_of(&host, JOE);
    assert_eq!(joe.map().path, "maps/alpine assault/alpine assault.map");
}

// =========================================================================
// Draft conflicts
// =========================================================================

#[test]
fn test_second_request_for_same_color_loses() {
    let mut host = host_copy();

    // Joe asks first and gets colour 3.
    let joe_asks = SlotChange::parse("Color=3").unwrap();
    host.apply_slot_change(1, &joe_asks, &limits()).unwrap();

    // Ann's identical request arrives after it and is refused.
    let ann_asks = SlotChange::parse("Color=3").unwrap();
    let err = host.apply_slot_change(2, &ann_asks, &limits()).unwrap_err();
    assert_eq!(err, SetupError::ColorTaken { color: 3, holder: 1 });

    let ann = replica_of(&host, ANN);
    assert_eq!(ann.slot(1).unwrap().color(), 3);
    assert_eq!(ann.slot(2).unwrap().color(), UNSET);
}

#[test]
fn test_picks_unique_among_occupied_slots() {
    let mut host = host_copy();
    let mut ai = GameSlot::with_state(SlotState::BrutalAi);
    ai.set_start_position(4);
    host.set_slot(3, ai).unwrap();

    let err = host
        .apply_slot_change(1, &SlotChange::StartPos(4), &limits())
        .unwrap_err();
    assert_eq!(err, SetupError::StartPositionTaken { position: 4, holder: 3 });

    // An open seat never blocks a pick.
    host.set_slot(3, GameSlot::with_state(SlotState::Open)).unwrap();
    host.apply_slot_change(1, &SlotChange::StartPos(4), &limits())
        .unwrap();
}

#[test]
fn test_observer_switch_replicates() {
    let mut host = host_copy();
    host.apply_slot_change(2, &SlotChange::Color(5), &limits()).unwrap();
    host.apply_slot_change(2, &SlotChange::Team(1), &limits()).unwrap();

    host.apply_slot_change(2, &SlotChange::PlayerTemplate(TEMPLATE_OBSERVER), &limits())
        .unwrap();
    assert_eq!(
        host.apply_slot_change(2, &SlotChange::Color(5), &limits()),
        Err(SetupError::ObserverPick("color"))
    );

    let joe = replica_of(&host, JOE);
    let ann = joe.slot(2).unwrap();
    assert!(ann.is_observer());
    assert_eq!((ann.color(), ann.team()), (UNSET, UNSET));
    assert_eq!(joe.num_non_observer_players(), 2);
}

#[test]
fn test_pick_change_invalidates_agreement_everywhere() {
    let mut host = host_copy();
    host.slot_mut(1).unwrap().set_accept();
    host.slot_mut(2).unwrap().set_accept();

    host.apply_slot_change(2, &SlotChange::Team(0), &limits()).unwrap();

    let joe = replica_of(&host, JOE);
    assert!(joe.slot(0).unwrap().is_accepted());
    assert!(!joe.slot(1).unwrap().is_accepted());
    assert!(!joe.slot(2).unwrap().is_accepted());
}
