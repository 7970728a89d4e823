//! Lobby presence: discovery of players and games, chat, renames, expiry.

mod common;

use common::*;
use lanlobby::prelude::*;

fn player_names(peer: &Peer) -> Vec<String> {
    peer.players().iter().map(|p| p.name.clone()).collect()
}

fn game_names(peer: &Peer) -> Vec<String> {
    peer.games().iter().map(|g| g.name.clone()).collect()
}

// =========================================================================
// Discovery
// =========================================================================

#[test]
fn test_players_discover_each_other() {
    let lan = Lan::new();
    let mut ann = lan.peer(1, "Ann");
    let mut joe = lan.peer(2, "Joe");

    ann.request_lobby_enter();
    joe.request_lobby_enter();
    assert_eq!(ann.phase(), SessionPhase::InLobby);
    lan.settle(&mut [&mut ann, &mut joe], 2);

    assert_eq!(player_names(&ann), ["Ann", "Joe"]);
    assert_eq!(player_names(&joe), ["Ann", "Joe"]);
    assert!(
        joe.frontend()
            .saw(&Event::PlayerList(vec!["Ann".into(), "Joe".into()]))
    );
}

#[test]
fn test_hosted_game_is_listed_and_host_leaves_player_list() {
    let lan = Lan::new();
    let mut ann = lan.peer(1, "Ann");
    let mut joe = lan.peer(2, "Joe");
    hosted_lobby(&lan, &mut ann, &mut [&mut joe], "Friday");

    assert_eq!(ann.phase(), SessionPhase::InGameSetup { is_host: true });
    assert!(ann.frontend().saw(&Event::GameCreate(ReturnCode::Ok)));
    assert_eq!(game_names(&joe), ["Friday"]);
    assert_eq!(player_names(&joe), ["Joe"]);

    let listed = joe.games()[0];
    assert_eq!(listed.host_ip(), Some(ip(1)));
    assert_eq!(listed.host_name(), "Ann");
    assert!(!listed.is_in_progress());
}

#[test]
fn test_game_disappears_when_host_returns_to_lobby() {
    let lan = Lan::new();
    let mut ann = lan.peer(1, "Ann");
    let mut joe = lan.peer(2, "Joe");
    hosted_lobby(&lan, &mut ann, &mut [&mut joe], "Friday");

    ann.request_game_leave();
    assert_eq!(ann.phase(), SessionPhase::InLobby);
    lan.settle(&mut [&mut ann, &mut joe], 2);

    assert!(game_names(&joe).is_empty());
    assert_eq!(player_names(&joe), ["Ann", "Joe"]);
    assert!(joe.frontend().saw(&Event::GameList(vec![])));
}

#[test]
fn test_create_refused_outside_lobby_or_with_taken_name() {
    let lan = Lan::new();
    let mut ann = lan.peer(1, "Ann");
    let mut joe = lan.peer(2, "Joe");

    joe.request_game_create("Early", false);
    assert!(joe.frontend().saw(&Event::GameCreate(ReturnCode::Busy)));
    assert!(joe.current_game().is_none());

    hosted_lobby(&lan, &mut ann, &mut [&mut joe], "Friday");
    joe.request_game_create("Friday", false);
    assert!(joe.frontend().saw(&Event::GameCreate(ReturnCode::GameExists)));
    assert_eq!(joe.phase(), SessionPhase::InLobby);
}

#[test]
fn test_blank_game_name_uses_player_name() {
    let lan = Lan::new();
    let mut ann = lan.peer(1, "Ann");
    ann.request_lobby_enter();
    ann.request_game_create("   ", false);
    assert_eq!(ann.current_game().map(|g| g.name.as_str()), Some("Ann"));
}

// =========================================================================
// Chat and names
// =========================================================================

#[test]
fn test_lobby_chat_reaches_lobby_only() {
    let lan = Lan::new();
    let mut ann = lan.peer(1, "Ann");
    let mut joe = lan.peer(2, "Joe");
    let mut bob = lan.peer(3, "Bob");
    hosted_lobby(&lan, &mut ann, &mut [&mut joe, &mut bob], "Friday");
    join(&lan, &mut ann, &mut bob, "Friday");

    joe.request_chat("anyone up for a game?", ChatKind::Normal);
    lan.step(&mut [&mut ann, &mut joe, &mut bob]);

    let line = Event::Chat {
        name: "Joe".into(),
        text: "anyone up for a game?".into(),
        kind: ChatKind::Normal,
    };
    assert!(joe.frontend().saw(&line), "local echo");
    assert!(!ann.frontend().saw(&line));
    assert!(!bob.frontend().saw(&line));

    bob.request_chat("gl hf", ChatKind::Emote);
    lan.step(&mut [&mut ann, &mut joe, &mut bob]);
    let emote = Event::Chat {
        name: "Bob".into(),
        text: "gl hf".into(),
        kind: ChatKind::Emote,
    };
    assert!(ann.frontend().saw(&emote));
    assert!(!joe.frontend().saw(&emote));
}

#[test]
fn test_rename_is_announced() {
    let lan = Lan::new();
    let mut ann = lan.peer(1, "Ann");
    let mut joe = lan.peer(2, "Joe");
    ann.request_lobby_enter();
    joe.request_lobby_enter();
    lan.settle(&mut [&mut ann, &mut joe], 2);

    joe.request_set_name("  Joseph  ");
    assert_eq!(joe.name(), "Joseph");
    lan.step(&mut [&mut ann, &mut joe]);

    assert!(ann.frontend().saw(&Event::NameChange(ip(2), "Joseph".into())));
    assert_eq!(player_names(&ann), ["Ann", "Joseph"]);
    assert_eq!(joe.preferences().user_name(), Some("Joseph"));
}

#[test]
fn test_rename_refused_while_joining() {
    let lan = Lan::new();
    let mut ann = lan.peer(1, "Ann");
    let mut joe = lan.peer(2, "Joe");
    hosted_lobby(&lan, &mut ann, &mut [&mut joe], "Friday");

    joe.request_game_join("Friday");
    joe.request_set_name("Joseph");
    assert_eq!(joe.name(), "Joe");
    assert!(joe.frontend().saw(&Event::NameChange(ip(2), "Joe".into())));
}

// =========================================================================
// Leaving and expiry
// =========================================================================

#[test]
fn test_lobby_leave_removes_player() {
    let lan = Lan::new();
    let mut ann = lan.peer(1, "Ann");
    let mut joe = lan.peer(2, "Joe");
    ann.request_lobby_enter();
    joe.request_lobby_enter();
    lan.settle(&mut [&mut ann, &mut joe], 2);

    joe.request_lobby_leave();
    assert_eq!(joe.phase(), SessionPhase::Idle);
    assert!(joe.players().is_empty());
    lan.step(&mut [&mut ann, &mut joe]);
    assert_eq!(player_names(&ann), ["Ann"]);
}

#[test]
fn test_silent_player_expires() {
    let lan = Lan::new();
    let mut ann = lan.peer(1, "Ann");
    let mut joe = lan.peer(2, "Joe");
    let mut bob = lan.peer(3, "Bob");
    ann.request_lobby_enter();
    joe.request_lobby_enter();
    bob.request_lobby_enter();
    lan.settle(&mut [&mut ann, &mut joe, &mut bob], 2);
    assert_eq!(ann.players().len(), 3);

    // Bob's machine drops off without saying goodbye.
    lan.net.set_link_down(ip(3), true);
    let stale = ann.config().lobby_stale_ms();
    lan.run_for(&mut [&mut ann, &mut joe], stale + 1_000);

    assert_eq!(player_names(&ann), ["Ann", "Joe"]);
    assert_eq!(player_names(&joe), ["Ann", "Joe"]);
}

#[test]
fn test_garbage_datagrams_are_ignored() {
    let lan = Lan::new();
    let mut ann = lan.peer(1, "Ann");
    ann.request_lobby_enter();

    let mut noise = lan.net.join(ip(9));
    noise
        .send(lanlobby_transport::Destination::Broadcast, b"not a lobby packet")
        .unwrap();
    lan.step(&mut [&mut ann]);

    assert_eq!(player_names(&ann), ["Ann"]);
    assert_eq!(lan.net.pending(ip(1)), 0);
}
