//! Typed-in lines to lobby commands.

use std::net::Ipv4Addr;

use lanlobby::prelude::*;

pub const HELP: &str = "\
commands:
  /name NAME           change your name
  /host NAME           host a game listed in the lobby
  /direct-host NAME    host a game reachable by address only
  /join NAME           join a listed game
  /connect IP          join the game hosted at IP
  /leave               leave the current game
  /accept              accept the current setup
  /map PATH            host: switch map
  /set KEY=VALUE       change your slot (Color=3, PlayerTemplate=-2, Team=1, ...)
  /slot N STATE        host: open|closed|easy|medium|brutal
  /start               host: start the match
  /away, /back         mark yourself inactive or active
  /me TEXT             emote
  /quit                leave and exit
anything else is said to the lobby or game";

/// Parses one input line. `Ok(None)` means there is nothing to send.
pub fn parse(line: &str) -> Result<Option<LobbyCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(LobbyCommand::Chat {
            text: line.to_string(),
            kind: ChatKind::Normal,
        }));
    };
    let (verb, arg) = match rest.split_once(char::is_whitespace) {
        Some((verb, arg)) => (verb, arg.trim()),
        None => (rest, ""),
    };

    let command = match verb {
        "name" => LobbyCommand::SetName(required(arg, "/name NAME")?),
        "host" => LobbyCommand::CreateGame {
            name: arg.to_string(),
            direct: false,
        },
        "direct-host" => LobbyCommand::CreateGame {
            name: arg.to_string(),
            direct: true,
        },
        "join" => LobbyCommand::JoinGame(required(arg, "/join NAME")?),
        "connect" => {
            let ip: Ipv4Addr = arg
                .parse()
                .map_err(|_| format!("not an IPv4 address: {arg:?}"))?;
            LobbyCommand::JoinDirect(ip)
        }
        "leave" => LobbyCommand::LeaveGame,
        "accept" => LobbyCommand::Accept,
        "map" => LobbyCommand::SelectMap(required(arg, "/map PATH")?),
        "set" => LobbyCommand::ChangeSlot(SlotChange::parse(arg).map_err(|e| e.to_string())?),
        "slot" => parse_slot(arg)?,
        "start" => LobbyCommand::StartGame,
        "away" => LobbyCommand::SetActive(false),
        "back" => LobbyCommand::SetActive(true),
        "me" => LobbyCommand::Chat {
            text: required(arg, "/me TEXT")?,
            kind: ChatKind::Emote,
        },
        "quit" | "exit" => LobbyCommand::Shutdown,
        "help" => return Err(HELP.to_string()),
        other => return Err(format!("unknown command /{other}, try /help")),
    };
    Ok(Some(command))
}

fn required(arg: &str, usage: &str) -> Result<String, String> {
    if arg.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(arg.to_string())
    }
}

fn parse_slot(arg: &str) -> Result<LobbyCommand, String> {
    let usage = || "usage: /slot N open|closed|easy|medium|brutal".to_string();
    let mut words = arg.split_whitespace();
    let slot = words
        .next()
        .and_then(|n| n.parse().ok())
        .ok_or_else(usage)?;
    let state = match words.next() {
        Some("open") => SlotState::Open,
        Some("closed") => SlotState::Closed,
        Some("easy") => SlotState::EasyAi,
        Some("medium") => SlotState::MediumAi,
        Some("brutal") => SlotState::BrutalAi,
        _ => return Err(usage()),
    };
    Ok(LobbyCommand::SetSlotState { slot, state })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(
            parse("  hello there "),
            Ok(Some(LobbyCommand::Chat {
                text: "hello there".into(),
                kind: ChatKind::Normal,
            }))
        );
        assert_eq!(parse("   "), Ok(None));
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            parse("/connect 10.0.0.7"),
            Ok(Some(LobbyCommand::JoinDirect(Ipv4Addr::new(10, 0, 0, 7))))
        );
        assert_eq!(
            parse("/set Color=3"),
            Ok(Some(LobbyCommand::ChangeSlot(SlotChange::Color(3))))
        );
        assert_eq!(
            parse("/slot 4 brutal"),
            Ok(Some(LobbyCommand::SetSlotState {
                slot: 4,
                state: SlotState::BrutalAi,
            }))
        );
        assert_eq!(parse("/quit"), Ok(Some(LobbyCommand::Shutdown)));
    }

    #[test]
    fn test_bad_input() {
        assert!(parse("/join").is_err());
        assert!(parse("/connect nowhere").is_err());
        assert!(parse("/set Colour=3").is_err());
        assert!(parse("/slot x open").is_err());
        assert!(parse("/dance").is_err());
    }
}
