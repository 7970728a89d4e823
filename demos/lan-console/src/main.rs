//! lan-console: play the LAN lobby from a terminal.
//!
//! ```text
//! RUST_LOG=lanlobby=debug cargo run -p lan-console -- --name Ann --maps maps.json
//! ```
//!
//! The map catalog is a JSON object from map path to metadata:
//!
//! ```text
//! { "maps/alpine assault/alpine assault.map": { "crc": 2712847316, "size": 48000, "num_players": 8 } }
//! ```

mod commands;

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::Parser;
use lanlobby::prelude::*;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lan-console")]
#[command(about = "Terminal client for the LAN game lobby")]
struct Cli {
    /// Display name (defaults to the preference file, then "Player")
    #[arg(long, default_value = "")]
    name: String,

    /// Lobby UDP port
    #[arg(long)]
    port: Option<u16>,

    /// Engine settings as JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Map catalog as JSON
    #[arg(long)]
    maps: Option<PathBuf>,

    /// Preference file, read at start and written on join, leave and start
    #[arg(long, default_value = "lan-console.ini")]
    prefs: PathBuf,
}

#[derive(Deserialize)]
struct CatalogEntry {
    crc: u32,
    size: u32,
    num_players: usize,
}

// ---------------------------------------------------------------------------
// Frontend
// ---------------------------------------------------------------------------

/// Prints every lobby event as a line of text.
struct Console {
    maps: HashMap<String, MapMetadata>,
}

impl LobbyEvents for Console {
    fn on_game_list(&mut self, games: &[&LanGameInfo]) {
        let list: Vec<String> = games
            .iter()
            .map(|g| {
                let state = if g.is_in_progress() { "playing" } else { "open" };
                format!("{} ({}, {}/8, {state})", g.name, g.host_name(), g.info.num_players())
            })
            .collect();
        println!("games: {}", list.join(", "));
    }

    fn on_player_list(&mut self, players: &[&LanPlayer]) {
        let names: Vec<&str> = players.iter().map(|p| p.name.as_str()).collect();
        println!("lobby: {}", names.join(", "));
    }

    fn on_game_create(&mut self, result: ReturnCode) {
        println!("create: {result}");
    }

    fn on_game_join(&mut self, result: ReturnCode, game: Option<&LanGameInfo>) {
        match game {
            Some(game) => println!("joined {} hosted by {}", game.name, game.host_name()),
            None => println!("join: {result}"),
        }
    }

    fn on_player_join(&mut self, slot: usize, name: &str) {
        println!("{name} joined in slot {slot}");
    }

    fn on_player_leave(&mut self, name: &str) {
        println!("{name} left");
    }

    fn on_host_leave(&mut self) {
        println!("the host left, back in the lobby");
    }

    fn on_slot_list(&mut self, game: &GameInfo) {
        for (index, slot) in game.slots().iter().enumerate() {
            let mark = if slot.is_accepted() { '*' } else { ' ' };
            println!(
                "  {index}{mark} {:<12} color {:>2} template {:>2} team {:>2}",
                slot.display_name(),
                slot.color(),
                slot.player_template(),
                slot.team()
            );
        }
    }

    fn on_chat(&mut self, name: &str, _ip: Ipv4Addr, text: &str, kind: ChatKind) {
        match kind {
            ChatKind::Normal => println!("<{name}> {text}"),
            ChatKind::Emote => println!("* {name} {text}"),
            ChatKind::System => println!("-- {text}"),
        }
    }

    fn on_game_start_timer(&mut self, seconds: i32) {
        println!("starting in {seconds}...");
    }

    fn on_name_change(&mut self, ip: Ipv4Addr, name: &str) {
        println!("{ip} is now {name}");
    }

    fn on_map_transfer_failed(&mut self, map: &str) {
        println!("cannot play: {map} is missing");
    }
}

impl MapCache for Console {
    fn find_map(&self, path: &str) -> Option<MapMetadata> {
        self.maps.get(path).copied()
    }
}

impl GameBootstrap for Console {
    fn start_simulation(&mut self, game: &GameInfo, seed: i32) {
        println!(
            "match on {} with {} players, seed {seed}",
            game.map().path,
            game.num_players()
        );
    }
}

fn load_catalog(
    path: Option<&PathBuf>,
) -> Result<HashMap<String, MapMetadata>, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(HashMap::new());
    };
    let entries: HashMap<String, CatalogEntry> =
        serde_json::from_str(&std::fs::read_to_string(path)?)?;
    Ok(entries
        .into_iter()
        .map(|(map, e)| {
            let meta = MapMetadata {
                crc: e.crc,
                size: e.size,
                num_players: e.num_players,
            };
            (map, meta)
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();

    let mut config: LanConfig = match &cli.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => LanConfig::default(),
    };
    if let Some(port) = cli.port {
        config.lobby_port = port;
    }
    let maps = load_catalog(cli.maps.as_ref())?;
    tracing::info!(maps = maps.len(), port = config.lobby_port, "starting");

    let transport = UdpTransport::bind(config.lobby_port).await?;
    let api = LanApi::builder(config)
        .name(&cli.name)
        .login(&std::env::var("USER").unwrap_or_default())
        .host(&std::env::var("HOSTNAME").unwrap_or_default())
        .preferences(cli.prefs)
        .build(transport, Console { maps })?;
    println!("you are {} at {}; /help for commands", api.name(), api.local_ip());

    let (tx, rx) = mpsc::channel(32);
    let lobby = tokio::spawn(run_lobby(api, rx));
    tx.send(LobbyCommand::EnterLobby).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match commands::parse(&line) {
            Ok(Some(command)) => {
                let quit = command == LobbyCommand::Shutdown;
                tx.send(command).await?;
                if quit {
                    break;
                }
            }
            Ok(None) => {}
            Err(message) => println!("{message}"),
        }
    }

    drop(tx);
    lobby.await??;
    Ok(())
}
