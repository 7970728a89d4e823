//! Unified error type for the lanlobby engine.
//!
//! Most things that go wrong in a lobby are not errors at all: a refused
//! join is a [`ReturnCode`](lanlobby_protocol::ReturnCode) handed to
//! [`LobbyEvents`](crate::LobbyEvents), and a garbled datagram is logged
//! and dropped. `LanError` is what's left: local misuse of a request and
//! failures of the machine itself.

use std::io;
use std::path::PathBuf;

use lanlobby_protocol::ProtocolError;
use lanlobby_setup::{OptionsError, SetupError};
use lanlobby_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each wrapped variant generates the `From`
/// impl, so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LanError {
    /// The socket failed. This is the only error `update()` returns.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A host-side setup change was refused.
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Prefs(#[from] PrefsError),

    /// The request needs a current game and there isn't one.
    #[error("not in a game")]
    NotInGame,

    /// The request is reserved for the host of the current game.
    #[error("only the host can do that")]
    NotHost,

    #[error("map {0:?} is not available locally")]
    UnknownMap(String),

    /// Human seats are only filled by a join request.
    #[error("slot {0} can only be taken by a joining player")]
    SeatReserved(usize),
}

/// Why a preferences file couldn't be used.
#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A line that is neither blank, a comment, nor `key=value`.
    #[error("line {line}: expected key=value, found {text:?}")]
    Malformed { line: usize, text: String },
}

/// A reason the host can't start the match yet.
///
/// Returned by [`request_game_start`](crate::LanApi::request_game_start);
/// the same text is posted to the local chat as a system line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartBlocker {
    #[error("not in a game")]
    NotInGame,

    #[error("only the host can start the game")]
    NotHost,

    #[error("the game has already started")]
    AlreadyStarted,

    #[error("the host has not accepted")]
    HostNotAccepted,

    #[error("{players} players but the map only holds {capacity}")]
    TooManyPlayers { players: usize, capacity: usize },

    #[error("at least one human player is needed")]
    NoHumanPlayers,

    #[error("{players} players, at least {needed} are needed")]
    NotEnoughPlayers { players: usize, needed: usize },

    #[error("{0} has not accepted")]
    NotAccepted(String),

    #[error("{0} does not have the map")]
    MissingMap(String),
}
