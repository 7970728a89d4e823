//! Core protocol types for the lobby wire format.
//!
//! Every datagram exchanged between lobby participants is one
//! [`LanMessage`]: a small header identifying the sender, followed by a
//! [`MessageBody`] whose variant decides how the rest of the packet is laid
//! out. The body is a Rust enum rather than a C-style union, so a handler
//! can never read a field that the sender didn't write.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Field limits
// ---------------------------------------------------------------------------

/// Size of every encoded packet, in bytes.
pub const MAX_PACKET_SIZE: usize = 476;

/// Maximum display-name length, in UTF-16 code units.
pub const PLAYER_NAME_LEN: usize = 12;

/// Maximum login-name length, in bytes.
pub const LOGIN_NAME_LEN: usize = 16;

/// Maximum host-machine-name length, in bytes.
pub const HOST_NAME_LEN: usize = 16;

/// Maximum game-name length, in UTF-16 code units.
pub const GAME_NAME_LEN: usize = 16;

/// Maximum chat-line length, in UTF-16 code units.
pub const CHAT_LEN: usize = 100;

/// Maximum serial-number length, in bytes.
pub const SERIAL_LEN: usize = 22;

// ---------------------------------------------------------------------------
// MessageKind
// ---------------------------------------------------------------------------

/// The tag at the front of every packet.
///
/// Tag values are part of the wire contract: peers running compatible
/// builds agree on them, so variants must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum MessageKind {
    /// "Where is everybody?"
    RequestLocations = 0,
    /// A host advertising its game and current options.
    GameAnnounce = 1,
    /// A participant advertising that it is browsing the lobby.
    LobbyAnnounce = 2,
    RequestJoin = 3,
    JoinAccept = 4,
    JoinDeny = 5,
    RequestGameLeave = 6,
    RequestLobbyLeave = 7,
    SetAccept = 8,
    MapAvailability = 9,
    Chat = 10,
    GameStart = 11,
    GameStartTimer = 12,
    GameOptions = 13,
    /// The sender's window lost focus.
    Inactive = 14,
    /// Direct-connect query sent to a known host address.
    RequestGameInfo = 15,
}

impl MessageKind {
    /// Every kind, in tag order.
    pub const ALL: [MessageKind; 16] = [
        Self::RequestLocations,
        Self::GameAnnounce,
        Self::LobbyAnnounce,
        Self::RequestJoin,
        Self::JoinAccept,
        Self::JoinDeny,
        Self::RequestGameLeave,
        Self::RequestLobbyLeave,
        Self::SetAccept,
        Self::MapAvailability,
        Self::Chat,
        Self::GameStart,
        Self::GameStartTimer,
        Self::GameOptions,
        Self::Inactive,
        Self::RequestGameInfo,
    ];

    /// The wire tag for this kind.
    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Looks up a kind by wire tag. Returns `None` for unknown tags.
    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// ReturnCode
// ---------------------------------------------------------------------------

/// Outcome of a join or game-creation attempt.
///
/// These travel in `JoinDeny` packets and are handed to the UI through
/// the engine's callbacks. They are results, not errors: a full game is
/// a perfectly ordinary answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReturnCode {
    #[default]
    Ok,
    Timeout,
    GameFull,
    DuplicateName,
    CrcMismatch,
    SerialDupe,
    GameStarted,
    GameExists,
    GameGone,
    Busy,
    Unknown,
}

impl ReturnCode {
    /// The value written into the `reason` field of a packet.
    pub fn to_wire(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Timeout => 1,
            Self::GameFull => 2,
            Self::DuplicateName => 3,
            Self::CrcMismatch => 4,
            Self::SerialDupe => 5,
            Self::GameStarted => 6,
            Self::GameExists => 7,
            Self::GameGone => 8,
            Self::Busy => 9,
            Self::Unknown => 10,
        }
    }

    /// Reads a wire value. Anything unrecognized becomes [`ReturnCode::Unknown`].
    pub fn from_wire(value: i32) -> Self {
        match value {
            0 => Self::Ok,
            1 => Self::Timeout,
            2 => Self::GameFull,
            3 => Self::DuplicateName,
            4 => Self::CrcMismatch,
            5 => Self::SerialDupe,
            6 => Self::GameStarted,
            7 => Self::GameExists,
            8 => Self::GameGone,
            9 => Self::Busy,
            _ => Self::Unknown,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ok => "ok",
            Self::Timeout => "timed out",
            Self::GameFull => "game is full",
            Self::DuplicateName => "name already in use",
            Self::CrcMismatch => "incompatible build",
            Self::SerialDupe => "serial already in use",
            Self::GameStarted => "game already started",
            Self::GameExists => "a game with that name exists",
            Self::GameGone => "game no longer exists",
            Self::Busy => "another request is pending",
            Self::Unknown => "unknown error",
        };
        f.write_str(text)
    }
}

// ---------------------------------------------------------------------------
// ChatKind
// ---------------------------------------------------------------------------

/// How a chat line should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChatKind {
    #[default]
    Normal,
    /// "/me waves" style action text.
    Emote,
    /// Engine-generated notice ("host not responding", ...).
    System,
}

impl ChatKind {
    pub fn to_wire(self) -> i32 {
        match self {
            Self::Normal => 0,
            Self::Emote => 1,
            Self::System => 2,
        }
    }

    pub fn from_wire(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Normal),
            1 => Some(Self::Emote),
            2 => Some(Self::System),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Identity fields stamped on every outgoing packet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SenderInfo {
    /// Display name shown in player lists.
    pub name: String,
    /// OS login of the sender.
    pub login: String,
    /// Machine name of the sender.
    pub host: String,
}

/// The kind-specific part of a packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageBody {
    RequestLocations,
    GameAnnounce {
        game_name: String,
        in_progress: bool,
        is_direct_connect: bool,
        /// Full serialized game setup.
        options: String,
    },
    LobbyAnnounce,
    RequestJoin {
        /// Address of the host being asked. Other hosts ignore the request.
        game_ip: Ipv4Addr,
        exe_crc: u32,
        ini_crc: u32,
        serial: String,
    },
    JoinAccept {
        game_name: String,
        /// The joiner the accept is for.
        player_ip: Ipv4Addr,
        slot: i32,
    },
    JoinDeny {
        game_name: String,
        reason: ReturnCode,
    },
    RequestGameLeave {
        game_name: String,
    },
    RequestLobbyLeave,
    SetAccept {
        game_name: String,
        accepted: bool,
    },
    MapAvailability {
        game_name: String,
        map_crc: u32,
        has_map: bool,
    },
    Chat {
        /// Empty for lobby chat.
        game_name: String,
        kind: ChatKind,
        text: String,
    },
    GameStart,
    GameStartTimer {
        seconds: i32,
    },
    /// Either a full serialized setup (from the host) or a single
    /// `Key=value` change request (from anyone else).
    GameOptions {
        options: String,
    },
    Inactive,
    RequestGameInfo {
        requester_ip: Ipv4Addr,
    },
}

impl MessageBody {
    /// The tag this body is encoded under.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::RequestLocations => MessageKind::RequestLocations,
            Self::GameAnnounce { .. } => MessageKind::GameAnnounce,
            Self::LobbyAnnounce => MessageKind::LobbyAnnounce,
            Self::RequestJoin { .. } => MessageKind::RequestJoin,
            Self::JoinAccept { .. } => MessageKind::JoinAccept,
            Self::JoinDeny { .. } => MessageKind::JoinDeny,
            Self::RequestGameLeave { .. } => MessageKind::RequestGameLeave,
            Self::RequestLobbyLeave => MessageKind::RequestLobbyLeave,
            Self::SetAccept { .. } => MessageKind::SetAccept,
            Self::MapAvailability { .. } => MessageKind::MapAvailability,
            Self::Chat { .. } => MessageKind::Chat,
            Self::GameStart => MessageKind::GameStart,
            Self::GameStartTimer { .. } => MessageKind::GameStartTimer,
            Self::GameOptions { .. } => MessageKind::GameOptions,
            Self::Inactive => MessageKind::Inactive,
            Self::RequestGameInfo { .. } => MessageKind::RequestGameInfo,
        }
    }
}

/// One lobby datagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanMessage {
    pub sender: SenderInfo,
    pub body: MessageBody,
}

impl LanMessage {
    pub fn new(sender: SenderInfo, body: MessageBody) -> Self {
        Self { sender, body }
    }

    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }
}
