//! Wire protocol for lanlobby.
//!
//! This crate defines the "language" lobby participants speak:
//!
//! - **Types** ([`LanMessage`], [`MessageBody`], [`MessageKind`],
//!   [`ReturnCode`], [`ChatKind`]): what travels on the wire.
//! - **Codec** ([`Codec`] trait, [`PacketCodec`], [`JsonCodec`]): how
//!   those messages become datagrams.
//! - **Errors** ([`ProtocolError`]): why a datagram was unusable.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (raw datagrams) and the
//! engine (game setup, lobby lists). It knows nothing about games or slots;
//! the options string a host broadcasts is just bounded text here.
//!
//! ```text
//! Transport (bytes) → Protocol (LanMessage) → Engine (setup model)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
pub mod packet;
pub mod text;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{Codec, PacketCodec};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use packet::{HEADER_LEN, MAX_OPTIONS_LEN};
pub use types::{
    ChatKind, LanMessage, MessageBody, MessageKind, ReturnCode, SenderInfo, CHAT_LEN,
    GAME_NAME_LEN, HOST_NAME_LEN, LOGIN_NAME_LEN, MAX_PACKET_SIZE, PLAYER_NAME_LEN, SERIAL_LEN,
};
