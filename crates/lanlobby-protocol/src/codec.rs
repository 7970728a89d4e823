//! Codec trait and implementations for turning [`LanMessage`]s into bytes.
//!
//! The engine doesn't care how a message becomes a datagram; it only
//! needs something that implements [`Codec`]. Two strategies ship:
//!
//! - [`PacketCodec`]: the fixed-layout packet every compatible peer
//!   speaks. This is what goes on a real network.
//! - [`JsonCodec`]: human-readable, handy when tracing a session by hand
//!   between two test peers. It is NOT wire compatible with `PacketCodec`.

use crate::packet;
use crate::{LanMessage, ProtocolError};

/// A codec that can encode lobby messages to bytes and decode them back.
///
/// `Send + Sync + 'static` so a codec can live inside an engine that is
/// moved onto a tokio task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a message into one datagram.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the message can't be represented in
    /// this format.
    fn encode(&self, msg: &LanMessage) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes one datagram.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the bytes are malformed, truncated,
    /// or carry an unknown kind.
    fn decode(&self, data: &[u8]) -> Result<LanMessage, ProtocolError>;
}

// ---------------------------------------------------------------------------
// PacketCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] producing the fixed-layout binary packet described in
/// [`crate::packet`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketCodec;

impl Codec for PacketCodec {
    fn encode(&self, msg: &LanMessage) -> Result<Vec<u8>, ProtocolError> {
        packet::encode(msg)
    }

    fn decode(&self, data: &[u8]) -> Result<LanMessage, ProtocolError> {
        packet::decode(data)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use lanlobby_protocol::{Codec, JsonCodec, LanMessage, MessageBody, SenderInfo};
///
/// let codec = JsonCodec;
/// let msg = LanMessage::new(SenderInfo::default(), MessageBody::RequestLocations);
///
/// let bytes = codec.encode(&msg).unwrap();
/// let decoded = codec.decode(&bytes).unwrap();
/// assert_eq!(msg, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode(&self, msg: &LanMessage) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(msg).map_err(ProtocolError::Encode)
    }

    fn decode(&self, data: &[u8]) -> Result<LanMessage, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::{MessageBody, SenderInfo};

    fn join_request() -> LanMessage {
        LanMessage::new(
            SenderInfo {
                name: "Bob".into(),
                login: "bob".into(),
                host: "laptop".into(),
            },
            MessageBody::RequestJoin {
                game_ip: Ipv4Addr::new(10, 0, 0, 1),
                exe_crc: 1,
                ini_crc: 2,
                serial: "S-1".into(),
            },
        )
    }

    #[test]
    fn test_packet_codec_round_trip() {
        let codec = PacketCodec;
        let msg = join_request();
        assert_eq!(codec.decode(&codec.encode(&msg).unwrap()).unwrap(), msg);
    }

    #[test]
    fn test_packet_codec_rejects_garbage() {
        assert!(PacketCodec.decode(b"nonsense").is_err());
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_codec_round_trip() {
        let codec = JsonCodec;
        let msg = join_request();
        let bytes = codec.encode(&msg).unwrap();
        assert!(std::str::from_utf8(&bytes).unwrap().contains("RequestJoin"));
        assert_eq!(codec.decode(&bytes).unwrap(), msg);
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_codec_decode_error() {
        assert!(matches!(
            JsonCodec.decode(b"{not json"),
            Err(ProtocolError::Decode(_))
        ));
    }
}
