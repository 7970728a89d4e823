//! Fixed-layout binary packet format.
//!
//! Every packet is exactly [`MAX_PACKET_SIZE`] bytes: a 64-byte header
//! followed by a payload area interpreted according to the kind tag.
//! Integers are little-endian, display strings are NUL-terminated UTF-16LE,
//! and the remaining strings are NUL-terminated bytes. Unused space is
//! zero-filled.
//!
//! ```text
//!   0        4                        30               47               64
//!   +--------+------------------------+----------------+----------------+-----------
//!   |  kind  |  name (12 units + NUL) | login (16+NUL) | host (16+NUL)  | payload…
//!   +--------+------------------------+----------------+----------------+-----------
//! ```
//!
//! Decoding checks the length for the specific kind before reading a
//! single field, so a short or garbled datagram yields an error instead of
//! a half-filled message.

use std::net::Ipv4Addr;

use crate::text::{truncate_utf16, truncate_utf8};
use crate::types::{
    ChatKind, LanMessage, MessageBody, MessageKind, ReturnCode, SenderInfo, CHAT_LEN,
    GAME_NAME_LEN, HOST_NAME_LEN, LOGIN_NAME_LEN, MAX_PACKET_SIZE, PLAYER_NAME_LEN, SERIAL_LEN,
};
use crate::ProtocolError;

/// Bytes taken by a wide string field holding `units` code units plus NUL.
const fn wide_field(units: usize) -> usize {
    (units + 1) * 2
}

/// Size of the fixed header shared by every kind.
pub const HEADER_LEN: usize =
    4 + wide_field(PLAYER_NAME_LEN) + (LOGIN_NAME_LEN + 1) + (HOST_NAME_LEN + 1);

/// Size of the payload area.
pub const PAYLOAD_LEN: usize = MAX_PACKET_SIZE - HEADER_LEN;

const GAME_NAME_FIELD: usize = wide_field(GAME_NAME_LEN);

/// Longest options string that fits in a `GameAnnounce` (and therefore in
/// a `GameOptions`) payload, excluding the terminating NUL.
pub const MAX_OPTIONS_LEN: usize = PAYLOAD_LEN - GAME_NAME_FIELD - 2 - 1;

const OPTIONS_FIELD: usize = MAX_OPTIONS_LEN + 1;

/// Payload bytes a packet of `kind` must carry.
pub fn payload_len(kind: MessageKind) -> usize {
    match kind {
        MessageKind::RequestLocations
        | MessageKind::LobbyAnnounce
        | MessageKind::RequestLobbyLeave
        | MessageKind::GameStart
        | MessageKind::Inactive => 0,
        MessageKind::GameAnnounce => GAME_NAME_FIELD + 2 + OPTIONS_FIELD,
        MessageKind::RequestJoin => 4 + 4 + 4 + SERIAL_LEN + 1,
        MessageKind::JoinAccept => GAME_NAME_FIELD + 4 + 4,
        MessageKind::JoinDeny => GAME_NAME_FIELD + 4,
        MessageKind::RequestGameLeave => GAME_NAME_FIELD,
        MessageKind::SetAccept => GAME_NAME_FIELD + 1,
        MessageKind::MapAvailability => GAME_NAME_FIELD + 4 + 1,
        MessageKind::Chat => GAME_NAME_FIELD + 4 + wide_field(CHAT_LEN),
        MessageKind::GameStartTimer => 4,
        MessageKind::GameOptions => OPTIONS_FIELD,
        MessageKind::RequestGameInfo => 4,
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Self {
            buf: Vec::with_capacity(MAX_PACKET_SIZE),
        }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn bool(&mut self, v: bool) {
        self.u8(u8::from(v));
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn ip(&mut self, ip: Ipv4Addr) {
        self.u32(u32::from(ip));
    }

    /// Writes `s` as UTF-16LE, truncated to `units`, padded to the field.
    fn wide(&mut self, s: &str, units: usize) {
        let start = self.buf.len();
        for unit in truncate_utf16(s, units).encode_utf16() {
            self.buf.extend_from_slice(&unit.to_le_bytes());
        }
        self.buf.resize(start + wide_field(units), 0);
    }

    /// Writes `s` as bytes, truncated to `len`, padded to `len + 1`.
    fn bytes(&mut self, s: &str, len: usize) {
        let start = self.buf.len();
        self.buf.extend_from_slice(truncate_utf8(s, len).as_bytes());
        self.buf.resize(start + len + 1, 0);
    }

    fn options(&mut self, s: &str) -> Result<(), ProtocolError> {
        // A cut-off options string would parse as a different game.
        if s.len() > MAX_OPTIONS_LEN {
            return Err(ProtocolError::FieldTooLong {
                field: "options",
                len: s.len(),
                max: MAX_OPTIONS_LEN,
            });
        }
        self.bytes(s, MAX_OPTIONS_LEN);
        Ok(())
    }

    fn finish(mut self) -> Vec<u8> {
        self.buf.resize(MAX_PACKET_SIZE, 0);
        self.buf
    }
}

/// Encodes `msg` into a full-size packet.
///
/// # Errors
/// Returns [`ProtocolError::FieldTooLong`] if an options string exceeds
/// [`MAX_OPTIONS_LEN`]. Every other over-long string is truncated.
pub fn encode(msg: &LanMessage) -> Result<Vec<u8>, ProtocolError> {
    let mut w = Writer::new();
    w.u32(msg.kind().tag());
    w.wide(&msg.sender.name, PLAYER_NAME_LEN);
    w.bytes(&msg.sender.login, LOGIN_NAME_LEN);
    w.bytes(&msg.sender.host, HOST_NAME_LEN);
    debug_assert_eq!(w.buf.len(), HEADER_LEN);

    match &msg.body {
        MessageBody::RequestLocations
        | MessageBody::LobbyAnnounce
        | MessageBody::RequestLobbyLeave
        | MessageBody::GameStart
        | MessageBody::Inactive => {}
        MessageBody::GameAnnounce {
            game_name,
            in_progress,
            is_direct_connect,
            options,
        } => {
            w.wide(game_name, GAME_NAME_LEN);
            w.bool(*in_progress);
            w.bool(*is_direct_connect);
            w.options(options)?;
        }
        MessageBody::RequestJoin {
            game_ip,
            exe_crc,
            ini_crc,
            serial,
        } => {
            w.ip(*game_ip);
            w.u32(*exe_crc);
            w.u32(*ini_crc);
            w.bytes(serial, SERIAL_LEN);
        }
        MessageBody::JoinAccept {
            game_name,
            player_ip,
            slot,
        } => {
            w.wide(game_name, GAME_NAME_LEN);
            w.ip(*player_ip);
            w.i32(*slot);
        }
        MessageBody::JoinDeny { game_name, reason } => {
            w.wide(game_name, GAME_NAME_LEN);
            w.i32(reason.to_wire());
        }
        MessageBody::RequestGameLeave { game_name } => {
            w.wide(game_name, GAME_NAME_LEN);
        }
        MessageBody::SetAccept {
            game_name,
            accepted,
        } => {
            w.wide(game_name, GAME_NAME_LEN);
            w.bool(*accepted);
        }
        MessageBody::MapAvailability {
            game_name,
            map_crc,
            has_map,
        } => {
            w.wide(game_name, GAME_NAME_LEN);
            w.u32(*map_crc);
            w.bool(*has_map);
        }
        MessageBody::Chat {
            game_name,
            kind,
            text,
        } => {
            w.wide(game_name, GAME_NAME_LEN);
            w.i32(kind.to_wire());
            w.wide(text, CHAT_LEN);
        }
        MessageBody::GameStartTimer { seconds } => w.i32(*seconds),
        MessageBody::GameOptions { options } => w.options(options)?,
        MessageBody::RequestGameInfo { requester_ip } => w.ip(*requester_ip),
    }
    Ok(w.finish())
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        let end = self.pos + n;
        let slice = self.data.get(self.pos..end).ok_or(ProtocolError::Truncated {
            needed: end,
            got: self.data.len(),
        })?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    fn bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.u8()? != 0)
    }

    fn u32(&mut self) -> Result<u32, ProtocolError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i32(&mut self) -> Result<i32, ProtocolError> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn ip(&mut self) -> Result<Ipv4Addr, ProtocolError> {
        Ok(Ipv4Addr::from(self.u32()?))
    }

    fn wide(&mut self, units: usize) -> Result<String, ProtocolError> {
        let raw = self.take(wide_field(units))?;
        let decoded: Vec<u16> = raw
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|&unit| unit != 0)
            .collect();
        Ok(String::from_utf16_lossy(&decoded))
    }

    fn bytes(&mut self, len: usize, field: &'static str) -> Result<String, ProtocolError> {
        let raw = self.take(len + 1)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        std::str::from_utf8(&raw[..end])
            .map(str::to_owned)
            .map_err(|_| ProtocolError::InvalidText { field })
    }
}

/// Decodes one packet.
///
/// Bytes beyond the layout for the packet's kind are ignored.
///
/// # Errors
/// - [`ProtocolError::UnknownKind`] for an unrecognized tag.
/// - [`ProtocolError::Truncated`] if the packet is shorter than its layout.
/// - [`ProtocolError::InvalidText`] / [`ProtocolError::InvalidValue`] for
///   fields that cannot be represented.
pub fn decode(data: &[u8]) -> Result<LanMessage, ProtocolError> {
    let mut r = Reader::new(data);
    let tag = r.u32()?;
    let kind = MessageKind::from_tag(tag).ok_or(ProtocolError::UnknownKind(tag))?;

    let needed = HEADER_LEN + payload_len(kind);
    if data.len() < needed {
        return Err(ProtocolError::Truncated {
            needed,
            got: data.len(),
        });
    }

    let sender = SenderInfo {
        name: r.wide(PLAYER_NAME_LEN)?,
        login: r.bytes(LOGIN_NAME_LEN, "login")?,
        host: r.bytes(HOST_NAME_LEN, "host")?,
    };

    let body = match kind {
        MessageKind::RequestLocations => MessageBody::RequestLocations,
        MessageKind::LobbyAnnounce => MessageBody::LobbyAnnounce,
        MessageKind::RequestLobbyLeave => MessageBody::RequestLobbyLeave,
        MessageKind::GameStart => MessageBody::GameStart,
        MessageKind::Inactive => MessageBody::Inactive,
        MessageKind::GameAnnounce => MessageBody::GameAnnounce {
            game_name: r.wide(GAME_NAME_LEN)?,
            in_progress: r.bool()?,
            is_direct_connect: r.bool()?,
            options: r.bytes(MAX_OPTIONS_LEN, "options")?,
        },
        MessageKind::RequestJoin => MessageBody::RequestJoin {
            game_ip: r.ip()?,
            exe_crc: r.u32()?,
            ini_crc: r.u32()?,
            serial: r.bytes(SERIAL_LEN, "serial")?,
        },
        MessageKind::JoinAccept => MessageBody::JoinAccept {
            game_name: r.wide(GAME_NAME_LEN)?,
            player_ip: r.ip()?,
            slot: r.i32()?,
        },
        MessageKind::JoinDeny => MessageBody::JoinDeny {
            game_name: r.wide(GAME_NAME_LEN)?,
            reason: ReturnCode::from_wire(r.i32()?),
        },
        MessageKind::RequestGameLeave => MessageBody::RequestGameLeave {
            game_name: r.wide(GAME_NAME_LEN)?,
        },
        MessageKind::SetAccept => MessageBody::SetAccept {
            game_name: r.wide(GAME_NAME_LEN)?,
            accepted: r.bool()?,
        },
        MessageKind::MapAvailability => MessageBody::MapAvailability {
            game_name: r.wide(GAME_NAME_LEN)?,
            map_crc: r.u32()?,
            has_map: r.bool()?,
        },
        MessageKind::Chat => {
            let game_name = r.wide(GAME_NAME_LEN)?;
            let raw_kind = r.i32()?;
            let kind = ChatKind::from_wire(raw_kind).ok_or(ProtocolError::InvalidValue {
                field: "chat kind",
                value: i64::from(raw_kind),
            })?;
            MessageBody::Chat {
                game_name,
                kind,
                text: r.wide(CHAT_LEN)?,
            }
        }
        MessageKind::GameStartTimer => MessageBody::GameStartTimer { seconds: r.i32()? },
        MessageKind::GameOptions => MessageBody::GameOptions {
            options: r.bytes(MAX_OPTIONS_LEN, "options")?,
        },
        MessageKind::RequestGameInfo => MessageBody::RequestGameInfo {
            requester_ip: r.ip()?,
        },
    };

    Ok(LanMessage { sender, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> SenderInfo {
        SenderInfo {
            name: "Alice".into(),
            login: "alice".into(),
            host: "DESKTOP-1".into(),
        }
    }

    // =====================================================================
    // Layout
    // =====================================================================

    #[test]
    fn test_header_and_options_sizes() {
        assert_eq!(HEADER_LEN, 64);
        assert_eq!(PAYLOAD_LEN, 412);
        assert_eq!(MAX_OPTIONS_LEN, 375);
    }

    #[test]
    fn test_every_payload_fits() {
        for kind in MessageKind::ALL {
            assert!(payload_len(kind) <= PAYLOAD_LEN, "{kind} payload too large");
        }
    }

    #[test]
    fn test_encoded_packets_are_fixed_size() {
        let msg = LanMessage::new(sender(), MessageBody::GameStart);
        assert_eq!(encode(&msg).unwrap().len(), MAX_PACKET_SIZE);
    }

    #[test]
    fn test_header_bytes_are_bit_exact() {
        let msg = LanMessage::new(sender(), MessageBody::LobbyAnnounce);
        let bytes = encode(&msg).unwrap();
        assert_eq!(&bytes[0..4], &2u32.to_le_bytes());
        // "A" as UTF-16LE
        assert_eq!(&bytes[4..6], &[b'A', 0]);
        assert_eq!(&bytes[30..35], b"alice");
        assert_eq!(bytes[35], 0);
        assert_eq!(&bytes[47..56], b"DESKTOP-1");
    }

    #[test]
    fn test_join_accept_payload_offsets() {
        let msg = LanMessage::new(
            sender(),
            MessageBody::JoinAccept {
                game_name: "G".into(),
                player_ip: Ipv4Addr::new(192, 168, 0, 2),
                slot: 3,
            },
        );
        let bytes = encode(&msg).unwrap();
        let ip_at = HEADER_LEN + GAME_NAME_FIELD;
        assert_eq!(
            &bytes[ip_at..ip_at + 4],
            &u32::from(Ipv4Addr::new(192, 168, 0, 2)).to_le_bytes()
        );
        assert_eq!(&bytes[ip_at + 4..ip_at + 8], &3i32.to_le_bytes());
    }

    // =====================================================================
    // Round trips of representative kinds
    // =====================================================================

    #[test]
    fn test_round_trip_game_announce() {
        let msg = LanMessage::new(
            sender(),
            MessageBody::GameAnnounce {
                game_name: "Friday Night".into(),
                in_progress: false,
                is_direct_connect: true,
                options: "US=1;M=07maps/tournament a;".into(),
            },
        );
        assert_eq!(decode(&encode(&msg).unwrap()).unwrap(), msg);
    }

    #[test]
    fn test_round_trip_chat_with_non_ascii_text() {
        let msg = LanMessage::new(
            sender(),
            MessageBody::Chat {
                game_name: String::new(),
                kind: ChatKind::Emote,
                text: "grüßt alle 👋".into(),
            },
        );
        assert_eq!(decode(&encode(&msg).unwrap()).unwrap(), msg);
    }

    #[test]
    fn test_round_trip_request_join() {
        let msg = LanMessage::new(
            sender(),
            MessageBody::RequestJoin {
                game_ip: Ipv4Addr::new(10, 0, 0, 1),
                exe_crc: 0xDEAD_BEEF,
                ini_crc: 0x1234_5678,
                serial: "ABCD-1234".into(),
            },
        );
        assert_eq!(decode(&encode(&msg).unwrap()).unwrap(), msg);
    }

    #[test]
    fn test_join_deny_unknown_reason_decodes_as_unknown() {
        let msg = LanMessage::new(
            sender(),
            MessageBody::JoinDeny {
                game_name: "G".into(),
                reason: ReturnCode::GameFull,
            },
        );
        let mut bytes = encode(&msg).unwrap();
        let at = HEADER_LEN + GAME_NAME_FIELD;
        bytes[at..at + 4].copy_from_slice(&77i32.to_le_bytes());
        let decoded = decode(&bytes).unwrap();
        assert!(matches!(
            decoded.body,
            MessageBody::JoinDeny { reason: ReturnCode::Unknown, .. }
        ));
    }

    // =====================================================================
    // Truncation and limits
    // =====================================================================

    #[test]
    fn test_long_names_are_truncated() {
        let msg = LanMessage::new(
            SenderInfo {
                name: "ABCDEFGHIJKLMNOP".into(),
                login: "a-very-long-login-name".into(),
                host: "h".into(),
            },
            MessageBody::RequestLocations,
        );
        let decoded = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(decoded.sender.name, "ABCDEFGHIJKL");
        assert_eq!(decoded.sender.login, "a-very-long-logi");
    }

    #[test]
    fn test_options_too_long_is_rejected() {
        let msg = LanMessage::new(
            sender(),
            MessageBody::GameOptions {
                options: "x".repeat(MAX_OPTIONS_LEN + 1),
            },
        );
        assert!(matches!(
            encode(&msg),
            Err(ProtocolError::FieldTooLong { field: "options", .. })
        ));
    }

    #[test]
    fn test_options_at_limit_round_trips() {
        let msg = LanMessage::new(
            sender(),
            MessageBody::GameOptions {
                options: "y".repeat(MAX_OPTIONS_LEN),
            },
        );
        assert_eq!(decode(&encode(&msg).unwrap()).unwrap(), msg);
    }

    // =====================================================================
    // Malformed input
    // =====================================================================

    #[test]
    fn test_decode_unknown_kind() {
        let mut bytes = encode(&LanMessage::new(sender(), MessageBody::GameStart)).unwrap();
        bytes[0..4].copy_from_slice(&42u32.to_le_bytes());
        assert!(matches!(decode(&bytes), Err(ProtocolError::UnknownKind(42))));
    }

    #[test]
    fn test_decode_truncated_header() {
        assert!(matches!(
            decode(&[1, 0]),
            Err(ProtocolError::Truncated { needed: 4, got: 2 })
        ));
    }

    #[test]
    fn test_decode_truncated_payload() {
        let msg = LanMessage::new(
            sender(),
            MessageBody::GameOptions {
                options: "US=1;".into(),
            },
        );
        let bytes = encode(&msg).unwrap();
        let cut = &bytes[..HEADER_LEN + 10];
        assert!(matches!(decode(cut), Err(ProtocolError::Truncated { .. })));
    }

    #[test]
    fn test_decode_short_packet_for_empty_kind_is_fine() {
        let bytes = encode(&LanMessage::new(sender(), MessageBody::Inactive)).unwrap();
        let decoded = decode(&bytes[..HEADER_LEN]).unwrap();
        assert_eq!(decoded.body, MessageBody::Inactive);
    }

    #[test]
    fn test_decode_invalid_chat_kind() {
        let msg = LanMessage::new(
            sender(),
            MessageBody::Chat {
                game_name: String::new(),
                kind: ChatKind::Normal,
                text: "hi".into(),
            },
        );
        let mut bytes = encode(&msg).unwrap();
        let at = HEADER_LEN + GAME_NAME_FIELD;
        bytes[at..at + 4].copy_from_slice(&9i32.to_le_bytes());
        assert!(matches!(
            decode(&bytes),
            Err(ProtocolError::InvalidValue { field: "chat kind", value: 9 })
        ));
    }

    #[test]
    fn test_decode_invalid_utf8_login() {
        let mut bytes = encode(&LanMessage::new(sender(), MessageBody::Inactive)).unwrap();
        bytes[30] = 0xFF;
        assert!(matches!(
            decode(&bytes),
            Err(ProtocolError::InvalidText { field: "login" })
        ));
    }

    #[test]
    fn test_decode_field_without_nul_uses_whole_field() {
        let mut bytes = encode(&LanMessage::new(sender(), MessageBody::Inactive)).unwrap();
        for b in &mut bytes[47..64] {
            *b = b'h';
        }
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.sender.host, "h".repeat(HOST_NAME_LEN + 1));
    }
}
