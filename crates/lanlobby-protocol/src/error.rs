//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means "these bytes are not a message I can
//! use". The engine logs them at debug level and drops the datagram, so
//! none of these ever reach the user.

/// Errors that can occur while encoding or decoding a packet.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// JSON serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// JSON deserialization failed.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The kind tag is not one this build understands.
    #[error("unknown message kind {0}")]
    UnknownKind(u32),

    /// The packet ends before the layout for its kind does.
    #[error("truncated packet: need {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },

    /// A byte-string field is not valid UTF-8.
    #[error("field `{field}` is not valid text")]
    InvalidText { field: &'static str },

    /// A numeric field holds a value with no meaning.
    #[error("field `{field}` has invalid value {value}")]
    InvalidValue { field: &'static str, value: i64 },

    /// A field that must not be truncated doesn't fit its slot.
    #[error("field `{field}` is {len} bytes, limit is {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}
