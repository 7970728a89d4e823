//! Error types for the setup model and the options codec.

use crate::MAX_SLOTS;

/// A change to the game setup that the model refuses.
///
/// Refused changes never touch the model: the caller's state is exactly
/// what it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("slot {0} does not exist")]
    NoSuchSlot(usize),

    /// Slot 0 always belongs to the host.
    #[error("slot 0 belongs to the host and cannot be reassigned")]
    HostSlot,

    #[error("slot {0} is not held by a human player")]
    NotHuman(usize),

    #[error("color {0} is out of range")]
    ColorOutOfRange(i32),

    #[error("color {color} is already taken by slot {holder}")]
    ColorTaken { color: i32, holder: usize },

    #[error("player template {0} is out of range")]
    TemplateOutOfRange(i32),

    #[error("start position {0} is out of range")]
    StartPositionOutOfRange(i32),

    #[error("start position {position} is already taken by slot {holder}")]
    StartPositionTaken { position: i32, holder: usize },

    #[error("team {0} is out of range")]
    TeamOutOfRange(i32),

    /// Observers take no part in the colour, start or team draft.
    #[error("observers cannot choose a {0}")]
    ObserverPick(&'static str),

    #[error("the game is already in progress")]
    InProgress,

    /// Even with every name cut to one character the options string
    /// would not fit in a packet.
    #[error("the setup needs {len} bytes of options, at most {max} fit")]
    OptionsTooLong { len: usize, max: usize },

    #[error("{0:?} is not a map file path")]
    BadMapPath(String),
}

/// Why an options string (or a single-field change string) was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
    #[error("empty value for key `{0}`")]
    EmptyValue(String),

    #[error("unknown key `{0}`")]
    UnknownKey(String),

    #[error("missing key `{0}`")]
    MissingKey(&'static str),

    #[error("field `{field}` is not a valid number: {value:?}")]
    BadNumber { field: &'static str, value: String },

    #[error("malformed map field {0:?}")]
    BadMap(String),

    #[error("expected {max} slot records, found {0}", max = MAX_SLOTS)]
    SlotCount(usize),

    #[error("slot {slot}: {reason}")]
    BadSlot { slot: usize, reason: &'static str },

    #[error("slot {slot}: {source}")]
    SlotValue {
        slot: usize,
        #[source]
        source: SetupError,
    },
}
