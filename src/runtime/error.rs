use thiserror::Error;

use crate::runtime::value::Kind;

/// Recoverable failures raised by context and series operations.
///
/// These unwind to whatever script-level error boundary the caller has;
/// nothing in this crate catches them. Structural corruption is not
/// reported here: that is a bug in the runtime and panics instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("duplicate variable: {name}")]
    DuplicateVariable { name: String },

    #[error("invalid type: {got}")]
    InvalidType { got: Kind },

    #[error("missing value after {name}: in construct list")]
    MissingValue { name: String },

    #[error("context is locked")]
    LockedContext,

    #[error("series is read-only")]
    ReadOnly,

    #[error("index {index} is in the middle of a codepoint of a string-aliased binary")]
    MidCodepoint { index: usize },

    #[error("integer {value} is out of range for a byte")]
    ByteOutOfRange { value: i64 },

    #[error("binary content is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid runtime configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
