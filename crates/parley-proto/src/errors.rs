//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding wire messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// CBOR serialization failed
    #[error("CBOR encode error: {0}")]
    CborEncode(String),

    /// CBOR deserialization failed
    #[error("CBOR decode error: {0}")]
    CborDecode(String),

    /// Encoded message exceeds the size limit
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge {
        /// Size of the rejected message
        size: usize,
        /// Maximum accepted size
        max: usize,
    },

    /// A numeric string field did not parse
    #[error("invalid {field}: {value:?}")]
    InvalidNumber {
        /// Wire name of the field
        field: &'static str,
        /// The offending value
        value: String,
    },
}
