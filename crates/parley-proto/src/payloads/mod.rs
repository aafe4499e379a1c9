//! CBOR-encoded wire messages.
//!
//! Two directions, two enums: [`RelayRequest`] flows from a client to the
//! relay, [`RelayMessage`] flows from the relay to clients. Both are tagged by
//! an `event` field whose values match the event names of the transport
//! (`join_room`, `user_joined`, ...).
//!
//! # Invariants
//!
//! - Decoding checks the input size before the CBOR parser sees a byte.
//! - Encoding then decoding yields an equal value.

pub mod envelope;
pub mod keys;
pub mod relay;

use serde::{Serialize, de::DeserializeOwned};

pub use envelope::EncryptedEnvelope;
pub use keys::KeyBundle;
pub use relay::{RelayMessage, RelayRequest};

use crate::errors::{ProtocolError, Result};

/// Identifier of an actor (a client user or the relay itself).
///
/// Actor ids are compared as strings; their lexicographic order is what makes
/// a session id canonical.
pub type ActorId = String;

/// Identifier of a chat room.
pub type RoomId = String;

/// Serialize a wire value to CBOR.
pub(crate) fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf)
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))?;
    Ok(buf)
}

/// Deserialize a wire value from CBOR, rejecting inputs above `max` bytes.
pub(crate) fn from_cbor<T: DeserializeOwned>(bytes: &[u8], max: usize) -> Result<T> {
    if bytes.len() > max {
        return Err(ProtocolError::MessageTooLarge { size: bytes.len(), max });
    }

    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))
}
