//! Parley wire protocol.
//!
//! Types exchanged between clients and the relay. The relay never decrypts
//! anything: envelopes pass through it as opaque base64 strings, and the only
//! key material it sees is the public half of each actor's [`KeyBundle`].
//!
//! Every message is CBOR-encoded. Field names follow the camelCase wire shape
//! that browser clients already speak (`encryptedContent`, `senderKeyId`, ...),
//! so the same structs can be rendered as JSON by a transport that prefers it.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use payloads::{
    ActorId, EncryptedEnvelope, KeyBundle, RelayMessage, RelayRequest, RoomId,
    envelope::MAX_ENVELOPE_SIZE,
    relay::{ErrorPayload, PresencePayload},
};
