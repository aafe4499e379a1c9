//! Encrypted envelope wire shape.

use serde::{Deserialize, Serialize};

use super::{ActorId, from_cbor, to_cbor};
use crate::errors::{ProtocolError, Result};

/// Upper bound on an encoded envelope (1 MiB).
pub const MAX_ENVELOPE_SIZE: usize = 1024 * 1024;

/// One encrypted message as it travels through the relay.
///
/// Binary fields are base64 strings and message numbers are decimal strings,
/// matching what browser clients put on the wire. The relay treats every field
/// as opaque; only the receiving actor interprets them.
///
/// `nonce` is optional on the wire because older clients omitted it. An
/// envelope without a nonce can never be decrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEnvelope {
    /// Base64 ciphertext including the 16-byte Poly1305 tag
    pub encrypted_content: String,
    /// Actor that encrypted the message
    pub sender_key_id: ActorId,
    /// Actor the message is addressed to
    pub recipient_key_id: ActorId,
    /// Decimal message number (advisory)
    pub message_number: String,
    /// Decimal number of the previous message (advisory)
    pub previous_message_number: String,
    /// Base64 nonce used for this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl EncryptedEnvelope {
    /// Parsed `messageNumber`.
    pub fn message_number(&self) -> Result<u64> {
        parse_number("messageNumber", &self.message_number)
    }

    /// Parsed `previousMessageNumber`.
    pub fn previous_message_number(&self) -> Result<u64> {
        parse_number("previousMessageNumber", &self.previous_message_number)
    }

    /// Encode to CBOR.
    pub fn encode(&self) -> Result<Vec<u8>> {
        to_cbor(self)
    }

    /// Decode from CBOR.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::MessageTooLarge` if `bytes` exceeds
    ///   [`MAX_ENVELOPE_SIZE`]
    /// - `ProtocolError::CborDecode` if the bytes are not a valid envelope
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        from_cbor(bytes, MAX_ENVELOPE_SIZE)
    }
}

fn parse_number(field: &'static str, value: &str) -> Result<u64> {
    value.parse().map_err(|_| ProtocolError::InvalidNumber { field, value: value.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncryptedEnvelope {
        EncryptedEnvelope {
            encrypted_content: "AAEC".to_string(),
            sender_key_id: "alice".to_string(),
            recipient_key_id: "bob".to_string(),
            message_number: "3".to_string(),
            previous_message_number: "2".to_string(),
            nonce: Some("AAAA".to_string()),
        }
    }

    #[test]
    fn numbers_parse() {
        let envelope = sample();
        assert_eq!(envelope.message_number(), Ok(3));
        assert_eq!(envelope.previous_message_number(), Ok(2));
    }

    #[test]
    fn garbage_number_is_rejected() {
        let mut envelope = sample();
        envelope.message_number = "three".to_string();

        assert!(matches!(
            envelope.message_number(),
            Err(ProtocolError::InvalidNumber { field: "messageNumber", .. })
        ));
    }

    #[test]
    fn missing_nonce_survives_decode() {
        let mut envelope = sample();
        envelope.nonce = None;

        let decoded = EncryptedEnvelope::decode(&envelope.encode().unwrap()).unwrap();
        assert_eq!(decoded.nonce, None);
    }

    #[test]
    fn oversized_input_rejected_before_parsing() {
        let bytes = vec![0u8; MAX_ENVELOPE_SIZE + 1];
        assert!(matches!(
            EncryptedEnvelope::decode(&bytes),
            Err(ProtocolError::MessageTooLarge { .. })
        ));
    }
}
