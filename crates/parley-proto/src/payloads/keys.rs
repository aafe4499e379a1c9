//! Published key bundles.

use serde::{Deserialize, Serialize};

use crate::errors::{ProtocolError, Result};

/// Public half of an actor's key bundle.
///
/// Advertised metadata only: none of these keys feed session derivation. All
/// keys are base64-encoded 32-byte X25519 public keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyBundle {
    /// Long-term identity public key
    pub identity_key: String,
    /// Signed pre-key public key
    pub signed_pre_key: String,
    /// One-time pre-key public keys, in generation order
    pub one_time_pre_keys: Vec<String>,
    /// Decimal registration id, advisory (collisions are not checked)
    pub registration_id: String,
}

impl KeyBundle {
    /// Parsed `registrationId`.
    pub fn registration_id(&self) -> Result<u16> {
        self.registration_id.parse().map_err(|_| ProtocolError::InvalidNumber {
            field: "registrationId",
            value: self.registration_id.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ciborium::Value;

    use super::*;

    fn bundle(registration_id: &str) -> KeyBundle {
        KeyBundle {
            identity_key: "ik".to_string(),
            signed_pre_key: "spk".to_string(),
            one_time_pre_keys: vec![],
            registration_id: registration_id.to_string(),
        }
    }

    #[test]
    fn registration_id_is_a_decimal_string_on_the_wire() {
        let mut bytes = Vec::new();
        ciborium::into_writer(&bundle("4242"), &mut bytes).unwrap();
        let value: Value = ciborium::from_reader(bytes.as_slice()).unwrap();

        let field = value
            .as_map()
            .unwrap()
            .iter()
            .find(|(k, _)| k.as_text() == Some("registrationId"))
            .map(|(_, v)| v.clone());
        assert_eq!(field, Some(Value::Text("4242".to_string())));
    }

    #[test]
    fn registration_id_parses() {
        assert_eq!(bundle("4242").registration_id().unwrap(), 4242);
        assert!(matches!(
            bundle("abc").registration_id(),
            Err(ProtocolError::InvalidNumber { field: "registrationId", .. })
        ));
        assert!(bundle("70000").registration_id().is_err());
    }
}
