//! Per-actor key bundle store.
//!
//! Holds full key material for actors generated in this process and the
//! advertised public bundles of remote actors. Bundles are metadata only:
//! nothing in session establishment reads them.

use std::collections::HashMap;

use parley_crypto::KeyMaterial;
use parley_proto::{ActorId, KeyBundle};

/// Keys known for one actor.
#[derive(Debug, Clone)]
pub enum StoredKeys {
    /// Generated here, private halves included
    Local(KeyMaterial),
    /// Advertised by a peer, public halves only
    Remote(KeyBundle),
}

impl StoredKeys {
    /// Public bundle for publication or display.
    pub fn public_bundle(&self) -> KeyBundle {
        match self {
            Self::Local(material) => material.public_bundle(),
            Self::Remote(bundle) => bundle.clone(),
        }
    }
}

/// Key bundles keyed by actor id.
///
/// # Invariants
///
/// - Local material is only replaced by an explicit [`KeyStore::insert_local`]
/// - Importing a remote bundle never replaces local material
#[derive(Debug, Default)]
pub struct KeyStore {
    entries: HashMap<ActorId, StoredKeys>,
}

impl KeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store freshly generated material, overwriting whatever was there.
    pub fn insert_local(&mut self, actor_id: &str, material: KeyMaterial) {
        self.entries.insert(actor_id.to_string(), StoredKeys::Local(material));
    }

    /// Record a peer's advertised bundle.
    ///
    /// Returns `false` and leaves the store unchanged if the actor already has
    /// local material.
    pub fn import_remote(&mut self, actor_id: &str, bundle: KeyBundle) -> bool {
        if matches!(self.entries.get(actor_id), Some(StoredKeys::Local(_))) {
            return false;
        }
        self.entries.insert(actor_id.to_string(), StoredKeys::Remote(bundle));
        true
    }

    /// Keys known for `actor_id`.
    pub fn get(&self, actor_id: &str) -> Option<&StoredKeys> {
        self.entries.get(actor_id)
    }

    /// Local material for `actor_id`, if generated here.
    pub fn local(&self, actor_id: &str) -> Option<&KeyMaterial> {
        match self.entries.get(actor_id) {
            Some(StoredKeys::Local(material)) => Some(material),
            _ => None,
        }
    }

    /// Whether any keys are known for `actor_id`.
    pub fn contains(&self, actor_id: &str) -> bool {
        self.entries.contains_key(actor_id)
    }

    /// Number of actors with known keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use parley_crypto::entropy_len;

    use super::*;

    fn material(fill: u8) -> KeyMaterial {
        KeyMaterial::from_entropy(&vec![fill; entropy_len(2)], 2).unwrap()
    }

    fn bundle(tag: &str) -> KeyBundle {
        KeyBundle {
            identity_key: tag.to_string(),
            signed_pre_key: tag.to_string(),
            one_time_pre_keys: vec![],
            registration_id: "1".to_string(),
        }
    }

    #[test]
    fn insert_local_overwrites() {
        let mut store = KeyStore::new();
        store.insert_local("alice", material(1));
        let first = store.get("alice").unwrap().public_bundle();

        store.insert_local("alice", material(2));
        let second = store.get("alice").unwrap().public_bundle();

        assert_ne!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn import_does_not_replace_local() {
        let mut store = KeyStore::new();
        store.insert_local("alice", material(1));

        assert!(!store.import_remote("alice", bundle("x")));
        assert!(store.local("alice").is_some());
    }

    #[test]
    fn import_replaces_remote() {
        let mut store = KeyStore::new();
        assert!(store.import_remote("bob", bundle("x")));
        assert!(store.import_remote("bob", bundle("y")));

        assert_eq!(store.get("bob").unwrap().public_bundle().identity_key, "y");
        assert!(store.local("bob").is_none());
    }
}
