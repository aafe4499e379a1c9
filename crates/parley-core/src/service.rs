//! Process-scoped crypto service.
//!
//! One `CryptoService` per actor process, constructed at startup and handed to
//! whatever drives messaging. It owns the actor's [`KeyStore`] and
//! [`SessionStore`]; nothing else mutates them.
//!
//! # Lazy establishment
//!
//! ```text
//! encrypt_for_peer(a, b) ─┐
//!                         ├─► establish(a, b) ─► SessionStore
//! decrypt_from_peer(b, a) ┘     (no-op if present)
//! ```
//!
//! Either side may be first to encrypt. A receiver that never called
//! `establish` still derives the sender's secret on the first envelope.

use parley_crypto::{
    DecryptionError, HeaderBinding, KeyGenerationError, KeyMaterial, NONCE_SIZE, SessionId,
    decrypt_envelope_with, derive_session_secret, encrypt_envelope_with, entropy_len,
};
use parley_proto::{EncryptedEnvelope, KeyBundle};
use zeroize::Zeroize;

use crate::{
    config::{ReplayPolicy, ServiceConfig},
    env::Environment,
    error::SessionError,
    key_store::KeyStore,
    session_store::{SessionRecord, SessionStore},
};

/// Outcome of [`CryptoService::establish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Establishment {
    /// A new session was derived and stored
    Created,
    /// The session already existed; nothing changed
    Existing,
}

/// Key generation, session establishment and envelope codec for one actor.
pub struct CryptoService<E: Environment> {
    env: E,
    config: ServiceConfig,
    keys: KeyStore,
    sessions: SessionStore,
}

impl<E: Environment> CryptoService<E> {
    /// Create a service with default configuration.
    pub fn new(env: E) -> Self {
        Self::with_config(env, ServiceConfig::default())
    }

    /// Create a service with explicit configuration.
    pub fn with_config(env: E, config: ServiceConfig) -> Self {
        Self { env, config, keys: KeyStore::new(), sessions: SessionStore::new() }
    }

    /// Active configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Environment the service draws randomness from.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Key store.
    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    /// Session store.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Generate a fresh key bundle for `actor_id` and return its public half.
    ///
    /// Overwrites any previous material for the actor. Use
    /// [`ensure_keys`](Self::ensure_keys) to keep an existing identity.
    ///
    /// # Errors
    ///
    /// - `EmptyActorId` if `actor_id` is empty
    /// - `KeyGeneration` if the randomness source fails
    pub fn generate_keys(&mut self, actor_id: &str) -> Result<KeyBundle, SessionError> {
        if actor_id.is_empty() {
            return Err(SessionError::EmptyActorId);
        }

        let count = self.config.one_time_pre_key_count;
        let mut entropy = vec![0u8; entropy_len(count)];
        let generated = self
            .env
            .random_bytes(&mut entropy)
            .map_err(|e| KeyGenerationError::Entropy(e.to_string()))
            .and_then(|()| KeyMaterial::from_entropy(&entropy, count));
        entropy.zeroize();
        let material = generated?;

        let bundle = material.public_bundle();
        self.keys.insert_local(actor_id, material);

        tracing::debug!(
            actor = actor_id,
            registration_id = %bundle.registration_id,
            one_time_pre_keys = count,
            "generated key bundle"
        );

        Ok(bundle)
    }

    /// Public bundle for `actor_id`, generating keys only if none exist
    /// locally.
    pub fn ensure_keys(&mut self, actor_id: &str) -> Result<KeyBundle, SessionError> {
        match self.keys.local(actor_id) {
            Some(material) => Ok(material.public_bundle()),
            None => self.generate_keys(actor_id),
        }
    }

    /// Public bundle known for `actor_id`, local or imported.
    pub fn public_bundle(&self, actor_id: &str) -> Option<KeyBundle> {
        self.keys.get(actor_id).map(|keys| keys.public_bundle())
    }

    /// Record a peer's advertised bundle. Never replaces local material.
    pub fn import_public_bundle(&mut self, actor_id: &str, bundle: KeyBundle) -> bool {
        self.keys.import_remote(actor_id, bundle)
    }

    /// Whether any keys are known for `actor_id`.
    pub fn has_keys(&self, actor_id: &str) -> bool {
        self.keys.contains(actor_id)
    }

    /// Establish the session between `actor_a` and `actor_b`.
    ///
    /// Idempotent: an existing session, including its counters, is left
    /// untouched.
    ///
    /// # Security
    ///
    /// Not a key exchange. The secret is derived from the two identifiers
    /// alone, so anyone who knows both can derive it.
    ///
    /// # Errors
    ///
    /// - `EmptyActorId` if either id is empty
    pub fn establish(
        &mut self,
        actor_a: &str,
        actor_b: &str,
    ) -> Result<Establishment, SessionError> {
        if actor_a.is_empty() || actor_b.is_empty() {
            return Err(SessionError::EmptyActorId);
        }

        let session_id = SessionId::canonicalize(actor_a, actor_b);
        if self.sessions.contains(&session_id) {
            return Ok(Establishment::Existing);
        }

        let secret = derive_session_secret(&session_id);
        tracing::debug!(session = %session_id, "established session");
        self.sessions.insert_if_absent(SessionRecord::new(session_id, secret));

        Ok(Establishment::Created)
    }

    /// Whether a session exists between `actor_a` and `actor_b`.
    pub fn has_session(&self, actor_a: &str, actor_b: &str) -> bool {
        self.sessions.contains(&SessionId::canonicalize(actor_a, actor_b))
    }

    /// Session between `actor_a` and `actor_b`.
    pub fn session(&self, actor_a: &str, actor_b: &str) -> Option<&SessionRecord> {
        self.sessions.get(&SessionId::canonicalize(actor_a, actor_b))
    }

    /// Number of established sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Encrypt `plaintext` from `sender_id` to `recipient_id`.
    ///
    /// Establishes the session first if needed. Each call draws a fresh
    /// random nonce and advances the session's message counter.
    ///
    /// # Errors
    ///
    /// - `EmptyActorId` if either id is empty
    /// - `Entropy` if no nonce could be drawn; the counter is not advanced
    pub fn encrypt_for_peer(
        &mut self,
        sender_id: &str,
        recipient_id: &str,
        plaintext: &str,
    ) -> Result<EncryptedEnvelope, SessionError> {
        self.establish(sender_id, recipient_id)?;

        let mut nonce = [0u8; NONCE_SIZE];
        self.env.random_bytes(&mut nonce)?;

        let session_id = SessionId::canonicalize(sender_id, recipient_id);
        let Some(record) = self.sessions.get_mut(&session_id) else {
            unreachable!("session established above");
        };
        let number = record.next_message_number();

        tracing::trace!(session = %session_id, number, "encrypting envelope");

        Ok(encrypt_envelope_with(
            self.config.replay_policy.header_binding(),
            sender_id,
            recipient_id,
            plaintext,
            record.secret(),
            nonce,
            number,
        ))
    }

    /// Decrypt an envelope `sender_id` addressed to `recipient_id`.
    ///
    /// Establishes the session first if needed. Counters are only updated
    /// when the envelope authenticates.
    ///
    /// # Errors
    ///
    /// - `NoSession` if either id is empty
    /// - `Replayed` under [`ReplayPolicy::Monotonic`] if the number does not
    ///   exceed the last accepted one
    /// - Any envelope or AEAD failure from
    ///   [`decrypt_envelope`](parley_crypto::decrypt_envelope)
    pub fn decrypt_from_peer(
        &mut self,
        recipient_id: &str,
        sender_id: &str,
        envelope: &EncryptedEnvelope,
    ) -> Result<String, DecryptionError> {
        self.establish(recipient_id, sender_id).map_err(|_| DecryptionError::NoSession {
            sender: sender_id.to_string(),
            recipient: recipient_id.to_string(),
        })?;

        let session_id = SessionId::canonicalize(recipient_id, sender_id);
        let Some(record) = self.sessions.get_mut(&session_id) else {
            unreachable!("session established above");
        };

        let number = match self.config.replay_policy {
            ReplayPolicy::Advisory => None,
            ReplayPolicy::Monotonic => {
                let number = envelope.message_number().map_err(|e| {
                    DecryptionError::MalformedEnvelope {
                        field: "messageNumber",
                        reason: e.to_string(),
                    }
                })?;
                let last_accepted = record.last_received(sender_id).unwrap_or(0);
                if number <= last_accepted {
                    return Err(DecryptionError::Replayed { number, last_accepted });
                }
                Some(number)
            },
        };

        let binding = self.config.replay_policy.header_binding();
        let plaintext =
            decrypt_envelope_with(binding, envelope, record.secret()).inspect_err(|e| {
                tracing::debug!(session = %session_id, error = %e, "envelope rejected");
            })?;

        if let Some(number) = number {
            record.record_received(sender_id, number);
        }

        Ok(plaintext)
    }
}
