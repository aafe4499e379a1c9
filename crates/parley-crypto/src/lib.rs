//! Parley Cryptographic Primitives
//!
//! Cryptographic building blocks for pairwise sessions. Pure functions with
//! deterministic outputs. Callers provide random bytes (nonces, key entropy)
//! so that every function here can be tested deterministically.
//!
//! # Session Lifecycle
//!
//! ```text
//! (actor A, actor B)
//!        │
//!        ▼
//! canonicalize → SessionId "a:b" (order-independent)
//!        │
//!        ▼
//! SHA-512("a:b")[..32] → SessionSecret
//!        │
//!        ▼
//! XChaCha20-Poly1305 (random 24-byte nonce) → EncryptedEnvelope
//! ```
//!
//! Both participants and the relay evaluate this chain independently and
//! converge on the same secret without a handshake round trip.
//!
//! # Security
//!
//! The session secret is a hash of the two actor identifiers and nothing else.
//! Anyone who knows both identifiers, which travel in the clear, can derive
//! it. The scheme therefore offers no confidentiality against the relay or any
//! observer of the identifiers, no forward secrecy and no authenticated key
//! exchange. The published [`KeyMaterial`] bundles carry X25519 keys that a
//! hardened deployment would use for an authenticated Diffie-Hellman
//! exchange; in this scheme they are advisory metadata only.
//!
//! What the AEAD does guarantee:
//! - Any modification of ciphertext or nonce is rejected
//! - A wrong session secret is rejected
//! - Decryption never yields partial or unauthenticated plaintext
//! - Under [`HeaderBinding::Bound`], rewritten sender, recipient or message
//!   numbers are rejected as well

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod aead;
pub mod derivation;
pub mod error;
pub mod identity;
pub mod keys;

pub use aead::{
    HeaderBinding, NONCE_SIZE, TAG_SIZE, decrypt_envelope, decrypt_envelope_with,
    encrypt_envelope, encrypt_envelope_with, header_associated_data, open, seal,
};
pub use derivation::{SESSION_SECRET_SIZE, SessionSecret, derive_session_secret};
pub use error::{DecryptionError, KeyGenerationError};
pub use identity::{SESSION_ID_SEPARATOR, SessionId};
pub use keys::{
    DEFAULT_ONE_TIME_PRE_KEYS, KEY_SIZE, KeyMaterial, KeyPair, REGISTRATION_ID_RANGE, entropy_len,
};
