//! Parley session layer.
//!
//! Everything one actor needs to talk to its peers: a key store for published
//! bundles, a session store keyed by canonical pair, and a [`CryptoService`]
//! that establishes sessions and encrypts/decrypts envelopes. Client and relay
//! each run their own independent instance.
//!
//! The service is synchronous and owned by a single logical thread of control.
//! Randomness and time come from an injected [`Environment`] so the same code
//! runs under a seeded simulation and in production.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod env;
pub mod error;
pub mod key_store;
pub mod service;
pub mod session_store;

pub use config::{ReplayPolicy, ServiceConfig};
pub use env::{EntropyError, Environment};
pub use error::SessionError;
pub use key_store::{KeyStore, StoredKeys};
pub use service::{CryptoService, Establishment};
pub use session_store::{SessionRecord, SessionStore};
