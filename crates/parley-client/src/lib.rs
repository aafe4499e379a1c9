//! Client
//!
//! Action-based client state machine for the Parley relay. Manages room
//! memberships, online peers, and the pairwise sessions used to encrypt
//! messages between them.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO and Action-Based patterns as
//! [`parley_core`]. It receives events ([`ClientEvent`]), processes them
//! through pure state machine logic, and returns actions ([`ClientAction`]) for
//! the caller to execute.
//!
//! # Components
//!
//! - [`Client`]: Top-level state machine for one actor
//! - [`ClientEvent`]: Events fed into the client
//! - [`ClientAction`]: Actions produced by the client
//!
//! Envelopes that fail to decrypt are reported as
//! [`ClientAction::UndecryptableMessage`]; applications render them as
//! [`UNDECRYPTABLE_PLACEHOLDER`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod error;
mod event;

pub use client::Client;
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent, UNDECRYPTABLE_PLACEHOLDER};
pub use parley_core::{Environment, ReplayPolicy, ServiceConfig};
