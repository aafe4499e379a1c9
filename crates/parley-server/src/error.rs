//! Relay error types.

use parley_proto::ProtocolError;
use thiserror::Error;

use crate::{fanout::FanoutError, storage::StorageError};

/// Errors returned by the relay driver to its runtime.
///
/// Failures that concern a single client request are not errors here: they
/// become [`RelayMessage::Error`](parley_proto::RelayMessage::Error) replies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// Inbound bytes were not a valid relay request.
    ///
    /// Fatal for that connection; the relay keeps serving others.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Storage failed on a path that has no client to report to
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A session record could not be created on demand
    #[error("session fan-out error: {0}")]
    Fanout(#[from] FanoutError),

    /// An event named no actor
    #[error("actor id must not be empty")]
    EmptyActorId,
}
