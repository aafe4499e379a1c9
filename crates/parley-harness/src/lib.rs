//! Deterministic simulation harness for Parley.
//!
//! [`SimEnv`] implements the core `Environment` with a seeded RNG and a
//! virtual clock. [`SimWorld`] wires a relay and any number of clients
//! together with synchronous, in-order delivery, so whole join/send/leave
//! flows run reproducibly inside a test.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation. Operations are
//! applied to both the model and a [`SimWorld`], and their observable states
//! are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod sim_env;
pub mod world;

pub use model::{
    ACTORS, ModelDelivery, ModelWorld, ObservableState, Operation, OperationError,
    OperationResult, ROOMS,
};
pub use sim_env::{SIM_EPOCH_SECS, SimEnv};
pub use world::{EnvelopeTamper, SimWorld, WorldError};
