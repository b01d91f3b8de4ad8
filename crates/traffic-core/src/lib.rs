#![forbid(unsafe_code)]

//! Core: traffic state codes, validation and the error taxonomy.
//!
//! # Role in the workspace
//! `traffic-core` is the vocabulary layer. It owns the closed
//! [`TrafficState`] enumeration, the mapping from raw engine codes to typed
//! states, and [`TrafficError`]. It has no knowledge of engines or observers.
//!
//! # How it fits in the system
//! The runtime (`traffic-runtime`) consumes `TrafficState` values reported
//! by the engine, keeps the current one, and fans it out to observers.
//! Everything that can fail in the runtime fails with a `TrafficError`.

pub mod error;
pub mod state;

#[cfg(feature = "tracing-json")]
pub mod logging;

pub use error::TrafficError;
pub use state::{ParseStateError, TrafficState};
