#![forbid(unsafe_code)]

//! Test harness for the traffic facade.
//!
//! - [`ScriptedEngine`]: engine double that records requests and replays
//!   scripted state changes.
//! - [`RecordingObserver`] / [`CallLog`]: observer double that logs every
//!   callback in delivery order.
//!
//! Cross-crate integration and property tests live in this crate's `tests/`
//! directory.

pub mod engine;
pub mod observer;

pub use engine::{EngineRequest, ScriptedEngine};
pub use observer::{Call, CallLog, RecordingObserver};
