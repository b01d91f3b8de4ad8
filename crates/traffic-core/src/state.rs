#![forbid(unsafe_code)]

//! Discrete live-traffic states and their raw engine codes.
//!
//! The traffic engine reports its state as a small integer code. This module
//! owns the closed set of recognized codes and the conversion between codes
//! and the typed [`TrafficState`].
//!
//! # Design
//!
//! ## Invariants
//! 1. The code table is fixed: `0..=7` map one-to-one onto the 8 variants.
//! 2. [`TrafficState::Disabled`] is the only "off" state; every other variant
//!    means traffic is on with some data-quality condition.
//! 3. `from_raw(s.raw()) == Ok(s)` for every variant.
//!
//! ## Failure Modes
//! - A code outside the table is a contract break with the engine and is
//!   reported as [`TrafficError::UnsupportedState`]. There is no fallback
//!   variant.

use std::fmt;
use std::str::FromStr;

use crate::error::TrafficError;

// ---------------------------------------------------------------------------
// TrafficState
// ---------------------------------------------------------------------------

/// Status of live-traffic data availability and quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrafficState {
    /// Traffic layer is off. Initial state.
    #[default]
    Disabled,
    /// Traffic is on and data is current.
    Enabled,
    /// Traffic is on; the engine is waiting for the first data batch.
    WaitingData,
    /// Data is available but stale.
    Outdated,
    /// No data exists for the visible area.
    NoData,
    /// Data could not be fetched.
    NetworkError,
    /// The data version has expired and must be refreshed.
    ExpiredData,
    /// The application build is too old for the traffic service.
    ExpiredApp,
}

impl TrafficState {
    /// All states in code order.
    pub const ALL: [TrafficState; 8] = [
        TrafficState::Disabled,
        TrafficState::Enabled,
        TrafficState::WaitingData,
        TrafficState::Outdated,
        TrafficState::NoData,
        TrafficState::NetworkError,
        TrafficState::ExpiredData,
        TrafficState::ExpiredApp,
    ];

    /// Decode an engine state code.
    pub fn from_raw(raw: i32) -> Result<Self, TrafficError> {
        match raw {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::Enabled),
            2 => Ok(Self::WaitingData),
            3 => Ok(Self::Outdated),
            4 => Ok(Self::NoData),
            5 => Ok(Self::NetworkError),
            6 => Ok(Self::ExpiredData),
            7 => Ok(Self::ExpiredApp),
            _ => Err(TrafficError::UnsupportedState { raw }),
        }
    }

    /// Engine code for this state.
    #[must_use]
    pub const fn raw(self) -> i32 {
        match self {
            Self::Disabled => 0,
            Self::Enabled => 1,
            Self::WaitingData => 2,
            Self::Outdated => 3,
            Self::NoData => 4,
            Self::NetworkError => 5,
            Self::ExpiredData => 6,
            Self::ExpiredApp => 7,
        }
    }

    /// Canonical upper-snake name, as it appears in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disabled => "DISABLED",
            Self::Enabled => "ENABLED",
            Self::WaitingData => "WAITING_DATA",
            Self::Outdated => "OUTDATED",
            Self::NoData => "NO_DATA",
            Self::NetworkError => "NETWORK_ERROR",
            Self::ExpiredData => "EXPIRED_DATA",
            Self::ExpiredApp => "EXPIRED_APP",
        }
    }

    /// Whether traffic is switched on in this state.
    #[inline]
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl fmt::Display for TrafficState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i32> for TrafficState {
    type Error = TrafficError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}

impl From<TrafficState> for i32 {
    fn from(state: TrafficState) -> Self {
        state.raw()
    }
}

/// Error returned when a state name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStateError {
    input: String,
}

impl ParseStateError {
    /// The rejected input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for ParseStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown traffic state name: {}", self.input)
    }
}

impl std::error::Error for ParseStateError {}

impl FromStr for TrafficState {
    type Err = ParseStateError;

    /// Accepts the canonical names in any case, with `-` or `_` separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|state| state.name() == normalized)
            .ok_or_else(|| ParseStateError {
                input: s.to_string(),
            })
    }
}
