#![forbid(unsafe_code)]

//! Error taxonomy for the traffic facade.
//!
//! Every variant is raised synchronously at the offending call and is never
//! retried inside the facade.
//!
//! | Variant | Raised by | Cause |
//! |---------|-----------|-------|
//! | `Uninitialized` | any operation before `initialize()` | host bug |
//! | `AlreadyInitialized` | second `initialize()` under the reject policy | host bug |
//! | `DuplicateObserver` | `attach()` of an attached observer | host skipped `detach_all()` |
//! | `UnsupportedState` | inbound notification with an unknown code | engine contract break |
//! | `InboxClosed` | posting to a dropped state inbox | control loop shut down |

use std::fmt;

/// Errors from traffic facade operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrafficError {
    /// An operation was invoked before `initialize()`.
    Uninitialized { operation: &'static str },
    /// `initialize()` was called twice and the policy rejects it.
    AlreadyInitialized,
    /// The observer is already attached.
    DuplicateObserver { label: String },
    /// The engine reported a state code outside the recognized set.
    UnsupportedState { raw: i32 },
    /// The state inbox was dropped before the code could be posted.
    InboxClosed { raw: i32 },
}

impl TrafficError {
    /// Whether this error indicates a bug in the calling host code, as
    /// opposed to a broken engine or a shut-down control loop.
    #[must_use]
    pub const fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::Uninitialized { .. } | Self::AlreadyInitialized | Self::DuplicateObserver { .. }
        )
    }
}

impl fmt::Display for TrafficError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized { operation } => {
                write!(f, "traffic manager is not initialized (called '{operation}')")
            }
            Self::AlreadyInitialized => write!(f, "traffic manager is already initialized"),
            Self::DuplicateObserver { label } => write!(
                f,
                "observer '{label}' is already attached; call 'detach_all' first"
            ),
            Self::UnsupportedState { raw } => write!(f, "unsupported traffic state: {raw}"),
            Self::InboxClosed { raw } => {
                write!(f, "state inbox is closed; dropped state code {raw}")
            }
        }
    }
}

impl std::error::Error for TrafficError {}
