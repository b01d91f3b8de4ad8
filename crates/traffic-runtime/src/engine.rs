#![forbid(unsafe_code)]

//! Boundary with the external traffic engine.
//!
//! The engine is consumed through two fire-and-forget requests
//! ([`TrafficEngine::enable`], [`TrafficEngine::disable`]) and reports back
//! through the single [`StateChangeListener`] handed to it during
//! initialization. The engine alone decides which state results from a
//! request.
//!
//! The listener holds a weak reference to the manager, so an engine that
//! outlives the manager does not keep it alive; notifications sent after
//! the manager is gone are ignored.

use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

use tracing::{debug, error};
use traffic_core::{TrafficError, TrafficState};

use crate::manager::{self, ManagerInner};

/// Requests the manager issues to the traffic engine.
///
/// Implementations must deliver state changes on the control thread. Engines
/// that compute on a background thread marshal through
/// [`StateInbox`](crate::inbox::StateInbox).
pub trait TrafficEngine {
    /// Register the notification entry point. Called from `initialize()`.
    fn set_state_change_listener(&self, listener: StateChangeListener);

    /// Ask the engine to switch traffic on.
    fn enable(&self);

    /// Ask the engine to switch traffic off.
    fn disable(&self);
}

/// The engine's sole notification channel into the manager.
#[derive(Clone)]
pub struct StateChangeListener {
    target: Weak<RefCell<ManagerInner>>,
}

impl StateChangeListener {
    pub(crate) fn new(target: Weak<RefCell<ManagerInner>>) -> Self {
        Self { target }
    }

    /// Deliver a raw state code from the engine.
    ///
    /// The code is validated before anything else happens: an unrecognized
    /// code changes no state and reaches no observer.
    pub fn on_traffic_state_changed(&self, raw: i32) -> Result<(), TrafficError> {
        let state = TrafficState::from_raw(raw).inspect_err(|_| {
            error!(raw, "engine reported an unsupported traffic state");
        })?;
        self.notify(state);
        Ok(())
    }

    /// Deliver an already-decoded state.
    pub fn notify(&self, state: TrafficState) {
        match self.target.upgrade() {
            Some(inner) => manager::fan_out(&inner, state),
            None => debug!(%state, "traffic manager dropped; ignoring state change"),
        }
    }

    /// Whether the manager this listener feeds is still alive.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl fmt::Debug for StateChangeListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateChangeListener")
            .field("connected", &self.is_connected())
            .finish()
    }
}
