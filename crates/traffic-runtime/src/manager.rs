#![forbid(unsafe_code)]

//! Traffic state holder and observer fan-out.
//!
//! # Design
//!
//! [`TrafficManager`] is a cloneable handle over shared, single-threaded
//! storage (`Rc<RefCell<..>>`). It has two facets: the state holder
//! (`initialize`, `toggle`, `disable`, `is_enabled`) and the observer
//! registry (`attach`, `detach_all`). The current state changes only when
//! the engine reports a new one through the [`StateChangeListener`] created
//! in [`initialize`](TrafficManager::initialize).
//!
//! Because the handle is `Rc`-based it is neither `Send` nor `Sync`; the
//! control-thread contract is enforced by the compiler and no locks exist.
//!
//! # Invariants
//!
//! 1. The held state is always one of the [`TrafficState`] variants; raw
//!    codes are validated before the state is touched.
//! 2. Observers are notified in attachment order.
//! 3. An attached observer sees every transition since its attachment,
//!    once, in order. Attaching replays the current state to the new
//!    observer only.
//! 4. A transition reported while a fan-out is running is queued and
//!    delivered after it, so no observer sees transitions out of order.
//! 5. No internal borrow is held while observer callbacks or engine
//!    requests run.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `Uninitialized` | operation before `initialize()` | `Err`, nothing changes |
//! | `AlreadyInitialized` | second `initialize()`, reject policy | `Err`, engine untouched |
//! | `DuplicateObserver` | same `Rc` attached twice | `Err`, set unchanged |
//! | `UnsupportedState` | unknown engine code | `Err`, no state change, no fan-out |
//! | Empty detach | `detach_all()` with nothing attached | WARN log, `Ok(0)` |
//! | Observer panic | callback unwinds | panic propagates; queued transitions are applied undelivered (WARN) |

use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, debug_span, info, trace, warn};
use traffic_core::{TrafficError, TrafficState};

use crate::config::{ReinitPolicy, TrafficConfig};
use crate::engine::{StateChangeListener, TrafficEngine};
use crate::observer::{ObserverHandle, dispatch, same_observer};

/// Shared interior for [`TrafficManager`].
pub(crate) struct ManagerInner {
    state: TrafficState,
    initialized: bool,
    /// Number of engine transitions delivered so far.
    version: u64,
    observers: Vec<ObserverHandle>,
    /// Transitions reported while a fan-out was running.
    pending: VecDeque<TrafficState>,
    dispatching: bool,
    config: TrafficConfig,
}

impl ManagerInner {
    fn ensure_initialized(&self, operation: &'static str) -> Result<(), TrafficError> {
        if self.initialized {
            Ok(())
        } else {
            Err(TrafficError::Uninitialized { operation })
        }
    }
}

/// Single owner of the live-traffic state and its observers.
///
/// Cloning a `TrafficManager` creates a new handle to the **same** state,
/// observer set and engine.
pub struct TrafficManager {
    inner: Rc<RefCell<ManagerInner>>,
    engine: Rc<dyn TrafficEngine>,
}

// Manual Clone: shares the same Rc.
impl Clone for TrafficManager {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            engine: Rc::clone(&self.engine),
        }
    }
}

impl fmt::Debug for TrafficManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("TrafficManager")
            .field("state", &inner.state)
            .field("initialized", &inner.initialized)
            .field("version", &inner.version)
            .field("observer_count", &inner.observers.len())
            .finish()
    }
}

impl TrafficManager {
    /// Create an uninitialized manager with the default configuration.
    #[must_use]
    pub fn new(engine: Rc<dyn TrafficEngine>) -> Self {
        Self::with_config(engine, TrafficConfig::default())
    }

    /// Create an uninitialized manager.
    #[must_use]
    pub fn with_config(engine: Rc<dyn TrafficEngine>, config: TrafficConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ManagerInner {
                state: TrafficState::Disabled,
                initialized: false,
                version: 0,
                observers: Vec::new(),
                pending: VecDeque::new(),
                dispatching: false,
                config,
            })),
            engine,
        }
    }

    /// Register the state-change listener with the engine.
    ///
    /// A second call follows [`TrafficConfig::reinit`].
    pub fn initialize(&self) -> Result<(), TrafficError> {
        let register = {
            let inner = self.inner.borrow();
            if inner.initialized {
                match inner.config.reinit {
                    ReinitPolicy::Reject => return Err(TrafficError::AlreadyInitialized),
                    ReinitPolicy::Ignore => {
                        warn!("traffic manager already initialized; ignoring");
                        false
                    }
                    ReinitPolicy::Reregister => {
                        warn!("traffic manager already initialized; registering listener again");
                        true
                    }
                }
            } else {
                info!(
                    state = %inner.state,
                    "initializing traffic manager and registering the state change listener"
                );
                true
            }
        };

        if register {
            let listener = StateChangeListener::new(Rc::downgrade(&self.inner));
            self.engine.set_state_change_listener(listener);
        }
        self.inner.borrow_mut().initialized = true;
        Ok(())
    }

    /// Request the opposite of the current on/off state from the engine.
    ///
    /// The held state is not changed here; only the engine's subsequent
    /// notification moves it.
    pub fn toggle(&self) -> Result<(), TrafficError> {
        if self.current("toggle")? == TrafficState::Disabled {
            self.enable();
        } else {
            self.request_disable();
        }
        Ok(())
    }

    /// Request traffic off, regardless of the current state.
    pub fn disable(&self) -> Result<(), TrafficError> {
        self.inner.borrow().ensure_initialized("disable")?;
        self.request_disable();
        Ok(())
    }

    /// Whether the held state is anything other than `Disabled`.
    pub fn is_enabled(&self) -> Result<bool, TrafficError> {
        Ok(self.current("is_enabled")?.is_enabled())
    }

    /// The held state.
    pub fn state(&self) -> Result<TrafficState, TrafficError> {
        self.current("state")
    }

    /// Attach an observer and replay the current state to it.
    ///
    /// Only the new observer receives the replay.
    pub fn attach(&self, observer: ObserverHandle) -> Result<(), TrafficError> {
        let label = observer.label();
        let state = {
            let mut inner = self.inner.borrow_mut();
            inner.ensure_initialized("attach")?;
            if inner.observers.iter().any(|o| same_observer(o, &observer)) {
                return Err(TrafficError::DuplicateObserver { label });
            }
            inner.observers.push(Rc::clone(&observer));
            debug!(
                observer = %label,
                observers = inner.observers.len(),
                "attach traffic observer"
            );
            inner.state
        };

        trace!(observer = %label, %state, "replay current state");
        dispatch(state, observer.as_ref());
        Ok(())
    }

    /// Detach every observer in one step. Returns how many were detached.
    ///
    /// Calling this with nothing attached is allowed but logged.
    pub fn detach_all(&self) -> Result<usize, TrafficError> {
        let detached = {
            let mut inner = self.inner.borrow_mut();
            inner.ensure_initialized("detach_all")?;
            if inner.observers.is_empty() {
                if inner.config.warn_on_empty_detach {
                    warn!(
                        backtrace = %Backtrace::capture(),
                        "no traffic observers attached; call detach_all only when it is needed"
                    );
                }
                return Ok(0);
            }
            std::mem::take(&mut inner.observers)
        };

        for observer in &detached {
            debug!(observer = %observer.label(), "detach traffic observer");
        }
        Ok(detached.len())
    }

    /// Whether `initialize()` has run.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.borrow().initialized
    }

    /// Number of engine transitions delivered so far. Attach replays do not
    /// count. Useful for dirty-checking in render loops.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of attached observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> TrafficConfig {
        self.inner.borrow().config.clone()
    }

    fn current(&self, operation: &'static str) -> Result<TrafficState, TrafficError> {
        let inner = self.inner.borrow();
        inner.ensure_initialized(operation)?;
        Ok(inner.state)
    }

    fn enable(&self) {
        debug!("enable traffic");
        self.engine.enable();
    }

    fn request_disable(&self) {
        debug!("disable traffic");
        self.engine.disable();
    }
}

/// Record `state` as current and deliver it to every attached observer.
///
/// Re-entrant calls (from an observer callback or an engine reacting
/// synchronously to a request made inside one) are queued and drained by
/// the outermost call.
pub(crate) fn fan_out(cell: &RefCell<ManagerInner>, state: TrafficState) {
    {
        let mut inner = cell.borrow_mut();
        inner.pending.push_back(state);
        if inner.dispatching {
            debug!(
                %state,
                queued = inner.pending.len(),
                "traffic state change queued behind running fan-out"
            );
            return;
        }
        inner.dispatching = true;
    }
    let _guard = DispatchGuard { cell };

    loop {
        let (previous, state, version, observers) = {
            let mut inner = cell.borrow_mut();
            let Some(state) = inner.pending.pop_front() else {
                break;
            };
            let previous = std::mem::replace(&mut inner.state, state);
            inner.version += 1;
            (previous, state, inner.version, inner.observers.clone())
        };

        debug!(
            from = %previous,
            to = %state,
            version,
            observers = observers.len(),
            "traffic state changed"
        );
        let _span = debug_span!("traffic_fan_out", %state, version).entered();
        for observer in &observers {
            trace!(observer = %observer.label(), "deliver");
            dispatch(state, observer.as_ref());
        }
    }
}

/// Clears the in-progress flag when the outermost fan-out ends.
///
/// When an observer callback unwinds, transitions queued behind the failed
/// fan-out are not delivered, but the held state still moves to the last of
/// them so it keeps matching what the engine reported.
struct DispatchGuard<'a> {
    cell: &'a RefCell<ManagerInner>,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let Ok(mut inner) = self.cell.try_borrow_mut() else {
            return;
        };
        inner.dispatching = false;
        if !std::thread::panicking() || inner.pending.is_empty() {
            return;
        }
        let skipped: Vec<TrafficState> = inner.pending.drain(..).collect();
        let previous = inner.state;
        if let Some(&last) = skipped.last() {
            inner.state = last;
        }
        inner.version += skipped.len() as u64;
        warn!(
            from = %previous,
            to = %inner.state,
            version = inner.version,
            skipped = ?skipped,
            "observer panicked during fan-out; queued traffic states applied without delivery"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
