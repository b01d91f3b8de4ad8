#![forbid(unsafe_code)]

//! Recording observer and the shared call log it writes to.

use std::cell::RefCell;
use std::rc::Rc;

use traffic_core::TrafficState;
use traffic_runtime::{ObserverHandle, TrafficObserver};

/// One callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub observer: String,
    pub state: TrafficState,
}

/// Shared, append-only record of callbacks across observers.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Rc<RefCell<Vec<Call>>>,
}

impl CallLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, observer: &str, state: TrafficState) {
        self.calls.borrow_mut().push(Call {
            observer: observer.to_string(),
            state,
        });
    }

    /// Snapshot of every call so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Calls as `(observer, state)` pairs, for compact assertions.
    #[must_use]
    pub fn pairs(&self) -> Vec<(String, TrafficState)> {
        self.calls
            .borrow()
            .iter()
            .map(|c| (c.observer.clone(), c.state))
            .collect()
    }

    /// States delivered to one observer, in order.
    #[must_use]
    pub fn states_for(&self, observer: &str) -> Vec<TrafficState> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.observer == observer)
            .map(|c| c.state)
            .collect()
    }

    /// Remove and return every call so far.
    pub fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }
}

/// Observer that appends each callback to a [`CallLog`].
#[derive(Debug)]
pub struct RecordingObserver {
    name: String,
    log: CallLog,
}

impl RecordingObserver {
    /// Create an observer handle named `name` writing to `log`.
    #[must_use]
    pub fn handle(name: impl Into<String>, log: &CallLog) -> ObserverHandle {
        Rc::new(Self {
            name: name.into(),
            log: log.clone(),
        })
    }

    fn record(&self, state: TrafficState) {
        self.log.push(&self.name, state);
    }
}

impl TrafficObserver for RecordingObserver {
    fn on_enabled(&self) {
        self.record(TrafficState::Enabled);
    }

    fn on_disabled(&self) {
        self.record(TrafficState::Disabled);
    }

    fn on_waiting_data(&self) {
        self.record(TrafficState::WaitingData);
    }

    fn on_outdated(&self) {
        self.record(TrafficState::Outdated);
    }

    fn on_no_data(&self) {
        self.record(TrafficState::NoData);
    }

    fn on_network_error(&self) {
        self.record(TrafficState::NetworkError);
    }

    fn on_expired_data(&self) {
        self.record(TrafficState::ExpiredData);
    }

    fn on_expired_app(&self) {
        self.record(TrafficState::ExpiredApp);
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}
