#![forbid(unsafe_code)]

//! Scripted traffic engine for tests.
//!
//! [`ScriptedEngine`] records every request the manager makes and keeps the
//! listener it was handed, so a test can play the engine's side with
//! [`emit`](ScriptedEngine::emit). Optional scripted responses make it
//! answer enable/disable requests synchronously, the way a real engine
//! eventually would.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;
use traffic_core::{TrafficError, TrafficState};
use traffic_runtime::{StateChangeListener, TrafficEngine};

/// A request observed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineRequest {
    SetListener,
    Enable,
    Disable,
}

/// Engine double with request recording and scripted responses.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    listener: RefCell<Option<StateChangeListener>>,
    requests: RefCell<Vec<EngineRequest>>,
    on_enable: RefCell<Vec<TrafficState>>,
    on_disable: RefCell<Vec<TrafficState>>,
}

impl ScriptedEngine {
    /// Engine that records requests and never answers on its own.
    #[must_use]
    pub fn passive() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Engine that answers enable with `WAITING_DATA` then `ENABLED`, and
    /// disable with `DISABLED`.
    #[must_use]
    pub fn responding() -> Rc<Self> {
        let engine = Self::default();
        engine.script_enable([TrafficState::WaitingData, TrafficState::Enabled]);
        engine.script_disable([TrafficState::Disabled]);
        Rc::new(engine)
    }

    /// States emitted, in order, after each enable request.
    pub fn script_enable(&self, states: impl IntoIterator<Item = TrafficState>) {
        *self.on_enable.borrow_mut() = states.into_iter().collect();
    }

    /// States emitted, in order, after each disable request.
    pub fn script_disable(&self, states: impl IntoIterator<Item = TrafficState>) {
        *self.on_disable.borrow_mut() = states.into_iter().collect();
    }

    /// Play a state change. Returns `false` if no listener is registered.
    pub fn emit(&self, state: TrafficState) -> bool {
        match self.listener() {
            Some(listener) => {
                listener.notify(state);
                true
            }
            None => false,
        }
    }

    /// Play a raw state code, as a native engine would.
    pub fn emit_raw(&self, raw: i32) -> Result<bool, TrafficError> {
        match self.listener() {
            Some(listener) => listener.on_traffic_state_changed(raw).map(|()| true),
            None => Ok(false),
        }
    }

    /// The most recently registered listener.
    #[must_use]
    pub fn listener(&self) -> Option<StateChangeListener> {
        self.listener.borrow().clone()
    }

    /// Every request seen so far.
    #[must_use]
    pub fn requests(&self) -> Vec<EngineRequest> {
        self.requests.borrow().clone()
    }

    /// Number of requests of one kind.
    #[must_use]
    pub fn count(&self, request: EngineRequest) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|r| **r == request)
            .count()
    }

    /// Forget recorded requests (scripts and listener are kept).
    pub fn clear_requests(&self) {
        self.requests.borrow_mut().clear();
    }

    fn record(&self, request: EngineRequest) {
        debug!(?request, "scripted engine request");
        self.requests.borrow_mut().push(request);
    }

    fn respond(&self, script: &RefCell<Vec<TrafficState>>) {
        let states = script.borrow().clone();
        for state in states {
            self.emit(state);
        }
    }
}

impl TrafficEngine for ScriptedEngine {
    fn set_state_change_listener(&self, listener: StateChangeListener) {
        self.record(EngineRequest::SetListener);
        *self.listener.borrow_mut() = Some(listener);
    }

    fn enable(&self) {
        self.record(EngineRequest::Enable);
        self.respond(&self.on_enable);
    }

    fn disable(&self) {
        self.record(EngineRequest::Disable);
        self.respond(&self.on_disable);
    }
}
