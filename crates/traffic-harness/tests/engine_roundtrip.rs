#![forbid(unsafe_code)]

//! Integration tests driving the manager through a responding engine,
//! re-entrant observers and the cross-thread state inbox.

use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use tracing::Level;
use traffic_core::{TrafficError, TrafficState};
use traffic_harness::{CallLog, EngineRequest, RecordingObserver, ScriptedEngine};
use traffic_runtime::{ReinitPolicy, StateInbox, TrafficConfig, TrafficManager, TrafficObserver};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::DEBUG)
        .try_init();
}

fn pair(name: &str, state: TrafficState) -> (String, TrafficState) {
    (name.to_string(), state)
}

#[test]
fn toggle_round_trip_through_responding_engine() {
    init_tracing();
    let engine = ScriptedEngine::responding();
    let manager = TrafficManager::new(engine.clone());
    manager.initialize().unwrap();
    let log = CallLog::new();
    manager.attach(RecordingObserver::handle("map", &log)).unwrap();
    manager.attach(RecordingObserver::handle("button", &log)).unwrap();

    manager.toggle().unwrap();
    manager.toggle().unwrap();

    assert_eq!(
        log.states_for("map"),
        vec![
            TrafficState::Disabled,
            TrafficState::WaitingData,
            TrafficState::Enabled,
            TrafficState::Disabled,
        ]
    );
    assert_eq!(log.states_for("button"), log.states_for("map"));
    assert_eq!(
        engine.requests(),
        vec![
            EngineRequest::SetListener,
            EngineRequest::Enable,
            EngineRequest::Disable
        ]
    );
    assert_eq!(manager.version(), 3);
}

/// Observer that switches traffic off as soon as it sees a network error,
/// the way a UI would react to a failure banner.
struct AutoOff {
    manager: TrafficManager,
    log: CallLog,
}

impl AutoOff {
    fn record(&self, state: TrafficState) {
        self.log.push("auto-off", state);
    }
}

impl TrafficObserver for AutoOff {
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
        assert_eq!(self.manager.is_enabled(), Ok(true));
        self.manager.disable().unwrap();
    }
    fn on_expired_data(&self) {
        self.record(TrafficState::ExpiredData);
    }
    fn on_expired_app(&self) {
        self.record(TrafficState::ExpiredApp);
    }
}

#[test]
fn observer_may_call_back_into_manager() {
    init_tracing();
    let engine = ScriptedEngine::responding();
    let manager = TrafficManager::new(engine.clone());
    manager.initialize().unwrap();
    let log = CallLog::new();
    manager
        .attach(Rc::new(AutoOff {
            manager: manager.clone(),
            log: log.clone(),
        }))
        .unwrap();
    manager.attach(RecordingObserver::handle("legend", &log)).unwrap();
    log.take();

    engine.emit(TrafficState::NetworkError);

    // Both observers see NETWORK_ERROR before either sees the DISABLED
    // answer to the disable request made inside the fan-out.
    assert_eq!(
        log.pairs(),
        vec![
            pair("auto-off", TrafficState::NetworkError),
            pair("legend", TrafficState::NetworkError),
            pair("auto-off", TrafficState::Disabled),
            pair("legend", TrafficState::Disabled),
        ]
    );
    assert_eq!(manager.is_enabled(), Ok(false));
}

/// Observer that attaches a second observer from inside a callback.
struct Recruiter {
    manager: TrafficManager,
    log: CallLog,
    recruited: Cell<bool>,
}

impl Recruiter {
    fn seen(&self, state: TrafficState) {
        self.log.push("recruiter", state);
        if state == TrafficState::Enabled && !self.recruited.replace(true) {
            self.manager
                .attach(RecordingObserver::handle("recruit", &self.log))
                .unwrap();
        }
    }
}

impl TrafficObserver for Recruiter {
    fn on_enabled(&self) {
        self.seen(TrafficState::Enabled);
    }
    fn on_disabled(&self) {
        self.seen(TrafficState::Disabled);
    }
    fn on_waiting_data(&self) {
        self.seen(TrafficState::WaitingData);
    }
    fn on_outdated(&self) {
        self.seen(TrafficState::Outdated);
    }
    fn on_no_data(&self) {
        self.seen(TrafficState::NoData);
    }
    fn on_network_error(&self) {
        self.seen(TrafficState::NetworkError);
    }
    fn on_expired_data(&self) {
        self.seen(TrafficState::ExpiredData);
    }
    fn on_expired_app(&self) {
        self.seen(TrafficState::ExpiredApp);
    }
}

#[test]
fn attach_during_fan_out_gets_replay_then_later_transitions() {
    let engine = ScriptedEngine::passive();
    let manager = TrafficManager::new(engine.clone());
    manager.initialize().unwrap();
    let log = CallLog::new();
    manager
        .attach(Rc::new(Recruiter {
            manager: manager.clone(),
            log: log.clone(),
            recruited: Cell::new(false),
        }))
        .unwrap();
    log.take();

    engine.emit(TrafficState::Enabled);
    engine.emit(TrafficState::Outdated);

    assert_eq!(
        log.pairs(),
        vec![
            pair("recruiter", TrafficState::Enabled),
            pair("recruit", TrafficState::Enabled),
            pair("recruiter", TrafficState::Outdated),
            pair("recruit", TrafficState::Outdated),
        ]
    );
}

struct Exploding {
    armed: Cell<bool>,
}

impl Exploding {
    fn maybe_explode(&self) {
        if self.armed.replace(false) {
            panic!("observer failure");
        }
    }
}

impl TrafficObserver for Exploding {
    fn on_enabled(&self) {
        self.maybe_explode();
    }
    fn on_disabled(&self) {}
    fn on_waiting_data(&self) {}
    fn on_outdated(&self) {}
    fn on_no_data(&self) {}
    fn on_network_error(&self) {}
    fn on_expired_data(&self) {}
    fn on_expired_app(&self) {}
}

#[test]
fn manager_survives_a_panicking_observer() {
    let engine = ScriptedEngine::passive();
    let manager = TrafficManager::new(engine.clone());
    manager.initialize().unwrap();
    let log = CallLog::new();
    manager
        .attach(Rc::new(Exploding {
            armed: Cell::new(true),
        }))
        .unwrap();
    manager.attach(RecordingObserver::handle("after", &log)).unwrap();
    log.take();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        engine.emit(TrafficState::Enabled);
    }));
    assert!(outcome.is_err());
    assert_eq!(manager.state(), Ok(TrafficState::Enabled));

    // Later transitions still fan out to everyone.
    engine.emit(TrafficState::NoData);
    assert_eq!(log.pairs(), vec![pair("after", TrafficState::NoData)]);
}

/// Observer whose engine answers synchronously before the observer fails.
struct ReportsThenPanics {
    engine: Rc<ScriptedEngine>,
    armed: Cell<bool>,
}

impl TrafficObserver for ReportsThenPanics {
    fn on_enabled(&self) {
        if self.armed.replace(false) {
            self.engine.emit(TrafficState::NoData);
            panic!("observer failure after engine report");
        }
    }
    fn on_disabled(&self) {}
    fn on_waiting_data(&self) {}
    fn on_outdated(&self) {}
    fn on_no_data(&self) {}
    fn on_network_error(&self) {}
    fn on_expired_data(&self) {}
    fn on_expired_app(&self) {}
}

#[test]
fn panic_mid_fan_out_still_applies_queued_engine_state() {
    let engine = ScriptedEngine::passive();
    let manager = TrafficManager::new(engine.clone());
    manager.initialize().unwrap();
    let log = CallLog::new();
    manager
        .attach(Rc::new(ReportsThenPanics {
            engine: engine.clone(),
            armed: Cell::new(true),
        }))
        .unwrap();
    manager.attach(RecordingObserver::handle("after", &log)).unwrap();
    log.take();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        engine.emit(TrafficState::Enabled);
    }));
    assert!(outcome.is_err());

    // The held state matches the engine's last report, not the failed one.
    assert_eq!(manager.state(), Ok(TrafficState::NoData));
    assert_eq!(manager.version(), 2);
    assert!(log.is_empty());

    // The skipped state is not delivered late with the next transition.
    engine.emit(TrafficState::Outdated);
    assert_eq!(log.states_for("after"), vec![TrafficState::Outdated]);
    assert_eq!(manager.version(), 3);
}

#[test]
fn inbox_marshals_background_codes_in_order() {
    init_tracing();
    let engine = ScriptedEngine::passive();
    let manager = TrafficManager::new(engine.clone());
    manager.initialize().unwrap();
    let log = CallLog::new();
    manager.attach(RecordingObserver::handle("map", &log)).unwrap();
    log.take();

    let (inbox, sender) = StateInbox::channel();
    let worker = std::thread::spawn(move || {
        for state in [
            TrafficState::WaitingData,
            TrafficState::Enabled,
            TrafficState::Outdated,
        ] {
            sender.post_state(state).unwrap();
        }
    });
    worker.join().unwrap();
    assert_eq!(inbox.pending(), 3);

    let listener = engine.listener().unwrap();
    assert_eq!(inbox.pump_at_most(&listener, 2), Ok(2));
    assert_eq!(inbox.pending(), 1);
    assert_eq!(inbox.pump(&listener), Ok(1));
    assert_eq!(inbox.pump(&listener), Ok(0));

    assert_eq!(
        log.states_for("map"),
        vec![
            TrafficState::WaitingData,
            TrafficState::Enabled,
            TrafficState::Outdated,
        ]
    );
}

#[test]
fn inbox_stops_at_first_bad_code() {
    let engine = ScriptedEngine::passive();
    let manager = TrafficManager::new(engine.clone());
    manager.initialize().unwrap();

    let (inbox, sender) = StateInbox::channel();
    sender.post(1).unwrap();
    sender.post(99).unwrap();
    sender.post(4).unwrap();

    let listener = engine.listener().unwrap();
    assert_eq!(
        inbox.pump(&listener),
        Err(TrafficError::UnsupportedState { raw: 99 })
    );
    assert_eq!(manager.state(), Ok(TrafficState::Enabled));
    assert_eq!(inbox.pending(), 1);

    assert_eq!(inbox.pump(&listener), Ok(1));
    assert_eq!(manager.state(), Ok(TrafficState::NoData));
}

#[test]
fn reregister_policy_replaces_engine_listener() {
    let engine = ScriptedEngine::passive();
    let manager = TrafficManager::with_config(
        engine.clone(),
        TrafficConfig::default().with_reinit(ReinitPolicy::Reregister),
    );
    manager.initialize().unwrap();
    manager.initialize().unwrap();
    assert_eq!(engine.count(EngineRequest::SetListener), 2);

    // Either registration feeds the same manager, once per notification.
    let log = CallLog::new();
    manager.attach(RecordingObserver::handle("map", &log)).unwrap();
    log.take();
    engine.emit(TrafficState::Enabled);
    assert_eq!(log.len(), 1);
}

#[test]
fn engine_outliving_manager_is_harmless() {
    let engine = ScriptedEngine::passive();
    {
        let manager = TrafficManager::new(engine.clone());
        manager.initialize().unwrap();
    }
    let listener = engine.listener().unwrap();
    assert!(!listener.is_connected());
    assert!(engine.emit(TrafficState::Enabled));
}

#[test]
fn engine_holding_a_stale_listener_does_not_leak_observers() {
    let engine = ScriptedEngine::passive();
    let dropped = Rc::new(RefCell::new(false));

    struct DropFlag(Rc<RefCell<bool>>);
    impl Drop for DropFlag {
        fn drop(&mut self) {
            *self.0.borrow_mut() = true;
        }
    }
    impl TrafficObserver for DropFlag {
        fn on_enabled(&self) {}
        fn on_disabled(&self) {}
        fn on_waiting_data(&self) {}
        fn on_outdated(&self) {}
        fn on_no_data(&self) {}
        fn on_network_error(&self) {}
        fn on_expired_data(&self) {}
        fn on_expired_app(&self) {}
    }

    {
        let manager = TrafficManager::new(engine.clone());
        manager.initialize().unwrap();
        manager
            .attach(Rc::new(DropFlag(Rc::clone(&dropped))))
            .unwrap();
    }
    assert!(*dropped.borrow());
    assert!(engine.listener().is_some());
}
