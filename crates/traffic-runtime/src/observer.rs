#![forbid(unsafe_code)]

//! Observer interface and the state-to-callback dispatch table.
//!
//! Observers are host-supplied handles (`Rc<dyn TrafficObserver>`). Identity
//! is pointer identity of the shared allocation, so two clones of the same
//! `Rc` are the same observer while two separately allocated values are not,
//! even if they compare equal.

use std::rc::Rc;

use traffic_core::TrafficState;

/// Shared observer handle as stored by the registry.
pub type ObserverHandle = Rc<dyn TrafficObserver>;

/// Receiver of traffic state changes, one callback per state.
///
/// Callbacks run on the control thread with no internal borrow held, so an
/// implementation may call back into the manager.
pub trait TrafficObserver {
    fn on_enabled(&self);
    fn on_disabled(&self);
    fn on_waiting_data(&self);
    fn on_outdated(&self);
    fn on_no_data(&self);
    fn on_network_error(&self);
    fn on_expired_data(&self);
    fn on_expired_app(&self);

    /// Human-readable name used in log lines and errors.
    fn label(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// Invoke the callback matching `state` on `observer`.
///
/// This is the only place where states map onto callbacks; live fan-out and
/// attach replay both go through it.
pub fn dispatch(state: TrafficState, observer: &dyn TrafficObserver) {
    match state {
        TrafficState::Disabled => observer.on_disabled(),
        TrafficState::Enabled => observer.on_enabled(),
        TrafficState::WaitingData => observer.on_waiting_data(),
        TrafficState::NoData => observer.on_no_data(),
        TrafficState::Outdated => observer.on_outdated(),
        TrafficState::NetworkError => observer.on_network_error(),
        TrafficState::ExpiredData => observer.on_expired_data(),
        TrafficState::ExpiredApp => observer.on_expired_app(),
    }
}

/// Whether two handles refer to the same observer.
#[inline]
#[must_use]
pub fn same_observer(a: &ObserverHandle, b: &ObserverHandle) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}
