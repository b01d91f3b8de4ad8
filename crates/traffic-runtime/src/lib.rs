#![forbid(unsafe_code)]

//! Single-thread live-traffic state holder with observer fan-out.
//!
//! # Role in the workspace
//! `traffic-runtime` sits between an external traffic engine and the parts
//! of a map application that react to traffic availability. It keeps the
//! current [`TrafficState`](traffic_core::TrafficState), forwards the
//! engine's state changes to every attached [`TrafficObserver`], and turns
//! host requests into engine enable/disable calls.
//!
//! # Primary pieces
//! - [`TrafficManager`]: the explicit context object (state holder plus
//!   observer registry). Construct one per process and pass the handle.
//! - [`TrafficEngine`] / [`StateChangeListener`]: the engine boundary.
//! - [`TrafficObserver`] / [`dispatch`]: the eight-callback observer
//!   interface and the only state-to-callback table.
//! - [`StateInbox`]: mailbox for engines that report from other threads.
//! - [`TrafficConfig`]: env-overridable behaviour switches.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use traffic_core::TrafficState;
//! use traffic_runtime::{StateChangeListener, TrafficEngine, TrafficManager};
//!
//! #[derive(Default)]
//! struct Engine(RefCell<Option<StateChangeListener>>);
//!
//! impl TrafficEngine for Engine {
//!     fn set_state_change_listener(&self, listener: StateChangeListener) {
//!         *self.0.borrow_mut() = Some(listener);
//!     }
//!     fn enable(&self) {
//!         if let Some(listener) = self.0.borrow().as_ref() {
//!             listener.notify(TrafficState::Enabled);
//!         }
//!     }
//!     fn disable(&self) {
//!         if let Some(listener) = self.0.borrow().as_ref() {
//!             listener.notify(TrafficState::Disabled);
//!         }
//!     }
//! }
//!
//! let manager = TrafficManager::new(Rc::new(Engine::default()));
//! manager.initialize().unwrap();
//! manager.toggle().unwrap();
//! assert!(manager.is_enabled().unwrap());
//! ```

pub mod config;
pub mod engine;
pub mod inbox;
pub mod manager;
pub mod observer;

pub use config::{ReinitPolicy, TrafficConfig, TrafficConfigError, TrafficConfigParse};
pub use engine::{StateChangeListener, TrafficEngine};
pub use inbox::{InboxSender, StateInbox};
pub use manager::TrafficManager;
pub use observer::{ObserverHandle, TrafficObserver, dispatch};
