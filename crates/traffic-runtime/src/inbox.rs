#![forbid(unsafe_code)]

//! Control-thread mailbox for engines that report from background threads.
//!
//! The manager and its listener are `!Send`, so a background engine thread
//! cannot call the listener directly. It posts raw state codes through an
//! [`InboxSender`] instead, and the control thread's event loop drains them
//! with [`StateInbox::pump`].
//!
//! # Ordering
//!
//! Codes are delivered in the order they were posted. `pump` stops at the
//! first code the listener rejects and returns that error; codes posted after
//! it stay queued for the next pump.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

use tracing::trace;
use traffic_core::{TrafficError, TrafficState};

use crate::engine::StateChangeListener;

/// Receiving half, owned by the control thread.
#[derive(Debug)]
pub struct StateInbox {
    rx: mpsc::Receiver<i32>,
    pending: Arc<AtomicUsize>,
}

/// Sending half. Cloneable and `Send`.
#[derive(Debug, Clone)]
pub struct InboxSender {
    tx: mpsc::Sender<i32>,
    pending: Arc<AtomicUsize>,
}

impl StateInbox {
    /// Create an inbox and its first sender.
    #[must_use]
    pub fn channel() -> (Self, InboxSender) {
        let (tx, rx) = mpsc::channel();
        let pending = Arc::new(AtomicUsize::new(0));
        (
            Self {
                rx,
                pending: Arc::clone(&pending),
            },
            InboxSender { tx, pending },
        )
    }

    /// Deliver every queued code. Returns how many were delivered.
    pub fn pump(&self, listener: &StateChangeListener) -> Result<usize, TrafficError> {
        self.pump_at_most(listener, usize::MAX)
    }

    /// Deliver up to `limit` queued codes, so a burst of engine updates
    /// cannot starve the rest of the event loop.
    pub fn pump_at_most(
        &self,
        listener: &StateChangeListener,
        limit: usize,
    ) -> Result<usize, TrafficError> {
        let mut delivered = 0;
        while delivered < limit {
            let Ok(raw) = self.rx.try_recv() else {
                break;
            };
            self.pending.fetch_sub(1, Ordering::AcqRel);
            listener.on_traffic_state_changed(raw)?;
            delivered += 1;
        }
        if delivered > 0 {
            trace!(delivered, pending = self.pending(), "pumped traffic state inbox");
        }
        Ok(delivered)
    }

    /// Codes posted but not yet pumped.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

impl InboxSender {
    /// Queue a raw engine code for the control thread.
    pub fn post(&self, raw: i32) -> Result<(), TrafficError> {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.tx.send(raw).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            TrafficError::InboxClosed { raw }
        })
    }

    /// Queue a decoded state.
    pub fn post_state(&self, state: TrafficState) -> Result<(), TrafficError> {
        self.post(state.raw())
    }
}
