//! Subscriber fan-out, keyed by system id.
//!
//! Publishing must never block or back-pressure the tick loop: events
//! go out through bounded channels with `try_send`, and a subscriber
//! that falls behind loses events instead of slowing the battle.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::debug;

use armada_core::events::BattleEvent;

/// Buffered events per subscriber before drops begin.
const SUBSCRIBER_CAPACITY: usize = 256;

/// Fan-out of battle events to per-system subscriber channels.
#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<u64, Vec<Sender<Arc<BattleEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for one system's battles.
    pub fn subscribe(&mut self, system_id: u64) -> Receiver<Arc<BattleEvent>> {
        let (tx, rx) = bounded(SUBSCRIBER_CAPACITY);
        self.subscribers.entry(system_id).or_default().push(tx);
        rx
    }

    /// Publish an event to every subscriber of `system_id`.
    ///
    /// Events are shared behind an `Arc`, so a large tick delta is
    /// serialized per subscriber at most, never deep-cloned here.
    /// Disconnected subscribers are pruned on the way through.
    pub fn publish(&mut self, system_id: u64, event: BattleEvent) {
        let Some(subs) = self.subscribers.get_mut(&system_id) else {
            return;
        };

        let event = Arc::new(event);
        subs.retain(|tx| match tx.try_send(Arc::clone(&event)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("subscriber of system {system_id} is full, dropping event");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });

        if subs.is_empty() {
            self.subscribers.remove(&system_id);
        }
    }

    /// Number of live subscriber channels across all systems.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.values().map(Vec::len).sum()
    }
}
