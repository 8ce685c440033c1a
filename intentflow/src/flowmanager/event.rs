// Intentflow: Intent Compilation and Flow Batch Execution
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! # Flow Events
//!
//! Listeners are notified strictly after the mutation that caused an event is committed. Every
//! mutation enqueues its event while it still holds the lock of the mutated map, and
//! [`FlowEventDispatcher::deliver`] hands the queued events to the listeners afterwards. All
//! flow state changes queued since the last delivery are batched into a single
//! [`FlowStatesChangedEvent`].

use super::FlowBatchState;
use crate::flow::FlowState;
use crate::id::{FlowBatchId, FlowId};
use crate::sync::{lock, read, write};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock, TryLockError};
use std::time::SystemTime;

/// State change of a single flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStateChange {
    /// The flow
    pub flow: FlowId,
    /// State after the change
    pub current: FlowState,
    /// State before the change, or `None` if the flow was just added
    pub previous: Option<FlowState>,
}

/// Event containing all flow state changes since the last notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStatesChangedEvent {
    /// Time of the delivery
    pub time: SystemTime,
    /// All changes, in the order they happened
    pub changes: Vec<FlowStateChange>,
}

/// Event of a batch changing its state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowBatchStateChangedEvent {
    /// Time of the change
    pub time: SystemTime,
    /// The batch
    pub batch: FlowBatchId,
    /// State after the change
    pub current: FlowBatchState,
    /// State before the change, or `None` if the batch was just submitted
    pub previous: Option<FlowBatchState>,
}

/// Listener of the flow manager
pub trait FlowManagerListener: Send + Sync {
    /// Called with all flow state changes since the last notification
    fn flow_states_changed(&self, event: &FlowStatesChangedEvent);

    /// Called whenever a batch changes its state
    fn flow_batch_state_changed(&self, _event: &FlowBatchStateChangedEvent) {}
}

/// Registration of a listener
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct ListenerId(pub u64);

#[derive(Debug, Default)]
struct Pending {
    flows: Vec<FlowStateChange>,
    batches: Vec<FlowBatchStateChangedEvent>,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.flows.is_empty() && self.batches.is_empty()
    }
}

/// Dispatcher of flow and batch events
#[derive(Default)]
pub(crate) struct FlowEventDispatcher {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn FlowManagerListener>)>>,
    next_listener: AtomicU64,
    pending: Mutex<Pending>,
    delivery: Mutex<()>,
}

impl FlowEventDispatcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_listener(&self, listener: Arc<dyn FlowManagerListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        write(&self.listeners).push((id, listener));
        id
    }

    pub(crate) fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = write(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(l, _)| *l != id);
        listeners.len() != before
    }

    pub(crate) fn num_listeners(&self) -> usize {
        read(&self.listeners).len()
    }

    pub(crate) fn enqueue_flow_change(&self, change: FlowStateChange) {
        lock(&self.pending).flows.push(change);
    }

    pub(crate) fn enqueue_batch_change(
        &self,
        batch: FlowBatchId,
        current: FlowBatchState,
        previous: Option<FlowBatchState>,
    ) {
        let time = SystemTime::now();
        let event = FlowBatchStateChangedEvent { time, batch, current, previous };
        lock(&self.pending).batches.push(event);
    }

    /// Deliver all queued events. If another thread (or a listener further up the stack) is
    /// currently delivering, this returns immediately, and the delivering thread picks up the
    /// new events before it finishes.
    pub(crate) fn deliver(&self) {
        loop {
            let guard = match self.delivery.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::WouldBlock) => return,
                Err(TryLockError::Poisoned(e)) => e.into_inner(),
            };
            while self.deliver_pending() {}
            drop(guard);
            if lock(&self.pending).is_empty() {
                return;
            }
        }
    }

    /// Deliver one round of events. Returns false if nothing was pending.
    fn deliver_pending(&self) -> bool {
        let pending = std::mem::take(&mut *lock(&self.pending));
        if pending.is_empty() {
            return false;
        }
        let listeners: Vec<Arc<dyn FlowManagerListener>> =
            read(&self.listeners).iter().map(|(_, l)| l.clone()).collect();

        if !pending.flows.is_empty() {
            let event = FlowStatesChangedEvent { time: SystemTime::now(), changes: pending.flows };
            for listener in listeners.iter() {
                listener.flow_states_changed(&event);
            }
        }
        for event in pending.batches.iter() {
            for listener in listeners.iter() {
                listener.flow_batch_state_changed(event);
            }
        }
        true
    }
}

impl fmt::Debug for FlowEventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FlowEventDispatcher").field("listeners", &self.num_listeners()).finish()
    }
}
