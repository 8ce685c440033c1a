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

//! # Flow Manager
//!
//! Accepts batches of flow additions and removals, checks them against the conflict detection
//! policy, and executes them on the match-action service. Callers only get a read-only
//! [`FlowBatchHandle`]; the outcome of every flow is observable through the listeners or by
//! querying its state.
//!
//! A call that returns `None` (or `false`) means that the batch was not accepted at all. An
//! accepted batch may still fail later on, which is reported through the batch state.

mod batch;
mod batch_map;
mod conflict;
mod event;
mod executor;
mod flow_map;

pub use batch::{FlowBatchHandle, FlowBatchOperation, FlowBatchOperationEntry, FlowBatchState};
pub use conflict::{find_conflict, ingress_overlap, shares_links, ConflictDetectionPolicy};
pub use event::{
    FlowBatchStateChangedEvent, FlowManagerListener, FlowStateChange, FlowStatesChangedEvent,
    ListenerId,
};

use crate::config::{ControllerConfig, ExecutionMode};
use crate::flow::{Flow, FlowState};
use crate::id::{FlowBatchId, FlowId, IdError, IdGenerators};
use crate::matchaction::MatchActionService;
use crate::sync::{lock, read, write};
use batch_map::SharedFlowBatchMap;
use event::FlowEventDispatcher;
use flow_map::SharedFlowMap;
use log::*;
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::thread;
use thiserror::Error;

/// Reason why a batch was not accepted
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum BatchRejection {
    /// The batch has no entries
    #[error("The batch is empty")]
    Empty,
    /// A flow with the same id already exists
    #[error("Flow {0} already exists")]
    DuplicateFlow(FlowId),
    /// The flow to remove does not exist
    #[error("Flow {0} does not exist")]
    UnknownFlow(FlowId),
    /// The flow to remove is neither installed nor failed
    #[error("Flow {flow} cannot be removed in state {state}")]
    InvalidState {
        /// The flow
        flow: FlowId,
        /// Its current state
        state: FlowState,
    },
    /// The flow overlaps with an existing one
    #[error("Flow {flow} conflicts with {existing} under the {policy} policy")]
    Conflict {
        /// The new flow
        flow: FlowId,
        /// The existing flow
        existing: FlowId,
        /// The policy in use
        policy: ConflictDetectionPolicy,
    },
    /// No batch id could be allocated
    #[error("Id Error: {0}")]
    IdError(#[from] IdError),
}

/// Interface of the flow manager
pub trait FlowManagerService: Send + Sync {
    /// Install a single flow. Returns `None` if the flow was not accepted.
    fn add_flow(&self, flow: Flow) -> Option<FlowBatchHandle> {
        let mut operation = FlowBatchOperation::new();
        operation.add_add_operation(flow);
        self.submit_batch(operation)
    }

    /// Remove a single flow. Returns `None` if the removal was not accepted.
    fn remove_flow(&self, id: FlowId) -> Option<FlowBatchHandle> {
        let mut operation = FlowBatchOperation::new();
        operation.add_remove_operation(id);
        self.submit_batch(operation)
    }

    /// Mark a flow that is still being installed for removal. The flow is removed as soon as its
    /// installation is finished, whatever its outcome. Returns false if the flow is unknown or
    /// not in flight, in which case it can be removed with [`remove_flow`](Self::remove_flow).
    fn mark_for_removal(&self, id: FlowId) -> bool;

    /// Get a copy of the flow
    fn get_flow(&self, id: FlowId) -> Option<Flow>;

    /// Get the current state of the flow
    fn get_flow_state(&self, id: FlowId) -> Option<FlowState>;

    /// Point in time copy of all flows
    fn get_flows(&self) -> Vec<Flow>;

    /// Submit a batch. Returns `None` if the batch was not accepted.
    fn submit_batch(&self, operation: FlowBatchOperation) -> Option<FlowBatchHandle>;

    /// Submit a batch. Returns false if the batch was not accepted.
    fn execute_batch(&self, operation: FlowBatchOperation) -> bool {
        self.submit_batch(operation).is_some()
    }

    /// Change the conflict detection policy for all batches submitted afterwards
    fn set_conflict_detection_policy(&self, policy: ConflictDetectionPolicy);

    /// Current conflict detection policy
    fn get_conflict_detection_policy(&self) -> ConflictDetectionPolicy;

    /// Register a listener. The caller is responsible for removing it again.
    fn add_listener(&self, listener: Arc<dyn FlowManagerListener>) -> ListenerId;

    /// Unregister a listener. Returns false if it was not registered.
    fn remove_listener(&self, id: ListenerId) -> bool;
}

pub(crate) struct FlowManagerInner {
    flows: SharedFlowMap,
    batches: SharedFlowBatchMap,
    events: Arc<FlowEventDispatcher>,
    service: Arc<dyn MatchActionService>,
    ids: IdGenerators,
    policy: RwLock<ConflictDetectionPolicy>,
    execution: ExecutionMode,
    running: Mutex<usize>,
    idle: Condvar,
}

impl std::fmt::Debug for FlowManagerInner {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("FlowManager")
            .field("flows", &self.flows)
            .field("batches", &self.batches)
            .field("policy", &*read(&self.policy))
            .field("execution", &self.execution)
            .finish()
    }
}

/// # Flow Manager
/// Implementation of the [`FlowManagerService`]. Cloning the manager yields another handle to the
/// same state.
#[derive(Debug, Clone)]
pub struct FlowManager {
    inner: Arc<FlowManagerInner>,
}

impl FlowManager {
    /// Create a new flow manager using the policy and the execution mode of the configuration.
    pub fn new(
        service: Arc<dyn MatchActionService>,
        ids: IdGenerators,
        config: &ControllerConfig,
    ) -> Self {
        let events = Arc::new(FlowEventDispatcher::new());
        Self {
            inner: Arc::new(FlowManagerInner {
                flows: SharedFlowMap::new(events.clone()),
                batches: SharedFlowBatchMap::new(events.clone()),
                events,
                service,
                ids,
                policy: RwLock::new(config.conflict_detection_policy),
                execution: config.execution,
                running: Mutex::new(0),
                idle: Condvar::new(),
            }),
        }
    }

    /// Submit a batch, returning the reason if it is not accepted.
    pub fn try_submit_batch(
        &self,
        operation: FlowBatchOperation,
    ) -> Result<FlowBatchHandle, BatchRejection> {
        let inner = &self.inner;
        let policy = *read(&inner.policy);
        let id = inner.ids.batch_ids.next_id()?;
        if let Err(e) = inner.flows.accept_batch(&operation, policy) {
            warn!("Rejected batch: {}", e);
            return Err(e);
        }
        let handle = inner.batches.put(id, operation.clone());
        inner.events.deliver();
        debug!("Accepted {} with {} entries", id, operation.len());

        match inner.execution {
            ExecutionMode::Inline => executor::execute_batch(inner, id, &operation),
            ExecutionMode::Background => self.spawn_execution(id, operation),
        }
        Ok(handle)
    }

    fn spawn_execution(&self, id: FlowBatchId, operation: FlowBatchOperation) {
        *lock(&self.inner.running) += 1;
        let inner = self.inner.clone();
        let spawned = thread::Builder::new()
            .name(format!("flow-batch-{}", id.0))
            .spawn(move || {
                executor::execute_batch(&inner, id, &operation);
                inner.finish_execution();
            });
        if let Err(e) = spawned {
            // the closure was dropped without running
            error!("Cannot spawn the executor thread of {}: {}", id, e);
            self.inner.batches.set_state(id, FlowBatchState::Failed);
            self.inner.events.deliver();
            self.inner.finish_execution();
        }
    }

    /// Block until no batch is executing in the background.
    pub fn wait_idle(&self) {
        let running = lock(&self.inner.running);
        let _running = self
            .inner
            .idle
            .wait_while(running, |n| *n > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// State of the batch, if it is still known
    pub fn get_batch_state(&self, id: FlowBatchId) -> Option<FlowBatchState> {
        self.inner.batches.get_state(id)
    }

    /// The operation of the batch, if it is still known
    pub fn get_batch_operation(&self, id: FlowBatchId) -> Option<FlowBatchOperation> {
        self.inner.batches.get_operation(id)
    }

    /// Forget all completed and failed batches, returning how many were removed.
    pub fn purge_batches(&self) -> usize {
        self.inner.batches.purge_done()
    }

    /// Point in time copy of all flow states
    pub fn get_flow_states(&self) -> Vec<(FlowId, FlowState)> {
        self.inner.flows.get_all_states()
    }

    /// Number of flows known to the manager
    pub fn num_flows(&self) -> usize {
        self.inner.flows.len()
    }

    /// Number of registered listeners
    pub fn num_listeners(&self) -> usize {
        self.inner.events.num_listeners()
    }
}

impl FlowManagerInner {
    fn finish_execution(&self) {
        let mut running = lock(&self.running);
        *running = running.saturating_sub(1);
        if *running == 0 {
            self.idle.notify_all();
        }
    }
}

impl FlowManagerService for FlowManager {
    fn mark_for_removal(&self, id: FlowId) -> bool {
        let marked = self.inner.flows.mark_for_removal(id);
        if marked {
            debug!("{} will be removed once it is installed", id);
        }
        marked
    }

    fn get_flow(&self, id: FlowId) -> Option<Flow> {
        self.inner.flows.get(id)
    }

    fn get_flow_state(&self, id: FlowId) -> Option<FlowState> {
        self.inner.flows.get_state(id)
    }

    fn get_flows(&self) -> Vec<Flow> {
        self.inner.flows.get_all()
    }

    fn submit_batch(&self, operation: FlowBatchOperation) -> Option<FlowBatchHandle> {
        self.try_submit_batch(operation).ok()
    }

    fn set_conflict_detection_policy(&self, policy: ConflictDetectionPolicy) {
        info!("Conflict detection policy set to {}", policy);
        *write(&self.inner.policy) = policy;
    }

    fn get_conflict_detection_policy(&self) -> ConflictDetectionPolicy {
        *read(&self.inner.policy)
    }

    fn add_listener(&self, listener: Arc<dyn FlowManagerListener>) -> ListenerId {
        self.inner.events.add_listener(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.events.remove_listener(id)
    }
}
