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

//! Module containing the flow batch operation and its handle

use crate::flow::Flow;
use crate::id::{FlowBatchId, FlowId};
use crate::matchaction::Operator;
use crate::sync::lock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Entry of a flow batch operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowBatchOperationEntry {
    /// Install the flow
    Add(Flow),
    /// Remove the flow with the given id
    Remove(FlowId),
}

impl FlowBatchOperationEntry {
    /// Operator of the entry
    pub fn operator(&self) -> Operator {
        match self {
            Self::Add(_) => Operator::Add,
            Self::Remove(_) => Operator::Remove,
        }
    }

    /// Id of the targeted flow
    pub fn flow_id(&self) -> FlowId {
        match self {
            Self::Add(flow) => flow.id(),
            Self::Remove(id) => *id,
        }
    }
}

/// # Flow Batch Operation
/// Ordered list of flow additions and removals, submitted and tracked together.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlowBatchOperation {
    entries: Vec<FlowBatchOperationEntry>,
}

impl FlowBatchOperation {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the installation of a flow
    pub fn add_add_operation(&mut self, flow: Flow) -> &mut Self {
        self.entries.push(FlowBatchOperationEntry::Add(flow));
        self
    }

    /// Append the removal of a flow
    pub fn add_remove_operation(&mut self, id: FlowId) -> &mut Self {
        self.entries.push(FlowBatchOperationEntry::Remove(id));
        self
    }

    /// All entries, in order
    pub fn entries(&self) -> &[FlowBatchOperationEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the batch has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// State of a flow batch operation
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum FlowBatchState {
    /// Accepted, not yet executing
    Submitted,
    /// Phases are being executed
    Executing,
    /// Every entry succeeded
    Completed,
    /// At least one entry failed
    Failed,
}

impl FlowBatchState {
    /// Returns true if the batch is either completed or failed
    pub fn is_done(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the transition from `self` to `next` is allowed
    pub fn can_transition_to(self, next: FlowBatchState) -> bool {
        use FlowBatchState::*;
        matches!(
            (self, next),
            (Submitted, Executing)
                | (Submitted, Failed)
                | (Executing, Completed)
                | (Executing, Failed)
        )
    }
}

impl fmt::Display for FlowBatchState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Submitted => "SUBMITTED",
            Self::Executing => "EXECUTING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// State of a batch, shared between the batch map and all handles
#[derive(Debug)]
pub(crate) struct BatchStateCell {
    state: Mutex<FlowBatchState>,
    changed: Condvar,
}

impl BatchStateCell {
    pub(crate) fn new(state: FlowBatchState) -> Self {
        Self { state: Mutex::new(state), changed: Condvar::new() }
    }

    pub(crate) fn get(&self) -> FlowBatchState {
        *lock(&self.state)
    }

    /// Apply the transition if it is allowed, returning the previous state.
    pub(crate) fn transition(&self, next: FlowBatchState) -> Option<FlowBatchState> {
        let mut state = lock(&self.state);
        if !state.can_transition_to(next) {
            return None;
        }
        let previous = std::mem::replace(&mut *state, next);
        self.changed.notify_all();
        Some(previous)
    }
}

/// # Flow Batch Handle
/// Read-only view of a submitted batch.
#[derive(Debug, Clone)]
pub struct FlowBatchHandle {
    id: FlowBatchId,
    cell: Arc<BatchStateCell>,
}

impl FlowBatchHandle {
    pub(crate) fn new(id: FlowBatchId, cell: Arc<BatchStateCell>) -> Self {
        Self { id, cell }
    }

    /// Id of the batch
    pub fn id(&self) -> FlowBatchId {
        self.id
    }

    /// Current state of the batch
    pub fn state(&self) -> FlowBatchState {
        self.cell.get()
    }

    /// Block until the batch is completed or failed, or until the timeout passes. Returns the
    /// state at that time. `None` waits forever.
    pub fn wait(&self, timeout: Option<Duration>) -> FlowBatchState {
        let guard = lock(&self.cell.state);
        match timeout {
            Some(t) => {
                let (state, _) = self
                    .cell
                    .changed
                    .wait_timeout_while(guard, t, |s| !s.is_done())
                    .unwrap_or_else(PoisonError::into_inner);
                *state
            }
            None => {
                let state = self
                    .cell
                    .changed
                    .wait_while(guard, |s| !s.is_done())
                    .unwrap_or_else(PoisonError::into_inner);
                *state
            }
        }
    }
}
