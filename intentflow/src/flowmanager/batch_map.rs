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

//! Module containing the map of all batches

use super::batch::BatchStateCell;
use super::event::FlowEventDispatcher;
use super::{FlowBatchHandle, FlowBatchOperation, FlowBatchState};
use crate::id::FlowBatchId;
use crate::sync::lock;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct BatchEntry {
    operation: FlowBatchOperation,
    cell: Arc<BatchStateCell>,
}

/// Map of all batches and their states
#[derive(Debug)]
pub(crate) struct SharedFlowBatchMap {
    batches: Mutex<BTreeMap<FlowBatchId, BatchEntry>>,
    events: Arc<FlowEventDispatcher>,
}

impl SharedFlowBatchMap {
    pub(crate) fn new(events: Arc<FlowEventDispatcher>) -> Self {
        Self { batches: Mutex::new(BTreeMap::new()), events }
    }

    /// Insert a new batch in state `Submitted`
    pub(crate) fn put(&self, id: FlowBatchId, operation: FlowBatchOperation) -> FlowBatchHandle {
        let cell = Arc::new(BatchStateCell::new(FlowBatchState::Submitted));
        let mut batches = lock(&self.batches);
        batches.insert(id, BatchEntry { operation, cell: cell.clone() });
        self.events.enqueue_batch_change(id, FlowBatchState::Submitted, None);
        FlowBatchHandle::new(id, cell)
    }

    /// Change the state of the batch, if the transition is allowed.
    pub(crate) fn set_state(&self, id: FlowBatchId, state: FlowBatchState) -> bool {
        let batches = lock(&self.batches);
        let previous = match batches.get(&id).and_then(|b| b.cell.transition(state)) {
            Some(previous) => previous,
            None => return false,
        };
        self.events.enqueue_batch_change(id, state, Some(previous));
        true
    }

    pub(crate) fn get_state(&self, id: FlowBatchId) -> Option<FlowBatchState> {
        lock(&self.batches).get(&id).map(|b| b.cell.get())
    }

    pub(crate) fn get_operation(&self, id: FlowBatchId) -> Option<FlowBatchOperation> {
        lock(&self.batches).get(&id).map(|b| b.operation.clone())
    }

    /// Forget all batches that are completed or failed. Handles stay valid.
    pub(crate) fn purge_done(&self) -> usize {
        let mut batches = lock(&self.batches);
        let before = batches.len();
        batches.retain(|_, b| !b.cell.get().is_done());
        before - batches.len()
    }
}
