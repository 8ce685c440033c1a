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

//! Module containing the map of all flows and their states

use super::batch::{FlowBatchOperation, FlowBatchOperationEntry};
use super::conflict::find_conflict;
use super::event::{FlowEventDispatcher, FlowStateChange};
use super::{BatchRejection, ConflictDetectionPolicy};
use crate::flow::{Flow, FlowState};
use crate::id::FlowId;
use crate::sync::lock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct FlowEntry {
    flow: Flow,
    state: FlowState,
    /// Remove the flow as soon as its installation is finished
    remove_pending: bool,
}

/// Map of all flows known to the flow manager. Every mutation enqueues its event on the
/// dispatcher while holding the lock, and reading operations return copies.
#[derive(Debug)]
pub(crate) struct SharedFlowMap {
    flows: Mutex<BTreeMap<FlowId, FlowEntry>>,
    events: Arc<FlowEventDispatcher>,
}

impl SharedFlowMap {
    pub(crate) fn new(events: Arc<FlowEventDispatcher>) -> Self {
        Self { flows: Mutex::new(BTreeMap::new()), events }
    }

    /// Validate the batch against the current flows and the policy, and either accept all of its
    /// entries or none. Accepted additions are inserted as `Submitted`, and accepted removals move
    /// to `Withdrawing`.
    pub(crate) fn accept_batch(
        &self,
        operation: &FlowBatchOperation,
        policy: ConflictDetectionPolicy,
    ) -> Result<(), BatchRejection> {
        if operation.is_empty() {
            return Err(BatchRejection::Empty);
        }
        let mut flows = lock(&self.flows);

        let mut added: Vec<&Flow> = Vec::new();
        let mut removed: BTreeSet<FlowId> = BTreeSet::new();
        for entry in operation.entries() {
            match entry {
                FlowBatchOperationEntry::Add(flow) => {
                    let id = flow.id();
                    if flows.contains_key(&id) || added.iter().any(|f| f.id() == id) {
                        return Err(BatchRejection::DuplicateFlow(id));
                    }
                    let active = flows
                        .values()
                        .filter(|e| e.state.is_active() && !removed.contains(&e.flow.id()))
                        .map(|e| &e.flow)
                        .chain(added.iter().copied());
                    if let Some(existing) = find_conflict(policy, flow, active) {
                        return Err(BatchRejection::Conflict { flow: id, existing, policy });
                    }
                    added.push(flow);
                }
                FlowBatchOperationEntry::Remove(id) => {
                    let state = flows
                        .get(id)
                        .map(|e| e.state)
                        .ok_or(BatchRejection::UnknownFlow(*id))?;
                    let removable = matches!(state, FlowState::Installed | FlowState::Failed);
                    if !removable || removed.contains(id) {
                        return Err(BatchRejection::InvalidState { flow: *id, state });
                    }
                    removed.insert(*id);
                }
            }
        }

        for flow in added {
            flows.insert(
                flow.id(),
                FlowEntry {
                    flow: flow.clone(),
                    state: FlowState::Submitted,
                    remove_pending: false,
                },
            );
            self.events.enqueue_flow_change(FlowStateChange {
                flow: flow.id(),
                current: FlowState::Submitted,
                previous: None,
            });
        }
        for id in removed {
            if let Some(entry) = flows.get_mut(&id) {
                let previous = std::mem::replace(&mut entry.state, FlowState::Withdrawing);
                self.events.enqueue_flow_change(FlowStateChange {
                    flow: id,
                    current: FlowState::Withdrawing,
                    previous: Some(previous),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn get(&self, id: FlowId) -> Option<Flow> {
        lock(&self.flows).get(&id).map(|e| e.flow.clone())
    }

    pub(crate) fn get_state(&self, id: FlowId) -> Option<FlowState> {
        lock(&self.flows).get(&id).map(|e| e.state)
    }

    /// Point in time copy of all flows
    pub(crate) fn get_all(&self) -> Vec<Flow> {
        lock(&self.flows).values().map(|e| e.flow.clone()).collect()
    }

    /// Point in time copy of all flow states
    pub(crate) fn get_all_states(&self) -> Vec<(FlowId, FlowState)> {
        lock(&self.flows).iter().map(|(id, e)| (*id, e.state)).collect()
    }

    /// Change the state of the flow if the transition is allowed and the current state equals
    /// `expected` (if given). Returns true if the state was changed.
    pub(crate) fn set_state(
        &self,
        id: FlowId,
        state: FlowState,
        expected: Option<FlowState>,
    ) -> bool {
        let mut flows = lock(&self.flows);
        let entry = match flows.get_mut(&id) {
            Some(entry) => entry,
            None => return false,
        };
        if expected.map_or(false, |e| e != entry.state) || !entry.state.can_transition_to(state) {
            return false;
        }
        let previous = std::mem::replace(&mut entry.state, state);
        self.events.enqueue_flow_change(FlowStateChange {
            flow: id,
            current: state,
            previous: Some(previous),
        });
        true
    }

    /// Mark a flow that is still being installed, such that it is removed once its installation
    /// is finished. Returns false if the flow is unknown or not in flight.
    pub(crate) fn mark_for_removal(&self, id: FlowId) -> bool {
        match lock(&self.flows).get_mut(&id) {
            Some(entry) if matches!(entry.state, FlowState::Submitted | FlowState::Compiled) => {
                entry.remove_pending = true;
                true
            }
            _ => false,
        }
    }

    /// Clear the removal marks of the given flows, and return the marked ones with their state.
    pub(crate) fn take_marked<I>(&self, ids: I) -> Vec<(FlowId, FlowState)>
    where
        I: IntoIterator<Item = FlowId>,
    {
        let mut flows = lock(&self.flows);
        ids.into_iter()
            .filter_map(|id| match flows.get_mut(&id) {
                Some(entry) if entry.remove_pending => {
                    entry.remove_pending = false;
                    Some((id, entry.state))
                }
                _ => None,
            })
            .collect()
    }

    pub(crate) fn remove(&self, id: FlowId) -> Option<Flow> {
        lock(&self.flows).remove(&id).map(|e| e.flow)
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.flows).len()
    }
}
