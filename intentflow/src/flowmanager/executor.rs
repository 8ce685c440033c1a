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

//! # Batch Executor
//!
//! Executes an accepted batch. Every entry is compiled into its own phases, and phase `k` of all
//! flows is merged into a single match-action batch. The merged phases are executed strictly in
//! order: phase `k + 1` is only dispatched after the service confirmed phase `k`. Flows of the
//! same batch are independent of each other, so merging them does not violate any ordering.
//!
//! If an entry of a flow fails, that flow is marked as failed, none of its later phases are
//! dispatched, and the entries it already installed are removed again. The other flows of the
//! batch proceed.
//!
//! Flows that were marked for removal while they were being installed are removed right after
//! the batch is finished, as a batch of its own.

use super::batch::{FlowBatchOperation, FlowBatchOperationEntry};
use super::{FlowBatchState, FlowManagerInner};
use crate::flow::FlowState;
use crate::id::{FlowBatchId, FlowId, MatchActionId};
use crate::matchaction::{
    MatchActionError, MatchActionOperations, MatchActionOperationsState, Operator,
};
use crate::sync::read;
use log::*;
use std::collections::HashMap;

/// Compiled flow, with the progress of its phases
#[derive(Debug)]
struct FlowPlan {
    flow: FlowId,
    operator: Operator,
    phases: Vec<MatchActionOperations>,
    executed: usize,
    failed: bool,
}

pub(crate) fn execute_batch(
    inner: &FlowManagerInner,
    batch: FlowBatchId,
    operation: &FlowBatchOperation,
) {
    inner.batches.set_state(batch, FlowBatchState::Executing);
    inner.events.deliver();
    info!("Executing {} with {} entries", batch, operation.len());

    let mut any_failed = false;
    let mut plans = compile_entries(inner, operation, &mut any_failed);
    inner.events.deliver();

    let num_phases = plans.iter().map(|p| p.phases.len()).max().unwrap_or(0);
    let mut previous = None;
    for k in 0..num_phases {
        let mut merged = match inner.ids.operations_ids.next_id() {
            Ok(id) => MatchActionOperations::new(id),
            Err(e) => {
                error!("Cannot allocate an id for phase {} of {}: {}", k, batch, e);
                plans.iter_mut().for_each(|p| p.failed = true);
                break;
            }
        };
        if let Some(prev) = previous {
            merged.add_dependency(prev);
        }

        let mut owner: HashMap<MatchActionId, usize> = HashMap::new();
        for (i, plan) in plans.iter_mut().enumerate().filter(|(_, p)| !p.failed) {
            if let Some(phase) = plan.phases.get(k) {
                for entry in phase.entries() {
                    owner.insert(entry.target.id(), i);
                    merged.add_entry(entry.operator, entry.target.clone());
                }
                plan.executed = k + 1;
            }
        }
        if merged.is_empty() {
            continue;
        }

        merged.set_state(MatchActionOperationsState::Pending);
        debug!("Dispatching phase {} of {} ({} entries)", k, batch, merged.len());
        let failed_plans: Vec<usize> = match inner.service.execute_operations(&merged) {
            Ok(()) => Vec::new(),
            Err(MatchActionError::EntriesFailed { failed, .. }) => {
                failed.iter().filter_map(|id| owner.get(id).copied()).collect()
            }
            Err(e) => {
                warn!("Phase {} of {} was rejected: {}", k, batch, e);
                owner.values().copied().collect()
            }
        };
        merged.set_state(if failed_plans.is_empty() {
            MatchActionOperationsState::Installed
        } else {
            MatchActionOperationsState::Failed
        });

        for i in failed_plans {
            let plan = &mut plans[i];
            if !plan.failed {
                warn!("{} failed in phase {} of {}", plan.flow, k, batch);
                plan.failed = true;
                inner.flows.set_state(plan.flow, FlowState::Failed, None);
            }
        }
        inner.events.deliver();
        previous = Some(merged.id());
    }

    for plan in plans.iter() {
        if plan.failed {
            any_failed = true;
            if plan.operator == Operator::Add {
                roll_back(inner, plan);
            }
            inner.flows.set_state(plan.flow, FlowState::Failed, None);
        } else {
            match plan.operator {
                Operator::Add => {
                    let expected = Some(FlowState::Compiled);
                    inner.flows.set_state(plan.flow, FlowState::Installed, expected);
                }
                Operator::Remove => {
                    let expected = Some(FlowState::Withdrawing);
                    inner.flows.set_state(plan.flow, FlowState::Withdrawn, expected);
                    inner.flows.remove(plan.flow);
                }
            }
        }
    }

    let added = operation.entries().iter().filter(|e| e.operator() == Operator::Add);
    let marked = inner.flows.take_marked(added.map(|e| e.flow_id()));

    let result = if any_failed { FlowBatchState::Failed } else { FlowBatchState::Completed };
    inner.batches.set_state(batch, result);
    inner.events.deliver();
    info!("{} is {}", batch, result);

    if !marked.is_empty() {
        remove_marked(inner, marked);
    }
}

/// Remove the flows that were marked for removal during their installation.
fn remove_marked(inner: &FlowManagerInner, marked: Vec<(FlowId, FlowState)>) {
    let mut operation = FlowBatchOperation::new();
    for (id, state) in marked {
        debug!("{} ({}) was marked for removal", id, state);
        operation.add_remove_operation(id);
    }
    let batch = match inner.ids.batch_ids.next_id() {
        Ok(id) => id,
        Err(e) => {
            error!("Cannot allocate an id to remove the marked flows: {}", e);
            return;
        }
    };
    if let Err(e) = inner.flows.accept_batch(&operation, *read(&inner.policy)) {
        warn!("Cannot remove the marked flows: {}", e);
        return;
    }
    inner.batches.put(batch, operation.clone());
    inner.events.deliver();
    execute_batch(inner, batch, &operation);
}

/// Compile every entry of the batch. Entries that fail to compile mark their flow as failed.
fn compile_entries(
    inner: &FlowManagerInner,
    operation: &FlowBatchOperation,
    any_failed: &mut bool,
) -> Vec<FlowPlan> {
    let mut plans = Vec::with_capacity(operation.len());
    for entry in operation.entries() {
        let id = entry.flow_id();
        let operator = entry.operator();
        let flow = match entry {
            FlowBatchOperationEntry::Add(flow) => Some(flow.clone()),
            FlowBatchOperationEntry::Remove(id) => inner.flows.get(*id),
        };
        let flow = match flow {
            Some(flow) => flow,
            None => {
                warn!("{} disappeared before it could be removed", id);
                *any_failed = true;
                continue;
            }
        };
        match flow.compile(operator, &inner.ids) {
            Ok(phases) => {
                trace!("Compiled {} for {} into {} phases", id, operator, phases.len());
                if operator == Operator::Add {
                    inner.flows.set_state(id, FlowState::Compiled, Some(FlowState::Submitted));
                }
                plans.push(FlowPlan { flow: id, operator, phases, executed: 0, failed: false });
            }
            Err(e) => {
                warn!("Cannot compile {} for {}: {}", id, operator, e);
                inner.flows.set_state(id, FlowState::Failed, None);
                *any_failed = true;
            }
        }
    }
    plans
}

/// Remove all entries of the already dispatched phases of a failed flow, last phase first.
fn roll_back(inner: &FlowManagerInner, plan: &FlowPlan) {
    for phase in plan.phases[..plan.executed].iter().rev() {
        let mut undo = match inner.ids.operations_ids.next_id() {
            Ok(id) => MatchActionOperations::new(id),
            Err(e) => {
                error!("Cannot roll back {}: {}", plan.flow, e);
                return;
            }
        };
        for entry in phase.entries() {
            undo.add_entry(Operator::Remove, entry.target.clone());
        }
        if let Err(e) = inner.service.execute_operations(&undo) {
            warn!("Rollback of {} incomplete: {}", plan.flow, e);
        }
    }
    debug!("Rolled back {} phases of {}", plan.executed, plan.flow);
}
