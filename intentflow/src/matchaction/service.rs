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

//! # Match-Action Execution Service
//!
//! The service installing match-action batches on the switches. Execution of a single batch is
//! synchronous: [`MatchActionService::execute_operations`] returns only once every entry is
//! either confirmed or failed. Callers rely on this to build the phase barrier.

use super::{Match, MatchAction, MatchActionOperations, Operator};
use crate::id::{MatchActionId, MatchActionOperationsId};
use crate::sync::lock;
use crate::topology::SwitchPort;
use log::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use thiserror::Error;

/// Error reported by the match-action layer
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum MatchActionError {
    /// Some entries of the batch could not be executed. All other entries were executed.
    #[error("{} entries of {operations} failed", failed.len())]
    EntriesFailed {
        /// Batch that was executed
        operations: MatchActionOperationsId,
        /// Entries that failed
        failed: Vec<MatchActionId>,
    },
    /// The service did not execute the batch at all
    #[error("Match-action service unavailable: {0}")]
    Unavailable(String),
    /// Invalid length of an IPv4 prefix
    #[error("Invalid prefix length: {0}")]
    InvalidPrefixLength(u8),
}

/// Service executing batches of match-action operations
pub trait MatchActionService: Send + Sync {
    /// Execute all entries of the batch, and block until they are confirmed. If some entries
    /// fail, [`MatchActionError::EntriesFailed`] lists them, and all remaining entries are
    /// executed nevertheless.
    fn execute_operations(&self, ops: &MatchActionOperations) -> Result<(), MatchActionError>;
}

/// Record of a batch executed by the [`InMemoryMatchActionService`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedOperations {
    /// Id of the batch
    pub id: MatchActionOperationsId,
    /// Operator, entry and port of every entry, in execution order
    pub entries: Vec<(Operator, MatchActionId, SwitchPort)>,
    /// Entries that failed
    pub failed: Vec<MatchActionId>,
}

#[derive(Debug, Default)]
struct ServiceState {
    rules: BTreeMap<(SwitchPort, Match), MatchAction>,
    log: Vec<ExecutedOperations>,
    failing: BTreeSet<SwitchPort>,
    unavailable: bool,
}

/// # In-Memory Match-Action Service
/// Keeps the installed rules of all switches in memory, keyed by the port and the match of each
/// rule. Adding a rule for an existing key replaces it, and removing a missing rule succeeds.
/// Failures can be injected per switch port.
#[derive(Debug, Default)]
pub struct InMemoryMatchActionService {
    state: Mutex<ServiceState>,
}

impl InMemoryMatchActionService {
    /// Create an empty service
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry touching this switch port will fail from now on.
    pub fn fail_on(&self, switch_port: SwitchPort) {
        lock(&self.state).failing.insert(switch_port);
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        lock(&self.state).failing.clear();
    }

    /// Make the service reject whole batches
    pub fn set_available(&self, available: bool) {
        lock(&self.state).unavailable = !available;
    }

    /// All installed rules, sorted by port and match
    pub fn rules(&self) -> Vec<MatchAction> {
        lock(&self.state).rules.values().cloned().collect()
    }

    /// Installed rule at the port with the given match
    pub fn get_rule(&self, switch_port: SwitchPort, matching: &Match) -> Option<MatchAction> {
        lock(&self.state).rules.get(&(switch_port, *matching)).cloned()
    }

    /// Number of installed rules
    pub fn num_rules(&self) -> usize {
        lock(&self.state).rules.len()
    }

    /// All executed batches, in execution order
    pub fn log(&self) -> Vec<ExecutedOperations> {
        lock(&self.state).log.clone()
    }

    /// Forget all executed batches
    pub fn clear_log(&self) {
        lock(&self.state).log.clear();
    }
}

impl MatchActionService for InMemoryMatchActionService {
    fn execute_operations(&self, ops: &MatchActionOperations) -> Result<(), MatchActionError> {
        let mut state = lock(&self.state);
        if state.unavailable {
            return Err(MatchActionError::Unavailable("service disabled".to_string()));
        }
        trace!("Executing {} with {} entries", ops.id(), ops.len());

        let mut record =
            ExecutedOperations { id: ops.id(), entries: Vec::new(), failed: Vec::new() };
        for entry in ops.entries() {
            let target = &entry.target;
            record.entries.push((entry.operator, target.id(), target.switch_port()));
            if state.failing.contains(&target.switch_port()) {
                record.failed.push(target.id());
                continue;
            }
            let key = (target.switch_port(), *target.matching());
            match entry.operator {
                Operator::Add => {
                    state.rules.insert(key, target.clone());
                }
                Operator::Remove => {
                    state.rules.remove(&key);
                }
            }
        }

        let failed = record.failed.clone();
        state.log.push(record);
        if failed.is_empty() {
            Ok(())
        } else {
            debug!("{} entries of {} failed", failed.len(), ops.id());
            Err(MatchActionError::EntriesFailed { operations: ops.id(), failed })
        }
    }
}
