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

//! Module containing match-action entries and operation batches

use super::{Action, Match};
use crate::id::{MatchActionId, MatchActionOperationsId};
use crate::topology::SwitchPort;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Operator of a batch entry
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Operator {
    /// Add the target
    Add,
    /// Remove the target
    Remove,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Add => write!(f, "ADD"),
            Self::Remove => write!(f, "REMOVE"),
        }
    }
}

/// # Match Action
/// A single switch rule: traffic arriving at `switch_port` and matching `matching` is processed by
/// `actions`, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchAction {
    id: MatchActionId,
    switch_port: SwitchPort,
    matching: Match,
    actions: Vec<Action>,
}

impl MatchAction {
    /// Create a new match-action entry
    pub fn new(
        id: MatchActionId,
        switch_port: SwitchPort,
        matching: Match,
        actions: Vec<Action>,
    ) -> Self {
        Self { id, switch_port, matching, actions }
    }

    /// Identifier of the entry
    pub fn id(&self) -> MatchActionId {
        self.id
    }

    /// Port at which the rule is installed
    pub fn switch_port(&self) -> SwitchPort {
        self.switch_port
    }

    /// Match condition
    pub fn matching(&self) -> &Match {
        &self.matching
    }

    /// Ordered list of actions
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

/// Entry in a batch of match-action operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchActionOperationEntry {
    /// Whether to add or to remove the target
    pub operator: Operator,
    /// The match-action entry
    pub target: MatchAction,
}

/// State of a batch of match-action operations
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum MatchActionOperationsState {
    /// Created, not yet scheduled
    Init,
    /// All dependencies are satisfied
    Resolved,
    /// Submitted to the execution service
    Pending,
    /// Confirmed by the execution service
    Installed,
    /// At least one entry failed
    Failed,
}

/// # Match Action Operations
/// An ordered batch of match-action operations, executed together. A batch may depend on other
/// batches, which must be confirmed before this one is dispatched. Compiled flows produce a
/// sequence of batches (phases), where each phase depends on its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchActionOperations {
    id: MatchActionOperationsId,
    state: MatchActionOperationsState,
    entries: Vec<MatchActionOperationEntry>,
    dependencies: BTreeSet<MatchActionOperationsId>,
}

impl MatchActionOperations {
    /// Create an empty batch
    pub fn new(id: MatchActionOperationsId) -> Self {
        Self {
            id,
            state: MatchActionOperationsState::Init,
            entries: Vec::new(),
            dependencies: BTreeSet::new(),
        }
    }

    /// Identifier of the batch
    pub fn id(&self) -> MatchActionOperationsId {
        self.id
    }

    /// Current state
    pub fn state(&self) -> MatchActionOperationsState {
        self.state
    }

    /// Update the state
    pub fn set_state(&mut self, state: MatchActionOperationsState) {
        self.state = state;
    }

    /// Append an entry
    pub fn add_entry(&mut self, operator: Operator, target: MatchAction) {
        self.entries.push(MatchActionOperationEntry { operator, target });
    }

    /// All entries in order
    pub fn entries(&self) -> &[MatchActionOperationEntry] {
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

    /// Declare that this batch may only run after `other` is confirmed.
    pub fn add_dependency(&mut self, other: MatchActionOperationsId) {
        self.dependencies.insert(other);
    }

    /// All batches this one depends on
    pub fn dependencies(&self) -> &BTreeSet<MatchActionOperationsId> {
        &self.dependencies
    }
}
