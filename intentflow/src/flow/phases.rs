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

//! # Ordered Phase Builder
//!
//! Builds the sequence of match-action phases of a compiled flow. Phase `N + 1` depends on phase
//! `N`, which is recorded in its dependency set: the executor must not dispatch any entry of phase
//! `N + 1` before every entry of phase `N` is confirmed. Entries are never moved between phases.

use super::FlowError;
use crate::id::IdGenerators;
use crate::matchaction::{Action, Match, MatchAction, MatchActionOperations, Operator};
use crate::topology::SwitchPort;

/// Builder for the ordered phases of a flow
pub struct PhaseBuilder<'a> {
    operator: Operator,
    ids: &'a IdGenerators,
    phases: Vec<MatchActionOperations>,
}

impl<'a> PhaseBuilder<'a> {
    /// Create a new builder. All entries use the same operator.
    pub fn new(operator: Operator, ids: &'a IdGenerators) -> Self {
        Self { operator, ids, phases: Vec::new() }
    }

    /// Start a new phase, depending on the current one. If the current phase has no entries, it
    /// is reused.
    pub fn next_phase(&mut self) -> Result<(), FlowError> {
        if self.phases.last().map_or(false, |p| p.is_empty()) {
            return Ok(());
        }
        let mut phase = MatchActionOperations::new(self.ids.operations_ids.next_id()?);
        if let Some(prev) = self.phases.last() {
            phase.add_dependency(prev.id());
        }
        self.phases.push(phase);
        Ok(())
    }

    /// Add an entry to the current phase. Starts the first phase if necessary.
    pub fn entry(
        &mut self,
        switch_port: SwitchPort,
        matching: Match,
        actions: Vec<Action>,
    ) -> Result<(), FlowError> {
        if self.phases.is_empty() {
            self.next_phase()?;
        }
        let id = self.ids.match_action_ids.next_id()?;
        let operator = self.operator;
        if let Some(phase) = self.phases.last_mut() {
            phase.add_entry(operator, MatchAction::new(id, switch_port, matching, actions));
        }
        Ok(())
    }

    /// Number of phases started so far
    pub fn num_phases(&self) -> usize {
        self.phases.len()
    }

    /// Finish the phases. A trailing empty phase is dropped.
    pub fn build(mut self) -> Vec<MatchActionOperations> {
        if self.phases.last().map_or(false, |p| p.is_empty()) {
            self.phases.pop();
        }
        self.phases
    }
}

/// Emit the interior entries and the edge entries of a flow in the order required by the
/// operator. Installing starts with the interior such that the edge never forwards into an
/// unprogrammed switch. Removal starts at the edge such that no traffic enters a path that is
/// being torn down.
pub(crate) fn two_phases(
    operator: Operator,
    ids: &IdGenerators,
    interior: Vec<(SwitchPort, Match, Vec<Action>)>,
    edge: Vec<(SwitchPort, Match, Vec<Action>)>,
) -> Result<Vec<MatchActionOperations>, FlowError> {
    let (first, second) = match operator {
        Operator::Add => (interior, edge),
        Operator::Remove => (edge, interior),
    };
    let mut builder = PhaseBuilder::new(operator, ids);
    for entries in vec![first, second] {
        builder.next_phase()?;
        for (port, matching, actions) in entries {
            builder.entry(port, matching, actions)?;
        }
    }
    Ok(builder.build())
}
