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

//! Compiler for single point to multipoint intents

use super::compiler::packet_match;
use super::{
    Intent, IntentCompiler, IntentError, InstallableIntent, SinglePointToMultiPointIntent,
};
use crate::flow::SingleSrcTreeFlow;
use crate::id::IdGenerators;
use crate::matchaction::Action;
use crate::path::{ConstrainedBfsTree, Tree};
use crate::topology::{Dpid, TopologySnapshot};
use log::*;
use std::collections::BTreeMap;

/// Compiles a [`SinglePointToMultiPointIntent`] into a single [`SingleSrcTreeFlow`], rooted at
/// the ingress switch. Unreachable egress ports are skipped.
#[derive(Debug, Clone)]
pub struct SinglePointToMultiPointIntentCompiler {
    ids: IdGenerators,
}

impl SinglePointToMultiPointIntentCompiler {
    /// Create a new compiler
    pub fn new(ids: IdGenerators) -> Self {
        Self { ids }
    }

    fn compile_intent(
        &self,
        intent: &SinglePointToMultiPointIntent,
        topology: &TopologySnapshot,
    ) -> Result<Vec<InstallableIntent>, IntentError> {
        let matching = packet_match(&intent.matching)?;
        let ingress = intent.ingress_port;
        if !topology.contains_switch(ingress.dpid) {
            return Err(IntentError::PathNotFound(format!(
                "source switch not found: {}",
                ingress.dpid
            )));
        }

        let bfs = ConstrainedBfsTree::new(topology, ingress.dpid);
        let mut tree = Tree::new();
        let mut reached = Vec::new();
        for egress in intent.egress_ports.iter() {
            if egress.dpid == ingress.dpid {
                reached.push(*egress);
                continue;
            }
            match bfs.get_path(egress.dpid) {
                Some(path) if !path.is_empty() => {
                    tree.merge_path(&path)?;
                    reached.push(*egress);
                }
                _ => debug!("Skipping egress {}: not reachable from {}", egress, ingress),
            }
        }

        if tree.is_empty() {
            return Err(IntentError::PathNotFound(format!(
                "no tree found (ingress: {}, egress: [{}])",
                ingress,
                itertools::join(intent.egress_ports.iter(), ", ")
            )));
        }

        let mut egress_actions: BTreeMap<Dpid, Vec<Action>> = BTreeMap::new();
        for egress in reached {
            egress_actions
                .entry(egress.dpid)
                .or_insert_with(|| intent.actions.clone())
                .push(Action::Output(egress.port));
        }

        let flow = SingleSrcTreeFlow::new(
            self.ids.flow_ids.next_id()?,
            matching,
            ingress,
            tree,
            egress_actions,
        );
        Ok(vec![InstallableIntent {
            id: self.ids.intent_ids.next_id()?,
            parent: intent.id,
            flow: flow.into(),
            bandwidth: None,
        }])
    }
}

impl IntentCompiler for SinglePointToMultiPointIntentCompiler {
    fn compile(
        &self,
        intent: &Intent,
        topology: &TopologySnapshot,
    ) -> Result<Vec<InstallableIntent>, IntentError> {
        match intent {
            Intent::SinglePointToMultiPoint(i) => self.compile_intent(i, topology),
            other => Err(IntentError::NoCompiler(other.kind())),
        }
    }
}
