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

//! Compiler for multipoint to single point intents

use super::compiler::{pack_actions, packet_match};
use super::{
    Intent, IntentCompiler, IntentError, InstallableIntent, MultiPointToSinglePointIntent,
};
use crate::flow::SingleDstTreeFlow;
use crate::id::IdGenerators;
use crate::path::{ConstrainedBfsTree, SearchDirection, Tree};
use crate::topology::{SwitchPort, TopologySnapshot};
use log::*;

/// Compiles a [`MultiPointToSinglePointIntent`] into a single [`SingleDstTreeFlow`].
///
/// A single search tree is built backwards from the egress switch, and the paths of all ingress
/// switches are merged into one tree towards the egress. Ingress switches that are missing in the
/// topology, or that cannot reach the egress, are skipped. Compilation only fails if no ingress
/// port can reach the egress at all.
#[derive(Debug, Clone)]
pub struct MultiPointToSinglePointIntentCompiler {
    ids: IdGenerators,
}

impl MultiPointToSinglePointIntentCompiler {
    /// Create a new compiler
    pub fn new(ids: IdGenerators) -> Self {
        Self { ids }
    }

    fn compile_intent(
        &self,
        intent: &MultiPointToSinglePointIntent,
        topology: &TopologySnapshot,
    ) -> Result<Vec<InstallableIntent>, IntentError> {
        let matching = packet_match(&intent.matching)?;
        let egress = intent.egress_port;
        if !topology.contains_switch(egress.dpid) {
            return Err(IntentError::PathNotFound(format!(
                "destination switch not found: {}",
                egress.dpid
            )));
        }

        let bfs = ConstrainedBfsTree::build(topology, egress.dpid, SearchDirection::Incoming, None);
        let mut tree = Tree::new();
        for ingress in intent.ingress_ports.iter() {
            if !topology.contains_switch(ingress.dpid) {
                debug!("Skipping ingress {}: switch not found", ingress);
                continue;
            }
            match bfs.get_path(ingress.dpid) {
                Some(path) if !path.is_empty() => tree.merge_path(&path)?,
                _ => debug!("Skipping ingress {}: no path to {}", ingress, egress),
            }
        }

        if tree.is_empty() {
            return Err(IntentError::PathNotFound(format!(
                "no tree found (ingress: [{}], egress: {})",
                itertools::join(intent.ingress_ports.iter(), ", "),
                egress
            )));
        }

        let ingress_ports: Vec<SwitchPort> = intent
            .ingress_ports
            .iter()
            .copied()
            .filter(|p| p.dpid != egress.dpid && tree.has_dpid(p.dpid))
            .collect();

        let flow = SingleDstTreeFlow::new(
            self.ids.flow_ids.next_id()?,
            matching,
            ingress_ports,
            tree,
            pack_actions(&intent.actions, egress.port),
        );
        Ok(vec![InstallableIntent {
            id: self.ids.intent_ids.next_id()?,
            parent: intent.id,
            flow: flow.into(),
            bandwidth: None,
        }])
    }
}

impl IntentCompiler for MultiPointToSinglePointIntentCompiler {
    fn compile(
        &self,
        intent: &Intent,
        topology: &TopologySnapshot,
    ) -> Result<Vec<InstallableIntent>, IntentError> {
        match intent {
            Intent::MultiPointToSinglePoint(i) => self.compile_intent(i, topology),
            other => Err(IntentError::NoCompiler(other.kind())),
        }
    }
}
