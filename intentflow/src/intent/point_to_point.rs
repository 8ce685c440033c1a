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

//! Compiler for point to point intents

use super::compiler::{pack_actions, packet_match};
use super::{Intent, IntentCompiler, IntentError, InstallableIntent, PointToPointIntent};
use crate::flow::{FlowError, PacketPathFlow};
use crate::id::{IdGenerators, IntentId};
use crate::path::{BandwidthConstraint, BandwidthLedger, ConstrainedBfsTree, Path, SearchDirection};
use crate::topology::{Bandwidth, SwitchPort, TopologySnapshot};
use log::*;
use std::sync::Arc;

/// Compiles a [`PointToPointIntent`] into a single [`PacketPathFlow`] along the shortest path.
/// If the intent requests bandwidth, only links with enough available bandwidth are used.
#[derive(Debug, Clone)]
pub struct PointToPointIntentCompiler {
    ids: IdGenerators,
    ledger: Arc<BandwidthLedger>,
}

impl PointToPointIntentCompiler {
    /// Create a new compiler
    pub fn new(ids: IdGenerators, ledger: Arc<BandwidthLedger>) -> Self {
        Self { ids, ledger }
    }

    fn compile_intent(
        &self,
        intent: &PointToPointIntent,
        topology: &TopologySnapshot,
    ) -> Result<Vec<InstallableIntent>, IntentError> {
        let matching = packet_match(&intent.matching)?;
        let path = shortest_path(
            topology,
            &self.ledger,
            intent.id,
            intent.ingress_port,
            intent.egress_port,
            intent.bandwidth,
        )?;
        let flow = PacketPathFlow::new(
            self.ids.flow_ids.next_id()?,
            matching,
            intent.ingress_port.port,
            path,
            pack_actions(&intent.actions, intent.egress_port.port),
            0,
            0,
        );
        Ok(vec![InstallableIntent {
            id: self.ids.intent_ids.next_id()?,
            parent: intent.id,
            flow: flow.into(),
            bandwidth: intent.bandwidth,
        }])
    }
}

impl IntentCompiler for PointToPointIntentCompiler {
    fn compile(
        &self,
        intent: &Intent,
        topology: &TopologySnapshot,
    ) -> Result<Vec<InstallableIntent>, IntentError> {
        match intent {
            Intent::PointToPoint(i) => self.compile_intent(i, topology),
            other => Err(IntentError::NoCompiler(other.kind())),
        }
    }
}

/// Shortest path between the switches of the two ports, honoring the bandwidth constraint. The
/// reservations of `intent` itself are not counted, such that a rerouted intent may keep using
/// the links it already occupies.
pub(super) fn shortest_path(
    topology: &TopologySnapshot,
    ledger: &BandwidthLedger,
    intent: IntentId,
    ingress: SwitchPort,
    egress: SwitchPort,
    bandwidth: Option<Bandwidth>,
) -> Result<Path, IntentError> {
    if !topology.contains_switch(ingress.dpid) {
        return Err(IntentError::PathNotFound(format!(
            "source switch not found: {}",
            ingress.dpid
        )));
    }
    if !topology.contains_switch(egress.dpid) {
        return Err(IntentError::PathNotFound(format!(
            "destination switch not found: {}",
            egress.dpid
        )));
    }
    if ingress.dpid == egress.dpid {
        return Err(FlowError::EmptyPath.into());
    }

    let constraint = bandwidth.map(|min_bandwidth| BandwidthConstraint {
        min_bandwidth,
        ledger: Some(ledger),
        exclude: Some(intent),
    });
    let tree =
        ConstrainedBfsTree::build(topology, ingress.dpid, SearchDirection::Outgoing, constraint);
    match tree.get_path(egress.dpid) {
        Some(path) => {
            trace!("Path from {} to {}: {}", ingress, egress, path);
            Ok(path)
        }
        None => Err(IntentError::PathNotFound(format!("no path from {} to {}", ingress, egress))),
    }
}
