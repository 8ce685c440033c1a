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

//! Compiler for the legacy shortest path intents

use super::point_to_point::shortest_path;
use super::{Intent, IntentCompiler, IntentError, InstallableIntent, ShortestPathIntent};
use crate::flow::PacketPathFlow;
use crate::id::IdGenerators;
use crate::matchaction::{Action, PacketMatch};
use crate::path::BandwidthLedger;
use crate::topology::TopologySnapshot;
use std::sync::Arc;

/// Compiles a [`ShortestPathIntent`] into a [`PacketPathFlow`] matching on both MAC addresses.
#[derive(Debug, Clone)]
pub struct ShortestPathIntentCompiler {
    ids: IdGenerators,
    ledger: Arc<BandwidthLedger>,
}

impl ShortestPathIntentCompiler {
    /// Create a new compiler
    pub fn new(ids: IdGenerators, ledger: Arc<BandwidthLedger>) -> Self {
        Self { ids, ledger }
    }

    fn compile_intent(
        &self,
        intent: &ShortestPathIntent,
        topology: &TopologySnapshot,
    ) -> Result<Vec<InstallableIntent>, IntentError> {
        let (src, dst) = (intent.src_port, intent.dst_port);
        let path = shortest_path(topology, &self.ledger, intent.id, src, dst, intent.bandwidth)?;
        let matching =
            PacketMatch::builder().src_mac(intent.src_mac).dst_mac(intent.dst_mac).build();
        let flow = PacketPathFlow::new(
            self.ids.flow_ids.next_id()?,
            matching,
            intent.src_port.port,
            path,
            vec![Action::Output(intent.dst_port.port)],
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

impl IntentCompiler for ShortestPathIntentCompiler {
    fn compile(
        &self,
        intent: &Intent,
        topology: &TopologySnapshot,
    ) -> Result<Vec<InstallableIntent>, IntentError> {
        match intent {
            Intent::ShortestPath(i) => self.compile_intent(i, topology),
            other => Err(IntentError::NoCompiler(other.kind())),
        }
    }
}
