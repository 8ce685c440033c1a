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

//! Compiler for intents with an explicit route

use super::compiler::{pack_actions, packet_match};
use super::{Intent, IntentCompiler, IntentError, InstallableIntent, PathIntent};
use crate::flow::{FlowError, PacketPathFlow};
use crate::id::IdGenerators;
use crate::path::{Path, PathError};
use crate::topology::TopologySnapshot;

/// Compiles a [`PathIntent`] into a [`PacketPathFlow`] along the given links. No path search is
/// done, and the topology is not consulted.
#[derive(Debug, Clone)]
pub struct PathIntentCompiler {
    ids: IdGenerators,
}

impl PathIntentCompiler {
    /// Create a new compiler
    pub fn new(ids: IdGenerators) -> Self {
        Self { ids }
    }

    fn compile_intent(&self, intent: &PathIntent) -> Result<Vec<InstallableIntent>, IntentError> {
        let matching = packet_match(&intent.matching)?;
        let path = Path::from_links(intent.links.clone())?;
        match path.src_dpid() {
            None => return Err(FlowError::EmptyPath.into()),
            Some(src) if src != intent.ingress_port.dpid => {
                return Err(PathError::Discontinuous {
                    index: 0,
                    expected: intent.ingress_port.dpid,
                    found: src,
                }
                .into())
            }
            Some(_) => {}
        }
        let flow = PacketPathFlow::new(
            self.ids.flow_ids.next_id()?,
            matching,
            intent.ingress_port.port,
            path,
            pack_actions(&intent.actions, intent.egress_port),
            0,
            0,
        );
        Ok(vec![InstallableIntent {
            id: self.ids.intent_ids.next_id()?,
            parent: intent.id,
            flow: flow.into(),
            bandwidth: None,
        }])
    }
}

impl IntentCompiler for PathIntentCompiler {
    fn compile(
        &self,
        intent: &Intent,
        _topology: &TopologySnapshot,
    ) -> Result<Vec<InstallableIntent>, IntentError> {
        match intent {
            Intent::Path(i) => self.compile_intent(i),
            other => Err(IntentError::NoCompiler(other.kind())),
        }
    }
}
