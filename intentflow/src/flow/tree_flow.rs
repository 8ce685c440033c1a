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

//! Module containing the tree flows

use super::phases::two_phases;
use super::FlowError;
use crate::id::{FlowId, IdGenerators};
use crate::matchaction::{Action, Match, MatchActionOperations, Operator, PacketMatch};
use crate::path::Tree;
use crate::topology::{Dpid, PortNumber, SwitchPort};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

type Entry = (SwitchPort, Match, Vec<Action>);

/// # Single Destination Tree Flow
/// Multipoint to point flow. Traffic enters at any of the ingress ports, follows the links of a
/// destination rooted tree, and leaves at the egress switch (the root), where the egress actions
/// are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleDstTreeFlow {
    id: FlowId,
    matching: PacketMatch,
    ingress_ports: BTreeSet<SwitchPort>,
    tree: Tree,
    egress_actions: Vec<Action>,
}

impl SingleDstTreeFlow {
    /// Create a new tree flow
    pub fn new<I>(
        id: FlowId,
        matching: PacketMatch,
        ingress_ports: I,
        tree: Tree,
        egress_actions: Vec<Action>,
    ) -> Self
    where
        I: IntoIterator<Item = SwitchPort>,
    {
        Self {
            id,
            matching,
            ingress_ports: ingress_ports.into_iter().collect(),
            tree,
            egress_actions,
        }
    }

    /// Flow id
    pub fn id(&self) -> FlowId {
        self.id
    }

    /// Packet match at all ingress ports
    pub fn matching(&self) -> &PacketMatch {
        &self.matching
    }

    /// All ingress ports, sorted
    pub fn ingress_ports(&self) -> &BTreeSet<SwitchPort> {
        &self.ingress_ports
    }

    /// The tree
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Actions applied at the egress switch
    pub fn egress_actions(&self) -> &[Action] {
        &self.egress_actions
    }

    /// The egress switch: the unique switch of the tree that is a link destination but never a
    /// link source.
    pub fn egress_switch(&self) -> Result<Dpid, FlowError> {
        if self.tree.is_empty() {
            return Err(FlowError::EmptyTree);
        }
        let sinks = self.tree.sinks();
        match sinks.as_slice() {
            [] => Err(FlowError::NoEgressSwitch),
            [egress] => Ok(*egress),
            _ => Err(FlowError::MultipleEgressSwitches(sinks)),
        }
    }

    /// Compile the flow into two phases. For [`Operator::Add`], the first phase contains one
    /// entry at every port where a link of the tree arrives: it forwards towards the egress, or
    /// applies the egress actions at the egress switch. The second phase contains one entry per
    /// ingress port. [`Operator::Remove`] uses the reverse order.
    pub fn compile(
        &self,
        operator: Operator,
        ids: &IdGenerators,
    ) -> Result<Vec<MatchActionOperations>, FlowError> {
        let egress = self.egress_switch()?;

        let mut outputs: BTreeMap<Dpid, PortNumber> = BTreeMap::new();
        for dpid in self.tree.dpids().into_iter().filter(|d| *d != egress) {
            match self.tree.out_ports(dpid).as_slice() {
                [port] => {
                    outputs.insert(dpid, *port);
                }
                [] => return Err(FlowError::MultipleEgressSwitches(vec![egress, dpid])),
                _ => return Err(FlowError::MultipleOutputPorts(dpid)),
            }
        }

        let matching = Match::Packet(self.matching);
        let actions_at = |dpid: Dpid| -> Option<Vec<Action>> {
            if dpid == egress {
                Some(self.egress_actions.clone())
            } else {
                outputs.get(&dpid).map(|p| vec![Action::Output(*p)])
            }
        };

        let mut interior: Vec<Entry> = Vec::with_capacity(self.tree.len());
        for link in self.tree.links() {
            let actions = actions_at(link.dst.dpid).ok_or(FlowError::NoEgressSwitch)?;
            interior.push((link.dst, matching, actions));
        }

        let mut ingress: Vec<Entry> = Vec::with_capacity(self.ingress_ports.len());
        for port in self.ingress_ports.iter() {
            let actions = actions_at(port.dpid).ok_or(FlowError::IngressNotInTree(*port))?;
            ingress.push((*port, matching, actions));
        }

        two_phases(operator, ids, interior, ingress)
    }
}

/// # Single Source Tree Flow
/// Point to multipoint flow. Traffic enters at the ingress port of the root switch, is replicated
/// along the links of a source rooted tree, and the egress actions of each leaf switch are
/// applied there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleSrcTreeFlow {
    id: FlowId,
    matching: PacketMatch,
    ingress_port: SwitchPort,
    tree: Tree,
    egress_actions: BTreeMap<Dpid, Vec<Action>>,
}

impl SingleSrcTreeFlow {
    /// Create a new tree flow
    pub fn new(
        id: FlowId,
        matching: PacketMatch,
        ingress_port: SwitchPort,
        tree: Tree,
        egress_actions: BTreeMap<Dpid, Vec<Action>>,
    ) -> Self {
        Self { id, matching, ingress_port, tree, egress_actions }
    }

    /// Flow id
    pub fn id(&self) -> FlowId {
        self.id
    }

    /// Packet match at the ingress port
    pub fn matching(&self) -> &PacketMatch {
        &self.matching
    }

    /// Ingress port at the root switch
    pub fn ingress_port(&self) -> SwitchPort {
        self.ingress_port
    }

    /// The tree
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Actions applied at each egress switch
    pub fn egress_actions(&self) -> &BTreeMap<Dpid, Vec<Action>> {
        &self.egress_actions
    }

    /// Check that the ingress switch is the unique root of the tree.
    fn check_root(&self) -> Result<Dpid, FlowError> {
        if self.tree.is_empty() {
            return Err(FlowError::EmptyTree);
        }
        let root = self.ingress_port.dpid;
        if !self.tree.has_dpid(root) {
            return Err(FlowError::IngressNotInTree(self.ingress_port));
        }
        let sources = self.tree.sources();
        match sources.as_slice() {
            [] => Err(FlowError::NoRootSwitch),
            [r] if *r == root => Ok(root),
            [_] => Err(FlowError::IngressNotRoot(self.ingress_port)),
            _ => Err(FlowError::MultipleRootSwitches(sources)),
        }
    }

    /// Compile the flow into two phases. For [`Operator::Add`], the first phase contains one
    /// entry at every port where a link of the tree arrives, forwarding out of all tree ports of
    /// that switch and applying the egress actions of that switch. The second phase contains the
    /// entry of the ingress port. [`Operator::Remove`] uses the reverse order.
    pub fn compile(
        &self,
        operator: Operator,
        ids: &IdGenerators,
    ) -> Result<Vec<MatchActionOperations>, FlowError> {
        let root = self.check_root()?;
        if let Some(dpid) = self.egress_actions.keys().find(|d| !self.tree.has_dpid(**d)) {
            return Err(FlowError::EgressNotInTree(*dpid));
        }

        let actions_at = |dpid: Dpid| -> Result<Vec<Action>, FlowError> {
            let mut actions: Vec<Action> =
                self.tree.out_ports(dpid).into_iter().map(Action::Output).collect();
            if let Some(egress) = self.egress_actions.get(&dpid) {
                actions.extend(egress.iter().copied());
            }
            if actions.is_empty() {
                Err(FlowError::MissingEgressActions(dpid))
            } else {
                Ok(actions)
            }
        };

        let matching = Match::Packet(self.matching);
        let mut interior: Vec<Entry> = Vec::with_capacity(self.tree.len());
        for link in self.tree.links() {
            interior.push((link.dst, matching, actions_at(link.dst.dpid)?));
        }
        let head = (self.ingress_port, matching, actions_at(root)?);

        two_phases(operator, ids, interior, vec![head])
    }
}
