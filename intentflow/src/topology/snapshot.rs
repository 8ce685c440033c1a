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

//! # Topology Snapshot
//!
//! An immutable (per query) view of the switches and links in the network. The snapshot is built
//! by the topology discovery service, and only ever read by the compilation pipeline.

use super::{Bandwidth, Dpid, Link, LinkTuple, SwitchPort, TopologyError};
use log::*;
use petgraph::prelude::*;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

type IndexType = u32;
/// Switch Identification in the graph (index into the graph)
pub type SwitchIndex = NodeIndex<IndexType>;
/// Graph of all switches (nodes) and links (edges)
pub type SwitchGraph = StableGraph<Switch, Link, Directed, IndexType>;

/// # Switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Switch {
    dpid: Dpid,
    name: String,
}

impl Switch {
    /// Create a new switch with the given name
    pub fn new(dpid: Dpid, name: impl Into<String>) -> Self {
        Self { dpid, name: name.into() }
    }

    /// Datapath id of the switch
    pub fn dpid(&self) -> Dpid {
        self.dpid
    }

    /// Name of the switch
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Serializable description of a topology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TopologyDescription {
    /// All switches
    pub switches: Vec<Switch>,
    /// All directed links
    pub links: Vec<Link>,
}

/// # Topology Snapshot
/// Graph of switches and directed links with capacities. Every switch port is used by at most one
/// outgoing and at most one incoming link, such that a bidirectional connection uses the same
/// port number in both directions.
#[derive(Debug, Clone, Default)]
pub struct TopologySnapshot {
    graph: SwitchGraph,
    nodes: HashMap<Dpid, SwitchIndex>,
    out_ports: HashSet<SwitchPort>,
    in_ports: HashSet<SwitchPort>,
}

impl TopologySnapshot {
    /// Create an empty topology
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a switch, named after its dpid.
    pub fn add_switch(&mut self, dpid: Dpid) -> Result<(), TopologyError> {
        self.add_named_switch(dpid, format!("S{}", dpid.0))
    }

    /// Add a switch with a name.
    pub fn add_named_switch(
        &mut self,
        dpid: Dpid,
        name: impl Into<String>,
    ) -> Result<(), TopologyError> {
        if self.nodes.contains_key(&dpid) {
            return Err(TopologyError::DuplicateSwitch(dpid));
        }
        let idx = self.graph.add_node(Switch::new(dpid, name));
        self.nodes.insert(dpid, idx);
        Ok(())
    }

    /// Remove a switch, together with all links attached to it. The removed links are returned.
    pub fn remove_switch(&mut self, dpid: Dpid) -> Result<Vec<LinkTuple>, TopologyError> {
        let idx = self.nodes.remove(&dpid).ok_or(TopologyError::SwitchNotFound(dpid))?;
        let mut removed: Vec<LinkTuple> = self
            .graph
            .edges_directed(idx, Outgoing)
            .chain(self.graph.edges_directed(idx, Incoming))
            .map(|e| e.weight().tuple())
            .collect();
        removed.sort();
        removed.dedup();
        for link in removed.iter() {
            self.out_ports.remove(&link.src);
            self.in_ports.remove(&link.dst);
        }
        self.graph.remove_node(idx);
        debug!("Removed switch {} and {} attached links", dpid, removed.len());
        Ok(removed)
    }

    /// Add a directed link. Both switches must exist, and neither port may be used in the same
    /// direction by another link.
    pub fn add_link(&mut self, link: Link) -> Result<(), TopologyError> {
        if link.capacity.is_nan() || link.capacity < 0.0 {
            return Err(TopologyError::InvalidCapacity(link.capacity));
        }
        if link.src.dpid == link.dst.dpid {
            return Err(TopologyError::SelfLoop(link.src.dpid));
        }
        let src = self.node(link.src.dpid)?;
        let dst = self.node(link.dst.dpid)?;
        if self.out_ports.contains(&link.src) {
            return Err(TopologyError::PortInUse(link.src));
        }
        if self.in_ports.contains(&link.dst) {
            return Err(TopologyError::PortInUse(link.dst));
        }
        self.out_ports.insert(link.src);
        self.in_ports.insert(link.dst);
        self.graph.add_edge(src, dst, link);
        Ok(())
    }

    /// Add a link in both directions, with the same capacity.
    pub fn add_bidirectional_link(
        &mut self,
        a: SwitchPort,
        b: SwitchPort,
        capacity: Bandwidth,
    ) -> Result<(), TopologyError> {
        self.add_link(Link::new(a, b, capacity))?;
        self.add_link(Link::new(b, a, capacity))
    }

    /// Remove a directed link, returning it.
    pub fn remove_link(&mut self, src: SwitchPort, dst: SwitchPort) -> Result<Link, TopologyError> {
        let not_found = || TopologyError::LinkNotFound(src, dst);
        let src_idx = *self.nodes.get(&src.dpid).ok_or_else(not_found)?;
        let edge = self
            .graph
            .edges_directed(src_idx, Outgoing)
            .find(|e| e.weight().src == src && e.weight().dst == dst)
            .map(|e| e.id())
            .ok_or_else(not_found)?;
        let link = self.graph.remove_edge(edge).ok_or_else(not_found)?;
        self.out_ports.remove(&link.src);
        self.in_ports.remove(&link.dst);
        Ok(link)
    }

    /// Get the switch with the given dpid, or `None` if it does not exist.
    pub fn get_switch(&self, dpid: Dpid) -> Option<&Switch> {
        self.nodes.get(&dpid).and_then(|idx| self.graph.node_weight(*idx))
    }

    /// Returns true if the switch exists
    pub fn contains_switch(&self, dpid: Dpid) -> bool {
        self.nodes.contains_key(&dpid)
    }

    /// Get the name of a switch
    pub fn get_switch_name(&self, dpid: Dpid) -> Result<&str, TopologyError> {
        self.get_switch(dpid).map(|s| s.name()).ok_or(TopologyError::SwitchNotFound(dpid))
    }

    /// All switches, sorted by dpid
    pub fn switches(&self) -> Vec<Dpid> {
        let mut switches: Vec<Dpid> = self.nodes.keys().copied().collect();
        switches.sort();
        switches
    }

    /// All links leaving the switch, sorted by source port. Returns an empty vector if the switch
    /// does not exist.
    pub fn outgoing_links(&self, dpid: Dpid) -> Vec<&Link> {
        self.links_directed(dpid, Outgoing)
    }

    /// All links arriving at the switch, sorted by destination port.
    pub fn incoming_links(&self, dpid: Dpid) -> Vec<&Link> {
        let mut links = self.links_directed(dpid, Incoming);
        links.sort_by_key(|l| (l.dst, l.src));
        links
    }

    /// Get the directed link between two ports
    pub fn get_link(&self, src: SwitchPort, dst: SwitchPort) -> Option<&Link> {
        self.outgoing_links(src.dpid).into_iter().find(|l| l.src == src && l.dst == dst)
    }

    /// All links, sorted by their endpoints
    pub fn links(&self) -> Vec<&Link> {
        let mut links: Vec<&Link> =
            self.graph.edge_indices().filter_map(|e| self.graph.edge_weight(e)).collect();
        links.sort_by_key(|l| l.tuple());
        links
    }

    /// Number of switches
    pub fn num_switches(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of directed links
    pub fn num_links(&self) -> usize {
        self.graph.edge_count()
    }

    /// Index of the switch in the graph
    pub fn switch_index(&self, dpid: Dpid) -> Option<SwitchIndex> {
        self.nodes.get(&dpid).copied()
    }

    /// Reference to the underlying graph
    pub fn graph(&self) -> &SwitchGraph {
        &self.graph
    }

    /// Export the topology into its serializable description
    pub fn description(&self) -> TopologyDescription {
        TopologyDescription {
            switches: self
                .switches()
                .into_iter()
                .filter_map(|d| self.get_switch(d).cloned())
                .collect(),
            links: self.links().into_iter().copied().collect(),
        }
    }

    /// Build a topology from its description
    pub fn from_description(desc: &TopologyDescription) -> Result<Self, TopologyError> {
        let mut topo = Self::new();
        for s in desc.switches.iter() {
            topo.add_named_switch(s.dpid(), s.name())?;
        }
        for link in desc.links.iter() {
            topo.add_link(*link)?;
        }
        Ok(topo)
    }

    fn node(&self, dpid: Dpid) -> Result<SwitchIndex, TopologyError> {
        self.nodes.get(&dpid).copied().ok_or(TopologyError::SwitchNotFound(dpid))
    }

    fn links_directed(&self, dpid: Dpid, dir: petgraph::Direction) -> Vec<&Link> {
        let mut links: Vec<&Link> = match self.nodes.get(&dpid) {
            Some(idx) => self.graph.edges_directed(*idx, dir).map(|e| e.weight()).collect(),
            None => Vec::new(),
        };
        links.sort_by_key(|l| l.tuple());
        links
    }
}
