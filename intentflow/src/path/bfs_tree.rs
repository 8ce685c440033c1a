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

//! # Constrained BFS Tree
//!
//! Breadth-first reachability tree from a root switch. Every switch records exactly one upstream
//! link: the link through which it was reached first. Switches reached at the same distance by
//! another link later on are not explored again, so equal cost alternatives are never merged.
//!
//! With a bandwidth constraint, a link is skipped if its available bandwidth is below the
//! constraint. The available bandwidth is taken from the [`BandwidthLedger`] if one is given, and
//! from the link capacity otherwise. A constraint of zero (or below) means no constraint.

use super::{BandwidthLedger, Path};
use crate::id::IntentId;
use crate::sync::{read, write};
use crate::topology::{Bandwidth, Dpid, Link, LinkTuple, TopologySnapshot};
use log::*;
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

/// Direction in which links are followed during the search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchDirection {
    /// Follow links from their source to their destination. The root is the source of all paths.
    Outgoing,
    /// Follow links backwards. The root is the destination of all paths, and the paths returned
    /// by [`ConstrainedBfsTree::get_path`] lead from the leaf to the root.
    Incoming,
}

/// Minimum bandwidth every link of the tree must offer
#[derive(Debug, Clone, Copy)]
pub struct BandwidthConstraint<'a> {
    /// Required available bandwidth
    pub min_bandwidth: Bandwidth,
    /// Ledger of the current reservations
    pub ledger: Option<&'a BandwidthLedger>,
    /// Intent whose own reservations are not counted
    pub exclude: Option<IntentId>,
}

impl<'a> BandwidthConstraint<'a> {
    fn admits(&self, link: &Link) -> bool {
        if self.min_bandwidth <= 0.0 {
            return true;
        }
        let available = match self.ledger {
            Some(ledger) => ledger.available_bandwidth_excluding(link, self.exclude),
            None => link.capacity,
        };
        available >= self.min_bandwidth
    }
}

/// # Constrained BFS Tree
/// Reachability tree from a root switch, with one recorded upstream link per reached switch.
#[derive(Debug)]
pub struct ConstrainedBfsTree {
    root: Dpid,
    direction: SearchDirection,
    min_bandwidth: Option<Bandwidth>,
    order: Vec<Dpid>,
    distance: HashMap<Dpid, usize>,
    upstream: HashMap<Dpid, LinkTuple>,
    paths: RwLock<HashMap<Dpid, Path>>,
}

impl ConstrainedBfsTree {
    /// Build an unconstrained tree from the root, following outgoing links.
    pub fn new(topology: &TopologySnapshot, root: Dpid) -> Self {
        Self::build(topology, root, SearchDirection::Outgoing, None)
    }

    /// Build a tree from the root, following outgoing links with at least `min_bandwidth`
    /// available.
    pub fn with_constraint(
        topology: &TopologySnapshot,
        root: Dpid,
        min_bandwidth: Bandwidth,
        ledger: Option<&BandwidthLedger>,
    ) -> Self {
        let constraint = BandwidthConstraint { min_bandwidth, ledger, exclude: None };
        Self::build(topology, root, SearchDirection::Outgoing, Some(constraint))
    }

    /// Build a tree. If the root does not exist in the topology, the tree is empty.
    pub fn build(
        topology: &TopologySnapshot,
        root: Dpid,
        direction: SearchDirection,
        constraint: Option<BandwidthConstraint>,
    ) -> Self {
        let mut tree = Self {
            root,
            direction,
            min_bandwidth: constraint.map(|c| c.min_bandwidth),
            order: Vec::new(),
            distance: HashMap::new(),
            upstream: HashMap::new(),
            paths: RwLock::new(HashMap::new()),
        };
        if !topology.contains_switch(root) {
            debug!("Root {} of the BFS tree is not in the topology", root);
            return tree;
        }

        let mut queue = VecDeque::new();
        tree.distance.insert(root, 0);
        tree.order.push(root);
        queue.push_back((root, 0));

        while let Some((switch, dist)) = queue.pop_front() {
            let links = match direction {
                SearchDirection::Outgoing => topology.outgoing_links(switch),
                SearchDirection::Incoming => topology.incoming_links(switch),
            };
            for link in links {
                let next = match direction {
                    SearchDirection::Outgoing => link.dst_dpid(),
                    SearchDirection::Incoming => link.src_dpid(),
                };
                if tree.distance.contains_key(&next) {
                    continue;
                }
                if let Some(c) = constraint.as_ref() {
                    if !c.admits(link) {
                        trace!("Skipping {} due to the bandwidth constraint", link.tuple());
                        continue;
                    }
                }
                tree.distance.insert(next, dist + 1);
                tree.upstream.insert(next, link.tuple());
                tree.order.push(next);
                queue.push_back((next, dist + 1));
            }
        }

        tree
    }

    /// Root of the tree
    pub fn root(&self) -> Dpid {
        self.root
    }

    /// Direction of the search
    pub fn direction(&self) -> SearchDirection {
        self.direction
    }

    /// Bandwidth constraint used to build the tree
    pub fn min_bandwidth(&self) -> Option<Bandwidth> {
        self.min_bandwidth
    }

    /// Returns true if the switch was reached
    pub fn contains(&self, dpid: Dpid) -> bool {
        self.distance.contains_key(&dpid)
    }

    /// Number of links from the root to the switch, or `None` if it was not reached.
    pub fn distance(&self, dpid: Dpid) -> Option<usize> {
        self.distance.get(&dpid).copied()
    }

    /// The link through which the switch was reached. `None` for the root and for switches that
    /// were not reached.
    pub fn upstream_link(&self, dpid: Dpid) -> Option<LinkTuple> {
        self.upstream.get(&dpid).copied()
    }

    /// All reached switches, in the order in which they were reached (starting with the root).
    pub fn switches(&self) -> &[Dpid] {
        &self.order
    }

    /// Get the path between the root and the leaf, or `None` if the leaf was not reached. The
    /// path of the root itself is empty. Results are cached per leaf.
    pub fn get_path(&self, leaf: Dpid) -> Option<Path> {
        if !self.contains(leaf) {
            return None;
        }
        if let Some(path) = read(&self.paths).get(&leaf) {
            return Some(path.clone());
        }

        let mut links = Vec::with_capacity(self.distance(leaf).unwrap_or_default());
        let mut current = leaf;
        while let Some(link) = self.upstream.get(&current) {
            links.push(*link);
            current = match self.direction {
                SearchDirection::Outgoing => link.src_dpid(),
                SearchDirection::Incoming => link.dst_dpid(),
            };
        }
        if self.direction == SearchDirection::Outgoing {
            links.reverse();
        }

        match Path::from_links(links) {
            Ok(path) => {
                write(&self.paths).insert(leaf, path.clone());
                Some(path)
            }
            Err(e) => {
                error!("Upstream links towards {} do not form a path: {}", leaf, e);
                None
            }
        }
    }
}
