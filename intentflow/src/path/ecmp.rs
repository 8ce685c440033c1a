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

//! # ECMP Shortest Path Graph
//!
//! Breadth-first search that keeps *all* minimum distance upstream links of every switch, which
//! allows enumerating all equal cost paths to a destination. Parallel links between the same pair
//! of switches are counted only once, such that no path appears twice in an ECMP set.

use super::Path;
use crate::topology::{Dpid, LinkTuple, TopologySnapshot};
use log::*;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Equal cost multipath variant of the BFS tree, rooted at a source switch.
#[derive(Debug, Clone)]
pub struct EcmpShortestPathGraph {
    root: Dpid,
    distance: BTreeMap<Dpid, usize>,
    upstream: BTreeMap<Dpid, Vec<LinkTuple>>,
    by_distance: BTreeMap<usize, Vec<Dpid>>,
}

impl EcmpShortestPathGraph {
    /// Compute the graph from the root, following outgoing links.
    pub fn new(topology: &TopologySnapshot, root: Dpid) -> Self {
        let mut graph = Self {
            root,
            distance: BTreeMap::new(),
            upstream: BTreeMap::new(),
            by_distance: BTreeMap::new(),
        };
        if !topology.contains_switch(root) {
            return graph;
        }

        let mut queue = VecDeque::new();
        graph.distance.insert(root, 0);
        graph.by_distance.entry(0).or_default().push(root);
        queue.push_back(root);

        while let Some(switch) = queue.pop_front() {
            let dist = graph.distance[&switch];
            let mut neighbors = BTreeSet::new();
            for link in topology.outgoing_links(switch) {
                let next = link.dst_dpid();
                if !neighbors.insert(next) {
                    trace!("Skipping parallel link {}", link.tuple());
                    continue;
                }
                match graph.distance.get(&next) {
                    None => {
                        graph.distance.insert(next, dist + 1);
                        graph.by_distance.entry(dist + 1).or_default().push(next);
                        graph.upstream.entry(next).or_default().push(link.tuple());
                        queue.push_back(next);
                    }
                    Some(d) if *d == dist + 1 => {
                        graph.upstream.entry(next).or_default().push(link.tuple());
                    }
                    Some(_) => {}
                }
            }
        }

        graph
    }

    /// Source switch of all paths
    pub fn root(&self) -> Dpid {
        self.root
    }

    /// Distance of the switch from the root
    pub fn distance(&self, dpid: Dpid) -> Option<usize> {
        self.distance.get(&dpid).copied()
    }

    /// All minimum distance upstream links of the switch
    pub fn upstream_links(&self, dpid: Dpid) -> &[LinkTuple] {
        self.upstream.get(&dpid).map(|l| l.as_slice()).unwrap_or(&[])
    }

    /// All switches at the given distance from the root
    pub fn switches_at_distance(&self, distance: usize) -> &[Dpid] {
        self.by_distance.get(&distance).map(|s| s.as_slice()).unwrap_or(&[])
    }

    /// Largest distance of any reached switch
    pub fn max_distance(&self) -> Option<usize> {
        self.by_distance.keys().next_back().copied()
    }

    /// Enumerate all shortest paths from the root to `dst`. Returns an empty vector if `dst` was
    /// not reached, and a single empty path if `dst` is the root.
    pub fn paths(&self, dst: Dpid) -> Vec<Path> {
        let mut result = Vec::new();
        if self.distance.contains_key(&dst) {
            let mut suffix = Vec::new();
            self.walk(dst, &mut suffix, &mut result);
        }
        result
    }

    fn walk(&self, current: Dpid, suffix: &mut Vec<LinkTuple>, result: &mut Vec<Path>) {
        if current == self.root {
            let links: Vec<LinkTuple> = suffix.iter().rev().copied().collect();
            match Path::from_links(links) {
                Ok(path) => result.push(path),
                Err(e) => error!("Invalid ECMP path towards the root: {}", e),
            }
            return;
        }
        for link in self.upstream_links(current) {
            suffix.push(*link);
            self.walk(link.src_dpid(), suffix, result);
            suffix.pop();
        }
    }
}
