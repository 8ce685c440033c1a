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

//! Module containing the path and tree structures

use crate::topology::{Dpid, LinkTuple, PortNumber, SwitchPort};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::convert::TryFrom;
use std::fmt;
use thiserror::Error;

/// Error while constructing a path or a tree
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum PathError {
    /// Two consecutive links of a path do not share the switch.
    #[error("Link {index} starts at {found}, but the previous link ends at {expected}")]
    Discontinuous {
        /// Position of the offending link in the sequence
        index: usize,
        /// Switch where the previous link ends
        expected: Dpid,
        /// Switch where the link starts
        found: Dpid,
    },
    /// The link connects a switch with itself
    #[error("Link {0} connects a switch with itself")]
    SelfLoop(LinkTuple),
    /// The link shares no switch with the tree
    #[error("Link {0} cannot be attached to the tree")]
    NoAttachPoint(LinkTuple),
    /// Both switches of the link are already part of the tree
    #[error("Link {0} would create a loop or a duplicate path in the tree")]
    Loop(LinkTuple),
    /// The port is already used by another link of the tree
    #[error("Port {0} is already used by another link of the tree")]
    PortInUse(SwitchPort),
}

/// # Path
/// Sequence of links forming a connected directed route. The destination switch of every link is
/// the source switch of the next one. An empty path is valid, and means that source and
/// destination coincide (or, depending on the context, that no route exists).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<LinkTuple>", into = "Vec<LinkTuple>")]
pub struct Path {
    links: Vec<LinkTuple>,
}

impl Path {
    /// Create an empty path
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a path from a sequence of links, checking that it is connected.
    pub fn from_links(links: Vec<LinkTuple>) -> Result<Self, PathError> {
        let mut path = Self { links: Vec::with_capacity(links.len()) };
        for link in links {
            path.push(link)?;
        }
        Ok(path)
    }

    /// Append a link at the end of the path.
    pub fn push(&mut self, link: LinkTuple) -> Result<(), PathError> {
        if link.src_dpid() == link.dst_dpid() {
            return Err(PathError::SelfLoop(link));
        }
        if let Some(last) = self.links.last() {
            if last.dst_dpid() != link.src_dpid() {
                return Err(PathError::Discontinuous {
                    index: self.links.len(),
                    expected: last.dst_dpid(),
                    found: link.src_dpid(),
                });
            }
        }
        self.links.push(link);
        Ok(())
    }

    /// The links of the path, in order
    pub fn links(&self) -> &[LinkTuple] {
        &self.links
    }

    /// Consume the path, returning the links
    pub fn into_links(self) -> Vec<LinkTuple> {
        self.links
    }

    /// Iterate over all links
    pub fn iter(&self) -> std::slice::Iter<'_, LinkTuple> {
        self.links.iter()
    }

    /// Number of links
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns true if the path has no links
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// First switch of the path
    pub fn src_dpid(&self) -> Option<Dpid> {
        self.links.first().map(|l| l.src_dpid())
    }

    /// Last switch of the path
    pub fn dst_dpid(&self) -> Option<Dpid> {
        self.links.last().map(|l| l.dst_dpid())
    }

    /// Sequence of switches traversed by the path, including both ends.
    pub fn dpids(&self) -> Vec<Dpid> {
        self.links
            .first()
            .map(|l| l.src_dpid())
            .into_iter()
            .chain(self.links.iter().map(|l| l.dst_dpid()))
            .collect()
    }
}

impl TryFrom<Vec<LinkTuple>> for Path {
    type Error = PathError;

    fn try_from(links: Vec<LinkTuple>) -> Result<Self, Self::Error> {
        Self::from_links(links)
    }
}

impl From<Path> for Vec<LinkTuple> {
    fn from(path: Path) -> Self {
        path.links
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a LinkTuple;
    type IntoIter = std::slice::Iter<'a, LinkTuple>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let links: Vec<String> = self.links.iter().map(|l| l.to_string()).collect();
        write!(f, "[{}]", links.join(", "))
    }
}

/// # Tree
/// Set of links forming a connected tree. Links are only accepted if they keep the tree
/// connected and loop free:
///
/// - a link must share exactly one switch with a non-empty tree,
/// - no port may be used by two links of the tree.
///
/// The tree does not prescribe a direction. A destination rooted tree (all links pointing towards
/// the root) has a single switch that is never the source of a link, and a source rooted tree a
/// single switch that is never the destination of a link.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<LinkTuple>", into = "Vec<LinkTuple>")]
pub struct Tree {
    links: BTreeSet<LinkTuple>,
    ports: BTreeMap<Dpid, BTreeSet<PortNumber>>,
    in_links: BTreeMap<SwitchPort, LinkTuple>,
    out_links: BTreeMap<SwitchPort, LinkTuple>,
}

impl Tree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree from all links of a path
    pub fn from_path(path: &Path) -> Result<Self, PathError> {
        let mut tree = Self::new();
        tree.merge_path(path)?;
        Ok(tree)
    }

    /// Add a link, checking that the tree stays connected and loop free.
    pub fn add_link(&mut self, link: LinkTuple) -> Result<(), PathError> {
        if link.src_dpid() == link.dst_dpid() {
            return Err(PathError::SelfLoop(link));
        }
        if !self.links.is_empty() {
            match (self.has_dpid(link.src_dpid()), self.has_dpid(link.dst_dpid())) {
                (false, false) => return Err(PathError::NoAttachPoint(link)),
                (true, true) => return Err(PathError::Loop(link)),
                _ => {}
            }
        }
        if self.has_switch_port(link.src) {
            return Err(PathError::PortInUse(link.src));
        }
        if self.has_switch_port(link.dst) {
            return Err(PathError::PortInUse(link.dst));
        }

        self.links.insert(link);
        self.ports.entry(link.src_dpid()).or_default().insert(link.src.port);
        self.ports.entry(link.dst_dpid()).or_default().insert(link.dst.port);
        self.in_links.insert(link.dst, link);
        self.out_links.insert(link.src, link);
        Ok(())
    }

    /// Add all links of the path that are not yet part of the tree.
    pub fn merge_path(&mut self, path: &Path) -> Result<(), PathError> {
        self.merge_links(path.iter().copied())
    }

    /// Add all links that are not yet part of the tree, in any order. A link that cannot be
    /// attached yet is retried after the others were added.
    pub fn merge_links<I>(&mut self, links: I) -> Result<(), PathError>
    where
        I: IntoIterator<Item = LinkTuple>,
    {
        let mut pending: Vec<LinkTuple> =
            links.into_iter().filter(|l| !self.links.contains(l)).collect();
        pending.dedup();
        while !pending.is_empty() {
            let before = pending.len();
            let mut retry = Vec::new();
            for link in pending {
                if self.links.contains(&link) {
                    continue;
                }
                match self.add_link(link) {
                    Ok(()) => {}
                    Err(PathError::NoAttachPoint(_)) => retry.push(link),
                    Err(e) => return Err(e),
                }
            }
            if retry.len() == before {
                return Err(PathError::NoAttachPoint(retry[0]));
            }
            pending = retry;
        }
        Ok(())
    }

    /// All links, sorted
    pub fn links(&self) -> impl Iterator<Item = &LinkTuple> {
        self.links.iter()
    }

    /// Returns true if the link is part of the tree
    pub fn contains_link(&self, link: &LinkTuple) -> bool {
        self.links.contains(link)
    }

    /// Number of links
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns true if the tree has no links
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Checks if the switch is part of the tree
    pub fn has_dpid(&self, dpid: Dpid) -> bool {
        self.ports.contains_key(&dpid)
    }

    /// Checks if the port is used by a link of the tree
    pub fn has_switch_port(&self, port: SwitchPort) -> bool {
        self.in_links.contains_key(&port) || self.out_links.contains_key(&port)
    }

    /// All switches of the tree, sorted
    pub fn dpids(&self) -> Vec<Dpid> {
        self.ports.keys().copied().collect()
    }

    /// Link of the tree arriving at the port
    pub fn in_link(&self, port: SwitchPort) -> Option<&LinkTuple> {
        self.in_links.get(&port)
    }

    /// Link of the tree leaving from the port
    pub fn out_link(&self, port: SwitchPort) -> Option<&LinkTuple> {
        self.out_links.get(&port)
    }

    /// Ports of the switch at which links of the tree leave, sorted.
    pub fn out_ports(&self, dpid: Dpid) -> Vec<PortNumber> {
        Self::ports_of(&self.out_links, dpid)
    }

    /// Ports of the switch at which links of the tree arrive, sorted.
    pub fn in_ports(&self, dpid: Dpid) -> Vec<PortNumber> {
        Self::ports_of(&self.in_links, dpid)
    }

    /// Switches that are the destination of some link, but never a source
    pub fn sinks(&self) -> Vec<Dpid> {
        self.ports
            .keys()
            .copied()
            .filter(|d| self.out_ports(*d).is_empty())
            .collect()
    }

    /// Switches that are the source of some link, but never a destination
    pub fn sources(&self) -> Vec<Dpid> {
        self.ports
            .keys()
            .copied()
            .filter(|d| self.in_ports(*d).is_empty())
            .collect()
    }

    fn ports_of(map: &BTreeMap<SwitchPort, LinkTuple>, dpid: Dpid) -> Vec<PortNumber> {
        let first = SwitchPort { dpid, port: PortNumber(0) };
        let last = SwitchPort { dpid, port: PortNumber(u32::MAX) };
        map.range(first..=last).map(|(p, _)| p.port).collect()
    }
}

impl TryFrom<Vec<LinkTuple>> for Tree {
    type Error = PathError;

    fn try_from(links: Vec<LinkTuple>) -> Result<Self, Self::Error> {
        let mut tree = Self::new();
        tree.merge_links(links)?;
        Ok(tree)
    }
}

impl From<Tree> for Vec<LinkTuple> {
    fn from(tree: Tree) -> Self {
        tree.links.into_iter().collect()
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let links: Vec<String> = self.links.iter().map(|l| l.to_string()).collect();
        write!(f, "{{{}}}", links.join(", "))
    }
}
