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

//! Module containing the link representations

use super::{Bandwidth, Dpid, SwitchPort};
use serde::{Deserialize, Serialize};
use std::fmt;

/// # Link
/// Directed link between two switch ports, as reported by the topology. The capacity may be
/// infinite, in which case no bandwidth constraint can ever exclude the link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Source port of the link
    pub src: SwitchPort,
    /// Destination port of the link
    pub dst: SwitchPort,
    /// Capacity of the link
    pub capacity: Bandwidth,
}

impl Link {
    /// Create a new link with the given capacity
    pub fn new(src: SwitchPort, dst: SwitchPort, capacity: Bandwidth) -> Self {
        Self { src, dst, capacity }
    }

    /// Create a new link with infinite capacity
    pub fn unlimited(src: SwitchPort, dst: SwitchPort) -> Self {
        Self::new(src, dst, Bandwidth::INFINITY)
    }

    /// Switch at the source of the link
    pub fn src_dpid(&self) -> Dpid {
        self.src.dpid
    }

    /// Switch at the destination of the link
    pub fn dst_dpid(&self) -> Dpid {
        self.dst.dpid
    }

    /// The endpoints of the link, without the capacity
    pub fn tuple(&self) -> LinkTuple {
        LinkTuple { src: self.src, dst: self.dst }
    }
}

/// # Link Tuple
/// The identity of a link, given by its two endpoints. This is the representation used inside
/// flows, paths and trees.
#[derive(
    PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize, Default,
)]
pub struct LinkTuple {
    /// Source port of the link
    pub src: SwitchPort,
    /// Destination port of the link
    pub dst: SwitchPort,
}

impl LinkTuple {
    /// Create a new link tuple
    pub fn new(src: SwitchPort, dst: SwitchPort) -> Self {
        Self { src, dst }
    }

    /// Switch at the source of the link
    pub fn src_dpid(&self) -> Dpid {
        self.src.dpid
    }

    /// Switch at the destination of the link
    pub fn dst_dpid(&self) -> Dpid {
        self.dst.dpid
    }

    /// The same link in the opposite direction
    pub fn reversed(&self) -> Self {
        Self { src: self.dst, dst: self.src }
    }
}

impl From<Link> for LinkTuple {
    fn from(link: Link) -> Self {
        link.tuple()
    }
}

impl From<&Link> for LinkTuple {
    fn from(link: &Link) -> Self {
        link.tuple()
    }
}

impl fmt::Display for LinkTuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}
