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

//! # Conflict Detection
//!
//! Decides whether a new flow may coexist with the active flows. The ingress flow space of a flow
//! is its match at each of its ingress ports. Two flows overlap if their matches overlap and they
//! share an ingress port.
//!
//! - [`ConflictDetectionPolicy::Strict`] rejects every overlap.
//! - [`ConflictDetectionPolicy::Loose`] rejects an overlap only if the two flows also share a
//!   link, i.e., if their resource allocation is not distinct.
//! - [`ConflictDetectionPolicy::Free`] accepts everything, and leaves it to the priorities at the
//!   data plane to resolve overlaps.

use crate::flow::Flow;
use crate::id::FlowId;
use crate::topology::LinkTuple;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Policy for accepting flows with overlapping ingress flow space
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictDetectionPolicy {
    /// Reject any overlap
    Strict,
    /// Reject overlap with shared links
    Loose,
    /// Accept all flows
    Free,
}

impl Default for ConflictDetectionPolicy {
    fn default() -> Self {
        Self::Free
    }
}

impl fmt::Display for ConflictDetectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "STRICT"),
            Self::Loose => write!(f, "LOOSE"),
            Self::Free => write!(f, "FREE"),
        }
    }
}

/// Returns true if the ingress flow spaces of both flows overlap.
pub fn ingress_overlap(a: &Flow, b: &Flow) -> bool {
    if !a.matching().overlaps(&b.matching()) {
        return false;
    }
    let ports_b = b.ingress_ports();
    a.ingress_ports().iter().any(|p| ports_b.contains(p))
}

/// Returns true if both flows use a common link.
pub fn shares_links(a: &Flow, b: &Flow) -> bool {
    let links_a: BTreeSet<LinkTuple> = a.links().into_iter().collect();
    b.links().iter().any(|l| links_a.contains(l))
}

/// Find an existing flow the new flow conflicts with under the policy.
pub fn find_conflict<'a, I>(
    policy: ConflictDetectionPolicy,
    flow: &Flow,
    existing: I,
) -> Option<FlowId>
where
    I: IntoIterator<Item = &'a Flow>,
{
    let conflicts = |other: &Flow| match policy {
        ConflictDetectionPolicy::Free => false,
        ConflictDetectionPolicy::Strict => ingress_overlap(flow, other),
        ConflictDetectionPolicy::Loose => ingress_overlap(flow, other) && shares_links(flow, other),
    };
    existing.into_iter().find(|other| conflicts(other)).map(|other| other.id())
}
