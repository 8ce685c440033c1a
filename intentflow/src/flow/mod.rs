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

//! # Flows
//!
//! A flow is a compiled, topology bound forwarding artifact. It owns a match and the route
//! (a [`Path`](crate::path::Path) or a [`Tree`](crate::path::Tree)), and
//! compiles itself into an ordered sequence of match-action phases. Execution of phase `N + 1`
//! must only start once phase `N` is confirmed.
//!
//! ```text
//!  ingress            interior hops              egress
//!  [S1] -----------> [S2] -----------> [S3] ---> actions
//!  phase 2           phase 1           phase 1
//! ```

mod path_flow;
mod phases;
mod tree_flow;

pub use path_flow::{OpticalPathFlow, PacketPathFlow};
pub use phases::PhaseBuilder;
pub use tree_flow::{SingleDstTreeFlow, SingleSrcTreeFlow};

use crate::id::{FlowId, IdError, IdGenerators};
use crate::matchaction::{Match, MatchActionOperations, Operator};
use crate::topology::{Dpid, LinkTuple, SwitchPort};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error while compiling a flow. All variants except [`FlowError::IdError`] are compile time
/// rejections and must not be retried.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum FlowError {
    /// The path has no links
    #[error("The path of the flow is empty")]
    EmptyPath,
    /// The tree has no links
    #[error("The tree of the flow is empty")]
    EmptyTree,
    /// Illegal state: no switch of the tree is a sink
    #[error("Illegal state: the tree has no egress switch")]
    NoEgressSwitch,
    /// Illegal state: the tree has more than one sink
    #[error("Illegal state: the tree has multiple egress switches: {0:?}")]
    MultipleEgressSwitches(Vec<Dpid>),
    /// Illegal state: no switch of the tree is a source
    #[error("Illegal state: the tree has no root switch")]
    NoRootSwitch,
    /// Illegal state: the tree has more than one source
    #[error("Illegal state: the tree has multiple root switches: {0:?}")]
    MultipleRootSwitches(Vec<Dpid>),
    /// A switch of a destination rooted tree forwards out of more than one port
    #[error("Switch {0} has multiple output ports in the tree")]
    MultipleOutputPorts(Dpid),
    /// An ingress port lies on a switch outside of the tree
    #[error("Ingress port {0} is not part of the tree")]
    IngressNotInTree(SwitchPort),
    /// The ingress switch is not the root of a source rooted tree
    #[error("Ingress port {0} is not at the root of the tree")]
    IngressNotRoot(SwitchPort),
    /// Egress actions are given for a switch outside of the tree
    #[error("Egress switch {0} is not part of the tree")]
    EgressNotInTree(Dpid),
    /// A leaf of a source rooted tree has nothing to do with the traffic
    #[error("Leaf switch {0} has no egress actions")]
    MissingEgressActions(Dpid),
    /// No id could be allocated for an entry or a phase
    #[error("Id Error: {0}")]
    IdError(#[from] IdError),
}

impl FlowError {
    /// Returns true if the route of the flow violates the tree invariants.
    pub fn is_illegal_state(&self) -> bool {
        matches!(
            self,
            Self::NoEgressSwitch
                | Self::MultipleEgressSwitches(_)
                | Self::NoRootSwitch
                | Self::MultipleRootSwitches(_)
                | Self::MultipleOutputPorts(_)
        )
    }
}

/// Lifecycle state of a flow
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum FlowState {
    /// Accepted by the flow manager
    Submitted,
    /// Compiled into match-action phases
    Compiled,
    /// All phases are confirmed
    Installed,
    /// Removal is in progress
    Withdrawing,
    /// Removed from the network
    Withdrawn,
    /// Compilation or installation failed
    Failed,
}

impl FlowState {
    /// Returns true if the transition from `self` to `next` is allowed. Any state except
    /// `Withdrawn` may move to `Failed`, and a failed flow may still be withdrawn.
    pub fn can_transition_to(self, next: FlowState) -> bool {
        use FlowState::*;
        matches!(
            (self, next),
            (Submitted, Compiled)
                | (Submitted, Withdrawing)
                | (Compiled, Installed)
                | (Compiled, Withdrawing)
                | (Installed, Withdrawing)
                | (Withdrawing, Withdrawn)
                | (Failed, Withdrawing)
                | (Submitted, Failed)
                | (Compiled, Failed)
                | (Installed, Failed)
                | (Withdrawing, Failed)
        )
    }

    /// Returns true if the flow is neither withdrawn nor failed (nor being withdrawn).
    pub fn is_active(self) -> bool {
        matches!(self, Self::Submitted | Self::Compiled | Self::Installed)
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Submitted => "SUBMITTED",
            Self::Compiled => "COMPILED",
            Self::Installed => "INSTALLED",
            Self::Withdrawing => "WITHDRAWING",
            Self::Withdrawn => "WITHDRAWN",
            Self::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// Kind of a flow
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum FlowKind {
    /// [`PacketPathFlow`]
    PacketPath,
    /// [`OpticalPathFlow`]
    OpticalPath,
    /// [`SingleDstTreeFlow`]
    SingleDstTree,
    /// [`SingleSrcTreeFlow`]
    SingleSrcTree,
}

/// # Flow
/// All kinds of flows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flow {
    /// Packet flow along a path
    PacketPath(PacketPathFlow),
    /// Optical flow along a path
    OpticalPath(OpticalPathFlow),
    /// Multipoint to point tree flow
    SingleDstTree(SingleDstTreeFlow),
    /// Point to multipoint tree flow
    SingleSrcTree(SingleSrcTreeFlow),
}

impl Flow {
    /// Flow id
    pub fn id(&self) -> FlowId {
        match self {
            Self::PacketPath(f) => f.id(),
            Self::OpticalPath(f) => f.id(),
            Self::SingleDstTree(f) => f.id(),
            Self::SingleSrcTree(f) => f.id(),
        }
    }

    /// Kind of the flow
    pub fn kind(&self) -> FlowKind {
        match self {
            Self::PacketPath(_) => FlowKind::PacketPath,
            Self::OpticalPath(_) => FlowKind::OpticalPath,
            Self::SingleDstTree(_) => FlowKind::SingleDstTree,
            Self::SingleSrcTree(_) => FlowKind::SingleSrcTree,
        }
    }

    /// Match of the flow at its ingress ports
    pub fn matching(&self) -> Match {
        match self {
            Self::PacketPath(f) => Match::Packet(*f.matching()),
            Self::OpticalPath(f) => Match::Optical(f.matching()),
            Self::SingleDstTree(f) => Match::Packet(*f.matching()),
            Self::SingleSrcTree(f) => Match::Packet(*f.matching()),
        }
    }

    /// All ports where traffic enters the flow, sorted
    pub fn ingress_ports(&self) -> Vec<SwitchPort> {
        match self {
            Self::PacketPath(f) => f.ingress_switch_port().into_iter().collect(),
            Self::OpticalPath(f) => f.ingress_switch_port().into_iter().collect(),
            Self::SingleDstTree(f) => f.ingress_ports().iter().copied().collect(),
            Self::SingleSrcTree(f) => vec![f.ingress_port()],
        }
    }

    /// All links used by the flow, in path order for path flows and sorted for tree flows.
    pub fn links(&self) -> Vec<LinkTuple> {
        match self {
            Self::PacketPath(f) => f.path().links().to_vec(),
            Self::OpticalPath(f) => f.path().links().to_vec(),
            Self::SingleDstTree(f) => f.tree().links().copied().collect(),
            Self::SingleSrcTree(f) => f.tree().links().copied().collect(),
        }
    }

    /// Compile the flow into its ordered match-action phases.
    pub fn compile(
        &self,
        operator: Operator,
        ids: &IdGenerators,
    ) -> Result<Vec<MatchActionOperations>, FlowError> {
        match self {
            Self::PacketPath(f) => f.compile(operator, ids),
            Self::OpticalPath(f) => f.compile(operator, ids),
            Self::SingleDstTree(f) => f.compile(operator, ids),
            Self::SingleSrcTree(f) => f.compile(operator, ids),
        }
    }
}

impl From<PacketPathFlow> for Flow {
    fn from(f: PacketPathFlow) -> Self {
        Self::PacketPath(f)
    }
}

impl From<OpticalPathFlow> for Flow {
    fn from(f: OpticalPathFlow) -> Self {
        Self::OpticalPath(f)
    }
}

impl From<SingleDstTreeFlow> for Flow {
    fn from(f: SingleDstTreeFlow) -> Self {
        Self::SingleDstTree(f)
    }
}

impl From<SingleSrcTreeFlow> for Flow {
    fn from(f: SingleSrcTreeFlow) -> Self {
        Self::SingleSrcTree(f)
    }
}
