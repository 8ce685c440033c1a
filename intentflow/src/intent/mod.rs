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

//! # Intents
//!
//! An intent is a declarative connectivity request, independent of the current topology. It is
//! compiled by an [`IntentCompiler`] into one or more [`InstallableIntent`]s, each of which wraps
//! a single [`Flow`]. The [`IntentManager`] drives the lifecycle of every intent, see
//! [`IntentState`] for the state machine.

mod compiler;
mod installer;
mod multi_point;
mod path_intent;
mod point_to_point;
mod runtime;
mod shortest_path;
mod single_to_multi;
mod state;

pub use compiler::{CompilerRegistry, IntentCompiler};
pub use installer::FlowInstaller;
pub use multi_point::MultiPointToSinglePointIntentCompiler;
pub use path_intent::PathIntentCompiler;
pub use point_to_point::PointToPointIntentCompiler;
pub use runtime::{IntentEvent, IntentEventListener, IntentManager};
pub use shortest_path::ShortestPathIntentCompiler;
pub use single_to_multi::SinglePointToMultiPointIntentCompiler;
pub use state::{FailureKind, IntentLog, IntentLogEntry, IntentState, IntentTrigger};

use crate::flow::{Flow, FlowError};
use crate::id::{FlowId, IdError, IntentId};
use crate::matchaction::{Action, MacAddress, Match};
use crate::path::PathError;
use crate::topology::{Bandwidth, LinkTuple, PortNumber, SwitchPort};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Connectivity between two switch ports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointToPointIntent {
    /// Intent id
    pub id: IntentId,
    /// Traffic selected by the intent
    pub matching: Match,
    /// Actions applied at the egress, before the packet is sent out
    pub actions: Vec<Action>,
    /// Where traffic enters the network
    pub ingress_port: SwitchPort,
    /// Where traffic leaves the network
    pub egress_port: SwitchPort,
    /// Bandwidth every link of the path must have available, and that is reserved once installed
    pub bandwidth: Option<Bandwidth>,
}

/// Connectivity from many ingress ports to a single egress port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPointToSinglePointIntent {
    /// Intent id
    pub id: IntentId,
    /// Traffic selected by the intent
    pub matching: Match,
    /// Actions applied at the egress
    pub actions: Vec<Action>,
    /// Where traffic enters the network
    pub ingress_ports: BTreeSet<SwitchPort>,
    /// Where traffic leaves the network
    pub egress_port: SwitchPort,
}

/// Connectivity from one ingress port to many egress ports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinglePointToMultiPointIntent {
    /// Intent id
    pub id: IntentId,
    /// Traffic selected by the intent
    pub matching: Match,
    /// Actions applied at every egress
    pub actions: Vec<Action>,
    /// Where traffic enters the network
    pub ingress_port: SwitchPort,
    /// Where traffic leaves the network
    pub egress_ports: BTreeSet<SwitchPort>,
}

/// Connectivity along a route that was already decided by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathIntent {
    /// Intent id
    pub id: IntentId,
    /// Traffic selected by the intent
    pub matching: Match,
    /// Actions applied at the egress
    pub actions: Vec<Action>,
    /// Where traffic enters the network
    pub ingress_port: SwitchPort,
    /// The route, as an ordered sequence of links
    pub links: Vec<LinkTuple>,
    /// Port at the last switch of the route where traffic leaves the network
    pub egress_port: PortNumber,
}

/// Host to host connectivity between two MAC addresses along the shortest path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortestPathIntent {
    /// Intent id
    pub id: IntentId,
    /// Attachment point of the source host
    pub src_port: SwitchPort,
    /// Attachment point of the destination host
    pub dst_port: SwitchPort,
    /// MAC address of the source host
    pub src_mac: MacAddress,
    /// MAC address of the destination host
    pub dst_mac: MacAddress,
    /// Bandwidth every link of the path must have available, and that is reserved once installed
    pub bandwidth: Option<Bandwidth>,
}

/// Kind of an intent, used to find the compiler
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum IntentKind {
    /// [`PointToPointIntent`]
    PointToPoint,
    /// [`MultiPointToSinglePointIntent`]
    MultiPointToSinglePoint,
    /// [`SinglePointToMultiPointIntent`]
    SinglePointToMultiPoint,
    /// [`PathIntent`]
    Path,
    /// [`ShortestPathIntent`]
    ShortestPath,
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::PointToPoint => "point-to-point",
            Self::MultiPointToSinglePoint => "multi-point-to-single-point",
            Self::SinglePointToMultiPoint => "single-point-to-multi-point",
            Self::Path => "path",
            Self::ShortestPath => "shortest-path",
        };
        write!(f, "{}", s)
    }
}

/// # Intent
/// All kinds of intents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    /// Point to point
    PointToPoint(PointToPointIntent),
    /// Multipoint to single point
    MultiPointToSinglePoint(MultiPointToSinglePointIntent),
    /// Single point to multipoint
    SinglePointToMultiPoint(SinglePointToMultiPointIntent),
    /// Explicit path
    Path(PathIntent),
    /// Legacy shortest path between two hosts
    ShortestPath(ShortestPathIntent),
}

impl Intent {
    /// Intent id
    pub fn id(&self) -> IntentId {
        match self {
            Self::PointToPoint(i) => i.id,
            Self::MultiPointToSinglePoint(i) => i.id,
            Self::SinglePointToMultiPoint(i) => i.id,
            Self::Path(i) => i.id,
            Self::ShortestPath(i) => i.id,
        }
    }

    /// Kind of the intent
    pub fn kind(&self) -> IntentKind {
        match self {
            Self::PointToPoint(_) => IntentKind::PointToPoint,
            Self::MultiPointToSinglePoint(_) => IntentKind::MultiPointToSinglePoint,
            Self::SinglePointToMultiPoint(_) => IntentKind::SinglePointToMultiPoint,
            Self::Path(_) => IntentKind::Path,
            Self::ShortestPath(_) => IntentKind::ShortestPath,
        }
    }

    /// Bandwidth requested by the intent
    pub fn bandwidth(&self) -> Option<Bandwidth> {
        match self {
            Self::PointToPoint(i) => i.bandwidth,
            Self::ShortestPath(i) => i.bandwidth,
            _ => None,
        }
    }
}

impl From<PointToPointIntent> for Intent {
    fn from(i: PointToPointIntent) -> Self {
        Self::PointToPoint(i)
    }
}

impl From<MultiPointToSinglePointIntent> for Intent {
    fn from(i: MultiPointToSinglePointIntent) -> Self {
        Self::MultiPointToSinglePoint(i)
    }
}

impl From<SinglePointToMultiPointIntent> for Intent {
    fn from(i: SinglePointToMultiPointIntent) -> Self {
        Self::SinglePointToMultiPoint(i)
    }
}

impl From<PathIntent> for Intent {
    fn from(i: PathIntent) -> Self {
        Self::Path(i)
    }
}

impl From<ShortestPathIntent> for Intent {
    fn from(i: ShortestPathIntent) -> Self {
        Self::ShortestPath(i)
    }
}

/// Result of the compilation of an intent: a single flow, ready to be installed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallableIntent {
    /// Id of the installable intent itself
    pub id: IntentId,
    /// Id of the intent this was compiled from
    pub parent: IntentId,
    /// The compiled flow
    pub flow: Flow,
    /// Bandwidth to reserve on all links of the flow once it is installed
    pub bandwidth: Option<Bandwidth>,
}

impl InstallableIntent {
    /// All links used by the flow
    pub fn links(&self) -> Vec<LinkTuple> {
        self.flow.links()
    }
}

/// Error while compiling, installing or withdrawing an intent
#[derive(Error, Debug)]
pub enum IntentError {
    /// The compiler cannot handle this kind of match
    #[error("Intent has an unsupported type of match: {0}")]
    UnsupportedMatch(Match),
    /// A switch is missing or no route exists. The topology may change, so retrying later can
    /// succeed.
    #[error("Path not found: {0}")]
    PathNotFound(String),
    /// The compiled flow is malformed
    #[error("Flow Error: {0}")]
    Flow(#[from] FlowError),
    /// The given route is invalid
    #[error("Invalid path: {0}")]
    InvalidPath(#[from] PathError),
    /// No compiler is registered for this kind of intent
    #[error("No compiler registered for {0} intents")]
    NoCompiler(IntentKind),
    /// No identifier could be allocated
    #[error("Id Error: {0}")]
    IdError(#[from] IdError),
    /// The flow manager did not accept the flow
    #[error("The flow manager rejected {0}")]
    Rejected(FlowId),
    /// The flow reached the failed state while being installed
    #[error("Installation of {flow} failed: {reason}")]
    InstallationFailed {
        /// The flow
        flow: FlowId,
        /// Description of the failure
        reason: String,
    },
    /// The flow reached the failed state while being removed
    #[error("Removal of {0} failed")]
    RemovalFailed(FlowId),
    /// The flow did not reach a final state in time
    #[error("{flow} did not reach a final state within {timeout_ms}ms")]
    Timeout {
        /// The flow
        flow: FlowId,
        /// The timeout that elapsed
        timeout_ms: u128,
    },
    /// Waiting for the flow was interrupted before it reached a final state
    #[error("Waiting for {0} was interrupted")]
    Interrupted(FlowId),
    /// A compile worker thread panicked
    #[error("The compile worker of {0} did not finish")]
    WorkerFailed(IntentId),
    /// The intent is not known
    #[error("{0} does not exist")]
    IntentNotFound(IntentId),
    /// An intent with the same id is already known
    #[error("{0} already exists")]
    DuplicateIntent(IntentId),
    /// The state machine does not allow the transition
    #[error("Invalid transition from {from} on {trigger}")]
    InvalidTransition {
        /// Current state
        from: IntentState,
        /// The trigger that was applied
        trigger: IntentTrigger,
    },
}

impl IntentError {
    /// Classify the error for the state machine.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::PathNotFound(_) => FailureKind::PathNotFound,
            Self::Rejected(_)
            | Self::InstallationFailed { .. }
            | Self::RemovalFailed(_)
            | Self::Timeout { .. }
            | Self::Interrupted(_) => FailureKind::InstallationFailed,
            Self::IdError(_) | Self::WorkerFailed(_) => FailureKind::InstallationFailed,
            Self::UnsupportedMatch(_)
            | Self::Flow(_)
            | Self::InvalidPath(_)
            | Self::NoCompiler(_)
            | Self::IntentNotFound(_)
            | Self::DuplicateIntent(_)
            | Self::InvalidTransition { .. } => FailureKind::CompileRejected,
        }
    }
}
