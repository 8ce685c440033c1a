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

#![deny(missing_docs)]

//! # Intentflow: Intent Compilation and Flow Batch Execution
//!
//! This crate is the control-plane core of a software-defined network controller. It turns
//! declarative connectivity requests (*intents*) into concrete forwarding rules (*flows*, which
//! are compiled into match-action operations) installed across a set of switches, while
//! tracking the installation state of every flow, every intent and every batch of operations.
//!
//! ## Pipeline
//!
//! 1. An [`intent::Intent`] is compiled by an [`intent::IntentCompiler`] against an immutable
//!    [`topology::TopologySnapshot`]. The compilers use the constrained breadth-first search of
//!    the [`path`] module to find a route or a tree.
//! 2. The compiler emits one or more [`flow::Flow`]s. A flow compiles itself into an ordered
//!    sequence of [`matchaction::MatchActionOperations`] (the *phases*). Phase `N + 1` is never
//!    dispatched before phase `N` is confirmed, which prevents transient blackholes.
//! 3. The [`flowmanager::FlowManager`] accepts batches of flow operations, checks them against
//!    the configured [`flowmanager::ConflictDetectionPolicy`], and executes the phases on a
//!    [`matchaction::MatchActionService`]. State changes are published to registered listeners.
//! 4. The [`intent::IntentManager`] drives the intent state machine on top of all of this.
//!
//! ## Example
//!
//! ```
//! use intentflow::example_topologies::{ExampleTopology, LineTopology};
//! use intentflow::path::ConstrainedBfsTree;
//! use intentflow::topology::Dpid;
//!
//! let topo = LineTopology::topology(3, 10.0).unwrap();
//! let tree = ConstrainedBfsTree::new(&topo, Dpid(1));
//! let path = tree.get_path(Dpid(3)).unwrap();
//! assert_eq!(path.len(), 2);
//! ```

pub mod config;
pub mod error;
pub mod example_topologies;
pub mod flow;
pub mod flowmanager;
pub mod id;
pub mod intent;
pub mod matchaction;
pub mod path;
pub mod printer;
mod sync;
pub mod topology;

#[cfg(test)]
mod test;

pub use config::ControllerConfig;
pub use error::Error;
