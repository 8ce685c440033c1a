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

//! Module containing all error types

use crate::config::ConfigError;
use crate::flow::FlowError;
use crate::flowmanager::BatchRejection;
use crate::id::IdError;
use crate::intent::IntentError;
use crate::matchaction::MatchActionError;
use crate::path::PathError;
use crate::topology::TopologyError;
use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// Error propagated from the topology
    #[error("Topology Error: {0}")]
    TopologyError(#[from] TopologyError),
    /// Error while constructing a path or a tree
    #[error("Path Error: {0}")]
    PathError(#[from] PathError),
    /// Error while compiling a flow
    #[error("Flow Error: {0}")]
    FlowError(#[from] FlowError),
    /// Error reported by the match-action layer
    #[error("Match-Action Error: {0}")]
    MatchActionError(#[from] MatchActionError),
    /// Error during intent compilation or installation
    #[error("Intent Error: {0}")]
    IntentError(#[from] IntentError),
    /// No identifier could be allocated
    #[error("Id Error: {0}")]
    IdError(#[from] IdError),
    /// Invalid configuration
    #[error("Config Error: {0}")]
    ConfigError(#[from] ConfigError),
    /// The flow manager did not accept the batch
    #[error("The flow batch was rejected: {0}")]
    BatchRejected(#[from] BatchRejection),
}
