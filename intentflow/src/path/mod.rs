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

//! # Path and Tree Computation
//!
//! This module contains the [`Path`] and [`Tree`] structures, and the algorithms computing them
//! on a topology snapshot: the [`ConstrainedBfsTree`] (single upstream link per switch, with an
//! optional bandwidth constraint) and the [`EcmpShortestPathGraph`] (all equal cost paths). The
//! [`BandwidthLedger`] keeps track of the bandwidth reserved on each link.

mod bandwidth;
mod bfs_tree;
mod ecmp;
mod links;

pub use bandwidth::BandwidthLedger;
pub use bfs_tree::{BandwidthConstraint, ConstrainedBfsTree, SearchDirection};
pub use ecmp::EcmpShortestPathGraph;
pub use links::{Path, PathError, Tree};
