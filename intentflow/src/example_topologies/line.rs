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

//! # Line Topology

use super::{ExampleTopology, TopologyBuilder};
use crate::topology::{Bandwidth, TopologyError, TopologySnapshot};

/// # Line
///
/// ```text
/// S1 ---- S2 ---- S3 ---- ... ---- Sn
/// ```
pub struct LineTopology {}

impl ExampleTopology for LineTopology {
    fn topology(size: usize, capacity: Bandwidth) -> Result<TopologySnapshot, TopologyError> {
        let mut builder = TopologyBuilder::with_switches(size)?;
        for a in 1..size as u64 {
            builder.connect(a, a + 1, capacity)?;
        }
        Ok(builder.build())
    }
}
