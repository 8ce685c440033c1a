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

//! # Grid Topology

use super::{ExampleTopology, TopologyBuilder};
use crate::topology::{Bandwidth, TopologyError, TopologySnapshot};

/// # Grid
///
/// Square grid with `size` rows and columns. The switch in row `r` and column `c` (both starting
/// at 0) has the dpid `r * size + c + 1`.
///
/// ```text
/// S1 ---- S2 ---- S3
///  |       |       |
/// S4 ---- S5 ---- S6
///  |       |       |
/// S7 ---- S8 ---- S9
/// ```
pub struct GridTopology {}

impl ExampleTopology for GridTopology {
    fn topology(size: usize, capacity: Bandwidth) -> Result<TopologySnapshot, TopologyError> {
        let n = size as u64;
        let mut builder = TopologyBuilder::with_switches(size * size)?;
        for r in 0..n {
            for c in 0..n {
                let dpid = r * n + c + 1;
                if c + 1 < n {
                    builder.connect(dpid, dpid + 1, capacity)?;
                }
                if r + 1 < n {
                    builder.connect(dpid, dpid + n, capacity)?;
                }
            }
        }
        Ok(builder.build())
    }
}
