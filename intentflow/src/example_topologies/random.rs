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

//! # Random Topology

use super::TopologyBuilder;
use crate::topology::{Bandwidth, TopologyError, TopologySnapshot};
use rand::prelude::*;

/// Random topology with `n` switches, where every pair of switches is linked with probability
/// `p`. The same seed always yields the same topology. The topology is not necessarily
/// connected.
pub fn random_topology(
    n: usize,
    p: f64,
    capacity: Bandwidth,
    seed: u64,
) -> Result<TopologySnapshot, TopologyError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let p = if p.is_nan() { 0.0 } else { p.max(0.0).min(1.0) };
    let mut builder = TopologyBuilder::with_switches(n)?;
    for a in 1..=n as u64 {
        for b in (a + 1)..=n as u64 {
            if rng.gen_bool(p) {
                builder.connect(a, b, capacity)?;
            }
        }
    }
    Ok(builder.build())
}
