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

//! Module containing all tests

use crate::example_topologies::TopologyBuilder;
use crate::matchaction::{
    InMemoryMatchActionService, MatchActionError, MatchActionOperations, MatchActionService,
};
use crate::topology::{Dpid, SwitchPort, TopologySnapshot};
use lazy_static::lazy_static;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[cfg(test)]
mod test_compilers;
#[cfg(test)]
mod test_intent_manager;
#[cfg(test)]
mod test_intent_state;
#[cfg(test)]
mod test_path;
#[cfg(test)]
mod test_printer;

/// Switches that take a while to confirm every phase
struct SlowSwitches {
    switches: Arc<InMemoryMatchActionService>,
    delay: Duration,
}

impl MatchActionService for SlowSwitches {
    fn execute_operations(&self, ops: &MatchActionOperations) -> Result<(), MatchActionError> {
        thread::sleep(self.delay);
        self.switches.execute_operations(ops)
    }
}

lazy_static! {
    static ref S1: Dpid = 1.into();
    static ref S2: Dpid = 2.into();
    static ref S3: Dpid = 3.into();
    static ref S4: Dpid = 4.into();
    static ref S5: Dpid = 5.into();
}

/// # Test topology
///
/// Every link exists in both directions. The number next to each switch is the port of the link.
///
/// ```text
///            10 S2 11
///         .---'    '---.
///        10             10
///  5 -- S1              S4 12 ---- 10 S5 -- 5
///        11             11
///         '---.    .---'
///            10 S3 11
/// ```
fn get_test_topo(capacity: f64) -> TopologySnapshot {
    let mut b = TopologyBuilder::with_switches(5).unwrap();
    b.connect(1, 2, capacity).unwrap();
    b.connect(1, 3, capacity).unwrap();
    b.connect(2, 4, capacity).unwrap();
    b.connect(3, 4, capacity).unwrap();
    b.connect(4, 5, capacity).unwrap();
    b.build()
}

/// Shorthand for a port
fn sp(dpid: u64, port: u32) -> SwitchPort {
    SwitchPort::new(dpid, port)
}
