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

//! Topologies for testing and experimenting
//!
//! All switches are named `S{dpid}`, with dpids starting at 1. Ports towards other switches are
//! numbered from 10 upwards on every switch, so the ports below 10 are free to attach hosts.

use crate::topology::{Bandwidth, Dpid, SwitchPort, TopologyError, TopologySnapshot};
use std::collections::HashMap;

mod grid;
pub use grid::GridTopology;

mod line;
pub use line::LineTopology;

mod random;
pub use random::random_topology;

mod ring;
pub use ring::RingTopology;

/// First port number used for links between switches
pub const FIRST_LINK_PORT: u32 = 10;

/// Trait for easier access to example topologies.
pub trait ExampleTopology {
    /// Build the topology of the given size, where every link has the same capacity in both
    /// directions.
    fn topology(size: usize, capacity: Bandwidth) -> Result<TopologySnapshot, TopologyError>;
}

/// Helper to build a topology, assigning the next free port on both switches to every link.
#[derive(Debug, Default)]
pub(crate) struct TopologyBuilder {
    topology: TopologySnapshot,
    next_port: HashMap<Dpid, u32>,
}

impl TopologyBuilder {
    /// Create a builder with the switches `S1` to `Sn`.
    pub(crate) fn with_switches(n: usize) -> Result<Self, TopologyError> {
        let mut builder = Self::default();
        for dpid in 1..=n as u64 {
            builder.topology.add_switch(Dpid(dpid))?;
        }
        Ok(builder)
    }

    fn port(&mut self, dpid: Dpid) -> SwitchPort {
        let next = self.next_port.entry(dpid).or_insert(FIRST_LINK_PORT);
        let port = SwitchPort { dpid, port: (*next).into() };
        *next += 1;
        port
    }

    /// Link the two switches in both directions.
    pub(crate) fn connect(
        &mut self,
        a: u64,
        b: u64,
        capacity: Bandwidth,
    ) -> Result<(), TopologyError> {
        let pa = self.port(Dpid(a));
        let pb = self.port(Dpid(b));
        self.topology.add_bidirectional_link(pa, pb, capacity)
    }

    pub(crate) fn build(self) -> TopologySnapshot {
        self.topology
    }
}
