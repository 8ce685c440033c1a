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

//! Module containing the basic topology types

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Bandwidth of a link, or bandwidth reserved by an intent. May be infinite.
pub type Bandwidth = f64;

/// Datapath id of a switch
#[derive(
    PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize, Default,
)]
pub struct Dpid(pub u64);

/// Port number on a switch
#[derive(
    PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize, Default,
)]
pub struct PortNumber(pub u32);

impl From<u64> for Dpid {
    fn from(x: u64) -> Self {
        Self(x)
    }
}

impl From<u32> for PortNumber {
    fn from(x: u32) -> Self {
        Self(x)
    }
}

impl fmt::Display for Dpid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PortNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// # Switch Port
/// Attachment point in the network, given by the switch and the port number on that switch.
#[derive(
    PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize, Default,
)]
pub struct SwitchPort {
    /// Switch
    pub dpid: Dpid,
    /// Port on the switch
    pub port: PortNumber,
}

impl SwitchPort {
    /// Create a new switch port from the raw dpid and port number
    pub fn new(dpid: u64, port: u32) -> Self {
        Self { dpid: Dpid(dpid), port: PortNumber(port) }
    }
}

impl fmt::Display for SwitchPort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.dpid, self.port)
    }
}

/// Topology Error
#[derive(Error, Debug, PartialEq, Clone)]
pub enum TopologyError {
    /// The switch does not exist in the topology
    #[error("Switch not found: {0}")]
    SwitchNotFound(Dpid),
    /// The switch already exists in the topology
    #[error("Switch already exists: {0}")]
    DuplicateSwitch(Dpid),
    /// The link does not exist in the topology
    #[error("Link not found: {0} -> {1}")]
    LinkNotFound(SwitchPort, SwitchPort),
    /// The port is already occupied by another link
    #[error("Port is already used by another link: {0}")]
    PortInUse(SwitchPort),
    /// Links must connect two different switches
    #[error("Link connects the switch {0} with itself")]
    SelfLoop(Dpid),
    /// Link capacity must be non-negative
    #[error("Invalid link capacity: {0}")]
    InvalidCapacity(Bandwidth),
}
