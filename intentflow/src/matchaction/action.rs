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

//! Module containing all actions

use super::MacAddress;
use crate::topology::PortNumber;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action applied to matched traffic. Actions of a match-action entry are applied in order.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Action {
    /// Forward out of the port
    Output(PortNumber),
    /// Rewrite the source MAC address
    ModifySrcMac(MacAddress),
    /// Rewrite the destination MAC address
    ModifyDstMac(MacAddress),
    /// Set the wavelength
    SetLambda(u32),
}

impl Action {
    /// Returns the output port if this is an output action
    pub fn output_port(&self) -> Option<PortNumber> {
        match self {
            Self::Output(p) => Some(*p),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Output(p) => write!(f, "output:{}", p),
            Self::ModifySrcMac(m) => write!(f, "set_src_mac:{}", m),
            Self::ModifyDstMac(m) => write!(f, "set_dst_mac:{}", m),
            Self::SetLambda(l) => write!(f, "set_lambda:{}", l),
        }
    }
}
