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

//! # Helper (printer) functions
//! Formatted strings of paths, trees, phases and intent logs, with the switch names of the
//! topology inserted.

use crate::intent::IntentLogEntry;
use crate::matchaction::MatchActionOperations;
use crate::path::{Path, Tree};
use crate::topology::{LinkTuple, SwitchPort, TopologyError, TopologySnapshot};
use itertools::Itertools;
use std::time::UNIX_EPOCH;

/// Returns the name of the switch together with the port, like `S1:10`.
pub fn switch_port(topo: &TopologySnapshot, port: SwitchPort) -> Result<String, TopologyError> {
    Ok(format!("{}:{}", topo.get_switch_name(port.dpid)?, port.port))
}

/// Returns the formatted link, like `S1:10 -> S2:10`.
pub fn link(topo: &TopologySnapshot, link: &LinkTuple) -> Result<String, TopologyError> {
    Ok(format!("{} -> {}", switch_port(topo, link.src)?, switch_port(topo, link.dst)?))
}

/// Returns the sequence of switches of the path, like `S1 => S2 => S3`. An empty path is printed
/// as `(empty)`.
pub fn path(topo: &TopologySnapshot, path: &Path) -> Result<String, TopologyError> {
    if path.is_empty() {
        return Ok(String::from("(empty)"));
    }
    let names: Vec<&str> =
        path.dpids().into_iter().map(|d| topo.get_switch_name(d)).collect::<Result<_, _>>()?;
    Ok(names.join(" => "))
}

/// Returns one line for each link of the tree, sorted.
pub fn tree(topo: &TopologySnapshot, tree: &Tree) -> Result<Vec<String>, TopologyError> {
    tree.links().map(|l| link(topo, l)).collect()
}

/// Returns a vector of lines showing the phases in execution order. Each phase header is followed
/// by one indented line per entry.
pub fn phases(
    topo: &TopologySnapshot,
    phases: &[MatchActionOperations],
) -> Result<Vec<String>, TopologyError> {
    let mut result = Vec::new();
    for (i, phase) in phases.iter().enumerate() {
        result.push(format!("phase {} ({}, {} entries):", i + 1, phase.id(), phase.len()));
        for entry in phase.entries() {
            let target = &entry.target;
            result.push(format!(
                "    {} {} match: {} actions: [{}]",
                entry.operator,
                switch_port(topo, target.switch_port())?,
                target.matching(),
                target.actions().iter().join(", ")
            ));
        }
    }
    Ok(result)
}

/// Returns one line per transition, oldest first.
pub fn intent_log<'a, I>(log: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a IntentLogEntry>,
{
    log.into_iter()
        .map(|e| {
            let millis = e.time.duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or(0);
            format!("[{}] {} -> {} ({})", millis, e.from, e.to, e.trigger)
        })
        .collect()
}
