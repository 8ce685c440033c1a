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

//! Module containing the path flows

use super::phases::two_phases;
use super::FlowError;
use crate::id::{FlowId, IdGenerators};
use crate::matchaction::{
    Action, Match, MatchActionOperations, OpticalMatch, Operator, PacketMatch,
};
use crate::path::Path;
use crate::topology::{PortNumber, SwitchPort};
use serde::{Deserialize, Serialize};

type Entry = (SwitchPort, Match, Vec<Action>);

/// Split a path into the entry at the head switch, and one entry per link at the port where the
/// link arrives. Every arriving port forwards to the next link, or applies the egress actions.
fn path_entries(
    ingress_port: PortNumber,
    path: &Path,
    head: (Match, Vec<Action>),
    hop_match: Match,
    egress_actions: &[Action],
) -> Result<(Vec<Entry>, Entry), FlowError> {
    let links = path.links();
    let first = links.first().ok_or(FlowError::EmptyPath)?;

    let (head_match, mut head_actions) = head;
    head_actions.push(Action::Output(first.src.port));
    let head_port = SwitchPort { dpid: first.src.dpid, port: ingress_port };
    let head_entry = (head_port, head_match, head_actions);

    let hops = links
        .iter()
        .enumerate()
        .map(|(i, link)| {
            let actions = match links.get(i + 1) {
                Some(next) => vec![Action::Output(next.src.port)],
                None => egress_actions.to_vec(),
            };
            (link.dst, hop_match, actions)
        })
        .collect();

    Ok((hops, head_entry))
}

/// # Packet Path Flow
/// Flow along an explicit path. Packets arriving at the ingress port of the first switch and
/// matching the packet match are forwarded along the path, and the egress actions are applied at
/// the last switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketPathFlow {
    id: FlowId,
    matching: PacketMatch,
    ingress_port: PortNumber,
    path: Path,
    egress_actions: Vec<Action>,
    hard_timeout: u16,
    idle_timeout: u16,
}

impl PacketPathFlow {
    /// Create a new path flow. Timeouts are in seconds, zero means no timeout.
    pub fn new(
        id: FlowId,
        matching: PacketMatch,
        ingress_port: PortNumber,
        path: Path,
        egress_actions: Vec<Action>,
        hard_timeout: u16,
        idle_timeout: u16,
    ) -> Self {
        Self { id, matching, ingress_port, path, egress_actions, hard_timeout, idle_timeout }
    }

    /// Flow id
    pub fn id(&self) -> FlowId {
        self.id
    }

    /// Packet match at the ingress port
    pub fn matching(&self) -> &PacketMatch {
        &self.matching
    }

    /// Ingress port at the first switch of the path
    pub fn ingress_port(&self) -> PortNumber {
        self.ingress_port
    }

    /// Ingress switch port, or `None` if the path is empty
    pub fn ingress_switch_port(&self) -> Option<SwitchPort> {
        self.path.src_dpid().map(|dpid| SwitchPort { dpid, port: self.ingress_port })
    }

    /// The path from the ingress to the egress switch
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Actions applied at the egress switch
    pub fn egress_actions(&self) -> &[Action] {
        &self.egress_actions
    }

    /// Hard timeout in seconds
    pub fn hard_timeout(&self) -> u16 {
        self.hard_timeout
    }

    /// Idle timeout in seconds
    pub fn idle_timeout(&self) -> u16 {
        self.idle_timeout
    }

    /// Compile the flow into two phases. For [`Operator::Add`], the first phase contains one
    /// entry for every link of the path (at the port where the link arrives), and the second
    /// phase the single entry of the head switch. [`Operator::Remove`] uses the reverse order.
    pub fn compile(
        &self,
        operator: Operator,
        ids: &IdGenerators,
    ) -> Result<Vec<MatchActionOperations>, FlowError> {
        let matching = Match::Packet(self.matching);
        let (hops, head) = path_entries(
            self.ingress_port,
            &self.path,
            (matching, Vec::new()),
            matching,
            &self.egress_actions,
        )?;
        two_phases(operator, ids, hops, vec![head])
    }
}

/// # Optical Path Flow
/// Flow of a wavelength along an explicit path. The head switch assigns the wavelength to all
/// traffic arriving at the ingress port, and every following switch matches on the wavelength.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpticalPathFlow {
    id: FlowId,
    ingress_port: PortNumber,
    path: Path,
    egress_actions: Vec<Action>,
    lambda: u32,
}

impl OpticalPathFlow {
    /// Create a new optical path flow
    pub fn new(
        id: FlowId,
        ingress_port: PortNumber,
        path: Path,
        egress_actions: Vec<Action>,
        lambda: u32,
    ) -> Self {
        Self { id, ingress_port, path, egress_actions, lambda }
    }

    /// Flow id
    pub fn id(&self) -> FlowId {
        self.id
    }

    /// Match on the wavelength of this flow
    pub fn matching(&self) -> OpticalMatch {
        OpticalMatch { lambda: Some(self.lambda) }
    }

    /// Ingress port at the first switch of the path
    pub fn ingress_port(&self) -> PortNumber {
        self.ingress_port
    }

    /// Ingress switch port, or `None` if the path is empty
    pub fn ingress_switch_port(&self) -> Option<SwitchPort> {
        self.path.src_dpid().map(|dpid| SwitchPort { dpid, port: self.ingress_port })
    }

    /// The path from the ingress to the egress switch
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Actions applied at the egress switch
    pub fn egress_actions(&self) -> &[Action] {
        &self.egress_actions
    }

    /// Wavelength
    pub fn lambda(&self) -> u32 {
        self.lambda
    }

    /// Compile the flow, with the same phase order as the [`PacketPathFlow`].
    pub fn compile(
        &self,
        operator: Operator,
        ids: &IdGenerators,
    ) -> Result<Vec<MatchActionOperations>, FlowError> {
        let head = (Match::Packet(PacketMatch::wildcard()), vec![Action::SetLambda(self.lambda)]);
        let (hops, head) = path_entries(
            self.ingress_port,
            &self.path,
            head,
            Match::Optical(self.matching()),
            &self.egress_actions,
        )?;
        two_phases(operator, ids, hops, vec![head])
    }
}
