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

//! # Match-Action
//!
//! The switch rule model: match conditions, actions, single match-action entries, and ordered
//! batches of match-action operations, together with the interface of the external service that
//! executes them.

mod action;
mod operations;
mod packet_match;
mod service;

pub use action::Action;
pub use operations::{
    MatchAction, MatchActionOperationEntry, MatchActionOperations, MatchActionOperationsState,
    Operator,
};
pub use packet_match::{
    Ipv4Prefix, MacAddress, Match, OpticalMatch, PacketMatch, PacketMatchBuilder,
};
pub use service::{
    ExecutedOperations, InMemoryMatchActionService, MatchActionError, MatchActionService,
};
