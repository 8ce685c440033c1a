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

//! # Intent State Machine
//!
//! ```text
//!            submit              compiled              installed
//!  CREATED ---------> SUBMITTED ---------> COMPILED ---------> INSTALLED
//!                         |                   |                  |    |
//!                         | error             | withdraw         |    | reroute
//!                         v                   v                  |    v
//!                  INST_NACK | FAILED    WITHDRAWING <-----------+  REROUTE_REQ
//!                                          |       |  error
//!                                          |       +-------> DEL_PENDING
//!                                          v
//!                                      WITHDRAWN
//! ```
//!
//! The transition function is total: every pair of state and trigger either yields the next state
//! or an explicit [`IntentError::InvalidTransition`]. `FAILED` is only ever reached through an
//! [`IntentTrigger::Error`] that carries a compile time rejection. Retryable errors (path not
//! found, installation failures) lead to `INST_NACK` instead, and errors during a withdrawal lead
//! to `DEL_PENDING`.

use super::IntentError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::time::SystemTime;

/// Lifecycle state of an intent
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum IntentState {
    /// Known, but not yet submitted
    Created,
    /// Submitted for compilation
    Submitted,
    /// Compiled, installation pending
    Compiled,
    /// All flows are installed
    Installed,
    /// Installation was not acknowledged. Can be retried.
    InstNack,
    /// Flows are being removed
    Withdrawing,
    /// Removal failed and waits for a retry
    DelPending,
    /// All flows are removed
    Withdrawn,
    /// Compilation was rejected
    Failed,
    /// A new route is being computed
    RerouteReq,
}

impl IntentState {
    /// All states
    pub const ALL: [IntentState; 10] = [
        Self::Created,
        Self::Submitted,
        Self::Compiled,
        Self::Installed,
        Self::InstNack,
        Self::Withdrawing,
        Self::DelPending,
        Self::Withdrawn,
        Self::Failed,
        Self::RerouteReq,
    ];

    /// Returns true if no further transition happens without an explicit request.
    pub fn is_final(self) -> bool {
        matches!(self, Self::Installed | Self::InstNack | Self::Withdrawn | Self::Failed)
    }

    /// Returns true if the intent can be forgotten.
    pub fn is_purgeable(self) -> bool {
        matches!(self, Self::InstNack | Self::Withdrawn | Self::Failed)
    }

    /// Apply the trigger and return the next state.
    pub fn next(self, trigger: IntentTrigger) -> Result<IntentState, IntentError> {
        use FailureKind::*;
        use IntentState::*;
        use IntentTrigger::*;
        let next = match (self, trigger) {
            (Created, Submit) => Submitted,
            (Created, Withdraw) => Withdrawn,
            (Created, Error(CompileRejected)) => Failed,
            (Created, Error(_)) => InstNack,

            (Submitted, CompileSucceeded) => Compiled,
            (Submitted, Withdraw) => Withdrawn,
            (Submitted, Error(CompileRejected)) => Failed,
            (Submitted, Error(_)) => InstNack,

            (Compiled, InstallSucceeded) => Installed,
            (Compiled, Withdraw) => Withdrawing,
            (Compiled, Error(CompileRejected)) => Failed,
            (Compiled, Error(_)) => InstNack,

            (Installed, Withdraw) => Withdrawing,
            (Installed, Reroute) => RerouteReq,
            (Installed, Error(_)) => InstNack,

            (RerouteReq, CompileSucceeded) => Compiled,
            (RerouteReq, Withdraw) => Withdrawing,
            (RerouteReq, Error(CompileRejected)) => Failed,
            (RerouteReq, Error(_)) => InstNack,

            (InstNack, Submit) => Submitted,
            (InstNack, Reroute) => RerouteReq,
            (InstNack, Withdraw) => Withdrawn,
            (InstNack, Error(_)) => InstNack,

            (Withdrawing, WithdrawSucceeded) => Withdrawn,
            (Withdrawing, Error(_)) => DelPending,

            (DelPending, Withdraw) => Withdrawing,
            (DelPending, WithdrawSucceeded) => Withdrawn,
            (DelPending, Error(_)) => DelPending,

            // the flows could not be cleaned up after the withdrawal
            (Withdrawn, Error(InstallationFailed)) => DelPending,
            (Withdrawn, Error(_)) => Withdrawn,

            (Failed, Withdraw) => Withdrawn,
            (Failed, Error(_)) => Failed,

            (from, trigger) => return Err(IntentError::InvalidTransition { from, trigger }),
        };
        Ok(next)
    }
}

impl fmt::Display for IntentState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::Submitted => "SUBMITTED",
            Self::Compiled => "COMPILED",
            Self::Installed => "INSTALLED",
            Self::InstNack => "INST_NACK",
            Self::Withdrawing => "WITHDRAWING",
            Self::DelPending => "DEL_PENDING",
            Self::Withdrawn => "WITHDRAWN",
            Self::Failed => "FAILED",
            Self::RerouteReq => "REROUTE_REQ",
        };
        write!(f, "{}", s)
    }
}

/// Classification of errors, as seen by the state machine
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum FailureKind {
    /// Non retryable rejection at compile time
    CompileRejected,
    /// No route exists in the current topology
    PathNotFound,
    /// A flow could not be installed or removed
    InstallationFailed,
}

/// Event that drives the state machine
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum IntentTrigger {
    /// The intent is submitted, or resubmitted after a nack
    Submit,
    /// Compilation succeeded
    CompileSucceeded,
    /// Every flow is installed
    InstallSucceeded,
    /// The intent is withdrawn
    Withdraw,
    /// Every flow is removed
    WithdrawSucceeded,
    /// The route must be recomputed
    Reroute,
    /// An operation failed
    Error(FailureKind),
}

impl IntentTrigger {
    /// All triggers
    pub const ALL: [IntentTrigger; 9] = [
        Self::Submit,
        Self::CompileSucceeded,
        Self::InstallSucceeded,
        Self::Withdraw,
        Self::WithdrawSucceeded,
        Self::Reroute,
        Self::Error(FailureKind::CompileRejected),
        Self::Error(FailureKind::PathNotFound),
        Self::Error(FailureKind::InstallationFailed),
    ];
}

impl fmt::Display for IntentTrigger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Submit => write!(f, "submit"),
            Self::CompileSucceeded => write!(f, "compile-succeeded"),
            Self::InstallSucceeded => write!(f, "install-succeeded"),
            Self::Withdraw => write!(f, "withdraw"),
            Self::WithdrawSucceeded => write!(f, "withdraw-succeeded"),
            Self::Reroute => write!(f, "reroute"),
            Self::Error(kind) => write!(f, "error({:?})", kind),
        }
    }
}

/// A single recorded transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentLogEntry {
    /// State before the transition
    pub from: IntentState,
    /// State after the transition
    pub to: IntentState,
    /// What caused the transition
    pub trigger: IntentTrigger,
    /// When the transition happened
    pub time: SystemTime,
}

/// Bounded log of the most recent transitions of an intent
#[derive(Debug, Clone)]
pub struct IntentLog {
    capacity: usize,
    entries: VecDeque<IntentLogEntry>,
}

impl IntentLog {
    /// Create a log keeping at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, entries: VecDeque::with_capacity(capacity) }
    }

    /// Record a transition, dropping the oldest one if the log is full.
    pub fn record(&mut self, from: IntentState, to: IntentState, trigger: IntentTrigger) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(IntentLogEntry { from, to, trigger, time: SystemTime::now() });
    }

    /// Recorded transitions, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &IntentLogEntry> {
        self.entries.iter()
    }

    /// Number of recorded transitions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
