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

//! Test the intent state machine and the transition log

use crate::intent::{FailureKind, IntentError, IntentLog, IntentState, IntentTrigger};
use std::collections::{HashSet, VecDeque};

use FailureKind::*;
use IntentState::*;
use IntentTrigger::*;

/// All states reachable from `CREATED`
fn reachable() -> HashSet<IntentState> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    seen.insert(Created);
    queue.push_back(Created);
    while let Some(state) = queue.pop_front() {
        for trigger in IntentTrigger::ALL.iter() {
            if let Ok(next) = state.next(*trigger) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }
    seen
}

#[test]
fn test_all_states_reachable() {
    let seen = reachable();
    for state in IntentState::ALL.iter() {
        assert!(seen.contains(state), "{} is not reachable", state);
    }
}

#[test]
fn test_transition_is_total() {
    for state in IntentState::ALL.iter() {
        for trigger in IntentTrigger::ALL.iter() {
            match state.next(*trigger) {
                Ok(_) => {}
                Err(IntentError::InvalidTransition { from, trigger: t }) => {
                    assert_eq!(from, *state);
                    assert_eq!(t, *trigger);
                }
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
    }
}

#[test]
fn test_errors_handled_everywhere() {
    for state in IntentState::ALL.iter() {
        for kind in [CompileRejected, PathNotFound, InstallationFailed].iter() {
            assert!(state.next(Error(*kind)).is_ok(), "{} does not handle {:?}", state, kind);
        }
    }
}

#[test]
fn test_failed_only_on_error() {
    for state in IntentState::ALL.iter() {
        for trigger in IntentTrigger::ALL.iter() {
            if state.next(*trigger).ok() == Some(Failed) {
                assert!(matches!(trigger, Error(_)), "{} -> FAILED on {}", state, trigger);
            }
        }
    }
    // compile rejection fails, every other error is retryable
    assert_eq!(Submitted.next(Error(CompileRejected)).unwrap(), Failed);
    assert_eq!(Submitted.next(Error(PathNotFound)).unwrap(), InstNack);
    assert_eq!(Compiled.next(Error(InstallationFailed)).unwrap(), InstNack);
    assert_eq!(Installed.next(Error(CompileRejected)).unwrap(), InstNack);
}

#[test]
fn test_lifecycle() {
    let mut state = Created;
    for trigger in [Submit, CompileSucceeded, InstallSucceeded].iter() {
        state = state.next(*trigger).unwrap();
    }
    assert_eq!(state, Installed);

    state = state.next(Reroute).unwrap();
    assert_eq!(state, RerouteReq);
    state = state.next(CompileSucceeded).unwrap().next(InstallSucceeded).unwrap();
    assert_eq!(state, Installed);

    state = state.next(Withdraw).unwrap();
    assert_eq!(state, Withdrawing);
    assert_eq!(state.next(Error(InstallationFailed)).unwrap(), DelPending);
    assert_eq!(DelPending.next(Withdraw).unwrap(), Withdrawing);
    assert_eq!(state.next(WithdrawSucceeded).unwrap(), Withdrawn);

    // cleanup after withdrawing a nacked intent failed
    assert_eq!(InstNack.next(Withdraw).unwrap(), Withdrawn);
    assert_eq!(Withdrawn.next(Error(InstallationFailed)).unwrap(), DelPending);
    assert_eq!(Withdrawn.next(Error(PathNotFound)).unwrap(), Withdrawn);
}

#[test]
fn test_invalid_transitions() {
    assert!(Created.next(InstallSucceeded).is_err());
    assert!(Installed.next(Submit).is_err());
    assert!(Withdrawn.next(Submit).is_err());
    assert!(Withdrawn.next(Withdraw).is_err());
    assert!(Failed.next(Reroute).is_err());
    assert!(Withdrawing.next(Withdraw).is_err());

    // nacked intents can be retried
    assert_eq!(InstNack.next(Submit).unwrap(), Submitted);
    assert_eq!(InstNack.next(Reroute).unwrap(), RerouteReq);
}

#[test]
fn test_state_properties() {
    let finals: Vec<_> = IntentState::ALL.iter().copied().filter(|s| s.is_final()).collect();
    assert_eq!(finals, vec![Installed, InstNack, Withdrawn, Failed]);
    let purgeable: Vec<_> = IntentState::ALL.iter().copied().filter(|s| s.is_purgeable()).collect();
    assert_eq!(purgeable, vec![InstNack, Withdrawn, Failed]);

    assert_eq!(InstNack.to_string(), "INST_NACK");
    assert_eq!(RerouteReq.to_string(), "REROUTE_REQ");
    assert_eq!(Error(PathNotFound).to_string(), "error(PathNotFound)");
}

#[test]
fn test_intent_log() {
    let mut log = IntentLog::new(3);
    assert!(log.is_empty());
    log.record(Created, Submitted, Submit);
    log.record(Submitted, Compiled, CompileSucceeded);
    log.record(Compiled, Installed, InstallSucceeded);
    log.record(Installed, Withdrawing, Withdraw);

    assert_eq!(log.len(), 3);
    assert_eq!(log.capacity(), 3);
    let triggers: Vec<_> = log.entries().map(|e| e.trigger).collect();
    assert_eq!(triggers, vec![CompileSucceeded, InstallSucceeded, Withdraw]);
    let first = log.entries().next().unwrap();
    assert_eq!((first.from, first.to), (Submitted, Compiled));

    let times: Vec<_> = log.entries().map(|e| e.time).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));

    // zero is rounded up
    let mut log = IntentLog::new(0);
    log.record(Created, Submitted, Submit);
    log.record(Submitted, Compiled, CompileSucceeded);
    assert_eq!(log.len(), 1);
}
