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

//! # Intent Manager
//!
//! Drives every intent through its lifecycle: compilation, installation of the compiled flows,
//! withdrawal and rerouting. Compilation and installation happen on the calling thread, and the
//! intent table is never locked while doing so.
//!
//! An intent that is being worked on by some thread is *in flight*. Withdrawing an in-flight
//! intent only moves it to `WITHDRAWING` (or `WITHDRAWN`, if nothing was compiled yet). The
//! working thread notices this at its next step, and removes everything it already installed.

use super::{
    CompilerRegistry, FlowInstaller, InstallableIntent, Intent, IntentError, IntentLog,
    IntentLogEntry, IntentState, IntentTrigger,
};
use crate::config::ControllerConfig;
use crate::flow::FlowState;
use crate::flowmanager::{FlowManagerService, ListenerId};
use crate::id::IntentId;
use crate::path::BandwidthLedger;
use crate::sync::{lock, read, write};
use crate::topology::{LinkTuple, TopologyService};
use log::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, TryLockError};
use std::time::SystemTime;

/// Change of the state of an intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentEvent {
    /// The intent
    pub intent: IntentId,
    /// The new state
    pub state: IntentState,
    /// The state before, or `None` if the intent was just created
    pub previous: Option<IntentState>,
    /// When the change happened
    pub time: SystemTime,
}

/// Listener for intent events. Events are delivered after the change is visible in the manager.
pub trait IntentEventListener: Send + Sync {
    /// Called for every state change
    fn event(&self, event: &IntentEvent);
}

#[derive(Debug)]
struct IntentRecord {
    intent: Intent,
    state: IntentState,
    installables: Vec<InstallableIntent>,
    log: IntentLog,
    path_frozen: bool,
    in_flight: bool,
    last_error: Option<String>,
}

impl IntentRecord {
    fn apply(&mut self, trigger: IntentTrigger) -> Result<IntentEvent, IntentError> {
        let previous = self.state;
        let state = previous.next(trigger)?;
        self.state = state;
        self.log.record(previous, state, trigger);
        trace!("{}: {} -> {} on {}", self.intent.id(), previous, state, trigger);
        Ok(IntentEvent {
            intent: self.intent.id(),
            state,
            previous: Some(previous),
            time: SystemTime::now(),
        })
    }

    fn links(&self) -> BTreeSet<LinkTuple> {
        self.installables.iter().flat_map(|i| i.links()).collect()
    }
}

/// Outcome of advancing an in-flight intent
enum Progress {
    Advanced(IntentState),
    Cancelled(IntentState),
}

/// # Intent Manager
/// Owner of all intents. See the [module documentation](self).
pub struct IntentManager {
    registry: CompilerRegistry,
    installer: FlowInstaller,
    topology: Arc<dyn TopologyService>,
    ledger: Arc<BandwidthLedger>,
    log_size: usize,
    compile_threads: Option<usize>,
    intents: Mutex<BTreeMap<IntentId, IntentRecord>>,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn IntentEventListener>)>>,
    next_listener: AtomicU64,
    pending: Mutex<Vec<IntentEvent>>,
    delivery: Mutex<()>,
}

impl std::fmt::Debug for IntentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("IntentManager")
            .field("registry", &self.registry)
            .field("installer", &self.installer)
            .field("intents", &lock(&self.intents).len())
            .finish()
    }
}

impl IntentManager {
    /// Create a new intent manager.
    pub fn new(
        registry: CompilerRegistry,
        flow_manager: Arc<dyn FlowManagerService>,
        topology: Arc<dyn TopologyService>,
        ledger: Arc<BandwidthLedger>,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            registry,
            installer: FlowInstaller::new(flow_manager, config.install_timeout()),
            topology,
            ledger,
            log_size: config.intent_log_size,
            compile_threads: config.compile_threads,
            intents: Mutex::new(BTreeMap::new()),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            pending: Mutex::new(Vec::new()),
            delivery: Mutex::new(()),
        }
    }

    /// Submit the intent, compile it against the current topology, and install all of its flows.
    /// Returns the final state, or the error that caused the intent to fail. The state of the
    /// intent is updated in both cases.
    pub fn submit(&self, intent: Intent) -> Result<IntentState, IntentError> {
        let id = intent.id();
        self.register(intent.clone())?;
        let topology = self.topology.snapshot();
        let compiled = self.registry.compile(&intent, &topology);
        self.process_compiled(id, compiled)
    }

    /// Submit many intents at once. All intents are compiled in parallel, and installed one after
    /// the other. The result at position `i` belongs to the intent at position `i`.
    pub fn submit_all(&self, intents: Vec<Intent>) -> Vec<Result<IntentState, IntentError>> {
        let mut results: Vec<Option<Result<IntentState, IntentError>>> =
            intents.iter().map(|_| None).collect();
        let mut accepted = Vec::with_capacity(intents.len());
        let mut positions = Vec::with_capacity(intents.len());
        for (i, intent) in intents.into_iter().enumerate() {
            match self.register(intent.clone()) {
                Ok(()) => {
                    positions.push(i);
                    accepted.push(intent);
                }
                Err(e) => results[i] = Some(Err(e)),
            }
        }

        let ids: Vec<IntentId> = accepted.iter().map(|i| i.id()).collect();
        let topology = self.topology.snapshot();
        let compiled = self.registry.compile_parallel(accepted, topology, self.compile_threads);
        for ((i, id), c) in positions.into_iter().zip(ids).zip(compiled) {
            results[i] = Some(self.process_compiled(id, c));
        }

        results.into_iter().flatten().collect()
    }

    /// Withdraw the intent and remove all of its flows. If the intent is in flight, it is only
    /// marked, and the thread working on it removes the flows.
    pub fn withdraw(&self, id: IntentId) -> Result<IntentState, IntentError> {
        let (state, in_flight) = {
            let mut records = lock(&self.intents);
            let record = records.get_mut(&id).ok_or(IntentError::IntentNotFound(id))?;
            if record.state == IntentState::Withdrawing {
                return Ok(IntentState::Withdrawing);
            }
            let event = record.apply(IntentTrigger::Withdraw)?;
            lock(&self.pending).push(event);
            (record.state, record.in_flight)
        };
        self.deliver();
        info!("Withdrawing {} ({})", id, state);

        match (state, in_flight) {
            (_, true) => Ok(state),
            (IntentState::Withdrawing, false) => self.finish_withdrawal(id),
            (_, false) => {
                // nothing was installed, but failed flows may still be known to the flow manager
                let installables = self.installables(id)?;
                match self.remove_flows(&installables) {
                    Ok(()) => {
                        self.ledger.release(id);
                        Ok(state)
                    }
                    Err(e) => self.fail_withdrawal(id, e),
                }
            }
        }
    }

    /// Recompile the intent against the current topology, and replace its flows if the route
    /// changed. Nothing happens if the path of the intent is frozen, or if the new route is equal
    /// to the old one.
    pub fn reroute(&self, id: IntentId) -> Result<IntentState, IntentError> {
        let (intent, old_links, state) = {
            let mut records = lock(&self.intents);
            let record = records.get_mut(&id).ok_or(IntentError::IntentNotFound(id))?;
            if record.in_flight {
                debug!("Not rerouting {}: in flight", id);
                return Ok(record.state);
            }
            if !matches!(record.state, IntentState::Installed | IntentState::InstNack) {
                return Err(IntentError::InvalidTransition {
                    from: record.state,
                    trigger: IntentTrigger::Reroute,
                });
            }
            if record.path_frozen {
                debug!("Not rerouting {}: path is frozen", id);
                return Ok(record.state);
            }
            record.in_flight = true;
            (record.intent.clone(), record.links(), record.state)
        };

        let compiled = self.registry.compile(&intent, &self.topology.snapshot());
        if let Ok(new) = &compiled {
            let new_links: BTreeSet<LinkTuple> = new.iter().flat_map(|i| i.links()).collect();
            if state == IntentState::Installed && new_links == old_links {
                debug!("Not rerouting {}: route did not change", id);
                return self.settle(id);
            }
        }

        if let Progress::Cancelled(s) = self.advance(id, IntentTrigger::Reroute, |_| {})? {
            return self.resolve(id, s);
        }
        let new = match compiled {
            Ok(new) => new,
            Err(e) => return self.abort(id, e),
        };
        let old = self.installables(id)?;
        if let Err(e) = self.remove_flows(&old) {
            return self.abort(id, e);
        }
        info!("Rerouting {}", id);
        self.process_compiled(id, Ok(new))
    }

    /// Reroute all installed intents that use any of the links.
    pub fn reroute_affected(
        &self,
        links: &[LinkTuple],
    ) -> Vec<(IntentId, Result<IntentState, IntentError>)> {
        let links: BTreeSet<&LinkTuple> = links.iter().collect();
        let affected: Vec<IntentId> = lock(&self.intents)
            .iter()
            .filter(|(_, r)| r.state == IntentState::Installed)
            .filter(|(_, r)| r.links().iter().any(|l| links.contains(l)))
            .map(|(id, _)| *id)
            .collect();
        debug!("{} intents are affected by the link change", affected.len());
        affected.into_iter().map(|id| (id, self.reroute(id))).collect()
    }

    /// Forget all withdrawn, failed and nacked intents. Intents with flows still known to the flow
    /// manager are kept. Returns the number of forgotten intents.
    pub fn purge(&self) -> usize {
        let flow_manager = self.installer.flow_manager();
        let mut records = lock(&self.intents);
        let before = records.len();
        records.retain(|_, r| {
            r.in_flight
                || !r.state.is_purgeable()
                || r.installables.iter().any(|i| flow_manager.get_flow_state(i.flow.id()).is_some())
        });
        before - records.len()
    }

    /// Freeze or unfreeze the path of the intent. A frozen intent is never rerouted.
    pub fn set_path_frozen(&self, id: IntentId, frozen: bool) -> Result<(), IntentError> {
        let mut records = lock(&self.intents);
        let record = records.get_mut(&id).ok_or(IntentError::IntentNotFound(id))?;
        record.path_frozen = frozen;
        Ok(())
    }

    /// Current state of the intent
    pub fn get_state(&self, id: IntentId) -> Option<IntentState> {
        lock(&self.intents).get(&id).map(|r| r.state)
    }

    /// Copy of the intent
    pub fn get_intent(&self, id: IntentId) -> Option<Intent> {
        lock(&self.intents).get(&id).map(|r| r.intent.clone())
    }

    /// Point in time copy of all intents with their state
    pub fn get_intents(&self) -> Vec<(Intent, IntentState)> {
        lock(&self.intents).values().map(|r| (r.intent.clone(), r.state)).collect()
    }

    /// The installable intents the intent was compiled into
    pub fn get_installables(&self, id: IntentId) -> Option<Vec<InstallableIntent>> {
        lock(&self.intents).get(&id).map(|r| r.installables.clone())
    }

    /// The most recent transitions of the intent, oldest first
    pub fn get_log(&self, id: IntentId) -> Option<Vec<IntentLogEntry>> {
        lock(&self.intents).get(&id).map(|r| r.log.entries().cloned().collect())
    }

    /// The last error of the intent
    pub fn get_last_error(&self, id: IntentId) -> Option<String> {
        lock(&self.intents).get(&id).and_then(|r| r.last_error.clone())
    }

    /// Ledger with the bandwidth reservations of the installed intents
    pub fn ledger(&self) -> &Arc<BandwidthLedger> {
        &self.ledger
    }

    /// Register a listener
    pub fn add_listener(&self, listener: Arc<dyn IntentEventListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        write(&self.listeners).push((id, listener));
        id
    }

    /// Unregister a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = write(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(l, _)| *l != id);
        listeners.len() != before
    }

    /// Insert the intent as `CREATED` and submit it.
    fn register(&self, intent: Intent) -> Result<(), IntentError> {
        let id = intent.id();
        {
            let mut records = lock(&self.intents);
            if records.contains_key(&id) {
                return Err(IntentError::DuplicateIntent(id));
            }
            let mut record = IntentRecord {
                intent,
                state: IntentState::Created,
                installables: Vec::new(),
                log: IntentLog::new(self.log_size),
                path_frozen: false,
                in_flight: true,
                last_error: None,
            };
            let mut pending = lock(&self.pending);
            pending.push(IntentEvent {
                intent: id,
                state: IntentState::Created,
                previous: None,
                time: SystemTime::now(),
            });
            pending.push(record.apply(IntentTrigger::Submit)?);
            records.insert(id, record);
        }
        self.deliver();
        Ok(())
    }

    /// Store the result of the compilation, and install the flows.
    fn process_compiled(
        &self,
        id: IntentId,
        compiled: Result<Vec<InstallableIntent>, IntentError>,
    ) -> Result<IntentState, IntentError> {
        let installables = match compiled {
            Ok(installables) => installables,
            Err(e) => return self.abort(id, e),
        };
        let stored = installables.clone();
        let progress = self.advance(id, IntentTrigger::CompileSucceeded, move |r| {
            r.installables = stored;
        })?;
        match progress {
            Progress::Advanced(_) => self.install_flows(id, &installables),
            Progress::Cancelled(s) => self.resolve(id, s),
        }
    }

    fn install_flows(
        &self,
        id: IntentId,
        installables: &[InstallableIntent],
    ) -> Result<IntentState, IntentError> {
        for installable in installables {
            if self.is_cancelled(id) {
                break;
            }
            if let Err(e) = self.installer.install_flow(installable.flow.clone()) {
                if let Err(cleanup) = self.remove_flows(installables) {
                    warn!("Cannot clean up the flows of {}: {}", id, cleanup);
                }
                return self.abort(id, e);
            }
        }

        let ledger = self.ledger.clone();
        let reservations: Vec<_> = installables
            .iter()
            .filter_map(|i| i.bandwidth.map(|bw| (i.links(), bw)))
            .collect();
        let progress = self.advance(id, IntentTrigger::InstallSucceeded, move |r| {
            r.in_flight = false;
            ledger.release(id);
            for (links, bw) in reservations {
                ledger.reserve(id, links, bw);
            }
        })?;
        match progress {
            Progress::Advanced(state) => {
                info!("{} is installed", id);
                Ok(state)
            }
            Progress::Cancelled(s) => self.resolve(id, s),
        }
    }

    /// Apply the trigger to an in-flight intent, unless it was withdrawn in the meantime.
    fn advance<F>(
        &self,
        id: IntentId,
        trigger: IntentTrigger,
        update: F,
    ) -> Result<Progress, IntentError>
    where
        F: FnOnce(&mut IntentRecord),
    {
        let progress = {
            let mut records = lock(&self.intents);
            let record = records.get_mut(&id).ok_or(IntentError::IntentNotFound(id))?;
            if matches!(record.state, IntentState::Withdrawing | IntentState::Withdrawn) {
                record.in_flight = false;
                Progress::Cancelled(record.state)
            } else {
                let event = record.apply(trigger)?;
                lock(&self.pending).push(event);
                update(record);
                Progress::Advanced(record.state)
            }
        };
        self.deliver();
        Ok(progress)
    }

    /// Finish a cancelled in-flight intent.
    fn resolve(&self, id: IntentId, state: IntentState) -> Result<IntentState, IntentError> {
        info!("{} was withdrawn while in flight", id);
        match state {
            IntentState::Withdrawing => self.finish_withdrawal(id),
            state => Ok(state),
        }
    }

    /// Mark an in-flight intent as failed, and return the error.
    fn abort(&self, id: IntentId, error: IntentError) -> Result<IntentState, IntentError> {
        let reason = error.to_string();
        let trigger = IntentTrigger::Error(error.failure_kind());
        let progress = self.advance(id, trigger, move |r| {
            r.in_flight = false;
            r.last_error = Some(reason);
        })?;
        match progress {
            Progress::Advanced(state) => {
                warn!("{} is {}: {}", id, state, error);
                Err(error)
            }
            Progress::Cancelled(s) => self.resolve(id, s),
        }
    }

    /// Leave the in-flight state without any transition.
    fn settle(&self, id: IntentId) -> Result<IntentState, IntentError> {
        let state = {
            let mut records = lock(&self.intents);
            let record = records.get_mut(&id).ok_or(IntentError::IntentNotFound(id))?;
            record.in_flight = false;
            record.state
        };
        match state {
            IntentState::Withdrawing => self.finish_withdrawal(id),
            state => Ok(state),
        }
    }

    fn is_cancelled(&self, id: IntentId) -> bool {
        lock(&self.intents)
            .get(&id)
            .map_or(true, |r| matches!(r.state, IntentState::Withdrawing | IntentState::Withdrawn))
    }

    fn installables(&self, id: IntentId) -> Result<Vec<InstallableIntent>, IntentError> {
        self.get_installables(id).ok_or(IntentError::IntentNotFound(id))
    }

    /// Remove all flows of a `WITHDRAWING` intent, and move it to `WITHDRAWN` or `DEL_PENDING`.
    fn finish_withdrawal(&self, id: IntentId) -> Result<IntentState, IntentError> {
        let installables = self.installables(id)?;
        if let Err(e) = self.remove_flows(&installables) {
            return self.fail_withdrawal(id, e);
        }
        let state = {
            let mut records = lock(&self.intents);
            let record = records.get_mut(&id).ok_or(IntentError::IntentNotFound(id))?;
            self.ledger.release(id);
            let event = record.apply(IntentTrigger::WithdrawSucceeded)?;
            lock(&self.pending).push(event);
            record.state
        };
        self.deliver();
        info!("{} is withdrawn", id);
        Ok(state)
    }

    /// Record an error that happened while removing the flows of a withdrawn intent.
    fn fail_withdrawal(
        &self,
        id: IntentId,
        error: IntentError,
    ) -> Result<IntentState, IntentError> {
        let state = {
            let mut records = lock(&self.intents);
            let record = records.get_mut(&id).ok_or(IntentError::IntentNotFound(id))?;
            record.last_error = Some(error.to_string());
            let event = record.apply(IntentTrigger::Error(error.failure_kind()))?;
            lock(&self.pending).push(event);
            record.state
        };
        self.deliver();
        warn!("{} is {}: {}", id, state, error);
        Err(error)
    }

    /// Remove every flow that is still installed, or that failed. Flows that are still being
    /// installed are marked, and the flow manager removes them once they are settled. Continues
    /// after errors, and returns the first one.
    fn remove_flows(&self, installables: &[InstallableIntent]) -> Result<(), IntentError> {
        let flow_manager = self.installer.flow_manager();
        let mut first_error = None;
        for installable in installables {
            let id = installable.flow.id();
            let in_flight = matches!(
                flow_manager.get_flow_state(id),
                Some(FlowState::Submitted) | Some(FlowState::Compiled)
            );
            if in_flight && flow_manager.mark_for_removal(id) {
                debug!("{} is still being installed, removing it afterwards", id);
                continue;
            }
            match flow_manager.get_flow_state(id) {
                Some(FlowState::Installed) | Some(FlowState::Failed) => {}
                _ => continue,
            }
            if let Err(e) = self.installer.remove_flow(id) {
                warn!("Cannot remove {}: {}", id, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Deliver all queued events. Does nothing if another thread is currently delivering; that
    /// thread picks up the new events before it finishes.
    fn deliver(&self) {
        loop {
            let guard = match self.delivery.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::WouldBlock) => return,
                Err(TryLockError::Poisoned(e)) => e.into_inner(),
            };
            loop {
                let events = std::mem::take(&mut *lock(&self.pending));
                if events.is_empty() {
                    break;
                }
                let listeners: Vec<Arc<dyn IntentEventListener>> =
                    read(&self.listeners).iter().map(|(_, l)| l.clone()).collect();
                for event in events.iter() {
                    listeners.iter().for_each(|l| l.event(event));
                }
            }
            drop(guard);
            if lock(&self.pending).is_empty() {
                return;
            }
        }
    }
}
