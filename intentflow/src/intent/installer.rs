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

//! # Flow Installer
//!
//! Synchronous installation and removal of single flows. The installer registers a listener for
//! the target flow before submitting it, and blocks until the flow reaches a final state, the
//! timeout elapses, or the flow manager goes away. The listener is always unregistered again.

use super::IntentError;
use crate::flow::{Flow, FlowState};
use crate::flowmanager::{
    FlowManagerListener, FlowManagerService, FlowStatesChangedEvent, ListenerId,
};
use crate::id::FlowId;
use crate::sync::lock;
use log::*;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Listener that fires once, when the target flow reaches one of the final states.
struct SyncListener {
    target: FlowId,
    terminal: [FlowState; 2],
    sender: Mutex<SyncSender<FlowState>>,
}

impl FlowManagerListener for SyncListener {
    fn flow_states_changed(&self, event: &FlowStatesChangedEvent) {
        let reached = event
            .changes
            .iter()
            .filter(|c| c.flow == self.target)
            .map(|c| c.current)
            .find(|s| self.terminal.contains(s));
        if let Some(state) = reached {
            // only the first final state is of interest
            let _ = lock(&self.sender).try_send(state);
        }
    }
}

/// Unregisters the listener when dropped
struct ListenerGuard<'a> {
    flow_manager: &'a dyn FlowManagerService,
    id: ListenerId,
}

impl<'a> Drop for ListenerGuard<'a> {
    fn drop(&mut self) {
        if !self.flow_manager.remove_listener(self.id) {
            warn!("Listener {:?} was already removed", self.id);
        }
    }
}

/// # Flow Installer
/// Blocking helper on top of the [`FlowManagerService`].
#[derive(Clone)]
pub struct FlowInstaller {
    flow_manager: Arc<dyn FlowManagerService>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for FlowInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("FlowInstaller").field("timeout", &self.timeout).finish()
    }
}

impl FlowInstaller {
    /// Create a new installer. With a timeout of `None`, the installer waits forever.
    pub fn new(flow_manager: Arc<dyn FlowManagerService>, timeout: Option<Duration>) -> Self {
        Self { flow_manager, timeout }
    }

    /// The flow manager used by the installer
    pub fn flow_manager(&self) -> &Arc<dyn FlowManagerService> {
        &self.flow_manager
    }

    /// Install the flow and wait until it is installed.
    pub fn install_flow(&self, flow: Flow) -> Result<(), IntentError> {
        let id = flow.id();
        let (_guard, receiver) = self.listen(id, [FlowState::Installed, FlowState::Failed]);
        if self.flow_manager.add_flow(flow).is_none() {
            return Err(IntentError::Rejected(id));
        }
        match self.wait(id, &receiver)? {
            FlowState::Installed => {
                debug!("{} is installed", id);
                Ok(())
            }
            state => Err(IntentError::InstallationFailed {
                flow: id,
                reason: format!("flow reached {}", state),
            }),
        }
    }

    /// Remove the flow and wait until it is withdrawn.
    pub fn remove_flow(&self, id: FlowId) -> Result<(), IntentError> {
        let (_guard, receiver) = self.listen(id, [FlowState::Withdrawn, FlowState::Failed]);
        if self.flow_manager.remove_flow(id).is_none() {
            return Err(IntentError::Rejected(id));
        }
        match self.wait(id, &receiver)? {
            FlowState::Withdrawn => {
                debug!("{} is withdrawn", id);
                Ok(())
            }
            _ => Err(IntentError::RemovalFailed(id)),
        }
    }

    fn listen(
        &self,
        target: FlowId,
        terminal: [FlowState; 2],
    ) -> (ListenerGuard<'_>, Receiver<FlowState>) {
        let (sender, receiver) = mpsc::sync_channel(1);
        let listener = Arc::new(SyncListener { target, terminal, sender: Mutex::new(sender) });
        let id = self.flow_manager.add_listener(listener);
        (ListenerGuard { flow_manager: self.flow_manager.as_ref(), id }, receiver)
    }

    fn wait(&self, id: FlowId, receiver: &Receiver<FlowState>) -> Result<FlowState, IntentError> {
        match self.timeout {
            Some(timeout) => receiver.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => {
                    warn!("{} did not reach a final state in time", id);
                    IntentError::Timeout { flow: id, timeout_ms: timeout.as_millis() }
                }
                RecvTimeoutError::Disconnected => IntentError::Interrupted(id),
            }),
            None => receiver.recv().map_err(|_| IntentError::Interrupted(id)),
        }
    }
}
