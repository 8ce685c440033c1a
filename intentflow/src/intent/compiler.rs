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

//! Compiler interface and registry

use super::{
    Intent, IntentError, IntentKind, InstallableIntent, MultiPointToSinglePointIntentCompiler,
    PathIntentCompiler, PointToPointIntentCompiler, ShortestPathIntentCompiler,
    SinglePointToMultiPointIntentCompiler,
};
use crate::id::IdGenerators;
use crate::matchaction::{Action, Match, PacketMatch};
use crate::path::BandwidthLedger;
use crate::sync::lock;
use crate::topology::{PortNumber, TopologySnapshot};
use log::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;

/// # Intent Compiler
/// Maps an intent and a topology snapshot to the installable intents. Compilers have no side
/// effects apart from drawing identifiers, and may be called from many threads at once.
pub trait IntentCompiler: Send + Sync {
    /// Compile the intent against the topology
    fn compile(
        &self,
        intent: &Intent,
        topology: &TopologySnapshot,
    ) -> Result<Vec<InstallableIntent>, IntentError>;
}

/// Registry mapping each kind of intent to its compiler
#[derive(Clone, Default)]
pub struct CompilerRegistry {
    compilers: HashMap<IntentKind, Arc<dyn IntentCompiler>>,
}

impl std::fmt::Debug for CompilerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.compilers.keys().collect();
        kinds.sort();
        f.debug_struct("CompilerRegistry").field("kinds", &kinds).finish()
    }
}

impl CompilerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the compilers for every kind of intent
    pub fn with_default_compilers(ids: IdGenerators, ledger: Arc<BandwidthLedger>) -> Self {
        let mut registry = Self::new();
        registry.register(
            IntentKind::PointToPoint,
            Arc::new(PointToPointIntentCompiler::new(ids.clone(), ledger.clone())),
        );
        registry.register(
            IntentKind::MultiPointToSinglePoint,
            Arc::new(MultiPointToSinglePointIntentCompiler::new(ids.clone())),
        );
        registry.register(
            IntentKind::SinglePointToMultiPoint,
            Arc::new(SinglePointToMultiPointIntentCompiler::new(ids.clone())),
        );
        registry.register(IntentKind::Path, Arc::new(PathIntentCompiler::new(ids.clone())));
        registry.register(
            IntentKind::ShortestPath,
            Arc::new(ShortestPathIntentCompiler::new(ids, ledger)),
        );
        registry
    }

    /// Register a compiler, replacing the previous one for the same kind.
    pub fn register(&mut self, kind: IntentKind, compiler: Arc<dyn IntentCompiler>) {
        if self.compilers.insert(kind, compiler).is_some() {
            debug!("Replaced the compiler for {} intents", kind);
        }
    }

    /// Get the compiler for the kind
    pub fn get(&self, kind: IntentKind) -> Option<Arc<dyn IntentCompiler>> {
        self.compilers.get(&kind).cloned()
    }

    /// Compile the intent with the compiler registered for its kind
    pub fn compile(
        &self,
        intent: &Intent,
        topology: &TopologySnapshot,
    ) -> Result<Vec<InstallableIntent>, IntentError> {
        let kind = intent.kind();
        let compiler = self.compilers.get(&kind).ok_or(IntentError::NoCompiler(kind))?;
        compiler.compile(intent, topology)
    }

    /// Compile many intents on `n_threads` worker threads (all cpus if `None`). The result at
    /// position `i` belongs to the intent at position `i`.
    pub fn compile_parallel(
        &self,
        intents: Vec<Intent>,
        topology: Arc<TopologySnapshot>,
        n_threads: Option<usize>,
    ) -> Vec<Result<Vec<InstallableIntent>, IntentError>> {
        let n_threads = n_threads.unwrap_or_else(num_cpus::get).clamp(1, intents.len().max(1));
        debug!("Compiling {} intents on {} threads", intents.len(), n_threads);

        let registry = Arc::new(self.clone());
        let ids: Vec<_> = intents.iter().map(|i| i.id()).collect();
        let queue = Arc::new(Mutex::new(intents.into_iter().enumerate().collect::<Vec<_>>()));

        let handles = (0..n_threads)
            .map(|_| {
                let r = registry.clone();
                let q = queue.clone();
                let t = topology.clone();
                thread::spawn(move || {
                    let mut results = Vec::new();
                    loop {
                        let job = lock(&q).pop();
                        match job {
                            Some((i, intent)) => results.push((i, r.compile(&intent, &t))),
                            None => break results,
                        }
                    }
                })
            })
            .collect::<Vec<_>>();

        let mut results: Vec<Option<Result<Vec<InstallableIntent>, IntentError>>> =
            ids.iter().map(|_| None).collect();
        for handle in handles {
            match handle.join() {
                Ok(done) => done.into_iter().for_each(|(i, r)| results[i] = Some(r)),
                Err(_) => error!("A compile worker panicked"),
            }
        }

        results
            .into_iter()
            .zip(ids)
            .map(|(r, id)| r.unwrap_or(Err(IntentError::WorkerFailed(id))))
            .collect()
    }
}

/// Only packet matches can be compiled into packet flows.
pub(super) fn packet_match(matching: &Match) -> Result<PacketMatch, IntentError> {
    matching.packet().copied().ok_or(IntentError::UnsupportedMatch(*matching))
}

/// The declared actions followed by the output to the egress port
pub(super) fn pack_actions(actions: &[Action], egress: PortNumber) -> Vec<Action> {
    actions.iter().copied().chain(std::iter::once(Action::Output(egress))).collect()
}
