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

use intentflow::flowmanager::FlowManager;
use intentflow::id::IdGenerators;
use intentflow::intent::{CompilerRegistry, Intent, IntentManager, IntentState, PointToPointIntent};
use intentflow::matchaction::{InMemoryMatchActionService, Match, PacketMatch};
use intentflow::path::BandwidthLedger;
use intentflow::topology::{
    LinkTuple, SharedTopology, SwitchPort, TopologyError, TopologySnapshot,
};
use intentflow::ControllerConfig;

use log::*;
use rand::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::sync::Arc;
use std::time::Instant;

/// Port at which the hosts are attached to every switch
const HOST_PORT: u32 = 1;

/// Summary of a simulation run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Description of the topology
    pub topology: String,
    /// Number of switches
    pub num_switches: usize,
    /// Number of directed links
    pub num_links: usize,
    /// Number of submitted intents
    pub num_intents: usize,
    /// Intents that were installed
    pub installed: usize,
    /// Intents that could not be installed, but may be retried
    pub inst_nack: usize,
    /// Intents that were rejected by the compiler
    pub failed: usize,
    /// Time to compile and install all intents (in seconds)
    pub submit_time: f64,
    /// Number of rules on the switches after the submission
    pub num_rules: usize,
    /// The link that was cut after all intents were installed
    pub failed_link: Option<String>,
    /// Intents that were rerouted successfully after the link failure
    pub rerouted: usize,
    /// Intents that could not be rerouted
    pub reroute_failures: usize,
    /// Intents that were withdrawn at the end
    pub withdrawn: usize,
    /// Rules left on the switches after all intents were withdrawn
    pub remaining_rules: usize,
}

/// Submit random point to point intents, cut one of the used links, reroute the affected intents
/// and finally withdraw everything.
pub fn simulate(
    config: &ControllerConfig,
    topology_name: String,
    topo: TopologySnapshot,
    num_intents: usize,
    bandwidth: Option<f64>,
    seed: Option<u64>,
) -> Result<RunSummary, Box<dyn Error>> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let switches = topo.switches();
    if switches.len() < 2 {
        return Err("The topology needs at least two switches".into());
    }
    let num_switches = topo.num_switches();
    let num_links = topo.num_links();

    let ids = IdGenerators::local(config.id_block_size);
    let ledger = Arc::new(BandwidthLedger::new());
    let service = Arc::new(InMemoryMatchActionService::new());
    let flow_manager = FlowManager::new(service.clone(), ids.clone(), config);
    let topology = Arc::new(SharedTopology::new(topo));
    let registry = CompilerRegistry::with_default_compilers(ids.clone(), ledger.clone());
    let manager = IntentManager::new(
        registry,
        Arc::new(flow_manager.clone()),
        topology.clone(),
        ledger,
        config,
    );

    let mut intents: Vec<Intent> = Vec::with_capacity(num_intents);
    for i in 0..num_intents {
        let pair: Vec<_> = switches.choose_multiple(&mut rng, 2).copied().collect();
        let matching = PacketMatch::builder().src_mac(pair[0].0).dst_mac(i as u64 + 1).build();
        intents.push(
            PointToPointIntent {
                id: ids.intent_ids.next_id()?,
                matching: Match::Packet(matching),
                actions: vec![],
                ingress_port: SwitchPort::new(pair[0].0, HOST_PORT),
                egress_port: SwitchPort::new(pair[1].0, HOST_PORT),
                bandwidth,
            }
            .into(),
        );
    }

    info!("Submitting {} intents", num_intents);
    let start = Instant::now();
    let results = manager.submit_all(intents);
    let submit_time = start.elapsed().as_secs_f64();
    for e in results.iter().filter_map(|r| r.as_ref().err()) {
        debug!("Intent was not installed: {}", e);
    }
    let count = |state: IntentState| {
        results.iter().filter(|r| r.as_ref().ok() == Some(&state)).count()
    };
    let installed = count(IntentState::Installed);
    let states = manager.get_intents();
    let in_state = |state: IntentState| states.iter().filter(|(_, s)| *s == state).count();
    let inst_nack = in_state(IntentState::InstNack);
    let failed = in_state(IntentState::Failed);
    let num_rules = service.num_rules();
    info!("{} intents installed, {} rules on the switches", installed, num_rules);

    // cut a random link that is in use
    let used: BTreeSet<LinkTuple> = manager
        .get_intents()
        .iter()
        .filter_map(|(intent, _)| manager.get_installables(intent.id()))
        .flatten()
        .flat_map(|i| i.links())
        .collect();
    let used: Vec<LinkTuple> = used.into_iter().collect();
    let mut rerouted = 0;
    let mut reroute_failures = 0;
    let failed_link = match used.choose(&mut rng) {
        Some(link) => {
            let link = *link;
            let reversed = link.reversed();
            topology.update(|t| -> Result<(), TopologyError> {
                t.remove_link(link.src, link.dst)?;
                if t.get_link(reversed.src, reversed.dst).is_some() {
                    t.remove_link(reversed.src, reversed.dst)?;
                }
                Ok(())
            })?;
            info!("Link {} failed", link);
            for (id, result) in manager.reroute_affected(&[link, reversed]) {
                match result {
                    Ok(IntentState::Installed) => rerouted += 1,
                    Ok(state) => debug!("{} is {} after rerouting", id, state),
                    Err(e) => {
                        debug!("Cannot reroute {}: {}", id, e);
                        reroute_failures += 1;
                    }
                }
            }
            Some(link.to_string())
        }
        None => None,
    };

    let mut withdrawn = 0;
    for (intent, _) in manager.get_intents() {
        match manager.withdraw(intent.id()) {
            Ok(IntentState::Withdrawn) => withdrawn += 1,
            Ok(state) => debug!("{} is {} after the withdrawal", intent.id(), state),
            Err(e) => warn!("Cannot withdraw {}: {}", intent.id(), e),
        }
    }
    flow_manager.wait_idle();
    let purged = manager.purge();
    debug!("Purged {} intents", purged);

    Ok(RunSummary {
        topology: topology_name,
        num_switches,
        num_links,
        num_intents,
        installed,
        inst_nack,
        failed,
        submit_time,
        num_rules,
        failed_link,
        rerouted,
        reroute_failures,
        withdrawn,
        remaining_rules: service.num_rules(),
    })
}
