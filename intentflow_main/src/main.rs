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

use intentflow::flow::Flow;
use intentflow::id::{IdGenerators, IntentId};
use intentflow::intent::{CompilerRegistry, Intent, PointToPointIntent};
use intentflow::matchaction::{Match, Operator, PacketMatch};
use intentflow::path::{BandwidthLedger, ConstrainedBfsTree, EcmpShortestPathGraph};
use intentflow::printer;
use intentflow::topology::{Dpid, SwitchPort, TopologySnapshot};
use intentflow::ControllerConfig;

use clap::{Parser, Subcommand};
use log::*;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

mod topology_selection;
use topology_selection::*;
mod simulation;
use simulation::*;

fn main() -> Result<(), Box<dyn Error>> {
    // run clap
    let args = CommandLineArguments::parse();
    let config = match args.config.as_ref() {
        Some(file) => ControllerConfig::from_file(file)?,
        None => ControllerConfig::default(),
    };

    // match on the action
    match args.cmd {
        MainCommand::Path { src, dst, bandwidth, ecmp, topology } => {
            // initialize the env logger
            pretty_env_logger::init();
            let topo = topology.build()?;
            info!("Computing paths from S{} to S{} in {}", src, dst, topology);

            if ecmp {
                let graph = EcmpShortestPathGraph::new(&topo, Dpid(src));
                let paths = graph.paths(Dpid(dst));
                println!("{} shortest paths from S{} to S{}:", paths.len(), src, dst);
                for path in paths.iter() {
                    println!("    {}", printer::path(&topo, path)?);
                }
            } else {
                let tree = match bandwidth {
                    Some(bw) => ConstrainedBfsTree::with_constraint(&topo, Dpid(src), bw, None),
                    None => ConstrainedBfsTree::new(&topo, Dpid(src)),
                };
                match tree.get_path(Dpid(dst)) {
                    Some(path) => println!("{}", printer::path(&topo, &path)?),
                    None => println!("No path from S{} to S{}", src, dst),
                }
            }
        }
        MainCommand::Compile { src, dst, bandwidth, remove, topology } => {
            // initialize the env logger
            pretty_env_logger::init();
            let topo = topology.build()?;
            let ids = IdGenerators::local(config.id_block_size);
            let ledger = Arc::new(BandwidthLedger::new());
            let registry = CompilerRegistry::with_default_compilers(ids.clone(), ledger);

            let intent: Intent = PointToPointIntent {
                id: IntentId(0),
                matching: Match::Packet(PacketMatch::wildcard()),
                actions: vec![],
                ingress_port: SwitchPort::new(src, 1),
                egress_port: SwitchPort::new(dst, 1),
                bandwidth,
            }
            .into();
            let operator = if remove { Operator::Remove } else { Operator::Add };
            for installable in registry.compile(&intent, &topo)? {
                print_flow(&topo, &installable.flow, operator, &ids)?;
            }
        }
        MainCommand::Run { num_intents, bandwidth, seed, json_filename, topology } => {
            // initialize the env logger
            pretty_env_logger::init();
            let topo = topology.build()?;
            let summary =
                simulate(&config, topology.to_string(), topo, num_intents, bandwidth, seed)?;

            println!("\nResults:");
            println!("    {} of {} intents installed", summary.installed, summary.num_intents);
            println!("    {} not installed, {} failed", summary.inst_nack, summary.failed);
            println!("    {} rules on the switches", summary.num_rules);
            if let Some(link) = summary.failed_link.as_ref() {
                println!(
                    "    {} rerouted after {} failed ({} not rerouted)",
                    summary.rerouted, link, summary.reroute_failures
                );
            }
            println!("    {} withdrawn, {} rules left", summary.withdrawn, summary.remaining_rules);

            if let Some(json_file) = json_filename {
                let result_str = serde_json::to_string_pretty(&summary)?;
                std::fs::write(json_file, result_str)?;
            }
        }
    }
    Ok(())
}

fn print_flow(
    topo: &TopologySnapshot,
    flow: &Flow,
    operator: Operator,
    ids: &IdGenerators,
) -> Result<(), Box<dyn Error>> {
    let phases = flow.compile(operator, ids)?;
    println!("{} ({:?}) in {} phases:", flow.id(), flow.kind(), phases.len());
    for line in printer::phases(topo, &phases)? {
        println!("{}", line);
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[clap(name = "Intentflow (Binary)", author = "Tibor Schneider")]
struct CommandLineArguments {
    /// Configuration file (JSON). Missing fields take their default value.
    #[clap(short = 'f', long)]
    config: Option<PathBuf>,
    /// Action to perform
    #[clap(subcommand)]
    cmd: MainCommand,
}

#[derive(Subcommand, Debug)]
enum MainCommand {
    /// Compute the shortest path between two switches
    #[clap(name = "path")]
    Path {
        /// Source switch
        #[clap(short = 's', long)]
        src: u64,
        /// Destination switch
        #[clap(short = 'd', long)]
        dst: u64,
        /// Only use links with at least this capacity
        #[clap(short = 'b', long)]
        bandwidth: Option<f64>,
        /// Print all shortest paths instead of a single one
        #[clap(short = 'e', long)]
        ecmp: bool,
        /// Topology to use
        #[clap(subcommand)]
        topology: TopologySelection,
    },
    /// Compile a point to point intent and print the match-action phases
    #[clap(name = "compile")]
    Compile {
        /// Ingress switch (hosts are attached at port 1)
        #[clap(short = 's', long)]
        src: u64,
        /// Egress switch (hosts are attached at port 1)
        #[clap(short = 'd', long)]
        dst: u64,
        /// Requested bandwidth
        #[clap(short = 'b', long)]
        bandwidth: Option<f64>,
        /// Print the phases for removing the flow instead of adding it
        #[clap(short = 'r', long)]
        remove: bool,
        /// Topology to use
        #[clap(subcommand)]
        topology: TopologySelection,
    },
    /// Install random intents, fail a link, reroute and withdraw everything again
    #[clap(name = "run")]
    Run {
        /// Number of intents
        #[clap(short = 'n', long, default_value = "100")]
        num_intents: usize,
        /// Bandwidth requested by every intent
        #[clap(short = 'b', long)]
        bandwidth: Option<f64>,
        /// Random seed, to get reproducible runs
        #[clap(short = 's', long)]
        seed: Option<u64>,
        /// Store the result summary in a json file
        #[clap(long = "json")]
        json_filename: Option<String>,
        /// Topology to use
        #[clap(subcommand)]
        topology: TopologySelection,
    },
}
