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

use intentflow::example_topologies::{
    random_topology, ExampleTopology, GridTopology, LineTopology, RingTopology,
};
use intentflow::topology::TopologySnapshot;

use clap::Subcommand;
use std::error::Error;
use std::fmt;

#[derive(Subcommand, Debug, Clone)]
pub enum TopologySelection {
    /// Switches connected in a line
    #[clap(name = "line")]
    Line {
        /// Number of switches
        #[clap(short = 'n', long, default_value = "5")]
        size: usize,
        /// Capacity of every link
        #[clap(short = 'c', long, default_value = "10")]
        capacity: f64,
    },
    /// Switches connected in a ring
    #[clap(name = "ring")]
    Ring {
        /// Number of switches
        #[clap(short = 'n', long, default_value = "8")]
        size: usize,
        /// Capacity of every link
        #[clap(short = 'c', long, default_value = "10")]
        capacity: f64,
    },
    /// Square grid of switches
    #[clap(name = "grid")]
    Grid {
        /// Number of switches along one side
        #[clap(short = 'n', long, default_value = "4")]
        size: usize,
        /// Capacity of every link
        #[clap(short = 'c', long, default_value = "10")]
        capacity: f64,
    },
    /// Random graph, where every pair of switches is connected with the same probability
    #[clap(name = "random")]
    Random {
        /// Number of switches
        #[clap(short = 'n', long, default_value = "20")]
        size: usize,
        /// Probability that two switches are connected
        #[clap(short = 'p', long, default_value = "0.2")]
        probability: f64,
        /// Capacity of every link
        #[clap(short = 'c', long, default_value = "10")]
        capacity: f64,
        /// Random seed, to get reproducible topologies
        #[clap(short = 's', long, default_value = "42")]
        seed: u64,
    },
}

impl TopologySelection {
    /// Build the selected topology
    pub fn build(&self) -> Result<TopologySnapshot, Box<dyn Error>> {
        Ok(match self {
            Self::Line { size, capacity } => LineTopology::topology(*size, *capacity)?,
            Self::Ring { size, capacity } => RingTopology::topology(*size, *capacity)?,
            Self::Grid { size, capacity } => GridTopology::topology(*size, *capacity)?,
            Self::Random { size, probability, capacity, seed } => {
                random_topology(*size, *probability, *capacity, *seed)?
            }
        })
    }
}

impl fmt::Display for TopologySelection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Line { size, .. } => write!(f, "Line({})", size),
            Self::Ring { size, .. } => write!(f, "Ring({})", size),
            Self::Grid { size, .. } => write!(f, "Grid({}x{})", size, size),
            Self::Random { size, probability, seed, .. } => {
                write!(f, "Random({}, p={}, seed={})", size, probability, seed)
            }
        }
    }
}
