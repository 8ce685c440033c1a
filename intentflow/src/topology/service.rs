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

//! Access to the current topology

use super::TopologySnapshot;
use crate::sync::{read, write};
use std::sync::{Arc, RwLock};

/// Service providing consistent snapshots of the topology. A single snapshot never changes; a
/// topology change produces a new snapshot.
pub trait TopologyService: Send + Sync {
    /// Get the current snapshot
    fn snapshot(&self) -> Arc<TopologySnapshot>;
}

/// # Shared Topology
/// Holds the current snapshot, and replaces it on every change (copy on write). Readers that
/// obtained a snapshot before a change keep observing the old graph.
#[derive(Debug, Default)]
pub struct SharedTopology {
    current: RwLock<Arc<TopologySnapshot>>,
}

impl SharedTopology {
    /// Create a new shared topology
    pub fn new(topology: TopologySnapshot) -> Self {
        Self { current: RwLock::new(Arc::new(topology)) }
    }

    /// Replace the snapshot entirely, returning the old one.
    pub fn replace(&self, topology: TopologySnapshot) -> Arc<TopologySnapshot> {
        std::mem::replace(&mut *write(&self.current), Arc::new(topology))
    }

    /// Apply a modification to a copy of the current snapshot, and publish the copy.
    pub fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut TopologySnapshot) -> R,
    {
        let mut current = write(&self.current);
        let mut next = TopologySnapshot::clone(&current);
        let result = f(&mut next);
        *current = Arc::new(next);
        result
    }
}

impl TopologyService for SharedTopology {
    fn snapshot(&self) -> Arc<TopologySnapshot> {
        read(&self.current).clone()
    }
}
