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

//! # Bandwidth Ledger
//!
//! Tracks how much bandwidth every intent reserves on every link. The ledger is written when an
//! intent becomes installed or withdrawn, and read during path computation. Readers may observe
//! the ledger while other completions update it; the accounting is eventually consistent.

use crate::id::IntentId;
use crate::sync::{read, write};
use crate::topology::{Bandwidth, Link, LinkTuple, SwitchPort};
use log::*;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Per link bandwidth reservations of all intents
#[derive(Debug, Default)]
pub struct BandwidthLedger {
    reservations: RwLock<BTreeMap<LinkTuple, BTreeMap<IntentId, Bandwidth>>>,
}

impl BandwidthLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `bandwidth` on every link for the intent. A second reservation of the same intent
    /// on the same link replaces the first one.
    pub fn reserve<I>(&self, intent: IntentId, links: I, bandwidth: Bandwidth)
    where
        I: IntoIterator<Item = LinkTuple>,
    {
        let mut reservations = write(&self.reservations);
        for link in links {
            reservations.entry(link).or_default().insert(intent, bandwidth);
        }
        trace!("Reserved {} for {}", bandwidth, intent);
    }

    /// Release all reservations of the intent. Returns the number of links affected.
    pub fn release(&self, intent: IntentId) -> usize {
        let mut reservations = write(&self.reservations);
        let mut released = 0;
        reservations.retain(|_, intents| {
            if intents.remove(&intent).is_some() {
                released += 1;
            }
            !intents.is_empty()
        });
        trace!("Released {} links of {}", released, intent);
        released
    }

    /// Sum of all reservations on the link. Reservations that are not finite are ignored.
    pub fn reserved(&self, link: &LinkTuple) -> Bandwidth {
        read(&self.reservations)
            .get(link)
            .map(|intents| intents.values().filter(|b| b.is_finite()).sum())
            .unwrap_or(0.0)
    }

    /// Capacity of the link minus all reservations. A link of infinite capacity stays infinite.
    pub fn available_bandwidth(&self, link: &Link) -> Bandwidth {
        self.available_bandwidth_excluding(link, None)
    }

    /// Capacity of the link minus all reservations except the ones of `exclude`. An intent that
    /// is recomputed must not compete with its own reservations.
    pub fn available_bandwidth_excluding(
        &self,
        link: &Link,
        exclude: Option<IntentId>,
    ) -> Bandwidth {
        if link.capacity.is_infinite() {
            return Bandwidth::INFINITY;
        }
        let reserved: Bandwidth = read(&self.reservations)
            .get(&link.tuple())
            .map(|intents| {
                intents
                    .iter()
                    .filter(|(id, b)| Some(**id) != exclude && b.is_finite())
                    .map(|(_, b)| *b)
                    .sum()
            })
            .unwrap_or(0.0);
        link.capacity - reserved
    }

    /// All intents with a reservation on the link
    pub fn intents_on_link(&self, link: &LinkTuple) -> Vec<IntentId> {
        read(&self.reservations)
            .get(link)
            .map(|intents| intents.keys().copied().collect())
            .unwrap_or_default()
    }

    /// All intents with a reservation on a link starting or ending at the port
    pub fn intents_on_port(&self, port: SwitchPort) -> Vec<IntentId> {
        let mut intents: Vec<IntentId> = read(&self.reservations)
            .iter()
            .filter(|(link, _)| link.src == port || link.dst == port)
            .flat_map(|(_, intents)| intents.keys().copied())
            .collect();
        intents.sort();
        intents.dedup();
        intents
    }

    /// All links on which the intent holds a reservation
    pub fn links_of(&self, intent: IntentId) -> Vec<LinkTuple> {
        read(&self.reservations)
            .iter()
            .filter(|(_, intents)| intents.contains_key(&intent))
            .map(|(link, _)| *link)
            .collect()
    }
}
