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

//! # Identifiers
//!
//! Every flow, intent, match-action entry, match-action phase and flow batch is identified by a
//! globally unique id. Ids are never self-assigned: they are drawn from an [`IdGenerator`], which
//! in turn obtains contiguous [`IdBlock`]s from an [`IdBlockAllocator`]. In a cluster, the
//! allocator is backed by the distributed coordination service, such that two controller
//! instances never hand out the same id. [`LocalIdBlockAllocator`] is the single-instance
//! version.

use crate::sync::lock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(
            PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl From<u64> for $name {
            fn from(x: u64) -> Self {
                Self(x)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}-{:#x}", $prefix, self.0)
            }
        }
    };
}

id_type!(
    /// Flow Identification
    FlowId,
    "flow"
);
id_type!(
    /// Intent Identification
    IntentId,
    "intent"
);
id_type!(
    /// Identification of a single match-action entry
    MatchActionId,
    "ma"
);
id_type!(
    /// Identification of a batch of match-action operations (a phase)
    MatchActionOperationsId,
    "mao"
);
id_type!(
    /// Identification of a flow batch operation
    FlowBatchId,
    "batch"
);

/// Error while allocating identifiers
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum IdError {
    /// All ids of the block are used up.
    #[error("The id block [{start}, {end}) is exhausted")]
    BlockExhausted {
        /// First id of the block
        start: u64,
        /// One past the last id of the block
        end: u64,
    },
    /// The allocator cannot hand out any further blocks.
    #[error("The id space is exhausted")]
    SpaceExhausted,
    /// A block of size zero was requested or handed out.
    #[error("Id blocks must not be empty")]
    EmptyBlock,
}

/// # Id Block
/// A contiguous range of identifiers `[start, start + size)`, handed out in increasing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdBlock {
    start: u64,
    size: u64,
    next: u64,
}

impl IdBlock {
    /// Create a new block. Returns an error if the block is empty or overflows the id space.
    pub fn new(start: u64, size: u64) -> Result<Self, IdError> {
        if size == 0 {
            return Err(IdError::EmptyBlock);
        }
        start.checked_add(size).ok_or(IdError::SpaceExhausted)?;
        Ok(Self { start, size, next: start })
    }

    /// First id of the block
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Total number of ids in the block
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of ids not yet handed out
    pub fn remaining(&self) -> u64 {
        self.start + self.size - self.next
    }

    /// Take the next id from the block, or return [`IdError::BlockExhausted`].
    pub fn next_id(&mut self) -> Result<u64, IdError> {
        if self.remaining() == 0 {
            return Err(IdError::BlockExhausted { start: self.start, end: self.start + self.size });
        }
        let id = self.next;
        self.next += 1;
        Ok(id)
    }
}

/// Allocator of id blocks, shared by all generators of a controller instance.
pub trait IdBlockAllocator: Send + Sync {
    /// Allocate a fresh block of `size` ids, disjoint from every block allocated before.
    fn allocate_block(&self, size: u64) -> Result<IdBlock, IdError>;
}

/// Allocator for a single controller instance, backed by an atomic counter.
#[derive(Debug, Default)]
pub struct LocalIdBlockAllocator {
    next: AtomicU64,
}

impl LocalIdBlockAllocator {
    /// Create a new allocator, handing out blocks starting at `first`.
    pub fn new(first: u64) -> Self {
        Self { next: AtomicU64::new(first) }
    }
}

impl IdBlockAllocator for LocalIdBlockAllocator {
    fn allocate_block(&self, size: u64) -> Result<IdBlock, IdError> {
        if size == 0 {
            return Err(IdError::EmptyBlock);
        }
        let mut current = self.next.load(Ordering::SeqCst);
        loop {
            let end = current.checked_add(size).ok_or(IdError::SpaceExhausted)?;
            match self.next.compare_exchange(current, end, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return IdBlock::new(current, size),
                Err(actual) => current = actual,
            }
        }
    }
}

/// Generator of unique identifiers of type `T`
pub trait IdGenerator<T>: Send + Sync {
    /// Get the next unique id.
    fn next_id(&self) -> Result<T, IdError>;
}

/// # Block Id Generator
/// Id generator that draws ids from a block, and requests a new block from the allocator once the
/// current one is exhausted.
pub struct BlockIdGenerator<T> {
    allocator: Arc<dyn IdBlockAllocator>,
    block_size: u64,
    block: Mutex<Option<IdBlock>>,
    phantom: PhantomData<fn() -> T>,
}

impl<T> BlockIdGenerator<T> {
    /// Create a new generator. The first block is only requested when the first id is needed.
    pub fn new(allocator: Arc<dyn IdBlockAllocator>, block_size: u64) -> Self {
        Self { allocator, block_size, block: Mutex::new(None), phantom: PhantomData }
    }
}

impl<T> fmt::Debug for BlockIdGenerator<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BlockIdGenerator")
            .field("block_size", &self.block_size)
            .field("block", &*lock(&self.block))
            .finish()
    }
}

impl<T: From<u64>> IdGenerator<T> for BlockIdGenerator<T> {
    fn next_id(&self) -> Result<T, IdError> {
        let mut block = lock(&self.block);
        if block.as_ref().map_or(true, |b| b.remaining() == 0) {
            *block = Some(self.allocator.allocate_block(self.block_size)?);
        }
        match block.as_mut() {
            Some(b) => b.next_id().map(T::from),
            None => Err(IdError::EmptyBlock),
        }
    }
}

/// Bundle of all id generators used by the pipeline.
#[derive(Clone)]
pub struct IdGenerators {
    /// Generator for flow ids
    pub flow_ids: Arc<dyn IdGenerator<FlowId>>,
    /// Generator for intent ids
    pub intent_ids: Arc<dyn IdGenerator<IntentId>>,
    /// Generator for match-action ids
    pub match_action_ids: Arc<dyn IdGenerator<MatchActionId>>,
    /// Generator for match-action operations ids
    pub operations_ids: Arc<dyn IdGenerator<MatchActionOperationsId>>,
    /// Generator for flow batch ids
    pub batch_ids: Arc<dyn IdGenerator<FlowBatchId>>,
}

impl IdGenerators {
    /// Create block based generators for every id type, all sharing the same allocator. Since the
    /// allocator never hands out overlapping blocks, ids are unique even across types.
    pub fn from_allocator(allocator: Arc<dyn IdBlockAllocator>, block_size: u64) -> Self {
        Self {
            flow_ids: Arc::new(BlockIdGenerator::new(allocator.clone(), block_size)),
            intent_ids: Arc::new(BlockIdGenerator::new(allocator.clone(), block_size)),
            match_action_ids: Arc::new(BlockIdGenerator::new(allocator.clone(), block_size)),
            operations_ids: Arc::new(BlockIdGenerator::new(allocator.clone(), block_size)),
            batch_ids: Arc::new(BlockIdGenerator::new(allocator, block_size)),
        }
    }

    /// Create generators with a fresh local allocator.
    pub fn local(block_size: u64) -> Self {
        Self::from_allocator(Arc::new(LocalIdBlockAllocator::new(1)), block_size)
    }
}

impl fmt::Debug for IdGenerators {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("IdGenerators").finish()
    }
}
