// Copyright (c) The Libra Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! §3 tracker state: the concurrent sets/multimap recording in-process and
//! pending blocks. All operations are atomic with respect to each other;
//! `append_if_unique` in particular is an atomic "append iff identifier
//! not already present in the list for this key" (spec §5).

use crate::block::BlockId;
use libra_metrics::OpMetrics;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

lazy_static::lazy_static! {
    static ref OP_COUNTERS: OpMetrics = OpMetrics::new_and_registered("block_validator");
}

#[derive(Default)]
pub struct BlockTrackers {
    processing: RwLock<HashSet<BlockId>>,
    pending: RwLock<HashSet<BlockId>>,
    pending_by_parent: RwLock<HashMap<BlockId, Vec<BlockId>>>,
}

impl BlockTrackers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_processing(&self, block_id: &BlockId) -> bool {
        self.processing.read().expect("processing lock poisoned").contains(block_id)
    }

    pub fn is_pending(&self, block_id: &BlockId) -> bool {
        self.pending.read().expect("pending lock poisoned").contains(block_id)
    }

    /// Inserts `block_id` into `processing`. Returns `false` if it was
    /// already present (the caller must treat this as "already in
    /// flight" and skip re-dispatch, preserving invariant (a): the block
    /// is tested-and-set before submission, so it is dispatched at most
    /// once (spec §5).
    pub fn start_processing(&self, block_id: BlockId) -> bool {
        let inserted = self
            .processing
            .write()
            .expect("processing lock poisoned")
            .insert(block_id);
        if inserted {
            OP_COUNTERS.gauge("blocks_processing").set(self.processing_count() as i64);
        }
        inserted
    }

    /// Removes `block_id` from `processing`. Returns `false` if it was
    /// absent, which the caller should log as a tracker inconsistency but
    /// treat as non-fatal (spec §4.6).
    pub fn finish_processing(&self, block_id: &BlockId) -> bool {
        let removed = self
            .processing
            .write()
            .expect("processing lock poisoned")
            .remove(block_id);
        OP_COUNTERS.gauge("blocks_processing").set(self.processing_count() as i64);
        removed
    }

    /// Parks `child` under `parent`: adds it to `pending` and appends it
    /// (deduplicating) to `pending_by_parent[parent]` (spec §4.6 step 2).
    pub fn park(&self, parent: BlockId, child: BlockId) {
        self.pending.write().expect("pending lock poisoned").insert(child);
        self.pending_by_parent
            .write()
            .expect("pending_by_parent lock poisoned")
            .entry(parent)
            .or_insert_with(Vec::new)
            .append_if_unique(child);
        OP_COUNTERS.gauge("blocks_pending").set(self.pending_count() as i64);
    }

    /// Removes `block_id` from `pending` without touching
    /// `pending_by_parent` — used on the purge-on-`Unknown` cascade path,
    /// where the key has already been popped by `pop_children`.
    pub fn remove_pending(&self, block_id: &BlockId) -> bool {
        let removed = self.pending.write().expect("pending lock poisoned").remove(block_id);
        OP_COUNTERS.gauge("blocks_pending").set(self.pending_count() as i64);
        removed
    }

    /// Pops and returns the children parked under `parent`, removing each
    /// from `pending` (spec §4.6, cascade resolver). Returns an empty
    /// vector if `parent` has no parked children.
    pub fn pop_children(&self, parent: &BlockId) -> Vec<BlockId> {
        let children = self
            .pending_by_parent
            .write()
            .expect("pending_by_parent lock poisoned")
            .remove(parent)
            .unwrap_or_default();
        if !children.is_empty() {
            let mut pending = self.pending.write().expect("pending lock poisoned");
            for child in &children {
                pending.remove(child);
            }
        }
        OP_COUNTERS.gauge("blocks_pending").set(self.pending_count() as i64);
        children
    }

    pub fn processing_count(&self) -> usize {
        self.processing.read().expect("processing lock poisoned").len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.read().expect("pending lock poisoned").len()
    }

    /// Exclusivity invariant (spec §8 property 1): no block id should ever
    /// be present in both sets.
    #[cfg(test)]
    pub fn assert_exclusive(&self) {
        let processing = self.processing.read().unwrap();
        let pending = self.pending.read().unwrap();
        assert!(
            processing.is_disjoint(&pending),
            "a block id is present in both processing and pending"
        );
    }
}

trait AppendIfUnique<T> {
    fn append_if_unique(&mut self, item: T);
}

impl<T: PartialEq> AppendIfUnique<T> for Vec<T> {
    fn append_if_unique(&mut self, item: T) {
        if !self.contains(&item) {
            self.push(item);
        }
    }
}
