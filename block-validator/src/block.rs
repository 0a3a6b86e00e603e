// Copyright (c) The Libra Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! The data model (spec §3): `Block`, `Batch`, `Transaction`, the closed
//! `BlockStatus` variant, and the sentinel identifiers genesis blocks are
//! validated against.

use crate::error::ValidationError;
use libra_crypto::HashValue;
use std::sync::RwLock;

pub type BlockId = HashValue;
pub type BatchId = HashValue;
pub type TransactionId = HashValue;
pub type StateRoot = HashValue;

lazy_static::lazy_static! {
    /// The sentinel predecessor of the genesis block.
    pub static ref NULL_BLOCK_IDENTIFIER: BlockId = HashValue::zero();

    /// The well-known empty state root genesis blocks are validated against.
    pub static ref INIT_ROOT: StateRoot = HashValue::new([0xffu8; HashValue::LENGTH]);
}

/// A block's validation status. Closed variant — no other states exist,
/// and `PipelineCoordinator::release_pending` handles all three
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    Unknown,
    Valid,
    Invalid,
}

impl Default for BlockStatus {
    fn default() -> Self {
        BlockStatus::Unknown
    }
}

/// A single transaction within a batch. `dependencies` names transaction
/// ids that must already be committed on this chain (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub transaction_id: TransactionId,
    pub dependencies: Vec<TransactionId>,
}

/// An atomic group of transactions sharing a signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub batch_id: BatchId,
    pub signer_public_key: String,
    pub transactions: Vec<Transaction>,
}

/// Per-transaction execution result, attached to a block once batch
/// validation succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionExecutionResult {
    pub transaction_id: TransactionId,
    pub is_valid: bool,
}

/// What a successful `BatchValidator::validate` call produces: the
/// per-transaction results, the final state root, and a transaction
/// count, all of which get attached onto the block (spec §3, §4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub transaction_results: Vec<TransactionExecutionResult>,
    pub state_root_hash: StateRoot,
    pub transaction_count: usize,
}

impl ExecutionOutcome {
    pub fn empty(unchanged_root: StateRoot) -> Self {
        ExecutionOutcome {
            transaction_results: Vec::new(),
            state_root_hash: unchanged_root,
            transaction_count: 0,
        }
    }
}

/// A candidate block. Identifiers, ordered batches and the declared target
/// state root are immutable; `status` and the attached `ExecutionOutcome`
/// are the only fields the engine mutates, and only during the block's own
/// validation window (spec §9, "mutable block field").
#[derive(Debug)]
pub struct Block {
    pub block_id: BlockId,
    pub previous_block_id: BlockId,
    pub block_num: u64,
    pub signer_public_key: String,
    pub batches: Vec<Batch>,
    pub state_root_hash: StateRoot,
    status: RwLock<BlockStatus>,
    outcome: RwLock<Option<ExecutionOutcome>>,
}

impl Block {
    pub fn new(
        block_id: BlockId,
        previous_block_id: BlockId,
        block_num: u64,
        signer_public_key: String,
        batches: Vec<Batch>,
        state_root_hash: StateRoot,
    ) -> Self {
        Block {
            block_id,
            previous_block_id,
            block_num,
            signer_public_key,
            batches,
            state_root_hash,
            status: RwLock::new(BlockStatus::Unknown),
            outcome: RwLock::new(None),
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.block_num == 0
    }

    pub fn status(&self) -> BlockStatus {
        *self.status.read().expect("block status lock poisoned")
    }

    pub fn set_status(&self, status: BlockStatus) {
        *self.status.write().expect("block status lock poisoned") = status;
    }

    pub fn attach_outcome(&self, outcome: ExecutionOutcome) {
        *self.outcome.write().expect("block outcome lock poisoned") = Some(outcome);
    }

    pub fn outcome(&self) -> Option<ExecutionOutcome> {
        self.outcome.read().expect("block outcome lock poisoned").clone()
    }

    pub fn transaction_count(&self) -> usize {
        self.outcome()
            .map(|outcome| outcome.transaction_count)
            .unwrap_or(0)
    }
}

/// Keyed access to known blocks (spec §6). Externally thread-safe; the
/// engine only mutates it by deleting entries on the purge-on-`Unknown`
/// cascade path.
pub trait BlockCache: Send + Sync {
    fn get(&self, block_id: &BlockId) -> Option<std::sync::Arc<Block>>;
    fn contains(&self, block_id: &BlockId) -> bool;
    fn delete(&self, block_id: &BlockId);
    fn block_store(&self) -> std::sync::Arc<dyn BlockStoreHandle>;
}

/// The chain controller's current head, snapshotted atomically. Used by
/// the worker loop (spec §4.6) to detect displacement races.
pub trait BlockStoreHandle: Send + Sync {
    fn chain_head(&self) -> Option<BlockId>;
}

/// Read-only query surface against committed history up to a predecessor
/// block, used to detect duplicate batches/transactions and unsatisfied
/// dependencies (spec §3, §4.1). Constructed at the start of a validation
/// and discarded at the end; never reflects in-flight validations.
pub trait ChainCommitState: Send + Sync {
    fn has_batch(&self, batch_id: &BatchId) -> Result<bool, ValidationError>;
    fn has_transaction(&self, transaction_id: &TransactionId) -> Result<bool, ValidationError>;
    fn dependency_satisfied(&self, transaction_id: &TransactionId) -> Result<bool, ValidationError>;
}

/// Constructs a `ChainCommitState` anchored at a given predecessor.
pub trait ChainCommitStateFactory: Send + Sync {
    fn chain_commit_state(
        &self,
        predecessor: BlockId,
    ) -> Result<Box<dyn ChainCommitState>, ValidationError>;
}
