// Copyright (c) The Libra Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! §4.1 BatchValidator: re-executes a block's batches against a prior
//! state root and compares the resulting state root to the declared one.

use crate::block::{
    Batch, BatchId, Block, ChainCommitStateFactory, ExecutionOutcome, StateRoot,
    TransactionExecutionResult,
};
use crate::error::{ValidationError, ValidationFailure, ValidationOutcome};
use crate::lookahead::look_ahead;
use std::sync::Arc;

/// A batch's execution result as reported by the scheduler: whether it
/// applied cleanly, and the state hash after applying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchExecutionResult {
    pub is_valid: bool,
    pub state_hash: StateRoot,
}

/// Consolidates state deltas when a scheduler commits (spec glossary:
/// "squash handler").
pub type SquashHandler = Arc<dyn Fn(StateRoot, &[StateRoot]) -> StateRoot + Send + Sync>;

/// A scheduler instance anchored at a particular prior state root. Models
/// the executor's scheduler as a scoped resource: every early-exit path
/// from `BatchValidator::validate` must call `cancel`, which
/// `SchedulerGuard` enforces.
pub trait Scheduler: Send {
    fn add_batch(&mut self, batch: &Batch, expected_state_root: Option<StateRoot>) -> Result<(), ValidationError>;
    fn finalize(&mut self) -> Result<(), ValidationError>;
    fn complete(&mut self, block: bool) -> Result<(), ValidationError>;
    fn cancel(&mut self);
    fn get_batch_execution_result(&self, batch_id: &BatchId) -> Option<BatchExecutionResult>;
    fn get_transaction_execution_results(&self, batch_id: &BatchId) -> Vec<TransactionExecutionResult>;
}

/// Constructs schedulers anchored at a prior state root and drives their
/// execution (spec §6, `TransactionExecutor`).
pub trait TransactionExecutor: Send + Sync {
    fn create_scheduler(
        &self,
        squash_handler: SquashHandler,
        prev_state_root: StateRoot,
    ) -> Result<Box<dyn Scheduler>, ValidationError>;

    fn execute(&self, scheduler: &mut dyn Scheduler) -> Result<(), ValidationError>;
}

/// Cancels the wrapped scheduler on drop unless `release` was called,
/// guaranteeing the early-exit paths in `BatchValidator::validate` always
/// cancel (spec §9, "scheduler as scoped resource").
struct SchedulerGuard {
    scheduler: Box<dyn Scheduler>,
    released: bool,
}

impl SchedulerGuard {
    fn new(scheduler: Box<dyn Scheduler>) -> Self {
        SchedulerGuard {
            scheduler,
            released: false,
        }
    }

    fn release(mut self) {
        self.released = true;
    }
}

impl std::ops::Deref for SchedulerGuard {
    type Target = dyn Scheduler;
    fn deref(&self) -> &Self::Target {
        self.scheduler.as_ref()
    }
}

impl std::ops::DerefMut for SchedulerGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.scheduler.as_mut()
    }
}

impl Drop for SchedulerGuard {
    fn drop(&mut self) {
        if !self.released {
            self.scheduler.cancel();
        }
    }
}

pub struct BatchValidator {
    executor: Arc<dyn TransactionExecutor>,
    commit_state_factory: Arc<dyn ChainCommitStateFactory>,
    squash_handler: SquashHandler,
}

impl BatchValidator {
    pub fn new(
        executor: Arc<dyn TransactionExecutor>,
        commit_state_factory: Arc<dyn ChainCommitStateFactory>,
        squash_handler: SquashHandler,
    ) -> Self {
        BatchValidator {
            executor,
            commit_state_factory,
            squash_handler,
        }
    }

    pub fn validate(
        &self,
        block: &Block,
        prev_state_root: StateRoot,
    ) -> Result<ExecutionOutcome, ValidationOutcome> {
        // Step 1: empty blocks succeed trivially. The caller is
        // responsible for having ensured prev_state_root equals the
        // declared root in this case (spec §4.1 step 1, open question).
        if block.batches.is_empty() {
            return Ok(ExecutionOutcome::empty(prev_state_root));
        }

        // Step 2: a read-only view of committed history up to the
        // predecessor, used for duplicate/dependency checks below.
        let commit_state = self
            .commit_state_factory
            .chain_commit_state(block.previous_block_id)
            .map_err(ValidationOutcome::Error)?;

        // Step 3: obtain a scheduler anchored at prev_state_root and start
        // execution. Wrapped immediately so every exit path below cancels
        // it unless we reach the end.
        let scheduler = self
            .executor
            .create_scheduler(Arc::clone(&self.squash_handler), prev_state_root)
            .map_err(ValidationOutcome::Error)?;
        let mut guard = SchedulerGuard::new(scheduler);
        self.executor
            .execute(&mut *guard)
            .map_err(ValidationOutcome::Error)?;

        // Step 4: duplicate batches, then duplicate transactions, then
        // unsatisfied dependencies, in that order.
        if let Err(failure) = self.check_duplicates_and_dependencies(block, commit_state.as_ref()) {
            return Err(ValidationOutcome::Failure(failure));
        }

        // Step 5: feed batches in order; only the last batch carries the
        // declared target root as a commit hint.
        for (batch, has_more) in look_ahead(block.batches.iter()) {
            let hint = if has_more { None } else { Some(block.state_root_hash) };
            if let Err(e) = guard.add_batch(batch, hint) {
                return Err(ValidationOutcome::Error(e));
            }
        }

        // Step 6: finalize and block for completion.
        if let Err(e) = guard.finalize() {
            return Err(ValidationOutcome::Error(e));
        }
        if let Err(e) = guard.complete(true) {
            return Err(ValidationOutcome::Error(e));
        }

        // Step 7: accumulate results in order, tracking the running state
        // hash and transaction count.
        let mut transaction_results = Vec::new();
        let mut transaction_count = 0usize;
        let mut state_hash = prev_state_root;
        for batch in &block.batches {
            let result = match guard.get_batch_execution_result(&batch.batch_id) {
                Some(result) => result,
                None => {
                    return Err(ValidationOutcome::Failure(ValidationFailure::MissingBatchResult(
                        batch.batch_id.to_string(),
                    )))
                }
            };
            if !result.is_valid {
                return Err(ValidationOutcome::Failure(ValidationFailure::InvalidBatch(
                    batch.batch_id.to_string(),
                )));
            }
            transaction_results.extend(guard.get_transaction_execution_results(&batch.batch_id));
            state_hash = result.state_hash;
            transaction_count += batch.transactions.len();
        }

        // Step 8: the running hash after the last batch must match the
        // block's declared target.
        if state_hash != block.state_root_hash {
            return Err(ValidationOutcome::Failure(ValidationFailure::StateRootMismatch {
                expected: block.state_root_hash.to_string(),
                found: state_hash.to_string(),
            }));
        }

        guard.release();
        Ok(ExecutionOutcome {
            transaction_results,
            state_root_hash: state_hash,
            transaction_count,
        })
    }

    fn check_duplicates_and_dependencies(
        &self,
        block: &Block,
        commit_state: &dyn crate::block::ChainCommitState,
    ) -> Result<(), ValidationFailure> {
        let mut seen_batches = std::collections::HashSet::new();
        for batch in &block.batches {
            if !seen_batches.insert(batch.batch_id)
                || commit_state
                    .has_batch(&batch.batch_id)
                    .map_err(|e| ValidationFailure::InvalidBatch(e.to_string()))?
            {
                return Err(ValidationFailure::DuplicateBatch(batch.batch_id.to_string()));
            }
        }

        let mut seen_transactions = std::collections::HashSet::new();
        for batch in &block.batches {
            for txn in &batch.transactions {
                if !seen_transactions.insert(txn.transaction_id)
                    || commit_state
                        .has_transaction(&txn.transaction_id)
                        .map_err(|e| ValidationFailure::InvalidBatch(e.to_string()))?
                {
                    return Err(ValidationFailure::DuplicateTransaction(txn.transaction_id.to_string()));
                }
            }
        }

        for batch in &block.batches {
            for txn in &batch.transactions {
                for dependency in &txn.dependencies {
                    let satisfied = seen_transactions.contains(dependency)
                        || commit_state
                            .dependency_satisfied(dependency)
                            .map_err(|e| ValidationFailure::InvalidBatch(e.to_string()))?;
                    if !satisfied {
                        return Err(ValidationFailure::UnsatisfiedDependency {
                            txn_id: txn.transaction_id.to_string(),
                            dependency: dependency.to_string(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

