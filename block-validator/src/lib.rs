// Copyright (c) The Libra Core Contributors
// SPDX-License-Identifier: Apache-2.0
#![allow(dead_code)]

//! A block validation engine for a blockchain validator node.
//!
//! Given candidate blocks arriving from the network or local block
//! production, determines whether each is a valid successor of some known
//! ancestor and, when valid, produces the execution artifacts the chain
//! controller needs to consider a fork switch. The engine reports
//! validity; it does not choose fork heads, store blocks durably, or do
//! network I/O — those are the chain controller's job.

pub mod batch_validator;
pub mod block;
pub mod consensus;
pub mod error;
pub mod lookahead;
pub mod permission;
pub mod rules;
pub mod single_block_validator;
pub mod state_view;
mod pipeline;
mod trackers;

#[cfg(test)]
mod scenarios;

use batch_validator::{BatchValidator, SquashHandler, TransactionExecutor};
use block::{Block, BlockCache, BlockId, ChainCommitStateFactory};
use consensus::ConsensusFactory;
use permission::{PermissionGate, PermissionVerifier};
use pipeline::PipelineCoordinator;
use rules::{RuleEnforcer, ValidationRuleEnforcer};
use single_block_validator::SingleBlockValidator;
use state_view::{IdentitySigner, SettingsViewFactory, StateViewFactory};
use std::path::PathBuf;
use std::sync::Arc;

pub use pipeline::BlockCallback;

/// Construction-time configuration (spec §6 "Configuration"). No
/// environment variables or CLI flags are read by the engine itself — the
/// chain controller owns process-level configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub config_dir: PathBuf,
    pub worker_pool_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            data_dir: PathBuf::from("."),
            config_dir: PathBuf::from("."),
            worker_pool_size: 1,
        }
    }
}

/// The full set of external collaborators the engine consumes (spec §6).
/// Supplied once at construction time; the engine never constructs its
/// own copies.
pub struct Collaborators {
    pub block_cache: Arc<dyn BlockCache>,
    pub transaction_executor: Arc<dyn TransactionExecutor>,
    pub chain_commit_state_factory: Arc<dyn ChainCommitStateFactory>,
    pub squash_handler: SquashHandler,
    pub permission_verifier: Arc<dyn PermissionVerifier>,
    pub settings_view_factory: Arc<dyn SettingsViewFactory>,
    pub rule_enforcer: Arc<dyn ValidationRuleEnforcer>,
    pub consensus_factory: Arc<dyn ConsensusFactory>,
    pub state_view_factory: Arc<dyn StateViewFactory>,
    pub identity_signer: Arc<dyn IdentitySigner>,
}

/// The block validation engine: the public surface exposed to the chain
/// controller (spec §6 "Exposed interface").
pub struct BlockValidationEngine {
    coordinator: Arc<PipelineCoordinator>,
}

impl BlockValidationEngine {
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Self {
        let consensus_loader = consensus::ConsensusLoader::new(
            collaborators.consensus_factory,
            Arc::clone(&collaborators.state_view_factory),
            Arc::clone(&collaborators.block_cache),
            collaborators.identity_signer,
            config.data_dir,
            config.config_dir,
        );

        let batch_validator = BatchValidator::new(
            collaborators.transaction_executor,
            collaborators.chain_commit_state_factory,
            collaborators.squash_handler,
        );

        let validator = Arc::new(SingleBlockValidator::new(
            Arc::clone(&collaborators.block_cache),
            PermissionGate::new(collaborators.permission_verifier),
            RuleEnforcer::new(collaborators.settings_view_factory, collaborators.rule_enforcer),
            consensus_loader,
            batch_validator,
        ));

        let coordinator = PipelineCoordinator::new(
            collaborators.block_cache,
            validator,
            config.worker_pool_size,
        );

        BlockValidationEngine { coordinator }
    }

    /// Submits candidate blocks for verification. `callback` is invoked
    /// exactly once per submitted block once all retries and cascade
    /// effects have settled (spec §6, §8 property 6).
    pub fn submit_blocks_for_verification(&self, blocks: Vec<Arc<Block>>, callback: Arc<BlockCallback>) {
        self.coordinator.submit(blocks, callback);
    }

    pub fn in_process(&self, block_id: &BlockId) -> bool {
        self.coordinator.in_process(block_id)
    }

    pub fn in_pending(&self, block_id: &BlockId) -> bool {
        self.coordinator.in_pending(block_id)
    }

    /// Synchronous validation entry point used in tests and admin paths.
    pub fn validate_block(&self, block: &Arc<Block>) -> Result<(), error::ValidationError> {
        self.coordinator.validate_block(block)
    }

    /// Drains and shuts down the worker pool, waiting for in-flight jobs.
    pub fn stop(&self) {
        self.coordinator.stop();
    }
}
