// Copyright (c) The Libra Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! §4.4 ConsensusLoader: resolves and instantiates the pluggable consensus
//! `BlockVerifier` for the state as of the previous block, or the
//! well-known `"genesis"` module when there is no predecessor.

use crate::block::{Block, BlockCache};
use crate::error::ValidationError;
use crate::state_view::{IdentitySigner, StateViewFactory};
use std::path::PathBuf;
use std::sync::Arc;

pub const GENESIS_CONSENSUS_MODULE: &str = "genesis";

/// Context a consensus module needs to build its `BlockVerifier`: access
/// to the block cache and state views, the node's own directories, and
/// its public key (spec §4.4).
pub struct BlockVerifierContext {
    pub block_cache: Arc<dyn BlockCache>,
    pub state_view_factory: Arc<dyn StateViewFactory>,
    pub data_dir: PathBuf,
    pub config_dir: PathBuf,
    pub local_signer_public_key: String,
}

/// A pluggable consensus rule set (e.g. PoET, PBFT, dev-mode).
pub trait ConsensusModule: Send + Sync {
    fn block_verifier(&self, ctx: &BlockVerifierContext) -> Result<Box<dyn BlockVerifier>, ValidationError>;
}

/// Consensus-specific acceptance check for a single block.
pub trait BlockVerifier: Send {
    fn verify_block(&mut self, block: &Block) -> Result<bool, ValidationError>;
}

/// Resolves consensus modules by name or by the settings recorded in a
/// given block's state.
pub trait ConsensusFactory: Send + Sync {
    fn get_configured_consensus_module(
        &self,
        block_id: &crate::block::BlockId,
        state_view: Arc<dyn crate::state_view::StateView>,
    ) -> Result<Arc<dyn ConsensusModule>, ValidationError>;

    fn get_consensus_module(&self, name: &str) -> Result<Arc<dyn ConsensusModule>, ValidationError>;
}

pub struct ConsensusLoader {
    factory: Arc<dyn ConsensusFactory>,
    state_view_factory: Arc<dyn StateViewFactory>,
    block_cache: Arc<dyn BlockCache>,
    identity_signer: Arc<dyn IdentitySigner>,
    data_dir: PathBuf,
    config_dir: PathBuf,
}

impl ConsensusLoader {
    pub fn new(
        factory: Arc<dyn ConsensusFactory>,
        state_view_factory: Arc<dyn StateViewFactory>,
        block_cache: Arc<dyn BlockCache>,
        identity_signer: Arc<dyn IdentitySigner>,
        data_dir: PathBuf,
        config_dir: PathBuf,
    ) -> Self {
        ConsensusLoader {
            factory,
            state_view_factory,
            block_cache,
            identity_signer,
            data_dir,
            config_dir,
        }
    }

    /// Resolves the consensus module configured for `predecessor`'s state,
    /// or the `"genesis"` module when there is no predecessor (spec §4.4).
    pub fn for_predecessor(&self, predecessor: Option<&Block>) -> Result<Arc<dyn ConsensusModule>, ValidationError> {
        match predecessor {
            Some(prev) => {
                let view = self.state_view_factory.state_view_for_block(prev)?;
                self.factory.get_configured_consensus_module(&prev.block_id, view)
            }
            None => self.factory.get_consensus_module(GENESIS_CONSENSUS_MODULE),
        }
    }

    pub fn verifier_context(&self) -> BlockVerifierContext {
        BlockVerifierContext {
            block_cache: Arc::clone(&self.block_cache),
            state_view_factory: Arc::clone(&self.state_view_factory),
            data_dir: self.data_dir.clone(),
            config_dir: self.config_dir.clone(),
            local_signer_public_key: self.identity_signer.public_key_hex(),
        }
    }
}
