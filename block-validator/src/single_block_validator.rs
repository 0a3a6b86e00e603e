// Copyright (c) The Libra Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! §4.5 SingleBlockValidator: orchestrates the four checks (permission,
//! consensus, rules, batch execution) in fixed order and updates the
//! block's status.

use crate::batch_validator::BatchValidator;
use crate::block::{Block, BlockCache, BlockStatus, INIT_ROOT, NULL_BLOCK_IDENTIFIER};
use crate::consensus::ConsensusLoader;
use crate::error::{ValidationError, ValidationFailure, ValidationOutcome};
use crate::permission::PermissionGate;
use crate::rules::RuleEnforcer;
use libra_logger::prelude::*;
use std::sync::Arc;

pub struct SingleBlockValidator {
    block_cache: Arc<dyn BlockCache>,
    permission_gate: PermissionGate,
    rule_enforcer: RuleEnforcer,
    consensus_loader: ConsensusLoader,
    batch_validator: BatchValidator,
}

impl SingleBlockValidator {
    pub fn new(
        block_cache: Arc<dyn BlockCache>,
        permission_gate: PermissionGate,
        rule_enforcer: RuleEnforcer,
        consensus_loader: ConsensusLoader,
        batch_validator: BatchValidator,
    ) -> Self {
        SingleBlockValidator {
            block_cache,
            permission_gate,
            rule_enforcer,
            consensus_loader,
            batch_validator,
        }
    }

    /// Runs the four checks in fixed order against `block`, short
    /// circuiting on the first failure, and updates `block`'s status
    /// accordingly. Idempotent: a block already `Valid` returns
    /// immediately; a block already `Invalid` re-raises without
    /// re-running anything (spec §8 property 3).
    pub fn validate(&self, block: &Block) -> Result<(), ValidationOutcome> {
        match block.status() {
            BlockStatus::Valid => return Ok(()),
            BlockStatus::Invalid => {
                return Err(ValidationFailure::AlreadyInvalid(block.block_id.to_string()).into())
            }
            BlockStatus::Unknown => {}
        }

        let prev_state_root = match self.resolve_predecessor(block) {
            Ok(root) => root,
            Err(outcome) => {
                self.apply_outcome_status(block, &outcome);
                return Err(outcome);
            }
        };

        let result = self.run_checks(block, prev_state_root);
        match &result {
            Ok(()) => block.set_status(BlockStatus::Valid),
            Err(outcome) => self.apply_outcome_status(block, outcome),
        }
        result
    }

    fn apply_outcome_status(&self, block: &Block, outcome: &ValidationOutcome) {
        match outcome {
            ValidationOutcome::Failure(_) => block.set_status(BlockStatus::Invalid),
            ValidationOutcome::Error(_) => block.set_status(BlockStatus::Unknown),
        }
    }

    /// Resolves the predecessor's state root, or raises `ValidationError`
    /// / `ValidationFailure` per spec §4.5's predecessor-resolution table.
    fn resolve_predecessor(&self, block: &Block) -> Result<libra_crypto::HashValue, ValidationOutcome> {
        if block.previous_block_id == *NULL_BLOCK_IDENTIFIER {
            return Ok(*INIT_ROOT);
        }

        match self.block_cache.get(&block.previous_block_id) {
            None => Err(ValidationError::MissingPredecessor(block.previous_block_id.to_string()).into()),
            Some(predecessor) => match predecessor.status() {
                BlockStatus::Invalid => Err(ValidationFailure::InvalidPredecessor(
                    predecessor.block_id.to_string(),
                )
                .into()),
                BlockStatus::Unknown => {
                    Err(ValidationError::PredecessorUnknown(predecessor.block_id.to_string()).into())
                }
                BlockStatus::Valid => Ok(predecessor.state_root_hash),
            },
        }
    }

    fn run_checks(&self, block: &Block, prev_state_root: libra_crypto::HashValue) -> Result<(), ValidationOutcome> {
        if !self.permission_gate.is_permitted(block, &prev_state_root)? {
            return Err(ValidationFailure::UnauthorizedSigner(block.signer_public_key.clone()).into());
        }

        let predecessor = self.block_cache.get(&block.previous_block_id);
        let consensus_module = self.consensus_loader.for_predecessor(predecessor.as_deref())?;
        let ctx = self.consensus_loader.verifier_context();
        let mut verifier = consensus_module.block_verifier(&ctx)?;
        if !verifier.verify_block(block)? {
            return Err(ValidationFailure::ConsensusRejected.into());
        }

        if !self.rule_enforcer.enforces(block, &prev_state_root)? {
            return Err(ValidationFailure::RulesViolation.into());
        }

        let outcome = self
            .batch_validator
            .validate(block, prev_state_root)
            .map_err(|outcome| {
                warn!("batch validation failed for block {}: {}", block.block_id, outcome);
                outcome
            })?;
        block.attach_outcome(outcome);
        Ok(())
    }
}
