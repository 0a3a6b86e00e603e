// Copyright (c) The Libra Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! §4.2 PermissionGate: checks batch signer authorization against on-chain
//! transactor permissions as of the previous block.

use crate::block::{Batch, Block, StateRoot};
use crate::error::ValidationError;
use std::sync::Arc;

/// Authorization oracle over transactor permissions in state.
pub trait PermissionVerifier: Send + Sync {
    fn is_batch_signer_authorized(
        &self,
        batch: &Batch,
        state_root: &StateRoot,
        from_state: bool,
    ) -> Result<bool, ValidationError>;
}

pub struct PermissionGate {
    verifier: Arc<dyn PermissionVerifier>,
}

impl PermissionGate {
    pub fn new(verifier: Arc<dyn PermissionVerifier>) -> Self {
        PermissionGate { verifier }
    }

    /// Genesis blocks trivially pass (spec §4.2). Non-genesis blocks are
    /// rejected as soon as any batch's signer is unauthorized.
    pub fn is_permitted(&self, block: &Block, prev_state_root: &StateRoot) -> Result<bool, ValidationError> {
        if block.is_genesis() {
            return Ok(true);
        }
        for batch in &block.batches {
            if !self
                .verifier
                .is_batch_signer_authorized(batch, prev_state_root, true)?
            {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
