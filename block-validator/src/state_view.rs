// Copyright (c) The Libra Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Thin collaborator seams for state/settings views (spec §6). The engine
//! never reads state itself — it hands a merkle root to the factory and
//! passes the resulting view straight through to the permission verifier,
//! rule enforcer and consensus module.

use crate::block::{Block, StateRoot};
use crate::error::ValidationError;
use std::sync::Arc;

/// Opaque read-only view over account/global state as of a merkle root.
pub trait StateView: Send + Sync {}

/// Given a merkle root, returns a read-only view over that state.
pub trait StateViewFactory: Send + Sync {
    fn state_view(&self, state_root: &StateRoot) -> Result<Arc<dyn StateView>, ValidationError>;

    fn state_view_for_block(&self, block: &Block) -> Result<Arc<dyn StateView>, ValidationError> {
        self.state_view(&block.state_root_hash)
    }
}

/// Opaque settings view, wrapping a state view (spec §4.3).
pub trait SettingsView: Send + Sync {}

/// Wraps a `StateViewFactory` to yield settings views.
pub trait SettingsViewFactory: Send + Sync {
    fn settings_view(&self, state_root: &StateRoot) -> Result<Arc<dyn SettingsView>, ValidationError>;
}

/// Yields this validator's own public key (hex), used when constructing a
/// consensus module's `BlockVerifier` (spec §4.4, §6).
pub trait IdentitySigner: Send + Sync {
    fn public_key_hex(&self) -> String;
}
