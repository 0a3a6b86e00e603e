// Copyright (c) The Libra Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! §4.3 RuleEnforcer: applies on-chain validation rules derived from
//! settings at the previous state.

use crate::block::{Batch, Block, StateRoot};
use crate::error::ValidationError;
use crate::state_view::{SettingsView, SettingsViewFactory};
use std::sync::Arc;

/// The pluggable on-chain rule set (e.g. max-batches-per-block,
/// max-transactions-per-batch) evaluated against a settings view.
pub trait ValidationRuleEnforcer: Send + Sync {
    fn enforce_rules(
        &self,
        settings: Arc<dyn SettingsView>,
        signer_public_key: &str,
        batches: &[Batch],
    ) -> Result<bool, ValidationError>;
}

pub struct RuleEnforcer {
    settings_factory: Arc<dyn SettingsViewFactory>,
    enforcer: Arc<dyn ValidationRuleEnforcer>,
}

impl RuleEnforcer {
    pub fn new(
        settings_factory: Arc<dyn SettingsViewFactory>,
        enforcer: Arc<dyn ValidationRuleEnforcer>,
    ) -> Self {
        RuleEnforcer {
            settings_factory,
            enforcer,
        }
    }

    /// Genesis blocks trivially pass (spec §4.3).
    pub fn enforces(&self, block: &Block, prev_state_root: &StateRoot) -> Result<bool, ValidationError> {
        if block.is_genesis() {
            return Ok(true);
        }
        let settings = self.settings_factory.settings_view(prev_state_root)?;
        self.enforcer
            .enforce_rules(settings, &block.signer_public_key, &block.batches)
    }
}
