// Copyright (c) The Libra Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! The two error kinds a validation can end in (spec §7), plus the sum
//! type that threads them through the call chain from `BatchValidator` up
//! to `SingleBlockValidator`.

use failure::Fail;

/// The block is definitively invalid given the current chain state.
/// Causes the block's status to become `Invalid` and its parked
/// descendants to be transitively invalidated.
#[derive(Debug, Fail, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[fail(display = "batch {} is already committed on this chain", _0)]
    DuplicateBatch(String),

    #[fail(display = "transaction {} is already committed on this chain", _0)]
    DuplicateTransaction(String),

    #[fail(display = "transaction {} has an unsatisfied dependency {}", txn_id, dependency)]
    UnsatisfiedDependency { txn_id: String, dependency: String },

    #[fail(display = "no execution result for batch {}", _0)]
    MissingBatchResult(String),

    #[fail(display = "batch {} failed execution", _0)]
    InvalidBatch(String),

    #[fail(
        display = "declared state root {} does not match resulting root {}",
        expected, found
    )]
    StateRootMismatch { expected: String, found: String },

    #[fail(display = "batch signer {} is not authorized", _0)]
    UnauthorizedSigner(String),

    #[fail(display = "block rejected by consensus module")]
    ConsensusRejected,

    #[fail(display = "block violates on-chain validation rules")]
    RulesViolation,

    #[fail(display = "block rejected due to invalid predecessor {}", _0)]
    InvalidPredecessor(String),

    #[fail(display = "block {} is already known to be invalid", _0)]
    AlreadyInvalid(String),
}

/// Validation could not complete: missing data or an internal fault.
/// Causes the block's status to become (or remain) `Unknown`; its
/// descendants are purged from the cache rather than invalidated, so they
/// may be retried once the ancestor becomes resolvable again.
#[derive(Debug, Fail, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[fail(display = "predecessor block {} is not present in the block cache", _0)]
    MissingPredecessor(String),

    #[fail(display = "predecessor block {} has not yet been validated", _0)]
    PredecessorUnknown(String),

    #[fail(display = "chain head changed {} times while validating; giving up", _0)]
    ChurnExhausted(usize),

    #[fail(display = "{}", _0)]
    Internal(String),
}

impl ValidationError {
    pub fn internal(msg: impl Into<String>) -> Self {
        ValidationError::Internal(msg.into())
    }
}

/// The sum of the two error kinds above, returned by every check in the
/// `SingleBlockValidator` chain so the caller can tell which cascade path
/// (invalidate vs. purge) applies.
#[derive(Debug, Fail, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    #[fail(display = "{}", _0)]
    Failure(ValidationFailure),

    #[fail(display = "{}", _0)]
    Error(ValidationError),
}

impl From<ValidationFailure> for ValidationOutcome {
    fn from(failure: ValidationFailure) -> Self {
        ValidationOutcome::Failure(failure)
    }
}

impl From<ValidationError> for ValidationOutcome {
    fn from(error: ValidationError) -> Self {
        ValidationOutcome::Error(error)
    }
}

impl ValidationOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ValidationOutcome::Failure(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationOutcome::Error(_))
    }
}
