// Copyright (c) The Libra Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Scenario-based tests S1–S6 from spec §8, exercised through the public
//! `BlockValidationEngine` surface with the mock collaborators in
//! `crate::mocks`.

use crate::batch_validator::BatchExecutionResult;
use crate::block::{Batch, Block, BlockStatus, Transaction, NULL_BLOCK_IDENTIFIER};
use crate::mocks::*;
use crate::{BlockValidationEngine, Collaborators, EngineConfig};
use libra_crypto::HashValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn hv(byte: u8) -> HashValue {
    HashValue::new([byte; HashValue::LENGTH])
}

struct Harness {
    engine: BlockValidationEngine,
    block_cache: Arc<MockBlockCache>,
    executor_script: Arc<Mutex<ExecutorScript>>,
    cancelled: Arc<std::sync::atomic::AtomicBool>,
    callbacks: Arc<Mutex<Vec<Arc<Block>>>>,
}

fn build_harness(
    heads: Vec<Option<HashValue>>,
    consensus_accepts: bool,
    permission_authorized: bool,
    rules_pass: bool,
) -> Harness {
    build_harness_with_committed(heads, consensus_accepts, permission_authorized, rules_pass, vec![])
}

fn build_harness_with_committed(
    heads: Vec<Option<HashValue>>,
    consensus_accepts: bool,
    permission_authorized: bool,
    rules_pass: bool,
    committed_batches: Vec<HashValue>,
) -> Harness {
    let store = MockBlockStoreHandle::new(heads);
    let block_cache = MockBlockCache::new(store);
    let executor_script = Arc::new(Mutex::new(ExecutorScript::default()));
    let executor = MockTransactionExecutor::new(Arc::clone(&executor_script));
    let cancelled = Arc::clone(&executor.cancelled);

    let commit_state_factory = MockChainCommitStateFactory {
        committed_batches: committed_batches.into_iter().collect(),
        committed_transactions: Default::default(),
    };

    let collaborators = Collaborators {
        block_cache: block_cache.clone() as Arc<dyn crate::block::BlockCache>,
        transaction_executor: executor as Arc<dyn crate::batch_validator::TransactionExecutor>,
        chain_commit_state_factory: Arc::new(commit_state_factory),
        squash_handler: Arc::new(|root, _deltas: &[HashValue]| root),
        permission_verifier: Arc::new(MockPermissionVerifier {
            authorized: permission_authorized,
        }),
        settings_view_factory: Arc::new(MockSettingsViewFactory),
        rule_enforcer: Arc::new(MockRuleEnforcer { passes: rules_pass }),
        consensus_factory: Arc::new(MockConsensusFactory { accepts: consensus_accepts }),
        state_view_factory: Arc::new(MockStateViewFactory),
        identity_signer: Arc::new(MockIdentitySigner),
    };

    let engine = BlockValidationEngine::new(EngineConfig::default(), collaborators);

    Harness {
        engine,
        block_cache,
        executor_script,
        cancelled,
        callbacks: Arc::new(Mutex::new(Vec::new())),
    }
}

fn batch_with_txns(batch_id: HashValue, txns: Vec<(HashValue, Vec<HashValue>)>) -> Batch {
    Batch {
        batch_id,
        signer_public_key: "signer".to_string(),
        transactions: txns
            .into_iter()
            .map(|(id, deps)| Transaction {
                transaction_id: id,
                dependencies: deps,
            })
            .collect(),
    }
}

fn script_batch_ok(harness: &Harness, batch_id: HashValue, result_root: HashValue, txns: &[HashValue]) {
    let mut script = harness.executor_script.lock().unwrap();
    script.batch_results.insert(
        batch_id,
        BatchExecutionResult {
            is_valid: true,
            state_hash: result_root,
        },
    );
    script.txn_results.insert(
        batch_id,
        txns
            .iter()
            .map(|id| crate::block::TransactionExecutionResult {
                transaction_id: *id,
                is_valid: true,
            })
            .collect(),
    );
}

fn wait_for_settle(harness: &Harness) {
    harness.engine.stop();
    std::thread::sleep(Duration::from_millis(10));
}

/// S1 — linear valid chain: both blocks end Valid, callbacks fire twice.
#[test]
fn s1_linear_valid_chain() {
    let root0 = hv(0);
    let root1 = hv(1);
    let root2 = hv(2);

    let harness = build_harness(vec![None], true, true, true);

    let genesis = Arc::new(Block::new(hv(10), *NULL_BLOCK_IDENTIFIER, 0, "genesis".into(), vec![], root0));
    genesis.set_status(BlockStatus::Valid);
    harness.block_cache.insert(Arc::clone(&genesis));

    let batch1 = hv(101);
    script_batch_ok(&harness, batch1, root1, &[hv(201)]);
    let block1 = Arc::new(Block::new(
        hv(11),
        genesis.block_id,
        1,
        "signer".into(),
        vec![batch_with_txns(batch1, vec![(hv(201), vec![])])],
        root1,
    ));

    let batch2 = hv(102);
    script_batch_ok(&harness, batch2, root2, &[hv(202)]);
    let block2 = Arc::new(Block::new(
        hv(12),
        block1.block_id,
        2,
        "signer".into(),
        vec![batch_with_txns(batch2, vec![(hv(202), vec![])])],
        root2,
    ));

    harness.block_cache.insert(Arc::clone(&block1));
    harness.block_cache.insert(Arc::clone(&block2));

    let callbacks = Arc::clone(&harness.callbacks);
    let cb = Arc::new(move |b: Arc<Block>| callbacks.lock().unwrap().push(b));
    harness
        .engine
        .submit_blocks_for_verification(vec![Arc::clone(&block1), Arc::clone(&block2)], cb);

    wait_for_settle(&harness);

    assert_eq!(block1.status(), BlockStatus::Valid);
    assert_eq!(block2.status(), BlockStatus::Valid);
    assert_eq!(harness.callbacks.lock().unwrap().len(), 2);
}

/// S2 — invalid middle, descendant parked first: B2 is submitted before
/// B1; B1's declared root mismatches execution, so B1 goes Invalid and
/// B2 is cascade-invalidated without ever running its own validation.
#[test]
fn s2_invalid_middle_descendant_parked_first() {
    let root0 = hv(0);
    let declared_root1 = hv(1);
    let actual_root1 = hv(99); // deliberately wrong
    let root2 = hv(2);

    let harness = build_harness(vec![None], true, true, true);

    let genesis = Arc::new(Block::new(hv(10), *NULL_BLOCK_IDENTIFIER, 0, "genesis".into(), vec![], root0));
    genesis.set_status(BlockStatus::Valid);
    harness.block_cache.insert(Arc::clone(&genesis));

    let batch1 = hv(101);
    script_batch_ok(&harness, batch1, actual_root1, &[hv(201)]);
    let block1 = Arc::new(Block::new(
        hv(11),
        genesis.block_id,
        1,
        "signer".into(),
        vec![batch_with_txns(batch1, vec![(hv(201), vec![])])],
        declared_root1,
    ));

    let batch2 = hv(102);
    script_batch_ok(&harness, batch2, root2, &[hv(202)]);
    let block2 = Arc::new(Block::new(
        hv(12),
        block1.block_id,
        2,
        "signer".into(),
        vec![batch_with_txns(batch2, vec![(hv(202), vec![])])],
        root2,
    ));

    harness.block_cache.insert(Arc::clone(&block1));
    harness.block_cache.insert(Arc::clone(&block2));

    let callbacks = Arc::clone(&harness.callbacks);
    let cb = Arc::new(move |b: Arc<Block>| callbacks.lock().unwrap().push(b));

    // Submit B2 first: its predecessor B1 is neither processing nor
    // pending yet, and is absent from the cache's "resolved" view at
    // admission time only in the sense that it is not yet Valid/Invalid
    // — B1 is present but Unknown, so B2 parks.
    harness.engine.submit_blocks_for_verification(vec![Arc::clone(&block2)], Arc::clone(&cb));
    assert!(harness.engine.in_pending(&block2.block_id));

    harness.engine.submit_blocks_for_verification(vec![Arc::clone(&block1)], cb);

    wait_for_settle(&harness);

    assert_eq!(block1.status(), BlockStatus::Invalid);
    assert_eq!(block2.status(), BlockStatus::Invalid);
    assert!(!harness.engine.in_pending(&block2.block_id));
}

/// S3 — error in the middle: B1 fails with a `ValidationError` (the
/// scheduler errors out). B1 ends Unknown; B2 is purged from pending and
/// the block cache rather than invalidated.
#[test]
fn s3_error_in_middle() {
    let root0 = hv(0);
    let root1 = hv(1);
    let root2 = hv(2);

    let harness = build_harness(vec![None], true, true, true);

    let genesis = Arc::new(Block::new(hv(10), *NULL_BLOCK_IDENTIFIER, 0, "genesis".into(), vec![], root0));
    genesis.set_status(BlockStatus::Valid);
    harness.block_cache.insert(Arc::clone(&genesis));

    harness.executor_script.lock().unwrap().fail_execute = true;

    let batch1 = hv(101);
    let block1 = Arc::new(Block::new(
        hv(11),
        genesis.block_id,
        1,
        "signer".into(),
        vec![batch_with_txns(batch1, vec![(hv(201), vec![])])],
        root1,
    ));

    let batch2 = hv(102);
    let block2 = Arc::new(Block::new(
        hv(12),
        block1.block_id,
        2,
        "signer".into(),
        vec![batch_with_txns(batch2, vec![(hv(202), vec![])])],
        root2,
    ));

    harness.block_cache.insert(Arc::clone(&block1));
    harness.block_cache.insert(Arc::clone(&block2));

    let callbacks = Arc::clone(&harness.callbacks);
    let cb = Arc::new(move |b: Arc<Block>| callbacks.lock().unwrap().push(b));

    harness.engine.submit_blocks_for_verification(vec![Arc::clone(&block2)], Arc::clone(&cb));
    harness.engine.submit_blocks_for_verification(vec![Arc::clone(&block1)], cb);

    wait_for_settle(&harness);

    assert_eq!(block1.status(), BlockStatus::Unknown);
    assert!(!harness.engine.in_pending(&block2.block_id));
    assert!(!harness.block_cache.contains(&block2.block_id));
}

/// S4 — duplicate batch: a batch id already committed on this chain
/// makes the block Invalid, and the scheduler must have been cancelled.
#[test]
fn s4_duplicate_batch() {
    let root0 = hv(0);
    let root1 = hv(1);

    let duplicate_batch = hv(101);
    let harness = build_harness_with_committed(vec![None], true, true, true, vec![duplicate_batch]);

    let genesis = Arc::new(Block::new(hv(10), *NULL_BLOCK_IDENTIFIER, 0, "genesis".into(), vec![], root0));
    genesis.set_status(BlockStatus::Valid);
    harness.block_cache.insert(Arc::clone(&genesis));

    let block1 = Arc::new(Block::new(
        hv(11),
        genesis.block_id,
        1,
        "signer".into(),
        vec![batch_with_txns(duplicate_batch, vec![(hv(201), vec![])])],
        root1,
    ));
    harness.block_cache.insert(Arc::clone(&block1));

    let result = harness.engine.validate_block(&block1);
    assert!(result.is_ok()); // synchronous path swallows the cascade error, not the validation outcome
    assert_eq!(block1.status(), BlockStatus::Invalid);
    assert!(harness.cancelled.load(std::sync::atomic::Ordering::SeqCst));
}

/// S5 — chain-head race: the block store's head changes mid-validation;
/// the worker resets status to Unknown and re-runs exactly once more.
#[test]
fn s5_chain_head_race() {
    let root0 = hv(0);
    let root1 = hv(1);

    let head_v1 = hv(200);
    let head_v2 = hv(201);
    let harness = build_harness(vec![Some(head_v1), Some(head_v2), Some(head_v2)], true, true, true);

    let genesis = Arc::new(Block::new(hv(10), *NULL_BLOCK_IDENTIFIER, 0, "genesis".into(), vec![], root0));
    genesis.set_status(BlockStatus::Valid);
    harness.block_cache.insert(Arc::clone(&genesis));

    let batch1 = hv(101);
    script_batch_ok(&harness, batch1, root1, &[hv(201)]);
    let block1 = Arc::new(Block::new(
        hv(11),
        genesis.block_id,
        1,
        "signer".into(),
        vec![batch_with_txns(batch1, vec![(hv(201), vec![])])],
        root1,
    ));
    harness.block_cache.insert(Arc::clone(&block1));

    let callbacks = Arc::clone(&harness.callbacks);
    let cb = Arc::new(move |b: Arc<Block>| callbacks.lock().unwrap().push(b));
    harness.engine.submit_blocks_for_verification(vec![Arc::clone(&block1)], cb);

    wait_for_settle(&harness);

    assert_eq!(block1.status(), BlockStatus::Valid);
    assert_eq!(harness.callbacks.lock().unwrap().len(), 1);
}

/// S6 — genesis: permission and rules are skipped, the `"genesis"`
/// consensus module is loaded, and the previous state root is `INIT_ROOT`.
#[test]
fn s6_genesis() {
    let init_root = *crate::block::INIT_ROOT;

    // Permission and rules would reject everything; genesis must skip them.
    let harness = build_harness(vec![None], true, false, false);

    let batch0 = hv(1);
    script_batch_ok(&harness, batch0, init_root, &[hv(2)]);
    let genesis = Arc::new(Block::new(
        hv(10),
        *NULL_BLOCK_IDENTIFIER,
        0,
        "genesis-signer".into(),
        vec![batch_with_txns(batch0, vec![(hv(2), vec![])])],
        init_root,
    ));
    harness.block_cache.insert(Arc::clone(&genesis));

    let result = harness.engine.validate_block(&genesis);
    assert!(result.is_ok());
    assert_eq!(genesis.status(), BlockStatus::Valid);
}
