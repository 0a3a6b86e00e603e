// Copyright (c) The Libra Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! A thin structured-logging facade over `slog`. Every component in the
//! codebase logs through `libra_logger::prelude::*` rather than reaching
//! for `println!`/`log` directly, so log output stays structured and
//! routes through one async drain.
//!
//! Do NOT add any inter-project dependencies here — this crate sits below
//! everything else in the dependency graph.

use slog::{o, Drain};
use std::sync::Mutex;

lazy_static::lazy_static! {
    static ref ROOT_LOGGER: slog::Logger = build_root_logger();
}

fn build_root_logger() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = Mutex::new(drain).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    slog::Logger::root(drain, o!())
}

/// The logger every `info!`/`debug!`/`warn!`/`error!` call site writes to.
pub fn logger() -> &'static slog::Logger {
    &ROOT_LOGGER
}

#[macro_export]
macro_rules! debug {
    ($($args:tt)+) => { slog::debug!($crate::logger(), $($args)+) };
}

#[macro_export]
macro_rules! info {
    ($($args:tt)+) => { slog::info!($crate::logger(), $($args)+) };
}

#[macro_export]
macro_rules! warn {
    ($($args:tt)+) => { slog::warn!($crate::logger(), $($args)+) };
}

#[macro_export]
macro_rules! error {
    ($($args:tt)+) => { slog::error!($crate::logger(), $($args)+) };
}

pub mod prelude {
    pub use crate::{debug, error, info, warn};
}
