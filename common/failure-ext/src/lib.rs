// Copyright (c) The Libra Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! A thin re-export of the `failure` crate. Every error type in the
//! codebase derives `Fail` rather than hand-rolling `std::error::Error`
//! impls; this crate is the one place that names the `failure` version in
//! use, so the rest of the codebase depends on `libra-failure-ext` instead
//! of `failure` directly.

pub use failure::{bail, ensure, format_err, Error, Fail};

pub type Result<T> = std::result::Result<T, Error>;
