// Copyright (c) The Libra Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Cryptographic primitives shared across the codebase. Block validation
//! only consumes `HashValue`, the fixed-width digest type used for block,
//! batch, transaction and state-root identifiers; the full signature and
//! key-derivation surface this crate carries elsewhere is out of scope
//! here.

use rand::Rng;
use sha3::{Digest, Sha3_256};
use std::convert::TryFrom;
use std::fmt;

/// A 32-byte cryptographic digest, used throughout the codebase as the
/// identifier type for blocks, batches, transactions and state roots.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashValue([u8; HashValue::LENGTH]);

impl HashValue {
    pub const LENGTH: usize = 32;

    pub fn new(bytes: [u8; Self::LENGTH]) -> Self {
        HashValue(bytes)
    }

    /// The all-zero digest, used as the sentinel predecessor of genesis.
    pub fn zero() -> Self {
        HashValue([0u8; Self::LENGTH])
    }

    /// A pseudo-random digest, handy for tests and synthetic fixtures.
    pub fn random() -> Self {
        let mut bytes = [0u8; Self::LENGTH];
        rand::thread_rng().fill(&mut bytes);
        HashValue(bytes)
    }

    /// The SHA3-256 digest of `data`.
    pub fn sha3_256_of(data: &[u8]) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.input(data);
        let digest = hasher.result();
        let mut bytes = [0u8; Self::LENGTH];
        bytes.copy_from_slice(&digest);
        HashValue(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashValueParseError> {
        if bytes.len() != Self::LENGTH {
            return Err(HashValueParseError::WrongLength(bytes.len()));
        }
        let mut out = [0u8; Self::LENGTH];
        out.copy_from_slice(bytes);
        Ok(HashValue(out))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, HashValueParseError> {
        let bytes = hex::decode(s).map_err(|_| HashValueParseError::InvalidHex)?;
        Self::from_slice(&bytes)
    }
}

impl TryFrom<&[u8]> for HashValue {
    type Error = HashValueParseError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_slice(bytes)
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashValue({})", self.to_hex())
    }
}

impl Default for HashValue {
    fn default() -> Self {
        Self::zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashValueParseError {
    WrongLength(usize),
    InvalidHex,
}

impl fmt::Display for HashValueParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashValueParseError::WrongLength(n) => {
                write!(f, "expected {} bytes, found {}", HashValue::LENGTH, n)
            }
            HashValueParseError::InvalidHex => write!(f, "invalid hex digest"),
        }
    }
}

impl std::error::Error for HashValueParseError {}
