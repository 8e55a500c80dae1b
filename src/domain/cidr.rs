// Copyright (c) 2025 - Cowboy AI, Inc.
//! CIDR Block Value Object and Overlap Detection
//!
//! Provides the validated [`CidrBlock`] value object and the pure functions
//! used to compare address ranges when reconciling a network's CIDR
//! associations.
//!
//! # Equality vs. Overlap
//!
//! [`cidr_equals`] and [`cidr_overlap`] are deliberately disjoint: two equal
//! blocks are *not* reported as overlapping. Callers use equality to recognise
//! "the block we already expect" and overlap to detect a genuine conflict.
//!
//! ```rust
//! use cim_network_convergence::domain::{cidr_overlap, CidrBlock};
//!
//! let a = CidrBlock::parse("10.0.0.0/24").unwrap();
//! let b = CidrBlock::parse("10.0.0.128/25").unwrap();
//! let c = CidrBlock::parse("10.1.0.0/24").unwrap();
//! assert!(cidr_overlap(&a, &b));
//! assert!(!cidr_overlap(&a, &c));
//! ```

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32 for IPv4, 0-128 for IPv6)")]
    InvalidPrefixLength(u8),

    #[error("Prefix length {requested} is shorter than the enclosing block prefix {enclosing}")]
    PrefixTooShort { requested: u8, enclosing: u8 },
}

/// CIDR block value object
///
/// Invariants:
/// - Valid CIDR notation (address and prefix length both required)
/// - Prefix length within range for the address family
/// - Stored in canonical form: host bits are cleared, so `10.0.0.7/24`
///   and `10.0.0.0/24` denote the same block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CidrBlock(IpNet);

impl CidrBlock {
    /// Parse a CIDR block such as `"10.0.0.0/16"` or `"2001:db8::/56"`
    pub fn parse(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        let cidr = cidr.as_ref().trim();
        if !cidr.contains('/') {
            return Err(NetworkError::InvalidCidr(cidr.to_string()));
        }
        let net = IpNet::from_str(cidr).map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;
        Ok(Self(net.trunc()))
    }

    /// Build a block from a network address and prefix length
    pub fn from_parts(address: IpAddr, prefix_length: u8) -> Result<Self, NetworkError> {
        let net = IpNet::new(address, prefix_length)
            .map_err(|_| NetworkError::InvalidPrefixLength(prefix_length))?;
        Ok(Self(net.trunc()))
    }

    pub fn network(&self) -> IpAddr {
        self.0.network()
    }

    /// Last address of the block (the broadcast address for IPv4)
    pub fn broadcast(&self) -> IpAddr {
        self.0.broadcast()
    }

    pub fn prefix_length(&self) -> u8 {
        self.0.prefix_len()
    }

    /// 32 for IPv4, 128 for IPv6
    pub fn max_prefix_length(&self) -> u8 {
        self.0.max_prefix_len()
    }

    pub fn is_ipv4(&self) -> bool {
        matches!(self.0, IpNet::V4(_))
    }

    pub fn is_ipv6(&self) -> bool {
        matches!(self.0, IpNet::V6(_))
    }

    /// Whether `address` falls inside this block
    pub fn contains(&self, address: &IpAddr) -> bool {
        self.0.contains(address)
    }

    /// Whether `other` is fully inside this block (a block contains itself)
    pub fn contains_block(&self, other: &CidrBlock) -> bool {
        self.0.contains(&other.0)
    }

    pub fn as_ipnet(&self) -> &IpNet {
        &self.0
    }
}

impl fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CidrBlock {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CidrBlock {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CidrBlock> for String {
    fn from(value: CidrBlock) -> Self {
        value.to_string()
    }
}

impl From<IpNet> for CidrBlock {
    fn from(net: IpNet) -> Self {
        Self(net.trunc())
    }
}

/// True iff both blocks denote exactly the same network (address + prefix)
pub fn cidr_equals(a: &CidrBlock, b: &CidrBlock) -> bool {
    a == b
}

/// True iff the blocks share at least one address and are not equal
///
/// CIDR ranges either nest or are disjoint, so sharing an address means one
/// contains the other's network address. Blocks of different address
/// families never overlap.
pub fn cidr_overlap(a: &CidrBlock, b: &CidrBlock) -> bool {
    if cidr_equals(a, b) {
        return false;
    }
    a.contains_block(b) || b.contains_block(a)
}

/// Parse both strings and test them for overlap
///
/// Returns an error if either string is not valid CIDR notation.
pub fn cidr_overlap_str(a: &str, b: &str) -> Result<bool, NetworkError> {
    Ok(cidr_overlap(&CidrBlock::parse(a)?, &CidrBlock::parse(b)?))
}

/// Collect the entries of `existing` that overlap `candidate`
///
/// `existing` holds provider-side records, which are not trusted to be well
/// formed. Malformed entries are logged and skipped so that a single bad
/// record never blocks convergence of unrelated ranges. Entries equal to the
/// candidate are not conflicts.
pub fn find_conflicts<S: AsRef<str>>(candidate: &CidrBlock, existing: &[S]) -> Vec<CidrBlock> {
    let mut conflicts = Vec::new();
    for raw in existing {
        match CidrBlock::parse(raw.as_ref()) {
            Ok(block) if cidr_overlap(candidate, &block) => conflicts.push(block),
            Ok(_) => {}
            Err(e) => warn!(
                "Skipping malformed cidr block {:?} during overlap check: {}",
                raw.as_ref(),
                e
            ),
        }
    }
    conflicts
}
