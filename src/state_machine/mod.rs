// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provider State Classification
//!
//! Cloud control planes are eventually consistent: a mutating call returns
//! before the resource settles, and the resource then walks through
//! provider-defined transition codes. This module turns such a code into a
//! decision for the caller.
//!
//! # Outcomes
//!
//! - **Delay**: mid-transition, poll again after the interval
//! - **Act**: reached the state the caller waits for, continue with the next step
//! - **Error**: terminal failure or a stable state contradicting the desired action
//! - **Ignore**: nothing to do, treat as already satisfied
//!
//! # Design Principles
//!
//! 1. **Declarative**: a table is built once per call site, never mutated
//! 2. **Total**: every code resolves to exactly one outcome; unclassified
//!    codes resolve to the builder's default
//! 3. **Pure**: classification has no side effects
//!
//! # Example
//!
//! ```rust
//! use cim_network_convergence::state_machine::{CidrBlockState, Outcome, StateCaseBuilder};
//!
//! let table = StateCaseBuilder::new(Outcome::Delay)
//!     .act([CidrBlockState::Associated])
//!     .error([CidrBlockState::Failing, CidrBlockState::Failed])
//!     .build();
//!
//! assert_eq!(table.case(&CidrBlockState::Associated), Outcome::Act);
//! assert_eq!(table.case(&CidrBlockState::Associating), Outcome::Delay);
//! ```

pub mod transition_codes;

pub use transition_codes::{
    cidr_association_settle, gateway_attachment, gateway_ready, network_ready, AttachmentState,
    CidrBlockState, ResourceState,
};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Decision for an observed transition code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Delay,
    Act,
    Error,
    Ignore,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Delay => "delay",
            Outcome::Act => "act",
            Outcome::Error => "error",
            Outcome::Ignore => "ignore",
        };
        f.write_str(s)
    }
}

/// Builder for a [`StateCase`] decision table
///
/// A code classified more than once keeps its last classification.
#[derive(Debug, Clone)]
pub struct StateCaseBuilder<C> {
    default: Outcome,
    table: HashMap<C, Outcome>,
}

impl<C: Eq + Hash> StateCaseBuilder<C> {
    /// Start a table whose unclassified codes resolve to `default`
    pub fn new(default: Outcome) -> Self {
        Self {
            default,
            table: HashMap::new(),
        }
    }

    pub fn delay(self, codes: impl IntoIterator<Item = C>) -> Self {
        self.classify(Outcome::Delay, codes)
    }

    pub fn act(self, codes: impl IntoIterator<Item = C>) -> Self {
        self.classify(Outcome::Act, codes)
    }

    pub fn error(self, codes: impl IntoIterator<Item = C>) -> Self {
        self.classify(Outcome::Error, codes)
    }

    pub fn ignore(self, codes: impl IntoIterator<Item = C>) -> Self {
        self.classify(Outcome::Ignore, codes)
    }

    fn classify(mut self, outcome: Outcome, codes: impl IntoIterator<Item = C>) -> Self {
        for code in codes {
            self.table.insert(code, outcome);
        }
        self
    }

    pub fn build(self) -> StateCase<C> {
        StateCase {
            default: self.default,
            table: self.table,
        }
    }
}

/// Immutable decision table mapping transition codes to outcomes
#[derive(Debug, Clone)]
pub struct StateCase<C> {
    default: Outcome,
    table: HashMap<C, Outcome>,
}

impl<C: Eq + Hash> StateCase<C> {
    /// Classify an observed code
    pub fn case(&self, code: &C) -> Outcome {
        self.table.get(code).copied().unwrap_or(self.default)
    }

    pub fn default_outcome(&self) -> Outcome {
        self.default
    }

    /// Whether `code` was explicitly classified
    pub fn is_classified(&self, code: &C) -> bool {
        self.table.contains_key(code)
    }
}
