// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Topology Invariants
//!
//! Business rules checked before and during a convergence pass. All
//! functions are pure (no I/O, no mutation) so the engine can decide what to
//! change before it changes anything.
//!
//! # Invariant Categories
//!
//! 1. **Structural Invariants**: the requested topology is well formed
//! 2. **Immutability Invariants**: fields fixed at creation stay fixed
//! 3. **Planning Invariants**: secondary blocks never overlap one another

use tracing::warn;

use super::cidr::{cidr_equals, cidr_overlap, CidrBlock};
use super::topology::{CidrBlockAssociation, NetworkRecord};

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name is required")]
    NameRequired,

    #[error("at least one CIDR block is required")]
    CidrBlocksRequired,

    #[error("CIDR block {block:?} is invalid: {reason}")]
    MalformedCidr { block: String, reason: String },

    #[error("CIDR block {0} is listed more than once")]
    DuplicateCidr(CidrBlock),

    #[error("CIDR block {block} overlaps {other}")]
    OverlappingCidr { block: CidrBlock, other: CidrBlock },

    #[error("provider client is required")]
    ClientRequired,

    /// A field fixed at creation differs between live and desired state
    #[error("{field} is immutable: live {live}, desired {desired}")]
    Immutable {
        field: &'static str,
        live: String,
        desired: String,
    },
}

/// Validate the topology name
pub fn validate_name(name: &str) -> ValidationResult {
    if name.trim().is_empty() {
        return Err(ValidationError::NameRequired);
    }
    Ok(())
}

/// Parse and cross-check the desired CIDR blocks
///
/// Every violation is collected: malformed entries, exact duplicates and
/// overlapping pairs. The parsed blocks keep their input order.
pub fn validate_cidr_blocks<S: AsRef<str>>(
    blocks: &[S],
) -> Result<Vec<CidrBlock>, Vec<ValidationError>> {
    if blocks.is_empty() {
        return Err(vec![ValidationError::CidrBlocksRequired]);
    }

    let mut errors = Vec::new();
    let mut parsed: Vec<CidrBlock> = Vec::with_capacity(blocks.len());

    for raw in blocks {
        match CidrBlock::parse(raw.as_ref()) {
            Ok(block) => {
                if parsed.iter().any(|earlier| cidr_equals(earlier, &block)) {
                    errors.push(ValidationError::DuplicateCidr(block));
                    continue;
                }
                for earlier in parsed.iter().filter(|e| cidr_overlap(e, &block)) {
                    errors.push(ValidationError::OverlappingCidr {
                        block,
                        other: *earlier,
                    });
                }
                parsed.push(block);
            }
            Err(e) => errors.push(ValidationError::MalformedCidr {
                block: raw.as_ref().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    if errors.is_empty() {
        Ok(parsed)
    } else {
        Err(errors)
    }
}

/// The primary block of an existing network cannot be changed
pub fn validate_primary_block(network: &NetworkRecord, desired: &CidrBlock) -> ValidationResult {
    let unchanged = CidrBlock::parse(&network.primary_cidr)
        .map(|live| cidr_equals(&live, desired))
        .unwrap_or(false);

    if !unchanged {
        return Err(ValidationError::Immutable {
            field: "primary CIDR block",
            live: network.primary_cidr.clone(),
            desired: desired.to_string(),
        });
    }
    Ok(())
}

/// Secondary-block changes for one network
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationPlan {
    /// Live associations whose block is no longer desired
    pub removals: Vec<CidrBlockAssociation>,
    /// Desired secondary blocks with no live association
    pub additions: Vec<CidrBlock>,
}

impl AssociationPlan {
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.additions.is_empty()
    }
}

/// A planned addition collides with an association that stays
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("CIDR block {block} overlaps live association {conflicts_with}")]
pub struct PlanConflict {
    pub block: CidrBlock,
    pub conflicts_with: CidrBlock,
}

/// Diff the network's live associations against the desired secondary blocks
///
/// Only live associations (associating or associated) take part. Live blocks
/// that fail to parse are logged and left alone. The association carrying the
/// primary block is never removed.
///
/// A desired block overlapping a kept block (the primary or a desired block
/// already live) is returned as a [`PlanConflict`]. Kept blocks all come from
/// the inputs, so blocks that passed [`validate_cidr_blocks`] together with
/// the primary never conflict; the error exists for unvalidated callers.
pub fn plan_associations(
    network: &NetworkRecord,
    primary: &CidrBlock,
    desired_secondary: &[CidrBlock],
) -> Result<AssociationPlan, PlanConflict> {
    let mut kept: Vec<CidrBlock> = vec![*primary];
    let mut removals = Vec::new();

    for association in network.live_associations() {
        let block = match CidrBlock::parse(&association.block) {
            Ok(block) => block,
            Err(e) => {
                warn!(
                    association_id = %association.id,
                    block = %association.block,
                    error = %e,
                    "Skipping association with malformed CIDR block"
                );
                continue;
            }
        };

        if cidr_equals(&block, primary) {
            continue;
        }

        if desired_secondary.iter().any(|d| cidr_equals(d, &block)) {
            kept.push(block);
        } else {
            removals.push(association.clone());
        }
    }

    let mut additions = Vec::new();
    for desired in desired_secondary {
        if kept.iter().any(|k| cidr_equals(k, desired)) {
            continue;
        }
        if let Some(conflict) = kept.iter().find(|k| cidr_overlap(k, desired)) {
            return Err(PlanConflict {
                block: *desired,
                conflicts_with: *conflict,
            });
        }
        additions.push(*desired);
    }

    Ok(AssociationPlan {
        removals,
        additions,
    })
}
