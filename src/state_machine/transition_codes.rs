// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provider Transition Codes
//!
//! Typed transition codes reported by the supported backends, and the
//! decision tables the convergence engine waits on.
//!
//! Public-cloud codes are lowercase (`pending`, `available`, `associating`);
//! OpenStack reports uppercase status strings (`BUILD`, `ACTIVE`, `ERROR`).
//! A code neither backend documents deserializes to `Unknown` and resolves
//! to the table default.
//!
//! # Tables
//!
//! | Table | Act | Delay | Error | Ignore | Default |
//! |---|---|---|---|---|---|
//! | [`cidr_association_settle`] | associated | associating, disassociating | failing, failed | disassociated | Delay |
//! | [`network_ready`] | available, ACTIVE | pending, BUILD | DOWN, ERROR | | Delay |
//! | [`gateway_ready`] | available, ACTIVE | pending, BUILD | DOWN, ERROR | | Delay |
//! | [`gateway_attachment`] | attached, available | attaching | detaching, detached | | Delay |

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Outcome, StateCase, StateCaseBuilder};

/// State of a CIDR block association on a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CidrBlockState {
    Associating,
    Associated,
    Disassociating,
    Disassociated,
    Failing,
    Failed,
    #[serde(other)]
    Unknown,
}

impl CidrBlockState {
    pub const ALL: [CidrBlockState; 7] = [
        CidrBlockState::Associating,
        CidrBlockState::Associated,
        CidrBlockState::Disassociating,
        CidrBlockState::Disassociated,
        CidrBlockState::Failing,
        CidrBlockState::Failed,
        CidrBlockState::Unknown,
    ];

    /// The association holds (or is about to hold) its block
    pub fn is_live(&self) -> bool {
        matches!(self, CidrBlockState::Associating | CidrBlockState::Associated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CidrBlockState::Associating => "associating",
            CidrBlockState::Associated => "associated",
            CidrBlockState::Disassociating => "disassociating",
            CidrBlockState::Disassociated => "disassociated",
            CidrBlockState::Failing => "failing",
            CidrBlockState::Failed => "failed",
            CidrBlockState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CidrBlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a network or gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceState {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "available")]
    Available,
    #[serde(rename = "BUILD")]
    Build,
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "DOWN")]
    Down,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(other)]
    Unknown,
}

impl ResourceState {
    pub const ALL: [ResourceState; 7] = [
        ResourceState::Pending,
        ResourceState::Available,
        ResourceState::Build,
        ResourceState::Active,
        ResourceState::Down,
        ResourceState::Error,
        ResourceState::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceState::Pending => "pending",
            ResourceState::Available => "available",
            ResourceState::Build => "BUILD",
            ResourceState::Active => "ACTIVE",
            ResourceState::Down => "DOWN",
            ResourceState::Error => "ERROR",
            ResourceState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a gateway's attachment to a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentState {
    Attaching,
    Attached,
    Detaching,
    Detached,
    Available,
    #[serde(other)]
    Unknown,
}

impl AttachmentState {
    pub const ALL: [AttachmentState; 6] = [
        AttachmentState::Attaching,
        AttachmentState::Attached,
        AttachmentState::Detaching,
        AttachmentState::Detached,
        AttachmentState::Available,
        AttachmentState::Unknown,
    ];

    /// The attachment binds (or is about to bind) the gateway to the network
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            AttachmentState::Attaching | AttachmentState::Attached | AttachmentState::Available
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentState::Attaching => "attaching",
            AttachmentState::Attached => "attached",
            AttachmentState::Detaching => "detaching",
            AttachmentState::Detached => "detached",
            AttachmentState::Available => "available",
            AttachmentState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AttachmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wait for CIDR associations to leave their transitional codes
pub fn cidr_association_settle() -> StateCase<CidrBlockState> {
    StateCaseBuilder::new(Outcome::Delay)
        .delay([CidrBlockState::Associating, CidrBlockState::Disassociating])
        .act([CidrBlockState::Associated])
        .ignore([CidrBlockState::Disassociated])
        .error([CidrBlockState::Failing, CidrBlockState::Failed])
        .build()
}

/// Wait for a network to become usable
pub fn network_ready() -> StateCase<ResourceState> {
    StateCaseBuilder::new(Outcome::Delay)
        .delay([ResourceState::Pending, ResourceState::Build])
        .act([ResourceState::Available, ResourceState::Active])
        .error([ResourceState::Down, ResourceState::Error])
        .build()
}

/// Wait for a gateway (internet gateway or router) to become usable
pub fn gateway_ready() -> StateCase<ResourceState> {
    StateCaseBuilder::new(Outcome::Delay)
        .delay([ResourceState::Pending, ResourceState::Build])
        .act([ResourceState::Available, ResourceState::Active])
        .error([ResourceState::Down, ResourceState::Error])
        .build()
}

/// Wait for a gateway attachment requested by the engine to complete
pub fn gateway_attachment() -> StateCase<AttachmentState> {
    StateCaseBuilder::new(Outcome::Delay)
        .delay([AttachmentState::Attaching])
        .act([AttachmentState::Attached, AttachmentState::Available])
        .error([AttachmentState::Detaching, AttachmentState::Detached])
        .build()
}
