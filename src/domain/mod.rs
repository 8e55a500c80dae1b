// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Domain Models
//!
//! Core domain concepts for network convergence: CIDR value objects, the
//! address-space allocator, the topology records exchanged with a provider,
//! and the pure invariants checked before anything is mutated.
//!
//! # Value Objects with Invariants
//!
//! - [`CidrBlock`] - canonical IPv4/IPv6 network prefix
//! - [`AddressSpace`] - addresses and sub-ranges allocated inside one block
//!
//! # Records
//!
//! - [`NetworkTopologySpec`] - validated desired state
//! - [`NetworkRecord`], [`DhcpOptionsRecord`], [`SecurityGroupRecord`],
//!   [`GatewayRecord`] - provider-side state
//! - [`ObservedTopology`] / [`ConvergenceResult`] - pass snapshots

pub mod address_space;
pub mod cidr;
pub mod invariants;
pub mod topology;

pub use address_space::{AddressSpace, AllocationError};
pub use cidr::{
    cidr_equals, cidr_overlap, cidr_overlap_str, find_conflicts, CidrBlock, NetworkError,
};
pub use invariants::{
    plan_associations, AssociationPlan, PlanConflict, ValidationError, ValidationResult,
};
pub use topology::{
    name_tags, CidrBlockAssociation, ConvergenceResult, DhcpOptionsRecord, GatewayAttachment,
    GatewayRecord, NetworkRecord, NetworkTopologySpec, ObservedTopology, SecurityGroupFilter,
    SecurityGroupRecord, Tags, NAME_TAG,
};
