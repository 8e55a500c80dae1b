// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network convergence for the Composable Information Machine
//!
//! Reconciles a declared cloud network topology (virtual network, CIDR
//! blocks, DHCP options, security group, gateway) against the state a cloud
//! control plane reports, and keeps address-range allocation free of
//! overlaps.
//!
//! # Modules
//!
//! - [`domain`]: CIDR value objects, the address-space allocator, topology
//!   records and pure invariants
//! - [`state_machine`]: transition-code classification (`Delay`, `Act`,
//!   `Error`, `Ignore`)
//! - [`provider`]: provider capability traits and the in-memory provider
//! - [`service`]: `create_infra`, `delete_infra`, `observe` and bounded polling
//! - [`config`]: JSON and environment configuration

pub mod config;
pub mod domain;
pub mod errors;
pub mod provider;
pub mod service;
pub mod state_machine;

// Re-export commonly used types
pub use config::{ProviderConfig, TopologyConfig};
pub use domain::{AddressSpace, CidrBlock, ConvergenceResult, NetworkTopologySpec, ObservedTopology};
pub use errors::{ConvergenceError, ErrorKind, InfraResult, ProviderError};
pub use provider::{InMemoryProvider, ProviderClient, ProviderKind, ProviderProfile};
pub use service::{cancellation, create_infra, delete_infra, observe, CreateInfraOptions};
pub use state_machine::{Outcome, StateCase, StateCaseBuilder};
