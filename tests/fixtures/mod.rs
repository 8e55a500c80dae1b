// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-network-convergence
//!
//! Provides deterministic topology inputs and pre-seeded in-memory providers
//! for the convergence integration tests.
//!
//! # Design Principles
//! - Timeouts are short and intervals tiny so tests stay fast
//! - Providers are built explicitly per test; nothing is shared
//! - Fixtures are the only place that wires options to a provider

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use cim_network_convergence::domain::CidrBlock;
use cim_network_convergence::provider::{InMemoryProvider, ProviderClient, ProviderProfile};
use cim_network_convergence::service::CreateInfraOptions;

pub const TOPOLOGY_NAME: &str = "cm-net1";
pub const PRIMARY_BLOCK: &str = "10.0.0.0/16";
pub const SECONDARY_BLOCK: &str = "10.1.0.0/16";
pub const STALE_BLOCK: &str = "10.2.0.0/16";

pub const TEST_TIMEOUT: Duration = Duration::from_secs(1);
pub const TEST_INTERVAL: Duration = Duration::from_millis(10);

/// Parse a fixed CIDR block
pub fn block(s: &str) -> CidrBlock {
    CidrBlock::parse(s).expect("Invalid CIDR block in test fixture")
}

/// Provider for the public cloud in us-east-1, settling after `settle_reads` reads
pub fn provider(settle_reads: u32) -> Arc<InMemoryProvider> {
    Arc::new(
        InMemoryProvider::new(ProviderProfile::public_cloud("us-east-1"))
            .with_settle_reads(settle_reads)
            .with_floating_pool("203.0.113.0/24")
            .expect("Invalid floating pool in test fixture"),
    )
}

/// Options for `cm-net1` with the given blocks against `provider`
pub fn options(provider: &Arc<InMemoryProvider>, blocks: &[&str]) -> CreateInfraOptions {
    let client: Arc<dyn ProviderClient> = provider.clone();
    CreateInfraOptions::new()
        .with_name(TOPOLOGY_NAME)
        .with_cidr_blocks(blocks.iter().copied())
        .with_client(client)
        .with_timeout(TEST_TIMEOUT)
        .with_interval(TEST_INTERVAL)
}

/// The canonical two-block topology
pub fn cm_net1_options(provider: &Arc<InMemoryProvider>) -> CreateInfraOptions {
    options(provider, &[PRIMARY_BLOCK, SECONDARY_BLOCK])
}
