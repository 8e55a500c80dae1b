// Copyright (c) 2025 - Cowboy AI, Inc.
//! Infrastructure Converger
//!
//! Runs one convergence pass for the topology declared in the environment
//! against the in-memory provider and prints the result as JSON.
//!
//! Run with: cargo run --bin infra-converger
//!
//! Configuration (see `cim_network_convergence::config`):
//! - `TOPOLOGY_NAME`, `TOPOLOGY_CIDR_BLOCKS` (required)
//! - `TOPOLOGY_TIMEOUT_SECS`, `TOPOLOGY_INTERVAL_MS`
//! - `PROVIDER_KIND`, `PROVIDER_REGION`
//! - `FLOATING_POOL` (gateway public addresses, default 203.0.113.0/24)
//! - `SETTLE_READS` (reads before a transition settles, default 2)
//!
//! Ctrl-C cancels the pass.

use anyhow::{Context, Result};
use cim_network_convergence::{
    cancellation, create_infra, observe, InMemoryProvider, ProviderClient, TopologyConfig,
};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting infrastructure converger");

    let config = TopologyConfig::from_env().context("Failed to load topology configuration")?;
    info!("Configuration loaded:");
    info!("  - Topology: {}", config.name);
    info!("  - CIDR blocks: {}", config.cidr_blocks.join(", "));
    info!(
        "  - Provider: {} in {}",
        config.provider.kind, config.provider.region
    );
    info!(
        "  - Timeout: {:?}, interval: {:?}",
        config.timeout(),
        config.interval()
    );

    let pool = std::env::var("FLOATING_POOL").unwrap_or_else(|_| "203.0.113.0/24".to_string());
    let settle_reads = std::env::var("SETTLE_READS")
        .ok()
        .map(|raw| raw.parse::<u32>())
        .transpose()
        .context("SETTLE_READS must be a non-negative integer")?
        .unwrap_or(2);

    let provider = Arc::new(
        InMemoryProvider::new(config.provider.profile())
            .with_settle_reads(settle_reads)
            .with_floating_pool(&pool)
            .with_context(|| format!("Invalid FLOATING_POOL {pool:?}"))?,
    );

    let (cancel, signal) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling convergence");
            cancel.cancel();
        }
    });

    let name = config.name.clone();
    let client: Arc<dyn ProviderClient> = provider.clone();
    let options = config.into_options(client).with_cancellation(signal);

    let result = match create_infra(options).await {
        Ok(result) => result,
        Err(e) => {
            error!(
                "Convergence failed ({:?}, terminal: {}): {}",
                e.kind(),
                e.is_terminal(),
                e
            );
            return Err(e).context("Convergence pass failed");
        }
    };

    info!(
        "Converged network {} (created: {}, updated: {})",
        result.network.id, result.created, result.updated
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("Failed to serialize result")?
    );

    let observed = observe(&name, provider.as_ref())
        .await
        .context("Failed to observe topology")?;
    info!(
        "Observed topology {}: gateway public address {:?}",
        name,
        observed.gateway.and_then(|g| g.public_ip)
    );

    Ok(())
}
