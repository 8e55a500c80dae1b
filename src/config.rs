// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Configuration
//!
//! Declared topology and provider selection, loadable from JSON or from the
//! environment:
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `TOPOLOGY_NAME` | topology name | required |
//! | `TOPOLOGY_CIDR_BLOCKS` | comma-separated blocks, primary first | required |
//! | `TOPOLOGY_TIMEOUT_SECS` | overall wait timeout | 300 |
//! | `TOPOLOGY_INTERVAL_MS` | poll interval | 1000 |
//! | `PROVIDER_KIND` | `public_cloud` or `openstack` | `public_cloud` |
//! | `PROVIDER_REGION` | provider region | `us-east-1` |

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{ConvergenceError, InfraResult};
use crate::provider::{ProviderClient, ProviderKind, ProviderProfile};
use crate::service::CreateInfraOptions;

/// Provider selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_kind")]
    pub kind: ProviderKind,

    #[serde(default = "default_region")]
    pub region: String,
}

fn default_kind() -> ProviderKind {
    ProviderKind::PublicCloud
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            region: default_region(),
        }
    }
}

impl ProviderConfig {
    pub fn profile(&self) -> ProviderProfile {
        ProviderProfile::new(self.kind, self.region.clone())
    }
}

/// Declared network topology
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyConfig {
    pub name: String,

    /// CIDR blocks, primary first
    pub cidr_blocks: Vec<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default)]
    pub provider: ProviderConfig,
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_interval_ms() -> u64 {
    1000
}

impl TopologyConfig {
    pub fn from_json(json: &str) -> InfraResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> InfraResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup shaped like the environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> InfraResult<Self> {
        let name = lookup("TOPOLOGY_NAME")
            .ok_or_else(|| ConvergenceError::Configuration("TOPOLOGY_NAME is not set".into()))?;

        let cidr_blocks: Vec<String> = lookup("TOPOLOGY_CIDR_BLOCKS")
            .ok_or_else(|| {
                ConvergenceError::Configuration("TOPOLOGY_CIDR_BLOCKS is not set".into())
            })?
            .split(',')
            .map(str::trim)
            .filter(|block| !block.is_empty())
            .map(str::to_string)
            .collect();

        let timeout_secs = parse_or(&lookup, "TOPOLOGY_TIMEOUT_SECS", default_timeout_secs())?;
        let interval_ms = parse_or(&lookup, "TOPOLOGY_INTERVAL_MS", default_interval_ms())?;

        let kind = parse_or(&lookup, "PROVIDER_KIND", default_kind())?;
        let region = lookup("PROVIDER_REGION").unwrap_or_else(default_region);

        Ok(Self {
            name,
            cidr_blocks,
            timeout_secs,
            interval_ms,
            provider: ProviderConfig { kind, region },
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Options for a convergence pass against `client`
    pub fn into_options(self, client: Arc<dyn ProviderClient>) -> CreateInfraOptions {
        let timeout = self.timeout();
        let interval = self.interval();
        CreateInfraOptions::new()
            .with_name(self.name)
            .with_cidr_blocks(self.cidr_blocks)
            .with_client(client)
            .with_timeout(timeout)
            .with_interval(interval)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> InfraResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConvergenceError::Configuration(format!("{key}={raw:?}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_with_defaults() {
        let config = TopologyConfig::from_lookup(lookup(&[
            ("TOPOLOGY_NAME", "cm-net1"),
            ("TOPOLOGY_CIDR_BLOCKS", "10.0.0.0/16, 10.1.0.0/16,"),
        ]))
        .unwrap();

        assert_eq!(config.name, "cm-net1");
        assert_eq!(config.cidr_blocks, vec!["10.0.0.0/16", "10.1.0.0/16"]);
        assert_eq!(config.timeout(), Duration::from_secs(300));
        assert_eq!(config.interval(), Duration::from_secs(1));
        assert_eq!(config.provider, ProviderConfig::default());
    }

    #[test]
    fn test_from_lookup_provider() {
        let config = TopologyConfig::from_lookup(lookup(&[
            ("TOPOLOGY_NAME", "edge"),
            ("TOPOLOGY_CIDR_BLOCKS", "192.168.0.0/20"),
            ("TOPOLOGY_INTERVAL_MS", "250"),
            ("PROVIDER_KIND", "openstack"),
            ("PROVIDER_REGION", "RegionOne"),
        ]))
        .unwrap();

        assert_eq!(config.interval(), Duration::from_millis(250));
        assert_eq!(config.provider.profile(), ProviderProfile::openstack("RegionOne"));
    }

    #[test]
    fn test_from_lookup_missing_name() {
        let err = TopologyConfig::from_lookup(lookup(&[("TOPOLOGY_CIDR_BLOCKS", "10.0.0.0/16")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_from_lookup_bad_number() {
        let err = TopologyConfig::from_lookup(lookup(&[
            ("TOPOLOGY_NAME", "n"),
            ("TOPOLOGY_CIDR_BLOCKS", "10.0.0.0/16"),
            ("TOPOLOGY_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("TOPOLOGY_TIMEOUT_SECS"));
    }

    #[test]
    fn test_from_json() {
        let config = TopologyConfig::from_json(
            r#"{
                "name": "cm-net1",
                "cidr_blocks": ["10.0.0.0/16"],
                "provider": { "kind": "openstack", "region": "RegionOne" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.timeout_secs, 300);
        assert_eq!(config.provider.kind, ProviderKind::OpenStack);
    }

    #[test]
    fn test_from_json_malformed() {
        let err = TopologyConfig::from_json("{ not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
