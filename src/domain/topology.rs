// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Topology Model
//!
//! Desired-state input ([`NetworkTopologySpec`]), provider-side records as
//! returned by a [`ProviderClient`](crate::provider::ProviderClient), the
//! per-pass [`ObservedTopology`] snapshot and the [`ConvergenceResult`]
//! handed back to the caller.
//!
//! Records are plain values. Providers return copies, so no caller ever holds
//! a reference into provider-owned state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;

use super::cidr::CidrBlock;
use super::invariants::ValidationError;
use crate::state_machine::{AttachmentState, CidrBlockState, ResourceState};

/// Tag key carrying the topology name on every resource
pub const NAME_TAG: &str = "Name";

/// Resource tags
pub type Tags = BTreeMap<String, String>;

/// Tags identifying a resource as belonging to the named topology
pub fn name_tags(name: &str) -> Tags {
    let mut tags = Tags::new();
    tags.insert(NAME_TAG.to_string(), name.to_string());
    tags
}

/// Validated desired state for one convergence pass
///
/// # Invariants
/// - `name` is non-empty and carries no surrounding whitespace
/// - there is always a primary block; secondary blocks may be empty
///
/// Pairwise overlap of the blocks is checked by
/// [`validate_cidr_blocks`](super::invariants::validate_cidr_blocks) before
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TopologySpecFields", into = "TopologySpecFields")]
pub struct NetworkTopologySpec {
    name: String,
    primary: CidrBlock,
    secondary: Vec<CidrBlock>,
    timeout: Duration,
    interval: Duration,
}

impl NetworkTopologySpec {
    /// Build a spec; the first block is the primary block
    pub fn new(
        name: impl AsRef<str>,
        cidr_blocks: Vec<CidrBlock>,
        timeout: Duration,
        interval: Duration,
    ) -> Result<Self, ValidationError> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(ValidationError::NameRequired);
        }
        let mut blocks = cidr_blocks.into_iter();
        let primary = blocks.next().ok_or(ValidationError::CidrBlocksRequired)?;
        Ok(Self {
            name: name.to_string(),
            primary,
            secondary: blocks.collect(),
            timeout,
            interval,
        })
    }

    /// Topology name, as tagged on every resource
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The block the network is created with
    pub fn primary_block(&self) -> &CidrBlock {
        &self.primary
    }

    /// Blocks reconciled through add/remove of associations
    pub fn secondary_blocks(&self) -> &[CidrBlock] {
        &self.secondary
    }

    pub fn block_count(&self) -> usize {
        1 + self.secondary.len()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Wire form of [`NetworkTopologySpec`], blocks primary first
#[derive(Serialize, Deserialize)]
struct TopologySpecFields {
    name: String,
    cidr_blocks: Vec<CidrBlock>,
    timeout: Duration,
    interval: Duration,
}

impl TryFrom<TopologySpecFields> for NetworkTopologySpec {
    type Error = ValidationError;

    fn try_from(fields: TopologySpecFields) -> Result<Self, Self::Error> {
        Self::new(fields.name, fields.cidr_blocks, fields.timeout, fields.interval)
    }
}

impl From<NetworkTopologySpec> for TopologySpecFields {
    fn from(spec: NetworkTopologySpec) -> Self {
        let mut cidr_blocks = Vec::with_capacity(spec.block_count());
        cidr_blocks.push(spec.primary);
        cidr_blocks.extend(spec.secondary);
        Self {
            name: spec.name,
            cidr_blocks,
            timeout: spec.timeout,
            interval: spec.interval,
        }
    }
}

/// A CIDR block attached to a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CidrBlockAssociation {
    pub id: String,
    /// Block as reported by the provider; not trusted to be well formed
    pub block: String,
    pub state: CidrBlockState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

/// Virtual network record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub id: String,
    pub name: String,
    pub primary_cidr: String,
    pub state: ResourceState,
    pub associations: Vec<CidrBlockAssociation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp_options_id: Option<String>,
    #[serde(default)]
    pub tags: Tags,
}

impl NetworkRecord {
    /// Associations currently holding (or acquiring) their block
    pub fn live_associations(&self) -> impl Iterator<Item = &CidrBlockAssociation> {
        self.associations.iter().filter(|a| a.state.is_live())
    }

    pub fn association(&self, id: &str) -> Option<&CidrBlockAssociation> {
        self.associations.iter().find(|a| a.id == id)
    }
}

/// DHCP options (subnet-group) record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhcpOptionsRecord {
    pub id: String,
    pub name: String,
    pub domain_name: String,
    #[serde(default)]
    pub tags: Tags,
}

/// Security group record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupRecord {
    pub id: String,
    pub name: String,
    pub network_id: String,
    #[serde(default)]
    pub tags: Tags,
}

/// Security group lookup filter; `None` fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupFilter {
    pub network_id: Option<String>,
    pub name: Option<String>,
}

impl SecurityGroupFilter {
    pub fn for_network(network_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            network_id: Some(network_id.into()),
            name: Some(name.into()),
        }
    }

    pub fn matches(&self, group: &SecurityGroupRecord) -> bool {
        self.network_id.as_ref().map_or(true, |id| *id == group.network_id)
            && self.name.as_ref().map_or(true, |name| *name == group.name)
    }
}

/// Attachment of a gateway to a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayAttachment {
    pub network_id: String,
    pub state: AttachmentState,
}

/// Internet gateway (public cloud) or external router (OpenStack)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRecord {
    pub id: String,
    pub name: String,
    pub state: ResourceState,
    pub attachments: Vec<GatewayAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<IpAddr>,
    #[serde(default)]
    pub tags: Tags,
}

impl GatewayRecord {
    /// The live attachment to `network_id`, if any
    ///
    /// Attachments to other networks never satisfy this lookup.
    pub fn attachment_to(&self, network_id: &str) -> Option<&GatewayAttachment> {
        self.attachments
            .iter()
            .find(|a| a.network_id == network_id && a.state.is_live())
    }

    pub fn is_attached_to(&self, network_id: &str) -> bool {
        self.attachment_to(network_id).is_some()
    }
}

/// Live snapshot of a topology's resource graph
///
/// Built fresh from the provider on every pass, never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedTopology {
    pub network: Option<NetworkRecord>,
    pub dhcp_options: Option<DhcpOptionsRecord>,
    pub security_group: Option<SecurityGroupRecord>,
    pub gateway: Option<GatewayRecord>,
}

impl ObservedTopology {
    /// No resource of the topology exists
    pub fn is_empty(&self) -> bool {
        self.network.is_none()
            && self.dhcp_options.is_none()
            && self.security_group.is_none()
            && self.gateway.is_none()
    }
}

/// Outcome of a successful convergence pass
///
/// `created` and `updated` are advisory, for logging and status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceResult {
    pub created: bool,
    pub updated: bool,
    pub network: NetworkRecord,
    pub dhcp_options_id: String,
    pub security_group_id: String,
    pub gateway: GatewayRecord,
    pub converged_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway_with(attachments: Vec<GatewayAttachment>) -> GatewayRecord {
        GatewayRecord {
            id: "igw-1".to_string(),
            name: "net".to_string(),
            state: ResourceState::Available,
            attachments,
            public_ip: None,
            tags: name_tags("net"),
        }
    }

    #[test]
    fn test_attachment_to_other_network_does_not_count() {
        let gw = gateway_with(vec![GatewayAttachment {
            network_id: "vpc-other".to_string(),
            state: AttachmentState::Attached,
        }]);
        assert!(!gw.is_attached_to("vpc-1"));
        assert!(gw.is_attached_to("vpc-other"));
    }

    #[test]
    fn test_detached_attachment_does_not_count() {
        let gw = gateway_with(vec![GatewayAttachment {
            network_id: "vpc-1".to_string(),
            state: AttachmentState::Detached,
        }]);
        assert!(!gw.is_attached_to("vpc-1"));
    }

    #[test]
    fn test_security_group_filter() {
        let group = SecurityGroupRecord {
            id: "sg-1".to_string(),
            name: "net".to_string(),
            network_id: "vpc-1".to_string(),
            tags: name_tags("net"),
        };
        assert!(SecurityGroupFilter::for_network("vpc-1", "net").matches(&group));
        assert!(!SecurityGroupFilter::for_network("vpc-2", "net").matches(&group));
        assert!(SecurityGroupFilter::default().matches(&group));
    }

    fn block(s: &str) -> CidrBlock {
        CidrBlock::parse(s).unwrap()
    }

    #[test]
    fn test_spec_primary_and_secondary() {
        let spec = NetworkTopologySpec::new(
            " net ",
            vec![block("10.0.0.0/16"), block("10.1.0.0/16")],
            Duration::from_secs(1),
            Duration::from_millis(10),
        )
        .unwrap();
        assert_eq!(spec.name(), "net");
        assert_eq!(spec.primary_block().to_string(), "10.0.0.0/16");
        assert_eq!(spec.secondary_blocks().len(), 1);
        assert_eq!(spec.block_count(), 2);
    }

    #[test]
    fn test_spec_requires_a_block() {
        let err = NetworkTopologySpec::new("net", Vec::new(), Duration::ZERO, Duration::ZERO)
            .unwrap_err();
        assert_eq!(err, ValidationError::CidrBlocksRequired);

        let err = NetworkTopologySpec::new(
            "  ",
            vec![block("10.0.0.0/16")],
            Duration::ZERO,
            Duration::ZERO,
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::NameRequired);
    }

    #[test]
    fn test_spec_deserialize_rejects_empty_blocks() {
        let json = r#"{
            "name": "net",
            "cidr_blocks": [],
            "timeout": { "secs": 1, "nanos": 0 },
            "interval": { "secs": 0, "nanos": 10000000 }
        }"#;
        let err = serde_json::from_str::<NetworkTopologySpec>(json).unwrap_err();
        assert!(err.to_string().contains("at least one CIDR block"));
    }

    #[test]
    fn test_spec_serialized_primary_first() {
        let spec = NetworkTopologySpec::new(
            "net",
            vec![block("10.0.0.0/16"), block("10.1.0.0/16")],
            Duration::from_secs(1),
            Duration::from_millis(10),
        )
        .unwrap();
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["cidr_blocks"][0], "10.0.0.0/16");

        let back: NetworkTopologySpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, spec);
    }
}
