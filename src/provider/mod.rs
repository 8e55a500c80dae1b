// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provider Client Capabilities
//!
//! The convergence engine talks to a cloud control plane only through the
//! capability traits defined here. Each trait covers one resource family;
//! [`ProviderClient`] composes all five with the backend [`ProviderProfile`].
//!
//! # Architecture
//!
//! ```text
//! create_infra / delete_infra / observe
//!            ↓
//!      ProviderClient
//!   ┌────────┼─────────┬──────────────┬──────────┐
//! NetworkApi  CidrAssociationApi  DhcpOptionsApi  SecurityGroupApi  GatewayApi
//!            ↓
//!   public cloud SDK / OpenStack SDK / InMemoryProvider
//! ```
//!
//! Every call returns owned records. Mutating calls return before the
//! resource settles; callers poll the matching list call and classify the
//! reported transition code.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::{
    CidrBlock, CidrBlockAssociation, DhcpOptionsRecord, GatewayRecord, NetworkRecord,
    SecurityGroupFilter, SecurityGroupRecord, Tags,
};
use crate::errors::ProviderResult;

pub mod memory;

pub use memory::{InMemoryProvider, Operation};

/// Virtual network operations
#[async_trait]
pub trait NetworkApi: Send + Sync {
    /// Networks whose `Name` tag equals `name`
    async fn list_networks(&self, name: &str) -> ProviderResult<Vec<NetworkRecord>>;

    async fn get_network(&self, id: &str) -> ProviderResult<NetworkRecord>;

    async fn create_network(
        &self,
        name: &str,
        primary_cidr: &CidrBlock,
        tags: Tags,
    ) -> ProviderResult<NetworkRecord>;

    async fn delete_network(&self, id: &str) -> ProviderResult<()>;
}

/// Secondary CIDR block operations
#[async_trait]
pub trait CidrAssociationApi: Send + Sync {
    async fn associate_cidr_block(
        &self,
        network_id: &str,
        block: &CidrBlock,
    ) -> ProviderResult<CidrBlockAssociation>;

    async fn disassociate_cidr_block(&self, association_id: &str) -> ProviderResult<()>;
}

/// DHCP options operations
#[async_trait]
pub trait DhcpOptionsApi: Send + Sync {
    async fn list_dhcp_options(&self, name: &str) -> ProviderResult<Vec<DhcpOptionsRecord>>;

    async fn create_dhcp_options(
        &self,
        name: &str,
        domain_name: &str,
        tags: Tags,
    ) -> ProviderResult<DhcpOptionsRecord>;

    async fn associate_dhcp_options(
        &self,
        network_id: &str,
        dhcp_options_id: &str,
    ) -> ProviderResult<()>;

    async fn delete_dhcp_options(&self, id: &str) -> ProviderResult<()>;
}

/// Security group operations
#[async_trait]
pub trait SecurityGroupApi: Send + Sync {
    async fn list_security_groups(
        &self,
        filter: &SecurityGroupFilter,
    ) -> ProviderResult<Vec<SecurityGroupRecord>>;

    async fn create_security_group(
        &self,
        network_id: &str,
        name: &str,
        tags: Tags,
    ) -> ProviderResult<SecurityGroupRecord>;

    async fn delete_security_group(&self, id: &str) -> ProviderResult<()>;
}

/// Internet gateway / external router operations
#[async_trait]
pub trait GatewayApi: Send + Sync {
    async fn list_gateways(&self, name: &str) -> ProviderResult<Vec<GatewayRecord>>;

    async fn create_gateway(&self, name: &str, tags: Tags) -> ProviderResult<GatewayRecord>;

    async fn attach_gateway(&self, network_id: &str, gateway_id: &str) -> ProviderResult<()>;

    async fn detach_gateway(&self, network_id: &str, gateway_id: &str) -> ProviderResult<()>;

    async fn delete_gateway(&self, id: &str) -> ProviderResult<()>;
}

/// Full provider client consumed by the convergence engine
pub trait ProviderClient:
    NetworkApi + CidrAssociationApi + DhcpOptionsApi + SecurityGroupApi + GatewayApi
{
    fn profile(&self) -> &ProviderProfile;
}

/// Backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    PublicCloud,
    #[serde(rename = "openstack")]
    OpenStack,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::PublicCloud => write!(f, "public_cloud"),
            ProviderKind::OpenStack => write!(f, "openstack"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public_cloud" | "public-cloud" | "aws" => Ok(ProviderKind::PublicCloud),
            "openstack" => Ok(ProviderKind::OpenStack),
            other => Err(format!("unknown provider kind: {other}")),
        }
    }
}

/// Backend kind and region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub kind: ProviderKind,
    pub region: String,
}

impl ProviderProfile {
    pub fn new(kind: ProviderKind, region: impl Into<String>) -> Self {
        Self {
            kind,
            region: region.into(),
        }
    }

    pub fn public_cloud(region: impl Into<String>) -> Self {
        Self::new(ProviderKind::PublicCloud, region)
    }

    pub fn openstack(region: impl Into<String>) -> Self {
        Self::new(ProviderKind::OpenStack, region)
    }

    /// Domain name used when the engine creates DHCP options
    pub fn default_dhcp_domain(&self) -> String {
        match self.kind {
            ProviderKind::OpenStack => "openstacklocal".to_string(),
            ProviderKind::PublicCloud if self.region == "us-east-1" => "ec2.internal".to_string(),
            ProviderKind::PublicCloud => format!("{}.compute.internal", self.region),
        }
    }
}

impl Default for ProviderProfile {
    fn default() -> Self {
        Self::public_cloud("us-east-1")
    }
}
