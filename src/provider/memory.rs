// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-Memory Provider
//!
//! A complete [`ProviderClient`] kept in process memory. It behaves like an
//! eventually consistent control plane:
//!
//! - mutating calls return records in a transitional state (`pending`,
//!   `BUILD`, `associating`, `attaching`), which settle after a configurable
//!   number of subsequent reads
//! - deletes enforce the provider's dependency rules
//! - gateways receive a public address from an optional floating pool
//!
//! Tests seed records directly, inject one-shot failures per [`Operation`]
//! and inspect the log of mutating calls.
//!
//! ```rust
//! use cim_network_convergence::provider::{InMemoryProvider, NetworkApi, ProviderProfile};
//! use cim_network_convergence::domain::{name_tags, CidrBlock};
//!
//! # tokio_test::block_on(async {
//! let provider = InMemoryProvider::new(ProviderProfile::default()).with_settle_reads(1);
//! let block = CidrBlock::parse("10.0.0.0/16").unwrap();
//! let created = provider.create_network("net", &block, name_tags("net")).await.unwrap();
//! assert_eq!(created.state.as_str(), "pending");
//!
//! let observed = provider.get_network(&created.id).await.unwrap();
//! assert_eq!(observed.state.as_str(), "available");
//! # });
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use super::{
    CidrAssociationApi, DhcpOptionsApi, GatewayApi, NetworkApi, ProviderClient, ProviderKind,
    ProviderProfile, SecurityGroupApi,
};
use crate::domain::{
    cidr_equals, cidr_overlap, name_tags, AddressSpace, AllocationError, CidrBlock,
    CidrBlockAssociation, DhcpOptionsRecord, GatewayAttachment, GatewayRecord, NetworkError,
    NetworkRecord, SecurityGroupFilter, SecurityGroupRecord, Tags, NAME_TAG,
};
use crate::errors::{ProviderError, ProviderResult};
use crate::state_machine::{AttachmentState, CidrBlockState, ResourceState};

/// Provider call, used for failure injection and the mutating-call log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListNetworks,
    GetNetwork,
    CreateNetwork,
    DeleteNetwork,
    AssociateCidrBlock,
    DisassociateCidrBlock,
    ListDhcpOptions,
    CreateDhcpOptions,
    AssociateDhcpOptions,
    DeleteDhcpOptions,
    ListSecurityGroups,
    CreateSecurityGroup,
    DeleteSecurityGroup,
    ListGateways,
    CreateGateway,
    AttachGateway,
    DetachGateway,
    DeleteGateway,
}

impl Operation {
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Operation::ListNetworks
                | Operation::GetNetwork
                | Operation::ListDhcpOptions
                | Operation::ListSecurityGroups
                | Operation::ListGateways
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone)]
enum Transition {
    Network {
        id: String,
        target: ResourceState,
    },
    Association {
        id: String,
        target: CidrBlockState,
        message: Option<String>,
    },
    Gateway {
        id: String,
        target: ResourceState,
    },
    Attachment {
        gateway_id: String,
        network_id: String,
        target: AttachmentState,
    },
}

#[derive(Debug)]
struct Scheduled {
    remaining: u32,
    transition: Transition,
}

#[derive(Debug, Default)]
struct State {
    networks: Vec<NetworkRecord>,
    dhcp_options: Vec<DhcpOptionsRecord>,
    security_groups: Vec<SecurityGroupRecord>,
    gateways: Vec<GatewayRecord>,
    scheduled: Vec<Scheduled>,
    floating_pool: Option<AddressSpace>,
    failures: HashMap<Operation, ProviderError>,
    failing_association: Option<String>,
    attachment_override: Option<AttachmentState>,
    calls: Vec<Operation>,
}

impl State {
    fn take_failure(&mut self, operation: Operation) -> ProviderResult<()> {
        match self.failures.remove(&operation) {
            Some(err) => {
                debug!(%operation, error = %err, "Injected provider failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Advance every scheduled transition by one read
    fn tick(&mut self) {
        let mut due = Vec::new();
        self.scheduled.retain_mut(|scheduled| {
            scheduled.remaining = scheduled.remaining.saturating_sub(1);
            if scheduled.remaining == 0 {
                due.push(scheduled.transition.clone());
                false
            } else {
                true
            }
        });
        for transition in due {
            self.apply(transition);
        }
    }

    fn schedule(&mut self, settle_reads: u32, transition: Transition) {
        if settle_reads == 0 {
            self.apply(transition);
        } else {
            self.scheduled.push(Scheduled {
                remaining: settle_reads,
                transition,
            });
        }
    }

    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Network { id, target } => {
                if let Some(network) = self.networks.iter_mut().find(|n| n.id == id) {
                    network.state = target;
                }
            }
            Transition::Association {
                id,
                target,
                message,
            } => {
                if let Some(association) = self
                    .networks
                    .iter_mut()
                    .flat_map(|n| n.associations.iter_mut())
                    .find(|a| a.id == id)
                {
                    association.state = target;
                    association.status_message = message;
                }
            }
            Transition::Gateway { id, target } => {
                if let Some(gateway) = self.gateways.iter_mut().find(|g| g.id == id) {
                    gateway.state = target;
                }
            }
            Transition::Attachment {
                gateway_id,
                network_id,
                target,
            } => {
                if let Some(attachment) = self
                    .gateways
                    .iter_mut()
                    .filter(|g| g.id == gateway_id)
                    .flat_map(|g| g.attachments.iter_mut())
                    .find(|a| a.network_id == network_id)
                {
                    attachment.state = target;
                }
            }
        }
    }

    fn network_mut(&mut self, id: &str) -> ProviderResult<&mut NetworkRecord> {
        self.networks
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| ProviderError::NotFound(format!("network {id}")))
    }

    fn gateway_mut(&mut self, id: &str) -> ProviderResult<&mut GatewayRecord> {
        self.gateways
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| ProviderError::NotFound(format!("gateway {id}")))
    }

    fn unschedule(&mut self, matches: impl Fn(&Transition) -> bool) {
        self.scheduled.retain(|s| !matches(&s.transition));
    }
}

fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7().simple())
}

fn has_name(tags: &Tags, name: &str) -> bool {
    tags.get(NAME_TAG).is_some_and(|n| n == name)
}

/// Eventually consistent provider client held in memory
#[derive(Debug)]
pub struct InMemoryProvider {
    profile: ProviderProfile,
    settle_reads: u32,
    state: Mutex<State>,
}

impl InMemoryProvider {
    /// Create an empty provider whose transitions settle immediately
    pub fn new(profile: ProviderProfile) -> Self {
        Self {
            profile,
            settle_reads: 0,
            state: Mutex::new(State::default()),
        }
    }

    /// Transitional states settle on the `reads`-th read after the mutation
    pub fn with_settle_reads(mut self, reads: u32) -> Self {
        self.settle_reads = reads;
        self
    }

    /// Hand out gateway public addresses from `cidr`
    pub fn with_floating_pool(mut self, cidr: &str) -> Result<Self, NetworkError> {
        self.state.get_mut().floating_pool = Some(AddressSpace::new(cidr)?);
        Ok(self)
    }

    /// Fail the next call of `operation` with `error`
    pub async fn fail_on(&self, operation: Operation, error: ProviderError) {
        self.state.lock().await.failures.insert(operation, error);
    }

    /// The next associated CIDR block settles into `failed` with `message`
    pub async fn fail_next_association(&self, message: impl Into<String>) {
        self.state.lock().await.failing_association = Some(message.into());
    }

    /// The next gateway attachment settles into `state` instead of attached
    pub async fn settle_next_attachment_as(&self, state: AttachmentState) {
        self.state.lock().await.attachment_override = Some(state);
    }

    /// Mutating calls attempted so far, in order
    pub async fn mutating_calls(&self) -> Vec<Operation> {
        self.state.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Seed a settled network whose primary block is already associated
    pub async fn insert_network(&self, name: &str, primary: &CidrBlock) -> NetworkRecord {
        let record = NetworkRecord {
            id: new_id("vpc"),
            name: name.to_string(),
            primary_cidr: primary.to_string(),
            state: self.settled_state(),
            associations: vec![CidrBlockAssociation {
                id: new_id("vpc-cidr-assoc"),
                block: primary.to_string(),
                state: CidrBlockState::Associated,
                status_message: None,
            }],
            dhcp_options_id: None,
            tags: name_tags(name),
        };
        self.state.lock().await.networks.push(record.clone());
        record
    }

    /// Seed an association in an arbitrary state
    ///
    /// `block` is stored verbatim, so malformed provider data can be modelled.
    pub async fn insert_association(
        &self,
        network_id: &str,
        block: &str,
        state: CidrBlockState,
    ) -> ProviderResult<String> {
        let mut guard = self.state.lock().await;
        let network = guard.network_mut(network_id)?;
        let id = new_id("vpc-cidr-assoc");
        network.associations.push(CidrBlockAssociation {
            id: id.clone(),
            block: block.to_string(),
            state,
            status_message: None,
        });
        Ok(id)
    }

    /// Overwrite a network's lifecycle state
    pub async fn set_network_state(&self, id: &str, state: ResourceState) -> ProviderResult<()> {
        let mut guard = self.state.lock().await;
        guard.network_mut(id)?.state = state;
        Ok(())
    }

    /// Seed a security group, bypassing the duplicate-name check
    pub async fn insert_security_group(
        &self,
        network_id: &str,
        name: &str,
    ) -> ProviderResult<SecurityGroupRecord> {
        let mut guard = self.state.lock().await;
        guard.network_mut(network_id)?;
        let record = SecurityGroupRecord {
            id: new_id("sg"),
            name: name.to_string(),
            network_id: network_id.to_string(),
            tags: name_tags(name),
        };
        guard.security_groups.push(record.clone());
        Ok(record)
    }

    /// Overwrite a gateway's lifecycle state
    pub async fn set_gateway_state(&self, id: &str, state: ResourceState) -> ProviderResult<()> {
        let mut guard = self.state.lock().await;
        guard.gateway_mut(id)?.state = state;
        Ok(())
    }

    /// Seed a settled, unattached gateway
    pub async fn insert_gateway(&self, name: &str) -> GatewayRecord {
        let record = GatewayRecord {
            id: new_id("igw"),
            name: name.to_string(),
            state: self.settled_state(),
            attachments: Vec::new(),
            public_ip: None,
            tags: name_tags(name),
        };
        self.state.lock().await.gateways.push(record.clone());
        record
    }

    /// Seed DHCP options
    pub async fn insert_dhcp_options(&self, name: &str, domain_name: &str) -> DhcpOptionsRecord {
        let record = DhcpOptionsRecord {
            id: new_id("dopt"),
            name: name.to_string(),
            domain_name: domain_name.to_string(),
            tags: name_tags(name),
        };
        self.state.lock().await.dhcp_options.push(record.clone());
        record
    }

    /// All networks, without advancing transitions
    pub async fn networks(&self) -> Vec<NetworkRecord> {
        self.state.lock().await.networks.clone()
    }

    pub async fn gateways(&self) -> Vec<GatewayRecord> {
        self.state.lock().await.gateways.clone()
    }

    pub async fn dhcp_options(&self) -> Vec<DhcpOptionsRecord> {
        self.state.lock().await.dhcp_options.clone()
    }

    pub async fn security_groups(&self) -> Vec<SecurityGroupRecord> {
        self.state.lock().await.security_groups.clone()
    }

    async fn read(&self, operation: Operation) -> ProviderResult<MutexGuard<'_, State>> {
        let mut state = self.state.lock().await;
        state.take_failure(operation)?;
        state.tick();
        Ok(state)
    }

    async fn mutate(&self, operation: Operation) -> ProviderResult<MutexGuard<'_, State>> {
        let mut state = self.state.lock().await;
        state.calls.push(operation);
        state.take_failure(operation)?;
        Ok(state)
    }

    fn transitional_state(&self) -> ResourceState {
        match self.profile.kind {
            ProviderKind::PublicCloud => ResourceState::Pending,
            ProviderKind::OpenStack => ResourceState::Build,
        }
    }

    fn settled_state(&self) -> ResourceState {
        match self.profile.kind {
            ProviderKind::PublicCloud => ResourceState::Available,
            ProviderKind::OpenStack => ResourceState::Active,
        }
    }

    fn attached_state(&self) -> AttachmentState {
        match self.profile.kind {
            ProviderKind::PublicCloud => AttachmentState::Attached,
            ProviderKind::OpenStack => AttachmentState::Available,
        }
    }
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new(ProviderProfile::default())
    }
}

#[async_trait]
impl NetworkApi for InMemoryProvider {
    async fn list_networks(&self, name: &str) -> ProviderResult<Vec<NetworkRecord>> {
        let state = self.read(Operation::ListNetworks).await?;
        Ok(state
            .networks
            .iter()
            .filter(|n| has_name(&n.tags, name))
            .cloned()
            .collect())
    }

    async fn get_network(&self, id: &str) -> ProviderResult<NetworkRecord> {
        let mut state = self.read(Operation::GetNetwork).await?;
        state.network_mut(id).map(|n| n.clone())
    }

    async fn create_network(
        &self,
        name: &str,
        primary_cidr: &CidrBlock,
        tags: Tags,
    ) -> ProviderResult<NetworkRecord> {
        let mut state = self.mutate(Operation::CreateNetwork).await?;
        let id = new_id("vpc");
        debug!(network_id = %id, %name, cidr = %primary_cidr, "Creating network");

        state.networks.push(NetworkRecord {
            id: id.clone(),
            name: name.to_string(),
            primary_cidr: primary_cidr.to_string(),
            state: self.transitional_state(),
            associations: vec![CidrBlockAssociation {
                id: new_id("vpc-cidr-assoc"),
                block: primary_cidr.to_string(),
                state: CidrBlockState::Associated,
                status_message: None,
            }],
            dhcp_options_id: None,
            tags,
        });
        state.schedule(
            self.settle_reads,
            Transition::Network {
                id: id.clone(),
                target: self.settled_state(),
            },
        );
        state.network_mut(&id).map(|n| n.clone())
    }

    async fn delete_network(&self, id: &str) -> ProviderResult<()> {
        let mut state = self.mutate(Operation::DeleteNetwork).await?;
        state.network_mut(id)?;

        if state.gateways.iter().any(|g| g.is_attached_to(id)) {
            return Err(ProviderError::Conflict(format!(
                "network {id} has an attached gateway"
            )));
        }
        if state.security_groups.iter().any(|sg| sg.network_id == id) {
            return Err(ProviderError::Conflict(format!(
                "network {id} still has security groups"
            )));
        }

        debug!(network_id = %id, "Deleting network");
        state.networks.retain(|n| n.id != id);
        state.unschedule(|t| matches!(t, Transition::Network { id: n, .. } if n == id));
        Ok(())
    }
}

#[async_trait]
impl CidrAssociationApi for InMemoryProvider {
    async fn associate_cidr_block(
        &self,
        network_id: &str,
        block: &CidrBlock,
    ) -> ProviderResult<CidrBlockAssociation> {
        let mut state = self.mutate(Operation::AssociateCidrBlock).await?;
        let network = state.network_mut(network_id)?;

        for live in network.live_associations() {
            let Ok(existing) = CidrBlock::parse(&live.block) else {
                continue;
            };
            if cidr_equals(&existing, block) || cidr_overlap(&existing, block) {
                return Err(ProviderError::Conflict(format!(
                    "{block} conflicts with {existing} on network {network_id}"
                )));
            }
        }

        let id = new_id("vpc-cidr-assoc");
        debug!(%network_id, association_id = %id, %block, "Associating CIDR block");
        network.associations.push(CidrBlockAssociation {
            id: id.clone(),
            block: block.to_string(),
            state: CidrBlockState::Associating,
            status_message: None,
        });

        let transition = match state.failing_association.take() {
            Some(message) => Transition::Association {
                id: id.clone(),
                target: CidrBlockState::Failed,
                message: Some(message),
            },
            None => Transition::Association {
                id: id.clone(),
                target: CidrBlockState::Associated,
                message: None,
            },
        };
        state.schedule(self.settle_reads, transition);

        state
            .network_mut(network_id)?
            .association(&id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("association {id}")))
    }

    async fn disassociate_cidr_block(&self, association_id: &str) -> ProviderResult<()> {
        let mut state = self.mutate(Operation::DisassociateCidrBlock).await?;

        let (primary, association) = state
            .networks
            .iter_mut()
            .find_map(|n| {
                let primary = n.primary_cidr.clone();
                n.associations
                    .iter_mut()
                    .find(|a| a.id == association_id)
                    .map(|a| (primary, a))
            })
            .ok_or_else(|| ProviderError::NotFound(format!("association {association_id}")))?;

        if association.block == primary {
            return Err(ProviderError::Conflict(format!(
                "association {association_id} holds the primary block"
            )));
        }
        if !association.state.is_live() {
            return Err(ProviderError::Conflict(format!(
                "association {association_id} is {}",
                association.state
            )));
        }

        debug!(%association_id, block = %association.block, "Disassociating CIDR block");
        association.state = CidrBlockState::Disassociating;
        state.unschedule(
            |t| matches!(t, Transition::Association { id, .. } if id == association_id),
        );
        state.schedule(
            self.settle_reads,
            Transition::Association {
                id: association_id.to_string(),
                target: CidrBlockState::Disassociated,
                message: None,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl DhcpOptionsApi for InMemoryProvider {
    async fn list_dhcp_options(&self, name: &str) -> ProviderResult<Vec<DhcpOptionsRecord>> {
        let state = self.read(Operation::ListDhcpOptions).await?;
        Ok(state
            .dhcp_options
            .iter()
            .filter(|d| has_name(&d.tags, name))
            .cloned()
            .collect())
    }

    async fn create_dhcp_options(
        &self,
        name: &str,
        domain_name: &str,
        tags: Tags,
    ) -> ProviderResult<DhcpOptionsRecord> {
        let mut state = self.mutate(Operation::CreateDhcpOptions).await?;
        let record = DhcpOptionsRecord {
            id: new_id("dopt"),
            name: name.to_string(),
            domain_name: domain_name.to_string(),
            tags,
        };
        debug!(dhcp_options_id = %record.id, %domain_name, "Creating DHCP options");
        state.dhcp_options.push(record.clone());
        Ok(record)
    }

    async fn associate_dhcp_options(
        &self,
        network_id: &str,
        dhcp_options_id: &str,
    ) -> ProviderResult<()> {
        let mut state = self.mutate(Operation::AssociateDhcpOptions).await?;
        if !state.dhcp_options.iter().any(|d| d.id == dhcp_options_id) {
            return Err(ProviderError::NotFound(format!(
                "DHCP options {dhcp_options_id}"
            )));
        }
        debug!(%network_id, %dhcp_options_id, "Associating DHCP options");
        state.network_mut(network_id)?.dhcp_options_id = Some(dhcp_options_id.to_string());
        Ok(())
    }

    async fn delete_dhcp_options(&self, id: &str) -> ProviderResult<()> {
        let mut state = self.mutate(Operation::DeleteDhcpOptions).await?;
        if !state.dhcp_options.iter().any(|d| d.id == id) {
            return Err(ProviderError::NotFound(format!("DHCP options {id}")));
        }
        if state
            .networks
            .iter()
            .any(|n| n.dhcp_options_id.as_deref() == Some(id))
        {
            return Err(ProviderError::Conflict(format!(
                "DHCP options {id} are associated with a network"
            )));
        }
        debug!(dhcp_options_id = %id, "Deleting DHCP options");
        state.dhcp_options.retain(|d| d.id != id);
        Ok(())
    }
}

#[async_trait]
impl SecurityGroupApi for InMemoryProvider {
    async fn list_security_groups(
        &self,
        filter: &SecurityGroupFilter,
    ) -> ProviderResult<Vec<SecurityGroupRecord>> {
        let state = self.read(Operation::ListSecurityGroups).await?;
        Ok(state
            .security_groups
            .iter()
            .filter(|sg| filter.matches(sg))
            .cloned()
            .collect())
    }

    async fn create_security_group(
        &self,
        network_id: &str,
        name: &str,
        tags: Tags,
    ) -> ProviderResult<SecurityGroupRecord> {
        let mut state = self.mutate(Operation::CreateSecurityGroup).await?;
        state.network_mut(network_id)?;
        if state
            .security_groups
            .iter()
            .any(|sg| sg.network_id == network_id && sg.name == name)
        {
            return Err(ProviderError::Conflict(format!(
                "security group {name} already exists in network {network_id}"
            )));
        }

        let record = SecurityGroupRecord {
            id: new_id("sg"),
            name: name.to_string(),
            network_id: network_id.to_string(),
            tags,
        };
        debug!(security_group_id = %record.id, %network_id, "Creating security group");
        state.security_groups.push(record.clone());
        Ok(record)
    }

    async fn delete_security_group(&self, id: &str) -> ProviderResult<()> {
        let mut state = self.mutate(Operation::DeleteSecurityGroup).await?;
        if !state.security_groups.iter().any(|sg| sg.id == id) {
            return Err(ProviderError::NotFound(format!("security group {id}")));
        }
        debug!(security_group_id = %id, "Deleting security group");
        state.security_groups.retain(|sg| sg.id != id);
        Ok(())
    }
}

#[async_trait]
impl GatewayApi for InMemoryProvider {
    async fn list_gateways(&self, name: &str) -> ProviderResult<Vec<GatewayRecord>> {
        let state = self.read(Operation::ListGateways).await?;
        Ok(state
            .gateways
            .iter()
            .filter(|g| has_name(&g.tags, name))
            .cloned()
            .collect())
    }

    async fn create_gateway(&self, name: &str, tags: Tags) -> ProviderResult<GatewayRecord> {
        let mut state = self.mutate(Operation::CreateGateway).await?;

        let public_ip = match state.floating_pool.as_mut() {
            Some(pool) => Some(pool.allocate_one_ip_address().map_err(|e| match e {
                AllocationError::Exhausted(block) => ProviderError::Api {
                    code: "AddressLimitExceeded".to_string(),
                    message: format!("floating pool {block} is exhausted"),
                },
                other => ProviderError::Api {
                    code: "InternalError".to_string(),
                    message: other.to_string(),
                },
            })?),
            None => None,
        };

        let id = new_id("igw");
        debug!(gateway_id = %id, %name, ?public_ip, "Creating gateway");
        state.gateways.push(GatewayRecord {
            id: id.clone(),
            name: name.to_string(),
            state: self.transitional_state(),
            attachments: Vec::new(),
            public_ip,
            tags,
        });
        state.schedule(
            self.settle_reads,
            Transition::Gateway {
                id: id.clone(),
                target: self.settled_state(),
            },
        );
        state.gateway_mut(&id).map(|g| g.clone())
    }

    async fn attach_gateway(&self, network_id: &str, gateway_id: &str) -> ProviderResult<()> {
        let mut state = self.mutate(Operation::AttachGateway).await?;
        state.network_mut(network_id)?;
        let gateway = state.gateway_mut(gateway_id)?;

        if let Some(existing) = gateway.attachments.iter().find(|a| a.state.is_live()) {
            return Err(ProviderError::Conflict(format!(
                "gateway {gateway_id} is already attached to {}",
                existing.network_id
            )));
        }

        debug!(%gateway_id, %network_id, "Attaching gateway");
        gateway.attachments.retain(|a| a.network_id != network_id);
        gateway.attachments.push(GatewayAttachment {
            network_id: network_id.to_string(),
            state: AttachmentState::Attaching,
        });
        let target = state
            .attachment_override
            .take()
            .unwrap_or_else(|| self.attached_state());
        state.schedule(
            self.settle_reads,
            Transition::Attachment {
                gateway_id: gateway_id.to_string(),
                network_id: network_id.to_string(),
                target,
            },
        );
        Ok(())
    }

    async fn detach_gateway(&self, network_id: &str, gateway_id: &str) -> ProviderResult<()> {
        let mut state = self.mutate(Operation::DetachGateway).await?;
        let gateway = state.gateway_mut(gateway_id)?;
        if !gateway.is_attached_to(network_id) {
            return Err(ProviderError::NotFound(format!(
                "gateway {gateway_id} is not attached to {network_id}"
            )));
        }

        debug!(%gateway_id, %network_id, "Detaching gateway");
        gateway.attachments.retain(|a| a.network_id != network_id);
        state.unschedule(|t| {
            matches!(t, Transition::Attachment { gateway_id: g, network_id: n, .. }
                if g == gateway_id && n == network_id)
        });
        Ok(())
    }

    async fn delete_gateway(&self, id: &str) -> ProviderResult<()> {
        let mut state = self.mutate(Operation::DeleteGateway).await?;
        let gateway = state.gateway_mut(id)?;
        if let Some(attachment) = gateway.attachments.iter().find(|a| a.state.is_live()) {
            return Err(ProviderError::Conflict(format!(
                "gateway {id} is attached to {}",
                attachment.network_id
            )));
        }
        let public_ip = gateway.public_ip;

        debug!(gateway_id = %id, "Deleting gateway");
        state.gateways.retain(|g| g.id != id);
        state.unschedule(|t| matches!(t, Transition::Gateway { id: g, .. } if g == id));
        if let (Some(address), Some(pool)) = (public_ip, state.floating_pool.as_mut()) {
            if let Err(e) = pool.release_ip_address(address) {
                debug!(gateway_id = %id, error = %e, "Public address was not held by the pool");
            }
        }
        Ok(())
    }
}

impl ProviderClient for InMemoryProvider {
    fn profile(&self) -> &ProviderProfile {
        &self.profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(s: &str) -> CidrBlock {
        CidrBlock::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_transitions_settle_after_reads() {
        let provider = InMemoryProvider::default().with_settle_reads(2);
        let created = provider
            .create_network("net", &block("10.0.0.0/16"), name_tags("net"))
            .await
            .unwrap();
        assert_eq!(created.state, ResourceState::Pending);

        let first = provider.get_network(&created.id).await.unwrap();
        assert_eq!(first.state, ResourceState::Pending);

        let second = provider.get_network(&created.id).await.unwrap();
        assert_eq!(second.state, ResourceState::Available);
    }

    #[tokio::test]
    async fn test_openstack_codes() {
        let provider =
            InMemoryProvider::new(ProviderProfile::openstack("RegionOne")).with_settle_reads(1);
        let network = provider
            .create_network("net", &block("10.0.0.0/16"), name_tags("net"))
            .await
            .unwrap();
        assert_eq!(network.state, ResourceState::Build);

        let gateway = provider.create_gateway("net", name_tags("net")).await.unwrap();
        provider.attach_gateway(&network.id, &gateway.id).await.unwrap();

        let gateways = provider.list_gateways("net").await.unwrap();
        assert_eq!(gateways[0].state, ResourceState::Active);
        assert_eq!(gateways[0].attachments[0].state, AttachmentState::Available);
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let provider = InMemoryProvider::default();
        provider
            .fail_on(Operation::ListNetworks, ProviderError::Unavailable("boom".into()))
            .await;

        assert!(provider.list_networks("net").await.is_err());
        assert!(provider.list_networks("net").await.is_ok());
    }

    #[tokio::test]
    async fn test_only_mutating_calls_are_logged() {
        let provider = InMemoryProvider::default();
        provider.list_networks("net").await.unwrap();
        provider
            .create_network("net", &block("10.0.0.0/16"), name_tags("net"))
            .await
            .unwrap();

        assert_eq!(provider.mutating_calls().await, vec![Operation::CreateNetwork]);
        assert!(Operation::CreateNetwork.is_mutating());
        assert!(!Operation::ListNetworks.is_mutating());
    }

    #[tokio::test]
    async fn test_associate_rejects_overlap() {
        let provider = InMemoryProvider::default();
        let network = provider.insert_network("net", &block("10.0.0.0/16")).await;

        let err = provider
            .associate_cidr_block(&network.id, &block("10.0.1.0/24"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_failing_association_settles_to_failed() {
        let provider = InMemoryProvider::default().with_settle_reads(1);
        let network = provider.insert_network("net", &block("10.0.0.0/16")).await;
        provider.fail_next_association("insufficient capacity").await;

        let association = provider
            .associate_cidr_block(&network.id, &block("10.1.0.0/16"))
            .await
            .unwrap();
        assert_eq!(association.state, CidrBlockState::Associating);

        let observed = provider.get_network(&network.id).await.unwrap();
        let settled = observed.association(&association.id).unwrap();
        assert_eq!(settled.state, CidrBlockState::Failed);
        assert_eq!(settled.status_message.as_deref(), Some("insufficient capacity"));
    }

    #[tokio::test]
    async fn test_attachment_override_is_one_shot() {
        let provider = InMemoryProvider::default();
        let network = provider.insert_network("net", &block("10.0.0.0/16")).await;
        let first = provider.insert_gateway("net").await;
        let second = provider.insert_gateway("net").await;
        provider
            .settle_next_attachment_as(AttachmentState::Detaching)
            .await;

        provider.attach_gateway(&network.id, &first.id).await.unwrap();
        provider.attach_gateway(&network.id, &second.id).await.unwrap();

        let gateways = provider.gateways().await;
        assert_eq!(gateways[0].attachments[0].state, AttachmentState::Detaching);
        assert_eq!(gateways[1].attachments[0].state, AttachmentState::Attached);
    }

    #[tokio::test]
    async fn test_primary_association_cannot_be_disassociated() {
        let provider = InMemoryProvider::default();
        let network = provider.insert_network("net", &block("10.0.0.0/16")).await;
        let primary = network.associations[0].id.clone();

        let err = provider.disassociate_cidr_block(&primary).await.unwrap_err();
        assert!(matches!(err, ProviderError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_network_with_attached_gateway_conflicts() {
        let provider = InMemoryProvider::default();
        let network = provider.insert_network("net", &block("10.0.0.0/16")).await;
        let gateway = provider.insert_gateway("net").await;
        provider.attach_gateway(&network.id, &gateway.id).await.unwrap();

        let err = provider.delete_network(&network.id).await.unwrap_err();
        assert!(matches!(err, ProviderError::Conflict(_)));

        provider.detach_gateway(&network.id, &gateway.id).await.unwrap();
        provider.delete_network(&network.id).await.unwrap();
        assert!(provider.networks().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_resources_are_not_found() {
        let provider = InMemoryProvider::default();
        assert!(provider.delete_network("vpc-x").await.unwrap_err().is_not_found());
        assert!(provider.delete_gateway("igw-x").await.unwrap_err().is_not_found());
        assert!(provider.delete_dhcp_options("dopt-x").await.unwrap_err().is_not_found());
        assert!(provider
            .delete_security_group("sg-x")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(provider
            .detach_gateway("vpc-x", "igw-x")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_floating_pool_hands_out_and_reclaims_addresses() {
        let provider = InMemoryProvider::default()
            .with_floating_pool("203.0.113.0/30")
            .unwrap();

        let first = provider.create_gateway("a", name_tags("a")).await.unwrap();
        let second = provider.create_gateway("b", name_tags("b")).await.unwrap();
        assert_eq!(first.public_ip, Some("203.0.113.1".parse().unwrap()));
        assert_eq!(second.public_ip, Some("203.0.113.2".parse().unwrap()));

        let err = provider.create_gateway("c", name_tags("c")).await.unwrap_err();
        assert!(
            matches!(err, ProviderError::Api { ref code, .. } if code == "AddressLimitExceeded")
        );

        provider.delete_gateway(&first.id).await.unwrap();
        let third = provider.create_gateway("c", name_tags("c")).await.unwrap();
        assert_eq!(third.public_ip, Some("203.0.113.1".parse().unwrap()));
    }
}
