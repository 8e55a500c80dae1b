// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Convergence Engine
//!
//! Drives the provider's live state toward a declared [`NetworkTopologySpec`]
//! in one linear, idempotent pass. Running a pass against an already
//! converged topology makes no mutating calls.
//!
//! # Pass
//!
//! ```text
//! validate → network → network ready → primary block unchanged
//!          → secondary CIDR blocks → DHCP options → security group
//!          → gateway → gateway ready → gateway attached → result
//! ```
//!
//! Every decision re-reads provider state first; nothing is cached between
//! passes. Each wait is bounded by the pass interval and timeout and honours
//! the pass cancellation signal.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use cim_network_convergence::provider::{InMemoryProvider, ProviderProfile};
//! use cim_network_convergence::service::{create_infra, CreateInfraOptions};
//!
//! # tokio_test::block_on(async {
//! let provider = Arc::new(InMemoryProvider::new(ProviderProfile::public_cloud("us-east-1")));
//! let options = CreateInfraOptions::new()
//!     .with_name("cm-net1")
//!     .with_cidr_blocks(["10.0.0.0/16", "10.1.0.0/16"])
//!     .with_client(provider)
//!     .with_interval(Duration::from_millis(10));
//!
//! let result = create_infra(options).await.unwrap();
//! assert!(result.created);
//! # });
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::poll::{CancelSignal, Poller};
use crate::domain::invariants::{validate_cidr_blocks, validate_name, validate_primary_block};
use crate::domain::{
    name_tags, plan_associations, CidrBlockAssociation, ConvergenceResult, GatewayRecord,
    NetworkRecord, NetworkTopologySpec, ObservedTopology, SecurityGroupFilter, ValidationError,
};
use crate::errors::{
    ConvergenceError, InfraResult, ProviderError, ProviderResult, ResourceKind, Step,
};
use crate::provider::ProviderClient;
use crate::state_machine::{
    cidr_association_settle, gateway_attachment, gateway_ready, network_ready, Outcome,
};

/// Timeout applied when none (or zero) is given
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Poll interval applied when none (or zero) is given
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Options for [`create_infra`]
#[derive(Clone, Default)]
pub struct CreateInfraOptions {
    name: String,
    cidr_blocks: Vec<String>,
    client: Option<Arc<dyn ProviderClient>>,
    timeout: Duration,
    interval: Duration,
    cancellation: Option<CancelSignal>,
}

impl fmt::Debug for CreateInfraOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateInfraOptions")
            .field("name", &self.name)
            .field("cidr_blocks", &self.cidr_blocks)
            .field("client", &self.client.as_ref().map(|c| c.profile().clone()))
            .field("timeout", &self.timeout)
            .field("interval", &self.interval)
            .field("cancellable", &self.cancellation.is_some())
            .finish()
    }
}

impl CreateInfraOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Append blocks; the first block ever added is the primary block
    pub fn with_cidr_blocks<I, S>(mut self, blocks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cidr_blocks.extend(blocks.into_iter().map(Into::into));
        self
    }

    pub fn with_client(mut self, client: Arc<dyn ProviderClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_cancellation(mut self, signal: CancelSignal) -> Self {
        self.cancellation = Some(signal);
        self
    }

    /// Check every rule and build the desired state
    ///
    /// All violations are reported together in one
    /// [`ConvergenceError::InvalidInput`].
    pub fn validate(&self) -> InfraResult<NetworkTopologySpec> {
        let mut violations: Vec<String> = Vec::new();

        if let Err(e) = validate_name(&self.name) {
            violations.push(e.to_string());
        }

        let blocks = match validate_cidr_blocks(&self.cidr_blocks) {
            Ok(blocks) => blocks,
            Err(errors) => {
                violations.extend(errors.iter().map(ToString::to_string));
                Vec::new()
            }
        };

        if self.client.is_none() {
            violations.push(ValidationError::ClientRequired.to_string());
        }

        if !violations.is_empty() {
            return Err(ConvergenceError::InvalidInput(violations));
        }

        NetworkTopologySpec::new(
            &self.name,
            blocks,
            non_zero_or(self.timeout, DEFAULT_TIMEOUT),
            non_zero_or(self.interval, DEFAULT_INTERVAL),
        )
        .map_err(|e| ConvergenceError::InvalidInput(vec![e.to_string()]))
    }
}

fn non_zero_or(value: Duration, default: Duration) -> Duration {
    if value.is_zero() {
        default
    } else {
        value
    }
}

/// Converge the named topology toward the options' desired state
pub async fn create_infra(options: CreateInfraOptions) -> InfraResult<ConvergenceResult> {
    let spec = options.validate()?;
    let Some(client) = options.client.as_deref() else {
        return Err(ConvergenceError::InvalidInput(vec![
            ValidationError::ClientRequired.to_string(),
        ]));
    };

    let mut poller = Poller::new(spec.interval(), spec.timeout());
    if let Some(signal) = options.cancellation.clone() {
        if signal.is_cancelled() {
            warn!("Convergence of {} cancelled before start", spec.name());
            return Err(ConvergenceError::Cancelled {
                waiting_for: "pass start".to_string(),
            });
        }
        poller = poller.with_cancellation(signal);
    }

    info!(
        "Converging network topology {} ({} CIDR blocks, provider {} in {})",
        spec.name(),
        spec.block_count(),
        client.profile().kind,
        client.profile().region
    );

    let mut pass = Pass {
        client,
        spec: &spec,
        poller,
        created: false,
        updated: false,
    };
    pass.run().await
}

/// One convergence pass over a validated spec
struct Pass<'a> {
    client: &'a dyn ProviderClient,
    spec: &'a NetworkTopologySpec,
    poller: Poller,
    created: bool,
    updated: bool,
}

impl<'a> Pass<'a> {
    async fn run(&mut self) -> InfraResult<ConvergenceResult> {
        let network = self.ensure_network().await?;
        let network = self.wait_network_ready(network).await?;

        validate_primary_block(&network, self.spec.primary_block()).map_err(|_| {
            ConvergenceError::ImmutableField {
                field: "primary CIDR block",
                live: network.primary_cidr.clone(),
                desired: self.spec.primary_block().to_string(),
            }
        })?;

        let network = self.reconcile_cidr_blocks(network).await?;
        let dhcp_options_id = self.ensure_dhcp_options(&network).await?;
        let security_group_id = self.ensure_security_group(&network).await?;
        let gateway = self.ensure_gateway(&network).await?;

        let network = self
            .client
            .get_network(&network.id)
            .await
            .map_err(ConvergenceError::provider(Step::DescribeNetwork))?;

        info!(
            "Network topology {} converged (network {}, created: {}, updated: {})",
            self.spec.name(), network.id, self.created, self.updated
        );

        Ok(ConvergenceResult {
            created: self.created,
            updated: self.updated,
            network,
            dhcp_options_id,
            security_group_id,
            gateway,
            converged_at: Utc::now(),
        })
    }

    async fn ensure_network(&mut self) -> InfraResult<NetworkRecord> {
        let name = self.spec.name();
        let networks = self
            .client
            .list_networks(name)
            .await
            .map_err(ConvergenceError::provider(Step::DescribeNetwork))?;

        if let Some(network) = single(ResourceKind::Network, name, networks)? {
            debug!("Found network {} for {}", network.id, name);
            return Ok(network);
        }

        let primary = self.spec.primary_block();
        info!("Creating network {} with primary block {}", name, primary);
        let network = self
            .client
            .create_network(name, primary, name_tags(name))
            .await
            .map_err(ConvergenceError::provider(Step::CreateNetwork))?;
        self.created = true;
        Ok(network)
    }

    async fn wait_network_ready(&self, network: NetworkRecord) -> InfraResult<NetworkRecord> {
        let table = network_ready();
        match table.case(&network.state) {
            Outcome::Act | Outcome::Ignore => return Ok(network),
            Outcome::Error => {
                return Err(transition_failed(
                    ResourceKind::Network,
                    &network.id,
                    network.state,
                    None,
                ))
            }
            Outcome::Delay => {}
        }

        debug!("Network {} is {}, waiting", network.id, network.state);
        let client = self.client;
        let table = &table;
        let id = network.id.as_str();
        self.poller
            .wait("network ready", move || async move {
                let current = client
                    .get_network(id)
                    .await
                    .map_err(ConvergenceError::provider(Step::DescribeNetwork))?;
                match table.case(&current.state) {
                    Outcome::Act | Outcome::Ignore => Ok(Some(current)),
                    Outcome::Delay => Ok(None),
                    Outcome::Error => Err(transition_failed(
                        ResourceKind::Network,
                        &current.id,
                        current.state,
                        None,
                    )),
                }
            })
            .await
    }

    async fn reconcile_cidr_blocks(
        &mut self,
        network: NetworkRecord,
    ) -> InfraResult<NetworkRecord> {
        let settle = cidr_association_settle();

        let in_flight: Vec<String> = network
            .associations
            .iter()
            .filter(|a| settle.is_classified(&a.state) && settle.case(&a.state) == Outcome::Delay)
            .map(|a| a.id.clone())
            .collect();
        let network = if in_flight.is_empty() {
            network
        } else {
            info!(
                "Waiting for {} in-flight CIDR associations on {} before planning",
                in_flight.len(),
                network.id
            );
            self.wait_associations(&network.id, &in_flight).await?
        };

        let plan = plan_associations(
            &network,
            self.spec.primary_block(),
            self.spec.secondary_blocks(),
        )
        // Only reachable with blocks that skipped validate_cidr_blocks.
        .map_err(|conflict| ConvergenceError::CidrOverlap {
            block: conflict.block.to_string(),
            conflicts_with: conflict.conflicts_with.to_string(),
        })?;

        if plan.is_empty() {
            debug!("Secondary CIDR blocks of {} already converged", network.id);
            return Ok(network);
        }

        let mut network = network;

        if !plan.removals.is_empty() {
            let mut touched = Vec::with_capacity(plan.removals.len());
            for association in &plan.removals {
                info!(
                    "Disassociating stale CIDR block {} ({}) from {}",
                    association.block, association.id, network.id
                );
                self.client
                    .disassociate_cidr_block(&association.id)
                    .await
                    .map_err(ConvergenceError::provider(Step::DisassociateCidrBlock))?;
                touched.push(association.id.clone());
            }
            self.updated = true;
            network = self.wait_associations(&network.id, &touched).await?;
        }

        if !plan.additions.is_empty() {
            let mut touched = Vec::with_capacity(plan.additions.len());
            for block in &plan.additions {
                info!("Associating CIDR block {} with {}", block, network.id);
                let association = self
                    .client
                    .associate_cidr_block(&network.id, block)
                    .await
                    .map_err(ConvergenceError::provider(Step::AssociateCidrBlock))?;
                touched.push(association.id);
            }
            self.updated = true;
            network = self.wait_associations(&network.id, &touched).await?;
        }

        Ok(network)
    }

    /// Wait until every listed association has left its transitional codes
    ///
    /// An association that vanished from the network counts as settled.
    async fn wait_associations(
        &self,
        network_id: &str,
        association_ids: &[String],
    ) -> InfraResult<NetworkRecord> {
        let client = self.client;
        let table = &cidr_association_settle();
        self.poller
            .wait("CIDR associations to settle", move || async move {
                let network = client
                    .get_network(network_id)
                    .await
                    .map_err(ConvergenceError::provider(Step::DescribeNetwork))?;

                let mut settled = true;
                for id in association_ids {
                    let Some(association) = network.association(id) else {
                        continue;
                    };
                    match table.case(&association.state) {
                        Outcome::Act | Outcome::Ignore => {}
                        Outcome::Delay => settled = false,
                        Outcome::Error => return Err(association_failed(association)),
                    }
                }
                Ok(settled.then_some(network))
            })
            .await
    }

    async fn ensure_dhcp_options(&mut self, network: &NetworkRecord) -> InfraResult<String> {
        let name = self.spec.name();
        let existing = self
            .client
            .list_dhcp_options(name)
            .await
            .map_err(ConvergenceError::provider(Step::DescribeDhcpOptions))?;

        let options = match single(ResourceKind::DhcpOptions, name, existing)? {
            Some(options) => options,
            None => {
                let domain = self.client.profile().default_dhcp_domain();
                info!("Creating DHCP options for {} with domain {}", name, domain);
                let options = self
                    .client
                    .create_dhcp_options(name, &domain, name_tags(name))
                    .await
                    .map_err(ConvergenceError::provider(Step::CreateDhcpOptions))?;
                self.updated = true;
                options
            }
        };

        if network.dhcp_options_id.as_deref() != Some(options.id.as_str()) {
            info!("Associating DHCP options {} with {}", options.id, network.id);
            self.client
                .associate_dhcp_options(&network.id, &options.id)
                .await
                .map_err(ConvergenceError::provider(Step::AssociateDhcpOptions))?;
            self.updated = true;
        }

        Ok(options.id)
    }

    async fn ensure_security_group(&mut self, network: &NetworkRecord) -> InfraResult<String> {
        let name = self.spec.name();
        let filter = SecurityGroupFilter::for_network(network.id.as_str(), name);
        let existing = self
            .client
            .list_security_groups(&filter)
            .await
            .map_err(ConvergenceError::provider(Step::DescribeSecurityGroup))?;

        if let Some(group) = single(ResourceKind::SecurityGroup, name, existing)? {
            return Ok(group.id);
        }

        info!("Creating security group {} in {}", name, network.id);
        let group = self
            .client
            .create_security_group(&network.id, name, name_tags(name))
            .await
            .map_err(ConvergenceError::provider(Step::CreateSecurityGroup))?;
        self.updated = true;
        Ok(group.id)
    }

    async fn ensure_gateway(&mut self, network: &NetworkRecord) -> InfraResult<GatewayRecord> {
        let name = self.spec.name();
        let existing = self
            .client
            .list_gateways(name)
            .await
            .map_err(ConvergenceError::provider(Step::DescribeGateway))?;

        let gateway = match single(ResourceKind::Gateway, name, existing)? {
            Some(gateway) => gateway,
            None => {
                info!("Creating gateway for {}", name);
                let gateway = self
                    .client
                    .create_gateway(name, name_tags(name))
                    .await
                    .map_err(ConvergenceError::provider(Step::CreateGateway))?;
                self.updated = true;
                gateway
            }
        };

        let gateway = self.wait_gateway_ready(gateway).await?;

        if gateway.is_attached_to(&network.id) {
            let attachment_settled = gateway
                .attachment_to(&network.id)
                .map(|a| gateway_attachment().case(&a.state) == Outcome::Act)
                .unwrap_or(false);
            if attachment_settled {
                return Ok(gateway);
            }
        } else {
            info!("Attaching gateway {} to {}", gateway.id, network.id);
            self.client
                .attach_gateway(&network.id, &gateway.id)
                .await
                .map_err(ConvergenceError::provider(Step::AttachGateway))?;
            self.updated = true;
        }

        self.wait_gateway_attached(&gateway.id, &network.id).await
    }

    async fn wait_gateway_ready(&self, gateway: GatewayRecord) -> InfraResult<GatewayRecord> {
        let table = gateway_ready();
        match table.case(&gateway.state) {
            Outcome::Act | Outcome::Ignore => return Ok(gateway),
            Outcome::Error => {
                return Err(transition_failed(
                    ResourceKind::Gateway,
                    &gateway.id,
                    gateway.state,
                    None,
                ))
            }
            Outcome::Delay => {}
        }

        debug!("Gateway {} is {}, waiting", gateway.id, gateway.state);
        let client = self.client;
        let table = &table;
        let name = self.spec.name();
        let id = gateway.id.as_str();
        self.poller
            .wait("gateway ready", move || async move {
                let current = find_gateway(client, name, id).await?;
                match table.case(&current.state) {
                    Outcome::Act | Outcome::Ignore => Ok(Some(current)),
                    Outcome::Delay => Ok(None),
                    Outcome::Error => Err(transition_failed(
                        ResourceKind::Gateway,
                        &current.id,
                        current.state,
                        None,
                    )),
                }
            })
            .await
    }

    async fn wait_gateway_attached(
        &self,
        gateway_id: &str,
        network_id: &str,
    ) -> InfraResult<GatewayRecord> {
        let client = self.client;
        let table = &gateway_attachment();
        let name = self.spec.name();
        self.poller
            .wait("gateway attachment", move || async move {
                let current = find_gateway(client, name, gateway_id).await?;
                let Some(attachment) = current
                    .attachments
                    .iter()
                    .find(|a| a.network_id == network_id)
                else {
                    return Ok(None);
                };
                match table.case(&attachment.state) {
                    Outcome::Act | Outcome::Ignore => Ok(Some(current)),
                    Outcome::Delay => Ok(None),
                    Outcome::Error => Err(transition_failed(
                        ResourceKind::Gateway,
                        &current.id,
                        attachment.state,
                        Some(format!("attachment to {network_id}")),
                    )),
                }
            })
            .await
    }
}

async fn find_gateway(
    client: &dyn ProviderClient,
    name: &str,
    id: &str,
) -> InfraResult<GatewayRecord> {
    let gateways = client
        .list_gateways(name)
        .await
        .map_err(ConvergenceError::provider(Step::DescribeGateway))?;
    gateways
        .into_iter()
        .find(|g| g.id == id)
        .ok_or_else(|| ConvergenceError::Provider {
            step: Step::DescribeGateway,
            source: ProviderError::NotFound(format!("gateway {id}")),
        })
}

/// Zero or one resource; more than one is ambiguous
fn single<T>(resource: ResourceKind, name: &str, mut found: Vec<T>) -> InfraResult<Option<T>> {
    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        count => Err(ConvergenceError::Ambiguous {
            resource,
            name: name.to_string(),
            count,
        }),
    }
}

fn transition_failed(
    resource: ResourceKind,
    id: &str,
    code: impl fmt::Display,
    message: Option<String>,
) -> ConvergenceError {
    warn!("{} {} entered failure state {}", resource, id, code);
    ConvergenceError::TransitionFailed {
        resource,
        id: id.to_string(),
        code: code.to_string(),
        message,
    }
}

fn association_failed(association: &CidrBlockAssociation) -> ConvergenceError {
    transition_failed(
        ResourceKind::CidrAssociation,
        &association.id,
        association.state,
        association.status_message.clone(),
    )
}

/// Remove every resource of the named topology
///
/// Gateways are detached first, then security groups, networks, gateways
/// and DHCP options are deleted. A resource that is already gone counts as
/// deleted; any other provider failure stops the delete.
pub async fn delete_infra(name: &str, client: &dyn ProviderClient) -> InfraResult<()> {
    let name = topology_name(name)?;
    info!("Deleting network topology {}", name);

    let networks = client
        .list_networks(name)
        .await
        .map_err(ConvergenceError::provider(Step::DescribeNetwork))?;
    let gateways = client
        .list_gateways(name)
        .await
        .map_err(ConvergenceError::provider(Step::DescribeGateway))?;

    for network in &networks {
        for gateway in gateways.iter().filter(|g| g.is_attached_to(&network.id)) {
            info!("Detaching gateway {} from {}", gateway.id, network.id);
            tolerate_not_found(
                client.detach_gateway(&network.id, &gateway.id).await,
                Step::DetachGateway,
                &gateway.id,
            )?;
        }
    }

    for network in &networks {
        let filter = SecurityGroupFilter::for_network(network.id.as_str(), name);
        let groups = client
            .list_security_groups(&filter)
            .await
            .map_err(ConvergenceError::provider(Step::DescribeSecurityGroup))?;
        for group in &groups {
            info!("Deleting security group {}", group.id);
            tolerate_not_found(
                client.delete_security_group(&group.id).await,
                Step::DeleteSecurityGroup,
                &group.id,
            )?;
        }
    }

    for network in &networks {
        info!("Deleting network {}", network.id);
        tolerate_not_found(
            client.delete_network(&network.id).await,
            Step::DeleteNetwork,
            &network.id,
        )?;
    }

    for gateway in &gateways {
        info!("Deleting gateway {}", gateway.id);
        tolerate_not_found(
            client.delete_gateway(&gateway.id).await,
            Step::DeleteGateway,
            &gateway.id,
        )?;
    }

    let dhcp_options = client
        .list_dhcp_options(name)
        .await
        .map_err(ConvergenceError::provider(Step::DescribeDhcpOptions))?;
    for options in &dhcp_options {
        info!("Deleting DHCP options {}", options.id);
        tolerate_not_found(
            client.delete_dhcp_options(&options.id).await,
            Step::DeleteDhcpOptions,
            &options.id,
        )?;
    }

    info!("Network topology {} deleted", name);
    Ok(())
}

/// The name as tagged by [`create_infra`]: validated and trimmed
fn topology_name(name: &str) -> InfraResult<&str> {
    validate_name(name).map_err(|e| ConvergenceError::InvalidInput(vec![e.to_string()]))?;
    Ok(name.trim())
}

fn tolerate_not_found(result: ProviderResult<()>, step: Step, id: &str) -> InfraResult<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => {
            debug!("{} {}: already gone ({})", step, id, e);
            Ok(())
        }
        Err(source) => Err(ConvergenceError::Provider { step, source }),
    }
}

/// Read-only snapshot of the named topology
pub async fn observe(name: &str, client: &dyn ProviderClient) -> InfraResult<ObservedTopology> {
    let name = topology_name(name)?;

    let networks = client
        .list_networks(name)
        .await
        .map_err(ConvergenceError::provider(Step::DescribeNetwork))?;
    let network = single(ResourceKind::Network, name, networks)?;

    let dhcp_options = client
        .list_dhcp_options(name)
        .await
        .map_err(ConvergenceError::provider(Step::DescribeDhcpOptions))?;
    let dhcp_options = single(ResourceKind::DhcpOptions, name, dhcp_options)?;

    let security_group = match &network {
        Some(network) => {
            let filter = SecurityGroupFilter::for_network(network.id.as_str(), name);
            let groups = client
                .list_security_groups(&filter)
                .await
                .map_err(ConvergenceError::provider(Step::DescribeSecurityGroup))?;
            single(ResourceKind::SecurityGroup, name, groups)?
        }
        None => None,
    };

    let gateways = client
        .list_gateways(name)
        .await
        .map_err(ConvergenceError::provider(Step::DescribeGateway))?;
    let gateway = single(ResourceKind::Gateway, name, gateways)?;

    Ok(ObservedTopology {
        network,
        dhcp_options,
        security_group,
        gateway,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::provider::{InMemoryProvider, ProviderProfile};

    fn client() -> Arc<dyn ProviderClient> {
        Arc::new(InMemoryProvider::new(ProviderProfile::default()))
    }

    #[test]
    fn test_validate_defaults() {
        let spec = CreateInfraOptions::new()
            .with_name("net")
            .with_cidr_blocks(["10.0.0.0/16"])
            .with_client(client())
            .validate()
            .unwrap();

        assert_eq!(spec.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(spec.interval(), DEFAULT_INTERVAL);
    }

    #[test]
    fn test_with_cidr_blocks_appends() {
        let spec = CreateInfraOptions::new()
            .with_name("net")
            .with_cidr_blocks(["10.0.0.0/16"])
            .with_cidr_blocks(vec!["10.1.0.0/16".to_string()])
            .with_client(client())
            .validate()
            .unwrap();

        assert_eq!(spec.primary_block().to_string(), "10.0.0.0/16");
        assert_eq!(spec.secondary_blocks()[0].to_string(), "10.1.0.0/16");
    }

    #[test]
    fn test_validate_aggregates_violations() {
        let err = CreateInfraOptions::new()
            .with_cidr_blocks(["10.0.0.0/16", "nonsense"])
            .validate()
            .unwrap_err();

        let ConvergenceError::InvalidInput(violations) = &err else {
            panic!("expected InvalidInput, got {err:?}");
        };
        assert_eq!(violations.len(), 3);
        assert!(err.is_terminal());
    }

    #[test]
    fn test_single() {
        assert_eq!(single(ResourceKind::Network, "n", Vec::<u8>::new()).unwrap(), None);
        assert_eq!(single(ResourceKind::Network, "n", vec![1]).unwrap(), Some(1));
        let err = single(ResourceKind::Network, "n", vec![1, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ambiguous);
    }

    #[test]
    fn test_topology_name_is_trimmed() {
        assert_eq!(topology_name(" cm-net1 ").unwrap(), "cm-net1");
        assert_eq!(topology_name("  ").unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_tolerate_not_found() {
        assert!(tolerate_not_found(
            Err(ProviderError::NotFound("x".into())),
            Step::DeleteNetwork,
            "x"
        )
        .is_ok());
        let err = tolerate_not_found(
            Err(ProviderError::Conflict("busy".into())),
            Step::DeleteNetwork,
            "x",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Provider);
    }
}
