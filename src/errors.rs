// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for network convergence

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a provider client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The addressed resource does not exist
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The call conflicts with the current state of a resource
    #[error("conflict: {0}")]
    Conflict(String),

    /// The control plane rejected the call
    #[error("provider API error {code}: {message}")]
    Api { code: String, message: String },

    /// The control plane could not be reached
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}

/// Result type for provider calls
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Kind of resource an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Network,
    CidrAssociation,
    DhcpOptions,
    SecurityGroup,
    Gateway,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Network => "network",
            ResourceKind::CidrAssociation => "CIDR block association",
            ResourceKind::DhcpOptions => "DHCP options",
            ResourceKind::SecurityGroup => "security group",
            ResourceKind::Gateway => "gateway",
        };
        f.write_str(s)
    }
}

/// Engine step a provider call was made from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    DescribeNetwork,
    CreateNetwork,
    AssociateCidrBlock,
    DisassociateCidrBlock,
    DescribeDhcpOptions,
    CreateDhcpOptions,
    AssociateDhcpOptions,
    DeleteDhcpOptions,
    DescribeSecurityGroup,
    CreateSecurityGroup,
    DeleteSecurityGroup,
    DescribeGateway,
    CreateGateway,
    AttachGateway,
    DetachGateway,
    DeleteGateway,
    DeleteNetwork,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::DescribeNetwork => "describing network",
            Step::CreateNetwork => "creating network",
            Step::AssociateCidrBlock => "associating CIDR block",
            Step::DisassociateCidrBlock => "disassociating CIDR block",
            Step::DescribeDhcpOptions => "describing DHCP options",
            Step::CreateDhcpOptions => "creating DHCP options",
            Step::AssociateDhcpOptions => "associating DHCP options",
            Step::DeleteDhcpOptions => "deleting DHCP options",
            Step::DescribeSecurityGroup => "describing security group",
            Step::CreateSecurityGroup => "creating security group",
            Step::DeleteSecurityGroup => "deleting security group",
            Step::DescribeGateway => "describing gateway",
            Step::CreateGateway => "creating gateway",
            Step::AttachGateway => "attaching gateway",
            Step::DetachGateway => "detaching gateway",
            Step::DeleteGateway => "deleting gateway",
            Step::DeleteNetwork => "deleting network",
        };
        f.write_str(s)
    }
}

/// Coarse classification of a [`ConvergenceError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    Configuration,
    Ambiguous,
    ImmutableField,
    CidrOverlap,
    TransitionFailed,
    Timeout,
    Cancelled,
    Provider,
}

/// Errors that abort a convergence pass
#[derive(Debug, Error)]
pub enum ConvergenceError {
    /// Every validation violation found in the options
    #[error("invalid input: {}", .0.join("; "))]
    InvalidInput(Vec<String>),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// More than one resource carries the topology name
    #[error("ambiguous {resource} lookup: {count} resources named {name:?}")]
    Ambiguous {
        resource: ResourceKind,
        name: String,
        count: usize,
    },

    /// A field that cannot change after creation differs from the desired value
    #[error("immutable field {field} cannot change from {live} to {desired}")]
    ImmutableField {
        field: &'static str,
        live: String,
        desired: String,
    },

    #[error("CIDR block {block} overlaps {conflicts_with}")]
    CidrOverlap {
        block: String,
        conflicts_with: String,
    },

    /// A resource entered a failure state while the pass waited on it
    #[error("{resource} {id} entered state {code}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    TransitionFailed {
        resource: ResourceKind,
        id: String,
        code: String,
        message: Option<String>,
    },

    #[error("timed out after {timeout:?} waiting for {waiting_for}")]
    Timeout {
        waiting_for: String,
        timeout: Duration,
    },

    #[error("cancelled while waiting for {waiting_for}")]
    Cancelled { waiting_for: String },

    #[error("provider call failed while {step}: {source}")]
    Provider {
        step: Step,
        #[source]
        source: ProviderError,
    },
}

impl ConvergenceError {
    /// Wrap a provider failure with the step it happened in
    pub fn provider(step: Step) -> impl FnOnce(ProviderError) -> Self {
        move |source| ConvergenceError::Provider { step, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvergenceError::InvalidInput(_) => ErrorKind::InvalidInput,
            ConvergenceError::Configuration(_) => ErrorKind::Configuration,
            ConvergenceError::Ambiguous { .. } => ErrorKind::Ambiguous,
            ConvergenceError::ImmutableField { .. } => ErrorKind::ImmutableField,
            ConvergenceError::CidrOverlap { .. } => ErrorKind::CidrOverlap,
            ConvergenceError::TransitionFailed { .. } => ErrorKind::TransitionFailed,
            ConvergenceError::Timeout { .. } => ErrorKind::Timeout,
            ConvergenceError::Cancelled { .. } => ErrorKind::Cancelled,
            ConvergenceError::Provider { .. } => ErrorKind::Provider,
        }
    }

    /// A later pass with the same input fails the same way
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidInput
                | ErrorKind::Configuration
                | ErrorKind::Ambiguous
                | ErrorKind::ImmutableField
                | ErrorKind::CidrOverlap
        )
    }
}

impl From<serde_json::Error> for ConvergenceError {
    fn from(err: serde_json::Error) -> Self {
        ConvergenceError::Configuration(err.to_string())
    }
}

/// Result type for convergence operations
pub type InfraResult<T> = Result<T, ConvergenceError>;
