// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer for Network Convergence
//!
//! Orchestrates the pure domain rules, the provider client and the bounded
//! polls into the operations a caller runs.
//!
//! # Architecture
//!
//! ```text
//! Caller (controller, CLI)
//!     ↓
//! create_infra / delete_infra / observe   (this module)
//!     ↓
//! Invariants + StateCase tables   (pure)
//!     ↓
//! ProviderClient   (async I/O)
//! ```
//!
//! # Design Principles
//!
//! 1. **Idempotent**: a pass against a converged topology mutates nothing
//! 2. **Ordered**: steps run strictly in dependency order
//! 3. **Bounded**: every wait has an interval, a deadline and a cancel signal
//! 4. **No hidden state**: every pass re-reads the provider

pub mod convergence;
pub mod poll;

pub use convergence::{
    create_infra, delete_infra, observe, CreateInfraOptions, DEFAULT_INTERVAL, DEFAULT_TIMEOUT,
};
pub use poll::{cancellation, CancelHandle, CancelSignal, Poller};
