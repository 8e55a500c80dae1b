// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! - `overlap`: equality and overlap relations between CIDR blocks
//! - `allocator`: uniqueness and exhaustion of the address-space allocator
//! - `planning`: association plans converge the live set onto the desired set

mod allocator;
mod overlap;
mod planning;
