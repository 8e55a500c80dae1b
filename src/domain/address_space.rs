// Copyright (c) 2025 - Cowboy AI, Inc.
//! Address Space Allocator
//!
//! Tracks which addresses and sub-ranges of a single [`CidrBlock`] are in use.
//!
//! # Invariants
//!
//! - An address is covered by at most one allocation at a time
//! - Single-address allocation never returns the network address or the
//!   last (broadcast) address of the block
//! - Allocation is lowest-first, so the result depends only on the history
//!   of allocate/release calls
//!
//! # Concurrency
//!
//! `AddressSpace` does no locking. The owner serializes access, typically by
//! keeping it behind the same mutex that guards the records it hands
//! addresses out to.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use thiserror::Error;

use super::cidr::{CidrBlock, NetworkError};

/// Allocation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("address space {0} is exhausted")]
    Exhausted(CidrBlock),

    #[error("{0} is not allocated")]
    NotAllocated(String),

    #[error("{address} is outside of address space {block}")]
    OutOfRange { address: IpAddr, block: CidrBlock },

    #[error("{0} is already allocated")]
    AlreadyAllocated(String),

    #[error(transparent)]
    Invalid(#[from] NetworkError),
}

/// Allocator over one CIDR block
///
/// Allocations are kept as inclusive `start..=end` intervals keyed by start,
/// in the numeric address domain (IPv4 addresses are widened to `u128`).
#[derive(Debug, Clone)]
pub struct AddressSpace {
    block: CidrBlock,
    first: u128,
    last: u128,
    allocations: BTreeMap<u128, u128>,
}

impl AddressSpace {
    /// Create an empty address space for `cidr`
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        Ok(Self::for_block(CidrBlock::parse(cidr)?))
    }

    /// Create an empty address space for an already parsed block
    pub fn for_block(block: CidrBlock) -> Self {
        Self {
            block,
            first: to_u128(block.network()),
            last: to_u128(block.broadcast()),
            allocations: BTreeMap::new(),
        }
    }

    pub fn block(&self) -> &CidrBlock {
        &self.block
    }

    /// Allocate the lowest free usable address
    pub fn allocate_one_ip_address(&mut self) -> Result<IpAddr, AllocationError> {
        let (low, high) = self
            .usable_bounds()
            .ok_or(AllocationError::Exhausted(self.block))?;

        let mut candidate = low;
        for (&start, &end) in &self.allocations {
            if end < candidate {
                continue;
            }
            if start > candidate {
                break;
            }
            if end >= high {
                return Err(AllocationError::Exhausted(self.block));
            }
            candidate = end + 1;
        }
        if candidate > high {
            return Err(AllocationError::Exhausted(self.block));
        }

        self.allocations.insert(candidate, candidate);
        Ok(self.address_of(candidate))
    }

    /// Mark a specific address as allocated
    pub fn reserve_ip_address(&mut self, address: IpAddr) -> Result<(), AllocationError> {
        if !self.block.contains(&address) {
            return Err(AllocationError::OutOfRange {
                address,
                block: self.block,
            });
        }
        let value = to_u128(address);
        if self.overlapping(value, value).is_some() {
            return Err(AllocationError::AlreadyAllocated(address.to_string()));
        }
        self.allocations.insert(value, value);
        Ok(())
    }

    /// Return a single address to the free set
    ///
    /// Releasing an address that is not individually allocated (including
    /// one that is only covered by a sub-range allocation) is an error.
    pub fn release_ip_address(&mut self, address: IpAddr) -> Result<(), AllocationError> {
        let value = to_u128(address);
        if self.block.contains(&address) && self.allocations.get(&value) == Some(&value) {
            self.allocations.remove(&value);
            return Ok(());
        }
        Err(AllocationError::NotAllocated(address.to_string()))
    }

    /// Allocate the lowest aligned free sub-range with the given prefix length
    pub fn allocate_range(&mut self, prefix_length: u8) -> Result<CidrBlock, AllocationError> {
        let max = self.block.max_prefix_length();
        if prefix_length > max {
            return Err(NetworkError::InvalidPrefixLength(prefix_length).into());
        }
        if prefix_length < self.block.prefix_length() {
            return Err(NetworkError::PrefixTooShort {
                requested: prefix_length,
                enclosing: self.block.prefix_length(),
            }
            .into());
        }

        let host_bits = u32::from(max - prefix_length);
        let mask = if host_bits >= 128 {
            u128::MAX
        } else {
            (1u128 << host_bits) - 1
        };
        let exhausted = AllocationError::Exhausted(self.block);

        let mut candidate = self.first;
        loop {
            let end = candidate.checked_add(mask).ok_or_else(|| exhausted.clone())?;
            if end > self.last {
                return Err(exhausted);
            }
            match self.overlapping(candidate, end) {
                None => break,
                Some((_, taken_end)) => {
                    let next = taken_end.checked_add(1).ok_or_else(|| exhausted.clone())?;
                    candidate = next.checked_add(mask).ok_or_else(|| exhausted.clone())? & !mask;
                }
            }
        }

        let end = candidate + mask;
        self.allocations.insert(candidate, end);
        Ok(CidrBlock::from_parts(self.address_of(candidate), prefix_length)?)
    }

    /// Return a sub-range obtained from [`AddressSpace::allocate_range`]
    pub fn release_range(&mut self, range: &CidrBlock) -> Result<(), AllocationError> {
        let start = to_u128(range.network());
        let end = to_u128(range.broadcast());
        if self.block.contains_block(range) && self.allocations.get(&start) == Some(&end) {
            self.allocations.remove(&start);
            return Ok(());
        }
        Err(AllocationError::NotAllocated(range.to_string()))
    }

    /// Whether `address` is inside the block
    pub fn contains(&self, address: &IpAddr) -> bool {
        self.block.contains(address)
    }

    /// Whether `address` is covered by any allocation
    pub fn is_allocated(&self, address: &IpAddr) -> bool {
        if !self.block.contains(address) {
            return false;
        }
        let value = to_u128(*address);
        self.overlapping(value, value).is_some()
    }

    /// Number of addresses covered by allocations
    pub fn allocated_count(&self) -> u128 {
        self.allocations
            .iter()
            .fold(0u128, |acc, (start, end)| acc.saturating_add(end - start).saturating_add(1))
    }

    /// Number of addresses single-address allocation can hand out
    pub fn capacity(&self) -> u128 {
        match self.usable_bounds() {
            Some((low, high)) => (high - low).saturating_add(1),
            None => 0,
        }
    }

    fn usable_bounds(&self) -> Option<(u128, u128)> {
        if self.last - self.first < 2 {
            return None;
        }
        Some((self.first + 1, self.last - 1))
    }

    /// The allocation intersecting `start..=end`, if any
    fn overlapping(&self, start: u128, end: u128) -> Option<(u128, u128)> {
        self.allocations
            .range(..=end)
            .next_back()
            .filter(|&(_, &taken_end)| taken_end >= start)
            .map(|(&s, &e)| (s, e))
    }

    fn address_of(&self, value: u128) -> IpAddr {
        if self.block.is_ipv4() {
            IpAddr::V4(Ipv4Addr::from(value as u32))
        } else {
            IpAddr::V6(Ipv6Addr::from(value))
        }
    }
}

fn to_u128(address: IpAddr) -> u128 {
    match address {
        IpAddr::V4(a) => u128::from(u32::from(a)),
        IpAddr::V6(a) => u128::from(a),
    }
}
