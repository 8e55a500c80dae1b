// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for the Address Space Allocator
//!
//! Whatever the sequence of allocate and release calls, no address is ever
//! handed out twice while held, and a full space reports exhaustion.

use cim_network_convergence::domain::{cidr_overlap, AddressSpace, AllocationError, CidrBlock};
use proptest::prelude::*;
use std::collections::HashSet;
use std::net::IpAddr;

/// Allocator operation for sequence testing
#[derive(Debug, Clone)]
enum AllocatorOp {
    Allocate,
    /// Release the held address at this index (modulo the number held)
    Release(usize),
}

// ============================================================================
// Strategies
// ============================================================================

/// Small IPv4 pools so exhaustion is reachable
fn small_pool() -> impl Strategy<Value = AddressSpace> {
    (any::<u8>(), any::<u8>(), 24u8..=30).prop_map(|(b, c, prefix)| {
        AddressSpace::new(format!("10.{b}.{c}.0/{prefix}")).unwrap()
    })
}

fn allocator_ops() -> impl Strategy<Value = Vec<AllocatorOp>> {
    prop::collection::vec(
        prop_oneof![
            3 => Just(AllocatorOp::Allocate),
            1 => any::<usize>().prop_map(AllocatorOp::Release),
        ],
        0..200,
    )
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Property: draining a pool yields exactly `capacity` distinct usable addresses
    #[test]
    fn prop_drain_is_unique_then_exhausted(mut pool in small_pool()) {
        let block = *pool.block();
        let capacity = pool.capacity();
        let mut seen = HashSet::new();

        for _ in 0..capacity {
            let address = pool.allocate_one_ip_address().unwrap();
            prop_assert!(block.contains(&address));
            prop_assert_ne!(address, block.network());
            prop_assert_ne!(address, block.broadcast());
            prop_assert!(seen.insert(address), "address {} handed out twice", address);
        }

        prop_assert_eq!(
            pool.allocate_one_ip_address(),
            Err(AllocationError::Exhausted(block))
        );
        prop_assert_eq!(pool.allocated_count(), capacity);
    }

    /// Property: held addresses are always distinct across any op sequence
    #[test]
    fn prop_held_addresses_stay_unique(mut pool in small_pool(), ops in allocator_ops()) {
        let mut held: Vec<IpAddr> = Vec::new();

        for op in ops {
            match op {
                AllocatorOp::Allocate => match pool.allocate_one_ip_address() {
                    Ok(address) => {
                        prop_assert!(!held.contains(&address), "{} already held", address);
                        held.push(address);
                    }
                    Err(AllocationError::Exhausted(_)) => {
                        prop_assert_eq!(held.len() as u128, pool.capacity());
                    }
                    Err(other) => prop_assert!(false, "unexpected error {}", other),
                },
                AllocatorOp::Release(index) => {
                    if held.is_empty() {
                        continue;
                    }
                    let address = held.swap_remove(index % held.len());
                    prop_assert!(pool.release_ip_address(address).is_ok());
                    prop_assert!(!pool.is_allocated(&address));
                }
            }
            prop_assert_eq!(pool.allocated_count(), held.len() as u128);
        }
    }

    /// Property: releasing twice fails the second time
    #[test]
    fn prop_double_release_fails(mut pool in small_pool()) {
        let address = pool.allocate_one_ip_address().unwrap();
        prop_assert!(pool.release_ip_address(address).is_ok());
        prop_assert!(
            matches!(
                pool.release_ip_address(address),
                Err(AllocationError::NotAllocated(_))
            ),
            "second release of {} must fail",
            address
        );
    }

    /// Property: allocated sub-ranges are aligned, contained and pairwise disjoint
    #[test]
    fn prop_ranges_are_disjoint(prefixes in prop::collection::vec(18u8..=28, 1..40)) {
        let mut space = AddressSpace::new("10.0.0.0/16").unwrap();
        let mut ranges: Vec<CidrBlock> = Vec::new();

        for prefix in prefixes {
            let Ok(range) = space.allocate_range(prefix) else {
                continue;
            };
            prop_assert_eq!(range.prefix_length(), prefix);
            prop_assert!(space.block().contains_block(&range));
            prop_assert_eq!(CidrBlock::parse(range.to_string()).unwrap(), range);
            for other in &ranges {
                prop_assert!(!cidr_overlap(&range, other), "{} overlaps {}", range, other);
                prop_assert_ne!(&range, other);
            }
            ranges.push(range);
        }
    }
}
