// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for CIDR Equality and Overlap
//!
//! Overlap is "shares an address but is not the same network". These tests
//! pin down that relation for arbitrary IPv4 and IPv6 blocks.

use cim_network_convergence::domain::{cidr_equals, cidr_overlap, cidr_overlap_str, CidrBlock};
use proptest::prelude::*;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

// ============================================================================
// Strategies
// ============================================================================

fn ipv4_block() -> impl Strategy<Value = CidrBlock> {
    (any::<u32>(), 0u8..=32).prop_map(|(address, prefix)| {
        CidrBlock::from_parts(IpAddr::V4(Ipv4Addr::from(address)), prefix).unwrap()
    })
}

fn ipv6_block() -> impl Strategy<Value = CidrBlock> {
    (any::<u128>(), 0u8..=128).prop_map(|(address, prefix)| {
        CidrBlock::from_parts(IpAddr::V6(Ipv6Addr::from(address)), prefix).unwrap()
    })
}

fn any_block() -> impl Strategy<Value = CidrBlock> {
    prop_oneof![ipv4_block(), ipv6_block()]
}

/// A block and a strictly longer-prefix block inside it
fn nested_pair() -> impl Strategy<Value = (CidrBlock, CidrBlock)> {
    (any::<u32>(), 0u8..32).prop_flat_map(|(address, outer)| {
        ((outer + 1)..=32).prop_map(move |inner| {
            let ip = IpAddr::V4(Ipv4Addr::from(address));
            (
                CidrBlock::from_parts(ip, outer).unwrap(),
                CidrBlock::from_parts(ip, inner).unwrap(),
            )
        })
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Property: overlap is symmetric
    #[test]
    fn prop_overlap_is_symmetric(a in any_block(), b in any_block()) {
        prop_assert_eq!(cidr_overlap(&a, &b), cidr_overlap(&b, &a));
    }

    /// Property: equal blocks never overlap
    #[test]
    fn prop_equality_excludes_overlap(a in any_block(), b in any_block()) {
        prop_assert!(!(cidr_equals(&a, &b) && cidr_overlap(&a, &b)));
    }

    /// Property: a block equals itself and does not overlap itself
    #[test]
    fn prop_reflexive_equality(a in any_block()) {
        prop_assert!(cidr_equals(&a, &a));
        prop_assert!(!cidr_overlap(&a, &a));
    }

    /// Property: a strictly nested block always overlaps its container
    #[test]
    fn prop_nested_blocks_overlap((outer, inner) in nested_pair()) {
        prop_assert!(cidr_overlap(&outer, &inner));
        prop_assert!(outer.contains_block(&inner));
        prop_assert!(!inner.contains_block(&outer));
    }

    /// Property: address families never overlap
    #[test]
    fn prop_families_never_overlap(a in ipv4_block(), b in ipv6_block()) {
        prop_assert!(!cidr_overlap(&a, &b));
        prop_assert!(!cidr_equals(&a, &b));
    }

    /// Property: the string form agrees with the parsed form
    #[test]
    fn prop_string_overlap_matches_parsed(a in any_block(), b in any_block()) {
        let from_str = cidr_overlap_str(&a.to_string(), &b.to_string()).unwrap();
        prop_assert_eq!(from_str, cidr_overlap(&a, &b));
    }

    /// Property: display output parses back to the same canonical block
    #[test]
    fn prop_display_is_canonical(a in any_block()) {
        let reparsed = CidrBlock::parse(a.to_string()).unwrap();
        prop_assert!(cidr_equals(&a, &reparsed));
    }
}
