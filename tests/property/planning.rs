// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Association Planning
//!
//! Applying a plan to a network's live associations must leave exactly the
//! primary block plus the desired secondary blocks, and planning again must
//! produce an empty plan.

use cim_network_convergence::domain::{
    cidr_equals, plan_associations, CidrBlock, CidrBlockAssociation, NetworkRecord, Tags,
};
use cim_network_convergence::state_machine::{CidrBlockState, ResourceState};
use proptest::prelude::*;
use std::collections::BTreeSet;

const PRIMARY: &str = "10.0.0.0/16";

/// Pairwise disjoint candidate blocks: 10.1.0.0/16 through 10.16.0.0/16
fn candidate(index: u8) -> CidrBlock {
    CidrBlock::parse(format!("10.{}.0.0/16", index + 1)).unwrap()
}

fn network_with(live: &BTreeSet<u8>) -> NetworkRecord {
    let mut associations = vec![CidrBlockAssociation {
        id: "assoc-primary".to_string(),
        block: PRIMARY.to_string(),
        state: CidrBlockState::Associated,
        status_message: None,
    }];
    associations.extend(live.iter().map(|i| CidrBlockAssociation {
        id: format!("assoc-{i}"),
        block: candidate(*i).to_string(),
        state: CidrBlockState::Associated,
        status_message: None,
    }));
    NetworkRecord {
        id: "vpc-prop".to_string(),
        name: "prop".to_string(),
        primary_cidr: PRIMARY.to_string(),
        state: ResourceState::Available,
        associations,
        dhcp_options_id: None,
        tags: Tags::new(),
    }
}

fn index_set() -> impl Strategy<Value = BTreeSet<u8>> {
    prop::collection::btree_set(0u8..16, 0..8)
}

proptest! {
    /// Property: applying the plan yields the desired set, and replanning is a no-op
    #[test]
    fn prop_plan_converges(live in index_set(), desired in index_set()) {
        let primary = CidrBlock::parse(PRIMARY).unwrap();
        let network = network_with(&live);
        let desired_blocks: Vec<CidrBlock> = desired.iter().map(|i| candidate(*i)).collect();

        let plan = plan_associations(&network, &primary, &desired_blocks).unwrap();

        prop_assert!(plan.removals.iter().all(|a| a.block != PRIMARY));
        prop_assert_eq!(plan.removals.len(), live.difference(&desired).count());
        prop_assert_eq!(plan.additions.len(), desired.difference(&live).count());

        let mut converged = network.clone();
        for removal in &plan.removals {
            if let Some(a) = converged.associations.iter_mut().find(|a| a.id == removal.id) {
                a.state = CidrBlockState::Disassociated;
            }
        }
        for (n, block) in plan.additions.iter().enumerate() {
            converged.associations.push(CidrBlockAssociation {
                id: format!("assoc-new-{n}"),
                block: block.to_string(),
                state: CidrBlockState::Associated,
                status_message: None,
            });
        }

        let mut live_after: Vec<CidrBlock> = converged
            .live_associations()
            .map(|a| CidrBlock::parse(&a.block).unwrap())
            .filter(|b| !cidr_equals(b, &primary))
            .collect();
        live_after.sort_by_key(|b| b.to_string());
        let mut expected = desired_blocks.clone();
        expected.sort_by_key(|b| b.to_string());
        prop_assert_eq!(live_after, expected);

        let replan = plan_associations(&converged, &primary, &desired_blocks).unwrap();
        prop_assert!(replan.is_empty());
    }
}
