//! Company-to-company migration matrix.

use crate::models::{Lifecycle, UnifiedPolicy, DID_NOT_RENEW};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Aggregated flow of policies from a year-N company to a year-N+1 company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationEdge {
    pub origin: String,
    /// Year-N+1 company, or [`DID_NOT_RENEW`].
    pub destination: String,
    pub policies: usize,
    pub members: u64,
}

/// New policies arriving at a year-N+1 company with no year-N origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyInflow {
    pub destination: String,
    pub policies: usize,
    pub members: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationMatrix {
    /// Edges sorted by origin, `Did Not Renew` first within an origin.
    pub edges: Vec<MigrationEdge>,
    /// Inflows sorted by destination.
    pub inflows: Vec<PolicyInflow>,
}

impl MigrationMatrix {
    /// Edges leaving the given origin company.
    pub fn edges_from<'a>(&'a self, origin: &'a str) -> impl Iterator<Item = &'a MigrationEdge> {
        self.edges.iter().filter(move |edge| edge.origin == origin)
    }

    /// Distinct origin companies in sorted order.
    pub fn origins(&self) -> Vec<&str> {
        let mut origins: Vec<&str> = self.edges.iter().map(|e| e.origin.as_str()).collect();
        origins.dedup();
        origins
    }

    pub fn total_edge_members(&self) -> u64 {
        self.edges.iter().map(|edge| edge.members).sum()
    }
}

/// Group reconciled policies by (origin company, destination company).
///
/// Renewed policies contribute their year-N+1 members, lapsed policies their
/// year-N members. New policies have no origin and are counted as inflows.
pub fn build_migration_matrix(policies: &[UnifiedPolicy]) -> MigrationMatrix {
    let mut edges: HashMap<(String, String), MigrationEdge> = HashMap::new();
    let mut inflows: HashMap<String, PolicyInflow> = HashMap::new();

    for policy in policies {
        let (origin, destination, members) = match &policy.lifecycle {
            Lifecycle::Renewed { prior, current } => {
                (&prior.company, current.company.as_str(), current.members)
            }
            Lifecycle::Lapsed { prior } => (&prior.company, DID_NOT_RENEW, prior.members),
            Lifecycle::New { current } => {
                let inflow = inflows
                    .entry(current.company.clone())
                    .or_insert_with(|| PolicyInflow {
                        destination: current.company.clone(),
                        policies: 0,
                        members: 0,
                    });
                inflow.policies += 1;
                inflow.members += u64::from(current.members);
                continue;
            }
        };

        let edge = edges
            .entry((origin.clone(), destination.to_string()))
            .or_insert_with(|| MigrationEdge {
                origin: origin.clone(),
                destination: destination.to_string(),
                policies: 0,
                members: 0,
            });
        edge.policies += 1;
        edge.members += u64::from(members);
    }

    let mut edges: Vec<MigrationEdge> = edges.into_values().collect();
    edges.sort_by(compare_edges);

    let mut inflows: Vec<PolicyInflow> = inflows.into_values().collect();
    inflows.sort_by(|a, b| a.destination.cmp(&b.destination));

    MigrationMatrix { edges, inflows }
}

fn compare_edges(a: &MigrationEdge, b: &MigrationEdge) -> Ordering {
    a.origin.cmp(&b.origin).then_with(|| {
        match (a.destination == DID_NOT_RENEW, b.destination == DID_NOT_RENEW) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a.destination.cmp(&b.destination),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{lapsed, new_policy, renewed};
    use crate::models::LifecycleStatus;
    use proptest::prelude::*;

    #[test]
    fn test_reference_scenario_has_single_edge() {
        let policies = vec![
            renewed("P1", ("A", "X", 5, 100.0), ("A", "X", 6, 110.0)),
            new_policy("P2", ("B", "Y", 2, 20.0)),
        ];

        let matrix = build_migration_matrix(&policies);

        assert_eq!(
            matrix.edges,
            vec![MigrationEdge {
                origin: "X".to_string(),
                destination: "X".to_string(),
                policies: 1,
                members: 6,
            }]
        );
        assert_eq!(
            matrix.inflows,
            vec![PolicyInflow {
                destination: "Y".to_string(),
                policies: 1,
                members: 2,
            }]
        );
    }

    #[test]
    fn test_lapsed_policy_flows_to_did_not_renew() {
        let policies = vec![lapsed("P1", ("A", "X", 4, 50.0))];

        let matrix = build_migration_matrix(&policies);

        assert_eq!(matrix.edges.len(), 1);
        assert_eq!(matrix.edges[0].origin, "X");
        assert_eq!(matrix.edges[0].destination, DID_NOT_RENEW);
        assert_eq!(matrix.edges[0].policies, 1);
        assert_eq!(matrix.edges[0].members, 4);
    }

    #[test]
    fn test_edges_accumulate_per_key() {
        let policies = vec![
            renewed("P1", ("A", "X", 1, 0.0), ("A", "Y", 2, 0.0)),
            renewed("P2", ("B", "X", 3, 0.0), ("C", "Y", 4, 0.0)),
            renewed("P3", ("B", "X", 3, 0.0), ("C", "X", 1, 0.0)),
        ];

        let matrix = build_migration_matrix(&policies);

        let to_y = matrix.edges.iter().find(|e| e.destination == "Y").unwrap();
        assert_eq!(to_y.policies, 2);
        assert_eq!(to_y.members, 6);
        assert_eq!(matrix.origins(), vec!["X"]);
        assert_eq!(matrix.edges_from("X").count(), 2);
    }

    #[test]
    fn test_sort_order_puts_did_not_renew_first() {
        let policies = vec![
            renewed("P1", ("A", "Beta", 1, 0.0), ("A", "Zeta", 1, 0.0)),
            renewed("P2", ("A", "Beta", 1, 0.0), ("A", "Alpha", 1, 0.0)),
            lapsed("P3", ("A", "Beta", 1, 0.0)),
            lapsed("P4", ("A", "Alpha", 1, 0.0)),
            renewed("P5", ("A", "Alpha", 1, 0.0), ("A", "Beta", 1, 0.0)),
        ];

        let matrix = build_migration_matrix(&policies);
        let keys: Vec<(&str, &str)> = matrix
            .edges
            .iter()
            .map(|e| (e.origin.as_str(), e.destination.as_str()))
            .collect();

        assert_eq!(
            keys,
            vec![
                ("Alpha", DID_NOT_RENEW),
                ("Alpha", "Beta"),
                ("Beta", DID_NOT_RENEW),
                ("Beta", "Alpha"),
                ("Beta", "Zeta"),
            ]
        );
    }

    #[test]
    fn test_empty_input_builds_empty_matrix() {
        let matrix = build_migration_matrix(&[]);
        assert!(matrix.edges.is_empty());
        assert!(matrix.inflows.is_empty());
        assert_eq!(matrix.total_edge_members(), 0);
    }

    fn arb_policies() -> impl Strategy<Value = Vec<UnifiedPolicy>> {
        let company = prop::sample::select(vec!["X", "Y", "Z"]);
        let agent = prop::sample::select(vec!["A", "B"]);
        prop::collection::vec(
            (0u8..3, company.clone(), company, agent, 0u32..12, 0u32..12),
            0..40,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (kind, from, to, agent, m1, m2))| {
                    let id = format!("P{}", i);
                    match kind {
                        0 => renewed(&id, (agent, from, m1, 1.0), (agent, to, m2, 1.0)),
                        1 => lapsed(&id, (agent, from, m1, 1.0)),
                        _ => new_policy(&id, (agent, to, m2, 1.0)),
                    }
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_origin_policy_counts_match_prior_records(policies in arb_policies()) {
            let matrix = build_migration_matrix(&policies);

            for origin in ["X", "Y", "Z"] {
                let edge_count: usize = matrix.edges_from(origin).map(|e| e.policies).sum();
                let prior_count = policies
                    .iter()
                    .filter(|p| p.prior().map(|side| side.company.as_str()) == Some(origin))
                    .count();
                prop_assert_eq!(edge_count, prior_count);
            }
        }

        #[test]
        fn prop_edge_members_reconcile_with_renewed_and_lapsed_totals(policies in arb_policies()) {
            let matrix = build_migration_matrix(&policies);

            let renewed_members: u64 = policies
                .iter()
                .filter(|p| p.status() == LifecycleStatus::Renewed)
                .map(|p| u64::from(p.current_members()))
                .sum();
            let lapsed_members: u64 = policies
                .iter()
                .filter(|p| p.status() == LifecycleStatus::Lapsed)
                .map(|p| u64::from(p.prior_members()))
                .sum();

            prop_assert_eq!(matrix.total_edge_members(), renewed_members + lapsed_members);
        }
    }
}
