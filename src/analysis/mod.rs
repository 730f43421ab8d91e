//! Reconciliation and aggregation engine.
//!
//! `analyze` runs the whole pipeline over the two snapshots: reconciliation
//! first, then every derived view over the reconciled policies.

pub mod agents;
pub mod aggregator;
pub mod filter;
pub mod migration;
pub mod reconcile;

#[cfg(test)]
pub(crate) mod testing;

pub use agents::{aggregate_agents, AgentAggregate};
pub use aggregator::*;
pub use filter::RecordFilter;
pub use migration::{build_migration_matrix, MigrationEdge, MigrationMatrix};
pub use reconcile::reconcile;

use crate::error::ReconcileError;
use crate::models::{PolicyRecord, RenewalRecord, UnifiedPolicy};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Every structure derived from one pair of snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub policies: Vec<UnifiedPolicy>,
    pub migration: MigrationMatrix,
    pub agents: Vec<AgentAggregate>,
    pub summary: PortfolioSummary,
    pub company_flows: Vec<CompanyFlow>,
    pub breakdowns: YearBreakdowns,
}

/// Reconcile both snapshots and derive all views.
pub fn analyze(
    prior: &[PolicyRecord],
    current: &[RenewalRecord],
) -> Result<Analysis, ReconcileError> {
    let policies = reconcile(prior, current)?;

    let analysis = Analysis {
        migration: build_migration_matrix(&policies),
        agents: aggregate_agents(&policies),
        summary: PortfolioSummary::from_policies(&policies),
        company_flows: company_flows(&policies),
        breakdowns: year_breakdowns(&policies),
        policies,
    };

    info!(
        "Analyzed {} policies: {} renewed, {} lapsed, {} new",
        analysis.policies.len(),
        analysis.summary.renewed.policies,
        analysis.summary.lapsed.policies,
        analysis.summary.new.policies
    );

    Ok(analysis)
}
