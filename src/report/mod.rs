//! Report assembly and rendering.

mod generator;

pub use generator::render;

use crate::analysis::{
    AgentAggregate, Analysis, CompanyFlow, MigrationMatrix, PortfolioSummary, RecordFilter,
    YearBreakdowns,
};
use crate::config::ReportConfig;
use crate::models::{ReportMetadata, UnifiedPolicy};
use serde::{Deserialize, Serialize};

/// Complete reconciliation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: PortfolioSummary,
    pub migration: MigrationMatrix,
    pub agents: Vec<AgentAggregate>,
    pub company_flows: Vec<CompanyFlow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdowns: Option<YearBreakdowns>,
    /// Policies passing the record filter, capped at `max_records`.
    pub records: Vec<UnifiedPolicy>,
    /// Policies passing the record filter before the cap.
    pub records_matched: usize,
}

impl Report {
    /// Build a report from an analysis, applying the record filter and the
    /// listing settings. Aggregates always cover the full book.
    pub fn assemble(
        mut metadata: ReportMetadata,
        analysis: Analysis,
        filter: &RecordFilter,
        settings: &ReportConfig,
    ) -> Self {
        metadata.unified_policies = analysis.policies.len();
        metadata.record_filter = filter.describe();

        let matched: Vec<UnifiedPolicy> = if settings.include_records {
            filter.apply(&analysis.policies).into_iter().cloned().collect()
        } else {
            Vec::new()
        };
        let records_matched = matched.len();
        let records = if settings.max_records == 0 {
            matched
        } else {
            matched.into_iter().take(settings.max_records).collect()
        };

        Self {
            metadata,
            summary: analysis.summary,
            migration: analysis.migration,
            agents: analysis.agents,
            company_flows: analysis.company_flows,
            breakdowns: settings.include_breakdowns.then_some(analysis.breakdowns),
            records,
            records_matched,
        }
    }
}
