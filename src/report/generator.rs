//! Markdown report generation.
//!
//! This module renders reconciliation reports as Markdown for reading and as
//! JSON for downstream tooling.

use super::Report;
use crate::analysis::{BreakdownRow, MigrationMatrix, PortfolioSummary, YearBreakdowns};
use crate::cli::OutputFormat;
use crate::models::{percent, LifecycleStatus, ReportMetadata, Tally, UnifiedPolicy, NEW_POLICY};
use anyhow::Result;

/// Render the report in the requested format.
pub fn render(report: &Report, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(generate_markdown_report(report)),
        OutputFormat::Json => generate_json_report(report),
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# Policy Renewal Report {} → {}\n\n",
        report.metadata.prior_year, report.metadata.current_year
    ));

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_summary_section(&report.summary, &report.metadata));
    output.push_str(&generate_migration_section(&report.migration));
    output.push_str(&generate_company_section(report));
    output.push_str(&generate_agent_section(report));

    if let Some(ref breakdowns) = report.breakdowns {
        output.push_str(&generate_breakdown_section(
            breakdowns,
            report.metadata.current_year,
        ));
    }

    if report.records_matched > 0 || report.metadata.record_filter.is_some() {
        output.push_str(&generate_records_section(report));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **{} Snapshot:** {}\n",
        metadata.prior_year, metadata.prior_source
    ));
    section.push_str(&format!(
        "- **{} Snapshot:** {}\n",
        metadata.current_year, metadata.current_source
    ));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Unified Policies:** {}\n",
        metadata.unified_policies
    ));
    if let Some(ref filter) = metadata.record_filter {
        section.push_str(&format!("- **Record Filter:** {}\n", filter));
    }
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Summary](#summary)\n");
    toc.push_str("- [Company Migration](#company-migration)\n");
    toc.push_str("- [Company Flows](#company-flows)\n");
    toc.push_str("- [Agent Performance](#agent-performance)\n");
    if report.breakdowns.is_some() {
        toc.push_str("- [Renewal Year Breakdown](#renewal-year-breakdown)\n");
    }
    if report.records_matched > 0 || report.metadata.record_filter.is_some() {
        toc.push_str("- [Policies](#policies)\n");
    }
    toc.push('\n');

    toc
}

fn generate_summary_section(summary: &PortfolioSummary, metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| | Policies | Members | Commission |\n");
    section.push_str("|:---|:---:|:---:|---:|\n");

    let rows: [(String, &Tally); 5] = [
        (format!("**{} Book**", metadata.prior_year), &summary.prior),
        (format!("**{} Book**", metadata.current_year), &summary.current),
        (
            format!(
                "{} {}",
                LifecycleStatus::Renewed.emoji(),
                LifecycleStatus::Renewed
            ),
            &summary.renewed,
        ),
        (
            format!("{} {}", LifecycleStatus::Lapsed.emoji(), LifecycleStatus::Lapsed),
            &summary.lapsed,
        ),
        (
            format!("{} {}", LifecycleStatus::New.emoji(), LifecycleStatus::New),
            &summary.new,
        ),
    ];

    for (label, tally) in rows.iter() {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            label,
            tally.policies,
            tally.members,
            money(tally.commission)
        ));
    }
    section.push('\n');

    section.push_str(&format!(
        "- **Retention Rate:** {}%\n",
        summary.retention_rate()
    ));
    section.push_str(&format!("- **Lapse Rate:** {}%\n", summary.lapse_rate()));
    section.push_str(&format!(
        "- **Member Change:** {}\n",
        signed(summary.member_change())
    ));
    section.push_str(&format!(
        "- **Carrier Tags:** {} Renewal, {} New, {} untagged\n",
        summary.tagged_renewal, summary.tagged_new, summary.untagged
    ));
    if summary.tag_mismatches > 0 {
        section.push_str(&format!(
            "- ⚠️ **Tag Mismatches:** {} records tagged against their matched status\n",
            summary.tag_mismatches
        ));
    }
    section.push('\n');

    section
}

fn generate_migration_section(migration: &MigrationMatrix) -> String {
    let mut section = String::new();

    section.push_str("## Company Migration\n\n");

    if migration.edges.is_empty() && migration.inflows.is_empty() {
        section.push_str("No policies to migrate.\n\n");
        return section;
    }

    section.push_str(&format!(
        "*{} policies and {} members across all edges.*\n\n",
        migration.edges.iter().map(|edge| edge.policies).sum::<usize>(),
        migration.total_edge_members()
    ));

    for origin in migration.origins() {
        let edges: Vec<_> = migration.edges_from(origin).collect();
        let total: usize = edges.iter().map(|edge| edge.policies).sum();

        section.push_str(&format!("### From {} ({} policies)\n\n", cell(origin), total));
        section.push_str("| Destination | Policies | Share | Members |\n");
        section.push_str("|:---|:---:|:---:|:---:|\n");
        for edge in edges {
            section.push_str(&format!(
                "| {} | {} | {}% | {} |\n",
                cell(&edge.destination),
                edge.policies,
                percent(edge.policies, total),
                edge.members
            ));
        }
        section.push('\n');
    }

    if !migration.inflows.is_empty() {
        section.push_str(&format!("### {}\n\n", NEW_POLICY));
        section.push_str("| Destination | Policies | Members |\n");
        section.push_str("|:---|:---:|:---:|\n");
        for inflow in &migration.inflows {
            section.push_str(&format!(
                "| {} | {} | {} |\n",
                cell(&inflow.destination),
                inflow.policies,
                inflow.members
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_company_section(report: &Report) -> String {
    let mut section = String::new();

    section.push_str("## Company Flows\n\n");

    if report.company_flows.is_empty() {
        section.push_str("No companies in either snapshot.\n\n");
        return section;
    }

    section.push_str(&format!(
        "| Company | {} Policies | Retained | Moved Out | Lapsed | Moved In | New | {} Policies | Members {} → {} |\n",
        report.metadata.prior_year,
        report.metadata.current_year,
        report.metadata.prior_year,
        report.metadata.current_year
    ));
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");

    for flow in &report.company_flows {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} → {} |\n",
            cell(&flow.company),
            flow.prior_policies,
            flow.retained,
            flow.migrated_out,
            flow.lapsed,
            flow.migrated_in,
            flow.new_policies,
            flow.current_policies,
            flow.prior_members,
            flow.current_members
        ));
    }
    section.push('\n');

    section
}

fn generate_agent_section(report: &Report) -> String {
    let mut section = String::new();

    section.push_str("## Agent Performance\n\n");

    if report.agents.is_empty() {
        section.push_str("No agents in either snapshot.\n\n");
        return section;
    }

    section.push_str(&format!(
        "| Agent | {} Policies | {} Policies | Renewed | New | Lost | Retention | Loss | Members {} → {} | Commission {} |\n",
        report.metadata.prior_year,
        report.metadata.current_year,
        report.metadata.prior_year,
        report.metadata.current_year,
        report.metadata.current_year
    ));
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---:|:---:|:---:|---:|\n");

    for agent in &report.agents {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {}% | {}% | {} → {} | {} |\n",
            cell(&agent.agent),
            agent.prior.policies,
            agent.current.policies,
            agent.renewed.policies,
            agent.new.policies,
            agent.lost.policies,
            agent.retention_rate(),
            agent.loss_rate(),
            agent.prior.members,
            agent.current.members,
            money(agent.current.commission)
        ));
    }
    section.push('\n');

    section
}

fn generate_breakdown_section(breakdowns: &YearBreakdowns, year: u16) -> String {
    let mut section = String::new();

    section.push_str("## Renewal Year Breakdown\n\n");
    section.push_str(&format!("*{} book only.*\n\n", year));

    let groups: [(&str, &[BreakdownRow]); 4] = [
        ("Agent", &breakdowns.by_agent),
        ("Company", &breakdowns.by_company),
        ("Region", &breakdowns.by_region),
        ("License", &breakdowns.by_license),
    ];

    for (label, rows) in groups {
        if rows.is_empty() {
            continue;
        }

        section.push_str(&format!("### By {}\n\n", label));
        section.push_str(&format!(
            "| {} | Policies | Members | Renewal Members | New Members |\n",
            label
        ));
        section.push_str("|:---|:---:|:---:|:---:|:---:|\n");
        for row in rows {
            section.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                cell(&row.name),
                row.policies,
                row.members,
                row.renewal_members,
                row.new_members
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_records_section(report: &Report) -> String {
    let mut section = String::new();

    section.push_str("## Policies\n\n");

    if report.records.is_empty() {
        section.push_str("No policies match the filter.\n\n");
        return section;
    }

    if report.records.len() < report.records_matched {
        section.push_str(&format!(
            "*Showing {} of {} matching policies.*\n\n",
            report.records.len(),
            report.records_matched
        ));
    }

    section.push_str("| ID | Holder | Status | From | To | Agent | Members | Change |\n");
    section.push_str("|:---|:---|:---|:---|:---|:---|:---:|:---:|\n");

    for policy in &report.records {
        section.push_str(&generate_record_row(policy));
    }
    section.push('\n');

    section
}

fn generate_record_row(policy: &UnifiedPolicy) -> String {
    let status = policy.status();

    let agent = match (policy.prior_agent(), policy.current_agent()) {
        (Some(prior), Some(current)) if prior != current => {
            format!("{} → {}", cell(prior), cell(current))
        }
        (_, Some(agent)) | (Some(agent), None) => cell(agent),
        (None, None) => String::new(),
    };

    let members = match status {
        LifecycleStatus::Lapsed => policy.prior_members(),
        _ => policy.current_members(),
    };

    format!(
        "| `{}` | {} | {} {} | {} | {} | {} | {} | {} |\n",
        policy.id,
        cell(&policy.holder_name()),
        status.emoji(),
        status,
        cell(policy.origin_company()),
        cell(policy.destination_company()),
        agent,
        members,
        signed(policy.member_change())
    )
}

fn generate_footer() -> String {
    "---\n\n*Report generated by policy-reconcile*\n".to_string()
}

/// Escape a value for a Markdown table cell.
fn cell(value: &str) -> String {
    value.replace('|', "\\|")
}

fn money(amount: f64) -> String {
    format!("${:.2}", amount)
}

fn signed(change: i64) -> String {
    if change > 0 {
        format!("+{}", change)
    } else {
        change.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, RecordFilter};
    use crate::config::ReportConfig;
    use crate::models::{PolicyRecord, RenewalClass, RenewalRecord, DID_NOT_RENEW};
    use chrono::Utc;

    fn record(id: &str, agent: &str, company: &str, members: u32) -> PolicyRecord {
        PolicyRecord {
            id: Some(id.to_string()),
            agent: Some(agent.to_string()),
            first_name: Some("Ana".to_string()),
            last_name: Some(format!("Holder {}", id)),
            members: Some(members),
            company: Some(company.to_string()),
            commission: Some(100.0),
        }
    }

    fn renewal(id: &str, agent: &str, company: &str, members: u32) -> RenewalRecord {
        RenewalRecord {
            policy: record(id, agent, company, members),
            region: Some("FL".to_string()),
            license: None,
            class: Some(RenewalClass::Renewal),
        }
    }

    fn metadata() -> ReportMetadata {
        ReportMetadata {
            prior_source: "polizas-2025.json".to_string(),
            current_source: "https://example.com/polizas-2026.json".to_string(),
            prior_year: 2025,
            current_year: 2026,
            generated_at: Utc::now(),
            unified_policies: 0,
            record_filter: None,
            duration_seconds: 0.4,
        }
    }

    fn create_test_report(filter: &RecordFilter, settings: &ReportConfig) -> Report {
        let analysis = analyze(
            &[
                record("P1", "Maria", "Ambetter", 4),
                record("P2", "Maria", "Oscar", 2),
                record("P3", "Carlos", "Ambetter", 3),
            ],
            &[
                renewal("P1", "Maria", "Ambetter", 5),
                renewal("P2", "Laura", "Ambetter", 2),
                renewal("P4", "Laura", "Molina", 1),
            ],
        )
        .unwrap();

        Report::assemble(metadata(), analysis, filter, settings)
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report(&RecordFilter::default(), &ReportConfig::default());
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Policy Renewal Report 2025 → 2026"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("## Company Migration"));
        assert!(markdown.contains("### From Ambetter (2 policies)"));
        assert!(markdown.contains(&format!("| {} | 1 | 50% | 3 |", DID_NOT_RENEW)));
        assert!(markdown.contains("*3 policies and 10 members across all edges.*"));
        assert!(markdown.contains("### New Policy"));
        assert!(markdown.contains("## Agent Performance"));
        assert!(markdown.contains("## Renewal Year Breakdown"));
        assert!(markdown.contains("`P4`"));
        assert!(markdown.contains("Maria → Laura"));
    }

    #[test]
    fn test_summary_section() {
        let report = create_test_report(&RecordFilter::default(), &ReportConfig::default());
        let section = generate_summary_section(&report.summary, &report.metadata);

        assert!(section.contains("| **2025 Book** | 3 | 9 | $300.00 |"));
        assert!(section.contains("| **2026 Book** | 3 | 8 | $300.00 |"));
        assert!(section.contains("**Retention Rate:** 67%"));
        assert!(section.contains("**Member Change:** -1"));
        // P4 is carrier-tagged Renewal but has no 2025 record
        assert!(section.contains("**Tag Mismatches:** 1 records"));
    }

    #[test]
    fn test_filtered_and_capped_records() {
        let filter = RecordFilter {
            companies: vec!["Ambetter".to_string()],
            ..RecordFilter::default()
        };
        let settings = ReportConfig {
            max_records: 1,
            ..ReportConfig::default()
        };

        let report = create_test_report(&filter, &settings);

        assert_eq!(report.records_matched, 2);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.metadata.unified_policies, 4);
        assert_eq!(
            report.metadata.record_filter.as_deref(),
            Some("companies = Ambetter")
        );
        assert_eq!(report.summary.prior.policies, 3);

        let markdown = generate_markdown_report(&report);
        assert!(markdown.contains("*Showing 1 of 2 matching policies.*"));
        assert!(markdown.contains("**Record Filter:** companies = Ambetter"));
    }

    #[test]
    fn test_empty_filter_result_is_reported() {
        let filter = RecordFilter {
            search: Some("nobody".to_string()),
            ..RecordFilter::default()
        };

        let report = create_test_report(&filter, &ReportConfig::default());
        let markdown = generate_markdown_report(&report);

        assert!(report.records.is_empty());
        assert!(markdown.contains("No policies match the filter."));
    }

    #[test]
    fn test_sections_can_be_disabled() {
        let settings = ReportConfig {
            include_records: false,
            include_breakdowns: false,
            max_records: 0,
        };

        let report = create_test_report(&RecordFilter::default(), &settings);
        let markdown = generate_markdown_report(&report);

        assert!(report.breakdowns.is_none());
        assert!(!markdown.contains("## Renewal Year Breakdown"));
        assert!(!markdown.contains("## Policies"));
    }

    #[test]
    fn test_record_row_for_lapsed_policy() {
        let report = create_test_report(&RecordFilter::default(), &ReportConfig::default());
        let lapsed = report
            .records
            .iter()
            .find(|p| p.id == "P3")
            .unwrap();

        let row = generate_record_row(lapsed);

        assert!(row.contains("🔴 Lapsed"));
        assert!(row.contains("| Ambetter | Did Not Renew | Carlos | 3 | 0 |"));
    }

    #[test]
    fn test_cell_escaping() {
        assert_eq!(cell("A|B"), "A\\|B");
        assert_eq!(signed(3), "+3");
        assert_eq!(signed(-2), "-2");
        assert_eq!(money(1050.5), "$1050.50");
    }

    #[test]
    fn test_render_json() {
        let report = create_test_report(&RecordFilter::default(), &ReportConfig::default());
        let json = render(&report, OutputFormat::Json).unwrap();

        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"migration\""));
        assert!(json.contains("\"inflows\""));
        assert!(json.contains("\"status\": \"Renewed\""));
    }
}
