//! Portfolio-level aggregation and statistics.
//!
//! This module derives the headline totals, per-company flows and the
//! year-N+1 breakdowns from reconciled policies.

use crate::models::{percent, Lifecycle, LifecycleStatus, RenewalClass, Tally, UnifiedPolicy};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

/// Headline totals across both snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Year-N book.
    pub prior: Tally,
    /// Year-N+1 book.
    pub current: Tally,
    /// Renewed policies at year-N+1 values.
    pub renewed: Tally,
    /// Lapsed policies at year-N values.
    pub lapsed: Tally,
    /// New policies at year-N+1 values.
    pub new: Tally,
    /// Year-N+1 records tagged `Renewal`.
    pub tagged_renewal: usize,
    /// Year-N+1 records tagged `New`.
    pub tagged_new: usize,
    /// Year-N+1 records without a usable tag.
    pub untagged: usize,
    /// Records whose tag contradicts the identity match.
    pub tag_mismatches: usize,
}

impl PortfolioSummary {
    /// Creates a summary from reconciled policies.
    pub fn from_policies(policies: &[UnifiedPolicy]) -> Self {
        let mut summary = Self::default();

        for policy in policies {
            if let Some(prior) = policy.prior() {
                summary.prior.add(prior.members, prior.commission);
            }
            if let Some(current) = policy.current() {
                summary.current.add(current.members, current.commission);

                match policy.class {
                    Some(RenewalClass::Renewal) => summary.tagged_renewal += 1,
                    Some(RenewalClass::New) => summary.tagged_new += 1,
                    None => summary.untagged += 1,
                }
            }

            match policy.status() {
                LifecycleStatus::Renewed => {
                    summary
                        .renewed
                        .add(policy.current_members(), policy.current_commission());
                    if policy.class == Some(RenewalClass::New) {
                        summary.tag_mismatches += 1;
                    }
                }
                LifecycleStatus::Lapsed => {
                    summary
                        .lapsed
                        .add(policy.prior_members(), policy.prior_commission());
                }
                LifecycleStatus::New => {
                    summary
                        .new
                        .add(policy.current_members(), policy.current_commission());
                    if policy.class == Some(RenewalClass::Renewal) {
                        summary.tag_mismatches += 1;
                    }
                }
            }
        }

        summary
    }

    /// Renewed policies as a percentage of the year-N book.
    pub fn retention_rate(&self) -> u32 {
        percent(self.renewed.policies, self.prior.policies)
    }

    /// Lapsed policies as a percentage of the year-N book.
    pub fn lapse_rate(&self) -> u32 {
        percent(self.lapsed.policies, self.prior.policies)
    }

    /// Net member change between the two books.
    pub fn member_change(&self) -> i64 {
        self.current.members as i64 - self.prior.members as i64
    }
}

/// Year-over-year movement of one company's book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyFlow {
    pub company: String,
    pub prior_policies: usize,
    pub prior_members: u64,
    /// Policies renewed with the same company.
    pub retained: usize,
    /// Policies renewed with a different company.
    pub migrated_out: usize,
    /// Policies that did not renew.
    pub lapsed: usize,
    /// Policies arriving from a different company.
    pub migrated_in: usize,
    /// Policies with no year-N record.
    pub new_policies: usize,
    pub current_policies: usize,
    pub current_members: u64,
}

/// Roll reconciled policies up into one flow per company.
///
/// Companies are listed alphabetically; sentinels are not companies.
pub fn company_flows(policies: &[UnifiedPolicy]) -> Vec<CompanyFlow> {
    let mut flows: BTreeMap<&str, CompanyFlow> = BTreeMap::new();

    fn flow<'a, 'b>(
        flows: &'b mut BTreeMap<&'a str, CompanyFlow>,
        company: &'a str,
    ) -> &'b mut CompanyFlow {
        flows.entry(company).or_insert_with(|| CompanyFlow {
            company: company.to_string(),
            ..CompanyFlow::default()
        })
    }

    for policy in policies {
        match &policy.lifecycle {
            Lifecycle::Renewed { prior, current } => {
                let origin = flow(&mut flows, &prior.company);
                origin.prior_policies += 1;
                origin.prior_members += u64::from(prior.members);
                if prior.company == current.company {
                    origin.retained += 1;
                } else {
                    origin.migrated_out += 1;
                    flow(&mut flows, &current.company).migrated_in += 1;
                }

                let destination = flow(&mut flows, &current.company);
                destination.current_policies += 1;
                destination.current_members += u64::from(current.members);
            }
            Lifecycle::Lapsed { prior } => {
                let origin = flow(&mut flows, &prior.company);
                origin.prior_policies += 1;
                origin.prior_members += u64::from(prior.members);
                origin.lapsed += 1;
            }
            Lifecycle::New { current } => {
                let destination = flow(&mut flows, &current.company);
                destination.new_policies += 1;
                destination.current_policies += 1;
                destination.current_members += u64::from(current.members);
            }
        }
    }

    flows.into_values().collect()
}

/// One group of year-N+1 records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownRow {
    pub name: String,
    pub policies: usize,
    pub members: u64,
    /// Members on records tagged `Renewal` or untagged.
    pub renewal_members: u64,
    /// Members on records tagged `New`.
    pub new_members: u64,
}

/// Year-N+1 book grouped four ways.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearBreakdowns {
    pub by_agent: Vec<BreakdownRow>,
    pub by_company: Vec<BreakdownRow>,
    pub by_region: Vec<BreakdownRow>,
    pub by_license: Vec<BreakdownRow>,
}

/// Group the year-N+1 book by agent, company, region and license number.
///
/// Records without a region or license are left out of that grouping only.
pub fn year_breakdowns(policies: &[UnifiedPolicy]) -> YearBreakdowns {
    let current: Vec<&UnifiedPolicy> = policies.iter().filter(|p| p.current().is_some()).collect();

    YearBreakdowns {
        by_agent: group_rows(&current, |p| p.current_agent()),
        by_company: group_rows(&current, |p| p.current().map(|side| side.company.as_str())),
        by_region: group_rows(&current, |p| p.region.as_deref()),
        by_license: group_rows(&current, |p| p.license.as_deref()),
    }
}

fn group_rows<'a, F>(policies: &[&'a UnifiedPolicy], key: F) -> Vec<BreakdownRow>
where
    F: Fn(&'a UnifiedPolicy) -> Option<&'a str>,
{
    let mut rows: Vec<BreakdownRow> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for &policy in policies {
        let Some(name) = key(policy) else {
            continue;
        };
        let position = *index.entry(name).or_insert_with(|| {
            rows.push(BreakdownRow {
                name: name.to_string(),
                ..BreakdownRow::default()
            });
            rows.len() - 1
        });

        let members = u64::from(policy.current_members());
        let row = &mut rows[position];
        row.policies += 1;
        row.members += members;
        if policy.class == Some(RenewalClass::New) {
            row.new_members += members;
        } else {
            row.renewal_members += members;
        }
    }

    rows.sort_by_key(|row| Reverse(row.members));
    rows
}
