//! Reconciliation of the two annual snapshots.
//!
//! Joins year-N and year-N+1 records by policy identifier and tags every
//! policy with exactly one lifecycle status.

use crate::error::ReconcileError;
use crate::models::{
    Lifecycle, PolicyRecord, PolicySide, RenewalClass, RenewalRecord, SnapshotYear, UnifiedPolicy,
    DID_NOT_RENEW, NEW_POLICY,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A record whose required fields have been checked.
struct ValidRecord {
    id: String,
    first_name: String,
    last_name: String,
    side: PolicySide,
}

/// A year-N+1 record whose required fields have been checked.
struct ValidRenewal {
    record: ValidRecord,
    region: Option<String>,
    license: Option<String>,
    class: Option<RenewalClass>,
}

/// Reconcile the year-N snapshot against the year-N+1 snapshot.
///
/// Output holds matched and lapsed policies in year-N order, followed by new
/// policies in year-N+1 order.
pub fn reconcile(
    prior: &[PolicyRecord],
    current: &[RenewalRecord],
) -> Result<Vec<UnifiedPolicy>, ReconcileError> {
    let prior = prior
        .iter()
        .enumerate()
        .map(|(position, record)| validate(record, SnapshotYear::Prior, position))
        .collect::<Result<Vec<_>, _>>()?;

    let current = current
        .iter()
        .enumerate()
        .map(|(position, record)| {
            Ok(ValidRenewal {
                record: validate(&record.policy, SnapshotYear::Current, position)?,
                region: optional_text(&record.region),
                license: optional_text(&record.license),
                class: record.class,
            })
        })
        .collect::<Result<Vec<_>, ReconcileError>>()?;

    ensure_unique(prior.iter(), SnapshotYear::Prior)?;
    ensure_unique(current.iter().map(|r| &r.record), SnapshotYear::Current)?;

    let renewals: HashMap<&str, &ValidRenewal> = current
        .iter()
        .map(|renewal| (renewal.record.id.as_str(), renewal))
        .collect();
    let prior_ids: HashSet<&str> = prior.iter().map(|record| record.id.as_str()).collect();

    let mut unified = Vec::with_capacity(prior.len() + current.len());

    for record in &prior {
        let policy = match renewals.get(record.id.as_str()) {
            Some(renewal) => {
                if renewal.record.side.agent != record.side.agent {
                    debug!(
                        "Policy {} reassigned from {} to {}",
                        record.id, record.side.agent, renewal.record.side.agent
                    );
                }
                UnifiedPolicy {
                    id: record.id.clone(),
                    first_name: record.first_name.clone(),
                    last_name: record.last_name.clone(),
                    region: renewal.region.clone(),
                    license: renewal.license.clone(),
                    class: renewal.class,
                    lifecycle: Lifecycle::Renewed {
                        prior: record.side.clone(),
                        current: renewal.record.side.clone(),
                    },
                }
            }
            None => UnifiedPolicy {
                id: record.id.clone(),
                first_name: record.first_name.clone(),
                last_name: record.last_name.clone(),
                region: None,
                license: None,
                class: None,
                lifecycle: Lifecycle::Lapsed {
                    prior: record.side.clone(),
                },
            },
        };
        unified.push(policy);
    }

    for renewal in current
        .iter()
        .filter(|renewal| !prior_ids.contains(renewal.record.id.as_str()))
    {
        unified.push(UnifiedPolicy {
            id: renewal.record.id.clone(),
            first_name: renewal.record.first_name.clone(),
            last_name: renewal.record.last_name.clone(),
            region: renewal.region.clone(),
            license: renewal.license.clone(),
            class: renewal.class,
            lifecycle: Lifecycle::New {
                current: renewal.record.side.clone(),
            },
        });
    }

    debug!(
        "Reconciled {} prior and {} current records into {} policies",
        prior.len(),
        current.len(),
        unified.len()
    );

    Ok(unified)
}

/// Check required fields. Commission and holder names may be absent.
fn validate(
    record: &PolicyRecord,
    year: SnapshotYear,
    position: usize,
) -> Result<ValidRecord, ReconcileError> {
    let id = required_text(&record.id).ok_or_else(|| ReconcileError::MissingField {
        year,
        id: format!("#{}", position + 1),
        field: "id",
    })?;

    let missing = |field: &'static str| ReconcileError::MissingField {
        year,
        id: id.to_string(),
        field,
    };

    let agent = required_text(&record.agent).ok_or_else(|| missing("agent"))?;
    let company = required_text(&record.company).ok_or_else(|| missing("company"))?;
    let members = record.members.ok_or_else(|| missing("members"))?;

    // Sentinel names are reserved for the absent side of a policy
    if company == DID_NOT_RENEW || company == NEW_POLICY {
        return Err(ReconcileError::ReservedCompany {
            year,
            id: id.to_string(),
            company: company.to_string(),
        });
    }

    Ok(ValidRecord {
        id: id.to_string(),
        first_name: optional_text(&record.first_name).unwrap_or_default(),
        last_name: optional_text(&record.last_name).unwrap_or_default(),
        side: PolicySide {
            agent: agent.to_string(),
            company: company.to_string(),
            members,
            commission: record.commission.unwrap_or(0.0),
        },
    })
}

fn ensure_unique<'a>(
    records: impl Iterator<Item = &'a ValidRecord>,
    year: SnapshotYear,
) -> Result<(), ReconcileError> {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.id.as_str()) {
            return Err(ReconcileError::DuplicateIdentifier {
                year,
                id: record.id.clone(),
            });
        }
    }
    Ok(())
}

/// Trimmed, non-blank text.
fn required_text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn optional_text(value: &Option<String>) -> Option<String> {
    required_text(value).map(String::from)
}
