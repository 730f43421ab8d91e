//! Data models for policy reconciliation.
//!
//! This module contains the canonical snapshot records handed over by the
//! loader, the reconciled per-policy view, and the report envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Destination company of a policy that has no year-N+1 record.
pub const DID_NOT_RENEW: &str = "Did Not Renew";

/// Origin company of a policy that has no year-N record.
pub const NEW_POLICY: &str = "New Policy";

/// Which of the two snapshots a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotYear {
    /// Year N, the baseline.
    Prior,
    /// Year N+1, the renewal year.
    Current,
}

impl fmt::Display for SnapshotYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotYear::Prior => write!(f, "prior-year"),
            SnapshotYear::Current => write!(f, "current-year"),
        }
    }
}

/// Renewal classifier carried on year-N+1 records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenewalClass {
    New,
    Renewal,
}

impl RenewalClass {
    /// Parse the raw tag. Unknown values yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "new" => Some(RenewalClass::New),
            "renewal" | "ren" => Some(RenewalClass::Renewal),
            _ => None,
        }
    }
}

impl fmt::Display for RenewalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenewalClass::New => write!(f, "New"),
            RenewalClass::Renewal => write!(f, "Renewal"),
        }
    }
}

/// Lifecycle outcome of a policy between the two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleStatus {
    Renewed,
    Lapsed,
    New,
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleStatus::Renewed => write!(f, "Renewed"),
            LifecycleStatus::Lapsed => write!(f, "Lapsed"),
            LifecycleStatus::New => write!(f, "New"),
        }
    }
}

impl LifecycleStatus {
    /// Returns an emoji representation of the status.
    pub fn emoji(&self) -> &'static str {
        match self {
            LifecycleStatus::Renewed => "🟢",
            LifecycleStatus::Lapsed => "🔴",
            LifecycleStatus::New => "🔵",
        }
    }
}

/// A year-N record in the canonical schema.
///
/// Every field is optional as delivered by the loader; the reconciliation
/// engine decides which absences are fatal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    /// Unique policy identifier.
    pub id: Option<String>,
    /// Agent of record.
    pub agent: Option<String>,
    /// Primary holder first name(s).
    pub first_name: Option<String>,
    /// Primary holder surname(s).
    pub last_name: Option<String>,
    /// Number of covered members.
    pub members: Option<u32>,
    /// Carrier company.
    pub company: Option<String>,
    /// Estimated commission.
    pub commission: Option<f64>,
}

/// A year-N+1 record in the canonical schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenewalRecord {
    #[serde(flatten)]
    pub policy: PolicyRecord,
    /// Region or state of residence.
    pub region: Option<String>,
    /// Agent license number.
    pub license: Option<String>,
    /// `New` / `Renewal` tag as recorded by the carrier.
    pub class: Option<RenewalClass>,
}

/// One year's side of a reconciled policy, taken from a real record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySide {
    pub agent: String,
    pub company: String,
    pub members: u32,
    pub commission: f64,
}

/// Lifecycle of a policy together with the sides that actually exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Lifecycle {
    Renewed {
        prior: PolicySide,
        current: PolicySide,
    },
    Lapsed {
        prior: PolicySide,
    },
    New {
        current: PolicySide,
    },
}

/// Reconciled view of a single policy across both snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedPolicy {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<RenewalClass>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl UnifiedPolicy {
    pub fn status(&self) -> LifecycleStatus {
        match self.lifecycle {
            Lifecycle::Renewed { .. } => LifecycleStatus::Renewed,
            Lifecycle::Lapsed { .. } => LifecycleStatus::Lapsed,
            Lifecycle::New { .. } => LifecycleStatus::New,
        }
    }

    /// The year-N side, absent for new policies.
    pub fn prior(&self) -> Option<&PolicySide> {
        match &self.lifecycle {
            Lifecycle::Renewed { prior, .. } | Lifecycle::Lapsed { prior } => Some(prior),
            Lifecycle::New { .. } => None,
        }
    }

    /// The year-N+1 side, absent for lapsed policies.
    pub fn current(&self) -> Option<&PolicySide> {
        match &self.lifecycle {
            Lifecycle::Renewed { current, .. } | Lifecycle::New { current } => Some(current),
            Lifecycle::Lapsed { .. } => None,
        }
    }

    pub fn prior_agent(&self) -> Option<&str> {
        self.prior().map(|side| side.agent.as_str())
    }

    pub fn current_agent(&self) -> Option<&str> {
        self.current().map(|side| side.agent.as_str())
    }

    /// Year-N company, or [`NEW_POLICY`].
    pub fn origin_company(&self) -> &str {
        self.prior().map_or(NEW_POLICY, |side| side.company.as_str())
    }

    /// Year-N+1 company, or [`DID_NOT_RENEW`].
    pub fn destination_company(&self) -> &str {
        self.current()
            .map_or(DID_NOT_RENEW, |side| side.company.as_str())
    }

    pub fn prior_members(&self) -> u32 {
        self.prior().map_or(0, |side| side.members)
    }

    pub fn current_members(&self) -> u32 {
        self.current().map_or(0, |side| side.members)
    }

    pub fn prior_commission(&self) -> f64 {
        self.prior().map_or(0.0, |side| side.commission)
    }

    pub fn current_commission(&self) -> f64 {
        self.current().map_or(0.0, |side| side.commission)
    }

    /// Change in covered members between the years. Lapsed policies report 0.
    pub fn member_change(&self) -> i64 {
        match &self.lifecycle {
            Lifecycle::Renewed { prior, current } => {
                i64::from(current.members) - i64::from(prior.members)
            }
            Lifecycle::Lapsed { .. } => 0,
            Lifecycle::New { current } => i64::from(current.members),
        }
    }

    /// Holder display name.
    pub fn holder_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Policy count, member count and commission accumulated together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub policies: usize,
    pub members: u64,
    pub commission: f64,
}

impl Tally {
    /// Count one more policy.
    pub fn add(&mut self, members: u32, commission: f64) {
        self.policies += 1;
        self.members += u64::from(members);
        self.commission += commission;
    }
}

/// Rounded percentage of `part` over `whole`, 0 when `whole` is 0.
pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

/// Metadata about the reconciliation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Where the year-N snapshot came from.
    pub prior_source: String,
    /// Where the year-N+1 snapshot came from.
    pub current_source: String,
    /// Calendar year of the baseline snapshot.
    pub prior_year: u16,
    /// Calendar year of the renewal snapshot.
    pub current_year: u16,
    /// Date and time of the run.
    pub generated_at: DateTime<Utc>,
    /// Number of reconciled policies.
    pub unified_policies: usize,
    /// Human-readable description of the record filter, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_filter: Option<String>,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn side(agent: &str, company: &str, members: u32, commission: f64) -> PolicySide {
        PolicySide {
            agent: agent.to_string(),
            company: company.to_string(),
            members,
            commission,
        }
    }

    fn policy(lifecycle: Lifecycle) -> UnifiedPolicy {
        UnifiedPolicy {
            id: "P1".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Ruiz".to_string(),
            region: None,
            license: None,
            class: None,
            lifecycle,
        }
    }

    #[test]
    fn test_renewal_class_parse() {
        assert_eq!(RenewalClass::parse("New"), Some(RenewalClass::New));
        assert_eq!(RenewalClass::parse(" renewal "), Some(RenewalClass::Renewal));
        assert_eq!(RenewalClass::parse("REN"), Some(RenewalClass::Renewal));
        assert_eq!(RenewalClass::parse("maybe"), None);
    }

    #[test]
    fn test_lapsed_sentinels() {
        let lapsed = policy(Lifecycle::Lapsed {
            prior: side("A", "X", 4, 80.0),
        });

        assert_eq!(lapsed.status(), LifecycleStatus::Lapsed);
        assert_eq!(lapsed.origin_company(), "X");
        assert_eq!(lapsed.destination_company(), DID_NOT_RENEW);
        assert_eq!(lapsed.current_members(), 0);
        assert_eq!(lapsed.current_commission(), 0.0);
        assert_eq!(lapsed.current_agent(), None);
        assert_eq!(lapsed.member_change(), 0);
    }

    #[test]
    fn test_new_sentinels() {
        let new = policy(Lifecycle::New {
            current: side("B", "Y", 2, 20.0),
        });

        assert_eq!(new.status(), LifecycleStatus::New);
        assert_eq!(new.origin_company(), NEW_POLICY);
        assert_eq!(new.prior_members(), 0);
        assert_eq!(new.prior_agent(), None);
        assert_eq!(new.destination_company(), "Y");
        assert_eq!(new.member_change(), 2);
    }

    #[test]
    fn test_renewed_member_change() {
        let renewed = policy(Lifecycle::Renewed {
            prior: side("A", "X", 5, 100.0),
            current: side("C", "X", 3, 60.0),
        });

        assert_eq!(renewed.prior_agent(), Some("A"));
        assert_eq!(renewed.current_agent(), Some("C"));
        assert_eq!(renewed.member_change(), -2);
        assert_eq!(renewed.holder_name(), "Ana Ruiz");
    }

    #[test]
    fn test_unified_policy_json_carries_status() {
        let renewed = policy(Lifecycle::Lapsed {
            prior: side("A", "X", 1, 10.0),
        });
        let json = serde_json::to_string(&renewed).unwrap();
        assert!(json.contains("\"status\":\"Lapsed\""));
        assert!(json.contains("\"prior\""));
    }

    #[test]
    fn test_tally_and_percent() {
        let mut tally = Tally::default();
        tally.add(3, 10.5);
        tally.add(2, 4.5);
        assert_eq!(tally.policies, 2);
        assert_eq!(tally.members, 5);
        assert_eq!(tally.commission, 15.0);

        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(5, 0), 0);
    }
}
