//! Record filtering for the policy listing.

use crate::models::{LifecycleStatus, UnifiedPolicy};

/// Selects reconciled policies for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub status: Option<LifecycleStatus>,
    /// Case-insensitive substring of identifier, first name or surname.
    pub search: Option<String>,
    /// Year-N companies (or `New Policy`) to keep; empty keeps all.
    pub companies: Vec<String>,
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.search.is_none() && self.companies.is_empty()
    }

    pub fn matches(&self, policy: &UnifiedPolicy) -> bool {
        if let Some(status) = self.status {
            if policy.status() != status {
                return false;
            }
        }

        if !self.companies.is_empty()
            && !self
                .companies
                .iter()
                .any(|company| company == policy.origin_company())
        {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                [&policy.id, &policy.first_name, &policy.last_name]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            }
            _ => true,
        }
    }

    pub fn apply<'a>(&self, policies: &'a [UnifiedPolicy]) -> Vec<&'a UnifiedPolicy> {
        policies.iter().filter(|p| self.matches(p)).collect()
    }

    /// Short description for report metadata, `None` when nothing is filtered.
    pub fn describe(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        if let Some(status) = self.status {
            parts.push(format!("status = {}", status));
        }
        if let Some(ref search) = self.search {
            parts.push(format!("search = \"{}\"", search));
        }
        if !self.companies.is_empty() {
            parts.push(format!("companies = {}", self.companies.join(", ")));
        }
        Some(parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{lapsed, new_policy, renewed};
    use crate::models::NEW_POLICY;

    fn sample() -> Vec<UnifiedPolicy> {
        let mut ana = renewed("BI-100", ("A", "X", 1, 0.0), ("A", "X", 1, 0.0));
        ana.first_name = "Ana".to_string();
        ana.last_name = "Gómez".to_string();

        let mut luis = lapsed("BI-200", ("A", "Y", 1, 0.0));
        luis.first_name = "Luis".to_string();
        luis.last_name = "Pérez".to_string();

        let mut eva = new_policy("BI-300", ("B", "Y", 1, 0.0));
        eva.first_name = "Eva".to_string();
        eva.last_name = "Anaya".to_string();

        vec![ana, luis, eva]
    }

    fn ids(policies: Vec<&UnifiedPolicy>) -> Vec<&str> {
        policies.into_iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let policies = sample();
        let filter = RecordFilter::default();

        assert!(filter.is_empty());
        assert_eq!(filter.apply(&policies).len(), 3);
        assert_eq!(filter.describe(), None);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let policies = sample();
        let filter = RecordFilter {
            search: Some("ANA".to_string()),
            ..RecordFilter::default()
        };

        assert_eq!(ids(filter.apply(&policies)), vec!["BI-100", "BI-300"]);

        let by_id = RecordFilter {
            search: Some("bi-2".to_string()),
            ..RecordFilter::default()
        };
        assert_eq!(ids(by_id.apply(&policies)), vec!["BI-200"]);
    }

    #[test]
    fn test_status_filter() {
        let policies = sample();
        let filter = RecordFilter {
            status: Some(LifecycleStatus::Lapsed),
            ..RecordFilter::default()
        };

        assert_eq!(ids(filter.apply(&policies)), vec!["BI-200"]);
    }

    #[test]
    fn test_company_filter_uses_origin_company() {
        let policies = sample();
        let filter = RecordFilter {
            companies: vec!["Y".to_string(), NEW_POLICY.to_string()],
            ..RecordFilter::default()
        };

        assert_eq!(ids(filter.apply(&policies)), vec!["BI-200", "BI-300"]);
    }

    #[test]
    fn test_describe() {
        let filter = RecordFilter {
            status: Some(LifecycleStatus::New),
            search: Some("eva".to_string()),
            companies: vec![],
        };

        assert_eq!(
            filter.describe().as_deref(),
            Some("status = New; search = \"eva\"")
        );
    }
}
