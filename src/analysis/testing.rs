//! Builders for reconciled policies used across analysis tests.

use crate::models::{Lifecycle, PolicySide, UnifiedPolicy};

/// (agent, company, members, commission)
pub type Side<'a> = (&'a str, &'a str, u32, f64);

fn side((agent, company, members, commission): Side<'_>) -> PolicySide {
    PolicySide {
        agent: agent.to_string(),
        company: company.to_string(),
        members,
        commission,
    }
}

fn policy(id: &str, lifecycle: Lifecycle) -> UnifiedPolicy {
    UnifiedPolicy {
        id: id.to_string(),
        first_name: "Holder".to_string(),
        last_name: id.to_string(),
        region: None,
        license: None,
        class: None,
        lifecycle,
    }
}

pub fn renewed(id: &str, prior: Side<'_>, current: Side<'_>) -> UnifiedPolicy {
    policy(
        id,
        Lifecycle::Renewed {
            prior: side(prior),
            current: side(current),
        },
    )
}

pub fn lapsed(id: &str, prior: Side<'_>) -> UnifiedPolicy {
    policy(id, Lifecycle::Lapsed { prior: side(prior) })
}

pub fn new_policy(id: &str, current: Side<'_>) -> UnifiedPolicy {
    policy(
        id,
        Lifecycle::New {
            current: side(current),
        },
    )
}
