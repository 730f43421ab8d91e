//! Per-agent performance statistics.
//!
//! The agent of record may change on renewal, so year-N figures go to the
//! year-N agent and year-N+1 figures to the year-N+1 agent, even on the same
//! policy.

use crate::models::{percent, Lifecycle, Tally, UnifiedPolicy};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Performance figures for one agent identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentAggregate {
    pub agent: String,
    /// Year-N book of business.
    pub prior: Tally,
    /// Year-N+1 book of business (renewed + new).
    pub current: Tally,
    /// Year-N+1 policies renewed from year N.
    pub renewed: Tally,
    /// Year-N+1 policies with no year-N record.
    pub new: Tally,
    /// Year-N policies that did not renew, at year-N values.
    pub lost: Tally,
}

impl AgentAggregate {
    fn named(agent: &str) -> Self {
        Self {
            agent: agent.to_string(),
            ..Self::default()
        }
    }

    /// Renewed policies as a percentage of the year-N book.
    pub fn retention_rate(&self) -> u32 {
        percent(self.renewed.policies, self.prior.policies)
    }

    /// Lost policies as a percentage of the year-N book.
    pub fn loss_rate(&self) -> u32 {
        percent(self.lost.policies, self.prior.policies)
    }

    /// Number of policies landing in one of the renewed/new/lost buckets.
    pub fn bucketed_policies(&self) -> usize {
        self.renewed.policies + self.new.policies + self.lost.policies
    }
}

/// Builds aggregates keyed by agent, preserving first-appearance order.
#[derive(Default)]
struct AgentBook {
    aggregates: Vec<AgentAggregate>,
    index: HashMap<String, usize>,
}

impl AgentBook {
    fn entry(&mut self, agent: &str) -> &mut AgentAggregate {
        let position = match self.index.get(agent) {
            Some(&position) => position,
            None => {
                self.aggregates.push(AgentAggregate::named(agent));
                self.index
                    .insert(agent.to_string(), self.aggregates.len() - 1);
                self.aggregates.len() - 1
            }
        };
        &mut self.aggregates[position]
    }
}

/// Aggregate reconciled policies per agent.
///
/// A policy counts toward its year-N agent whenever it has a year-N record,
/// including records with zero members and zero commission.
///
/// Every policy contributes to exactly one of the renewed, new or lost
/// buckets. Output is sorted by year-N+1 policy count, highest first; ties keep
/// first-appearance order.
pub fn aggregate_agents(policies: &[UnifiedPolicy]) -> Vec<AgentAggregate> {
    let mut book = AgentBook::default();

    for policy in policies {
        match &policy.lifecycle {
            Lifecycle::Renewed { prior, current } => {
                book.entry(&prior.agent)
                    .prior
                    .add(prior.members, prior.commission);

                let agent = book.entry(&current.agent);
                agent.current.add(current.members, current.commission);
                agent.renewed.add(current.members, current.commission);
            }
            Lifecycle::Lapsed { prior } => {
                let agent = book.entry(&prior.agent);
                agent.prior.add(prior.members, prior.commission);
                agent.lost.add(prior.members, prior.commission);
            }
            Lifecycle::New { current } => {
                let agent = book.entry(&current.agent);
                agent.current.add(current.members, current.commission);
                agent.new.add(current.members, current.commission);
            }
        }
    }

    let mut aggregates = book.aggregates;
    debug_assert_eq!(
        aggregates.iter().map(AgentAggregate::bucketed_policies).sum::<usize>(),
        policies.len()
    );
    aggregates.sort_by_key(|agent| Reverse(agent.current.policies));
    aggregates
}
