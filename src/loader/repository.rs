//! Snapshot loading and the repository holding both collections.
//!
//! Load failures never reach the engine: a snapshot that cannot be fetched or
//! parsed is logged and replaced by an empty collection.

use crate::analysis::{analyze, Analysis};
use crate::config::{Config, FieldMap};
use crate::error::ReconcileError;
use crate::loader::normalize::{extract_records, to_policy_record, to_renewal_record, RawRecord};
use crate::loader::source::{fetch_document, SnapshotSource};
use crate::models::{PolicyRecord, RenewalRecord};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Fetches snapshot documents and normalizes their records.
pub struct SnapshotLoader {
    client: reqwest::Client,
    fields: FieldMap,
}

impl SnapshotLoader {
    pub fn new(timeout_seconds: u64, fields: FieldMap) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, fields })
    }

    /// Load a year-N snapshot. Failures yield an empty collection.
    pub async fn load_prior(&self, source: &SnapshotSource, key: &str) -> Vec<PolicyRecord> {
        self.load_raw(source, key)
            .await
            .iter()
            .map(|raw| to_policy_record(raw, &self.fields))
            .collect()
    }

    /// Load a year-N+1 snapshot. Failures yield an empty collection.
    pub async fn load_current(&self, source: &SnapshotSource, key: &str) -> Vec<RenewalRecord> {
        self.load_raw(source, key)
            .await
            .iter()
            .map(|raw| to_renewal_record(raw, &self.fields))
            .collect()
    }

    async fn load_raw(&self, source: &SnapshotSource, key: &str) -> Vec<RawRecord> {
        let result = fetch_document(source, &self.client)
            .await
            .and_then(|document| extract_records(document, key));

        match result {
            Ok(records) => {
                info!("Loaded {} records from {}", records.len(), source);
                records
            }
            Err(e) => {
                warn!("Failed to load snapshot {}: {:#}", source, e);
                Vec::new()
            }
        }
    }
}

/// Locations and wrapper keys of the two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPair {
    pub prior: SnapshotSource,
    pub prior_key: String,
    pub current: SnapshotSource,
    pub current_key: String,
}

impl SnapshotPair {
    /// Resolve sources and keys from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let prior = config
            .loader
            .prior_source
            .as_deref()
            .context("No previous-year snapshot given (use --previous or [loader] prior_source)")?;
        let current = config
            .loader
            .current_source
            .as_deref()
            .context("No current-year snapshot given (use --current or [loader] current_source)")?;

        Ok(Self {
            prior: SnapshotSource::parse(prior),
            prior_key: config.loader.prior_key(&config.period),
            current: SnapshotSource::parse(current),
            current_key: config.loader.current_key(&config.period),
        })
    }
}

/// Both loaded snapshots, passed by reference into the engine.
pub struct SnapshotRepository {
    loader: SnapshotLoader,
    sources: SnapshotPair,
    prior: Vec<PolicyRecord>,
    current: Vec<RenewalRecord>,
}

impl SnapshotRepository {
    /// Fetch both snapshots concurrently.
    pub async fn load(loader: SnapshotLoader, sources: SnapshotPair) -> Self {
        let mut repository = Self {
            loader,
            sources,
            prior: Vec::new(),
            current: Vec::new(),
        };
        repository.reload().await;
        repository
    }

    /// Re-fetch both snapshots, replacing the held collections wholesale.
    pub async fn reload(&mut self) {
        let (prior, current) = futures::join!(
            self.loader
                .load_prior(&self.sources.prior, &self.sources.prior_key),
            self.loader
                .load_current(&self.sources.current, &self.sources.current_key),
        );
        self.prior = prior;
        self.current = current;
    }

    pub fn sources(&self) -> &SnapshotPair {
        &self.sources
    }

    pub fn prior(&self) -> &[PolicyRecord] {
        &self.prior
    }

    pub fn current(&self) -> &[RenewalRecord] {
        &self.current
    }

    /// Run the engine over the held snapshots.
    pub fn analyze(&self) -> Result<Analysis, ReconcileError> {
        analyze(&self.prior, &self.current)
    }
}
