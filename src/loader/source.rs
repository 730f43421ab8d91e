//! Snapshot sources and document fetching.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Where a snapshot document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    File(PathBuf),
    Url(String),
}

impl SnapshotSource {
    /// `http://` and `https://` locations are URLs, anything else is a path.
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            SnapshotSource::Url(location.to_string())
        } else {
            SnapshotSource::File(PathBuf::from(location))
        }
    }
}

impl fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotSource::File(path) => write!(f, "{}", path.display()),
            SnapshotSource::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Fetch and parse a JSON document.
pub async fn fetch_document(source: &SnapshotSource, client: &reqwest::Client) -> Result<Value> {
    match source {
        SnapshotSource::File(path) => {
            debug!("Reading snapshot file: {}", path.display());
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON in {}", path.display()))
        }
        SnapshotSource::Url(url) => {
            debug!("Fetching snapshot: {}", url);
            let response = client
                .get(url)
                .send()
                .await
                .with_context(|| format!("Failed to fetch {}", url))?
                .error_for_status()
                .with_context(|| format!("Server rejected request for {}", url))?;
            response
                .json::<Value>()
                .await
                .with_context(|| format!("Failed to parse JSON from {}", url))
        }
    }
}
