//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.policy-reconcile.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".policy-reconcile.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Snapshot years.
    #[serde(default)]
    pub period: PeriodConfig,

    /// Snapshot loading settings.
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Raw-to-canonical field names.
    #[serde(default)]
    pub fields: FieldMap,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> String {
    "renewal_report.md".to_string()
}

/// Calendar years of the two snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodConfig {
    /// Year N.
    #[serde(default = "default_prior_year")]
    pub prior_year: u16,

    /// Year N+1.
    #[serde(default = "default_current_year")]
    pub current_year: u16,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            prior_year: default_prior_year(),
            current_year: default_current_year(),
        }
    }
}

fn default_prior_year() -> u16 {
    2025
}

fn default_current_year() -> u16 {
    2026
}

/// Snapshot loading settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Year-N snapshot: file path or http(s) URL.
    #[serde(default)]
    pub prior_source: Option<String>,

    /// Year-N+1 snapshot: file path or http(s) URL.
    #[serde(default)]
    pub current_source: Option<String>,

    /// Key wrapping the year-N record array. Defaults to `Polizas <year>`.
    #[serde(default)]
    pub prior_key: Option<String>,

    /// Key wrapping the year-N+1 record array. Defaults to `Polizas <year>`.
    #[serde(default)]
    pub current_key: Option<String>,

    /// HTTP request timeout in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl LoaderConfig {
    pub fn timeout(&self) -> u64 {
        self.timeout_seconds.unwrap_or(30)
    }

    /// Wrapper key for the year-N document.
    pub fn prior_key(&self, period: &PeriodConfig) -> String {
        self.prior_key
            .clone()
            .unwrap_or_else(|| wrapper_key(period.prior_year))
    }

    /// Wrapper key for the year-N+1 document.
    pub fn current_key(&self, period: &PeriodConfig) -> String {
        self.current_key
            .clone()
            .unwrap_or_else(|| wrapper_key(period.current_year))
    }
}

fn wrapper_key(year: u16) -> String {
    format!("Polizas {}", year)
}

/// Raw field names as they appear in the source documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    #[serde(default = "default_id_field")]
    pub id: String,
    #[serde(default = "default_agent_field")]
    pub agent: String,
    #[serde(default = "default_first_name_field")]
    pub first_name: String,
    #[serde(default = "default_last_name_field")]
    pub last_name: String,
    #[serde(default = "default_members_field")]
    pub members: String,
    #[serde(default = "default_company_field")]
    pub company: String,
    #[serde(default = "default_commission_field")]
    pub commission: String,
    #[serde(default = "default_region_field")]
    pub region: String,
    #[serde(default = "default_license_field")]
    pub license: String,
    #[serde(default = "default_class_field")]
    pub class: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            id: default_id_field(),
            agent: default_agent_field(),
            first_name: default_first_name_field(),
            last_name: default_last_name_field(),
            members: default_members_field(),
            company: default_company_field(),
            commission: default_commission_field(),
            region: default_region_field(),
            license: default_license_field(),
            class: default_class_field(),
        }
    }
}

fn default_id_field() -> String {
    "ID-BI".to_string()
}

fn default_agent_field() -> String {
    "CAPTADOR".to_string()
}

fn default_first_name_field() -> String {
    "NOMBRE PRINCIPAL".to_string()
}

fn default_last_name_field() -> String {
    "APELLIDOS".to_string()
}

fn default_members_field() -> String {
    "NUMERO DE MIEMBROS".to_string()
}

fn default_company_field() -> String {
    "COMPANIA".to_string()
}

fn default_commission_field() -> String {
    "TOTAL COMISION ESTIMADA".to_string()
}

fn default_region_field() -> String {
    "ESTADO".to_string()
}

fn default_license_field() -> String {
    "NPN".to_string()
}

fn default_class_field() -> String {
    "New /REN".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the policy listing.
    #[serde(default = "default_true")]
    pub include_records: bool,

    /// Include the year-N+1 breakdown tables.
    #[serde(default = "default_true")]
    pub include_breakdowns: bool,

    /// Maximum rows in the policy listing (0 = unlimited).
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_records: true,
            include_breakdowns: true,
            max_records: default_max_records(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_records() -> usize {
    500
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref previous) = args.previous {
            self.loader.prior_source = Some(previous.clone());
        }
        if let Some(ref current) = args.current {
            self.loader.current_source = Some(current.clone());
        }
        if let Some(timeout) = args.timeout {
            self.loader.timeout_seconds = Some(timeout);
        }

        if let Some(year) = args.prior_year {
            self.period.prior_year = year;
        }
        if let Some(year) = args.current_year {
            self.period.current_year = year;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        if let Some(max_records) = args.max_records {
            self.report.max_records = max_records;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.output, "renewal_report.md");
        assert_eq!(config.period.prior_year, 2025);
        assert_eq!(config.period.current_year, 2026);
        assert_eq!(config.fields.id, "ID-BI");
        assert_eq!(config.fields.class, "New /REN");
        assert_eq!(config.loader.timeout(), 30);
    }

    #[test]
    fn test_wrapper_keys_follow_period() {
        let config = Config::default();
        assert_eq!(config.loader.prior_key(&config.period), "Polizas 2025");
        assert_eq!(config.loader.current_key(&config.period), "Polizas 2026");

        let loader = LoaderConfig {
            current_key: Some("Renewals".to_string()),
            ..LoaderConfig::default()
        };
        assert_eq!(loader.current_key(&config.period), "Renewals");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom_report.md"

[period]
prior_year = 2024
current_year = 2025

[loader]
prior_source = "data/2024.json"
current_source = "https://example.com/2025.json"
timeout_seconds = 5

[fields]
id = "POLICY ID"
members = "MEMBERS"

[report]
max_records = 50
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "custom_report.md");
        assert_eq!(config.period.prior_year, 2024);
        assert_eq!(config.loader.prior_source.as_deref(), Some("data/2024.json"));
        assert_eq!(config.loader.timeout(), 5);
        assert_eq!(config.loader.prior_key(&config.period), "Polizas 2024");
        assert_eq!(config.fields.id, "POLICY ID");
        assert_eq!(config.fields.members, "MEMBERS");
        assert_eq!(config.fields.agent, "CAPTADOR");
        assert_eq!(config.report.max_records, 50);
        assert!(config.report.include_records);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[period]\ncurrent_year = 2030\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.period.current_year, 2030);
        assert_eq!(config.period.prior_year, 2025);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[period]"));
        assert!(toml_str.contains("[fields]"));
        assert!(!toml_str.contains("verbose"));
    }
}
