//! Configuration management for bq-report.
//!
//! Loads run parameters from a TOML file. Every key has a default except the
//! project id, and the CLI can override any of them.

use crate::error::{ReportError, Result};
use crate::pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "bq-report.toml";

/// Default BigQuery REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Main configuration structure for bq-report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the service-account key file.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,

    /// Google Cloud project the query job runs in.
    pub project_id: Option<String>,

    /// Path to the SQL file to execute.
    #[serde(default = "default_sql_path")]
    pub sql_path: PathBuf,

    /// Where the JSON document is written.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// BigQuery connection settings.
    #[serde(default)]
    pub bigquery: BigQueryConfig,
}

/// BigQuery connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigQueryConfig {
    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// REST API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Job location (e.g. "EU", "us-central1"). BigQuery infers it when unset.
    pub location: Option<String>,
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("config").join("service-account.json")
}

fn default_sql_path() -> PathBuf {
    PathBuf::from("sql").join("kpi_modeling.sql")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("exchange").join("kpi_summary.json")
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl Default for BigQueryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            api_base: default_api_base(),
            location: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            project_id: None,
            sql_path: default_sql_path(),
            output_path: default_output_path(),
            bigquery: BigQueryConfig::default(),
        }
    }
}

impl Config {
    /// Returns the default config file path.
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults only when `required` is false.
    pub fn load_from_file(path: &Path, required: bool) -> Result<Self> {
        if !path.exists() {
            if required {
                return Err(ReportError::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ReportError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            ReportError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Builds the pipeline parameters.
    ///
    /// Fails if no project id is set or the request timeout is zero.
    pub fn to_pipeline_config(&self) -> Result<PipelineConfig> {
        let project_id = self
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                ReportError::config(
                    "project_id is required (set it in the config file or pass --project)",
                )
            })?;

        if self.bigquery.timeout_secs == 0 {
            return Err(ReportError::config(
                "bigquery.timeout_secs must be at least 1 second",
            ));
        }

        Ok(PipelineConfig {
            credentials_path: self.credentials_path.clone(),
            project_id: project_id.to_string(),
            sql_path: self.sql_path.clone(),
            output_path: self.output_path.clone(),
        })
    }
}
