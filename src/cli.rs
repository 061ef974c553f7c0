//! Command-line argument parsing for bq-report.
//!
//! Every flag is optional and overrides the matching config file key.

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Run a SQL file against BigQuery and export the result as JSON.
#[derive(Parser, Debug)]
#[command(name = "bq-report")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path (default: ./bq-report.toml if present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Service-account key file
    #[arg(short = 'k', long, value_name = "PATH")]
    pub credentials: Option<PathBuf>,

    /// Google Cloud project id
    #[arg(short = 'p', long, value_name = "PROJECT_ID")]
    pub project: Option<String>,

    /// SQL file to execute
    #[arg(short = 's', long, value_name = "PATH")]
    pub sql: Option<PathBuf>,

    /// Output JSON file (overwritten each run)
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use and whether it was given explicitly.
    pub fn config_path(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (Config::default_path(), false),
        }
    }

    /// Applies CLI overrides on top of a loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(credentials) = &self.credentials {
            config.credentials_path = credentials.clone();
        }
        if let Some(project) = &self.project {
            config.project_id = Some(project.clone());
        }
        if let Some(sql) = &self.sql {
            config.sql_path = sql.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(timeout) = self.timeout {
            config.bigquery.timeout_secs = timeout;
        }
    }
}
