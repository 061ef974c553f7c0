//! The pipeline runner.
//!
//! Loads credentials, authenticates, reads the SQL file, runs it, and writes
//! the Output Document, in that order. Stages never repeat and the first
//! failure aborts the rest: nothing outside the process changes until the
//! result is fully in memory.

use crate::error::{ReportError, Result};
use crate::output::{write_document, ConsoleReport};
use crate::warehouse::{load_service_account_key, Connector, QueryResult};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Run parameters, passed in explicitly rather than read from globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Service-account key file.
    pub credentials_path: PathBuf,
    /// Project the query job is billed to.
    pub project_id: String,
    /// SQL file whose content is sent verbatim.
    pub sql_path: PathBuf,
    /// Output Document path, overwritten on success.
    pub output_path: PathBuf,
}

/// Pipeline states, strictly in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Init,
    Authenticated,
    QueryLoaded,
    ResultReady,
    Written,
}

impl Stage {
    /// Returns the stage name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Authenticated => "authenticated",
            Self::QueryLoaded => "query-loaded",
            Self::ResultReady => "result-ready",
            Self::Written => "written",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The Result Table that was written.
    pub result: QueryResult,
    /// Where the Output Document was written.
    pub output_path: PathBuf,
}

/// Runs one query from file to JSON document.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    stage: Stage,
}

impl Pipeline {
    /// Creates a pipeline in the `Init` stage.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            stage: Stage::Init,
        }
    }

    /// Returns the last stage reached.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Runs every stage and prints the console report on success.
    ///
    /// The report is printed only after the document is fully written.
    pub async fn execute<W: Write>(
        &mut self,
        connector: &dyn Connector,
        report: &mut ConsoleReport<W>,
    ) -> Result<RunSummary> {
        report
            .banner(&self.config)
            .map_err(|e| ReportError::internal(format!("Failed to write to console: {e}")))?;

        let summary = self.run(connector).await?;

        report
            .result(&summary.result)
            .and_then(|_| report.saved(&summary.output_path))
            .map_err(|e| ReportError::internal(format!("Failed to write to console: {e}")))?;

        Ok(summary)
    }

    /// Runs every stage without printing anything.
    pub async fn run(&mut self, connector: &dyn Connector) -> Result<RunSummary> {
        if self.stage != Stage::Init {
            return Err(ReportError::internal(format!(
                "Pipeline already ran (stage: {})",
                self.stage
            )));
        }

        match self.run_stages(connector).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                warn!("Pipeline aborted after stage '{}': {}", self.stage, e);
                Err(e)
            }
        }
    }

    async fn run_stages(&mut self, connector: &dyn Connector) -> Result<RunSummary> {
        let key = load_service_account_key(&self.config.credentials_path)?;
        debug!("Credentials loaded from {}", self.config.credentials_path.display());

        let engine = connector.connect(key, &self.config.project_id).await?;
        self.advance(Stage::Authenticated);

        let sql = read_query(&self.config.sql_path)?;
        self.advance(Stage::QueryLoaded);

        let result = engine.execute_query(&sql).await?;
        info!(
            "Query returned {} rows in {}ms",
            result.row_count,
            result.execution_time.as_millis()
        );
        self.advance(Stage::ResultReady);

        write_document(&self.config.output_path, &result)?;
        self.advance(Stage::Written);

        Ok(RunSummary {
            result,
            output_path: self.config.output_path.clone(),
        })
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(next > self.stage, "stages only move forward");
        debug!("Pipeline stage {} -> {}", self.stage, next);
        self.stage = next;
    }
}

/// Reads the query text verbatim.
pub fn read_query(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        ReportError::input(format!("Failed to read SQL file {}: {e}", path.display()))
    })
}
