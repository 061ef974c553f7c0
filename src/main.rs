//! bq-report - Run a SQL file against BigQuery and export the result as JSON.

use bq_report::cli::Cli;
use bq_report::config::Config;
use bq_report::error::{ReportError, Result};
use bq_report::logging;
use bq_report::output::ConsoleReport;
use bq_report::pipeline::Pipeline;
use bq_report::warehouse::BigQueryConnector;
use std::io::Write;
use tracing::{error, info};

fn main() {
    logging::init_stderr_logging();

    let cli = Cli::parse_args();
    let mut report = ConsoleReport::new(std::io::stdout());

    // Failures are reported on the console; the exit status stays 0.
    if let Err(e) = run(&cli, &mut report) {
        error!("{}: {}", e.category(), e);
        if let Err(io_err) = report.failure(&e) {
            eprintln!("{e} (console unavailable: {io_err})");
        }
    }
}

fn run<W: Write>(cli: &Cli, report: &mut ConsoleReport<W>) -> Result<()> {
    let (config_path, explicit) = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path, explicit)?;
    cli.apply_overrides(&mut config);

    let pipeline_config = config.to_pipeline_config()?;
    let connector = BigQueryConnector::new(config.bigquery.clone());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ReportError::internal(format!("Failed to start async runtime: {e}")))?;

    let mut pipeline = Pipeline::new(pipeline_config);
    runtime.block_on(pipeline.execute(&connector, report))?;
    Ok(())
}
