//! Warehouse abstraction layer for bq-report.
//!
//! Provides a trait-based interface for running queries, so the pipeline can
//! drive BigQuery in production and mock engines in tests.

mod bigquery;
pub mod credentials;
mod decode;
mod mock;
mod types;
mod wire;

pub use bigquery::{validate_project_id, BigQueryClient, BigQueryConnector};
pub use credentials::load_service_account_key;
pub use decode::parse_timestamp_millis;
pub use mock::{CallLog, FailingQueryEngine, MockConnector, MockQueryEngine};
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::error::Result;
use async_trait::async_trait;
use yup_oauth2::ServiceAccountKey;

/// Trait defining the interface for query engines.
///
/// `execute_query` blocks the caller until the full result table is available.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Executes a SQL query and returns the complete result.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;
}

/// Turns loaded credentials into an authenticated engine bound to a project.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Authenticates and returns an engine, or an auth error if rejected.
    async fn connect(
        &self,
        key: ServiceAccountKey,
        project_id: &str,
    ) -> Result<Box<dyn QueryEngine>>;
}
