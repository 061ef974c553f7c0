//! BigQuery REST client implementation.
//!
//! Provides the `BigQueryClient` struct that implements the `QueryEngine`
//! trait against the BigQuery v2 REST API, authenticated with a
//! service-account key through yup-oauth2.

use crate::config::BigQueryConfig;
use crate::error::{ReportError, Result};
use crate::warehouse::decode::{columns_from_schema, decode_row};
use crate::warehouse::wire::{ErrorResponse, QueryRequest, QueryResponse};
use crate::warehouse::{Connector, QueryEngine, QueryResult, Row};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::{ServiceAccountAuthenticator, ServiceAccountKey};

/// OAuth scope required for running query jobs.
const SCOPES: &[&str] = &["https://www.googleapis.com/auth/bigquery"];

/// Server-side wait per request before BigQuery reports `jobComplete: false`.
const SERVER_WAIT_MS: u64 = 10_000;

/// Client-side pause between polls of an unfinished job.
const POLL_INTERVAL_MS: u64 = 500;

/// Opens authenticated BigQuery clients.
#[derive(Debug, Clone, Default)]
pub struct BigQueryConnector {
    settings: BigQueryConfig,
}

impl BigQueryConnector {
    /// Creates a connector with the given connection settings.
    pub fn new(settings: BigQueryConfig) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Connector for BigQueryConnector {
    async fn connect(
        &self,
        key: ServiceAccountKey,
        project_id: &str,
    ) -> Result<Box<dyn QueryEngine>> {
        let client = BigQueryClient::connect(key, project_id, self.settings.clone()).await?;
        Ok(Box::new(client))
    }
}

/// BigQuery client bound to one project.
pub struct BigQueryClient {
    authenticator: DefaultAuthenticator,
    http: Client,
    project_id: String,
    settings: BigQueryConfig,
}

impl BigQueryClient {
    /// Builds the authenticator and proves the key works by fetching a token.
    pub async fn connect(
        key: ServiceAccountKey,
        project_id: &str,
        settings: BigQueryConfig,
    ) -> Result<Self> {
        validate_project_id(project_id)?;

        let client_email = key.client_email.clone();
        let authenticator = ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(|e| ReportError::auth(format!("Failed to build authenticator: {e}")))?;

        // The token endpoint is the first place a revoked or malformed key is rejected.
        authenticator.token(SCOPES).await.map_err(|e| {
            ReportError::auth(format!(
                "Google rejected service account {client_email} for project {project_id}: {e}"
            ))
        })?;
        info!("Authenticated as {} (project {})", client_email, project_id);

        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ReportError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            authenticator,
            http,
            project_id: project_id.to_string(),
            settings,
        })
    }

    fn queries_url(&self) -> String {
        format!(
            "{}/projects/{}/queries",
            self.settings.api_base.trim_end_matches('/'),
            self.project_id
        )
    }

    async fn bearer_token(&self) -> Result<String> {
        let token = self
            .authenticator
            .token(SCOPES)
            .await
            .map_err(|e| ReportError::auth(format!("Failed to refresh access token: {e}")))?;
        token
            .token()
            .map(str::to_string)
            .ok_or_else(|| ReportError::auth("Token endpoint returned no access token"))
    }

    /// Submits the query with jobs.query.
    async fn post_query(&self, sql: &str) -> Result<QueryResponse> {
        let mut request = QueryRequest::new(sql);
        request.timeout_ms = Some(SERVER_WAIT_MS);
        request.location = self.settings.location.clone();

        let token = self.bearer_token().await?;
        let response = self
            .http
            .post(self.queries_url())
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        read_json(response).await
    }

    /// Fetches job state or a result page with jobs.getQueryResults.
    async fn get_query_results(
        &self,
        job_id: &str,
        location: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<QueryResponse> {
        let mut params: Vec<(&str, String)> = vec![
            ("timeoutMs", SERVER_WAIT_MS.to_string()),
            ("formatOptions.useInt64Timestamp", "true".to_string()),
        ];
        if let Some(location) = location {
            params.push(("location", location.to_string()));
        }
        if let Some(page_token) = page_token {
            params.push(("pageToken", page_token.to_string()));
        }

        let token = self.bearer_token().await?;
        let response = self
            .http
            .get(format!("{}/{}", self.queries_url(), job_id))
            .query(&params)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        read_json(response).await
    }

    fn map_request_error(&self, e: reqwest::Error) -> ReportError {
        if e.is_timeout() {
            ReportError::query(format!(
                "Request timed out after {} seconds",
                self.settings.timeout_secs
            ))
        } else if e.is_connect() {
            ReportError::query("Failed to connect to BigQuery API. Check your network.")
        } else {
            ReportError::query(format!("Request failed: {e}"))
        }
    }
}

#[async_trait]
impl QueryEngine for BigQueryClient {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let mut response = self.post_query(sql).await?;
        log_job_warnings(&response);

        let job = response.job_reference.take().unwrap_or_default();
        let job_id = job.job_id;
        let location = job.location.or_else(|| self.settings.location.clone());

        while !response.job_complete {
            let id = job_id
                .as_deref()
                .ok_or_else(|| ReportError::query("Malformed BigQuery response: missing job id"))?;
            debug!("Job {} still running, polling", id);
            tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            response = self.get_query_results(id, location.as_deref(), None).await?;
            log_job_warnings(&response);
        }

        // Statements without a result set (DDL, DML) carry no schema
        let fields = response
            .schema
            .as_ref()
            .map(|s| s.fields.clone())
            .unwrap_or_default();
        let total_rows = response.total_rows.as_deref().and_then(|t| t.parse().ok());

        let mut rows: Vec<Row> = Vec::new();
        loop {
            for row in std::mem::take(&mut response.rows) {
                rows.push(decode_row(&fields, row)?);
            }
            let Some(page_token) = response.page_token.take() else {
                break;
            };
            let id = job_id
                .as_deref()
                .ok_or_else(|| ReportError::query("Malformed BigQuery response: missing job id"))?;
            debug!("Fetching next result page of job {} ({} rows so far)", id, rows.len());
            response = self
                .get_query_results(id, location.as_deref(), Some(&page_token))
                .await?;
        }

        let execution_time = start.elapsed();
        if let Some(total) = total_rows {
            if total != rows.len() as u64 {
                warn!("BigQuery reported {} rows but {} were fetched", total, rows.len());
            }
        }

        let row_count = rows.len();
        Ok(QueryResult {
            columns: columns_from_schema(&fields),
            rows,
            execution_time,
            row_count,
            total_rows,
            job_id,
        })
    }
}

/// Rejects project ids BigQuery can never accept, before any network call.
///
/// Domain-scoped ids such as `example.com:my-project` are allowed.
pub fn validate_project_id(project_id: &str) -> Result<()> {
    if project_id.is_empty() {
        return Err(ReportError::auth("Project id must not be empty"));
    }
    let valid = project_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
    if !valid {
        return Err(ReportError::auth(format!(
            "Invalid project id '{project_id}'"
        )));
    }
    Ok(())
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ReportError::query(format!("Failed to read response: {e}")))?;

    if !status.is_success() {
        return Err(parse_error(status, &body));
    }

    serde_json::from_str(&body)
        .map_err(|e| ReportError::query(format!("Failed to parse BigQuery response: {e}")))
}

/// Parses a BigQuery API error response.
fn parse_error(status: StatusCode, body: &str) -> ReportError {
    if status == StatusCode::UNAUTHORIZED {
        return ReportError::query(
            "BigQuery rejected the access token. Check the service account key.",
        );
    }

    if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(body) {
        let reason = error_response
            .error
            .errors
            .first()
            .map(|e| e.reason.as_str())
            .filter(|r| !r.is_empty());
        return match reason {
            Some(reason) => ReportError::query(format!(
                "BigQuery API error ({reason}): {}",
                error_response.error.message
            )),
            None => {
                let code = match error_response.error.code {
                    0 => status.as_u16(),
                    code => code,
                };
                ReportError::query(format!(
                    "BigQuery API error ({code}): {}",
                    error_response.error.message
                ))
            }
        };
    }

    ReportError::query(format!("BigQuery API error ({status}): {body}"))
}

fn log_job_warnings(response: &QueryResponse) {
    for error in &response.errors {
        warn!("BigQuery reported: {} ({})", error.message, error.reason);
    }
}
