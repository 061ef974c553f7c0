//! BigQuery REST v2 wire types.
//!
//! Only the fields the query path reads or sends are modelled.

use serde::{Deserialize, Serialize};

// https://cloud.google.com/bigquery/docs/reference/rest/v2/jobs/query#QueryRequest
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    pub use_legacy_sql: bool,
    // Server side wait before returning `jobComplete: false`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub format_options: DataFormatOptions,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            use_legacy_sql: false,
            timeout_ms: None,
            location: None,
            format_options: DataFormatOptions {
                use_int64_timestamp: true,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFormatOptions {
    // TIMESTAMP cells as integer epoch microseconds instead of float seconds
    pub use_int64_timestamp: bool,
}

// Shared by jobs.query and jobs.getQueryResults
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub job_complete: bool,
    pub job_reference: Option<JobReference>,
    pub schema: Option<TableSchema>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    pub page_token: Option<String>,
    // int64 is encoded as a JSON string
    pub total_rows: Option<String>,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

// https://cloud.google.com/bigquery/docs/reference/rest/v2/JobReference
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub job_id: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableFieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub mode: Option<String>,
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

impl TableFieldSchema {
    pub fn mode(&self) -> &str {
        self.mode.as_deref().unwrap_or("NULLABLE")
    }

    pub fn is_repeated(&self) -> bool {
        self.mode().eq_ignore_ascii_case("REPEATED")
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TableRow {
    #[serde(rename = "f", default)]
    pub fields: Vec<TableCell>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TableCell {
    // String for scalars, array for REPEATED, {"f": [...]} for RECORD
    #[serde(rename = "v", default)]
    pub value: serde_json::Value,
}

// https://cloud.google.com/bigquery/docs/reference/rest/v2/ErrorProto
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorProto {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

/// Google API error envelope returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}
