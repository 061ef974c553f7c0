//! BigQuery client integration tests.
//!
//! The live tests need a service-account key in BQ_REPORT_CREDENTIALS and a
//! project in BQ_REPORT_PROJECT.

use super::TEST_KEY;
use bq_report::config::BigQueryConfig;
use bq_report::error::ReportError;
use bq_report::warehouse::{
    credentials::parse_service_account_key, load_service_account_key, BigQueryClient,
    QueryEngine, Value,
};
use std::path::PathBuf;

/// Helper to get live test settings from the environment.
fn get_live_settings() -> Option<(PathBuf, String)> {
    let credentials = std::env::var("BQ_REPORT_CREDENTIALS").ok()?;
    let project = std::env::var("BQ_REPORT_PROJECT").ok()?;
    Some((PathBuf::from(credentials), project))
}

/// Helper to create a live client.
async fn get_live_client() -> Option<BigQueryClient> {
    let (credentials, project) = get_live_settings()?;
    let key = load_service_account_key(&credentials).ok()?;
    BigQueryClient::connect(key, &project, BigQueryConfig::default())
        .await
        .ok()
}

#[tokio::test]
async fn test_live_select_one() {
    let Some(client) = get_live_client().await else {
        eprintln!("Skipping test: BQ_REPORT_CREDENTIALS/BQ_REPORT_PROJECT not set");
        return;
    };

    let result = client.execute_query("SELECT 1 AS x").await.unwrap();

    assert_eq!(result.column_names(), vec!["x"]);
    assert_eq!(result.columns[0].data_type, "INTEGER");
    assert_eq!(result.rows, vec![vec![Value::Int(1)]]);
    assert!(result.job_id.is_some());
}

#[tokio::test]
async fn test_live_typed_columns() {
    let Some(client) = get_live_client().await else {
        eprintln!("Skipping test: BQ_REPORT_CREDENTIALS/BQ_REPORT_PROJECT not set");
        return;
    };

    let result = client
        .execute_query(
            "SELECT 'a' AS s, 1.5 AS f, TRUE AS b, NULL AS n, [1, 2] AS arr, \
             STRUCT('FR' AS country, 3 AS visits) AS geo, \
             TIMESTAMP_MILLIS(1700000000123) AS ts",
        )
        .await
        .unwrap();

    let row = &result.rows[0];
    assert_eq!(row[0], Value::from("a"));
    assert_eq!(row[1], Value::Float(1.5));
    assert_eq!(row[2], Value::Bool(true));
    assert_eq!(row[3], Value::Null);
    assert_eq!(row[4], Value::Array(vec![Value::Int(1), Value::Int(2)]));
    assert_eq!(
        row[5],
        Value::Record(vec![
            ("country".to_string(), Value::from("FR")),
            ("visits".to_string(), Value::Int(3)),
        ])
    );
    assert_eq!(row[6], Value::Int(1700000000123));
}

#[tokio::test]
async fn test_live_syntax_error() {
    let Some(client) = get_live_client().await else {
        eprintln!("Skipping test: BQ_REPORT_CREDENTIALS/BQ_REPORT_PROJECT not set");
        return;
    };

    let err = client.execute_query("SELEC 1").await.unwrap_err();
    assert!(matches!(err, ReportError::Query(_)));
    assert!(err.to_string().to_lowercase().contains("syntax"));
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_with_invalid_project() {
    let key = parse_service_account_key(TEST_KEY).unwrap();

    let result = BigQueryClient::connect(key, "not a project/..", BigQueryConfig::default()).await;

    let Err(err) = result else {
        panic!("Expected invalid project id to be rejected");
    };
    assert!(matches!(err, ReportError::Auth(_)));
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_with_unreachable_token_endpoint() {
    let doc = TEST_KEY.replace(
        "https://oauth2.googleapis.com/token",
        "http://127.0.0.1:9/token",
    );
    let key = parse_service_account_key(&doc).unwrap();

    let result = BigQueryClient::connect(key, "analytics-prod", BigQueryConfig::default()).await;

    // Either the unusable private key or the refused connection fails the token fetch
    let Err(err) = result else {
        panic!("Expected authentication to fail");
    };
    assert!(matches!(err, ReportError::Auth(_)));
}
