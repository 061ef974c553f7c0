//! BigQuery REST client tests against a local HTTP server.
//!
//! The server answers the OAuth token endpoint and the jobs.query /
//! jobs.getQueryResults calls, so polling, paging and error mapping run
//! without Google credentials.

use super::project_layout;
use bq_report::config::BigQueryConfig;
use bq_report::error::ReportError;
use bq_report::output::ConsoleReport;
use bq_report::pipeline::Pipeline;
use bq_report::warehouse::credentials::parse_service_account_key;
use bq_report::warehouse::{BigQueryClient, BigQueryConnector, QueryEngine, Value};
use pretty_assertions::assert_eq;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

const SIGNING_KEY: &str = include_str!("../fixtures/signing_key.pem");

const TOKEN_RESPONSE: &str =
    r#"{"access_token": "ya29.local", "token_type": "Bearer", "expires_in": 3600}"#;

/// Maps `(method, target)` to a status code and JSON body.
type Handler = fn(&str, &str) -> (u16, String);

struct FakeServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeServer {
    async fn start(handler: Handler) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_connection(stream, handler, Arc::clone(&log)));
            }
        });

        Self { addr, requests }
    }

    fn settings(&self) -> BigQueryConfig {
        BigQueryConfig {
            timeout_secs: 10,
            api_base: format!("http://{}/bq", self.addr),
            location: None,
        }
    }

    fn key_document(&self) -> String {
        serde_json::json!({
            "type": "service_account",
            "project_id": "analytics-prod",
            "private_key_id": "local",
            "private_key": SIGNING_KEY,
            "client_email": "reporter@analytics-prod.iam.gserviceaccount.com",
            "token_uri": format!("http://{}/token", self.addr),
        })
        .to_string()
    }

    async fn client(&self) -> BigQueryClient {
        let key = parse_service_account_key(&self.key_document()).unwrap();
        BigQueryClient::connect(key, "analytics-prod", self.settings())
            .await
            .unwrap()
    }

    /// Request lines seen so far, token requests excluded.
    fn api_requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !r.starts_with("POST /token"))
            .cloned()
            .collect()
    }
}

async fn serve_connection(stream: TcpStream, handler: Handler, log: Arc<Mutex<Vec<String>>>) {
    let mut reader = BufReader::new(stream);
    loop {
        let mut request_line = String::new();
        match reader.read_line(&mut request_line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }

        let mut content_length = 0usize;
        loop {
            let mut header = String::new();
            match reader.read_line(&mut header).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
            let header = header.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }
        let mut body = vec![0u8; content_length];
        if reader.read_exact(&mut body).await.is_err() {
            return;
        }

        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let target = parts.next().unwrap_or_default().to_string();
        log.lock().unwrap().push(format!("{method} {target}"));

        let (status, payload) = handler(&method, &target);
        let reason = if status < 400 { "OK" } else { "Error" };
        let response = format!(
            "HTTP/1.1 {status} {reason}\r\n\
             content-type: application/json\r\n\
             content-length: {}\r\n\r\n{payload}",
            payload.len()
        );
        if reader.get_mut().write_all(response.as_bytes()).await.is_err() {
            return;
        }
    }
}

/// A job that is still running on submit and returns its rows in two pages.
fn paged_job(method: &str, target: &str) -> (u16, String) {
    if method == "POST" && target == "/token" {
        return (200, TOKEN_RESPONSE.to_string());
    }
    if method == "POST" && target == "/bq/projects/analytics-prod/queries" {
        let body = r#"{
            "jobReference": {"projectId": "analytics-prod", "jobId": "job_1", "location": "EU"},
            "jobComplete": false
        }"#;
        return (200, body.to_string());
    }
    if method == "GET" && target.starts_with("/bq/projects/analytics-prod/queries/job_1?") {
        let (value, next_page) = if target.contains("pageToken=P2") {
            ("2", None)
        } else {
            ("1", Some("P2"))
        };
        let mut body = serde_json::json!({
            "jobComplete": true,
            "schema": {"fields": [{"name": "x", "type": "INTEGER"}]},
            "totalRows": "2",
            "rows": [{"f": [{"v": value}]}],
        });
        if let Some(token) = next_page {
            body["pageToken"] = serde_json::json!(token);
        }
        return (200, body.to_string());
    }
    (404, r#"{"error": {"code": 404, "message": "Not found"}}"#.to_string())
}

/// Every query is rejected as invalid SQL.
fn rejecting_job(method: &str, target: &str) -> (u16, String) {
    if method == "POST" && target == "/token" {
        return (200, TOKEN_RESPONSE.to_string());
    }
    let body = r#"{"error": {"code": 400,
        "message": "Syntax error: Unexpected identifier SELEC at [1:1]",
        "errors": [{"message": "Syntax error", "domain": "global", "reason": "invalidQuery"}],
        "status": "INVALID_ARGUMENT"}}"#;
    (400, body.to_string())
}

#[tokio::test]
async fn test_polls_then_joins_pages() {
    let server = FakeServer::start(paged_job).await;
    let client = server.client().await;

    let result = client.execute_query("SELECT x FROM t").await.unwrap();

    assert_eq!(result.column_names(), vec!["x"]);
    assert_eq!(result.rows, vec![vec![Value::Int(1)], vec![Value::Int(2)]]);
    assert_eq!(result.row_count, 2);
    assert_eq!(result.total_rows, Some(2));
    assert_eq!(result.job_id.as_deref(), Some("job_1"));

    let requests = server.api_requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0], "POST /bq/projects/analytics-prod/queries");
    assert!(requests[1].starts_with("GET /bq/projects/analytics-prod/queries/job_1?"));
    assert!(requests[1].contains("location=EU"));
    assert!(!requests[1].contains("pageToken"));
    assert!(requests[2].contains("pageToken=P2"));
    assert!(requests[2].contains("location=EU"));
}

#[tokio::test]
async fn test_rejected_query_is_query_error() {
    let server = FakeServer::start(rejecting_job).await;
    let client = server.client().await;

    let err = client.execute_query("SELEC 1").await.unwrap_err();

    assert!(matches!(err, ReportError::Query(_)));
    assert!(err
        .to_string()
        .starts_with("Query error: BigQuery API error (invalidQuery): Syntax error"));
    assert_eq!(server.api_requests().len(), 1);
}

#[tokio::test]
async fn test_pipeline_writes_all_pages() {
    let server = FakeServer::start(paged_job).await;
    let dir = tempfile::tempdir().unwrap();
    let config = project_layout(dir.path(), "SELECT x FROM t");
    std::fs::write(&config.credentials_path, server.key_document()).unwrap();
    let connector = BigQueryConnector::new(server.settings());
    let mut report = ConsoleReport::new(Vec::new());

    Pipeline::new(config.clone())
        .execute(&connector, &mut report)
        .await
        .unwrap();

    let text = std::fs::read_to_string(&config.output_path).unwrap();
    assert_eq!(
        text,
        "[\n    {\n        \"x\": 1\n    },\n    {\n        \"x\": 2\n    }\n]\n"
    );
    let console = String::from_utf8(report.into_inner()).unwrap();
    assert!(console.contains("2 rows returned"));
}
