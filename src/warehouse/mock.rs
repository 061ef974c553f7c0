//! Mock query engines for testing.
//!
//! Provides in-memory engines and a recording connector so the pipeline can
//! be exercised without Google credentials or network access.

use super::{Connector, QueryEngine, QueryResult};
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use yup_oauth2::ServiceAccountKey;

/// A mock engine that returns a predefined result for every query.
#[derive(Debug, Clone, Default)]
pub struct MockQueryEngine {
    result: QueryResult,
    calls: CallLog,
}

impl MockQueryEngine {
    /// Creates a mock engine that always returns `result`.
    pub fn new(result: QueryResult) -> Self {
        Self {
            result,
            calls: CallLog::default(),
        }
    }
}

#[async_trait]
impl QueryEngine for MockQueryEngine {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        self.calls.record_query(sql);
        Ok(self
            .result
            .clone()
            .with_execution_time(Duration::from_millis(1)))
    }
}

/// A mock engine that rejects every query.
#[derive(Debug, Clone)]
pub struct FailingQueryEngine {
    message: String,
    calls: CallLog,
}

impl FailingQueryEngine {
    /// Creates an engine that fails with a query error carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            calls: CallLog::default(),
        }
    }
}

#[async_trait]
impl QueryEngine for FailingQueryEngine {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        self.calls.record_query(sql);
        Err(ReportError::query(self.message.clone()))
    }
}

/// Shared record of what a mock connector and its engines were asked to do.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    inner: Arc<Mutex<CallLogInner>>,
}

#[derive(Debug, Default)]
struct CallLogInner {
    connects: Vec<String>,
    queries: Vec<String>,
}

impl CallLog {
    fn record_connect(&self, project_id: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.connects.push(project_id.to_string());
        }
    }

    fn record_query(&self, sql: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.queries.push(sql.to_string());
        }
    }

    /// Project ids passed to `connect`, in call order.
    pub fn connects(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|inner| inner.connects.clone())
            .unwrap_or_default()
    }

    /// SQL texts passed to `execute_query`, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|inner| inner.queries.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
enum MockBehavior {
    Succeed(QueryResult),
    FailQuery(String),
    FailAuth(String),
}

/// A connector that hands out mock engines and records every call.
#[derive(Debug, Clone)]
pub struct MockConnector {
    behavior: MockBehavior,
    calls: CallLog,
}

impl MockConnector {
    /// Connector whose engine returns `result`.
    pub fn returning(result: QueryResult) -> Self {
        Self::with_behavior(MockBehavior::Succeed(result))
    }

    /// Connector whose engine rejects every query.
    pub fn failing_query(message: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::FailQuery(message.into()))
    }

    /// Connector that rejects the credentials/project pairing.
    pub fn failing_auth(message: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::FailAuth(message.into()))
    }

    fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: CallLog::default(),
        }
    }

    /// Returns the call log shared with every engine this connector creates.
    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        _key: ServiceAccountKey,
        project_id: &str,
    ) -> Result<Box<dyn QueryEngine>> {
        self.calls.record_connect(project_id);
        match &self.behavior {
            MockBehavior::Succeed(result) => Ok(Box::new(MockQueryEngine {
                result: result.clone(),
                calls: self.calls.clone(),
            })),
            MockBehavior::FailQuery(message) => Ok(Box::new(FailingQueryEngine {
                message: message.clone(),
                calls: self.calls.clone(),
            })),
            MockBehavior::FailAuth(message) => Err(ReportError::auth(message.clone())),
        }
    }
}
