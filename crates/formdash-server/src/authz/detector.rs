use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use formdash_core::MetricsRegistry;

use super::matcher::{HeuristicMatcher, ViolationMatcher};
use super::{AUTHZ_VIOLATION_HELP, AUTHZ_VIOLATION_TOTAL};

/// Error object returned by the data-access backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAccessError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl DataAccessError {
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
            details: None,
            hint: None,
        }
    }
}

impl fmt::Display for DataAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{code}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DataAccessError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Select => "SELECT",
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call context for a data-access invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessContext {
    pub table: String,
    pub operation: Operation,
    pub user_id: Option<String>,
    pub role: Option<String>,
}

impl AccessContext {
    pub fn new(table: impl Into<String>, operation: Operation) -> Self {
        Self { table: table.into(), operation, user_id: None, role: None }
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// `{data, error}` result of a data-access call.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    pub data: Option<T>,
    pub error: Option<DataAccessError>,
}

impl<T> QueryResult<T> {
    pub fn ok(data: T) -> Self {
        Self { data: Some(data), error: None }
    }

    pub fn err(error: DataAccessError) -> Self {
        Self { data: None, error: Some(error) }
    }
}

#[derive(Clone)]
pub struct AuthzDetector {
    registry: Arc<MetricsRegistry>,
    matcher: Arc<dyn ViolationMatcher>,
}

impl AuthzDetector {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self::with_matcher(registry, Arc::new(HeuristicMatcher::default()))
    }

    pub fn with_matcher(registry: Arc<MetricsRegistry>, matcher: Arc<dyn ViolationMatcher>) -> Self {
        Self { registry, matcher }
    }

    pub fn is_violation(&self, err: &DataAccessError) -> bool {
        self.matcher.matches(err)
    }

    /// Log and count `err` if it classifies as a violation; otherwise no-op.
    pub fn record_violation(&self, err: &DataAccessError, ctx: &AccessContext) {
        if !self.is_violation(err) {
            return;
        }
        let role = ctx.role.as_deref().unwrap_or("unknown");
        tracing::warn!(
            table = %ctx.table,
            operation = %ctx.operation,
            role,
            user = ?ctx.user_id,
            code = ?err.code,
            message = %err.message,
            "authorization policy violation"
        );
        let labels = [("table", ctx.table.as_str()), ("operation", ctx.operation.as_str()), ("role", role)];
        if let Err(e) = self.registry.inc(AUTHZ_VIOLATION_TOTAL, AUTHZ_VIOLATION_HELP, &labels) {
            tracing::warn!(class = e.class().as_str(), error = %e, "failed to count authz violation");
        }
    }

    /// Run `call` and return its result untouched, recording any violation.
    pub fn with_tracking<T>(
        &self,
        call: impl FnOnce() -> QueryResult<T>,
        ctx: &AccessContext,
    ) -> QueryResult<T> {
        let result = call();
        if let Some(err) = &result.error {
            self.record_violation(err, ctx);
        }
        result
    }

    /// Async form of [`with_tracking`](Self::with_tracking).
    pub async fn with_tracking_async<T, F>(&self, call: F, ctx: &AccessContext) -> QueryResult<T>
    where
        F: Future<Output = QueryResult<T>>,
    {
        let result = call.await;
        if let Some(err) = &result.error {
            self.record_violation(err, ctx);
        }
        result
    }
}
