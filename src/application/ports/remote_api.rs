use crate::domain::value_objects::TenantId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Whether a failed remote write is worth retrying.
///
/// Transport faults, timeouts and server-side failures are transient; a
/// rejection the server will repeat (validation, conflict policy) is
/// terminal and must not burn retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    Transient,
    Terminal,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Transient,
            status: None,
            message: message.into(),
        }
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Terminal,
            status: None,
            message: message.into(),
        }
    }

    /// 408/429/5xx are retryable; any other non-2xx status is a rejection
    /// the server will repeat.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            408 | 429 => RemoteErrorKind::Transient,
            s if s >= 500 => RemoteErrorKind::Transient,
            _ => RemoteErrorKind::Terminal,
        };
        Self {
            kind,
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == RemoteErrorKind::Terminal
    }
}

impl From<RemoteError> for crate::shared::error::AppError {
    fn from(err: RemoteError) -> Self {
        crate::shared::error::AppError::Remote(err.message)
    }
}

/// Row-oriented read parameters: tenant filter, column projection,
/// filters, ordering, limit. Mirrors what the hosted data API accepts as
/// query parameters; filter values carry their operator ("eq.x",
/// "gte.2026-01-01") ready to travel as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub columns: Option<String>,
    pub filters: Vec<(String, String)>,
    pub order: Option<(String, bool)>,
    pub limit: Option<u32>,
}

impl SelectQuery {
    pub fn for_tenant(tenant: &TenantId) -> Self {
        Self::default().eq("tenant_id", tenant.as_str())
    }

    pub fn columns(mut self, columns: &str) -> Self {
        self.columns = Some(columns.to_string());
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value.into())));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filters
            .push((column.to_string(), format!("gte.{}", value.into())));
        self
    }

    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order = Some((column.to_string(), descending));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// The opaque HTTP backend, reduced to row reads and idempotent writes
/// against named server tables. Every call is fallible; classification of
/// the failure is the implementation's job.
#[async_trait]
pub trait RemoteDataApi: Send + Sync {
    async fn select(&self, table: &str, query: SelectQuery) -> Result<Vec<Value>, RemoteError>;

    async fn insert(&self, table: &str, rows: Value) -> Result<(), RemoteError>;

    /// Insert-or-update keyed on `on_conflict` (comma-separated columns);
    /// the idempotency primitive every applier leans on.
    async fn upsert(&self, table: &str, rows: Value, on_conflict: &str)
        -> Result<(), RemoteError>;

    /// `filters` use the same operator-qualified value form as
    /// [`SelectQuery`] filters.
    async fn update(
        &self,
        table: &str,
        filters: Vec<(String, String)>,
        patch: Value,
    ) -> Result<(), RemoteError>;

    async fn delete(&self, table: &str, filters: Vec<(String, String)>)
        -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(
            RemoteError::from_status(503, "unavailable").kind,
            RemoteErrorKind::Transient
        );
        assert_eq!(
            RemoteError::from_status(429, "slow down").kind,
            RemoteErrorKind::Transient
        );
        assert_eq!(
            RemoteError::from_status(408, "timeout").kind,
            RemoteErrorKind::Transient
        );
        assert_eq!(
            RemoteError::from_status(422, "validation").kind,
            RemoteErrorKind::Terminal
        );
        assert_eq!(
            RemoteError::from_status(403, "denied").kind,
            RemoteErrorKind::Terminal
        );
    }
}
