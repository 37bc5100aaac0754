use crate::domain::entities::offline::{
    AuditEntry, AuditEntryDraft, AuditEntryPatch, AuditFilter, AuditStats,
};
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Local append-only log of sync-relevant actions, ring-capped: once the
/// cap is exceeded the oldest entries are silently evicted on append.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, draft: AuditEntryDraft) -> Result<String, AppError>;

    async fn amend(&self, id: &str, patch: AuditEntryPatch) -> Result<(), AppError>;

    /// Matching entries, newest first.
    async fn filtered(&self, filter: AuditFilter) -> Result<Vec<AuditEntry>, AppError>;

    async fn stats(&self) -> Result<AuditStats, AppError>;
}
