use crate::domain::entities::offline::{QueueItem, QueueItemDraft, QueueStats};
use crate::domain::value_objects::{QueueItemId, TenantId};
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Durable, ordered log of pending mutations. Enqueue always succeeds
/// locally; network state is irrelevant to this port.
#[async_trait]
pub trait ActionQueue: Send + Sync {
    async fn enqueue(&self, draft: QueueItemDraft) -> Result<QueueItemId, AppError>;

    /// Unsynced items, oldest first (FIFO by creation order).
    async fn pending(&self, tenant: &TenantId) -> Result<Vec<QueueItem>, AppError>;

    async fn mark_synced(&self, id: &QueueItemId) -> Result<(), AppError>;

    async fn increment_retry(&self, id: &QueueItemId, error: &str) -> Result<(), AppError>;

    /// Terminal failure: pins the retry count at `retry_count` so the item
    /// is excluded from further network attempts but stays visible.
    async fn mark_failed(
        &self,
        id: &QueueItemId,
        error: &str,
        retry_count: u32,
    ) -> Result<(), AppError>;

    /// Garbage-collects synced items past the grace period. Returns the
    /// number of rows removed.
    async fn purge_synced_older_than(&self, hours: i64) -> Result<u64, AppError>;

    /// Counters partitioned by the retry cap: pending below it, failed at
    /// or above it.
    async fn stats(&self, tenant: &TenantId, retry_cap: u32) -> Result<QueueStats, AppError>;
}
