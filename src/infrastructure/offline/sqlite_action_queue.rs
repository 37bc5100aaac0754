use crate::application::ports::ActionQueue;
use crate::domain::entities::offline::{QueueItem, QueueItemDraft, QueueStats};
use crate::domain::value_objects::{QueueItemId, TenantId};
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::offline::mappers::queue_item_from_row;
use crate::infrastructure::offline::rows::QueueItemRow;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::Row;
use std::collections::HashMap;

pub struct SqliteActionQueue {
    pool: ConnectionPool,
}

impl SqliteActionQueue {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActionQueue for SqliteActionQueue {
    async fn enqueue(&self, draft: QueueItemDraft) -> Result<QueueItemId, AppError> {
        let id = QueueItemId::generate();
        let payload = serde_json::to_string(&draft.action)?;
        let created_at = Utc::now().timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO offline_queue (
                id, tenant_id, action_type, payload, priority,
                retry_count, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
            "#,
        )
        .bind(id.as_str())
        .bind(draft.tenant_id.as_str())
        .bind(draft.action.kind().as_str())
        .bind(&payload)
        .bind(draft.priority.as_str())
        .bind(created_at)
        .execute(self.pool.get_pool())
        .await?;

        Ok(id)
    }

    async fn pending(&self, tenant: &TenantId) -> Result<Vec<QueueItem>, AppError> {
        let rows = sqlx::query_as::<_, QueueItemRow>(
            r#"
            SELECT id, tenant_id, action_type, payload, priority,
                   retry_count, last_error, created_at, synced_at
            FROM offline_queue
            WHERE tenant_id = ?1 AND synced_at IS NULL
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(tenant.as_str())
        .fetch_all(self.pool.get_pool())
        .await?;

        rows.into_iter().map(queue_item_from_row).collect()
    }

    async fn mark_synced(&self, id: &QueueItemId) -> Result<(), AppError> {
        let synced_at = Utc::now().timestamp_millis();
        sqlx::query("UPDATE offline_queue SET synced_at = ?1 WHERE id = ?2")
            .bind(synced_at)
            .bind(id.as_str())
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn increment_retry(&self, id: &QueueItemId, error: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE offline_queue
            SET retry_count = retry_count + 1, last_error = ?1
            WHERE id = ?2
            "#,
        )
        .bind(error)
        .bind(id.as_str())
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: &QueueItemId,
        error: &str,
        retry_count: u32,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE offline_queue
            SET retry_count = MAX(retry_count, ?1), last_error = ?2
            WHERE id = ?3
            "#,
        )
        .bind(retry_count as i64)
        .bind(error)
        .bind(id.as_str())
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }

    async fn purge_synced_older_than(&self, hours: i64) -> Result<u64, AppError> {
        let cutoff = (Utc::now() - Duration::hours(hours)).timestamp_millis();
        let result =
            sqlx::query("DELETE FROM offline_queue WHERE synced_at IS NOT NULL AND synced_at < ?1")
                .bind(cutoff)
                .execute(self.pool.get_pool())
                .await?;
        Ok(result.rows_affected())
    }

    async fn stats(&self, tenant: &TenantId, retry_cap: u32) -> Result<QueueStats, AppError> {
        let row = sqlx::query(
            r#"
            SELECT
                SUM(CASE WHEN synced_at IS NULL AND retry_count < ?2 THEN 1 ELSE 0 END) AS pending,
                SUM(CASE WHEN synced_at IS NOT NULL THEN 1 ELSE 0 END) AS synced,
                SUM(CASE WHEN synced_at IS NULL AND retry_count >= ?2 THEN 1 ELSE 0 END) AS failed
            FROM offline_queue
            WHERE tenant_id = ?1
            "#,
        )
        .bind(tenant.as_str())
        .bind(retry_cap as i64)
        .fetch_one(self.pool.get_pool())
        .await?;

        let by_type_rows = sqlx::query(
            r#"
            SELECT action_type, COUNT(*) AS count
            FROM offline_queue
            WHERE tenant_id = ?1 AND synced_at IS NULL
            GROUP BY action_type
            "#,
        )
        .bind(tenant.as_str())
        .fetch_all(self.pool.get_pool())
        .await?;

        let mut by_type = HashMap::new();
        for r in by_type_rows {
            let kind: String = r.try_get("action_type").unwrap_or_default();
            let count: i64 = r.try_get("count").unwrap_or(0);
            by_type.insert(kind, count);
        }

        Ok(QueueStats {
            pending: row.try_get("pending").unwrap_or(0),
            synced: row.try_get("synced").unwrap_or(0),
            failed: row.try_get("failed").unwrap_or(0),
            by_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::offline::{ActionPayload, AttendancePayload, MessagePayload};
    use crate::domain::value_objects::SyncPriority;
    use uuid::Uuid;

    async fn setup() -> SqliteActionQueue {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();
        SqliteActionQueue::new(pool)
    }

    fn tenant() -> TenantId {
        TenantId::parse("school-1").unwrap()
    }

    fn attendance_draft(student: &str) -> QueueItemDraft {
        QueueItemDraft::new(
            tenant(),
            ActionPayload::Attendance(AttendancePayload {
                session_id: "sess-1".into(),
                student_id: student.into(),
                status: "present".into(),
                recorded_by: "staff-1".into(),
                note: None,
            }),
            SyncPriority::High,
        )
    }

    fn message_draft() -> QueueItemDraft {
        QueueItemDraft::new(
            tenant(),
            ActionPayload::Message(MessagePayload {
                client_ref: Uuid::new_v4(),
                thread_id: "thread-1".into(),
                sender_id: "staff-1".into(),
                body: "hello".into(),
            }),
            SyncPriority::Medium,
        )
    }

    #[tokio::test]
    async fn pending_preserves_enqueue_order() {
        let queue = setup().await;
        queue.enqueue(attendance_draft("s1")).await.unwrap();
        queue.enqueue(message_draft()).await.unwrap();
        queue.enqueue(attendance_draft("s2")).await.unwrap();

        let pending = queue.pending(&tenant()).await.unwrap();
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0].action.kind().as_str(), "attendance");
        assert_eq!(pending[1].action.kind().as_str(), "message");
        assert_eq!(pending[2].action.kind().as_str(), "attendance");
    }

    #[tokio::test]
    async fn mark_synced_removes_from_pending() {
        let queue = setup().await;
        let id = queue.enqueue(attendance_draft("s1")).await.unwrap();

        queue.mark_synced(&id).await.unwrap();

        assert!(queue.pending(&tenant()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn retry_bookkeeping() {
        let queue = setup().await;
        let id = queue.enqueue(attendance_draft("s1")).await.unwrap();

        queue.increment_retry(&id, "connection reset").await.unwrap();
        queue.increment_retry(&id, "timed out").await.unwrap();

        let item = &queue.pending(&tenant()).await.unwrap()[0];
        assert_eq!(item.retry_count, 2);
        assert_eq!(item.last_error.as_deref(), Some("timed out"));
    }

    #[tokio::test]
    async fn mark_failed_pins_retry_count() {
        let queue = setup().await;
        let id = queue.enqueue(attendance_draft("s1")).await.unwrap();

        queue.mark_failed(&id, "validation rejected", 5).await.unwrap();

        let item = &queue.pending(&tenant()).await.unwrap()[0];
        assert_eq!(item.retry_count, 5);
    }

    #[tokio::test]
    async fn purge_only_touches_synced_items() {
        let queue = setup().await;
        let keep = queue.enqueue(attendance_draft("s1")).await.unwrap();
        let gone = queue.enqueue(attendance_draft("s2")).await.unwrap();
        queue.mark_synced(&gone).await.unwrap();

        // Synced "gone" is newer than any cutoff in the past, so stays.
        assert_eq!(queue.purge_synced_older_than(24).await.unwrap(), 0);
        // A negative grace period puts the cutoff in the future.
        assert_eq!(queue.purge_synced_older_than(-1).await.unwrap(), 1);

        let pending = queue.pending(&tenant()).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, keep);
    }

    #[tokio::test]
    async fn stats_split_by_retry_cap() {
        let queue = setup().await;
        queue.enqueue(attendance_draft("s1")).await.unwrap();
        let failed = queue.enqueue(message_draft()).await.unwrap();
        let synced = queue.enqueue(attendance_draft("s2")).await.unwrap();
        queue.mark_failed(&failed, "rejected", 5).await.unwrap();
        queue.mark_synced(&synced).await.unwrap();

        let stats = queue.stats(&tenant(), 5).await.unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.synced, 1);
        assert_eq!(stats.by_type.get("attendance"), Some(&1));
        assert_eq!(stats.by_type.get("message"), Some(&1));
    }
}
