use crate::application::ports::AuditLog;
use crate::domain::entities::offline::{
    AuditEntry, AuditEntryDraft, AuditEntryPatch, AuditFilter, AuditStats,
};
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::offline::mappers::audit_entry_from_row;
use crate::infrastructure::offline::rows::AuditEntryRow;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::Row;
use std::collections::HashMap;
use uuid::Uuid;

pub struct SqliteAuditLog {
    pool: ConnectionPool,
    cap: u32,
}

impl SqliteAuditLog {
    pub fn new(pool: ConnectionPool, cap: u32) -> Self {
        Self { pool, cap }
    }

    async fn evict_beyond_cap(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            DELETE FROM audit_log WHERE id NOT IN (
                SELECT id FROM audit_log
                ORDER BY timestamp DESC, rowid DESC
                LIMIT ?1
            )
            "#,
        )
        .bind(self.cap as i64)
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AuditLog for SqliteAuditLog {
    async fn append(&self, draft: AuditEntryDraft) -> Result<String, AppError> {
        let id = Uuid::new_v4().to_string();
        let timestamp = Utc::now().timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO audit_log (
                id, tenant_id, timestamp, action, entity_type, entity_id,
                detail, status, was_offline, error
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&id)
        .bind(draft.tenant_id.as_str())
        .bind(timestamp)
        .bind(&draft.action)
        .bind(draft.entity_type.as_str())
        .bind(&draft.entity_id)
        .bind(&draft.detail)
        .bind(draft.status.as_str())
        .bind(draft.was_offline)
        .bind(&draft.error)
        .execute(self.pool.get_pool())
        .await?;

        self.evict_beyond_cap().await?;

        Ok(id)
    }

    async fn amend(&self, id: &str, patch: AuditEntryPatch) -> Result<(), AppError> {
        if let Some(status) = patch.status {
            sqlx::query("UPDATE audit_log SET status = ?1 WHERE id = ?2")
                .bind(status.as_str())
                .bind(id)
                .execute(self.pool.get_pool())
                .await?;
        }
        if let Some(detail) = patch.detail {
            sqlx::query("UPDATE audit_log SET detail = ?1 WHERE id = ?2")
                .bind(detail)
                .bind(id)
                .execute(self.pool.get_pool())
                .await?;
        }
        if let Some(error) = patch.error {
            sqlx::query("UPDATE audit_log SET error = ?1 WHERE id = ?2")
                .bind(error)
                .bind(id)
                .execute(self.pool.get_pool())
                .await?;
        }
        Ok(())
    }

    async fn filtered(&self, filter: AuditFilter) -> Result<Vec<AuditEntry>, AppError> {
        // Dynamic WHERE over a small, fixed set of optional predicates.
        let mut sql = String::from(
            "SELECT id, tenant_id, timestamp, action, entity_type, entity_id, \
             detail, status, was_offline, error FROM audit_log WHERE 1 = 1",
        );
        if filter.action.is_some() {
            sql.push_str(" AND action = ?");
        }
        if filter.entity_type.is_some() {
            sql.push_str(" AND entity_type = ?");
        }
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.since.is_some() {
            sql.push_str(" AND timestamp >= ?");
        }
        sql.push_str(" ORDER BY timestamp DESC, rowid DESC");
        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query_as::<_, AuditEntryRow>(&sql);
        if let Some(action) = &filter.action {
            query = query.bind(action.clone());
        }
        if let Some(entity) = &filter.entity_type {
            query = query.bind(entity.as_str().to_string());
        }
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(since) = filter.since {
            query = query.bind(since.timestamp_millis());
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit as i64);
        }

        let rows = query.fetch_all(self.pool.get_pool()).await?;

        rows.into_iter().map(audit_entry_from_row).collect()
    }

    async fn stats(&self) -> Result<AuditStats, AppError> {
        let cutoff = (Utc::now() - Duration::hours(24)).timestamp_millis();
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                SUM(CASE WHEN timestamp >= ?1 THEN 1 ELSE 0 END) AS last_24h,
                SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END) AS pending,
                SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END) AS failed
            FROM audit_log
            "#,
        )
        .bind(cutoff)
        .fetch_one(self.pool.get_pool())
        .await?;

        let by_action_rows =
            sqlx::query("SELECT action, COUNT(*) AS count FROM audit_log GROUP BY action")
                .fetch_all(self.pool.get_pool())
                .await?;
        let by_entity_rows =
            sqlx::query("SELECT entity_type, COUNT(*) AS count FROM audit_log GROUP BY entity_type")
                .fetch_all(self.pool.get_pool())
                .await?;

        let mut by_action = HashMap::new();
        for r in by_action_rows {
            by_action.insert(
                r.try_get::<String, _>("action").unwrap_or_default(),
                r.try_get::<i64, _>("count").unwrap_or(0),
            );
        }
        let mut by_entity_type = HashMap::new();
        for r in by_entity_rows {
            by_entity_type.insert(
                r.try_get::<String, _>("entity_type").unwrap_or_default(),
                r.try_get::<i64, _>("count").unwrap_or(0),
            );
        }

        Ok(AuditStats {
            total: row.try_get("total").unwrap_or(0),
            last_24h: row.try_get("last_24h").unwrap_or(0),
            pending: row.try_get("pending").unwrap_or(0),
            failed: row.try_get("failed").unwrap_or(0),
            by_action,
            by_entity_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{AuditStatus, EntityType, TenantId};

    async fn setup(cap: u32) -> SqliteAuditLog {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();
        SqliteAuditLog::new(pool, cap)
    }

    fn draft(action: &str, status: AuditStatus) -> AuditEntryDraft {
        AuditEntryDraft {
            tenant_id: TenantId::parse("school-1").unwrap(),
            action: action.to_string(),
            entity_type: EntityType::parse("attendance_entry").unwrap(),
            entity_id: None,
            detail: format!("{action} recorded"),
            status,
            was_offline: true,
            error: None,
        }
    }

    #[tokio::test]
    async fn ring_evicts_oldest_beyond_cap() {
        let log = setup(3).await;
        for i in 0..5 {
            log.append(draft(&format!("queue_{i}"), AuditStatus::Pending))
                .await
                .unwrap();
        }

        let entries = log.filtered(AuditFilter::default()).await.unwrap();
        assert_eq!(entries.len(), 3);
        // Newest first; queue_0 and queue_1 were evicted.
        assert_eq!(entries[0].action, "queue_4");
        assert_eq!(entries[2].action, "queue_2");
    }

    #[tokio::test]
    async fn amend_updates_status_and_error() {
        let log = setup(10).await;
        let id = log.append(draft("sync", AuditStatus::Pending)).await.unwrap();

        log.amend(
            &id,
            AuditEntryPatch {
                status: Some(AuditStatus::Failed),
                detail: None,
                error: Some("server rejected".to_string()),
            },
        )
        .await
        .unwrap();

        let entries = log.filtered(AuditFilter::default()).await.unwrap();
        assert_eq!(entries[0].status, AuditStatus::Failed);
        assert_eq!(entries[0].error.as_deref(), Some("server rejected"));
    }

    #[tokio::test]
    async fn stats_count_statuses_and_breakdowns() {
        let log = setup(10).await;
        log.append(draft("queue", AuditStatus::Pending)).await.unwrap();
        log.append(draft("queue", AuditStatus::Success)).await.unwrap();
        log.append(draft("sync", AuditStatus::Failed)).await.unwrap();

        let stats = log.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.last_24h, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.by_action.get("queue"), Some(&2));
        assert_eq!(stats.by_entity_type.get("attendance_entry"), Some(&3));
    }

    #[tokio::test]
    async fn filter_by_status() {
        let log = setup(10).await;
        log.append(draft("queue", AuditStatus::Pending)).await.unwrap();
        log.append(draft("sync", AuditStatus::Failed)).await.unwrap();

        let failed = log
            .filtered(AuditFilter {
                status: Some(AuditStatus::Failed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].action, "sync");
    }
}
