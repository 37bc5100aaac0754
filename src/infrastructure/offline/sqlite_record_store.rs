use crate::application::ports::RecordStore;
use crate::domain::entities::offline::{CachedRecord, StorageUsage};
use crate::domain::value_objects::{EntityType, TenantId};
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::offline::mappers::cached_record_from_row;
use crate::infrastructure::offline::rows::CachedRecordRow;
use crate::shared::error::AppError;
use async_trait::async_trait;
use sqlx::Row;

pub struct SqliteRecordStore {
    pool: ConnectionPool,
    quota_bytes: u64,
}

impl SqliteRecordStore {
    pub fn new(pool: ConnectionPool, quota_bytes: u64) -> Self {
        Self { pool, quota_bytes }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn replace_all(
        &self,
        tenant: &TenantId,
        entity_type: &EntityType,
        records: Vec<CachedRecord>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.get_pool().begin().await?;

        sqlx::query("DELETE FROM record_cache WHERE tenant_id = ?1 AND entity_type = ?2")
            .bind(tenant.as_str())
            .bind(entity_type.as_str())
            .execute(&mut *tx)
            .await?;

        for record in &records {
            sqlx::query(
                r#"
                INSERT INTO record_cache (tenant_id, entity_type, record_id, payload, cached_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(tenant.as_str())
            .bind(entity_type.as_str())
            .bind(record.record_id.as_str())
            .bind(serde_json::to_string(&record.payload)?)
            .bind(record.cached_at.timestamp_millis())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn upsert(
        &self,
        tenant: &TenantId,
        entity_type: &EntityType,
        records: Vec<CachedRecord>,
    ) -> Result<(), AppError> {
        for record in &records {
            sqlx::query(
                r#"
                INSERT INTO record_cache (tenant_id, entity_type, record_id, payload, cached_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(tenant_id, entity_type, record_id) DO UPDATE SET
                    payload = excluded.payload,
                    cached_at = excluded.cached_at
                "#,
            )
            .bind(tenant.as_str())
            .bind(entity_type.as_str())
            .bind(record.record_id.as_str())
            .bind(serde_json::to_string(&record.payload)?)
            .bind(record.cached_at.timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;
        }
        Ok(())
    }

    async fn records(
        &self,
        tenant: &TenantId,
        entity_type: &EntityType,
    ) -> Result<Vec<CachedRecord>, AppError> {
        let rows = sqlx::query_as::<_, CachedRecordRow>(
            r#"
            SELECT tenant_id, entity_type, record_id, payload, cached_at
            FROM record_cache
            WHERE tenant_id = ?1 AND entity_type = ?2
            ORDER BY record_id ASC
            "#,
        )
        .bind(tenant.as_str())
        .bind(entity_type.as_str())
        .fetch_all(self.pool.get_pool())
        .await?;

        rows.into_iter().map(cached_record_from_row).collect()
    }

    async fn storage_usage(&self) -> Result<StorageUsage, AppError> {
        let row = sqlx::query(
            "SELECT page_count * page_size AS used FROM pragma_page_count(), pragma_page_size()",
        )
        .fetch_one(self.pool.get_pool())
        .await?;
        let used: i64 = row.try_get("used").unwrap_or(0);

        Ok(StorageUsage::new(used.max(0) as u64, self.quota_bytes))
    }
}
