use crate::application::ports::SyncMarkerStore;
use crate::domain::entities::offline::PrefetchMarker;
use crate::domain::value_objects::{StaffRole, TenantId};
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::offline::mappers::{millis_to_datetime, prefetch_marker_from_row};
use crate::infrastructure::offline::rows::SyncMarkerRow;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Role is stored as '' for the whole-tenant marker so (tenant, role) can
/// be the primary key.
pub struct SqliteMarkerStore {
    pool: ConnectionPool,
}

impl SqliteMarkerStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    fn role_key(role: Option<StaffRole>) -> &'static str {
        role.map(|r| r.as_str()).unwrap_or("")
    }
}

#[async_trait]
impl SyncMarkerStore for SqliteMarkerStore {
    async fn last_prefetch(
        &self,
        tenant: &TenantId,
        role: Option<StaffRole>,
    ) -> Result<Option<PrefetchMarker>, AppError> {
        let row = sqlx::query_as::<_, SyncMarkerRow>(
            r#"
            SELECT tenant_id, role, last_prefetch_at, last_sync_at
            FROM sync_markers WHERE tenant_id = ?1 AND role = ?2
            "#,
        )
        .bind(tenant.as_str())
        .bind(Self::role_key(role))
        .fetch_optional(self.pool.get_pool())
        .await?;

        row.map(prefetch_marker_from_row)
            .transpose()
            .map(Option::flatten)
    }

    async fn mark_prefetched(
        &self,
        tenant: &TenantId,
        role: Option<StaffRole>,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sync_markers (tenant_id, role, last_prefetch_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(tenant_id, role) DO UPDATE SET
                last_prefetch_at = excluded.last_prefetch_at
            "#,
        )
        .bind(tenant.as_str())
        .bind(Self::role_key(role))
        .bind(at.timestamp_millis())
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }

    async fn last_sync(&self, tenant: &TenantId) -> Result<Option<DateTime<Utc>>, AppError> {
        let row = sqlx::query_as::<_, SyncMarkerRow>(
            r#"
            SELECT tenant_id, role, last_prefetch_at, last_sync_at
            FROM sync_markers WHERE tenant_id = ?1 AND role = ''
            "#,
        )
        .bind(tenant.as_str())
        .fetch_optional(self.pool.get_pool())
        .await?;

        row.and_then(|r| r.last_sync_at)
            .map(millis_to_datetime)
            .transpose()
    }

    async fn mark_synced_pass(
        &self,
        tenant: &TenantId,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sync_markers (tenant_id, role, last_sync_at)
            VALUES (?1, '', ?2)
            ON CONFLICT(tenant_id, role) DO UPDATE SET
                last_sync_at = excluded.last_sync_at
            "#,
        )
        .bind(tenant.as_str())
        .bind(at.timestamp_millis())
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> SqliteMarkerStore {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();
        SqliteMarkerStore::new(pool)
    }

    fn tenant() -> TenantId {
        TenantId::parse("school-1").unwrap()
    }

    #[tokio::test]
    async fn prefetch_markers_are_role_scoped() {
        let store = setup().await;
        let now = Utc::now();

        store
            .mark_prefetched(&tenant(), Some(StaffRole::Teacher), now)
            .await
            .unwrap();

        let marker = store
            .last_prefetch(&tenant(), Some(StaffRole::Teacher))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(marker.tenant_id, tenant());
        assert_eq!(marker.role, Some(StaffRole::Teacher));
        assert_eq!(
            marker.last_prefetch_at.timestamp_millis(),
            now.timestamp_millis()
        );
        assert!(store.last_prefetch(&tenant(), None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sync_pass_marker_upserts() {
        let store = setup().await;
        let first = Utc::now();

        store.mark_synced_pass(&tenant(), first).await.unwrap();
        let later = first + chrono::Duration::minutes(5);
        store.mark_synced_pass(&tenant(), later).await.unwrap();

        let stored = store.last_sync(&tenant()).await.unwrap().unwrap();
        assert_eq!(stored.timestamp_millis(), later.timestamp_millis());

        // A sync-only marker row is not a prefetch marker.
        assert!(store.last_prefetch(&tenant(), None).await.unwrap().is_none());
    }
}
