use crate::domain::entities::offline::PrefetchMarker;
use crate::domain::value_objects::{StaffRole, TenantId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persists the per-(tenant, role) prefetch cool-down markers and the
/// per-tenant last-sync timestamp.
#[async_trait]
pub trait SyncMarkerStore: Send + Sync {
    async fn last_prefetch(
        &self,
        tenant: &TenantId,
        role: Option<StaffRole>,
    ) -> Result<Option<PrefetchMarker>, AppError>;

    async fn mark_prefetched(
        &self,
        tenant: &TenantId,
        role: Option<StaffRole>,
        at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn last_sync(&self, tenant: &TenantId) -> Result<Option<DateTime<Utc>>, AppError>;

    async fn mark_synced_pass(&self, tenant: &TenantId, at: DateTime<Utc>)
        -> Result<(), AppError>;
}
