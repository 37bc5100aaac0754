use crate::domain::entities::offline::{CachedRecord, StorageUsage};
use crate::domain::value_objects::{EntityType, TenantId};
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Local Record Store: the durable, tenant-partitioned cache of server
/// rows everything else reads and writes through.
///
/// Cache-write callers must tolerate failure as "cache unchanged" - the
/// services log at warn and move on rather than surfacing store errors to
/// the user path.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Whole-entity-type cache replacement: drops the tenant's existing
    /// records of this type and stores `records` in one transaction.
    async fn replace_all(
        &self,
        tenant: &TenantId,
        entity_type: &EntityType,
        records: Vec<CachedRecord>,
    ) -> Result<(), AppError>;

    /// By-id upsert within the tenant's partition; the newest write wins.
    async fn upsert(
        &self,
        tenant: &TenantId,
        entity_type: &EntityType,
        records: Vec<CachedRecord>,
    ) -> Result<(), AppError>;

    async fn records(
        &self,
        tenant: &TenantId,
        entity_type: &EntityType,
    ) -> Result<Vec<CachedRecord>, AppError>;

    async fn storage_usage(&self) -> Result<StorageUsage, AppError>;
}
