use crate::domain::entities::offline::{
    ActionPayload, AuditEntry, CachedRecord, PrefetchMarker, QueueItem,
};
use crate::domain::value_objects::{
    AuditStatus, EntityType, QueueItemId, RecordId, StaffRole, SyncPriority, TenantId,
};
use crate::infrastructure::offline::rows::{
    AuditEntryRow, CachedRecordRow, QueueItemRow, SyncMarkerRow,
};
use crate::shared::error::AppError;
use chrono::{DateTime, TimeZone, Utc};

// Timestamps persist as epoch milliseconds; seconds are too coarse to keep
// FIFO order for actions queued in the same second.

pub(crate) fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>, AppError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| AppError::Database(format!("Invalid stored timestamp: {millis}")))
}

pub(crate) fn cached_record_from_row(row: CachedRecordRow) -> Result<CachedRecord, AppError> {
    Ok(CachedRecord {
        record_id: RecordId::new(row.record_id).map_err(AppError::Database)?,
        tenant_id: TenantId::new(row.tenant_id).map_err(AppError::Database)?,
        entity_type: EntityType::new(row.entity_type).map_err(AppError::Database)?,
        payload: serde_json::from_str(&row.payload)?,
        cached_at: millis_to_datetime(row.cached_at)?,
    })
}

pub(crate) fn queue_item_from_row(row: QueueItemRow) -> Result<QueueItem, AppError> {
    let action: ActionPayload = serde_json::from_str(&row.payload)?;
    Ok(QueueItem {
        id: QueueItemId::parse(&row.id).map_err(AppError::Database)?,
        tenant_id: TenantId::new(row.tenant_id).map_err(AppError::Database)?,
        action,
        priority: SyncPriority::parse(&row.priority).map_err(AppError::Database)?,
        retry_count: row.retry_count.max(0) as u32,
        last_error: row.last_error,
        created_at: millis_to_datetime(row.created_at)?,
        synced_at: row.synced_at.map(millis_to_datetime).transpose()?,
    })
}

/// A marker row with no prefetch stamp (only a sync stamp) maps to None.
pub(crate) fn prefetch_marker_from_row(
    row: SyncMarkerRow,
) -> Result<Option<PrefetchMarker>, AppError> {
    let Some(at) = row.last_prefetch_at else {
        return Ok(None);
    };
    let role = if row.role.is_empty() {
        None
    } else {
        Some(StaffRole::parse(&row.role).map_err(AppError::Database)?)
    };
    Ok(Some(PrefetchMarker {
        tenant_id: TenantId::new(row.tenant_id).map_err(AppError::Database)?,
        role,
        last_prefetch_at: millis_to_datetime(at)?,
    }))
}

pub(crate) fn audit_entry_from_row(row: AuditEntryRow) -> Result<AuditEntry, AppError> {
    Ok(AuditEntry {
        id: row.id,
        tenant_id: TenantId::new(row.tenant_id).map_err(AppError::Database)?,
        timestamp: millis_to_datetime(row.timestamp)?,
        action: row.action,
        entity_type: EntityType::new(row.entity_type).map_err(AppError::Database)?,
        entity_id: row.entity_id,
        detail: row.detail,
        status: AuditStatus::parse(&row.status).map_err(AppError::Database)?,
        was_offline: row.was_offline,
        error: row.error,
    })
}
