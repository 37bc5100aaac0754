use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct CachedRecordRow {
    pub tenant_id: String,
    pub entity_type: String,
    pub record_id: String,
    pub payload: String,
    pub cached_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct QueueItemRow {
    pub id: String,
    pub tenant_id: String,
    pub action_type: String,
    pub payload: String,
    pub priority: String,
    pub retry_count: i64,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub synced_at: Option<i64>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SyncMarkerRow {
    pub tenant_id: String,
    pub role: String,
    pub last_prefetch_at: Option<i64>,
    pub last_sync_at: Option<i64>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AuditEntryRow {
    pub id: String,
    pub tenant_id: String,
    pub timestamp: i64,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub detail: String,
    pub status: String,
    pub was_offline: bool,
    pub error: Option<String>,
}
