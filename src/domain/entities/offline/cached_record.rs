use crate::domain::value_objects::{EntityType, RecordId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One flattened snapshot of a server-side row.
///
/// Relational display labels ("class name" on a section, "student name" on
/// an invoice) are resolved into `payload` at cache-write time, while the
/// network is still available. The store never re-joins at read time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedRecord {
    pub record_id: RecordId,
    pub tenant_id: TenantId,
    pub entity_type: EntityType,
    pub payload: Value,
    pub cached_at: DateTime<Utc>,
}

impl CachedRecord {
    pub fn new(
        record_id: RecordId,
        tenant_id: TenantId,
        entity_type: EntityType,
        payload: Value,
    ) -> Self {
        Self {
            record_id,
            tenant_id,
            entity_type,
            payload,
            cached_at: Utc::now(),
        }
    }

    /// String field accessor used by the offline search scorer.
    pub fn field_str(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(Value::as_str)
    }
}
