use crate::domain::value_objects::{AuditStatus, EntityType, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntryDraft {
    pub tenant_id: TenantId,
    pub action: String,
    pub entity_type: EntityType,
    pub entity_id: Option<String>,
    pub detail: String,
    pub status: AuditStatus,
    pub was_offline: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub id: String,
    pub tenant_id: TenantId,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub entity_type: EntityType,
    pub entity_id: Option<String>,
    pub detail: String,
    pub status: AuditStatus,
    pub was_offline: bool,
    pub error: Option<String>,
}

/// Partial update applied to an existing entry (e.g. pending → success
/// once the queued action lands on the server).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditEntryPatch {
    pub status: Option<AuditStatus>,
    pub detail: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditFilter {
    pub action: Option<String>,
    pub entity_type: Option<EntityType>,
    pub status: Option<AuditStatus>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditStats {
    pub total: i64,
    pub last_24h: i64,
    pub pending: i64,
    pub failed: i64,
    pub by_action: HashMap<String, i64>,
    pub by_entity_type: HashMap<String, i64>,
}
