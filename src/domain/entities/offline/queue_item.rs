use crate::domain::entities::offline::ActionPayload;
use crate::domain::value_objects::{QueueItemId, SyncPriority, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What `queue_action` hands to the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueItemDraft {
    pub tenant_id: TenantId,
    pub action: ActionPayload,
    pub priority: SyncPriority,
}

impl QueueItemDraft {
    pub fn new(tenant_id: TenantId, action: ActionPayload, priority: SyncPriority) -> Self {
        Self {
            tenant_id,
            action,
            priority,
        }
    }
}

/// A pending (or settled) mutation in the durable queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueItem {
    pub id: QueueItemId,
    pub tenant_id: TenantId,
    pub action: ActionPayload,
    pub priority: SyncPriority,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl QueueItem {
    pub fn is_pending(&self) -> bool {
        self.synced_at.is_none()
    }
}
