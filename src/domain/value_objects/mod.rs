pub mod offline;

pub use offline::{
    AuditStatus, EntityType, LinkQuality, OfflineActionType, QueueItemId, RecordId, StaffRole,
    SyncPriority, TenantId,
};
