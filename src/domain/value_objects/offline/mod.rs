mod action_type;
mod audit_status;
mod entity_type;
mod link_quality;
mod priority;
mod queue_item_id;
mod record_id;
mod staff_role;
mod tenant_id;

pub use action_type::OfflineActionType;
pub use audit_status::AuditStatus;
pub use entity_type::EntityType;
pub use link_quality::LinkQuality;
pub use priority::SyncPriority;
pub use queue_item_id::QueueItemId;
pub use record_id::RecordId;
pub use staff_role::StaffRole;
pub use tenant_id::TenantId;
