pub mod mappers;
pub mod rows;
pub mod sqlite_action_queue;
pub mod sqlite_audit_log;
pub mod sqlite_marker_store;
pub mod sqlite_record_store;

pub use sqlite_action_queue::SqliteActionQueue;
pub use sqlite_audit_log::SqliteAuditLog;
pub use sqlite_marker_store::SqliteMarkerStore;
pub use sqlite_record_store::SqliteRecordStore;
