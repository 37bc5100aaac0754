pub mod action_queue;
pub mod audit_log;
pub mod link_probe;
pub mod permission_gate;
pub mod record_store;
pub mod remote_api;
pub mod sync_marker_store;

pub use action_queue::ActionQueue;
pub use audit_log::AuditLog;
pub use link_probe::{LinkProbe, ProbeError};
pub use permission_gate::PermissionGate;
pub use record_store::RecordStore;
pub use remote_api::{RemoteDataApi, RemoteError, RemoteErrorKind, SelectQuery};
pub use sync_marker_store::SyncMarkerStore;
