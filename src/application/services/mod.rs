pub mod audit_service;
pub mod connectivity_service;
pub mod prefetch_service;
pub mod queue_service;
pub mod read_service;
pub mod search_service;
pub mod sync_appliers;
pub mod sync_service;

pub use audit_service::AuditService;
pub use connectivity_service::ConnectivityService;
pub use prefetch_service::{PrefetchOutcome, PrefetchScope, PrefetchService};
pub use queue_service::QueueService;
pub use read_service::ReadService;
pub use search_service::SearchService;
pub use sync_service::SyncService;
