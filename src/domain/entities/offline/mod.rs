pub mod action_payload;
pub mod audit_entry;
pub mod cached_record;
pub mod connection;
pub mod dashboard_stats;
pub mod prefetch_marker;
pub mod queue_item;
pub mod read_outcome;
pub mod search;
pub mod storage_usage;
pub mod sync_summary;

pub use action_payload::{
    ActionPayload, AttendancePayload, BehaviorNotePayload, CallLogPayload, ExpensePayload,
    HomeworkPayload, LeadUpdatePayload, LeaveRequestPayload, MessagePayload, PaymentPayload,
    PeriodLogPayload, QuickGradePayload, SupportTicketPayload,
};
pub use audit_entry::{AuditEntry, AuditEntryDraft, AuditEntryPatch, AuditFilter, AuditStats};
pub use cached_record::CachedRecord;
pub use connection::{ConnectionSnapshot, NativeLinkSignal, SyncEstimate, RTT_SENTINEL_MS};
pub use dashboard_stats::DashboardStats;
pub use prefetch_marker::PrefetchMarker;
pub use queue_item::{QueueItem, QueueItemDraft};
pub use read_outcome::ReadOutcome;
pub use search::{SearchGroup, SearchHit};
pub use storage_usage::StorageUsage;
pub use sync_summary::{QueueStats, SyncSummary};
