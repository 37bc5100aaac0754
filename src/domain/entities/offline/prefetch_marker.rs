use crate::domain::value_objects::{StaffRole, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last successful full prefetch per (tenant, optional role). Purely a
/// cost control: a missing or stale marker never blocks reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrefetchMarker {
    pub tenant_id: TenantId,
    pub role: Option<StaffRole>,
    pub last_prefetch_at: DateTime<Utc>,
}
