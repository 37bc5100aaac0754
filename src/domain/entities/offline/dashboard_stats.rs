use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate KPI bundle cached by prefetch so the dashboard renders
/// instantly while offline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    pub student_count: u64,
    pub staff_count: u64,
    pub section_count: u64,
    pub open_lead_count: u64,
    pub revenue_to_date: f64,
    /// Fraction of present marks over the trailing attendance window.
    pub attendance_rate: f64,
    pub computed_at: Option<DateTime<Utc>>,
}
