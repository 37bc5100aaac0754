use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of mutations the offline queue knows how to replay.
///
/// Adding a variant forces the matching `ActionPayload` variant and applier
/// to exist before the code compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfflineActionType {
    Attendance,
    PeriodLog,
    BehaviorNote,
    Homework,
    QuickGrade,
    Message,
    SupportTicket,
    Expense,
    Payment,
    LeaveRequest,
    LeadUpdate,
    CallLog,
}

impl OfflineActionType {
    pub const ALL: [OfflineActionType; 12] = [
        OfflineActionType::Attendance,
        OfflineActionType::PeriodLog,
        OfflineActionType::BehaviorNote,
        OfflineActionType::Homework,
        OfflineActionType::QuickGrade,
        OfflineActionType::Message,
        OfflineActionType::SupportTicket,
        OfflineActionType::Expense,
        OfflineActionType::Payment,
        OfflineActionType::LeaveRequest,
        OfflineActionType::LeadUpdate,
        OfflineActionType::CallLog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OfflineActionType::Attendance => "attendance",
            OfflineActionType::PeriodLog => "period_log",
            OfflineActionType::BehaviorNote => "behavior_note",
            OfflineActionType::Homework => "homework",
            OfflineActionType::QuickGrade => "quick_grade",
            OfflineActionType::Message => "message",
            OfflineActionType::SupportTicket => "support_ticket",
            OfflineActionType::Expense => "expense",
            OfflineActionType::Payment => "payment",
            OfflineActionType::LeaveRequest => "leave_request",
            OfflineActionType::LeadUpdate => "lead_update",
            OfflineActionType::CallLog => "call_log",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("Unknown offline action type: {value}"))
    }
}

impl fmt::Display for OfflineActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_round_trips_through_its_string() {
        for kind in OfflineActionType::ALL {
            assert_eq!(OfflineActionType::parse(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_string_is_rejected() {
        assert!(OfflineActionType::parse("teleport").is_err());
    }
}
