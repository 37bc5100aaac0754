use crate::domain::value_objects::OfflineActionType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tagged union of everything the queue can carry.
///
/// Each variant's shape is exactly what its sync applier maps onto the
/// remote write, so a malformed payload cannot reach an applier: it fails
/// deserialization at the queue boundary instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ActionPayload {
    Attendance(AttendancePayload),
    PeriodLog(PeriodLogPayload),
    BehaviorNote(BehaviorNotePayload),
    Homework(HomeworkPayload),
    QuickGrade(QuickGradePayload),
    Message(MessagePayload),
    SupportTicket(SupportTicketPayload),
    Expense(ExpensePayload),
    Payment(PaymentPayload),
    LeaveRequest(LeaveRequestPayload),
    LeadUpdate(LeadUpdatePayload),
    CallLog(CallLogPayload),
}

impl ActionPayload {
    pub fn kind(&self) -> OfflineActionType {
        match self {
            ActionPayload::Attendance(_) => OfflineActionType::Attendance,
            ActionPayload::PeriodLog(_) => OfflineActionType::PeriodLog,
            ActionPayload::BehaviorNote(_) => OfflineActionType::BehaviorNote,
            ActionPayload::Homework(_) => OfflineActionType::Homework,
            ActionPayload::QuickGrade(_) => OfflineActionType::QuickGrade,
            ActionPayload::Message(_) => OfflineActionType::Message,
            ActionPayload::SupportTicket(_) => OfflineActionType::SupportTicket,
            ActionPayload::Expense(_) => OfflineActionType::Expense,
            ActionPayload::Payment(_) => OfflineActionType::Payment,
            ActionPayload::LeaveRequest(_) => OfflineActionType::LeaveRequest,
            ActionPayload::LeadUpdate(_) => OfflineActionType::LeadUpdate,
            ActionPayload::CallLog(_) => OfflineActionType::CallLog,
        }
    }
}

/// Upserts on (session_id, student_id); replay-safe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttendancePayload {
    pub session_id: String,
    pub student_id: String,
    pub status: String,
    pub recorded_by: String,
    pub note: Option<String>,
}

/// Upserts on (section_id, date, period).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodLogPayload {
    pub section_id: String,
    pub date: NaiveDate,
    pub period: u32,
    pub subject_id: Option<String>,
    pub summary: String,
    pub logged_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BehaviorNotePayload {
    pub client_ref: Uuid,
    pub student_id: String,
    pub category: String,
    pub note: String,
    pub severity: Option<String>,
    pub reported_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HomeworkPayload {
    pub client_ref: Uuid,
    pub section_id: String,
    pub subject_id: Option<String>,
    pub title: String,
    pub instructions: Option<String>,
    pub due_date: NaiveDate,
    pub assigned_by: String,
}

/// Upserts on (assessment_id, student_id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuickGradePayload {
    pub assessment_id: String,
    pub student_id: String,
    pub score: f64,
    pub max_score: f64,
    pub graded_by: String,
}

/// `client_ref` is generated at enqueue time and upserted on, so a sync
/// pass resumed after a crash cannot double-deliver the message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessagePayload {
    pub client_ref: Uuid,
    pub thread_id: String,
    pub sender_id: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupportTicketPayload {
    pub client_ref: Uuid,
    pub raised_by: String,
    pub category: String,
    pub subject: String,
    pub description: String,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpensePayload {
    pub client_ref: Uuid,
    pub category: String,
    pub amount: f64,
    pub incurred_on: NaiveDate,
    pub memo: Option<String>,
    pub recorded_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentPayload {
    pub client_ref: Uuid,
    pub invoice_id: String,
    pub amount: f64,
    pub method: String,
    pub received_on: NaiveDate,
    pub received_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaveRequestPayload {
    pub client_ref: Uuid,
    pub staff_id: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub reason: String,
}

/// Updates the lead row in place; sequential status updates for the same
/// lead are order-dependent, which is why the queue drains FIFO.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeadUpdatePayload {
    pub lead_id: String,
    pub status: String,
    pub follow_up_on: Option<NaiveDate>,
    pub note: Option<String>,
    pub updated_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallLogPayload {
    pub client_ref: Uuid,
    pub lead_id: Option<String>,
    pub caller: String,
    pub direction: String,
    pub summary: String,
    pub logged_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips_with_matching_kind_tag() {
        let payload = ActionPayload::Attendance(AttendancePayload {
            session_id: "sess-1".into(),
            student_id: "stu-9".into(),
            status: "present".into(),
            recorded_by: "staff-3".into(),
            note: None,
        });

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "attendance");

        let back: ActionPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
        assert_eq!(back.kind().as_str(), "attendance");
    }

    #[test]
    fn mismatched_kind_and_data_fail_to_deserialize() {
        let raw = serde_json::json!({
            "kind": "message",
            "data": { "session_id": "s", "student_id": "x" }
        });
        assert!(serde_json::from_value::<ActionPayload>(raw).is_err());
    }
}
