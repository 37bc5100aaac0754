use crate::application::ports::AuditLog;
use crate::domain::entities::offline::{
    ActionPayload, AuditEntry, AuditEntryDraft, AuditEntryPatch, AuditFilter, AuditStats,
};
use crate::domain::value_objects::{AuditStatus, EntityType, QueueItemId, TenantId};
use crate::shared::error::Result;
use std::sync::Arc;

/// Local activity trail. Entries are advisory: an audit failure never
/// blocks the operation it describes.
pub struct AuditService {
    log: Arc<dyn AuditLog>,
}

impl AuditService {
    pub fn new(log: Arc<dyn AuditLog>) -> Self {
        Self { log }
    }

    pub async fn record(&self, draft: AuditEntryDraft) -> Result<String> {
        let id = self.log.append(draft).await?;
        Ok(id)
    }

    /// Entry for a mutation that went into the offline queue; flipped to
    /// success or failed once the sync engine settles it. The queue item
    /// id is stored as the entity id so the entry survives restarts as
    /// the join key.
    pub async fn record_queued(
        &self,
        tenant: &TenantId,
        action: &ActionPayload,
        queue_id: &QueueItemId,
        was_offline: bool,
    ) -> Result<String> {
        let entity_type = entity_type_for(action);
        self.record(AuditEntryDraft {
            tenant_id: tenant.clone(),
            action: action.kind().as_str().to_string(),
            entity_type,
            entity_id: Some(queue_id.as_str().to_string()),
            detail: action_detail(action),
            status: AuditStatus::Pending,
            was_offline,
            error: None,
        })
        .await
    }

    /// Resolves the pending entry for a queue item once the sync engine
    /// settles it. A missing entry (evicted by the ring cap) is not an
    /// error.
    pub async fn settle_queued(
        &self,
        queue_id: &QueueItemId,
        status: AuditStatus,
        error: Option<String>,
    ) -> Result<()> {
        let pending = self
            .trail(AuditFilter {
                status: Some(AuditStatus::Pending),
                ..Default::default()
            })
            .await?;
        if let Some(entry) = pending
            .iter()
            .find(|e| e.entity_id.as_deref() == Some(queue_id.as_str()))
        {
            self.mark_result(&entry.id, status, error).await?;
        }
        Ok(())
    }

    pub async fn mark_result(
        &self,
        id: &str,
        status: AuditStatus,
        error: Option<String>,
    ) -> Result<()> {
        self.log
            .amend(
                id,
                AuditEntryPatch {
                    status: Some(status),
                    detail: None,
                    error,
                },
            )
            .await
    }

    /// Matching entries, newest first.
    pub async fn trail(&self, filter: AuditFilter) -> Result<Vec<AuditEntry>> {
        self.log.filtered(filter).await
    }

    pub async fn stats(&self) -> Result<AuditStats> {
        self.log.stats().await
    }
}

fn entity_type_for(action: &ActionPayload) -> EntityType {
    let name = match action {
        ActionPayload::Attendance(_) => "attendance_records",
        ActionPayload::PeriodLog(_) => "period_logs",
        ActionPayload::BehaviorNote(_) => "behavior_notes",
        ActionPayload::Homework(_) => "homework",
        ActionPayload::QuickGrade(_) => "assessment_scores",
        ActionPayload::Message(_) => "messages",
        ActionPayload::SupportTicket(_) => "support_tickets",
        ActionPayload::Expense(_) => "expenses",
        ActionPayload::Payment(_) => "fee_payments",
        ActionPayload::LeaveRequest(_) => "leave_requests",
        ActionPayload::LeadUpdate(_) => "leads",
        ActionPayload::CallLog(_) => "call_logs",
    };
    EntityType::known(name)
}

fn action_detail(action: &ActionPayload) -> String {
    match action {
        ActionPayload::Attendance(p) => {
            format!("attendance {} for student {}", p.status, p.student_id)
        }
        ActionPayload::PeriodLog(p) => format!("period log for section {}", p.section_id),
        ActionPayload::BehaviorNote(p) => format!("behavior note for student {}", p.student_id),
        ActionPayload::Homework(p) => format!("homework for section {}", p.section_id),
        ActionPayload::QuickGrade(p) => format!(
            "grade {}/{} for student {}",
            p.score, p.max_score, p.student_id
        ),
        ActionPayload::Message(p) => format!("message in thread {}", p.thread_id),
        ActionPayload::SupportTicket(p) => format!("support ticket: {}", p.subject),
        ActionPayload::Expense(p) => format!("expense of {}", p.amount),
        ActionPayload::Payment(p) => {
            format!("payment of {} for invoice {}", p.amount, p.invoice_id)
        }
        ActionPayload::LeaveRequest(p) => format!("leave request by {}", p.staff_id),
        ActionPayload::LeadUpdate(p) => format!("lead {} -> {}", p.lead_id, p.status),
        ActionPayload::CallLog(p) => format!("call with {}", p.caller),
    }
}
