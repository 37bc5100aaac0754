use crate::application::ports::{RemoteDataApi, RemoteError};
use crate::domain::entities::offline::{ActionPayload, LeadUpdatePayload};
use crate::domain::value_objects::TenantId;
use serde::Serialize;
use serde_json::{json, Value};

/// Maps one queued action onto its remote write.
///
/// Every insert-like action upserts on a client-generated key (or the
/// row's natural key), so replaying an item after a crash mid-pass lands
/// on the same row instead of duplicating it.
pub async fn apply_action(
    api: &dyn RemoteDataApi,
    tenant: &TenantId,
    action: &ActionPayload,
) -> Result<(), RemoteError> {
    match action {
        ActionPayload::Attendance(p) => {
            api.upsert(
                "attendance_records",
                row(tenant, p)?,
                "tenant_id,session_id,student_id",
            )
            .await
        }
        ActionPayload::PeriodLog(p) => {
            api.upsert(
                "period_logs",
                row(tenant, p)?,
                "tenant_id,section_id,date,period",
            )
            .await
        }
        ActionPayload::BehaviorNote(p) => {
            api.upsert("behavior_notes", row(tenant, p)?, "client_ref").await
        }
        ActionPayload::Homework(p) => api.upsert("homework", row(tenant, p)?, "client_ref").await,
        ActionPayload::QuickGrade(p) => {
            api.upsert(
                "assessment_scores",
                row(tenant, p)?,
                "tenant_id,assessment_id,student_id",
            )
            .await
        }
        ActionPayload::Message(p) => api.upsert("messages", row(tenant, p)?, "client_ref").await,
        ActionPayload::SupportTicket(p) => {
            api.upsert("support_tickets", row(tenant, p)?, "client_ref")
                .await
        }
        ActionPayload::Expense(p) => api.upsert("expenses", row(tenant, p)?, "client_ref").await,
        ActionPayload::Payment(p) => {
            api.upsert("fee_payments", row(tenant, p)?, "client_ref").await
        }
        ActionPayload::LeaveRequest(p) => {
            api.upsert("leave_requests", row(tenant, p)?, "client_ref")
                .await
        }
        ActionPayload::LeadUpdate(p) => apply_lead_update(api, tenant, p).await,
        ActionPayload::CallLog(p) => api.upsert("call_logs", row(tenant, p)?, "client_ref").await,
    }
}

/// Lead updates patch the existing row in place. FIFO draining keeps
/// sequential status changes for the same lead in order.
async fn apply_lead_update(
    api: &dyn RemoteDataApi,
    tenant: &TenantId,
    p: &LeadUpdatePayload,
) -> Result<(), RemoteError> {
    let mut patch = json!({
        "status": p.status,
        "updated_by": p.updated_by,
    });
    if let Some(follow_up) = &p.follow_up_on {
        patch["follow_up_on"] = json!(follow_up);
    }
    if let Some(note) = &p.note {
        patch["last_note"] = json!(note);
    }
    api.update(
        "leads",
        vec![
            ("tenant_id".to_string(), format!("eq.{}", tenant.as_str())),
            ("id".to_string(), format!("eq.{}", p.lead_id)),
        ],
        patch,
    )
    .await
}

/// Payload fields plus the tenant column the server partitions on.
fn row<T: Serialize>(tenant: &TenantId, payload: &T) -> Result<Value, RemoteError> {
    let mut value = serde_json::to_value(payload)
        .map_err(|e| RemoteError::terminal(format!("unserializable payload: {e}")))?;
    if let Some(object) = value.as_object_mut() {
        object.insert("tenant_id".to_string(), json!(tenant.as_str()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::SelectQuery;
    use crate::domain::entities::offline::{AttendancePayload, MessagePayload};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingApi {
        upserts: Mutex<Vec<(String, Value, String)>>,
        updates: Mutex<Vec<(String, Vec<(String, String)>, Value)>>,
    }

    #[async_trait]
    impl RemoteDataApi for RecordingApi {
        async fn select(&self, _: &str, _: SelectQuery) -> Result<Vec<Value>, RemoteError> {
            Ok(vec![])
        }

        async fn insert(&self, _: &str, _: Value) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn upsert(
            &self,
            table: &str,
            rows: Value,
            on_conflict: &str,
        ) -> Result<(), RemoteError> {
            self.upserts
                .lock()
                .unwrap()
                .push((table.to_string(), rows, on_conflict.to_string()));
            Ok(())
        }

        async fn update(
            &self,
            table: &str,
            filters: Vec<(String, String)>,
            patch: Value,
        ) -> Result<(), RemoteError> {
            self.updates
                .lock()
                .unwrap()
                .push((table.to_string(), filters, patch));
            Ok(())
        }

        async fn delete(&self, _: &str, _: Vec<(String, String)>) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn attendance_upserts_on_natural_key() {
        let api = RecordingApi::default();
        let tenant = TenantId::parse("school-a").unwrap();
        let action = ActionPayload::Attendance(AttendancePayload {
            session_id: "sess-1".into(),
            student_id: "stu-1".into(),
            status: "present".into(),
            recorded_by: "staff-1".into(),
            note: None,
        });

        apply_action(&api, &tenant, &action).await.unwrap();

        let upserts = api.upserts.lock().unwrap();
        let (table, rows, on_conflict) = &upserts[0];
        assert_eq!(table, "attendance_records");
        assert_eq!(on_conflict, "tenant_id,session_id,student_id");
        assert_eq!(rows["tenant_id"], "school-a");
        assert_eq!(rows["session_id"], "sess-1");
    }

    #[tokio::test]
    async fn message_upserts_on_client_ref() {
        let api = RecordingApi::default();
        let tenant = TenantId::parse("school-a").unwrap();
        let client_ref = Uuid::new_v4();
        let action = ActionPayload::Message(MessagePayload {
            client_ref,
            thread_id: "thread-1".into(),
            sender_id: "staff-1".into(),
            body: "running late".into(),
        });

        apply_action(&api, &tenant, &action).await.unwrap();

        let upserts = api.upserts.lock().unwrap();
        let (table, rows, on_conflict) = &upserts[0];
        assert_eq!(table, "messages");
        assert_eq!(on_conflict, "client_ref");
        assert_eq!(rows["client_ref"], client_ref.to_string());
    }

    #[tokio::test]
    async fn lead_update_patches_in_place() {
        let api = RecordingApi::default();
        let tenant = TenantId::parse("school-a").unwrap();
        let action = ActionPayload::LeadUpdate(LeadUpdatePayload {
            lead_id: "lead-7".into(),
            status: "follow_up".into(),
            follow_up_on: None,
            note: Some("call back Monday".into()),
            updated_by: "staff-2".into(),
        });

        apply_action(&api, &tenant, &action).await.unwrap();

        let updates = api.updates.lock().unwrap();
        let (table, filters, patch) = &updates[0];
        assert_eq!(table, "leads");
        assert!(filters.contains(&("id".to_string(), "eq.lead-7".to_string())));
        assert_eq!(patch["status"], "follow_up");
        assert_eq!(patch["last_note"], "call back Monday");
        assert!(patch.get("follow_up_on").is_none());
    }
}
