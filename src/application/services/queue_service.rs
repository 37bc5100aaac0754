use crate::application::ports::{ActionQueue, PermissionGate};
use crate::application::services::audit_service::AuditService;
use crate::domain::entities::offline::{ActionPayload, QueueItem, QueueItemDraft, QueueStats};
use crate::domain::value_objects::{QueueItemId, SyncPriority, StaffRole, TenantId};
use crate::shared::config::SyncConfig;
use crate::shared::error::{AppError, Result};
use std::sync::Arc;

/// Write entry point for every offline-capable mutation. Enqueue is
/// local-only and always succeeds when the device has disk; the network
/// never appears on this path.
pub struct QueueService {
    queue: Arc<dyn ActionQueue>,
    gate: Arc<dyn PermissionGate>,
    audit: Arc<AuditService>,
    config: SyncConfig,
}

impl QueueService {
    pub fn new(
        queue: Arc<dyn ActionQueue>,
        gate: Arc<dyn PermissionGate>,
        audit: Arc<AuditService>,
        config: SyncConfig,
    ) -> Self {
        Self {
            queue,
            gate,
            audit,
            config,
        }
    }

    pub async fn queue_action(
        &self,
        tenant: &TenantId,
        role: Option<StaffRole>,
        action: ActionPayload,
        priority: SyncPriority,
        was_offline: bool,
    ) -> Result<QueueItemId> {
        if !self.gate.can_act(tenant, role).await? {
            return Err(AppError::PermissionDenied(format!(
                "session may not act for tenant {tenant}"
            )));
        }

        let kind = action.kind();
        let id = self
            .queue
            .enqueue(QueueItemDraft::new(tenant.clone(), action.clone(), priority))
            .await?;

        if let Err(e) = self
            .audit
            .record_queued(tenant, &action, &id, was_offline)
            .await
        {
            tracing::warn!(target: "offline::queue", error = %e, "audit append failed");
        }

        tracing::info!(
            target: "offline::queue",
            tenant = %tenant,
            action = kind.as_str(),
            queue_id = id.as_str(),
            was_offline,
            "action queued"
        );
        Ok(id)
    }

    /// Unsynced items, oldest first.
    pub async fn pending_actions(&self, tenant: &TenantId) -> Result<Vec<QueueItem>> {
        self.queue.pending(tenant).await
    }

    pub async fn pending_count(&self, tenant: &TenantId) -> Result<usize> {
        Ok(self.queue.pending(tenant).await?.len())
    }

    pub async fn stats(&self, tenant: &TenantId) -> Result<QueueStats> {
        self.queue.stats(tenant, self.config.max_retries).await
    }

    /// Drops synced items past the retention window.
    pub async fn purge_synced(&self) -> Result<u64> {
        let removed = self
            .queue
            .purge_synced_older_than(self.config.purge_after_hours)
            .await?;
        if removed > 0 {
            tracing::debug!(target: "offline::queue", removed, "purged synced queue items");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::AuditLog;
    use crate::domain::entities::offline::AttendancePayload;
    use crate::infrastructure::database::ConnectionPool;
    use crate::infrastructure::offline::{SqliteActionQueue, SqliteAuditLog};
    use async_trait::async_trait;

    struct DenyGate;

    #[async_trait]
    impl PermissionGate for DenyGate {
        async fn can_act(&self, _: &TenantId, _: Option<StaffRole>) -> Result<bool> {
            Ok(false)
        }
    }

    struct AllowGate;

    #[async_trait]
    impl PermissionGate for AllowGate {
        async fn can_act(&self, _: &TenantId, _: Option<StaffRole>) -> Result<bool> {
            Ok(true)
        }
    }

    async fn service(gate: Arc<dyn PermissionGate>) -> (QueueService, Arc<dyn AuditLog>) {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();
        let log: Arc<dyn AuditLog> = Arc::new(SqliteAuditLog::new(pool.clone(), 500));
        let svc = QueueService::new(
            Arc::new(SqliteActionQueue::new(pool)),
            gate,
            Arc::new(AuditService::new(log.clone())),
            SyncConfig::default(),
        );
        (svc, log)
    }

    fn attendance() -> ActionPayload {
        ActionPayload::Attendance(AttendancePayload {
            session_id: "sess-1".into(),
            student_id: "stu-1".into(),
            status: "present".into(),
            recorded_by: "staff-1".into(),
            note: None,
        })
    }

    #[tokio::test]
    async fn queue_action_persists_and_audits() {
        let tenant = TenantId::parse("school-a").unwrap();
        let (svc, log) = service(Arc::new(AllowGate)).await;

        let id = svc
            .queue_action(
                &tenant,
                Some(StaffRole::Teacher),
                attendance(),
                SyncPriority::High,
                true,
            )
            .await
            .unwrap();

        let pending = svc.pending_actions(&tenant).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
        assert_eq!(pending[0].retry_count, 0);

        let trail = log.filtered(Default::default()).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].entity_id.as_deref(), Some(id.as_str()));
        assert!(trail[0].was_offline);
    }

    #[tokio::test]
    async fn denied_session_cannot_enqueue() {
        let tenant = TenantId::parse("school-a").unwrap();
        let (svc, _) = service(Arc::new(DenyGate)).await;

        let err = svc
            .queue_action(
                &tenant,
                Some(StaffRole::Parent),
                attendance(),
                SyncPriority::Medium,
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
        assert_eq!(svc.pending_count(&tenant).await.unwrap(), 0);
    }
}
