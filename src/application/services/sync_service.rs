use crate::application::ports::{ActionQueue, RemoteDataApi, SyncMarkerStore};
use crate::application::services::audit_service::AuditService;
use crate::application::services::sync_appliers::apply_action;
use crate::domain::entities::offline::{ConnectionSnapshot, SyncSummary};
use crate::domain::value_objects::{AuditStatus, QueueItemId, TenantId};
use crate::shared::config::SyncConfig;
use crate::shared::error::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

/// Drains the offline queue against the remote API, one item at a time,
/// oldest first. Each item gets one network attempt per pass; a failed
/// item picks up a backoff wait on the next pass instead of being
/// hammered in place.
///
/// Only one pass runs at a time; a trigger arriving mid-pass is dropped
/// rather than queued, since the running pass already covers its items.
pub struct SyncService {
    queue: Arc<dyn ActionQueue>,
    remote: Arc<dyn RemoteDataApi>,
    markers: Arc<dyn SyncMarkerStore>,
    audit: Arc<AuditService>,
    link: watch::Receiver<ConnectionSnapshot>,
    config: SyncConfig,
    pass_gate: Mutex<()>,
}

impl SyncService {
    pub fn new(
        queue: Arc<dyn ActionQueue>,
        remote: Arc<dyn RemoteDataApi>,
        markers: Arc<dyn SyncMarkerStore>,
        audit: Arc<AuditService>,
        link: watch::Receiver<ConnectionSnapshot>,
        config: SyncConfig,
    ) -> Self {
        Self {
            queue,
            remote,
            markers,
            audit,
            link,
            config,
            pass_gate: Mutex::new(()),
        }
    }

    /// Runs one sync pass for the tenant. A no-op while offline or while
    /// another pass is in flight. Terminal rejections fail immediately
    /// without burning retries; transient failures increment the retry
    /// count and wait for the next pass.
    pub async fn sync_pending(&self, tenant: &TenantId) -> Result<SyncSummary> {
        if !self.link.borrow().online {
            tracing::debug!(target: "offline::sync", tenant = %tenant, "offline, pass skipped");
            return self.idle_summary(tenant).await;
        }
        let Ok(_guard) = self.pass_gate.try_lock() else {
            tracing::debug!(target: "offline::sync", tenant = %tenant, "pass already running, trigger dropped");
            return self.idle_summary(tenant).await;
        };

        let pending = self.queue.pending(tenant).await?;
        let mut summary = SyncSummary::default();

        for item in pending {
            // Capped items stay visible as failed but never hit the
            // network again.
            if item.retry_count >= self.config.max_retries {
                summary.failed += 1;
                continue;
            }

            if item.retry_count > 0 {
                let delay = backoff_delay(
                    item.retry_count,
                    self.config.backoff_base_ms,
                    self.config.backoff_cap_ms,
                );
                tracing::debug!(
                    target: "offline::sync",
                    queue_id = item.id.as_str(),
                    retry_count = item.retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }

            match apply_action(self.remote.as_ref(), tenant, &item.action).await {
                Ok(()) => {
                    self.queue.mark_synced(&item.id).await?;
                    self.settle_audit(&item.id, AuditStatus::Success, None).await;
                    summary.synced += 1;
                }
                Err(e) if e.is_terminal() => {
                    tracing::warn!(
                        target: "offline::sync",
                        queue_id = item.id.as_str(),
                        error = %e,
                        "remote rejected action, not retrying"
                    );
                    self.queue
                        .mark_failed(&item.id, &e.to_string(), self.config.max_retries)
                        .await?;
                    self.settle_audit(&item.id, AuditStatus::Failed, Some(e.to_string()))
                        .await;
                    summary.failed += 1;
                }
                Err(e) => {
                    let attempts = item.retry_count + 1;
                    self.queue.increment_retry(&item.id, &e.to_string()).await?;
                    if attempts >= self.config.max_retries {
                        tracing::warn!(
                            target: "offline::sync",
                            queue_id = item.id.as_str(),
                            attempts,
                            error = %e,
                            "retries exhausted"
                        );
                        self.settle_audit(&item.id, AuditStatus::Failed, Some(e.to_string()))
                            .await;
                        summary.failed += 1;
                    } else {
                        tracing::debug!(
                            target: "offline::sync",
                            queue_id = item.id.as_str(),
                            attempts,
                            error = %e,
                            "transient failure, will retry next pass"
                        );
                    }
                }
            }
        }

        self.markers.mark_synced_pass(tenant, Utc::now()).await?;
        self.queue
            .purge_synced_older_than(self.config.purge_after_hours)
            .await?;

        let stats = self.queue.stats(tenant, self.config.max_retries).await?;
        summary.remaining = stats.pending.max(0) as u32;

        tracing::info!(
            target: "offline::sync",
            tenant = %tenant,
            synced = summary.synced,
            failed = summary.failed,
            remaining = summary.remaining,
            "sync pass finished"
        );
        Ok(summary)
    }

    pub async fn last_sync(&self, tenant: &TenantId) -> Result<Option<DateTime<Utc>>> {
        self.markers.last_sync(tenant).await
    }

    /// Zero-work summary for skipped passes, still reporting how much is
    /// waiting.
    async fn idle_summary(&self, tenant: &TenantId) -> Result<SyncSummary> {
        let stats = self.queue.stats(tenant, self.config.max_retries).await?;
        Ok(SyncSummary {
            synced: 0,
            failed: 0,
            remaining: stats.pending.max(0) as u32,
        })
    }

    async fn settle_audit(&self, id: &QueueItemId, status: AuditStatus, error: Option<String>) {
        if let Err(e) = self.audit.settle_queued(id, status, error).await {
            tracing::warn!(target: "offline::sync", error = %e, "audit settle failed");
        }
    }
}

/// Delay before re-attempting an item carrying `retry_count` failures:
/// min(base * 2^retry_count, cap).
fn backoff_delay(retry_count: u32, base_ms: u64, cap_ms: u64) -> Duration {
    let exponent = retry_count.min(16);
    Duration::from_millis(base_ms.saturating_mul(1 << exponent).min(cap_ms))
}
