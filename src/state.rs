use crate::application::services::{
    AuditService, ConnectivityService, PrefetchScope, PrefetchService, QueueService, ReadService,
    SearchService, SyncService,
};
use crate::domain::entities::offline::SyncEstimate;
use crate::domain::value_objects::TenantId;
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::offline::{
    SqliteActionQueue, SqliteAuditLog, SqliteMarkerStore, SqliteRecordStore,
};
use crate::infrastructure::remote::{HttpDataApi, HttpLinkProbe};
use crate::infrastructure::session::ClaimsPermissionGate;
use crate::shared::config::AppConfig;
use crate::shared::error::{AppError, Result};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Composition root: opens the local database, builds the service graph
/// and owns the background tasks' lifetime.
pub struct AppState {
    pub config: AppConfig,
    pub gate: Arc<ClaimsPermissionGate>,
    pub connectivity: Arc<ConnectivityService>,
    pub queue: Arc<QueueService>,
    pub sync: Arc<SyncService>,
    pub prefetch: Arc<PrefetchService>,
    pub read: Arc<ReadService>,
    pub search: Arc<SearchService>,
    pub audit: Arc<AuditService>,
    pool: ConnectionPool,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> Result<Self> {
        config.validate().map_err(AppError::Configuration)?;

        let pool =
            ConnectionPool::new(&config.database.url, config.database.max_connections).await?;
        pool.migrate().await?;

        let record_store = Arc::new(SqliteRecordStore::new(
            pool.clone(),
            config.storage.quota_bytes,
        ));
        let action_queue = Arc::new(SqliteActionQueue::new(pool.clone()));
        let markers = Arc::new(SqliteMarkerStore::new(pool.clone()));
        let audit_log = Arc::new(SqliteAuditLog::new(pool.clone(), config.storage.audit_cap));

        let remote = Arc::new(HttpDataApi::new(&config.remote)?);
        let probe = Arc::new(HttpLinkProbe::new(&config.remote, &config.connectivity)?);
        let gate = Arc::new(ClaimsPermissionGate::new());

        let audit = Arc::new(AuditService::new(audit_log));
        let connectivity = Arc::new(ConnectivityService::new(probe, &config.connectivity));
        let queue = Arc::new(QueueService::new(
            action_queue.clone(),
            gate.clone(),
            audit.clone(),
            config.sync.clone(),
        ));
        let sync = Arc::new(SyncService::new(
            action_queue,
            remote.clone(),
            markers.clone(),
            audit.clone(),
            connectivity.subscribe(),
            config.sync.clone(),
        ));
        let read = Arc::new(ReadService::new(record_store, connectivity.subscribe()));
        let prefetch = Arc::new(PrefetchService::new(
            remote,
            read.clone(),
            markers,
            gate.clone(),
            connectivity.subscribe(),
            config.prefetch.clone(),
        ));
        let search = Arc::new(SearchService::new(
            read.clone(),
            config.storage.search_result_cap,
        ));

        tracing::info!(target: "offline::state", "offline core initialized");
        Ok(Self {
            config,
            gate,
            connectivity,
            queue,
            sync,
            prefetch,
            read,
            search,
            audit,
            pool,
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Starts the periodic link probe and the reconnect watcher for the
    /// signed-in tenant. The watcher drains the queue and re-warms the
    /// cache on every offline→online edge.
    pub fn spawn_background(&self, tenant: TenantId) {
        let probe_task = self.connectivity.spawn_probe_loop(self.shutdown.clone());

        let connectivity = self.connectivity.clone();
        let sync = self.sync.clone();
        let prefetch = self.prefetch.clone();
        let token = self.shutdown.clone();
        let watcher = tokio::spawn(async move {
            let mut rx = connectivity.subscribe();
            let mut was_online = rx.borrow().online;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let online = rx.borrow().online;
                        if online && !was_online {
                            tracing::info!(target: "offline::state", tenant = %tenant, "back online");
                            if let Err(e) = sync.sync_pending(&tenant).await {
                                tracing::warn!(target: "offline::state", error = %e, "reconnect sync failed");
                            }
                            match prefetch
                                .prefetch(&tenant, PrefetchScope::FullTenant, &token)
                                .await
                            {
                                Ok(outcome) => {
                                    tracing::debug!(target: "offline::state", ?outcome, "reconnect prefetch");
                                }
                                Err(e) => {
                                    tracing::warn!(target: "offline::state", error = %e, "reconnect prefetch failed");
                                }
                            }
                        }
                        was_online = online;
                    }
                }
            }
        });

        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push(probe_task);
            tasks.push(watcher);
        }
    }

    /// ETA for draining the tenant's pending queue over the current
    /// link, sized by the configured average item payload.
    pub async fn sync_eta(&self, tenant: &TenantId) -> Result<SyncEstimate> {
        let pending = self.queue.pending_count(tenant).await?;
        Ok(self
            .connectivity
            .estimate_sync_time(pending, self.config.sync.avg_item_kb))
    }

    /// Stops background tasks and closes the database. Idempotent.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handles: Vec<JoinHandle<()>> = match self.tasks.lock() {
            Ok(mut tasks) => tasks.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for handle in handles {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::warn!(target: "offline::state", error = %e, "background task panicked");
                }
            }
        }
        self.pool.close().await;
        tracing::info!(target: "offline::state", "offline core shut down");
    }
}
