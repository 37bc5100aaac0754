use crate::application::ports::{PermissionGate, RemoteDataApi, SelectQuery, SyncMarkerStore};
use crate::application::services::read_service::ReadService;
use crate::domain::entities::offline::{CachedRecord, ConnectionSnapshot};
use crate::domain::value_objects::{EntityType, RecordId, StaffRole, TenantId};
use crate::shared::config::PrefetchConfig;
use crate::shared::error::{AppError, Result};
use chrono::{Duration as ChronoDuration, Utc};
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// What to warm: everything the tenant has, or the slice a role's
/// screens actually open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefetchScope {
    FullTenant,
    Role(StaffRole),
}

impl PrefetchScope {
    fn role(&self) -> Option<StaffRole> {
        match self {
            PrefetchScope::FullTenant => None,
            PrefetchScope::Role(role) => Some(*role),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchOutcome {
    Completed { succeeded: u32, failed: u32 },
    SkippedOffline,
    SkippedCooldown,
    SkippedInFlight,
    Cancelled,
}

/// (embedded object key, field inside it, flattened field name). The
/// server returns related display labels as nested embed objects; cached
/// rows carry them flat so offline reads and search never re-join.
type LabelSpec = (&'static str, &'static str, &'static str);

struct TaskSpec {
    table: &'static str,
    /// Extra projection when the fetch pulls embedded label objects.
    columns: Option<&'static str>,
    /// (column, descending) pre-sort for high-volume tables, so the
    /// fetch limit keeps the newest rows.
    order: Option<(&'static str, bool)>,
    /// Date column bounded to the trailing attendance window.
    date_window: Option<&'static str>,
    labels: &'static [LabelSpec],
}

const fn task(table: &'static str) -> TaskSpec {
    TaskSpec {
        table,
        columns: None,
        order: None,
        date_window: None,
        labels: &[],
    }
}

const fn labeled(
    table: &'static str,
    columns: &'static str,
    labels: &'static [LabelSpec],
) -> TaskSpec {
    TaskSpec {
        table,
        columns: Some(columns),
        order: None,
        date_window: None,
        labels,
    }
}

const fn newest_first(table: &'static str, column: &'static str) -> TaskSpec {
    TaskSpec {
        table,
        columns: None,
        order: Some((column, true)),
        date_window: None,
        labels: &[],
    }
}

/// Full-tenant warm set; role scopes select subsets by table name. The
/// dashboard stats bundle is a separate post-fan-out task.
const ALL_TASKS: &[TaskSpec] = &[
    task("students"),
    task("staff"),
    labeled("sections", "*,classes(name)", &[("classes", "name", "class_name")]),
    task("timetable"),
    TaskSpec {
        table: "attendance_records",
        columns: Some("*,students(full_name)"),
        order: Some(("date", true)),
        date_window: Some("date"),
        labels: &[("students", "full_name", "student_name")],
    },
    labeled(
        "homework",
        "*,sections(name)",
        &[("sections", "name", "section_name")],
    ),
    task("assessment_scores"),
    labeled(
        "invoices",
        "*,students(full_name)",
        &[("students", "full_name", "student_name")],
    ),
    TaskSpec {
        table: "fee_payments",
        columns: Some("*,students(full_name)"),
        order: Some(("received_on", true)),
        date_window: None,
        labels: &[("students", "full_name", "student_name")],
    },
    task("leads"),
    newest_first("messages", "sent_at"),
    task("support_tickets"),
];

fn tables_for(scope: PrefetchScope) -> &'static [&'static str] {
    match scope {
        PrefetchScope::FullTenant | PrefetchScope::Role(StaffRole::Admin) => &[
            "students",
            "staff",
            "sections",
            "timetable",
            "attendance_records",
            "homework",
            "assessment_scores",
            "invoices",
            "fee_payments",
            "leads",
            "messages",
            "support_tickets",
        ],
        PrefetchScope::Role(StaffRole::Teacher) => &[
            "students",
            "sections",
            "timetable",
            "attendance_records",
            "homework",
            "assessment_scores",
        ],
        PrefetchScope::Role(StaffRole::Parent) => &[
            "students",
            "homework",
            "attendance_records",
            "invoices",
            "fee_payments",
            "messages",
        ],
        PrefetchScope::Role(StaffRole::Accountant) => &["students", "invoices", "fee_payments"],
        PrefetchScope::Role(StaffRole::Receptionist) => &[
            "students",
            "leads",
            "messages",
            "support_tickets",
        ],
    }
}

/// Scopes whose screens open with the KPI dashboard.
fn includes_stats(scope: PrefetchScope) -> bool {
    matches!(
        scope,
        PrefetchScope::FullTenant
            | PrefetchScope::Role(StaffRole::Admin)
            | PrefetchScope::Role(StaffRole::Accountant)
    )
}

enum TaskFailure {
    Cancelled,
    Failed,
}

/// Bulk cache warmer. Fans the scope's tables out as concurrent fetch
/// tasks; one table failing leaves every other table's fresh cache in
/// place.
pub struct PrefetchService {
    remote: Arc<dyn RemoteDataApi>,
    read: Arc<ReadService>,
    markers: Arc<dyn SyncMarkerStore>,
    gate: Arc<dyn PermissionGate>,
    link: watch::Receiver<ConnectionSnapshot>,
    config: PrefetchConfig,
    in_flight: StdMutex<HashSet<(TenantId, Option<StaffRole>)>>,
}

impl PrefetchService {
    pub fn new(
        remote: Arc<dyn RemoteDataApi>,
        read: Arc<ReadService>,
        markers: Arc<dyn SyncMarkerStore>,
        gate: Arc<dyn PermissionGate>,
        link: watch::Receiver<ConnectionSnapshot>,
        config: PrefetchConfig,
    ) -> Self {
        Self {
            remote,
            read,
            markers,
            gate,
            link,
            config,
            in_flight: StdMutex::new(HashSet::new()),
        }
    }

    /// Warms the cache for the scope. Gated, in order, on the session
    /// being allowed to act for the tenant, the device being online, the
    /// cool-down, and no identical warm already running. Cancellation
    /// stops further cache writes and leaves the cool-down marker
    /// untouched.
    pub async fn prefetch(
        &self,
        tenant: &TenantId,
        scope: PrefetchScope,
        token: &CancellationToken,
    ) -> Result<PrefetchOutcome> {
        if !self.gate.can_act(tenant, scope.role()).await? {
            return Err(AppError::PermissionDenied(format!(
                "session may not prefetch for tenant {tenant}"
            )));
        }
        if !self.link.borrow().online {
            tracing::debug!(target: "offline::prefetch", tenant = %tenant, "offline, skipping");
            return Ok(PrefetchOutcome::SkippedOffline);
        }

        let key = (tenant.clone(), scope.role());
        {
            let mut in_flight = self.in_flight.lock().map_err(|_| poisoned())?;
            if !in_flight.insert(key.clone()) {
                return Ok(PrefetchOutcome::SkippedInFlight);
            }
        }
        let outcome = self.run_scoped(tenant, scope, token).await;
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&key);
        }
        outcome
    }

    async fn run_scoped(
        &self,
        tenant: &TenantId,
        scope: PrefetchScope,
        token: &CancellationToken,
    ) -> Result<PrefetchOutcome> {
        if let Some(marker) = self.markers.last_prefetch(tenant, scope.role()).await? {
            let cooldown = ChronoDuration::minutes(self.config.cooldown_minutes);
            if Utc::now() - marker.last_prefetch_at < cooldown {
                tracing::debug!(
                    target: "offline::prefetch",
                    tenant = %tenant,
                    last_prefetch = %marker.last_prefetch_at,
                    "within cool-down, skipping"
                );
                return Ok(PrefetchOutcome::SkippedCooldown);
            }
        }

        let tables = tables_for(scope);
        let tasks = ALL_TASKS
            .iter()
            .filter(|spec| tables.contains(&spec.table));
        let results = join_all(tasks.map(|spec| self.run_task(tenant, spec, token))).await;

        let mut succeeded = 0u32;
        let mut failed = 0u32;
        let mut cancelled = false;
        for result in results {
            match result {
                Ok(()) => succeeded += 1,
                Err(TaskFailure::Failed) => failed += 1,
                Err(TaskFailure::Cancelled) => cancelled = true,
            }
        }
        if cancelled {
            tracing::info!(target: "offline::prefetch", tenant = %tenant, "prefetch cancelled");
            return Ok(PrefetchOutcome::Cancelled);
        }

        // The stats bundle runs after the fan-out so it counts what this
        // warm just cached.
        if includes_stats(scope) {
            match self.run_stats_task(tenant, token).await {
                Ok(()) => succeeded += 1,
                Err(TaskFailure::Cancelled) => {
                    tracing::info!(target: "offline::prefetch", tenant = %tenant, "prefetch cancelled");
                    return Ok(PrefetchOutcome::Cancelled);
                }
                Err(TaskFailure::Failed) => failed += 1,
            }
        }

        if succeeded > 0 {
            self.markers
                .mark_prefetched(tenant, scope.role(), Utc::now())
                .await?;
        }
        tracing::info!(
            target: "offline::prefetch",
            tenant = %tenant,
            succeeded,
            failed,
            "prefetch finished"
        );
        Ok(PrefetchOutcome::Completed { succeeded, failed })
    }

    async fn run_task(
        &self,
        tenant: &TenantId,
        spec: &TaskSpec,
        token: &CancellationToken,
    ) -> std::result::Result<(), TaskFailure> {
        if token.is_cancelled() {
            return Err(TaskFailure::Cancelled);
        }

        let mut query = SelectQuery::for_tenant(tenant).limit(self.config.fetch_limit);
        if let Some(columns) = spec.columns {
            query = query.columns(columns);
        }
        if let Some((column, descending)) = spec.order {
            query = query.order_by(column, descending);
        }
        if let Some(column) = spec.date_window {
            let cutoff =
                Utc::now().date_naive() - ChronoDuration::days(self.config.attendance_window_days);
            query = query.gte(column, cutoff.to_string());
        }

        let rows = self.remote.select(spec.table, query).await.map_err(|e| {
            tracing::warn!(
                target: "offline::prefetch",
                table = spec.table,
                error = %e,
                "fetch failed"
            );
            TaskFailure::Failed
        })?;

        let entity_type = EntityType::known(spec.table);
        let records: Vec<CachedRecord> = rows
            .into_iter()
            .filter_map(|mut row| {
                flatten_labels(&mut row, spec.labels);
                let id = row.get("id").and_then(|v| v.as_str())?;
                let record_id = RecordId::parse(id).ok()?;
                Some(CachedRecord::new(
                    record_id,
                    tenant.clone(),
                    entity_type.clone(),
                    row,
                ))
            })
            .collect();

        // The fetch may have taken a while; never overwrite the cache
        // after cancellation.
        if token.is_cancelled() {
            return Err(TaskFailure::Cancelled);
        }
        self.read
            .replace_cache(tenant, &entity_type, records)
            .await
            .map_err(|e| {
                tracing::warn!(
                    target: "offline::prefetch",
                    table = spec.table,
                    error = %e,
                    "cache write failed"
                );
                TaskFailure::Failed
            })
    }

    /// Computes the KPI bundle from the freshly warmed cache and stores
    /// it so the dashboard opens instantly offline.
    async fn run_stats_task(
        &self,
        tenant: &TenantId,
        token: &CancellationToken,
    ) -> std::result::Result<(), TaskFailure> {
        if token.is_cancelled() {
            return Err(TaskFailure::Cancelled);
        }
        let stats = self
            .read
            .compute_dashboard_stats(tenant)
            .await
            .map_err(|e| {
                tracing::warn!(target: "offline::prefetch", error = %e, "stats compute failed");
                TaskFailure::Failed
            })?;
        if token.is_cancelled() {
            return Err(TaskFailure::Cancelled);
        }
        self.read
            .cache_dashboard_stats(tenant, &stats)
            .await
            .map_err(|e| {
                tracing::warn!(target: "offline::prefetch", error = %e, "stats cache write failed");
                TaskFailure::Failed
            })
    }
}

/// Lifts embedded label objects ({"students": {"full_name": ..}}) up to
/// flat fields and drops the embed. To-many embeds keep the first entry.
fn flatten_labels(row: &mut Value, labels: &[LabelSpec]) {
    let Some(obj) = row.as_object_mut() else {
        return;
    };
    for (embed, field, flattened) in labels {
        let Some(nested) = obj.remove(*embed) else {
            continue;
        };
        let value = match &nested {
            Value::Array(items) => items.first().and_then(|v| v.get(*field)).cloned(),
            other => other.get(*field).cloned(),
        };
        if let Some(value) = value {
            obj.insert((*flattened).to_string(), value);
        }
    }
}

fn poisoned() -> AppError {
    AppError::Internal("prefetch in-flight lock poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::RemoteError;
    use crate::domain::value_objects::LinkQuality;
    use crate::infrastructure::database::ConnectionPool;
    use crate::infrastructure::offline::{SqliteMarkerStore, SqliteRecordStore};
    use crate::infrastructure::session::{ClaimsPermissionGate, SessionClaims};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves one synthetic row per table; tables in `failing` error.
    /// Invoice rows carry a student embed the way the server returns
    /// label projections.
    struct FakeApi {
        failing: Vec<&'static str>,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeApi {
        fn new(failing: Vec<&'static str>) -> Self {
            Self {
                failing,
                fetched: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RemoteDataApi for FakeApi {
        async fn select(&self, table: &str, _: SelectQuery) -> std::result::Result<Vec<Value>, RemoteError> {
            self.fetched.lock().unwrap().push(table.to_string());
            if self.failing.contains(&table) {
                return Err(RemoteError::from_status(500, "boom"));
            }
            if table == "invoices" {
                return Ok(vec![json!({
                    "id": "invoices-1",
                    "invoice_no": "INV-1",
                    "students": { "full_name": "Anna Lee" },
                })]);
            }
            Ok(vec![json!({ "id": format!("{table}-1"), "name": "row" })])
        }

        async fn insert(&self, _: &str, _: Value) -> std::result::Result<(), RemoteError> {
            Ok(())
        }

        async fn upsert(&self, _: &str, _: Value, _: &str) -> std::result::Result<(), RemoteError> {
            Ok(())
        }

        async fn update(
            &self,
            _: &str,
            _: Vec<(String, String)>,
            _: Value,
        ) -> std::result::Result<(), RemoteError> {
            Ok(())
        }

        async fn delete(&self, _: &str, _: Vec<(String, String)>) -> std::result::Result<(), RemoteError> {
            Ok(())
        }
    }

    struct Fixture {
        service: PrefetchService,
        read: Arc<ReadService>,
        link_tx: watch::Sender<ConnectionSnapshot>,
    }

    fn online_snapshot() -> ConnectionSnapshot {
        ConnectionSnapshot {
            online: true,
            quality: LinkQuality::Fast,
            effective_type: None,
            downlink_mbps: 8.0,
            rtt_ms: 60,
            save_data: false,
        }
    }

    async fn admin_gate() -> Arc<ClaimsPermissionGate> {
        let gate = Arc::new(ClaimsPermissionGate::new());
        gate.sign_in(SessionClaims {
            tenant_id: tenant(),
            role: StaffRole::Admin,
        })
        .await;
        gate
    }

    async fn fixture_with_gate(api: Arc<FakeApi>, gate: Arc<ClaimsPermissionGate>) -> Fixture {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();
        let (link_tx, link_rx) = watch::channel(online_snapshot());
        let read = Arc::new(ReadService::new(
            Arc::new(SqliteRecordStore::new(pool.clone(), 100 * 1024 * 1024)),
            link_rx.clone(),
        ));
        let service = PrefetchService::new(
            api,
            read.clone(),
            Arc::new(SqliteMarkerStore::new(pool)),
            gate,
            link_rx,
            PrefetchConfig::default(),
        );
        Fixture {
            service,
            read,
            link_tx,
        }
    }

    async fn fixture(api: Arc<FakeApi>) -> Fixture {
        let gate = admin_gate().await;
        fixture_with_gate(api, gate).await
    }

    fn tenant() -> TenantId {
        TenantId::parse("school-a").unwrap()
    }

    #[tokio::test]
    async fn full_tenant_warm_covers_every_table_plus_stats() {
        let api = Arc::new(FakeApi::new(vec![]));
        let f = fixture(api.clone()).await;

        let outcome = f
            .service
            .prefetch(&tenant(), PrefetchScope::FullTenant, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PrefetchOutcome::Completed {
                succeeded: 13,
                failed: 0
            }
        );

        let students = f
            .read
            .records(&tenant(), &EntityType::known("students"))
            .await
            .unwrap();
        assert_eq!(students.len(), 1);

        // The stats bundle landed too.
        let stats = f.read.dashboard_stats(&tenant()).await.unwrap();
        assert_eq!(stats.student_count, 1);
        assert!(stats.computed_at.is_some());
    }

    #[tokio::test]
    async fn signed_out_session_cannot_prefetch() {
        let api = Arc::new(FakeApi::new(vec![]));
        let gate = Arc::new(ClaimsPermissionGate::new());
        let f = fixture_with_gate(api.clone(), gate).await;

        let result = f
            .service
            .prefetch(&tenant(), PrefetchScope::FullTenant, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AppError::PermissionDenied(_))));
        assert!(api.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn offline_trigger_skips_the_fan_out() {
        let api = Arc::new(FakeApi::new(vec![]));
        let f = fixture(api.clone()).await;
        f.link_tx.send_replace(ConnectionSnapshot::offline());

        let outcome = f
            .service
            .prefetch(&tenant(), PrefetchScope::FullTenant, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, PrefetchOutcome::SkippedOffline);
        assert!(api.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_failing_table_leaves_the_rest_cached() {
        let api = Arc::new(FakeApi::new(vec!["invoices"]));
        let f = fixture(api).await;

        let outcome = f
            .service
            .prefetch(&tenant(), PrefetchScope::FullTenant, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PrefetchOutcome::Completed {
                succeeded: 12,
                failed: 1
            }
        );

        assert!(f
            .read
            .records(&tenant(), &EntityType::known("invoices"))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            f.read
                .records(&tenant(), &EntityType::known("leads"))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn embedded_labels_are_flattened_into_the_cached_row() {
        let api = Arc::new(FakeApi::new(vec![]));
        let f = fixture(api).await;

        f.service
            .prefetch(&tenant(), PrefetchScope::FullTenant, &CancellationToken::new())
            .await
            .unwrap();

        let invoices = f
            .read
            .records(&tenant(), &EntityType::known("invoices"))
            .await
            .unwrap();
        assert_eq!(invoices[0].field_str("student_name"), Some("Anna Lee"));
        assert!(invoices[0].payload.get("students").is_none());
    }

    #[tokio::test]
    async fn partial_success_still_arms_the_cooldown() {
        let api = Arc::new(FakeApi::new(vec!["invoices"]));
        let f = fixture(api.clone()).await;
        let token = CancellationToken::new();

        f.service
            .prefetch(&tenant(), PrefetchScope::FullTenant, &token)
            .await
            .unwrap();
        let again = f
            .service
            .prefetch(&tenant(), PrefetchScope::FullTenant, &token)
            .await
            .unwrap();
        assert_eq!(again, PrefetchOutcome::SkippedCooldown);
    }

    #[tokio::test]
    async fn role_scope_fetches_its_subset_only() {
        let api = Arc::new(FakeApi::new(vec![]));
        let f = fixture(api.clone()).await;

        f.service
            .prefetch(
                &tenant(),
                PrefetchScope::Role(StaffRole::Accountant),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let mut fetched = api.fetched.lock().unwrap().clone();
        fetched.sort();
        assert_eq!(fetched, vec!["fee_payments", "invoices", "students"]);
    }

    #[tokio::test]
    async fn role_scopes_cool_down_independently() {
        let api = Arc::new(FakeApi::new(vec![]));
        let f = fixture(api).await;
        let token = CancellationToken::new();

        f.service
            .prefetch(&tenant(), PrefetchScope::Role(StaffRole::Teacher), &token)
            .await
            .unwrap();
        let parent = f
            .service
            .prefetch(&tenant(), PrefetchScope::Role(StaffRole::Parent), &token)
            .await
            .unwrap();
        assert!(matches!(parent, PrefetchOutcome::Completed { .. }));
    }

    #[tokio::test]
    async fn cancelled_token_suppresses_cache_writes() {
        let api = Arc::new(FakeApi::new(vec![]));
        let f = fixture(api).await;
        let token = CancellationToken::new();
        token.cancel();

        let outcome = f
            .service
            .prefetch(&tenant(), PrefetchScope::FullTenant, &token)
            .await
            .unwrap();
        assert_eq!(outcome, PrefetchOutcome::Cancelled);
        assert!(f
            .read
            .records(&tenant(), &EntityType::known("students"))
            .await
            .unwrap()
            .is_empty());
    }
}
