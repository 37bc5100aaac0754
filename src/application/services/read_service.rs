use crate::application::ports::RecordStore;
use crate::domain::entities::offline::{
    CachedRecord, ConnectionSnapshot, DashboardStats, ReadOutcome, StorageUsage,
};
use crate::domain::value_objects::{EntityType, RecordId, TenantId};
use crate::shared::error::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

/// Read path screens go through.
///
/// Online reads fetch live, refresh the cache and say so; offline reads
/// (or a failed live fetch) fall back to the cache and flag the data as
/// cached. A last-known in-memory layer sits above the store so a
/// mid-session store failure or an in-progress cache replacement can
/// degrade a screen to stale data but never to a spurious empty state.
pub struct ReadService {
    store: Arc<dyn RecordStore>,
    link: watch::Receiver<ConnectionSnapshot>,
    last_known: RwLock<HashMap<(TenantId, EntityType), Vec<CachedRecord>>>,
}

impl ReadService {
    pub fn new(store: Arc<dyn RecordStore>, link: watch::Receiver<ConnectionSnapshot>) -> Self {
        Self {
            store,
            link,
            last_known: RwLock::new(HashMap::new()),
        }
    }

    /// Live-first read. While online, `live_fetch` is awaited and its
    /// rows both refresh the cache and go back to the caller marked
    /// fresh; offline, or when the live fetch fails, the cached rows are
    /// served instead and the outcome says so.
    pub async fn read<F>(
        &self,
        tenant: &TenantId,
        entity_type: &EntityType,
        live_fetch: F,
    ) -> Result<ReadOutcome>
    where
        F: Future<Output = Result<Vec<CachedRecord>>> + Send,
    {
        if self.link.borrow().online {
            match live_fetch.await {
                Ok(records) => {
                    if let Err(e) = self.replace_cache(tenant, entity_type, records.clone()).await
                    {
                        tracing::warn!(
                            target: "offline::read",
                            error = %e,
                            "live refresh cache write failed"
                        );
                    }
                    return Ok(ReadOutcome {
                        data: records,
                        is_offline: false,
                        is_using_cache: false,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        target: "offline::read",
                        entity_type = entity_type.as_str(),
                        error = %e,
                        "live fetch failed, serving cache"
                    );
                    let data = self.records(tenant, entity_type).await?;
                    return Ok(ReadOutcome {
                        data,
                        is_offline: false,
                        is_using_cache: true,
                    });
                }
            }
        }

        let data = self.records(tenant, entity_type).await?;
        Ok(ReadOutcome {
            data,
            is_offline: true,
            is_using_cache: true,
        })
    }

    /// Connectivity feed for callers that re-issue reads on the
    /// offline→online edge.
    pub fn link_changes(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.link.clone()
    }

    pub async fn records(
        &self,
        tenant: &TenantId,
        entity_type: &EntityType,
    ) -> Result<Vec<CachedRecord>> {
        let key = (tenant.clone(), entity_type.clone());
        match self.store.records(tenant, entity_type).await {
            Ok(records) if !records.is_empty() => {
                self.last_known.write().await.insert(key, records.clone());
                Ok(records)
            }
            Ok(records) => {
                // An empty store result only wins when nothing was ever
                // cached for this slot.
                match self.last_known.read().await.get(&key) {
                    Some(held) if !held.is_empty() => Ok(held.clone()),
                    _ => Ok(records),
                }
            }
            Err(e) => {
                tracing::warn!(target: "offline::read", error = %e, "record store read failed");
                Ok(self
                    .last_known
                    .read()
                    .await
                    .get(&key)
                    .cloned()
                    .unwrap_or_default())
            }
        }
    }

    /// Cache write used by prefetch; refreshes the last-known layer so
    /// open screens pick the new rows up on their next read.
    pub async fn replace_cache(
        &self,
        tenant: &TenantId,
        entity_type: &EntityType,
        records: Vec<CachedRecord>,
    ) -> Result<()> {
        self.store
            .replace_all(tenant, entity_type, records.clone())
            .await?;
        if !records.is_empty() {
            self.last_known
                .write()
                .await
                .insert((tenant.clone(), entity_type.clone()), records);
        }
        Ok(())
    }

    pub async fn storage_usage(&self) -> Result<StorageUsage> {
        self.store.storage_usage().await
    }

    /// KPI bundle for the dashboard. Serves the cached bundle written by
    /// the last prefetch when one exists, otherwise computes it from the
    /// record cache on the spot.
    pub async fn dashboard_stats(&self, tenant: &TenantId) -> Result<DashboardStats> {
        let cached = self
            .records(tenant, &EntityType::known("dashboard_stats"))
            .await?;
        if let Some(record) = cached.first() {
            match serde_json::from_value::<DashboardStats>(record.payload.clone()) {
                Ok(stats) => return Ok(stats),
                Err(e) => {
                    tracing::warn!(
                        target: "offline::read",
                        error = %e,
                        "cached dashboard bundle unreadable, recomputing"
                    );
                }
            }
        }
        self.compute_dashboard_stats(tenant).await
    }

    /// Recomputes the KPI bundle from the record cache alone, so the
    /// numbers come out identical offline.
    pub async fn compute_dashboard_stats(&self, tenant: &TenantId) -> Result<DashboardStats> {
        let students = self.records(tenant, &EntityType::known("students")).await?;
        let staff = self.records(tenant, &EntityType::known("staff")).await?;
        let sections = self.records(tenant, &EntityType::known("sections")).await?;
        let leads = self.records(tenant, &EntityType::known("leads")).await?;
        let payments = self
            .records(tenant, &EntityType::known("fee_payments"))
            .await?;
        let attendance = self
            .records(tenant, &EntityType::known("attendance_records"))
            .await?;

        let open_lead_count = leads
            .iter()
            .filter(|r| !matches!(r.field_str("status"), Some("won") | Some("lost")))
            .count() as u64;
        let revenue_to_date = payments
            .iter()
            .filter_map(|r| r.payload.get("amount").and_then(|v| v.as_f64()))
            .sum();
        let present = attendance
            .iter()
            .filter(|r| r.field_str("status") == Some("present"))
            .count();
        let attendance_rate = if attendance.is_empty() {
            0.0
        } else {
            present as f64 / attendance.len() as f64
        };

        Ok(DashboardStats {
            student_count: students.len() as u64,
            staff_count: staff.len() as u64,
            section_count: sections.len() as u64,
            open_lead_count,
            revenue_to_date,
            attendance_rate,
            computed_at: Some(Utc::now()),
        })
    }

    /// Stores a computed KPI bundle as a single cached record so the
    /// next dashboard open is instant, even offline.
    pub async fn cache_dashboard_stats(
        &self,
        tenant: &TenantId,
        stats: &DashboardStats,
    ) -> Result<()> {
        let entity_type = EntityType::known("dashboard_stats");
        let record = CachedRecord::new(
            RecordId::parse("summary")?,
            tenant.clone(),
            entity_type.clone(),
            serde_json::to_value(stats)?,
        );
        self.store
            .upsert(tenant, &entity_type, vec![record.clone()])
            .await?;
        self.last_known
            .write()
            .await
            .insert((tenant.clone(), entity_type), vec![record]);
        Ok(())
    }
}
