#![allow(dead_code)]

use async_trait::async_trait;
use classline_offline::application::ports::{RemoteDataApi, RemoteError, SelectQuery};
use classline_offline::domain::entities::offline::ConnectionSnapshot;
use classline_offline::domain::value_objects::{LinkQuality, StaffRole, TenantId};
use classline_offline::infrastructure::database::ConnectionPool;
use classline_offline::infrastructure::session::{ClaimsPermissionGate, SessionClaims};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

pub fn tenant() -> TenantId {
    TenantId::parse("school-a").unwrap()
}

/// Connectivity feed pinned online; keep the sender to flip the link
/// mid-test.
pub fn online_link() -> (
    watch::Sender<ConnectionSnapshot>,
    watch::Receiver<ConnectionSnapshot>,
) {
    watch::channel(ConnectionSnapshot {
        online: true,
        quality: LinkQuality::Fast,
        effective_type: None,
        downlink_mbps: 8.0,
        rtt_ms: 60,
        save_data: false,
    })
}

pub async fn memory_pool() -> ConnectionPool {
    let pool = ConnectionPool::from_memory().await.unwrap();
    pool.migrate().await.unwrap();
    pool
}

pub async fn file_pool(path: &std::path::Path) -> ConnectionPool {
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let pool = ConnectionPool::new(&url, 5).await.unwrap();
    pool.migrate().await.unwrap();
    pool
}

pub async fn signed_in_gate(role: StaffRole) -> Arc<ClaimsPermissionGate> {
    let gate = Arc::new(ClaimsPermissionGate::new());
    gate.sign_in(SessionClaims {
        tenant_id: tenant(),
        role,
    })
    .await;
    gate
}

/// Remote double: serves one synthetic row per table, records every
/// write, and fails whole tables on demand.
pub struct MockRemoteApi {
    failing_tables: Mutex<Vec<(String, u16)>>,
    rows_by_table: Mutex<HashMap<String, Vec<Value>>>,
    pub upserts: Mutex<Vec<(String, Value)>>,
    pub updates: Mutex<Vec<(String, Value)>>,
}

impl MockRemoteApi {
    pub fn new() -> Self {
        Self {
            failing_tables: Mutex::new(Vec::new()),
            rows_by_table: Mutex::new(HashMap::new()),
            upserts: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_table(&self, table: &str, status: u16) {
        self.failing_tables
            .lock()
            .unwrap()
            .push((table.to_string(), status));
    }

    pub fn serve_rows(&self, table: &str, rows: Vec<Value>) {
        self.rows_by_table
            .lock()
            .unwrap()
            .insert(table.to_string(), rows);
    }

    pub fn applied_tables(&self) -> Vec<String> {
        self.upserts
            .lock()
            .unwrap()
            .iter()
            .map(|(table, _)| table.clone())
            .collect()
    }

    fn check_failing(&self, table: &str) -> Result<(), RemoteError> {
        let failing = self.failing_tables.lock().unwrap();
        if let Some((_, status)) = failing.iter().find(|(t, _)| t == table) {
            return Err(RemoteError::from_status(*status, format!("{table} refused")));
        }
        Ok(())
    }
}

impl Default for MockRemoteApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteDataApi for MockRemoteApi {
    async fn select(&self, table: &str, _: SelectQuery) -> Result<Vec<Value>, RemoteError> {
        self.check_failing(table)?;
        let rows = self.rows_by_table.lock().unwrap();
        Ok(rows
            .get(table)
            .cloned()
            .unwrap_or_else(|| vec![json!({ "id": format!("{table}-1"), "name": "seed row" })]))
    }

    async fn insert(&self, table: &str, rows: Value) -> Result<(), RemoteError> {
        self.check_failing(table)?;
        self.upserts.lock().unwrap().push((table.to_string(), rows));
        Ok(())
    }

    async fn upsert(&self, table: &str, rows: Value, _: &str) -> Result<(), RemoteError> {
        self.check_failing(table)?;
        self.upserts.lock().unwrap().push((table.to_string(), rows));
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        _: Vec<(String, String)>,
        patch: Value,
    ) -> Result<(), RemoteError> {
        self.check_failing(table)?;
        self.updates
            .lock()
            .unwrap()
            .push((table.to_string(), patch));
        Ok(())
    }

    async fn delete(&self, table: &str, _: Vec<(String, String)>) -> Result<(), RemoteError> {
        self.check_failing(table)?;
        Ok(())
    }
}
