use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub prefetch: PrefetchConfig,
    pub connectivity: ConnectivityConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub purge_after_hours: i64,
    pub avg_item_kb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefetchConfig {
    pub cooldown_minutes: i64,
    pub attendance_window_days: i64,
    pub fetch_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    pub probe_interval_secs: u64,
    pub probe_path: String,
    pub probe_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub quota_bytes: u64,
    pub audit_cap: u32,
    pub search_result_cap: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            remote: RemoteConfig::default(),
            sync: SyncConfig::default(),
            prefetch: PrefetchConfig::default(),
            connectivity: ConnectivityConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:data/classline.db".to_string(),
            max_connections: 5,
            connection_timeout: 30,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321/rest/v1".to_string(),
            api_key: String::new(),
            request_timeout_secs: 15,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_base_ms: 1_000,
            backoff_cap_ms: 30_000,
            purge_after_hours: 24,
            avg_item_kb: 2.0,
        }
    }
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            cooldown_minutes: 120, // 2 hours
            attendance_window_days: 30,
            fetch_limit: 2_000,
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: 30,
            probe_path: "/health".to_string(),
            probe_timeout_secs: 10,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            quota_bytes: 100 * 1024 * 1024, // 100MB
            audit_cap: 500,
            search_result_cap: 50,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("CLASSLINE_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v;
            }
        }
        if let Ok(v) = std::env::var("CLASSLINE_REMOTE_URL") {
            if !v.trim().is_empty() {
                cfg.remote.base_url = v;
            }
        }
        if let Ok(v) = std::env::var("CLASSLINE_REMOTE_API_KEY") {
            cfg.remote.api_key = v;
        }
        if let Ok(v) = std::env::var("CLASSLINE_REMOTE_TIMEOUT_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.remote.request_timeout_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("CLASSLINE_SYNC_MAX_RETRIES") {
            if let Some(value) = parse_u64(&v) {
                cfg.sync.max_retries = value.min(u32::MAX as u64) as u32;
            }
        }
        if let Ok(v) = std::env::var("CLASSLINE_PREFETCH_COOLDOWN_MINUTES") {
            if let Some(value) = parse_u64(&v) {
                cfg.prefetch.cooldown_minutes = value as i64;
            }
        }
        if let Ok(v) = std::env::var("CLASSLINE_PROBE_INTERVAL_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.connectivity.probe_interval_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("CLASSLINE_STORAGE_QUOTA_BYTES") {
            if let Some(value) = parse_u64(&v) {
                cfg.storage.quota_bytes = value;
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.remote.base_url.trim().is_empty() {
            return Err("Remote base_url must not be empty".to_string());
        }
        if self.sync.max_retries == 0 {
            return Err("Sync max_retries must be greater than 0".to_string());
        }
        if self.sync.backoff_base_ms == 0 || self.sync.backoff_cap_ms < self.sync.backoff_base_ms {
            return Err("Sync backoff must satisfy 0 < base <= cap".to_string());
        }
        if self.connectivity.probe_interval_secs == 0 {
            return Err("Connectivity probe_interval_secs must be greater than 0".to_string());
        }
        if self.storage.quota_bytes == 0 {
            return Err("Storage quota_bytes must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
