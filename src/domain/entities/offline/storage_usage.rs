use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageUsage {
    pub used_bytes: u64,
    pub quota_bytes: u64,
    pub percent_used: f64,
}

impl StorageUsage {
    pub fn new(used_bytes: u64, quota_bytes: u64) -> Self {
        let percent_used = if quota_bytes == 0 {
            0.0
        } else {
            (used_bytes as f64 / quota_bytes as f64) * 100.0
        };
        Self {
            used_bytes,
            quota_bytes,
            percent_used,
        }
    }

    pub fn usage_formatted(&self) -> String {
        format_bytes(self.used_bytes)
    }

    pub fn quota_formatted(&self) -> String {
        format_bytes(self.quota_bytes)
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.1} GB", b / GB)
    } else if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}
