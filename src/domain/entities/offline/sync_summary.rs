use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of one sync pass, surfaced to the user as "N synced / M failed".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncSummary {
    pub synced: u32,
    pub failed: u32,
    pub remaining: u32,
}

/// Queue counters for the sync status UI.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueueStats {
    pub pending: i64,
    pub synced: i64,
    pub failed: i64,
    pub by_type: HashMap<String, i64>,
}
