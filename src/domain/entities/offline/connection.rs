use crate::domain::value_objects::LinkQuality;
use serde::{Deserialize, Serialize};

/// Worst-case rtt reported when the probe fails or times out.
pub const RTT_SENTINEL_MS: u64 = 9_999;

/// Derived, never persisted. Recomputed on every network-change event or
/// periodic probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionSnapshot {
    pub online: bool,
    pub quality: LinkQuality,
    pub effective_type: Option<String>,
    pub downlink_mbps: f64,
    pub rtt_ms: u64,
    pub save_data: bool,
}

impl ConnectionSnapshot {
    pub fn offline() -> Self {
        Self {
            online: false,
            quality: LinkQuality::Offline,
            effective_type: None,
            downlink_mbps: 0.0,
            rtt_ms: RTT_SENTINEL_MS,
            save_data: false,
        }
    }
}

/// Link metrics reported by a platform connection API, where one exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NativeLinkSignal {
    pub rtt_ms: u64,
    pub downlink_mbps: f64,
    pub effective_type: Option<String>,
    pub save_data: bool,
}

/// User-facing estimate of how long draining the queue will take.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncEstimate {
    pub seconds: u64,
    pub formatted: String,
}
