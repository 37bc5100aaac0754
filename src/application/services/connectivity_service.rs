use crate::application::ports::LinkProbe;
use crate::domain::entities::offline::{ConnectionSnapshot, SyncEstimate, RTT_SENTINEL_MS};
use crate::domain::value_objects::LinkQuality;
use crate::shared::config::ConnectivityConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Observes online/offline transitions and estimates link quality to
/// drive sync pacing and the user-facing ETA.
///
/// State is published through a watch channel: the sync engine reads the
/// latest snapshot before a pass, and reconnect-driven triggers subscribe
/// to the offline→online edge.
pub struct ConnectivityService {
    probe: Arc<dyn LinkProbe>,
    tx: watch::Sender<ConnectionSnapshot>,
    probe_interval: Duration,
}

impl ConnectivityService {
    pub fn new(probe: Arc<dyn LinkProbe>, config: &ConnectivityConfig) -> Self {
        let (tx, _rx) = watch::channel(ConnectionSnapshot::offline());
        Self {
            probe,
            tx,
            probe_interval: Duration::from_secs(config.probe_interval_secs),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.tx.borrow().clone()
    }

    pub fn is_online(&self) -> bool {
        self.tx.borrow().online
    }

    /// Platform connectivity transition entry point. Going offline
    /// collapses quality immediately; coming online publishes a
    /// provisional snapshot until the next probe lands.
    pub fn set_online(&self, online: bool) {
        let current = self.tx.borrow().clone();
        if current.online == online {
            return;
        }
        if online {
            self.tx.send_replace(ConnectionSnapshot {
                online: true,
                quality: LinkQuality::Fair,
                effective_type: None,
                downlink_mbps: quality_downlink_estimate(LinkQuality::Fair),
                rtt_ms: current.rtt_ms.min(RTT_SENTINEL_MS),
                save_data: current.save_data,
            });
        } else {
            self.tx.send_replace(ConnectionSnapshot::offline());
        }
    }

    /// Recomputes quality from the native link signal when the platform
    /// has one, or from an active latency probe otherwise, and publishes
    /// the result.
    pub async fn refresh_quality(&self) -> ConnectionSnapshot {
        if !self.is_online() {
            let snapshot = ConnectionSnapshot::offline();
            self.tx.send_replace(snapshot.clone());
            return snapshot;
        }

        let snapshot = match self.probe.native_signal().await {
            Some(signal) => ConnectionSnapshot {
                online: true,
                quality: classify_native(signal.rtt_ms, signal.downlink_mbps),
                effective_type: signal.effective_type,
                downlink_mbps: signal.downlink_mbps,
                rtt_ms: signal.rtt_ms,
                save_data: signal.save_data,
            },
            None => match self.probe.ping().await {
                Ok(latency_ms) => {
                    let quality = classify_probe(latency_ms);
                    ConnectionSnapshot {
                        online: true,
                        quality,
                        effective_type: None,
                        downlink_mbps: quality_downlink_estimate(quality),
                        rtt_ms: latency_ms,
                        save_data: false,
                    }
                }
                Err(e) => {
                    tracing::debug!(target: "offline::connectivity", error = %e, "latency probe failed");
                    ConnectionSnapshot {
                        online: true,
                        quality: LinkQuality::Slow,
                        effective_type: None,
                        downlink_mbps: quality_downlink_estimate(LinkQuality::Slow),
                        rtt_ms: RTT_SENTINEL_MS,
                        save_data: false,
                    }
                }
            },
        };

        self.tx.send_replace(snapshot.clone());
        snapshot
    }

    /// Periodic re-probe while online; stops when the token cancels.
    pub fn spawn_probe_loop(self: &Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(service.probe_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if service.is_online() {
                            service.refresh_quality().await;
                        }
                    }
                }
            }
        })
    }

    /// Transfer time from the downlink estimate plus a per-item
    /// round-trip overhead, bucketed into user-friendly text.
    pub fn estimate_sync_time(&self, pending_items: usize, avg_item_kb: f64) -> SyncEstimate {
        let snapshot = self.snapshot();
        if pending_items == 0 {
            return SyncEstimate {
                seconds: 0,
                formatted: "Instant".to_string(),
            };
        }
        if !snapshot.online || snapshot.downlink_mbps <= 0.0 {
            return SyncEstimate {
                seconds: RTT_SENTINEL_MS,
                formatted: "Very slow".to_string(),
            };
        }

        let download_speed_kb_s = snapshot.downlink_mbps * 1000.0 / 8.0;
        let transfer_secs = (pending_items as f64 * avg_item_kb) / download_speed_kb_s;
        let rtt_overhead_secs = pending_items as f64 * snapshot.rtt_ms as f64 / 1000.0;
        let total = transfer_secs + rtt_overhead_secs;
        let seconds = total.ceil() as u64;

        let formatted = if total < 1.0 {
            "Instant".to_string()
        } else if seconds >= RTT_SENTINEL_MS {
            "Very slow".to_string()
        } else if seconds < 60 {
            format!("~{seconds}s")
        } else {
            format!("~{}m", seconds.div_ceil(60))
        };

        SyncEstimate { seconds, formatted }
    }
}

/// Thresholds for the platform-reported branch.
fn classify_native(rtt_ms: u64, downlink_mbps: f64) -> LinkQuality {
    if rtt_ms < 50 && downlink_mbps > 10.0 {
        LinkQuality::Excellent
    } else if rtt_ms < 100 && downlink_mbps > 5.0 {
        LinkQuality::Fast
    } else if rtt_ms < 300 && downlink_mbps > 1.0 {
        LinkQuality::Fair
    } else {
        LinkQuality::Slow
    }
}

/// Thresholds for the active-probe branch.
fn classify_probe(latency_ms: u64) -> LinkQuality {
    if latency_ms < 100 {
        LinkQuality::Excellent
    } else if latency_ms < 200 {
        LinkQuality::Fast
    } else if latency_ms < 500 {
        LinkQuality::Fair
    } else {
        LinkQuality::Slow
    }
}

/// Rough downlink figure for the probe branch, where only latency is
/// observable; keeps the ETA estimator usable without a native signal.
fn quality_downlink_estimate(quality: LinkQuality) -> f64 {
    match quality {
        LinkQuality::Excellent => 10.0,
        LinkQuality::Fast => 5.0,
        LinkQuality::Fair => 2.0,
        LinkQuality::Slow => 0.5,
        LinkQuality::Offline => 0.0,
    }
}
