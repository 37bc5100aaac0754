use crate::domain::entities::offline::NativeLinkSignal;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Probe request failed: {0}")]
    Request(String),
    #[error("Probe timed out")]
    Timeout,
}

/// Source of link-quality signals for the connectivity monitor.
#[async_trait]
pub trait LinkProbe: Send + Sync {
    /// Platform-reported link metrics, where the platform has any.
    async fn native_signal(&self) -> Option<NativeLinkSignal>;

    /// Active latency probe: a lightweight same-origin request, returning
    /// the observed round trip in milliseconds.
    async fn ping(&self) -> Result<u64, ProbeError>;
}
