use crate::application::ports::link_probe::{LinkProbe, ProbeError};
use crate::domain::entities::offline::NativeLinkSignal;
use crate::shared::config::{ConnectivityConfig, RemoteConfig};
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Active latency probe: a timed HEAD request against a lightweight
/// endpoint on the same origin as the data API. This target has no native
/// link-quality API, so `native_signal` is always `None` here.
pub struct HttpLinkProbe {
    client: reqwest::Client,
    probe_url: String,
}

impl HttpLinkProbe {
    pub fn new(remote: &RemoteConfig, connectivity: &ConnectivityConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(connectivity.probe_timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(e.to_string()))?;

        let base = remote.base_url.trim_end_matches('/');
        let path = connectivity.probe_path.trim_start_matches('/');
        Ok(Self {
            client,
            probe_url: format!("{base}/{path}"),
        })
    }
}

#[async_trait]
impl LinkProbe for HttpLinkProbe {
    async fn native_signal(&self) -> Option<NativeLinkSignal> {
        None
    }

    async fn ping(&self) -> Result<u64, ProbeError> {
        let started = Instant::now();
        let result = self.client.head(&self.probe_url).send().await;
        match result {
            Ok(_) => Ok(started.elapsed().as_millis() as u64),
            Err(e) if e.is_timeout() => Err(ProbeError::Timeout),
            Err(e) => Err(ProbeError::Request(e.to_string())),
        }
    }
}
