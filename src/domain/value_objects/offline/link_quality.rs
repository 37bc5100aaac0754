use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse link-quality bucket derived from rtt/downlink or an active probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkQuality {
    Offline,
    Slow,
    Fair,
    Fast,
    Excellent,
}

impl LinkQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkQuality::Offline => "offline",
            LinkQuality::Slow => "slow",
            LinkQuality::Fair => "fair",
            LinkQuality::Fast => "fast",
            LinkQuality::Excellent => "excellent",
        }
    }
}

impl fmt::Display for LinkQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
