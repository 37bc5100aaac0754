use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl SyncPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPriority::High => "high",
            SyncPriority::Medium => "medium",
            SyncPriority::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "high" => Ok(SyncPriority::High),
            "medium" => Ok(SyncPriority::Medium),
            "low" => Ok(SyncPriority::Low),
            other => Err(format!("Unknown sync priority: {other}")),
        }
    }
}

impl fmt::Display for SyncPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
