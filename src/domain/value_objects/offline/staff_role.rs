use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of the signed-in user, used to scope prefetching and consumed by
/// the permission gate. Authorization policy itself lives server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Admin,
    Teacher,
    Parent,
    Accountant,
    Receptionist,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Admin => "admin",
            StaffRole::Teacher => "teacher",
            StaffRole::Parent => "parent",
            StaffRole::Accountant => "accountant",
            StaffRole::Receptionist => "receptionist",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "admin" => Ok(StaffRole::Admin),
            "teacher" => Ok(StaffRole::Teacher),
            "parent" => Ok(StaffRole::Parent),
            "accountant" => Ok(StaffRole::Accountant),
            "receptionist" => Ok(StaffRole::Receptionist),
            other => Err(format!("Unknown staff role: {other}")),
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
