pub mod claims_gate;

pub use claims_gate::{ClaimsPermissionGate, SessionClaims};
