use crate::domain::value_objects::{StaffRole, TenantId};
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Opaque allow/deny check for "may this session act for this tenant".
/// Policy lives server-side; this layer only consumes the verdict.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn can_act(&self, tenant: &TenantId, role: Option<StaffRole>)
        -> Result<bool, AppError>;
}
