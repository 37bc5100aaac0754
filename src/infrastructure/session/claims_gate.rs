use crate::application::ports::PermissionGate;
use crate::domain::value_objects::{StaffRole, TenantId};
use crate::shared::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Who the current session is, as asserted by the last successful
/// sign-in. Stored locally so the check still works offline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    pub tenant_id: TenantId,
    pub role: StaffRole,
}

/// Gate backed by the signed-in session's claims. The server re-checks
/// every write on sync; this only keeps a signed-out or cross-tenant
/// session from filling the local queue.
#[derive(Default)]
pub struct ClaimsPermissionGate {
    claims: RwLock<Option<SessionClaims>>,
}

impl ClaimsPermissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sign_in(&self, claims: SessionClaims) {
        *self.claims.write().await = Some(claims);
    }

    pub async fn sign_out(&self) {
        *self.claims.write().await = None;
    }

    pub async fn claims(&self) -> Option<SessionClaims> {
        self.claims.read().await.clone()
    }
}

#[async_trait]
impl PermissionGate for ClaimsPermissionGate {
    async fn can_act(&self, tenant: &TenantId, role: Option<StaffRole>) -> Result<bool> {
        let claims = self.claims.read().await;
        let Some(claims) = claims.as_ref() else {
            return Ok(false);
        };
        if claims.tenant_id != *tenant {
            return Ok(false);
        }
        Ok(match role {
            Some(role) => claims.role == role || claims.role == StaffRole::Admin,
            None => true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(v: &str) -> TenantId {
        TenantId::parse(v).unwrap()
    }

    #[tokio::test]
    async fn signed_out_session_is_denied() {
        let gate = ClaimsPermissionGate::new();
        assert!(!gate
            .can_act(&tenant("school-a"), Some(StaffRole::Teacher))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn cross_tenant_access_is_denied() {
        let gate = ClaimsPermissionGate::new();
        gate.sign_in(SessionClaims {
            tenant_id: tenant("school-a"),
            role: StaffRole::Teacher,
        })
        .await;

        assert!(gate
            .can_act(&tenant("school-a"), Some(StaffRole::Teacher))
            .await
            .unwrap());
        assert!(!gate
            .can_act(&tenant("school-b"), Some(StaffRole::Teacher))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn admin_covers_other_roles() {
        let gate = ClaimsPermissionGate::new();
        gate.sign_in(SessionClaims {
            tenant_id: tenant("school-a"),
            role: StaffRole::Admin,
        })
        .await;

        assert!(gate
            .can_act(&tenant("school-a"), Some(StaffRole::Accountant))
            .await
            .unwrap());
    }
}
