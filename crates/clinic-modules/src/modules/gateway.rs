use super::domain::{ActivationSet, ModuleId, TenantId};

/// Storage abstraction for a tenant's active-module list.
///
/// Tenant isolation is the gateway's responsibility; the engine never sees
/// another tenant's data.
pub trait ModuleGateway: Send + Sync {
    /// Currently persisted module ids. Unknown tenants yield an empty set.
    fn load_active_modules(&self, tenant: &TenantId) -> Result<ActivationSet, GatewayError>;

    /// Replaces the persisted list. `modules` arrives sorted and saving the same
    /// list twice has no additional effect.
    fn save_active_modules(
        &self,
        tenant: &TenantId,
        modules: &[ModuleId],
    ) -> Result<(), GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("module storage unavailable: {0}")]
    Unavailable(String),
    #[error("module storage rejected the update: {0}")]
    Rejected(String),
}
