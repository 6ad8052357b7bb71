use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::modules::{
    module_router, ActivationEngine, ActivationSet, GatewayError, ModuleCatalog,
    ModuleConfigurationService, ModuleDefinition, ModuleGateway, ModuleId, TenantId,
};

/// Clinic catalog used throughout the engine tests.
pub(super) fn clinic_catalog() -> ModuleCatalog {
    ModuleCatalog::new(vec![
        ModuleDefinition::new("patients", "Patients", "").required(),
        ModuleDefinition::new("appointments", "Appointments", "").required(),
        ModuleDefinition::new("clinical", "Clinical", "")
            .required()
            .depends_on(&["appointments"]),
        ModuleDefinition::new("financial", "Financial", "").depends_on(&["appointments"]),
        ModuleDefinition::new("stock", "Stock", "").depends_on(&["financial"]),
        ModuleDefinition::new("procedures", "Procedures", "").depends_on(&["financial", "stock"]),
        ModuleDefinition::new("bi", "BI", "").depends_on(&[
            "financial",
            "clinical",
            "appointments",
        ]),
    ])
    .expect("clinic catalog is well formed")
}

pub(super) fn engine() -> ActivationEngine {
    ActivationEngine::new(clinic_catalog()).expect("clinic catalog builds an engine")
}

pub(super) fn id(value: &str) -> ModuleId {
    ModuleId::from(value)
}

pub(super) fn set(ids: &[&str]) -> ActivationSet {
    ids.iter().copied().collect()
}

pub(super) fn core_set() -> ActivationSet {
    set(&["patients", "appointments", "clinical"])
}

pub(super) fn tenant() -> TenantId {
    TenantId("clinica-vida".to_string())
}

#[derive(Default)]
pub(super) struct MemoryGateway {
    stored: Mutex<HashMap<TenantId, ActivationSet>>,
    saves: Mutex<Vec<(TenantId, Vec<ModuleId>)>>,
}

impl MemoryGateway {
    pub(super) fn seeded(tenant: &TenantId, modules: ActivationSet) -> Self {
        let gateway = Self::default();
        gateway
            .stored
            .lock()
            .expect("gateway mutex poisoned")
            .insert(tenant.clone(), modules);
        gateway
    }

    pub(super) fn saves(&self) -> Vec<(TenantId, Vec<ModuleId>)> {
        self.saves.lock().expect("gateway mutex poisoned").clone()
    }

    pub(super) fn overwrite(&self, tenant: &TenantId, modules: ActivationSet) {
        self.stored
            .lock()
            .expect("gateway mutex poisoned")
            .insert(tenant.clone(), modules);
    }
}

impl ModuleGateway for MemoryGateway {
    fn load_active_modules(&self, tenant: &TenantId) -> Result<ActivationSet, GatewayError> {
        let guard = self.stored.lock().expect("gateway mutex poisoned");
        Ok(guard.get(tenant).cloned().unwrap_or_default())
    }

    fn save_active_modules(
        &self,
        tenant: &TenantId,
        modules: &[ModuleId],
    ) -> Result<(), GatewayError> {
        self.saves
            .lock()
            .expect("gateway mutex poisoned")
            .push((tenant.clone(), modules.to_vec()));
        self.stored
            .lock()
            .expect("gateway mutex poisoned")
            .insert(tenant.clone(), modules.iter().cloned().collect());
        Ok(())
    }
}

/// Loads normally but fails saves until `recover` is called.
pub(super) struct FailingSaveGateway {
    inner: MemoryGateway,
    failing: AtomicBool,
}

impl FailingSaveGateway {
    pub(super) fn seeded(tenant: &TenantId, modules: ActivationSet) -> Self {
        Self {
            inner: MemoryGateway::seeded(tenant, modules),
            failing: AtomicBool::new(true),
        }
    }

    pub(super) fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    pub(super) fn saves(&self) -> Vec<(TenantId, Vec<ModuleId>)> {
        self.inner.saves()
    }
}

impl ModuleGateway for FailingSaveGateway {
    fn load_active_modules(&self, tenant: &TenantId) -> Result<ActivationSet, GatewayError> {
        self.inner.load_active_modules(tenant)
    }

    fn save_active_modules(
        &self,
        tenant: &TenantId,
        modules: &[ModuleId],
    ) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("network timeout".to_string()));
        }
        self.inner.save_active_modules(tenant, modules)
    }
}

/// Pauses inside `load_active_modules` until the test lets it continue.
pub(super) struct PausingLoadGateway {
    inner: MemoryGateway,
    pub(super) entered: Barrier,
    pub(super) resume: Barrier,
}

impl PausingLoadGateway {
    pub(super) fn seeded(tenant: &TenantId, modules: ActivationSet) -> Self {
        Self {
            inner: MemoryGateway::seeded(tenant, modules),
            entered: Barrier::new(2),
            resume: Barrier::new(2),
        }
    }
}

impl ModuleGateway for PausingLoadGateway {
    fn load_active_modules(&self, tenant: &TenantId) -> Result<ActivationSet, GatewayError> {
        self.entered.wait();
        self.resume.wait();
        self.inner.load_active_modules(tenant)
    }

    fn save_active_modules(
        &self,
        tenant: &TenantId,
        modules: &[ModuleId],
    ) -> Result<(), GatewayError> {
        self.inner.save_active_modules(tenant, modules)
    }
}

pub(super) struct UnavailableGateway;

impl ModuleGateway for UnavailableGateway {
    fn load_active_modules(&self, _tenant: &TenantId) -> Result<ActivationSet, GatewayError> {
        Err(GatewayError::Unavailable("database offline".to_string()))
    }

    fn save_active_modules(
        &self,
        _tenant: &TenantId,
        _modules: &[ModuleId],
    ) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn build_service(
    gateway: MemoryGateway,
) -> (
    Arc<ModuleConfigurationService<MemoryGateway>>,
    Arc<MemoryGateway>,
) {
    let gateway = Arc::new(gateway);
    let service = Arc::new(ModuleConfigurationService::new(
        Arc::new(engine()),
        gateway.clone(),
    ));
    (service, gateway)
}

pub(super) fn router_with_service<G>(service: Arc<ModuleConfigurationService<G>>) -> axum::Router
where
    G: ModuleGateway + 'static,
{
    module_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
