use chrono::{DateTime, Utc};
use clinic_modules::config::CatalogConfig;
use clinic_modules::error::AppError;
use clinic_modules::modules::{
    ActivationEngine, ActivationSet, GatewayError, ModuleGateway, ModuleId, TenantId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredModules {
    pub(crate) modules: ActivationSet,
    pub(crate) updated_at: DateTime<Utc>,
}

/// Process-local stand-in for the clinic's module storage.
#[derive(Default, Clone)]
pub(crate) struct InMemoryModuleGateway {
    records: Arc<Mutex<HashMap<TenantId, StoredModules>>>,
}

impl InMemoryModuleGateway {
    pub(crate) fn with_tenant(self, tenant: TenantId, modules: ActivationSet) -> Self {
        let record = StoredModules {
            modules,
            updated_at: Utc::now(),
        };
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tenant, record);
        self
    }

    pub(crate) fn record(&self, tenant: &TenantId) -> Option<StoredModules> {
        let guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        guard.get(tenant).cloned()
    }
}

impl ModuleGateway for InMemoryModuleGateway {
    fn load_active_modules(&self, tenant: &TenantId) -> Result<ActivationSet, GatewayError> {
        let guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard
            .get(tenant)
            .map(|record| record.modules.clone())
            .unwrap_or_default())
    }

    fn save_active_modules(
        &self,
        tenant: &TenantId,
        modules: &[ModuleId],
    ) -> Result<(), GatewayError> {
        let mut guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let modules: ActivationSet = modules.iter().cloned().collect();
        match guard.get(tenant) {
            Some(existing) if existing.modules == modules => {}
            _ => {
                guard.insert(
                    tenant.clone(),
                    StoredModules {
                        modules,
                        updated_at: Utc::now(),
                    },
                );
            }
        }
        Ok(())
    }
}

pub(crate) fn load_engine(catalog: &CatalogConfig) -> Result<ActivationEngine, AppError> {
    let catalog = catalog.load_catalog()?;
    Ok(ActivationEngine::new(catalog)?)
}

#[derive(Debug, Clone)]
pub(crate) struct ToggleArg {
    pub(crate) module: ModuleId,
    pub(crate) enable: bool,
}

pub(crate) fn parse_toggle(raw: &str) -> Result<ToggleArg, String> {
    let (module, state) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected MODULE=on|off, got '{raw}'"))?;
    let module = module.trim();
    if module.is_empty() {
        return Err(format!("missing module id in '{raw}'"));
    }
    let enable = match state.trim().to_ascii_lowercase().as_str() {
        "on" | "enable" | "true" => true,
        "off" | "disable" | "false" => false,
        other => return Err(format!("unknown toggle state '{other}' in '{raw}'")),
    };
    Ok(ToggleArg {
        module: ModuleId::from(module),
        enable,
    })
}
