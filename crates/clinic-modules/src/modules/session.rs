use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{ActivationSet, ModuleId, TenantId};
use super::engine::{ActivationEngine, ModuleStateView, ToggleOutcome, ValidationResult, Violation};
use super::gateway::{GatewayError, ModuleGateway};
use super::tracker::{self, ChangeSummary};

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Handle for one open editing session, unique within the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    fn generate() -> Self {
        let sequence = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("{:x}-{:04x}", Utc::now().timestamp_millis(), sequence))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One tenant's editing session: the working set under edit and the last
/// persisted baseline.
///
/// `save` and `reload` take `&mut self`, so a session never has more than one
/// gateway call in flight.
pub struct ModuleEditingSession<G> {
    id: SessionId,
    tenant: TenantId,
    engine: Arc<ActivationEngine>,
    gateway: Arc<G>,
    persisted: ActivationSet,
    working: ActivationSet,
    violations: Vec<Violation>,
    loaded_at: DateTime<Utc>,
    saved_at: Option<DateTime<Utc>>,
}

impl<G> ModuleEditingSession<G>
where
    G: ModuleGateway + 'static,
{
    pub fn open(
        tenant: TenantId,
        engine: Arc<ActivationEngine>,
        gateway: Arc<G>,
    ) -> Result<Self, SessionError> {
        let persisted = gateway.load_active_modules(&tenant)?;
        let id = SessionId::generate();
        info!(%tenant, session = %id, active = persisted.len(), "opened module editing session");

        let mut session = Self {
            id,
            tenant,
            engine,
            gateway,
            working: tracker::revert(&persisted),
            persisted,
            violations: Vec::new(),
            loaded_at: Utc::now(),
            saved_at: None,
        };
        session.refresh_violations();
        Ok(session)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    pub fn working(&self) -> &ActivationSet {
        &self.working
    }

    pub fn persisted(&self) -> &ActivationSet {
        &self.persisted
    }

    /// Warnings for the working set, refreshed after every transition.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn has_changes(&self) -> bool {
        tracker::has_changes(&self.working, &self.persisted)
    }

    pub fn changes(&self) -> ChangeSummary {
        tracker::diff(&self.working, &self.persisted)
    }

    pub fn toggle(&mut self, target: &ModuleId, enable: bool) -> ToggleOutcome {
        let outcome = self.engine.preview(&self.working, target, enable);
        if let Some(refusal) = &outcome.refusal {
            warn!(tenant = %self.tenant, %refusal, "module toggle refused");
        }
        self.working = outcome.next.clone();
        self.refresh_violations();
        outcome
    }

    pub fn cancel(&mut self) {
        self.working = tracker::revert(&self.persisted);
        self.refresh_violations();
    }

    /// Validates and persists the working set. Nothing is written when the set
    /// is invalid, and a gateway failure leaves the working set untouched.
    pub fn save(&mut self) -> Result<SaveOutcome, SessionError> {
        if !self.has_changes() {
            return Ok(SaveOutcome::Unchanged);
        }

        let validation = self.engine.validate(&self.working);
        if !validation.valid {
            warn!(
                tenant = %self.tenant,
                violations = validation.violations.len(),
                "refusing to save invalid module configuration"
            );
            self.violations = validation.violations.clone();
            return Err(SessionError::Invalid(validation));
        }

        let enabled = self.working.to_sorted_vec();
        if let Err(err) = self.gateway.save_active_modules(&self.tenant, &enabled) {
            warn!(tenant = %self.tenant, error = %err, "module configuration save failed");
            return Err(SessionError::Persistence(err));
        }

        let changes = self.changes();
        info!(
            tenant = %self.tenant,
            enabled = changes.enabled.len(),
            disabled = changes.disabled.len(),
            "saved module configuration"
        );
        self.persisted = self.working.clone();
        self.violations.clear();
        self.saved_at = Some(Utc::now());
        Ok(SaveOutcome::Saved(changes))
    }

    /// Full reload from the gateway, discarding unsaved edits.
    pub fn reload(&mut self) -> Result<(), SessionError> {
        let persisted = self.gateway.load_active_modules(&self.tenant)?;
        info!(tenant = %self.tenant, active = persisted.len(), "reloaded module configuration");
        self.working = tracker::revert(&persisted);
        self.persisted = persisted;
        self.loaded_at = Utc::now();
        self.refresh_violations();
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            tenant: self.tenant.clone(),
            active: self.working.to_sorted_vec(),
            modules: self.engine.module_states(&self.working),
            retired: self
                .working
                .iter()
                .filter(|id| !self.engine.catalog().contains(id))
                .cloned()
                .collect(),
            has_changes: self.has_changes(),
            changes: self.changes(),
            violations: self.violations.iter().map(Violation::message).collect(),
            loaded_at: self.loaded_at,
            saved_at: self.saved_at,
        }
    }

    fn refresh_violations(&mut self) {
        self.violations = self.engine.validate(&self.working).violations;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveOutcome {
    Unchanged,
    Saved(ChangeSummary),
}

/// Serializable view of a session for the configuration screen.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub tenant: TenantId,
    pub active: Vec<ModuleId>,
    pub modules: Vec<ModuleStateView>,
    /// Active ids the catalog no longer knows; disabling them removes them.
    pub retired: Vec<ModuleId>,
    pub has_changes: bool,
    pub changes: ChangeSummary,
    pub violations: Vec<String>,
    pub loaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("module configuration is invalid: {}", .0.messages().join("; "))]
    Invalid(ValidationResult),
    #[error(transparent)]
    Persistence(#[from] GatewayError),
    #[error("editing session '{0}' not found")]
    NotFound(SessionId),
}
