use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::domain::{ModuleDefinition, ModuleId, TenantId};
use super::engine::{ActivationEngine, ToggleOutcome};
use super::gateway::ModuleGateway;
use super::session::{ModuleEditingSession, SaveOutcome, SessionError, SessionId, SessionSnapshot};

type SharedSession<G> = Arc<Mutex<ModuleEditingSession<G>>>;

pub const DEFAULT_IDLE_TIMEOUT_MINUTES: u32 = 30;

struct SessionEntry<G> {
    tenant: TenantId,
    session: SharedSession<G>,
    last_used: DateTime<Utc>,
}

/// Service composing the activation engine, the gateway, and the open editing
/// sessions.
///
/// Every `open` creates an independent session, so two editors of the same
/// clinic never share a working set. Each session sits behind its own mutex,
/// which serializes its saves without blocking other sessions. Sessions idle
/// for longer than the configured timeout are evicted.
pub struct ModuleConfigurationService<G> {
    engine: Arc<ActivationEngine>,
    gateway: Arc<G>,
    sessions: Mutex<HashMap<SessionId, SessionEntry<G>>>,
    idle_timeout: Duration,
}

impl<G> ModuleConfigurationService<G>
where
    G: ModuleGateway + 'static,
{
    pub fn new(engine: Arc<ActivationEngine>, gateway: Arc<G>) -> Self {
        Self {
            engine,
            gateway,
            sessions: Mutex::new(HashMap::new()),
            idle_timeout: Duration::minutes(i64::from(DEFAULT_IDLE_TIMEOUT_MINUTES)),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn engine(&self) -> &ActivationEngine {
        &self.engine
    }

    pub fn catalog(&self) -> CatalogView {
        CatalogView {
            modules: self.engine.catalog().modules().to_vec(),
            activation_order: self
                .engine
                .graph()
                .activation_order()
                .into_iter()
                .cloned()
                .collect(),
        }
    }

    /// Loads the tenant's persisted modules into a new editing session.
    pub fn open(&self, tenant: &TenantId) -> Result<SessionSnapshot, SessionError> {
        let session = ModuleEditingSession::open(
            tenant.clone(),
            self.engine.clone(),
            self.gateway.clone(),
        )?;
        let snapshot = session.snapshot();
        let now = Utc::now();

        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        self.evict_idle(&mut sessions, now);
        sessions
            .entry(session.id().clone())
            .or_insert_with(|| SessionEntry {
                tenant: tenant.clone(),
                session: Arc::new(Mutex::new(session)),
                last_used: now,
            });
        Ok(snapshot)
    }

    pub fn snapshot(
        &self,
        tenant: &TenantId,
        session: &SessionId,
    ) -> Result<SessionSnapshot, SessionError> {
        self.with_session(tenant, session, |session| Ok(session.snapshot()))
    }

    pub fn toggle(
        &self,
        tenant: &TenantId,
        session: &SessionId,
        module: &ModuleId,
        enable: bool,
    ) -> Result<(ToggleOutcome, SessionSnapshot), SessionError> {
        self.with_session(tenant, session, |session| {
            let outcome = session.toggle(module, enable);
            Ok((outcome, session.snapshot()))
        })
    }

    pub fn save(
        &self,
        tenant: &TenantId,
        session: &SessionId,
    ) -> Result<(SaveOutcome, SessionSnapshot), SessionError> {
        self.with_session(tenant, session, |session| {
            let outcome = session.save()?;
            Ok((outcome, session.snapshot()))
        })
    }

    pub fn cancel(
        &self,
        tenant: &TenantId,
        session: &SessionId,
    ) -> Result<SessionSnapshot, SessionError> {
        self.with_session(tenant, session, |session| {
            session.cancel();
            Ok(session.snapshot())
        })
    }

    pub fn reload(
        &self,
        tenant: &TenantId,
        session: &SessionId,
    ) -> Result<SessionSnapshot, SessionError> {
        self.with_session(tenant, session, |session| {
            session.reload()?;
            Ok(session.snapshot())
        })
    }

    /// Discards the session and any unsaved edits.
    pub fn close(&self, tenant: &TenantId, session: &SessionId) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let owned = sessions
            .get(session)
            .is_some_and(|entry| &entry.tenant == tenant);
        if !owned {
            return Err(SessionError::NotFound(session.clone()));
        }
        sessions.remove(session);
        info!(%tenant, %session, "closed module editing session");
        Ok(())
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn with_session<T>(
        &self,
        tenant: &TenantId,
        session: &SessionId,
        action: impl FnOnce(&mut ModuleEditingSession<G>) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let shared = self.lookup(tenant, session, Utc::now())?;
        let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
        action(&mut guard)
    }

    fn lookup(
        &self,
        tenant: &TenantId,
        session: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<SharedSession<G>, SessionError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        self.evict_idle(&mut sessions, now);
        match sessions.get_mut(session) {
            Some(entry) if &entry.tenant == tenant => {
                entry.last_used = now;
                Ok(entry.session.clone())
            }
            _ => Err(SessionError::NotFound(session.clone())),
        }
    }

    fn evict_idle(&self, sessions: &mut HashMap<SessionId, SessionEntry<G>>, now: DateTime<Utc>) {
        let before = sessions.len();
        sessions.retain(|_, entry| now - entry.last_used < self.idle_timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, "evicted idle module editing sessions");
        }
    }
}

/// Catalog listing with a dependency-first activation order.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogView {
    pub modules: Vec<ModuleDefinition>,
    pub activation_order: Vec<ModuleId>,
}
