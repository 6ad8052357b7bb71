//! Module activation engine for the tenant module-management screen.
//!
//! A static [`ModuleCatalog`] is turned into a [`DependencyGraph`] once; the
//! [`ActivationEngine`] cascades toggles over it and validates candidate sets,
//! the [`tracker`] diffs working against persisted sets, and
//! [`ModuleEditingSession`] runs the save flow against a [`ModuleGateway`].

pub mod catalog;
pub mod domain;
pub mod engine;
pub mod gateway;
pub mod graph;
pub mod router;
pub mod service;
pub mod session;
pub mod tracker;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogError, ModuleCatalog};
pub use domain::{ActivationSet, ModuleDefinition, ModuleId, TenantId};
pub use engine::{
    ActivationEngine, ModuleStateView, ToggleOutcome, ToggleRefusal, ValidationResult, Violation,
};
pub use gateway::{GatewayError, ModuleGateway};
pub use graph::DependencyGraph;
pub use router::module_router;
pub use service::{CatalogView, ModuleConfigurationService, DEFAULT_IDLE_TIMEOUT_MINUTES};
pub use session::{ModuleEditingSession, SaveOutcome, SessionError, SessionId, SessionSnapshot};
pub use tracker::ChangeSummary;
