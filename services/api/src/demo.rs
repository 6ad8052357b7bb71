use crate::infra::{load_engine, parse_toggle, InMemoryModuleGateway, ToggleArg};
use clap::Args;
use clinic_modules::config::{AppConfig, CatalogConfig};
use clinic_modules::error::AppError;
use clinic_modules::modules::{
    ActivationEngine, ActivationSet, ModuleEditingSession, ModuleId, SaveOutcome, SessionError,
    SessionSnapshot, TenantId, ToggleOutcome,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Module catalog JSON; defaults to APP_MODULE_CATALOG or the built-in clinic catalog
    #[arg(long)]
    pub(crate) path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Module catalog JSON; defaults to APP_MODULE_CATALOG or the built-in clinic catalog
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Tenant whose module set is edited
    #[arg(long, default_value = "demo-clinic")]
    pub(crate) tenant: String,
    /// Comma separated modules stored before editing; defaults to the required baseline
    #[arg(long, value_delimiter = ',')]
    pub(crate) seed: Vec<String>,
    /// Toggle to apply as MODULE=on or MODULE=off; repeat to apply several in order
    #[arg(long = "toggle", value_parser = parse_toggle)]
    pub(crate) toggles: Vec<ToggleArg>,
    /// Persist the edited set through the in-memory gateway
    #[arg(long)]
    pub(crate) save: bool,
}

fn resolve_catalog(path: Option<PathBuf>) -> Result<CatalogConfig, AppError> {
    match path {
        Some(path) => Ok(CatalogConfig { path: Some(path) }),
        None => Ok(AppConfig::load()?.catalog),
    }
}

fn catalog_source(config: &CatalogConfig) -> String {
    config
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in clinic catalog".to_string())
}

pub(crate) fn run_catalog_check(args: CatalogArgs) -> Result<(), AppError> {
    let config = resolve_catalog(args.path)?;
    let engine = load_engine(&config)?;
    let catalog = engine.catalog();

    println!("Catalog OK ({})", catalog_source(&config));
    println!(
        "- {} modules | {} required",
        catalog.len(),
        catalog.required_ids().count()
    );
    println!("- activation order: {}", join_ids(engine.graph().activation_order()));
    Ok(())
}

pub(crate) fn run_catalog_show(args: CatalogArgs) -> Result<(), AppError> {
    let config = resolve_catalog(args.path)?;
    let engine = load_engine(&config)?;

    println!("Module catalog ({})", catalog_source(&config));
    for module in engine.catalog().modules() {
        let marker = if module.required { " [required]" } else { "" };
        println!("- {} ({}){}", module.id, module.display_name(), marker);
        if !module.description.is_empty() {
            println!("    {}", module.description);
        }
        println!(
            "    depends on: {}",
            join_ids(engine.graph().dependencies_of(&module.id))
        );
        println!(
            "    needed by: {}",
            join_ids(engine.graph().dependents_of(&module.id))
        );
    }
    println!(
        "Activation order: {}",
        join_ids(engine.graph().activation_order())
    );
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        catalog,
        tenant,
        seed,
        toggles,
        save,
    } = args;

    let config = resolve_catalog(catalog)?;
    let engine = Arc::new(load_engine(&config)?);
    let tenant = TenantId(tenant);
    let seeded = seed_set(&engine, &seed);
    let gateway =
        Arc::new(InMemoryModuleGateway::default().with_tenant(tenant.clone(), seeded));

    println!("Module activation demo for tenant '{tenant}'");
    println!("Catalog: {}", catalog_source(&config));

    let mut session = match ModuleEditingSession::open(tenant.clone(), engine, gateway.clone()) {
        Ok(session) => session,
        Err(err) => {
            println!("Unable to open editing session: {err}");
            return Ok(());
        }
    };
    render_snapshot("Stored configuration", &session.snapshot());

    if !toggles.is_empty() {
        println!("\nToggles");
        for toggle in &toggles {
            let outcome = session.toggle(&toggle.module, toggle.enable);
            render_toggle(toggle, &outcome);
        }
        render_snapshot("Working configuration", &session.snapshot());
    }

    if save {
        println!("\nSave");
        match session.save() {
            Ok(SaveOutcome::Unchanged) => println!("- nothing to save"),
            Ok(SaveOutcome::Saved(summary)) => {
                println!(
                    "- saved | enabled: {} | disabled: {}",
                    join_ids(&summary.enabled),
                    join_ids(&summary.disabled)
                );
                if let Some(record) = gateway.record(&tenant) {
                    println!(
                        "- stored {} modules at {}",
                        record.modules.len(),
                        record.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
            }
            Err(SessionError::Invalid(result)) => {
                println!("- rejected, configuration is invalid:");
                for message in result.messages() {
                    println!("  - {message}");
                }
            }
            Err(err) => println!("- failed: {err}"),
        }
    }

    Ok(())
}

fn seed_set(engine: &ActivationEngine, seed: &[String]) -> ActivationSet {
    if seed.is_empty() {
        return engine.baseline();
    }
    seed.iter()
        .map(|raw| raw.trim())
        .filter(|raw| !raw.is_empty())
        .collect()
}

fn render_toggle(toggle: &ToggleArg, outcome: &ToggleOutcome) {
    let verb = if toggle.enable { "enable" } else { "disable" };
    if let Some(refusal) = &outcome.refusal {
        println!("- {verb} {}: refused ({refusal})", toggle.module);
        return;
    }
    if !outcome.changed() {
        println!("- {verb} {}: no change", toggle.module);
        return;
    }
    println!(
        "- {verb} {}: +[{}] -[{}]",
        toggle.module,
        join_ids(&outcome.enabled),
        join_ids(&outcome.disabled)
    );
}

fn render_snapshot(title: &str, snapshot: &SessionSnapshot) {
    println!("\n{title}");
    println!("- active: {}", join_ids(&snapshot.active));
    if !snapshot.retired.is_empty() {
        println!("- retired from catalog: {}", join_ids(&snapshot.retired));
    }
    println!(
        "- pending changes: {}",
        if snapshot.has_changes { "yes" } else { "no" }
    );
    if snapshot.has_changes {
        println!(
            "  - enabling: {} | disabling: {}",
            join_ids(&snapshot.changes.enabled),
            join_ids(&snapshot.changes.disabled)
        );
    }
    if snapshot.violations.is_empty() {
        println!("- validation: ok");
    } else {
        println!("- validation: {} problem(s)", snapshot.violations.len());
        for message in &snapshot.violations {
            println!("  - {message}");
        }
    }
}

fn join_ids<'a, I>(ids: I) -> String
where
    I: IntoIterator<Item = &'a ModuleId>,
{
    let joined = ids
        .into_iter()
        .map(ModuleId::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        "none".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_modules::modules::ModuleCatalog;

    fn engine() -> ActivationEngine {
        ActivationEngine::new(ModuleCatalog::standard()).expect("standard catalog is acyclic")
    }

    #[test]
    fn empty_seed_falls_back_to_baseline() {
        let engine = engine();
        assert_eq!(seed_set(&engine, &[]), engine.baseline());
    }

    #[test]
    fn seed_ignores_blank_entries() {
        let engine = engine();
        let seeded = seed_set(&engine, &["patients".to_string(), " ".to_string()]);
        assert_eq!(seeded.to_sorted_vec(), vec![ModuleId::from("patients")]);
    }

    #[test]
    fn join_ids_reports_none_for_empty_lists() {
        let empty: Vec<ModuleId> = Vec::new();
        assert_eq!(join_ids(&empty), "none");
        let ids = vec![ModuleId::from("bi"), ModuleId::from("financial")];
        assert_eq!(join_ids(&ids), "bi, financial");
    }

    #[test]
    fn demo_runs_toggles_and_save() {
        let args = DemoArgs {
            catalog: None,
            tenant: "demo-clinic".to_string(),
            seed: Vec::new(),
            toggles: vec![parse_toggle("bi=on").expect("valid toggle")],
            save: true,
        };
        run_demo(args).expect("demo completes");
    }
}
