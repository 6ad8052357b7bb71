use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::domain::{ModuleDefinition, ModuleId};

/// Ordered registry of the modules a tenant may enable.
///
/// Catalog order is significant: validation messages and state views are
/// reported in it.
#[derive(Debug, Clone)]
pub struct ModuleCatalog {
    modules: Vec<ModuleDefinition>,
}

impl ModuleCatalog {
    pub fn new(modules: Vec<ModuleDefinition>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(modules.len());

        for mut module in modules {
            if module.id.as_str().trim().is_empty() {
                return Err(CatalogError::EmptyModuleId);
            }
            if !seen.insert(module.id.clone()) {
                return Err(CatalogError::DuplicateModule(module.id));
            }

            let mut declared = HashSet::new();
            module
                .dependencies
                .retain(|dependency| declared.insert(dependency.clone()));
            normalized.push(module);
        }

        let required: HashSet<&ModuleId> = normalized
            .iter()
            .filter(|module| module.required)
            .map(|module| &module.id)
            .collect();
        for module in normalized.iter().filter(|module| module.required) {
            let optional = module
                .dependencies
                .iter()
                .find(|dependency| seen.contains(*dependency) && !required.contains(dependency));
            if let Some(dependency) = optional {
                return Err(CatalogError::RequiredDependsOnOptional {
                    module: module.id.clone(),
                    dependency: dependency.clone(),
                });
            }
        }

        Ok(Self {
            modules: normalized,
        })
    }

    /// Built-in clinic catalog used when no registry export is configured.
    pub fn standard() -> Self {
        Self {
            modules: standard_modules(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parses a JSON array of module definitions.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let modules: Vec<ModuleDefinition> = serde_json::from_reader(reader)?;
        Self::new(modules)
    }

    pub fn modules(&self) -> &[ModuleDefinition] {
        &self.modules
    }

    pub fn get(&self, id: &ModuleId) -> Option<&ModuleDefinition> {
        self.modules.iter().find(|module| &module.id == id)
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.get(id).is_some()
    }

    pub fn required_ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules
            .iter()
            .filter(|module| module.required)
            .map(|module| &module.id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

fn standard_modules() -> Vec<ModuleDefinition> {
    vec![
        ModuleDefinition::new(
            "patients",
            "Patients",
            "Patient registry, demographics, and contact history.",
        )
        .required(),
        ModuleDefinition::new(
            "appointments",
            "Appointments",
            "Scheduling, calendars, and appointment reminders.",
        )
        .required(),
        ModuleDefinition::new(
            "clinical",
            "Clinical Records",
            "Electronic health records, anamnesis, and clinical notes.",
        )
        .required()
        .depends_on(&["appointments"]),
        ModuleDefinition::new(
            "financial",
            "Financial",
            "Billing, receivables, payables, and cash flow.",
        )
        .depends_on(&["appointments"]),
        ModuleDefinition::new(
            "stock",
            "Stock",
            "Inventory of supplies with low-stock alerts.",
        )
        .depends_on(&["financial"]),
        ModuleDefinition::new(
            "procedures",
            "Procedures",
            "Procedure price lists and supply consumption per procedure.",
        )
        .depends_on(&["financial", "stock"]),
        ModuleDefinition::new(
            "bi",
            "Business Intelligence",
            "Dashboards combining financial, clinical, and scheduling indicators.",
        )
        .depends_on(&["financial", "clinical", "appointments"]),
        ModuleDefinition::new(
            "patient_portal",
            "Patient Portal",
            "Self-service booking and record access for patients.",
        )
        .depends_on(&["patients", "appointments"]),
    ]
}

/// Configuration-time failure; a catalog that fails here never reaches the engine.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("module catalog contains an entry with an empty id")]
    EmptyModuleId,
    #[error("module '{0}' is declared more than once")]
    DuplicateModule(ModuleId),
    #[error("module '{module}' depends on unknown module '{dependency}'")]
    UnknownDependency {
        module: ModuleId,
        dependency: ModuleId,
    },
    #[error("required module '{module}' depends on optional module '{dependency}'")]
    RequiredDependsOnOptional {
        module: ModuleId,
        dependency: ModuleId,
    },
    #[error("cyclic module dependency: {}", format_cycle(.cycle))]
    CyclicDependency { cycle: Vec<ModuleId> },
    #[error("unable to read module catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("module catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

fn format_cycle(cycle: &[ModuleId]) -> String {
    cycle
        .iter()
        .map(ModuleId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
