//! Case configuration.
//!
//! A case bundles the load file settings, an optional solar profile and solar
//! PV parameters for one site. Cases are registered explicitly by name in a
//! [`CaseRegistry`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::domain::{EnergyLoadConfig, ProfileConfig, ResourceKind};
use crate::error::LoadError;

pub mod discovery;
pub mod solar_pv;

pub use discovery::*;
pub use solar_pv::*;

/// Case used when neither `--case` nor `DEROPT_CASE` is given.
pub const DEFAULT_CASE: &str = "igiugig";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseConfig {
    /// Display name.
    pub name: String,
    pub energy_load: EnergyLoadConfig,
    pub solar: Option<ProfileConfig>,
    pub solar_pv: SolarPvParams,
}

impl CaseConfig {
    pub fn new(name: impl Into<String>, energy_load: EnergyLoadConfig) -> Self {
        Self {
            name: name.into(),
            energy_load,
            solar: None,
            solar_pv: SolarPvParams::default(),
        }
    }

    /// Attach the solar profile found next to the load file, if any.
    fn with_solar_from(mut self, dir: &Path) -> Self {
        self.solar = discover_solar_file(dir).map(|path| ProfileConfig::new(path, ResourceKind::Solar));
        self
    }
}

/// Builds a case from the project root.
pub type CaseBuilder = fn(&Path) -> Result<CaseConfig, LoadError>;

/// Lower-case, with spaces and dashes as underscores.
pub fn normalize_case_name(name: &str) -> String {
    name.trim().to_lowercase().replace(['-', ' '], "_")
}

#[derive(Debug, Clone, Default)]
pub struct CaseRegistry {
    builders: BTreeMap<String, CaseBuilder>,
}

impl CaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the cases shipped with the project.
    pub fn with_builtin_cases() -> Self {
        let mut registry = Self::new();
        registry.register("igiugig", igiugig_case);
        registry.register("igiugig_multi_node", igiugig_multi_node_case);
        registry.register("igiugig_xlsx", igiugig_xlsx_case);
        registry
    }

    /// Register `builder` under `name`, replacing any earlier builder of that name.
    pub fn register(&mut self, name: &str, builder: CaseBuilder) {
        self.builders.insert(normalize_case_name(name), builder);
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.builders.keys().cloned().collect()
    }

    pub fn build(&self, project_root: &Path, name: &str) -> Result<CaseConfig, LoadError> {
        let builder = self
            .builders
            .get(&normalize_case_name(name))
            .ok_or_else(|| LoadError::UnknownCase {
                name: name.to_string(),
                available: self.names(),
            })?;
        builder(project_root)
    }
}

fn igiugig_case(root: &Path) -> Result<CaseConfig, LoadError> {
    let dir = root.join("data").join("Igiugig");
    let load = EnergyLoadConfig::new(dir.join("Igiugig_Electric_Loads.csv"));
    Ok(CaseConfig::new("Igiugig", load).with_solar_from(&dir))
}

fn igiugig_multi_node_case(root: &Path) -> Result<CaseConfig, LoadError> {
    let dir = root.join("data").join("Igiugig_Multi_Node");
    let load = EnergyLoadConfig::new(dir.join("Igiugig_Electric_Loads.csv"));
    Ok(CaseConfig::new("Igiugig Multi Node", load).with_solar_from(&dir))
}

fn igiugig_xlsx_case(root: &Path) -> Result<CaseConfig, LoadError> {
    let dir = root.join("data").join("Igiugig_xlsx");
    let load = EnergyLoadConfig::new(discover_load_file(&dir)?);
    Ok(CaseConfig::new("Igiugig xlsx", load).with_solar_from(&dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn builtin_names_are_sorted() {
        let registry = CaseRegistry::with_builtin_cases();
        assert_eq!(registry.names(), vec!["igiugig", "igiugig_multi_node", "igiugig_xlsx"]);
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(normalize_case_name(" Igiugig Multi-Node "), "igiugig_multi_node");

        let root = tempfile::tempdir().unwrap();
        let case = CaseRegistry::with_builtin_cases()
            .build(root.path(), "Igiugig-Multi Node")
            .unwrap();
        assert_eq!(case.name, "Igiugig Multi Node");
        assert_eq!(
            case.energy_load.path,
            root.path().join("data/Igiugig_Multi_Node/Igiugig_Electric_Loads.csv")
        );
        assert_eq!(case.energy_load.load_column, "Electric Demand (kW)");
        assert!(case.solar.is_none());
    }

    #[test]
    fn unknown_case_lists_available() {
        let err = CaseRegistry::with_builtin_cases()
            .build(Path::new("."), "nowhere")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'nowhere'"), "{msg}");
        assert!(msg.contains("igiugig, igiugig_multi_node, igiugig_xlsx"), "{msg}");
    }

    #[test]
    fn xlsx_case_discovers_files() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("data").join("Igiugig_xlsx");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Igiugig_Loads.xlsx"), "x").unwrap();
        fs::write(dir.join("Igiugig_Solar.csv"), "x").unwrap();

        let case = CaseRegistry::with_builtin_cases().build(root.path(), "igiugig_xlsx").unwrap();
        assert_eq!(case.energy_load.path, dir.join("Igiugig_Loads.xlsx"));
        let solar = case.solar.unwrap();
        assert_eq!(solar.path, dir.join("Igiugig_Solar.csv"));
        assert_eq!(solar.resource, ResourceKind::Solar);
    }

    #[test]
    fn custom_registration() {
        fn tiny(root: &Path) -> Result<CaseConfig, LoadError> {
            Ok(CaseConfig::new("Tiny", EnergyLoadConfig::new(root.join("tiny.csv"))))
        }
        let mut registry = CaseRegistry::new();
        registry.register("Tiny Site", tiny);
        assert_eq!(registry.names(), vec!["tiny_site"]);
        assert_eq!(registry.build(Path::new("/p"), "tiny site").unwrap().name, "Tiny");
    }
}
