//! Shared "load pipeline" logic.
//!
//! Keeping this in one place keeps the CLI focused on presentation:
//! load file -> conditioned container -> aligned resource profile

use tracing::info;

use crate::config::CaseConfig;
use crate::domain::CanonicalContainer;
use crate::error::LoadError;
use crate::io::{align_resource_profile, load_energy_load};

/// All computed outputs of a single `deropt load` run.
#[derive(Debug, Clone)]
pub struct LoadRun {
    pub case: CaseConfig,
    pub container: CanonicalContainer,
}

/// Load the case's primary series, then align its resource profile if one is configured.
pub fn run_load(case: CaseConfig) -> Result<LoadRun, LoadError> {
    info!(case = %case.name, path = %case.energy_load.path.display(), "loading case");
    let mut container = load_energy_load(&case.energy_load)?;

    if let Some(profile) = &case.solar {
        align_resource_profile(&mut container, profile)?;
    }

    Ok(LoadRun { case, container })
}
