//! Command implementations.

mod info;
mod run;
mod validate;

use std::path::Path;

use contracts::TrackerBlueprint;

use crate::error::{CliError, Result};

pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;

/// Load and validate a blueprint, reporting a missing file distinctly
pub(crate) fn load_blueprint(path: &Path) -> Result<TrackerBlueprint> {
    if !path.exists() {
        return Err(CliError::config_not_found(path));
    }
    Ok(config_loader::ConfigLoader::load_from_path(path)?)
}
