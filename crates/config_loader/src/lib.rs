//! # Config Loader
//!
//! Turns a TOML or JSON file into a validated `TrackerBlueprint`.
//!
//! Loading always validates; a blueprint returned from here can be handed to
//! `SessionRegistry` and `create_dispatcher` as is. Blueprints changed in code
//! afterwards should go through [`ConfigLoader::validate`] again.
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("tracker.toml")).unwrap();
//! println!("Threshold: {} rad/s", blueprint.detector.height_threshold);
//! ```

mod parser;
mod validator;

pub use contracts::TrackerBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Entry points for reading, checking and rendering blueprints
pub struct ConfigLoader;

impl ConfigLoader {
    /// Read `path`, picking the format from its extension
    ///
    /// # Errors
    /// `ConfigParse` for an unknown extension or malformed content, `Io` when
    /// the file cannot be read, `ConfigValidation` for the first broken rule.
    pub fn load_from_path(path: &Path) -> Result<TrackerBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<TrackerBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        Self::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Check every rule, returning the first violation
    pub fn validate(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Render a blueprint in the given format
    pub fn render(blueprint: &TrackerBlueprint, format: ConfigFormat) -> Result<String, ContractError> {
        match format {
            ConfigFormat::Toml => toml::to_string_pretty(blueprint)
                .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}"))),
            ConfigFormat::Json => serde_json::to_string_pretty(blueprint)
                .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}"))),
        }
    }
}
