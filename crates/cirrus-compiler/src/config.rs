//! `cirrus.yaml` project configuration.

use crate::manager::ManagerOptions;
use cirrus_emit::EmitOptions;
use cirrus_resolve::{CatalogError, StaticCatalog};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Project settings. Every field is optional.
///
/// ```yaml
/// catalog: types/catalog.json
/// emit:
///   contentVersion: 2.0.0.0
///   pretty: false
/// diagnostics:
///   warningsAsErrors: true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CirrusConfig {
    /// Resource type catalog JSON. Relative paths are resolved against the
    /// directory of the config file.
    pub catalog: Option<PathBuf>,
    pub emit: EmitConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EmitConfig {
    pub content_version: String,
    /// Indent written templates.
    pub pretty: bool,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            content_version: EmitOptions::default().content_version,
            pretty: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct DiagnosticsConfig {
    pub warnings_as_errors: bool,
}

impl CirrusConfig {
    pub const FILE_NAME: &'static str = "cirrus.yaml";

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load `path`. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let mut config = Self::from_yaml(&content)?;
        if let (Some(catalog), Some(dir)) = (&config.catalog, path.parent()) {
            if catalog.is_relative() {
                config.catalog = Some(dir.join(catalog));
            }
        }
        Ok(config)
    }

    /// Load `cirrus.yaml` from `dir`.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        Self::load(&dir.join(Self::FILE_NAME))
    }

    pub fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            content_version: self.emit.content_version.clone(),
            warnings_as_errors: self.diagnostics.warnings_as_errors,
        }
    }

    pub fn manager_options(&self) -> ManagerOptions {
        ManagerOptions {
            emit: self.emit_options(),
        }
    }

    /// The configured catalog, or an empty one.
    pub fn load_catalog(&self) -> Result<StaticCatalog, ConfigError> {
        match &self.catalog {
            Some(path) => Ok(StaticCatalog::from_json_file(path)?),
            None => Ok(StaticCatalog::new()),
        }
    }
}
