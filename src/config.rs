//! Generator configuration
//!
//! Settings live in a `querygen.toml` file that sits alongside the OpenAPI
//! description, or at a path given with `--config`. Every key is optional:
//!
//! ```toml
//! proto_module = "crate::pb"
//! runtime_module = "crate::runtime"
//! queries_module = "crate::queries"
//! default_page_size = 100
//! page_size_param = "page_size"
//! required_group_extension = "querygen.v1.required_group"
//! base_path = "/api/v1"
//! ```

use crate::schema::DEFAULT_REQUIRED_GROUP_EXTENSION;
use crate::spec::DEFAULT_PAGE_SIZE_FIELD;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up next to the OpenAPI description.
pub const CONFIG_FILE_NAME: &str = "querygen.toml";

/// Page size applied when a List request leaves it unset.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Module path of the prost-generated messages
    pub proto_module: String,
    /// Module path providing `QueryParams`, `Connection`, `Row`, `HandlerError`
    /// and `next_page_token`
    pub runtime_module: String,
    /// Module path providing the `build_{list,get}_<resource>_query` functions
    pub queries_module: String,
    pub default_page_size: u32,
    /// Request field treated as the page size
    pub page_size_param: String,
    /// Fully qualified name of the required-group field option
    pub required_group_extension: String,
    /// Prefix stripped from REST paths before taking the resource segment
    pub base_path: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            proto_module: "crate::pb".to_string(),
            runtime_module: "crate::runtime".to_string(),
            queries_module: "crate::queries".to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            page_size_param: DEFAULT_PAGE_SIZE_FIELD.to_string(),
            required_group_extension: DEFAULT_REQUIRED_GROUP_EXTENSION.to_string(),
            base_path: None,
        }
    }
}

impl GeneratorConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let config: GeneratorConfig = toml::from_str(contents)?;
        if config.default_page_size == 0 {
            anyhow::bail!("default_page_size must be positive");
        }
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(config_path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(config_path).with_context(|| {
            format!("Failed to read generator config: {}", config_path.display())
        })?;
        Self::from_toml(&contents).with_context(|| {
            format!("Failed to parse generator config: {}", config_path.display())
        })
    }

    /// Resolve and load the configuration for a run.
    ///
    /// Priority:
    /// 1. Explicitly provided path (must exist)
    /// 2. `querygen.toml` next to the OpenAPI description
    /// 3. Defaults
    pub fn resolve(explicit_path: Option<&Path>, spec_path: &Path) -> anyhow::Result<Self> {
        match resolve_config_path(explicit_path, spec_path) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading generator config");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }
}

/// Auto-detect `querygen.toml` alongside the OpenAPI description.
pub fn auto_detect_config_path(spec_path: &Path) -> Option<PathBuf> {
    let config_path = spec_path.parent()?.join(CONFIG_FILE_NAME);
    config_path.exists().then_some(config_path)
}

/// Explicit path first, then auto-detection.
pub fn resolve_config_path(explicit_path: Option<&Path>, spec_path: &Path) -> Option<PathBuf> {
    match explicit_path {
        Some(path) => Some(path.to_path_buf()),
        None => auto_detect_config_path(spec_path),
    }
}
