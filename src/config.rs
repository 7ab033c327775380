use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{RefTreeError, Result};

/// Name of the configuration file stored inside the `.reftree` directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Name of the hidden directory used to store resolver metadata.
pub const REFTREE_DIR: &str = ".reftree";

/// Object type that site references are reported under.
pub const DEFAULT_SITE_OBJECT_TYPE: &str = "cms.site";

/// Object type that group ids point at.
pub const DEFAULT_GROUP_OBJECT_TYPE: &str = "community.group";

/// Configuration for a resolver project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Schema version of the configuration.
    pub version: u32,
    /// Type catalog file (TOML), relative to the `.reftree` directory.
    pub catalog_file: String,
    /// SQLite database file, relative to the `.reftree` directory.
    pub database_file: String,
    /// Object type reported for site references.
    pub site_object_type: String,
    /// Object type group ids resolve against.
    pub group_object_type: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            version: 1,
            catalog_file: "catalog.toml".to_string(),
            database_file: "reftree.db".to_string(),
            site_object_type: DEFAULT_SITE_OBJECT_TYPE.to_string(),
            group_object_type: DEFAULT_GROUP_OBJECT_TYPE.to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn catalog_path(&self, project_root: &Path) -> PathBuf {
        get_reftree_dir(project_root).join(&self.catalog_file)
    }

    pub fn database_path(&self, project_root: &Path) -> PathBuf {
        get_reftree_dir(project_root).join(&self.database_file)
    }
}

/// Returns the path to the `.reftree` directory within the given project root.
pub fn get_reftree_dir(project_root: &Path) -> PathBuf {
    project_root.join(REFTREE_DIR)
}

/// Returns the path to the configuration file within the `.reftree` directory.
pub fn get_config_path(project_root: &Path) -> PathBuf {
    get_reftree_dir(project_root).join(CONFIG_FILENAME)
}

/// Loads the configuration from disk.
///
/// If the configuration file does not exist, returns the default configuration.
/// Missing keys in an existing file take their default values.
pub fn load_config(project_root: &Path) -> Result<ResolverConfig> {
    let config_path = get_config_path(project_root);

    if !config_path.exists() {
        return Ok(ResolverConfig::default());
    }

    let contents = fs::read_to_string(&config_path).map_err(|e| RefTreeError::Config {
        message: format!(
            "failed to read config file '{}': {}",
            config_path.display(),
            e
        ),
    })?;

    let config: ResolverConfig =
        serde_json::from_str(&contents).map_err(|e| RefTreeError::Config {
            message: format!(
                "failed to parse config file '{}': {}",
                config_path.display(),
                e
            ),
        })?;

    if config.group_object_type.trim().is_empty() || config.site_object_type.trim().is_empty() {
        return Err(RefTreeError::Config {
            message: format!(
                "config file '{}' must name both a site and a group object type",
                config_path.display()
            ),
        });
    }

    Ok(config)
}

/// Saves the configuration to disk using an atomic write.
///
/// Writes to a temporary file first and then renames it into place.
pub fn save_config(project_root: &Path, config: &ResolverConfig) -> Result<()> {
    let reftree_dir = get_reftree_dir(project_root);
    fs::create_dir_all(&reftree_dir).map_err(|e| RefTreeError::Config {
        message: format!(
            "failed to create reftree directory '{}': {}",
            reftree_dir.display(),
            e
        ),
    })?;

    let config_path = get_config_path(project_root);
    let tmp_path = config_path.with_extension("tmp");

    let json = serde_json::to_string_pretty(config).map_err(|e| RefTreeError::Config {
        message: format!("failed to serialize config: {}", e),
    })?;

    fs::write(&tmp_path, &json).map_err(|e| RefTreeError::Config {
        message: format!(
            "failed to write temporary config file '{}': {}",
            tmp_path.display(),
            e
        ),
    })?;

    fs::rename(&tmp_path, &config_path).map_err(|e| RefTreeError::Config {
        message: format!(
            "failed to rename temporary config file '{}' to '{}': {}",
            tmp_path.display(),
            config_path.display(),
            e
        ),
    })?;

    Ok(())
}
