//! Configuration for catalog runs.
//!
//! Configuration sources (highest priority first):
//! 1. Config file (.cataloger/config.yaml)
//! 2. Defaults (name prefix mode, `_` delimiter, `MyLib/` root prefix, all types)
//!
//! Config file discovery:
//! - Searches the start directory and its parents for .cataloger/config.yaml
//! - Paths in the config file are relative to the directory containing .cataloger/

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::{CatalogOptions, ClassificationMode, ClassificationRule, Delimiter};
use crate::domain::{CatalogPath, TargetTypeFilter};

/// Directory holding the config file
pub const CONFIG_DIR: &str = ".cataloger";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub auto_mark_missing_as_assets: bool,
    #[serde(default)]
    pub manual_catalog_override: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryConfig {
    /// Manual asset library root (relative to the project)
    pub root: Option<String>,
    /// Name of an entry in `libraries` to use instead of `root`
    pub registered: Option<String>,
    /// Known asset libraries by name
    #[serde(default)]
    pub libraries: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassificationConfig {
    pub mode: Option<ClassificationMode>,
    pub delimiter: Option<Delimiter>,
    pub root_prefix: Option<String>,
    pub target_type: Option<TargetTypeFilter>,
}

/// Where the asset library root came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootSource {
    /// Named library from `library.libraries`
    Registered,
    /// `library.root`
    Manual,
    /// Directory of the saved project file
    ProjectFile,
}

impl std::fmt::Display for RootSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RootSource::Registered => write!(f, "registered"),
            RootSource::Manual => write!(f, "manual"),
            RootSource::ProjectFile => write!(f, "project file"),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Manual asset library root
    pub library_root: Option<PathBuf>,
    /// Selected registered library name
    pub registered: Option<String>,
    /// Registered libraries by name
    pub libraries: BTreeMap<String, PathBuf>,
    pub mode: ClassificationMode,
    pub delimiter: Delimiter,
    pub root_prefix: String,
    pub target_type: TargetTypeFilter,
    pub auto_mark_missing_as_assets: bool,
    pub manual_catalog_override: Option<CatalogPath>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let rule = ClassificationRule::default();
        Self {
            library_root: None,
            registered: None,
            libraries: BTreeMap::new(),
            mode: rule.mode,
            delimiter: rule.delimiter,
            root_prefix: rule.catalog_root_prefix,
            target_type: rule.target_type_filter,
            auto_mark_missing_as_assets: false,
            manual_catalog_override: None,
            config_file: None,
        }
    }
}

impl ResolvedConfig {
    /// Resolve the asset library root: registered library, then manual root,
    /// then the project file's directory
    pub fn library_root(&self, project_file: Option<&Path>) -> Option<(PathBuf, RootSource)> {
        if let Some(name) = &self.registered {
            match self.libraries.get(name) {
                Some(path) => return Some((path.clone(), RootSource::Registered)),
                None => warn!(library = %name, "Registered library not found, falling back"),
            }
        }

        if let Some(root) = &self.library_root {
            return Some((root.clone(), RootSource::Manual));
        }

        project_file
            .and_then(Path::parent)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| (dir.to_path_buf(), RootSource::ProjectFile))
    }

    /// Build the options for a catalog run
    pub fn catalog_options(&self, project_file: Option<&Path>) -> Result<(CatalogOptions, RootSource)> {
        let (root, source) = self
            .library_root(project_file)
            .context("Asset library root is not set and the project file is not saved")?;

        let options = CatalogOptions {
            rule: ClassificationRule {
                mode: self.mode,
                delimiter: self.delimiter,
                catalog_root_prefix: self.root_prefix.clone(),
                target_type_filter: self.target_type,
                asset_library_root: root,
            },
            auto_mark_missing_as_assets: self.auto_mark_missing_as_assets,
            manual_catalog_override: self.manual_catalog_override.clone(),
        };

        Ok((options, source))
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

fn resolve_file(config_path: &Path, config: ConfigFile) -> Result<ResolvedConfig> {
    // Base directory is the parent of .cataloger/
    let base_dir = config_path
        .parent()
        .and_then(|p| p.parent())
        .unwrap_or(Path::new("."));

    let manual_catalog_override = match config.manual_catalog_override.as_deref() {
        Some(raw) if !raw.trim().is_empty() => Some(
            CatalogPath::parse(raw)
                .with_context(|| format!("Invalid manual_catalog_override: {:?}", raw))?,
        ),
        _ => None,
    };

    let defaults = ResolvedConfig::default();
    let classification = config.classification;

    Ok(ResolvedConfig {
        library_root: config
            .library
            .root
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .map(|r| resolve_path(base_dir, r)),
        registered: config.library.registered,
        libraries: config
            .library
            .libraries
            .iter()
            .map(|(name, path)| (name.clone(), resolve_path(base_dir, path)))
            .collect(),
        mode: classification.mode.unwrap_or(defaults.mode),
        delimiter: classification.delimiter.unwrap_or(defaults.delimiter),
        root_prefix: classification.root_prefix.unwrap_or(defaults.root_prefix),
        target_type: classification.target_type.unwrap_or(defaults.target_type),
        auto_mark_missing_as_assets: config.auto_mark_missing_as_assets,
        manual_catalog_override,
        config_file: Some(config_path.to_path_buf()),
    })
}

/// Load configuration, searching upward from `start`
pub fn load_config(start: &Path) -> Result<ResolvedConfig> {
    match find_config_file(start) {
        Some(config_path) => {
            debug!(path = %config_path.display(), "Using config file");
            let config = load_config_file(&config_path)?;
            resolve_file(&config_path, config)
        }
        None => Ok(ResolvedConfig::default()),
    }
}
