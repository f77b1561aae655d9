//! Rule classifier: maps one asset to a candidate catalog path.
//!
//! Pure and side-effect free, so the session can re-run it for both preview
//! and signature recomputation.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{
    safe_segment, split_fragment, Asset, CatalogPath, TargetTypeFilter, UNCATEGORIZED,
};

/// How catalog paths are derived
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMode {
    /// Leading name token before the delimiter (`Chair_Wood_01` -> `Chair`)
    #[default]
    NamePrefix,

    /// Folder of the originating file relative to the library root
    RelativeFolderPath,
}

/// Token separating the classifying prefix from the rest of a name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    #[default]
    Underscore,
    Dash,
    Space,
}

impl Delimiter {
    pub fn token(self) -> char {
        match self {
            Delimiter::Underscore => '_',
            Delimiter::Dash => '-',
            Delimiter::Space => ' ',
        }
    }
}

/// Classification settings for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub mode: ClassificationMode,
    pub delimiter: Delimiter,
    /// Prepended to every classified path (`MyLib/`)
    pub catalog_root_prefix: String,
    pub target_type_filter: TargetTypeFilter,
    /// Directory holding the catalog definition file
    pub asset_library_root: PathBuf,
}

impl Default for ClassificationRule {
    fn default() -> Self {
        Self {
            mode: ClassificationMode::NamePrefix,
            delimiter: Delimiter::Underscore,
            catalog_root_prefix: "MyLib/".to_string(),
            target_type_filter: TargetTypeFilter::All,
            asset_library_root: PathBuf::new(),
        }
    }
}

/// Why an asset could not be classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Name has no delimiter
    NoDelimiter,

    /// Neither source metadata nor a saved project file
    NoSourcePath,

    /// Originating folder is not under the library root
    OutsideLibraryRoot,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoDelimiter => write!(f, "no delimiter in name"),
            SkipReason::NoSourcePath => write!(f, "no source path"),
            SkipReason::OutsideLibraryRoot => write!(f, "outside library root"),
        }
    }
}

/// Outcome of classifying one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Path(CatalogPath),
    Unclassifiable(SkipReason),
}

/// Classify an asset under `rule`.
///
/// `project_file` is the host's current project file, used as the origin of
/// assets without source metadata in folder mode.
pub fn classify(asset: &Asset, project_file: Option<&Path>, rule: &ClassificationRule) -> Classification {
    let tail = match rule.mode {
        ClassificationMode::NamePrefix => name_prefix_tail(&asset.name, rule.delimiter),
        ClassificationMode::RelativeFolderPath => folder_tail(asset, project_file, rule),
    };

    match tail {
        Ok(tail) => Classification::Path(compose(&rule.catalog_root_prefix, tail)),
        Err(reason) => Classification::Unclassifiable(reason),
    }
}

fn name_prefix_tail(name: &str, delimiter: Delimiter) -> Result<Vec<String>, SkipReason> {
    let split = match delimiter {
        Delimiter::Space => name.trim().split_once(char::is_whitespace),
        _ => name.split_once(delimiter.token()),
    };
    let (head, _) = split.ok_or(SkipReason::NoDelimiter)?;

    Ok(vec![segment_or_uncategorized(head)])
}

/// `safe_segment`, with `Uncategorized` standing in for a segment that sanitizes away
fn segment_or_uncategorized(raw: &str) -> String {
    match safe_segment(raw) {
        segment if segment.is_empty() => UNCATEGORIZED.to_string(),
        segment => segment,
    }
}

fn folder_tail(
    asset: &Asset,
    project_file: Option<&Path>,
    rule: &ClassificationRule,
) -> Result<Vec<String>, SkipReason> {
    let (origin, from_project) = match (&asset.source_path, project_file) {
        (Some(source), _) => (source.as_path(), false),
        (None, Some(project)) => (project, true),
        (None, None) => return Err(SkipReason::NoSourcePath),
    };

    let folder = normalize_lexically(origin.parent().unwrap_or_else(|| Path::new("")));
    let root = normalize_lexically(&rule.asset_library_root);
    let relative = folder
        .strip_prefix(&root)
        .map_err(|_| SkipReason::OutsideLibraryRoot)?;

    let mut segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(segment_or_uncategorized(&part.to_string_lossy())),
            _ => None,
        })
        .collect();

    if from_project {
        segments.push(asset.asset_type.category_segment().to_string());
    }
    Ok(segments)
}

fn compose(root_prefix: &str, tail: Vec<String>) -> CatalogPath {
    CatalogPath::from_segments(split_fragment(root_prefix).into_iter().chain(tail))
        .unwrap_or_else(CatalogPath::uncategorized)
}

/// Resolve `.` and `..` without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
