//! Catalog definition file (CDF) parsing, merging and backed-up writes.
//!
//! Line format, after a `VERSION 1` header:
//!
//! ```text
//! # comment
//! VERSION 1
//! 313ea471-7c79-4766-a8e7-0d0b6a8e1d3b:Auto/Chair:Chair
//! ```

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::CatalogPath;

/// Catalog definition file name inside an asset library root
pub const CATALOG_FILE_NAME: &str = "blender_assets.cats.txt";

/// Suffix appended to the catalog file name for its backup
pub const BACKUP_SUFFIX: &str = ".bak";

/// Only format version understood
pub const SUPPORTED_VERSION: u32 = 1;

const DEFAULT_HEADER: [&str; 3] = [
    "# This is an Asset Catalog Definition file for Blender.",
    "# Managed by cataloger.",
    "VERSION 1",
];

/// Errors raised by the catalog store
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Malformed catalog file {path} at line {line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Failed to back up catalog file to {path}: {source}")]
    BackupWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backup not found: {0}")]
    BackupNotFound(PathBuf),
}

/// A single catalog definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Catalog UUID referenced by assets
    pub id: Uuid,

    /// Full catalog path
    pub path: CatalogPath,

    /// Short display name
    pub name: String,
}

impl CatalogEntry {
    /// Create an entry with a fresh id and a name derived from the path leaf
    pub fn new(path: CatalogPath) -> Self {
        let name = path.display_leaf();
        Self {
            id: Uuid::new_v4(),
            path,
            name,
        }
    }

    /// Render as a CDF line
    pub fn to_line(&self) -> String {
        format!("{}:{}:{}", self.id, self.path, self.name)
    }
}

#[derive(Debug, Clone)]
enum Line {
    /// Header, comment or blank line, kept verbatim
    Text(String),

    /// Catalog definition; `raw` is the exact text it was read from
    Entry { raw: String, entry: CatalogEntry },
}

/// In-memory catalog tree, preserving the text of every line it was read from
#[derive(Debug, Clone)]
pub struct CatalogTree {
    lines: Vec<Line>,

    /// Rendered catalog path -> index into `lines`
    index: HashMap<String, usize>,

    /// Entries merged since load or last write
    pending: usize,

    /// Line terminator of the file read, reused for every rendered line
    line_ending: &'static str,
}

impl Default for CatalogTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogTree {
    /// Create an empty tree with the default header
    pub fn new() -> Self {
        Self {
            lines: DEFAULT_HEADER.iter().map(|l| Line::Text(l.to_string())).collect(),
            index: HashMap::new(),
            pending: 0,
            line_ending: "\n",
        }
    }

    /// Parse CDF content. `source` is only used in error messages.
    ///
    /// Several entries may share a path (aliased catalogs); all of them are
    /// kept and lookups resolve to the first.
    pub fn parse(content: &str, source: &Path) -> Result<Self, CatalogError> {
        let parse_error = |line: usize, reason: String| CatalogError::Parse {
            path: source.to_path_buf(),
            line,
            reason,
        };

        let mut lines = Vec::new();
        let mut has_version = false;
        let line_ending = if content.contains("\r\n") { "\r\n" } else { "\n" };

        for (i, raw) in content.lines().enumerate() {
            let line_no = i + 1;
            let raw = raw.trim_end_matches('\r');
            let trimmed = raw.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                lines.push(Line::Text(raw.to_string()));
                continue;
            }

            if let Some(version) = trimmed.strip_prefix("VERSION") {
                let version: u32 = version
                    .trim()
                    .parse()
                    .map_err(|_| parse_error(line_no, format!("invalid version line {:?}", trimmed)))?;
                if version != SUPPORTED_VERSION {
                    return Err(parse_error(line_no, format!("unsupported version {}", version)));
                }
                has_version = true;
                lines.push(Line::Text(raw.to_string()));
                continue;
            }

            let mut parts = trimmed.splitn(3, ':');
            let (id, path, name) = match (parts.next(), parts.next(), parts.next()) {
                (Some(id), Some(path), Some(name)) => (id, path, name),
                _ => {
                    return Err(parse_error(
                        line_no,
                        "expected <uuid>:<path>:<name>".to_string(),
                    ))
                }
            };

            let id = Uuid::parse_str(id)
                .map_err(|e| parse_error(line_no, format!("invalid catalog id {:?}: {}", id, e)))?;
            let path = CatalogPath::parse(path)
                .ok_or_else(|| parse_error(line_no, "empty catalog path".to_string()))?;

            lines.push(Line::Entry {
                raw: raw.to_string(),
                entry: CatalogEntry {
                    id,
                    path,
                    name: name.to_string(),
                },
            });
        }

        if lines.is_empty() {
            return Ok(Self::new());
        }
        if !has_version {
            // Below the leading comment block
            let at = lines
                .iter()
                .position(|line| !matches!(line, Line::Text(text) if text.trim_start().starts_with('#')))
                .unwrap_or(lines.len());
            lines.insert(at, Line::Text(format!("VERSION {}", SUPPORTED_VERSION)));
        }

        let mut tree = Self {
            lines,
            index: HashMap::new(),
            pending: 0,
            line_ending,
        };
        tree.rebuild_index();
        Ok(tree)
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, line) in self.lines.iter().enumerate() {
            if let Line::Entry { entry, .. } = line {
                self.index.entry(entry.path.to_string()).or_insert(i);
            }
        }
    }

    /// Add an entry for every path not already defined.
    ///
    /// Existing lines are never touched; new entries are appended in path
    /// order. Returns the entries created.
    pub fn merge<'a, I>(&mut self, paths: I) -> Vec<CatalogEntry>
    where
        I: IntoIterator<Item = &'a CatalogPath>,
    {
        let mut wanted: Vec<&CatalogPath> = paths.into_iter().collect();
        wanted.sort();
        wanted.dedup();

        let mut created = Vec::new();
        for path in wanted {
            if self.index.contains_key(&path.to_string()) {
                continue;
            }

            let mut entry = CatalogEntry::new(path.clone());
            while self.entries().any(|e| e.id == entry.id) {
                entry.id = Uuid::new_v4();
            }

            debug!(catalog = %entry.path, id = %entry.id, "New catalog");
            self.index.insert(path.to_string(), self.lines.len());
            self.lines.push(Line::Entry {
                raw: entry.to_line(),
                entry: entry.clone(),
            });
            created.push(entry);
        }

        self.pending += created.len();
        created
    }

    /// Get an entry by path
    pub fn get(&self, path: &CatalogPath) -> Option<&CatalogEntry> {
        let index = *self.index.get(&path.to_string())?;
        match &self.lines[index] {
            Line::Entry { entry, .. } => Some(entry),
            Line::Text(_) => None,
        }
    }

    /// All entries in file order
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { entry, .. } => Some(entry),
            Line::Text(_) => None,
        })
    }

    /// Get the number of entries, aliases included
    pub fn len(&self) -> usize {
        self.entries().count()
    }

    /// Check if the tree has no entries
    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    /// Whether entries were merged since load or the last write
    pub fn has_pending(&self) -> bool {
        self.pending > 0
    }

    /// Render the file content
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Text(text) => out.push_str(text),
                Line::Entry { raw, .. } => out.push_str(raw),
            }
            out.push_str(self.line_ending);
        }
        out
    }
}

/// Result of a store write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Nothing new to persist; no backup taken, file untouched
    Unchanged,

    /// File rewritten
    Written {
        /// Entries added by this write
        created: usize,

        /// Backup taken beforehand (absent if the file did not exist)
        backup: Option<PathBuf>,
    },
}

/// Existence of the catalog file and its backup
#[derive(Debug, Clone)]
pub struct CatalogStatus {
    pub catalog_file: PathBuf,
    pub backup_file: PathBuf,
    pub catalog_exists: bool,
    pub backup_exists: bool,
}

/// Catalog definition file of one asset library
#[derive(Debug, Clone)]
pub struct CatalogStore {
    catalog_file: PathBuf,
    backup_file: PathBuf,
}

impl CatalogStore {
    /// Store for the catalog file at the root of an asset library
    pub fn for_library(root: &Path) -> Self {
        Self::at(root.join(CATALOG_FILE_NAME))
    }

    /// Store for an explicit catalog file path
    pub fn at(catalog_file: PathBuf) -> Self {
        let mut backup = catalog_file.clone().into_os_string();
        backup.push(BACKUP_SUFFIX);

        Self {
            catalog_file,
            backup_file: PathBuf::from(backup),
        }
    }

    pub fn catalog_file(&self) -> &Path {
        &self.catalog_file
    }

    pub fn backup_file(&self) -> &Path {
        &self.backup_file
    }

    /// Load the catalog tree; a missing file yields an empty tree
    pub fn load(&self) -> Result<CatalogTree, CatalogError> {
        if !self.catalog_file.exists() {
            debug!(path = %self.catalog_file.display(), "No catalog file yet");
            return Ok(CatalogTree::new());
        }

        let content = fs::read_to_string(&self.catalog_file).map_err(|source| CatalogError::Io {
            path: self.catalog_file.clone(),
            source,
        })?;

        CatalogTree::parse(&content, &self.catalog_file)
    }

    /// Persist merged entries.
    ///
    /// Skipped entirely when the tree has nothing pending. Otherwise an
    /// existing file is first copied to the backup; if that fails the primary
    /// file is left untouched. The primary is replaced atomically.
    pub fn write(&self, tree: &mut CatalogTree) -> Result<WriteOutcome, CatalogError> {
        if !tree.has_pending() {
            debug!(path = %self.catalog_file.display(), "Catalog unchanged, skipping write");
            return Ok(WriteOutcome::Unchanged);
        }

        let backup = if self.catalog_file.exists() {
            fs::copy(&self.catalog_file, &self.backup_file).map_err(|source| {
                CatalogError::BackupWrite {
                    path: self.backup_file.clone(),
                    source,
                }
            })?;
            debug!(backup = %self.backup_file.display(), "Catalog backed up");
            Some(self.backup_file.clone())
        } else {
            None
        };

        self.replace_contents(tree.render().as_bytes())?;

        let created = tree.pending;
        tree.pending = 0;
        info!(
            path = %self.catalog_file.display(),
            created,
            "Catalog file written"
        );

        Ok(WriteOutcome::Written { created, backup })
    }

    /// Copy the backup back over the catalog file, byte for byte
    pub fn restore(&self) -> Result<(), CatalogError> {
        if !self.backup_file.exists() {
            return Err(CatalogError::BackupNotFound(self.backup_file.clone()));
        }

        let content = fs::read(&self.backup_file).map_err(|source| CatalogError::Io {
            path: self.backup_file.clone(),
            source,
        })?;
        self.replace_contents(&content)?;

        info!(
            path = %self.catalog_file.display(),
            backup = %self.backup_file.display(),
            "Catalog file restored from backup"
        );
        Ok(())
    }

    /// Report which of the catalog and backup files exist
    pub fn status(&self) -> CatalogStatus {
        CatalogStatus {
            catalog_file: self.catalog_file.clone(),
            backup_file: self.backup_file.clone(),
            catalog_exists: self.catalog_file.exists(),
            backup_exists: self.backup_file.exists(),
        }
    }

    /// Write through a temp file in the same directory, then rename over the target
    fn replace_contents(&self, content: &[u8]) -> Result<(), CatalogError> {
        let io_error = |source: std::io::Error| CatalogError::Io {
            path: self.catalog_file.clone(),
            source,
        };

        let dir = match self.catalog_file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(io_error)?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(io_error)?;
        temp.write_all(content).map_err(io_error)?;
        temp.as_file().sync_all().map_err(io_error)?;
        temp.persist(&self.catalog_file).map_err(|e| io_error(e.error))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXISTING: &str = "\
# This is an Asset Catalog Definition file for Blender.
VERSION 1

0f3c7a2e-9d1b-4c5e-8f6a-1b2c3d4e5f60:Props/Chairs:Chairs
6a1d5e4f-2b3c-4d5e-9f80-7a6b5c4d3e2f:Hand Made/Lamps:My: Lamps
";

    fn path(s: &str) -> CatalogPath {
        CatalogPath::parse(s).unwrap()
    }

    #[test]
    fn test_parse_existing_entries() {
        let tree = CatalogTree::parse(EXISTING, Path::new("cats.txt")).unwrap();

        assert_eq!(tree.len(), 2);
        let lamps = tree.get(&path("Hand Made/Lamps")).unwrap();
        assert_eq!(lamps.name, "My: Lamps");
        assert_eq!(
            lamps.id,
            Uuid::parse_str("6a1d5e4f-2b3c-4d5e-9f80-7a6b5c4d3e2f").unwrap()
        );
        assert!(!tree.has_pending());
    }

    #[test]
    fn test_render_preserves_untouched_lines() {
        let tree = CatalogTree::parse(EXISTING, Path::new("cats.txt")).unwrap();
        assert_eq!(tree.render(), EXISTING);
    }

    #[test]
    fn test_merge_appends_only_new_paths() {
        let mut tree = CatalogTree::parse(EXISTING, Path::new("cats.txt")).unwrap();
        let existing_id = tree.get(&path("Props/Chairs")).unwrap().id;

        let created = tree.merge(&[path("Props/Chairs"), path("Auto/Lamp"), path("Auto/Lamp")]);

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].path, path("Auto/Lamp"));
        assert_eq!(created[0].name, "Lamp");
        assert_eq!(tree.get(&path("Props/Chairs")).unwrap().id, existing_id);
        assert!(tree.render().starts_with(EXISTING));
        assert!(tree.has_pending());

        let again = tree.merge(&[path("Auto/Lamp")]);
        assert!(again.is_empty());
    }

    #[test]
    fn test_missing_version_is_added() {
        let content = "0f3c7a2e-9d1b-4c5e-8f6a-1b2c3d4e5f60:Props:Props\n";
        let tree = CatalogTree::parse(content, Path::new("cats.txt")).unwrap();
        assert!(tree.render().starts_with("VERSION 1\n"));
    }

    #[test]
    fn test_missing_version_goes_below_header_comments() {
        let content = "\
# This is an Asset Catalog Definition file for Blender.
# Hand edited.

0f3c7a2e-9d1b-4c5e-8f6a-1b2c3d4e5f60:Props:Props
";
        let tree = CatalogTree::parse(content, Path::new("cats.txt")).unwrap();
        assert_eq!(
            tree.render(),
            "\
# This is an Asset Catalog Definition file for Blender.
# Hand edited.
VERSION 1

0f3c7a2e-9d1b-4c5e-8f6a-1b2c3d4e5f60:Props:Props
"
        );
    }

    #[test]
    fn test_aliased_paths_resolve_to_first_entry() {
        let content = "\
VERSION 1
0f3c7a2e-9d1b-4c5e-8f6a-1b2c3d4e5f60:Props:Props
6a1d5e4f-2b3c-4d5e-9f80-7a6b5c4d3e2f:Props:Props Alias
";
        let mut tree = CatalogTree::parse(content, Path::new("cats.txt")).unwrap();

        assert_eq!(tree.len(), 2);
        assert_eq!(
            tree.get(&path("Props")).unwrap().id,
            Uuid::parse_str("0f3c7a2e-9d1b-4c5e-8f6a-1b2c3d4e5f60").unwrap()
        );
        assert!(tree.merge(&[path("Props")]).is_empty());
        assert_eq!(tree.render(), content);
    }

    #[test]
    fn test_crlf_line_endings_are_kept() {
        let content = "VERSION 1\r\n0f3c7a2e-9d1b-4c5e-8f6a-1b2c3d4e5f60:Props:Props\r\n";
        let mut tree = CatalogTree::parse(content, Path::new("cats.txt")).unwrap();
        tree.merge(&[path("Auto/Lamp")]);

        let rendered = tree.render();
        assert!(rendered.starts_with(content));
        assert!(rendered.ends_with(":Auto/Lamp:Lamp\r\n"));
        assert_eq!(rendered.matches('\n').count(), rendered.matches("\r\n").count());
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            ("VERSION 1\nnot-a-catalog-line\n", 2),
            ("VERSION 1\nnot-a-uuid:Props:Props\n", 2),
            ("VERSION 2\n", 1),
            ("VERSION one\n", 1),
            ("VERSION 1\n0f3c7a2e-9d1b-4c5e-8f6a-1b2c3d4e5f60://:x\n", 2),
        ];

        for (content, expected_line) in cases {
            match CatalogTree::parse(content, Path::new("cats.txt")) {
                Err(CatalogError::Parse { line, .. }) => assert_eq!(line, expected_line, "{}", content),
                other => panic!("Expected parse error for {:?}, got {:?}", content, other),
            }
        }
    }

    #[test]
    fn test_empty_content_gets_default_header() {
        let tree = CatalogTree::parse("", Path::new("cats.txt")).unwrap();
        assert!(tree.is_empty());
        assert!(tree.render().contains("VERSION 1"));
    }

    #[test]
    fn test_backup_path() {
        let store = CatalogStore::for_library(Path::new("/lib"));
        assert_eq!(store.catalog_file(), Path::new("/lib/blender_assets.cats.txt"));
        assert_eq!(store.backup_file(), Path::new("/lib/blender_assets.cats.txt.bak"));
    }
}
