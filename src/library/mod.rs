//! Catalog definition file management.
//!
//! Catalogs live in a plaintext sidecar next to the asset library:
//!
//! ```text
//! <asset library root>/
//! ├── blender_assets.cats.txt       # Catalog definitions (one per line)
//! └── blender_assets.cats.txt.bak   # Copy taken before the last write
//! ```
//!
//! The host's undo system does not cover this file, so every write is
//! preceded by a backup and [`CatalogStore::restore`] is the rollback path.

pub mod catalog;

pub use catalog::{
    CatalogEntry, CatalogError, CatalogStatus, CatalogStore, CatalogTree, WriteOutcome,
    BACKUP_SUFFIX, CATALOG_FILE_NAME,
};
