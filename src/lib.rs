//! cataloger - Rule-driven asset catalog assignment and duplicate cleanup
//!
//! Maintenance utilities for an asset library: assets of a content-creation
//! project are sorted into a hierarchical catalog taxonomy persisted in a
//! sidecar catalog definition file, and numbered duplicates (`Wood.001`) are
//! folded back into one asset.
//!
//! # Architecture
//!
//! Every mutation goes through a two-phase session:
//! - Preview computes the full plan and a signature over options and graph state
//! - Apply recomputes the signature and refuses to run if anything moved
//! - The catalog file is backed up before every write; `.bak` restores it
//!
//! # Modules
//!
//! - `adapters`: Asset graph capability trait and an in-memory implementation
//! - `core`: Classifier, Preview/Apply session, duplicate resolver, remapper
//! - `domain`: Data structures (Asset, CatalogPath)
//! - `library`: Catalog definition file store
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Preview catalog assignments for a graph snapshot
//! cataloger preview --graph scene.json --root-prefix Auto/
//!
//! # Apply, refusing if the preview went stale
//! cataloger apply --graph scene.json --expect-signature <sig>
//!
//! # Undo the last catalog file write
//! cataloger restore --graph scene.json
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod library;

// Re-export main types at crate root for convenience
pub use adapters::{AssetGraph, MemoryAssetGraph};
pub use core::{
    CatalogOptions, CatalogSession, ClassificationMode, ClassificationRule, DedupeSession,
    Delimiter, Phase, SessionError,
};
pub use domain::{Asset, AssetId, AssetType, CatalogPath, TargetTypeFilter};
pub use library::{CatalogEntry, CatalogError, CatalogStore, CatalogTree, WriteOutcome};
