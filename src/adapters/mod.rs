//! Adapter interfaces for the host's asset graph.
//!
//! The engine never walks the host's object graph directly. Everything it
//! needs (listing, reference counts, rewrites, deletion, catalog assignment)
//! goes through the narrow [`AssetGraph`] capability trait.

pub mod memory;

use std::path::PathBuf;

use uuid::Uuid;

use crate::domain::{Asset, AssetId, TargetTypeFilter};

// Re-export the in-memory graph
pub use memory::{MemoryAssetGraph, Reference};

/// Capability provider over the host's assets, queried by id
pub trait AssetGraph {
    /// All assets of the types selected by `filter`, including linked ones
    fn list_assets(&self, filter: TargetTypeFilter) -> Vec<Asset>;

    /// Every asset regardless of type
    fn all_assets(&self) -> Vec<Asset>;

    /// Number of incoming references to an asset
    fn get_reference_count(&self, asset_id: &AssetId) -> usize;

    /// Holders of at least one reference to `asset_id`
    fn referrers(&self, asset_id: &AssetId) -> Vec<AssetId>;

    /// Whether `holder`'s references could be redirected to `new`
    fn can_rewrite(&self, holder: &AssetId, new: &AssetId) -> bool;

    /// Redirect `holder`'s references from `old` to `new`. Returns false if the
    /// holder cannot be rewritten.
    fn rewrite_reference(&mut self, holder: &AssetId, old: &AssetId, new: &AssetId) -> bool;

    /// Delete an asset if nothing references it any more
    fn delete_if_unreferenced(&mut self, asset_id: &AssetId) -> bool;

    /// Assign a catalog to an asset. Returns false for unknown or non-asset data.
    fn set_catalog_id(&mut self, asset_id: &AssetId, catalog_id: Uuid) -> bool;

    /// Mark a data object as an asset
    fn mark_as_asset(&mut self, asset_id: &AssetId) -> bool;

    /// Path of the project file currently open, if it has been saved
    fn project_file(&self) -> Option<PathBuf>;
}
