//! In-memory asset graph backed by a JSON snapshot.
//!
//! Used by the command-line front end (which reads and writes snapshot files)
//! and by tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AssetGraph;
use crate::domain::{Asset, AssetId, TargetTypeFilter};

/// One reference location: `holder` points at `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub holder: AssetId,
    pub target: AssetId,
}

/// Asset graph held entirely in memory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryAssetGraph {
    /// Saved project file, if any
    #[serde(default)]
    pub project_file: Option<PathBuf>,

    /// All data objects in the project
    #[serde(default)]
    pub assets: Vec<Asset>,

    /// Reference locations between data objects
    #[serde(default)]
    pub references: Vec<Reference>,

    /// Catalog assigned to each asset
    #[serde(default)]
    pub catalog_ids: BTreeMap<AssetId, Uuid>,
}

impl MemoryAssetGraph {
    /// Create a graph from a set of assets
    pub fn new(assets: Vec<Asset>) -> Self {
        Self {
            assets,
            ..Default::default()
        }
    }

    /// Load a graph snapshot from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read graph snapshot: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse graph snapshot: {}", path.display()))
    }

    /// Save the graph snapshot to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write graph snapshot: {}", path.display()))?;

        Ok(())
    }

    /// Set the project file path
    pub fn with_project_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_file = Some(path.into());
        self
    }

    /// Add a reference from `holder` to `target`
    pub fn with_reference(mut self, holder: &str, target: &str) -> Self {
        self.add_reference(holder, target);
        self
    }

    /// Add a reference from `holder` to `target`
    pub fn add_reference(&mut self, holder: &str, target: &str) {
        self.references.push(Reference {
            holder: AssetId::from(holder),
            target: AssetId::from(target),
        });
    }

    /// Add `count` references to `target`, each from a distinct local holder
    pub fn with_users(mut self, target: &str, count: usize) -> Self {
        for i in 0..count {
            self.add_reference(&format!("user:{}:{}", target, i), target);
        }
        self
    }

    /// Get an asset by ID
    pub fn asset(&self, id: &AssetId) -> Option<&Asset> {
        self.assets.iter().find(|a| &a.id == id)
    }

    fn asset_mut(&mut self, id: &AssetId) -> Option<&mut Asset> {
        self.assets.iter_mut().find(|a| &a.id == id)
    }

    /// Catalog currently assigned to an asset
    pub fn catalog_id(&self, id: &AssetId) -> Option<Uuid> {
        self.catalog_ids.get(id).copied()
    }

    fn is_linked(&self, id: &AssetId) -> bool {
        self.asset(id).map(|a| a.linked).unwrap_or(false)
    }
}

impl AssetGraph for MemoryAssetGraph {
    fn list_assets(&self, filter: TargetTypeFilter) -> Vec<Asset> {
        let types = filter.types();
        self.assets
            .iter()
            .filter(|a| types.contains(&a.asset_type))
            .cloned()
            .collect()
    }

    fn all_assets(&self) -> Vec<Asset> {
        self.assets.clone()
    }

    fn get_reference_count(&self, asset_id: &AssetId) -> usize {
        self.references.iter().filter(|r| &r.target == asset_id).count()
    }

    fn referrers(&self, asset_id: &AssetId) -> Vec<AssetId> {
        let mut holders: Vec<AssetId> = Vec::new();
        for reference in self.references.iter().filter(|r| &r.target == asset_id) {
            if !holders.contains(&reference.holder) {
                holders.push(reference.holder.clone());
            }
        }
        holders
    }

    fn can_rewrite(&self, holder: &AssetId, new: &AssetId) -> bool {
        !self.is_linked(holder) && self.asset(new).is_some()
    }

    fn rewrite_reference(&mut self, holder: &AssetId, old: &AssetId, new: &AssetId) -> bool {
        if !self.can_rewrite(holder, new) {
            return false;
        }

        let mut rewritten = false;
        for reference in self
            .references
            .iter_mut()
            .filter(|r| &r.holder == holder && &r.target == old)
        {
            reference.target = new.clone();
            rewritten = true;
        }
        rewritten
    }

    fn delete_if_unreferenced(&mut self, asset_id: &AssetId) -> bool {
        match self.asset(asset_id) {
            Some(asset) if !asset.linked => {}
            _ => return false,
        }
        if self.get_reference_count(asset_id) > 0 {
            return false;
        }

        self.assets.retain(|a| &a.id != asset_id);
        self.references.retain(|r| &r.holder != asset_id);
        self.catalog_ids.remove(asset_id);
        true
    }

    fn set_catalog_id(&mut self, asset_id: &AssetId, catalog_id: Uuid) -> bool {
        match self.asset(asset_id) {
            Some(asset) if asset.is_marked_asset && !asset.linked => {
                self.catalog_ids.insert(asset_id.clone(), catalog_id);
                true
            }
            _ => false,
        }
    }

    fn mark_as_asset(&mut self, asset_id: &AssetId) -> bool {
        match self.asset_mut(asset_id) {
            Some(asset) if !asset.linked => {
                asset.is_marked_asset = true;
                true
            }
            _ => false,
        }
    }

    fn project_file(&self) -> Option<PathBuf> {
        self.project_file.clone()
    }
}
