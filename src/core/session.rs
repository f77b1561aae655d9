//! Preview/Apply coordinator for catalog assignment.
//!
//! `preview` classifies every in-scope asset and records a signature over the
//! options and the asset graph. `apply` recomputes that signature against the
//! live graph and refuses to touch anything if it moved. Only then is the
//! catalog file merged and written (with backup) and catalog ids assigned.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::adapters::AssetGraph;
use crate::domain::{Asset, AssetId, AssetType, CatalogPath};
use crate::library::{CatalogEntry, CatalogError, CatalogStore, WriteOutcome};

use super::classifier::{classify, Classification, ClassificationRule, SkipReason};
use super::signature::{Phase, SignatureBuilder};

/// Rows shown by a preview listing; the plan itself is never truncated
pub const PREVIEW_DISPLAY_LIMIT: usize = 50;

/// Errors that abort a whole preview or apply
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No preview to apply. Run preview first")]
    NoPreview,

    #[error("Options or target set changed since preview (expected {expected}, found {actual}). Run preview again")]
    StaleSignature { expected: String, actual: String },

    #[error("Asset library root is not set and the project file is not saved")]
    LibraryRootUnresolved,

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Everything that shapes a catalog run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogOptions {
    pub rule: ClassificationRule,

    /// Mark qualifying non-asset data objects during apply
    #[serde(default)]
    pub auto_mark_missing_as_assets: bool,

    /// Send every in-scope asset to this catalog, bypassing the classifier
    #[serde(default)]
    pub manual_catalog_override: Option<CatalogPath>,
}

/// One asset's row in a preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewEntry {
    pub asset_id: AssetId,
    pub asset_name: String,
    pub asset_type: AssetType,

    /// Proposed catalog; `None` when skipped
    pub proposed: Option<CatalogPath>,

    pub skip_reason: Option<SkipReason>,

    /// Not yet an asset; apply will mark it first
    pub needs_mark: bool,
}

impl PreviewEntry {
    pub fn is_skipped(&self) -> bool {
        self.proposed.is_none()
    }
}

/// Result of a preview: the full plan plus its signature
#[derive(Debug, Clone, Serialize)]
pub struct PreviewResult {
    /// Directory holding the catalog file
    pub library_root: PathBuf,

    /// Every in-scope asset, in graph order
    pub entries: Vec<PreviewEntry>,

    /// Unclassifiable assets
    pub skip_count: usize,

    /// Linked assets excluded before classification
    pub linked_excluded: usize,

    /// Non-asset data objects excluded because auto-marking is off
    pub unmarked_excluded: usize,

    pub signature: String,
}

impl PreviewResult {
    /// Entries that will receive a catalog
    pub fn planned(&self) -> impl Iterator<Item = &PreviewEntry> {
        self.entries.iter().filter(|e| !e.is_skipped())
    }

    /// Number of assets per proposed catalog
    pub fn catalog_counts(&self) -> BTreeMap<CatalogPath, usize> {
        let mut counts = BTreeMap::new();
        for path in self.planned().filter_map(|e| e.proposed.as_ref()) {
            *counts.entry(path.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Distinct proposed catalogs
    pub fn catalog_paths(&self) -> BTreeSet<CatalogPath> {
        self.planned().filter_map(|e| e.proposed.clone()).collect()
    }

    /// First rows for display
    pub fn display_rows(&self) -> &[PreviewEntry] {
        let end = self.entries.len().min(PREVIEW_DISPLAY_LIMIT);
        &self.entries[..end]
    }
}

/// Result of a successful apply
#[derive(Debug, Clone)]
pub struct ApplyResult {
    /// Assets that received a catalog id
    pub assigned: usize,

    /// Non-asset data objects marked during apply
    pub auto_marked: usize,

    /// Planned assets the graph refused to mark or assign
    pub unassigned: Vec<AssetId>,

    /// Distinct catalogs used by the plan
    pub catalogs: usize,

    /// Catalog entries added to the file
    pub created: Vec<CatalogEntry>,

    pub write: WriteOutcome,

    /// Assets skipped as unclassifiable at preview time
    pub skipped: usize,

    pub applied_at: DateTime<Utc>,
}

/// Preview state carried from `preview` to `apply`
#[derive(Debug, Clone)]
pub struct PreviewContext {
    pub options: CatalogOptions,
    pub result: PreviewResult,
}

/// Two-phase catalog assignment session
#[derive(Debug)]
pub struct CatalogSession {
    phase: Phase,
    context: Option<PreviewContext>,
}

impl Default for CatalogSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogSession {
    /// Create a new idle session
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            context: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current preview, if apply is still allowed
    pub fn preview_context(&self) -> Option<&PreviewContext> {
        self.context.as_ref()
    }

    /// Classify every in-scope asset and remember the plan
    #[instrument(skip(self, graph, options), fields(mode = ?options.rule.mode))]
    pub fn preview(
        &mut self,
        graph: &dyn AssetGraph,
        options: CatalogOptions,
    ) -> Result<&PreviewResult, SessionError> {
        self.context = None;
        self.phase = Phase::Idle;

        let result = build_preview(graph, &options)?;
        info!(
            planned = result.planned().count(),
            skipped = result.skip_count,
            catalogs = result.catalog_paths().len(),
            "Preview built"
        );

        self.phase = Phase::Previewed;
        let context = self.context.insert(PreviewContext { options, result });
        Ok(&context.result)
    }

    /// Write the previewed catalogs and assign them.
    ///
    /// Refused with [`SessionError::StaleSignature`] if the graph or options
    /// changed since preview. Catalog file failures abort before the graph is
    /// touched and leave the preview in place.
    #[instrument(skip(self, graph))]
    pub fn apply(&mut self, graph: &mut dyn AssetGraph) -> Result<ApplyResult, SessionError> {
        let context = match (self.phase, self.context.take()) {
            (Phase::Previewed, Some(context)) => context,
            _ => return Err(SessionError::NoPreview),
        };

        let live = build_preview(&*graph, &context.options)?;
        if live.signature != context.result.signature {
            warn!("Preview is stale, refusing to apply");
            self.phase = Phase::Stale;
            return Err(SessionError::StaleSignature {
                expected: context.result.signature,
                actual: live.signature,
            });
        }

        let store = CatalogStore::for_library(&context.result.library_root);
        let (created, write, catalog_ids) = match write_catalogs(&store, &context.result) {
            Ok(written) => written,
            Err(e) => {
                self.context = Some(context);
                return Err(e.into());
            }
        };

        let mut assigned = 0;
        let mut auto_marked = 0;
        let mut unassigned = Vec::new();

        for entry in context.result.planned() {
            let Some(catalog_id) = entry.proposed.as_ref().and_then(|p| catalog_ids.get(p)) else {
                unassigned.push(entry.asset_id.clone());
                continue;
            };

            if entry.needs_mark {
                if !graph.mark_as_asset(&entry.asset_id) {
                    debug!(asset = %entry.asset_id, "Could not mark as asset");
                    unassigned.push(entry.asset_id.clone());
                    continue;
                }
                auto_marked += 1;
            }

            if graph.set_catalog_id(&entry.asset_id, *catalog_id) {
                assigned += 1;
            } else {
                debug!(asset = %entry.asset_id, "Catalog assignment refused");
                unassigned.push(entry.asset_id.clone());
            }
        }

        self.phase = Phase::Applied;
        info!(
            assigned,
            auto_marked,
            unassigned = unassigned.len(),
            created = created.len(),
            "Catalogs applied"
        );

        Ok(ApplyResult {
            assigned,
            auto_marked,
            unassigned,
            catalogs: catalog_ids.len(),
            created,
            write,
            skipped: context.result.skip_count,
            applied_at: Utc::now(),
        })
    }
}

type WrittenCatalogs = (Vec<CatalogEntry>, WriteOutcome, BTreeMap<CatalogPath, uuid::Uuid>);

fn write_catalogs(store: &CatalogStore, plan: &PreviewResult) -> Result<WrittenCatalogs, CatalogError> {
    let paths = plan.catalog_paths();

    let mut tree = store.load()?;
    let created = tree.merge(&paths);
    let write = store.write(&mut tree)?;

    let catalog_ids = paths
        .iter()
        .filter_map(|path| tree.get(path).map(|entry| (path.clone(), entry.id)))
        .collect();

    Ok((created, write, catalog_ids))
}

/// Classify the in-scope assets of `graph` and sign the result
pub fn build_preview(graph: &dyn AssetGraph, options: &CatalogOptions) -> Result<PreviewResult, SessionError> {
    let rule = &options.rule;
    if rule.asset_library_root.as_os_str().is_empty() {
        return Err(SessionError::LibraryRootUnresolved);
    }

    let project_file = graph.project_file();
    let mut linked_excluded = 0;
    let mut unmarked_excluded = 0;
    let mut in_scope: Vec<Asset> = Vec::new();

    for asset in graph.list_assets(rule.target_type_filter) {
        if asset.linked {
            linked_excluded += 1;
        } else if !asset.is_marked_asset && !options.auto_mark_missing_as_assets {
            unmarked_excluded += 1;
        } else {
            in_scope.push(asset);
        }
    }

    let entries: Vec<PreviewEntry> = in_scope
        .iter()
        .map(|asset| {
            let classification = match &options.manual_catalog_override {
                Some(path) => Classification::Path(path.clone()),
                None => classify(asset, project_file.as_deref(), rule),
            };
            let (proposed, skip_reason) = match classification {
                Classification::Path(path) => (Some(path), None),
                Classification::Unclassifiable(reason) => {
                    debug!(asset = %asset.name, %reason, "Unclassifiable");
                    (None, Some(reason))
                }
            };

            PreviewEntry {
                asset_id: asset.id.clone(),
                asset_name: asset.name.clone(),
                asset_type: asset.asset_type,
                proposed,
                skip_reason,
                needs_mark: !asset.is_marked_asset,
            }
        })
        .collect();

    let skip_count = entries.iter().filter(|e| e.is_skipped()).count();

    Ok(PreviewResult {
        library_root: rule.asset_library_root.clone(),
        signature: signature(options, project_file.as_deref(), &in_scope),
        entries,
        skip_count,
        linked_excluded,
        unmarked_excluded,
    })
}

/// Signature over the options, the project file and the in-scope assets
fn signature(options: &CatalogOptions, project_file: Option<&Path>, in_scope: &[Asset]) -> String {
    let rule = &options.rule;
    let mut builder = SignatureBuilder::new();
    builder
        .field("library_root", rule.asset_library_root.to_string_lossy().as_bytes())
        .field("mode", format!("{:?}", rule.mode))
        .field("delimiter", format!("{:?}", rule.delimiter))
        .field("root_prefix", &rule.catalog_root_prefix)
        .field("target_type", rule.target_type_filter.to_string())
        .field("auto_mark", options.auto_mark_missing_as_assets.to_string())
        .field(
            "override",
            options
                .manual_catalog_override
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        )
        .field(
            "project_file",
            project_file
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );

    let mut assets: Vec<&Asset> = in_scope.iter().collect();
    assets.sort_by(|a, b| a.id.cmp(&b.id));
    for asset in assets {
        builder
            .field("id", asset.id.as_str())
            .field("name", &asset.name)
            .field(
                "source",
                asset
                    .source_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
            .field("marked", asset.is_marked_asset.to_string());
    }

    builder.finish()
}
