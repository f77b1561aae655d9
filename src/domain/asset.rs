//! Assets as seen through the asset graph adapter.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identifier of an asset, stable within the current graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Kind of data object an asset is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Object,
    Material,
    Mesh,
    NodeGroup,
    Collection,
    World,
}

impl AssetType {
    /// Catalog segment naming this type's category in folder-based layouts
    pub fn category_segment(self) -> &'static str {
        match self {
            AssetType::Object => "Objects",
            AssetType::Material => "Materials",
            AssetType::Mesh => "Meshes",
            AssetType::NodeGroup => "Node_Groups",
            AssetType::Collection => "Collections",
            AssetType::World => "Worlds",
        }
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetType::Object => write!(f, "object"),
            AssetType::Material => write!(f, "material"),
            AssetType::Mesh => write!(f, "mesh"),
            AssetType::NodeGroup => write!(f, "node_group"),
            AssetType::Collection => write!(f, "collection"),
            AssetType::World => write!(f, "world"),
        }
    }
}

/// A named, typed data object eligible for catalog membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Identity within the graph
    pub id: AssetId,

    /// Data object type
    #[serde(rename = "type")]
    pub asset_type: AssetType,

    /// Display name (may carry a `.NNN` suffix)
    pub name: String,

    /// Whether the data object is marked as an asset
    #[serde(default)]
    pub is_marked_asset: bool,

    /// Library file the asset originates from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,

    /// Owned by an external file; never mutated
    #[serde(default)]
    pub linked: bool,
}

impl Asset {
    /// Create a local, marked asset with no source metadata
    pub fn new(id: impl Into<String>, asset_type: AssetType, name: impl Into<String>) -> Self {
        Self {
            id: AssetId::new(id),
            asset_type,
            name: name.into(),
            is_marked_asset: true,
            source_path: None,
            linked: false,
        }
    }

    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn unmarked(mut self) -> Self {
        self.is_marked_asset = false;
        self
    }

    pub fn linked(mut self) -> Self {
        self.linked = true;
        self
    }
}

/// Which asset types a catalog run operates on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetTypeFilter {
    /// Materials, node groups, objects and collections
    #[default]
    All,
    Materials,
    NodeGroups,
    ObjectsAndCollections,
}

impl TargetTypeFilter {
    /// Asset types in scope for this filter
    pub fn types(self) -> HashSet<AssetType> {
        let types: &[AssetType] = match self {
            TargetTypeFilter::All => &[
                AssetType::Material,
                AssetType::NodeGroup,
                AssetType::Object,
                AssetType::Collection,
            ],
            TargetTypeFilter::Materials => &[AssetType::Material],
            TargetTypeFilter::NodeGroups => &[AssetType::NodeGroup],
            TargetTypeFilter::ObjectsAndCollections => &[AssetType::Object, AssetType::Collection],
        };
        types.iter().copied().collect()
    }

    pub fn includes(self, asset_type: AssetType) -> bool {
        self.types().contains(&asset_type)
    }
}

impl std::fmt::Display for TargetTypeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetTypeFilter::All => write!(f, "all"),
            TargetTypeFilter::Materials => write!(f, "materials"),
            TargetTypeFilter::NodeGroups => write!(f, "node_groups"),
            TargetTypeFilter::ObjectsAndCollections => write!(f, "objects_and_collections"),
        }
    }
}
