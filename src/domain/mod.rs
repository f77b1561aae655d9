//! Domain types for the cataloger.
//!
//! This module contains the core data structures:
//! - Asset: Typed data objects read through the asset graph adapter
//! - CatalogPath: Normalized hierarchical catalog paths

pub mod asset;
pub mod catalog_path;

// Re-export commonly used types
pub use asset::{Asset, AssetId, AssetType, TargetTypeFilter};
pub use catalog_path::{safe_segment, split_fragment, CatalogPath, UNCATEGORIZED};
