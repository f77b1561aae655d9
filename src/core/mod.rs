//! Core catalog and cleanup logic.
//!
//! This module contains:
//! - Classifier: Rule-driven catalog path proposals
//! - Session: Preview/Apply coordinator for catalog assignment
//! - Dedupe: Duplicate grouping and winner selection
//! - Remap: Reference redirection and loser deletion
//! - Signature: Staleness fingerprints shared by both sessions

pub mod classifier;
pub mod dedupe;
pub mod remap;
pub mod session;
pub mod signature;

// Re-export commonly used types
pub use classifier::{
    classify, Classification, ClassificationMode, ClassificationRule, Delimiter, SkipReason,
};
pub use dedupe::{
    build_dedupe_preview, find_duplicates, resolve, split_numeric_suffix, Candidate,
    DedupePreview, DedupeSession, DuplicateGroup, RemapPlan,
};
pub use remap::{remap, LoserOutcome, LoserStatus, RemapReport};
pub use session::{
    build_preview, ApplyResult, CatalogOptions, CatalogSession, PreviewContext, PreviewEntry,
    PreviewResult, SessionError, PREVIEW_DISPLAY_LIMIT,
};
pub use signature::{Phase, SignatureBuilder};
