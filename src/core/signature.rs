//! Fingerprints used to detect that the world changed between preview and apply.
//!
//! Both catalog assignment and duplicate cleanup run in two phases; the
//! signature taken at preview time is recomputed against the live graph
//! before anything is mutated.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Lifecycle of a two-phase session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No preview taken yet
    Idle,

    /// Preview available, apply allowed
    Previewed,

    /// Last apply succeeded
    Applied,

    /// Graph or options changed after preview; preview again
    Stale,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Previewed => write!(f, "previewed"),
            Phase::Applied => write!(f, "applied"),
            Phase::Stale => write!(f, "stale"),
        }
    }
}

/// Incremental SHA-256 over labelled fields
pub struct SignatureBuilder {
    hasher: Sha256,
}

impl Default for SignatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureBuilder {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    /// Add a labelled field. Fields are NUL-terminated so adjacent values
    /// cannot run together.
    pub fn field(&mut self, label: &str, value: impl AsRef<[u8]>) -> &mut Self {
        self.hasher.update(label.as_bytes());
        self.hasher.update(b"=");
        self.hasher.update(value.as_ref());
        self.hasher.update(b"\0");
        self
    }

    /// Hex-encoded digest
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_deterministic() {
        let mut a = SignatureBuilder::new();
        a.field("mode", "name_prefix").field("asset", "Chair_01");
        let mut b = SignatureBuilder::new();
        b.field("mode", "name_prefix").field("asset", "Chair_01");

        let a = a.finish();
        assert_eq!(a, b.finish());
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_field_boundaries_matter() {
        let mut a = SignatureBuilder::new();
        a.field("x", "ab").field("y", "c");
        let mut b = SignatureBuilder::new();
        b.field("x", "a").field("y", "bc");

        assert_ne!(a.finish(), b.finish());
    }
}
