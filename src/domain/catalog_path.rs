//! Catalog paths and segment normalization.

use serde::{Deserialize, Serialize};

/// Leaf used when neither a root prefix nor a classified tail exists
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Ordered, normalized catalog path segments (`Auto/Chair`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CatalogPath {
    segments: Vec<String>,
}

impl CatalogPath {
    /// Parse a `/`- or `\`-separated path. Returns `None` if nothing remains
    /// after normalization.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::from_segments(split_fragment(raw))
    }

    /// Build from raw segments, dropping empty ones
    pub fn from_segments<I, S>(segments: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segments: Vec<String> = segments
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if segments.is_empty() {
            None
        } else {
            Some(Self { segments })
        }
    }

    /// The `Uncategorized` catalog
    pub fn uncategorized() -> Self {
        Self {
            segments: vec![UNCATEGORIZED.to_string()],
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment of the path
    pub fn leaf(&self) -> &str {
        // Non-empty by construction
        self.segments.last().map(String::as_str).unwrap_or(UNCATEGORIZED)
    }

    /// Human-readable short name derived from the leaf (`wood_floor` -> `Wood Floor`)
    pub fn display_leaf(&self) -> String {
        let spaced = self.leaf().replace(['_', '-'], " ");
        let words: Vec<String> = spaced.split_whitespace().map(title_word).collect();

        if words.is_empty() {
            UNCATEGORIZED.to_string()
        } else {
            words.join(" ")
        }
    }
}

impl std::fmt::Display for CatalogPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl TryFrom<String> for CatalogPath {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("Empty catalog path: {:?}", value))
    }
}

impl From<CatalogPath> for String {
    fn from(path: CatalogPath) -> Self {
        path.to_string()
    }
}

/// Split a path fragment into trimmed, non-empty segments
pub fn split_fragment(raw: &str) -> Vec<String> {
    raw.replace('\\', "/")
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reduce arbitrary text to a catalog-safe segment.
///
/// Whitespace runs become `_`, anything outside `[A-Za-z0-9._-]` becomes `_`,
/// repeated `_` collapse and leading/trailing `_` are trimmed. The result may
/// be empty.
pub fn safe_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        let mapped = if c.is_ascii_alphanumeric() || matches!(c, '.' | '-') {
            c
        } else {
            '_'
        };
        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }
    out.trim_matches('_').to_string()
}

fn title_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        let path = CatalogPath::parse("\\Auto//Chair/ ").unwrap();
        assert_eq!(path.segments(), &["Auto".to_string(), "Chair".to_string()]);
        assert_eq!(path.to_string(), "Auto/Chair");

        assert!(CatalogPath::parse("///").is_none());
        assert!(CatalogPath::parse("").is_none());
    }

    #[test]
    fn test_safe_segment() {
        assert_eq!(safe_segment("Chair"), "Chair");
        assert_eq!(safe_segment("  Old  Wood "), "Old_Wood");
        assert_eq!(safe_segment("a/b:c"), "a_b_c");
        assert_eq!(safe_segment("__x__"), "x");
        assert_eq!(safe_segment("v1.2-beta"), "v1.2-beta");
        assert_eq!(safe_segment("%%%"), "");
    }

    #[test]
    fn test_display_leaf() {
        let path = CatalogPath::parse("MyLib/wood_floor-tiles").unwrap();
        assert_eq!(path.display_leaf(), "Wood Floor Tiles");

        let path = CatalogPath::parse("Auto/CHAIR").unwrap();
        assert_eq!(path.display_leaf(), "Chair");

        let path = CatalogPath::parse("Auto/___").unwrap();
        assert_eq!(path.display_leaf(), UNCATEGORIZED);
    }

    #[test]
    fn test_serde_as_string() {
        let path: CatalogPath = serde_json::from_str("\"Auto/Lamp\"").unwrap();
        assert_eq!(path.segments().len(), 2);
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"Auto/Lamp\"");
        assert!(serde_json::from_str::<CatalogPath>("\"//\"").is_err());
    }
}
