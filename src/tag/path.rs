//! Canonical tag path handling
//!
//! Tags are addressed by the composite key `"[Database]::Tag"` everywhere a
//! database is known; bare tag names remain valid as legacy aliases.

use once_cell::sync::Lazy;
use regex::Regex;

static PATH_RE: Lazy<Regex> = Lazy::new(|| {
    // Compiled once; the pattern is a literal
    Regex::new(r"^\[(?P<db>[^\]]+)\]::(?P<tag>.+)$").expect("tag path pattern is valid")
});

/// A parsed `"[Database]::Tag"` composite key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagPath {
    pub db_name: String,
    pub tag_name: String,
}

impl TagPath {
    pub fn new(db_name: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            tag_name: tag_name.into(),
        }
    }

    /// Parse a canonical path, returning `None` for bare tag names.
    pub fn parse(key: &str) -> Option<TagPath> {
        let caps = PATH_RE.captures(key)?;
        Some(TagPath {
            db_name: caps["db"].to_string(),
            tag_name: caps["tag"].to_string(),
        })
    }
}

impl std::fmt::Display for TagPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]::{}", self.db_name, self.tag_name)
    }
}

/// Format a canonical path from its parts.
pub fn canonical_path(db_name: &str, tag_name: &str) -> String {
    format!("[{}]::{}", db_name, tag_name)
}
