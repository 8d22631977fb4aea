//! Core domain types for lakeport outlines.
//!
//! A lakebook's table of contents arrives as a flat, level-tagged sequence of
//! [`OutlineEntry`] records. Tree construction turns those into an owned
//! [`Node`] hierarchy; every node is owned by exactly one parent (top-level
//! nodes by the conversion run itself).

use serde::Deserialize;

/// Placeholder used for blank titles in directory and file names.
pub const UNTITLED: &str = "untitled";

// ---------------------------------------------------------------------------
// OutlineEntry
// ---------------------------------------------------------------------------

/// What an outline record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlineKind {
    /// A folder in the hierarchy (`type: TITLE`).
    Group,
    /// An exportable document (`type: DOC`).
    Doc,
    /// Any other marker record (`META`, dividers, …) — skipped.
    Ignored,
}

/// One flat record from the manifest's `tocYml` sequence.
///
/// Transient — consumed entirely during tree construction.
#[derive(Debug, Clone)]
pub struct OutlineEntry {
    pub kind: OutlineKind,
    pub level: u32,
    pub title: String,
    /// Stable identifier from the export (used for unique-suffix naming).
    pub uuid: String,
    /// Names the sibling resource `{url}.json` holding the document body.
    pub url: String,
}

/// Raw `tocYml` item as it appears in the YAML payload.
///
/// Everything is optional in real exports; [`OutlineEntry::from`] normalizes.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTocItem {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub level: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl From<RawTocItem> for OutlineEntry {
    fn from(item: RawTocItem) -> Self {
        let kind = match item.kind.as_deref().map(str::to_ascii_uppercase) {
            Some(k) if k == "TITLE" => OutlineKind::Group,
            Some(k) if k == "DOC" => OutlineKind::Doc,
            _ => OutlineKind::Ignored,
        };
        Self {
            kind,
            level: item.level.unwrap_or(0).max(0) as u32,
            title: item.title.unwrap_or_default().trim().to_string(),
            uuid: item.uuid.unwrap_or_default(),
            url: item.url.unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Node tree
// ---------------------------------------------------------------------------

/// A node in the reconstructed outline tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Group(GroupNode),
    Doc(DocNode),
}

/// A folder in the hierarchy.
///
/// Invariant: every child's `level` is strictly greater than this group's
/// `level` at the time of attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    pub title: String,
    pub level: u32,
    pub children: Vec<Node>,
}

impl GroupNode {
    pub fn new(title: impl Into<String>, level: u32) -> Self {
        Self {
            title: title.into(),
            level,
            children: Vec::new(),
        }
    }
}

/// One exportable document.
///
/// `rel_path_stem` is empty until path assignment runs over the full tree,
/// and is assigned exactly once (never recomputed).
#[derive(Debug, Clone, PartialEq)]
pub struct DocNode {
    pub title: String,
    pub level: u32,
    pub uuid: String,
    pub url: String,
    /// Output-relative path without extension, e.g. `folder/sub/doc_title`.
    pub rel_path_stem: String,
}

impl DocNode {
    pub fn new(
        title: impl Into<String>,
        level: u32,
        uuid: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            level,
            uuid: uuid.into(),
            url: url.into(),
            rel_path_stem: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_item_normalizes_kind_and_defaults() {
        let item = RawTocItem {
            kind: Some("doc".into()),
            level: Some(2),
            title: Some("  Getting Started  ".into()),
            uuid: Some("abc123".into()),
            url: Some("gs01".into()),
        };
        let entry = OutlineEntry::from(item);
        assert_eq!(entry.kind, OutlineKind::Doc);
        assert_eq!(entry.level, 2);
        assert_eq!(entry.title, "Getting Started");
    }

    #[test]
    fn raw_item_unknown_kind_is_ignored() {
        let item = RawTocItem {
            kind: Some("META".into()),
            level: None,
            title: None,
            uuid: None,
            url: None,
        };
        let entry = OutlineEntry::from(item);
        assert_eq!(entry.kind, OutlineKind::Ignored);
        assert_eq!(entry.level, 0);
        assert!(entry.title.is_empty());
    }

    #[test]
    fn negative_level_clamps_to_zero() {
        let item = RawTocItem {
            kind: Some("TITLE".into()),
            level: Some(-3),
            title: Some("weird".into()),
            uuid: None,
            url: None,
        };
        assert_eq!(OutlineEntry::from(item).level, 0);
    }
}
