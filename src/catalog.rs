//! Catalog loading and the tabular row shapes.
//!
//! The catalog is a flat CSV of desired posts; loading groups the rows into
//! an insertion-ordered category -> forum -> posts nesting, which is the
//! order the reconciliation engine walks. [`ExportRow`] is the sibling shape
//! the backup engine writes; its first four columns round-trip back through
//! the loader.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Starter content fallback - a post can never be created with an empty body.
pub const BODY_FALLBACK: &str = ".";

/// Catalog loading errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be opened or read.
    #[error("failed to load catalog from {path}: {source}")]
    Load {
        /// Path the load was attempted from.
        path: PathBuf,
        /// Underlying CSV/IO error.
        #[source]
        source: csv::Error,
    },

    /// A row did not match the expected columns.
    #[error("malformed catalog row: {0}")]
    Row(#[from] csv::Error),
}

/// One desired post, as loaded from a catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Category the post's forum lives under.
    pub category: String,
    /// Forum the post belongs to.
    pub forum: String,
    /// Post title - the catalog's primary key within a forum, never normalized.
    pub title: String,
    /// Starter message body; never empty (falls back to [`BODY_FALLBACK`]).
    pub body_text: String,
    /// Tag names to apply, restricted later to the forum's vocabulary.
    pub tags: BTreeSet<String>,
    /// Optional external attachment link.
    pub external_link: Option<String>,
}

/// Catalog source row, column names as they appear in the file.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Forum Name")]
    forum: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Ravelry Link/Message")]
    message: Option<String>,
    #[serde(rename = "Tags")]
    tags: Option<String>,
    #[serde(rename = "Catbox link")]
    catbox_link: Option<String>,
}

impl From<RawRow> for CatalogEntry {
    fn from(row: RawRow) -> Self {
        let body_text = match row.message.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => BODY_FALLBACK.to_string(),
        };

        let tags = row
            .tags
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        let external_link = row
            .catbox_link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);

        CatalogEntry {
            category: row.category,
            forum: row.forum,
            title: row.title,
            body_text,
            tags,
            external_link,
        }
    }
}

/// The desired-state catalog: category -> forum -> posts, in file order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Nested entries, insertion-ordered at every level.
    pub categories: IndexMap<String, IndexMap<String, Vec<CatalogEntry>>>,
}

impl Catalog {
    /// Load a catalog from a CSV file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let reader = csv::Reader::from_path(path).map_err(|source| CatalogError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_csv(reader)
    }

    /// Load a catalog from any reader producing the CSV columns.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, CatalogError> {
        let mut catalog = Catalog::default();
        for row in reader.deserialize::<RawRow>() {
            catalog.push(CatalogEntry::from(row?));
        }
        Ok(catalog)
    }

    fn push(&mut self, entry: CatalogEntry) {
        self.categories
            .entry(entry.category.clone())
            .or_default()
            .entry(entry.forum.clone())
            .or_default()
            .push(entry);
    }

    /// Flat view of every entry, in catalog order.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.categories
            .values()
            .flat_map(|forums| forums.values())
            .flatten()
    }

    /// Total number of posts in the catalog.
    pub fn post_count(&self) -> usize {
        self.entries().count()
    }

    /// Whether the catalog holds no posts at all.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// One exported thread, column names as written to backup files.
///
/// The capture column header differs from the catalog's source header in
/// case ("Catbox Link" vs "Catbox link"); only the shared columns are
/// expected to round-trip through [`Catalog::from_reader`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    /// Category display name.
    #[serde(rename = "Category")]
    pub category: String,
    /// Forum display name.
    #[serde(rename = "Forum Name")]
    pub forum: String,
    /// Thread title.
    #[serde(rename = "Title")]
    pub title: String,
    /// Applied tag names, comma-joined.
    #[serde(rename = "Tags")]
    pub tags: String,
    /// Starter message content.
    #[serde(rename = "Ravelry Link/Message")]
    pub message: String,
    /// Latest captured message content, empty when unavailable.
    #[serde(rename = "Catbox Link")]
    pub catbox_link: String,
    /// Creation timestamp (`YYYY-MM-DD HH:MM:SS`), empty when unavailable.
    #[serde(rename = "Date Created")]
    pub created: String,
}
