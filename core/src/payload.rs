//! Resolved payloads and library files.
//!
//! Resolution turns a signal's announced availability into data. The result
//! is a [`ResolvedItdeData`]: a list of items, nothing, or an error message.
//! Every item is explicitly tagged as inline bytes or a library file, so
//! consumers never have to guess from the shape of a value.

use crate::mime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file persisted in the shared file library.
///
/// Owned by the file-library collaborator; the protocol only reads it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    /// Library id
    pub id: String,
    /// Original file name
    pub filename: String,
    /// Concrete MIME type
    pub mime_type: String,
    /// Size in bytes
    pub size: u64,
    /// File content
    pub blob: Vec<u8>,
    /// Temporary files are cleaned up unless a tool makes them permanent
    pub is_temporary: bool,
    /// When the file was added to the library
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for StoredFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredFile")
            .field("id", &self.id)
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("size", &self.size)
            .field("is_temporary", &self.is_temporary)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Inline bytes taken from a source tool's own state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineBlob {
    /// Declared MIME type
    pub mime_type: String,
    /// Content
    pub bytes: Vec<u8>,
}

impl InlineBlob {
    /// Content as UTF-8 text, if it is valid UTF-8
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// One transferable data item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItdeItem {
    /// In-memory blob read from the source's state
    Inline(InlineBlob),
    /// Persisted file from the shared library
    LibraryFile(StoredFile),
}

impl ItdeItem {
    /// MIME type of the item
    #[must_use]
    pub fn mime_type(&self) -> &str {
        match self {
            Self::Inline(blob) => &blob.mime_type,
            Self::LibraryFile(file) => &file.mime_type,
        }
    }

    /// Raw content of the item
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Inline(blob) => &blob.bytes,
            Self::LibraryFile(file) => &file.blob,
        }
    }
}

/// Outcome of resolving a signal's payload.
///
/// Exactly one variant is set. `ItemList` always carries at least one item:
/// build it through [`ResolvedItdeData::from_items`], which maps an empty
/// list to `Empty`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedItdeData {
    /// The source produced one or more items, in declaration order
    ItemList(Vec<ItdeItem>),
    /// The source had nothing transferable at resolution time
    Empty,
    /// Resolution failed; human-readable message
    Error(String),
}

impl ResolvedItdeData {
    /// `ItemList` when `items` is non-empty, `Empty` otherwise
    #[must_use]
    pub fn from_items(items: Vec<ItdeItem>) -> Self {
        if items.is_empty() {
            Self::Empty
        } else {
            Self::ItemList(items)
        }
    }

    /// Error outcome with a message
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// Resolved items, empty unless `ItemList`
    #[must_use]
    pub fn items(&self) -> &[ItdeItem] {
        match self {
            Self::ItemList(items) => items,
            Self::Empty | Self::Error(_) => &[],
        }
    }

    /// Items whose MIME type satisfies `pattern` (e.g. `text/*`)
    #[must_use]
    pub fn items_matching(&self, pattern: &str) -> Vec<&ItdeItem> {
        self.items()
            .iter()
            .filter(|item| mime::matches(pattern, item.mime_type()))
            .collect()
    }

    /// Error message, if resolution failed
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            Self::ItemList(_) | Self::Empty => None,
        }
    }

    /// Short tag for logs and metric labels
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ItemList(_) => "itemList",
            Self::Empty => "none",
            Self::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline(mime_type: &str, text: &str) -> ItdeItem {
        ItdeItem::Inline(InlineBlob {
            mime_type: mime_type.to_string(),
            bytes: text.as_bytes().to_vec(),
        })
    }

    #[test]
    fn empty_item_list_collapses_to_empty() {
        assert_eq!(ResolvedItdeData::from_items(Vec::new()), ResolvedItdeData::Empty);
        assert!(ResolvedItdeData::Empty.items().is_empty());
    }

    #[test]
    fn filter_by_mime_pattern_keeps_order() {
        let data = ResolvedItdeData::from_items(vec![
            inline("text/css", "a{}"),
            inline("image/svg+xml", "<svg/>"),
            inline("text/plain", "hello"),
        ]);

        let text: Vec<&str> = data
            .items_matching("text/*")
            .iter()
            .map(|item| item.mime_type())
            .collect();

        assert_eq!(text, vec!["text/css", "text/plain"]);
    }

    #[test]
    fn stored_file_debug_omits_blob() {
        let file = StoredFile {
            id: "f1".to_string(),
            filename: "photo.png".to_string(),
            mime_type: "image/png".to_string(),
            size: 3,
            blob: vec![1, 2, 3],
            is_temporary: true,
            created_at: Utc::now(),
        };
        let rendered = format!("{file:?}");
        assert!(rendered.contains("photo.png"));
        assert!(!rendered.contains("blob"));
    }

    #[test]
    fn error_variant_exposes_message() {
        let data = ResolvedItdeData::error("boom");
        assert_eq!(data.error_message(), Some("boom"));
        assert_eq!(data.kind(), "error");
    }
}
