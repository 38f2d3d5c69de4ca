//! Metadata registry for tool lookup
//!
//! The registry is built once at start-up and shared by every controller and
//! sender. Lookups never fail: an unknown directive is simply absent.

use itde_core::{MetadataRegistry, ToolDirective, ToolMetadata};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors loading a registry from JSON
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The document is not a JSON array of tool metadata
    #[error("Invalid tool metadata document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    /// Two entries share a directive
    #[error("Duplicate tool directive: {0}")]
    DuplicateDirective(ToolDirective),
}

/// Thread-safe, preloaded tool metadata registry
///
/// ## Example
///
/// ```
/// use itde::StaticMetadataRegistry;
/// use itde_core::{MetadataRegistry, ToolDirective, ToolMetadata, TransferableContent};
///
/// let registry = StaticMetadataRegistry::from_entries([ToolMetadata::new("json-diff", "JSON Diff")
///     .producing(TransferableContent::inline("diffOutput", "application/json"))]);
///
/// assert!(registry.get_tool_metadata(&ToolDirective::new("json-diff")).is_some());
/// assert!(registry.get_tool_metadata(&ToolDirective::new("unknown")).is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct StaticMetadataRegistry {
    tools: Arc<RwLock<HashMap<ToolDirective, ToolMetadata>>>,
}

impl StaticMetadataRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from metadata entries; later duplicates win
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = ToolMetadata>) -> Self {
        let tools = entries
            .into_iter()
            .map(|metadata| (metadata.directive.clone(), metadata))
            .collect();
        Self {
            tools: Arc::new(RwLock::new(tools)),
        }
    }

    /// Load a registry from a JSON array of metadata documents
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidDocument`] if the JSON does not describe
    /// a list of tools, or [`RegistryError::DuplicateDirective`] if a directive
    /// appears twice.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let entries: Vec<ToolMetadata> = serde_json::from_str(json)?;

        let mut tools = HashMap::with_capacity(entries.len());
        for metadata in entries {
            let directive = metadata.directive.clone();
            if tools.insert(directive.clone(), metadata).is_some() {
                return Err(RegistryError::DuplicateDirective(directive));
            }
        }

        tracing::debug!(tools = tools.len(), "Loaded tool metadata registry");
        Ok(Self {
            tools: Arc::new(RwLock::new(tools)),
        })
    }

    /// Register a tool
    ///
    /// Returns `true` if an entry with the same directive was replaced.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (indicates a panic in another thread)
    #[allow(clippy::expect_used)]
    pub fn register(&self, metadata: ToolMetadata) -> bool {
        let mut tools = self
            .tools
            .write()
            .expect("Metadata registry lock poisoned - indicates a panic in another thread");
        tools.insert(metadata.directive.clone(), metadata).is_some()
    }

    /// Number of registered tools
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (indicates a panic in another thread)
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn len(&self) -> usize {
        self.tools
            .read()
            .expect("Metadata registry lock poisoned - indicates a panic in another thread")
            .len()
    }

    /// Whether no tools are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetadataRegistry for StaticMetadataRegistry {
    #[allow(clippy::expect_used)]
    fn get_tool_metadata(&self, directive: &ToolDirective) -> Option<ToolMetadata> {
        self.tools
            .read()
            .expect("Metadata registry lock poisoned - indicates a panic in another thread")
            .get(directive)
            .cloned()
    }

    #[allow(clippy::expect_used)]
    fn all_tools(&self) -> Vec<ToolMetadata> {
        let tools = self
            .tools
            .read()
            .expect("Metadata registry lock poisoned - indicates a panic in another thread");
        let mut all: Vec<ToolMetadata> = tools.values().cloned().collect();
        all.sort_by(|a, b| a.directive.cmp(&b.directive));
        all
    }
}
