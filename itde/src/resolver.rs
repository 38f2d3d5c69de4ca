//! Payload resolver
//!
//! Turns a source tool's declared output into data at acceptance time. The
//! source's last persisted state is read through [`StatePersistence`]; inline
//! descriptors take their bytes from a state field, file-reference
//! descriptors take file ids from a state field and load them from the
//! [`FileLibrary`].
//!
//! Resolution never fails across this boundary: every problem becomes
//! [`ResolvedItdeData::Error`] with a readable message.

use itde_core::{
    ContentKind, FileLibrary, InlineBlob, ItdeItem, OutputConfig, ResolvedItdeData,
    StatePersistence, StorageError, ToolDirective, TransferableContent,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default bound on a single resolution
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a resolution produced an error outcome
#[derive(Error, Debug)]
enum ResolveFailure {
    #[error("Could not read state of '{route}': {source}")]
    StateUnavailable { route: String, source: StorageError },

    #[error("No saved state found for '{route}'")]
    NoState { route: String },

    #[error("Could not encode field '{field}': {message}")]
    Encoding { field: String, message: String },

    #[error("Field '{field}' does not hold file ids")]
    InvalidFileReference { field: String },

    #[error("File '{id}' not found in the library")]
    FileMissing { id: String },

    #[error("Could not read file '{id}': {source}")]
    FileUnavailable { id: String, source: StorageError },
}

/// Resolves source output into [`ResolvedItdeData`]
///
/// # Example
///
/// ```ignore
/// let resolver = PayloadResolver::new(states, library).with_timeout(Duration::from_secs(5));
/// let data = resolver.resolve(&source, &metadata.output_config).await;
/// let text_items = data.items_matching("text/*");
/// ```
#[derive(Clone)]
pub struct PayloadResolver {
    states: Arc<dyn StatePersistence>,
    files: Arc<dyn FileLibrary>,
    timeout: Duration,
}

impl std::fmt::Debug for PayloadResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadResolver")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl PayloadResolver {
    /// Create a resolver over the given collaborators
    #[must_use]
    pub fn new(states: Arc<dyn StatePersistence>, files: Arc<dyn FileLibrary>) -> Self {
        Self {
            states,
            files,
            timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }

    /// Bound each resolution by `timeout`
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve everything `output` declares for `source`
    ///
    /// - no descriptors: `Empty`
    /// - nothing usable in the source's state: `Empty`
    /// - any read failure, missing file or timeout: `Error`
    /// - otherwise `ItemList`, in declaration order
    #[tracing::instrument(skip(self, output), fields(source = %source))]
    pub async fn resolve(&self, source: &ToolDirective, output: &OutputConfig) -> ResolvedItdeData {
        if output.is_empty() {
            tracing::debug!("Source declares no transferable content");
            return ResolvedItdeData::Empty;
        }

        let start = Instant::now();
        let resolved = tokio::time::timeout(self.timeout, self.resolve_items(source, output)).await;
        let outcome = match resolved {
            Ok(Ok(items)) => ResolvedItdeData::from_items(items),
            Ok(Err(failure)) => ResolvedItdeData::error(failure.to_string()),
            Err(_) => ResolvedItdeData::error(format!(
                "Retrieving data from '{source}' timed out after {}ms",
                self.timeout.as_millis()
            )),
        };

        metrics::histogram!("itde.resolve.duration_seconds", "outcome" => outcome.kind())
            .record(start.elapsed().as_secs_f64());

        match &outcome {
            ResolvedItdeData::Error(message) => tracing::warn!(%message, "Resolution failed"),
            other => {
                tracing::debug!(items = other.items().len(), outcome = other.kind(), "Resolved");
            },
        }

        outcome
    }

    async fn resolve_items(
        &self,
        source: &ToolDirective,
        output: &OutputConfig,
    ) -> Result<Vec<ItdeItem>, ResolveFailure> {
        let route = source.route();
        let state = self
            .states
            .read_current_state(&route)
            .await
            .map_err(|error| ResolveFailure::StateUnavailable {
                route: route.clone(),
                source: error,
            })?
            .ok_or(ResolveFailure::NoState { route })?;

        let mut items = Vec::new();
        for descriptor in &output.transferable_content {
            let value = state.get(&descriptor.field).unwrap_or(&Value::Null);
            match descriptor.data_type {
                ContentKind::Inline => {
                    if let Some(blob) = inline_blob(descriptor, value)? {
                        items.push(ItdeItem::Inline(blob));
                    }
                },
                ContentKind::FileReference => {
                    for id in file_ids(descriptor, value)? {
                        items.push(ItdeItem::LibraryFile(self.load_file(id).await?));
                    }
                },
            }
        }

        Ok(items)
    }

    async fn load_file(&self, id: &str) -> Result<itde_core::StoredFile, ResolveFailure> {
        match self.files.get_file(id).await {
            Ok(Some(file)) => Ok(file),
            Ok(None) => Err(ResolveFailure::FileMissing { id: id.to_string() }),
            Err(error) => Err(ResolveFailure::FileUnavailable {
                id: id.to_string(),
                source: error,
            }),
        }
    }
}

/// Bytes of an inline field; `None` when the field holds nothing
fn inline_blob(
    descriptor: &TransferableContent,
    value: &Value,
) -> Result<Option<InlineBlob>, ResolveFailure> {
    let bytes = match value {
        Value::Null => return Ok(None),
        Value::String(text) if text.is_empty() => return Ok(None),
        Value::String(text) => text.as_bytes().to_vec(),
        other => serde_json::to_vec(other).map_err(|error| ResolveFailure::Encoding {
            field: descriptor.field.clone(),
            message: error.to_string(),
        })?,
    };

    Ok(Some(InlineBlob {
        mime_type: descriptor.mime_type.clone(),
        bytes,
    }))
}

/// File ids held by a reference field, blanks skipped
fn file_ids<'a>(
    descriptor: &TransferableContent,
    value: &'a Value,
) -> Result<Vec<&'a str>, ResolveFailure> {
    let invalid = || ResolveFailure::InvalidFileReference {
        field: descriptor.field.clone(),
    };

    let ids = match value {
        Value::Null => Vec::new(),
        Value::String(id) => vec![id.as_str()],
        Value::Array(values) => values
            .iter()
            .map(|v| v.as_str().ok_or_else(invalid))
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(invalid()),
    };

    Ok(ids.into_iter().filter(|id| !id.trim().is_empty()).collect())
}
