//! Collaborator traits.
//!
//! The protocol reaches the rest of the application only through these
//! traits: the metadata registry, the per-tool state persistence, the shared
//! file library and the consuming tool's signal processor.
//!
//! Async methods return `Pin<Box<dyn Future>>` instead of using `async fn` so
//! the traits stay object safe (`Arc<dyn FileLibrary>`). Effects capture those
//! trait objects and run them on the runtime.

use crate::directive::ToolDirective;
use crate::metadata::ToolMetadata;
use crate::payload::StoredFile;
use crate::signal::SignalDelivery;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by collaborator methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors reported by storage collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backing store could not be reached or refused the operation
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Error returned by a tool's signal processor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ProcessError(pub String);

impl ProcessError {
    /// Create a processing error from a message
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for ProcessError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for ProcessError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// Read-only lookup of tool metadata by directive.
///
/// Lookups never fail: an unknown directive is `None` and callers branch on
/// presence.
pub trait MetadataRegistry: Send + Sync {
    /// Metadata declared by `directive`, if the tool is known
    fn get_tool_metadata(&self, directive: &ToolDirective) -> Option<ToolMetadata>;

    /// Every registered tool
    fn all_tools(&self) -> Vec<ToolMetadata>;
}

/// Access to the last persisted UI state of each tool.
pub trait StatePersistence: Send + Sync {
    /// Current persisted state of the tool mounted at `route`
    ///
    /// Returns `Ok(None)` when the tool has never persisted any state.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the state store cannot be read or the
    /// stored state cannot be decoded.
    fn read_current_state(
        &self,
        route: &str,
    ) -> BoxFuture<'_, Result<Option<serde_json::Value>, StorageError>>;
}

/// Read access to the shared file library.
pub trait FileLibrary: Send + Sync {
    /// Look a file up by id
    ///
    /// Returns `Ok(None)` when no file has that id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the library cannot be read.
    fn get_file(&self, id: &str) -> BoxFuture<'_, Result<Option<StoredFile>, StorageError>>;
}

/// The consuming tool's handler for accepted signals.
///
/// This is the `onProcessSignal` registration: the target controller calls it
/// once per accepted signal with the resolved data, whatever the resolution
/// outcome, and records a returned error in the tool's error state.
pub trait SignalProcessor: Send + Sync {
    /// Consume an accepted signal and its payload
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] if the tool cannot use the delivered data.
    fn process_signal(&self, delivery: SignalDelivery) -> BoxFuture<'_, Result<(), ProcessError>>;
}

/// [`SignalProcessor`] backed by a closure.
///
/// Created by [`processor_fn`].
pub struct FnProcessor<F> {
    handler: F,
}

impl<F> std::fmt::Debug for FnProcessor<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProcessor").finish_non_exhaustive()
    }
}

impl<F, Fut> SignalProcessor for FnProcessor<F>
where
    F: Fn(SignalDelivery) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ProcessError>> + Send + 'static,
{
    fn process_signal(&self, delivery: SignalDelivery) -> BoxFuture<'_, Result<(), ProcessError>> {
        Box::pin((self.handler)(delivery))
    }
}

/// Wrap a closure as a [`SignalProcessor`].
///
/// # Example
///
/// ```
/// use itde_core::{ProcessError, SignalDelivery, processor_fn};
///
/// let processor = processor_fn(|delivery: SignalDelivery| async move {
///     if delivery.data.items().is_empty() {
///         return Err(ProcessError::new("nothing usable"));
///     }
///     Ok(())
/// });
/// # let _ = processor;
/// ```
#[must_use]
pub const fn processor_fn<F, Fut>(handler: F) -> FnProcessor<F>
where
    F: Fn(SignalDelivery) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ProcessError>> + Send + 'static,
{
    FnProcessor { handler }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::ResolvedItdeData;
    use crate::signal::IncomingSignal;
    use chrono::Utc;

    fn delivery(data: ResolvedItdeData) -> SignalDelivery {
        SignalDelivery {
            signal: IncomingSignal {
                source_directive: ToolDirective::new("json-diff"),
                source_tool_title: "JSON Diff".to_string(),
                target_directive: ToolDirective::new("diff-checker"),
                sequence: 1,
                sent_at: Utc::now(),
            },
            data,
        }
    }

    #[tokio::test]
    async fn closure_processor_forwards_result() {
        let processor = processor_fn(|delivery: SignalDelivery| async move {
            match delivery.data {
                ResolvedItdeData::ItemList(_) => Ok(()),
                ResolvedItdeData::Empty | ResolvedItdeData::Error(_) => {
                    Err(ProcessError::new("no items"))
                },
            }
        });

        let result = processor.process_signal(delivery(ResolvedItdeData::Empty)).await;
        assert_eq!(result, Err(ProcessError::new("no items")));
    }

    #[test]
    fn storage_error_display() {
        let error = StorageError::Unavailable("quota exceeded".to_string());
        assert_eq!(error.to_string(), "Storage unavailable: quota exceeded");
    }
}
