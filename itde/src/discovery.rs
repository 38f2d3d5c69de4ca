//! Target discovery and sending
//!
//! A "send to another tool" affordance needs two things: which tools can take
//! this tool's output, and a way to notify the chosen one. A target is
//! compatible when one of the source's transferable MIME types overlaps one of
//! the MIME patterns it accepts.

use crate::channel::SignalChannel;
use itde_core::{IncomingSignal, MetadataRegistry, ToolDirective, ToolMetadata, mime};
use std::sync::Arc;
use thiserror::Error;

/// Why a signal could not be sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The sending tool is not in the metadata registry
    #[error("Metadata not found for source tool '{0}'")]
    UnknownSource(ToolDirective),

    /// A tool tried to send its output to itself
    #[error("Tool '{0}' cannot send data to itself")]
    SelfTarget(ToolDirective),
}

/// Tools that accept at least one kind of `source`'s output, sorted by title
///
/// The source itself is never listed. An unknown source has no targets.
#[must_use]
pub fn compatible_targets(
    registry: &dyn MetadataRegistry,
    source: &ToolDirective,
) -> Vec<ToolMetadata> {
    let Some(source_metadata) = registry.get_tool_metadata(source) else {
        return Vec::new();
    };

    let produced: Vec<&str> = source_metadata
        .output_config
        .transferable_content
        .iter()
        .map(|content| content.mime_type.as_str())
        .collect();

    let mut targets: Vec<ToolMetadata> = registry
        .all_tools()
        .into_iter()
        .filter(|tool| &tool.directive != source)
        .filter(|tool| {
            tool.input_config.accepts_mime_types.iter().any(|accepted| {
                produced.iter().any(|produced| mime::overlaps(produced, accepted))
            })
        })
        .collect();

    targets.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.directive.cmp(&b.directive)));
    targets
}

/// Sending side of the protocol for one source tool
///
/// # Example
///
/// ```ignore
/// let sender = ItdeSender::new(channel, registry, ToolDirective::new("json-diff"));
/// for target in sender.targets() {
///     println!("{}", target.title);
/// }
/// sender.send_to(ToolDirective::new("text-whitespace-remover"))?;
/// ```
#[derive(Clone)]
pub struct ItdeSender {
    channel: SignalChannel,
    registry: Arc<dyn MetadataRegistry>,
    source: ToolDirective,
}

impl std::fmt::Debug for ItdeSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItdeSender")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl ItdeSender {
    /// Sender for `source`
    #[must_use]
    pub fn new(
        channel: SignalChannel,
        registry: Arc<dyn MetadataRegistry>,
        source: ToolDirective,
    ) -> Self {
        Self {
            channel,
            registry,
            source,
        }
    }

    /// Directive this sender speaks for
    #[must_use]
    pub const fn source(&self) -> &ToolDirective {
        &self.source
    }

    /// Tools that can take this source's output
    #[must_use]
    pub fn targets(&self) -> Vec<ToolMetadata> {
        compatible_targets(self.registry.as_ref(), &self.source)
    }

    /// Notify `target` that this source has output, titled from the registry
    ///
    /// # Errors
    ///
    /// Returns [`SendError::SelfTarget`] if `target` is the source itself, or
    /// [`SendError::UnknownSource`] if the source is not registered.
    pub fn send_to(&self, target: ToolDirective) -> Result<IncomingSignal, SendError> {
        if target == self.source {
            return Err(SendError::SelfTarget(target));
        }
        let metadata = self
            .registry
            .get_tool_metadata(&self.source)
            .ok_or_else(|| SendError::UnknownSource(self.source.clone()))?;

        Ok(self.channel.notify(self.source.clone(), target, metadata.title))
    }
}
