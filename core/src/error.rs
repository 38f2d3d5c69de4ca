//! Error taxonomy surfaced by the protocol.
//!
//! None of these escape the target controller as a failure: they are turned
//! into the tool's user-visible error state. They are `Clone` so they can
//! travel inside actions.

use crate::directive::ToolDirective;
use thiserror::Error;

/// Why accepting a signal did not deliver data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItdeError {
    /// The source directive is unknown to the metadata registry
    #[error("Metadata not found for source tool '{directive}'")]
    LookupMiss {
        /// The unknown source
        directive: ToolDirective,
    },

    /// The payload resolver could not produce data
    #[error("Could not retrieve data from '{directive}': {message}")]
    ResolutionFailure {
        /// The source being resolved
        directive: ToolDirective,
        /// What went wrong
        message: String,
    },

    /// The source had nothing transferable at resolution time
    #[error("'{directive}' has no output to transfer")]
    EmptyPayload {
        /// The source being resolved
        directive: ToolDirective,
    },

    /// The consuming tool failed while processing the delivered data
    #[error("Processing data from '{directive}' failed: {message}")]
    CallbackFailure {
        /// The source whose data was being processed
        directive: ToolDirective,
        /// The processor's error
        message: String,
    },
}

impl ItdeError {
    /// Source directive the error concerns
    #[must_use]
    pub const fn directive(&self) -> &ToolDirective {
        match self {
            Self::LookupMiss { directive }
            | Self::ResolutionFailure { directive, .. }
            | Self::EmptyPayload { directive }
            | Self::CallbackFailure { directive, .. } => directive,
        }
    }

    /// Short tag for logs and metric labels
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LookupMiss { .. } => "lookup_miss",
            Self::ResolutionFailure { .. } => "resolution_failure",
            Self::EmptyPayload { .. } => "empty_payload",
            Self::CallbackFailure { .. } => "callback_failure",
        }
    }
}
