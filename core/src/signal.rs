//! Incoming signal announcements.

use crate::directive::ToolDirective;
use crate::payload::ResolvedItdeData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pending announcement that a source tool has output for a target tool.
///
/// At most one signal per `source_directive` is meaningful for a given target:
/// a newer notification from the same source supersedes the older one. The
/// `sequence` is assigned by the signal channel from a process-wide counter,
/// so it orders signals and tells generations of the same source apart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingSignal {
    /// Sender of the signal
    pub source_directive: ToolDirective,
    /// Human-readable label of the sender, for display
    pub source_tool_title: String,
    /// Tool the signal is addressed to
    pub target_directive: ToolDirective,
    /// Process-wide notification sequence number
    pub sequence: u64,
    /// When the source announced its output
    pub sent_at: DateTime<Utc>,
}

impl IncomingSignal {
    /// Whether `other` is a later generation of the same announcement
    #[must_use]
    pub fn is_superseded_by(&self, other: &Self) -> bool {
        self.source_directive == other.source_directive && other.sequence > self.sequence
    }
}

/// An accepted signal together with its resolved payload.
///
/// Handed to the consuming tool's [`SignalProcessor`](crate::SignalProcessor).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignalDelivery {
    /// The accepted signal
    pub signal: IncomingSignal,
    /// What the source had to give at resolution time
    pub data: ResolvedItdeData,
}
