//! Target controller state and actions

use crate::pending::PendingSignalStore;
use itde_core::{IncomingSignal, ItdeError, ToolDirective};
use std::collections::BTreeSet;

/// Where a controller is in its review cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControllerPhase {
    /// Nothing pending
    Idle,
    /// Signals pending, modal closed, user has not deferred
    PendingUnreviewed,
    /// Signals pending and the review modal is shown
    ModalOpen,
    /// Signals pending, user dismissed the modal; only a passive badge shows
    DeferredPassive,
}

/// Last successful delivery, for the tool's UI
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliverySummary {
    /// The accepted signal
    pub signal: IncomingSignal,
    /// Number of items handed to the processor
    pub item_count: usize,
}

/// State of one mounted target controller
///
/// `modal_open` implies `pending` is non-empty; the reducer closes the modal
/// and forgets any deferral whenever the last signal goes away.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetState {
    /// Directive of the tool this controller serves
    pub directive: ToolDirective,
    /// Mirror of the channel's pending signals for `directive`
    pub pending: PendingSignalStore,
    /// Review modal shown
    pub modal_open: bool,
    /// User dismissed the modal without resolving everything
    pub user_deferred: bool,
    /// The tool finished loading its own state
    pub tool_state_loaded: bool,
    /// Open the modal automatically when signals become reviewable
    pub auto_popup: bool,
    /// `(source, sequence)` generations whose accept is being processed
    pub in_flight: BTreeSet<(ToolDirective, u64)>,
    /// Last user-visible error
    pub last_error: Option<ItdeError>,
    /// Last successful delivery
    pub last_delivery: Option<DeliverySummary>,
}

impl TargetState {
    /// Fresh state for `directive`, auto-popup enabled
    #[must_use]
    pub fn new(directive: ToolDirective) -> Self {
        Self {
            directive,
            pending: PendingSignalStore::new(),
            modal_open: false,
            user_deferred: false,
            tool_state_loaded: false,
            auto_popup: true,
            in_flight: BTreeSet::new(),
            last_error: None,
            last_delivery: None,
        }
    }

    /// Set the auto-popup switch
    #[must_use]
    pub const fn with_auto_popup(mut self, auto_popup: bool) -> Self {
        self.auto_popup = auto_popup;
        self
    }

    /// Pre-fill pending signals
    #[must_use]
    pub fn with_pending(mut self, signals: Vec<IncomingSignal>) -> Self {
        self.pending.resync(signals);
        self
    }

    /// Phase derived from the flags and the pending list
    #[must_use]
    pub fn phase(&self) -> ControllerPhase {
        if self.pending.is_empty() {
            ControllerPhase::Idle
        } else if self.modal_open {
            ControllerPhase::ModalOpen
        } else if self.user_deferred {
            ControllerPhase::DeferredPassive
        } else {
            ControllerPhase::PendingUnreviewed
        }
    }
}

/// Events driving a target controller
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetAction {
    /// The channel queued a signal for this target
    SignalArrived(IncomingSignal),
    /// The channel removed one generation of a source's signal
    SignalWithdrawn {
        /// Source whose signal left
        source_directive: ToolDirective,
        /// Generation removed
        sequence: u64,
    },
    /// Authoritative snapshot of the channel's pending signals
    SignalsResynced(Vec<IncomingSignal>),
    /// The channel dropped every pending signal
    SignalsCleared {
        /// `(source, sequence)` of each generation dropped
        generations: Vec<(ToolDirective, u64)>,
    },
    /// The tool finished loading its own state
    ToolStateLoaded,
    /// User asked to review pending signals
    OpenModalIfSignalsExist,
    /// User deferred the review
    CloseModal,
    /// User accepted the signal from `source`
    AcceptSignal {
        /// Source to accept
        source: ToolDirective,
    },
    /// An accept finished; `Ok` carries the delivered item count
    SignalResolved {
        /// The accepted signal
        signal: IncomingSignal,
        /// Outcome of the accept
        result: Result<usize, ItdeError>,
    },
    /// User ignored the signal from `source`
    IgnoreSignal {
        /// Source to ignore
        source: ToolDirective,
    },
    /// User ignored everything pending
    IgnoreAllSignals,
    /// User acknowledged the last error
    DismissError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use itde_core::Utc;

    fn signal(source: &str, sequence: u64) -> IncomingSignal {
        IncomingSignal {
            source_directive: ToolDirective::new(source),
            source_tool_title: source.to_string(),
            target_directive: ToolDirective::new("diff-checker"),
            sequence,
            sent_at: Utc::now(),
        }
    }

    #[test]
    fn phase_follows_flags() {
        let mut state = TargetState::new(ToolDirective::new("diff-checker"));
        assert_eq!(state.phase(), ControllerPhase::Idle);

        state = state.with_pending(vec![signal("a", 1)]);
        assert_eq!(state.phase(), ControllerPhase::PendingUnreviewed);

        state.modal_open = true;
        assert_eq!(state.phase(), ControllerPhase::ModalOpen);

        state.modal_open = false;
        state.user_deferred = true;
        assert_eq!(state.phase(), ControllerPhase::DeferredPassive);
    }
}
