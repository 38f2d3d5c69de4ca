//! ITDE target controller
//!
//! What a consuming tool mounts to receive data from other tools. The
//! controller runs a [`TargetReducer`] in a [`Store`] and keeps its pending
//! list in step with the [`SignalChannel`](crate::SignalChannel) through a
//! background listener.
//!
//! ```ignore
//! let controller = ItdeTargetController::mount(
//!     ToolDirective::new("text-whitespace-remover"),
//!     environment,
//!     &ItdeConfig::from_env(),
//! );
//! controller.mark_tool_state_loaded().await?;
//!
//! for signal in controller.pending_signals().await {
//!     controller.accept_signal(signal.source_directive).await?;
//! }
//! ```

mod reducer;
mod state;

pub use reducer::{TargetEnvironment, TargetReducer};
pub use state::{ControllerPhase, DeliverySummary, TargetAction, TargetState};

use crate::channel::SignalEvent;
use crate::config::ItdeConfig;
use itde_core::{IncomingSignal, ItdeError, ToolDirective};
use itde_runtime::{Store, StoreError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

type TargetStore = Store<TargetState, TargetAction, TargetEnvironment, TargetReducer>;

/// A mounted target controller
///
/// Dropping the controller stops its listener. Pending signals stay in the
/// channel, so a controller mounted later for the same directive picks them up.
pub struct ItdeTargetController {
    directive: ToolDirective,
    store: TargetStore,
    listener: JoinHandle<()>,
}

impl std::fmt::Debug for ItdeTargetController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItdeTargetController")
            .field("directive", &self.directive)
            .finish_non_exhaustive()
    }
}

impl ItdeTargetController {
    /// Mount a controller for `directive`
    ///
    /// Subscribes to the channel first, then hydrates from the signals already
    /// pending, so nothing queued in between is lost. Must be called within a
    /// tokio runtime.
    #[must_use]
    #[tracing::instrument(skip_all, fields(directive = %directive))]
    pub fn mount(
        directive: ToolDirective,
        environment: TargetEnvironment,
        config: &ItdeConfig,
    ) -> Self {
        let events = environment.channel.subscribe(&directive);
        let hydrated = environment.channel.pending(&directive);
        tracing::debug!(pending = hydrated.len(), "Mounting target controller");

        let state = TargetState::new(directive.clone())
            .with_auto_popup(config.auto_popup)
            .with_pending(hydrated);
        let store =
            Store::with_config(state, TargetReducer::new(), environment, config.store_config());
        let listener = tokio::spawn(listen(store.clone(), events, directive.clone()));

        Self {
            directive,
            store,
            listener,
        }
    }

    /// Directive this controller serves
    #[must_use]
    pub const fn directive(&self) -> &ToolDirective {
        &self.directive
    }

    /// Pending signals in arrival order
    pub async fn pending_signals(&self) -> Vec<IncomingSignal> {
        self.store.state(|s| s.pending.list().to_vec()).await
    }

    /// Whether the review modal is shown
    pub async fn is_modal_open(&self) -> bool {
        self.store.state(|s| s.modal_open).await
    }

    /// Current review phase
    pub async fn phase(&self) -> ControllerPhase {
        self.store.state(TargetState::phase).await
    }

    /// `(source, sequence)` generations whose accept is still being processed
    pub async fn in_flight(&self) -> Vec<(ToolDirective, u64)> {
        self.store.state(|s| s.in_flight.iter().cloned().collect()).await
    }

    /// Last error to show in the tool's UI
    pub async fn last_error(&self) -> Option<ItdeError> {
        self.store.state(|s| s.last_error.clone()).await
    }

    /// Last successful delivery
    pub async fn last_delivery(&self) -> Option<DeliverySummary> {
        self.store.state(|s| s.last_delivery.clone()).await
    }

    /// Copy of the whole controller state
    pub async fn snapshot(&self) -> TargetState {
        self.store.state(TargetState::clone).await
    }

    /// Open the review modal if anything is pending
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after unmount started.
    pub async fn open_modal_if_signals_exist(&self) -> Result<(), StoreError> {
        self.dispatch(TargetAction::OpenModalIfSignalsExist).await
    }

    /// Close the modal without touching pending signals (defer)
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after unmount started.
    pub async fn close_modal(&self) -> Result<(), StoreError> {
        self.dispatch(TargetAction::CloseModal).await
    }

    /// Accept the signal from `source` and wait until it has been processed
    ///
    /// Afterwards the signal is gone whatever happened; failures show up in
    /// [`ItdeTargetController::last_error`]. No-op if nothing from `source` is
    /// pending or an accept for that same generation is already running.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after unmount started.
    #[tracing::instrument(skip_all, fields(directive = %self.directive, source = %source))]
    pub async fn accept_signal(&self, source: ToolDirective) -> Result<(), StoreError> {
        self.dispatch(TargetAction::AcceptSignal { source }).await
    }

    /// Drop the signal from `source` without resolving it
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after unmount started.
    pub async fn ignore_signal(&self, source: ToolDirective) -> Result<(), StoreError> {
        self.dispatch(TargetAction::IgnoreSignal { source }).await
    }

    /// Drop every pending signal and close the modal
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after unmount started.
    pub async fn ignore_all_signals(&self) -> Result<(), StoreError> {
        self.dispatch(TargetAction::IgnoreAllSignals).await
    }

    /// Tell the controller the tool's own state has loaded
    ///
    /// Until then the modal never opens by itself.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after unmount started.
    pub async fn mark_tool_state_loaded(&self) -> Result<(), StoreError> {
        self.dispatch(TargetAction::ToolStateLoaded).await
    }

    /// Clear the last error
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after unmount started.
    pub async fn dismiss_error(&self) -> Result<(), StoreError> {
        self.dispatch(TargetAction::DismissError).await
    }

    /// Wait until the controller state satisfies `predicate`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if it does not within `timeout`.
    pub async fn wait_until<F>(&self, predicate: F, timeout: Duration) -> Result<(), StoreError>
    where
        F: Fn(&TargetState) -> bool,
    {
        self.store.wait_for_state(predicate, timeout).await
    }

    /// Stop listening and let running accepts finish
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if work is still running after
    /// the configured shutdown timeout.
    pub async fn unmount(self) -> Result<(), StoreError> {
        tracing::debug!(
            directive = %self.directive,
            pending_effects = self.store.pending_effects(),
            "Unmounting target controller"
        );
        self.listener.abort();
        self.store.shutdown_default().await
    }

    async fn dispatch(&self, action: TargetAction) -> Result<(), StoreError> {
        let mut handle = self.store.send(action).await?;
        handle.wait().await;
        Ok(())
    }
}

impl Drop for ItdeTargetController {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Forward channel events for `directive` into the store
async fn listen(
    store: TargetStore,
    mut events: broadcast::Receiver<SignalEvent>,
    directive: ToolDirective,
) {
    loop {
        let action = match events.recv().await {
            Ok(SignalEvent::Queued(signal)) => TargetAction::SignalArrived(signal),
            Ok(SignalEvent::Withdrawn {
                source_directive,
                sequence,
            }) => TargetAction::SignalWithdrawn {
                source_directive,
                sequence,
            },
            Ok(SignalEvent::Cleared { generations }) => {
                TargetAction::SignalsCleared { generations }
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(%directive, skipped, "Signal listener lagged, resynchronising");
                TargetAction::SignalsResynced(store.environment().channel.pending(&directive))
            },
            Err(RecvError::Closed) => break,
        };

        if store.send(action).await.is_err() {
            break;
        }
    }
}
