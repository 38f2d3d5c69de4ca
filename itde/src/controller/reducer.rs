//! Target controller reducer
//!
//! All review decisions live here: which signals are pending, when the modal
//! opens, what an accept or ignore does. Collaborator calls are returned as
//! effects and report back with [`TargetAction::SignalResolved`].

use super::state::{ControllerPhase, DeliverySummary, TargetAction, TargetState};
use crate::channel::SignalChannel;
use crate::resolver::PayloadResolver;
use futures::FutureExt;
use itde_core::effect::Effect;
use itde_core::reducer::Reducer;
use itde_core::{
    IncomingSignal, ItdeError, MetadataRegistry, ResolvedItdeData, SignalDelivery, SignalProcessor,
    SmallVec, smallvec,
};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Collaborators a target controller needs
#[derive(Clone)]
pub struct TargetEnvironment {
    /// Source metadata lookup
    pub registry: Arc<dyn MetadataRegistry>,
    /// Payload resolution
    pub resolver: PayloadResolver,
    /// Shared signal channel
    pub channel: SignalChannel,
    /// The consuming tool's handler
    pub processor: Arc<dyn SignalProcessor>,
}

impl std::fmt::Debug for TargetEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetEnvironment")
            .field("resolver", &self.resolver)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl TargetEnvironment {
    /// Bundle the collaborators
    #[must_use]
    pub fn new(
        registry: Arc<dyn MetadataRegistry>,
        resolver: PayloadResolver,
        channel: SignalChannel,
        processor: Arc<dyn SignalProcessor>,
    ) -> Self {
        Self {
            registry,
            resolver,
            channel,
            processor,
        }
    }
}

/// Reducer for [`TargetState`]
#[derive(Clone, Copy, Debug, Default)]
pub struct TargetReducer;

impl TargetReducer {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Close the modal and forget deferral once nothing is pending
    fn settle(state: &mut TargetState) {
        if state.pending.is_empty() {
            state.modal_open = false;
            state.user_deferred = false;
        }
    }

    /// Open the modal when signals just became reviewable
    fn auto_open(state: &mut TargetState) {
        if state.auto_popup
            && state.tool_state_loaded
            && state.phase() == ControllerPhase::PendingUnreviewed
        {
            state.modal_open = true;
        }
    }

    fn apply(
        state: &mut TargetState,
        action: TargetAction,
        env: &TargetEnvironment,
    ) -> SmallVec<[Effect<TargetAction>; 4]> {
        match action {
            TargetAction::SignalArrived(signal) => {
                if signal.target_directive != state.directive {
                    tracing::warn!(
                        target_directive = %signal.target_directive,
                        "Ignoring signal addressed to another tool"
                    );
                    return smallvec![Effect::None];
                }
                if state.pending.upsert(signal) {
                    Self::auto_open(state);
                }
                smallvec![Effect::None]
            },

            TargetAction::SignalWithdrawn {
                source_directive,
                sequence,
            } => {
                let _ = state.pending.remove_if_sequence(&source_directive, sequence);
                Self::settle(state);
                smallvec![Effect::None]
            },

            TargetAction::SignalsResynced(snapshot) => {
                state.pending.resync(snapshot);
                Self::settle(state);
                Self::auto_open(state);
                smallvec![Effect::None]
            },

            TargetAction::SignalsCleared { generations } => {
                for (source, sequence) in generations {
                    let _ = state.pending.remove_if_sequence(&source, sequence);
                }
                Self::settle(state);
                smallvec![Effect::None]
            },

            TargetAction::ToolStateLoaded => {
                state.tool_state_loaded = true;
                Self::auto_open(state);
                smallvec![Effect::None]
            },

            TargetAction::OpenModalIfSignalsExist => {
                if !state.pending.is_empty() {
                    state.modal_open = true;
                    state.user_deferred = false;
                }
                smallvec![Effect::None]
            },

            TargetAction::CloseModal => {
                if state.modal_open {
                    state.modal_open = false;
                    state.user_deferred = true;
                }
                smallvec![Effect::None]
            },

            TargetAction::AcceptSignal { source } => {
                let Some(signal) = state.pending.get(&source).cloned() else {
                    tracing::debug!(%source, "Accept ignored: no pending signal");
                    return smallvec![Effect::None];
                };
                if !state.in_flight.insert((source.clone(), signal.sequence)) {
                    tracing::debug!(%source, "Accept ignored: already in flight");
                    return smallvec![Effect::None];
                }

                let env = env.clone();
                smallvec![Effect::future(async move {
                    let result = deliver(&env, &signal).await;
                    let _ = env.channel.remove_if_current(
                        &signal.target_directive,
                        &signal.source_directive,
                        signal.sequence,
                    );
                    Some(TargetAction::SignalResolved { signal, result })
                })]
            },

            TargetAction::SignalResolved { signal, result } => {
                state
                    .in_flight
                    .remove(&(signal.source_directive.clone(), signal.sequence));
                let _ = state
                    .pending
                    .remove_if_sequence(&signal.source_directive, signal.sequence);

                match result {
                    Ok(item_count) => {
                        metrics::counter!("itde.signals.accepted", "outcome" => "delivered")
                            .increment(1);
                        tracing::info!(
                            source = %signal.source_directive,
                            item_count,
                            "Signal delivered"
                        );
                        state.last_delivery = Some(DeliverySummary { signal, item_count });
                    },
                    Err(error) => {
                        metrics::counter!("itde.signals.accepted", "outcome" => error.kind())
                            .increment(1);
                        tracing::warn!(
                            %error,
                            kind = error.kind(),
                            "Signal accepted without delivery"
                        );
                        state.last_error = Some(error);
                    },
                }

                Self::settle(state);
                smallvec![Effect::None]
            },

            TargetAction::IgnoreSignal { source } => {
                let Some(removed) = state.pending.remove(&source) else {
                    return smallvec![Effect::None];
                };
                metrics::counter!("itde.signals.ignored").increment(1);
                tracing::info!(%source, "Signal ignored");
                Self::settle(state);

                smallvec![withdraw(env, removed)]
            },

            TargetAction::IgnoreAllSignals => {
                let removed = state.pending.clear();
                Self::settle(state);
                if removed.is_empty() {
                    return smallvec![Effect::None];
                }
                metrics::counter!("itde.signals.ignored").increment(removed.len() as u64);
                tracing::info!(count = removed.len(), "All signals ignored");

                smallvec![Effect::merge(
                    removed.into_iter().map(|signal| withdraw(env, signal)).collect()
                )]
            },

            TargetAction::DismissError => {
                state.last_error = None;
                smallvec![Effect::None]
            },
        }
    }
}

impl Reducer for TargetReducer {
    type State = TargetState;
    type Action = TargetAction;
    type Environment = TargetEnvironment;

    fn reduce(
        &self,
        state: &mut TargetState,
        action: TargetAction,
        env: &TargetEnvironment,
    ) -> SmallVec<[Effect<TargetAction>; 4]> {
        let before = state.phase();
        let effects = Self::apply(state, action, env);
        let after = state.phase();

        if before != after {
            tracing::debug!(
                directive = %state.directive,
                ?before,
                ?after,
                pending = state.pending.len(),
                "Controller phase changed"
            );
        }

        effects
    }
}

/// Remove a disposed generation from the channel store
fn withdraw(env: &TargetEnvironment, signal: IncomingSignal) -> Effect<TargetAction> {
    let channel = env.channel.clone();
    Effect::future(async move {
        let _ = channel.remove_if_current(
            &signal.target_directive,
            &signal.source_directive,
            signal.sequence,
        );
        None
    })
}

/// Look up, resolve and hand one accepted signal to the processor
///
/// The processor runs for every resolver outcome. A processor error or panic
/// becomes [`ItdeError::CallbackFailure`].
#[tracing::instrument(
    skip_all,
    fields(source = %signal.source_directive, sequence = signal.sequence)
)]
async fn deliver(env: &TargetEnvironment, signal: &IncomingSignal) -> Result<usize, ItdeError> {
    let source = &signal.source_directive;
    let Some(metadata) = env.registry.get_tool_metadata(source) else {
        return Err(ItdeError::LookupMiss {
            directive: source.clone(),
        });
    };

    let data = env.resolver.resolve(source, &metadata.output_config).await;
    let outcome = match &data {
        ResolvedItdeData::ItemList(items) => Ok(items.len()),
        ResolvedItdeData::Empty => Err(ItdeError::EmptyPayload {
            directive: source.clone(),
        }),
        ResolvedItdeData::Error(message) => Err(ItdeError::ResolutionFailure {
            directive: source.clone(),
            message: message.clone(),
        }),
    };

    let delivery = SignalDelivery {
        signal: signal.clone(),
        data,
    };
    let processed = AssertUnwindSafe(async { env.processor.process_signal(delivery).await })
        .catch_unwind()
        .await;

    match processed {
        Ok(Ok(())) => outcome,
        Ok(Err(error)) => Err(ItdeError::CallbackFailure {
            directive: source.clone(),
            message: error.to_string(),
        }),
        Err(panic) => Err(ItdeError::CallbackFailure {
            directive: source.clone(),
            message: panic_message(&*panic),
        }),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "processor panicked".to_string())
}
