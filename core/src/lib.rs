//! # ITDE Core
//!
//! Core traits and data model for Inter-Tool Data Exchange (ITDE).
//!
//! ITDE lets one browser-resident tool announce that it has output available
//! and lets another tool discover, review and pull that output in. This crate
//! holds the pieces every other crate agrees on:
//!
//! - **Reducer / Effect / Environment**: the functional-core abstractions the
//!   target controller is written against
//! - **Data model**: [`ToolDirective`], [`ToolMetadata`], [`IncomingSignal`],
//!   [`ResolvedItdeData`] and friends
//! - **Collaborators**: the traits through which the protocol reaches tool
//!   state persistence, the shared file library and the consuming tool
//! - **Errors**: the [`ItdeError`] taxonomy surfaced to tools
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Explicit Effects (no hidden I/O inside reducers)
//! - Dependency Injection via Environment
//! - Tagged unions instead of structural probing of payloads
//!
//! ## Example
//!
//! ```ignore
//! use itde_core::*;
//!
//! impl Reducer for TargetReducer {
//!     type State = TargetState;
//!     type Action = TargetAction;
//!     type Environment = TargetEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut TargetState,
//!         action: TargetAction,
//!         env: &TargetEnvironment,
//!     ) -> SmallVec<[Effect<TargetAction>; 4]> {
//!         match action {
//!             TargetAction::SignalArrived(signal) => {
//!                 state.pending.upsert(signal);
//!                 smallvec![Effect::None]
//!             }
//!             _ => smallvec![Effect::None],
//!         }
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Collaborator traits (state persistence, file library, signal processing)
pub mod collaborators;

/// Tool directive identifiers
pub mod directive;

/// Error taxonomy surfaced by the protocol
pub mod error;

/// Tool metadata and declared input/output shapes
pub mod metadata;

/// MIME type and MIME pattern matching
pub mod mime;

/// Resolved payloads and library files
pub mod payload;

/// Incoming signal announcements
pub mod signal;

pub use collaborators::{
    BoxFuture, FileLibrary, FnProcessor, MetadataRegistry, ProcessError, SignalProcessor,
    StatePersistence, StorageError, processor_fn,
};
pub use directive::{ParseDirectiveError, ToolDirective};
pub use error::ItdeError;
pub use metadata::{ContentKind, InputConfig, OutputConfig, ToolMetadata, TransferableContent};
pub use payload::{InlineBlob, ItdeItem, ResolvedItdeData, StoredFile};
pub use signal::{IncomingSignal, SignalDelivery};

/// Reducer module - The core trait for controller logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all protocol decisions and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for state machines
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for TargetReducer {
    ///     type State = TargetState;
    ///     type Action = TargetAction;
    ///     type Environment = TargetEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut TargetState,
    ///         action: TargetAction,
    ///         env: &TargetEnvironment,
    ///     ) -> SmallVec<[Effect<TargetAction>; 4]> {
    ///         match action {
    ///             TargetAction::CloseModal => {
    ///                 state.modal_open = false;
    ///                 smallvec![Effect::None]
    ///             }
    ///             _ => smallvec![Effect::None],
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action against the current state
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// # Returns
        ///
        /// The effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution), returned from reducers.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap an async block as an effect
        #[must_use]
        pub fn future<F>(fut: F) -> Effect<Action>
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Whether this effect does nothing when executed
        #[must_use]
        pub fn is_none(&self) -> bool {
            match self {
                Effect::None => true,
                Effect::Parallel(effects) => effects.iter().all(Effect::is_none),
                Effect::Future(_) => false,
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All non-deterministic inputs are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use itde_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time for production wiring
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
