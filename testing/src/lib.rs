//! # ITDE Testing
//!
//! Testing utilities for ITDE controllers and collaborators.
//!
//! This crate provides:
//! - Deterministic clocks
//! - In-memory state persistence and file library
//! - A recording signal processor that can be told to fail or panic
//! - A Given-When-Then harness for reducers
//! - proptest strategies for directives and notification sequences
//!
//! ## Example
//!
//! ```ignore
//! use itde_testing::{InMemoryStatePersistence, RecordingProcessor};
//!
//! #[tokio::test]
//! async fn accepted_signal_reaches_processor() {
//!     let states = InMemoryStatePersistence::new();
//!     states.set_state("/tool/json-diff", json!({ "diffOutput": "..." }));
//!     let processor = RecordingProcessor::new();
//!
//!     // ... mount a target controller with these collaborators ...
//!
//!     assert_eq!(processor.call_count(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use itde_core::environment::Clock;

pub mod in_memory;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use itde_testing::mocks::FixedClock;
    /// use itde_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Clock that advances by a fixed step on every read
    ///
    /// Useful when a test needs distinct, ordered `sent_at` timestamps.
    #[derive(Debug)]
    pub struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
        step: chrono::Duration,
    }

    impl SteppingClock {
        /// Start at `start`, advancing by `step` after each read
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step: chrono::Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        #[allow(clippy::unwrap_used)] // Test clock; a poisoned lock means a test already failed
        fn now(&self) -> DateTime<Utc> {
            let mut next = self.next.lock().unwrap();
            let now = *next;
            *next = now + self.step;
            now
        }
    }
}

/// Test helpers and utilities
pub mod helpers {
    /// Install a fmt subscriber honouring `RUST_LOG`, once per test binary
    ///
    /// Safe to call from every test; later calls are no-ops.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use itde_core::ToolDirective;
    use proptest::prelude::*;

    /// Kebab-case tool directives such as `json-diff`
    pub fn directive_strategy() -> impl Strategy<Value = ToolDirective> {
        "[a-z]{2,8}(-[a-z]{2,8}){0,2}".prop_map(ToolDirective::new)
    }

    /// A burst of notifications drawn from a small pool of sources
    ///
    /// Sources repeat often, which is what exercises supersession.
    pub fn notification_burst(max_len: usize) -> impl Strategy<Value = Vec<ToolDirective>> {
        prop::collection::vec(
            prop::sample::select(vec![
                ToolDirective::new("json-diff"),
                ToolDirective::new("image-resizer"),
                ToolDirective::new("base64-encoder"),
                ToolDirective::new("markdown-preview"),
            ]),
            0..max_len,
        )
    }
}

// Re-export commonly used items
pub use in_memory::{InMemoryFileLibrary, InMemoryStatePersistence, RecordingProcessor};
pub use mocks::{FixedClock, SteppingClock, test_clock};
pub use reducer_test::ReducerTest;
