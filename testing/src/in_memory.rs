//! In-memory collaborators for fast, deterministic tests
//!
//! - [`InMemoryStatePersistence`]: route → persisted tool state
//! - [`InMemoryFileLibrary`]: id → stored file
//! - [`RecordingProcessor`]: captures deliveries, can fail or panic on demand
//!
//! Each can be switched into a failure mode or given an artificial delay to
//! drive error and timeout paths.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use chrono::Utc;
use itde_core::{
    BoxFuture, FileLibrary, ProcessError, SignalDelivery, SignalProcessor, StatePersistence,
    StorageError, StoredFile,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

/// In-memory tool state persistence.
///
/// # Example
///
/// ```
/// use itde_testing::InMemoryStatePersistence;
/// use itde_core::StatePersistence;
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let states = InMemoryStatePersistence::new();
/// states.set_state("/tool/json-diff", json!({ "diffOutput": "{}" }));
///
/// let state = states.read_current_state("/tool/json-diff").await;
/// assert!(matches!(state, Ok(Some(_))));
/// # });
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryStatePersistence {
    states: Arc<RwLock<HashMap<String, Value>>>,
    failure: Arc<RwLock<Option<StorageError>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    reads: Arc<Mutex<Vec<String>>>,
}

impl InMemoryStatePersistence {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist `state` for the tool mounted at `route`
    pub fn set_state(&self, route: impl Into<String>, state: Value) {
        self.states.write().unwrap().insert(route.into(), state);
    }

    /// Forget the state stored for `route`
    pub fn remove_state(&self, route: &str) {
        self.states.write().unwrap().remove(route);
    }

    /// Make every read fail with `error`
    pub fn fail_with(&self, error: StorageError) {
        *self.failure.write().unwrap() = Some(error);
    }

    /// Stop failing reads
    pub fn recover(&self) {
        *self.failure.write().unwrap() = None;
    }

    /// Delay every read by `delay`
    pub fn delay_reads(&self, delay: Duration) {
        *self.delay.write().unwrap() = Some(delay);
    }

    /// Routes read so far, in order
    #[must_use]
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }
}

impl StatePersistence for InMemoryStatePersistence {
    fn read_current_state(
        &self,
        route: &str,
    ) -> BoxFuture<'_, Result<Option<Value>, StorageError>> {
        self.reads.lock().unwrap().push(route.to_string());

        let result = match self.failure.read().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(self.states.read().unwrap().get(route).cloned()),
        };
        let delay = *self.delay.read().unwrap();

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }
}

/// In-memory shared file library.
#[derive(Clone, Debug, Default)]
pub struct InMemoryFileLibrary {
    files: Arc<RwLock<HashMap<String, StoredFile>>>,
    failure: Arc<RwLock<Option<StorageError>>>,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl InMemoryFileLibrary {
    /// Create an empty library
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `file` under its id, replacing any previous file with that id
    pub fn insert(&self, file: StoredFile) {
        self.files.write().unwrap().insert(file.id.clone(), file);
    }

    /// Store a temporary file with the given content and return it
    pub fn add_bytes(&self, id: &str, filename: &str, mime_type: &str, bytes: &[u8]) -> StoredFile {
        let file = StoredFile {
            id: id.to_string(),
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            size: bytes.len() as u64,
            blob: bytes.to_vec(),
            is_temporary: true,
            created_at: Utc::now(),
        };
        self.insert(file.clone());
        file
    }

    /// Make every lookup fail with `error`
    pub fn fail_with(&self, error: StorageError) {
        *self.failure.write().unwrap() = Some(error);
    }

    /// Ids looked up so far, in order
    #[must_use]
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

impl FileLibrary for InMemoryFileLibrary {
    fn get_file(&self, id: &str) -> BoxFuture<'_, Result<Option<StoredFile>, StorageError>> {
        self.lookups.lock().unwrap().push(id.to_string());

        let result = match self.failure.read().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(self.files.read().unwrap().get(id).cloned()),
        };
        Box::pin(std::future::ready(result))
    }
}

#[derive(Clone, Debug, Default)]
enum ProcessorMode {
    #[default]
    Succeed,
    Fail(String),
    Panic(String),
}

/// Signal processor that records every delivery.
///
/// # Example
///
/// ```
/// use itde_testing::RecordingProcessor;
///
/// let processor = RecordingProcessor::failing("unsupported format");
/// assert_eq!(processor.call_count(), 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RecordingProcessor {
    deliveries: Arc<Mutex<Vec<SignalDelivery>>>,
    mode: Arc<RwLock<ProcessorMode>>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl RecordingProcessor {
    /// Processor that accepts every delivery
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Processor that records, then fails with `message`
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        let processor = Self::new();
        *processor.mode.write().unwrap() = ProcessorMode::Fail(message.into());
        processor
    }

    /// Processor that records, then panics with `message`
    #[must_use]
    pub fn panicking(message: impl Into<String>) -> Self {
        let processor = Self::new();
        *processor.mode.write().unwrap() = ProcessorMode::Panic(message.into());
        processor
    }

    /// Switch back to accepting deliveries
    pub fn succeed(&self) {
        *self.mode.write().unwrap() = ProcessorMode::Succeed;
    }

    /// Hold every delivery for `delay` before returning
    pub fn delay_processing(&self, delay: Duration) {
        *self.delay.write().unwrap() = Some(delay);
    }

    /// Deliveries received so far, in order
    #[must_use]
    pub fn deliveries(&self) -> Vec<SignalDelivery> {
        self.deliveries.lock().unwrap().clone()
    }

    /// Number of deliveries received
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

impl SignalProcessor for RecordingProcessor {
    fn process_signal(&self, delivery: SignalDelivery) -> BoxFuture<'_, Result<(), ProcessError>> {
        self.deliveries.lock().unwrap().push(delivery);
        let mode = self.mode.read().unwrap().clone();
        let delay = *self.delay.read().unwrap();

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match mode {
                ProcessorMode::Succeed => Ok(()),
                ProcessorMode::Fail(message) => Err(ProcessError::new(message)),
                #[allow(clippy::panic)] // Drives the controller's panic containment
                ProcessorMode::Panic(message) => panic!("{message}"),
            }
        })
    }
}
