//! # ITDE
//!
//! Inter-Tool Data Exchange: lets a browser-resident tool announce that it has
//! output, and lets another tool review, accept or ignore that announcement
//! and pull the data in.
//!
//! ## Components
//!
//! - [`StaticMetadataRegistry`]: what each tool produces and accepts
//! - [`SignalChannel`]: process-wide notify/subscribe, one pending store per target
//! - [`PendingSignalStore`]: ordered pending signals, one per source
//! - [`PayloadResolver`]: turns a source's declared output into data
//! - [`ItdeTargetController`]: the review state machine a consuming tool mounts
//! - [`ItdeSender`] / [`compatible_targets`]: the sending side
//!
//! ## Example
//!
//! ```ignore
//! let channel = SignalChannel::new(config.broadcast_capacity);
//! let source = ToolDirective::new("json-diff");
//! let sender = ItdeSender::new(channel.clone(), registry.clone(), source);
//! sender.send_to(ToolDirective::new("text-whitespace-remover"))?;
//!
//! let controller = ItdeTargetController::mount(
//!     ToolDirective::new("text-whitespace-remover"),
//!     TargetEnvironment::new(registry, resolver, channel, processor),
//!     &config,
//! );
//! controller.accept_signal(ToolDirective::new("json-diff")).await?;
//! ```

pub mod channel;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod pending;
pub mod registry;
pub mod resolver;

pub use channel::{SignalChannel, SignalEvent};
pub use config::{ConfigError, ItdeConfig};
pub use controller::{
    ControllerPhase, DeliverySummary, ItdeTargetController, TargetAction, TargetEnvironment,
    TargetReducer, TargetState,
};
pub use discovery::{ItdeSender, SendError, compatible_targets};
pub use pending::PendingSignalStore;
pub use registry::{RegistryError, StaticMetadataRegistry};
pub use resolver::PayloadResolver;

// Re-export the data model so tools only need this crate
pub use itde_core::{
    ContentKind, FileLibrary, IncomingSignal, InlineBlob, ItdeError, ItdeItem, MetadataRegistry,
    OutputConfig, ProcessError, ResolvedItdeData, SignalDelivery, SignalProcessor,
    StatePersistence, StorageError, StoredFile, ToolDirective, ToolMetadata, TransferableContent,
    processor_fn,
};
pub use itde_runtime::StoreError;
