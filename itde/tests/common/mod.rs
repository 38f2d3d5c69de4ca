//! Shared fixtures for controller integration tests

#![allow(dead_code)]

use itde::{
    ItdeConfig, ItdeTargetController, PayloadResolver, SignalChannel, StaticMetadataRegistry,
    TargetEnvironment, ToolDirective, ToolMetadata, TransferableContent,
};
use itde_testing::{InMemoryFileLibrary, InMemoryStatePersistence, RecordingProcessor};
use std::sync::Arc;
use std::time::Duration;

pub const TIMEOUT: Duration = Duration::from_secs(2);

pub fn d(directive: &str) -> ToolDirective {
    ToolDirective::new(directive)
}

pub fn registry() -> StaticMetadataRegistry {
    StaticMetadataRegistry::from_entries([
        ToolMetadata::new("json-diff", "JSON Diff")
            .accepting("application/json")
            .producing(TransferableContent::inline("diff", "application/json")),
        ToolMetadata::new("text-whitespace-remover", "Whitespace Remover")
            .accepting("text/*")
            .accepting("application/json"),
        ToolMetadata::new("base64-encode-decode", "Base64 Encode/Decode")
            .accepting("text/plain")
            .producing(TransferableContent::inline("output", "text/plain")),
        ToolMetadata::new("diff-checker", "Diff Checker").accepting("text/*"),
        ToolMetadata::new("image-resizer", "Image Resizer")
            .accepting("image/*")
            .producing(TransferableContent::file_reference("processedFileIds", "image/*")),
    ])
}

pub struct Harness {
    pub registry: Arc<StaticMetadataRegistry>,
    pub states: InMemoryStatePersistence,
    pub files: InMemoryFileLibrary,
    pub processor: RecordingProcessor,
    pub channel: SignalChannel,
    pub config: ItdeConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(RecordingProcessor::new(), ItdeConfig::default())
    }

    pub fn with_processor(processor: RecordingProcessor) -> Self {
        Self::with(processor, ItdeConfig::default())
    }

    pub fn with(processor: RecordingProcessor, config: ItdeConfig) -> Self {
        itde_testing::helpers::init_tracing();
        Self {
            registry: Arc::new(registry()),
            states: InMemoryStatePersistence::new(),
            files: InMemoryFileLibrary::new(),
            processor,
            channel: SignalChannel::new(config.broadcast_capacity),
            config,
        }
    }

    pub fn environment(&self) -> TargetEnvironment {
        TargetEnvironment::new(
            self.registry.clone(),
            PayloadResolver::new(Arc::new(self.states.clone()), Arc::new(self.files.clone()))
                .with_timeout(self.config.resolve_timeout()),
            self.channel.clone(),
            Arc::new(self.processor.clone()),
        )
    }

    pub fn mount(&self, target: &str) -> ItdeTargetController {
        ItdeTargetController::mount(d(target), self.environment(), &self.config)
    }

    pub fn notify(&self, source: &str, target: &str) -> itde::IncomingSignal {
        self.channel.notify(d(source), d(target), source.to_uppercase())
    }
}
