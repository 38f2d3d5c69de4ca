//! Tool metadata and declared input/output shapes.
//!
//! Every tool ships a metadata document. The parts the protocol cares about
//! are the directive, the human-readable title, the MIME types the tool
//! accepts and the [`OutputConfig`] describing what it can hand to others.
//!
//! Metadata documents use camelCase field names:
//!
//! ```json
//! {
//!   "directive": "json-diff",
//!   "title": "JSON Diff",
//!   "inputConfig": { "acceptsMimeTypes": ["application/json", "text/*"] },
//!   "outputConfig": {
//!     "transferableContent": [
//!       { "dataType": "inline", "mimeType": "application/json", "field": "diff" }
//!     ]
//!   }
//! }
//! ```

use crate::directive::ToolDirective;
use serde::{Deserialize, Serialize};

/// Where the bytes of a transferable item live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentKind {
    /// The value sits in a field of the source tool's persisted state
    Inline,
    /// The state field holds one or more ids of files in the shared library
    FileReference,
}

/// One kind of output a tool can transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferableContent {
    /// Inline value or library-file reference
    pub data_type: ContentKind,
    /// MIME type (or pattern, for library files) of the produced data
    pub mime_type: String,
    /// Name of the state field holding the value or the file id(s)
    pub field: String,
}

impl TransferableContent {
    /// Inline content read from `field` and tagged with `mime_type`
    #[must_use]
    pub fn inline(field: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data_type: ContentKind::Inline,
            mime_type: mime_type.into(),
            field: field.into(),
        }
    }

    /// Library-file reference(s) read from `field`
    #[must_use]
    pub fn file_reference(field: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data_type: ContentKind::FileReference,
            mime_type: mime_type.into(),
            field: field.into(),
        }
    }
}

/// What a tool can send to other tools.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    /// Declared transferable content, in resolution order
    #[serde(default)]
    pub transferable_content: Vec<TransferableContent>,
}

impl OutputConfig {
    /// Build an output config from descriptors
    #[must_use]
    pub const fn new(transferable_content: Vec<TransferableContent>) -> Self {
        Self {
            transferable_content,
        }
    }

    /// Whether the tool declares anything transferable at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transferable_content.is_empty()
    }
}

/// What a tool can receive from other tools.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputConfig {
    /// Accepted MIME types or patterns (`image/*`, `*/*`)
    #[serde(default)]
    pub accepts_mime_types: Vec<String>,
}

/// A tool's declared metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolMetadata {
    /// Unique directive
    pub directive: ToolDirective,
    /// Human-readable title
    pub title: String,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// Accepted input
    #[serde(default)]
    pub input_config: InputConfig,
    /// Transferable output
    #[serde(default)]
    pub output_config: OutputConfig,
}

impl ToolMetadata {
    /// Metadata with no declared input or output
    #[must_use]
    pub fn new(directive: impl Into<ToolDirective>, title: impl Into<String>) -> Self {
        Self {
            directive: directive.into(),
            title: title.into(),
            description: String::new(),
            input_config: InputConfig::default(),
            output_config: OutputConfig::default(),
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add an accepted MIME type or pattern
    #[must_use]
    pub fn accepting(mut self, mime_type: impl Into<String>) -> Self {
        self.input_config.accepts_mime_types.push(mime_type.into());
        self
    }

    /// Add a transferable output descriptor
    #[must_use]
    pub fn producing(mut self, content: TransferableContent) -> Self {
        self.output_config.transferable_content.push(content);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::expect_used)] // Panics: Test will fail if the fixture does not parse
    fn parses_camel_case_document() {
        let json = r#"{
            "directive": "image-resizer",
            "title": "Image Resizer",
            "inputConfig": { "acceptsMimeTypes": ["image/*"] },
            "outputConfig": {
                "transferableContent": [
                    {
                        "dataType": "fileReference",
                        "mimeType": "image/*",
                        "field": "processedFileId"
                    }
                ]
            }
        }"#;

        let metadata: ToolMetadata = serde_json::from_str(json).expect("fixture should parse");

        assert_eq!(metadata.directive, ToolDirective::new("image-resizer"));
        assert_eq!(metadata.input_config.accepts_mime_types, vec!["image/*"]);
        assert_eq!(
            metadata.output_config.transferable_content,
            vec![TransferableContent::file_reference("processedFileId", "image/*")]
        );
        assert!(metadata.description.is_empty());
    }

    #[test]
    #[allow(clippy::expect_used)] // Panics: Test will fail if the fixture does not parse
    fn missing_configs_default_to_empty() {
        let metadata: ToolMetadata =
            serde_json::from_str(r#"{ "directive": "jwt-decoder", "title": "JWT Decoder" }"#)
                .expect("fixture should parse");
        assert!(metadata.output_config.is_empty());
        assert!(metadata.input_config.accepts_mime_types.is_empty());
    }
}
