//! Tool directive identifiers.
//!
//! A directive is the stable, globally unique name of a tool
//! (e.g. `"base64-encode-decode"`). It is the address used for signals and
//! the key for metadata lookups.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `ToolDirective` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid tool directive: {0}")]
pub struct ParseDirectiveError(String);

/// Unique identifier for a tool.
///
/// # Design
///
/// `ToolDirective` is a newtype wrapper around `String` that provides:
/// - Type safety (a directive cannot be confused with a title or a file id)
/// - Clear intent in function signatures
/// - Transparent serialization (it is a plain string on the wire)
///
/// # Validation
///
/// - `FromStr::from_str()`: Validates input (rejects empty and whitespace-bearing strings)
/// - `From::from()` and `new()`: No validation (for application-controlled input)
///
/// # Examples
///
/// ```
/// use itde_core::directive::ToolDirective;
///
/// let directive = ToolDirective::new("json-diff");
/// assert_eq!(directive.as_str(), "json-diff");
/// assert_eq!(directive.route(), "/tool/json-diff");
///
/// let parsed: ToolDirective = "diff-checker".parse().unwrap();
/// assert_eq!(parsed, ToolDirective::new("diff-checker"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolDirective(String);

impl ToolDirective {
    /// Create a new `ToolDirective` from a string.
    #[must_use]
    pub fn new(directive: impl Into<String>) -> Self {
        Self(directive.into())
    }

    /// Get the directive as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Page route of the tool, used to scope its persisted state.
    #[must_use]
    pub fn route(&self) -> String {
        format!("/tool/{}", self.0)
    }

    /// Convert the `ToolDirective` into its inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ToolDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ToolDirective {
    type Err = ParseDirectiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseDirectiveError("directive cannot be empty".to_string()));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(ParseDirectiveError(format!(
                "directive '{s}' cannot contain whitespace"
            )));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for ToolDirective {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ToolDirective {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ToolDirective {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
