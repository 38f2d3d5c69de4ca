//! MIME type and MIME pattern matching.
//!
//! Tools declare what they emit and accept as MIME types or patterns such as
//! `image/*` or `*/*`. Parameters (`; charset=utf-8`) and letter case are
//! ignored when comparing.

/// Normalise a MIME type: strip parameters, trim, lowercase.
fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn split(mime: &str) -> (String, String) {
    let essence = essence(mime);
    match essence.split_once('/') {
        Some((kind, subtype)) => (kind.to_string(), subtype.to_string()),
        None => (essence, String::new()),
    }
}

fn is_any(mime: &str) -> bool {
    let essence = essence(mime);
    essence == "*" || essence == "*/*"
}

/// Whether a concrete MIME type satisfies a pattern.
///
/// # Examples
///
/// ```
/// use itde_core::mime::matches;
///
/// assert!(matches("image/*", "image/png"));
/// assert!(matches("*/*", "application/json"));
/// assert!(matches("text/plain", "text/plain; charset=utf-8"));
/// assert!(!matches("text/*", "application/json"));
/// ```
#[must_use]
pub fn matches(pattern: &str, mime: &str) -> bool {
    if is_any(pattern) {
        return true;
    }
    let (pattern_kind, pattern_subtype) = split(pattern);
    let (kind, subtype) = split(mime);
    if pattern_kind != kind {
        return false;
    }
    pattern_subtype == "*" || pattern_subtype == subtype
}

/// Whether two MIME patterns can describe a common concrete type.
///
/// Used when both sides of a comparison are declarations (a source's
/// transferable MIME type against a target's accepted pattern).
#[must_use]
pub fn overlaps(a: &str, b: &str) -> bool {
    if is_any(a) || is_any(b) {
        return true;
    }
    let (a_kind, a_subtype) = split(a);
    let (b_kind, b_subtype) = split(b);
    if a_kind != b_kind {
        return false;
    }
    a_subtype == "*" || b_subtype == "*" || a_subtype == b_subtype
}
