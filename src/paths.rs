// Workspace paths are slash-delimited strings relative to the workspace
// root, with no leading slash. The flat map is keyed by these strings.

use crate::errors::{CoderoomError, CoderoomErrorType, Result};

/// Reserved file name that marks an otherwise-empty folder as existing
/// in the flat map. Hidden from the derived tree.
pub(crate) const PLACEHOLDER_NAME: &str = ".placeholder";

/// Canonical form of a caller-supplied path: leading and trailing
/// slashes stripped. Paths that are empty after stripping, or that
/// contain an empty segment (repeated slashes), are rejected.
pub(crate) fn normalize(path: &str) -> Result<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(CoderoomError::new(
            CoderoomErrorType::InvalidPath,
            format!("`{}` does not name a file or folder", path),
        ));
    }
    if trimmed.split('/').any(|segment| segment.is_empty()) {
        return Err(CoderoomError::new(
            CoderoomErrorType::InvalidPath,
            format!("`{}` contains an empty path segment", path),
        ));
    }
    Ok(trimmed.to_string())
}

/// Segments of a key already present in the flat map. Returns None for
/// keys that are malformed (empty, or with an embedded empty segment);
/// derivation skips those keys rather than failing.
pub(crate) fn segments(key: &str) -> Option<Vec<&str>> {
    let trimmed = key.trim_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    let parts: Vec<&str> = trimmed.split('/').collect();
    if parts.iter().any(|segment| segment.is_empty()) {
        return None;
    }
    Some(parts)
}

/// The directory prefix of a normalized path, or None for a root-level
/// entry.
pub(crate) fn parent(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(dir, _)| dir)
}

/// The final segment of a normalized path.
pub(crate) fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

pub(crate) fn is_placeholder(key: &str) -> bool {
    file_name(key) == PLACEHOLDER_NAME
}
