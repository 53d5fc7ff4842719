//! Slash-separated path handling for the in-memory filesystem.
//!
//! Paths are always relative to the filesystem root. The root itself is the
//! empty string.

use crate::error::FsError;

/// Normalises a path into its canonical in-memory form.
///
/// Leading `/` and `./` are dropped, empty and `.` segments collapse, and
/// `..` pops the previous segment. A `..` that would climb above the root is
/// rejected.
///
/// # Examples
///
/// ```
/// use modsrc_core::vfs::path::normalize;
///
/// assert_eq!(normalize("/modules//vpc/./main.tf").unwrap(), "modules/vpc/main.tf");
/// assert_eq!(normalize("a/b/../c").unwrap(), "a/c");
/// assert_eq!(normalize("./").unwrap(), "");
/// assert!(normalize("../etc/passwd").is_err());
/// ```
pub fn normalize(path: &str) -> Result<String, FsError> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(FsError::InvalidPath(path.to_string()));
                }
            }
            s if s.contains('\0') => return Err(FsError::InvalidPath(path.to_string())),
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

/// Joins two paths and normalises the result.
pub fn join(base: &str, rel: &str) -> Result<String, FsError> {
    if base.is_empty() {
        return normalize(rel);
    }
    normalize(&format!("{base}/{rel}"))
}

/// Returns the parent of a normalised path, or `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rfind('/').map_or("", |idx| &path[..idx]))
}

/// Returns the last segment of a normalised path.
pub fn file_name(path: &str) -> &str {
    path.rfind('/').map_or(path, |idx| &path[idx + 1..])
}

/// Iterates over every proper ancestor of a normalised path, root-most first,
/// excluding the root itself.
pub(crate) fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/').map(move |(idx, _)| &path[..idx])
}

/// Drops the first `count` segments of a normalised path.
///
/// Returns `None` when nothing is left.
pub(crate) fn strip_components(path: &str, count: usize) -> Option<&str> {
    if count == 0 {
        return (!path.is_empty()).then_some(path);
    }
    let mut rest = path;
    for _ in 0..count {
        let idx = rest.find('/')?;
        rest = &rest[idx + 1..];
    }
    (!rest.is_empty()).then_some(rest)
}
