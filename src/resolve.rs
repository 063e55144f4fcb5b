//! Request path → filesystem path resolution.
//!
//! The pipeline is:
//! 1. Percent-decode the raw request path.
//! 2. Normalise `.`/`..` lexically; climbing above the root is rejected.
//! 3. Join onto the served root and re-check containment of the relative path.
//! 4. `lstat` the candidate; a missing entry is [`ResolveError::NotFound`].
//! 5. Canonicalise (resolving any symlink on the way) and re-check containment
//!    against the canonical root.
//!
//! Steps 2, 3 and 5 each return [`ResolveError::Forbidden`] on failure.

use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::error::ResolveError;

/// A request path that has passed every containment check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Canonical absolute path inside the served root.
    pub path: PathBuf,
    /// Decoded, normalised request path with a leading `/` (e.g. `/docs/a b`).
    pub request_path: String,
}

/// Fold `.` and `..` in a decoded request path into a path relative to the
/// served root. `None` when a `..` would climb above the root.
fn fold_dots(decoded: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(decoded).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::ParentDir => {
                if !relative.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    Some(relative)
}

/// Render a normalised relative path as a request path with a leading `/`.
fn display_request_path(normalized: &Path) -> String {
    let joined = normalized
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    format!("/{joined}")
}

/// Return `true` when `candidate`, taken relative to `root`, neither starts
/// with nor contains a `..` component.
pub fn is_contained(root: &Path, candidate: &Path) -> bool {
    match candidate.strip_prefix(root) {
        Ok(rel) => rel.components().all(|c| matches!(c, Component::Normal(_))),
        Err(_) => false,
    }
}

/// Canonicalise `path` and verify the real location is still inside
/// `canonical_root`.
///
/// Used both for the request target and for files the handler derives from it
/// (such as a directory's `index.html`), since either may be a symlink.
pub async fn confine(canonical_root: &Path, path: &Path) -> Result<PathBuf, ResolveError> {
    let shown_path = path.display().to_string();
    let canonical = match tokio::fs::canonicalize(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            // Dangling symlink: the entry exists but its target does not.
            info!(path = %shown_path, reason = "dangling-symlink", "resolve denied");
            return Err(ResolveError::Forbidden {
                path: shown_path,
                reason: "dangling-symlink",
            });
        }
        Err(e) => return Err(ResolveError::Io(e)),
    };

    if canonical == canonical_root || is_contained(canonical_root, &canonical) {
        Ok(canonical)
    } else {
        info!(
            path = %shown_path,
            canonical = %canonical.display(),
            reason = "outside-root",
            "resolve denied"
        );
        Err(ResolveError::Forbidden {
            path: shown_path,
            reason: "outside-root",
        })
    }
}

/// Map `request_path` (raw, still percent-encoded) onto `canonical_root`.
///
/// `canonical_root` must already be canonicalised; [`crate::config::ServerConfig`]
/// guarantees this.
pub async fn resolve(canonical_root: &Path, request_path: &str) -> Result<Resolved, ResolveError> {
    let decoded = urlencoding::decode(request_path).map_err(|_| {
        debug!(path = request_path, reason = "not-utf8", "resolve denied");
        ResolveError::NotFound(request_path.to_owned())
    })?;

    if decoded.contains('\0') {
        info!(path = request_path, reason = "null-byte", "resolve denied");
        return Err(ResolveError::Forbidden {
            path: request_path.to_owned(),
            reason: "null-byte",
        });
    }

    let normalized = fold_dots(&decoded).ok_or_else(|| {
        info!(path = request_path, reason = "path-traversal", "resolve denied");
        ResolveError::Forbidden {
            path: request_path.to_owned(),
            reason: "path-traversal",
        }
    })?;

    let shown_path = display_request_path(&normalized);
    let candidate = canonical_root.join(&normalized);

    if candidate != canonical_root && !is_contained(canonical_root, &candidate) {
        info!(path = %shown_path, reason = "outside-root", "resolve denied");
        return Err(ResolveError::Forbidden {
            path: shown_path,
            reason: "outside-root",
        });
    }

    let is_symlink = match tokio::fs::symlink_metadata(&candidate).await {
        Ok(meta) => meta.file_type().is_symlink(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %shown_path, reason = "not-found", "resolve denied");
            return Err(ResolveError::NotFound(shown_path));
        }
        Err(e) if e.kind() == io::ErrorKind::NotADirectory => {
            // A file used as a directory, e.g. `/file.txt/child`.
            return Err(ResolveError::NotFound(shown_path));
        }
        Err(e) => return Err(ResolveError::Io(e)),
    };

    let path = confine(canonical_root, &candidate).await?;
    debug!(
        path = %shown_path,
        branch = if is_symlink { "symlink" } else { "direct" },
        "resolve ok"
    );

    Ok(Resolved {
        path,
        request_path: shown_path,
    })
}
