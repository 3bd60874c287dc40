//! Canonical string keys for filesystem paths.
//!
//! Every per-path entry in the preference document (marks, scroll offsets,
//! expansion sets) is keyed by [`normalize`]d paths. Older documents may
//! still hold raw, unnormalized keys; [`migrate_entry`] moves those over
//! the first time the normalized lookup misses.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde_json::{Map, Value};

/// Normalize a raw path string into its canonical key form.
///
/// Expands `~`, makes the path absolute, resolves symlinks and `..` as far
/// as the filesystem allows and renders it with `/` separators. Missing
/// trailing segments are appended lexically. Any other failure returns the
/// raw string unchanged.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    match resolve(raw) {
        Some(path) => to_key(&path),
        None => raw.to_string(),
    }
}

/// Normalize a [`Path`] (convenience over [`normalize`]).
pub fn normalize_path(path: &Path) -> String {
    normalize(&path.to_string_lossy())
}

/// Key for the directory entry at `path` itself.
///
/// Matches [`normalize_path`] except for symlinks, which are keyed by
/// their own location (normalized parent plus link name) instead of
/// their target.
pub fn entry_key(path: &Path) -> String {
    let is_link = path
        .symlink_metadata()
        .is_ok_and(|meta| meta.file_type().is_symlink());
    match (is_link, path.parent(), path.file_name()) {
        (true, Some(parent), Some(name)) => {
            let parent = normalize_path(parent);
            let name = name.to_string_lossy();
            if parent.ends_with('/') {
                format!("{parent}{name}")
            } else {
                format!("{parent}/{name}")
            }
        }
        _ => normalize_path(path),
    }
}

fn resolve(raw: &str) -> Option<PathBuf> {
    let expanded = expand_home(raw)?;
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir().ok()?.join(expanded)
    };

    if let Ok(canonical) = absolute.canonicalize() {
        return Some(canonical);
    }

    // Resolve the longest existing ancestor, then re-attach the rest.
    let cleaned = lexical_clean(&absolute);
    let mut missing = Vec::new();
    let mut cursor = cleaned.as_path();
    loop {
        match cursor.canonicalize() {
            Ok(mut base) => {
                for name in missing.iter().rev() {
                    base.push(name);
                }
                return Some(base);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                missing.push(cursor.file_name()?.to_os_string());
                cursor = cursor.parent()?;
            }
            Err(_) => return None,
        }
    }
}

fn expand_home(raw: &str) -> Option<PathBuf> {
    if raw == "~" {
        return dirs::home_dir();
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        return dirs::home_dir().map(|home| home.join(rest));
    }
    Some(PathBuf::from(raw))
}

/// Drop `.` segments and fold `..` into the preceding segment.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn to_key(path: &Path) -> String {
    let rendered = path.to_string_lossy();
    if cfg!(windows) {
        let slashed = rendered.replace('\\', "/");
        match slashed.strip_prefix("//?/") {
            Some(stripped) => stripped.to_string(),
            None => slashed,
        }
    } else {
        rendered.into_owned()
    }
}

/// Move a legacy entry from `raw_key` to `normalized_key`.
///
/// Only acts when `normalized_key` is absent and `raw_key` is present.
/// Returns `true` if the map changed. Running it again is a no-op.
pub fn migrate_entry(map: &mut Map<String, Value>, raw_key: &str, normalized_key: &str) -> bool {
    if raw_key == normalized_key || map.contains_key(normalized_key) {
        return false;
    }
    match map.remove(raw_key) {
        Some(value) => {
            map.insert(normalized_key.to_string(), value);
            true
        }
        None => false,
    }
}

/// Whether `key` names `prefix` itself or something beneath it.
pub fn is_same_or_descendant(key: &str, prefix: &str) -> bool {
    match key.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

/// Rewrite `key` from under `old_prefix` to under `new_prefix`.
pub fn relocate(key: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if !is_same_or_descendant(key, old_prefix) {
        return None;
    }
    Some(format!("{}{}", new_prefix, &key[old_prefix.len()..]))
}
