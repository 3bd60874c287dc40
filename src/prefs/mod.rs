//! Persisted user preferences.
//!
//! The preference document is a JSON object kept in memory and written back
//! on [`PreferenceStore::save`]. Keys are addressed with dotted paths
//! (`"window.width"`). Unknown keys are carried through untouched, so a
//! document written by a newer build survives a round trip through an
//! older one.
//!
//! Loading never fails: a missing, unreadable or malformed file yields an
//! empty document which is then seeded from [`defaults`].

pub mod defaults;
pub mod domain;
pub mod marks;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::fs::path_key;

pub use domain::ThemeMode;
pub use marks::Mark;

/// File name of the preference document inside the config directory.
pub const PREFS_FILE: &str = "app.json";

/// Default location: `<config_dir>/mdbrowse/app.json`.
pub fn default_prefs_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mdbrowse")
        .join(PREFS_FILE)
}

/// In-memory preference document bound to a backing file.
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    doc: Map<String, Value>,
    dirty: bool,
}

impl PreferenceStore {
    /// Load the document at `path`, falling back to defaults on any error.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut doc = match read_document(&path) {
            Ok(Some(doc)) => doc,
            Ok(None) => Map::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to load preferences: {e}");
                Map::new()
            }
        };
        defaults::merge_defaults(&mut doc);
        tracing::debug!(path = %path.display(), "preferences loaded");
        Self {
            path,
            doc,
            dirty: false,
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether in-memory state differs from the last successful save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Look up a dotted key. Returns `None` as soon as a segment is missing
    /// or a non-object value sits in the middle of the path.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut segments = key.split('.');
        let first = segments.next()?;
        let mut current = self.doc.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Typed lookup: `default` when the key is missing or has the wrong shape.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|value| T::deserialize(value).ok())
            .unwrap_or(default)
    }

    /// Set a dotted key, creating intermediate objects as needed.
    ///
    /// A non-object value found where an intermediate object is required is
    /// replaced by an empty object.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let segments: Vec<&str> = key.split('.').collect();
        let Some((leaf, parents)) = segments.split_last() else {
            return;
        };
        let mut cursor: &mut Map<String, Value> = &mut self.doc;
        for segment in parents {
            let slot = cursor
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            cursor = match slot {
                Value::Object(inner) => inner,
                _ => return,
            };
        }
        cursor.insert((*leaf).to_string(), value.into());
        self.dirty = true;
    }

    /// Write the document to disk. Failures are logged and swallowed; the
    /// in-memory document stays authoritative. Returns whether it succeeded.
    pub fn save(&mut self) -> bool {
        match self.write() {
            Ok(()) => {
                self.dirty = false;
                tracing::debug!(path = %self.path.display(), "preferences saved");
                true
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), "failed to save preferences: {e}");
                false
            }
        }
    }

    /// Save only if something changed since the last save.
    pub fn save_if_dirty(&mut self) -> bool {
        if self.is_dirty() {
            self.save()
        } else {
            true
        }
    }

    fn write(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.doc)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// A top-level map section, if present and actually a map.
    pub(crate) fn section(&self, key: &str) -> Option<&Map<String, Value>> {
        self.doc.get(key).and_then(Value::as_object)
    }

    /// Run `f` on the top-level map section `key`. A missing or
    /// wrong-typed section starts out empty. Marks the document dirty.
    pub(crate) fn with_section<R>(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut Map<String, Value>) -> R,
    ) -> R {
        let mut section = match self.doc.remove(key) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let out = f(&mut section);
        self.doc.insert(key.to_string(), Value::Object(section));
        self.dirty = true;
        out
    }

    /// Move a legacy entry in `section` from `raw_key` to `normalized_key`.
    ///
    /// Marks the store dirty only when something actually moved.
    pub fn migrate(&mut self, section: &str, raw_key: &str, normalized_key: &str) -> bool {
        let needs_move = self.section(section).is_some_and(|map| {
            raw_key != normalized_key
                && !map.contains_key(normalized_key)
                && map.contains_key(raw_key)
        });
        if !needs_move {
            return false;
        }
        let moved = self.with_section(section, |map| {
            path_key::migrate_entry(map, raw_key, normalized_key)
        });
        if moved {
            tracing::debug!(section, raw_key, normalized_key, "migrated legacy key");
        }
        moved
    }
}

fn read_document(path: &Path) -> Result<Option<Map<String, Value>>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_str::<Value>(&content)? {
        Value::Object(doc) => Ok(Some(doc)),
        _ => {
            tracing::warn!(path = %path.display(), "preference file is not a JSON object; resetting");
            Ok(None)
        }
    }
}
