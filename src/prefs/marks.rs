//! Per-file color marks.
//!
//! Marks live in the `marked_files` section keyed by normalized path. A file
//! without a mark has no entry at all.

use serde_json::Value;

use super::domain::relocate_keys;
use super::PreferenceStore;
use crate::fs::path_key::{self, normalize};

pub const MARKED_FILES: &str = "marked_files";

/// A user-assigned annotation on a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Green,
    Red,
}

impl Mark {
    pub fn as_str(self) -> &'static str {
        match self {
            Mark::Green => "green",
            Mark::Red => "red",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "green" => Some(Mark::Green),
            "red" => Some(Mark::Red),
            _ => None,
        }
    }
}

/// Mark operations over a borrowed [`PreferenceStore`].
pub struct MarkRegistry<'a> {
    store: &'a mut PreferenceStore,
}

impl PreferenceStore {
    pub fn marks(&mut self) -> MarkRegistry<'_> {
        MarkRegistry { store: self }
    }
}

impl MarkRegistry<'_> {
    /// Mark of `path`, migrating a legacy raw-key entry on the way.
    pub fn get(&mut self, path: &str) -> Option<Mark> {
        let key = normalize(path);
        self.store.migrate(MARKED_FILES, path, &key);
        self.store
            .section(MARKED_FILES)
            .and_then(|map| map.get(&key))
            .and_then(Value::as_str)
            .and_then(Mark::parse)
    }

    /// Set or clear the mark of `path`. Any raw-key duplicate is removed.
    pub fn set(&mut self, path: &str, mark: Option<Mark>) {
        let key = normalize(path);
        self.store.with_section(MARKED_FILES, |section| {
            if key != path {
                section.remove(path);
            }
            match mark {
                Some(mark) => {
                    section.insert(key, Value::from(mark.as_str()));
                }
                None => {
                    section.remove(&key);
                }
            }
        });
    }

    /// Move marks for `old` (and anything beneath it) to `new`.
    /// Both arguments are normalized keys.
    pub fn relocate(&mut self, old: &str, new: &str) {
        self.store
            .with_section(MARKED_FILES, |section| relocate_keys(section, old, new));
    }

    /// Drop marks for `key` and anything beneath it.
    pub fn forget(&mut self, key: &str) {
        self.store.with_section(MARKED_FILES, |section| {
            section.retain(|k, _| !path_key::is_same_or_descendant(k, key))
        });
    }

    /// Number of marked files.
    pub fn len(&self) -> usize {
        self.store.section(MARKED_FILES).map_or(0, |map| map.len())
    }
}
