//! Typed helpers over the preference document, one per semantic domain.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::defaults::*;
use super::PreferenceStore;
use crate::fs::path_key::{self, normalize};

pub const EXPANDED_PATHS: &str = "expanded_paths";
pub const SCROLL_POSITIONS: &str = "file_scroll_positions";

// ── Value types ──────────────────────────────────────────────────────────────

/// Persisted window geometry and splitter position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowState {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    pub splitter_position: i64,
    pub maximized: bool,
}

/// User-selected theme mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    Auto,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
            ThemeMode::Auto => "auto",
        }
    }

    /// Parse a persisted value; anything unrecognized means `Auto`.
    pub fn parse(s: &str) -> Self {
        match s {
            "light" => ThemeMode::Light,
            "dark" => ThemeMode::Dark,
            _ => ThemeMode::Auto,
        }
    }

    /// Cycle light → dark → auto → light.
    pub fn next(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Auto,
            ThemeMode::Auto => ThemeMode::Light,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Font parameters handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontSettings {
    pub body_size: u32,
    pub code_size: u32,
    pub code_family: String,
    /// `"normal"` or `"bold"`.
    pub code_weight: String,
    pub code_inline_color: Option<String>,
    pub code_block_color: Option<String>,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            body_size: DEFAULT_BODY_SIZE,
            code_size: DEFAULT_CODE_SIZE,
            code_family: DEFAULT_CODE_FAMILY.to_string(),
            code_weight: DEFAULT_CODE_WEIGHT.to_string(),
            code_inline_color: None,
            code_block_color: None,
        }
    }
}

// ── Accessors ────────────────────────────────────────────────────────────────

impl PreferenceStore {
    pub fn window(&self) -> WindowState {
        WindowState {
            x: self.get_or("window.x", DEFAULT_WINDOW_X),
            y: self.get_or("window.y", DEFAULT_WINDOW_Y),
            width: self.get_or("window.width", DEFAULT_WINDOW_WIDTH),
            height: self.get_or("window.height", DEFAULT_WINDOW_HEIGHT),
            splitter_position: self.splitter_position(),
            maximized: self.get_or("window.maximized", false),
        }
    }

    pub fn set_window_config(&mut self, x: i64, y: i64, width: i64, height: i64, maximized: bool) {
        self.set("window.x", x);
        self.set("window.y", y);
        self.set("window.width", width);
        self.set("window.height", height);
        self.set("window.maximized", maximized);
    }

    pub fn splitter_position(&self) -> i64 {
        self.get_or("window.splitter_position", DEFAULT_SPLITTER_POSITION)
    }

    pub fn set_splitter_position(&mut self, position: i64) {
        self.set("window.splitter_position", position);
    }

    pub fn theme(&self) -> ThemeMode {
        self.get("theme")
            .and_then(Value::as_str)
            .map(ThemeMode::parse)
            .unwrap_or_default()
    }

    pub fn set_theme(&mut self, theme: ThemeMode) {
        self.set("theme", theme.as_str());
    }

    /// Font settings, defaulting each field individually.
    pub fn font(&self) -> FontSettings {
        let defaults = FontSettings::default();
        FontSettings {
            body_size: self.get_or("font.body_size", defaults.body_size),
            code_size: self.get_or("font.code_size", defaults.code_size),
            code_family: self.get_or("font.code_family", defaults.code_family),
            code_weight: self.get_or("font.code_weight", defaults.code_weight),
            code_inline_color: self.get_or("font.code_inline_color", None),
            code_block_color: self.get_or("font.code_block_color", None),
        }
    }

    // ── Recent lists ─────────────────────────────────────────────────────────

    pub fn recent_files(&self) -> Vec<String> {
        self.string_list("recent_files")
    }

    pub fn add_recent_file(&mut self, path: &str, max_count: usize) {
        self.push_recent("recent_files", path, max_count);
    }

    pub fn recent_dirs(&self) -> Vec<String> {
        self.string_list("recent_dirs")
    }

    pub fn add_recent_dir(&mut self, path: &str, max_count: usize) {
        self.push_recent("recent_dirs", path, max_count);
    }

    fn string_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn push_recent(&mut self, key: &str, path: &str, max_count: usize) {
        let mut list = self.string_list(key);
        list.retain(|existing| existing != path);
        list.insert(0, path.to_string());
        list.truncate(max_count);
        self.set(key, list);
    }

    // ── Last file / dir ──────────────────────────────────────────────────────

    pub fn last_file(&self) -> Option<String> {
        self.get_or("last_file", None)
    }

    pub fn set_last_file(&mut self, path: &str) {
        self.set("last_file", path);
    }

    pub fn last_dir(&self) -> Option<String> {
        self.get_or("last_dir", None)
    }

    pub fn set_last_dir(&mut self, path: &str) {
        self.set("last_dir", path);
    }

    // ── Expansion sets ───────────────────────────────────────────────────────

    /// Persisted expansion set for `root`, in stored order.
    pub fn expanded_paths(&mut self, root: &str) -> Vec<String> {
        let key = normalize(root);
        self.migrate(EXPANDED_PATHS, root, &key);
        self.section(EXPANDED_PATHS)
            .and_then(|map| map.get(&key))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_expanded_paths(&mut self, root: &str, paths: Vec<String>) {
        let key = normalize(root);
        self.with_section(EXPANDED_PATHS, |section| {
            if key != root {
                section.remove(root);
            }
            section.insert(key, Value::from(paths));
        });
    }

    /// Rewrite every persisted expansion path (and root key) under `old`
    /// to live under `new`.
    pub fn relocate_expanded_paths(&mut self, old: &str, new: &str) {
        self.with_section(EXPANDED_PATHS, |section| {
            let entries: Vec<(String, Value)> = std::mem::take(section).into_iter().collect();
            for (root, list) in entries {
                let root = path_key::relocate(&root, old, new).unwrap_or(root);
                let list = match list {
                    Value::Array(items) => Value::Array(
                        items
                            .into_iter()
                            .map(|item| match item.as_str() {
                                Some(p) => path_key::relocate(p, old, new)
                                    .map(Value::from)
                                    .unwrap_or(item),
                                None => item,
                            })
                            .collect(),
                    ),
                    other => other,
                };
                section.insert(root, list);
            }
        });
    }

    // ── Scroll offsets ───────────────────────────────────────────────────────

    /// Persisted scroll offset for `path`; zero when unknown.
    pub fn scroll_position(&mut self, path: &str) -> u64 {
        let key = normalize(path);
        self.migrate(SCROLL_POSITIONS, path, &key);
        self.section(SCROLL_POSITIONS)
            .and_then(|map| map.get(&key))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// Store a scroll offset. Zero removes the entry since it equals the
    /// default.
    pub fn set_scroll_position(&mut self, path: &str, position: u64) {
        let key = normalize(path);
        self.with_section(SCROLL_POSITIONS, |section| {
            if key != path {
                section.remove(path);
            }
            if position == 0 {
                section.remove(&key);
            } else {
                section.insert(key, Value::from(position));
            }
        });
    }

    /// Move scroll entries for `old` (and anything beneath it) to `new`.
    /// Both arguments are normalized keys.
    pub fn relocate_scroll_positions(&mut self, old: &str, new: &str) {
        self.with_section(SCROLL_POSITIONS, |section| relocate_keys(section, old, new));
    }

    /// Drop scroll entries for `key` and anything beneath it.
    pub fn forget_scroll_positions(&mut self, key: &str) {
        self.with_section(SCROLL_POSITIONS, |section| {
            section.retain(|k, _| !path_key::is_same_or_descendant(k, key))
        });
    }
}

/// Rename keys of `map` that are `old` or beneath it.
pub(crate) fn relocate_keys(map: &mut serde_json::Map<String, Value>, old: &str, new: &str) {
    let moving: Vec<String> = map
        .keys()
        .filter(|k| path_key::is_same_or_descendant(k, old))
        .cloned()
        .collect();
    for key in moving {
        if let (Some(value), Some(target)) = (map.remove(&key), path_key::relocate(&key, old, new)) {
            map.insert(target, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, PreferenceStore) {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::load(dir.path().join("app.json"));
        (dir, store)
    }

    #[test]
    fn window_defaults() {
        let (_dir, store) = temp_store();
        let window = store.window();
        assert_eq!(window.width, 1200);
        assert_eq!(window.height, 800);
        assert_eq!(window.splitter_position, 300);
        assert!(!window.maximized);
    }

    #[test]
    fn window_config_round_trip() {
        let (_dir, mut store) = temp_store();
        store.set_window_config(5, 6, 700, 500, true);
        store.set_splitter_position(220);
        let window = store.window();
        assert_eq!((window.x, window.y, window.width, window.height), (5, 6, 700, 500));
        assert!(window.maximized);
        assert_eq!(window.splitter_position, 220);
    }

    #[test]
    fn theme_parses_and_defaults() {
        let (_dir, mut store) = temp_store();
        assert_eq!(store.theme(), ThemeMode::Auto);
        store.set_theme(ThemeMode::Dark);
        assert_eq!(store.theme(), ThemeMode::Dark);
        store.set("theme", "sepia");
        assert_eq!(store.theme(), ThemeMode::Auto);
        assert_eq!(ThemeMode::Light.next(), ThemeMode::Dark);
        assert_eq!(ThemeMode::Auto.next(), ThemeMode::Light);
    }

    #[test]
    fn font_defaults_field_by_field() {
        let (_dir, mut store) = temp_store();
        store.set("font.code_size", "huge");
        store.set("font.code_block_color", "#ff0000");
        let font = store.font();
        assert_eq!(font.code_size, 14);
        assert_eq!(font.body_size, 16);
        assert_eq!(font.code_block_color.as_deref(), Some("#ff0000"));
        assert_eq!(font.code_inline_color, None);
    }

    #[test]
    fn recent_list_is_bounded_and_most_recent_first() {
        let (_dir, mut store) = temp_store();
        for i in 0..15 {
            store.add_recent_file(&format!("/docs/{i}.md"), 10);
        }
        let recent = store.recent_files();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0], "/docs/14.md");
        assert_eq!(recent[9], "/docs/5.md");
    }

    #[test]
    fn recent_list_moves_existing_to_front() {
        let (_dir, mut store) = temp_store();
        store.add_recent_dir("/a", 10);
        store.add_recent_dir("/b", 10);
        store.add_recent_dir("/a", 10);
        assert_eq!(store.recent_dirs(), vec!["/a".to_string(), "/b".to_string()]);
    }

    #[test]
    fn recent_list_tolerates_garbage() {
        let (_dir, mut store) = temp_store();
        store.set("recent_files", "not a list");
        assert!(store.recent_files().is_empty());
        store.add_recent_file("/x.md", 10);
        assert_eq!(store.recent_files(), vec!["/x.md".to_string()]);
    }

    #[test]
    fn last_file_and_dir() {
        let (_dir, mut store) = temp_store();
        assert_eq!(store.last_file(), None);
        store.set_last_file("/n/a.md");
        store.set_last_dir("/n");
        assert_eq!(store.last_file().as_deref(), Some("/n/a.md"));
        assert_eq!(store.last_dir().as_deref(), Some("/n"));
    }

    #[test]
    fn expanded_paths_are_keyed_by_normalized_root() {
        let (dir, mut store) = temp_store();
        let root = dir.path().join("notes");
        fs::create_dir(&root).unwrap();
        let sloppy = format!("{}/./", root.to_string_lossy());
        store.set_expanded_paths(&sloppy, vec!["/x".into(), "/x/y".into()]);
        assert_eq!(
            store.expanded_paths(&root.to_string_lossy()),
            vec!["/x".to_string(), "/x/y".to_string()]
        );
    }

    #[test]
    fn expanded_paths_migrate_from_raw_root() {
        let (dir, mut store) = temp_store();
        let root = dir.path().join("notes");
        fs::create_dir(&root).unwrap();
        let raw = format!("{}/sub/..", root.to_string_lossy());
        store.with_section(EXPANDED_PATHS, |s| s.insert(raw.clone(), json!(["/kept"])));
        assert_eq!(store.expanded_paths(&raw), vec!["/kept".to_string()]);
        let section = store.section(EXPANDED_PATHS).unwrap();
        assert!(!section.contains_key(&raw));
        assert!(section.contains_key(&normalize(&root.to_string_lossy())));
    }

    #[test]
    fn relocate_expanded_paths_rewrites_roots_and_members() {
        let (_dir, mut store) = temp_store();
        store.with_section(EXPANDED_PATHS, |s| {
            s.insert("/r".into(), json!(["/r/old", "/r/old/deep", "/r/other"]));
            s.insert("/r/old".into(), json!(["/r/old/deep"]));
        });
        store.relocate_expanded_paths("/r/old", "/r/new");
        let section = store.section(EXPANDED_PATHS).unwrap();
        assert_eq!(section["/r"], json!(["/r/new", "/r/new/deep", "/r/other"]));
        assert_eq!(section["/r/new"], json!(["/r/new/deep"]));
        assert!(!section.contains_key("/r/old"));
    }

    #[test]
    fn scroll_position_defaults_to_zero_and_round_trips() {
        let (dir, mut store) = temp_store();
        let file = dir.path().join("a.md");
        fs::write(&file, "").unwrap();
        let path = file.to_string_lossy().to_string();
        assert_eq!(store.scroll_position(&path), 0);
        store.set_scroll_position(&path, 420);
        assert_eq!(store.scroll_position(&path), 420);
        store.set_scroll_position(&path, 0);
        assert!(store.section(SCROLL_POSITIONS).unwrap().is_empty());
    }

    #[test]
    fn scroll_relocate_and_forget_follow_prefixes() {
        let (_dir, mut store) = temp_store();
        store.with_section(SCROLL_POSITIONS, |s| {
            s.insert("/d/a.md".into(), json!(10));
            s.insert("/d/sub/b.md".into(), json!(20));
            s.insert("/dx.md".into(), json!(30));
        });
        store.relocate_scroll_positions("/d", "/e");
        let section = store.section(SCROLL_POSITIONS).unwrap();
        assert_eq!(section["/e/a.md"], json!(10));
        assert_eq!(section["/e/sub/b.md"], json!(20));
        assert_eq!(section["/dx.md"], json!(30));
        store.forget_scroll_positions("/e");
        assert_eq!(store.section(SCROLL_POSITIONS).unwrap().len(), 1);
    }
}
