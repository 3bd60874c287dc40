//! Compiled-in default schema for the preference document.

use serde_json::{json, Map, Value};

pub const DEFAULT_WINDOW_X: i64 = 100;
pub const DEFAULT_WINDOW_Y: i64 = 100;
pub const DEFAULT_WINDOW_WIDTH: i64 = 1200;
pub const DEFAULT_WINDOW_HEIGHT: i64 = 800;
pub const DEFAULT_SPLITTER_POSITION: i64 = 300;

pub const DEFAULT_BODY_SIZE: u32 = 16;
pub const DEFAULT_CODE_SIZE: u32 = 14;
pub const DEFAULT_CODE_FAMILY: &str = "Consolas, Monaco, \"Courier New\", monospace";
pub const DEFAULT_CODE_WEIGHT: &str = "normal";

/// Default bound for the recent-files and recent-dirs lists.
pub const DEFAULT_RECENT_MAX: usize = 10;

/// The full default document.
pub fn default_document() -> Map<String, Value> {
    let value = json!({
        "window": {
            "x": DEFAULT_WINDOW_X,
            "y": DEFAULT_WINDOW_Y,
            "width": DEFAULT_WINDOW_WIDTH,
            "height": DEFAULT_WINDOW_HEIGHT,
            "splitter_position": DEFAULT_SPLITTER_POSITION,
            "maximized": false
        },
        "theme": "auto",
        "font": {
            "body_size": DEFAULT_BODY_SIZE,
            "code_size": DEFAULT_CODE_SIZE,
            "code_family": DEFAULT_CODE_FAMILY,
            "code_weight": DEFAULT_CODE_WEIGHT,
            "code_inline_color": null,
            "code_block_color": null
        },
        "recent_files": [],
        "recent_dirs": [],
        "marked_files": {},
        "expanded_paths": {},
        "file_scroll_positions": {},
        "last_file": null,
        "last_dir": null
    });
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Seed missing defaults into `doc`.
///
/// Missing top-level keys are inserted wholesale. When both the default and
/// the existing value are objects, missing second-level keys are inserted
/// one by one. Nothing deeper is merged.
pub fn merge_defaults(doc: &mut Map<String, Value>) {
    for (key, default) in default_document() {
        match doc.get_mut(&key) {
            None => {
                doc.insert(key, default);
            }
            Some(Value::Object(existing)) => {
                if let Value::Object(default_fields) = default {
                    for (sub_key, sub_default) in default_fields {
                        existing.entry(sub_key).or_insert(sub_default);
                    }
                }
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gets_everything() {
        let mut doc = Map::new();
        merge_defaults(&mut doc);
        assert_eq!(doc, default_document());
    }

    #[test]
    fn missing_nested_key_is_filled_siblings_untouched() {
        let mut doc = json!({ "font": { "body_size": 20, "code_family": "Fira Code" } })
            .as_object()
            .cloned()
            .unwrap();
        merge_defaults(&mut doc);
        assert_eq!(doc["font"]["code_size"], json!(14));
        assert_eq!(doc["font"]["body_size"], json!(20));
        assert_eq!(doc["font"]["code_family"], json!("Fira Code"));
    }

    #[test]
    fn deeper_levels_are_not_merged() {
        let mut doc = json!({ "marked_files": { "/a.md": "green" } })
            .as_object()
            .cloned()
            .unwrap();
        merge_defaults(&mut doc);
        assert_eq!(doc["marked_files"], json!({ "/a.md": "green" }));
    }

    #[test]
    fn scalar_in_place_of_section_is_left_alone() {
        let mut doc = json!({ "window": 5 }).as_object().cloned().unwrap();
        merge_defaults(&mut doc);
        assert_eq!(doc["window"], json!(5));
    }

    #[test]
    fn unknown_keys_survive() {
        let mut doc = json!({ "plugin_state": { "k": 1 } })
            .as_object()
            .cloned()
            .unwrap();
        merge_defaults(&mut doc);
        assert_eq!(doc["plugin_state"], json!({ "k": 1 }));
    }
}
