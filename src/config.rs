//! Application settings: TOML file loading, CLI overrides, and defaults.
//!
//! These are read-only at runtime and separate from the JSON preference
//! document, which the application writes back.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--prefs`, `--no-watcher`, ...)
//! 2. `$MDB_CONFIG` environment variable (path to config file)
//! 3. Project-local `.mdbrowse.toml` in the current working directory
//! 4. Global `~/.config/mdbrowse/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::fs::watcher::DEFAULT_IGNORE_PATTERNS;
use crate::prefs::defaults::DEFAULT_RECENT_MAX;
use crate::sync::{DEFAULT_REFRESH_DELAY_MS, DEFAULT_RESTORE_DELAY_MS, DEFAULT_WATCH_DEPTH};
use crate::theme::DEFAULT_PROBE_TTL_MS;

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Show hidden files by default.
    pub show_hidden: Option<bool>,
    /// Length bound of the recent files / folders lists.
    pub recent_max: Option<usize>,
    /// File extensions listed in the tree.
    pub extensions: Option<Vec<String>>,
}

/// Filesystem watcher settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WatcherConfig {
    /// Enable filesystem watcher for auto-refresh.
    pub enabled: Option<bool>,
    /// Quiet period before a change reloads the tree, in milliseconds.
    pub refresh_delay_ms: Option<u64>,
    /// Levels below the root that are watched eagerly.
    pub watch_depth: Option<usize>,
    /// Directory names never watched.
    pub ignore: Option<Vec<String>>,
}

/// Preference persistence settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Location of the JSON preference document.
    pub prefs_path: Option<PathBuf>,
    pub geometry_delay_ms: Option<u64>,
    pub splitter_delay_ms: Option<u64>,
    pub restore_delay_ms: Option<u64>,
}

/// Theme settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    /// How long an `auto` theme probe answer is reused, in milliseconds.
    pub probe_ttl_ms: Option<u64>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub watcher: WatcherConfig,
    pub persistence: PersistenceConfig,
    pub theme: ThemeConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

/// Default debounce for persisting window geometry.
pub const DEFAULT_GEOMETRY_DELAY_MS: u64 = 500;
/// Default debounce for persisting the splitter position.
pub const DEFAULT_SPLITTER_DELAY_MS: u64 = 500;

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path; that is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("MDB_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".mdbrowse.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("mdbrowse").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (logged as a warning).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => {
            tracing::debug!(path = %path.display(), "loaded settings file");
            Some(cfg)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "failed to parse settings file: {e}");
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                show_hidden: other.general.show_hidden.or(self.general.show_hidden),
                recent_max: other.general.recent_max.or(self.general.recent_max),
                extensions: other
                    .general
                    .extensions
                    .clone()
                    .or(self.general.extensions),
            },
            watcher: WatcherConfig {
                enabled: other.watcher.enabled.or(self.watcher.enabled),
                refresh_delay_ms: other
                    .watcher
                    .refresh_delay_ms
                    .or(self.watcher.refresh_delay_ms),
                watch_depth: other.watcher.watch_depth.or(self.watcher.watch_depth),
                ignore: other.watcher.ignore.clone().or(self.watcher.ignore),
            },
            persistence: PersistenceConfig {
                prefs_path: other
                    .persistence
                    .prefs_path
                    .clone()
                    .or(self.persistence.prefs_path),
                geometry_delay_ms: other
                    .persistence
                    .geometry_delay_ms
                    .or(self.persistence.geometry_delay_ms),
                splitter_delay_ms: other
                    .persistence
                    .splitter_delay_ms
                    .or(self.persistence.splitter_delay_ms),
                restore_delay_ms: other
                    .persistence
                    .restore_delay_ms
                    .or(self.persistence.restore_delay_ms),
            },
            theme: ThemeConfig {
                probe_ttl_ms: other.theme.probe_ttl_ms.or(self.theme.probe_ttl_ms),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Walk in reverse so that highest-priority (env var) overwrites lower.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn show_hidden(&self) -> bool {
        self.general.show_hidden.unwrap_or(false)
    }

    pub fn recent_max(&self) -> usize {
        self.general.recent_max.unwrap_or(DEFAULT_RECENT_MAX)
    }

    /// Extensions listed in the tree, lowercase and without the dot.
    pub fn extensions(&self) -> Vec<String> {
        match &self.general.extensions {
            Some(exts) => exts
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            None => vec!["md".into(), "markdown".into()],
        }
    }

    pub fn watcher_enabled(&self) -> bool {
        self.watcher.enabled.unwrap_or(true)
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(
            self.watcher
                .refresh_delay_ms
                .unwrap_or(DEFAULT_REFRESH_DELAY_MS),
        )
    }

    pub fn watch_depth(&self) -> usize {
        self.watcher.watch_depth.unwrap_or(DEFAULT_WATCH_DEPTH)
    }

    pub fn ignore_patterns(&self) -> Vec<String> {
        self.watcher.ignore.clone().unwrap_or_else(|| {
            DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect()
        })
    }

    /// Location of the preference document.
    pub fn prefs_path(&self) -> PathBuf {
        self.persistence
            .prefs_path
            .clone()
            .unwrap_or_else(crate::prefs::default_prefs_path)
    }

    pub fn geometry_delay(&self) -> Duration {
        Duration::from_millis(
            self.persistence
                .geometry_delay_ms
                .unwrap_or(DEFAULT_GEOMETRY_DELAY_MS),
        )
    }

    pub fn splitter_delay(&self) -> Duration {
        Duration::from_millis(
            self.persistence
                .splitter_delay_ms
                .unwrap_or(DEFAULT_SPLITTER_DELAY_MS),
        )
    }

    pub fn restore_delay(&self) -> Duration {
        Duration::from_millis(
            self.persistence
                .restore_delay_ms
                .unwrap_or(DEFAULT_RESTORE_DELAY_MS),
        )
    }

    pub fn probe_ttl(&self) -> Duration {
        Duration::from_millis(self.theme.probe_ttl_ms.unwrap_or(DEFAULT_PROBE_TTL_MS))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let cfg = AppConfig::default();
        assert!(!cfg.show_hidden());
        assert_eq!(cfg.recent_max(), 10);
        assert_eq!(cfg.extensions(), vec!["md", "markdown"]);
        assert!(cfg.watcher_enabled());
        assert_eq!(cfg.refresh_delay(), Duration::from_millis(300));
        assert_eq!(cfg.watch_depth(), 3);
        assert!(cfg.ignore_patterns().contains(&".git".to_string()));
        assert_eq!(cfg.geometry_delay(), Duration::from_millis(500));
        assert_eq!(cfg.splitter_delay(), Duration::from_millis(500));
        assert_eq!(cfg.restore_delay(), Duration::from_millis(100));
        assert_eq!(cfg.probe_ttl(), Duration::from_millis(2000));
        assert!(cfg.prefs_path().ends_with("mdbrowse/app.json"));
    }

    #[test]
    fn test_toml_parsing_full() {
        let toml = r#"
[general]
show_hidden = true
recent_max = 5
extensions = [".MD", "txt"]

[watcher]
enabled = false
refresh_delay_ms = 150
watch_depth = 1
ignore = ["build"]

[persistence]
prefs_path = "/tmp/mdb/app.json"
geometry_delay_ms = 250
splitter_delay_ms = 100
restore_delay_ms = 50

[theme]
probe_ttl_ms = 10
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert!(cfg.show_hidden());
        assert_eq!(cfg.recent_max(), 5);
        assert_eq!(cfg.extensions(), vec!["md", "txt"]);
        assert!(!cfg.watcher_enabled());
        assert_eq!(cfg.refresh_delay(), Duration::from_millis(150));
        assert_eq!(cfg.watch_depth(), 1);
        assert_eq!(cfg.ignore_patterns(), vec!["build"]);
        assert_eq!(cfg.prefs_path(), PathBuf::from("/tmp/mdb/app.json"));
        assert_eq!(cfg.geometry_delay(), Duration::from_millis(250));
        assert_eq!(cfg.splitter_delay(), Duration::from_millis(100));
        assert_eq!(cfg.restore_delay(), Duration::from_millis(50));
        assert_eq!(cfg.probe_ttl(), Duration::from_millis(10));
    }

    #[test]
    fn test_toml_parsing_partial() {
        let cfg: AppConfig = toml::from_str("[watcher]\nwatch_depth = 5\n").expect("parse failed");
        assert_eq!(cfg.watch_depth(), 5);
        assert_eq!(cfg.refresh_delay(), Duration::from_millis(300));
        assert_eq!(cfg.recent_max(), 10);
    }

    #[test]
    fn test_merge_overrides() {
        let base = AppConfig {
            general: GeneralConfig {
                show_hidden: Some(false),
                recent_max: Some(20),
                ..Default::default()
            },
            ..Default::default()
        };
        let over = AppConfig {
            general: GeneralConfig {
                show_hidden: Some(true),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = base.merge(&over);
        assert!(merged.show_hidden());
        assert_eq!(merged.recent_max(), 20);
    }

    #[test]
    fn test_merge_none_does_not_clear_some() {
        let base = AppConfig {
            watcher: WatcherConfig {
                enabled: Some(false),
                refresh_delay_ms: Some(500),
                ..Default::default()
            },
            ..Default::default()
        };
        let merged = base.merge(&AppConfig::default());
        assert!(!merged.watcher_enabled());
        assert_eq!(merged.refresh_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("test-config.toml");
        let mut f = std::fs::File::create(&cfg_path).expect("create");
        writeln!(f, "[general]\nrecent_max = 3\n\n[theme]\nprobe_ttl_ms = 500").expect("write");

        let cfg = load_file(&cfg_path).expect("load");
        assert_eq!(cfg.recent_max(), 3);
        assert_eq!(cfg.probe_ttl(), Duration::from_millis(500));
        assert_eq!(cfg.watch_depth(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_file(Path::new("/nonexistent/config.toml")).is_none());
    }

    #[test]
    fn test_load_invalid_toml_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("bad.toml");
        std::fs::write(&cfg_path, "this is { not valid toml").expect("write");
        assert!(load_file(&cfg_path).is_none());
    }

    #[test]
    fn test_load_with_cli_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("config.toml");
        std::fs::write(
            &cfg_path,
            "[general]\nshow_hidden = true\n\n[watcher]\nenabled = true\n",
        )
        .expect("write");

        let cli_overrides = AppConfig {
            watcher: WatcherConfig {
                enabled: Some(false),
                ..Default::default()
            },
            ..Default::default()
        };

        let cfg = AppConfig::load(Some(&cfg_path), Some(&cli_overrides));
        assert!(!cfg.watcher_enabled());
        assert!(cfg.show_hidden());
    }
}
