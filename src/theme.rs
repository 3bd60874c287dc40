//! Theme resolution and built-in palettes.
//!
//! The persisted theme mode is `light`, `dark` or `auto`. `auto` asks a
//! [`ThemeProbe`] what the surrounding terminal looks like; answers are
//! held in a [`ThemeCache`] for a short TTL so a redraw loop does not probe
//! every frame.

use std::time::{Duration, Instant};

use ratatui::style::Color;

use crate::prefs::{Mark, ThemeMode};

/// Default lifetime of a cached probe answer.
pub const DEFAULT_PROBE_TTL_MS: u64 = 2000;

/// A concrete palette choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeKind {
    Light,
    Dark,
}

impl ThemeKind {
    pub fn is_dark(self) -> bool {
        self == ThemeKind::Dark
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeKind::Light => "light",
            ThemeKind::Dark => "dark",
        }
    }
}

// ── Probe & cache ────────────────────────────────────────────────────────────

/// Query for the environment's preferred theme.
pub trait ThemeProbe {
    fn probe(&self) -> ThemeKind;
}

/// Reads `COLORFGBG` (`"<fg>;<bg>"`, set by many terminals). Background
/// indices 0-6 and 8 are dark; anything else readable is light. Dark when
/// unset or unparsable.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvProbe;

impl ThemeProbe for EnvProbe {
    fn probe(&self) -> ThemeKind {
        std::env::var("COLORFGBG")
            .ok()
            .and_then(|value| kind_from_colorfgbg(&value))
            .unwrap_or(ThemeKind::Dark)
    }
}

fn kind_from_colorfgbg(value: &str) -> Option<ThemeKind> {
    let bg: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
    Some(match bg {
        0..=6 | 8 => ThemeKind::Dark,
        _ => ThemeKind::Light,
    })
}

/// Owned cache in front of a [`ThemeProbe`].
pub struct ThemeCache {
    probe: Box<dyn ThemeProbe>,
    ttl: Duration,
    cached: Option<(ThemeKind, Instant)>,
}

impl ThemeCache {
    pub fn new(probe: Box<dyn ThemeProbe>, ttl: Duration) -> Self {
        Self {
            probe,
            ttl,
            cached: None,
        }
    }

    /// Cached answer if younger than the TTL at `now`, else a fresh probe.
    pub fn get(&mut self, now: Instant) -> ThemeKind {
        if let Some((kind, at)) = self.cached {
            if now.saturating_duration_since(at) < self.ttl {
                return kind;
            }
        }
        let kind = self.probe.probe();
        self.cached = Some((kind, now));
        kind
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Resolve a theme mode into a palette choice.
    pub fn resolve(&mut self, mode: ThemeMode, now: Instant) -> ThemeKind {
        match mode {
            ThemeMode::Light => ThemeKind::Light,
            ThemeMode::Dark => ThemeKind::Dark,
            ThemeMode::Auto => self.get(now),
        }
    }
}

// ── Runtime theme colors ─────────────────────────────────────────────────────

/// All runtime colors used in the UI.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    // Tree panel
    pub tree_selected_bg: Color,
    pub tree_selected_fg: Color,
    pub tree_dir_fg: Color,
    pub tree_file_fg: Color,
    pub tree_hidden_fg: Color,

    // Preview panel
    pub preview_fg: Color,
    pub heading_fg: Color,
    pub code_bg: Color,
    pub quote_fg: Color,

    // Status bar
    pub status_bg: Color,
    pub status_fg: Color,

    // Borders & chrome
    pub border_fg: Color,
    pub border_focused_fg: Color,

    // Dialogs
    pub dialog_bg: Color,
    pub dialog_border_fg: Color,

    // Semantic
    pub error_fg: Color,
    pub success_fg: Color,
    pub accent_fg: Color,
    pub dim_fg: Color,

    // File marks, identical across themes
    pub mark_green: Color,
    pub mark_red: Color,
}

impl ThemeColors {
    pub fn for_kind(kind: ThemeKind) -> Self {
        match kind {
            ThemeKind::Dark => dark_theme(),
            ThemeKind::Light => light_theme(),
        }
    }

    /// Foreground for a marked file.
    pub fn mark_fg(&self, mark: Mark) -> Color {
        match mark {
            Mark::Green => self.mark_green,
            Mark::Red => self.mark_red,
        }
    }
}

const MARK_GREEN: Color = Color::Rgb(40, 167, 69); // #28a745
const MARK_RED: Color = Color::Rgb(220, 53, 69); // #dc3545

/// Dark theme using Catppuccin Mocha palette.
pub fn dark_theme() -> ThemeColors {
    ThemeColors {
        tree_selected_bg: Color::Rgb(69, 71, 90),    // #45475a (surface1)
        tree_selected_fg: Color::Rgb(205, 214, 244), // #cdd6f4
        tree_dir_fg: Color::Rgb(137, 180, 250),      // #89b4fa (blue)
        tree_file_fg: Color::Rgb(205, 214, 244),     // #cdd6f4
        tree_hidden_fg: Color::Rgb(108, 112, 134),   // #6c7086 (overlay0)

        preview_fg: Color::Rgb(205, 214, 244),
        heading_fg: Color::Rgb(203, 166, 247), // #cba6f7 (mauve)
        code_bg: Color::Rgb(49, 50, 68),       // #313244 (surface0)
        quote_fg: Color::Rgb(166, 173, 200),   // #a6adc8 (subtext0)

        status_bg: Color::Rgb(30, 30, 46), // #1e1e2e (base)
        status_fg: Color::Rgb(205, 214, 244),

        border_fg: Color::Rgb(88, 91, 112),           // #585b70 (surface2)
        border_focused_fg: Color::Rgb(137, 180, 250), // #89b4fa (blue)

        dialog_bg: Color::Rgb(49, 50, 68), // #313244 (surface0)
        dialog_border_fg: Color::Rgb(137, 180, 250),

        error_fg: Color::Rgb(243, 139, 168),   // #f38ba8 (red)
        success_fg: Color::Rgb(166, 227, 161), // #a6e3a1 (green)
        accent_fg: Color::Rgb(203, 166, 247),  // #cba6f7 (mauve)
        dim_fg: Color::Rgb(108, 112, 134),     // #6c7086

        mark_green: MARK_GREEN,
        mark_red: MARK_RED,
    }
}

/// Light theme using Catppuccin Latte palette.
pub fn light_theme() -> ThemeColors {
    ThemeColors {
        tree_selected_bg: Color::Rgb(204, 208, 218), // #ccd0da (surface1)
        tree_selected_fg: Color::Rgb(76, 79, 105),
        tree_dir_fg: Color::Rgb(30, 102, 245), // #1e66f5 (blue)
        tree_file_fg: Color::Rgb(76, 79, 105),
        tree_hidden_fg: Color::Rgb(156, 160, 176), // #9ca0b0 (overlay0)

        preview_fg: Color::Rgb(76, 79, 105),
        heading_fg: Color::Rgb(136, 57, 239), // #8839ef (mauve)
        code_bg: Color::Rgb(230, 233, 239),   // #e6e9ef (surface0)
        quote_fg: Color::Rgb(108, 111, 133),  // #6c6f85 (subtext0)

        status_bg: Color::Rgb(239, 241, 245), // #eff1f5 (base)
        status_fg: Color::Rgb(76, 79, 105),

        border_fg: Color::Rgb(172, 176, 190), // #acb0be (surface2)
        border_focused_fg: Color::Rgb(30, 102, 245),

        dialog_bg: Color::Rgb(230, 233, 239), // #e6e9ef (surface0)
        dialog_border_fg: Color::Rgb(30, 102, 245),

        error_fg: Color::Rgb(210, 15, 57),   // #d20f39 (red)
        success_fg: Color::Rgb(64, 160, 43), // #40a02b (green)
        accent_fg: Color::Rgb(136, 57, 239), // #8839ef (mauve)
        dim_fg: Color::Rgb(156, 160, 176),

        mark_green: MARK_GREEN,
        mark_red: MARK_RED,
    }
}

// ── Color parsing ────────────────────────────────────────────────────────────

/// Parse a hex color string like `"#aabbcc"` into a `ratatui::style::Color`.
/// Returns `None` for malformed input.
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

// ── Tests ────────────────────────────────────────────────────────────────────
