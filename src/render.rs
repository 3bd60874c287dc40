//! Markdown to styled terminal lines.
//!
//! The preview pane never sees markdown: it receives a [`RenderedDocument`]
//! produced by a [`Renderer`] from the document source and the
//! [`RenderParams`] resolved from preferences.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::prefs::PreferenceStore;
use crate::theme::{parse_hex_color, ThemeColors, ThemeKind};

/// syntect theme used for code blocks in the light palette.
pub const LIGHT_CODE_THEME: &str = "InspiredGitHub";
/// syntect theme used for code blocks in the dark palette.
pub const DARK_CODE_THEME: &str = "base16-ocean.dark";

/// Everything the renderer needs besides the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub theme: ThemeKind,
    /// Carried for parity with the persisted font settings; a terminal
    /// cannot change glyph size.
    pub body_size: u32,
    pub code_size: u32,
    pub code_family: String,
    pub code_bold: bool,
    pub inline_code_color: Option<Color>,
    pub block_code_color: Option<Color>,
}

impl RenderParams {
    /// Font parameters from `prefs`, themed with the already-resolved `theme`.
    pub fn from_prefs(prefs: &PreferenceStore, theme: ThemeKind) -> Self {
        let font = prefs.font();
        Self {
            theme,
            body_size: font.body_size,
            code_size: font.code_size,
            code_family: font.code_family,
            code_bold: font.code_weight.eq_ignore_ascii_case("bold"),
            inline_code_color: font.code_inline_color.as_deref().and_then(parse_hex_color),
            block_code_color: font.code_block_color.as_deref().and_then(parse_hex_color),
        }
    }
}

/// Output of a render: styled lines ready for a `Paragraph`.
#[derive(Debug, Clone, Default)]
pub struct RenderedDocument {
    pub lines: Vec<Line<'static>>,
}

impl RenderedDocument {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Plain text of line `idx`.
    #[cfg(test)]
    pub fn line_text(&self, idx: usize) -> String {
        self.lines
            .get(idx)
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .unwrap_or_default()
    }
}

pub trait Renderer {
    fn render(&self, source: &str, params: &RenderParams) -> RenderedDocument;
}

/// Renderer that parses with pulldown-cmark and highlights fenced code with
/// syntect.
pub struct SyntectRenderer {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
}

impl Default for SyntectRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntectRenderer {
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            themes: ThemeSet::load_defaults(),
        }
    }

    fn code_theme(&self, kind: ThemeKind) -> Option<&Theme> {
        let name = if kind.is_dark() {
            DARK_CODE_THEME
        } else {
            LIGHT_CODE_THEME
        };
        self.themes
            .themes
            .get(name)
            .or_else(|| self.themes.themes.values().next())
    }

    fn code_lines(&self, lang: &str, code: &str, params: &RenderParams, bg: Color) -> Vec<Line<'static>> {
        let mut base = Style::default().bg(bg);
        if params.code_bold {
            base = base.add_modifier(Modifier::BOLD);
        }

        let theme = self.code_theme(params.theme);
        let syntax = self
            .syntaxes
            .find_syntax_by_token(lang)
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text());

        let (Some(theme), None) = (theme, params.block_code_color) else {
            let fg = params.block_code_color;
            return code
                .lines()
                .map(|line| {
                    let style = fg.map_or(base, |c| base.fg(c));
                    Line::from(Span::styled(format!("  {line}"), style))
                })
                .collect();
        };

        let mut highlighter = HighlightLines::new(syntax, theme);
        LinesWithEndings::from(code)
            .map(|line| {
                let mut spans = vec![Span::styled("  ", base)];
                match highlighter.highlight_line(line, &self.syntaxes) {
                    Ok(ranges) => {
                        for (style, text) in ranges {
                            let text = text.trim_end_matches(['\n', '\r']);
                            if text.is_empty() {
                                continue;
                            }
                            let fg = Color::Rgb(style.foreground.r, style.foreground.g, style.foreground.b);
                            spans.push(Span::styled(text.to_string(), base.fg(fg)));
                        }
                    }
                    Err(_) => {
                        spans.push(Span::styled(line.trim_end().to_string(), base));
                    }
                }
                Line::from(spans)
            })
            .collect()
    }
}

impl Renderer for SyntectRenderer {
    fn render(&self, source: &str, params: &RenderParams) -> RenderedDocument {
        let palette = ThemeColors::for_kind(params.theme);
        let mut w = Writer::new(self, &palette, params);
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;

        for event in Parser::new_ext(source, options) {
            match event {
                Event::Start(tag) => w.start(tag),
                Event::End(tag) => w.end(tag),
                Event::Text(text) => w.text(&text),
                Event::Code(code) => w.inline_code(&code),
                Event::Html(html) | Event::InlineHtml(html) => {
                    let style = Style::default().fg(palette.dim_fg);
                    for (i, part) in html.trim_end().split('\n').enumerate() {
                        if i > 0 {
                            w.flush();
                        }
                        w.spans.push(Span::styled(part.to_string(), style));
                    }
                }
                Event::SoftBreak => w.text(" "),
                Event::HardBreak => w.flush(),
                Event::Rule => {
                    w.flush();
                    w.lines
                        .push(Line::from(Span::styled("─".repeat(40), Style::default().fg(palette.dim_fg))));
                    w.blank();
                }
                Event::TaskListMarker(done) => {
                    w.spans.push(Span::raw(if done { "[x] " } else { "[ ] " }));
                }
                _ => {}
            }
        }
        w.finish()
    }
}

/// Accumulates styled lines while walking parser events.
struct Writer<'a> {
    renderer: &'a SyntectRenderer,
    palette: &'a ThemeColors,
    params: &'a RenderParams,
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    /// Next number for ordered lists, `None` for bullets.
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    /// Language and buffered text of the open code block.
    code: Option<(String, String)>,
}

impl<'a> Writer<'a> {
    fn new(renderer: &'a SyntectRenderer, palette: &'a ThemeColors, params: &'a RenderParams) -> Self {
        Self {
            renderer,
            palette,
            params,
            lines: Vec::new(),
            spans: Vec::new(),
            styles: vec![Style::default().fg(palette.preview_fg)],
            lists: Vec::new(),
            quote_depth: 0,
            code: None,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, f: impl FnOnce(Style) -> Style) {
        let next = f(self.style());
        self.styles.push(next);
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn flush(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let mut spans = Vec::with_capacity(self.spans.len() + 1);
        if self.quote_depth > 0 {
            spans.push(Span::styled(
                "│ ".repeat(self.quote_depth),
                Style::default().fg(self.palette.quote_fg),
            ));
        }
        spans.append(&mut self.spans);
        self.lines.push(Line::from(spans));
    }

    /// Separate blocks with a single empty line.
    fn blank(&mut self) {
        self.flush();
        if self.lines.last().is_some_and(|l| !l.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn text(&mut self, text: &str) {
        if let Some((_, buf)) = self.code.as_mut() {
            buf.push_str(text);
            return;
        }
        let style = self.style();
        self.spans.push(Span::styled(text.to_string(), style));
    }

    fn inline_code(&mut self, code: &str) {
        let mut style = Style::default().bg(self.palette.code_bg);
        style = match self.params.inline_code_color {
            Some(color) => style.fg(color),
            None => style.fg(self.palette.accent_fg),
        };
        if self.params.code_bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        self.spans.push(Span::styled(code.to_string(), style));
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush();
                let heading_fg = self.palette.heading_fg;
                self.push_style(|s| s.fg(heading_fg).add_modifier(Modifier::BOLD));
                let marker = format!("{} ", "#".repeat(level as usize));
                let style = self.style();
                self.spans.push(Span::styled(marker, style));
            }
            Tag::BlockQuote { .. } => {
                self.flush();
                self.quote_depth += 1;
                let quote_fg = self.palette.quote_fg;
                self.push_style(|s| s.fg(quote_fg).add_modifier(Modifier::ITALIC));
            }
            Tag::CodeBlock(kind) => {
                self.flush();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().unwrap_or("").to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.code = Some((lang, String::new()));
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let m = format!("{n}. ");
                        *n += 1;
                        m
                    }
                    _ => "• ".to_string(),
                };
                self.spans.push(Span::styled(
                    format!("{indent}{marker}"),
                    Style::default().fg(self.palette.accent_fg),
                ));
            }
            Tag::Emphasis => self.push_style(|s| s.add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(|s| s.add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => self.push_style(|s| s.add_modifier(Modifier::CROSSED_OUT)),
            Tag::Link { .. } => {
                let accent = self.palette.accent_fg;
                self.push_style(|s| s.fg(accent).add_modifier(Modifier::UNDERLINED));
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if self.lists.is_empty() {
                    self.blank();
                } else {
                    self.flush();
                }
            }
            TagEnd::Heading(_) => {
                self.pop_style();
                self.blank();
            }
            TagEnd::BlockQuote { .. } => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.pop_style();
                self.blank();
            }
            TagEnd::CodeBlock => {
                if let Some((lang, buf)) = self.code.take() {
                    let bg = self.palette.code_bg;
                    let code = self.renderer.code_lines(&lang, &buf, self.params, bg);
                    self.lines.extend(code);
                }
                self.blank();
            }
            TagEnd::List { .. } => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Item => self.flush(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                self.pop_style()
            }
            TagEnd::TableCell => self.spans.push(Span::raw(" │ ")),
            TagEnd::TableHead | TagEnd::TableRow => self.flush(),
            TagEnd::Table => self.blank(),
            _ => {}
        }
    }

    fn finish(mut self) -> RenderedDocument {
        self.flush();
        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        RenderedDocument { lines: self.lines }
    }
}
