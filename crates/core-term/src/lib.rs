//! The public terminal: one object owning the screen, the color
//! scheme, the parser, the signals, and the module registry.
//!
//! Everything is single-threaded and synchronous. `write` applies
//! bytes in order; every signal raised by a `write` fires during that
//! call, before it returns. Observers get payloads by reference and
//! read terminal state after the call; the borrow checker makes the
//! reentrant-write case unrepresentable rather than undefined.
//!
//! Front-ends and tools (renderer, webview, MCP bridge) subscribe to
//! signals and use the query surface; they never mutate grid state
//! behind the API's back.

use core_cell::{Glyph, Line};
use core_color::ColorScheme;
use core_config::Config;
use core_events::{KeyPress, ModMask, Signals};
use core_ext::{DynColorsModule, KbSelectModule, Osc52Module, PipeModule, UrlOpenModule};
use core_module::{Disposition, Module, ModuleCtx, ModuleRegistry, OverlayPainter, Transform};
use core_parser::{Host, TermMode, Vt};
use core_screen::{Cursor, Screen};
use core_scrollback::ScrollbackModule;
use thiserror::Error;
use tracing::debug;

pub use core_parser::TermMode as Mode;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TermError {
    #[error("terminal size must be nonzero, got {cols}x{rows}")]
    BadSize { cols: usize, rows: usize },
}

pub struct Terminal {
    screen: Screen,
    colors: ColorScheme,
    signals: Signals,
    modules: ModuleRegistry,
    vt: Vt,
}

impl Terminal {
    pub fn new(cols: usize, rows: usize) -> Result<Terminal, TermError> {
        Terminal::with_config(cols, rows, &Config::default())
    }

    pub fn with_config(cols: usize, rows: usize, config: &Config) -> Result<Terminal, TermError> {
        if cols == 0 || rows == 0 {
            return Err(TermError::BadSize { cols, rows });
        }
        Ok(Terminal {
            screen: Screen::new(cols, rows),
            colors: ColorScheme::new(),
            signals: Signals::new(),
            modules: ModuleRegistry::new(),
            vt: Vt::new(&config.parser),
        })
    }

    /// Load, configure, and activate the stock module set.
    pub fn load_default_modules(&mut self, config: &Config) {
        self.load_module(Box::new(ScrollbackModule::new()));
        self.load_module(Box::new(Osc52Module::new()));
        self.load_module(Box::new(DynColorsModule::new()));
        self.load_module(Box::new(UrlOpenModule::new()));
        self.load_module(Box::new(PipeModule::new()));
        self.load_module(Box::new(KbSelectModule::new()));
        self.configure_modules(config);
        self.modules.activate_all();
    }

    pub fn load_module(&mut self, module: Box<dyn Module>) {
        self.modules.load(module);
    }

    /// Runs on first load and again on config reload.
    pub fn configure_modules(&mut self, config: &Config) {
        self.modules.configure_all(config);
    }

    pub fn activate_modules(&mut self) {
        self.modules.activate_all();
    }

    pub fn shutdown_modules(&mut self) {
        self.modules.deactivate_all();
    }

    pub fn modules_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.modules
    }

    // ---------------------------------------------------------------
    // Byte input and sizing
    // ---------------------------------------------------------------

    /// Feed PTY output. Chunks may split escape or UTF-8 sequences
    /// anywhere; decoding state carries across calls.
    pub fn write(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let mut host = Host {
            screen: &mut self.screen,
            colors: &mut self.colors,
            signals: &mut self.signals,
            modules: &mut self.modules,
        };
        self.vt.advance(&mut host, bytes);
        self.signals.emit_contents_changed();
    }

    pub fn resize(&mut self, cols: usize, rows: usize) {
        let cols = cols.max(1);
        let rows = rows.max(1);
        if (cols, rows) == self.get_size() {
            return;
        }
        debug!(target: "term", cols, rows, "resize");
        self.screen.resize(cols, rows);
        self.signals.emit_resize(cols as u16, rows as u16);
        self.signals.emit_contents_changed();
    }

    // ---------------------------------------------------------------
    // Key input
    // ---------------------------------------------------------------

    /// Offer a key event to modules, highest priority first; lock
    /// modifiers are stripped before matching. Returns true when a
    /// module consumed it (the front-end then skips PTY encoding).
    pub fn key_press(&mut self, keysym: u32, keycode: u32, mods: ModMask) -> bool {
        let key = KeyPress::new(keysym, keycode, mods);
        let mut ctx = ModuleCtx {
            screen: &mut self.screen,
            colors: &mut self.colors,
            signals: &mut self.signals,
        };
        self.modules.dispatch_key(&key, &mut ctx) == Disposition::Consumed
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub fn get_size(&self) -> (usize, usize) {
        (self.screen.cols(), self.screen.rows())
    }

    pub fn get_cursor(&self) -> &Cursor {
        self.screen.cursor()
    }

    pub fn get_line(&self, y: usize) -> Option<&Line> {
        self.screen.line(y)
    }

    /// Never fails for in-range coordinates; out-of-range resolves to
    /// the empty glyph.
    pub fn get_glyph(&self, x: usize, y: usize) -> Glyph {
        self.screen.get_glyph(x, y)
    }

    pub fn get_title(&self) -> &str {
        self.vt.title()
    }

    pub fn get_icon_title(&self) -> &str {
        self.vt.icon_title()
    }

    pub fn get_scroll_region(&self) -> (usize, usize) {
        self.screen.scroll_region()
    }

    pub fn is_altscreen(&self) -> bool {
        self.screen.is_altscreen()
    }

    pub fn has_mode(&self, mode: TermMode) -> bool {
        self.vt.modes().contains(mode)
    }

    pub fn colors(&self) -> &ColorScheme {
        &self.colors
    }

    /// Visible grid as text, one string per row, wide placeholders
    /// skipped.
    pub fn screen_text(&self) -> Vec<String> {
        (0..self.screen.rows())
            .map(|y| self.screen.line(y).map(Line::to_string).unwrap_or_default())
            .collect()
    }

    /// Logical lines of rows `[y1, y2]`: soft-wrapped continuations
    /// are joined with the row they continue, trailing spaces are
    /// trimmed per row, and rows that are entirely blank stay as
    /// empty entries.
    pub fn extract_lines(&self, y1: usize, y2: usize) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let last = y2.min(self.screen.rows().saturating_sub(1));
        for y in y1..=last {
            let Some(line) = self.screen.line(y) else {
                break;
            };
            let text = line.to_string_trimmed();
            match out.last_mut() {
                Some(prev) if y > y1 && line.is_wrapped() => prev.push_str(&text),
                _ => out.push(text),
            }
        }
        out
    }

    // ---------------------------------------------------------------
    // Mutation helpers for embedders
    // ---------------------------------------------------------------

    pub fn mark_dirty(&mut self, y: usize) {
        self.screen.mark_dirty(y);
    }

    pub fn set_cursor_pos(&mut self, x: usize, y: usize) {
        self.screen.move_to(x, y);
    }

    // ---------------------------------------------------------------
    // Module-facing conveniences
    // ---------------------------------------------------------------

    /// Scrollback history depth, 0 without a scrollback module.
    pub fn scrollback_count(&mut self) -> usize {
        self.modules.scrollback().map_or(0, |s| s.count())
    }

    pub fn scroll_offset(&mut self) -> usize {
        self.modules.scrollback().map_or(0, |s| s.offset())
    }

    /// Move the history view; emits `contents-changed` on change.
    /// No-op without a scrollback module.
    pub fn set_scroll_offset(&mut self, offset: usize) {
        let changed = self
            .modules
            .scrollback()
            .map_or(false, |s| s.set_offset(offset));
        if changed {
            self.signals.emit_contents_changed();
        }
    }

    /// Ask the URL-handler module to open a link.
    pub fn open_url(&mut self, url: &str) -> bool {
        self.modules.dispatch_open_url(url)
    }

    /// Pipe bytes to an external command through the pipe module.
    pub fn pipe_data(&mut self, command: &str, bytes: &[u8]) -> bool {
        self.modules.dispatch_pipe(command, bytes)
    }

    /// Let overlay modules paint on top of a finished frame.
    pub fn render_overlays(&mut self, painter: &mut dyn OverlayPainter) {
        let (cols, rows) = self.get_size();
        self.modules
            .render_overlays(painter, cols as u16, rows as u16);
    }

    /// Per-cell transformer hook for the renderer's paint loop.
    pub fn transform_glyph(
        &mut self,
        rune: char,
        painter: &mut dyn OverlayPainter,
        x: u16,
        y: u16,
        cell_w: u16,
        cell_h: u16,
    ) -> Transform {
        self.modules
            .transform_glyph(rune, painter, x, y, cell_w, cell_h)
    }

    // ---------------------------------------------------------------
    // Signal subscriptions
    // ---------------------------------------------------------------

    pub fn connect_contents_changed(&mut self, f: impl FnMut() + 'static) {
        self.signals.connect_contents_changed(f);
    }

    pub fn connect_resize(&mut self, f: impl FnMut(u16, u16) + 'static) {
        self.signals.connect_resize(f);
    }

    pub fn connect_title_changed(&mut self, f: impl FnMut(&str) + 'static) {
        self.signals.connect_title_changed(f);
    }

    pub fn connect_bell(&mut self, f: impl FnMut() + 'static) {
        self.signals.connect_bell(f);
    }

    pub fn connect_response(&mut self, f: impl FnMut(&[u8]) + 'static) {
        self.signals.connect_response(f);
    }

    pub fn connect_line_scrolled_out(&mut self, f: impl FnMut(&Line, usize) + 'static) {
        self.signals.connect_line_scrolled_out(f);
    }
}

impl std::fmt::Debug for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (cols, rows) = self.get_size();
        f.debug_struct("Terminal")
            .field("size", &(cols, rows))
            .field("altscreen", &self.is_altscreen())
            .field("modules", &self.modules)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_is_rejected() {
        assert_eq!(
            Terminal::new(0, 24).unwrap_err(),
            TermError::BadSize { cols: 0, rows: 24 }
        );
        assert!(Terminal::new(80, 24).is_ok());
    }

    #[test]
    fn write_emits_contents_changed() {
        let mut term = Terminal::new(20, 5).unwrap();
        let count = std::rc::Rc::new(std::cell::Cell::new(0));
        let counter = count.clone();
        term.connect_contents_changed(move || counter.set(counter.get() + 1));
        term.write(b"hello");
        assert_eq!(count.get(), 1);
        term.write(b"");
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn resize_signal_and_idempotence() {
        let mut term = Terminal::new(20, 5).unwrap();
        let sizes = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = sizes.clone();
        term.connect_resize(move |c, r| sink.borrow_mut().push((c, r)));
        term.write(b"abc");
        term.resize(30, 10);
        term.resize(30, 10);
        assert_eq!(*sizes.borrow(), vec![(30, 10)]);
        assert_eq!(term.get_size(), (30, 10));
        assert_eq!(term.get_glyph(0, 0).rune, 'a');
    }

    #[test]
    fn scroll_offset_without_module_is_inert() {
        let mut term = Terminal::new(20, 5).unwrap();
        assert_eq!(term.scrollback_count(), 0);
        term.set_scroll_offset(10);
        assert_eq!(term.scroll_offset(), 0);
        assert!(!term.open_url("https://example.com"));
        assert!(!term.pipe_data("cat", b"x"));
    }
}
