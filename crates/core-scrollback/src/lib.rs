//! Scrollback: the bounded ring of evicted rows plus the module that
//! owns it.
//!
//! The module receives rows through the eviction capability, serves
//! the scroll keys, and exposes the ring to peers and the public API
//! through the `ScrollbackAccess` capability. Other modules reach it
//! via the registry's trait-keyed lookup, never by symbol.

mod ring;

pub use ring::{MAX_CAPACITY, MIN_CAPACITY, SavedLine, ScrollbackRing};

use core_cell::{Glyph, Line};
use core_config::Config;
use core_events::{KeyPress, ModMask, keysyms};
use core_module::{
    Disposition, EvictionSink, InputHandler, Module, ModuleCtx, ScrollbackAccess,
};
use tracing::trace;

pub struct ScrollbackModule {
    ring: ScrollbackRing,
    /// Rows scrolled into history; 0 is live.
    offset: usize,
    wheel_step: usize,
}

impl Default for ScrollbackModule {
    fn default() -> Self {
        ScrollbackModule::new()
    }
}

impl ScrollbackModule {
    pub fn new() -> ScrollbackModule {
        let defaults = Config::default();
        ScrollbackModule {
            ring: ScrollbackRing::new(defaults.scrollback.lines as usize),
            offset: 0,
            wheel_step: defaults.scrollback.mouse_scroll_lines as usize,
        }
    }

    /// Clamp, apply, and report whether the view moved.
    fn scroll_to(&mut self, offset: usize) -> bool {
        let offset = offset.min(self.ring.count());
        let changed = offset != self.offset;
        self.offset = offset;
        changed
    }

    fn scroll_by(&mut self, delta: isize) -> bool {
        let target = self.offset.saturating_add_signed(delta);
        self.scroll_to(target)
    }
}

impl Module for ScrollbackModule {
    fn name(&self) -> &'static str {
        "scrollback"
    }

    fn configure(&mut self, config: &Config) {
        self.ring.set_capacity(config.scrollback.lines as usize);
        self.wheel_step = config.scrollback.mouse_scroll_lines as usize;
        self.offset = self.offset.min(self.ring.count());
    }

    fn as_input_handler(&mut self) -> Option<&mut dyn InputHandler> {
        Some(self)
    }

    fn as_eviction_sink(&mut self) -> Option<&mut dyn EvictionSink> {
        Some(self)
    }

    fn as_scrollback(&mut self) -> Option<&mut dyn ScrollbackAccess> {
        Some(self)
    }
}

impl EvictionSink for ScrollbackModule {
    fn line_evicted(&mut self, line: &Line, _cols: usize) {
        self.ring.push(line);
        // Keep the view anchored while the user is back in history.
        if self.offset > 0 {
            self.offset = (self.offset + 1).min(self.ring.count());
        }
    }
}

impl InputHandler for ScrollbackModule {
    fn handle_key(&mut self, key: &KeyPress, ctx: &mut ModuleCtx<'_>) -> Disposition {
        // History is a primary-screen concept; full-screen programs on
        // the alternate buffer get their keys untouched.
        if ctx.screen.is_altscreen() {
            return Disposition::Pass;
        }
        let page = ctx.screen.rows();
        let shifted = key.mods == ModMask::SHIFT;
        let changed = match key.keysym {
            keysyms::PAGE_UP if shifted => self.scroll_by(page as isize),
            keysyms::PAGE_DOWN if shifted => self.scroll_by(-(page as isize)),
            keysyms::HOME if shifted => self.scroll_to(self.ring.count()),
            keysyms::END if shifted => self.scroll_to(0),
            keysyms::WHEEL_UP => self.scroll_by(self.wheel_step as isize),
            keysyms::WHEEL_DOWN => self.scroll_by(-(self.wheel_step as isize)),
            _ => return Disposition::Pass,
        };
        if changed {
            trace!(target: "module.scrollback", offset = self.offset, "view moved");
            ctx.signals.emit_contents_changed();
        }
        Disposition::Consumed
    }
}

impl ScrollbackAccess for ScrollbackModule {
    fn count(&self) -> usize {
        self.ring.count()
    }

    fn get(&self, index: usize) -> Option<&[Glyph]> {
        self.ring.get(index).map(SavedLine::cells)
    }

    fn offset(&self) -> usize {
        self.offset
    }

    fn set_offset(&mut self, offset: usize) -> bool {
        self.scroll_to(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_color::ColorScheme;
    use core_events::Signals;
    use core_screen::Screen;
    use std::cell::Cell;
    use std::rc::Rc;

    fn evict_lines(module: &mut ScrollbackModule, n: usize, cols: usize) {
        for i in 0..n {
            let mut line = Line::new(cols);
            let tag = char::from_u32('a' as u32 + (i % 26) as u32).unwrap();
            line.set_glyph(
                0,
                Glyph::new(
                    tag,
                    core_cell::GlyphAttr::empty(),
                    core_cell::Color::DEFAULT_FG,
                    core_cell::Color::DEFAULT_BG,
                ),
            );
            module.line_evicted(&line, cols);
        }
    }

    fn key(module: &mut ScrollbackModule, keysym: u32, mods: ModMask) -> (Disposition, bool) {
        let mut screen = Screen::new(10, 4);
        let mut colors = ColorScheme::new();
        let mut signals = Signals::new();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        signals.connect_contents_changed(move || flag.set(true));
        let mut ctx = ModuleCtx {
            screen: &mut screen,
            colors: &mut colors,
            signals: &mut signals,
        };
        let disposition = module.handle_key(&KeyPress::new(keysym, 0, mods), &mut ctx);
        (disposition, fired.get())
    }

    #[test]
    fn eviction_fills_ring_and_access_reads_it() {
        let mut m = ScrollbackModule::new();
        evict_lines(&mut m, 3, 8);
        assert_eq!(ScrollbackAccess::count(&m), 3);
        assert_eq!(m.get(0).unwrap()[0].rune, 'c');
        assert_eq!(m.get(2).unwrap()[0].rune, 'a');
        assert!(m.get(3).is_none());
    }

    #[test]
    fn page_keys_move_the_view_and_emit() {
        let mut m = ScrollbackModule::new();
        evict_lines(&mut m, 20, 8);
        let (d, fired) = key(&mut m, keysyms::PAGE_UP, ModMask::SHIFT);
        assert_eq!(d, Disposition::Consumed);
        assert!(fired);
        assert_eq!(m.offset(), 4); // page == screen rows

        let (d, fired) = key(&mut m, keysyms::END, ModMask::SHIFT);
        assert_eq!(d, Disposition::Consumed);
        assert!(fired);
        assert_eq!(m.offset(), 0);

        // no movement, no signal
        let (d, fired) = key(&mut m, keysyms::PAGE_DOWN, ModMask::SHIFT);
        assert_eq!(d, Disposition::Consumed);
        assert!(!fired);
    }

    #[test]
    fn unrelated_keys_pass() {
        let mut m = ScrollbackModule::new();
        let (d, fired) = key(&mut m, keysyms::PAGE_UP, ModMask::CONTROL);
        assert_eq!(d, Disposition::Pass);
        assert!(!fired);
    }

    #[test]
    fn wheel_uses_configured_step() {
        let mut m = ScrollbackModule::new();
        m.configure(&Config::from_toml("[scrollback]\nmouse_scroll_lines = 5"));
        evict_lines(&mut m, 20, 8);
        let (_, _) = key(&mut m, keysyms::WHEEL_UP, ModMask::empty());
        assert_eq!(m.offset(), 5);
        let (_, _) = key(&mut m, keysyms::WHEEL_DOWN, ModMask::empty());
        assert_eq!(m.offset(), 0);
    }

    #[test]
    fn offset_clamps_to_history_and_anchors_on_eviction() {
        let mut m = ScrollbackModule::new();
        evict_lines(&mut m, 5, 8);
        assert!(m.set_offset(999));
        assert_eq!(m.offset(), 5);
        // a new eviction keeps the view anchored
        evict_lines(&mut m, 1, 8);
        assert_eq!(m.offset(), 6);
        assert!(!m.set_offset(6));
    }

    #[test]
    fn altscreen_passes_keys_through() {
        let mut m = ScrollbackModule::new();
        evict_lines(&mut m, 10, 8);
        let mut screen = Screen::new(10, 4);
        screen.activate_alternate();
        let mut colors = ColorScheme::new();
        let mut signals = Signals::new();
        let mut ctx = ModuleCtx {
            screen: &mut screen,
            colors: &mut colors,
            signals: &mut signals,
        };
        let d = m.handle_key(
            &KeyPress::new(keysyms::PAGE_UP, 0, ModMask::SHIFT),
            &mut ctx,
        );
        assert_eq!(d, Disposition::Pass);
    }
}
