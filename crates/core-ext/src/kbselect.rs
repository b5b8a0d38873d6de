//! Keyboard-select skeleton: a HIGH-priority input grab with a
//! crosshair overlay.
//!
//! While active it consumes every key, moves a selection cursor with
//! vi keys or arrows, and asks the embedder to tint the selected row
//! and column. The search / copy machinery of a full implementation
//! lives above the core; this module carries the input-grab and
//! overlay contract.

use core_config::{Config, KbSelectConfig, KeyChord};
use core_events::{KeyPress, keysyms};
use core_module::{
    Disposition, InputHandler, Module, ModuleCtx, OverlayPainter, Priority, RenderOverlay,
};
use tracing::debug;

pub struct KbSelectModule {
    config: KbSelectConfig,
    trigger: KeyChord,
    active: bool,
    pos: (usize, usize),
    /// Grid size seen at activation, for overlay clamping.
    grid: (usize, usize),
}

impl Default for KbSelectModule {
    fn default() -> Self {
        KbSelectModule::new()
    }
}

impl KbSelectModule {
    pub fn new() -> KbSelectModule {
        let config = KbSelectConfig::default();
        KbSelectModule {
            trigger: config.trigger(),
            config,
            active: false,
            pos: (0, 0),
            grid: (0, 0),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Selection cursor, valid while active.
    pub fn position(&self) -> (usize, usize) {
        self.pos
    }

    fn step(&mut self, dx: isize, dy: isize) {
        let (cols, rows) = self.grid;
        let x = self.pos.0.saturating_add_signed(dx).min(cols.saturating_sub(1));
        let y = self.pos.1.saturating_add_signed(dy).min(rows.saturating_sub(1));
        self.pos = (x, y);
    }
}

impl Module for KbSelectModule {
    fn name(&self) -> &'static str {
        "kbselect"
    }

    fn priority(&self) -> Priority {
        Priority::HIGH
    }

    fn configure(&mut self, config: &Config) {
        self.config = config.kbselect.clone();
        self.trigger = self.config.trigger();
    }

    fn deactivate(&mut self) {
        self.active = false;
    }

    fn as_input_handler(&mut self) -> Option<&mut dyn InputHandler> {
        Some(self)
    }

    fn as_overlay(&mut self) -> Option<&mut dyn RenderOverlay> {
        Some(self)
    }
}

impl InputHandler for KbSelectModule {
    fn handle_key(&mut self, key: &KeyPress, ctx: &mut ModuleCtx<'_>) -> Disposition {
        if !self.active {
            if self.trigger.matches(key.keysym, key.mods) {
                let cursor = ctx.screen.cursor();
                self.pos = (cursor.x, cursor.y);
                self.grid = (ctx.screen.cols(), ctx.screen.rows());
                self.active = true;
                debug!(target: "module.kbselect", "select mode on");
                ctx.signals.emit_contents_changed();
                return Disposition::Consumed;
            }
            return Disposition::Pass;
        }

        match key.keysym {
            keysyms::ESCAPE | keysyms::RETURN => {
                self.active = false;
                debug!(target: "module.kbselect", "select mode off");
            }
            keysyms::LEFT | keysyms::LOWER_H => self.step(-1, 0),
            keysyms::DOWN | keysyms::LOWER_J => self.step(0, 1),
            keysyms::UP | keysyms::LOWER_K => self.step(0, -1),
            keysyms::RIGHT | keysyms::LOWER_L => self.step(1, 0),
            other => {
                debug!(target: "module.kbselect", keysym = other, "ignored while selecting");
            }
        }
        ctx.signals.emit_contents_changed();
        // active mode swallows everything, keys must not leak to the pty
        Disposition::Consumed
    }
}

impl RenderOverlay for KbSelectModule {
    fn render_overlay(&mut self, painter: &mut dyn OverlayPainter, width: u16, height: u16) {
        if !self.active || !self.config.show_crosshair {
            return;
        }
        let (x, y) = self.pos;
        let alpha = self.config.highlight_alpha;
        painter.fill_rect(0, y as u16, width, 1, alpha);
        painter.fill_rect(x as u16, 0, 1, height, alpha);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_color::ColorScheme;
    use core_events::{ModMask, Signals};
    use core_screen::Screen;

    fn press(m: &mut KbSelectModule, keysym: u32, mods: ModMask) -> Disposition {
        let mut screen = Screen::new(10, 5);
        screen.move_to(3, 2);
        let mut colors = ColorScheme::new();
        let mut signals = Signals::new();
        let mut ctx = ModuleCtx {
            screen: &mut screen,
            colors: &mut colors,
            signals: &mut signals,
        };
        m.handle_key(&KeyPress::new(keysym, 0, mods), &mut ctx)
    }

    #[derive(Default)]
    struct RecordingPainter {
        rects: Vec<(u16, u16, u16, u16, u8)>,
    }

    impl OverlayPainter for RecordingPainter {
        fn fill_rect(&mut self, x: u16, y: u16, w: u16, h: u16, alpha: u8) {
            self.rects.push((x, y, w, h, alpha));
        }
        fn put_rune(&mut self, _x: u16, _y: u16, _rune: char) {}
    }

    #[test]
    fn trigger_activates_at_cursor() {
        let mut m = KbSelectModule::new();
        assert_eq!(press(&mut m, 'x' as u32, ModMask::empty()), Disposition::Pass);
        assert!(!m.is_active());
        let d = press(&mut m, keysyms::ESCAPE, ModMask::CONTROL | ModMask::SHIFT);
        assert_eq!(d, Disposition::Consumed);
        assert!(m.is_active());
        assert_eq!(m.position(), (3, 2));
    }

    #[test]
    fn movement_and_exit() {
        let mut m = KbSelectModule::new();
        press(&mut m, keysyms::ESCAPE, ModMask::CONTROL | ModMask::SHIFT);
        press(&mut m, keysyms::LOWER_L, ModMask::empty());
        press(&mut m, keysyms::DOWN, ModMask::empty());
        assert_eq!(m.position(), (4, 3));
        // clamped at the grid edge
        for _ in 0..20 {
            press(&mut m, keysyms::LOWER_J, ModMask::empty());
        }
        assert_eq!(m.position().1, 4);
        // plain keys are swallowed while active
        assert_eq!(press(&mut m, 'q' as u32, ModMask::empty()), Disposition::Consumed);
        press(&mut m, keysyms::ESCAPE, ModMask::empty());
        assert!(!m.is_active());
    }

    #[test]
    fn overlay_paints_crosshair_only_when_active() {
        let mut m = KbSelectModule::new();
        let mut painter = RecordingPainter::default();
        m.render_overlay(&mut painter, 10, 5);
        assert!(painter.rects.is_empty());

        press(&mut m, keysyms::ESCAPE, ModMask::CONTROL | ModMask::SHIFT);
        m.render_overlay(&mut painter, 10, 5);
        assert_eq!(
            painter.rects,
            vec![(0, 2, 10, 1, 100), (3, 0, 1, 5, 100)]
        );
    }

    #[test]
    fn crosshair_can_be_disabled() {
        let mut m = KbSelectModule::new();
        m.configure(&Config::from_toml("[kbselect]\nshow_crosshair = false"));
        press(&mut m, keysyms::ESCAPE, ModMask::CONTROL | ModMask::SHIFT);
        let mut painter = RecordingPainter::default();
        m.render_overlay(&mut painter, 10, 5);
        assert!(painter.rects.is_empty());
    }
}
