//! Terminal signals and the normalized key-input surface.
//!
//! Signals are explicit per-kind observer lists. Emission is
//! synchronous: observers run on the emitter's thread, during the
//! `write()` (or `resize()`) call that produced the event, before it
//! returns. Observers receive payloads by reference and cannot reach
//! back into the terminal while it is borrowed by the emitting call;
//! reads happen after the call returns.
//!
//! Key events arrive from the windowing front-end as
//! `(keysym, keycode, modifier mask)`. Lock modifiers (Caps, Num) are
//! stripped before any trigger matching.

pub mod keysyms;

use core_cell::Line;

bitflags::bitflags! {
    /// X11-style modifier mask.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ModMask: u16 {
        const SHIFT   = 1 << 0;
        /// Caps lock. Stripped before trigger matching.
        const LOCK    = 1 << 1;
        const CONTROL = 1 << 2;
        /// Alt.
        const MOD1    = 1 << 3;
        /// Num lock. Stripped before trigger matching.
        const MOD2    = 1 << 4;
        const MOD3    = 1 << 5;
        /// Super.
        const MOD4    = 1 << 6;
        const MOD5    = 1 << 7;
    }
}

impl ModMask {
    /// Remove lock bits that must not participate in matching.
    pub fn strip_locks(self) -> ModMask {
        self - (ModMask::LOCK | ModMask::MOD2)
    }
}

/// A normalized key event as delivered to module input handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyPress {
    pub keysym: u32,
    pub keycode: u32,
    pub mods: ModMask,
}

impl KeyPress {
    pub fn new(keysym: u32, keycode: u32, mods: ModMask) -> KeyPress {
        KeyPress {
            keysym,
            keycode,
            mods: mods.strip_locks(),
        }
    }
}

type Observer0 = Box<dyn FnMut()>;

/// Observer lists, one per event kind. Connecting is push-only; a
/// disconnected front-end simply drops the whole terminal.
#[derive(Default)]
pub struct Signals {
    contents_changed: Vec<Observer0>,
    resize: Vec<Box<dyn FnMut(u16, u16)>>,
    title_changed: Vec<Box<dyn FnMut(&str)>>,
    bell: Vec<Observer0>,
    response: Vec<Box<dyn FnMut(&[u8])>>,
    line_scrolled_out: Vec<Box<dyn FnMut(&Line, usize)>>,
}

impl Signals {
    pub fn new() -> Signals {
        Signals::default()
    }

    pub fn connect_contents_changed(&mut self, f: impl FnMut() + 'static) {
        self.contents_changed.push(Box::new(f));
    }

    pub fn connect_resize(&mut self, f: impl FnMut(u16, u16) + 'static) {
        self.resize.push(Box::new(f));
    }

    pub fn connect_title_changed(&mut self, f: impl FnMut(&str) + 'static) {
        self.title_changed.push(Box::new(f));
    }

    pub fn connect_bell(&mut self, f: impl FnMut() + 'static) {
        self.bell.push(Box::new(f));
    }

    pub fn connect_response(&mut self, f: impl FnMut(&[u8]) + 'static) {
        self.response.push(Box::new(f));
    }

    pub fn connect_line_scrolled_out(&mut self, f: impl FnMut(&Line, usize) + 'static) {
        self.line_scrolled_out.push(Box::new(f));
    }

    pub fn emit_contents_changed(&mut self) {
        for f in &mut self.contents_changed {
            f();
        }
    }

    pub fn emit_resize(&mut self, cols: u16, rows: u16) {
        tracing::debug!(target: "term.signals", cols, rows, "resize");
        for f in &mut self.resize {
            f(cols, rows);
        }
    }

    pub fn emit_title_changed(&mut self, title: &str) {
        for f in &mut self.title_changed {
            f(title);
        }
    }

    pub fn emit_bell(&mut self) {
        for f in &mut self.bell {
            f();
        }
    }

    /// PTY-bound reply bytes (DA, DSR, color queries). The embedder
    /// forwards these to the PTY write side; the core never writes to
    /// the PTY itself.
    pub fn emit_response(&mut self, bytes: &[u8]) {
        tracing::trace!(target: "term.signals", len = bytes.len(), "response");
        for f in &mut self.response {
            f(bytes);
        }
    }

    /// Fired before an evicted top line is overwritten.
    pub fn emit_line_scrolled_out(&mut self, line: &Line, cols: usize) {
        for f in &mut self.line_scrolled_out {
            f(line, cols);
        }
    }
}

impl std::fmt::Debug for Signals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signals")
            .field("contents_changed", &self.contents_changed.len())
            .field("resize", &self.resize.len())
            .field("title_changed", &self.title_changed.len())
            .field("bell", &self.bell.len())
            .field("response", &self.response.len())
            .field("line_scrolled_out", &self.line_scrolled_out.len())
            .finish()
    }
}
