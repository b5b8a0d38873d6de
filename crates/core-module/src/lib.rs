//! The module bus: pluggable terminal extensions and their dispatch.
//!
//! A module is a value holding a bundle of optional capability
//! implementations, surfaced through `as_*` accessors on the
//! [`Module`] trait. The registry walks modules in descending
//! priority (stable by registration order within a priority) and
//! routes key events, escape strings, overlay painting, glyph
//! transformation, and line eviction to whichever modules implement
//! the matching capability.
//!
//! Modules never import each other: cross-module integration goes
//! through the registry's trait-keyed service lookup (for example
//! [`ModuleRegistry::scrollback`]). A missing peer degrades
//! gracefully at the call site.
//!
//! Modules borrow the terminal's state only for the duration of one
//! dispatch via [`ModuleCtx`]; the lifetimes forbid retaining any of
//! it across calls.

use core_cell::{Glyph, Line};
use core_color::ColorScheme;
use core_config::Config;
use core_events::{KeyPress, Signals};
use core_screen::Screen;
use tracing::{debug, warn};

/// Outcome of a key or escape dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// The module handled the event; stop the walk.
    Consumed,
    /// Not interested; offer it to the next module.
    Pass,
}

/// Outcome of a glyph transformation hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transform {
    /// The module painted this cell (possibly spanning several);
    /// suppress the default glyph paint.
    Handled,
    Pass,
}

/// The string-sequence family a payload arrived in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscapeKind {
    /// `ESC ]` Operating System Command.
    Osc,
    /// `ESC P` Device Control String.
    Dcs,
    /// `ESC X` Start of String.
    Sos,
    /// `ESC ^` Privacy Message.
    Pm,
    /// `ESC _` Application Program Command.
    Apc,
}

impl EscapeKind {
    /// The introducer byte, matching the C-side convention.
    pub fn introducer(self) -> char {
        match self {
            EscapeKind::Osc => ']',
            EscapeKind::Dcs => 'P',
            EscapeKind::Sos => 'X',
            EscapeKind::Pm => '^',
            EscapeKind::Apc => '_',
        }
    }
}

/// Dispatch priority. Higher runs first; ties break by registration
/// order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(pub i32);

impl Priority {
    pub const LOW: Priority = Priority(-10);
    pub const NORMAL: Priority = Priority(0);
    /// Preempts lower modules for key input (keyboard-select style).
    pub const HIGH: Priority = Priority(10);
}

/// Mutable view of the terminal a module may touch during one
/// dispatch call.
pub struct ModuleCtx<'a> {
    pub screen: &'a mut Screen,
    pub colors: &'a mut ColorScheme,
    pub signals: &'a mut Signals,
}

impl ModuleCtx<'_> {
    /// Reborrow for handing down to a nested dispatch.
    pub fn reborrow(&mut self) -> ModuleCtx<'_> {
        ModuleCtx {
            screen: &mut *self.screen,
            colors: &mut *self.colors,
            signals: &mut *self.signals,
        }
    }
}

pub trait InputHandler {
    fn handle_key(&mut self, key: &KeyPress, ctx: &mut ModuleCtx<'_>) -> Disposition;
}

pub trait EscapeHandler {
    /// Offered the raw payload (semicolons intact, introducer and
    /// terminator stripped). Errors deactivate the module.
    fn handle_escape(
        &mut self,
        kind: EscapeKind,
        payload: &[u8],
        ctx: &mut ModuleCtx<'_>,
    ) -> anyhow::Result<Disposition>;
}

/// Cell-aligned painting surface supplied by the rendering front-end.
/// The core never paints; overlay modules describe what they want in
/// grid coordinates and the embedder rasterizes.
pub trait OverlayPainter {
    /// Tint a rectangle of cells with the given alpha.
    fn fill_rect(&mut self, x: u16, y: u16, w: u16, h: u16, alpha: u8);
    /// Draw a rune on top of a cell.
    fn put_rune(&mut self, x: u16, y: u16, rune: char);
}

pub trait RenderOverlay {
    /// Called after the grid is painted; draws on top.
    fn render_overlay(&mut self, painter: &mut dyn OverlayPainter, width: u16, height: u16);
}

pub trait GlyphTransformer {
    /// Called per cell before the default glyph paint. Implementations
    /// that paint runs spanning several cells must reset their own
    /// skip bookkeeping whenever `y` changes.
    fn transform_glyph(
        &mut self,
        rune: char,
        painter: &mut dyn OverlayPainter,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    ) -> Transform;
}

pub trait PipeData {
    /// Pipe bytes to an external command's stdin (fire and forget).
    fn pipe_data(&mut self, command: &str, bytes: &[u8]) -> anyhow::Result<()>;
}

pub trait UrlHandler {
    fn open_url(&mut self, url: &str) -> anyhow::Result<()>;
}

/// Receives rows evicted off the top of the primary screen.
pub trait EvictionSink {
    fn line_evicted(&mut self, line: &Line, cols: usize);
}

/// Service surface of the scrollback module, consumed by peers and by
/// the public terminal API.
pub trait ScrollbackAccess {
    /// Lines currently held.
    fn count(&self) -> usize;
    /// `index` 0 is the most recently evicted line.
    fn get(&self, index: usize) -> Option<&[Glyph]>;
    /// Rows scrolled into history; 0 is live.
    fn offset(&self) -> usize;
    /// Clamps into `[0, count]`; returns whether the offset changed
    /// (the caller emits `contents-changed` on change).
    fn set_offset(&mut self, offset: usize) -> bool;
}

/// A loadable terminal extension.
///
/// Lifecycle: `load -> configure -> activate -> (dispatch…) ->
/// deactivate -> unload`. `configure` may run again on a config
/// reload. A failed `activate` (or a dispatch error) leaves the
/// module loaded but inactive: it is skipped by every walk.
pub trait Module {
    fn name(&self) -> &'static str;

    fn priority(&self) -> Priority {
        Priority::NORMAL
    }

    fn configure(&mut self, _config: &Config) {}

    fn activate(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Must release everything acquired since `activate`.
    fn deactivate(&mut self) {}

    fn as_input_handler(&mut self) -> Option<&mut dyn InputHandler> {
        None
    }

    fn as_escape_handler(&mut self) -> Option<&mut dyn EscapeHandler> {
        None
    }

    fn as_overlay(&mut self) -> Option<&mut dyn RenderOverlay> {
        None
    }

    fn as_glyph_transformer(&mut self) -> Option<&mut dyn GlyphTransformer> {
        None
    }

    fn as_pipe(&mut self) -> Option<&mut dyn PipeData> {
        None
    }

    fn as_url_handler(&mut self) -> Option<&mut dyn UrlHandler> {
        None
    }

    fn as_eviction_sink(&mut self) -> Option<&mut dyn EvictionSink> {
        None
    }

    fn as_scrollback(&mut self) -> Option<&mut dyn ScrollbackAccess> {
        None
    }
}

struct Slot {
    module: Box<dyn Module>,
    active: bool,
    order: usize,
}

/// Priority-ordered set of loaded modules.
#[derive(Default)]
pub struct ModuleRegistry {
    slots: Vec<Slot>,
    next_order: usize,
}

impl ModuleRegistry {
    pub fn new() -> ModuleRegistry {
        ModuleRegistry::default()
    }

    /// Load a module. Dispatch order is recomputed: descending
    /// priority, ties by registration order.
    pub fn load(&mut self, module: Box<dyn Module>) {
        debug!(target: "module.bus", name = module.name(), "load");
        self.slots.push(Slot {
            module,
            active: false,
            order: self.next_order,
        });
        self.next_order += 1;
        self.slots
            .sort_by_key(|s| (std::cmp::Reverse(s.module.priority()), s.order));
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn configure_all(&mut self, config: &Config) {
        for slot in &mut self.slots {
            slot.module.configure(config);
        }
    }

    /// Activate everything; a failure leaves that module inactive and
    /// the rest unaffected.
    pub fn activate_all(&mut self) {
        for slot in &mut self.slots {
            match slot.module.activate() {
                Ok(()) => slot.active = true,
                Err(err) => {
                    warn!(
                        target: "module.bus",
                        name = slot.module.name(),
                        %err,
                        "activation failed, module disabled"
                    );
                    slot.active = false;
                }
            }
        }
    }

    pub fn deactivate_all(&mut self) {
        for slot in &mut self.slots {
            if slot.active {
                slot.module.deactivate();
                slot.active = false;
            }
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.slots
            .iter()
            .any(|s| s.active && s.module.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn Module + '_)> {
        match self.slots.iter_mut().find(|s| s.module.name() == name) {
            Some(s) => Some(&mut *s.module),
            None => None,
        }
    }

    /// First module returning `Consumed` stops the walk.
    pub fn dispatch_key(&mut self, key: &KeyPress, ctx: &mut ModuleCtx<'_>) -> Disposition {
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            if let Some(handler) = slot.module.as_input_handler()
                && handler.handle_key(key, &mut ctx.reborrow()) == Disposition::Consumed
            {
                return Disposition::Consumed;
            }
        }
        Disposition::Pass
    }

    /// Offer an escape-string payload down the priority order. A
    /// handler error deactivates that module and the walk continues.
    pub fn dispatch_escape(
        &mut self,
        kind: EscapeKind,
        payload: &[u8],
        ctx: &mut ModuleCtx<'_>,
    ) -> Disposition {
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            let Some(handler) = slot.module.as_escape_handler() else {
                continue;
            };
            match handler.handle_escape(kind, payload, &mut ctx.reborrow()) {
                Ok(Disposition::Consumed) => return Disposition::Consumed,
                Ok(Disposition::Pass) => {}
                Err(err) => {
                    warn!(
                        target: "module.bus",
                        name = slot.module.name(),
                        %err,
                        "escape handler failed, module disabled"
                    );
                    slot.module.deactivate();
                    slot.active = false;
                }
            }
        }
        Disposition::Pass
    }

    /// Fan an evicted row out to every sink.
    pub fn dispatch_eviction(&mut self, line: &Line, cols: usize) {
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            if let Some(sink) = slot.module.as_eviction_sink() {
                sink.line_evicted(line, cols);
            }
        }
    }

    /// All overlays paint, in priority order.
    pub fn render_overlays(&mut self, painter: &mut dyn OverlayPainter, width: u16, height: u16) {
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            if let Some(overlay) = slot.module.as_overlay() {
                overlay.render_overlay(painter, width, height);
            }
        }
    }

    /// First `Handled` suppresses the default paint for this cell.
    pub fn transform_glyph(
        &mut self,
        rune: char,
        painter: &mut dyn OverlayPainter,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    ) -> Transform {
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            if let Some(t) = slot.module.as_glyph_transformer()
                && t.transform_glyph(rune, painter, x, y, width, height) == Transform::Handled
            {
                return Transform::Handled;
            }
        }
        Transform::Pass
    }

    /// Route a URL to the first module that can open one. Returns
    /// whether any module took it.
    pub fn dispatch_open_url(&mut self, url: &str) -> bool {
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            let Some(handler) = slot.module.as_url_handler() else {
                continue;
            };
            if let Err(err) = handler.open_url(url) {
                warn!(
                    target: "module.bus",
                    name = slot.module.name(),
                    %err,
                    "url handler failed, module disabled"
                );
                slot.module.deactivate();
                slot.active = false;
                continue;
            }
            return true;
        }
        false
    }

    /// Route a stdin payload to the first pipe-capable module.
    pub fn dispatch_pipe(&mut self, command: &str, bytes: &[u8]) -> bool {
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            let Some(pipe) = slot.module.as_pipe() else {
                continue;
            };
            if let Err(err) = pipe.pipe_data(command, bytes) {
                // A failed spawn is logged; the module stays usable.
                warn!(
                    target: "module.bus",
                    name = slot.module.name(),
                    command,
                    %err,
                    "pipe spawn failed"
                );
            }
            return true;
        }
        false
    }

    /// Trait-keyed service lookup: the first active module exposing
    /// the scrollback capability.
    pub fn scrollback(&mut self) -> Option<&mut dyn ScrollbackAccess> {
        self.slots
            .iter_mut()
            .filter(|s| s.active)
            .find_map(|s| s.module.as_scrollback())
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        for slot in &self.slots {
            list.entry(&(slot.module.name(), slot.module.priority(), slot.active));
        }
        list.finish()
    }
}
