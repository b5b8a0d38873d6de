//! Cursor, pen, and saved-cursor snapshots.

use core_cell::{Color, Glyph, GlyphAttr};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CursorShape {
    #[default]
    Block,
    Underline,
    Bar,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CursorFlags: u8 {
        const VISIBLE  = 1 << 0;
        /// Deferred-wrap latch: the last column was just written; the
        /// next printable rune wraps before it lands.
        const WRAPNEXT = 1 << 1;
        /// DECOM: addressing is relative to the scroll region.
        const ORIGIN   = 1 << 2;
    }
}

impl Default for CursorFlags {
    fn default() -> Self {
        CursorFlags::VISIBLE
    }
}

/// Current SGR state applied to every written glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pen {
    pub attr: GlyphAttr,
    pub fg: Color,
    pub bg: Color,
}

impl Default for Pen {
    fn default() -> Self {
        Pen {
            attr: GlyphAttr::empty(),
            fg: Color::DEFAULT_FG,
            bg: Color::DEFAULT_BG,
        }
    }
}

impl Pen {
    pub fn reset(&mut self) {
        *self = Pen::default();
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    pub x: usize,
    pub y: usize,
    pub shape: CursorShape,
    pub flags: CursorFlags,
    pub pen: Pen,
    /// Cell currently under the cursor, kept for renderers.
    pub glyph_under: Glyph,
}

impl Cursor {
    pub fn wrap_pending(&self) -> bool {
        self.flags.contains(CursorFlags::WRAPNEXT)
    }

    pub fn clear_wrap(&mut self) {
        self.flags.remove(CursorFlags::WRAPNEXT);
    }

    pub fn origin_mode(&self) -> bool {
        self.flags.contains(CursorFlags::ORIGIN)
    }
}

/// Full snapshot for DECSC / SCOSC. Restoring copies everything back,
/// including the wrap latch; a save/restore pair is a strict no-op.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SavedCursor {
    pub x: usize,
    pub y: usize,
    pub shape: CursorShape,
    pub flags: CursorFlags,
    pub pen: Pen,
    /// Active charset slot at save time (owned by the executor, kept
    /// here so each buffer's saved cursor stays self-contained).
    pub charset: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cursor_is_visible_at_origin() {
        let c = Cursor::default();
        assert_eq!((c.x, c.y), (0, 0));
        assert!(c.flags.contains(CursorFlags::VISIBLE));
        assert!(!c.wrap_pending());
        assert_eq!(c.pen, Pen::default());
    }

    #[test]
    fn pen_reset_restores_defaults() {
        let mut pen = Pen {
            attr: GlyphAttr::BOLD,
            fg: Color::palette(3),
            bg: Color::rgb(1, 2, 3),
        };
        pen.reset();
        assert_eq!(pen, Pen::default());
    }
}
