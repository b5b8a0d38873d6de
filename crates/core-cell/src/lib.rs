//! Cell-level value types shared by the screen buffer, the escape
//! executor, the scrollback ring, and any rendering front-end.
//!
//! The attribute bitfield is deliberately shared between rendering,
//! hashing, and text extraction; callers go through the typed
//! accessors (`is_wide`, `is_dummy`, `has_attrs`) and never touch raw
//! bits. Wide characters occupy two cells: the left one carries the
//! rune plus `WIDE`, the right one is a `WDUMMY` placeholder whose
//! rune is ignored by every reader.

mod line;

pub use line::{Line, LineFlags};

use unicode_width::UnicodeWidthChar;

bitflags::bitflags! {
    /// Per-glyph display attributes. Densely packed so a `Glyph` stays
    /// `Copy` and line snapshots hash quickly.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct GlyphAttr: u16 {
        const BOLD      = 1 << 0;
        const FAINT     = 1 << 1;
        const ITALIC    = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK     = 1 << 4;
        const REVERSE   = 1 << 5;
        const INVISIBLE = 1 << 6;
        const STRUCK    = 1 << 7;
        /// Left cell of a double-width character.
        const WIDE      = 1 << 8;
        /// Right cell of a double-width character; rune is meaningless.
        const WDUMMY    = 1 << 9;
    }
}

/// Tagged 32-bit color value.
///
/// `0..=255` are palette indices, [`Color::DEFAULT_FG`] / [`Color::DEFAULT_BG`]
/// select the scheme defaults, and anything with [`Color::TRUECOLOR`] set
/// carries an inline RGB payload in the low 24 bits. Resolution to
/// concrete RGB lives in `core-color`; this type only encodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    pub const DEFAULT_FG: Color = Color(256);
    pub const DEFAULT_BG: Color = Color(257);
    /// Tag bit marking an inline RGB payload.
    pub const TRUECOLOR: u32 = 1 << 24;

    /// Palette entry 0..=255.
    pub const fn palette(idx: u8) -> Color {
        Color(idx as u32)
    }

    /// Inline 24-bit RGB, bypassing the palette.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color(Self::TRUECOLOR | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub const fn is_truecolor(self) -> bool {
        self.0 & Self::TRUECOLOR != 0
    }

    /// Inline RGB payload, if this is a truecolor value.
    pub const fn truecolor_rgb(self) -> Option<(u8, u8, u8)> {
        if self.is_truecolor() {
            Some((
                ((self.0 >> 16) & 0xff) as u8,
                ((self.0 >> 8) & 0xff) as u8,
                (self.0 & 0xff) as u8,
            ))
        } else {
            None
        }
    }

    /// Palette or default index (0..=257), if not truecolor.
    pub const fn index(self) -> Option<u16> {
        if self.is_truecolor() {
            None
        } else {
            Some(self.0 as u16)
        }
    }
}

/// One cell of the grid: a rune plus its attributes and colors.
///
/// Equality is component-wise; an empty glyph is a space with empty
/// attributes and the default colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Glyph {
    pub rune: char,
    pub attr: GlyphAttr,
    pub fg: Color,
    pub bg: Color,
}

impl Glyph {
    pub const EMPTY: Glyph = Glyph {
        rune: ' ',
        attr: GlyphAttr::empty(),
        fg: Color::DEFAULT_FG,
        bg: Color::DEFAULT_BG,
    };

    pub const fn new(rune: char, attr: GlyphAttr, fg: Color, bg: Color) -> Glyph {
        Glyph { rune, attr, fg, bg }
    }

    /// Blank or placeholder cell: space, NUL, or the right half of a
    /// wide character.
    pub fn is_empty(&self) -> bool {
        self.rune == ' ' || self.rune == '\0' || self.attr.contains(GlyphAttr::WDUMMY)
    }

    pub fn is_wide(&self) -> bool {
        self.attr.contains(GlyphAttr::WIDE)
    }

    pub fn is_dummy(&self) -> bool {
        self.attr.contains(GlyphAttr::WDUMMY)
    }

    /// All-of test against the attribute set.
    pub fn has_attrs(&self, attrs: GlyphAttr) -> bool {
        self.attr.contains(attrs)
    }

    pub fn set_attr(&mut self, attrs: GlyphAttr) {
        self.attr.insert(attrs);
    }

    pub fn clear_attr(&mut self, attrs: GlyphAttr) {
        self.attr.remove(attrs);
    }

    /// Reset to the empty glyph.
    pub fn reset(&mut self) {
        *self = Glyph::EMPTY;
    }
}

impl Default for Glyph {
    fn default() -> Self {
        Glyph::EMPTY
    }
}

/// Display width of a rune as the grid sees it: 0 for combining marks,
/// 2 for East Asian wide, otherwise 1. Control characters never reach
/// the grid, so they are not classified here.
pub fn rune_width(rune: char) -> usize {
    rune.width().unwrap_or(1)
}
