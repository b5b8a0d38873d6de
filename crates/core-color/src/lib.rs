//! Color scheme: the 256-entry palette, the default foreground /
//! background / cursor colors, and the X-style color specifications
//! used by the dynamic-color OSC family.
//!
//! The scheme snapshots itself on the first dynamic mutation so a
//! full reset (OSC 104 without arguments, or RIS) can restore the
//! configured colors. Resolution of a `core_cell::Color` always goes
//! through [`ColorScheme::get_color`]; truecolor values pass their
//! payload straight through.

use core_cell::Color;
use thiserror::Error;

/// 24-bit RGB plus alpha. Alpha is carried for renderers that blend;
/// the core itself only ever produces opaque colors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Rgb {
        Rgb { r, g, b, a: 0xff }
    }

    /// X resource form with 16-bit components, the 8-bit value
    /// duplicated into both bytes. Used verbatim in OSC query replies.
    pub fn to_x11_spec(self) -> String {
        format!(
            "rgb:{r:02x}{r:02x}/{g:02x}{g:02x}/{b:02x}{b:02x}",
            r = self.r,
            g = self.g,
            b = self.b
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("empty color specification")]
    Empty,
    #[error("malformed color specification: {0:?}")]
    Malformed(String),
}

/// Parse the color specifications accepted for OSC 4/10/11/12:
/// `rgb:HH/HH/HH`, `rgb:HHHH/HHHH/HHHH` (high byte taken), `#RRGGBB`,
/// and `#RGB` (each nibble duplicated).
pub fn parse_color_spec(spec: &str) -> Result<Rgb, ColorParseError> {
    if spec.is_empty() {
        return Err(ColorParseError::Empty);
    }
    let malformed = || ColorParseError::Malformed(spec.to_owned());

    if let Some(hex) = spec.strip_prefix('#') {
        let digit = |i: usize| {
            hex.as_bytes()
                .get(i)
                .and_then(|b| (*b as char).to_digit(16))
                .map(|d| d as u8)
        };
        return match hex.len() {
            3 => {
                let mut c = [0u8; 3];
                for (i, out) in c.iter_mut().enumerate() {
                    let d = digit(i).ok_or_else(malformed)?;
                    *out = d << 4 | d;
                }
                Ok(Rgb::new(c[0], c[1], c[2]))
            }
            6 => {
                let mut c = [0u8; 3];
                for (i, out) in c.iter_mut().enumerate() {
                    let hi = digit(2 * i).ok_or_else(malformed)?;
                    let lo = digit(2 * i + 1).ok_or_else(malformed)?;
                    *out = hi << 4 | lo;
                }
                Ok(Rgb::new(c[0], c[1], c[2]))
            }
            _ => Err(malformed()),
        };
    }

    if let Some(body) = spec.strip_prefix("rgb:") {
        let mut parts = body.split('/');
        let mut c = [0u8; 3];
        for out in &mut c {
            let part = parts.next().ok_or_else(malformed)?;
            *out = match part.len() {
                2 => u8::from_str_radix(part, 16).map_err(|_| malformed())?,
                // 16-bit component: keep the high byte.
                4 => (u16::from_str_radix(part, 16).map_err(|_| malformed())? >> 8) as u8,
                _ => return Err(malformed()),
            };
        }
        if parts.next().is_some() {
            return Err(malformed());
        }
        return Ok(Rgb::new(c[0], c[1], c[2]));
    }

    Err(malformed())
}

/// Snapshot taken before the first dynamic mutation.
#[derive(Clone, Debug)]
struct Originals {
    palette: Box<[Rgb; 256]>,
    fg: Rgb,
    bg: Rgb,
    cursor: Rgb,
}

#[derive(Clone, Debug)]
pub struct ColorScheme {
    palette: Box<[Rgb; 256]>,
    fg: Rgb,
    bg: Rgb,
    cursor: Rgb,
    originals: Option<Box<Originals>>,
}

impl Default for ColorScheme {
    fn default() -> Self {
        let palette = Box::new(default_palette());
        ColorScheme {
            fg: palette[7],
            bg: palette[0],
            cursor: palette[7],
            palette,
            originals: None,
        }
    }
}

impl ColorScheme {
    pub fn new() -> ColorScheme {
        ColorScheme::default()
    }

    /// Resolve a cell color to concrete RGB.
    pub fn get_color(&self, color: Color) -> Rgb {
        if let Some((r, g, b)) = color.truecolor_rgb() {
            return Rgb::new(r, g, b);
        }
        match color.index() {
            Some(idx @ 0..=255) => self.palette[idx as usize],
            Some(256) => self.fg,
            Some(257) => self.bg,
            // Unreachable by construction; resolve like the default bg
            // rather than panicking on a corrupted value.
            _ => self.bg,
        }
    }

    pub fn palette_entry(&self, idx: u8) -> Rgb {
        self.palette[idx as usize]
    }

    pub fn foreground(&self) -> Rgb {
        self.fg
    }

    pub fn background(&self) -> Rgb {
        self.bg
    }

    pub fn cursor_color(&self) -> Rgb {
        self.cursor
    }

    /// True once any dynamic mutation has happened.
    pub fn has_originals(&self) -> bool {
        self.originals.is_some()
    }

    pub fn set_color(&mut self, idx: u8, rgb: Rgb) {
        self.snapshot();
        self.palette[idx as usize] = rgb;
    }

    pub fn set_foreground(&mut self, rgb: Rgb) {
        self.snapshot();
        self.fg = rgb;
    }

    pub fn set_background(&mut self, rgb: Rgb) {
        self.snapshot();
        self.bg = rgb;
    }

    pub fn set_cursor_color(&mut self, rgb: Rgb) {
        self.snapshot();
        self.cursor = rgb;
    }

    /// Restore a single palette entry. No-op when nothing was ever
    /// mutated.
    pub fn reset_color(&mut self, idx: u8) {
        if let Some(orig) = &self.originals {
            self.palette[idx as usize] = orig.palette[idx as usize];
        }
    }

    pub fn reset_foreground(&mut self) {
        if let Some(orig) = &self.originals {
            self.fg = orig.fg;
        }
    }

    pub fn reset_background(&mut self) {
        if let Some(orig) = &self.originals {
            self.bg = orig.bg;
        }
    }

    pub fn reset_cursor_color(&mut self) {
        if let Some(orig) = &self.originals {
            self.cursor = orig.cursor;
        }
    }

    /// Restore everything from the snapshot, keeping the snapshot so
    /// later mutations remain undoable. No-op when never mutated.
    pub fn reset_all(&mut self) {
        if let Some(orig) = &self.originals {
            self.palette = orig.palette.clone();
            self.fg = orig.fg;
            self.bg = orig.bg;
            self.cursor = orig.cursor;
        }
    }

    fn snapshot(&mut self) {
        if self.originals.is_none() {
            self.originals = Some(Box::new(Originals {
                palette: self.palette.clone(),
                fg: self.fg,
                bg: self.bg,
                cursor: self.cursor,
            }));
        }
    }
}

/// xterm-compatible default palette: 16 base colors, the 6x6x6 cube,
/// and the grayscale ramp.
pub fn default_palette() -> [Rgb; 256] {
    const BASE16: [(u8, u8, u8); 16] = [
        (0x00, 0x00, 0x00),
        (0xcd, 0x00, 0x00),
        (0x00, 0xcd, 0x00),
        (0xcd, 0xcd, 0x00),
        (0x00, 0x00, 0xee),
        (0xcd, 0x00, 0xcd),
        (0x00, 0xcd, 0xcd),
        (0xe5, 0xe5, 0xe5),
        (0x7f, 0x7f, 0x7f),
        (0xff, 0x00, 0x00),
        (0x00, 0xff, 0x00),
        (0xff, 0xff, 0x00),
        (0x5c, 0x5c, 0xff),
        (0xff, 0x00, 0xff),
        (0x00, 0xff, 0xff),
        (0xff, 0xff, 0xff),
    ];
    let mut palette = [Rgb::default(); 256];
    for (i, &(r, g, b)) in BASE16.iter().enumerate() {
        palette[i] = Rgb::new(r, g, b);
    }
    let level = |v: u32| if v == 0 { 0 } else { 0x37 + 0x28 * v as u8 };
    for i in 16..232u32 {
        let v = i - 16;
        palette[i as usize] = Rgb::new(level(v / 36), level(v / 6 % 6), level(v % 6));
    }
    for i in 232..256u32 {
        let g = (8 + 10 * (i - 232)) as u8;
        palette[i as usize] = Rgb::new(g, g, g);
    }
    palette
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hash_forms() {
        assert_eq!(parse_color_spec("#ff8000"), Ok(Rgb::new(0xff, 0x80, 0x00)));
        assert_eq!(parse_color_spec("#f80"), Ok(Rgb::new(0xff, 0x88, 0x00)));
        assert!(parse_color_spec("#ff80").is_err());
        assert!(parse_color_spec("#gg0000").is_err());
    }

    #[test]
    fn parse_rgb_forms() {
        assert_eq!(
            parse_color_spec("rgb:12/34/56"),
            Ok(Rgb::new(0x12, 0x34, 0x56))
        );
        // 16-bit components keep the high byte
        assert_eq!(
            parse_color_spec("rgb:1234/5678/9abc"),
            Ok(Rgb::new(0x12, 0x56, 0x9a))
        );
        assert!(parse_color_spec("rgb:12/34").is_err());
        assert!(parse_color_spec("rgb:12/34/56/78").is_err());
        assert!(parse_color_spec("rgb:123/456/789").is_err());
        assert!(parse_color_spec("").is_err());
        assert!(parse_color_spec("red").is_err());
    }

    #[test]
    fn x11_reply_duplicates_bytes() {
        assert_eq!(
            Rgb::new(0x12, 0xab, 0x00).to_x11_spec(),
            "rgb:1212/abab/0000"
        );
    }

    #[test]
    fn resolution_paths() {
        let scheme = ColorScheme::new();
        assert_eq!(scheme.get_color(Color::palette(1)), Rgb::new(0xcd, 0, 0));
        assert_eq!(scheme.get_color(Color::DEFAULT_FG), scheme.foreground());
        assert_eq!(scheme.get_color(Color::DEFAULT_BG), scheme.background());
        assert_eq!(
            scheme.get_color(Color::rgb(1, 2, 3)),
            Rgb::new(1, 2, 3)
        );
    }

    #[test]
    fn cube_and_grayscale_anchors() {
        let p = default_palette();
        assert_eq!(p[16], Rgb::new(0, 0, 0));
        assert_eq!(p[231], Rgb::new(0xff, 0xff, 0xff));
        assert_eq!(p[232], Rgb::new(8, 8, 8));
        assert_eq!(p[255], Rgb::new(238, 238, 238));
    }

    #[test]
    fn snapshot_and_reset_cycle() {
        let mut scheme = ColorScheme::new();
        assert!(!scheme.has_originals());
        // resets before any mutation are silent no-ops
        scheme.reset_all();
        scheme.reset_color(1);
        assert_eq!(scheme.palette_entry(1), Rgb::new(0xcd, 0, 0));

        scheme.set_color(1, Rgb::new(1, 2, 3));
        scheme.set_background(Rgb::new(9, 9, 9));
        assert!(scheme.has_originals());
        assert_eq!(scheme.palette_entry(1), Rgb::new(1, 2, 3));

        scheme.reset_color(1);
        assert_eq!(scheme.palette_entry(1), Rgb::new(0xcd, 0, 0));
        assert_eq!(scheme.background(), Rgb::new(9, 9, 9));

        scheme.reset_all();
        assert_eq!(scheme.background(), scheme.palette_entry(0));
        // snapshot survives a full reset
        assert!(scheme.has_originals());
    }
}
