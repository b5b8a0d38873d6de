//! The X11 keysym values the core and built-in modules match against.
//! Only the handful actually consumed are listed; front-ends pass
//! whatever keysyms they have and unknown ones simply never match.

pub const ESCAPE: u32 = 0xff1b;
pub const RETURN: u32 = 0xff0d;
pub const HOME: u32 = 0xff50;
pub const LEFT: u32 = 0xff51;
pub const UP: u32 = 0xff52;
pub const RIGHT: u32 = 0xff53;
pub const DOWN: u32 = 0xff54;
pub const PAGE_UP: u32 = 0xff55;
pub const PAGE_DOWN: u32 = 0xff56;
pub const END: u32 = 0xff57;

// Latin-1 keysyms coincide with their codepoints.
pub const LOWER_H: u32 = 'h' as u32;
pub const LOWER_J: u32 = 'j' as u32;
pub const LOWER_K: u32 = 'k' as u32;
pub const LOWER_L: u32 = 'l' as u32;

/// Synthetic keysyms a front-end may use to deliver wheel steps
/// through the key surface (X has buttons, not keysyms, for these).
pub const WHEEL_UP: u32 = 0x1000_ff01;
pub const WHEEL_DOWN: u32 = 0x1000_ff02;

/// Parse a keysym name as used in configuration triggers. Single
/// characters map to their Latin-1 keysym.
pub fn from_name(name: &str) -> Option<u32> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_graphic() {
            return Some(c.to_ascii_lowercase() as u32);
        }
    }
    match name.to_ascii_lowercase().as_str() {
        "escape" | "esc" => Some(ESCAPE),
        "return" | "enter" => Some(RETURN),
        "home" => Some(HOME),
        "end" => Some(END),
        "left" => Some(LEFT),
        "up" => Some(UP),
        "right" => Some(RIGHT),
        "down" => Some(DOWN),
        "pageup" | "page_up" | "prior" => Some(PAGE_UP),
        "pagedown" | "page_down" | "next" => Some(PAGE_DOWN),
        _ => None,
    }
}
