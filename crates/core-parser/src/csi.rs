//! CSI dispatch: cursor addressing, erase family, scrolling, modes,
//! SGR, and status reports.
//!
//! Parameter hygiene (a zeroed vector between sequences) is provided
//! by the state machine; everything here reads the freshly collected
//! parameters only. Missing or zero parameters take their per-command
//! defaults. Malformed or unrecognized sequences are logged at debug
//! level and dropped without touching the grid.

use crate::performer::{DA_RESPONSE, Performer};
use crate::{Charset, TermMode};
use core_cell::Color;
use core_screen::{CursorFlags, CursorShape};
use smallvec::SmallVec;
use tracing::debug;

/// Flattened parameter list. Colon-separated subparameters flatten to
/// the same shape as their semicolon forms, so `38:2:R:G:B` and
/// `38;2;R;G;B` take one code path.
type Args = SmallVec<[u16; 32]>;

fn arg(args: &Args, i: usize, default: usize) -> usize {
    match args.get(i) {
        Some(&v) if v != 0 => v as usize,
        _ => default,
    }
}

pub(crate) fn dispatch(
    perf: &mut Performer<'_, '_>,
    params: &vte::Params,
    intermediates: &[u8],
    action: char,
) {
    let mut args: Args = SmallVec::new();
    for group in params.iter() {
        args.extend_from_slice(group);
    }

    match (action, intermediates.first().copied()) {
        ('m', None) => sgr(perf, &args),

        ('@', None) => perf.host.screen.insert_blanks(arg(&args, 0, 1)),
        ('A', None) => {
            let c = *perf.host.screen.cursor();
            let n = arg(&args, 0, 1);
            perf.host.screen.move_to(c.x, c.y.saturating_sub(n));
        }
        ('B' | 'e', None) => {
            let c = *perf.host.screen.cursor();
            perf.host.screen.move_to(c.x, c.y + arg(&args, 0, 1));
        }
        ('C' | 'a', None) => {
            let c = *perf.host.screen.cursor();
            perf.host.screen.move_to(c.x + arg(&args, 0, 1), c.y);
        }
        ('D', None) => {
            let c = *perf.host.screen.cursor();
            let n = arg(&args, 0, 1);
            perf.host.screen.move_to(c.x.saturating_sub(n), c.y);
        }
        ('E', None) => {
            let y = perf.host.screen.cursor().y;
            perf.host.screen.move_to(0, y + arg(&args, 0, 1));
        }
        ('F', None) => {
            let y = perf.host.screen.cursor().y;
            let n = arg(&args, 0, 1);
            perf.host.screen.move_to(0, y.saturating_sub(n));
        }
        ('G' | '`', None) => {
            let y = perf.host.screen.cursor().y;
            perf.host.screen.move_to(arg(&args, 0, 1) - 1, y);
        }
        ('H' | 'f', None) => {
            let row = arg(&args, 0, 1);
            let col = arg(&args, 1, 1);
            perf.host.screen.move_to_origin(col - 1, row - 1);
        }
        ('d', None) => {
            let x = perf.host.screen.cursor().x;
            perf.host.screen.move_to_origin(x, arg(&args, 0, 1) - 1);
        }

        ('I', None) => {
            let mut x = perf.host.screen.cursor().x;
            for _ in 0..arg(&args, 0, 1) {
                x = perf.host.screen.next_tab(x);
            }
            let y = perf.host.screen.cursor().y;
            perf.host.screen.move_to(x, y);
        }
        ('Z', None) => {
            let mut x = perf.host.screen.cursor().x;
            for _ in 0..arg(&args, 0, 1) {
                x = perf.host.screen.prev_tab(x);
            }
            let y = perf.host.screen.cursor().y;
            perf.host.screen.move_to(x, y);
        }
        ('g', None) => match arg(&args, 0, 0) {
            0 => {
                let x = perf.host.screen.cursor().x;
                perf.host.screen.clear_tab(x);
            }
            3 => perf.host.screen.clear_all_tabs(),
            other => debug!(target: "parser.csi", other, "unhandled TBC argument"),
        },

        ('J', None) => erase_display(perf, arg(&args, 0, 0)),
        ('K', None) => erase_line(perf, arg(&args, 0, 0)),
        ('X', None) => perf.host.screen.erase_chars(arg(&args, 0, 1)),
        ('P', None) => perf.host.screen.delete_chars(arg(&args, 0, 1)),

        ('L', None) => perf.host.screen.insert_blank_lines(arg(&args, 0, 1)),
        ('M', None) => {
            let evicted = perf.host.screen.delete_lines(arg(&args, 0, 1));
            perf.forward_evictions(evicted);
        }
        ('S', None) => {
            let (top, _) = perf.host.screen.scroll_region();
            let evicted = perf.host.screen.scroll_up(top, arg(&args, 0, 1));
            perf.forward_evictions(evicted);
        }
        ('T', None) => {
            let (top, _) = perf.host.screen.scroll_region();
            perf.host.screen.scroll_down(top, arg(&args, 0, 1));
        }

        ('b', None) => {
            // REP goes through the regular print path so the wrap
            // latch behaves exactly as if the rune were retyped.
            if let Some(rune) = perf.exec.last_printed {
                for _ in 0..arg(&args, 0, 1) {
                    perf.print_rune(rune);
                }
            }
        }

        ('c', None) => {
            if arg(&args, 0, 0) == 0 {
                perf.host.signals.emit_response(DA_RESPONSE);
            }
        }
        ('n', None) => match arg(&args, 0, 0) {
            5 => perf.host.signals.emit_response(b"\x1b[0n"),
            6 => {
                let c = perf.host.screen.cursor();
                let report = format!("\x1b[{};{}R", c.y + 1, c.x + 1);
                perf.host.signals.emit_response(report.as_bytes());
            }
            other => debug!(target: "parser.csi", other, "unhandled DSR argument"),
        },

        ('r', None) => {
            let rows = perf.host.screen.rows();
            let top = arg(&args, 0, 1);
            let bot = arg(&args, 1, rows);
            perf.host.screen.set_scroll_region(top - 1, bot.saturating_sub(1));
            perf.host.screen.move_to_origin(0, 0);
        }
        ('s', None) => {
            let charset = perf.exec.active_charset;
            perf.host.screen.save_cursor(charset);
        }
        ('u', None) => {
            perf.exec.active_charset = perf.host.screen.restore_cursor();
        }

        // DECSTR: soft reset. Modes, pen, region, and charsets go back
        // to power-up defaults; the grid and cursor position stay.
        ('p', Some(b'!')) => {
            perf.exec.modes = TermMode::default();
            perf.exec.charsets = [Charset::Ascii; 4];
            perf.exec.active_charset = 0;
            let rows = perf.host.screen.rows();
            perf.host.screen.set_scroll_region(0, rows - 1);
            let cursor = perf.host.screen.cursor_mut();
            cursor.pen.reset();
            cursor.flags = CursorFlags::default();
            cursor.shape = CursorShape::default();
        }

        ('q', Some(b' ')) => {
            let shape = match arg(&args, 0, 0) {
                0..=2 => CursorShape::Block,
                3 | 4 => CursorShape::Underline,
                5 | 6 => CursorShape::Bar,
                other => {
                    debug!(target: "parser.csi", other, "unhandled DECSCUSR argument");
                    return;
                }
            };
            perf.host.screen.cursor_mut().shape = shape;
        }

        ('h', None) => set_public_modes(perf, &args, true),
        ('l', None) => set_public_modes(perf, &args, false),
        ('h', Some(b'?')) => set_private_modes(perf, &args, true),
        ('l', Some(b'?')) => set_private_modes(perf, &args, false),
        ('r' | 's' | 'J' | 'K', Some(b'?')) => {
            debug!(target: "parser.csi", %action, "unhandled private sequence");
        }

        _ => debug!(
            target: "parser.csi",
            %action,
            intermediates = ?intermediates,
            "unhandled csi"
        ),
    }
}

fn erase_display(perf: &mut Performer<'_, '_>, mode: usize) {
    let screen = &mut *perf.host.screen;
    let (cols, rows) = (screen.cols(), screen.rows());
    let c = *screen.cursor();
    match mode {
        0 => {
            screen.clear_region(c.x, c.y, cols - 1, c.y);
            if c.y + 1 < rows {
                screen.clear_region(0, c.y + 1, cols - 1, rows - 1);
            }
        }
        1 => {
            if c.y > 0 {
                screen.clear_region(0, 0, cols - 1, c.y - 1);
            }
            screen.clear_region(0, c.y, c.x, c.y);
        }
        2 => screen.clear_region(0, 0, cols - 1, rows - 1),
        other => debug!(target: "parser.csi", other, "unhandled ED argument"),
    }
}

fn erase_line(perf: &mut Performer<'_, '_>, mode: usize) {
    let screen = &mut *perf.host.screen;
    let cols = screen.cols();
    let c = *screen.cursor();
    match mode {
        0 => screen.clear_region(c.x, c.y, cols - 1, c.y),
        1 => screen.clear_region(0, c.y, c.x, c.y),
        2 => screen.clear_region(0, c.y, cols - 1, c.y),
        other => debug!(target: "parser.csi", other, "unhandled EL argument"),
    }
}

fn set_public_modes(perf: &mut Performer<'_, '_>, args: &Args, set: bool) {
    for &mode in args.iter() {
        match mode {
            4 => perf.exec.modes.set(TermMode::INSERT, set),
            20 => perf.exec.modes.set(TermMode::LINE_FEED_CR, set),
            other => debug!(target: "parser.mode", other, set, "unhandled ANSI mode"),
        }
    }
}

fn set_private_modes(perf: &mut Performer<'_, '_>, args: &Args, set: bool) {
    for &mode in args.iter() {
        match mode {
            1 => perf.exec.modes.set(TermMode::APP_CURSOR, set),
            6 => {
                let cursor = perf.host.screen.cursor_mut();
                cursor.flags.set(CursorFlags::ORIGIN, set);
                perf.host.screen.move_to_origin(0, 0);
            }
            7 => perf.exec.modes.set(TermMode::WRAP, set),
            12 => perf.exec.modes.set(TermMode::BLINK, set),
            25 => {
                let cursor = perf.host.screen.cursor_mut();
                cursor.flags.set(CursorFlags::VISIBLE, set);
            }
            1000 | 1002 | 1003 => {
                let bit = match mode {
                    1000 => TermMode::MOUSE_BUTTON,
                    1002 => TermMode::MOUSE_MOTION,
                    _ => TermMode::MOUSE_MANY,
                };
                // Tracking modes are mutually exclusive.
                perf.exec.modes.remove(TermMode::MOUSE_REPORT);
                perf.exec.modes.set(bit, set);
            }
            1004 => perf.exec.modes.set(TermMode::FOCUS, set),
            1005 => perf.exec.modes.set(TermMode::MOUSE_UTF8, set),
            1006 => perf.exec.modes.set(TermMode::MOUSE_SGR, set),
            1049 => {
                if set && !perf.host.screen.is_altscreen() {
                    // Save, switch, clear. The cursor is deliberately
                    // not homed.
                    let charset = perf.exec.active_charset;
                    perf.host.screen.save_cursor(charset);
                    perf.host.screen.activate_alternate();
                    perf.host.screen.clear_active();
                } else if !set && perf.host.screen.is_altscreen() {
                    perf.host.screen.activate_primary();
                    perf.exec.active_charset = perf.host.screen.restore_cursor();
                }
            }
            2004 => perf.exec.modes.set(TermMode::BRACKETED_PASTE, set),
            other => debug!(target: "parser.mode", other, set, "unhandled private mode"),
        }
    }
}

fn sgr(perf: &mut Performer<'_, '_>, args: &Args) {
    let pen = perf.host.screen.pen_mut();
    if args.is_empty() {
        pen.reset();
        return;
    }
    use core_cell::GlyphAttr as A;
    let mut i = 0;
    while i < args.len() {
        match args[i] {
            0 => pen.reset(),
            1 => pen.attr.insert(A::BOLD),
            2 => pen.attr.insert(A::FAINT),
            3 => pen.attr.insert(A::ITALIC),
            4 => pen.attr.insert(A::UNDERLINE),
            5 | 6 => pen.attr.insert(A::BLINK),
            7 => pen.attr.insert(A::REVERSE),
            8 => pen.attr.insert(A::INVISIBLE),
            9 => pen.attr.insert(A::STRUCK),
            22 => pen.attr.remove(A::BOLD | A::FAINT),
            23 => pen.attr.remove(A::ITALIC),
            24 => pen.attr.remove(A::UNDERLINE),
            25 => pen.attr.remove(A::BLINK),
            27 => pen.attr.remove(A::REVERSE),
            28 => pen.attr.remove(A::INVISIBLE),
            29 => pen.attr.remove(A::STRUCK),
            n @ 30..=37 => pen.fg = Color::palette((n - 30) as u8),
            38 => match extended_color(&args[i + 1..]) {
                Some((color, used)) => {
                    pen.fg = color;
                    i += used;
                }
                None => {
                    debug!(target: "parser.sgr", "malformed extended fg, rest dropped");
                    return;
                }
            },
            39 => pen.fg = Color::DEFAULT_FG,
            n @ 40..=47 => pen.bg = Color::palette((n - 40) as u8),
            48 => match extended_color(&args[i + 1..]) {
                Some((color, used)) => {
                    pen.bg = color;
                    i += used;
                }
                None => {
                    debug!(target: "parser.sgr", "malformed extended bg, rest dropped");
                    return;
                }
            },
            49 => pen.bg = Color::DEFAULT_BG,
            n @ 90..=97 => pen.fg = Color::palette((n - 90 + 8) as u8),
            n @ 100..=107 => pen.bg = Color::palette((n - 100 + 8) as u8),
            other => debug!(target: "parser.sgr", other, "unhandled SGR parameter"),
        }
        i += 1;
    }
}

/// `5;N` palette or `2;R;G;B` truecolor following a 38/48. Returns the
/// color and how many parameters were consumed.
fn extended_color(rest: &[u16]) -> Option<(Color, usize)> {
    match *rest.first()? {
        5 => {
            let idx = *rest.get(1)?;
            (idx <= 255).then(|| (Color::palette(idx as u8), 2))
        }
        2 => {
            let (r, g, b) = (*rest.get(1)?, *rest.get(2)?, *rest.get(3)?);
            (r <= 255 && g <= 255 && b <= 255)
                .then(|| (Color::rgb(r as u8, g as u8, b as u8), 4))
        }
        _ => None,
    }
}
