//! Dynamic colors: OSC 4 (palette), 10/11/12 (defaults), 104 and
//! 110/111/112 (resets).
//!
//! Specs accepted: `rgb:HH/HH/HH`, `rgb:HHHH/HHHH/HHHH`, `#RRGGBB`,
//! `#RGB`; a literal `?` queries and answers in the 16-bit `rgb:`
//! form. OSC 104 before any mutation is a deliberate silent no-op:
//! no response, no error.

use core_color::parse_color_spec;
use core_config::{Config, DynColorsConfig};
use core_module::{Disposition, EscapeHandler, EscapeKind, Module, ModuleCtx};
use tracing::{debug, warn};

pub struct DynColorsModule {
    config: DynColorsConfig,
}

impl Default for DynColorsModule {
    fn default() -> Self {
        DynColorsModule::new()
    }
}

impl DynColorsModule {
    pub fn new() -> DynColorsModule {
        DynColorsModule {
            config: DynColorsConfig::default(),
        }
    }

    /// OSC 4: `4;idx;spec` pairs, possibly several per sequence.
    fn handle_palette(&mut self, fields: &[&[u8]], ctx: &mut ModuleCtx<'_>) {
        let mut pairs = fields.chunks_exact(2);
        for pair in &mut pairs {
            let Ok(idx) = std::str::from_utf8(pair[0])
                .unwrap_or("")
                .parse::<u16>()
            else {
                warn!(target: "module.dyncolors", "bad palette index");
                continue;
            };
            if idx > 255 {
                warn!(target: "module.dyncolors", idx, "palette index out of range");
                continue;
            }
            let spec = String::from_utf8_lossy(pair[1]);
            if spec == "?" {
                if self.config.allow_query {
                    let rgb = ctx.colors.palette_entry(idx as u8);
                    let reply = format!("\x1b]4;{};{}\x1b\\", idx, rgb.to_x11_spec());
                    ctx.signals.emit_response(reply.as_bytes());
                }
            } else if self.config.allow_set {
                match parse_color_spec(&spec) {
                    Ok(rgb) => {
                        ctx.colors.set_color(idx as u8, rgb);
                        ctx.signals.emit_contents_changed();
                    }
                    Err(err) => warn!(target: "module.dyncolors", %err, "bad color spec"),
                }
            }
        }
        if !pairs.remainder().is_empty() {
            debug!(target: "module.dyncolors", "dangling palette field ignored");
        }
    }

    /// OSC 10/11/12: one spec for a default color.
    fn handle_default(&mut self, number: u8, fields: &[&[u8]], ctx: &mut ModuleCtx<'_>) {
        let Some(spec) = fields.first() else {
            debug!(target: "module.dyncolors", number, "missing spec field");
            return;
        };
        let spec = String::from_utf8_lossy(spec);
        if spec == "?" {
            if self.config.allow_query {
                let rgb = match number {
                    10 => ctx.colors.foreground(),
                    11 => ctx.colors.background(),
                    _ => ctx.colors.cursor_color(),
                };
                let reply = format!("\x1b]{};{}\x1b\\", number, rgb.to_x11_spec());
                ctx.signals.emit_response(reply.as_bytes());
            }
            return;
        }
        if !self.config.allow_set {
            return;
        }
        match parse_color_spec(&spec) {
            Ok(rgb) => {
                match number {
                    10 => ctx.colors.set_foreground(rgb),
                    11 => ctx.colors.set_background(rgb),
                    _ => ctx.colors.set_cursor_color(rgb),
                }
                ctx.signals.emit_contents_changed();
            }
            Err(err) => warn!(target: "module.dyncolors", %err, "bad color spec"),
        }
    }

    /// OSC 104: full or per-index palette reset. Silent no-op before
    /// any mutation.
    fn handle_reset(&mut self, fields: &[&[u8]], ctx: &mut ModuleCtx<'_>) {
        if !self.config.allow_set || !ctx.colors.has_originals() {
            return;
        }
        if fields.is_empty() {
            ctx.colors.reset_all();
        } else {
            for field in fields {
                match std::str::from_utf8(field).unwrap_or("").parse::<u16>() {
                    Ok(idx) if idx <= 255 => ctx.colors.reset_color(idx as u8),
                    _ => warn!(target: "module.dyncolors", "bad reset index"),
                }
            }
        }
        ctx.signals.emit_contents_changed();
    }
}

impl Module for DynColorsModule {
    fn name(&self) -> &'static str {
        "dyncolors"
    }

    fn configure(&mut self, config: &Config) {
        self.config = config.dyncolors.clone();
    }

    fn as_escape_handler(&mut self) -> Option<&mut dyn EscapeHandler> {
        Some(self)
    }
}

impl EscapeHandler for DynColorsModule {
    fn handle_escape(
        &mut self,
        kind: EscapeKind,
        payload: &[u8],
        ctx: &mut ModuleCtx<'_>,
    ) -> anyhow::Result<Disposition> {
        if kind != EscapeKind::Osc {
            return Ok(Disposition::Pass);
        }
        let fields: Vec<&[u8]> = payload.split(|&b| b == b';').collect();
        let number = fields
            .first()
            .and_then(|f| std::str::from_utf8(f).ok())
            .and_then(|s| s.parse::<u16>().ok());
        match number {
            Some(4) => self.handle_palette(&fields[1..], ctx),
            Some(n @ (10 | 11 | 12)) => self.handle_default(n as u8, &fields[1..], ctx),
            Some(104) => self.handle_reset(&fields[1..], ctx),
            Some(n @ (110 | 111 | 112)) => {
                if self.config.allow_set {
                    match n {
                        110 => ctx.colors.reset_foreground(),
                        111 => ctx.colors.reset_background(),
                        _ => ctx.colors.reset_cursor_color(),
                    }
                    ctx.signals.emit_contents_changed();
                }
            }
            _ => return Ok(Disposition::Pass),
        }
        Ok(Disposition::Consumed)
    }
}
