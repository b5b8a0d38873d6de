//! The VT parser / executor.
//!
//! The byte-level VT500 state machine (ground / escape / CSI / OSC /
//! DCS states, parameter collection, UTF-8 resumability across
//! `advance` calls) comes from the `vte` crate; this crate implements
//! [`vte::Perform`] and owns every dispatch decision: control codes,
//! ESC and CSI finals, DECSET/DECRST private modes, SGR folding, OSC
//! and DCS string handling, and the PTY-bound responses.
//!
//! The executor is a thin shim over the cell model: sequences are
//! translated into `Screen` operations, responses go out through the
//! `response` signal, and string payloads the core does not handle
//! natively are offered to escape-handler modules before being
//! dropped. Rows evicted by scrolling are fanned out to eviction
//! sinks and the `line-scrolled-out` signal before they are freed.

mod charset;
mod csi;
mod performer;

pub use charset::Charset;

use core_color::ColorScheme;
use core_config::ParserConfig;
use core_events::Signals;
use core_module::ModuleRegistry;
use core_screen::Screen;
use performer::Performer;

/// Hard upper bound on buffered OSC/DCS strings, large enough for a
/// full-size OSC 52 payload. The configurable soft cap truncates far
/// earlier in the default configuration.
pub const STR_BUF_SIZE: usize = 128 * 1024;

bitflags::bitflags! {
    /// Terminal modes toggled by SM/RM and DECSET/DECRST. Cursor
    /// visibility and origin mode live on the cursor itself.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TermMode: u32 {
        /// DECAWM auto-wrap (on by default).
        const WRAP            = 1 << 0;
        /// IRM insert mode.
        const INSERT          = 1 << 1;
        /// DECCKM application cursor keys.
        const APP_CURSOR      = 1 << 2;
        /// LNM: LF implies CR.
        const LINE_FEED_CR    = 1 << 3;
        /// Cursor blink (DECSET 12).
        const BLINK           = 1 << 4;
        /// Focus in/out reporting (1004).
        const FOCUS           = 1 << 5;
        /// Mouse press/release reporting (1000).
        const MOUSE_BUTTON    = 1 << 6;
        /// Mouse drag reporting (1002).
        const MOUSE_MOTION    = 1 << 7;
        /// All-motion reporting (1003).
        const MOUSE_MANY      = 1 << 8;
        /// UTF-8 mouse coordinates (1005).
        const MOUSE_UTF8      = 1 << 9;
        /// SGR mouse encoding (1006).
        const MOUSE_SGR       = 1 << 10;
        /// Bracketed paste (2004).
        const BRACKETED_PASTE = 1 << 11;

        const MOUSE_REPORT = Self::MOUSE_BUTTON.bits()
            | Self::MOUSE_MOTION.bits()
            | Self::MOUSE_MANY.bits();
    }
}

impl Default for TermMode {
    fn default() -> Self {
        TermMode::WRAP
    }
}

/// Everything the executor mutates besides its own state, borrowed
/// for the duration of one `advance`.
pub struct Host<'a> {
    pub screen: &'a mut Screen,
    pub colors: &'a mut ColorScheme,
    pub signals: &'a mut Signals,
    pub modules: &'a mut ModuleRegistry,
}

/// Persistent executor state surviving across `advance` calls.
#[derive(Debug)]
pub(crate) struct Executor {
    pub modes: TermMode,
    pub charsets: [Charset; 4],
    pub active_charset: usize,
    /// Last printable rune, for REP.
    pub last_printed: Option<char>,
    pub title: String,
    pub icon_title: String,
    /// Soft cap applied to OSC/DCS payloads before dispatch.
    pub osc_max_bytes: usize,
    /// In-flight DCS payload, when inside `ESC P … ST`.
    pub dcs: Option<Vec<u8>>,
}

impl Executor {
    fn new(config: &ParserConfig) -> Executor {
        Executor {
            modes: TermMode::default(),
            charsets: [Charset::Ascii; 4],
            active_charset: 0,
            last_printed: None,
            title: String::new(),
            icon_title: String::new(),
            osc_max_bytes: config.osc_max_bytes.min(STR_BUF_SIZE),
            dcs: None,
        }
    }

    /// RIS-level reset of executor state.
    pub fn reset(&mut self) {
        self.modes = TermMode::default();
        self.charsets = [Charset::Ascii; 4];
        self.active_charset = 0;
        self.last_printed = None;
        self.dcs = None;
    }
}

/// The parser front door: feed bytes, they come out as screen
/// mutations and signals.
pub struct Vt {
    machine: vte::Parser<STR_BUF_SIZE>,
    exec: Executor,
}

impl Vt {
    pub fn new(config: &ParserConfig) -> Vt {
        Vt {
            machine: vte::Parser::default(),
            exec: Executor::new(config),
        }
    }

    /// Apply a byte chunk. Chunks may split UTF-8 sequences and escape
    /// sequences at any byte boundary; state carries over.
    pub fn advance(&mut self, host: &mut Host<'_>, bytes: &[u8]) {
        let mut performer = Performer {
            exec: &mut self.exec,
            host,
        };
        self.machine.advance(&mut performer, bytes);
    }

    pub fn modes(&self) -> TermMode {
        self.exec.modes
    }

    pub fn title(&self) -> &str {
        &self.exec.title
    }

    pub fn icon_title(&self) -> &str {
        &self.exec.icon_title
    }
}

impl std::fmt::Debug for Vt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vt").field("exec", &self.exec).finish()
    }
}
