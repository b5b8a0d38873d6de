//! Configuration loading and parsing.
//!
//! One TOML file (`oxterm.toml`), one `#[serde(default)]` section per
//! module. Unknown fields are ignored (deserialization tolerance) so
//! the file format can grow without breaking older binaries. Values
//! outside their documented ranges are clamped with a warning rather
//! than rejected; an unreadable or unparsable file falls back to
//! defaults. The terminal core never reads this directly — the
//! embedder loads a `Config` once and hands it to each module's
//! `configure`.

use anyhow::Result;
use core_events::{ModMask, keysyms};
use serde::Deserialize;
use std::path::Path;
use std::{fmt, fs};
use tracing::warn;

/// A parsed trigger chord such as `Ctrl+Shift+Escape`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub mods: ModMask,
    pub keysym: u32,
}

impl KeyChord {
    /// Parse `Mod+Mod+Key`. Returns `None` on any unknown token; the
    /// caller decides the fallback.
    pub fn parse(spec: &str) -> Option<KeyChord> {
        let mut mods = ModMask::empty();
        let mut keysym = None;
        for token in spec.split('+') {
            match token.trim().to_ascii_lowercase().as_str() {
                "ctrl" | "control" => mods |= ModMask::CONTROL,
                "shift" => mods |= ModMask::SHIFT,
                "alt" | "mod1" => mods |= ModMask::MOD1,
                "super" | "mod4" => mods |= ModMask::MOD4,
                name => {
                    if keysym.is_some() {
                        return None;
                    }
                    keysym = Some(keysyms::from_name(name)?);
                }
            }
        }
        Some(KeyChord {
            mods,
            keysym: keysym?,
        })
    }

    pub fn matches(&self, keysym: u32, mods: ModMask) -> bool {
        self.keysym == keysym && self.mods == mods.strip_locks()
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (bit, name) in [
            (ModMask::CONTROL, "Ctrl"),
            (ModMask::SHIFT, "Shift"),
            (ModMask::MOD1, "Alt"),
            (ModMask::MOD4, "Super"),
        ] {
            if self.mods.contains(bit) {
                write!(f, "{name}+")?;
            }
        }
        write!(f, "0x{:x}", self.keysym)
    }
}

fn clamp_warn<T: Ord + Copy + fmt::Display>(section: &str, key: &str, value: T, lo: T, hi: T) -> T {
    let clamped = value.clamp(lo, hi);
    if clamped != value {
        warn!(target: "config", %section, %key, %value, %clamped, "value out of range, clamped");
    }
    clamped
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScrollbackConfig {
    /// Ring capacity in lines (100..=1_000_000).
    pub lines: u32,
    /// Rows per wheel step (1..=100).
    pub mouse_scroll_lines: u32,
}

impl Default for ScrollbackConfig {
    fn default() -> Self {
        ScrollbackConfig {
            lines: 10_000,
            mouse_scroll_lines: 3,
        }
    }
}

impl ScrollbackConfig {
    fn sanitize(&mut self) {
        self.lines = clamp_warn("scrollback", "lines", self.lines, 100, 1_000_000);
        self.mouse_scroll_lines =
            clamp_warn("scrollback", "mouse_scroll_lines", self.mouse_scroll_lines, 1, 100);
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Osc52Config {
    /// Permit `?` queries (clipboard paste to the application).
    pub allow_read: bool,
    pub allow_write: bool,
    /// Maximum decoded payload size in bytes.
    pub max_bytes: usize,
    /// Optional external copy command (payload piped to its stdin).
    pub copy_command: Option<String>,
}

impl Default for Osc52Config {
    fn default() -> Self {
        Osc52Config {
            allow_read: false,
            allow_write: true,
            max_bytes: 100_000,
            copy_command: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DynColorsConfig {
    /// OSC 4/10/11/12 `?` query policy.
    pub allow_query: bool,
    /// OSC 4/10/11/12/104 set/reset policy.
    pub allow_set: bool,
}

impl Default for DynColorsConfig {
    fn default() -> Self {
        DynColorsConfig {
            allow_query: true,
            allow_set: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LigaturesConfig {
    /// OpenType feature tags handed to the shaper.
    pub features: Vec<String>,
    /// Shaping cache entries (1..=65536).
    pub cache_size: u32,
}

impl Default for LigaturesConfig {
    fn default() -> Self {
        LigaturesConfig {
            features: vec!["calt".into(), "liga".into()],
            cache_size: 4096,
        }
    }
}

impl LigaturesConfig {
    fn sanitize(&mut self) {
        self.cache_size = clamp_warn("ligatures", "cache_size", self.cache_size, 1, 65_536);
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct KbSelectConfig {
    /// Trigger chord.
    pub key: String,
    pub show_crosshair: bool,
    pub highlight_alpha: u8,
    pub search_alpha: u8,
}

impl Default for KbSelectConfig {
    fn default() -> Self {
        KbSelectConfig {
            key: "Ctrl+Shift+Escape".into(),
            show_crosshair: true,
            highlight_alpha: 100,
            search_alpha: 150,
        }
    }
}

impl KbSelectConfig {
    /// Parsed trigger; falls back to the default chord on a bad spec.
    pub fn trigger(&self) -> KeyChord {
        KeyChord::parse(&self.key).unwrap_or_else(|| {
            warn!(target: "config", key = %self.key, "invalid kbselect trigger, using default");
            KeyChord {
                mods: ModMask::CONTROL | ModMask::SHIFT,
                keysym: keysyms::ESCAPE,
            }
        })
    }
}

/// Case-insensitive scheme matching per the documented default.
pub const DEFAULT_URL_REGEX: &str =
    r"(?i)(https?|ftp|file)://[\w\-_.~:/?#\[\]@!$&'()*+,;=%]+";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct UrlClickConfig {
    /// Opener command; receives the URL as its single argument.
    pub opener: String,
    /// URL pattern. Compiled by the module; invalid patterns fall back
    /// to [`DEFAULT_URL_REGEX`] with a warning.
    pub regex: String,
}

impl Default for UrlClickConfig {
    fn default() -> Self {
        UrlClickConfig {
            opener: "xdg-open".into(),
            regex: DEFAULT_URL_REGEX.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WebviewAuth {
    #[default]
    None,
    Token,
    Password,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct WebviewConfig {
    pub host: String,
    pub port: u16,
    pub read_only: bool,
    pub auth: WebviewAuth,
    pub token: Option<String>,
    pub password: Option<String>,
    /// Push interval in milliseconds (16..=1000).
    pub update_interval: u32,
    /// Concurrent clients (1..=100).
    pub max_clients: u32,
}

impl Default for WebviewConfig {
    fn default() -> Self {
        WebviewConfig {
            host: "127.0.0.1".into(),
            port: 7681,
            read_only: true,
            auth: WebviewAuth::None,
            token: None,
            password: None,
            update_interval: 50,
            max_clients: 10,
        }
    }
}

impl WebviewConfig {
    fn sanitize(&mut self) {
        self.update_interval =
            clamp_warn("webview", "update_interval", self.update_interval, 16, 1000);
        self.max_clients = clamp_warn("webview", "max_clients", self.max_clients, 1, 100);
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParserConfig {
    /// OSC / DCS payload cap in bytes; longer strings are truncated.
    pub osc_max_bytes: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig { osc_max_bytes: 4096 }
    }
}

/// The whole configuration, one section per consumer.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub scrollback: ScrollbackConfig,
    pub osc52: Osc52Config,
    pub dyncolors: DynColorsConfig,
    pub ligatures: LigaturesConfig,
    pub kbselect: KbSelectConfig,
    pub urlclick: UrlClickConfig,
    pub webview: WebviewConfig,
    pub parser: ParserConfig,
}

impl Config {
    /// Parse a TOML string, clamping out-of-range values. A parse
    /// error logs a warning and yields the defaults: a broken config
    /// must never take the terminal down.
    pub fn from_toml(content: &str) -> Config {
        let mut config = match toml::from_str::<Config>(content) {
            Ok(config) => config,
            Err(err) => {
                warn!(target: "config", %err, "config parse failed, using defaults");
                Config::default()
            }
        };
        config.sanitize();
        config
    }

    /// Load from a path; a missing file is not an error.
    pub fn load(path: &Path) -> Result<Config> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Config::from_toml(&content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn sanitize(&mut self) {
        self.scrollback.sanitize();
        self.ligatures.sanitize();
        self.webview.sanitize();
    }
}
