//! OSC 52 clipboard integration.
//!
//! Wire format: `OSC 52 ; <sel> ; <base64|?> ST` where `<sel>` is one
//! of `c p s 0` (`c`/`s` select the clipboard, `p`/`0` the primary
//! selection). Writes store the decoded payload and, when a copy
//! command is configured, pipe it to that command's stdin. Reads
//! (`?`) are opt-in and answer with the stored payload re-encoded.
//!
//! Every `52;…` payload is consumed, including ones rejected by
//! policy: a disabled clipboard must not leak the payload to other
//! handlers or the parser.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use core_config::{Config, Osc52Config};
use core_module::{Disposition, EscapeHandler, EscapeKind, Module, ModuleCtx};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    Clipboard,
    Primary,
}

impl Selection {
    fn from_byte(b: u8) -> Option<Selection> {
        match b {
            b'c' | b's' => Some(Selection::Clipboard),
            b'p' | b'0' => Some(Selection::Primary),
            _ => None,
        }
    }

    fn reply_tag(self) -> &'static str {
        match self {
            Selection::Clipboard => "c",
            Selection::Primary => "p",
        }
    }
}

pub struct Osc52Module {
    config: Osc52Config,
    clipboard: Vec<u8>,
    primary: Vec<u8>,
}

impl Default for Osc52Module {
    fn default() -> Self {
        Osc52Module::new()
    }
}

impl Osc52Module {
    pub fn new() -> Osc52Module {
        Osc52Module {
            config: Osc52Config::default(),
            clipboard: Vec::new(),
            primary: Vec::new(),
        }
    }

    pub fn selection(&self, which: Selection) -> &[u8] {
        match which {
            Selection::Clipboard => &self.clipboard,
            Selection::Primary => &self.primary,
        }
    }

    fn store(&mut self, which: Selection, payload: Vec<u8>) {
        if let Some(command) = self.config.copy_command.clone() {
            spawn_copy_helper(&command, &payload);
        }
        match which {
            Selection::Clipboard => self.clipboard = payload,
            Selection::Primary => self.primary = payload,
        }
    }

    fn handle(&mut self, payload: &[u8], ctx: &mut ModuleCtx<'_>) {
        // payload = "52;<sel>;<data>"
        let mut parts = payload.splitn(3, |&b| b == b';');
        let _number = parts.next();
        let sel_field = parts.next().unwrap_or_default();
        let Some(data) = parts.next() else {
            debug!(target: "module.osc52", "payload without data field");
            return;
        };
        // The first recognized selector wins; an empty field means
        // the clipboard.
        let selection = sel_field
            .iter()
            .find_map(|&b| Selection::from_byte(b))
            .unwrap_or(Selection::Clipboard);

        if data == b"?" {
            if !self.config.allow_read {
                debug!(target: "module.osc52", "read query refused by policy");
                return;
            }
            let encoded = BASE64.encode(self.selection(selection));
            let reply = format!("\x1b]52;{};{}\x1b\\", selection.reply_tag(), encoded);
            ctx.signals.emit_response(reply.as_bytes());
            return;
        }

        if !self.config.allow_write {
            debug!(target: "module.osc52", "write refused by policy");
            return;
        }
        let decoded = match BASE64.decode(data) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(target: "module.osc52", %err, "undecodable payload dropped");
                return;
            }
        };
        if decoded.len() > self.config.max_bytes {
            warn!(
                target: "module.osc52",
                size = decoded.len(),
                max = self.config.max_bytes,
                "payload over size bound dropped"
            );
            return;
        }
        self.store(selection, decoded);
    }
}

/// Pipe the payload to an external helper (xclip-style). The child
/// owns its stdin; we write, close, and do not wait.
fn spawn_copy_helper(command: &str, payload: &[u8]) {
    let spawned = Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    match spawned {
        Ok(mut child) => {
            if let Some(mut stdin) = child.stdin.take()
                && let Err(err) = stdin.write_all(payload)
            {
                warn!(target: "module.osc52", %err, "copy helper rejected payload");
            }
        }
        Err(err) => warn!(target: "module.osc52", command, %err, "copy helper spawn failed"),
    }
}

impl Module for Osc52Module {
    fn name(&self) -> &'static str {
        "osc52"
    }

    fn configure(&mut self, config: &Config) {
        self.config = config.osc52.clone();
    }

    fn as_escape_handler(&mut self) -> Option<&mut dyn EscapeHandler> {
        Some(self)
    }
}

impl EscapeHandler for Osc52Module {
    fn handle_escape(
        &mut self,
        kind: EscapeKind,
        payload: &[u8],
        ctx: &mut ModuleCtx<'_>,
    ) -> anyhow::Result<Disposition> {
        if kind != EscapeKind::Osc || !payload.starts_with(b"52;") {
            return Ok(Disposition::Pass);
        }
        self.handle(payload, ctx);
        Ok(Disposition::Consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_color::ColorScheme;
    use core_events::Signals;
    use core_screen::Screen;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Fixture {
        screen: Screen,
        colors: ColorScheme,
        signals: Signals,
        responses: Rc<RefCell<Vec<u8>>>,
    }

    impl Fixture {
        fn new() -> Fixture {
            let mut signals = Signals::new();
            let responses = Rc::new(RefCell::new(Vec::new()));
            let sink = responses.clone();
            signals.connect_response(move |b| sink.borrow_mut().extend_from_slice(b));
            Fixture {
                screen: Screen::new(10, 4),
                colors: ColorScheme::new(),
                signals,
                responses,
            }
        }

        fn dispatch(&mut self, module: &mut Osc52Module, payload: &[u8]) -> Disposition {
            let mut ctx = ModuleCtx {
                screen: &mut self.screen,
                colors: &mut self.colors,
                signals: &mut self.signals,
            };
            module
                .handle_escape(EscapeKind::Osc, payload, &mut ctx)
                .unwrap()
        }
    }

    #[test]
    fn write_stores_decoded_payload() {
        let mut m = Osc52Module::new();
        let mut fx = Fixture::new();
        let d = fx.dispatch(&mut m, b"52;c;aGVsbG8="); // "hello"
        assert_eq!(d, Disposition::Consumed);
        assert_eq!(m.selection(Selection::Clipboard), b"hello");
        assert!(m.selection(Selection::Primary).is_empty());
    }

    #[test]
    fn selector_mapping() {
        let mut m = Osc52Module::new();
        let mut fx = Fixture::new();
        fx.dispatch(&mut m, b"52;p;cHJpbWFyeQ=="); // "primary"
        assert_eq!(m.selection(Selection::Primary), b"primary");
        fx.dispatch(&mut m, b"52;s;c2Vj"); // "sec" via s -> clipboard
        assert_eq!(m.selection(Selection::Clipboard), b"sec");
        fx.dispatch(&mut m, b"52;0;emVybw=="); // "zero" via 0 -> primary
        assert_eq!(m.selection(Selection::Primary), b"zero");
    }

    #[test]
    fn read_is_opt_in() {
        let mut m = Osc52Module::new();
        let mut fx = Fixture::new();
        fx.dispatch(&mut m, b"52;c;aGVsbG8=");
        // default policy: no reads
        let d = fx.dispatch(&mut m, b"52;c;?");
        assert_eq!(d, Disposition::Consumed);
        assert!(fx.responses.borrow().is_empty());

        let mut config = Config::default();
        config.osc52.allow_read = true;
        m.configure(&config);
        fx.dispatch(&mut m, b"52;c;?");
        assert_eq!(&*fx.responses.borrow(), b"\x1b]52;c;aGVsbG8=\x1b\\");
    }

    #[test]
    fn oversized_and_garbage_payloads_are_dropped() {
        let mut m = Osc52Module::new();
        let mut config = Config::default();
        config.osc52.max_bytes = 4;
        m.configure(&config);
        let mut fx = Fixture::new();
        // decodes to 5 bytes, over the bound
        let d = fx.dispatch(&mut m, b"52;c;aGVsbG8=");
        assert_eq!(d, Disposition::Consumed);
        assert!(m.selection(Selection::Clipboard).is_empty());
        // not base64 at all
        fx.dispatch(&mut m, b"52;c;!!!");
        assert!(m.selection(Selection::Clipboard).is_empty());
    }

    #[test]
    fn write_policy_blocks_storage() {
        let mut m = Osc52Module::new();
        let mut config = Config::default();
        config.osc52.allow_write = false;
        m.configure(&config);
        let mut fx = Fixture::new();
        let d = fx.dispatch(&mut m, b"52;c;aGVsbG8=");
        // still consumed so nothing else sees the payload
        assert_eq!(d, Disposition::Consumed);
        assert!(m.selection(Selection::Clipboard).is_empty());
    }

    #[test]
    fn unrelated_oscs_pass() {
        let mut m = Osc52Module::new();
        let mut fx = Fixture::new();
        assert_eq!(fx.dispatch(&mut m, b"4;1;#ff0000"), Disposition::Pass);
        let mut ctx = ModuleCtx {
            screen: &mut fx.screen,
            colors: &mut fx.colors,
            signals: &mut fx.signals,
        };
        let d = m
            .handle_escape(EscapeKind::Dcs, b"52;c;aGVsbG8=", &mut ctx)
            .unwrap();
        assert_eq!(d, Disposition::Pass);
    }
}
