//! `vte::Perform` implementation: the seam between the state machine
//! and the cell model.

use crate::charset::Charset;
use crate::csi;
use crate::{Executor, Host, TermMode};
use core_cell::Line;
use core_module::{Disposition, EscapeKind, ModuleCtx};
use tracing::{debug, trace};

/// Device attributes: VT102 class.
pub(crate) const DA_RESPONSE: &[u8] = b"\x1b[?6c";

pub(crate) struct Performer<'a, 'b> {
    pub exec: &'a mut Executor,
    pub host: &'a mut Host<'b>,
}

impl Performer<'_, '_> {
    /// Print path shared by ordinary output and REP: charset mapping,
    /// wrap/insert handling, eviction fan-out, last-rune tracking.
    pub(crate) fn print_rune(&mut self, c: char) {
        let mapped = self.exec.charsets[self.exec.active_charset].map(c);
        let evicted = self.host.screen.put_char(
            mapped,
            self.exec.modes.contains(TermMode::WRAP),
            self.exec.modes.contains(TermMode::INSERT),
        );
        self.forward_evictions(evicted);
        self.exec.last_printed = Some(mapped);
    }

    /// Hand scrolled-out rows to eviction sinks and the signal before
    /// they are dropped.
    pub(crate) fn forward_evictions(&mut self, evicted: Vec<Line>) {
        for line in evicted {
            let cols = line.len();
            self.host.signals.emit_line_scrolled_out(&line, cols);
            self.host.modules.dispatch_eviction(&line, cols);
        }
    }

    /// Offer a string payload to escape-handler modules.
    fn offer_to_modules(&mut self, kind: EscapeKind, payload: &[u8]) -> Disposition {
        let mut ctx = ModuleCtx {
            screen: &mut *self.host.screen,
            colors: &mut *self.host.colors,
            signals: &mut *self.host.signals,
        };
        self.host.modules.dispatch_escape(kind, payload, &mut ctx)
    }

    fn set_titles(&mut self, osc_number: u8, body: String) {
        let changed = match osc_number {
            0 => {
                self.exec.icon_title = body.clone();
                self.exec.title = body;
                true
            }
            1 => {
                self.exec.icon_title = body;
                false
            }
            _ => {
                self.exec.title = body;
                true
            }
        };
        if changed {
            let title = self.exec.title.clone();
            self.host.signals.emit_title_changed(&title);
        }
    }
}

impl vte::Perform for Performer<'_, '_> {
    fn print(&mut self, c: char) {
        self.print_rune(c);
    }

    fn execute(&mut self, byte: u8) {
        let screen = &mut *self.host.screen;
        let cursor = *screen.cursor();
        match byte {
            0x07 => self.host.signals.emit_bell(),
            0x08 => screen.move_to(cursor.x.saturating_sub(1), cursor.y),
            0x09 => {
                let next = screen.next_tab(cursor.x);
                screen.move_to(next, cursor.y);
            }
            0x0a..=0x0c => {
                let first_col = self.exec.modes.contains(TermMode::LINE_FEED_CR);
                let evicted = screen.newline(first_col);
                self.forward_evictions(evicted);
            }
            0x0d => screen.move_to(0, cursor.y),
            0x0e => self.exec.active_charset = 1,
            0x0f => self.exec.active_charset = 0,
            _ => trace!(target: "parser.exec", byte, "unhandled control"),
        }
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], ignore: bool, byte: u8) {
        if ignore {
            debug!(target: "parser.esc", byte, "dropping malformed escape");
            return;
        }
        match (intermediates.first().copied(), byte) {
            (Some(b'#'), b'8') => self.host.screen.fill_test_pattern(),
            (Some(b'('), b) => self.exec.charsets[0] = Charset::from_designator(b),
            (Some(b')'), b) => self.exec.charsets[1] = Charset::from_designator(b),
            (Some(b'*'), b) => self.exec.charsets[2] = Charset::from_designator(b),
            (Some(b'+'), b) => self.exec.charsets[3] = Charset::from_designator(b),
            (Some(_), _) => {
                debug!(target: "parser.esc", byte, "unhandled intermediate escape");
            }
            (None, b'7') => {
                let charset = self.exec.active_charset;
                self.host.screen.save_cursor(charset);
            }
            (None, b'8') => {
                self.exec.active_charset = self.host.screen.restore_cursor();
            }
            (None, b'D') => {
                let evicted = self.host.screen.newline(false);
                self.forward_evictions(evicted);
            }
            (None, b'E') => {
                let evicted = self.host.screen.newline(true);
                self.forward_evictions(evicted);
            }
            (None, b'H') => {
                let x = self.host.screen.cursor().x;
                self.host.screen.set_tab(x);
            }
            (None, b'M') => self.host.screen.reverse_index(),
            (None, b'Z') => self.host.signals.emit_response(DA_RESPONSE),
            (None, b'c') => {
                // RIS: grid, executor, and dynamic colors all reset.
                self.host.screen.reset();
                self.exec.reset();
                self.host.colors.reset_all();
            }
            (None, b'\\') => {} // ST; string termination is the machine's job
            (None, _) => debug!(target: "parser.esc", byte, "unhandled escape"),
        }
    }

    fn csi_dispatch(
        &mut self,
        params: &vte::Params,
        intermediates: &[u8],
        ignore: bool,
        action: char,
    ) {
        if ignore {
            debug!(target: "parser.csi", %action, "dropping malformed sequence");
            return;
        }
        csi::dispatch(self, params, intermediates, action);
    }

    fn osc_dispatch(&mut self, params: &[&[u8]], _bell_terminated: bool) {
        if params.is_empty() {
            return;
        }
        // Rebuild the raw payload with semicolons intact: module
        // consumers parse it themselves.
        let mut raw = Vec::new();
        for (i, part) in params.iter().enumerate() {
            if i > 0 {
                raw.push(b';');
            }
            raw.extend_from_slice(part);
        }
        raw.truncate(self.exec.osc_max_bytes);

        if self.offer_to_modules(EscapeKind::Osc, &raw) == Disposition::Consumed {
            return;
        }

        let number = std::str::from_utf8(params[0]).ok().and_then(|s| s.parse::<u8>().ok());
        match number {
            Some(number @ 0..=2) => {
                let body = match params.get(1..) {
                    Some(rest) if !rest.is_empty() => {
                        let joined = rest.join(&b';');
                        String::from_utf8_lossy(&joined).into_owned()
                    }
                    _ => String::new(),
                };
                self.set_titles(number, body);
            }
            _ => {
                debug!(
                    target: "parser.osc",
                    number = %String::from_utf8_lossy(params[0]),
                    "unclaimed osc dropped"
                );
            }
        }
    }

    fn hook(&mut self, params: &vte::Params, intermediates: &[u8], ignore: bool, action: char) {
        if ignore {
            self.exec.dcs = None;
            return;
        }
        // Reconstruct the introducer portion so modules see the
        // payload the way it went over the wire.
        let mut buf = Vec::new();
        for (i, group) in params.iter().enumerate() {
            if i > 0 {
                buf.push(b';');
            }
            for (j, sub) in group.iter().enumerate() {
                if j > 0 {
                    buf.push(b':');
                }
                buf.extend_from_slice(sub.to_string().as_bytes());
            }
        }
        buf.extend_from_slice(intermediates);
        let mut encoded = [0u8; 4];
        buf.extend_from_slice(action.encode_utf8(&mut encoded).as_bytes());
        self.exec.dcs = Some(buf);
    }

    fn put(&mut self, byte: u8) {
        if let Some(buf) = &mut self.exec.dcs
            && buf.len() < self.exec.osc_max_bytes
        {
            buf.push(byte);
        }
    }

    fn unhook(&mut self) {
        if let Some(payload) = self.exec.dcs.take()
            && self.offer_to_modules(EscapeKind::Dcs, &payload) == Disposition::Pass
        {
            debug!(target: "parser.dcs", len = payload.len(), "unclaimed dcs dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::Harness;

    #[test]
    fn bel_rings_and_bs_moves_back() {
        let mut h = Harness::new(10, 2);
        let rang = std::rc::Rc::new(std::cell::Cell::new(false));
        let flag = rang.clone();
        h.signals.connect_bell(move || flag.set(true));
        h.write(b"ab\x07\x08x");
        assert!(rang.get());
        // BS moved from column 2 to 1, 'x' overwrote 'b'
        assert_eq!(h.row(0), "ax        ");
    }

    #[test]
    fn tab_advances_to_stop() {
        let mut h = Harness::new(20, 2);
        h.write(b"a\tb");
        assert_eq!(h.screen.get_glyph(8, 0).rune, 'b');
    }

    #[test]
    fn charset_so_si_switching() {
        let mut h = Harness::new(10, 2);
        // designate G1 as graphics, SO to select it, SI back
        h.write(b"\x1b)0\x0eq\x0fq");
        assert_eq!(h.screen.get_glyph(0, 0).rune, '─');
        assert_eq!(h.screen.get_glyph(1, 0).rune, 'q');
    }

    #[test]
    fn dec_graphics_via_g0() {
        let mut h = Harness::new(10, 2);
        h.write(b"\x1b(0lqk\x1b(B");
        assert_eq!(h.row(0), "┌─┐       ");
    }

    #[test]
    fn osc_sets_window_and_icon_title() {
        let mut h = Harness::new(10, 2);
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = seen.clone();
        h.signals
            .connect_title_changed(move |t| sink.borrow_mut().push(t.to_owned()));
        h.write(b"\x1b]2;hello world\x07");
        assert_eq!(h.vt.title(), "hello world");
        h.write(b"\x1b]1;icon only\x1b\\");
        assert_eq!(h.vt.icon_title(), "icon only");
        assert_eq!(h.vt.title(), "hello world");
        h.write(b"\x1b]0;both;with;semis\x07");
        assert_eq!(h.vt.title(), "both;with;semis");
        assert_eq!(h.vt.icon_title(), "both;with;semis");
        assert_eq!(*seen.borrow(), vec!["hello world", "both;with;semis"]);
    }

    #[test]
    fn decaln_fills_with_e() {
        let mut h = Harness::new(4, 2);
        h.write(b"\x1b#8");
        assert_eq!(h.row(0), "EEEE");
        assert_eq!(h.row(1), "EEEE");
        assert_eq!(h.cursor(), (0, 0));
    }

    #[test]
    fn nel_and_ind_feed_lines() {
        let mut h = Harness::new(6, 3);
        h.write(b"ab\x1bDc\x1bEd");
        // IND: down, same column; NEL: down, column 0
        assert_eq!(h.row(0), "ab    ");
        assert_eq!(h.row(1), "  c   ");
        assert_eq!(h.row(2), "d     ");
    }

    #[test]
    fn ris_resets_grid_and_modes() {
        let mut h = Harness::new(6, 3);
        h.write(b"\x1b[?2004habc\x1bc");
        assert_eq!(h.row(0), "      ");
        assert_eq!(h.cursor(), (0, 0));
        assert!(!h.vt.modes().contains(crate::TermMode::BRACKETED_PASTE));
    }

    #[test]
    fn hts_sets_custom_stop() {
        let mut h = Harness::new(20, 2);
        h.write(b"\x1b[3G\x1bH\x1b[G\tz");
        // custom stop at column 2 (0-based)
        assert_eq!(h.screen.get_glyph(2, 0).rune, 'z');
    }

    use core_module::{Disposition, EscapeHandler, EscapeKind, Module, ModuleCtx};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every offered string payload; optionally claims OSCs
    /// with a matching prefix.
    struct StringTap {
        claim_prefix: Option<&'static [u8]>,
        seen: Rc<RefCell<Vec<(EscapeKind, Vec<u8>)>>>,
    }

    impl Module for StringTap {
        fn name(&self) -> &'static str {
            "string-tap"
        }
        fn as_escape_handler(&mut self) -> Option<&mut dyn EscapeHandler> {
            Some(self)
        }
    }

    impl EscapeHandler for StringTap {
        fn handle_escape(
            &mut self,
            kind: EscapeKind,
            payload: &[u8],
            _ctx: &mut ModuleCtx<'_>,
        ) -> anyhow::Result<Disposition> {
            self.seen.borrow_mut().push((kind, payload.to_vec()));
            match self.claim_prefix {
                Some(prefix) if payload.starts_with(prefix) => Ok(Disposition::Consumed),
                _ => Ok(Disposition::Pass),
            }
        }
    }

    #[test]
    fn osc_payload_is_offered_to_modules_before_native_handling() {
        let mut h = Harness::new(10, 2);
        let seen = Rc::new(RefCell::new(Vec::new()));
        h.modules.load(Box::new(StringTap {
            claim_prefix: Some(b"0;"),
            seen: seen.clone(),
        }));
        h.modules.activate_all();

        // claimed: the native title handler must not run
        h.write(b"\x1b]0;grabbed\x07");
        assert_eq!(h.vt.title(), "");
        // passed through: native handling applies
        h.write(b"\x1b]2;kept;intact\x07");
        assert_eq!(h.vt.title(), "kept;intact");

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], (EscapeKind::Osc, b"0;grabbed".to_vec()));
        // semicolons reach the module unsplit
        assert_eq!(seen[1], (EscapeKind::Osc, b"2;kept;intact".to_vec()));
    }

    #[test]
    fn dcs_payload_reaches_modules_on_terminator() {
        let mut h = Harness::new(10, 2);
        let seen = Rc::new(RefCell::new(Vec::new()));
        h.modules.load(Box::new(StringTap {
            claim_prefix: None,
            seen: seen.clone(),
        }));
        h.modules.activate_all();

        h.write(b"\x1bP1;2qdata bytes\x1b\\");
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, EscapeKind::Dcs);
        assert_eq!(seen[0].1, b"1;2qdata bytes".to_vec());
    }
}
