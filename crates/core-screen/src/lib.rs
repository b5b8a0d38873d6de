//! The screen buffer: primary and alternate grids, the live cursor,
//! the scroll region, and tab stops.
//!
//! Invariants maintained here:
//! * A `WIDE` glyph at column `c` always has a `WDUMMY` partner at
//!   `c + 1` (when `c + 1 < cols`); overwriting either half of a pair
//!   repairs the orphaned half.
//! * `0 <= top <= bot < rows` for the scroll region at all times.
//! * The cursor is always inside the grid; `WRAPNEXT` defers the wrap
//!   instead of letting `x` reach `cols`.
//!
//! Scrolling never calls out. Operations that can discard the top line
//! of the full primary screen return the discarded rows so the caller
//! (the escape executor) can fan them out to the scrollback module and
//! the `line-scrolled-out` signal before they are dropped.

mod cursor;

pub use cursor::{Cursor, CursorFlags, CursorShape, Pen, SavedCursor};

use core_cell::{Glyph, GlyphAttr, Line, rune_width};

const TAB_INTERVAL: usize = 8;

#[derive(Debug)]
pub struct Screen {
    cols: usize,
    rows: usize,
    primary: Vec<Line>,
    alternate: Vec<Line>,
    alt_active: bool,
    cursor: Cursor,
    /// Saved cursors, indexed primary = 0, alternate = 1.
    saved: [SavedCursor; 2],
    /// Scroll region, 0-based inclusive.
    top: usize,
    bot: usize,
    tabs: Vec<bool>,
}

impl Screen {
    /// Dimensions are clamped to at least 1x1; the public terminal
    /// constructor rejects zero sizes before getting here.
    pub fn new(cols: usize, rows: usize) -> Screen {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Screen {
            cols,
            rows,
            primary: (0..rows).map(|_| Line::new(cols)).collect(),
            alternate: (0..rows).map(|_| Line::new(cols)).collect(),
            alt_active: false,
            cursor: Cursor::default(),
            saved: [SavedCursor::default(); 2],
            top: 0,
            bot: rows - 1,
            tabs: default_tabs(cols),
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_altscreen(&self) -> bool {
        self.alt_active
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    pub fn pen(&self) -> &Pen {
        &self.cursor.pen
    }

    pub fn pen_mut(&mut self) -> &mut Pen {
        &mut self.cursor.pen
    }

    pub fn scroll_region(&self) -> (usize, usize) {
        (self.top, self.bot)
    }

    pub fn line(&self, y: usize) -> Option<&Line> {
        self.grid().get(y)
    }

    pub fn line_mut(&mut self, y: usize) -> Option<&mut Line> {
        self.grid_mut().get_mut(y)
    }

    /// Always well-formed for in-range coordinates; out-of-range reads
    /// resolve to the empty glyph rather than a panic.
    pub fn get_glyph(&self, x: usize, y: usize) -> Glyph {
        self.grid()
            .get(y)
            .and_then(|l| l.get_glyph(x))
            .copied()
            .unwrap_or(Glyph::EMPTY)
    }

    fn grid(&self) -> &Vec<Line> {
        if self.alt_active { &self.alternate } else { &self.primary }
    }

    fn grid_mut(&mut self) -> &mut Vec<Line> {
        if self.alt_active {
            &mut self.alternate
        } else {
            &mut self.primary
        }
    }

    /// Erase template: a space carrying the pen's colors so cleared
    /// areas keep the current background.
    fn erase_glyph(&self) -> Glyph {
        Glyph::new(
            ' ',
            GlyphAttr::empty(),
            self.cursor.pen.fg,
            self.cursor.pen.bg,
        )
    }

    fn sync_glyph_under(&mut self) {
        self.cursor.glyph_under = self.get_glyph(self.cursor.x, self.cursor.y);
    }

    /// Re-establish wide pairing after an operation that shifted or
    /// blanked arbitrary cells (ICH, DCH, partial erases). A `WIDE`
    /// cell whose partner is gone becomes a blank; a stray `WDUMMY`
    /// likewise. A `WIDE` in the last column is legal (truncated
    /// pair).
    fn repair_pairs(&mut self, y: usize) {
        let cols = self.cols;
        let Some(line) = self.grid_mut().get_mut(y) else {
            return;
        };
        for x in 0..cols {
            let Some(&cell) = line.get_glyph(x) else {
                break;
            };
            let orphan_wide = cell.is_wide()
                && x + 1 < cols
                && line.get_glyph(x + 1).is_some_and(|g| !g.is_dummy());
            let orphan_dummy = cell.is_dummy()
                && (x == 0 || line.get_glyph(x - 1).is_some_and(|g| !g.is_wide()));
            if orphan_wide || orphan_dummy {
                if let Some(c) = line.get_glyph_mut(x) {
                    c.rune = ' ';
                    c.clear_attr(GlyphAttr::WIDE | GlyphAttr::WDUMMY);
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // Writing
    // ---------------------------------------------------------------

    /// Write one glyph, repairing wide pairs that the write splits.
    pub fn set_glyph(&mut self, x: usize, y: usize, glyph: Glyph) {
        let cols = self.cols;
        let Some(line) = self.grid_mut().get_mut(y) else {
            return;
        };
        let Some(&old) = line.get_glyph(x) else {
            return;
        };
        if old.is_wide() && x + 1 < cols {
            // orphaned right half
            if let Some(right) = line.get_glyph_mut(x + 1) {
                right.rune = ' ';
                right.clear_attr(GlyphAttr::WDUMMY);
            }
        } else if old.is_dummy() && x > 0 {
            // orphaned left half
            if let Some(left) = line.get_glyph_mut(x - 1) {
                left.rune = ' ';
                left.clear_attr(GlyphAttr::WIDE);
            }
        }
        line.set_glyph(x, glyph);
    }

    /// Place a printable rune at the cursor with the current pen,
    /// honoring the deferred-wrap latch, auto-wrap, insert mode, and
    /// wide-character pairing. Returns any rows scrolled out.
    pub fn put_char(&mut self, rune: char, autowrap: bool, insert: bool) -> Vec<Line> {
        let mut evicted = Vec::new();
        let width = rune_width(rune);
        if width == 0 {
            // Combining marks are not composed into cells.
            return evicted;
        }
        if width == 2 && self.cols < 2 {
            return evicted;
        }

        if self.cursor.wrap_pending() {
            self.cursor.clear_wrap();
            if autowrap {
                evicted.extend(self.newline(true));
                // the row we landed on is a soft continuation
                if let Some(line) = self.line_mut_at_cursor() {
                    line.set_wrapped(true);
                }
            }
        }

        // A wide rune that no longer fits wraps (or clamps) first.
        if width == 2 && self.cursor.x + 2 > self.cols {
            if autowrap {
                evicted.extend(self.newline(true));
                if let Some(line) = self.line_mut_at_cursor() {
                    line.set_wrapped(true);
                }
            } else {
                self.cursor.x = self.cols - 2;
            }
        }

        let (x, y) = (self.cursor.x, self.cursor.y);
        if insert {
            if let Some(line) = self.grid_mut().get_mut(y) {
                line.insert_blanks(x, width);
            }
            self.repair_pairs(y);
        }

        let pen = self.cursor.pen;
        let mut glyph = Glyph::new(rune, pen.attr, pen.fg, pen.bg);
        if width == 2 {
            glyph.set_attr(GlyphAttr::WIDE);
            self.set_glyph(x, y, glyph);
            let dummy = Glyph::new(' ', pen.attr | GlyphAttr::WDUMMY, pen.fg, pen.bg);
            self.set_glyph(x + 1, y, dummy);
        } else {
            self.set_glyph(x, y, glyph);
        }

        if x + width < self.cols {
            self.cursor.x = x + width;
        } else {
            self.cursor.flags.insert(CursorFlags::WRAPNEXT);
        }
        self.sync_glyph_under();
        evicted
    }

    fn line_mut_at_cursor(&mut self) -> Option<&mut Line> {
        let y = self.cursor.y;
        self.grid_mut().get_mut(y)
    }

    // ---------------------------------------------------------------
    // Cursor motion
    // ---------------------------------------------------------------

    /// Clamp-move. Origin mode restricts `y` to the scroll region.
    /// Any explicit motion consumes the wrap latch.
    pub fn move_to(&mut self, x: usize, y: usize) {
        let (min_y, max_y) = if self.cursor.origin_mode() {
            (self.top, self.bot)
        } else {
            (0, self.rows - 1)
        };
        self.cursor.x = x.min(self.cols - 1);
        self.cursor.y = y.clamp(min_y, max_y);
        self.cursor.clear_wrap();
        self.sync_glyph_under();
    }

    /// Region-relative move (CUP/VPA when origin mode is on).
    pub fn move_to_origin(&mut self, x: usize, y: usize) {
        let y = if self.cursor.origin_mode() {
            y + self.top
        } else {
            y
        };
        self.move_to(x, y);
    }

    /// LF within the region; scrolls at the region bottom. Returns any
    /// rows scrolled out.
    pub fn newline(&mut self, first_col: bool) -> Vec<Line> {
        let mut evicted = Vec::new();
        if self.cursor.y == self.bot {
            evicted = self.scroll_up(self.top, 1);
        } else if self.cursor.y + 1 < self.rows {
            self.cursor.y += 1;
        }
        if first_col {
            self.cursor.x = 0;
        }
        self.cursor.clear_wrap();
        self.sync_glyph_under();
        evicted
    }

    /// RI: move up; scrolls down at the region top.
    pub fn reverse_index(&mut self) {
        if self.cursor.y == self.top {
            self.scroll_down(self.top, 1);
        } else if self.cursor.y > 0 {
            self.cursor.y -= 1;
        }
        self.cursor.clear_wrap();
        self.sync_glyph_under();
    }

    // ---------------------------------------------------------------
    // Scrolling
    // ---------------------------------------------------------------

    /// Scroll `[orig, bot]` up by `n`. Rows discarded at `orig` are
    /// returned (owned copies) only when this discards the top of the
    /// full primary screen; sub-region and alternate scrolls evict
    /// nothing.
    pub fn scroll_up(&mut self, orig: usize, n: usize) -> Vec<Line> {
        let mut evicted = Vec::new();
        if orig > self.bot || n == 0 {
            return evicted;
        }
        let n = n.min(self.bot - orig + 1);
        let evicts =
            !self.alt_active && orig == 0 && self.top == 0 && self.bot == self.rows - 1;
        if evicts {
            evicted.extend(self.primary[..n].iter().cloned());
        }
        let erase = self.erase_glyph();
        let bot = self.bot;
        let grid = self.grid_mut();
        grid[orig..=bot].rotate_left(n);
        for line in &mut grid[bot + 1 - n..=bot] {
            line.fill_range(0, usize::MAX, erase);
            line.set_wrapped(false);
        }
        for line in &mut grid[orig..=bot] {
            line.mark_dirty();
        }
        self.sync_glyph_under();
        evicted
    }

    /// Scroll `[orig, bot]` down by `n`. Never evicts.
    pub fn scroll_down(&mut self, orig: usize, n: usize) {
        if orig > self.bot || n == 0 {
            return;
        }
        let n = n.min(self.bot - orig + 1);
        let erase = self.erase_glyph();
        let bot = self.bot;
        let grid = self.grid_mut();
        grid[orig..=bot].rotate_right(n);
        for line in &mut grid[orig..orig + n] {
            line.fill_range(0, usize::MAX, erase);
            line.set_wrapped(false);
        }
        for line in &mut grid[orig..=bot] {
            line.mark_dirty();
        }
        self.sync_glyph_under();
    }

    /// IL: blank lines pushed in at the cursor, region shifted down.
    /// Outside the scroll region this is a no-op.
    pub fn insert_blank_lines(&mut self, n: usize) {
        if self.cursor.y >= self.top && self.cursor.y <= self.bot {
            self.scroll_down(self.cursor.y, n);
        }
    }

    /// DL: lines deleted at the cursor, region shifted up. Returns any
    /// evicted rows (deleting row 0 with a full-screen region discards
    /// the top line of the screen).
    pub fn delete_lines(&mut self, n: usize) -> Vec<Line> {
        if self.cursor.y >= self.top && self.cursor.y <= self.bot {
            self.scroll_up(self.cursor.y, n)
        } else {
            Vec::new()
        }
    }

    // ---------------------------------------------------------------
    // Clearing
    // ---------------------------------------------------------------

    /// Fill an inclusive rectangle with the erase glyph. Coordinates
    /// are clamped and may be given in any order.
    pub fn clear_region(&mut self, x1: usize, y1: usize, x2: usize, y2: usize) {
        let (x1, x2) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let (y1, y2) = if y1 <= y2 { (y1, y2) } else { (y2, y1) };
        let x2 = x2.min(self.cols - 1);
        let y2 = y2.min(self.rows - 1);
        let erase = self.erase_glyph();
        for y in y1..=y2 {
            if let Some(line) = self.grid_mut().get_mut(y) {
                line.fill_range(x1, x2 + 1, erase);
                line.set_wrapped(false);
            }
            self.repair_pairs(y);
        }
        self.sync_glyph_under();
    }

    /// ECH: blank `n` cells at the cursor without shifting.
    pub fn erase_chars(&mut self, n: usize) {
        let (x, y) = (self.cursor.x, self.cursor.y);
        if n > 0 {
            self.clear_region(x, y, x + n - 1, y);
        }
    }

    /// DCH at the cursor.
    pub fn delete_chars(&mut self, n: usize) {
        let (x, y) = (self.cursor.x, self.cursor.y);
        if let Some(line) = self.grid_mut().get_mut(y) {
            line.delete_chars(x, n);
        }
        self.repair_pairs(y);
        self.sync_glyph_under();
    }

    /// ICH at the cursor.
    pub fn insert_blanks(&mut self, n: usize) {
        let (x, y) = (self.cursor.x, self.cursor.y);
        if let Some(line) = self.grid_mut().get_mut(y) {
            line.insert_blanks(x, n);
        }
        self.repair_pairs(y);
        self.sync_glyph_under();
    }

    /// DECALN: fill with `E`, home the cursor.
    pub fn fill_test_pattern(&mut self) {
        let glyph = Glyph::new('E', GlyphAttr::empty(), self.cursor.pen.fg, self.cursor.pen.bg);
        for line in self.grid_mut() {
            line.fill_range(0, usize::MAX, glyph);
        }
        self.cursor.x = 0;
        self.cursor.y = 0;
        self.cursor.clear_wrap();
        self.sync_glyph_under();
    }

    // ---------------------------------------------------------------
    // Scroll region
    // ---------------------------------------------------------------

    /// DECSTBM. Out-of-range or inverted bounds reset to full screen;
    /// a region needs at least two rows.
    pub fn set_scroll_region(&mut self, top: usize, bot: usize) {
        let bot = bot.min(self.rows - 1);
        if top < bot {
            self.top = top;
            self.bot = bot;
        } else {
            self.top = 0;
            self.bot = self.rows - 1;
        }
    }

    // ---------------------------------------------------------------
    // Saved cursors and buffer switching
    // ---------------------------------------------------------------

    fn saved_slot(&self) -> usize {
        usize::from(self.alt_active)
    }

    /// DECSC. `charset` is the executor's active charset slot, stored
    /// alongside so restore can hand it back.
    pub fn save_cursor(&mut self, charset: usize) {
        let c = &self.cursor;
        self.saved[self.saved_slot()] = SavedCursor {
            x: c.x,
            y: c.y,
            shape: c.shape,
            flags: c.flags,
            pen: c.pen,
            charset,
        };
    }

    /// DECRC. Restores everything including the wrap latch and returns
    /// the saved charset slot.
    pub fn restore_cursor(&mut self) -> usize {
        let s = self.saved[self.saved_slot()];
        self.cursor.x = s.x.min(self.cols - 1);
        self.cursor.y = s.y.min(self.rows - 1);
        self.cursor.shape = s.shape;
        self.cursor.flags = s.flags;
        self.cursor.pen = s.pen;
        self.sync_glyph_under();
        s.charset
    }

    /// Switch to the alternate buffer (no clearing; the executor owns
    /// the 1049 choreography).
    pub fn activate_alternate(&mut self) {
        self.alt_active = true;
        self.mark_all_dirty();
        self.sync_glyph_under();
    }

    pub fn activate_primary(&mut self) {
        self.alt_active = false;
        self.mark_all_dirty();
        self.sync_glyph_under();
    }

    /// Blank the active buffer with the erase glyph.
    pub fn clear_active(&mut self) {
        let erase = self.erase_glyph();
        for line in self.grid_mut() {
            line.fill_range(0, usize::MAX, erase);
            line.set_wrapped(false);
        }
        self.sync_glyph_under();
    }

    // ---------------------------------------------------------------
    // Tab stops
    // ---------------------------------------------------------------

    pub fn set_tab(&mut self, col: usize) {
        if let Some(t) = self.tabs.get_mut(col) {
            *t = true;
        }
    }

    pub fn clear_tab(&mut self, col: usize) {
        if let Some(t) = self.tabs.get_mut(col) {
            *t = false;
        }
    }

    pub fn clear_all_tabs(&mut self) {
        self.tabs.iter_mut().for_each(|t| *t = false);
    }

    /// Next tab stop strictly right of `x`, else the last column.
    pub fn next_tab(&self, x: usize) -> usize {
        (x + 1..self.cols)
            .find(|&c| self.tabs[c])
            .unwrap_or(self.cols - 1)
    }

    /// Previous tab stop strictly left of `x`, else column 0.
    pub fn prev_tab(&self, x: usize) -> usize {
        (0..x).rev().find(|&c| self.tabs[c]).unwrap_or(0)
    }

    // ---------------------------------------------------------------
    // Resize and dirty tracking
    // ---------------------------------------------------------------

    /// Preserve glyphs at matching coordinates, truncate or pad the
    /// rest. Clamps the cursor, resets the scroll region, rebuilds tab
    /// stops, and dirties everything.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        let cols = cols.max(1);
        let rows = rows.max(1);
        for grid in [&mut self.primary, &mut self.alternate] {
            for line in grid.iter_mut() {
                line.resize(cols);
            }
            grid.resize_with(rows, || Line::new(cols));
        }
        self.cols = cols;
        self.rows = rows;
        self.top = 0;
        self.bot = rows - 1;
        self.cursor.x = self.cursor.x.min(cols - 1);
        self.cursor.y = self.cursor.y.min(rows - 1);
        for saved in &mut self.saved {
            saved.x = saved.x.min(cols - 1);
            saved.y = saved.y.min(rows - 1);
        }
        let mut tabs = default_tabs(cols);
        for (i, t) in self.tabs.iter().enumerate().take(cols.min(tabs.len())) {
            tabs[i] = *t;
        }
        self.tabs = tabs;
        self.mark_all_dirty();
        self.sync_glyph_under();
    }

    pub fn mark_dirty(&mut self, y: usize) {
        if let Some(line) = self.grid_mut().get_mut(y) {
            line.mark_dirty();
        }
    }

    pub fn mark_all_dirty(&mut self) {
        for line in self.grid_mut() {
            line.mark_dirty();
        }
    }

    /// Full reset of grid-side state: both buffers, region, cursor,
    /// tabs, saved cursors.
    pub fn reset(&mut self) {
        self.cursor = Cursor::default();
        self.saved = [SavedCursor::default(); 2];
        self.top = 0;
        self.bot = self.rows - 1;
        self.tabs = default_tabs(self.cols);
        self.alt_active = false;
        for grid in [&mut self.primary, &mut self.alternate] {
            for line in grid.iter_mut() {
                line.clear();
                line.set_wrapped(false);
            }
        }
        self.sync_glyph_under();
    }
}

fn default_tabs(cols: usize) -> Vec<bool> {
    (0..cols).map(|c| c > 0 && c % TAB_INTERVAL == 0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_str(screen: &mut Screen, s: &str) {
        for ch in s.chars() {
            screen.put_char(ch, true, false);
        }
    }

    fn row_text(screen: &Screen, y: usize) -> String {
        screen.line(y).unwrap().to_string()
    }

    #[test]
    fn put_advances_and_latches_at_last_column() {
        let mut s = Screen::new(4, 2);
        write_str(&mut s, "abc");
        assert_eq!(s.cursor().x, 3);
        assert!(!s.cursor().wrap_pending());
        s.put_char('d', true, false);
        // glyph placed in the last column, x not advanced
        assert_eq!(s.cursor().x, 3);
        assert!(s.cursor().wrap_pending());
        assert_eq!(row_text(&s, 0), "abcd");
        // next rune wraps first; the landing row is the continuation
        s.put_char('e', true, false);
        assert_eq!((s.cursor().x, s.cursor().y), (1, 1));
        assert_eq!(row_text(&s, 1), "e   ");
        assert!(!s.line(0).unwrap().is_wrapped());
        assert!(s.line(1).unwrap().is_wrapped());
    }

    #[test]
    fn wide_pairing_and_repair() {
        let mut s = Screen::new(6, 2);
        s.put_char('中', true, false);
        assert!(s.get_glyph(0, 0).is_wide());
        assert!(s.get_glyph(1, 0).is_dummy());
        assert_eq!(s.cursor().x, 2);
        // overwrite the dummy half: left half must be blanked
        s.set_glyph(
            1,
            0,
            Glyph::new('x', GlyphAttr::empty(), core_cell::Color::DEFAULT_FG, core_cell::Color::DEFAULT_BG),
        );
        assert!(!s.get_glyph(0, 0).is_wide());
        assert_eq!(s.get_glyph(0, 0).rune, ' ');
        assert_eq!(s.get_glyph(1, 0).rune, 'x');
    }

    #[test]
    fn wide_at_margin_wraps_whole_pair() {
        let mut s = Screen::new(5, 2);
        write_str(&mut s, "abcd");
        s.put_char('中', true, false);
        assert_eq!(row_text(&s, 1), "中   ");
        assert!(s.get_glyph(0, 1).is_wide());
        assert_eq!((s.cursor().x, s.cursor().y), (2, 1));
    }

    #[test]
    fn scroll_up_evicts_only_full_primary_region() {
        let mut s = Screen::new(4, 3);
        write_str(&mut s, "top");
        let evicted = s.scroll_up(0, 1);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].to_string(), "top ");
        assert_eq!(row_text(&s, 0), "    ");

        // sub-region scroll: no eviction
        s.set_scroll_region(0, 1);
        let evicted = s.scroll_up(0, 1);
        assert!(evicted.is_empty());

        // alternate screen: no eviction
        s.set_scroll_region(0, 2);
        s.activate_alternate();
        let evicted = s.scroll_up(0, 1);
        assert!(evicted.is_empty());
    }

    #[test]
    fn newline_scrolls_at_region_bottom_only() {
        let mut s = Screen::new(4, 4);
        s.set_scroll_region(1, 2);
        s.move_to(0, 2);
        write_str(&mut s, "mid");
        s.move_to(0, 2);
        let evicted = s.newline(true);
        assert!(evicted.is_empty());
        // row 2 content moved to row 1, cursor stays at region bottom
        assert_eq!(row_text(&s, 1), "mid ");
        assert_eq!(s.cursor().y, 2);
        // below the region, newline just walks down
        s.move_to(0, 3);
        s.newline(false);
        assert_eq!(s.cursor().y, 3);
    }

    #[test]
    fn reverse_index_scrolls_down_at_top() {
        let mut s = Screen::new(3, 3);
        write_str(&mut s, "abc");
        s.move_to(0, 0);
        s.reverse_index();
        assert_eq!(row_text(&s, 1), "abc");
        assert_eq!(row_text(&s, 0), "   ");
    }

    #[test]
    fn insert_delete_lines_respect_region() {
        let mut s = Screen::new(3, 4);
        for (y, row) in ["aaa", "bbb", "ccc", "ddd"].iter().enumerate() {
            s.move_to(0, y);
            write_str(&mut s, row);
        }
        s.set_scroll_region(1, 2);
        s.move_to(0, 1);
        s.insert_blank_lines(1);
        assert_eq!(row_text(&s, 1), "   ");
        assert_eq!(row_text(&s, 2), "bbb");
        assert_eq!(row_text(&s, 3), "ddd"); // untouched outside region

        let evicted = s.delete_lines(1);
        assert!(evicted.is_empty());
        assert_eq!(row_text(&s, 1), "bbb");
        assert_eq!(row_text(&s, 2), "   ");

        // outside the region: no-op
        s.move_to(0, 3);
        s.insert_blank_lines(1);
        assert_eq!(row_text(&s, 3), "ddd");
    }

    #[test]
    fn save_restore_round_trips_wrap_latch() {
        let mut s = Screen::new(3, 2);
        write_str(&mut s, "abc");
        assert!(s.cursor().wrap_pending());
        s.save_cursor(1);
        s.move_to(0, 1);
        assert!(!s.cursor().wrap_pending());
        let charset = s.restore_cursor();
        assert_eq!(charset, 1);
        assert!(s.cursor().wrap_pending());
        assert_eq!((s.cursor().x, s.cursor().y), (2, 0));
    }

    #[test]
    fn alternate_screen_keeps_primary_content() {
        let mut s = Screen::new(8, 2);
        write_str(&mut s, "primary");
        s.save_cursor(0);
        s.activate_alternate();
        s.clear_active();
        write_str(&mut s, "alt");
        assert!(s.is_altscreen());
        assert_eq!(row_text(&s, 0), "alt     ");
        s.activate_primary();
        s.restore_cursor();
        assert_eq!(row_text(&s, 0), "primary ");
        assert_eq!(s.cursor().x, 7);
    }

    #[test]
    fn origin_mode_clamps_to_region() {
        let mut s = Screen::new(10, 10);
        s.set_scroll_region(2, 6);
        s.cursor_mut().flags.insert(CursorFlags::ORIGIN);
        s.move_to_origin(0, 0);
        assert_eq!(s.cursor().y, 2);
        s.move_to_origin(0, 99);
        assert_eq!(s.cursor().y, 6);
    }

    #[test]
    fn tabs_default_and_custom() {
        let mut s = Screen::new(20, 2);
        assert_eq!(s.next_tab(0), 8);
        assert_eq!(s.next_tab(8), 16);
        assert_eq!(s.next_tab(17), 19);
        assert_eq!(s.prev_tab(9), 8);
        assert_eq!(s.prev_tab(8), 0);
        s.clear_all_tabs();
        assert_eq!(s.next_tab(0), 19);
        s.set_tab(5);
        assert_eq!(s.next_tab(0), 5);
    }

    #[test]
    fn resize_preserves_overlap_and_resets_region() {
        let mut s = Screen::new(4, 3);
        write_str(&mut s, "abcd");
        s.set_scroll_region(1, 2);
        s.resize(6, 2);
        assert_eq!(s.scroll_region(), (0, 1));
        assert_eq!(row_text(&s, 0), "abcd  ");
        assert_eq!((s.cols(), s.rows()), (6, 2));
        // idempotent
        s.resize(6, 2);
        assert_eq!(row_text(&s, 0), "abcd  ");
        assert!(s.line(0).unwrap().is_dirty());
    }

    #[test]
    fn erase_uses_pen_background() {
        let mut s = Screen::new(4, 2);
        write_str(&mut s, "abcd");
        s.pen_mut().bg = core_cell::Color::palette(4);
        s.move_to(0, 0);
        s.erase_chars(2);
        assert_eq!(s.get_glyph(0, 0).bg, core_cell::Color::palette(4));
        assert_eq!(s.get_glyph(0, 0).rune, ' ');
        assert_eq!(s.get_glyph(2, 0).rune, 'c');
    }

    #[test]
    fn clear_region_clamps_and_swaps() {
        let mut s = Screen::new(4, 2);
        write_str(&mut s, "abcd");
        s.clear_region(3, 0, 1, 0);
        assert_eq!(row_text(&s, 0), "a   ");
        s.clear_region(0, 5, 99, 99); // fully out of range rows clamp
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn pairing_holds(s: &Screen) {
        for y in 0..s.rows() {
            for x in 0..s.cols() {
                if s.get_glyph(x, y).is_wide() && x + 1 < s.cols() {
                    assert!(
                        s.get_glyph(x + 1, y).is_dummy(),
                        "orphan WIDE at ({x},{y})"
                    );
                }
            }
        }
    }

    #[derive(Debug, Clone)]
    enum Op {
        Put(char),
        MoveTo(usize, usize),
        ScrollUp(usize),
        ScrollDown(usize),
        InsertLines(usize),
        DeleteLines(usize),
        InsertBlanks(usize),
        DeleteChars(usize),
        EraseChars(usize),
        Region(usize, usize),
        Newline,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            prop_oneof![Just('a'), Just('中'), Just('é'), Just('~')].prop_map(Op::Put),
            (0usize..30, 0usize..12).prop_map(|(x, y)| Op::MoveTo(x, y)),
            (0usize..12).prop_map(Op::ScrollUp),
            (0usize..12).prop_map(Op::ScrollDown),
            (0usize..12).prop_map(Op::InsertLines),
            (0usize..12).prop_map(Op::DeleteLines),
            (0usize..30).prop_map(Op::InsertBlanks),
            (0usize..30).prop_map(Op::DeleteChars),
            (0usize..30).prop_map(Op::EraseChars),
            (0usize..12, 0usize..12).prop_map(|(a, b)| Op::Region(a, b)),
            Just(Op::Newline),
        ]
    }

    proptest! {
        #[test]
        fn grid_ops_never_break_invariants(ops in proptest::collection::vec(op(), 0..120)) {
            let mut s = Screen::new(11, 6);
            for op in ops {
                match op {
                    Op::Put(c) => {
                        s.put_char(c, true, false);
                    }
                    Op::MoveTo(x, y) => s.move_to(x, y),
                    Op::ScrollUp(n) => {
                        let (top, _) = s.scroll_region();
                        s.scroll_up(top, n);
                    }
                    Op::ScrollDown(n) => {
                        let (top, _) = s.scroll_region();
                        s.scroll_down(top, n);
                    }
                    Op::InsertLines(n) => s.insert_blank_lines(n),
                    Op::DeleteLines(n) => {
                        s.delete_lines(n);
                    }
                    Op::InsertBlanks(n) => s.insert_blanks(n),
                    Op::DeleteChars(n) => s.delete_chars(n),
                    Op::EraseChars(n) => s.erase_chars(n),
                    Op::Region(a, b) => s.set_scroll_region(a, b),
                    Op::Newline => {
                        s.newline(true);
                    }
                }
                let (top, bot) = s.scroll_region();
                prop_assert!(top <= bot && bot < s.rows());
                prop_assert!(s.cursor().x < s.cols() && s.cursor().y < s.rows());
            }
            pairing_holds(&s);
        }
    }
}
