//! A single row of the grid.
//!
//! Invariants:
//! * `cells.len()` equals the column count handed to `new`/`resize`.
//! * Every mutating operation marks the line `DIRTY`.
//! * `WRAPPED` means "continuation of the previous row"; text
//!   extraction that joins paragraphs keys off it.

use crate::{Glyph, GlyphAttr};

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct LineFlags: u8 {
        /// Needs repaint.
        const DIRTY    = 1 << 0;
        /// Soft continuation of the previous line.
        const WRAPPED  = 1 << 1;
        /// Part of the active selection.
        const SELECTED = 1 << 2;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    cells: Vec<Glyph>,
    pub flags: LineFlags,
}

impl Line {
    /// A fresh all-empty row, born dirty.
    pub fn new(cols: usize) -> Line {
        Line {
            cells: vec![Glyph::EMPTY; cols],
            flags: LineFlags::DIRTY,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Glyph] {
        &self.cells
    }

    pub fn is_dirty(&self) -> bool {
        self.flags.contains(LineFlags::DIRTY)
    }

    pub fn mark_dirty(&mut self) {
        self.flags.insert(LineFlags::DIRTY);
    }

    pub fn clear_dirty(&mut self) {
        self.flags.remove(LineFlags::DIRTY);
    }

    pub fn is_wrapped(&self) -> bool {
        self.flags.contains(LineFlags::WRAPPED)
    }

    pub fn set_wrapped(&mut self, wrapped: bool) {
        self.flags.set(LineFlags::WRAPPED, wrapped);
    }

    /// Keep the overlap prefix, pad with empties when growing.
    pub fn resize(&mut self, new_cols: usize) {
        self.cells.resize(new_cols, Glyph::EMPTY);
        self.mark_dirty();
    }

    pub fn get_glyph(&self, col: usize) -> Option<&Glyph> {
        self.cells.get(col)
    }

    pub fn get_glyph_mut(&mut self, col: usize) -> Option<&mut Glyph> {
        self.mark_dirty();
        self.cells.get_mut(col)
    }

    /// Out-of-range columns are ignored.
    pub fn set_glyph(&mut self, col: usize, glyph: Glyph) {
        if let Some(cell) = self.cells.get_mut(col) {
            *cell = glyph;
            self.mark_dirty();
        }
    }

    pub fn clear(&mut self) {
        self.fill_range(0, self.cells.len(), Glyph::EMPTY);
    }

    /// Clear `[start, end)`, clamped to the row.
    pub fn clear_range(&mut self, start: usize, end: usize) {
        self.fill_range(start, end, Glyph::EMPTY);
    }

    pub fn clear_to_end(&mut self, col: usize) {
        self.fill_range(col, self.cells.len(), Glyph::EMPTY);
    }

    /// Clear from column 0 through `col` inclusive.
    pub fn clear_to_start(&mut self, col: usize) {
        let end = (col + 1).min(self.cells.len());
        self.fill_range(0, end, Glyph::EMPTY);
    }

    /// Fill `[start, end)` with a template glyph (used by erase
    /// operations that must keep the pen background).
    pub fn fill_range(&mut self, start: usize, end: usize, glyph: Glyph) {
        let end = end.min(self.cells.len());
        if start >= end {
            return;
        }
        for cell in &mut self.cells[start..end] {
            *cell = glyph;
        }
        self.mark_dirty();
    }

    /// DCH: left-shift the tail after `col` by `n`, back-filling with
    /// empties. `n` is clamped to what fits.
    pub fn delete_chars(&mut self, col: usize, n: usize) {
        let len = self.cells.len();
        if col >= len || n == 0 {
            return;
        }
        let n = n.min(len - col);
        self.cells.copy_within(col + n..len, col);
        for cell in &mut self.cells[len - n..] {
            *cell = Glyph::EMPTY;
        }
        self.mark_dirty();
    }

    /// ICH: right-shift from `col` by `n`, dropping cells pushed past
    /// the end and filling the gap with empties.
    pub fn insert_blanks(&mut self, col: usize, n: usize) {
        let len = self.cells.len();
        if col >= len || n == 0 {
            return;
        }
        let n = n.min(len - col);
        self.cells.copy_within(col..len - n, col + n);
        for cell in &mut self.cells[col..col + n] {
            *cell = Glyph::EMPTY;
        }
        self.mark_dirty();
    }

    /// UTF-8 text of the whole row, wide-char placeholders skipped.
    pub fn to_string(&self) -> String {
        self.to_string_range(0, self.cells.len())
    }

    /// UTF-8 text of `[start, end)`, wide-char placeholders skipped.
    pub fn to_string_range(&self, start: usize, end: usize) -> String {
        let end = end.min(self.cells.len());
        let mut out = String::new();
        if start >= end {
            return out;
        }
        for cell in &self.cells[start..end] {
            if cell.is_dummy() {
                continue;
            }
            out.push(if cell.rune == '\0' { ' ' } else { cell.rune });
        }
        out
    }

    /// Row text with trailing spaces removed (yank semantics: rows are
    /// trimmed, empty rows themselves are kept by the caller).
    pub fn to_string_trimmed(&self) -> String {
        let mut s = self.to_string();
        s.truncate(s.trim_end_matches(' ').len());
        s
    }

    /// Column of the last cell that is not a space, if any.
    pub fn find_last_nonspace(&self) -> Option<usize> {
        self.cells.iter().rposition(|c| !c.is_empty())
    }

    /// True if the cell at `col` starts a wide pair.
    pub fn is_wide_at(&self, col: usize) -> bool {
        self.cells
            .get(col)
            .is_some_and(|c| c.attr.contains(GlyphAttr::WIDE))
    }
}
