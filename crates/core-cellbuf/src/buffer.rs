//! The 2-D cell grid.
//!
//! Invariants maintained by every mutation:
//! * A width-2 leader always has a width-0 continuation immediately to its
//!   right when that position is in bounds.
//! * Overwriting either half of a wide pair reduces the surviving half to a
//!   plain space and marks it dirty.
//! * A leader in the last column keeps its logical width of 2; the renderer
//!   substitutes a space at emission time.
//!
//! Reads never mutate: a width-0 cell with no wide leader to its left (which
//! can only arise from external corruption) is healed logically in the
//! returned view.

use core_style::Style;

use crate::cell::Cell;
use crate::grapheme::{self, WidthPolicy};

pub struct CellBuffer {
    cols: usize,
    rows: usize,
    cells: Vec<Cell>,
    policy: WidthPolicy,
}

impl CellBuffer {
    /// A new buffer with every cell a dirty default space, so the first
    /// render pass paints the whole screen.
    pub fn new(cols: usize, rows: usize, policy: WidthPolicy) -> Self {
        let mut cell = Cell::default();
        cell.dirty = true;
        Self {
            cols,
            rows,
            cells: vec![cell; cols * rows],
            policy,
        }
    }

    #[inline]
    fn idx(&self, x: usize, y: usize) -> usize {
        y * self.cols + x
    }

    #[inline]
    fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.cols && y < self.rows
    }

    pub fn size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn width_policy(&self) -> WidthPolicy {
        self.policy
    }

    /// Reallocate to `cols × rows`, keeping the overlapping region
    /// top-left-aligned. New cells are dirty default spaces. No-op when the
    /// dimensions are unchanged.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        if cols == self.cols && rows == self.rows {
            return;
        }
        let mut blank = Cell::default();
        blank.dirty = true;
        let mut next = vec![blank; cols * rows];
        for y in 0..rows.min(self.rows) {
            for x in 0..cols.min(self.cols) {
                next[y * cols + x] = self.cells[self.idx(x, y)].clone();
            }
        }
        self.cols = cols;
        self.rows = rows;
        self.cells = next;
    }

    /// Set every cell to `ch` with `style`. Non-locked cells are marked
    /// dirty unconditionally.
    pub fn fill(&mut self, ch: char, style: &Style) {
        let mut content = String::new();
        content.push(ch);
        for cell in &mut self.cells {
            cell.content.clear();
            cell.content.push_str(&content);
            cell.width = 1;
            cell.style = style.clone();
            if !cell.locked {
                cell.dirty = true;
            }
        }
    }

    pub fn clear(&mut self) {
        self.fill(' ', &Style::default());
    }

    /// Write the first grapheme cluster of `s` at `(x, y)`. Returns the
    /// unconsumed remainder and the display width taken (0 when nothing was
    /// written). Out-of-range writes consume the cluster and store nothing.
    pub fn put<'a>(&mut self, x: usize, y: usize, s: &'a str, style: &Style) -> (&'a str, u8) {
        let (cluster, rest) = grapheme::first_cluster(s);
        if cluster.is_empty() {
            return (rest, 0);
        }
        if !self.in_bounds(x, y) {
            return (rest, 0);
        }

        let measured = grapheme::cluster_width(cluster, self.policy);
        // A bare combining sequence occupies one cell as space + combiners.
        let (content, width) = if measured == 0 {
            (format!(" {cluster}"), 1)
        } else {
            (cluster.to_string(), measured)
        };

        let i = self.idx(x, y);
        if self.cells[i].content == content
            && self.cells[i].width == width
            && self.cells[i].style == *style
        {
            return (rest, width);
        }

        self.heal_for_overwrite(x, y);
        if width == 2 && x + 1 < self.cols {
            self.heal_for_overwrite(x + 1, y);
        }

        let i = self.idx(x, y);
        {
            let cell = &mut self.cells[i];
            cell.content = content;
            cell.width = width;
            cell.style = style.clone();
            cell.dirty = true;
        }
        if width == 2 && x + 1 < self.cols {
            let j = self.idx(x + 1, y);
            let mut cont = Cell::continuation(style.clone());
            cont.dirty = true;
            self.cells[j] = cont;
        }
        (rest, width)
    }

    /// If overwriting `(x, y)` would break a wide pair, reduce the surviving
    /// half to a dirty space.
    fn heal_for_overwrite(&mut self, x: usize, y: usize) {
        let i = self.idx(x, y);
        match self.cells[i].width {
            0 => {
                if x > 0 {
                    let j = self.idx(x - 1, y);
                    if self.cells[j].width == 2 {
                        self.space_out(j);
                    }
                }
            }
            2 => {
                if x + 1 < self.cols {
                    let j = self.idx(x + 1, y);
                    if self.cells[j].width == 0 {
                        self.space_out(j);
                    }
                }
            }
            _ => {}
        }
    }

    fn space_out(&mut self, i: usize) {
        let cell = &mut self.cells[i];
        cell.content.clear();
        cell.content.push(' ');
        cell.width = 1;
        cell.dirty = true;
    }

    /// Read the logical cell at `(x, y)`: `(content, style, width)`.
    /// Out-of-range reads return an empty string, the default style and
    /// width 0. A continuation cell reads as empty with width 0; one whose
    /// leader is missing heals to a space in the returned view.
    pub fn get(&self, x: usize, y: usize) -> (String, Style, u8) {
        if !self.in_bounds(x, y) {
            return (String::new(), Style::default(), 0);
        }
        let cell = &self.cells[self.idx(x, y)];
        if cell.width == 0 {
            let orphaned = x == 0 || self.cells[self.idx(x - 1, y)].width != 2;
            if orphaned {
                return (" ".to_string(), cell.style.clone(), 1);
            }
            return (String::new(), cell.style.clone(), 0);
        }
        (cell.content.clone(), cell.style.clone(), cell.width)
    }

    pub fn lock_cell(&mut self, x: usize, y: usize) {
        if self.in_bounds(x, y) {
            let i = self.idx(x, y);
            self.cells[i].locked = true;
        }
    }

    pub fn unlock_cell(&mut self, x: usize, y: usize) {
        if self.in_bounds(x, y) {
            let i = self.idx(x, y);
            self.cells[i].locked = false;
        }
    }

    /// Mark every cell dirty (full repaint on the next render pass).
    pub fn invalidate(&mut self) {
        for cell in &mut self.cells {
            cell.dirty = true;
        }
    }

    pub fn set_dirty(&mut self, x: usize, y: usize, dirty: bool) {
        if self.in_bounds(x, y) {
            let i = self.idx(x, y);
            self.cells[i].dirty = dirty;
        }
    }

    pub fn dirty(&self, x: usize, y: usize) -> bool {
        self.in_bounds(x, y) && self.cells[self.idx(x, y)].dirty
    }

    /// Borrow a cell for rendering.
    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            Some(&self.cells[self.idx(x, y)])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_style::Color;

    fn buf(cols: usize, rows: usize) -> CellBuffer {
        CellBuffer::new(cols, rows, WidthPolicy::Narrow)
    }

    #[test]
    fn put_get_round_trip() {
        let mut b = buf(10, 2);
        let style = Style::default().foreground(Color::Palette(4)).bold(true);
        let (rest, w) = b.put(3, 1, "abc", &style);
        assert_eq!(rest, "bc");
        assert_eq!(w, 1);
        let (s, st, w) = b.get(3, 1);
        assert_eq!(s, "a");
        assert_eq!(st, style);
        assert_eq!(w, 1);
    }

    #[test]
    fn out_of_range_get_is_empty() {
        let b = buf(4, 4);
        let (s, st, w) = b.get(9, 9);
        assert!(s.is_empty());
        assert_eq!(st, Style::default());
        assert_eq!(w, 0);
    }

    #[test]
    fn out_of_range_put_consumes_cluster() {
        let mut b = buf(4, 4);
        let (rest, w) = b.put(99, 0, "xy", &Style::default());
        assert_eq!(rest, "y");
        assert_eq!(w, 0);
    }

    #[test]
    fn wide_put_creates_continuation() {
        let mut b = buf(4, 1);
        let (rest, w) = b.put(0, 0, "界z", &Style::default());
        assert_eq!(rest, "z");
        assert_eq!(w, 2);
        let (s, _, w) = b.get(0, 0);
        assert_eq!(s, "界");
        assert_eq!(w, 2);
        let (s, _, w) = b.get(1, 0);
        assert!(s.is_empty());
        assert_eq!(w, 0);
    }

    #[test]
    fn regional_flag_occupies_two_cells() {
        let mut b = buf(4, 1);
        let (rest, w) = b.put(0, 0, "🇦🇺", &Style::default());
        assert!(rest.is_empty());
        assert_eq!(w, 2);
        let (s, _, w) = b.get(0, 0);
        assert_eq!(s, "🇦🇺");
        assert_eq!(w, 2);
        assert_eq!(b.get(1, 0).2, 0);
    }

    #[test]
    fn overwriting_continuation_orphans_leader_to_space() {
        let mut b = buf(4, 1);
        b.put(0, 0, "界", &Style::default());
        b.put(1, 0, "x", &Style::default());
        let (s, _, w) = b.get(0, 0);
        assert_eq!(s, " ");
        assert_eq!(w, 1);
        assert_eq!(b.get(1, 0).0, "x");
    }

    #[test]
    fn overwriting_leader_spaces_continuation() {
        let mut b = buf(4, 1);
        b.put(0, 0, "界", &Style::default());
        b.put(0, 0, "x", &Style::default());
        assert_eq!(b.get(0, 0).0, "x");
        let (s, _, w) = b.get(1, 0);
        assert_eq!(s, " ");
        assert_eq!(w, 1);
    }

    #[test]
    fn wide_over_wide_heals_displaced_pair() {
        let mut b = buf(4, 1);
        b.put(1, 0, "界", &Style::default()); // occupies 1,2
        b.put(0, 0, "中", &Style::default()); // occupies 0,1; old leader at 1 displaced
        assert_eq!(b.get(0, 0).0, "中");
        assert_eq!(b.get(1, 0).2, 0);
        // Cell 2 was the old continuation; it must be a healed space now.
        let (s, _, w) = b.get(2, 0);
        assert_eq!(s, " ");
        assert_eq!(w, 1);
    }

    #[test]
    fn wide_at_last_column_stays_logically_wide() {
        let mut b = buf(4, 1);
        let (_, w) = b.put(3, 0, "界", &Style::default());
        assert_eq!(w, 2);
        let (s, _, w) = b.get(3, 0);
        assert_eq!(s, "界");
        assert_eq!(w, 2);
    }

    #[test]
    fn bare_combining_mark_stored_as_space_plus_combiner() {
        let mut b = buf(4, 1);
        let (_, w) = b.put(0, 0, "\u{0301}", &Style::default());
        assert_eq!(w, 1);
        let (s, _, w) = b.get(0, 0);
        assert_eq!(s, " \u{0301}");
        assert_eq!(w, 1);
    }

    #[test]
    fn unchanged_put_does_not_mark_dirty() {
        let mut b = buf(4, 1);
        b.put(0, 0, "a", &Style::default());
        b.set_dirty(0, 0, false);
        b.put(0, 0, "a", &Style::default());
        assert!(!b.dirty(0, 0));
        b.put(0, 0, "b", &Style::default());
        assert!(b.dirty(0, 0));
    }

    #[test]
    fn resize_preserves_overlap() {
        let mut b = buf(4, 3);
        b.put(1, 1, "q", &Style::default());
        b.resize(8, 2);
        assert_eq!(b.size(), (8, 2));
        assert_eq!(b.get(1, 1).0, "q");
        // New area is blank space.
        assert_eq!(b.get(6, 0).0, " ");
        // Shrinking discards.
        b.resize(2, 1);
        assert_eq!(b.size(), (2, 1));
        assert_eq!(b.get(1, 1).2, 0);
    }

    #[test]
    fn resize_same_dims_is_noop() {
        let mut b = buf(4, 3);
        b.put(0, 0, "a", &Style::default());
        b.set_dirty(0, 0, false);
        b.resize(4, 3);
        assert!(!b.dirty(0, 0));
        assert_eq!(b.get(0, 0).0, "a");
    }

    #[test]
    fn fill_skips_locked_dirty_marking() {
        let mut b = buf(2, 1);
        b.lock_cell(0, 0);
        b.set_dirty(0, 0, false);
        b.set_dirty(1, 0, false);
        b.fill('#', &Style::default());
        assert!(!b.dirty(0, 0));
        assert!(b.dirty(1, 0));
        assert_eq!(b.get(0, 0).0, "#");
    }

    #[test]
    fn invalidate_marks_everything() {
        let mut b = buf(3, 2);
        for y in 0..2 {
            for x in 0..3 {
                b.set_dirty(x, y, false);
            }
        }
        b.invalidate();
        assert!(b.dirty(2, 1));
        assert!(b.dirty(0, 0));
    }

    #[test]
    fn new_buffer_starts_dirty() {
        let b = buf(2, 2);
        assert!(b.dirty(0, 0));
        assert!(b.dirty(1, 1));
    }
}
