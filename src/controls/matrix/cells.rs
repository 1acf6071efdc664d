//! Cell storage for the matrix.
//!
//! Line 0 holds the column titles and column 0 the line titles, so a matrix
//! of `lines` x `cols` data cells keeps `(lines + 1) x (cols + 1)` entries.
//! Data lines and columns are numbered from 1.

use crate::types::Rgb;

/// One cell: its text and optional colors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub value: Option<String>,
    pub bgcolor: Option<Rgb>,
    pub fgcolor: Option<Rgb>,
}

/// Private data of a matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixData {
    lines: usize,
    cols: usize,
    cells: Vec<Vec<Cell>>,
    /// Focus cell as `(line, column)`, both starting at 1.
    pub focus: (usize, usize),
    /// Consecutive Home presses.
    pub home_count: u32,
    /// Consecutive End presses.
    pub end_count: u32,
}

impl Default for MatrixData {
    fn default() -> Self {
        Self {
            lines: 0,
            cols: 0,
            cells: vec![vec![Cell::default()]],
            focus: (1, 1),
            home_count: 0,
            end_count: 0,
        }
    }
}

impl MatrixData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_lines(&self) -> usize {
        self.lines
    }

    pub fn num_cols(&self) -> usize {
        self.cols
    }

    /// Cell at `(lin, col)`, titles included. Negative ids are rejected.
    pub fn cell(&self, lin: i32, col: i32) -> Option<&Cell> {
        let (lin, col) = (usize::try_from(lin).ok()?, usize::try_from(col).ok()?);
        self.cells.get(lin)?.get(col)
    }

    pub fn cell_mut(&mut self, lin: i32, col: i32) -> Option<&mut Cell> {
        let (lin, col) = (usize::try_from(lin).ok()?, usize::try_from(col).ok()?);
        self.cells.get_mut(lin)?.get_mut(col)
    }

    /// Whether `(lin, col)` is a data cell (not a title).
    pub fn is_data_cell(&self, lin: usize, col: usize) -> bool {
        (1..=self.lines).contains(&lin) && (1..=self.cols).contains(&col)
    }

    // =========================================================================
    // Resizing
    // =========================================================================

    /// Grow or shrink to `lines` data lines. Surviving cells keep their
    /// contents.
    pub fn set_num_lines(&mut self, lines: usize) {
        let width = self.cols + 1;
        self.cells.resize_with(lines + 1, || vec![Cell::default(); width]);
        self.lines = lines;
        self.clamp_focus();
    }

    pub fn set_num_cols(&mut self, cols: usize) {
        for row in &mut self.cells {
            row.resize_with(cols + 1, Cell::default);
        }
        self.cols = cols;
        self.clamp_focus();
    }

    /// Insert `count` empty lines after line `after` (0 inserts at the top).
    pub fn insert_lines(&mut self, after: usize, count: usize) -> bool {
        if after > self.lines || count == 0 {
            return false;
        }
        let width = self.cols + 1;
        let at = after + 1;
        self.cells
            .splice(at..at, std::iter::repeat_with(|| vec![Cell::default(); width]).take(count));
        self.lines += count;
        if self.focus.0 >= at {
            self.focus.0 += count;
        }
        true
    }

    /// Remove up to `count` lines starting at line `start`.
    pub fn delete_lines(&mut self, start: usize, count: usize) -> bool {
        if !(1..=self.lines).contains(&start) || count == 0 {
            return false;
        }
        let end = (start + count).min(self.lines + 1);
        self.cells.drain(start..end);
        self.lines -= end - start;
        if self.focus.0 >= end {
            self.focus.0 -= end - start;
        }
        self.clamp_focus();
        true
    }

    /// Insert `count` empty columns after column `after`.
    pub fn insert_cols(&mut self, after: usize, count: usize) -> bool {
        if after > self.cols || count == 0 {
            return false;
        }
        let at = after + 1;
        for row in &mut self.cells {
            row.splice(at..at, std::iter::repeat_with(Cell::default).take(count));
        }
        self.cols += count;
        if self.focus.1 >= at {
            self.focus.1 += count;
        }
        true
    }

    /// Remove up to `count` columns starting at column `start`.
    pub fn delete_cols(&mut self, start: usize, count: usize) -> bool {
        if !(1..=self.cols).contains(&start) || count == 0 {
            return false;
        }
        let end = (start + count).min(self.cols + 1);
        for row in &mut self.cells {
            row.drain(start..end);
        }
        self.cols -= end - start;
        if self.focus.1 >= end {
            self.focus.1 -= end - start;
        }
        self.clamp_focus();
        true
    }

    /// Keep the focus on a data cell, or at `(1, 1)` when there is none.
    fn clamp_focus(&mut self) {
        self.focus.0 = self.focus.0.min(self.lines).max(1);
        self.focus.1 = self.focus.1.min(self.cols).max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 3 x 2 matrix whose cells read `"L:C"`.
    fn labelled() -> MatrixData {
        let mut data = MatrixData::new();
        data.set_num_lines(3);
        data.set_num_cols(2);
        for lin in 0..=3 {
            for col in 0..=2 {
                data.cell_mut(lin, col).unwrap().value = Some(format!("{lin}:{col}"));
            }
        }
        data
    }

    fn column(data: &MatrixData, col: i32) -> Vec<String> {
        (0..=data.num_lines() as i32)
            .map(|lin| data.cell(lin, col).unwrap().value.clone().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_empty_matrix_has_corner_only() {
        let data = MatrixData::new();
        assert!(data.cell(0, 0).is_some());
        assert!(data.cell(1, 1).is_none());
        assert!(data.cell(-1, 0).is_none());
        assert!(!data.is_data_cell(1, 1));
        assert_eq!(data.focus, (1, 1));
    }

    #[test]
    fn test_resize_keeps_contents() {
        let mut data = labelled();
        data.set_num_lines(1);
        assert!(data.cell(2, 1).is_none());
        data.set_num_lines(2);
        assert_eq!(data.cell(1, 2).unwrap().value.as_deref(), Some("1:2"));
        assert_eq!(data.cell(2, 2).unwrap().value, None);

        data.set_num_cols(3);
        assert_eq!(data.cell(0, 3).unwrap().value, None);
        assert_eq!(data.cell(1, 1).unwrap().value.as_deref(), Some("1:1"));
    }

    #[test]
    fn test_insert_lines() {
        let mut data = labelled();
        assert!(data.insert_lines(1, 2));
        assert_eq!(data.num_lines(), 5);
        assert_eq!(column(&data, 1), vec!["0:1", "1:1", "", "", "2:1", "3:1"]);

        assert!(data.insert_lines(0, 1));
        assert_eq!(data.cell(1, 1).unwrap().value, None);
        assert_eq!(data.cell(2, 1).unwrap().value.as_deref(), Some("1:1"));

        assert!(!data.insert_lines(7, 1));
        assert!(!data.insert_lines(1, 0));
    }

    #[test]
    fn test_delete_lines_clamps_count() {
        let mut data = labelled();
        assert!(data.delete_lines(2, 10));
        assert_eq!(data.num_lines(), 1);
        assert_eq!(column(&data, 2), vec!["0:2", "1:2"]);

        // title line cannot be deleted
        assert!(!data.delete_lines(0, 1));
        assert!(!data.delete_lines(2, 1));
    }

    #[test]
    fn test_columns() {
        let mut data = labelled();
        assert!(data.insert_cols(2, 1));
        assert_eq!(data.num_cols(), 3);
        assert_eq!(data.cell(1, 3).unwrap().value, None);

        assert!(data.delete_cols(1, 1));
        assert_eq!(data.num_cols(), 2);
        assert_eq!(data.cell(3, 1).unwrap().value.as_deref(), Some("3:2"));
        assert_eq!(data.cell(0, 0).unwrap().value.as_deref(), Some("0:0"));
    }

    #[test]
    fn test_focus_follows_edits() {
        let mut data = labelled();
        data.focus = (3, 2);
        data.insert_lines(0, 1);
        assert_eq!(data.focus, (4, 2));

        data.delete_lines(1, 2);
        assert_eq!(data.focus, (2, 2));

        data.delete_cols(2, 1);
        assert_eq!(data.focus, (2, 1));

        data.set_num_lines(0);
        assert_eq!(data.focus, (1, 1));
    }
}
