//! Table blocks.

use crate::rich_text::RichTextRun;

/// One row of a table: a fixed-width array of cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    /// Cells in column order; each cell is a rich text sequence.
    pub cells: Vec<Vec<RichTextRun>>,
}

impl TableRow {
    /// Creates a row from its cells.
    pub fn new(cells: Vec<Vec<RichTextRun>>) -> Self {
        Self { cells }
    }

    /// Creates a row of unformatted cells.
    pub fn from_plain<S: AsRef<str>>(cells: &[S]) -> Self {
        Self {
            cells: cells
                .iter()
                .map(|cell| {
                    let text = cell.as_ref();
                    if text.is_empty() {
                        Vec::new()
                    } else {
                        vec![RichTextRun::plain(text)]
                    }
                })
                .collect(),
        }
    }
}

/// A table with a fixed column count.
///
/// Every row holds exactly `width` cells; ragged rows are padded with
/// empty cells (or truncated) on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlock {
    width: usize,
    has_header_row: bool,
    rows: Vec<TableRow>,
}

impl TableBlock {
    /// Creates a table whose width is the widest row.
    pub fn new(rows: Vec<TableRow>, has_header_row: bool) -> Self {
        let width = rows.iter().map(|row| row.cells.len()).max().unwrap_or(0);
        Self::with_width(width, rows, has_header_row)
    }

    /// Creates a table with an explicit width, normalizing every row to it.
    pub fn with_width(width: usize, rows: Vec<TableRow>, has_header_row: bool) -> Self {
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.cells.resize_with(width, Vec::new);
                row
            })
            .collect();
        Self {
            width,
            has_header_row,
            rows,
        }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Whether the first row is a header row.
    pub fn has_header_row(&self) -> bool {
        self.has_header_row
    }

    /// Rows in order.
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Returns true when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_rows_are_padded() {
        let table = TableBlock::new(
            vec![
                TableRow::from_plain(&["a", "b", "c"]),
                TableRow::from_plain(&["d"]),
            ],
            true,
        );
        assert_eq!(table.width(), 3);
        assert!(table.rows().iter().all(|row| row.cells.len() == 3));
        assert!(table.rows()[1].cells[2].is_empty());
    }

    #[test]
    fn explicit_width_truncates() {
        let table = TableBlock::with_width(2, vec![TableRow::from_plain(&["a", "b", "c"])], false);
        assert_eq!(table.rows()[0].cells.len(), 2);
        assert!(!table.has_header_row());
    }

    #[test]
    fn empty_table() {
        let table = TableBlock::new(Vec::new(), false);
        assert_eq!(table.width(), 0);
        assert!(table.is_empty());
    }
}
