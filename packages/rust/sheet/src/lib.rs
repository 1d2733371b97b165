//! Workbook output sinks.
//!
//! Pipelines never reach for a global spreadsheet; they are handed an
//! [`OutputSink`] that knows how to clear a named range and write a 2-D
//! block of cells into it at a row/column offset.
//!
//! - [`SheetStore`] persists ranges in a libSQL database file
//! - [`MemorySheet`] keeps them in memory (tests, dry runs)

mod memory;
mod migrations;
mod store;

use std::collections::BTreeMap;

use whguide_shared::{CellValue, OutputRow, Result};

pub use memory::MemorySheet;
pub use store::SheetStore;

/// Destination for pipeline output, addressed by named range.
///
/// Offsets are zero-based and relative to the range's top-left cell.
#[allow(async_fn_in_trait)]
pub trait OutputSink {
    /// Remove every cell of `range`.
    async fn clear_range(&self, range: &str) -> Result<()>;

    /// Write `rows` with their top-left cell at `(row_offset, col_offset)`.
    /// Cells outside the block are left as they are.
    async fn write_block(
        &self,
        range: &str,
        row_offset: usize,
        col_offset: usize,
        rows: &[OutputRow],
    ) -> Result<()>;

    /// Read `range` back as a dense grid, padding gaps with [`CellValue::Empty`].
    async fn read_range(&self, range: &str) -> Result<Vec<OutputRow>>;

    /// Write a single value into the top-left cell of `range`.
    async fn set_value(&self, range: &str, value: CellValue) -> Result<()> {
        self.write_block(range, 0, 0, &[vec![value]]).await
    }
}

/// Build a dense grid from sparse `(row, col) -> value` cells.
pub(crate) fn dense_grid(cells: &BTreeMap<(usize, usize), CellValue>) -> Vec<OutputRow> {
    let Some(height) = cells.keys().map(|(r, _)| r + 1).max() else {
        return Vec::new();
    };
    let width = cells.keys().map(|(_, c)| c + 1).max().unwrap_or(0);

    let mut grid = vec![vec![CellValue::Empty; width]; height];
    for (&(r, c), value) in cells {
        grid[r][c] = value.clone();
    }
    grid
}
