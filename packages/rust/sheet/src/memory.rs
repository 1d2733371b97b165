//! In-memory [`OutputSink`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use whguide_shared::{CellValue, GuideError, OutputRow, Result};

use crate::{OutputSink, dense_grid};

type Cells = BTreeMap<(usize, usize), CellValue>;

/// A workbook held in memory.
#[derive(Debug, Default)]
pub struct MemorySheet {
    ranges: Mutex<HashMap<String, Cells>>,
    writes: Mutex<Vec<String>>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the ranges written to, in call order (one entry per
    /// `write_block`).
    pub fn write_log(&self) -> Vec<String> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Cells>>> {
        self.ranges
            .lock()
            .map_err(|_| GuideError::Storage("memory sheet lock poisoned".into()))
    }
}

impl OutputSink for MemorySheet {
    async fn clear_range(&self, range: &str) -> Result<()> {
        self.lock()?.remove(range);
        Ok(())
    }

    async fn write_block(
        &self,
        range: &str,
        row_offset: usize,
        col_offset: usize,
        rows: &[OutputRow],
    ) -> Result<()> {
        let mut ranges = self.lock()?;
        let cells = ranges.entry(range.to_string()).or_default();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                cells.insert((row_offset + r, col_offset + c), value.clone());
            }
        }
        drop(ranges);

        if let Ok(mut log) = self.writes.lock() {
            log.push(range.to_string());
        }
        Ok(())
    }

    async fn read_range(&self, range: &str) -> Result<Vec<OutputRow>> {
        Ok(self.lock()?.get(range).map(dense_grid).unwrap_or_default())
    }
}
