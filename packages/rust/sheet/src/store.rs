//! libSQL-backed workbook.
//!
//! Each named range is a set of rows in the `cells` table keyed by
//! `(range_name, row_idx, col_idx)`. Block writes run in one transaction so a
//! failed write never leaves half a table behind.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use tracing::debug;

use whguide_shared::{CellValue, GuideError, OutputRow, Result};

use crate::{OutputSink, dense_grid, migrations};

fn storage_err(e: libsql::Error) -> GuideError {
    GuideError::Storage(e.to_string())
}

/// Workbook handle wrapping a libSQL database.
pub struct SheetStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl SheetStore {
    /// Open or create a workbook at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GuideError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let store = Self {
            db,
            conn,
            readonly: false,
        };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Open an existing workbook at `path` for reading only.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GuideError::Storage(format!(
                "workbook not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    GuideError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 before the first migration.
    async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0,
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(GuideError::Storage(
                "workbook is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    /// Names of all ranges holding at least one cell.
    pub async fn list_ranges(&self) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT DISTINCT range_name FROM cells ORDER BY range_name",
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut names = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            names.push(row.get::<String>(0).map_err(storage_err)?);
        }
        Ok(names)
    }
}

/// Split a cell into its `(kind, int, real, text)` columns.
fn cell_columns(value: &CellValue) -> (&'static str, Option<i64>, Option<f64>, Option<&str>) {
    match value {
        CellValue::Empty => ("empty", None, None, None),
        CellValue::Int(v) => ("int", Some(*v), None, None),
        CellValue::Float(v) => ("real", None, Some(*v), None),
        CellValue::Text(v) => ("text", None, None, Some(v.as_str())),
    }
}

fn row_to_cell(row: &libsql::Row) -> Result<((usize, usize), CellValue)> {
    let r = row.get::<i64>(0).map_err(storage_err)?;
    let c = row.get::<i64>(1).map_err(storage_err)?;
    let kind = row.get::<String>(2).map_err(storage_err)?;

    let value = match kind.as_str() {
        "int" => CellValue::Int(row.get::<i64>(3).map_err(storage_err)?),
        "real" => CellValue::Float(row.get::<f64>(4).map_err(storage_err)?),
        "text" => CellValue::Text(row.get::<String>(5).map_err(storage_err)?),
        "empty" => CellValue::Empty,
        other => {
            return Err(GuideError::Storage(format!("unknown cell kind '{other}'")));
        }
    };
    Ok(((r as usize, c as usize), value))
}

impl OutputSink for SheetStore {
    async fn clear_range(&self, range: &str) -> Result<()> {
        self.check_writable()?;
        let removed = self
            .conn
            .execute("DELETE FROM cells WHERE range_name = ?1", params![range])
            .await
            .map_err(storage_err)?;
        debug!(range, removed, "cleared range");
        Ok(())
    }

    async fn write_block(
        &self,
        range: &str,
        row_offset: usize,
        col_offset: usize,
        rows: &[OutputRow],
    ) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.transaction().await.map_err(storage_err)?;
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let (kind, int_value, real_value, text_value) = cell_columns(value);
                tx.execute(
                    "INSERT INTO cells (range_name, row_idx, col_idx, kind, int_value, real_value, text_value, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(range_name, row_idx, col_idx) DO UPDATE SET
                       kind = excluded.kind,
                       int_value = excluded.int_value,
                       real_value = excluded.real_value,
                       text_value = excluded.text_value,
                       updated_at = excluded.updated_at",
                    params![
                        range,
                        (row_offset + r) as i64,
                        (col_offset + c) as i64,
                        kind,
                        int_value,
                        real_value,
                        text_value,
                        now.as_str(),
                    ],
                )
                .await
                .map_err(storage_err)?;
            }
        }
        tx.commit().await.map_err(storage_err)?;

        debug!(range, row_offset, col_offset, rows = rows.len(), "wrote block");
        Ok(())
    }

    async fn read_range(&self, range: &str) -> Result<Vec<OutputRow>> {
        let mut rows = self
            .conn
            .query(
                "SELECT row_idx, col_idx, kind, int_value, real_value, text_value
                 FROM cells WHERE range_name = ?1",
                params![range],
            )
            .await
            .map_err(storage_err)?;

        let mut cells = BTreeMap::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            let (pos, value) = row_to_cell(&row)?;
            cells.insert(pos, value);
        }
        Ok(dense_grid(&cells))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn test_store() -> SheetStore {
        let tmp = std::env::temp_dir().join(format!("whguide_test_{}.db", Uuid::now_v7()));
        SheetStore::open(&tmp).await.expect("open test workbook")
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let store = test_store().await;
        assert_eq!(store.schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("whguide_test_{}.db", Uuid::now_v7()));
        let s1 = SheetStore::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = SheetStore::open(&tmp).await.expect("second open");
        assert_eq!(s2.schema_version().await, 1);
    }

    #[tokio::test]
    async fn all_cell_kinds_roundtrip() {
        let store = test_store().await;
        let block = vec![
            vec![CellValue::Int(30188), CellValue::from("Sleepless Guardian")],
            vec![CellValue::Int(9), CellValue::Float(12000.5)],
            vec![CellValue::Empty, CellValue::Float(-0.25)],
        ];
        store.write_block("rawSleeperData", 0, 0, &block).await.unwrap();
        assert_eq!(store.read_range("rawSleeperData").await.unwrap(), block);
    }

    #[tokio::test]
    async fn offset_blocks_sit_side_by_side() {
        let store = test_store().await;
        let a = vec![vec![CellValue::Int(1), CellValue::Int(2)]];
        let b = vec![vec![CellValue::Int(3), CellValue::Int(4)]];
        store.write_block("rawMissileData", 0, 0, &a).await.unwrap();
        store.write_block("rawMissileData", 0, 2, &b).await.unwrap();

        let grid = store.read_range("rawMissileData").await.unwrap();
        assert_eq!(
            grid,
            vec![vec![CellValue::Int(1), CellValue::Int(2), CellValue::Int(3), CellValue::Int(4)]]
        );
    }

    #[tokio::test]
    async fn clear_then_rewrite_leaves_no_stale_rows() {
        let store = test_store().await;
        let long: Vec<OutputRow> = (0..5).map(|i| vec![CellValue::Int(i)]).collect();
        store.write_block("gasTab", 0, 0, &long).await.unwrap();

        store.clear_range("gasTab").await.unwrap();
        store.write_block("gasTab", 0, 0, &long[..2]).await.unwrap();

        assert_eq!(store.read_range("gasTab").await.unwrap().len(), 2);
        assert_eq!(store.list_ranges().await.unwrap(), vec!["gasTab".to_string()]);
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("whguide_test_{}.db", Uuid::now_v7()));
        let rw = SheetStore::open(&tmp).await.unwrap();
        rw.set_value("C1Date", CellValue::from("2022-12-02T05:06:07:008Z")).await.unwrap();
        drop(rw);

        let ro = SheetStore::open_readonly(&tmp).await.unwrap();
        assert!(ro.clear_range("C1Date").await.is_err());
        assert_eq!(
            ro.read_range("C1Date").await.unwrap(),
            vec![vec![CellValue::from("2022-12-02T05:06:07:008Z")]]
        );
    }

    #[tokio::test]
    async fn readonly_requires_existing_file() {
        let tmp = std::env::temp_dir().join(format!("whguide_missing_{}.db", Uuid::now_v7()));
        assert!(SheetStore::open_readonly(&tmp).await.is_err());
    }
}
