//! SQL migration definitions for the workbook database.
//!
//! Migrations are applied in order on open. Each migration has a version
//! number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: named-range cells",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per written cell of a named range.
-- kind is one of: empty, int, real, text.
CREATE TABLE IF NOT EXISTS cells (
    range_name TEXT NOT NULL,
    row_idx    INTEGER NOT NULL,
    col_idx    INTEGER NOT NULL,
    kind       TEXT NOT NULL,
    int_value  INTEGER,
    real_value REAL,
    text_value TEXT,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (range_name, row_idx, col_idx)
);

CREATE INDEX IF NOT EXISTS idx_cells_range ON cells(range_name);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
