use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

const TABLES: &[&str] = &[
    "analytic_graphs",
    "non_analytic",
    "polynomial_cache",
    "product_cache",
];

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;

    // fails harmlessly on in-memory and fresh databases
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::info!("startup WAL checkpoint complete");
    }

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    match get_schema_version(conn)? {
        Some(v) if v != SCHEMA_VERSION => {
            tracing::warn!(
                found = v,
                expected = SCHEMA_VERSION,
                "schema version mismatch, resetting cache tables"
            );
            drop_tables(conn)?;
        }
        _ => {}
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS analytic_graphs (
            n           INTEGER NOT NULL,
            hash        TEXT NOT NULL,
            edges       TEXT NOT NULL,
            eigenvalues TEXT NOT NULL,
            family      TEXT,
            polynomial  TEXT,
            PRIMARY KEY (n, hash)
        );

        CREATE TABLE IF NOT EXISTS non_analytic (
            n         INTEGER NOT NULL,
            poly_hash TEXT NOT NULL,
            PRIMARY KEY (n, poly_hash)
        );

        CREATE TABLE IF NOT EXISTS polynomial_cache (
            n           INTEGER NOT NULL,
            poly_hash   TEXT NOT NULL,
            analytic    INTEGER NOT NULL,
            eigenvalues TEXT,
            reason      TEXT,
            PRIMARY KEY (n, poly_hash)
        );

        CREATE TABLE IF NOT EXISTS product_cache (
            n           INTEGER NOT NULL,
            hash        TEXT NOT NULL,
            rule        TEXT NOT NULL,
            left_hash   TEXT NOT NULL,
            right_hash  TEXT NOT NULL,
            edges       TEXT NOT NULL,
            eigenvalues TEXT NOT NULL,
            PRIMARY KEY (n, hash)
        );
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn drop_tables(conn: &Connection) -> Result<()> {
    for table in TABLES {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
    }
    Ok(())
}

/// Delete every cached row, keeping the tables.
pub fn clear_tables(conn: &Connection) -> Result<()> {
    for table in TABLES {
        conn.execute_batch(&format!("DELETE FROM {table};"))?;
    }
    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}
