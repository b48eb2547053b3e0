use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{Connection, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

use spectra_core::{
    AnalyticDatabase, AnalyticEntry, CURRENT_VERSION, DatabaseStats, LevelStats, PolynomialEntry,
    ProductEntry, Tolerances, VertexLevel,
};

use crate::error::{Result, StoreError};
use crate::schema;

const FORMAT_VERSION_KEY: &str = "format_version";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM metadata WHERE key = ?1")?;
        let result = stmt.query_row([key], |row| row.get(0)).ok();
        Ok(result)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Save ---

    /// Replace the stored cache with `db` in one transaction.
    pub fn save_database(&self, db: &AnalyticDatabase) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        schema::clear_tables(&tx)?;

        for (&n, level) in db.levels() {
            let n = n as i64;
            for (hash, entry) in &level.analytic {
                tx.execute(
                    "INSERT INTO analytic_graphs (n, hash, edges, eigenvalues, family, polynomial)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        n,
                        hash,
                        to_json(&entry.edges)?,
                        to_json(&entry.eigenvalues)?,
                        entry.family.as_ref().map(to_json).transpose()?,
                        entry.polynomial.as_ref().map(to_json).transpose()?,
                    ],
                )?;
            }
            for key in &level.non_analytic {
                tx.execute(
                    "INSERT INTO non_analytic (n, poly_hash) VALUES (?1, ?2)",
                    params![n, key],
                )?;
            }
            for (key, entry) in &level.polynomial_cache {
                tx.execute(
                    "INSERT INTO polynomial_cache (n, poly_hash, analytic, eigenvalues, reason)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        n,
                        key,
                        entry.analytic as i32,
                        entry.eigenvalues.as_ref().map(to_json).transpose()?,
                        entry.reason,
                    ],
                )?;
            }
            for (hash, entry) in &level.products {
                tx.execute(
                    "INSERT INTO product_cache (n, hash, rule, left_hash, right_hash, edges, eigenvalues)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        n,
                        hash,
                        to_json(&entry.rule)?,
                        entry.left,
                        entry.right,
                        to_json(&entry.edges)?,
                        to_json(&entry.eigenvalues)?,
                    ],
                )?;
            }
        }

        tx.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![FORMAT_VERSION_KEY, CURRENT_VERSION],
        )?;
        tx.commit()?;

        let stats = db.stats();
        tracing::debug!(
            analytic = stats.analytic,
            non_analytic = stats.non_analytic,
            polynomials = stats.polynomials,
            products = stats.products,
            "saved analytic database"
        );
        Ok(())
    }

    // --- Load ---

    /// Load the stored cache. Rows written by another format version are
    /// discarded and an empty database is returned.
    pub fn load_database(&self, tol: Tolerances) -> Result<AnalyticDatabase> {
        if let Some(found) = self.get_metadata(FORMAT_VERSION_KEY)?
            && found != CURRENT_VERSION
        {
            tracing::warn!(
                found = %found,
                expected = CURRENT_VERSION,
                "cache format version mismatch, resetting"
            );
            self.reset()?;
            return Ok(AnalyticDatabase::new(tol));
        }

        let mut levels: BTreeMap<usize, VertexLevel> = BTreeMap::new();

        let mut stmt = self
            .conn
            .prepare("SELECT n, hash, edges, eigenvalues, family, polynomial FROM analytic_graphs")?;
        let rows: Vec<(i64, String, String, String, Option<String>, Option<String>)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;
        for (n, hash, edges, eigenvalues, family, polynomial) in rows {
            let entry = AnalyticEntry {
                edges: from_json(&edges, "edges")?,
                eigenvalues: from_json(&eigenvalues, "eigenvalues")?,
                family: family.map(|f| from_json(&f, "family")).transpose()?,
                polynomial: polynomial.map(|p| from_json(&p, "polynomial")).transpose()?,
            };
            levels.entry(level_index(n)?).or_default().analytic.insert(hash, entry);
        }

        let mut stmt = self.conn.prepare("SELECT n, poly_hash FROM non_analytic")?;
        let rows: Vec<(i64, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<_, _>>()?;
        for (n, key) in rows {
            levels.entry(level_index(n)?).or_default().non_analytic.insert(key);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT n, poly_hash, analytic, eigenvalues, reason FROM polynomial_cache")?;
        let rows: Vec<(i64, String, bool, Option<String>, Option<String>)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get::<_, i32>(2)? != 0,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;
        for (n, key, analytic, eigenvalues, reason) in rows {
            let entry = PolynomialEntry {
                analytic,
                eigenvalues: eigenvalues
                    .map(|e| from_json(&e, "eigenvalues"))
                    .transpose()?,
                reason,
            };
            levels
                .entry(level_index(n)?)
                .or_default()
                .polynomial_cache
                .insert(key, entry);
        }

        let mut stmt = self.conn.prepare(
            "SELECT n, hash, rule, left_hash, right_hash, edges, eigenvalues FROM product_cache",
        )?;
        let rows: Vec<(i64, String, String, String, String, String, String)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;
        for (n, hash, rule, left, right, edges, eigenvalues) in rows {
            let entry = ProductEntry {
                rule: from_json(&rule, "rule")?,
                left,
                right,
                edges: from_json(&edges, "edges")?,
                eigenvalues: from_json(&eigenvalues, "eigenvalues")?,
            };
            levels.entry(level_index(n)?).or_default().products.insert(hash, entry);
        }

        Ok(AnalyticDatabase::from_levels(levels, tol))
    }

    // --- Maintenance ---

    pub fn reset(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        schema::clear_tables(&tx)?;
        tx.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![FORMAT_VERSION_KEY, CURRENT_VERSION],
        )?;
        tx.commit()?;
        tracing::info!("analytic cache reset");
        Ok(())
    }

    /// Row counts per vertex count, without loading entries.
    pub fn stats(&self) -> Result<DatabaseStats> {
        let mut levels: BTreeMap<usize, LevelStats> = BTreeMap::new();
        for table in ["analytic_graphs", "non_analytic", "polynomial_cache", "product_cache"] {
            let mut stmt = self
                .conn
                .prepare(&format!("SELECT n, count(*) FROM {table} GROUP BY n"))?;
            let rows: Vec<(i64, i64)> = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<_, _>>()?;
            for (n, count) in rows {
                let n = level_index(n)?;
                let level = levels.entry(n).or_insert(LevelStats {
                    n,
                    analytic: 0,
                    non_analytic: 0,
                    polynomials: 0,
                    products: 0,
                });
                let count = count as usize;
                match table {
                    "analytic_graphs" => level.analytic = count,
                    "non_analytic" => level.non_analytic = count,
                    "polynomial_cache" => level.polynomials = count,
                    _ => level.products = count,
                }
            }
        }

        let mut stats = DatabaseStats::default();
        for level in levels.into_values() {
            stats.analytic += level.analytic;
            stats.non_analytic += level.non_analytic;
            stats.polynomials += level.polynomials;
            stats.products += level.products;
            stats.levels.push(level);
        }
        Ok(stats)
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn from_json<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| StoreError::InvalidData(format!("invalid {what} '{raw}': {e}")))
}

fn level_index(n: i64) -> Result<usize> {
    usize::try_from(n).map_err(|_| StoreError::InvalidData(format!("invalid vertex count {n}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectra_core::{CancelFlag, Graph, Matrix, MatrixKind};

    fn make_database() -> AnalyticDatabase {
        let mut db = AnalyticDatabase::new(Tolerances::default());
        db.seed_known_families(5);
        db.precompute_products(4);
        let cancel = CancelFlag::new();
        let diamond = Graph::new(4, &[(0, 1), (1, 2), (2, 0), (1, 3), (2, 3)]).unwrap();
        db.analyze_graph(&diamond, MatrixKind::Symmetric, &cancel).unwrap();
        let c4 = Matrix::orientation(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]).unwrap();
        db.analyze_matrix(&c4, &cancel).unwrap();
        db
    }

    fn non_empty_levels(db: &AnalyticDatabase) -> Vec<(usize, VertexLevel)> {
        db.levels()
            .iter()
            .filter(|(_, level)| !level.is_empty())
            .map(|(&n, level)| (n, level.clone()))
            .collect()
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let original = make_database();
        store.save_database(&original).unwrap();

        let loaded = store.load_database(Tolerances::default()).unwrap();
        assert_eq!(non_empty_levels(&loaded), non_empty_levels(&original));
    }

    #[test]
    fn test_save_replaces_previous_contents() {
        let store = Store::open_in_memory().unwrap();
        store.save_database(&make_database()).unwrap();

        let mut small = AnalyticDatabase::new(Tolerances::default());
        small.seed_known_families(2);
        store.save_database(&small).unwrap();

        let loaded = store.load_database(Tolerances::default()).unwrap();
        assert_eq!(loaded.stats().analytic, 3);
        assert_eq!(loaded.stats().products, 0);
    }

    #[test]
    fn test_stats_match_in_memory_counts() {
        let store = Store::open_in_memory().unwrap();
        let db = make_database();
        store.save_database(&db).unwrap();
        let stored = store.stats().unwrap();
        let memory = db.stats();
        assert_eq!(stored.analytic, memory.analytic);
        assert_eq!(stored.non_analytic, memory.non_analytic);
        assert_eq!(stored.polynomials, memory.polynomials);
        assert_eq!(stored.products, memory.products);
        assert!(!stored.levels.is_empty());
    }

    #[test]
    fn test_format_mismatch_resets() {
        let store = Store::open_in_memory().unwrap();
        store.save_database(&make_database()).unwrap();
        store.set_metadata(FORMAT_VERSION_KEY, "0.0").unwrap();

        let loaded = store.load_database(Tolerances::default()).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(store.stats().unwrap().analytic, 0);
        assert_eq!(
            store.get_metadata(FORMAT_VERSION_KEY).unwrap().as_deref(),
            Some(CURRENT_VERSION)
        );
    }

    #[test]
    fn test_corrupt_row_is_invalid_data() {
        let store = Store::open_in_memory().unwrap();
        store
            .conn()
            .execute(
                "INSERT INTO analytic_graphs (n, hash, edges, eigenvalues) VALUES (2, 'h', 'oops', '[]')",
                [],
            )
            .unwrap();
        let err = store.load_database(Tolerances::default()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)), "{err}");
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spectra.db");
        {
            let store = Store::open(&path).unwrap();
            store.save_database(&make_database()).unwrap();
        }
        let store = Store::open(&path).unwrap();
        let loaded = store.load_database(Tolerances::default()).unwrap();
        assert_eq!(non_empty_levels(&loaded), non_empty_levels(&make_database()));
    }
}
