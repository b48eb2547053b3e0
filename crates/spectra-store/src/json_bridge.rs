use std::fs;
use std::path::Path;

use spectra_core::{ImportOutcome, Tolerances, export_json, import_json};

use crate::error::{Result, StoreError};
use crate::store::Store;

impl Store {
    /// Import a JSON snapshot file, replacing the stored cache.
    pub fn import_json_file(&self, path: &Path, tol: Tolerances) -> Result<ImportOutcome> {
        let json = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        self.import_json_str(&json, tol)
    }

    /// Import a JSON snapshot string. A snapshot from another format version
    /// leaves the store empty.
    pub fn import_json_str(&self, json: &str, tol: Tolerances) -> Result<ImportOutcome> {
        let (db, outcome) =
            import_json(json, tol).map_err(|e| StoreError::InvalidData(format!("invalid JSON: {e}")))?;
        if let ImportOutcome::VersionMismatch { found } = &outcome {
            tracing::warn!(found = %found, "snapshot version mismatch, cache reset");
        }
        self.save_database(&db)?;
        Ok(outcome)
    }

    pub fn export_json_file(&self, path: &Path, tol: Tolerances) -> Result<()> {
        let json = self.export_json_string(tol)?;
        fs::write(path, json).map_err(|e| {
            StoreError::InvalidData(format!("failed to write {}: {e}", path.display()))
        })
    }

    pub fn export_json_string(&self, tol: Tolerances) -> Result<String> {
        let db = self.load_database(tol)?;
        export_json(&db).map_err(|e| StoreError::InvalidData(format!("JSON export failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectra_core::AnalyticDatabase;

    fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        let mut db = AnalyticDatabase::new(Tolerances::default());
        db.seed_known_families(5);
        db.precompute_products(4);
        store.save_database(&db).unwrap();
        store
    }

    #[test]
    fn test_export_import_roundtrip() {
        let store = seeded_store();
        let json = store.export_json_string(Tolerances::default()).unwrap();

        let other = Store::open_in_memory().unwrap();
        let outcome = other.import_json_str(&json, Tolerances::default()).unwrap();
        assert_eq!(outcome, ImportOutcome::Loaded);
        assert_eq!(
            other.stats().unwrap().analytic,
            store.stats().unwrap().analytic
        );
        assert_eq!(other.export_json_string(Tolerances::default()).unwrap(), json);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let store = seeded_store();
        store.export_json_file(&path, Tolerances::default()).unwrap();

        let other = Store::open_in_memory().unwrap();
        other.import_json_file(&path, Tolerances::default()).unwrap();
        assert_eq!(other.stats().unwrap(), store.stats().unwrap());
    }

    #[test]
    fn test_version_mismatch_empties_store() {
        let store = seeded_store();
        let outcome = store
            .import_json_str(r#"{"version":"0.1","levels":{}}"#, Tolerances::default())
            .unwrap();
        assert_eq!(
            outcome,
            ImportOutcome::VersionMismatch {
                found: "0.1".to_string()
            }
        );
        assert_eq!(store.stats().unwrap().analytic, 0);
    }

    #[test]
    fn test_malformed_json_keeps_store() {
        let store = seeded_store();
        let before = store.stats().unwrap();
        let err = store
            .import_json_str("{not json", Tolerances::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
        assert_eq!(store.stats().unwrap(), before);
    }

    #[test]
    fn test_missing_file() {
        let store = Store::open_in_memory().unwrap();
        let err = store
            .import_json_file(Path::new("/nonexistent/snapshot.json"), Tolerances::default())
            .unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
