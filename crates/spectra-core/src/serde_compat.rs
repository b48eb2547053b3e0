//! Versioned JSON snapshot of the analytic database.
//!
//! `{version, levels: {n: {analytic, nonAnalytic, polynomialCache, products}}}`.
//! A snapshot written by another version is discarded rather than migrated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::Tolerances;
use crate::database::{AnalyticDatabase, VertexLevel};

pub const CURRENT_VERSION: &str = "1.0";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DatabaseSnapshot {
    pub version: String,
    #[serde(default)]
    pub levels: BTreeMap<usize, VertexLevel>,
}

impl DatabaseSnapshot {
    pub fn from_database(db: &AnalyticDatabase) -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            levels: db
                .levels()
                .iter()
                .filter(|(_, level)| !level.is_empty())
                .map(|(&n, level)| (n, level.clone()))
                .collect(),
        }
    }

    pub fn into_database(self, tol: Tolerances) -> AnalyticDatabase {
        AnalyticDatabase::from_levels(self.levels, tol)
    }
}

/// What `import_json` found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Loaded,
    /// The snapshot carried another version; the database starts empty.
    VersionMismatch { found: String },
}

/// Serialize the database to pretty JSON.
pub fn export_json(db: &AnalyticDatabase) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&DatabaseSnapshot::from_database(db))
}

/// Deserialize a snapshot. The version is read before the body so that a
/// snapshot from another version resets instead of failing to parse.
pub fn import_json(
    json: &str,
    tol: Tolerances,
) -> Result<(AnalyticDatabase, ImportOutcome), serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let found = value
        .get("version")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();
    if found != CURRENT_VERSION {
        return Ok((
            AnalyticDatabase::new(tol),
            ImportOutcome::VersionMismatch { found },
        ));
    }
    let snapshot: DatabaseSnapshot = serde_json::from_value(value)?;
    Ok((snapshot.into_database(tol), ImportOutcome::Loaded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelFlag;
    use crate::graph::Graph;
    use crate::matrix::MatrixKind;

    fn populated() -> AnalyticDatabase {
        let mut db = AnalyticDatabase::new(Tolerances::default());
        db.seed_known_families(4);
        db.precompute_products(4);
        let diamond = Graph::new(4, &[(0, 1), (1, 2), (2, 0), (1, 3), (2, 3)]).unwrap();
        db.analyze_graph(&diamond, MatrixKind::Symmetric, &CancelFlag::new())
            .unwrap();
        db
    }

    #[test]
    fn test_roundtrip() {
        let db = populated();
        let json = export_json(&db).unwrap();
        let (db2, outcome) = import_json(&json, Tolerances::default()).unwrap();
        assert_eq!(outcome, ImportOutcome::Loaded);
        assert_eq!(db.levels(), db2.levels());
        assert_eq!(db.stats(), db2.stats());
    }

    #[test]
    fn test_wire_field_names() {
        let json = export_json(&populated()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], CURRENT_VERSION);
        let level = &value["levels"]["4"];
        for key in ["analytic", "nonAnalytic", "polynomialCache", "products"] {
            assert!(level.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_version_mismatch_resets() {
        let json = r#"{"version": "0.1", "levels": {"3": {"analytic": "garbage"}}}"#;
        let (db, outcome) = import_json(json, Tolerances::default()).unwrap();
        assert_eq!(
            outcome,
            ImportOutcome::VersionMismatch {
                found: "0.1".to_string()
            }
        );
        assert!(db.is_empty());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(import_json("{not json", Tolerances::default()).is_err());
        let bad_body = format!(r#"{{"version": "{CURRENT_VERSION}", "levels": 7}}"#);
        assert!(import_json(&bad_body, Tolerances::default()).is_err());
    }
}
