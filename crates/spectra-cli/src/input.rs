//! Graph and matrix arguments shared by the CLI commands and the MCP tools.

use anyhow::{Context, Result, bail};
use spectra_core::{Graph, Matrix, MatrixKind, orientation_from_arcs};

/// Parse `"0-1,1-2,2-0"` into vertex pairs. Whitespace is ignored.
pub fn parse_edges(text: &str) -> Result<Vec<(usize, usize)>> {
    let mut edges = Vec::new();
    for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Some((u, v)) = item.split_once('-') else {
            bail!("edge '{item}' is not of the form u-v");
        };
        let u = u
            .trim()
            .parse::<usize>()
            .with_context(|| format!("invalid vertex in edge '{item}'"))?;
        let v = v
            .trim()
            .parse::<usize>()
            .with_context(|| format!("invalid vertex in edge '{item}'"))?;
        edges.push((u, v));
    }
    Ok(edges)
}

/// Either a full matrix or (n, edge list); exactly one must be given.
#[derive(Debug, Default)]
pub struct GraphInput<'a> {
    pub matrix: Option<&'a serde_json::Value>,
    pub n: Option<usize>,
    pub edges: Option<&'a [(usize, usize)]>,
}

impl GraphInput<'_> {
    /// Build the matrix to analyse. Edge lists become the adjacency matrix,
    /// or the orientation with arcs as listed when `kind` is antisymmetric.
    pub fn to_matrix(&self, kind: MatrixKind) -> Result<Matrix> {
        match (self.matrix, self.n) {
            (Some(raw), None) => {
                let matrix = Matrix::from_json(raw).context("invalid matrix")?;
                Ok(match kind {
                    MatrixKind::Symmetric => matrix,
                    MatrixKind::Antisymmetric if matrix.kind() == MatrixKind::Symmetric => {
                        matrix.underlying_orientation()
                    }
                    MatrixKind::Antisymmetric => matrix,
                })
            }
            (None, Some(n)) => {
                let edges = self.edges.unwrap_or_default();
                let matrix = match kind {
                    MatrixKind::Symmetric => Matrix::adjacency(n, edges),
                    MatrixKind::Antisymmetric => orientation_from_arcs(n, edges),
                };
                matrix.context("invalid edge list")
            }
            (Some(_), Some(_)) => bail!("give either a matrix or a vertex count, not both"),
            (None, None) => bail!("a matrix or a vertex count is required"),
        }
    }

    pub fn to_graph(&self) -> Result<Graph> {
        match (self.matrix, self.n) {
            (None, Some(n)) => {
                Graph::new(n, self.edges.unwrap_or_default()).context("invalid edge list")
            }
            _ => Ok(Graph::from_matrix(&self.to_matrix(MatrixKind::Symmetric)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edges() {
        assert_eq!(parse_edges("0-1, 1-2,2-0").unwrap(), vec![(0, 1), (1, 2), (2, 0)]);
        assert!(parse_edges("").unwrap().is_empty());
        assert!(parse_edges("0:1").is_err());
        assert!(parse_edges("a-1").is_err());
    }

    #[test]
    fn test_edges_to_matrix() {
        let edges = [(0, 1), (1, 2)];
        let input = GraphInput {
            n: Some(3),
            edges: Some(&edges),
            ..Default::default()
        };
        let adjacency = input.to_matrix(MatrixKind::Symmetric).unwrap();
        assert_eq!(adjacency.get(1, 0), 1);
        let orientation = input.to_matrix(MatrixKind::Antisymmetric).unwrap();
        assert_eq!(orientation.get(0, 1), 1);
        assert_eq!(orientation.get(1, 0), -1);
    }

    #[test]
    fn test_matrix_input() {
        let raw = serde_json::json!([[0, 1], [1, 0]]);
        let input = GraphInput {
            matrix: Some(&raw),
            ..Default::default()
        };
        assert_eq!(input.to_matrix(MatrixKind::Symmetric).unwrap().kind(), MatrixKind::Symmetric);
        assert_eq!(
            input.to_matrix(MatrixKind::Antisymmetric).unwrap().kind(),
            MatrixKind::Antisymmetric
        );
        assert_eq!(input.to_graph().unwrap().edge_count(), 1);
    }

    #[test]
    fn test_missing_or_conflicting_input() {
        assert!(GraphInput::default().to_matrix(MatrixKind::Symmetric).is_err());
        let raw = serde_json::json!([[0]]);
        let both = GraphInput {
            matrix: Some(&raw),
            n: Some(1),
            edges: None,
        };
        assert!(both.to_matrix(MatrixKind::Symmetric).is_err());
    }
}
