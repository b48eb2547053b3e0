use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectraError};

/// Which structure an integer matrix carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixKind {
    /// Adjacency: symmetric, entries in {0, 1}
    Symmetric,
    /// Orientation: A[i][j] = −A[j][i], entries in {-1, 0, 1}
    Antisymmetric,
}

impl MatrixKind {
    pub fn label(self) -> &'static str {
        match self {
            MatrixKind::Symmetric => "symmetric",
            MatrixKind::Antisymmetric => "antisymmetric",
        }
    }
}

/// Immutable validated n×n integer matrix. The all-zero matrix is symmetric.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matrix {
    n: usize,
    data: Vec<i64>,
    kind: MatrixKind,
}

impl Matrix {
    pub fn from_rows(rows: &[Vec<i64>]) -> Result<Self> {
        let n = rows.len();
        let mut data = Vec::with_capacity(n * n);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(SpectraError::NotSquare {
                    rows: n,
                    row: i,
                    len: row.len(),
                });
            }
            for (j, &v) in row.iter().enumerate() {
                if !(-1..=1).contains(&v) {
                    return Err(SpectraError::InvalidEntry {
                        row: i,
                        col: j,
                        value: v.to_string(),
                    });
                }
                data.push(v);
            }
        }
        let kind = classify(n, &data)?;
        Ok(Self { n, data, kind })
    }

    /// Parse and validate a JSON array of integer rows.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let outer = value.as_array().ok_or(SpectraError::NotTwoDimensional)?;
        let mut rows = Vec::with_capacity(outer.len());
        for (i, row) in outer.iter().enumerate() {
            let cells = row.as_array().ok_or(SpectraError::NotTwoDimensional)?;
            let mut parsed = Vec::with_capacity(cells.len());
            for (j, cell) in cells.iter().enumerate() {
                if cell.is_array() {
                    return Err(SpectraError::NotTwoDimensional);
                }
                let v = cell
                    .as_i64()
                    .or_else(|| {
                        cell.as_f64()
                            .filter(|f| f.fract() == 0.0 && f.abs() <= 1.0)
                            .map(|f| f as i64)
                    })
                    .ok_or_else(|| SpectraError::InvalidEntry {
                        row: i,
                        col: j,
                        value: cell.to_string(),
                    })?;
                parsed.push(v);
            }
            rows.push(parsed);
        }
        Self::from_rows(&rows)
    }

    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![0; n * n],
            kind: MatrixKind::Symmetric,
        }
    }

    /// Adjacency matrix of an undirected simple graph.
    pub fn adjacency(n: usize, edges: &[(usize, usize)]) -> Result<Self> {
        for &(u, v) in edges {
            check_pair(n, u, v)?;
        }
        Ok(Self::from_pairs(n, edges, MatrixKind::Symmetric))
    }

    /// Orientation matrix: each arc u→v sets A[u][v] = 1 and A[v][u] = −1.
    pub fn orientation(n: usize, arcs: &[(usize, usize)]) -> Result<Self> {
        for &(u, v) in arcs {
            check_pair(n, u, v)?;
        }
        Ok(Self::from_pairs(n, arcs, MatrixKind::Antisymmetric))
    }

    /// Pairs must already be in range and loop-free.
    pub(crate) fn from_pairs(n: usize, pairs: &[(usize, usize)], kind: MatrixKind) -> Self {
        let mut data = vec![0; n * n];
        let back = match kind {
            MatrixKind::Symmetric => 1,
            MatrixKind::Antisymmetric => -1,
        };
        for &(u, v) in pairs {
            data[u * n + v] = 1;
            data[v * n + u] = back;
        }
        let kind = if data.iter().all(|&v| v == 0) {
            MatrixKind::Symmetric
        } else {
            kind
        };
        Self { n, data, kind }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn kind(&self) -> MatrixKind {
        self.kind
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }

    pub fn get(&self, i: usize, j: usize) -> i64 {
        self.data[i * self.n + j]
    }

    pub fn rows(&self) -> Vec<Vec<i64>> {
        self.data.chunks(self.n.max(1)).take(self.n).map(<[i64]>::to_vec).collect()
    }

    /// Unordered pairs {i, j}, i < j, with a non-zero entry.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for i in 0..self.n {
            for j in (i + 1)..self.n {
                if self.get(i, j) != 0 {
                    out.push((i, j));
                }
            }
        }
        out
    }

    /// Adjacency of the underlying undirected graph, |A| with a zero diagonal.
    pub fn underlying_adjacency(&self) -> Matrix {
        Self::from_pairs(self.n, &self.edges(), MatrixKind::Symmetric)
    }

    /// Orientation of the underlying graph with every edge pointing low → high
    /// index, unless the matrix already is antisymmetric.
    pub fn underlying_orientation(&self) -> Matrix {
        if self.kind == MatrixKind::Antisymmetric {
            return self.clone();
        }
        Self::from_pairs(self.n, &self.edges(), MatrixKind::Antisymmetric)
    }

    pub fn to_real(&self) -> RealMatrix {
        RealMatrix {
            n: self.n,
            data: self.data.iter().map(|&v| v as f64).collect(),
        }
    }
}

fn check_pair(n: usize, u: usize, v: usize) -> Result<()> {
    for vertex in [u, v] {
        if vertex >= n {
            return Err(SpectraError::VertexOutOfRange { vertex, n });
        }
    }
    if u == v {
        return Err(SpectraError::SelfLoop { vertex: u });
    }
    Ok(())
}

fn classify(n: usize, data: &[i64]) -> Result<MatrixKind> {
    let at = |i: usize, j: usize| data[i * n + j];
    let symmetric = data.iter().all(|&v| v >= 0)
        && (0..n).all(|i| (0..n).all(|j| at(i, j) == at(j, i)));
    if symmetric {
        return Ok(MatrixKind::Symmetric);
    }
    let antisymmetric = (0..n).all(|i| (0..n).all(|j| at(i, j) == -at(j, i)));
    if antisymmetric {
        return Ok(MatrixKind::Antisymmetric);
    }
    Err(SpectraError::NotSymmetric)
}

/// Dense row-major f64 matrix used by the numeric solvers.
#[derive(Clone, Debug, PartialEq)]
pub struct RealMatrix {
    n: usize,
    data: Vec<f64>,
}

impl RealMatrix {
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![0.0; n * n],
        }
    }

    /// Build from rows; rows must form an n×n grid.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        let mut data = Vec::with_capacity(n * n);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(SpectraError::NotSquare {
                    rows: n,
                    row: i,
                    len: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { n, data })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, v: f64) {
        self.data[i * self.n + j] = v;
    }

    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        (0..self.n)
            .map(|i| {
                let row = &self.data[i * self.n..(i + 1) * self.n];
                row.iter().zip(x).map(|(a, b)| a * b).sum()
            })
            .collect()
    }

    pub fn mul(&self, other: &RealMatrix) -> RealMatrix {
        let n = self.n;
        let mut out = RealMatrix::zeros(n);
        for i in 0..n {
            for k in 0..n {
                let a = self.get(i, k);
                if a == 0.0 {
                    continue;
                }
                for j in 0..n {
                    out.data[i * n + j] += a * other.get(k, j);
                }
            }
        }
        out
    }

    pub fn scale(mut self, s: f64) -> RealMatrix {
        for v in &mut self.data {
            *v *= s;
        }
        self
    }

    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |m, v| m.max(v.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_adjacency() {
        let m = Matrix::from_rows(&[vec![0, 1], vec![1, 0]]).unwrap();
        assert_eq!(m.kind(), MatrixKind::Symmetric);
        assert_eq!(m.edges(), vec![(0, 1)]);
    }

    #[test]
    fn test_classify_orientation() {
        let m = Matrix::from_rows(&[vec![0, 1], vec![-1, 0]]).unwrap();
        assert_eq!(m.kind(), MatrixKind::Antisymmetric);
    }

    #[test]
    fn test_zero_matrix_is_symmetric() {
        let m = Matrix::from_rows(&[vec![0, 0], vec![0, 0]]).unwrap();
        assert_eq!(m.kind(), MatrixKind::Symmetric);
        assert!(m.is_zero());
    }

    #[test]
    fn test_rejects_non_square() {
        let err = Matrix::from_rows(&[vec![0, 1], vec![1]]).unwrap_err();
        assert!(matches!(err, SpectraError::NotSquare { row: 1, len: 1, .. }));
    }

    #[test]
    fn test_rejects_bad_entry() {
        let err = Matrix::from_rows(&[vec![0, 2], vec![2, 0]]).unwrap_err();
        assert!(matches!(err, SpectraError::InvalidEntry { row: 0, col: 1, .. }));
    }

    #[test]
    fn test_rejects_mixed_structure() {
        let err = Matrix::from_rows(&[vec![0, 1], vec![0, 0]]).unwrap_err();
        assert_eq!(err, SpectraError::NotSymmetric);
    }

    #[test]
    fn test_from_json_shapes() {
        assert!(Matrix::from_json(&json!([[0, 1], [1, 0]])).is_ok());
        assert!(Matrix::from_json(&json!([[0.0, 1.0], [1.0, 0.0]])).is_ok());
        assert_eq!(
            Matrix::from_json(&json!([0, 1])).unwrap_err(),
            SpectraError::NotTwoDimensional
        );
        assert_eq!(
            Matrix::from_json(&json!([[[0]]])).unwrap_err(),
            SpectraError::NotTwoDimensional
        );
        assert!(matches!(
            Matrix::from_json(&json!([[0, 0.5], [0.5, 0]])).unwrap_err(),
            SpectraError::InvalidEntry { .. }
        ));
        assert_eq!(Matrix::from_json(&json!([])).unwrap().n(), 0);
    }

    #[test]
    fn test_orientation_follows_arc_direction() {
        let m = Matrix::orientation(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]).unwrap();
        assert_eq!(m.get(3, 0), 1);
        assert_eq!(m.get(0, 3), -1);
        assert_eq!(m.kind(), MatrixKind::Antisymmetric);
    }

    #[test]
    fn test_adjacency_rejects_loops_and_range() {
        assert_eq!(
            Matrix::adjacency(3, &[(1, 1)]).unwrap_err(),
            SpectraError::SelfLoop { vertex: 1 }
        );
        assert_eq!(
            Matrix::adjacency(3, &[(0, 3)]).unwrap_err(),
            SpectraError::VertexOutOfRange { vertex: 3, n: 3 }
        );
    }

    #[test]
    fn test_underlying_conversions() {
        let m = Matrix::orientation(3, &[(2, 0), (1, 2)]).unwrap();
        let adj = m.underlying_adjacency();
        assert_eq!(adj.kind(), MatrixKind::Symmetric);
        assert_eq!(adj.edges(), vec![(0, 2), (1, 2)]);
        let back = adj.underlying_orientation();
        assert_eq!(back.get(0, 2), 1);
        assert_eq!(back.get(2, 0), -1);
    }

    #[test]
    fn test_real_mul() {
        let a = Matrix::from_rows(&[vec![0, 1], vec![1, 0]]).unwrap().to_real();
        let sq = a.mul(&a);
        assert_eq!(sq.get(0, 0), 1.0);
        assert_eq!(sq.get(0, 1), 0.0);
    }
}
