use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectraError};
use crate::matrix::{Matrix, MatrixKind, RealMatrix};

/// Simple undirected graph on vertices 0..n.
///
/// Edges are normalised to (low, high), sorted and deduplicated.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Graph {
    n: usize,
    edges: Vec<(usize, usize)>,
}

impl Graph {
    pub fn new(n: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut normalised = Vec::with_capacity(edges.len());
        for &(u, v) in edges {
            for vertex in [u, v] {
                if vertex >= n {
                    return Err(SpectraError::VertexOutOfRange { vertex, n });
                }
            }
            if u == v {
                return Err(SpectraError::SelfLoop { vertex: u });
            }
            normalised.push((u.min(v), u.max(v)));
        }
        normalised.sort_unstable();
        normalised.dedup();
        Ok(Self {
            n,
            edges: normalised,
        })
    }

    /// Normalise edges already known to be in range and loop-free.
    pub(crate) fn from_valid_edges(n: usize, edges: Vec<(usize, usize)>) -> Self {
        let mut edges: Vec<_> = edges.into_iter().map(|(u, v)| (u.min(v), u.max(v))).collect();
        edges.sort_unstable();
        edges.dedup();
        Self { n, edges }
    }

    pub fn empty(n: usize) -> Self {
        Self {
            n,
            edges: Vec::new(),
        }
    }

    /// Underlying undirected graph of either matrix kind.
    pub fn from_matrix(matrix: &Matrix) -> Self {
        Self {
            n: matrix.n(),
            edges: matrix.edges(),
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn neighbours(&self) -> Vec<Vec<usize>> {
        let mut adj = vec![Vec::new(); self.n];
        for &(u, v) in &self.edges {
            adj[u].push(v);
            adj[v].push(u);
        }
        adj
    }

    pub fn degrees(&self) -> Vec<usize> {
        let mut deg = vec![0; self.n];
        for &(u, v) in &self.edges {
            deg[u] += 1;
            deg[v] += 1;
        }
        deg
    }

    pub fn max_degree(&self) -> usize {
        self.degrees().into_iter().max().unwrap_or(0)
    }

    pub fn adjacency_matrix(&self) -> Matrix {
        Matrix::from_pairs(self.n, &self.edges, MatrixKind::Symmetric)
    }

    /// Every edge oriented low → high index.
    pub fn orientation_matrix(&self) -> Matrix {
        Matrix::from_pairs(self.n, &self.edges, MatrixKind::Antisymmetric)
    }

    /// L = D − A
    pub fn laplacian(&self) -> RealMatrix {
        let mut l = RealMatrix::zeros(self.n);
        for (i, d) in self.degrees().into_iter().enumerate() {
            l.set(i, i, d as f64);
        }
        for &(u, v) in &self.edges {
            l.set(u, v, -1.0);
            l.set(v, u, -1.0);
        }
        l
    }

    /// BFS distances from `source`; `None` for unreachable vertices.
    pub fn distances_from(&self, source: usize) -> Vec<Option<usize>> {
        let adj = self.neighbours();
        let mut dist = vec![None; self.n];
        let mut queue = VecDeque::new();
        dist[source] = Some(0);
        queue.push_back(source);
        while let Some(u) = queue.pop_front() {
            let du = dist[u].unwrap_or(0);
            for &w in &adj[u] {
                if dist[w].is_none() {
                    dist[w] = Some(du + 1);
                    queue.push_back(w);
                }
            }
        }
        dist
    }

    /// Connected components, each sorted, ordered by smallest vertex.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.n];
        let mut out = Vec::new();
        for start in 0..self.n {
            if seen[start] {
                continue;
            }
            let mut component: Vec<usize> = self
                .distances_from(start)
                .iter()
                .enumerate()
                .filter_map(|(v, d)| d.map(|_| v))
                .collect();
            component.sort_unstable();
            for &v in &component {
                seen[v] = true;
            }
            out.push(component);
        }
        out
    }

    pub fn is_connected(&self) -> bool {
        self.n <= 1 || self.components().len() == 1
    }

    /// Subgraph on `vertices`, relabelled 0.. in the given order.
    pub fn induced(&self, vertices: &[usize]) -> Graph {
        let mut index = vec![None; self.n];
        for (i, &v) in vertices.iter().enumerate() {
            if v < self.n {
                index[v] = Some(i);
            }
        }
        let mut edges: Vec<(usize, usize)> = self
            .edges
            .iter()
            .filter_map(|&(u, v)| match (index[u], index[v]) {
                (Some(a), Some(b)) => Some((a.min(b), a.max(b))),
                _ => None,
            })
            .collect();
        edges.sort_unstable();
        Graph {
            n: vertices.len(),
            edges,
        }
    }

    /// Vertex i of `self` stays i; vertex j of `other` becomes n + j.
    pub fn disjoint_union(&self, other: &Graph) -> Graph {
        let offset = self.n;
        let mut edges = self.edges.clone();
        edges.extend(other.edges.iter().map(|&(u, v)| (u + offset, v + offset)));
        Graph {
            n: self.n + other.n,
            edges,
        }
    }

    /// Image of the graph under `perm`, where vertex v becomes perm[v].
    pub fn relabel(&self, perm: &[usize]) -> Result<Graph> {
        let image = |v: usize| perm.get(v).copied().unwrap_or(usize::MAX);
        let mapped: Vec<(usize, usize)> =
            self.edges.iter().map(|&(u, v)| (image(u), image(v))).collect();
        Graph::new(self.n, &mapped)
    }

    /// Two-colouring, if one exists.
    pub fn bipartition(&self) -> Option<Vec<bool>> {
        let adj = self.neighbours();
        let mut colour: Vec<Option<bool>> = vec![None; self.n];
        for start in 0..self.n {
            if colour[start].is_some() {
                continue;
            }
            colour[start] = Some(false);
            let mut queue = VecDeque::from([start]);
            while let Some(u) = queue.pop_front() {
                let cu = colour[u].unwrap_or(false);
                for &w in &adj[u] {
                    match colour[w] {
                        None => {
                            colour[w] = Some(!cu);
                            queue.push_back(w);
                        }
                        Some(cw) if cw == cu => return None,
                        Some(_) => {}
                    }
                }
            }
        }
        Some(colour.into_iter().map(|c| c.unwrap_or(false)).collect())
    }

    /// Length of the shortest cycle, `None` for forests.
    pub fn girth(&self) -> Option<usize> {
        let adj = self.neighbours();
        let mut best: Option<usize> = None;
        for source in 0..self.n {
            let mut dist = vec![usize::MAX; self.n];
            let mut parent = vec![usize::MAX; self.n];
            dist[source] = 0;
            let mut queue = VecDeque::from([source]);
            while let Some(u) = queue.pop_front() {
                for &w in &adj[u] {
                    if dist[w] == usize::MAX {
                        dist[w] = dist[u] + 1;
                        parent[w] = u;
                        queue.push_back(w);
                    } else if parent[u] != w {
                        let cycle = dist[u] + dist[w] + 1;
                        best = Some(best.map_or(cycle, |b| b.min(cycle)));
                    }
                }
            }
        }
        best
    }
}

/// Orientation matrix with every arc pointing as listed, u→v ⇒ A[u][v] = 1.
pub fn orientation_from_arcs(n: usize, arcs: &[(usize, usize)]) -> Result<Matrix> {
    Matrix::orientation(n, arcs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(n: usize) -> Graph {
        let edges: Vec<_> = (0..n).map(|i| (i, (i + 1) % n)).collect();
        Graph::new(n, &edges).unwrap()
    }

    #[test]
    fn test_normalises_edges() {
        let g = Graph::new(3, &[(2, 0), (0, 2), (1, 0)]).unwrap();
        assert_eq!(g.edges(), &[(0, 1), (0, 2)]);
        assert_eq!(g.degrees(), vec![2, 1, 1]);
    }

    #[test]
    fn test_rejects_invalid_edges() {
        assert_eq!(
            Graph::new(2, &[(0, 0)]).unwrap_err(),
            SpectraError::SelfLoop { vertex: 0 }
        );
        assert_eq!(
            Graph::new(2, &[(0, 5)]).unwrap_err(),
            SpectraError::VertexOutOfRange { vertex: 5, n: 2 }
        );
    }

    #[test]
    fn test_components_and_induced() {
        let g = Graph::new(5, &[(0, 1), (3, 4)]).unwrap();
        let comps = g.components();
        assert_eq!(comps, vec![vec![0, 1], vec![2], vec![3, 4]]);
        assert!(!g.is_connected());
        let sub = g.induced(&comps[2]);
        assert_eq!(sub.n(), 2);
        assert_eq!(sub.edges(), &[(0, 1)]);
    }

    #[test]
    fn test_laplacian_rows_sum_to_zero() {
        let l = cycle(5).laplacian();
        for i in 0..5 {
            let row: f64 = (0..5).map(|j| l.get(i, j)).sum();
            assert_eq!(row, 0.0);
        }
        assert_eq!(l.get(0, 0), 2.0);
    }

    #[test]
    fn test_bipartite_and_girth() {
        assert!(cycle(6).bipartition().is_some());
        assert!(cycle(5).bipartition().is_none());
        assert_eq!(cycle(5).girth(), Some(5));
        assert_eq!(cycle(4).girth(), Some(4));
        assert_eq!(Graph::new(3, &[(0, 1), (1, 2)]).unwrap().girth(), None);
    }

    #[test]
    fn test_disjoint_union_and_relabel() {
        let k2 = Graph::new(2, &[(0, 1)]).unwrap();
        let u = k2.disjoint_union(&k2);
        assert_eq!(u.edges(), &[(0, 1), (2, 3)]);
        let r = u.relabel(&[3, 2, 1, 0]).unwrap();
        assert_eq!(r.edges(), &[(0, 1), (2, 3)]);
    }

    #[test]
    fn test_matrix_views() {
        let g = cycle(4);
        assert_eq!(g.adjacency_matrix().kind(), MatrixKind::Symmetric);
        let o = g.orientation_matrix();
        assert_eq!(o.get(0, 3), 1);
        assert_eq!(o.get(3, 0), -1);
        assert_eq!(Graph::from_matrix(&o), g);
        assert_eq!(Graph::empty(3).orientation_matrix().kind(), MatrixKind::Symmetric);
    }

    #[test]
    fn test_valid_edges_are_normalised() {
        let g = Graph::from_valid_edges(4, vec![(3, 1), (1, 3), (2, 0)]);
        assert_eq!(g, Graph::new(4, &[(0, 2), (1, 3)]).unwrap());
    }
}
