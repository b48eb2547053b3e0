//! Named graph families with closed-form spectra.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::closed_form::ClosedForm;
use crate::graph::Graph;
use crate::spectrum::{Eigenvalue, group_eigenvalues};

const FAMILY_GROUPING: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Empty(usize),
    Complete(usize),
    Path(usize),
    Cycle(usize),
    /// K₁,ₙ₋₁ on n vertices
    Star(usize),
    CompleteBipartite(usize, usize),
    Hypercube(usize),
    Petersen,
    Regular { degree: usize, n: usize },
}

impl Family {
    pub fn vertex_count(self) -> usize {
        match self {
            Family::Empty(n)
            | Family::Complete(n)
            | Family::Path(n)
            | Family::Cycle(n)
            | Family::Star(n)
            | Family::Regular { n, .. } => n,
            Family::CompleteBipartite(p, q) => p + q,
            Family::Hypercube(d) => 1 << d,
            Family::Petersen => 10,
        }
    }

    pub fn max_degree(self) -> usize {
        match self {
            Family::Empty(_) => 0,
            Family::Complete(n) | Family::Star(n) => n.saturating_sub(1),
            Family::Path(n) => n.saturating_sub(1).min(2),
            Family::Cycle(_) => 2,
            Family::CompleteBipartite(p, q) => p.max(q),
            Family::Hypercube(d) => d,
            Family::Petersen => 3,
            Family::Regular { degree, .. } => degree,
        }
    }

    /// Adjacency spectrum from the family formula, grouped. `None` for
    /// generic regular graphs.
    pub fn spectrum(self) -> Option<Vec<Eigenvalue>> {
        let mut values: Vec<(ClosedForm, usize)> = Vec::new();
        match self {
            Family::Empty(n) => values.push((ClosedForm::zero(), n)),
            Family::Complete(n) => match n {
                0 => {}
                1 => values.push((ClosedForm::zero(), 1)),
                _ => {
                    values.push((ClosedForm::integer(n as i64 - 1), 1));
                    values.push((ClosedForm::integer(-1), n - 1));
                }
            },
            Family::Path(n) => {
                for k in 1..=n as u64 {
                    values.push((ClosedForm::two_cos(k, n as u64 + 1), 1));
                }
            }
            Family::Cycle(n) => {
                for k in 0..n as u64 {
                    values.push((ClosedForm::two_cos(2 * k, n as u64), 1));
                }
            }
            Family::Star(n) => {
                if n < 2 {
                    values.push((ClosedForm::zero(), n));
                } else {
                    let r = ClosedForm::sqrt(n as u64 - 1);
                    values.push((r.negated(), 1));
                    values.push((r, 1));
                    values.push((ClosedForm::zero(), n - 2));
                }
            }
            Family::CompleteBipartite(p, q) => {
                let r = ClosedForm::sqrt((p * q) as u64);
                values.push((r.negated(), 1));
                values.push((r, 1));
                values.push((ClosedForm::zero(), (p + q).saturating_sub(2)));
            }
            Family::Hypercube(d) => {
                for k in 0..=d {
                    values.push((ClosedForm::integer(d as i64 - 2 * k as i64), binomial(d, k)));
                }
            }
            Family::Petersen => {
                values.push((ClosedForm::integer(3), 1));
                values.push((ClosedForm::integer(1), 5));
                values.push((ClosedForm::integer(-2), 4));
            }
            Family::Regular { .. } => return None,
        }
        let items = values
            .into_iter()
            .filter(|(_, m)| *m > 0)
            .map(|(cf, m)| Eigenvalue {
                multiplicity: m,
                ..Eigenvalue::real(cf.value(), cf)
            })
            .collect();
        Some(group_eigenvalues(items, FAMILY_GROUPING))
    }

    /// λ₁ − λ₂ of the adjacency spectrum.
    pub fn spectral_gap(self) -> Option<f64> {
        let gap = match self {
            Family::Empty(_) => 0.0,
            Family::Complete(n) if n >= 2 => n as f64,
            Family::Complete(_) => 0.0,
            Family::Path(n) if n >= 2 => {
                let m = (n + 1) as f64;
                2.0 * (PI / m).cos() - 2.0 * (2.0 * PI / m).cos()
            }
            Family::Path(_) => 0.0,
            Family::Cycle(n) => 2.0 - 2.0 * (2.0 * PI / n as f64).cos(),
            Family::Star(n) => (n.saturating_sub(1) as f64).sqrt(),
            Family::CompleteBipartite(p, q) => ((p * q) as f64).sqrt(),
            Family::Hypercube(d) if d >= 1 => 2.0,
            Family::Hypercube(_) => 0.0,
            Family::Petersen => 2.0,
            Family::Regular { .. } => return None,
        };
        Some(gap)
    }

    /// Second-smallest Laplacian eigenvalue.
    pub fn algebraic_connectivity(self) -> Option<f64> {
        let a = match self {
            Family::Empty(_) => 0.0,
            Family::Complete(n) if n >= 2 => n as f64,
            Family::Complete(_) => 0.0,
            Family::Path(n) if n >= 2 => 2.0 - 2.0 * (PI / n as f64).cos(),
            Family::Path(_) => 0.0,
            Family::Cycle(n) => 2.0 - 2.0 * (2.0 * PI / n as f64).cos(),
            Family::Star(n) if n >= 2 => 1.0,
            Family::Star(_) => 0.0,
            Family::CompleteBipartite(p, q) => p.min(q) as f64,
            Family::Hypercube(d) if d >= 1 => 2.0,
            Family::Hypercube(_) => 0.0,
            Family::Petersen => 2.0,
            Family::Regular { .. } => return None,
        };
        Some(a)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Empty(n) => write!(f, "E{n}"),
            Family::Complete(n) => write!(f, "K{n}"),
            Family::Path(n) => write!(f, "P{n}"),
            Family::Cycle(n) => write!(f, "C{n}"),
            Family::Star(n) => write!(f, "K1,{}", n.saturating_sub(1)),
            Family::CompleteBipartite(p, q) => write!(f, "K{p},{q}"),
            Family::Hypercube(d) => write!(f, "Q{d}"),
            Family::Petersen => write!(f, "Petersen"),
            Family::Regular { degree, n } => write!(f, "{degree}-regular({n})"),
        }
    }
}

fn binomial(n: usize, k: usize) -> usize {
    let k = k.min(n - k);
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}

/// Recognise the named family of a graph, most specific name first.
pub fn identify_family(graph: &Graph) -> Option<Family> {
    let n = graph.n();
    let m = graph.edge_count();
    if m == 0 {
        return Some(Family::Empty(n));
    }
    if m == n * (n - 1) / 2 {
        return Some(Family::Complete(n));
    }
    if !graph.is_connected() {
        return None;
    }
    let degrees = graph.degrees();
    let max = degrees.iter().copied().max().unwrap_or(0);
    let min = degrees.iter().copied().min().unwrap_or(0);

    if m == n - 1 && max <= 2 {
        return Some(Family::Path(n));
    }
    if m == n - 1 && max == n - 1 {
        return Some(Family::Star(n));
    }
    if min == 2 && max == 2 {
        return Some(Family::Cycle(n));
    }
    if min == max {
        if n == 10 && max == 3 && graph.girth() == Some(5) {
            return Some(Family::Petersen);
        }
        if let Some(d) = hypercube_dimension(graph, max) {
            return Some(Family::Hypercube(d));
        }
    }
    if let Some(side) = graph.bipartition() {
        let p = side.iter().filter(|&&s| !s).count();
        let q = n - p;
        if p * q == m {
            return Some(Family::CompleteBipartite(p.min(q), p.max(q)));
        }
    }
    if min == max {
        return Some(Family::Regular { degree: max, n });
    }
    None
}

/// Certify Q_d by labelling vertices with d-bit words from vertex 0.
fn hypercube_dimension(graph: &Graph, degree: usize) -> Option<usize> {
    let n = graph.n();
    if degree == 0 || degree >= usize::BITS as usize || n != 1 << degree {
        return None;
    }
    let adj = graph.neighbours();
    let dist = graph.distances_from(0);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&v| dist[v]);

    let mut label: Vec<Option<usize>> = vec![None; n];
    label[0] = Some(0);
    for (bit, &v) in adj[0].iter().enumerate() {
        label[v] = Some(1 << bit);
    }
    for &v in &order {
        if label[v].is_some() {
            continue;
        }
        let dv = dist[v]?;
        let word = adj[v]
            .iter()
            .filter(|&&w| dist[w] == Some(dv - 1))
            .try_fold(0usize, |acc, &w| label[w].map(|l| acc | l))?;
        label[v] = Some(word);
    }

    let labels: Vec<usize> = label.into_iter().collect::<Option<Vec<_>>>()?;
    let mut seen = vec![false; n];
    for &l in &labels {
        if l >= n || seen[l] {
            return None;
        }
        seen[l] = true;
    }
    let edges_ok = graph
        .edges()
        .iter()
        .all(|&(u, v)| (labels[u] ^ labels[v]).count_ones() == 1);
    edges_ok.then_some(degree)
}

/// Edge lists of the seedable families.
pub fn family_edges(family: Family) -> Option<Vec<(usize, usize)>> {
    let edges = match family {
        Family::Empty(_) => Vec::new(),
        Family::Complete(n) => (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect(),
        Family::Path(n) => (1..n).map(|i| (i - 1, i)).collect(),
        Family::Cycle(n) if n >= 3 => (0..n).map(|i| (i, (i + 1) % n)).collect(),
        Family::Cycle(_) => return None,
        Family::Star(n) => (1..n).map(|i| (0, i)).collect(),
        Family::CompleteBipartite(p, q) => (0..p)
            .flat_map(|i| (p..p + q).map(move |j| (i, j)))
            .collect(),
        Family::Hypercube(d) => {
            let n = 1usize << d;
            (0..n)
                .flat_map(|v| (0..d).map(move |b| (v, v ^ (1 << b))))
                .filter(|&(u, v)| u < v)
                .collect()
        }
        Family::Petersen => {
            let mut edges: Vec<(usize, usize)> = (0..5).map(|i| (i, (i + 1) % 5)).collect();
            edges.extend((0..5).map(|i| (5 + i, 5 + (i + 2) % 5)));
            edges.extend((0..5).map(|i| (i, i + 5)));
            edges
        }
        Family::Regular { .. } => return None,
    };
    Some(edges)
}
