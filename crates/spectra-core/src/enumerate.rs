//! Exhaustive search for small graphs with analytic spectra.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::cancel::CancelFlag;
use crate::charpoly::{IntPolynomial, exact_polynomial};
use crate::constants::{MAX_ENUMERATION_VERTICES, Tolerances};
use crate::database::graph_hash;
use crate::error::{Result, SpectraError};
use crate::factor::analyze_polynomial;
use crate::family::{Family, identify_family};
use crate::graph::Graph;
use crate::matrix::MatrixKind;
use crate::spectrum::Eigenvalue;

/// One analytic characteristic polynomial and a representative graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyticClass {
    pub edges: Vec<(usize, usize)>,
    pub family: Option<Family>,
    pub polynomial: String,
    pub eigenvalues: Vec<Eigenvalue>,
    /// Unique graphs sharing this polynomial.
    pub class_size: usize,
}

/// Every graph on n vertices, one per canonical hash.
///
/// The hash is not isomorphism-complete, so two non-isomorphic graphs with
/// equal hashes collapse to the first one generated.
pub fn enumerate_unique_graphs(n: usize) -> Result<Vec<Graph>> {
    if n > MAX_ENUMERATION_VERTICES {
        return Err(SpectraError::TooLarge {
            n,
            max: MAX_ENUMERATION_VERTICES,
        });
    }
    let slots: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .collect();

    // ordered by edge count, then lexicographically, so sparse
    // representatives come first
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for k in 0..=slots.len() {
        let mut pick: Vec<usize> = (0..k).collect();
        loop {
            let edges: Vec<(usize, usize)> = pick.iter().map(|&i| slots[i]).collect();
            let graph = Graph::new(n, &edges)?;
            if seen.insert(graph_hash(&graph)) {
                out.push(graph);
            }
            if !next_combination(&mut pick, slots.len()) {
                break;
            }
        }
    }
    Ok(out)
}

/// Advance `pick` to the next k-subset of 0..len; false after the last.
fn next_combination(pick: &mut [usize], len: usize) -> bool {
    let k = pick.len();
    let Some(i) = (0..k).rev().find(|&i| pick[i] < len - k + i) else {
        return false;
    };
    pick[i] += 1;
    for j in i + 1..k {
        pick[j] = pick[j - 1] + 1;
    }
    true
}

/// Unique graphs on n vertices whose adjacency or low → high orientation
/// spectrum is fully analytic, grouped by characteristic polynomial and
/// sorted by (edge count, polynomial).
pub fn find_analytic_graphs(
    n: usize,
    kind: MatrixKind,
    tol: &Tolerances,
    cancel: &CancelFlag,
) -> Result<Vec<AnalyticClass>> {
    let graphs = enumerate_unique_graphs(n)?;

    let mut order: Vec<IntPolynomial> = Vec::new();
    let mut groups: HashMap<IntPolynomial, Vec<Graph>> = HashMap::new();
    for graph in graphs {
        cancel.check()?;
        let matrix = match kind {
            MatrixKind::Symmetric => graph.adjacency_matrix(),
            MatrixKind::Antisymmetric => graph.orientation_matrix(),
        };
        let poly = exact_polynomial(&matrix)?;
        let group = groups.entry(poly.clone()).or_default();
        if group.is_empty() {
            order.push(poly);
        }
        group.push(graph);
    }

    let mut out = Vec::new();
    for poly in order {
        let Some(members) = groups.remove(&poly) else {
            continue;
        };
        let analysis = analyze_polynomial(&poly, n, kind, tol, cancel)?;
        if !analysis.factorization.all_exact() {
            continue;
        }
        let representative = &members[0];
        out.push(AnalyticClass {
            edges: representative.edges().to_vec(),
            family: identify_family(representative),
            polynomial: poly.to_string(),
            eigenvalues: analysis.factorization.eigenvalues,
            class_size: members.len(),
        });
    }
    out.sort_by(|a, b| {
        a.edges
            .len()
            .cmp(&b.edges.len())
            .then_with(|| a.polynomial.cmp(&b.polynomial))
    });
    Ok(out)
}
