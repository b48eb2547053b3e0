//! In-memory analytic graph database.
//!
//! Results are kept per vertex count. Canonical-hash entries hold adjacency
//! spectra only; orientation analyses go through the polynomial cache, which
//! is shared by both matrix kinds since a polynomial fixes its roots.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::cancel::CancelFlag;
use crate::charpoly::{IntPolynomial, exact_polynomial};
use crate::constants::{POLYNOMIAL_HASH_DECIMALS, Tolerances};
use crate::error::Result;
use crate::factor::analyze_polynomial;
use crate::family::{Family, family_edges, identify_family};
use crate::graph::Graph;
use crate::matrix::{Matrix, MatrixKind};
use crate::product::{ProductRule, build_product};
use crate::spectrum::{Eigenvalue, group_eigenvalues, total_multiplicity};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const SEPARATOR: u8 = 0xff;

struct Fnv(u64);

impl Fnv {
    fn new() -> Self {
        Fnv(FNV_OFFSET)
    }

    fn byte(&mut self, b: u8) {
        self.0 ^= u64::from(b);
        self.0 = self.0.wrapping_mul(FNV_PRIME);
    }

    fn number(&mut self, v: usize) {
        for b in (v as u64).to_le_bytes() {
            self.byte(b);
        }
    }

    fn list(&mut self, values: &[usize]) {
        self.number(values.len());
        for &v in values {
            self.number(v);
        }
    }
}

/// Relabeling-invariant fingerprint `"{n}:{hex}"`.
///
/// Folds the sorted degree sequence, the sorted endpoint-degree pairs of all
/// edges and the sorted per-vertex signatures (own degree, neighbour
/// degrees, degrees at distance two). Not isomorphism-complete.
pub fn graph_hash(graph: &Graph) -> String {
    let n = graph.n();
    let adj = graph.neighbours();
    let degrees = graph.degrees();

    let mut sequence = degrees.clone();
    sequence.sort_unstable();

    let mut pairs: Vec<(usize, usize)> = graph
        .edges()
        .iter()
        .map(|&(u, v)| (degrees[u].min(degrees[v]), degrees[u].max(degrees[v])))
        .collect();
    pairs.sort_unstable();

    let mut signatures: Vec<Vec<usize>> = (0..n)
        .map(|v| {
            let mut first: Vec<usize> = adj[v].iter().map(|&w| degrees[w]).collect();
            first.sort_unstable();
            let mut second_ring = BTreeSet::new();
            for &w in &adj[v] {
                for &x in &adj[w] {
                    if x != v && !adj[v].contains(&x) {
                        second_ring.insert(x);
                    }
                }
            }
            let mut second: Vec<usize> = second_ring.into_iter().map(|x| degrees[x]).collect();
            second.sort_unstable();

            let mut sig = Vec::with_capacity(2 + first.len() + second.len());
            sig.push(degrees[v]);
            sig.push(first.len());
            sig.extend(first);
            sig.extend(second);
            sig
        })
        .collect();
    signatures.sort();

    let mut h = Fnv::new();
    h.number(n);
    h.list(&sequence);
    h.byte(SEPARATOR);
    h.number(pairs.len());
    for (a, b) in pairs {
        h.number(a);
        h.number(b);
    }
    h.byte(SEPARATOR);
    for sig in &signatures {
        h.list(sig);
    }
    format!("{n}:{:016x}", h.0)
}

/// `graph_hash` of (n, edges), validating the edge list.
pub fn canonical_hash(n: usize, edges: &[(usize, usize)]) -> Result<String> {
    Ok(graph_hash(&Graph::new(n, edges)?))
}

/// Coefficients rounded to 10 decimals, joined with `,`.
pub fn polynomial_hash(coeffs: &[f64]) -> String {
    let scale = 10f64.powi(POLYNOMIAL_HASH_DECIMALS);
    coeffs
        .iter()
        .map(|c| {
            let r = (c * scale).round() / scale;
            if r == 0.0 { "0".to_string() } else { r.to_string() }
        })
        .collect::<Vec<_>>()
        .join(",")
}

pub fn polynomial_key(poly: &IntPolynomial) -> String {
    polynomial_hash(&poly.to_f64().values)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticEntry {
    pub edges: Vec<(usize, usize)>,
    pub eigenvalues: Vec<Eigenvalue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<Family>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polynomial: Option<IntPolynomial>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolynomialEntry {
    pub analytic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eigenvalues: Option<Vec<Eigenvalue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEntry {
    pub rule: ProductRule,
    /// Canonical hashes of the factors
    pub left: String,
    pub right: String,
    pub edges: Vec<(usize, usize)>,
    pub eigenvalues: Vec<Eigenvalue>,
}

/// Everything cached for one vertex count.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VertexLevel {
    pub analytic: BTreeMap<String, AnalyticEntry>,
    pub non_analytic: BTreeSet<String>,
    pub polynomial_cache: BTreeMap<String, PolynomialEntry>,
    pub products: BTreeMap<String, ProductEntry>,
}

impl VertexLevel {
    pub fn is_empty(&self) -> bool {
        self.analytic.is_empty()
            && self.non_analytic.is_empty()
            && self.polynomial_cache.is_empty()
            && self.products.is_empty()
    }
}

/// How `analyze_graph` obtained its answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    CanonicalCache,
    ProductCache,
    DisjointUnion,
    FamilyFormula,
    PolynomialCache,
    KnownNonAnalytic,
    Computed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphAnalysis {
    pub source: AnalysisSource,
    pub kind: MatrixKind,
    pub canonical_hash: String,
    pub eigenvalues: Vec<Eigenvalue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polynomial: Option<IntPolynomial>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<Family>,
    /// Every eigenvalue has an exact closed form.
    pub analytic: bool,
    pub exact_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStats {
    pub n: usize,
    pub analytic: usize,
    pub non_analytic: usize,
    pub polynomials: usize,
    pub products: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub levels: Vec<LevelStats>,
    pub analytic: usize,
    pub non_analytic: usize,
    pub polynomials: usize,
    pub products: usize,
}

#[derive(Clone, Debug, Default)]
pub struct AnalyticDatabase {
    levels: BTreeMap<usize, VertexLevel>,
    tol: Tolerances,
}

impl AnalyticDatabase {
    pub fn new(tol: Tolerances) -> Self {
        Self {
            levels: BTreeMap::new(),
            tol,
        }
    }

    pub fn from_levels(levels: BTreeMap<usize, VertexLevel>, tol: Tolerances) -> Self {
        Self { levels, tol }
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tol
    }

    pub fn levels(&self) -> &BTreeMap<usize, VertexLevel> {
        &self.levels
    }

    pub fn level(&self, n: usize) -> Option<&VertexLevel> {
        self.levels.get(&n)
    }

    fn level_mut(&mut self, n: usize) -> &mut VertexLevel {
        self.levels.entry(n).or_default()
    }

    pub fn clear(&mut self) {
        self.levels.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.levels.values().all(VertexLevel::is_empty)
    }

    /// Cached analytic entry for a graph, by canonical hash.
    pub fn lookup(&self, graph: &Graph) -> Option<&AnalyticEntry> {
        self.level(graph.n())?.analytic.get(&graph_hash(graph))
    }

    pub fn lookup_product(&self, graph: &Graph) -> Option<&ProductEntry> {
        self.level(graph.n())?.products.get(&graph_hash(graph))
    }

    pub fn lookup_polynomial(&self, n: usize, key: &str) -> Option<&PolynomialEntry> {
        self.level(n)?.polynomial_cache.get(key)
    }

    pub fn is_known_non_analytic(&self, n: usize, key: &str) -> bool {
        self.level(n).is_some_and(|l| l.non_analytic.contains(key))
    }

    /// Cached answer for a polynomial key, analytic or a remembered failure.
    fn cached_polynomial(&self, n: usize, key: &str) -> Option<(AnalysisSource, Vec<Eigenvalue>)> {
        let entry = self.lookup_polynomial(n, key)?;
        let source = if !entry.analytic || self.is_known_non_analytic(n, key) {
            AnalysisSource::KnownNonAnalytic
        } else {
            AnalysisSource::PolynomialCache
        };
        Some((source, entry.eigenvalues.clone().unwrap_or_default()))
    }

    /// Store an analytic adjacency spectrum; returns the canonical hash.
    /// An existing entry under the same hash is kept.
    pub fn insert_analytic(
        &mut self,
        graph: &Graph,
        eigenvalues: Vec<Eigenvalue>,
        family: Option<Family>,
        polynomial: Option<IntPolynomial>,
    ) -> String {
        let hash = graph_hash(graph);
        self.level_mut(graph.n())
            .analytic
            .entry(hash.clone())
            .or_insert_with(|| AnalyticEntry {
                edges: graph.edges().to_vec(),
                eigenvalues,
                family,
                polynomial,
            });
        hash
    }

    pub fn record_polynomial(&mut self, n: usize, key: String, entry: PolynomialEntry) {
        let level = self.level_mut(n);
        if entry.analytic {
            level.non_analytic.remove(&key);
        } else {
            level.non_analytic.insert(key.clone());
        }
        level.polynomial_cache.insert(key, entry);
    }

    /// Seed empty, complete, path, cycle and star graphs on 1..=max_n
    /// vertices from their spectrum formulas. Returns the number added.
    pub fn seed_known_families(&mut self, max_n: usize) -> usize {
        let mut added = 0;
        for n in 1..=max_n {
            let mut families = vec![Family::Empty(n)];
            if n >= 2 {
                families.push(Family::Complete(n));
            }
            if n >= 3 {
                families.push(Family::Path(n));
            }
            if n >= 4 {
                families.push(Family::Cycle(n));
                families.push(Family::Star(n));
            }
            for family in families {
                let (Some(edges), Some(spectrum)) = (family_edges(family), family.spectrum())
                else {
                    continue;
                };
                let Ok(graph) = Graph::new(n, &edges) else {
                    continue;
                };
                if self.lookup(&graph).is_none() {
                    self.insert_analytic(&graph, spectrum, Some(family), None);
                    added += 1;
                }
            }
        }
        added
    }

    /// Eigenvalues of a disconnected graph from its cached components.
    ///
    /// `Ok(None)` unless the graph has several components and every one of
    /// them has an analytic entry; a partial answer is never returned.
    pub fn resolve_disconnected_graph(
        &self,
        n: usize,
        edges: &[(usize, usize)],
    ) -> Result<Option<Vec<Eigenvalue>>> {
        let graph = Graph::new(n, edges)?;
        Ok(self.resolve_components(&graph))
    }

    fn resolve_components(&self, graph: &Graph) -> Option<Vec<Eigenvalue>> {
        let components = graph.components();
        if components.len() < 2 {
            return None;
        }
        let mut union = Vec::new();
        for component in &components {
            let sub = graph.induced(component);
            let entry = self.lookup(&sub)?;
            union.extend(entry.eigenvalues.iter().cloned());
        }
        Some(group_eigenvalues(union, self.tol.multiplicity))
    }

    /// Compose products of cached connected analytic graphs up to `max_n`
    /// vertices. Returns the number of new product entries.
    pub fn precompute_products(&mut self, max_n: usize) -> usize {
        let mut factors: Vec<(String, Graph, Vec<Eigenvalue>)> = Vec::new();
        for (&n, level) in &self.levels {
            if n < 2 || n > max_n / 2 {
                continue;
            }
            for (hash, entry) in &level.analytic {
                let Ok(graph) = Graph::new(n, &entry.edges) else {
                    continue;
                };
                if graph.is_connected() {
                    factors.push((hash.clone(), graph, entry.eigenvalues.clone()));
                }
            }
        }

        let mut added = 0;
        for i in 0..factors.len() {
            for j in i..factors.len() {
                let (lh, lg, le) = &factors[i];
                let (rh, rg, re) = &factors[j];
                if lg.n() * rg.n() > max_n {
                    continue;
                }
                for rule in [ProductRule::Cartesian, ProductRule::Tensor] {
                    let built = build_product(rule, (lg, le), (rg, re), &self.tol);
                    let hash = graph_hash(&built.graph);
                    let level = self.level_mut(built.graph.n());
                    if level.products.contains_key(&hash) {
                        continue;
                    }
                    level.products.insert(
                        hash,
                        ProductEntry {
                            rule,
                            left: lh.clone(),
                            right: rh.clone(),
                            edges: built.graph.edges().to_vec(),
                            eigenvalues: built.eigenvalues,
                        },
                    );
                    added += 1;
                }
            }
        }
        added
    }

    /// Memoized analysis of a graph's adjacency or low → high orientation.
    pub fn analyze_graph(
        &mut self,
        graph: &Graph,
        kind: MatrixKind,
        cancel: &CancelFlag,
    ) -> Result<GraphAnalysis> {
        match kind {
            MatrixKind::Symmetric => self.analyze_adjacency(graph, cancel),
            MatrixKind::Antisymmetric => {
                let matrix = graph.orientation_matrix();
                self.analyze_by_polynomial(&matrix, graph_hash(graph), identify_family(graph), cancel)
            }
        }
    }

    /// Memoized analysis of an arbitrary validated matrix.
    pub fn analyze_matrix(&mut self, matrix: &Matrix, cancel: &CancelFlag) -> Result<GraphAnalysis> {
        let graph = Graph::from_matrix(matrix);
        let loops = (0..matrix.n()).any(|i| matrix.get(i, i) != 0);
        if matrix.kind() == MatrixKind::Symmetric && !loops {
            return self.analyze_adjacency(&graph, cancel);
        }
        let family = if matrix.kind() == MatrixKind::Symmetric {
            None
        } else {
            identify_family(&graph)
        };
        self.analyze_by_polynomial(matrix, graph_hash(&graph), family, cancel)
    }

    fn analyze_adjacency(&mut self, graph: &Graph, cancel: &CancelFlag) -> Result<GraphAnalysis> {
        let hash = graph_hash(graph);
        let n = graph.n();
        let finish = |source, eigenvalues: Vec<Eigenvalue>, family, polynomial| {
            let exact_count = exact_count(&eigenvalues);
            GraphAnalysis {
                source,
                kind: MatrixKind::Symmetric,
                canonical_hash: hash.clone(),
                analytic: exact_count == n,
                exact_count,
                eigenvalues,
                polynomial,
                family,
            }
        };

        if let Some(entry) = self.level(n).and_then(|l| l.analytic.get(&hash)) {
            return Ok(finish(
                AnalysisSource::CanonicalCache,
                entry.eigenvalues.clone(),
                entry.family,
                entry.polynomial.clone(),
            ));
        }
        let family = identify_family(graph);
        if let Some(entry) = self.level(n).and_then(|l| l.products.get(&hash)) {
            return Ok(finish(AnalysisSource::ProductCache, entry.eigenvalues.clone(), family, None));
        }
        if let Some(eigenvalues) = self.resolve_components(graph) {
            self.insert_analytic(graph, eigenvalues.clone(), family, None);
            return Ok(finish(AnalysisSource::DisjointUnion, eigenvalues, family, None));
        }
        if let Some(spectrum) = family.and_then(Family::spectrum) {
            self.insert_analytic(graph, spectrum.clone(), family, None);
            return Ok(finish(AnalysisSource::FamilyFormula, spectrum, family, None));
        }

        let matrix = graph.adjacency_matrix();
        let poly = exact_polynomial(&matrix)?;
        let key = polynomial_key(&poly);
        if let Some((source, eigenvalues)) = self.cached_polynomial(n, &key) {
            if source == AnalysisSource::PolynomialCache {
                self.insert_analytic(graph, eigenvalues.clone(), family, Some(poly.clone()));
            }
            return Ok(finish(source, eigenvalues, family, Some(poly)));
        }

        let analysis = analyze_polynomial(&poly, n, MatrixKind::Symmetric, &self.tol, cancel)?;
        let eigenvalues = analysis.factorization.eigenvalues;
        let analytic = analysis.factorization.exact_count == n;
        self.record_polynomial(n, key, polynomial_entry(analytic, &eigenvalues, n));
        if analytic {
            self.insert_analytic(graph, eigenvalues.clone(), family, Some(poly.clone()));
        }
        Ok(finish(AnalysisSource::Computed, eigenvalues, family, Some(poly)))
    }

    fn analyze_by_polynomial(
        &mut self,
        matrix: &Matrix,
        hash: String,
        family: Option<Family>,
        cancel: &CancelFlag,
    ) -> Result<GraphAnalysis> {
        let n = matrix.n();
        let poly = exact_polynomial(matrix)?;
        let key = polynomial_key(&poly);

        let (source, eigenvalues) = match self.cached_polynomial(n, &key) {
            Some(hit) => hit,
            None => {
                let analysis = analyze_polynomial(&poly, n, matrix.kind(), &self.tol, cancel)?;
                let eigenvalues = analysis.factorization.eigenvalues;
                let analytic = analysis.factorization.exact_count == n;
                self.record_polynomial(n, key, polynomial_entry(analytic, &eigenvalues, n));
                (AnalysisSource::Computed, eigenvalues)
            }
        };
        let exact_count = exact_count(&eigenvalues);
        Ok(GraphAnalysis {
            source,
            kind: matrix.kind(),
            canonical_hash: hash,
            analytic: exact_count == n,
            exact_count,
            eigenvalues,
            polynomial: Some(poly),
            family,
        })
    }

    pub fn stats(&self) -> DatabaseStats {
        let mut stats = DatabaseStats::default();
        for (&n, level) in &self.levels {
            let l = LevelStats {
                n,
                analytic: level.analytic.len(),
                non_analytic: level.non_analytic.len(),
                polynomials: level.polynomial_cache.len(),
                products: level.products.len(),
            };
            stats.analytic += l.analytic;
            stats.non_analytic += l.non_analytic;
            stats.polynomials += l.polynomials;
            stats.products += l.products;
            stats.levels.push(l);
        }
        stats
    }
}

fn exact_count(eigenvalues: &[Eigenvalue]) -> usize {
    eigenvalues
        .iter()
        .filter(|e| e.is_exact())
        .map(|e| e.multiplicity)
        .sum()
}

fn polynomial_entry(analytic: bool, eigenvalues: &[Eigenvalue], n: usize) -> PolynomialEntry {
    let reason = (!analytic).then(|| {
        format!(
            "{} of {} eigenvalues have a closed form",
            exact_count(eigenvalues),
            n.max(total_multiplicity(eigenvalues))
        )
    });
    PolynomialEntry {
        analytic,
        eigenvalues: Some(eigenvalues.to_vec()),
        reason,
    }
}
