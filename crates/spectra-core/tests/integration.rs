//! Integration tests across the engine: matrices → exact polynomial →
//! factorization → database, plus property checks on random small graphs.

use approx::assert_abs_diff_eq;
use proptest::prelude::*;
use spectra_core::{
    AnalysisSource, AnalyticDatabase, CancelFlag, Eigenvalue, Family, Graph, MatrixKind,
    ProductRule, Tolerances, analyze_characteristic_polynomial, canonical_hash,
    cartesian_product, compose_eigenvalues, exact_polynomial, expand, orientation_from_arcs,
    skew_symmetric_eigenvalues, symmetric_eigenvalues, tensor_product, total_multiplicity,
};

fn tol() -> Tolerances {
    Tolerances::default()
}

fn graph(n: usize, edges: &[(usize, usize)]) -> Graph {
    Graph::new(n, edges).unwrap()
}

fn cycle(n: usize) -> Graph {
    let edges: Vec<_> = (0..n).map(|i| (i, (i + 1) % n)).collect();
    graph(n, &edges)
}

fn adjacency_eigenvalues(g: &Graph) -> Vec<Eigenvalue> {
    analyze_characteristic_polynomial(&g.adjacency_matrix(), &tol(), &CancelFlag::new())
        .unwrap()
        .factorization
        .eigenvalues
}

fn grouped(eig: &[Eigenvalue]) -> Vec<(f64, usize)> {
    eig.iter().map(|e| (e.value.re(), e.multiplicity)).collect()
}

fn sorted_real(eig: &[Eigenvalue]) -> Vec<f64> {
    let mut v: Vec<f64> = expand(eig).iter().map(|s| s.re()).collect();
    v.sort_by(|a, b| b.total_cmp(a));
    v
}

/// Scenario 1: C4 adjacency and cyclic orientation.
#[test]
fn cycle_c4_spectra() {
    let c4 = cycle(4);
    let eig = adjacency_eigenvalues(&c4);
    assert_eq!(grouped(&eig), vec![(2.0, 1), (0.0, 2), (-2.0, 1)]);
    assert!(eig.iter().all(Eigenvalue::is_exact));

    let orientation = orientation_from_arcs(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]).unwrap();
    let exact = analyze_characteristic_polynomial(&orientation, &tol(), &CancelFlag::new()).unwrap();
    assert_eq!(exact.polynomial.to_string(), "λ^4 + 4λ^2");
    let labels: Vec<String> = exact.factorization.eigenvalues.iter().map(Eigenvalue::label).collect();
    assert_eq!(labels, vec!["2i", "0", "-2i"]);

    let numeric = skew_symmetric_eigenvalues(&orientation.to_real(), &tol());
    assert!(numeric.converged);
    let mut imag: Vec<f64> = numeric.values.iter().map(|v| v.im()).collect();
    imag.sort_by(|a, b| b.total_cmp(a));
    for (got, want) in imag.iter().zip([2.0, 0.0, 0.0, -2.0]) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-9);
    }
}

/// Scenario 2: the star K1,4 has ±√4 = ±2.
#[test]
fn star_k14_spectrum() {
    let star = graph(5, &[(0, 1), (0, 2), (0, 3), (0, 4)]);
    let eig = adjacency_eigenvalues(&star);
    assert_eq!(grouped(&eig), vec![(2.0, 1), (0.0, 3), (-2.0, 1)]);
    let labels: Vec<String> = eig.iter().map(Eigenvalue::label).collect();
    assert_eq!(labels, vec!["2", "0", "-2"]);
    assert_eq!(Family::Star(5).spectrum().unwrap(), eig);
}

/// Scenario 3: E3 is all zeros under both matrix kinds.
#[test]
fn empty_graph_is_all_zero() {
    let e3 = Graph::empty(3);
    assert_eq!(grouped(&adjacency_eigenvalues(&e3)), vec![(0.0, 3)]);
    let skew = skew_symmetric_eigenvalues(&e3.orientation_matrix().to_real(), &tol());
    assert_eq!(skew.values.len(), 3);
    assert!(skew.values.iter().all(|v| v.re() == 0.0 && v.im() == 0.0));
}

/// Scenario 4: K3 is {2, −1, −1}.
#[test]
fn complete_k3_spectrum() {
    let k3 = graph(3, &[(0, 1), (1, 2), (0, 2)]);
    assert_eq!(grouped(&adjacency_eigenvalues(&k3)), vec![(2.0, 1), (-1.0, 2)]);
}

/// Scenario 5: K2□K2 composed equals C4 computed directly.
#[test]
fn cartesian_k2_squared_matches_c4() {
    let k2 = graph(2, &[(0, 1)]);
    let spectrum = adjacency_eigenvalues(&k2);
    let product = cartesian_product(&k2, &k2);
    let composed = compose_eigenvalues(ProductRule::Cartesian, &spectrum, &spectrum, &tol());
    let direct = adjacency_eigenvalues(&product);
    assert_eq!(grouped(&composed), grouped(&direct));
    assert_eq!(canonical_hash(4, product.edges()).unwrap(), canonical_hash(4, cycle(4).edges()).unwrap());
}

#[test]
fn database_pipeline() {
    let mut db = AnalyticDatabase::new(tol());
    let cancel = CancelFlag::new();
    db.seed_known_families(4);
    db.precompute_products(4);

    // 2K2 resolves from two cached K2
    let two_k2 = graph(4, &[(0, 1), (2, 3)]);
    let eig = db.resolve_disconnected_graph(4, two_k2.edges()).unwrap().unwrap();
    assert_eq!(total_multiplicity(&eig), 4);
    assert_eq!(grouped(&eig), vec![(1.0, 2), (-1.0, 2)]);

    // the paw is not a family, a product or a union
    let paw = graph(4, &[(0, 1), (1, 2), (0, 2), (2, 3)]);
    let first = db.analyze_graph(&paw, MatrixKind::Symmetric, &cancel).unwrap();
    assert_eq!(first.source, AnalysisSource::Computed);
    assert_eq!(total_multiplicity(&first.eigenvalues), 4);
    let again = db.analyze_graph(&paw, MatrixKind::Symmetric, &cancel).unwrap();
    let expected = if first.analytic {
        AnalysisSource::CanonicalCache
    } else {
        AnalysisSource::KnownNonAnalytic
    };
    assert_eq!(again.source, expected);
    assert_eq!(again.eigenvalues, first.eigenvalues);
}

fn arb_graph(max_n: usize) -> impl Strategy<Value = Graph> {
    (1..=max_n).prop_flat_map(|n| {
        let slots: Vec<(usize, usize)> =
            (0..n).flat_map(|i| (i + 1..n).map(move |j| (i, j))).collect();
        let len = slots.len();
        prop::collection::vec(any::<bool>(), len).prop_map(move |mask| {
            let edges: Vec<(usize, usize)> = slots
                .iter()
                .zip(mask)
                .filter_map(|(&e, keep)| keep.then_some(e))
                .collect();
            Graph::new(n, &edges).unwrap()
        })
    })
}

fn arb_graph_and_permutation(max_n: usize) -> impl Strategy<Value = (Graph, Vec<usize>)> {
    arb_graph(max_n).prop_flat_map(|g| {
        let perm: Vec<usize> = (0..g.n()).collect();
        (Just(g), Just(perm).prop_shuffle())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn hash_is_relabeling_invariant((g, perm) in arb_graph_and_permutation(7)) {
        let relabelled = g.relabel(&perm).unwrap();
        prop_assert_eq!(
            canonical_hash(g.n(), g.edges()).unwrap(),
            canonical_hash(relabelled.n(), relabelled.edges()).unwrap()
        );
    }

    #[test]
    fn polynomial_is_monic_with_trace_identities(g in arb_graph(6)) {
        let n = g.n();
        let poly = exact_polynomial(&g.adjacency_matrix()).unwrap();
        prop_assert_eq!(poly.degree(), n);
        prop_assert!(poly.is_monic());

        let values = symmetric_eigenvalues(&g.adjacency_matrix().to_real(), &tol()).values;
        let coeffs = poly.to_f64().values;
        let sum: f64 = values.iter().sum();
        let product: f64 = values.iter().product();
        let sign = if n % 2 == 0 { 1.0 } else { -1.0 };
        prop_assert!((sum + coeffs[1]).abs() < 1e-8);
        prop_assert!((product - sign * coeffs[n]).abs() < 1e-6);
        // the edge count is −c₂
        if n >= 2 {
            prop_assert_eq!(coeffs[2], -(g.edge_count() as f64));
        }
    }

    #[test]
    fn exact_roots_have_small_residual(g in arb_graph(6)) {
        let analysis = analyze_characteristic_polynomial(&g.adjacency_matrix(), &tol(), &CancelFlag::new()).unwrap();
        prop_assert_eq!(total_multiplicity(&analysis.factorization.eigenvalues), g.n());
        for e in analysis.factorization.eigenvalues.iter().filter(|e| e.is_exact()) {
            prop_assert!(analysis.polynomial.residual(e.value) < 1e-4, "{} misses", e.label());
        }
    }

    #[test]
    fn orientation_spectra_are_conjugate_pairs(g in arb_graph(7)) {
        let skew = skew_symmetric_eigenvalues(&g.orientation_matrix().to_real(), &tol());
        prop_assert_eq!(skew.values.len(), g.n());
        let mut imag: Vec<f64> = skew.values.iter().map(|v| v.im()).collect();
        prop_assert!(skew.values.iter().all(|v| v.re() == 0.0));
        imag.sort_by(|a, b| a.total_cmp(b));
        for (lo, hi) in imag.iter().zip(imag.iter().rev()) {
            prop_assert!((lo + hi).abs() < 1e-8);
        }
    }

    #[test]
    fn product_spectra_compose(g in arb_graph(3), h in arb_graph(3)) {
        let eg = adjacency_eigenvalues(&g);
        let eh = adjacency_eigenvalues(&h);
        for rule in [ProductRule::Cartesian, ProductRule::Tensor] {
            let built = match rule {
                ProductRule::Cartesian => cartesian_product(&g, &h),
                ProductRule::Tensor => tensor_product(&g, &h),
            };
            let composed = sorted_real(&compose_eigenvalues(rule, &eg, &eh, &tol()));
            let direct = symmetric_eigenvalues(&built.adjacency_matrix().to_real(), &tol()).values;
            prop_assert_eq!(composed.len(), direct.len());
            for (a, b) in composed.iter().zip(&direct) {
                prop_assert!((a - b).abs() < 1e-6, "{rule:?}: {a} vs {b}");
            }
        }
    }
}
