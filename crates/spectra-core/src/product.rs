//! Cartesian and tensor graph products and their spectra.
//!
//! Vertex (a, b) of G × H is numbered a·|H| + b. Spectra compose pairwise,
//! λ + μ for the Cartesian product and λ·μ for the tensor product, so the
//! product polynomial is never formed.

use serde::{Deserialize, Serialize};

use crate::closed_form::{ClosedForm, ClosedFormKind, identify};
use crate::constants::Tolerances;
use crate::graph::Graph;
use crate::spectrum::{Eigenvalue, group_eigenvalues};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductRule {
    Cartesian,
    Tensor,
}

impl ProductRule {
    pub fn symbol(self) -> &'static str {
        match self {
            ProductRule::Cartesian => "□",
            ProductRule::Tensor => "⊗",
        }
    }
}

/// A product graph with its composed spectrum.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductGraph {
    pub rule: ProductRule,
    pub left: Graph,
    pub right: Graph,
    pub graph: Graph,
    pub eigenvalues: Vec<Eigenvalue>,
}

pub fn cartesian_product(g: &Graph, h: &Graph) -> Graph {
    let nh = h.n();
    let mut edges = Vec::with_capacity(g.edge_count() * nh + h.edge_count() * g.n());
    for &(a, a2) in g.edges() {
        for b in 0..nh {
            edges.push((a * nh + b, a2 * nh + b));
        }
    }
    for a in 0..g.n() {
        for &(b, b2) in h.edges() {
            edges.push((a * nh + b, a * nh + b2));
        }
    }
    Graph::from_valid_edges(g.n() * nh, edges)
}

pub fn tensor_product(g: &Graph, h: &Graph) -> Graph {
    let nh = h.n();
    let mut edges = Vec::with_capacity(2 * g.edge_count() * h.edge_count());
    for &(a, a2) in g.edges() {
        for &(b, b2) in h.edges() {
            edges.push((a * nh + b, a2 * nh + b2));
            edges.push((a * nh + b2, a2 * nh + b));
        }
    }
    Graph::from_valid_edges(g.n() * nh, edges)
}

pub fn product(rule: ProductRule, g: &Graph, h: &Graph) -> Graph {
    match rule {
        ProductRule::Cartesian => cartesian_product(g, h),
        ProductRule::Tensor => tensor_product(g, h),
    }
}



fn rational(cf: &ClosedForm) -> Option<(i64, i64)> {
    if !cf.exact {
        return None;
    }
    match cf.kind {
        ClosedFormKind::Zero => Some((0, 1)),
        ClosedFormKind::Integer(p) => Some((p, 1)),
        ClosedFormKind::Fraction { p, q } => Some((p, q)),
        _ => None,
    }
}

fn compose_form(
    rule: ProductRule,
    a: &Eigenvalue,
    b: &Eigenvalue,
    value: f64,
    n: usize,
    tol: &Tolerances,
) -> ClosedForm {
    let exact_inputs = a.is_exact() && b.is_exact();
    let parts = a
        .closed_form
        .as_ref()
        .and_then(rational)
        .zip(b.closed_form.as_ref().and_then(rational));
    if let Some(((p1, q1), (p2, q2))) = parts {
        let composed = match rule {
            ProductRule::Cartesian => p1
                .checked_mul(q2)
                .zip(p2.checked_mul(q1))
                .and_then(|(x, y)| x.checked_add(y))
                .zip(q1.checked_mul(q2)),
            ProductRule::Tensor => p1.checked_mul(p2).zip(q1.checked_mul(q2)),
        };
        if let Some((p, q)) = composed {
            return ClosedForm::fraction(p, q);
        }
    }
    let identified = identify(value, n, tol);
    if exact_inputs && identified.exact {
        identified
    } else {
        ClosedForm::algebraic(value)
    }
}

/// Pairwise composition of two grouped real spectra.
pub fn compose_eigenvalues(
    rule: ProductRule,
    g: &[Eigenvalue],
    h: &[Eigenvalue],
    tol: &Tolerances,
) -> Vec<Eigenvalue> {
    let n = g.iter().map(|e| e.multiplicity).sum::<usize>() * h.iter().map(|e| e.multiplicity).sum::<usize>();
    let mut out = Vec::with_capacity(g.len() * h.len());
    for a in g {
        for b in h {
            let (x, y) = (a.value.re(), b.value.re());
            let value = match rule {
                ProductRule::Cartesian => x + y,
                ProductRule::Tensor => x * y,
            };
            let form = compose_form(rule, a, b, value, n, tol);
            let value = if form.exact { form.value() } else { value };
            out.push(Eigenvalue {
                multiplicity: a.multiplicity * b.multiplicity,
                ..Eigenvalue::real(value, form)
            });
        }
    }
    group_eigenvalues(out, tol.multiplicity)
}

/// Build a product graph and its spectrum from two analysed factors.
pub fn build_product(
    rule: ProductRule,
    left: (&Graph, &[Eigenvalue]),
    right: (&Graph, &[Eigenvalue]),
    tol: &Tolerances,
) -> ProductGraph {
    ProductGraph {
        rule,
        left: left.0.clone(),
        right: right.0.clone(),
        graph: product(rule, left.0, right.0),
        eigenvalues: compose_eigenvalues(rule, left.1, right.1, tol),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{Family, identify_family};

    fn k2() -> Graph {
        Graph::new(2, &[(0, 1)]).unwrap()
    }

    fn k2_spectrum() -> Vec<Eigenvalue> {
        Family::Complete(2).spectrum().unwrap()
    }

    #[test]
    fn test_cartesian_k2_is_c4() {
        let g = cartesian_product(&k2(), &k2());
        assert_eq!(g.n(), 4);
        assert_eq!(identify_family(&g), Some(Family::Cycle(4)));
        let eig = compose_eigenvalues(ProductRule::Cartesian, &k2_spectrum(), &k2_spectrum(), &Tolerances::default());
        let values: Vec<(f64, usize)> = eig.iter().map(|e| (e.value.re(), e.multiplicity)).collect();
        assert_eq!(values, vec![(2.0, 1), (0.0, 2), (-2.0, 1)]);
        assert!(eig.iter().all(Eigenvalue::is_exact));
    }

    #[test]
    fn test_tensor_k2_is_two_edges() {
        let g = tensor_product(&k2(), &k2());
        assert_eq!(g.edges(), &[(0, 3), (1, 2)]);
        let eig = compose_eigenvalues(ProductRule::Tensor, &k2_spectrum(), &k2_spectrum(), &Tolerances::default());
        let values: Vec<(f64, usize)> = eig.iter().map(|e| (e.value.re(), e.multiplicity)).collect();
        assert_eq!(values, vec![(1.0, 2), (-1.0, 2)]);
    }

    #[test]
    fn test_cartesian_cycle_path_identifies_radicals() {
        let p3 = Family::Path(3).spectrum().unwrap();
        let k2s = k2_spectrum();
        let eig = compose_eigenvalues(ProductRule::Cartesian, &p3, &k2s, &Tolerances::default());
        let total: usize = eig.iter().map(|e| e.multiplicity).sum();
        assert_eq!(total, 6);
        // √2 + 1 is recovered as a radical sum
        assert!(eig.iter().any(|e| e.label() == "1 + √2"));
        assert!(eig.iter().all(Eigenvalue::is_exact));
    }

    #[test]
    fn test_product_edge_counts() {
        let p3 = Graph::new(3, &[(0, 1), (1, 2)]).unwrap();
        let c = cartesian_product(&p3, &k2());
        assert_eq!(c.edge_count(), 2 * 2 + 3);
        let t = tensor_product(&p3, &k2());
        assert_eq!(t.edge_count(), 2 * 2 * 1);
    }
}
