use serde::{Deserialize, Serialize};

use crate::constants::Tolerances;
use crate::eigen::symmetric_eigenvalues;
use crate::family::{Family, identify_family};
use crate::graph::Graph;
use crate::spectrum::{Eigenvalue, expand};

/// Expansion band of the normalized spectral gap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionQuality {
    Excellent,
    Good,
    Moderate,
    Weak,
    Poor,
}

impl ExpansionQuality {
    pub fn from_normalized_gap(gap: f64) -> Self {
        if gap >= 0.5 {
            ExpansionQuality::Excellent
        } else if gap >= 0.3 {
            ExpansionQuality::Good
        } else if gap >= 0.15 {
            ExpansionQuality::Moderate
        } else if gap >= 0.05 {
            ExpansionQuality::Weak
        } else {
            ExpansionQuality::Poor
        }
    }
}

/// Where a metric came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    FamilyFormula,
    Spectrum,
    Laplacian,
}

/// Bounds on the Cheeger constant h from a = λ₂(L): a/2 ≤ h ≤ √(2·a·d_max).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheegerBounds {
    pub lower: f64,
    pub upper: f64,
}

impl CheegerBounds {
    pub fn from_connectivity(a: f64, max_degree: usize) -> Self {
        let d = max_degree.max(1) as f64;
        let a = a.max(0.0);
        Self {
            lower: a / 2.0,
            upper: (2.0 * a * d).sqrt(),
        }
    }
}

/// Optional structural context for `analyze`.
#[derive(Clone, Copy, Debug, Default)]
pub struct GraphInfo<'a> {
    pub graph: Option<&'a Graph>,
    pub family: Option<Family>,
}

impl<'a> GraphInfo<'a> {
    pub fn of(graph: &'a Graph) -> Self {
        Self {
            graph: Some(graph),
            family: identify_family(graph),
        }
    }

    pub fn family(family: Family) -> Self {
        Self {
            graph: None,
            family: Some(family),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpectralMetrics {
    pub n: usize,
    pub spectral_radius: f64,
    /// λ₁ − λ₂ by real part
    pub gap: f64,
    /// |λ₁| − |λ₂| by magnitude
    pub absolute_gap: f64,
    pub normalized_gap: f64,
    /// λ₁ − λₙ
    pub spectral_width: f64,
    /// Σ|λᵢ|
    pub energy: f64,
    pub expansion: ExpansionQuality,
    pub gap_source: MetricSource,
    pub algebraic_connectivity: Option<f64>,
    pub connectivity_source: Option<MetricSource>,
    pub cheeger: Option<CheegerBounds>,
}

/// Spectral invariants of an eigenvalue multiset.
///
/// Family formulas take precedence for the gap and algebraic connectivity;
/// without a family, a supplied graph has its Laplacian solved numerically.
pub fn analyze(
    eigenvalues: &[Eigenvalue],
    n: usize,
    info: Option<&GraphInfo<'_>>,
    tol: &Tolerances,
) -> SpectralMetrics {
    let values = expand(eigenvalues);
    let mut real: Vec<f64> = values.iter().map(|v| v.re()).collect();
    real.sort_by(|a, b| b.total_cmp(a));
    let mut magnitudes: Vec<f64> = values.iter().map(|v| v.magnitude()).collect();
    magnitudes.sort_by(|a, b| b.total_cmp(a));

    let lambda1 = real.first().copied().unwrap_or(0.0);
    let lambda2 = real.get(1).copied().unwrap_or(lambda1);
    let lambda_n = real.last().copied().unwrap_or(0.0);
    let spectral_radius = magnitudes.first().copied().unwrap_or(0.0);
    let absolute_gap = match (magnitudes.first(), magnitudes.get(1)) {
        (Some(a), Some(b)) => a - b,
        _ => 0.0,
    };
    let energy = magnitudes.iter().sum();

    let family = info.and_then(|i| i.family);
    let (gap, gap_source) = match family.and_then(Family::spectral_gap) {
        Some(g) => (g, MetricSource::FamilyFormula),
        None => (lambda1 - lambda2, MetricSource::Spectrum),
    };
    let normalized_gap = if lambda1 > tol.zero { gap / lambda1 } else { 0.0 };

    let (algebraic_connectivity, connectivity_source) =
        match family.and_then(Family::algebraic_connectivity) {
            Some(a) => (Some(a), Some(MetricSource::FamilyFormula)),
            None => match info.and_then(|i| i.graph) {
                Some(graph) => (laplacian_connectivity(graph, tol), Some(MetricSource::Laplacian)),
                None => (None, None),
            },
        };

    let max_degree = match (info.and_then(|i| i.graph), family) {
        (Some(graph), _) => graph.max_degree(),
        (None, Some(f)) => f.max_degree(),
        (None, None) => 1,
    };
    let cheeger = algebraic_connectivity.map(|a| CheegerBounds::from_connectivity(a, max_degree));

    SpectralMetrics {
        n,
        spectral_radius,
        gap,
        absolute_gap,
        normalized_gap,
        spectral_width: lambda1 - lambda_n,
        energy,
        expansion: ExpansionQuality::from_normalized_gap(normalized_gap),
        gap_source,
        algebraic_connectivity,
        connectivity_source,
        cheeger,
    }
}

/// Second-smallest Laplacian eigenvalue; `None` below two vertices.
pub fn laplacian_connectivity(graph: &Graph, tol: &Tolerances) -> Option<f64> {
    if graph.n() < 2 {
        return None;
    }
    let spectrum = symmetric_eigenvalues(&graph.laplacian(), tol);
    let a = spectrum.values.get(graph.n() - 2).copied()?;
    Some(if a.abs() < tol.zero * 10.0 { 0.0 } else { a })
}
