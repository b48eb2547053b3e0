//! Placement of analysed graphs in the 3D spectral universe.

use serde::{Deserialize, Serialize};

use crate::closed_form::ClosedFormKind;
use crate::constants::Tolerances;
use crate::invariants::analyze;
use crate::spectrum::Eigenvalue;

/// X = n × 8
pub const N_SCALE: f64 = 8.0;
/// Y = ρ × 15
pub const RHO_SCALE: f64 = 15.0;
/// Z = (E − 8) × 8
pub const ENERGY_SCALE: f64 = 8.0;
pub const ENERGY_CENTER: f64 = 8.0;

/// Read-only summary handed to renderers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniverseMetrics {
    pub n: usize,
    pub spectral_radius: f64,
    pub gap: f64,
    pub energy: f64,
    /// Fraction of eigenvalues, with multiplicity, with a rational closed form.
    pub rationality: f64,
    pub position: [f64; 3],
}

impl UniverseMetrics {
    /// Purely imaginary spectra use the magnitude gap since their real parts
    /// all vanish; their closed forms count through |im|.
    pub fn from_spectrum(n: usize, eigenvalues: &[Eigenvalue], tol: &Tolerances) -> Self {
        let metrics = analyze(eigenvalues, n, None, tol);
        let real = eigenvalues.iter().all(|e| e.value.is_real());
        let gap = if real { metrics.gap } else { metrics.absolute_gap };

        let total: usize = eigenvalues.iter().map(|e| e.multiplicity).sum();
        let rational: usize = eigenvalues
            .iter()
            .filter(|e| {
                e.closed_form.as_ref().is_some_and(|cf| {
                    cf.exact
                        && matches!(
                            cf.kind,
                            ClosedFormKind::Zero
                                | ClosedFormKind::Integer(_)
                                | ClosedFormKind::Fraction { .. }
                        )
                })
            })
            .map(|e| e.multiplicity)
            .sum();
        let rationality = if total == 0 {
            0.0
        } else {
            rational as f64 / total as f64
        };

        Self {
            n,
            spectral_radius: metrics.spectral_radius,
            gap,
            energy: metrics.energy,
            rationality,
            position: position(n, metrics.spectral_radius, metrics.energy),
        }
    }
}

pub fn position(n: usize, spectral_radius: f64, energy: f64) -> [f64; 3] {
    [
        n as f64 * N_SCALE,
        spectral_radius * RHO_SCALE,
        (energy - ENERGY_CENTER) * ENERGY_SCALE,
    ]
}
