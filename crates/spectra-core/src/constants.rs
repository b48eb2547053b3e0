use serde::{Deserialize, Serialize};

/// Golden ratio: (1 + √5) / 2
pub const PHI: f64 = 1.618_033_988_749_895;

/// Conjugate golden ratio: (1 − √5) / 2
pub const PSI: f64 = -0.618_033_988_749_894_9;

/// Largest integer magnitude an f64 represents exactly (2⁵³)
pub const F64_EXACT_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Tridiagonal QR iteration budget per vertex
pub const QR_ITERATIONS_PER_VERTEX: usize = 30;

/// Cyclic Jacobi rotation budget coefficient (times n³)
pub const JACOBI_ROTATIONS_PER_CUBE: usize = 5;

/// Default power-iteration step limit for the fast spectral radius
pub const DEFAULT_POWER_ITERATIONS: usize = 1000;

/// Seed for the power-iteration start vector
pub const POWER_ITERATION_SEED: u64 = 0x5EED_0F_5EC7;

/// Largest vertex count the exhaustive enumerator accepts
pub const MAX_ENUMERATION_VERTICES: usize = 7;

/// Decimal places kept by the polynomial fingerprint
pub const POLYNOMIAL_HASH_DECIMALS: i32 = 10;

/// Every numeric tolerance used by the solver, identifier and factorizer.
///
/// One value is threaded through an analysis so all accept/reject boundaries
/// come from the same place. Deserializes with defaults for missing fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Tridiagonal QR off-diagonal convergence threshold
    pub qr_offdiag: f64,
    /// Cyclic Jacobi off-diagonal convergence threshold
    pub jacobi: f64,
    /// Magnitudes below this are emitted as exact zero
    pub zero: f64,
    /// Magnitude difference under which ±iω values are paired
    pub dedup: f64,
    /// Relative Rayleigh-quotient change for the fast spectral radius
    pub power_iteration: f64,
    /// Closed-form match tolerance for solver-accurate values
    pub identify: f64,
    /// Closed-form match tolerance for companion-matrix roots
    pub numeric_identify: f64,
    /// Imaginary parts below this make a root real
    pub imaginary: f64,
    /// |p(x)| bound a closed form must meet to count as exact
    pub residual: f64,
    /// Roots closer than this are merged into one multiplicity group
    pub multiplicity: f64,
    /// Search grid of the closed-form identifier
    pub limits: IdentifierLimits,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            qr_offdiag: 1e-10,
            jacobi: 1e-12,
            zero: 1e-10,
            dedup: 1e-8,
            power_iteration: 1e-10,
            identify: 1e-8,
            numeric_identify: 1e-7,
            imaginary: 1e-7,
            residual: 1e-4,
            multiplicity: 1e-6,
            limits: IdentifierLimits::default(),
        }
    }
}

/// Bounds of the closed-form candidate grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierLimits {
    pub max_integer: i64,
    pub max_fraction_denominator: i64,
    pub max_radicand: u64,
    pub max_sum_offset: i64,
    pub max_sum_radicand: u64,
    pub max_sum_denominator: u32,
    pub max_nested_outer: u64,
    pub max_nested_radicand: u64,
    pub max_wide_outer: i64,
    pub max_trig_denominator: u32,
}

impl Default for IdentifierLimits {
    fn default() -> Self {
        Self {
            max_integer: 100,
            max_fraction_denominator: 12,
            max_radicand: 100,
            max_sum_offset: 10,
            max_sum_radicand: 50,
            max_sum_denominator: 4,
            max_nested_outer: 15,
            max_nested_radicand: 30,
            max_wide_outer: 20,
            max_trig_denominator: 60,
        }
    }
}
