//! Numeric eigenvalue solvers for adjacency and orientation matrices.
//!
//! All entry points are bounded: exceeding the iteration budget returns the
//! best estimate with `converged = false` rather than failing.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::constants::{
    JACOBI_ROTATIONS_PER_CUBE, POWER_ITERATION_SEED, QR_ITERATIONS_PER_VERTEX, Tolerances,
};
use crate::matrix::{MatrixKind, RealMatrix};
use crate::spectrum::Scalar;

/// Real spectrum of a symmetric matrix, sorted descending.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymmetricSpectrum {
    pub values: Vec<f64>,
    pub converged: bool,
    pub iterations: usize,
}

/// Spectrum of an antisymmetric matrix: n values, zeros or ±iω pairs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkewSpectrum {
    pub values: Vec<Scalar>,
    pub converged: bool,
    pub iterations: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RadiusEstimate {
    pub value: f64,
    pub converged: bool,
    pub iterations: usize,
}

/// Householder tridiagonalization followed by implicit shifted QR.
///
/// The shift is the eigenvalue of the trailing 2×2 block nearest the active
/// diagonal entry (Wilkinson). Bounded to 30·n sweeps in total.
pub fn symmetric_eigenvalues(matrix: &RealMatrix, tol: &Tolerances) -> SymmetricSpectrum {
    let n = matrix.n();
    if n == 0 {
        return SymmetricSpectrum {
            values: Vec::new(),
            converged: true,
            iterations: 0,
        };
    }
    if n == 1 {
        return SymmetricSpectrum {
            values: vec![matrix.get(0, 0)],
            converged: true,
            iterations: 0,
        };
    }

    let (mut d, mut e) = tridiagonalize(matrix);
    let max_iter = QR_ITERATIONS_PER_VERTEX * n;
    let (converged, iterations) = tridiagonal_ql(&mut d, &mut e, tol.qr_offdiag, max_iter);

    d.sort_by(|a, b| b.total_cmp(a));
    SymmetricSpectrum {
        values: d,
        converged,
        iterations,
    }
}

/// Reduce a symmetric matrix to tridiagonal form.
///
/// Returns the diagonal and the sub-diagonal (`e[i]` couples `i` and `i+1`,
/// `e[n-1] = 0`).
fn tridiagonalize(matrix: &RealMatrix) -> (Vec<f64>, Vec<f64>) {
    let n = matrix.n();
    let mut a = matrix.clone();

    for k in 0..n.saturating_sub(2) {
        let m = n - k - 1;
        let mut v: Vec<f64> = (0..m).map(|i| a.get(k + 1 + i, k)).collect();
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm < f64::MIN_POSITIVE {
            continue;
        }
        let alpha = if v[0] > 0.0 { -norm } else { norm };
        v[0] -= alpha;
        let vnorm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if vnorm < f64::MIN_POSITIVE {
            continue;
        }
        for x in &mut v {
            *x /= vnorm;
        }

        // A ← H·A·H with H = I − 2vvᵀ acting on indices k+1..n
        for j in 0..n {
            let dot: f64 = (0..m).map(|i| v[i] * a.get(k + 1 + i, j)).sum();
            for i in 0..m {
                let cur = a.get(k + 1 + i, j);
                a.set(k + 1 + i, j, cur - 2.0 * v[i] * dot);
            }
        }
        for i in 0..n {
            let dot: f64 = (0..m).map(|j| a.get(i, k + 1 + j) * v[j]).sum();
            for j in 0..m {
                let cur = a.get(i, k + 1 + j);
                a.set(i, k + 1 + j, cur - 2.0 * dot * v[j]);
            }
        }
    }

    let d = (0..n).map(|i| a.get(i, i)).collect();
    let mut e: Vec<f64> = (0..n - 1).map(|i| a.get(i + 1, i)).collect();
    e.push(0.0);
    (d, e)
}

/// Implicit QL iteration on a symmetric tridiagonal matrix.
fn tridiagonal_ql(d: &mut [f64], e: &mut [f64], tol: f64, max_iter: usize) -> (bool, usize) {
    let n = d.len();
    let mut total = 0;

    for l in 0..n {
        loop {
            let mut m = l;
            while m + 1 < n {
                let dd = d[m].abs() + d[m + 1].abs();
                if e[m].abs() <= f64::EPSILON * dd || e[m].abs() < tol {
                    break;
                }
                m += 1;
            }
            if m == l {
                break;
            }
            if total >= max_iter {
                return (false, total);
            }
            total += 1;

            let mut g = (d[l + 1] - d[l]) / (2.0 * e[l]);
            let mut r = g.hypot(1.0);
            g = d[m] - d[l] + e[l] / (g + r.copysign(g));
            let (mut s, mut c, mut p) = (1.0, 1.0, 0.0);
            let mut underflow = false;
            let mut i = m;
            while i > l {
                i -= 1;
                let f = s * e[i];
                let b = c * e[i];
                r = f.hypot(g);
                e[i + 1] = r;
                if r == 0.0 {
                    d[i + 1] -= p;
                    e[m] = 0.0;
                    underflow = true;
                    break;
                }
                s = f / r;
                c = g / r;
                g = d[i + 1] - p;
                r = (d[i] - g) * s + 2.0 * c * b;
                p = s * r;
                d[i + 1] = g + p;
                g = c * r - b;
            }
            if underflow {
                continue;
            }
            d[l] -= p;
            e[l] = g;
            e[m] = 0.0;
        }
    }
    (true, total)
}

/// Cyclic Jacobi rotations, bounded to 5·n³ rotations.
pub fn symmetric_eigenvalues_jacobi(matrix: &RealMatrix, tol: &Tolerances) -> SymmetricSpectrum {
    let n = matrix.n();
    if n <= 1 {
        return symmetric_eigenvalues(matrix, tol);
    }

    let mut a = matrix.clone();
    let max_rotations = JACOBI_ROTATIONS_PER_CUBE * n * n * n;
    let mut rotations = 0;
    let mut converged = false;

    'sweeps: loop {
        if off_diagonal_norm(&a) < tol.jacobi {
            converged = true;
            break;
        }
        for p in 0..n - 1 {
            for q in (p + 1)..n {
                let apq = a.get(p, q);
                if apq.abs() < f64::MIN_POSITIVE {
                    continue;
                }
                if rotations >= max_rotations {
                    break 'sweeps;
                }
                rotations += 1;

                let theta = (a.get(q, q) - a.get(p, p)) / (2.0 * apq);
                let t = if theta == 0.0 {
                    1.0
                } else {
                    theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a.get(k, p);
                    let akq = a.get(k, q);
                    a.set(k, p, c * akp - s * akq);
                    a.set(k, q, s * akp + c * akq);
                }
                for k in 0..n {
                    let apk = a.get(p, k);
                    let aqk = a.get(q, k);
                    a.set(p, k, c * apk - s * aqk);
                    a.set(q, k, s * apk + c * aqk);
                }
                a.set(p, q, 0.0);
                a.set(q, p, 0.0);
            }
        }
    }

    let mut values: Vec<f64> = (0..n).map(|i| a.get(i, i)).collect();
    values.sort_by(|a, b| b.total_cmp(a));
    SymmetricSpectrum {
        values,
        converged,
        iterations: rotations,
    }
}

fn off_diagonal_norm(a: &RealMatrix) -> f64 {
    let n = a.n();
    let mut sum = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i != j {
                sum += a.get(i, j) * a.get(i, j);
            }
        }
    }
    sum.sqrt()
}

/// Eigenvalues of a real antisymmetric matrix via the symmetric −A².
///
/// Magnitudes are paired into ±iω and the rest is zero. A pair whose partners
/// differ by more than `dedup`, or an unpaired leftover magnitude, clears
/// `converged`.
pub fn skew_symmetric_eigenvalues(matrix: &RealMatrix, tol: &Tolerances) -> SkewSpectrum {
    let n = matrix.n();
    if n <= 1 {
        return SkewSpectrum {
            values: vec![Scalar::Real(0.0); n],
            converged: true,
            iterations: 0,
        };
    }

    let neg_square = matrix.mul(matrix).scale(-1.0);
    let inner = symmetric_eigenvalues(&neg_square, tol);

    // μ of exact zeros comes back as rounding noise around 1e-15; clamp it
    // relative to the largest μ before the square root amplifies it.
    let scale = inner.values.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
    let mut nonzero: Vec<f64> = inner
        .values
        .iter()
        .filter(|&&mu| mu >= tol.zero * scale)
        .map(|&mu| mu.sqrt())
        .filter(|&w| w >= tol.zero)
        .collect();
    nonzero.sort_by(|a, b| b.total_cmp(a));

    let (values, paired) = pair_frequencies(&nonzero, n, tol.dedup);
    SkewSpectrum {
        values,
        converged: inner.converged && paired,
        iterations: inner.iterations,
    }
}

/// ±iω pairs from descending magnitudes, zero-padded to n. The flag is false
/// when some pair was further apart than `dedup` or a magnitude was left over.
fn pair_frequencies(magnitudes: &[f64], n: usize, dedup: f64) -> (Vec<Scalar>, bool) {
    let mut values = Vec::with_capacity(n);
    let mut paired = magnitudes.len() % 2 == 0;
    for pair in magnitudes.chunks_exact(2) {
        let (a, b) = (pair[0], pair[1]);
        if (a - b).abs() >= dedup {
            paired = false;
        }
        let w = (a + b) / 2.0;
        values.push(Scalar::imaginary(w));
        values.push(Scalar::imaginary(-w));
    }
    while values.len() < n {
        values.push(Scalar::Real(0.0));
    }
    (values, paired)
}

/// Dominant eigenvalue magnitude by power iteration.
///
/// Iterates on the positive semidefinite A² (symmetric) or −A² (antisymmetric)
/// so bipartite ± pairs do not oscillate, and takes the square root at the end.
pub fn spectral_radius_fast(
    matrix: &RealMatrix,
    kind: MatrixKind,
    max_iter: usize,
    tol: &Tolerances,
) -> RadiusEstimate {
    let n = matrix.n();
    if n == 0 {
        return RadiusEstimate {
            value: 0.0,
            converged: true,
            iterations: 0,
        };
    }
    if n == 1 {
        return RadiusEstimate {
            value: matrix.get(0, 0).abs(),
            converged: true,
            iterations: 0,
        };
    }

    let sign = match kind {
        MatrixKind::Symmetric => 1.0,
        MatrixKind::Antisymmetric => -1.0,
    };
    let mut rng = SmallRng::seed_from_u64(POWER_ITERATION_SEED);
    let mut x: Vec<f64> = (0..n).map(|_| 0.5 + rng.random::<f64>()).collect();
    normalize(&mut x);

    let mut lambda = 0.0;
    for iter in 1..=max_iter {
        let ax = matrix.mul_vec(&x);
        let mut y: Vec<f64> = matrix.mul_vec(&ax).into_iter().map(|v| sign * v).collect();
        let next = dot(&x, &y);
        let norm = normalize(&mut y);
        if norm < f64::MIN_POSITIVE {
            return RadiusEstimate {
                value: 0.0,
                converged: true,
                iterations: iter,
            };
        }
        let delta = (next - lambda).abs();
        lambda = next;
        x = y;
        if iter > 1 && delta <= tol.power_iteration * lambda.abs().max(1.0) {
            return RadiusEstimate {
                value: lambda.max(0.0).sqrt(),
                converged: true,
                iterations: iter,
            };
        }
    }

    RadiusEstimate {
        value: lambda.max(0.0).sqrt(),
        converged: false,
        iterations: max_iter,
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalize(v: &mut [f64]) -> f64 {
    let norm = dot(v, v).sqrt();
    if norm >= f64::MIN_POSITIVE {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    norm
}
