//! Symbolic factorization of integer characteristic polynomials.
//!
//! Two strategies share one result shape. The general factorizer peels off
//! zero roots, integer roots and λ² − k factors, solves a biquadratic
//! remainder and finishes numerically. The μ-substitution strategy applies to
//! even and odd polynomials: it rewrites p(λ) = λ^k·q(λ²) and factors q over
//! the integers, lifting each μ root to ±√μ.

use std::fmt;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::cancel::CancelFlag;
use crate::charpoly::{IntPolynomial, exact_polynomial};
use crate::closed_form::{ClosedForm, ClosedFormKind, Sign, identify_closed_form, perfect_square_root};
use crate::constants::Tolerances;
use crate::error::Result;
use crate::matrix::{Matrix, MatrixKind};
use crate::roots::polynomial_roots;
use crate::spectrum::{Eigenvalue, Scalar, group_eigenvalues};

/// Small integer roots always tried regardless of the constant term.
const SMALL_ROOT_BOUND: i64 = 20;
/// Divisor enumeration is skipped for constant terms above this.
const DIVISOR_SEARCH_LIMIT: u64 = 1_000_000_000_000;
/// λ² − μ factors are searched for |μ| up to this.
const QUADRATIC_RADICAL_BOUND: i64 = 50;
/// Grid of the μ² + pμ + q trial divisors.
const MU_LINEAR_BOUND: i64 = 30;
const MU_CONSTANT_BOUND: i64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    General,
    MuSubstitution,
}

/// One recovered factor of the characteristic polynomial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    /// λ^k
    PowerOfLambda(usize),
    /// (λ − r)
    Linear(i64),
    /// (λ² − μ); negative μ gives λ² + |μ|.
    QuadraticRadical(i64),
    /// One μ root of an irreducible biquadratic, with the form of √|μ|.
    BiquadraticRoot { mu: f64, form: ClosedForm },
    /// (μ² + pμ + q) with μ = λ²
    QuadraticInMu { p: i64, q: i64 },
    /// Whatever resisted symbolic treatment.
    Remainder { degree: usize, coeffs: IntPolynomial },
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factor::PowerOfLambda(1) => write!(f, "λ"),
            Factor::PowerOfLambda(k) => write!(f, "λ^{k}"),
            Factor::Linear(r) if *r < 0 => write!(f, "(λ + {})", -r),
            Factor::Linear(r) => write!(f, "(λ - {r})"),
            Factor::QuadraticRadical(mu) if *mu < 0 => write!(f, "(λ^2 + {})", -mu),
            Factor::QuadraticRadical(mu) => write!(f, "(λ^2 - {mu})"),
            Factor::BiquadraticRoot { form, .. } => write!(f, "(λ^2 - ({form})^2)"),
            Factor::QuadraticInMu { p, q } => {
                write!(f, "(μ^2")?;
                match p.signum() {
                    1 => write!(f, " + {p}μ")?,
                    -1 => write!(f, " - {}μ", -p)?,
                    _ => {}
                }
                match q.signum() {
                    1 => write!(f, " + {q})"),
                    -1 => write!(f, " - {})", -q),
                    _ => write!(f, ")"),
                }
            }
            Factor::Remainder { coeffs, .. } => write!(f, "({coeffs})"),
        }
    }
}

/// Outcome of one factorization strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Factorization {
    pub strategy: Strategy,
    pub factors: Vec<Factor>,
    /// Grouped by multiplicity, descending.
    pub eigenvalues: Vec<Eigenvalue>,
    pub degree: usize,
    /// Exact eigenvalues counted with multiplicity.
    pub exact_count: usize,
    /// Roots recovered without the numeric fallback.
    pub symbolic_count: usize,
    /// General: every root exact. μ-substitution: every root recovered
    /// symbolically and exact.
    pub success: bool,
}

impl Factorization {
    pub fn all_exact(&self) -> bool {
        self.exact_count == self.degree
    }
}

/// Exact polynomial plus the better of the two factorizations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolynomialAnalysis {
    pub polynomial: IntPolynomial,
    /// A coefficient exceeded 2⁵³ on its way to the numeric stage.
    pub precision_loss: bool,
    pub factorization: Factorization,
}

struct Collector<'a> {
    poly: &'a IntPolynomial,
    n: usize,
    /// Symmetric input: every root is real, numeric imaginary parts are noise.
    real: bool,
    tol: &'a Tolerances,
    factors: Vec<Factor>,
    roots: Vec<Eigenvalue>,
    symbolic: usize,
}

impl<'a> Collector<'a> {
    fn new(poly: &'a IntPolynomial, n: usize, kind: MatrixKind, tol: &'a Tolerances) -> Self {
        Self {
            poly,
            n,
            real: kind == MatrixKind::Symmetric,
            tol,
            factors: Vec::new(),
            roots: Vec::new(),
            symbolic: 0,
        }
    }

    fn passes(&self, value: Scalar) -> bool {
        self.poly.residual(value) < self.tol.residual
    }

    fn verified(&self, form: &ClosedForm, imaginary: bool) -> bool {
        if !form.exact {
            return false;
        }
        let v = form.value();
        if imaginary {
            self.passes(Scalar::imaginary(v)) && self.passes(Scalar::imaginary(-v))
        } else {
            self.passes(Scalar::Real(v))
        }
    }

    fn identified(&self, magnitude: f64) -> ClosedForm {
        identify_closed_form(magnitude, self.n, self.tol.numeric_identify, &self.tol.limits)
    }

    fn push_zeros(&mut self, k: usize) {
        if k == 0 {
            return;
        }
        self.factors.push(Factor::PowerOfLambda(k));
        for _ in 0..k {
            self.roots.push(Eigenvalue::real(0.0, ClosedForm::zero()));
        }
        self.symbolic += k;
    }

    fn real_root(&self, form: ClosedForm, fallback: f64) -> Eigenvalue {
        if self.verified(&form, false) {
            Eigenvalue::real(form.value(), form)
        } else {
            Eigenvalue::real(fallback, ClosedForm::algebraic(fallback))
        }
    }

    /// ±√μ for one μ root, `formula` being a closed form of √|μ|.
    fn push_mu_root(&mut self, mu: f64, formula: Option<ClosedForm>) {
        let magnitude = mu.abs().sqrt();
        if magnitude < self.tol.zero {
            for _ in 0..2 {
                self.roots.push(Eigenvalue::real(0.0, ClosedForm::zero()));
            }
            return;
        }
        let imaginary = mu < 0.0;
        let identified = self.identified(magnitude);
        let form = [Some(identified), formula]
            .into_iter()
            .flatten()
            .find(|cf| self.verified(cf, imaginary) && (imaginary || self.verified(&cf.negated(), false)));

        match (form, imaginary) {
            (Some(cf), true) => {
                let v = cf.value();
                self.roots.push(Eigenvalue::new(Scalar::imaginary(v), Some(cf.clone())));
                self.roots.push(Eigenvalue::new(Scalar::imaginary(-v), Some(cf)));
            }
            (Some(cf), false) => {
                let v = cf.value();
                self.roots.push(Eigenvalue::real(-v, cf.negated()));
                self.roots.push(Eigenvalue::real(v, cf));
            }
            (None, true) => {
                let cf = ClosedForm::algebraic(magnitude);
                self.roots.push(Eigenvalue::new(Scalar::imaginary(magnitude), Some(cf.clone())));
                self.roots.push(Eigenvalue::new(Scalar::imaginary(-magnitude), Some(cf)));
            }
            (None, false) => {
                self.roots.push(Eigenvalue::real(magnitude, ClosedForm::algebraic(magnitude)));
                self.roots.push(Eigenvalue::real(-magnitude, ClosedForm::algebraic(-magnitude)));
            }
        }
    }

    /// Numeric roots of `rest`, each re-identified and checked against the
    /// full polynomial. Roots are found once per squarefree part and repeated
    /// by that part's multiplicity.
    fn push_numeric(&mut self, rest: &IntPolynomial) {
        for (part, multiplicity) in rest.squarefree_parts() {
            let found = polynomial_roots(&part.to_f64().values);
            for (re, im) in found.values {
                let root = self.numeric_root(re, im);
                self.roots.extend(std::iter::repeat_n(root, multiplicity));
            }
        }
        self.factors.push(Factor::Remainder {
            degree: rest.degree(),
            coeffs: rest.clone(),
        });
    }

    fn numeric_root(&self, re: f64, im: f64) -> Eigenvalue {
        if self.real || im.abs() < self.tol.imaginary * re.abs().max(1.0) {
            return self.real_root(self.identified(re), re);
        }
        if re.abs() < self.tol.imaginary * im.abs().max(1.0) {
            let form = self.identified(im.abs());
            let v = if im < 0.0 { -form.value() } else { form.value() };
            if form.exact && self.passes(Scalar::imaginary(v)) {
                return Eigenvalue::new(Scalar::imaginary(v), Some(form));
            }
            let cf = ClosedForm::algebraic(im.abs());
            return Eigenvalue::new(Scalar::imaginary(im), Some(cf));
        }
        Eigenvalue::new(Scalar::Complex { re, im }, None)
    }

    /// Numeric roots of q(μ), lifted to λ = ±√μ, one search per squarefree
    /// part of q.
    fn push_numeric_mu(&mut self, q: &IntPolynomial) {
        for (part, multiplicity) in q.squarefree_parts() {
            let found = polynomial_roots(&part.to_f64().values);
            for (re, im) in found.values {
                for _ in 0..multiplicity {
                    self.push_numeric_mu_root(re, im);
                }
            }
        }
        self.factors.push(Factor::Remainder {
            degree: 2 * q.degree(),
            coeffs: IntPolynomial::from_mu(q),
        });
    }

    fn push_numeric_mu_root(&mut self, re: f64, im: f64) {
        if self.real {
            // μ = λ² of a real spectrum is non-negative
            self.push_mu_root(re.max(0.0), None);
        } else if im.abs() < self.tol.imaginary * re.abs().max(1.0) {
            self.push_mu_root(re, None);
        } else {
            let r = re.hypot(im);
            let sr = ((r + re) / 2.0).sqrt();
            let si = ((r - re) / 2.0).sqrt().copysign(im);
            self.roots.push(Eigenvalue::new(Scalar::Complex { re: sr, im: si }, None));
            self.roots.push(Eigenvalue::new(Scalar::Complex { re: -sr, im: -si }, None));
        }
    }

    fn finish(self, strategy: Strategy) -> Factorization {
        let degree = self.poly.degree();
        let exact_count = self.roots.iter().filter(|e| e.is_exact()).count();
        let symbolic_count = self.symbolic;
        let eigenvalues = group_eigenvalues(self.roots, self.tol.multiplicity);
        let success = match strategy {
            Strategy::General => exact_count == degree,
            Strategy::MuSubstitution => symbolic_count == degree && exact_count == degree,
        };
        Factorization {
            strategy,
            factors: self.factors,
            eigenvalues,
            degree,
            exact_count,
            symbolic_count,
            success,
        }
    }
}

/// Candidate integer roots: small values, then divisors of the constant term.
fn integer_candidates(constant: &BigInt) -> Vec<i64> {
    let divides = |d: i64| constant.is_zero() || (constant % BigInt::from(d)).is_zero();
    let mut out = Vec::new();
    for d in 1..=SMALL_ROOT_BOUND {
        if divides(d) {
            out.push(d);
            out.push(-d);
        }
    }
    let magnitude = constant.abs().to_u64().filter(|&m| m <= DIVISOR_SEARCH_LIMIT);
    if let Some(m) = magnitude {
        let mut d = 1u64;
        while d * d <= m {
            if m % d == 0 {
                for v in [d, m / d] {
                    let v = v as i64;
                    if v > SMALL_ROOT_BOUND && !out.contains(&v) {
                        out.push(v);
                        out.push(-v);
                    }
                }
            }
            d += 1;
        }
    }
    out
}

/// Next integer root of `p`, if any.
fn find_integer_root(p: &IntPolynomial) -> Option<i64> {
    integer_candidates(p.constant_term())
        .into_iter()
        .find(|&r| p.eval_int(&BigInt::from(r)).is_zero())
}

/// Roots of μ² + bμ + c with a form of √|μ| when the discriminant allows one.
fn quadratic_mu_roots(b: i64, c: i64) -> Vec<(f64, Option<ClosedForm>)> {
    let disc = i128::from(b) * i128::from(b) - 4 * i128::from(c);
    let Ok(d) = u64::try_from(disc) else {
        return Vec::new();
    };
    if let Some(s) = perfect_square_root(d) {
        let s = s as i64;
        return [(-b + s) / 2, (-b - s) / 2]
            .into_iter()
            .map(|mu| (mu as f64, Some(ClosedForm::sqrt(mu.unsigned_abs()))))
            .collect();
    }
    [Sign::Plus, Sign::Minus]
        .into_iter()
        .map(|sign| {
            let mu = (-b as f64 + sign.factor() * (d as f64).sqrt()) / 2.0;
            let kind = if mu >= 0.0 {
                ClosedFormKind::NestedRadicalQuotient {
                    a: -b,
                    b: d,
                    c: 2,
                    sign,
                    negative: false,
                }
            } else {
                ClosedFormKind::NestedRadicalQuotient {
                    a: b,
                    b: d,
                    c: 2,
                    sign: sign.flip(),
                    negative: false,
                }
            };
            (mu, Some(ClosedForm::exact(kind)))
        })
        .collect()
}

fn coefficient(p: &IntPolynomial, index: usize) -> Option<i64> {
    p.coeffs().get(index).and_then(|c| c.to_i64())
}

/// General factorization, ending in companion-matrix roots.
///
/// `kind` is the kind of matrix the polynomial came from; a symmetric one has
/// a real spectrum, so numeric roots are taken as real.
pub fn factor(
    poly: &IntPolynomial,
    n: usize,
    kind: MatrixKind,
    tol: &Tolerances,
    cancel: &CancelFlag,
) -> Result<Factorization> {
    let mut out = Collector::new(poly, n, kind, tol);
    let (k, mut rest) = poly.strip_zero_roots();
    out.push_zeros(k);

    while rest.degree() > 0 {
        cancel.check()?;
        let Some(r) = find_integer_root(&rest) else {
            break;
        };
        rest = rest.synthetic_divide(&BigInt::from(r)).0;
        out.factors.push(Factor::Linear(r));
        out.roots.push(Eigenvalue::real(r as f64, ClosedForm::integer(r)));
        out.symbolic += 1;
    }

    while rest.degree() >= 2 {
        cancel.check()?;
        let Some(q) = rest.to_mu() else {
            break;
        };
        let found = (1..=QUADRATIC_RADICAL_BOUND)
            .flat_map(|k| [k, -k])
            .filter(|&mu| !(mu > 0 && perfect_square_root(mu as u64).is_some()))
            .find(|&mu| q.eval_int(&BigInt::from(mu)).is_zero());
        let Some(mu) = found else {
            break;
        };
        rest = IntPolynomial::from_mu(&q.synthetic_divide(&BigInt::from(mu)).0);
        out.factors.push(Factor::QuadraticRadical(mu));
        out.push_mu_root(mu as f64, Some(ClosedForm::sqrt(mu.unsigned_abs())));
        out.symbolic += 2;
    }

    if rest.degree() == 4 && rest.is_even() {
        cancel.check()?;
        if let (Some(b), Some(c)) = (coefficient(&rest, 2), coefficient(&rest, 4)) {
            let mu_roots = quadratic_mu_roots(b, c);
            if !mu_roots.is_empty() {
                for (mu, form) in mu_roots {
                    if let Some(form) = &form {
                        out.factors.push(Factor::BiquadraticRoot {
                            mu,
                            form: form.clone(),
                        });
                    }
                    out.push_mu_root(mu, form);
                }
                out.symbolic += 4;
                rest = IntPolynomial::from_i64(&[1]);
            }
        }
    }

    if rest.degree() > 0 {
        cancel.check()?;
        out.push_numeric(&rest);
    }

    Ok(out.finish(Strategy::General))
}

/// μ = λ² factorization; `None` unless the polynomial is even or odd.
pub fn factor_with_mu_substitution(
    poly: &IntPolynomial,
    n: usize,
    kind: MatrixKind,
    tol: &Tolerances,
    cancel: &CancelFlag,
) -> Result<Option<Factorization>> {
    if !(poly.is_even() || poly.is_odd()) {
        return Ok(None);
    }
    let mut out = Collector::new(poly, n, kind, tol);
    let (k, rest) = poly.strip_zero_roots();
    out.push_zeros(k);
    let Some(mut q) = rest.to_mu() else {
        return Ok(None);
    };

    while q.degree() > 0 {
        cancel.check()?;
        let Some(mu) = find_integer_root(&q) else {
            break;
        };
        q = q.synthetic_divide(&BigInt::from(mu)).0;
        out.factors.push(Factor::QuadraticRadical(mu));
        out.push_mu_root(mu as f64, Some(ClosedForm::sqrt(mu.unsigned_abs())));
        out.symbolic += 2;
    }

    'search: while q.degree() >= 2 {
        for p in -MU_LINEAR_BOUND..=MU_LINEAR_BOUND {
            cancel.check()?;
            for c in -MU_CONSTANT_BOUND..=MU_CONSTANT_BOUND {
                let disc = p * p - 4 * c;
                if c == 0 || disc <= 0 || perfect_square_root(disc as u64).is_some() {
                    continue;
                }
                let divisor = IntPolynomial::from_i64(&[1, p, c]);
                if let Some(quotient) = q.divide_exact(&divisor) {
                    q = quotient;
                    out.factors.push(Factor::QuadraticInMu { p, q: c });
                    for (mu, form) in quadratic_mu_roots(p, c) {
                        out.push_mu_root(mu, form);
                    }
                    out.symbolic += 4;
                    continue 'search;
                }
            }
        }
        break;
    }

    if q.degree() > 0 {
        cancel.check()?;
        out.push_numeric_mu(&q);
    }

    Ok(Some(out.finish(Strategy::MuSubstitution)))
}

/// Both strategies on one polynomial; μ-substitution wins only with strictly
/// more exact eigenvalues.
pub fn analyze_polynomial(
    poly: &IntPolynomial,
    n: usize,
    kind: MatrixKind,
    tol: &Tolerances,
    cancel: &CancelFlag,
) -> Result<PolynomialAnalysis> {
    let general = factor(poly, n, kind, tol, cancel)?;
    let factorization = match factor_with_mu_substitution(poly, n, kind, tol, cancel)? {
        Some(mu) if mu.exact_count > general.exact_count => mu,
        _ => general,
    };
    Ok(PolynomialAnalysis {
        polynomial: poly.clone(),
        precision_loss: poly.to_f64().precision_loss,
        factorization,
    })
}

/// Exact characteristic polynomial of `matrix`, analyzed.
pub fn analyze_characteristic_polynomial(
    matrix: &Matrix,
    tol: &Tolerances,
    cancel: &CancelFlag,
) -> Result<PolynomialAnalysis> {
    let poly = exact_polynomial(matrix)?;
    analyze_polynomial(&poly, matrix.n(), matrix.kind(), tol, cancel)
}
