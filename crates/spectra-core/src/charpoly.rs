use std::fmt;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::constants::F64_EXACT_LIMIT;
use crate::error::{Result, SpectraError};
use crate::matrix::Matrix;
use crate::spectrum::Scalar;

/// Exact integer polynomial, coefficients highest degree first.
///
/// Serializes as decimal strings so large coefficients survive JSON.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct IntPolynomial {
    coeffs: Vec<BigInt>,
}

/// Float view of an exact polynomial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloatCoefficients {
    pub values: Vec<f64>,
    /// Some coefficient exceeds 2⁵³ and was rounded.
    pub precision_loss: bool,
}

impl IntPolynomial {
    pub fn new(coeffs: Vec<BigInt>) -> Self {
        let mut coeffs = coeffs;
        if coeffs.is_empty() {
            coeffs.push(BigInt::one());
        }
        Self { coeffs }
    }

    pub fn from_i64(coeffs: &[i64]) -> Self {
        Self::new(coeffs.iter().map(|&c| BigInt::from(c)).collect())
    }

    pub fn coeffs(&self) -> &[BigInt] {
        &self.coeffs
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn is_monic(&self) -> bool {
        self.coeffs[0].is_one()
    }

    pub fn constant_term(&self) -> &BigInt {
        &self.coeffs[self.degree()]
    }

    pub fn to_f64(&self) -> FloatCoefficients {
        let limit = BigInt::from(F64_EXACT_LIMIT as u64);
        let precision_loss = self.coeffs.iter().any(|c| c.abs() > limit);
        FloatCoefficients {
            values: self.coeffs.iter().map(big_to_f64).collect(),
            precision_loss,
        }
    }

    pub fn eval_int(&self, x: &BigInt) -> BigInt {
        let mut acc = BigInt::zero();
        for c in &self.coeffs {
            acc = acc * x + c;
        }
        acc
    }

    pub fn eval_f64(&self, x: f64) -> f64 {
        self.coeffs.iter().fold(0.0, |acc, c| acc * x + big_to_f64(c))
    }

    pub fn eval_complex(&self, re: f64, im: f64) -> (f64, f64) {
        let mut acc = (0.0, 0.0);
        for c in &self.coeffs {
            let (ar, ai) = acc;
            acc = (ar * re - ai * im + big_to_f64(c), ar * im + ai * re);
        }
        acc
    }

    /// |p(value)|
    pub fn residual(&self, value: Scalar) -> f64 {
        match value {
            Scalar::Real(x) => self.eval_f64(x).abs(),
            Scalar::Complex { re, im } => {
                let (r, i) = self.eval_complex(re, im);
                r.hypot(i)
            }
        }
    }

    /// Factor out λ^k; returns k and the quotient.
    pub fn strip_zero_roots(&self) -> (usize, IntPolynomial) {
        let mut coeffs = self.coeffs.clone();
        let mut k = 0;
        while coeffs.len() > 1 && coeffs[coeffs.len() - 1].is_zero() {
            coeffs.pop();
            k += 1;
        }
        (k, IntPolynomial { coeffs })
    }

    /// Divide by (λ − root); returns quotient and remainder.
    pub fn synthetic_divide(&self, root: &BigInt) -> (IntPolynomial, BigInt) {
        let mut out = Vec::with_capacity(self.coeffs.len());
        let mut carry = BigInt::zero();
        for c in &self.coeffs {
            carry = carry * root + c;
            out.push(carry.clone());
        }
        let remainder = out.pop().unwrap_or_default();
        (IntPolynomial::new(out), remainder)
    }

    /// Quotient when `divisor` is monic and divides exactly.
    pub fn divide_exact(&self, divisor: &IntPolynomial) -> Option<IntPolynomial> {
        if !divisor.is_monic() || divisor.degree() > self.degree() {
            return None;
        }
        let dd = divisor.degree();
        let mut rem = self.coeffs.clone();
        let qlen = self.degree() - dd + 1;
        let mut quot = Vec::with_capacity(qlen);
        for i in 0..qlen {
            let lead = rem[i].clone();
            if !lead.is_zero() {
                for (j, d) in divisor.coeffs.iter().enumerate() {
                    rem[i + j] -= &lead * d;
                }
            }
            quot.push(lead);
        }
        if rem[qlen..].iter().all(Zero::is_zero) {
            Some(IntPolynomial::new(quot))
        } else {
            None
        }
    }

    fn power_is_odd(&self, index: usize) -> bool {
        (self.degree() - index) % 2 == 1
    }

    /// Every non-zero coefficient sits on an even power.
    pub fn is_even(&self) -> bool {
        (0..self.coeffs.len()).all(|i| !self.power_is_odd(i) || self.coeffs[i].is_zero())
    }

    /// Every non-zero coefficient sits on an odd power.
    pub fn is_odd(&self) -> bool {
        (0..self.coeffs.len()).all(|i| self.power_is_odd(i) || self.coeffs[i].is_zero())
    }

    /// q(μ) with p(λ) = q(λ²), for even polynomials.
    pub fn to_mu(&self) -> Option<IntPolynomial> {
        if !self.is_even() {
            return None;
        }
        Some(IntPolynomial::new(self.coeffs.iter().step_by(2).cloned().collect()))
    }

    /// p(λ) = q(λ²)
    pub fn from_mu(q: &IntPolynomial) -> IntPolynomial {
        let mut coeffs = Vec::with_capacity(2 * q.coeffs.len() - 1);
        for (i, c) in q.coeffs.iter().enumerate() {
            if i > 0 {
                coeffs.push(BigInt::zero());
            }
            coeffs.push(c.clone());
        }
        IntPolynomial::new(coeffs)
    }

    /// p′
    pub fn derivative(&self) -> IntPolynomial {
        let d = self.degree();
        if d == 0 {
            return IntPolynomial {
                coeffs: vec![BigInt::zero()],
            };
        }
        let coeffs = self.coeffs[..d]
            .iter()
            .enumerate()
            .map(|(i, c)| c * BigInt::from(d - i))
            .collect();
        IntPolynomial { coeffs }
    }

    /// Greatest common divisor in ℤ[λ], primitive with a positive leading
    /// coefficient. Two monic inputs give a monic result.
    pub fn gcd(&self, other: &IntPolynomial) -> IntPolynomial {
        let mut a = primitive(trimmed(&self.coeffs));
        let mut b = primitive(trimmed(&other.coeffs));
        if a.len() < b.len() {
            std::mem::swap(&mut a, &mut b);
        }
        while !b.is_empty() {
            let r = primitive(pseudo_remainder(&a, &b));
            a = b;
            b = r;
        }
        if a.len() <= 1 {
            return IntPolynomial::from_i64(&[1]);
        }
        IntPolynomial::new(a)
    }

    /// Squarefree factors with multiplicities, p = ∏ fᵢ^mᵢ, for monic p.
    ///
    /// Repeated gcds with p′ peel one multiplicity layer at a time. Constants
    /// give an empty list.
    pub fn squarefree_parts(&self) -> Vec<(IntPolynomial, usize)> {
        if self.degree() == 0 {
            return Vec::new();
        }
        self.peel_multiplicities()
            .unwrap_or_else(|| vec![(self.clone(), 1)])
    }

    fn peel_multiplicities(&self) -> Option<Vec<(IntPolynomial, usize)>> {
        let mut repeated = self.gcd(&self.derivative());
        let mut distinct = self.divide_exact(&repeated)?;
        let mut out = Vec::new();
        let mut multiplicity = 1;
        while distinct.degree() > 0 {
            let deeper = distinct.gcd(&repeated);
            let layer = distinct.divide_exact(&deeper)?;
            if layer.degree() > 0 {
                out.push((layer, multiplicity));
            }
            repeated = repeated.divide_exact(&deeper)?;
            distinct = deeper;
            multiplicity += 1;
        }
        Some(out)
    }
}

fn trimmed(coeffs: &[BigInt]) -> Vec<BigInt> {
    coeffs.iter().skip_while(|c| c.is_zero()).cloned().collect()
}

/// Divide out the content; the leading coefficient ends up positive.
fn primitive(coeffs: Vec<BigInt>) -> Vec<BigInt> {
    let Some(lead) = coeffs.first() else {
        return coeffs;
    };
    let mut content = coeffs.iter().fold(BigInt::zero(), |g, c| g.gcd(c));
    if content.is_zero() {
        return Vec::new();
    }
    if lead.is_negative() {
        content = -content;
    }
    coeffs.into_iter().map(|c| c / &content).collect()
}

/// Remainder of lc(b)^k·a by b, with `b` non-empty and trimmed.
fn pseudo_remainder(a: &[BigInt], b: &[BigInt]) -> Vec<BigInt> {
    let lead = &b[0];
    let mut r = a.to_vec();
    while !r.is_empty() && r.len() >= b.len() {
        let top = r[0].clone();
        for c in r.iter_mut() {
            *c *= lead;
        }
        for (c, d) in r.iter_mut().zip(b) {
            *c -= &top * d;
        }
        r = trimmed(&r[1..]);
    }
    r
}

fn big_to_f64(c: &BigInt) -> f64 {
    c.to_f64().unwrap_or(if c.is_negative() {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    })
}

impl From<IntPolynomial> for Vec<String> {
    fn from(p: IntPolynomial) -> Self {
        p.coeffs.iter().map(BigInt::to_string).collect()
    }
}

impl TryFrom<Vec<String>> for IntPolynomial {
    type Error = String;

    fn try_from(raw: Vec<String>) -> std::result::Result<Self, Self::Error> {
        let coeffs = raw
            .iter()
            .map(|s| {
                s.parse::<BigInt>()
                    .map_err(|e| format!("invalid coefficient '{s}': {e}"))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if coeffs.is_empty() {
            return Err("polynomial needs at least one coefficient".to_string());
        }
        Ok(IntPolynomial { coeffs })
    }
}

impl fmt::Display for IntPolynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let deg = self.degree();
        let mut first = true;
        for (i, c) in self.coeffs.iter().enumerate() {
            if c.is_zero() {
                continue;
            }
            let power = deg - i;
            let mag = c.abs();
            if first {
                if c.is_negative() {
                    write!(f, "-")?;
                }
            } else if c.is_negative() {
                write!(f, " - ")?;
            } else {
                write!(f, " + ")?;
            }
            first = false;
            if !mag.is_one() || power == 0 {
                write!(f, "{mag}")?;
            }
            match power {
                0 => {}
                1 => write!(f, "λ")?,
                p => write!(f, "λ^{p}")?,
            }
        }
        if first {
            write!(f, "0")?;
        }
        Ok(())
    }
}

/// Characteristic polynomial det(λI − A) by the Faddeev-LeVerrier recursion.
///
/// M₀ = I, c_k = −tr(A·M_{k−1})/k, M_k = A·M_{k−1} + c_k·I. Each division
/// by k is exact over the integers; a remainder is reported, never truncated.
pub fn exact_polynomial(matrix: &Matrix) -> Result<IntPolynomial> {
    let n = matrix.n();
    let a = matrix.rows();
    let mut m: Vec<Vec<BigInt>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| if i == j { BigInt::one() } else { BigInt::zero() })
                .collect()
        })
        .collect();
    let mut coeffs = Vec::with_capacity(n + 1);
    coeffs.push(BigInt::one());

    for k in 1..=n {
        let mut am = multiply(&a, &m);
        let trace: BigInt = (0..n).map(|i| am[i][i].clone()).sum();
        let (q, r) = trace.div_rem(&BigInt::from(k));
        if !r.is_zero() {
            return Err(SpectraError::InexactTrace { k });
        }
        let c = -q;
        for (i, row) in am.iter_mut().enumerate() {
            row[i] += &c;
        }
        coeffs.push(c);
        m = am;
    }

    Ok(IntPolynomial { coeffs })
}

fn multiply(a: &[Vec<i64>], m: &[Vec<BigInt>]) -> Vec<Vec<BigInt>> {
    let n = a.len();
    let mut out = vec![vec![BigInt::zero(); n]; n];
    for i in 0..n {
        for k in 0..n {
            match a[i][k] {
                0 => {}
                1 => {
                    for j in 0..n {
                        out[i][j] += &m[k][j];
                    }
                }
                -1 => {
                    for j in 0..n {
                        out[i][j] -= &m[k][j];
                    }
                }
                v => {
                    let v = BigInt::from(v);
                    for j in 0..n {
                        out[i][j] += &v * &m[k][j];
                    }
                }
            }
        }
    }
    out
}
