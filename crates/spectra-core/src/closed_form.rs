use std::f64::consts::PI;
use std::fmt;

use num_integer::Integer;
use serde::{Deserialize, Serialize};

use crate::constants::{IdentifierLimits, PHI, PSI, Tolerances};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    pub fn factor(self) -> f64 {
        match self {
            Sign::Plus => 1.0,
            Sign::Minus => -1.0,
        }
    }

    pub(crate) fn flip(self) -> Sign {
        match self {
            Sign::Plus => Sign::Minus,
            Sign::Minus => Sign::Plus,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Sign::Plus => "+",
            Sign::Minus => "-",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrigFunc {
    TwoCos,
    TwoSin,
    Cos,
    Sin,
    Cot,
}

impl TrigFunc {
    const ALL: [TrigFunc; 5] = [
        TrigFunc::TwoCos,
        TrigFunc::TwoSin,
        TrigFunc::Cos,
        TrigFunc::Sin,
        TrigFunc::Cot,
    ];

    pub fn eval(self, angle: f64) -> f64 {
        match self {
            TrigFunc::TwoCos => 2.0 * angle.cos(),
            TrigFunc::TwoSin => 2.0 * angle.sin(),
            TrigFunc::Cos => angle.cos(),
            TrigFunc::Sin => angle.sin(),
            TrigFunc::Cot => angle.cos() / angle.sin(),
        }
    }

    /// Sine forms are positive on (0, π), so negatives need an explicit sign.
    fn needs_negation(self) -> bool {
        matches!(self, TrigFunc::TwoSin | TrigFunc::Sin)
    }

    fn name(self) -> &'static str {
        match self {
            TrigFunc::TwoCos => "2cos",
            TrigFunc::TwoSin => "2sin",
            TrigFunc::Cos => "cos",
            TrigFunc::Sin => "sin",
            TrigFunc::Cot => "cot",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedConstant {
    Phi,
    NegPhi,
    Psi,
    NegPsi,
    Sqrt2,
    Sqrt3,
    Sqrt5,
}

impl NamedConstant {
    const ALL: [NamedConstant; 7] = [
        NamedConstant::Phi,
        NamedConstant::NegPhi,
        NamedConstant::Psi,
        NamedConstant::NegPsi,
        NamedConstant::Sqrt2,
        NamedConstant::Sqrt3,
        NamedConstant::Sqrt5,
    ];

    pub fn value(self) -> f64 {
        match self {
            NamedConstant::Phi => PHI,
            NamedConstant::NegPhi => -PHI,
            NamedConstant::Psi => PSI,
            NamedConstant::NegPsi => -PSI,
            NamedConstant::Sqrt2 => std::f64::consts::SQRT_2,
            NamedConstant::Sqrt3 => 3f64.sqrt(),
            NamedConstant::Sqrt5 => 5f64.sqrt(),
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            NamedConstant::Phi => "φ",
            NamedConstant::NegPhi => "-φ",
            NamedConstant::Psi => "ψ",
            NamedConstant::NegPsi => "-ψ",
            NamedConstant::Sqrt2 => "√2",
            NamedConstant::Sqrt3 => "√3",
            NamedConstant::Sqrt5 => "√5",
        }
    }
}

/// Symbolic shape of a closed-form value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClosedFormKind {
    Zero,
    Integer(i64),
    /// p/q, sign carried by p
    Fraction { p: i64, q: i64 },
    /// ±√k
    Radical { k: u64, negative: bool },
    /// (a ± √b)/c
    RadicalSum { a: i64, b: u64, c: u32, sign: Sign },
    /// ±√(a ± √b)
    NestedRadical { a: u64, b: u64, sign: Sign, negative: bool },
    /// ±√((a ± √b)/c)
    NestedRadicalQuotient { a: i64, b: u64, c: u32, sign: Sign, negative: bool },
    /// ±func(kπ/m)
    Trig { func: TrigFunc, k: u32, m: u32, negative: bool },
    /// ±(1 + 2cos(kπ/m))
    TrigSum { k: u32, m: u32, negative: bool },
    /// ±2cosh(kπ/m)
    Hyperbolic { k: u32, m: u32, negative: bool },
    Constant(NamedConstant),
    /// No symbolic match; raw decimal.
    Algebraic(f64),
}

impl ClosedFormKind {
    pub fn value(&self) -> f64 {
        let neg = |negative: bool, v: f64| if negative { -v } else { v };
        match *self {
            ClosedFormKind::Zero => 0.0,
            ClosedFormKind::Integer(v) => v as f64,
            ClosedFormKind::Fraction { p, q } => p as f64 / q as f64,
            ClosedFormKind::Radical { k, negative } => neg(negative, (k as f64).sqrt()),
            ClosedFormKind::RadicalSum { a, b, c, sign } => {
                (a as f64 + sign.factor() * (b as f64).sqrt()) / c as f64
            }
            ClosedFormKind::NestedRadical { a, b, sign, negative } => {
                neg(negative, (a as f64 + sign.factor() * (b as f64).sqrt()).sqrt())
            }
            ClosedFormKind::NestedRadicalQuotient {
                a,
                b,
                c,
                sign,
                negative,
            } => neg(
                negative,
                ((a as f64 + sign.factor() * (b as f64).sqrt()) / c as f64).sqrt(),
            ),
            ClosedFormKind::Trig {
                func,
                k,
                m,
                negative,
            } => neg(negative, func.eval(k as f64 * PI / m as f64)),
            ClosedFormKind::TrigSum { k, m, negative } => {
                neg(negative, 1.0 + 2.0 * (k as f64 * PI / m as f64).cos())
            }
            ClosedFormKind::Hyperbolic { k, m, negative } => {
                neg(negative, 2.0 * (k as f64 * PI / m as f64).cosh())
            }
            ClosedFormKind::Constant(c) => c.value(),
            ClosedFormKind::Algebraic(v) => v,
        }
    }

    fn negated(&self) -> ClosedFormKind {
        match *self {
            ClosedFormKind::Zero => ClosedFormKind::Zero,
            ClosedFormKind::Integer(v) => ClosedFormKind::Integer(-v),
            ClosedFormKind::Fraction { p, q } => ClosedFormKind::Fraction { p: -p, q },
            ClosedFormKind::Radical { k, negative } => ClosedFormKind::Radical {
                k,
                negative: !negative,
            },
            ClosedFormKind::RadicalSum { a, b, c, sign } => ClosedFormKind::RadicalSum {
                a: -a,
                b,
                c,
                sign: sign.flip(),
            },
            ClosedFormKind::NestedRadical { a, b, sign, negative } => {
                ClosedFormKind::NestedRadical {
                    a,
                    b,
                    sign,
                    negative: !negative,
                }
            }
            ClosedFormKind::NestedRadicalQuotient {
                a,
                b,
                c,
                sign,
                negative,
            } => ClosedFormKind::NestedRadicalQuotient {
                a,
                b,
                c,
                sign,
                negative: !negative,
            },
            ClosedFormKind::Trig {
                func,
                k,
                m,
                negative,
            } => ClosedFormKind::Trig {
                func,
                k,
                m,
                negative: !negative,
            },
            ClosedFormKind::TrigSum { k, m, negative } => ClosedFormKind::TrigSum {
                k,
                m,
                negative: !negative,
            },
            ClosedFormKind::Hyperbolic { k, m, negative } => ClosedFormKind::Hyperbolic {
                k,
                m,
                negative: !negative,
            },
            ClosedFormKind::Constant(c) => match c {
                NamedConstant::Phi => ClosedFormKind::Constant(NamedConstant::NegPhi),
                NamedConstant::NegPhi => ClosedFormKind::Constant(NamedConstant::Phi),
                NamedConstant::Psi => ClosedFormKind::Constant(NamedConstant::NegPsi),
                NamedConstant::NegPsi => ClosedFormKind::Constant(NamedConstant::Psi),
                NamedConstant::Sqrt2 => ClosedFormKind::Radical { k: 2, negative: true },
                NamedConstant::Sqrt3 => ClosedFormKind::Radical { k: 3, negative: true },
                NamedConstant::Sqrt5 => ClosedFormKind::Radical { k: 5, negative: true },
            },
            ClosedFormKind::Algebraic(v) => ClosedFormKind::Algebraic(-v),
        }
    }
}

fn angle(f: &mut fmt::Formatter<'_>, k: u32, m: u32) -> fmt::Result {
    if k == 1 {
        write!(f, "π/{m}")
    } else {
        write!(f, "{k}π/{m}")
    }
}

fn minus(f: &mut fmt::Formatter<'_>, negative: bool) -> fmt::Result {
    if negative { write!(f, "-") } else { Ok(()) }
}

impl fmt::Display for ClosedFormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ClosedFormKind::Zero => write!(f, "0"),
            ClosedFormKind::Integer(v) => write!(f, "{v}"),
            ClosedFormKind::Fraction { p, q } => write!(f, "{p}/{q}"),
            ClosedFormKind::Radical { k, negative } => {
                minus(f, negative)?;
                write!(f, "√{k}")
            }
            ClosedFormKind::RadicalSum { a, b, c, sign } => {
                let numerator = if a == 0 {
                    match sign {
                        Sign::Plus => format!("√{b}"),
                        Sign::Minus => format!("-√{b}"),
                    }
                } else {
                    format!("{a} {} √{b}", sign.symbol())
                };
                match (c, a) {
                    (1, _) => write!(f, "{numerator}"),
                    (_, 0) => write!(f, "{numerator}/{c}"),
                    _ => write!(f, "({numerator})/{c}"),
                }
            }
            ClosedFormKind::NestedRadical { a, b, sign, negative } => {
                minus(f, negative)?;
                write!(f, "√({a} {} √{b})", sign.symbol())
            }
            ClosedFormKind::NestedRadicalQuotient {
                a,
                b,
                c,
                sign,
                negative,
            } => {
                minus(f, negative)?;
                if c == 1 {
                    write!(f, "√({a} {} √{b})", sign.symbol())
                } else {
                    write!(f, "√(({a} {} √{b})/{c})", sign.symbol())
                }
            }
            ClosedFormKind::Trig {
                func,
                k,
                m,
                negative,
            } => {
                minus(f, negative)?;
                write!(f, "{}(", func.name())?;
                angle(f, k, m)?;
                write!(f, ")")
            }
            ClosedFormKind::TrigSum { k, m, negative } => {
                if negative {
                    write!(f, "-(1 + 2cos(")?;
                    angle(f, k, m)?;
                    write!(f, "))")
                } else {
                    write!(f, "1 + 2cos(")?;
                    angle(f, k, m)?;
                    write!(f, ")")
                }
            }
            ClosedFormKind::Hyperbolic { k, m, negative } => {
                minus(f, negative)?;
                write!(f, "2cosh(")?;
                angle(f, k, m)?;
                write!(f, ")")
            }
            ClosedFormKind::Constant(c) => write!(f, "{}", c.symbol()),
            ClosedFormKind::Algebraic(v) => write!(f, "≈{v:.10}"),
        }
    }
}

/// A closed form together with whether it is believed exact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClosedForm {
    pub kind: ClosedFormKind,
    pub exact: bool,
}

impl ClosedForm {
    pub fn exact(kind: ClosedFormKind) -> Self {
        Self { kind, exact: true }
    }

    pub fn zero() -> Self {
        Self::exact(ClosedFormKind::Zero)
    }

    pub fn integer(v: i64) -> Self {
        if v == 0 {
            Self::zero()
        } else {
            Self::exact(ClosedFormKind::Integer(v))
        }
    }

    /// p/q in lowest terms; collapses to an integer when q divides p.
    pub fn fraction(p: i64, q: i64) -> Self {
        let g = p.gcd(&q).max(1);
        let (mut p, mut q) = (p / g, q / g);
        if q < 0 {
            p = -p;
            q = -q;
        }
        if q == 1 {
            Self::integer(p)
        } else {
            Self::exact(ClosedFormKind::Fraction { p, q })
        }
    }

    /// √k, collapsing perfect squares to integers.
    pub fn sqrt(k: u64) -> Self {
        match perfect_square_root(k) {
            Some(s) => Self::integer(s as i64),
            None => Self::exact(ClosedFormKind::Radical { k, negative: false }),
        }
    }

    /// 2cos(kπ/m) reduced to lowest terms, with the known radical and
    /// integer values substituted.
    pub fn two_cos(k: u64, m: u64) -> Self {
        let m = m.max(1);
        let mut k = k % (2 * m);
        if k > m {
            k = 2 * m - k;
        }
        let g = k.gcd(&m).max(1);
        let (k, m) = (k / g, m / g);
        match (k, m) {
            (0, _) => Self::integer(2),
            (1, 1) => Self::integer(-2),
            (1, 2) => Self::zero(),
            (1, 3) => Self::integer(1),
            (2, 3) => Self::integer(-1),
            (1, 4) => Self::sqrt(2),
            (3, 4) => Self::sqrt(2).negated(),
            (1, 6) => Self::sqrt(3),
            (5, 6) => Self::sqrt(3).negated(),
            (1, 5) => Self::exact(ClosedFormKind::Constant(NamedConstant::Phi)),
            (2, 5) => Self::exact(ClosedFormKind::Constant(NamedConstant::NegPsi)),
            (3, 5) => Self::exact(ClosedFormKind::Constant(NamedConstant::Psi)),
            (4, 5) => Self::exact(ClosedFormKind::Constant(NamedConstant::NegPhi)),
            _ => Self::exact(ClosedFormKind::Trig {
                func: TrigFunc::TwoCos,
                k: k as u32,
                m: m as u32,
                negative: false,
            }),
        }
    }

    pub fn algebraic(v: f64) -> Self {
        Self {
            kind: ClosedFormKind::Algebraic(v),
            exact: false,
        }
    }

    pub fn negated(&self) -> Self {
        Self {
            kind: self.kind.negated(),
            exact: self.exact,
        }
    }

    pub fn value(&self) -> f64 {
        self.kind.value()
    }
}

impl fmt::Display for ClosedForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

pub(crate) fn perfect_square_root(k: u64) -> Option<u64> {
    let s = (k as f64).sqrt().round() as u64;
    (s.checked_mul(s) == Some(k)).then_some(s)
}

/// Candidate trigonometric denominators for an n-vertex graph.
///
/// Structure-derived values first (cycles, paths and bipartite doubles),
/// then every small integer up to a size-scaled ceiling.
pub fn graph_denominators(n: usize, max_denominator: u32) -> Vec<u32> {
    let n = n as i64;
    let mut candidates = vec![n, n + 1, 2 * n, n - 1, 2 * (n + 1), 2 * (n - 1)];
    if n % 2 == 0 {
        candidates.push(n / 2);
        candidates.push(n / 2 + 1);
    } else {
        candidates.push((n + 1) / 2);
    }
    candidates.extend([2 * n + 1, n + 2, n - 2]);
    let ceiling = (2 * n + 2).max(12).min(i64::from(max_denominator));
    candidates.extend(2..=ceiling);

    let mut out: Vec<u32> = Vec::with_capacity(candidates.len());
    for m in candidates {
        if m < 2 {
            continue;
        }
        let m = m as u32;
        if !out.contains(&m) {
            out.push(m);
        }
    }
    out
}

/// `identify_closed_form` with the solver-accuracy tolerance.
pub fn identify(value: f64, n: usize, tol: &Tolerances) -> ClosedForm {
    identify_closed_form(value, n, tol.identify, &tol.limits)
}

/// Map a float to the first matching closed form, in priority order.
pub fn identify_closed_form(
    value: f64,
    n: usize,
    tolerance: f64,
    limits: &IdentifierLimits,
) -> ClosedForm {
    if !value.is_finite() {
        return ClosedForm::algebraic(value);
    }
    let matcher = Matcher {
        value,
        tol: tolerance,
        limits,
    };
    let denominators = graph_denominators(n, limits.max_trig_denominator);

    let kind = matcher
        .zero()
        .or_else(|| matcher.integer())
        .or_else(|| matcher.fraction())
        .or_else(|| matcher.radical())
        .or_else(|| matcher.radical_sum())
        .or_else(|| matcher.nested_radical())
        .or_else(|| matcher.trig(&denominators))
        .or_else(|| matcher.named_constant())
        .or_else(|| matcher.wide(&denominators));

    match kind {
        Some(kind) => ClosedForm::exact(kind),
        None => ClosedForm::algebraic(value),
    }
}

struct Matcher<'a> {
    value: f64,
    tol: f64,
    limits: &'a IdentifierLimits,
}

impl Matcher<'_> {
    fn near(&self, candidate: f64) -> bool {
        (self.value - candidate).abs() < self.tol
    }

    fn near_abs(&self, candidate: f64) -> bool {
        (self.value.abs() - candidate).abs() < self.tol
    }

    fn negative(&self) -> bool {
        self.value < 0.0
    }

    fn zero(&self) -> Option<ClosedFormKind> {
        (self.value.abs() < self.tol).then_some(ClosedFormKind::Zero)
    }

    fn integer(&self) -> Option<ClosedFormKind> {
        let r = self.value.round();
        let max = self.limits.max_integer as f64;
        (r.abs() >= 1.0 && r.abs() <= max && self.near(r))
            .then_some(ClosedFormKind::Integer(r as i64))
    }

    fn fraction(&self) -> Option<ClosedFormKind> {
        let mag = self.value.abs();
        for q in 2..=self.limits.max_fraction_denominator {
            let p = (mag * q as f64).round() as i64;
            if p < 1 || p.gcd(&q) != 1 {
                continue;
            }
            if self.near_abs(p as f64 / q as f64) {
                let p = if self.negative() { -p } else { p };
                return Some(ClosedFormKind::Fraction { p, q });
            }
        }
        None
    }

    fn radical(&self) -> Option<ClosedFormKind> {
        (2..=self.limits.max_radicand)
            .filter(|&k| perfect_square_root(k).is_none())
            .find(|&k| self.near_abs((k as f64).sqrt()))
            .map(|k| ClosedFormKind::Radical {
                k,
                negative: self.negative(),
            })
    }

    fn radical_sum(&self) -> Option<ClosedFormKind> {
        let l = self.limits;
        for c in 1..=l.max_sum_denominator {
            for a in -l.max_sum_offset..=l.max_sum_offset {
                for b in 2..=l.max_sum_radicand {
                    if perfect_square_root(b).is_some() {
                        continue;
                    }
                    for sign in [Sign::Plus, Sign::Minus] {
                        let x = (a as f64 + sign.factor() * (b as f64).sqrt()) / c as f64;
                        if self.near(x) {
                            return Some(canonical_radical_sum(a, b, c, sign));
                        }
                    }
                }
            }
        }
        None
    }

    fn nested_radical(&self) -> Option<ClosedFormKind> {
        let l = self.limits;
        for a in 1..=l.max_nested_outer {
            for b in 2..=l.max_nested_radicand {
                if perfect_square_root(b).is_some() {
                    continue;
                }
                for sign in [Sign::Plus, Sign::Minus] {
                    let inner = a as f64 + sign.factor() * (b as f64).sqrt();
                    if inner <= 0.0 {
                        continue;
                    }
                    if self.near_abs(inner.sqrt()) {
                        return Some(ClosedFormKind::NestedRadical {
                            a,
                            b,
                            sign,
                            negative: self.negative(),
                        });
                    }
                }
            }
        }
        None
    }

    fn trig(&self, denominators: &[u32]) -> Option<ClosedFormKind> {
        for &m in denominators {
            for func in TrigFunc::ALL {
                for k in (1..m).filter(|k| k.gcd(&m) == 1) {
                    if self.near(func.eval(k as f64 * PI / m as f64)) {
                        return Some(ClosedFormKind::Trig {
                            func,
                            k,
                            m,
                            negative: false,
                        });
                    }
                }
                if func.needs_negation() {
                    for k in (1..m).filter(|k| k.gcd(&m) == 1) {
                        if self.near(-func.eval(k as f64 * PI / m as f64)) {
                            return Some(ClosedFormKind::Trig {
                                func,
                                k,
                                m,
                                negative: true,
                            });
                        }
                    }
                }
            }
            for k in (1..m).filter(|k| k.gcd(&m) == 1) {
                if self.near(1.0 + 2.0 * (k as f64 * PI / m as f64).cos()) {
                    return Some(ClosedFormKind::TrigSum {
                        k,
                        m,
                        negative: false,
                    });
                }
            }
        }
        None
    }

    fn named_constant(&self) -> Option<ClosedFormKind> {
        if let Some(c) = NamedConstant::ALL.into_iter().find(|c| self.near(c.value())) {
            return Some(ClosedFormKind::Constant(c));
        }
        for a in 1..=3i64 {
            for b in (2..=10u64).filter(|&b| perfect_square_root(b).is_none()) {
                for sign in [Sign::Plus, Sign::Minus] {
                    for a in [a, -a] {
                        if self.near(a as f64 + sign.factor() * (b as f64).sqrt()) {
                            return Some(ClosedFormKind::RadicalSum { a, b, c: 1, sign });
                        }
                    }
                }
            }
        }
        None
    }

    fn wide(&self, denominators: &[u32]) -> Option<ClosedFormKind> {
        if self.value.abs() <= 2.0 {
            return None;
        }
        let l = self.limits;
        for c in 1..=l.max_sum_denominator {
            for a in 1..=l.max_wide_outer {
                for b in 2..=l.max_sum_radicand {
                    if perfect_square_root(b).is_some() {
                        continue;
                    }
                    for sign in [Sign::Plus, Sign::Minus] {
                        let inner = (a as f64 + sign.factor() * (b as f64).sqrt()) / c as f64;
                        if inner > 0.0 && self.near_abs(inner.sqrt()) {
                            return Some(ClosedFormKind::NestedRadicalQuotient {
                                a,
                                b,
                                c,
                                sign,
                                negative: self.negative(),
                            });
                        }
                    }
                }
            }
        }
        for &m in denominators {
            for k in 1..=m {
                if self.near_abs(2.0 * (k as f64 * PI / m as f64).cosh()) {
                    return Some(ClosedFormKind::Hyperbolic {
                        k,
                        m,
                        negative: self.negative(),
                    });
                }
            }
        }
        None
    }
}

/// Golden-ratio instances of (a ± √b)/c become named constants.
fn canonical_radical_sum(a: i64, b: u64, c: u32, sign: Sign) -> ClosedFormKind {
    match (a, b, c, sign) {
        (1, 5, 2, Sign::Plus) => ClosedFormKind::Constant(NamedConstant::Phi),
        (-1, 5, 2, Sign::Minus) => ClosedFormKind::Constant(NamedConstant::NegPhi),
        (1, 5, 2, Sign::Minus) => ClosedFormKind::Constant(NamedConstant::Psi),
        (-1, 5, 2, Sign::Plus) => ClosedFormKind::Constant(NamedConstant::NegPsi),
        _ => ClosedFormKind::RadicalSum { a, b, c, sign },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(v: f64, n: usize) -> ClosedForm {
        identify(v, n, &Tolerances::default())
    }

    #[test]
    fn test_integers_and_zero() {
        assert_eq!(id(1e-12, 4).kind, ClosedFormKind::Zero);
        assert_eq!(id(2.0 + 1e-11, 4).kind, ClosedFormKind::Integer(2));
        assert_eq!(id(-1.0, 3).kind, ClosedFormKind::Integer(-1));
    }

    #[test]
    fn test_fraction() {
        assert_eq!(id(-1.5, 4).kind, ClosedFormKind::Fraction { p: -3, q: 2 });
        assert_eq!(id(5.0 / 12.0, 4).kind, ClosedFormKind::Fraction { p: 5, q: 12 });
    }

    #[test]
    fn test_radicals() {
        let cf = id(-(3f64.sqrt()), 6);
        assert_eq!(cf.kind, ClosedFormKind::Radical { k: 3, negative: true });
        assert_eq!(cf.to_string(), "-√3");
        assert_eq!(id(1.0 + 2f64.sqrt(), 4).to_string(), "1 + √2");
    }

    #[test]
    fn test_golden_ratio_canonical() {
        assert_eq!(id(PHI, 5).kind, ClosedFormKind::Constant(NamedConstant::Phi));
        assert_eq!(id(-PSI, 5).to_string(), "-ψ");
    }

    #[test]
    fn test_nested_radical() {
        let v = (2.0 + 2f64.sqrt()).sqrt();
        let cf = id(v, 8);
        assert!(cf.exact);
        assert!((cf.value() - v).abs() < 1e-12);
    }

    #[test]
    fn test_trig_heptagon() {
        let v = 2.0 * (2.0 * PI / 7.0).cos();
        let cf = id(v, 7);
        assert_eq!(
            cf.kind,
            ClosedFormKind::Trig {
                func: TrigFunc::TwoCos,
                k: 2,
                m: 7,
                negative: false
            }
        );
        assert_eq!(cf.to_string(), "2cos(2π/7)");
    }

    #[test]
    fn test_hyperbolic_beyond_two() {
        let v = 2.0 * (PI / 7.0).cosh();
        let cf = id(v, 7);
        assert!(cf.exact);
        assert!((cf.value() - v).abs() < 1e-8, "{cf} vs {v}");
    }

    #[test]
    fn test_algebraic_fallback() {
        let cf = id(std::f64::consts::E * 1.234_567, 3);
        assert!(!cf.exact);
        assert!(matches!(cf.kind, ClosedFormKind::Algebraic(_)));
    }

    #[test]
    fn test_named_constant_with_narrow_grid() {
        let limits = IdentifierLimits {
            max_sum_offset: 0,
            max_sum_radicand: 1,
            max_radicand: 1,
            max_nested_outer: 0,
            max_trig_denominator: 2,
            ..IdentifierLimits::default()
        };
        let cf = identify_closed_form(PHI, 0, 1e-9, &limits);
        assert_eq!(cf.kind, ClosedFormKind::Constant(NamedConstant::Phi));
    }

    #[test]
    fn test_denominators_prioritize_structure() {
        let d = graph_denominators(5, 60);
        assert_eq!(&d[..4], &[5, 6, 10, 4]);
        assert!(d.contains(&12));
        assert!(d.iter().all(|&m| m >= 2));
        let mut sorted = d.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), d.len());
    }

    #[test]
    fn test_two_cos_reduction() {
        assert_eq!(ClosedForm::two_cos(0, 4), ClosedForm::integer(2));
        assert_eq!(ClosedForm::two_cos(4, 4), ClosedForm::integer(-2));
        assert_eq!(ClosedForm::two_cos(2, 4), ClosedForm::zero());
        assert_eq!(ClosedForm::two_cos(6, 4), ClosedForm::zero());
        assert_eq!(ClosedForm::two_cos(2, 7).to_string(), "2cos(2π/7)");
        assert_eq!(ClosedForm::two_cos(12, 7).to_string(), "2cos(2π/7)");
        for (k, m) in [(1, 5), (3, 8), (5, 9), (2, 3)] {
            let expected = 2.0 * (k as f64 * PI / m as f64).cos();
            assert!((ClosedForm::two_cos(k, m).value() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_negation_preserves_value() {
        let forms = [
            ClosedForm::sqrt(7),
            ClosedForm::two_cos(1, 5),
            ClosedForm::two_cos(2, 7),
            ClosedForm::fraction(3, 4),
            ClosedForm::exact(ClosedFormKind::RadicalSum {
                a: 1,
                b: 2,
                c: 3,
                sign: Sign::Minus,
            }),
        ];
        for cf in forms {
            assert!((cf.negated().value() + cf.value()).abs() < 1e-12, "{cf}");
        }
    }

    #[test]
    fn test_sqrt_collapses_perfect_square() {
        assert_eq!(ClosedForm::sqrt(4), ClosedForm::integer(2));
        assert_eq!(ClosedForm::fraction(4, 2), ClosedForm::integer(2));
    }
}
