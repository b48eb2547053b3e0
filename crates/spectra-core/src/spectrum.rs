use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::closed_form::{ClosedForm, ClosedFormKind};

/// A real or complex eigenvalue.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Real(f64),
    Complex { re: f64, im: f64 },
}

impl Scalar {
    pub fn imaginary(im: f64) -> Self {
        if im == 0.0 {
            Scalar::Real(0.0)
        } else {
            Scalar::Complex { re: 0.0, im }
        }
    }

    pub fn re(self) -> f64 {
        match self {
            Scalar::Real(v) => v,
            Scalar::Complex { re, .. } => re,
        }
    }

    pub fn im(self) -> f64 {
        match self {
            Scalar::Real(_) => 0.0,
            Scalar::Complex { im, .. } => im,
        }
    }

    pub fn is_real(self) -> bool {
        self.im() == 0.0
    }

    pub fn magnitude(self) -> f64 {
        self.re().hypot(self.im())
    }

    fn distance(self, other: Scalar) -> f64 {
        (self.re() - other.re()).hypot(self.im() - other.im())
    }
}

/// Descending by real part, then by imaginary part.
pub fn descending(a: &Scalar, b: &Scalar) -> Ordering {
    b.re()
        .total_cmp(&a.re())
        .then_with(|| b.im().total_cmp(&a.im()))
}

/// An eigenvalue with multiplicity and optional closed form.
///
/// For a purely imaginary value the closed form describes |im|.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Eigenvalue {
    pub value: Scalar,
    pub multiplicity: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_form: Option<ClosedForm>,
}

impl Eigenvalue {
    pub fn new(value: Scalar, closed_form: Option<ClosedForm>) -> Self {
        Self {
            value,
            multiplicity: 1,
            closed_form,
        }
    }

    pub fn real(value: f64, closed_form: ClosedForm) -> Self {
        Self::new(Scalar::Real(value), Some(closed_form))
    }

    pub fn is_exact(&self) -> bool {
        self.closed_form.as_ref().is_some_and(|cf| cf.exact)
    }

    /// Whether the value is an integer or rational number.
    pub fn is_rational(&self) -> bool {
        self.is_exact()
            && self.value.is_real()
            && self.closed_form.as_ref().is_some_and(|cf| {
                matches!(
                    cf.kind,
                    ClosedFormKind::Zero | ClosedFormKind::Integer(_) | ClosedFormKind::Fraction { .. }
                )
            })
    }

    /// Human-readable form, e.g. `2`, `2cos(π/5)`, `-√2·i`.
    pub fn label(&self) -> String {
        let Some(cf) = &self.closed_form else {
            return format_scalar(self.value);
        };
        if self.value.is_real() {
            return cf.to_string();
        }
        if self.value.re().abs() > 0.0 {
            return format_scalar(self.value);
        }
        let sign = if self.value.im() < 0.0 { "-" } else { "" };
        match cf.kind {
            ClosedFormKind::Integer(1) => format!("{sign}i"),
            ClosedFormKind::Integer(_) => format!("{sign}{cf}i"),
            _ => format!("{sign}{cf}·i"),
        }
    }
}

fn format_scalar(value: Scalar) -> String {
    match value {
        Scalar::Real(v) => format!("{v:.10}"),
        Scalar::Complex { re, im } if re == 0.0 => format!("{im:.10}i"),
        Scalar::Complex { re, im } if im < 0.0 => format!("{re:.10} - {:.10}i", -im),
        Scalar::Complex { re, im } => format!("{re:.10} + {im:.10}i"),
    }
}

/// Sort descending and merge values closer than `tol` to a group's first
/// value into that group.
///
/// A merged group keeps the first closed form seen; exact forms win over
/// inexact ones.
pub fn group_eigenvalues(mut items: Vec<Eigenvalue>, tol: f64) -> Vec<Eigenvalue> {
    items.sort_by(|a, b| descending(&a.value, &b.value));
    let mut out: Vec<Eigenvalue> = Vec::with_capacity(items.len());
    for item in items {
        if let Some(last) = out.last_mut()
            && last.value.distance(item.value) < tol
        {
            last.multiplicity += item.multiplicity;
            if !last.is_exact() && item.is_exact() {
                last.closed_form = item.closed_form;
            }
            continue;
        }
        out.push(item);
    }
    out
}

/// Flatten multiplicity groups into one scalar per eigenvalue.
pub fn expand(eigenvalues: &[Eigenvalue]) -> Vec<Scalar> {
    eigenvalues
        .iter()
        .flat_map(|e| std::iter::repeat_n(e.value, e.multiplicity))
        .collect()
}

/// Total count with multiplicity.
pub fn total_multiplicity(eigenvalues: &[Eigenvalue]) -> usize {
    eigenvalues.iter().map(|e| e.multiplicity).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping_merges_close_values() {
        let items = vec![
            Eigenvalue::real(-1.0, ClosedForm::integer(-1)),
            Eigenvalue::real(2.0, ClosedForm::integer(2)),
            Eigenvalue::real(-1.0 + 1e-9, ClosedForm::integer(-1)),
        ];
        let grouped = group_eigenvalues(items, 1e-6);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].value, Scalar::Real(2.0));
        assert_eq!(grouped[1].multiplicity, 2);
        assert_eq!(total_multiplicity(&grouped), 3);
        assert_eq!(expand(&grouped).len(), 3);
    }

    #[test]
    fn test_grouping_does_not_chain() {
        let items = (0..3)
            .map(|i| {
                let v = 1.0 - 0.6e-6 * i as f64;
                Eigenvalue::real(v, ClosedForm::algebraic(v))
            })
            .collect();
        let grouped = group_eigenvalues(items, 1e-6);
        let multiplicities: Vec<usize> = grouped.iter().map(|e| e.multiplicity).collect();
        assert_eq!(multiplicities, vec![2, 1]);
        assert_eq!(grouped[0].value, Scalar::Real(1.0));
    }

    #[test]
    fn test_imaginary_label() {
        let e = Eigenvalue::new(Scalar::imaginary(-2.0), Some(ClosedForm::integer(2)));
        assert_eq!(e.label(), "-2i");
        let unit = Eigenvalue::new(Scalar::imaginary(1.0), Some(ClosedForm::integer(1)));
        assert_eq!(unit.label(), "i");
    }

    #[test]
    fn test_scalar_serde_untagged() {
        let json = serde_json::to_string(&Scalar::Complex { re: 0.0, im: 2.0 }).unwrap();
        assert_eq!(json, r#"{"re":0.0,"im":2.0}"#);
        let back: Scalar = serde_json::from_str("1.5").unwrap();
        assert_eq!(back, Scalar::Real(1.5));
    }
}
