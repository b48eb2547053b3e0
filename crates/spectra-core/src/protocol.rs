//! Request/response messages of the line-delimited JSON worker.
//!
//! `{type, id, matrix, options}` in, `{id, success, result | error}` out.
//! The id is echoed verbatim so callers may use numbers or strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cancel::CancelFlag;
use crate::charpoly::exact_polynomial;
use crate::constants::{DEFAULT_POWER_ITERATIONS, Tolerances};
use crate::eigen::{
    SymmetricSpectrum, skew_symmetric_eigenvalues, spectral_radius_fast, symmetric_eigenvalues,
    symmetric_eigenvalues_jacobi,
};
use crate::error::{Result, SpectraError};
use crate::factor::analyze_polynomial;
use crate::matrix::{Matrix, MatrixKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestType {
    EigenvaluesSymmetric,
    EigenvaluesSkew,
    EigenvaluesBoth,
    SpectralRadiusOnly,
    CharacteristicPolynomial,
    /// Sets the cancel flag of the in-flight request with the same id.
    Cancel,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverMethod {
    #[default]
    Qr,
    Jacobi,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestOptions {
    pub method: SolverMethod,
    /// Power-iteration budget for `spectral-radius-only`.
    pub max_iter: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkerRequest {
    #[serde(rename = "type")]
    pub kind: RequestType,
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub matrix: Option<Value>,
    #[serde(default)]
    pub options: RequestOptions,
}

impl WorkerRequest {
    /// Parse one line. A line that is JSON but not a valid request still
    /// yields an error response carrying its id.
    pub fn parse(line: &str) -> std::result::Result<WorkerRequest, WorkerResponse> {
        let value: Value = serde_json::from_str(line)
            .map_err(|e| WorkerResponse::failure(Value::Null, format!("invalid JSON: {e}")))?;
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        serde_json::from_value(value)
            .map_err(|e| WorkerResponse::failure(id, format!("invalid request: {e}")))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub id: Value,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerResponse {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Run one computation request. `cancel` requests are answered by the
/// worker loop and rejected here.
pub fn handle_request(req: &WorkerRequest, tol: &Tolerances, cancel: &CancelFlag) -> WorkerResponse {
    if req.kind == RequestType::Cancel {
        return WorkerResponse::failure(req.id.clone(), "cancel needs a running worker");
    }
    match dispatch(req, tol, cancel) {
        Ok(result) => WorkerResponse::ok(req.id.clone(), result),
        Err(e) => WorkerResponse::failure(req.id.clone(), e.to_string()),
    }
}

fn dispatch(req: &WorkerRequest, tol: &Tolerances, cancel: &CancelFlag) -> Result<Value> {
    let raw = req.matrix.as_ref().ok_or(SpectraError::NotTwoDimensional)?;
    let matrix = Matrix::from_json(raw)?;
    cancel.check()?;

    match req.kind {
        RequestType::EigenvaluesSymmetric => {
            if matrix.kind() != MatrixKind::Symmetric {
                return Err(SpectraError::WrongKind {
                    expected: "symmetric",
                });
            }
            Ok(symmetric_json(&solve_symmetric(&matrix, req.options.method, tol), req.options.method))
        }
        RequestType::EigenvaluesSkew => {
            if matrix.kind() != MatrixKind::Antisymmetric && !matrix.is_zero() {
                return Err(SpectraError::WrongKind {
                    expected: "skew-symmetric",
                });
            }
            Ok(skew_json(&matrix, tol))
        }
        RequestType::EigenvaluesBoth => {
            let adjacency = matrix.underlying_adjacency();
            let orientation = matrix.underlying_orientation();
            let method = req.options.method;
            Ok(serde_json::json!({
                "symmetric": symmetric_json(&solve_symmetric(&adjacency, method, tol), method),
                "skew": skew_json(&orientation, tol),
            }))
        }
        RequestType::SpectralRadiusOnly => {
            let max_iter = req.options.max_iter.unwrap_or(DEFAULT_POWER_ITERATIONS);
            let estimate = spectral_radius_fast(&matrix.to_real(), matrix.kind(), max_iter, tol);
            Ok(serde_json::json!({
                "spectralRadius": estimate.value,
                "converged": estimate.converged,
                "iterations": estimate.iterations,
            }))
        }
        RequestType::CharacteristicPolynomial => {
            let poly = exact_polynomial(&matrix)?;
            let floats = poly.to_f64();
            let analysis = analyze_polynomial(&poly, matrix.n(), matrix.kind(), tol, cancel)?;
            let f = &analysis.factorization;
            Ok(serde_json::json!({
                "kind": matrix.kind(),
                "coefficients": poly,
                "floatCoefficients": floats.values,
                "precisionLoss": floats.precision_loss,
                "text": poly.to_string(),
                "strategy": f.strategy,
                "factors": f.factors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "eigenvalues": f.eigenvalues,
                "labels": f.eigenvalues.iter().map(|e| e.label()).collect::<Vec<_>>(),
                "exactCount": f.exact_count,
                "allExact": f.all_exact(),
            }))
        }
        RequestType::Cancel => Err(SpectraError::Cancelled),
    }
}

fn solve_symmetric(matrix: &Matrix, method: SolverMethod, tol: &Tolerances) -> SymmetricSpectrum {
    let real = matrix.to_real();
    match method {
        SolverMethod::Qr => symmetric_eigenvalues(&real, tol),
        SolverMethod::Jacobi => symmetric_eigenvalues_jacobi(&real, tol),
    }
}

fn symmetric_json(spectrum: &SymmetricSpectrum, method: SolverMethod) -> Value {
    serde_json::json!({
        "eigenvalues": spectrum.values,
        "converged": spectrum.converged,
        "iterations": spectrum.iterations,
        "method": method,
    })
}

fn skew_json(matrix: &Matrix, tol: &Tolerances) -> Value {
    let spectrum = skew_symmetric_eigenvalues(&matrix.to_real(), tol);
    serde_json::json!({
        "eigenvalues": spectrum.values,
        "converged": spectrum.converged,
        "iterations": spectrum.iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(line: &str) -> WorkerResponse {
        let req = WorkerRequest::parse(line).unwrap();
        handle_request(&req, &Tolerances::default(), &CancelFlag::new())
    }

    const C4: &str = "[[0,1,0,1],[1,0,1,0],[0,1,0,1],[1,0,1,0]]";

    #[test]
    fn test_symmetric_request() {
        let resp = run(&format!(
            r#"{{"type":"eigenvalues-symmetric","id":7,"matrix":{C4}}}"#
        ));
        assert!(resp.success, "{:?}", resp.error);
        assert_eq!(resp.id, serde_json::json!(7));
        let result = resp.result.unwrap();
        let values: Vec<f64> = serde_json::from_value(result["eigenvalues"].clone()).unwrap();
        let expected = [2.0, 0.0, 0.0, -2.0];
        for (v, e) in values.iter().zip(expected) {
            assert!((v - e).abs() < 1e-9);
        }
        assert_eq!(result["method"], "qr");
    }

    #[test]
    fn test_jacobi_option() {
        let resp = run(&format!(
            r#"{{"type":"eigenvalues-symmetric","id":"a","matrix":{C4},"options":{{"method":"jacobi"}}}}"#
        ));
        assert!(resp.success);
        assert_eq!(resp.result.unwrap()["method"], "jacobi");
    }

    #[test]
    fn test_skew_rejects_adjacency() {
        let resp = run(&format!(r#"{{"type":"eigenvalues-skew","id":1,"matrix":{C4}}}"#));
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("expected a skew-symmetric matrix"));
    }

    #[test]
    fn test_both_uses_underlying_graph() {
        let resp = run(&format!(r#"{{"type":"eigenvalues-both","id":2,"matrix":{C4}}}"#));
        let result = resp.result.unwrap();
        assert_eq!(result["symmetric"]["eigenvalues"].as_array().unwrap().len(), 4);
        assert_eq!(result["skew"]["eigenvalues"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_spectral_radius_only() {
        let resp = run(&format!(
            r#"{{"type":"spectral-radius-only","id":3,"matrix":{C4},"options":{{"maxIter":500}}}}"#
        ));
        let result = resp.result.unwrap();
        assert!((result["spectralRadius"].as_f64().unwrap() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_characteristic_polynomial() {
        let resp = run(&format!(
            r#"{{"type":"characteristic-polynomial","id":4,"matrix":{C4}}}"#
        ));
        let result = resp.result.unwrap();
        assert_eq!(result["text"], "λ^4 - 4λ^2");
        assert_eq!(result["coefficients"], serde_json::json!(["1", "0", "-4", "0", "0"]));
        assert_eq!(result["allExact"], true);
        assert_eq!(result["precisionLoss"], false);
    }

    #[test]
    fn test_malformed_input() {
        let resp = run(r#"{"type":"eigenvalues-symmetric","id":5,"matrix":[[0,1],[1]]}"#);
        assert!(!resp.success);
        assert!(resp.error.unwrap().contains("not square"));

        let missing = run(r#"{"type":"eigenvalues-symmetric","id":6}"#);
        assert!(!missing.success);

        let bad = WorkerRequest::parse(r#"{"type":"bogus","id":9}"#).unwrap_err();
        assert_eq!(bad.id, serde_json::json!(9));
        assert!(!bad.success);
        assert!(WorkerRequest::parse("not json").is_err());
    }

    #[test]
    fn test_cancelled_before_start() {
        let req = WorkerRequest::parse(&format!(
            r#"{{"type":"characteristic-polynomial","id":8,"matrix":{C4}}}"#
        ))
        .unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let resp = handle_request(&req, &Tolerances::default(), &cancel);
        assert_eq!(resp.error.as_deref(), Some("computation cancelled"));
    }
}
