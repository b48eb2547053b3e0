//! Analytic graph spectra engine.
//!
//! Computes exact characteristic polynomials of adjacency and orientation
//! matrices over arbitrary-precision integers, factors them into closed-form
//! eigenvalues (rationals, radicals, nested radicals, trigonometric and
//! hyperbolic values), and memoizes results per vertex count in an explicit
//! analytic graph database with product and disjoint-union shortcuts.
//!
//! Zero I/O: no files, no logging, no transport. Persistence lives in
//! `spectra-store`.

pub mod cancel;
pub mod charpoly;
pub mod closed_form;
pub mod constants;
pub mod database;
pub mod eigen;
pub mod enumerate;
pub mod error;
pub mod factor;
pub mod family;
pub mod graph;
pub mod invariants;
pub mod matrix;
pub mod product;
pub mod protocol;
pub mod roots;
pub mod serde_compat;
pub mod spectrum;
pub mod universe;

pub use cancel::CancelFlag;
pub use charpoly::{FloatCoefficients, IntPolynomial, exact_polynomial};
pub use closed_form::{
    ClosedForm, ClosedFormKind, NamedConstant, Sign, TrigFunc, graph_denominators, identify,
    identify_closed_form,
};
pub use constants::{IdentifierLimits, PHI, PSI, Tolerances};
pub use database::{
    AnalysisSource, AnalyticDatabase, AnalyticEntry, DatabaseStats, GraphAnalysis, LevelStats,
    PolynomialEntry, ProductEntry, VertexLevel, canonical_hash, graph_hash, polynomial_hash,
    polynomial_key,
};
pub use eigen::{
    RadiusEstimate, SkewSpectrum, SymmetricSpectrum, skew_symmetric_eigenvalues,
    spectral_radius_fast, symmetric_eigenvalues, symmetric_eigenvalues_jacobi,
};
pub use enumerate::{AnalyticClass, enumerate_unique_graphs, find_analytic_graphs};
pub use error::{Result, SpectraError};
pub use factor::{
    Factor, Factorization, PolynomialAnalysis, Strategy, analyze_characteristic_polynomial,
    analyze_polynomial, factor, factor_with_mu_substitution,
};
pub use family::{Family, family_edges, identify_family};
pub use graph::{Graph, orientation_from_arcs};
pub use invariants::{
    CheegerBounds, ExpansionQuality, GraphInfo, MetricSource, SpectralMetrics, analyze,
    laplacian_connectivity,
};
pub use matrix::{Matrix, MatrixKind, RealMatrix};
pub use product::{
    ProductGraph, ProductRule, build_product, cartesian_product, compose_eigenvalues, product,
    tensor_product,
};
pub use protocol::{RequestOptions, RequestType, SolverMethod, WorkerRequest, WorkerResponse, handle_request};
pub use roots::{Roots, polynomial_roots};
pub use serde_compat::{CURRENT_VERSION, DatabaseSnapshot, ImportOutcome, export_json, import_json};
pub use spectrum::{Eigenvalue, Scalar, expand, group_eigenvalues, total_multiplicity};
pub use universe::UniverseMetrics;
