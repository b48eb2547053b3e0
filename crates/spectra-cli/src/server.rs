use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use spectra_core::{
    AnalyticDatabase, CancelFlag, Graph, GraphInfo, MatrixKind, ProductRule, UniverseMetrics,
    analyze, analyze_characteristic_polynomial, build_product,
};
use spectra_store::{Config, Store};
use tokio::sync::Mutex;

use crate::input::GraphInput;

#[derive(Clone)]
pub struct SpectraServer {
    state: Arc<Mutex<ServerState>>,
    tool_router: ToolRouter<Self>,
}

struct ServerState {
    db: AnalyticDatabase,
    store: Store,
    config: Config,
}

impl ServerState {
    /// Persist the cache, logging rather than failing the tool call.
    fn persist(&self) {
        if let Err(e) = self.store.save_database(&self.db) {
            tracing::error!("failed to persist analytic database: {e}");
        }
    }
}

impl SpectraServer {
    pub fn new(store: Store, config: Config) -> std::result::Result<Self, String> {
        let db = store
            .load_database(config.tolerances.clone())
            .map_err(|e| format!("failed to load database: {e}"))?;
        Ok(Self {
            state: Arc::new(Mutex::new(ServerState { db, store, config })),
            tool_router: Self::tool_router(),
        })
    }

    /// Lock the state on the blocking pool and run `work` there.
    async fn with_state<T, F>(&self, work: F) -> Result<T, McpError>
    where
        T: Send + 'static,
        F: FnOnce(&mut ServerState) -> Result<T, McpError> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        run_blocking(move || work(&mut state.blocking_lock())).await
    }
}

/// Factorization and enumeration are CPU-bound; keep them off the runtime threads.
async fn run_blocking<T, F>(work: F) -> Result<T, McpError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, McpError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| McpError::internal_error(format!("analysis task failed: {e}"), None))?
}

// --- Tool parameter types ---

#[derive(Clone, Copy, Debug, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
enum GraphKind {
    /// Adjacency matrix
    #[default]
    Adjacency,
    /// Skew-symmetric orientation matrix
    Orientation,
}

impl From<GraphKind> for MatrixKind {
    fn from(kind: GraphKind) -> Self {
        match kind {
            GraphKind::Adjacency => MatrixKind::Symmetric,
            GraphKind::Orientation => MatrixKind::Antisymmetric,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct GraphRequest {
    /// Square integer matrix as rows. Give either this or `n` with `edges`.
    matrix: Option<serde_json::Value>,
    /// Vertex count
    n: Option<usize>,
    /// Edges as [u, v] pairs; orientation arcs point from u to v
    #[serde(default)]
    edges: Vec<[usize; 2]>,
    /// "adjacency" (default) or "orientation"
    #[serde(default)]
    kind: GraphKind,
}

impl GraphRequest {
    fn pairs(&self) -> Vec<(usize, usize)> {
        self.edges.iter().map(|&[u, v]| (u, v)).collect()
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct EdgeList {
    n: usize,
    #[serde(default)]
    edges: Vec<[usize; 2]>,
}

impl EdgeList {
    fn graph(&self) -> Result<Graph, McpError> {
        let pairs: Vec<(usize, usize)> = self.edges.iter().map(|&[u, v]| (u, v)).collect();
        Graph::new(self.n, &pairs).map_err(|e| McpError::invalid_params(e.to_string(), None))
    }
}

#[derive(Clone, Copy, Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
enum RuleArg {
    Cartesian,
    Tensor,
}

impl From<RuleArg> for ProductRule {
    fn from(rule: RuleArg) -> Self {
        match rule {
            RuleArg::Cartesian => ProductRule::Cartesian,
            RuleArg::Tensor => ProductRule::Tensor,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ProductRequest {
    /// "cartesian" (G□H) or "tensor" (G⊗H)
    rule: RuleArg,
    left: EdgeList,
    right: EdgeList,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SeedRequest {
    /// Largest family vertex count; defaults to the configured value
    max_n: Option<usize>,
    /// Largest product vertex count; defaults to the configured value
    products: Option<usize>,
}

fn json_result(value: &serde_json::Value) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_default(),
    )]))
}

fn invalid(e: impl std::fmt::Display) -> McpError {
    McpError::invalid_params(e.to_string(), None)
}

#[tool_router]
impl SpectraServer {
    #[tool(
        description = "Analyze a graph or integer matrix. Returns eigenvalues with closed forms where they exist, the cache source that answered, spectral invariants (radius, gap, energy, algebraic connectivity, Cheeger bounds) and the visualization position."
    )]
    async fn spectra_analyze(
        &self,
        Parameters(req): Parameters<GraphRequest>,
    ) -> Result<CallToolResult, McpError> {
        let pairs = req.pairs();
        let input = GraphInput {
            matrix: req.matrix.as_ref(),
            n: req.n,
            edges: Some(&pairs),
        };
        let matrix = input.to_matrix(req.kind.into()).map_err(invalid)?;
        let graph = input.to_graph().map_err(invalid)?;

        self.with_state(move |state| {
            let before = state.db.stats();
            let analysis = state
                .db
                .analyze_matrix(&matrix, &CancelFlag::new())
                .map_err(invalid)?;
            if state.db.stats() != before {
                state.persist();
            }

            let tol = &state.config.tolerances;
            let info = GraphInfo::of(&graph);
            let info = (matrix.kind() == MatrixKind::Symmetric).then_some(&info);
            let metrics = analyze(&analysis.eigenvalues, matrix.n(), info, tol);
            let universe = UniverseMetrics::from_spectrum(matrix.n(), &analysis.eigenvalues, tol);
            let labels: Vec<String> = analysis.eigenvalues.iter().map(|e| e.label()).collect();

            json_result(&serde_json::json!({
                "analysis": analysis,
                "labels": labels,
                "metrics": metrics,
                "universe": universe,
            }))
        })
        .await
    }

    #[tool(
        description = "Exact characteristic polynomial of a graph or integer matrix with its factorization into closed-form eigenvalues. Bypasses the cache."
    )]
    async fn spectra_polynomial(
        &self,
        Parameters(req): Parameters<GraphRequest>,
    ) -> Result<CallToolResult, McpError> {
        let pairs = req.pairs();
        let input = GraphInput {
            matrix: req.matrix.as_ref(),
            n: req.n,
            edges: Some(&pairs),
        };
        let matrix = input.to_matrix(req.kind.into()).map_err(invalid)?;
        let tol = self.state.lock().await.config.tolerances.clone();

        let kind = matrix.kind();
        let analysis = run_blocking(move || {
            analyze_characteristic_polynomial(&matrix, &tol, &CancelFlag::new()).map_err(invalid)
        })
        .await?;
        let f = &analysis.factorization;
        json_result(&serde_json::json!({
            "kind": kind,
            "polynomial": analysis.polynomial.to_string(),
            "coefficients": analysis.polynomial,
            "precisionLoss": analysis.precision_loss,
            "strategy": f.strategy,
            "factors": f.factors.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "eigenvalues": f.eigenvalues,
            "labels": f.eigenvalues.iter().map(|e| e.label()).collect::<Vec<_>>(),
            "exactCount": f.exact_count,
            "allExact": f.all_exact(),
        }))
    }

    #[tool(
        description = "Cartesian or tensor product of two graphs given as edge lists. The product spectrum is composed from the factor spectra, each resolved through the cache."
    )]
    async fn spectra_product(
        &self,
        Parameters(req): Parameters<ProductRequest>,
    ) -> Result<CallToolResult, McpError> {
        let left = req.left.graph()?;
        let right = req.right.graph()?;
        let cancel = CancelFlag::new();

        let rule: ProductRule = req.rule.into();

        self.with_state(move |state| {
            let before = state.db.stats();
            let left_analysis = state
                .db
                .analyze_graph(&left, MatrixKind::Symmetric, &cancel)
                .map_err(invalid)?;
            let right_analysis = state
                .db
                .analyze_graph(&right, MatrixKind::Symmetric, &cancel)
                .map_err(invalid)?;
            if state.db.stats() != before {
                state.persist();
            }

            let product = build_product(
                rule,
                (&left, left_analysis.eigenvalues.as_slice()),
                (&right, right_analysis.eigenvalues.as_slice()),
                &state.config.tolerances,
            );
            let labels: Vec<String> = product.eigenvalues.iter().map(|e| e.label()).collect();
            json_result(&serde_json::json!({
                "rule": product.rule,
                "n": product.graph.n(),
                "edges": product.graph.edges(),
                "eigenvalues": product.eigenvalues,
                "labels": labels,
                "leftSource": left_analysis.source,
                "rightSource": right_analysis.source,
            }))
        })
        .await
    }

    #[tool(
        description = "Seed the cache with empty, complete, path, cycle and star spectra and precompute Cartesian and tensor products of cached graphs."
    )]
    async fn spectra_seed(
        &self,
        Parameters(req): Parameters<SeedRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.with_state(move |state| {
            let max_n = req.max_n.unwrap_or(state.config.seed.max_n);
            let max_products = req.products.unwrap_or(state.config.products.max_n);

            let families = state.db.seed_known_families(max_n);
            let products = state.db.precompute_products(max_products);
            state.persist();
            tracing::info!(families, products, "seeded analytic database");

            json_result(&serde_json::json!({
                "families": families,
                "products": products,
                "stats": state.db.stats(),
            }))
        })
        .await
    }

    #[tool(description = "Delete every cached entry, in memory and on disk.")]
    async fn spectra_reset(&self) -> Result<CallToolResult, McpError> {
        let mut state = self.state.lock().await;
        state.db.clear();
        state
            .store
            .reset()
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        tracing::info!("analytic database reset");
        json_result(&serde_json::json!({ "stats": state.db.stats() }))
    }

    #[tool(description = "Cache statistics per vertex count: analytic graphs, known non-analytic polynomials, cached polynomials and products.")]
    async fn spectra_stats(&self) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;
        let stats = serde_json::to_value(state.db.stats())
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        json_result(&stats)
    }
}

#[tool_handler]
impl ServerHandler for SpectraServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Exact spectral analysis of small graphs and integer matrices.\n\n\
                 - spectra_analyze: eigenvalues with closed forms, invariants and cache source.\n\
                 - spectra_polynomial: exact characteristic polynomial and factors.\n\
                 - spectra_product: spectra of Cartesian and tensor products.\n\
                 - spectra_seed: fill the cache with family spectra and products.\n\
                 - spectra_stats: cache contents per vertex count.\n\
                 - spectra_reset: drop every cached entry.\n\n\
                 Graphs are given as n plus [u, v] edge pairs, or as a full matrix. \
                 Use kind \"orientation\" for the skew-symmetric matrix with arcs u → v."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_server() -> SpectraServer {
        let store = Store::open_in_memory().unwrap();
        SpectraServer::new(store, Config::default()).unwrap()
    }

    fn text_from_result(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|c| match &c.raw {
                RawContent::Text(t) => Some(t.text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    fn parse_result(result: &CallToolResult) -> serde_json::Value {
        let text = text_from_result(result);
        serde_json::from_str(&text).expect("handler should return valid JSON")
    }

    fn c4_request(kind: GraphKind) -> GraphRequest {
        GraphRequest {
            matrix: None,
            n: Some(4),
            edges: vec![[0, 1], [1, 2], [2, 3], [3, 0]],
            kind,
        }
    }

    #[tokio::test]
    async fn test_stats_empty() {
        let server = make_server();
        let json = parse_result(&server.spectra_stats().await.unwrap());
        assert_eq!(json["analytic"], 0);
        assert_eq!(json["products"], 0);
    }

    #[tokio::test]
    async fn test_analyze_cycle() {
        let server = make_server();
        let result = server
            .spectra_analyze(Parameters(c4_request(GraphKind::Adjacency)))
            .await
            .unwrap();
        let json = parse_result(&result);
        assert_eq!(json["labels"], serde_json::json!(["2", "0", "-2"]));
        assert_eq!(json["analysis"]["analytic"], true);
        assert_eq!(json["metrics"]["spectral_radius"], 2.0);
        assert_eq!(json["universe"]["position"], serde_json::json!([32.0, 30.0, -32.0]));
    }

    #[tokio::test]
    async fn test_analyze_orientation() {
        let server = make_server();
        let result = server
            .spectra_analyze(Parameters(c4_request(GraphKind::Orientation)))
            .await
            .unwrap();
        let json = parse_result(&result);
        assert_eq!(json["analysis"]["kind"], "antisymmetric");
        assert_eq!(json["labels"], serde_json::json!(["2i", "0", "-2i"]));
    }

    #[tokio::test]
    async fn test_second_analysis_hits_cache() {
        let server = make_server();
        server
            .spectra_analyze(Parameters(c4_request(GraphKind::Adjacency)))
            .await
            .unwrap();
        let again = parse_result(
            &server
                .spectra_analyze(Parameters(c4_request(GraphKind::Adjacency)))
                .await
                .unwrap(),
        );
        assert_ne!(again["analysis"]["source"], "computed");
    }

    #[tokio::test]
    async fn test_polynomial_matrix() {
        let server = make_server();
        let result = server
            .spectra_polynomial(Parameters(GraphRequest {
                matrix: Some(serde_json::json!([[0, 1, 1], [1, 0, 1], [1, 1, 0]])),
                n: None,
                edges: Vec::new(),
                kind: GraphKind::Adjacency,
            }))
            .await
            .unwrap();
        let json = parse_result(&result);
        assert_eq!(json["polynomial"], "λ^3 - 3λ - 2");
        assert_eq!(json["allExact"], true);
        assert_eq!(json["labels"], serde_json::json!(["2", "-1"]));
    }

    #[tokio::test]
    async fn test_invalid_input_is_error() {
        let server = make_server();
        let err = server
            .spectra_analyze(Parameters(GraphRequest {
                matrix: None,
                n: Some(2),
                edges: vec![[0, 5]],
                kind: GraphKind::Adjacency,
            }))
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_product_k2_squared() {
        let server = make_server();
        let k2 = || EdgeList {
            n: 2,
            edges: vec![[0, 1]],
        };
        let result = server
            .spectra_product(Parameters(ProductRequest {
                rule: RuleArg::Cartesian,
                left: k2(),
                right: k2(),
            }))
            .await
            .unwrap();
        let json = parse_result(&result);
        assert_eq!(json["n"], 4);
        assert_eq!(json["edges"].as_array().unwrap().len(), 4);
        assert_eq!(json["labels"], serde_json::json!(["2", "0", "-2"]));
    }

    #[tokio::test]
    async fn test_seed_then_stats() {
        let server = make_server();
        let seeded = parse_result(
            &server
                .spectra_seed(Parameters(SeedRequest {
                    max_n: Some(4),
                    products: Some(4),
                }))
                .await
                .unwrap(),
        );
        assert!(seeded["families"].as_u64().unwrap() > 0);

        let stats = parse_result(&server.spectra_stats().await.unwrap());
        assert_eq!(stats["analytic"], seeded["stats"]["analytic"]);

        // persisted to the store as well
        let state = server.state.lock().await;
        assert_eq!(state.store.stats().unwrap().analytic, state.db.stats().analytic);
    }

    #[tokio::test]
    async fn test_reset_clears_memory_and_store() {
        let server = make_server();
        server
            .spectra_seed(Parameters(SeedRequest {
                max_n: Some(4),
                products: Some(4),
            }))
            .await
            .unwrap();
        let json = parse_result(&server.spectra_reset().await.unwrap());
        assert_eq!(json["stats"]["analytic"], 0);

        let state = server.state.lock().await;
        assert!(state.db.is_empty());
        assert_eq!(state.store.stats().unwrap().analytic, 0);
    }

    #[tokio::test]
    async fn test_concurrent_analyses_share_the_cache() {
        let server = make_server();
        let paw = || GraphRequest {
            matrix: None,
            n: Some(4),
            edges: vec![[0, 1], [1, 2], [0, 2], [2, 3]],
            kind: GraphKind::Adjacency,
        };
        let (a, b) = tokio::join!(
            server.spectra_analyze(Parameters(paw())),
            server.spectra_analyze(Parameters(paw())),
        );
        let sources = [parse_result(&a.unwrap()), parse_result(&b.unwrap())]
            .map(|json| json["analysis"]["source"].clone());
        assert_eq!(sources.iter().filter(|s| *s == "computed").count(), 1);
    }

    #[test]
    fn test_server_info() {
        let server = make_server();
        let info = server.get_info();
        assert!(info.instructions.is_some());
        assert!(info.capabilities.tools.is_some());
    }
}
