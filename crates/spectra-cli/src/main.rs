mod input;
mod server;
mod worker;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rmcp::{ServiceExt, transport::stdio};
use spectra_core::{
    CancelFlag, Eigenvalue, GraphInfo, ImportOutcome, MatrixKind,
    UniverseMetrics, analyze, analyze_characteristic_polynomial, find_analytic_graphs,
};
use spectra_store::{Config, Store, default_data_dir};

use crate::input::{GraphInput, parse_edges};

#[derive(Parser)]
#[command(name = "spectra", about = "Analytic graph spectra CLI, worker and MCP server")]
struct Cli {
    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum KindArg {
    /// Adjacency matrix
    #[default]
    Adjacency,
    /// Skew-symmetric orientation matrix
    Orientation,
}

impl From<KindArg> for MatrixKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Adjacency => MatrixKind::Symmetric,
            KindArg::Orientation => MatrixKind::Antisymmetric,
        }
    }
}

#[derive(Args)]
struct GraphArgs {
    /// Matrix as JSON rows, e.g. '[[0,1],[1,0]]'
    #[arg(long, conflicts_with = "n")]
    matrix: Option<String>,

    /// Vertex count, used with --edges
    #[arg(long)]
    n: Option<usize>,

    /// Edge list such as "0-1,1-2"; orientation arcs point as written
    #[arg(long, requires = "n")]
    edges: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    kind: KindArg,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio transport
    Serve,

    /// Run the line-delimited JSON worker on stdin/stdout
    Worker,

    /// Analyze a graph or matrix through the analytic database
    Analyze {
        #[command(flatten)]
        graph: GraphArgs,

        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Exact characteristic polynomial and its factorization
    Polynomial {
        #[command(flatten)]
        graph: GraphArgs,
    },

    /// Seed family spectra and precompute products
    Seed {
        /// Largest family vertex count (default from config)
        #[arg(long)]
        max_n: Option<usize>,

        /// Largest product vertex count (default from config)
        #[arg(long)]
        products: Option<usize>,
    },

    /// List every graph class on n vertices with a fully analytic spectrum
    Find {
        /// Vertex count (at most 7)
        n: usize,

        #[arg(long, value_enum, default_value_t)]
        kind: KindArg,

        /// Print the classes as JSON
        #[arg(long)]
        json: bool,

        /// Also write the classes as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show cache statistics
    Stats,

    /// Export the cache to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Import the cache from a JSON file
    Import {
        /// Input file path
        path: PathBuf,
    },

    /// Delete every cached entry
    Reset,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

/// Data directory, its configuration and the opened store.
struct Workspace {
    config: Config,
    store: Store,
}

fn open_workspace() -> Result<Workspace> {
    let dir = default_data_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let config = Config::load(&dir).context("failed to load config")?;
    let store = Store::open(&Config::db_path(&dir)).context("failed to open store")?;
    tracing::debug!(dir = %dir.display(), "opened data directory");
    Ok(Workspace { config, store })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Serve => cmd_serve().await,
        Commands::Worker => cmd_worker().await,
        Commands::Analyze { graph, json } => cmd_analyze(graph, *json),
        Commands::Polynomial { graph } => cmd_polynomial(graph),
        Commands::Seed { max_n, products } => cmd_seed(*max_n, *products),
        Commands::Find {
            n,
            kind,
            json,
            output,
        } => cmd_find(*n, *kind, *json, output.as_deref()),
        Commands::Stats => cmd_stats(),
        Commands::Export { path } => cmd_export(path),
        Commands::Import { path } => cmd_import(path),
        Commands::Reset => cmd_reset(),
    }
}

async fn cmd_serve() -> Result<()> {
    let ws = open_workspace()?;
    tracing::info!("starting MCP server");

    let server = server::SpectraServer::new(ws.store, ws.config)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server")?;
    service.waiting().await?;
    Ok(())
}

async fn cmd_worker() -> Result<()> {
    let dir = default_data_dir();
    let config = Config::load(&dir).context("failed to load config")?;
    worker::run(config.tolerances).await
}

fn format_eigenvalues(eigenvalues: &[Eigenvalue]) -> String {
    eigenvalues
        .iter()
        .map(|e| {
            if e.multiplicity > 1 {
                format!("{} (×{})", e.label(), e.multiplicity)
            } else {
                e.label()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

struct ParsedGraph {
    matrix: Option<serde_json::Value>,
    n: Option<usize>,
    edges: Vec<(usize, usize)>,
}

impl ParsedGraph {
    fn parse(args: &GraphArgs) -> Result<Self> {
        let matrix: Option<serde_json::Value> = args
            .matrix
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .context("--matrix is not valid JSON")?;
        let edges = args.edges.as_deref().map(parse_edges).transpose()?;
        Ok(Self {
            matrix,
            n: args.n,
            edges: edges.unwrap_or_default(),
        })
    }

    fn input(&self) -> GraphInput<'_> {
        GraphInput {
            matrix: self.matrix.as_ref(),
            n: self.n,
            edges: Some(&self.edges),
        }
    }
}

fn cmd_analyze(args: &GraphArgs, json: bool) -> Result<()> {
    let ws = open_workspace()?;
    let tol = ws.config.tolerances.clone();
    let mut db = ws
        .store
        .load_database(tol.clone())
        .context("failed to load database")?;

    let parsed = ParsedGraph::parse(args)?;
    let input = parsed.input();
    let kind = MatrixKind::from(args.kind);
    let matrix = input.to_matrix(kind)?;
    let graph = input.to_graph()?;

    let before = db.stats();
    let analysis = db
        .analyze_matrix(&matrix, &CancelFlag::new())
        .context("analysis failed")?;
    tracing::info!(source = ?analysis.source, hash = %analysis.canonical_hash, "analyzed");
    if db.stats() != before {
        ws.store.save_database(&db).context("failed to save database")?;
    }

    let info = GraphInfo::of(&graph);
    let info = (matrix.kind() == MatrixKind::Symmetric).then_some(&info);
    let metrics = analyze(&analysis.eigenvalues, matrix.n(), info, &tol);
    let universe = UniverseMetrics::from_spectrum(matrix.n(), &analysis.eigenvalues, &tol);

    if json {
        let out = serde_json::json!({
            "analysis": analysis,
            "metrics": metrics,
            "universe": universe,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("kind:        {}", analysis.kind.label());
    println!("source:      {:?}", analysis.source);
    println!("hash:        {}", analysis.canonical_hash);
    if let Some(family) = analysis.family {
        println!("family:      {family}");
    }
    if let Some(poly) = &analysis.polynomial {
        println!("polynomial:  {poly}");
    }
    println!("eigenvalues: {}", format_eigenvalues(&analysis.eigenvalues));
    println!(
        "analytic:    {} ({}/{} exact)",
        if analysis.analytic { "yes" } else { "no" },
        analysis.exact_count,
        matrix.n()
    );
    println!("radius:      {:.6}", metrics.spectral_radius);
    println!("gap:         {:.6}", metrics.gap);
    println!("energy:      {:.6}", metrics.energy);
    if let Some(a) = metrics.algebraic_connectivity {
        println!("a(G):        {a:.6}");
    }
    Ok(())
}

fn cmd_polynomial(args: &GraphArgs) -> Result<()> {
    let dir = default_data_dir();
    let config = Config::load(&dir).context("failed to load config")?;
    let parsed = ParsedGraph::parse(args)?;
    let matrix = parsed.input().to_matrix(args.kind.into())?;

    let analysis =
        analyze_characteristic_polynomial(&matrix, &config.tolerances, &CancelFlag::new())
            .context("factorization failed")?;
    let f = &analysis.factorization;

    println!("polynomial:  {}", analysis.polynomial);
    println!("strategy:    {:?}", f.strategy);
    let factors: Vec<String> = f.factors.iter().map(ToString::to_string).collect();
    println!("factors:     {}", factors.join(" · "));
    println!("eigenvalues: {}", format_eigenvalues(&f.eigenvalues));
    println!("exact:       {}/{}", f.exact_count, f.degree);
    if analysis.precision_loss {
        println!("warning:     coefficients exceed 2^53, numeric roots are approximate");
    }
    Ok(())
}

fn cmd_seed(max_n: Option<usize>, products: Option<usize>) -> Result<()> {
    let ws = open_workspace()?;
    let max_n = max_n.unwrap_or(ws.config.seed.max_n);
    let max_products = products.unwrap_or(ws.config.products.max_n);

    let mut db = ws
        .store
        .load_database(ws.config.tolerances.clone())
        .context("failed to load database")?;
    let families = db.seed_known_families(max_n);
    let products = db.precompute_products(max_products);
    ws.store.save_database(&db).context("failed to save database")?;

    println!("seeded {families} family graphs (n ≤ {max_n}), {products} products (n ≤ {max_products})");
    Ok(())
}

fn cmd_find(n: usize, kind: KindArg, json: bool, output: Option<&Path>) -> Result<()> {
    let dir = default_data_dir();
    let config = Config::load(&dir).context("failed to load config")?;
    let classes = find_analytic_graphs(n, kind.into(), &config.tolerances, &CancelFlag::new())
        .context("search failed")?;

    let report = || {
        let classes: Vec<serde_json::Value> = classes
            .iter()
            .map(|class| {
                serde_json::json!({
                    "edges": class.edges,
                    "edge_count": class.edges.len(),
                    "polynomial": class.polynomial,
                    "eigenvalues": class.eigenvalues,
                    "labels": class.eigenvalues.iter().map(Eigenvalue::label).collect::<Vec<_>>(),
                    "family": class.family,
                    "class_size": class.class_size,
                })
            })
            .collect();
        serde_json::to_string_pretty(&classes)
    };
    if let Some(path) = output {
        std::fs::write(path, report()?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), classes = classes.len(), "saved search results");
    }
    if json {
        println!("{}", report()?);
        return Ok(());
    }

    for class in &classes {
        let family = class
            .family
            .map(|f| format!(" {f}"))
            .unwrap_or_default();
        println!(
            "{}  [{}]  edges={} graphs={}{family}",
            class.polynomial,
            format_eigenvalues(&class.eigenvalues),
            class.edges.len(),
            class.class_size,
        );
    }
    println!("{} analytic classes on {n} vertices", classes.len());
    if let Some(path) = output {
        println!("saved to {}", path.display());
    }
    Ok(())
}

fn cmd_stats() -> Result<()> {
    let ws = open_workspace()?;
    let stats = ws.store.stats().context("failed to read stats")?;

    println!("analytic:     {}", stats.analytic);
    println!("non_analytic: {}", stats.non_analytic);
    println!("polynomials:  {}", stats.polynomials);
    println!("products:     {}", stats.products);
    for level in &stats.levels {
        println!(
            "  n={:<3} analytic={} non_analytic={} polynomials={} products={}",
            level.n, level.analytic, level.non_analytic, level.polynomials, level.products
        );
    }
    Ok(())
}

fn cmd_export(path: &Path) -> Result<()> {
    let ws = open_workspace()?;
    ws.store
        .export_json_file(path, ws.config.tolerances.clone())
        .context("failed to export JSON")?;
    println!("exported to {}", path.display());
    Ok(())
}

fn cmd_import(path: &Path) -> Result<()> {
    let ws = open_workspace()?;
    let outcome = ws
        .store
        .import_json_file(path, ws.config.tolerances.clone())
        .context("failed to import JSON")?;
    let stats = ws.store.stats().context("failed to read stats")?;

    match outcome {
        ImportOutcome::Loaded => println!(
            "imported from {}. analytic={}, products={}",
            path.display(),
            stats.analytic,
            stats.products
        ),
        ImportOutcome::VersionMismatch { found } => {
            println!("snapshot version {found} is not supported, cache reset")
        }
    }
    Ok(())
}

fn cmd_reset() -> Result<()> {
    let ws = open_workspace()?;
    ws.store.reset().context("failed to reset store")?;
    println!("cache reset");
    Ok(())
}
