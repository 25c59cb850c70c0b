//! Friend Crawler CLI
//!
//! Crawls a friend-of-a-friend graph from one or more profile ids, lays the
//! result out headlessly and prints a summary.
//!
//! # Usage
//!
//! ```bash
//! # Crawl from a seed profile
//! friend-crawler crawl https://alice.example/profile/card#me
//!
//! # Stop after 200 nodes, search the result, print JSON
//! friend-crawler --format json crawl --max-nodes 200 --search bob \
//!     https://alice.example/profile/card#me
//!
//! # Prune and lay out a dependency manifest
//! friend-crawler deps manifest.json
//! ```
//!
//! Logging is controlled by `RUST_LOG`; logs go to stderr so JSON output on
//! stdout stays clean.

mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use friend_graph::{
    CanonicalId, Crawler, DependencyGraph, DependencyRecord, GraphStore, HttpDocumentSource,
    IdentityNode, ProfileResolver, Resolver,
};
use friend_layout::{
    dependency_input, graph_input, DirectionalBias, ForceSimulation, Interaction, LayoutEngine,
    LayoutInput, Scene, Vec2, ViewportTransform,
};

use crate::config::{config_path, AppConfig};
use crate::output::{CrawlSummary, DepsSummary, LayoutSummary};

#[derive(Parser)]
#[command(name = "friend-crawler")]
#[command(version)]
#[command(about = "Crawl a friend graph from profile documents and lay it out")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// YAML config with `crawl`, `layout` and `viewport` sections
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,

    /// Canvas size used for screen coordinates, as WIDTHxHEIGHT
    #[arg(long, global = true, default_value = "1280x800", value_parser = parse_canvas)]
    canvas: (f32, f32),
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl from seed profile ids
    Crawl {
        /// Seed ids (profile iris)
        #[arg(required = true)]
        seeds: Vec<String>,

        /// Stop scheduling rounds once this many nodes are known
        #[arg(long)]
        max_nodes: Option<usize>,

        /// Search the crawled graph by name or id
        #[arg(long, short = 's')]
        search: Option<String>,

        /// Give up waiting for the layout to settle after this many seconds
        #[arg(long, default_value_t = 30)]
        settle_secs: u64,
    },

    /// Prune and lay out a dependency manifest (JSON or YAML list of records)
    Deps {
        file: PathBuf,

        /// Keep redundant (transitive) edges
        #[arg(long)]
        no_prune: bool,

        /// Upper bound on simulation ticks
        #[arg(long, default_value_t = 5_000)]
        max_ticks: usize,
    },
}

fn parse_canvas(s: &str) -> Result<(f32, f32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {}", s))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f32>()
            .ok()
            .filter(|v| *v > 0.0)
            .ok_or_else(|| format!("invalid canvas dimension: {}", v))
    };
    Ok((parse(w)?, parse(h)?))
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "friend_crawler=info,friend_graph=info,friend_layout=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
            } else {
                eprintln!("{}: {:#}", "error".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = config_path(cli.config);
    let config = AppConfig::load(path.as_deref())?;
    if let Some(path) = &path {
        info!(path = %path.display(), "loaded config");
    }

    match cli.command {
        Commands::Crawl {
            seeds,
            max_nodes,
            search,
            settle_secs,
        } => {
            let summary = cmd_crawl(
                &config,
                seeds,
                max_nodes,
                search.as_deref(),
                Duration::from_secs(settle_secs),
                cli.canvas,
            )
            .await?;
            match cli.format {
                OutputFormat::Json => output::print_json(&summary)?,
                OutputFormat::Pretty => output::print_crawl(&summary),
            }
        }
        Commands::Deps {
            file,
            no_prune,
            max_ticks,
        } => {
            let summary = cmd_deps(&config, &file, !no_prune, max_ticks, cli.canvas)?;
            match cli.format {
                OutputFormat::Json => output::print_json(&summary)?,
                OutputFormat::Pretty => output::print_deps(&summary),
            }
        }
    }
    Ok(())
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

async fn cmd_crawl(
    config: &AppConfig,
    seeds: Vec<String>,
    max_nodes: Option<usize>,
    search: Option<&str>,
    settle_timeout: Duration,
    canvas: (f32, f32),
) -> Result<CrawlSummary> {
    let resolver: Arc<dyn Resolver> = Arc::new(ProfileResolver::from_config(
        HttpDocumentSource::new(),
        &config.crawl,
    ));
    let crawler = Crawler::from_config(resolver, &config.crawl)
        .context("building crawler")?
        .with_max_nodes(max_nodes.or(config.crawl.max_nodes));

    let seeds: Vec<IdentityNode> = seeds
        .into_iter()
        .map(|id| IdentityNode::pending(CanonicalId::new(id)))
        .collect();

    let store = Arc::new(GraphStore::new());
    let mut updates = store.subscribe();
    let publisher = Arc::clone(&store);

    let engine = LayoutEngine::start(LayoutInput::default(), config.layout.clone(), |frame| {
        trace!(alpha = frame.alpha, nodes = frame.nodes.len(), "layout frame");
    });

    let handle = crawler.start(seeds, move |snapshot| {
        publisher.publish(&snapshot);
    });
    let cancel = handle.cancel_flag();
    let finished = handle.finished();
    tokio::pin!(finished);

    // Feed every published graph to the layout while the crawl runs.
    let report = loop {
        tokio::select! {
            report = &mut finished => break report.context("crawl task failed")?,
            Ok(()) = updates.changed() => {
                let graph = updates.borrow_and_update().clone();
                let summary = engine.update(graph_input(&graph, &config.layout));
                debug!(nodes = graph.len(), added = summary.added, "layout updated");
            }
            _ = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => {
                warn!("interrupted, finishing in-flight lookups");
                cancel.cancel();
            }
        }
    };

    let graph = store.current();
    engine.update(graph_input(&graph, &config.layout));

    let deadline = tokio::time::Instant::now() + settle_timeout;
    while !engine.is_settled() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    if !engine.is_settled() {
        warn!(timeout_secs = settle_timeout.as_secs(), "layout did not settle in time");
    }
    let frame = engine.frame();
    engine.shutdown().await;

    let viewport = centered_viewport(config, canvas);
    let focus = graph.nodes().next().map(|n| n.id.as_str().to_string());
    let scene = Scene::project(
        &frame,
        &viewport,
        &*graph,
        Interaction {
            hovered: None,
            selected: focus.as_deref(),
        },
    );

    Ok(CrawlSummary {
        report,
        counts: graph.status_counts(),
        search: search.map(|q| graph.search(q)).unwrap_or_default(),
        layout: LayoutSummary::new(&frame, &scene, &viewport, config.layout.alpha_min),
    })
}

fn cmd_deps(
    config: &AppConfig,
    file: &Path,
    prune: bool,
    max_ticks: usize,
    canvas: (f32, f32),
) -> Result<DepsSummary> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("reading manifest {}", file.display()))?;
    let records: Vec<DependencyRecord> = if file.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content).context("parsing JSON manifest")?
    } else {
        serde_yaml::from_str(&content).context("parsing YAML manifest")?
    };

    let mut dag = DependencyGraph::from_records(&records);
    let edges_before = dag.edge_count();
    let pruned = if prune {
        dag.prune().context("pruning dependency graph")?
    } else {
        0
    };
    info!(nodes = dag.nodes().len(), edges = dag.edge_count(), pruned, "dependency graph ready");

    let mut layout = config.layout.clone();
    if layout.directional_bias.is_none() {
        layout.directional_bias = Some(DirectionalBias::default());
    }
    let alpha_min = layout.alpha_min;
    let input = dependency_input(&dag, &layout);
    let mut sim = ForceSimulation::with_input(layout, input);
    let mut ticks = 0;
    while ticks < max_ticks && sim.tick() {
        ticks += 1;
    }
    debug!(ticks, alpha = sim.alpha(), "dependency layout done");

    let frame = sim.frame();
    let viewport = centered_viewport(config, canvas);
    let scene = Scene::project(&frame, &viewport, &dag, Interaction::default());

    Ok(DepsSummary {
        nodes: dag.nodes().len(),
        edges_before,
        pruned,
        edges: dag
            .edges()
            .into_iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect(),
        layout: LayoutSummary::new(&frame, &scene, &viewport, alpha_min),
    })
}

/// Viewport that puts the simulation origin at the canvas centre.
fn centered_viewport(config: &AppConfig, (width, height): (f32, f32)) -> ViewportTransform {
    let mut viewport = ViewportTransform::centered(config.viewport.clone(), width, height);
    viewport.drag(Vec2::new(width / 2.0, height / 2.0));
    viewport
}
