//! Human and JSON summaries.

use colored::Colorize;
use serde::Serialize;

use friend_graph::{CrawlReport, SearchHit, StatusCounts};
use friend_layout::{LayoutFrame, NodeStyle, Scene, ViewportTransform};

#[derive(Debug, Serialize)]
pub struct PlacedNode {
    pub id: String,
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub screen_x: f32,
    pub screen_y: f32,
    pub style: NodeStyle,
}

#[derive(Debug, Serialize)]
pub struct LayoutSummary {
    pub alpha: f32,
    pub settled: bool,
    pub grid_spacing: f32,
    pub nodes: Vec<PlacedNode>,
    pub links: Vec<(String, String)>,
}

impl LayoutSummary {
    /// Pair simulation positions with their projection.
    pub fn new(frame: &LayoutFrame, scene: &Scene, viewport: &ViewportTransform, min_alpha: f32) -> Self {
        let nodes = frame
            .nodes
            .iter()
            .zip(&scene.nodes)
            .map(|(sim, screen)| PlacedNode {
                id: sim.id.clone(),
                label: sim.label.clone(),
                x: sim.position.x,
                y: sim.position.y,
                radius: sim.radius,
                screen_x: screen.position.x,
                screen_y: screen.position.y,
                style: screen.style,
            })
            .collect();
        let links = frame
            .link_endpoints()
            .map(|(s, t)| (s.id.clone(), t.id.clone()))
            .collect();
        Self {
            alpha: frame.alpha,
            settled: frame.alpha < min_alpha,
            grid_spacing: viewport.grid().spacing,
            nodes,
            links,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CrawlSummary {
    pub report: CrawlReport,
    pub counts: StatusCounts,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search: Vec<SearchHit>,
    pub layout: LayoutSummary,
}

#[derive(Debug, Serialize)]
pub struct DepsSummary {
    pub nodes: usize,
    pub edges_before: usize,
    pub pruned: usize,
    pub edges: Vec<(String, String)>,
    pub layout: LayoutSummary,
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn styled(style: NodeStyle, text: &str) -> colored::ColoredString {
    match style {
        NodeStyle::Pending => text.dimmed(),
        NodeStyle::Success => text.green(),
        NodeStyle::Error => text.red(),
        NodeStyle::Accent => text.cyan(),
        NodeStyle::Focus => text.yellow().bold(),
    }
}

fn print_layout(layout: &LayoutSummary) {
    let state = if layout.settled {
        "settled".green()
    } else {
        "still moving".yellow()
    };
    println!(
        "\n{} {} nodes, {} links, alpha {:.4} ({})",
        "Layout".bold(),
        layout.nodes.len(),
        layout.links.len(),
        layout.alpha,
        state
    );
    for node in &layout.nodes {
        println!(
            "  {:<48} ({:>8.1}, {:>8.1})  r={:.1}",
            styled(node.style, &node.label),
            node.x,
            node.y,
            node.radius
        );
    }
}

pub fn print_crawl(summary: &CrawlSummary) {
    let report = &summary.report;
    let outcome = if report.cancelled {
        "cancelled".yellow().bold()
    } else {
        "complete".green().bold()
    };
    println!(
        "{} Crawl {} after {} round(s)",
        "OK".green(),
        outcome,
        report.rounds
    );
    println!(
        "  {} resolved, {} failed, {} pending, {} known",
        summary.counts.success.to_string().green(),
        summary.counts.error.to_string().red(),
        summary.counts.pending.to_string().dimmed(),
        report.nodes
    );

    if !summary.search.is_empty() {
        println!("\n{}", "Matches".bold());
        for hit in &summary.search {
            println!("  {}  {}", hit.label, hit.value.as_str().dimmed());
        }
    }

    print_layout(&summary.layout);
}

pub fn print_deps(summary: &DepsSummary) {
    println!(
        "{} {} dependencies, {} edge(s), {} redundant edge(s) pruned",
        "OK".green(),
        summary.nodes,
        summary.edges_before,
        summary.pruned
    );
    for (dependent, dependency) in &summary.edges {
        println!("  {} -> {}", dependent, dependency);
    }
    print_layout(&summary.layout);
}
