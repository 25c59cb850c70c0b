//! Force simulation for the friend graph.
//!
//! Semi-implicit Euler integration with a cooling schedule:
//! every tick the temperature `alpha` decays geometrically and scales every
//! force, so the layout moves a lot right after an update and then settles.
//!
//! Forces, applied in this order each tick:
//! - link springs toward a rest length
//! - optional directional bias (dependency graphs)
//! - pairwise repulsion, cut off beyond a maximum distance
//! - per-axis pull toward the origin
//! - radius-aware collision
//!
//! # Usage
//! ```ignore
//! let mut sim = ForceSimulation::new(LayoutConfig::default());
//! sim.update(input);
//! while sim.tick() {
//!     let frame = sim.frame();
//!     // draw frame.nodes
//! }
//! ```

use egui::{Pos2, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::debug;

use crate::config::LayoutConfig;
use crate::spatial::Picker;

/// Repulsion treats pairs closer than this (squared) as this close.
const MIN_DISTANCE_SQ: f32 = 1.0;

// =============================================================================
// INPUT
// =============================================================================

/// A node as handed to the simulation: identity plus display attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: String,
    pub label: String,
    pub radius: f32,
}

impl LayoutNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>, radius: f32) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            radius,
        }
    }
}

/// One end of a link. Input links name their nodes by id; the simulation
/// resolves them to node slots once per update.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Unresolved(String),
    Resolved(usize),
}

impl Endpoint {
    fn resolve(&self, index: &HashMap<String, usize>, len: usize) -> Option<usize> {
        match self {
            Endpoint::Unresolved(id) => index.get(id).copied(),
            Endpoint::Resolved(ix) => (*ix < len).then_some(*ix),
        }
    }
}

impl From<&str> for Endpoint {
    fn from(id: &str) -> Self {
        Endpoint::Unresolved(id.to_string())
    }
}

impl From<String> for Endpoint {
    fn from(id: String) -> Self {
        Endpoint::Unresolved(id)
    }
}

impl From<usize> for Endpoint {
    fn from(ix: usize) -> Self {
        Endpoint::Resolved(ix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutLink {
    pub source: Endpoint,
    pub target: Endpoint,
}

impl LayoutLink {
    pub fn new(source: impl Into<Endpoint>, target: impl Into<Endpoint>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Full node and link set for one update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutInput {
    pub nodes: Vec<LayoutNode>,
    pub links: Vec<LayoutLink>,
}

/// A link between two node slots of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLink {
    pub source: usize,
    pub target: usize,
}

// =============================================================================
// SIMULATION NODE
// =============================================================================

/// Physics state of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct SimNode {
    pub id: String,
    pub label: String,
    pub radius: f32,
    pub position: Pos2,
    velocity: Vec2,
    /// Pinned nodes keep their position (e.g. while dragged).
    pub pinned: bool,
}

impl SimNode {
    /// A node at rest at `position`.
    pub fn at(id: impl Into<String>, label: impl Into<String>, radius: f32, position: Pos2) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            radius,
            position,
            velocity: Vec2::ZERO,
            pinned: false,
        }
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }
}

/// What a [`ForceSimulation::update`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub added: usize,
    pub links: usize,
    pub dropped_links: usize,
}

/// Positions after a tick, as handed to consumers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutFrame {
    pub nodes: Vec<SimNode>,
    pub links: Vec<ResolvedLink>,
    pub alpha: f32,
}

impl LayoutFrame {
    pub fn node(&self, id: &str) -> Option<&SimNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Both ends of every link.
    pub fn link_endpoints(&self) -> impl Iterator<Item = (&SimNode, &SimNode)> {
        self.links
            .iter()
            .filter_map(|l| Some((self.nodes.get(l.source)?, self.nodes.get(l.target)?)))
    }
}

// =============================================================================
// FORCE SIMULATION
// =============================================================================

/// Force-directed layout over a growing node set.
#[derive(Debug, Clone)]
pub struct ForceSimulation {
    nodes: Vec<SimNode>,
    node_index: HashMap<String, usize>,
    links: Vec<ResolvedLink>,
    link_strength: Vec<f32>,
    link_bias: Vec<f32>,
    config: LayoutConfig,
    alpha: f32,
    rng: StdRng,
    picker: Picker,
}

impl ForceSimulation {
    pub fn new(config: LayoutConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            nodes: Vec::new(),
            node_index: HashMap::new(),
            links: Vec::new(),
            link_strength: Vec::new(),
            link_bias: Vec::new(),
            config,
            alpha: 1.0,
            rng,
            picker: Picker::new(),
        }
    }

    /// A fresh simulation at full temperature.
    pub fn with_input(config: LayoutConfig, input: LayoutInput) -> Self {
        let mut sim = Self::new(config);
        sim.update(input);
        sim.alpha = 1.0;
        sim
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    // =========================================================================
    // NODE MANAGEMENT
    // =========================================================================

    /// Merge a new node and link set.
    ///
    /// Known nodes keep position and velocity; new ones are scattered over
    /// the initial square with zero velocity. Nodes missing from `input` stay.
    /// The link set is replaced; links whose endpoints cannot be resolved are
    /// dropped. Reheats the simulation.
    pub fn update(&mut self, input: LayoutInput) -> UpdateSummary {
        let mut summary = UpdateSummary::default();

        for node in input.nodes {
            match self.node_index.get(&node.id) {
                Some(&ix) => {
                    let existing = &mut self.nodes[ix];
                    existing.label = node.label;
                    existing.radius = node.radius;
                }
                None => {
                    let position = self.random_position();
                    self.node_index.insert(node.id.clone(), self.nodes.len());
                    self.nodes
                        .push(SimNode::at(node.id, node.label, node.radius, position));
                    summary.added += 1;
                }
            }
        }

        let len = self.nodes.len();
        let mut links = Vec::with_capacity(input.links.len());
        for link in input.links {
            let source = link.source.resolve(&self.node_index, len);
            let target = link.target.resolve(&self.node_index, len);
            match (source, target) {
                (Some(source), Some(target)) if source != target => {
                    links.push(ResolvedLink { source, target });
                }
                _ => {
                    debug!(source = ?link.source, target = ?link.target, "dropping link");
                    summary.dropped_links += 1;
                }
            }
        }
        self.links = links;
        summary.links = self.links.len();
        self.prepare_links();

        self.alpha = self.config.reheat_alpha;
        self.picker.mark_dirty();
        debug!(
            nodes = self.nodes.len(),
            links = summary.links,
            added = summary.added,
            dropped = summary.dropped_links,
            alpha = self.alpha,
            "layout reheated"
        );
        summary
    }

    fn random_position(&mut self) -> Pos2 {
        let extent = self.config.initial_extent.max(f32::EPSILON);
        Pos2::new(
            self.rng.gen_range(0.0..extent),
            self.rng.gen_range(0.0..extent),
        )
    }

    /// Per-link stiffness and mass split. The split follows link counts per
    /// node; the stiffness is the configured constant.
    fn prepare_links(&mut self) {
        let mut count = vec![0usize; self.nodes.len()];
        for link in &self.links {
            count[link.source] += 1;
            count[link.target] += 1;
        }

        self.link_bias = self
            .links
            .iter()
            .map(|l| count[l.source] as f32 / (count[l.source] + count[l.target]) as f32)
            .collect();
        self.link_strength = vec![self.config.link_strength; self.links.len()];
    }

    pub fn get_node(&self, id: &str) -> Option<&SimNode> {
        self.node_index.get(id).map(|&ix| &self.nodes[ix])
    }

    fn get_node_mut(&mut self, id: &str) -> Option<&mut SimNode> {
        self.node_index
            .get(id)
            .copied()
            .map(|ix| &mut self.nodes[ix])
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[ResolvedLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // =========================================================================
    // SIMULATION
    // =========================================================================

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Restart from the given temperature without touching positions.
    pub fn reheat(&mut self, alpha: f32) {
        self.alpha = alpha;
    }

    pub fn is_settled(&self) -> bool {
        self.alpha < self.config.alpha_min
    }

    /// Run one step. Returns `false` once the layout has settled.
    pub fn tick(&mut self) -> bool {
        if self.is_settled() {
            return false;
        }
        self.alpha -= self.alpha * self.config.alpha_decay;
        if self.nodes.is_empty() {
            return true;
        }

        self.apply_links();
        self.apply_directional_bias();
        self.apply_repulsion();
        self.apply_centering();
        self.apply_collision();

        let keep = 1.0 - self.config.velocity_decay;
        for node in &mut self.nodes {
            if node.pinned {
                node.velocity = Vec2::ZERO;
                continue;
            }
            node.velocity *= keep;
            node.position += node.velocity;
        }

        self.picker.mark_dirty();
        true
    }

    fn apply_links(&mut self) {
        let alpha = self.alpha;
        let distance = self.config.link_distance;

        for (i, link) in self.links.iter().enumerate() {
            let source = &self.nodes[link.source];
            let target = &self.nodes[link.target];
            let mut delta =
                (target.position + target.velocity) - (source.position + source.velocity);
            if delta.x == 0.0 {
                delta.x = jiggle(&mut self.rng);
            }
            if delta.y == 0.0 {
                delta.y = jiggle(&mut self.rng);
            }
            let length = delta.length();
            let delta = delta * ((length - distance) / length * alpha * self.link_strength[i]);

            let bias = self.link_bias[i];
            self.nodes[link.target].velocity -= delta * bias;
            self.nodes[link.source].velocity += delta * (1.0 - bias);
        }
    }

    fn apply_directional_bias(&mut self) {
        let Some(bias) = self.config.directional_bias else {
            return;
        };
        let k = bias.strength * self.alpha;
        let gap = bias.gap.max(f32::EPSILON);

        for link in &self.links {
            let source_y = self.nodes[link.source].position.y;
            let target_y = self.nodes[link.target].position.y;
            if source_y < target_y + gap {
                let push = k * (target_y + gap - source_y) / gap;
                self.nodes[link.source].velocity.y += push;
                self.nodes[link.target].velocity.y -= push;
            }
        }
    }

    fn apply_repulsion(&mut self) {
        let strength = -self.config.repulsion * self.alpha;
        let max_sq = self.config.repulsion_max_distance * self.config.repulsion_max_distance;
        let positions: Vec<Pos2> = self.nodes.iter().map(|n| n.position).collect();

        for (i, node) in self.nodes.iter_mut().enumerate() {
            for (j, other) in positions.iter().enumerate() {
                if i == j {
                    continue;
                }
                let mut delta = *other - positions[i];
                if delta.length_sq() >= max_sq {
                    continue;
                }
                if delta.x == 0.0 {
                    delta.x = jiggle(&mut self.rng);
                }
                if delta.y == 0.0 {
                    delta.y = jiggle(&mut self.rng);
                }
                let mut l = delta.length_sq();
                if l < MIN_DISTANCE_SQ {
                    l = (MIN_DISTANCE_SQ * l).sqrt();
                }
                node.velocity += delta * (strength / l);
            }
        }
    }

    fn apply_centering(&mut self) {
        let k = self.config.center_strength * self.alpha;
        for node in &mut self.nodes {
            node.velocity -= node.position.to_vec2() * k;
        }
    }

    fn apply_collision(&mut self) {
        let padding = self.config.collide_padding;
        let n = self.nodes.len();

        for i in 0..n {
            let ri = self.nodes[i].radius + padding;
            let predicted = self.nodes[i].position + self.nodes[i].velocity;
            for j in (i + 1)..n {
                let rj = self.nodes[j].radius + padding;
                let reach = ri + rj;
                let mut delta = predicted - (self.nodes[j].position + self.nodes[j].velocity);
                if delta.length_sq() >= reach * reach {
                    continue;
                }
                if delta.x == 0.0 {
                    delta.x = jiggle(&mut self.rng);
                }
                if delta.y == 0.0 {
                    delta.y = jiggle(&mut self.rng);
                }
                let length = delta.length();
                let delta = delta * ((reach - length) / length);
                let share = (rj * rj) / (ri * ri + rj * rj);
                self.nodes[i].velocity += delta * share;
                self.nodes[j].velocity -= delta * (1.0 - share);
            }
        }
    }

    /// Snapshot of the current state.
    pub fn frame(&self) -> LayoutFrame {
        LayoutFrame {
            nodes: self.nodes.clone(),
            links: self.links.clone(),
            alpha: self.alpha,
        }
    }

    // =========================================================================
    // HIT TESTING
    // =========================================================================

    /// Nearest node within the pick radius of a simulation-space point.
    pub fn pick(&mut self, point: Pos2) -> Option<&SimNode> {
        if self.picker.is_dirty() || self.picker.len() != self.nodes.len() {
            self.picker.rebuild(self.nodes.iter().map(|n| n.position));
        }
        let ix = self.picker.pick(point, self.config.pick_radius)?;
        self.nodes.get(ix)
    }

    // =========================================================================
    // PINNING (for drag)
    // =========================================================================

    pub fn pin(&mut self, id: &str) {
        if let Some(node) = self.get_node_mut(id) {
            node.pinned = true;
            node.velocity = Vec2::ZERO;
        }
    }

    pub fn unpin(&mut self, id: &str) {
        if let Some(node) = self.get_node_mut(id) {
            node.pinned = false;
        }
    }

    /// Move a node; pinned nodes stay where they are put.
    pub fn move_node(&mut self, id: &str, position: Pos2) {
        if let Some(node) = self.get_node_mut(id) {
            node.position = position;
            self.picker.mark_dirty();
        }
    }
}

/// Tiny random offset that breaks exact coincidences.
fn jiggle(rng: &mut StdRng) -> f32 {
    (rng.gen::<f32>() - 0.5) * 1e-6
}

// =============================================================================
// TESTS
// =============================================================================
