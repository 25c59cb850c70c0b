//! Friend Layout
//!
//! Force-directed layout for friend and dependency graphs, plus the
//! viewport transform, background grid, hit testing and scene projection a
//! renderer needs.
//!
//! ## Architecture
//!
//! ```text
//! Graph / DependencyGraph  (friend-graph)
//!        │
//!        ▼  bridge::graph_input / dependency_input
//!   LayoutInput ──► ForceSimulation ──► LayoutFrame
//!                     (engine ticks it)      │
//!                                            ▼
//!                  ViewportTransform ──► Scene (screen space, styled)
//! ```
//!
//! Geometry types come from `egui`; nothing here depends on a windowing
//! backend.

pub mod bridge;
pub mod config;
pub mod engine;
pub mod force_sim;
pub mod grid;
pub mod scene;
pub mod spatial;
pub mod viewport;

pub use bridge::{dependency_input, graph_input};
pub use config::{DirectionalBias, LayoutConfig, LayoutConfigError, ViewportConfig};
pub use engine::LayoutEngine;
pub use force_sim::{
    Endpoint, ForceSimulation, LayoutFrame, LayoutInput, LayoutLink, LayoutNode, ResolvedLink,
    SimNode, UpdateSummary,
};
pub use grid::{grid_spacing, GridAxis, GridLine, GridSpec, LineWeight};
pub use scene::{Interaction, NodeStyle, Scene, SceneLink, SceneNode, SceneSource};
pub use spatial::Picker;
pub use viewport::{Affine, ViewportTransform, ZoomState};

pub use egui::{Pos2, Rect, Vec2};
