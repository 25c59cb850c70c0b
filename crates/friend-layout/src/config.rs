//! Layout and viewport configuration.
//!
//! ```yaml
//! link_distance: 50
//! repulsion: 150
//! alpha_decay: 0.005
//! seed: 7
//! directional_bias:
//!   strength: 3
//!   gap: 50
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum LayoutConfigError {
    #[error("failed to read layout config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid layout config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

// =============================================================================
// SIMULATION
// =============================================================================

/// Force constants and cooling schedule for the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Rest length of every link.
    pub link_distance: f32,

    /// Stiffness shared by every link, whatever the degree of its ends.
    pub link_strength: f32,

    /// Magnitude of the pairwise repulsion.
    pub repulsion: f32,

    /// Pairs further apart than this do not repel.
    pub repulsion_max_distance: f32,

    /// Pull toward the origin, applied per axis.
    pub center_strength: f32,

    /// Added to both radii when resolving overlaps.
    pub collide_padding: f32,

    /// Vertical ordering of linked pairs (dependency graphs only).
    pub directional_bias: Option<DirectionalBias>,

    /// Temperature decay per tick.
    pub alpha_decay: f32,

    /// Temperature below which the layout counts as settled.
    pub alpha_min: f32,

    /// Fraction of velocity lost per tick.
    pub velocity_decay: f32,

    /// Temperature an `update` restarts from.
    pub reheat_alpha: f32,

    /// Side of the square new nodes are scattered in.
    pub initial_extent: f32,

    pub pick_radius: f32,

    pub tick_interval_ms: u64,

    /// Minimum spacing between two frames handed to the consumer.
    pub emit_interval_ms: u64,

    pub radius_scale: f32,
    pub radius_exponent: f32,

    /// Fixed RNG seed for reproducible placement.
    pub seed: Option<u64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            link_distance: 50.0,
            link_strength: 0.1,
            repulsion: 150.0,
            repulsion_max_distance: 500.0,
            center_strength: 0.01,
            collide_padding: 2.0,
            directional_bias: None,
            alpha_decay: 0.005,
            alpha_min: 0.001,
            velocity_decay: 0.4,
            reheat_alpha: 0.5,
            initial_extent: 400.0,
            pick_radius: 32.0,
            tick_interval_ms: 16,
            emit_interval_ms: 20,
            radius_scale: 5.0,
            radius_exponent: 0.42,
            seed: None,
        }
    }
}

impl LayoutConfig {
    /// Defaults plus the directional bias, for dependency graphs.
    pub fn dependency_dag() -> Self {
        Self {
            directional_bias: Some(DirectionalBias::default()),
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn emit_interval(&self) -> Duration {
        Duration::from_millis(self.emit_interval_ms)
    }

    /// Display radius for a node with `degree` distinct neighbours.
    pub fn node_radius(&self, degree: usize) -> f32 {
        (degree.max(1) as f32).powf(self.radius_exponent) * self.radius_scale
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LayoutConfigError> {
        from_file(path)
    }

    pub fn from_yaml(content: &str) -> Result<Self, LayoutConfigError> {
        from_yaml(content)
    }
}

/// Pushes the source of a link below its target until they are `gap` apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalBias {
    pub strength: f32,
    pub gap: f32,
}

impl Default for DirectionalBias {
    fn default() -> Self {
        Self {
            strength: 3.0,
            gap: 50.0,
        }
    }
}

// =============================================================================
// VIEWPORT
// =============================================================================

/// Zoom limits and reference grid parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_scale: f32,
    pub max_scale: f32,

    /// Grid spacing in simulation units at scale 1.
    pub base_spacing: f32,

    /// Factor the spacing is multiplied by while it is too dense.
    pub growth: f32,

    /// Smallest on-screen grid spacing.
    pub min_spacing: f32,

    /// Every n-th grid line is highlighted.
    pub highlight_every: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.05,
            max_scale: 3.0,
            base_spacing: 20.0,
            growth: 5.0,
            min_spacing: 20.0,
            highlight_every: 5,
        }
    }
}

impl ViewportConfig {
    pub fn from_yaml(content: &str) -> Result<Self, LayoutConfigError> {
        from_yaml(content)
    }
}

fn from_file<T>(path: impl AsRef<Path>) -> Result<T, LayoutConfigError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| LayoutConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    from_yaml(&content)
}

fn from_yaml<T>(content: &str) -> Result<T, LayoutConfigError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(LayoutConfig::from_yaml("").unwrap(), LayoutConfig::default());
        assert_eq!(ViewportConfig::from_yaml("  \n").unwrap(), ViewportConfig::default());
    }

    #[test]
    fn test_partial_yaml() {
        let config = LayoutConfig::from_yaml(
            r#"
link_distance: 80
seed: 42
directional_bias:
  gap: 30
"#,
        )
        .unwrap();
        assert_eq!(config.link_distance, 80.0);
        assert_eq!(config.seed, Some(42));
        assert_eq!(
            config.directional_bias,
            Some(DirectionalBias {
                strength: 3.0,
                gap: 30.0
            })
        );
        assert_eq!(config.repulsion, 150.0);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = LayoutConfig::from_yaml("link_distance: [1, 2]").unwrap_err();
        assert!(matches!(err, LayoutConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = LayoutConfig::from_file("/nonexistent/layout.yaml").unwrap_err();
        assert!(matches!(err, LayoutConfigError::Io { .. }));
    }

    #[test]
    fn test_node_radius() {
        let config = LayoutConfig::default();
        assert_eq!(config.node_radius(0), 5.0);
        assert_eq!(config.node_radius(1), 5.0);
        let r10 = config.node_radius(10);
        assert!((r10 - 10f32.powf(0.42) * 5.0).abs() < 1e-5);
        assert!(config.node_radius(100) > r10);
    }

    #[test]
    fn test_dependency_dag_enables_bias() {
        assert!(LayoutConfig::default().directional_bias.is_none());
        assert!(LayoutConfig::dependency_dag().directional_bias.is_some());
    }
}
