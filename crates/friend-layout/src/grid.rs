//! Background reference grid.
//!
//! Spacing follows the zoom: the simulation-space base spacing is scaled to
//! screen space and grown by a fixed factor until it is no longer too dense.

use egui::{Pos2, Rect};

use crate::config::ViewportConfig;
use crate::viewport::Affine;

/// Screen-space grid parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    /// Screen position of the simulation origin.
    pub origin: Pos2,
    pub spacing: f32,
    pub highlight_every: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridAxis {
    /// Line of constant x.
    Vertical,
    /// Line of constant y.
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LineWeight {
    Minor,
    Highlight,
    /// The line through the origin.
    Axis,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub axis: GridAxis,
    /// Screen x (vertical lines) or y (horizontal lines).
    pub offset: f32,
    pub weight: LineWeight,
}

impl GridSpec {
    pub fn for_transform(transform: Affine, config: &ViewportConfig) -> Self {
        Self {
            origin: transform.apply(Pos2::ZERO),
            spacing: grid_spacing(transform.scale, config),
            highlight_every: config.highlight_every,
        }
    }

    /// Every grid line crossing `screen`, vertical lines first.
    pub fn lines(&self, screen: Rect) -> Vec<GridLine> {
        let mut lines = self.axis_lines(GridAxis::Vertical, self.origin.x, screen.min.x, screen.max.x);
        lines.extend(self.axis_lines(GridAxis::Horizontal, self.origin.y, screen.min.y, screen.max.y));
        lines
    }

    fn axis_lines(&self, axis: GridAxis, origin: f32, min: f32, max: f32) -> Vec<GridLine> {
        if !(self.spacing > 0.0) || !origin.is_finite() {
            return Vec::new();
        }
        let first = ((min - origin) / self.spacing).ceil() as i64;
        let last = ((max - origin) / self.spacing).floor() as i64;
        (first..=last)
            .map(|i| GridLine {
                axis,
                offset: origin + i as f32 * self.spacing,
                weight: self.weight(i),
            })
            .collect()
    }

    fn weight(&self, i: i64) -> LineWeight {
        let every = i64::from(self.highlight_every);
        if i == 0 {
            LineWeight::Axis
        } else if every > 0 && i.rem_euclid(every) == 0 {
            LineWeight::Highlight
        } else {
            LineWeight::Minor
        }
    }
}

/// On-screen spacing for a given scale.
pub fn grid_spacing(scale: f32, config: &ViewportConfig) -> f32 {
    let mut spacing = config.base_spacing * scale;
    if !(spacing > 0.0) || config.growth <= 1.0 {
        return spacing.max(config.min_spacing);
    }
    while spacing < config.min_spacing {
        spacing *= config.growth;
    }
    spacing
}
