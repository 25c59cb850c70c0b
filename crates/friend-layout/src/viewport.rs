//! Viewport transform - pan/zoom as an affine map from simulation space to
//! screen space.
//!
//! Gestures are folded into one matrix by left composition:
//! `current = delta ∘ current`. Pointer positions go through the inverse
//! before hit testing, so picking is independent of pan and zoom.
//!
//! # Gestures
//! - `drag(delta)` - pure translation
//! - `zoom_at(anchor, factor)` - scale about a screen point that stays put
//! - `zoom_to(state)` - absolute `{x, y, k}` zoom state from a gesture
//!   recogniser; the delta against the previous state of this session is
//!   composed in

use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};

use crate::config::ViewportConfig;
use crate::grid::GridSpec;

// =============================================================================
// AFFINE
// =============================================================================

/// Uniform scale followed by translation: `p ↦ scale * p + translation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub scale: f32,
    pub translation: Vec2,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        translation: Vec2::ZERO,
    };

    pub fn translate(delta: Vec2) -> Self {
        Self {
            scale: 1.0,
            translation: delta,
        }
    }

    /// Scale by `k` about `anchor`: `T(anchor) · S(k) · T(-anchor)`.
    pub fn scale_about(anchor: Pos2, k: f32) -> Self {
        Self {
            scale: k,
            translation: anchor.to_vec2() * (1.0 - k),
        }
    }

    /// `self ∘ inner`: apply `inner` first.
    pub fn then_after(self, inner: Affine) -> Self {
        Self {
            scale: self.scale * inner.scale,
            translation: inner.translation * self.scale + self.translation,
        }
    }

    pub fn inverse(self) -> Self {
        let inv = 1.0 / self.scale;
        Self {
            scale: inv,
            translation: -self.translation * inv,
        }
    }

    pub fn apply(self, point: Pos2) -> Pos2 {
        Pos2::new(
            point.x * self.scale + self.translation.x,
            point.y * self.scale + self.translation.y,
        )
    }

    /// Row-major 3×3 homogeneous matrix.
    pub fn matrix(self) -> [[f32; 3]; 3] {
        [
            [self.scale, 0.0, self.translation.x],
            [0.0, self.scale, self.translation.y],
            [0.0, 0.0, 1.0],
        ]
    }
}

/// Absolute zoom state as reported by a zoom gesture recogniser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomState {
    pub x: f32,
    pub y: f32,
    pub k: f32,
}

// =============================================================================
// VIEWPORT TRANSFORM
// =============================================================================

/// Pan/zoom state of one visualization session.
#[derive(Debug, Clone)]
pub struct ViewportTransform {
    current: Affine,
    /// Last absolute zoom state, as a matrix. `None` until the first zoom of
    /// the session.
    previous_zoom: Option<Affine>,
    /// Screen offset of the simulation origin when the session started.
    origin: Vec2,
    config: ViewportConfig,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl ViewportTransform {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            current: Affine::IDENTITY,
            previous_zoom: None,
            origin: Vec2::ZERO,
            config,
        }
    }

    /// Viewport whose absolute zoom states are relative to the centre of a
    /// `width × height` screen.
    pub fn centered(config: ViewportConfig, width: f32, height: f32) -> Self {
        Self {
            origin: Vec2::new(width / 2.0, height / 2.0),
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    // =========================================================================
    // CURRENT VALUES
    // =========================================================================

    pub fn affine(&self) -> Affine {
        self.current
    }

    pub fn matrix(&self) -> [[f32; 3]; 3] {
        self.current.matrix()
    }

    pub fn scale(&self) -> f32 {
        self.current.scale
    }

    // =========================================================================
    // GESTURES
    // =========================================================================

    fn compose(&mut self, delta: Affine) {
        self.current = delta.then_after(self.current);
    }

    /// Pan by a screen-space delta.
    pub fn drag(&mut self, delta: Vec2) {
        self.compose(Affine::translate(delta));
    }

    /// Zoom by `factor` keeping the screen point `anchor` fixed. The total
    /// scale stays within the configured limits.
    pub fn zoom_at(&mut self, anchor: Pos2, factor: f32) {
        let old = self.current.scale;
        let new = (old * factor).clamp(self.config.min_scale, self.config.max_scale);
        if (new - old).abs() <= f32::EPSILON * old {
            return;
        }
        self.compose(Affine::scale_about(anchor, new / old));
    }

    /// Apply an absolute zoom state.
    ///
    /// The change since the previous state of this session is composed onto
    /// the current transform, so drags in between are preserved.
    pub fn zoom_to(&mut self, state: ZoomState) {
        let k = state.k.clamp(self.config.min_scale, self.config.max_scale);
        let next = Affine {
            scale: k,
            translation: Vec2::new(state.x, state.y) - self.origin,
        };
        let previous = self
            .previous_zoom
            .unwrap_or_else(|| Affine::translate(-self.origin));
        self.compose(next.then_after(previous.inverse()));
        self.previous_zoom = Some(next);
    }

    pub fn reset(&mut self) {
        self.current = Affine::IDENTITY;
        self.previous_zoom = None;
    }

    // =========================================================================
    // COORDINATE TRANSFORMS
    // =========================================================================

    /// Simulation space to screen space.
    pub fn apply(&self, point: Pos2) -> Pos2 {
        self.current.apply(point)
    }

    /// Screen space to simulation space.
    pub fn invert(&self, point: Pos2) -> Pos2 {
        self.current.inverse().apply(point)
    }

    /// Reference grid for the current scale.
    pub fn grid(&self) -> GridSpec {
        GridSpec::for_transform(self.current, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: Pos2, b: Pos2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn test_drag_translates() {
        let mut vp = ViewportTransform::default();
        vp.drag(Vec2::new(10.0, -5.0));
        vp.drag(Vec2::new(1.0, 1.0));
        assert_eq!(vp.apply(Pos2::ZERO), Pos2::new(11.0, -4.0));
        assert_eq!(
            vp.matrix(),
            [[1.0, 0.0, 11.0], [0.0, 1.0, -4.0], [0.0, 0.0, 1.0]]
        );
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut vp = ViewportTransform::default();
        vp.drag(Vec2::new(30.0, 40.0));
        let anchor = Pos2::new(100.0, 50.0);
        let under_pointer = vp.invert(anchor);

        vp.zoom_at(anchor, 2.0);
        assert_eq!(vp.scale(), 2.0);
        assert!(close(vp.apply(under_pointer), anchor));
    }

    #[test]
    fn test_zoom_clamped() {
        let mut vp = ViewportTransform::default();
        vp.zoom_at(Pos2::ZERO, 10.0);
        assert_eq!(vp.scale(), 3.0);
        vp.zoom_at(Pos2::ZERO, 2.0);
        assert_eq!(vp.scale(), 3.0);
        vp.zoom_at(Pos2::ZERO, 1e-4);
        assert!((vp.scale() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_absolute_zoom_session() {
        let mut vp = ViewportTransform::centered(ViewportConfig::default(), 800.0, 600.0);
        // Initial recogniser state is the identity: nothing changes.
        vp.zoom_to(ZoomState { x: 0.0, y: 0.0, k: 1.0 });
        assert_eq!(vp.affine(), Affine::IDENTITY);

        vp.zoom_to(ZoomState { x: 0.0, y: 0.0, k: 2.0 });
        assert_eq!(vp.scale(), 2.0);
        // The point under screen offset (-400, -300) stays put.
        assert!(close(vp.apply(Pos2::new(-400.0, -300.0)), Pos2::new(-400.0, -300.0)));

        // A drag between zoom events survives the next zoom event.
        vp.drag(Vec2::new(5.0, 0.0));
        let before = vp.apply(Pos2::new(10.0, 10.0));
        vp.zoom_to(ZoomState { x: 0.0, y: 0.0, k: 2.0 });
        assert!(close(vp.apply(Pos2::new(10.0, 10.0)), before));
    }

    #[test]
    fn test_sessions_do_not_share_state() {
        let mut one = ViewportTransform::default();
        let mut two = ViewportTransform::default();
        one.zoom_to(ZoomState { x: 10.0, y: 0.0, k: 2.0 });
        two.zoom_to(ZoomState { x: 10.0, y: 0.0, k: 2.0 });
        assert_eq!(one.affine(), two.affine());
    }

    #[test]
    fn test_reset() {
        let mut vp = ViewportTransform::default();
        vp.drag(Vec2::new(3.0, 4.0));
        vp.zoom_at(Pos2::new(1.0, 1.0), 2.0);
        vp.reset();
        assert_eq!(vp.affine(), Affine::IDENTITY);
    }

    proptest! {
        #[test]
        fn prop_invert_undoes_apply(
            dx in -500.0f32..500.0,
            dy in -500.0f32..500.0,
            k in 0.1f32..3.0,
            ax in -200.0f32..200.0,
            ay in -200.0f32..200.0,
            px in -1000.0f32..1000.0,
            py in -1000.0f32..1000.0,
        ) {
            let mut vp = ViewportTransform::default();
            vp.drag(Vec2::new(dx, dy));
            vp.zoom_at(Pos2::new(ax, ay), k);
            let p = Pos2::new(px, py);
            let back = vp.invert(vp.apply(p));
            prop_assert!((back - p).length() < 1e-2 * (1.0 + p.to_vec2().length()));
        }

        #[test]
        fn prop_composition_matches_sequential_application(
            k1 in 0.1f32..3.0,
            k2 in 0.1f32..3.0,
            tx in -100.0f32..100.0,
            px in -100.0f32..100.0,
        ) {
            let a = Affine::scale_about(Pos2::new(tx, 0.0), k1);
            let b = Affine { scale: k2, translation: Vec2::new(tx, -tx) };
            let p = Pos2::new(px, px);
            let composed = a.then_after(b).apply(p);
            let sequential = a.apply(b.apply(p));
            prop_assert!((composed - sequential).length() < 1e-2);
        }
    }
}
