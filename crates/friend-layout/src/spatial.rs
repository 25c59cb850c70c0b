//! Spatial index for picking simulation nodes.
//!
//! Uses R-tree (via `rstar`) for O(log n) nearest-node lookups instead of a
//! linear scan over every node on each pointer move.

use egui::Pos2;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// Index entry: a node's slot in the simulation and its centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickEntry {
    pub index: usize,
    pub center: [f32; 2],
}

impl PickEntry {
    pub fn new(index: usize, center: Pos2) -> Self {
        Self {
            index,
            center: [center.x, center.y],
        }
    }
}

impl RTreeObject for PickEntry {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.center)
    }
}

impl PointDistance for PickEntry {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dx = point[0] - self.center[0];
        let dy = point[1] - self.center[1];
        dx * dx + dy * dy
    }
}

/// Nearest-centre picker over node positions.
///
/// Positions change every tick, so the index is only rebuilt lazily: the
/// simulation marks it dirty and the next pick rebuilds it.
#[derive(Clone)]
pub struct Picker {
    tree: RTree<PickEntry>,
    dirty: bool,
    count: usize,
}

impl std::fmt::Debug for Picker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Picker")
            .field("count", &self.count)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl Default for Picker {
    fn default() -> Self {
        Self::new()
    }
}

impl Picker {
    pub fn new() -> Self {
        Self {
            tree: RTree::new(),
            dirty: false,
            count: 0,
        }
    }

    pub fn rebuild(&mut self, centers: impl Iterator<Item = Pos2>) {
        let entries: Vec<PickEntry> = centers
            .enumerate()
            .map(|(index, center)| PickEntry::new(index, center))
            .collect();
        self.count = entries.len();
        self.tree = RTree::bulk_load(entries);
        self.dirty = false;
    }

    /// Nearest node whose centre lies within `radius` of `point`.
    pub fn pick(&self, point: Pos2, radius: f32) -> Option<usize> {
        let query = [point.x, point.y];
        self.tree
            .nearest_neighbor(&query)
            .filter(|entry| entry.distance_2(&query) <= radius * radius)
            .map(|entry| entry.index)
    }

    /// Every node within `radius` of `point`, nearest first.
    pub fn within(&self, point: Pos2, radius: f32) -> Vec<usize> {
        let query = [point.x, point.y];
        self.tree
            .nearest_neighbor_iter(&query)
            .take_while(|entry| entry.distance_2(&query) <= radius * radius)
            .map(|entry| entry.index)
            .collect()
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn picker(points: &[(f32, f32)]) -> Picker {
        let mut picker = Picker::new();
        picker.rebuild(points.iter().map(|&(x, y)| Pos2::new(x, y)));
        picker
    }

    #[test]
    fn test_empty_picker() {
        let picker = Picker::new();
        assert!(picker.is_empty());
        assert_eq!(picker.pick(Pos2::ZERO, 32.0), None);
    }

    #[test]
    fn test_pick_nearest_within_radius() {
        let picker = picker(&[(0.0, 0.0), (50.0, 0.0), (100.0, 0.0)]);
        assert_eq!(picker.len(), 3);
        assert_eq!(picker.pick(Pos2::new(48.0, 0.0), 32.0), Some(1));
        assert_eq!(picker.pick(Pos2::new(70.0, 0.0), 32.0), Some(1));
        assert_eq!(picker.pick(Pos2::new(80.0, 0.0), 32.0), Some(2));
    }

    #[test]
    fn test_pick_outside_radius_misses() {
        let picker = picker(&[(0.0, 0.0)]);
        assert_eq!(picker.pick(Pos2::new(32.0, 0.0), 32.0), Some(0));
        assert_eq!(picker.pick(Pos2::new(30.0, 30.0), 32.0), None);
    }

    #[test]
    fn test_within_sorted_by_distance() {
        let picker = picker(&[(10.0, 0.0), (30.0, 0.0), (5.0, 0.0), (200.0, 0.0)]);
        assert_eq!(picker.within(Pos2::ZERO, 40.0), vec![2, 0, 1]);
    }

    #[test]
    fn test_dirty_flag() {
        let mut picker = Picker::new();
        assert!(!picker.is_dirty());
        picker.mark_dirty();
        assert!(picker.is_dirty());
        picker.rebuild(std::iter::empty());
        assert!(!picker.is_dirty());
    }

    #[test]
    fn test_many_nodes() {
        let points: Vec<(f32, f32)> = (0..500)
            .map(|i| ((i % 50) as f32 * 20.0, (i / 50) as f32 * 20.0))
            .collect();
        let picker = picker(&points);
        assert_eq!(picker.len(), 500);
        // (500, 100) is node 25 + 5 * 50
        assert_eq!(picker.pick(Pos2::new(501.0, 99.0), 15.0), Some(275));
    }
}
