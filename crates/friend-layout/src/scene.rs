//! Scene projection: a layout frame pushed through the viewport, with
//! selection and hover styling resolved.

use egui::Pos2;
use friend_graph::NodeStatus;
use serde::Serialize;
use std::collections::HashMap;

use crate::force_sim::LayoutFrame;
use crate::viewport::ViewportTransform;

/// What the projection needs to know about the graph behind a frame.
pub trait SceneSource {
    /// Crawl status; `None` for graphs without one.
    fn status(&self, id: &str) -> Option<NodeStatus>;

    /// Resolved display name, if any.
    fn display_name(&self, id: &str) -> Option<&str>;

    /// Ids adjacent to `id` in either direction.
    fn neighbor_ids(&self, id: &str) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStyle {
    Pending,
    Success,
    Error,
    /// Hovered, or adjacent to the selection.
    Accent,
    /// The selected node.
    Focus,
}

impl From<NodeStatus> for NodeStyle {
    fn from(status: NodeStatus) -> Self {
        match status {
            NodeStatus::Pending => NodeStyle::Pending,
            NodeStatus::Success => NodeStyle::Success,
            NodeStatus::Error => NodeStyle::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: String,
    pub position: Pos2,
    pub radius: f32,
    /// Display name; empty until resolved.
    pub label: String,
    pub style: NodeStyle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLink {
    pub source: Pos2,
    pub target: Pos2,
}

/// Pointer state feeding the styling.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interaction<'a> {
    pub hovered: Option<&'a str>,
    pub selected: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub links: Vec<SceneLink>,
}

impl Scene {
    pub fn node(&self, id: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Project `frame` to screen space.
    ///
    /// Styles are layered: status first, then `Accent` for the hovered node
    /// and the neighbours of the selection, then `Focus` for the selection.
    pub fn project(
        frame: &LayoutFrame,
        viewport: &ViewportTransform,
        source: &dyn SceneSource,
        interaction: Interaction<'_>,
    ) -> Self {
        let scale = viewport.scale();
        let mut nodes: Vec<SceneNode> = frame
            .nodes
            .iter()
            .map(|node| SceneNode {
                id: node.id.clone(),
                position: viewport.apply(node.position),
                radius: node.radius * scale,
                label: source.display_name(&node.id).unwrap_or_default().to_string(),
                style: source
                    .status(&node.id)
                    .map(NodeStyle::from)
                    .unwrap_or(NodeStyle::Pending),
            })
            .collect();

        let slots: HashMap<&str, usize> = frame
            .nodes
            .iter()
            .enumerate()
            .map(|(ix, n)| (n.id.as_str(), ix))
            .collect();

        let mut accented: Vec<String> = interaction.hovered.map(str::to_string).into_iter().collect();
        if let Some(selected) = interaction.selected {
            accented.extend(source.neighbor_ids(selected));
        }
        for id in &accented {
            if let Some(&ix) = slots.get(id.as_str()) {
                nodes[ix].style = NodeStyle::Accent;
            }
        }
        if let Some(&ix) = interaction.selected.and_then(|id| slots.get(id)) {
            nodes[ix].style = NodeStyle::Focus;
        }

        let links = frame
            .links
            .iter()
            .filter_map(|link| {
                Some(SceneLink {
                    source: nodes.get(link.source)?.position,
                    target: nodes.get(link.target)?.position,
                })
            })
            .collect();

        Self { nodes, links }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::force_sim::{ResolvedLink, SimNode};
    use egui::Vec2;
    use pretty_assertions::assert_eq;

    struct Fixture;

    impl SceneSource for Fixture {
        fn status(&self, id: &str) -> Option<NodeStatus> {
            match id {
                "a" => Some(NodeStatus::Success),
                "b" => Some(NodeStatus::Error),
                _ => Some(NodeStatus::Pending),
            }
        }

        fn display_name(&self, id: &str) -> Option<&str> {
            (id == "a").then_some("Alice")
        }

        fn neighbor_ids(&self, id: &str) -> Vec<String> {
            match id {
                "a" => vec!["b".into(), "c".into()],
                "b" | "c" => vec!["a".into()],
                _ => Vec::new(),
            }
        }
    }

    fn node(id: &str, x: f32, y: f32) -> SimNode {
        SimNode::at(id, id, 5.0, Pos2::new(x, y))
    }

    fn frame() -> LayoutFrame {
        LayoutFrame {
            nodes: vec![node("a", 0.0, 0.0), node("b", 10.0, 0.0), node("c", 0.0, 10.0), node("d", 50.0, 50.0)],
            links: vec![
                ResolvedLink { source: 0, target: 1 },
                ResolvedLink { source: 0, target: 2 },
            ],
            alpha: 0.5,
        }
    }

    fn styles(scene: &Scene) -> Vec<NodeStyle> {
        scene.nodes.iter().map(|n| n.style).collect()
    }

    #[test]
    fn test_status_styles_and_labels() {
        let scene = Scene::project(&frame(), &ViewportTransform::default(), &Fixture, Interaction::default());
        assert_eq!(
            styles(&scene),
            vec![NodeStyle::Success, NodeStyle::Error, NodeStyle::Pending, NodeStyle::Pending]
        );
        assert_eq!(scene.node("a").unwrap().label, "Alice");
        assert_eq!(scene.node("b").unwrap().label, "");
        assert_eq!(scene.links.len(), 2);
    }

    #[test]
    fn test_selection_accents_neighbours() {
        let interaction = Interaction {
            hovered: Some("d"),
            selected: Some("a"),
        };
        let scene = Scene::project(&frame(), &ViewportTransform::default(), &Fixture, interaction);
        assert_eq!(
            styles(&scene),
            vec![NodeStyle::Focus, NodeStyle::Accent, NodeStyle::Accent, NodeStyle::Accent]
        );
    }

    #[test]
    fn test_selection_wins_over_hover() {
        let interaction = Interaction {
            hovered: Some("b"),
            selected: Some("b"),
        };
        let scene = Scene::project(&frame(), &ViewportTransform::default(), &Fixture, interaction);
        assert_eq!(scene.node("b").unwrap().style, NodeStyle::Focus);
        assert_eq!(scene.node("a").unwrap().style, NodeStyle::Accent);
        assert_eq!(scene.node("c").unwrap().style, NodeStyle::Pending);
    }

    #[test]
    fn test_projection_follows_viewport() {
        let mut viewport = ViewportTransform::default();
        viewport.zoom_at(Pos2::ZERO, 2.0);
        viewport.drag(Vec2::new(100.0, 0.0));

        let scene = Scene::project(&frame(), &viewport, &Fixture, Interaction::default());
        let b = scene.node("b").unwrap();
        assert_eq!(b.position, Pos2::new(120.0, 0.0));
        assert_eq!(b.radius, 10.0);
        assert_eq!(scene.links[0].target, b.position);
    }
}
