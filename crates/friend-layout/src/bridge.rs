//! Bridge from graph views to layout input and scene styling.
//!
//! Node radius grows sub-linearly with degree so hubs stand out without
//! swallowing their neighbourhood.

use friend_graph::{DependencyGraph, Graph, NodeStatus};

use crate::config::LayoutConfig;
use crate::force_sim::{LayoutInput, LayoutLink, LayoutNode};
use crate::scene::SceneSource;

/// Layout input for the crawled friend graph: one node per identity, one
/// link per `knows` edge.
pub fn graph_input(graph: &Graph, config: &LayoutConfig) -> LayoutInput {
    let nodes = graph
        .nodes()
        .map(|node| {
            LayoutNode::new(
                node.id.as_str(),
                node.label(),
                config.node_radius(graph.degree(node.id.as_str())),
            )
        })
        .collect();
    let links = graph
        .edges()
        .map(|(source, target)| LayoutLink::new(source.as_str(), target.as_str()))
        .collect();
    LayoutInput { nodes, links }
}

/// Layout input for a dependency graph, one link per `dependent ->
/// dependency` edge. Lay it out with [`LayoutConfig::dependency_dag`] so
/// dependents stack below their dependencies.
pub fn dependency_input(dag: &DependencyGraph, config: &LayoutConfig) -> LayoutInput {
    let nodes = dag
        .nodes()
        .iter()
        .map(|node| LayoutNode::new(node.uri.as_str(), node.display(), config.node_radius(dag.degree(&node.uri))))
        .collect();
    let links = dag
        .edges()
        .into_iter()
        .map(|(source, target)| LayoutLink::new(source, target))
        .collect();
    LayoutInput { nodes, links }
}

impl SceneSource for Graph {
    fn status(&self, id: &str) -> Option<NodeStatus> {
        self.get(id).map(|node| node.status())
    }

    fn display_name(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(|node| node.display_name.as_deref())
    }

    fn neighbor_ids(&self, id: &str) -> Vec<String> {
        self.neighbors(id).into_iter().map(|n| n.to_string()).collect()
    }
}

impl SceneSource for DependencyGraph {
    fn status(&self, _id: &str) -> Option<NodeStatus> {
        None
    }

    fn display_name(&self, id: &str) -> Option<&str> {
        self.node(id).and_then(|node| node.label.as_deref())
    }

    fn neighbor_ids(&self, id: &str) -> Vec<String> {
        self.neighbors(id).into_iter().map(str::to_string).collect()
    }
}
