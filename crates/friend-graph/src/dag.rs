//! Dependency graphs and their transitive reduction.
//!
//! Records name their dependencies by uri; every referenced uri becomes a
//! node even when no record describes it. [`DependencyGraph::prune`] drops
//! every edge whose endpoints stay connected without it, which leaves the
//! minimal edge set with the same reachability.

use petgraph::algo::{has_path_connecting, is_cyclic_directed};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{GraphError, Result};

/// One dependency declaration as it arrives from a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRecord {
    pub uri: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl DependencyRecord {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(deps.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyNode {
    pub uri: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub kind: Option<String>,
}

impl DependencyNode {
    fn bare(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            label: None,
            description: None,
            kind: None,
        }
    }

    /// Label, falling back to the uri.
    pub fn display(&self) -> &str {
        self.label
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.uri)
    }
}

/// Directed graph of `dependent -> dependency` edges.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
    index: BTreeMap<String, usize>,
    graph: DiGraphMap<usize, ()>,
}

impl DependencyGraph {
    pub fn from_records(records: &[DependencyRecord]) -> Self {
        let mut dag = Self::default();
        for record in records {
            let from = dag.ensure(&record.uri);
            let node = &mut dag.nodes[from];
            node.label = node.label.take().or_else(|| record.label.clone());
            node.description = node.description.take().or_else(|| record.description.clone());
            node.kind = node.kind.take().or_else(|| record.kind.clone());

            for dep in &record.depends_on {
                let to = dag.ensure(dep);
                if from != to {
                    dag.graph.add_edge(from, to, ());
                }
            }
        }
        dag
    }

    fn ensure(&mut self, uri: &str) -> usize {
        if let Some(&ix) = self.index.get(uri) {
            return ix;
        }
        let ix = self.nodes.len();
        self.nodes.push(DependencyNode::bare(uri));
        self.index.insert(uri.to_string(), ix);
        self.graph.add_node(ix);
        ix
    }

    pub fn nodes(&self) -> &[DependencyNode] {
        &self.nodes
    }

    pub fn node(&self, uri: &str) -> Option<&DependencyNode> {
        self.index.get(uri).map(|&ix| &self.nodes[ix])
    }

    /// Dependencies and dependents of `uri`, sorted.
    pub fn neighbors(&self, uri: &str) -> Vec<&str> {
        let Some(&ix) = self.index.get(uri) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = self
            .graph
            .neighbors_directed(ix, Direction::Outgoing)
            .chain(self.graph.neighbors_directed(ix, Direction::Incoming))
            .map(|n| self.nodes[n].uri.as_str())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn degree(&self, uri: &str) -> usize {
        self.neighbors(uri).len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Edges as `(dependent, dependency)` uris, sorted.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        let mut edges: Vec<(&str, &str)> = self
            .graph
            .all_edges()
            .map(|(a, b, _)| (self.nodes[a].uri.as_str(), self.nodes[b].uri.as_str()))
            .collect();
        edges.sort_unstable();
        edges
    }

    pub fn is_cyclic(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Greedy transitive reduction.
    ///
    /// Edges are tried in `(source, target)` uri order. An edge is dropped
    /// when its target is still reachable from its source without it.
    /// Returns the number of edges removed.
    pub fn prune(&mut self) -> Result<usize> {
        if self.is_cyclic() {
            return Err(GraphError::Cyclic);
        }

        let candidates: Vec<(usize, usize)> = {
            let mut by_uri: Vec<(&str, &str, usize, usize)> = self
                .graph
                .all_edges()
                .map(|(a, b, _)| (self.nodes[a].uri.as_str(), self.nodes[b].uri.as_str(), a, b))
                .collect();
            by_uri.sort_unstable();
            by_uri.into_iter().map(|(_, _, a, b)| (a, b)).collect()
        };

        let mut removed = 0;
        for (a, b) in candidates {
            self.graph.remove_edge(a, b);
            if has_path_connecting(&self.graph, a, b, None) {
                removed += 1;
            } else {
                self.graph.add_edge(a, b, ());
            }
        }

        debug!(removed, remaining = self.graph.edge_count(), "pruned dependency graph");
        Ok(removed)
    }
}
