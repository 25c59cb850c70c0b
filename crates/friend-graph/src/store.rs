//! Bidirectional graph store.
//!
//! Every crawl snapshot replaces the current graph wholesale. Reverse edges
//! (`known`) are rebuilt from scratch on each replacement so they always
//! mirror the forward edges (`knows`) exactly.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::identity::{CanonicalId, IdentityNode, NodeMap, NodeStatus};

/// Queries shorter than this never match.
pub const MIN_QUERY_LEN: usize = 2;
/// Maximum number of search hits returned.
pub const MAX_SEARCH_HITS: usize = 10;

// =============================================================================
// GRAPH
// =============================================================================

/// One consistent view of the crawl, with reverse edges filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Graph {
    nodes: BTreeMap<CanonicalId, IdentityNode>,
}

/// A search result: the node id and the text to show for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub value: CanonicalId,
    pub label: String,
}

/// Node counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub success: usize,
    pub error: usize,
}

impl Graph {
    /// Build from a crawl snapshot, discarding any stale reverse edges.
    pub fn from_snapshot(snapshot: &NodeMap) -> Self {
        let mut nodes: BTreeMap<CanonicalId, IdentityNode> = snapshot
            .iter()
            .map(|(id, node)| {
                let mut node = IdentityNode::clone(node);
                node.known.clear();
                (id.clone(), node)
            })
            .collect();

        let edges: Vec<(CanonicalId, CanonicalId)> = nodes
            .values()
            .flat_map(|node| node.knows().iter().map(|t| (node.id.clone(), t.clone())))
            .collect();

        let mut dangling = 0usize;
        for (source, target) in edges {
            match nodes.get_mut(&target) {
                Some(node) => {
                    node.known.insert(source);
                }
                None => dangling += 1,
            }
        }
        if dangling > 0 {
            debug!(dangling, "snapshot holds edges to absent nodes");
        }

        Self { nodes }
    }

    pub fn get(&self, id: &str) -> Option<&IdentityNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &IdentityNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every forward edge `(source, target)`, ordered by source then target.
    pub fn edges(&self) -> impl Iterator<Item = (&CanonicalId, &CanonicalId)> {
        self.nodes
            .values()
            .flat_map(|node| node.knows().iter().map(move |target| (&node.id, target)))
    }

    /// `knows ∪ known` of a node.
    pub fn neighbors(&self, id: &str) -> Vec<&CanonicalId> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<&CanonicalId> = node.knows().iter().chain(node.known().iter()).collect();
        out.sort();
        out.dedup();
        out
    }

    /// Distinct neighbors of a node.
    pub fn degree(&self, id: &str) -> usize {
        self.neighbors(id).len()
    }

    /// Case-insensitive substring match on display name or id.
    ///
    /// Hits are ranked by how many nodes point at them, most first; ties keep
    /// id order.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Vec::new();
        }
        let needle = query.to_lowercase();

        let mut hits: Vec<&IdentityNode> = self
            .nodes
            .values()
            .filter(|node| {
                node.id.as_str().to_lowercase().contains(&needle)
                    || node
                        .display_name
                        .as_deref()
                        .is_some_and(|name| name.to_lowercase().contains(&needle))
            })
            .collect();
        hits.sort_by(|a, b| b.known().len().cmp(&a.known().len()));

        hits.into_iter()
            .take(MAX_SEARCH_HITS)
            .map(|node| SearchHit {
                value: node.id.clone(),
                label: node.label().to_string(),
            })
            .collect()
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for node in self.nodes.values() {
            match node.status() {
                NodeStatus::Pending => counts.pending += 1,
                NodeStatus::Success => counts.success += 1,
                NodeStatus::Error => counts.error += 1,
            }
        }
        counts
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Holds the current [`Graph`] and notifies subscribers on every change.
#[derive(Debug)]
pub struct GraphStore {
    tx: watch::Sender<Arc<Graph>>,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Graph::default()));
        Self { tx }
    }

    /// Replace the current graph with one built from `snapshot`.
    pub fn publish(&self, snapshot: &NodeMap) -> Arc<Graph> {
        let graph = Arc::new(Graph::from_snapshot(snapshot));
        self.tx.send_replace(graph.clone());
        graph
    }

    pub fn current(&self) -> Arc<Graph> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Graph>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn id(s: &str) -> CanonicalId {
        CanonicalId::new(s)
    }

    fn resolved(name: &str, display: Option<&str>, knows: &[&str]) -> (CanonicalId, Arc<IdentityNode>) {
        let mut node = IdentityNode::pending(id(name));
        node.resolve(
            display.map(str::to_string),
            None,
            knows.iter().map(|k| id(k)).collect(),
        )
        .unwrap();
        (id(name), Arc::new(node))
    }

    fn pending(name: &str) -> (CanonicalId, Arc<IdentityNode>) {
        (id(name), Arc::new(IdentityNode::pending(id(name))))
    }

    fn set(items: &[&str]) -> BTreeSet<CanonicalId> {
        items.iter().map(|s| id(s)).collect()
    }

    fn sample() -> NodeMap {
        [
            resolved("a", Some("Alice"), &["b", "c"]),
            resolved("b", Some("Bob"), &["c"]),
            resolved("c", None, &["a"]),
            pending("d"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_reverse_edges_mirror_forward_edges() {
        let graph = Graph::from_snapshot(&sample());
        assert_eq!(graph.get("a").unwrap().known(), &set(&["c"]));
        assert_eq!(graph.get("b").unwrap().known(), &set(&["a"]));
        assert_eq!(graph.get("c").unwrap().known(), &set(&["a", "b"]));
        assert!(graph.get("d").unwrap().known().is_empty());

        for (source, target) in graph.edges() {
            assert!(graph.get(target.as_str()).unwrap().known().contains(source));
        }
    }

    #[test]
    fn test_stale_reverse_edges_discarded() {
        let mut map = sample();
        let (key, node) = pending("e");
        let mut stale = IdentityNode::clone(&node);
        stale.known.insert(id("ghost"));
        map.insert(key, Arc::new(stale));

        let graph = Graph::from_snapshot(&map);
        assert!(graph.get("e").unwrap().known().is_empty());
    }

    #[test]
    fn test_neighbors_and_degree() {
        let graph = Graph::from_snapshot(&sample());
        let n: Vec<&str> = graph.neighbors("a").into_iter().map(|i| i.as_str()).collect();
        assert_eq!(n, vec!["b", "c"]);
        assert_eq!(graph.degree("c"), 2);
        assert_eq!(graph.degree("d"), 0);
        assert_eq!(graph.degree("missing"), 0);
    }

    #[test]
    fn test_search_short_query_returns_nothing() {
        let graph = Graph::from_snapshot(&sample());
        assert!(graph.search("a").is_empty());
        assert!(graph.search(" b ").is_empty());
    }

    #[test]
    fn test_search_matches_name_or_id() {
        let graph = Graph::from_snapshot(&sample());
        let hits = graph.search("LI");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, id("a"));
        assert_eq!(hits[0].label, "Alice");
    }

    #[test]
    fn test_search_ranks_by_incoming_edges() {
        let map: NodeMap = [
            resolved("team-1", Some("Team One"), &["team-3"]),
            resolved("team-2", None, &["team-3", "team-1"]),
            resolved("team-3", None, &[]),
            resolved("other", None, &["team-3"]),
        ]
        .into_iter()
        .collect();
        let graph = Graph::from_snapshot(&map);

        let labels: Vec<String> = graph.search("team").into_iter().map(|h| h.label).collect();
        assert_eq!(labels, vec!["team-3", "Team One", "team-2"]);
    }

    #[test]
    fn test_search_caps_results() {
        let map: NodeMap = (0..25)
            .map(|i| {
                let name = format!("node-{i:02}");
                (id(&name), Arc::new(IdentityNode::pending(id(&name))))
            })
            .collect();
        let graph = Graph::from_snapshot(&map);
        assert_eq!(graph.search("node").len(), MAX_SEARCH_HITS);
    }

    #[test]
    fn test_status_counts() {
        let counts = Graph::from_snapshot(&sample()).status_counts();
        assert_eq!(
            counts,
            StatusCounts {
                pending: 1,
                success: 3,
                error: 0
            }
        );
    }

    #[tokio::test]
    async fn test_store_notifies_subscribers() {
        let store = GraphStore::new();
        let mut rx = store.subscribe();
        assert!(store.current().is_empty());

        store.publish(&sample());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 4);
        assert_eq!(store.current().len(), 4);
    }
}
