//! Identity nodes: one discovered entity of the social graph.
//!
//! A node starts `Pending` and moves exactly once, to `Success` or `Error`.
//! The transition methods enforce that; there is no way back to `Pending`.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::error::{GraphError, Result};

/// Canonical identity reference, the unique key of the node map.
///
/// Produced by a [`Canonicalize`](crate::canonical::Canonicalize)
/// implementation. The crawler re-canonicalizes every id it is handed, so
/// wrapping a raw string with [`CanonicalId::new`] is safe for seeds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CanonicalId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Resolution status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Success,
    Error,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Success => "success",
            NodeStatus::Error => "error",
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, NodeStatus::Pending)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discovered entity.
///
/// `knows` holds forward edges and is only filled on success. `known` holds
/// reverse edges; the crawler never touches it, the graph store recomputes it
/// from the complete forward-edge set on every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityNode {
    pub id: CanonicalId,
    pub display_name: Option<String>,
    pub image_ref: Option<String>,
    status: NodeStatus,
    knows: BTreeSet<CanonicalId>,
    #[serde(default)]
    pub(crate) known: BTreeSet<CanonicalId>,
}

impl IdentityNode {
    /// A node awaiting resolution.
    pub fn pending(id: CanonicalId) -> Self {
        Self {
            id,
            display_name: None,
            image_ref: None,
            status: NodeStatus::Pending,
            knows: BTreeSet::new(),
            known: BTreeSet::new(),
        }
    }

    /// Builder: preset display name (e.g. a seed the user already knows).
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub(crate) fn with_id(mut self, id: CanonicalId) -> Self {
        self.id = id;
        self
    }

    pub(crate) fn with_knows(mut self, knows: BTreeSet<CanonicalId>) -> Self {
        self.knows = knows;
        self
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn knows(&self) -> &BTreeSet<CanonicalId> {
        &self.knows
    }

    pub fn known(&self) -> &BTreeSet<CanonicalId> {
        &self.known
    }

    /// Display name, falling back to the id.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(self.id.as_str())
    }

    /// `Pending -> Success`, recording attributes and forward edges.
    pub fn resolve(
        &mut self,
        display_name: Option<String>,
        image_ref: Option<String>,
        knows: BTreeSet<CanonicalId>,
    ) -> Result<()> {
        self.transition(NodeStatus::Success)?;
        if display_name.is_some() {
            self.display_name = display_name;
        }
        if image_ref.is_some() {
            self.image_ref = image_ref;
        }
        self.knows = knows;
        Ok(())
    }

    /// `Pending -> Error`. Forward edges stay empty.
    pub fn fail(&mut self) -> Result<()> {
        self.transition(NodeStatus::Error)
    }

    fn transition(&mut self, to: NodeStatus) -> Result<()> {
        if self.status != NodeStatus::Pending {
            return Err(GraphError::StatusTransition {
                id: self.id.to_string(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

/// The crawler's node map. Values are shared so snapshots are cheap to take.
pub type NodeMap = BTreeMap<CanonicalId, Arc<IdentityNode>>;

/// Immutable snapshot of the node map, as published after every completion.
pub type Snapshot = Arc<NodeMap>;

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> CanonicalId {
        CanonicalId::new(s)
    }

    #[test]
    fn test_pending_to_success() {
        let mut node = IdentityNode::pending(id("https://a.example/card#me"));
        let knows: BTreeSet<_> = [id("https://b.example/card#me")].into_iter().collect();
        node.resolve(Some("Alice".into()), None, knows.clone())
            .unwrap();

        assert_eq!(node.status(), NodeStatus::Success);
        assert_eq!(node.knows(), &knows);
        assert_eq!(node.label(), "Alice");
    }

    #[test]
    fn test_pending_to_error_keeps_edges_empty() {
        let mut node = IdentityNode::pending(id("a"));
        node.fail().unwrap();
        assert_eq!(node.status(), NodeStatus::Error);
        assert!(node.knows().is_empty());
    }

    #[test]
    fn test_settled_status_never_changes() {
        let mut node = IdentityNode::pending(id("a"));
        node.fail().unwrap();

        let err = node.resolve(None, None, BTreeSet::new()).unwrap_err();
        assert!(matches!(
            err,
            GraphError::StatusTransition {
                from: NodeStatus::Error,
                to: NodeStatus::Success,
                ..
            }
        ));
        assert_eq!(node.status(), NodeStatus::Error);

        let mut ok = IdentityNode::pending(id("b"));
        ok.resolve(None, None, BTreeSet::new()).unwrap();
        assert!(ok.fail().is_err());
        assert_eq!(ok.status(), NodeStatus::Success);
    }

    #[test]
    fn test_label_falls_back_to_id() {
        let node = IdentityNode::pending(id("https://c.example/#i"));
        assert_eq!(node.label(), "https://c.example/#i");

        let named = IdentityNode::pending(id("x")).with_display_name("");
        assert_eq!(named.label(), "x");
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&NodeStatus::Success).unwrap();
        assert_eq!(json, "\"success\"");
    }
}
