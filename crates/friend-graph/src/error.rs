//! Error types for crawling, resolution and configuration.
//!
//! Resolution failures never escape a crawl: the crawler folds every
//! `ResolveError` into the node's `Error` status. `GraphError` is for the
//! things a caller can actually act on (bad config, misuse of the API).

use std::time::Duration;

use crate::identity::NodeStatus;

/// Why a single profile lookup failed.
///
/// All variants collapse into `NodeStatus::Error` for crawl purposes; the
/// variant is only kept for logging.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The lookup did not finish within the per-attempt bound.
    #[error("resolution timed out after {0:?}")]
    Timeout(Duration),

    /// The document could not be fetched (connection error, non-success status).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The document was fetched but does not describe the subject, or is malformed.
    #[error("unreadable profile document: {0}")]
    Parse(String),
}

/// Errors surfaced to callers of the graph crate.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("invalid alias pattern '{pattern}': {source}")]
    AliasPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("node {id} cannot move from {from} to {to}")]
    StatusTransition {
        id: String,
        from: NodeStatus,
        to: NodeStatus,
    },

    #[error("pruning requires an acyclic dependency graph")]
    Cyclic,

    #[error("crawl task aborted: {0}")]
    TaskAborted(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;
