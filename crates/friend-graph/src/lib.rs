//! Friend Graph
//!
//! Breadth-first crawler over identity profiles and the bidirectional graph
//! store fed by its snapshots. Layout and rendering live in `friend-layout`.

pub mod canonical;
pub mod config;
pub mod crawler;
pub mod dag;
pub mod error;
pub mod identity;
pub mod rate_limit;
pub mod resolver;
pub mod store;

pub use canonical::{AliasRules, Canonicalize, Verbatim};
pub use config::{AliasRule, CrawlConfig, RateLimitConfig};
pub use crawler::{CancelFlag, CrawlHandle, CrawlReport, Crawler, DEFAULT_RESOLVE_TIMEOUT};
pub use dag::{DependencyGraph, DependencyNode, DependencyRecord};
pub use error::{GraphError, ResolveError, Result};
pub use identity::{CanonicalId, IdentityNode, NodeMap, NodeStatus, Snapshot};
pub use rate_limit::RateLimiter;
pub use resolver::{
    DocumentSource, HttpDocumentSource, MemoryDocumentSource, Profile, ProfileDocument,
    ProfileRecord, ProfileResolver, Resolver, StaticResolver, DEFAULT_FETCH_TIMEOUT,
};
pub use store::{Graph, GraphStore, SearchHit, StatusCounts};
