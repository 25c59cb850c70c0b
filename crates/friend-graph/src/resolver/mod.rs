//! Resolver capability: turn an identity reference into display attributes
//! and outgoing relationship references.
//!
//! The crawler only sees the [`Resolver`] trait. Rate limiting and an outer
//! timeout are applied by the crawler around each call, so implementations
//! can be plain async lookups. [`ProfileResolver`] also bounds every
//! document fetch on its own.

pub mod http;
pub mod memory;
pub mod profile;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ResolveError;

pub use http::HttpDocumentSource;
pub use memory::{MemoryDocumentSource, StaticResolver};
pub use profile::{
    DocumentSource, ProfileDocument, ProfileRecord, ProfileResolver, DEFAULT_FETCH_TIMEOUT,
};

/// What a successful lookup yields. Edges are raw (not yet canonical) ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub display_name: Option<String>,
    pub image_ref: Option<String>,
    pub edges: Vec<String>,
}

impl Profile {
    /// Builder: profile with only outgoing edges.
    pub fn with_edges<I, S>(edges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            edges: edges.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

#[async_trait]
pub trait Resolver: Send + Sync {
    /// Look up one identity. Must be safe to call concurrently.
    async fn resolve(&self, id: &str) -> Result<Profile, ResolveError>;
}

#[async_trait]
impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    async fn resolve(&self, id: &str) -> Result<Profile, ResolveError> {
        (**self).resolve(id).await
    }
}
