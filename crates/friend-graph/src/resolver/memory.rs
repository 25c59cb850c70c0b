//! In-memory resolvers for tests and demos.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::profile::{DocumentSource, ProfileDocument};
use super::{Profile, Resolver};
use crate::error::ResolveError;

#[derive(Debug, Clone)]
enum Scripted {
    Ready(Profile),
    Delayed(Duration, Profile),
    Failing(ResolveError),
    Hanging,
}

/// Resolver answering from a fixed table of scripted outcomes.
///
/// Unknown ids fail with a transport error. Every call is recorded so tests
/// can assert how often an id was looked up.
#[derive(Debug, Default)]
pub struct StaticResolver {
    entries: HashMap<String, Scripted>,
    calls: Mutex<Vec<String>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, id: impl Into<String>, profile: Profile) -> Self {
        self.entries.insert(id.into(), Scripted::Ready(profile));
        self
    }

    /// Shorthand for a profile that only lists friends.
    pub fn with_friends(self, id: impl Into<String>, friends: &[&str]) -> Self {
        self.with_profile(id, Profile::with_edges(friends.iter().copied()))
    }

    pub fn with_delay(mut self, id: impl Into<String>, delay: Duration, profile: Profile) -> Self {
        self.entries.insert(id.into(), Scripted::Delayed(delay, profile));
        self
    }

    pub fn with_failure(mut self, id: impl Into<String>, error: ResolveError) -> Self {
        self.entries.insert(id.into(), Scripted::Failing(error));
        self
    }

    /// The lookup never completes; only the crawler's timeout ends it.
    pub fn with_hang(mut self, id: impl Into<String>) -> Self {
        self.entries.insert(id.into(), Scripted::Hanging);
        self
    }

    /// Ids in the order they were looked up.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self, id: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == id).count()
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, id: &str) -> Result<Profile, ResolveError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(id.to_string());

        match self.entries.get(id).cloned() {
            Some(Scripted::Ready(profile)) => Ok(profile),
            Some(Scripted::Delayed(delay, profile)) => {
                tokio::time::sleep(delay).await;
                Ok(profile)
            }
            Some(Scripted::Failing(error)) => Err(error),
            Some(Scripted::Hanging) => std::future::pending().await,
            None => Err(ResolveError::Transport(format!("no profile for {id}"))),
        }
    }
}

/// Document source backed by a map of document url -> document.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentSource {
    documents: HashMap<String, ProfileDocument>,
    hanging: HashSet<String>,
    fetches: Arc<AtomicUsize>,
}

impl MemoryDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, url: impl Into<String>, document: ProfileDocument) -> Self {
        self.documents.insert(url.into(), document);
        self
    }

    /// Fetching `url` never completes.
    pub fn with_hang(mut self, url: impl Into<String>) -> Self {
        self.hanging.insert(url.into());
        self
    }

    /// Number of fetches served (or refused) so far, shared between clones.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSource for MemoryDocumentSource {
    async fn fetch(&self, document_url: &str) -> Result<ProfileDocument, ResolveError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.hanging.contains(document_url) {
            return std::future::pending().await;
        }
        self.documents
            .get(document_url)
            .cloned()
            .ok_or_else(|| ResolveError::Transport(format!("HTTP 404 for {document_url}")))
    }
}
