//! Profile documents and the best-effort multi-document resolver.
//!
//! A person's profile may be spread over several documents linked by
//! `sameAs` / `seeAlso`. Only the primary document (the one the id itself
//! points into) is required; every linked document is optional and its
//! failures are swallowed.
//!
//! Every fetch has its own timeout. Linked documents additionally share one
//! deadline of `fetch_timeout * max_depth`, so a resolution never takes
//! longer than [`ProfileResolver::time_bound`].
//!
//! Documents are JSON:
//!
//! ```json
//! {
//!   "subjects": {
//!     "https://alice.example/profile/card#me": {
//!       "name": "Alice",
//!       "hasPhoto": "https://alice.example/me.jpg",
//!       "knows": ["https://bob.example/profile/card#me"],
//!       "seeAlso": ["https://alice.example/extended.json"]
//!     }
//!   }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace};
use url::Url;

use super::{Profile, Resolver};
use crate::config::CrawlConfig;
use crate::error::ResolveError;

/// Default bound on a single document fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(8000);

/// A fetched document: every subject it describes, keyed by full id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDocument {
    #[serde(default)]
    pub subjects: HashMap<String, ProfileRecord>,
}

impl ProfileDocument {
    /// Builder: document describing one subject.
    pub fn single(subject: impl Into<String>, record: ProfileRecord) -> Self {
        let mut subjects = HashMap::new();
        subjects.insert(subject.into(), record);
        Self { subjects }
    }
}

/// What one document says about one subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub name: Option<String>,
    pub has_photo: Option<String>,
    pub img: Option<String>,
    #[serde(default)]
    pub knows: Vec<String>,
    #[serde(default)]
    pub same_as: Vec<String>,
    #[serde(default)]
    pub see_also: Vec<String>,
}

impl ProfileRecord {
    fn photo(&self) -> Option<&str> {
        self.has_photo
            .as_deref()
            .or(self.img.as_deref())
            .filter(|p| !p.is_empty())
    }

    fn linked(&self) -> impl DoubleEndedIterator<Item = &String> {
        self.same_as.iter().chain(self.see_also.iter())
    }
}

/// Where profile documents come from.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, document_url: &str) -> Result<ProfileDocument, ResolveError>;
}

/// The document holding an id: the id without its fragment.
pub fn document_url(iri: &str) -> String {
    match Url::parse(iri) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => iri.split('#').next().unwrap_or(iri).to_string(),
    }
}

/// `timeout` from now, or thirty years out when that overflows `Instant`.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(86_400 * 365 * 30))
}

/// Resolver that reads the primary profile document and chases linked ones.
#[derive(Debug, Clone)]
pub struct ProfileResolver<S> {
    source: S,
    max_depth: usize,
    fetch_timeout: Duration,
}

impl<S: DocumentSource> ProfileResolver<S> {
    pub fn new(source: S, max_depth: usize) -> Self {
        Self {
            source,
            max_depth,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Depth and per-fetch timeout taken from the crawl config.
    pub fn from_config(source: S, config: &CrawlConfig) -> Self {
        Self::new(source, config.secondary_depth).with_fetch_timeout(config.fetch_timeout())
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Longest a single `resolve` can take: the primary fetch plus the
    /// shared deadline for linked documents.
    pub fn time_bound(&self) -> Duration {
        let hops = u32::try_from(self.max_depth).unwrap_or(u32::MAX);
        self.fetch_timeout.saturating_mul(hops.saturating_add(1))
    }

    async fn fetch_until(&self, url: &str, deadline: Instant) -> Result<ProfileDocument, ResolveError> {
        let limit = deadline.min(deadline_after(self.fetch_timeout));
        match timeout_at(limit, self.source.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::Timeout(self.fetch_timeout)),
        }
    }

    /// Collect every record describing `subject`, primary document first.
    ///
    /// `visited` holds every iri already fetched; linked iris found in it are
    /// skipped, which breaks `sameAs` cycles. Linked documents deeper than
    /// `max_depth` hops are not fetched. A primary timeout is an error; a
    /// linked document that times out is skipped like any other failure.
    pub async fn collect_records(
        &self,
        subject: &str,
        visited: &mut HashSet<String>,
    ) -> Result<Vec<ProfileRecord>, ResolveError> {
        visited.insert(subject.to_string());
        let primary = self
            .fetch_until(&document_url(subject), deadline_after(self.fetch_timeout))
            .await?;
        let record = primary
            .subjects
            .get(subject)
            .cloned()
            .ok_or_else(|| ResolveError::Parse(format!("document does not describe {subject}")))?;

        // Depth-first, in document order.
        let mut stack: Vec<(String, usize)> =
            record.linked().rev().map(|iri| (iri.clone(), 1)).collect();
        let mut records = vec![record];
        let hops = u32::try_from(self.max_depth).unwrap_or(u32::MAX);
        let deadline = deadline_after(self.fetch_timeout.saturating_mul(hops));

        while let Some((iri, depth)) = stack.pop() {
            if depth > self.max_depth {
                trace!(%iri, depth, "linked profile document beyond depth bound");
                continue;
            }
            if !visited.insert(iri.clone()) {
                continue;
            }
            if Instant::now() >= deadline {
                debug!(subject, pending = stack.len() + 1, "linked profile documents out of time");
                break;
            }
            match self.fetch_until(&document_url(&iri), deadline).await {
                Ok(document) => {
                    if let Some(found) = document.subjects.get(subject) {
                        stack.extend(found.linked().rev().map(|next| (next.clone(), depth + 1)));
                        records.push(found.clone());
                    }
                }
                Err(error) => {
                    debug!(subject, %iri, %error, "linked profile document unavailable");
                }
            }
        }

        Ok(records)
    }
}

/// Fold records into one profile: de-duplicated edges in first-seen order,
/// first non-empty name and photo.
pub fn merge_records(records: &[ProfileRecord]) -> Profile {
    let mut profile = Profile::default();
    let mut seen = HashSet::new();

    for record in records {
        for friend in &record.knows {
            if seen.insert(friend.as_str()) {
                profile.edges.push(friend.clone());
            }
        }
        if profile.display_name.is_none() {
            profile.display_name = record.name.clone().filter(|n| !n.is_empty());
        }
        if profile.image_ref.is_none() {
            profile.image_ref = record.photo().map(str::to_string);
        }
    }

    profile
}

#[async_trait]
impl<S: DocumentSource> Resolver for ProfileResolver<S> {
    async fn resolve(&self, id: &str) -> Result<Profile, ResolveError> {
        let mut visited = HashSet::new();
        let records = self.collect_records(id, &mut visited).await?;
        Ok(merge_records(&records))
    }
}
