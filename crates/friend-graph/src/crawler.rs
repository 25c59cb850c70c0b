//! Frontier crawler: breadth-first discovery over the resolver.
//!
//! # Rounds
//!
//! ```text
//! seeds ──canon──► node map ──► snapshot
//!                     │
//!        ┌────────────┴─────────────┐
//!        │ round = all Pending nodes │◄────────────┐
//!        └────────────┬─────────────┘             │
//!                     ▼                           │
//!      resolve each concurrently                  │
//!      (rate limiter admission + timeout)         │
//!                     │ each completion           │
//!                     ▼                           │
//!      Success: record edges, add new Pending ────┘
//!      Error:   no edges, nothing added
//!                     │
//!                     ▼
//!                 snapshot
//! ```
//!
//! The crawl ends when a round would be empty, or at the first round
//! boundary after `cancel()`. Lookups already in flight always finish.
//! The node map is only ever mutated from this module's control flow;
//! consumers get immutable [`Snapshot`]s.

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::canonical::Canonicalize;
use crate::config::CrawlConfig;
use crate::error::{GraphError, ResolveError, Result};
use crate::identity::{CanonicalId, IdentityNode, NodeMap, NodeStatus, Snapshot};
use crate::rate_limit::RateLimiter;
use crate::resolver::{Profile, Resolver};

/// Default per-attempt bound on a whole resolution. Matches
/// [`CrawlConfig::resolve_timeout`] for the default config.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_millis(48_000);

// =============================================================================
// CANCELLATION
// =============================================================================

/// Cooperative cancellation flag, checked before every round.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// =============================================================================
// REPORT
// =============================================================================

/// Summary of a finished crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    /// Rounds that resolved at least one node.
    pub rounds: usize,
    pub resolved: usize,
    pub failed: usize,
    /// Nodes still pending when the crawl stopped.
    pub pending: usize,
    pub nodes: usize,
    pub cancelled: bool,
}

// =============================================================================
// CRAWLER
// =============================================================================

/// Breadth-first crawler. Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct Crawler {
    resolver: Arc<dyn Resolver>,
    limiter: Arc<RateLimiter>,
    canon: Arc<dyn Canonicalize>,
    resolve_timeout: Duration,
    max_nodes: Option<usize>,
}

impl std::fmt::Debug for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("limiter", &self.limiter)
            .field("resolve_timeout", &self.resolve_timeout)
            .field("max_nodes", &self.max_nodes)
            .finish_non_exhaustive()
    }
}

impl Crawler {
    pub fn new(
        resolver: Arc<dyn Resolver>,
        limiter: Arc<RateLimiter>,
        canon: Arc<dyn Canonicalize>,
    ) -> Self {
        Self {
            resolver,
            limiter,
            canon,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            max_nodes: None,
        }
    }

    /// Build a crawler with its own limiter and canonicalizer from config.
    pub fn from_config(resolver: Arc<dyn Resolver>, config: &CrawlConfig) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
        let canon = Arc::new(config.canonicalizer()?);
        Ok(Self::new(resolver, limiter, canon)
            .with_resolve_timeout(config.resolve_timeout())
            .with_max_nodes(config.max_nodes))
    }

    /// Bound on one whole `resolve` call. Resolvers with their own per-fetch
    /// timeouts should be given a strictly larger bound here.
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: Option<usize>) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn canonicalizer(&self) -> &dyn Canonicalize {
        self.canon.as_ref()
    }

    /// Spawn the crawl on the current tokio runtime.
    ///
    /// `on_snapshot` is called once with the seeded map, then after every
    /// single node completion.
    pub fn start<F>(&self, seeds: Vec<IdentityNode>, on_snapshot: F) -> CrawlHandle
    where
        F: FnMut(Snapshot) + Send + 'static,
    {
        let cancel = CancelFlag::new();
        let crawler = self.clone();
        let flag = cancel.clone();
        let task = tokio::spawn(async move { crawler.run(seeds, on_snapshot, flag).await });
        CrawlHandle { cancel, task }
    }

    /// Run the crawl to completion (or cancellation) on the calling task.
    pub async fn run<F>(
        &self,
        seeds: Vec<IdentityNode>,
        mut on_snapshot: F,
        cancel: CancelFlag,
    ) -> CrawlReport
    where
        F: FnMut(Snapshot),
    {
        let mut nodes = self.seed(seeds);
        let mut report = CrawlReport::default();
        info!(seeds = nodes.len(), "start crawling");
        on_snapshot(Arc::new(nodes.clone()));

        loop {
            if cancel.is_cancelled() {
                info!(round = report.rounds, "crawl cancelled");
                report.cancelled = true;
                break;
            }
            if let Some(max) = self.max_nodes {
                if nodes.len() >= max {
                    info!(nodes = nodes.len(), max, "node cap reached, stop crawling");
                    report.cancelled = true;
                    break;
                }
            }

            let frontier: Vec<CanonicalId> = nodes
                .values()
                .filter(|node| node.status() == NodeStatus::Pending)
                .map(|node| node.id.clone())
                .collect();
            if frontier.is_empty() {
                break;
            }

            report.rounds += 1;
            info!(
                round = report.rounds,
                pending = frontier.len(),
                known = nodes.len(),
                "crawl round"
            );

            let mut in_flight: FuturesUnordered<_> = frontier
                .into_iter()
                .map(|id| self.resolve_one(id))
                .collect();

            while let Some((id, outcome)) = in_flight.next().await {
                self.apply(&mut nodes, &id, outcome, &mut report);
                on_snapshot(Arc::new(nodes.clone()));
            }
        }

        report.nodes = nodes.len();
        report.pending = nodes
            .values()
            .filter(|node| node.status() == NodeStatus::Pending)
            .count();
        info!(
            rounds = report.rounds,
            resolved = report.resolved,
            failed = report.failed,
            nodes = report.nodes,
            "stop crawling"
        );
        report
    }

    /// Canonicalize seeds, first one wins. Seeds that arrive already
    /// resolved bring their forward edges, whose targets join as Pending.
    fn seed(&self, seeds: Vec<IdentityNode>) -> NodeMap {
        let mut nodes = NodeMap::new();
        let mut targets = BTreeSet::new();
        for seed in seeds {
            if seed.id.as_str().trim().is_empty() {
                continue;
            }
            let id = self.canon.canonicalize(seed.id.as_str());
            if nodes.contains_key(&id) {
                continue;
            }
            let knows: BTreeSet<CanonicalId> = seed
                .knows()
                .iter()
                .filter(|edge| !edge.as_str().trim().is_empty())
                .map(|edge| self.canon.canonicalize(edge.as_str()))
                .collect();
            targets.extend(knows.iter().cloned());
            nodes.insert(id.clone(), Arc::new(seed.with_id(id).with_knows(knows)));
        }
        for target in targets {
            nodes
                .entry(target.clone())
                .or_insert_with(|| Arc::new(IdentityNode::pending(target)));
        }
        nodes
    }

    async fn resolve_one(&self, id: CanonicalId) -> (CanonicalId, std::result::Result<Profile, ResolveError>) {
        self.limiter.acquire().await;
        let outcome = match tokio::time::timeout(self.resolve_timeout, self.resolver.resolve(id.as_str())).await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::Timeout(self.resolve_timeout)),
        };
        (id, outcome)
    }

    fn apply(
        &self,
        nodes: &mut NodeMap,
        id: &CanonicalId,
        outcome: std::result::Result<Profile, ResolveError>,
        report: &mut CrawlReport,
    ) {
        match outcome {
            Ok(profile) => {
                let knows: BTreeSet<CanonicalId> = profile
                    .edges
                    .iter()
                    .filter(|edge| !edge.trim().is_empty())
                    .map(|edge| self.canon.canonicalize(edge))
                    .collect();

                let discovered = knows
                    .iter()
                    .filter(|target| !nodes.contains_key(*target))
                    .count();
                for target in &knows {
                    nodes
                        .entry(target.clone())
                        .or_insert_with(|| Arc::new(IdentityNode::pending(target.clone())));
                }

                let transition = match nodes.get_mut(id) {
                    Some(node) => Arc::make_mut(node).resolve(profile.display_name, profile.image_ref, knows),
                    None => Ok(()),
                };
                match transition {
                    Ok(()) => {
                        report.resolved += 1;
                        debug!(%id, discovered, "profile resolved");
                    }
                    Err(error) => warn!(%id, %error, "ignoring late resolution"),
                }
            }
            Err(error) => {
                warn!(%id, %error, "profile resolution failed");
                if let Some(node) = nodes.get_mut(id) {
                    match Arc::make_mut(node).fail() {
                        Ok(()) => report.failed += 1,
                        Err(error) => warn!(%id, %error, "ignoring late failure"),
                    }
                }
            }
        }
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// A running crawl.
#[derive(Debug)]
pub struct CrawlHandle {
    cancel: CancelFlag,
    task: JoinHandle<CrawlReport>,
}

impl CrawlHandle {
    /// Stop before the next round. In-flight lookups complete normally.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the crawl to end.
    pub async fn finished(self) -> Result<CrawlReport> {
        self.task
            .await
            .map_err(|e| GraphError::TaskAborted(e.to_string()))
    }
}
