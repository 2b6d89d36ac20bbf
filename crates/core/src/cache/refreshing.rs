//! One cached value with stale-while-revalidate refresh and single-flight loading.
//!
//! State transitions happen under a single mutex, so at most one collection
//! per cache is outstanding at any time. Collections run as spawned tasks:
//! the callers waiting on one share its result, and a caller giving up does
//! not cancel it.

use super::policy::{ErrorPolicy, Freshness, FreshnessPolicy};
use crate::{error::CoreError, model::Snapshot};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Blocking routine producing one snapshot. Runs on the blocking pool.
pub type CollectFn<T> = Arc<dyn Fn() -> Snapshot<T> + Send + Sync>;

type PendingCollection<T> = Shared<BoxFuture<'static, Snapshot<T>>>;

/// Error texts used when the collection itself breaks down
#[derive(Debug, Clone, Copy)]
pub struct FailureMessages {
    pub failed: &'static str,
    pub timed_out: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub policy: FreshnessPolicy,
    pub errors: ErrorPolicy,
    /// Wall-clock bound on a single collection
    pub collect_timeout: Duration,
}

struct CacheEntry<T> {
    value: Option<Snapshot<T>>,
    fetched_at: Option<Instant>,
}

impl<T> CacheEntry<T> {
    fn empty() -> Self {
        Self {
            value: None,
            fetched_at: None,
        }
    }
}

struct Flight<T> {
    generation: u64,
    pending: PendingCollection<T>,
}

enum RefreshState<T> {
    Idle,
    InFlight(Flight<T>),
    BackgroundRefreshing(Flight<T>),
}

impl<T> RefreshState<T> {
    fn flight(&self) -> Option<&Flight<T>> {
        match self {
            Self::Idle => None,
            Self::InFlight(flight) | Self::BackgroundRefreshing(flight) => Some(flight),
        }
    }

    fn activity(&self) -> RefreshActivity {
        match self {
            Self::Idle => RefreshActivity::Idle,
            Self::InFlight(_) => RefreshActivity::InFlight,
            Self::BackgroundRefreshing(_) => RefreshActivity::Background,
        }
    }
}

struct CacheState<T> {
    entry: CacheEntry<T>,
    refresh: RefreshState<T>,
    /// Bumped by invalidation; results of older collections are not stored
    generation: u64,
    collections: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Foreground,
    Background,
}

enum Next<T> {
    Serve(Snapshot<T>),
    Join(PendingCollection<T>),
    /// A collection from before an invalidation is still running
    WaitAndRetry(PendingCollection<T>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshActivity {
    Idle,
    InFlight,
    Background,
}

/// Point-in-time view of a cache for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub kind: &'static str,
    pub populated: bool,
    pub age_secs: Option<f64>,
    pub freshness: Option<Freshness>,
    pub holds_error: bool,
    pub refresh: RefreshActivity,
    pub collections: u64,
}

pub struct RefreshingCache<T> {
    kind: &'static str,
    settings: CacheSettings,
    messages: FailureMessages,
    collect: CollectFn<T>,
    state: Arc<Mutex<CacheState<T>>>,
}

impl<T> RefreshingCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(
        kind: &'static str,
        settings: CacheSettings,
        messages: FailureMessages,
        collect: CollectFn<T>,
    ) -> Self {
        Self {
            kind,
            settings,
            messages,
            collect,
            state: Arc::new(Mutex::new(CacheState {
                entry: CacheEntry::empty(),
                refresh: RefreshState::Idle,
                generation: 0,
                collections: 0,
            })),
        }
    }

    /// Current snapshot. Suspends only when no servable value exists.
    pub async fn get(&self) -> Snapshot<T> {
        loop {
            match self.next_step() {
                Next::Serve(value) => return value,
                Next::Join(pending) => return pending.await,
                Next::WaitAndRetry(pending) => {
                    pending.await;
                }
            }
        }
    }

    /// Drops the cached value; the next `get` collects again
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.entry = CacheEntry::empty();
        debug!(kind = self.kind, generation = state.generation, "cache invalidated");
    }

    pub fn fetched_at(&self) -> Option<Instant> {
        self.state.lock().entry.fetched_at
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.lock().refresh.flight().is_some()
    }

    /// Number of collections started since construction
    pub fn collections(&self) -> u64 {
        self.state.lock().collections
    }

    pub fn status(&self) -> CacheStatus {
        let state = self.state.lock();
        let age = state.entry.fetched_at.map(|at| at.elapsed());
        let freshness = match (&state.entry.value, age) {
            (Some(value), Some(age)) => Some(self.policy_for(value).classify(age)),
            _ => None,
        };
        CacheStatus {
            kind: self.kind,
            populated: state.entry.value.is_some(),
            age_secs: age.map(|age| age.as_secs_f64()),
            freshness,
            holds_error: state.entry.value.as_ref().is_some_and(Snapshot::is_error),
            refresh: state.refresh.activity(),
            collections: state.collections,
        }
    }

    fn policy_for(&self, value: &Snapshot<T>) -> FreshnessPolicy {
        if value.is_error() {
            self.settings.errors.effective(self.settings.policy)
        } else {
            self.settings.policy
        }
    }

    fn next_step(&self) -> Next<T> {
        let mut state = self.state.lock();

        let cached = match (&state.entry.value, state.entry.fetched_at) {
            (Some(value), Some(fetched_at)) => {
                Some((value.clone(), self.policy_for(value).classify(fetched_at.elapsed())))
            }
            _ => None,
        };
        if let Some((value, freshness)) = cached {
            match freshness {
                Freshness::Fresh => return Next::Serve(value),
                Freshness::Stale => {
                    if state.refresh.flight().is_none() {
                        debug!(kind = self.kind, "value is stale, refreshing in background");
                        let _ = self.start(&mut state, Mode::Background);
                    }
                    return Next::Serve(value);
                }
                Freshness::Expired => {}
            }
        }

        let running = state
            .refresh
            .flight()
            .map(|flight| (flight.generation, flight.pending.clone()));
        match running {
            None => Next::Join(self.start(&mut state, Mode::Foreground)),
            Some((generation, pending)) if generation == state.generation => Next::Join(pending),
            Some((_, pending)) => Next::WaitAndRetry(pending),
        }
    }

    fn start(&self, state: &mut CacheState<T>, mode: Mode) -> PendingCollection<T> {
        let generation = state.generation;
        state.collections += 1;

        let kind = self.kind;
        let collect = Arc::clone(&self.collect);
        let shared = Arc::clone(&self.state);
        let timeout = self.settings.collect_timeout;
        let messages = self.messages;

        let task = tokio::spawn(async move {
            let started = Instant::now();
            let blocking = tokio::task::spawn_blocking(move || collect());
            let snapshot = match tokio::time::timeout(timeout, blocking).await {
                Ok(Ok(snapshot)) => snapshot,
                Ok(Err(e)) => {
                    warn!(kind, error = %e, "collector aborted");
                    Snapshot::error(messages.failed)
                }
                Err(_) => {
                    warn!(kind, error = %CoreError::Timeout(timeout), "collection abandoned");
                    Snapshot::error(messages.timed_out)
                }
            };
            if let Some(error) = snapshot.error_message() {
                warn!(kind, error, "caching error snapshot");
            }

            let mut state = shared.lock();
            if state.generation == generation {
                state.entry = CacheEntry {
                    value: Some(snapshot.clone()),
                    fetched_at: Some(Instant::now()),
                };
            } else {
                debug!(kind, "discarding result collected before invalidation");
            }
            state.refresh = RefreshState::Idle;
            debug!(
                kind,
                background = mode == Mode::Background,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "collection finished"
            );
            snapshot
        });

        let failed = messages.failed;
        let pending = async move { task.await.unwrap_or_else(|_| Snapshot::error(failed)) }
            .boxed()
            .shared();

        let flight = Flight {
            generation,
            pending: pending.clone(),
        };
        state.refresh = match mode {
            Mode::Foreground => RefreshState::InFlight(flight),
            Mode::Background => RefreshState::BackgroundRefreshing(flight),
        };
        pending
    }
}
