//! Per-key de-duplication of concurrent fetches.
//!
//! The first caller for a key becomes the leader: its fetch is spawned onto
//! the runtime and a `watch` receiver for the outcome is parked in the
//! in-flight map. Later callers clone that receiver and wait. The spawned
//! task removes its map entry before publishing, so a caller that misses the
//! map is guaranteed to see the published result in the cache or to start a
//! fresh fetch, never to wait on a handle that will not resolve.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::Error;

type Outcome<T> = Option<Result<T, Error>>;

struct Flight<T> {
    id: u64,
    rx: watch::Receiver<Outcome<T>>,
}

type FlightMap<T> = Arc<Mutex<HashMap<String, Flight<T>>>>;

/// Removes a flight from the map when its task finishes or unwinds.
struct Registration<T> {
    inflight: FlightMap<T>,
    key: String,
    id: u64,
}

impl<T> Drop for Registration<T> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock();
        // The key may since have been detached and claimed by a newer flight.
        if inflight.get(&self.key).is_some_and(|flight| flight.id == self.id) {
            inflight.remove(&self.key);
        }
    }
}

/// Map from key to the pending result of its single in-flight fetch.
pub struct SingleFlight<T> {
    inflight: FlightMap<T>,
    next_id: AtomicU64,
    coalesced: AtomicU64,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self { inflight: Arc::new(Mutex::new(HashMap::new())), next_id: AtomicU64::new(0), coalesced: AtomicU64::new(0) }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Run `fetch` for `key` unless a fetch is already in flight, and return
    /// the shared outcome.
    ///
    /// The fetch runs on its own task: dropping the returned future stops
    /// this caller from waiting but never cancels the fetch itself.
    pub async fn run<F, Fut>(&self, key: &str, fetch: F) -> Result<T, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        let mut rx = {
            let mut inflight = self.inflight.lock();
            if let Some(flight) = inflight.get(key) {
                self.coalesced.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, "joining in-flight fetch");
                flight.rx.clone()
            } else {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = watch::channel(None);
                inflight.insert(key.to_string(), Flight { id, rx: rx.clone() });

                let registration = Registration { inflight: Arc::clone(&self.inflight), key: key.to_string(), id };
                let task = fetch();
                tokio::spawn(async move {
                    let outcome = task.await;
                    drop(registration);
                    tx.send_replace(Some(outcome));
                });
                rx
            }
        };

        match rx.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone().unwrap_or_else(|| Err(Error::FetchAborted(key.to_string()))),
            Err(_) => Err(Error::FetchAborted(key.to_string())),
        }
    }

    /// Detach the in-flight fetch for `key`, if any.
    ///
    /// Callers already waiting still receive its outcome; new callers start
    /// a fresh fetch.
    pub fn forget(&self, key: &str) {
        self.inflight.lock().remove(key);
    }

    /// Detach every in-flight fetch whose key starts with `prefix`.
    pub fn forget_prefix(&self, prefix: &str) {
        self.inflight.lock().retain(|key, _| !key.starts_with(prefix));
    }

    /// Number of fetches currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().len()
    }

    /// Number of callers that reused another caller's fetch.
    pub fn coalesced(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }
}
