use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::{CacheOptions, FetchError, FetchResult, QueryKey, QueryOptions};

type Value = Arc<dyn Any + Send + Sync>;
type Flight = Shared<BoxFuture<'static, Result<Value, FetchError>>>;

struct CacheEntry {
    value: Value,
    updated_at_ms: u64,
    stale_at_ms: u64,
    gc_at_ms: u64,
}

struct InFlight {
    id: u64,
    future: Flight,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    in_flight: HashMap<QueryKey, InFlight>,
    next_flight_id: u64,
}

impl CacheState {
    fn collect_garbage(&mut self, now_ms: u64) -> usize {
        let in_flight = &self.in_flight;
        let before = self.entries.len();
        self.entries
            .retain(|key, entry| now_ms < entry.gc_at_ms || in_flight.contains_key(key));
        before - self.entries.len()
    }
}

enum Plan<V> {
    Fresh(V),
    /// Await `flight`; `stale` stays displayable meanwhile.
    Join { flight: Flight, stale: Option<V> },
    Fetch { stale: Option<V> },
}

/// A keyed, process-wide memo of in-flight and completed requests.
///
/// - At most one request per [`QueryKey`] is in flight; concurrent callers share its result.
/// - Successful values are fresh for `stale_time_ms`, then revalidated on the next `get` while
///   the previous value stays displayable.
/// - Entries nobody asked for within `gc_time_ms` are evicted.
/// - Failures are never stored.
///
/// The handle is cheap to clone; all clones share the same entries.
#[derive(Clone)]
pub struct QueryCache {
    options: CacheOptions,
    state: Arc<Mutex<CacheState>>,
}

impl QueryCache {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            options,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    pub fn now_ms(&self) -> u64 {
        (self.options.now)()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached value for `key`, running `producer` only when needed.
    ///
    /// `producer` is not invoked when the entry is fresh or when another caller already has a
    /// request for `key` in flight.
    pub async fn get<V, F, Fut>(
        &self,
        key: &QueryKey,
        producer: F,
        options: &QueryOptions,
    ) -> FetchResult<V>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchResult<V>> + Send + 'static,
    {
        let now = self.now_ms();
        let plan = self.plan::<V>(key, now, options)?;

        let (flight, stale) = match plan {
            Plan::Fresh(value) => {
                ptrace!(%key, "cache hit");
                return Ok(value);
            }
            Plan::Join { flight, stale } => {
                ptrace!(%key, "joining in-flight request");
                (flight, stale)
            }
            Plan::Fetch { stale } => {
                ptrace!(%key, stale = stale.is_some(), "starting request");
                (self.start_flight(key, producer(), options), stale)
            }
        };

        match stale {
            Some(stale) if self.options.spawn.is_some() => {
                pdebug!(%key, "serving stale value, revalidating in background");
                self.drive_in_background(flight);
                Ok(stale)
            }
            Some(stale) => match flight.await {
                Ok(value) => downcast(key, &value),
                Err(_err) => {
                    pwarn!(%key, error = %_err, "revalidation failed, keeping stale value");
                    Ok(stale)
                }
            },
            None => downcast(key, &flight.await?),
        }
    }

    fn plan<V: Clone + 'static>(
        &self,
        key: &QueryKey,
        now: u64,
        options: &QueryOptions,
    ) -> FetchResult<Plan<V>> {
        let mut state = self.lock();
        let evicted = state.collect_garbage(now);
        if evicted > 0 {
            pdebug!(evicted, "evicted inactive cache entries");
        }

        let mut stale = None;
        if let Some(entry) = state.entries.get_mut(key) {
            entry.gc_at_ms = now.saturating_add(options.gc_time_ms);
            let value = downcast::<V>(key, &entry.value)?;
            if now < entry.stale_at_ms {
                return Ok(Plan::Fresh(value));
            }
            stale = Some(value);
        }

        Ok(match state.in_flight.get(key) {
            Some(flight) => Plan::Join {
                flight: flight.future.clone(),
                stale,
            },
            None => Plan::Fetch { stale },
        })
    }

    /// Registers a flight for `key`, unless another caller won the race in the meantime.
    fn start_flight<V, Fut>(&self, key: &QueryKey, fut: Fut, options: &QueryOptions) -> Flight
    where
        V: Send + Sync + 'static,
        Fut: Future<Output = FetchResult<V>> + Send + 'static,
    {
        let mut state = self.lock();
        if let Some(existing) = state.in_flight.get(key) {
            return existing.future.clone();
        }

        let id = state.next_flight_id;
        state.next_flight_id = id.wrapping_add(1);

        let shared = Arc::downgrade(&self.state);
        let now = Arc::clone(&self.options.now);
        let settle_key = key.clone();
        let options = *options;
        let future = async move {
            let result = fut.await.map(|value| Arc::new(value) as Value);
            settle(&shared, &settle_key, id, &result, now(), &options);
            result
        }
        .boxed()
        .shared();

        state.in_flight.insert(
            key.clone(),
            InFlight {
                id,
                future: future.clone(),
            },
        );
        future
    }

    fn drive_in_background(&self, flight: Flight) {
        if let Some(spawn) = &self.options.spawn {
            spawn(flight.map(|_| ()).boxed());
        }
    }

    /// Marks the entry stale so the next `get` revalidates it. The value stays displayable.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let mut state = self.lock();
        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.stale_at_ms = 0;
                pdebug!(%key, "invalidated");
                true
            }
            None => false,
        }
    }

    /// Evicts every entry whose inactivity window has elapsed. Returns how many were removed.
    pub fn collect_garbage(&self) -> usize {
        let now = self.now_ms();
        self.lock().collect_garbage(now)
    }

    /// When the entry for `key` was last replaced, if it is resident.
    pub fn updated_at_ms(&self, key: &QueryKey) -> Option<u64> {
        self.lock().entries.get(key).map(|entry| entry.updated_at_ms)
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.lock().in_flight.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

impl core::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.lock();
        f.debug_struct("QueryCache")
            .field("entries", &state.entries.len())
            .field("in_flight", &state.in_flight.len())
            .field("options", &self.options)
            .finish()
    }
}

/// Completes flight `id`: clears it and, on success, replaces the entry in one step.
fn settle(
    state: &Weak<Mutex<CacheState>>,
    key: &QueryKey,
    id: u64,
    result: &Result<Value, FetchError>,
    now: u64,
    options: &QueryOptions,
) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    if state.in_flight.get(key).is_some_and(|flight| flight.id == id) {
        state.in_flight.remove(key);
    }
    match result {
        Ok(value) => {
            state.entries.insert(
                key.clone(),
                CacheEntry {
                    value: Arc::clone(value),
                    updated_at_ms: now,
                    stale_at_ms: now.saturating_add(options.stale_time_ms),
                    gc_at_ms: now.saturating_add(options.gc_time_ms),
                },
            );
            ptrace!(%key, now, "stored");
        }
        Err(_err) => {
            pdebug!(%key, error = %_err, "request failed, nothing stored");
        }
    }
}

fn downcast<V: Clone + 'static>(key: &QueryKey, value: &Value) -> FetchResult<V> {
    value
        .downcast_ref::<V>()
        .cloned()
        .ok_or_else(|| FetchError::TypeMismatch {
            key: key.to_string(),
        })
}
