use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;

/// A millisecond clock. Tests inject a manual clock; the default is monotonic time since the
/// cache was configured.
pub type NowFn = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Hands a future to the host executor (e.g. `tokio::spawn`).
///
/// Used by [`crate::QueryCache`] to revalidate stale entries in the background.
pub type SpawnFn = Arc<dyn Fn(BoxFuture<'static, ()>) + Send + Sync>;

/// Per-query freshness and retention windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueryOptions {
    /// How long a stored value is served without revalidation.
    pub stale_time_ms: u64,
    /// How long an untouched entry survives before it is evicted.
    pub gc_time_ms: u64,
}

impl QueryOptions {
    pub const DEFAULT_STALE_TIME_MS: u64 = 60_000;
    pub const DEFAULT_GC_TIME_MS: u64 = 5 * 60_000;

    pub fn new(stale_time_ms: u64, gc_time_ms: u64) -> Self {
        Self {
            stale_time_ms,
            gc_time_ms,
        }
    }

    pub fn with_stale_time_ms(mut self, stale_time_ms: u64) -> Self {
        self.stale_time_ms = stale_time_ms;
        self
    }

    pub fn with_gc_time_ms(mut self, gc_time_ms: u64) -> Self {
        self.gc_time_ms = gc_time_ms;
        self
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STALE_TIME_MS, Self::DEFAULT_GC_TIME_MS)
    }
}

/// Configuration for [`crate::QueryCache`].
///
/// Cheap to clone: both hooks live behind `Arc`s.
#[derive(Clone)]
pub struct CacheOptions {
    pub now: NowFn,
    /// Optional executor hook. Without it, a stale `get` awaits the revalidation itself and
    /// falls back to the stale value when the refetch fails.
    pub spawn: Option<SpawnFn>,
}

impl CacheOptions {
    pub fn new() -> Self {
        let origin = Instant::now();
        Self {
            now: Arc::new(move || origin.elapsed().as_millis() as u64),
            spawn: None,
        }
    }

    pub fn with_now(mut self, now: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.now = Arc::new(now);
        self
    }

    pub fn with_spawn(
        mut self,
        spawn: Option<impl Fn(BoxFuture<'static, ()>) + Send + Sync + 'static>,
    ) -> Self {
        self.spawn = spawn.map(|f| Arc::new(f) as _);
        self
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CacheOptions")
            .field("background_revalidation", &self.spawn.is_some())
            .finish_non_exhaustive()
    }
}

/// Page sizes shared by both pagination strategies: a larger first page to paint fast, then
/// steady follow-on pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageSizes {
    pub first: usize,
    pub next: usize,
}

impl PageSizes {
    pub const FIRST_PAGE: usize = 60;
    pub const NEXT_PAGE: usize = 40;

    pub fn new(first: usize, next: usize) -> Self {
        Self {
            first: first.max(1),
            next: next.max(1),
        }
    }
}

impl Default for PageSizes {
    fn default() -> Self {
        Self::new(Self::FIRST_PAGE, Self::NEXT_PAGE)
    }
}
