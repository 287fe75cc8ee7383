use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use catalog_pager::{FetchError, FetchResult, InfiniteList, ListPhase, NowFn, PageStrategy};

/// Identity of one sentinel observation. A new one is issued on every (re-)observe, so events
/// from a torn-down observation can be told apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObservationId(pub u64);

/// Viewport observation primitive provided by the adapter (e.g. an intersection observer, or
/// [`crate::GeometryObserver`] for adapters that compute visibility themselves).
pub trait SentinelObserver {
    /// Starts observing the sentinel, reporting it as intersecting once it is within
    /// `root_margin_px` of the viewport.
    fn observe(&mut self, root_margin_px: u32) -> ObservationId;

    fn unobserve(&mut self, id: ObservationId);
}

/// The list the scheduler drives forward.
#[async_trait]
pub trait PagedSource: Send {
    /// Whether a `fetch_next_page` call would request something. A list that has not loaded
    /// its first page yet counts as having a next page.
    fn has_next_page(&self) -> bool;

    fn is_fetching_next_page(&self) -> bool;

    /// Requests the next page. `Ok(false)` means nothing was requested.
    async fn fetch_next_page(&mut self) -> FetchResult<bool>;
}

#[async_trait]
impl<S> PagedSource for InfiniteList<S>
where
    S: PageStrategy + Send,
{
    fn has_next_page(&self) -> bool {
        InfiniteList::has_next_page(self)
            || (self.phase() == ListPhase::Idle && self.is_enabled())
    }

    fn is_fetching_next_page(&self) -> bool {
        self.is_fetching()
    }

    async fn fetch_next_page(&mut self) -> FetchResult<bool> {
        InfiniteList::fetch_next_page(self).await
    }
}

/// The flags that decide whether a trigger may fire. The observation is renewed whenever they
/// change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerFlags {
    pub has_next_page: bool,
    pub is_fetching_next_page: bool,
}

impl SchedulerFlags {
    pub fn of(source: &(impl PagedSource + ?Sized)) -> Self {
        Self {
            has_next_page: source.has_next_page(),
            is_fetching_next_page: source.is_fetching_next_page(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerOptions {
    /// How far ahead of the viewport the sentinel starts a fetch.
    pub root_margin_px: u32,
    /// Pages requested per trigger, to get ahead of fast scrolling.
    pub burst_pages: u32,
    /// How long the lock stays held after a burst completes.
    pub cooldown_ms: u64,
}

impl SchedulerOptions {
    pub const DEFAULT_ROOT_MARGIN_PX: u32 = 1000;
    pub const DEFAULT_BURST_PAGES: u32 = 2;
    pub const DEFAULT_COOLDOWN_MS: u64 = 120;

    pub fn new(root_margin_px: u32, burst_pages: u32, cooldown_ms: u64) -> Self {
        Self {
            root_margin_px,
            burst_pages: burst_pages.max(1),
            cooldown_ms,
        }
    }

    pub fn with_root_margin_px(mut self, root_margin_px: u32) -> Self {
        self.root_margin_px = root_margin_px;
        self
    }

    pub fn with_burst_pages(mut self, burst_pages: u32) -> Self {
        self.burst_pages = burst_pages.max(1);
        self
    }

    pub fn with_cooldown_ms(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_ROOT_MARGIN_PX,
            Self::DEFAULT_BURST_PAGES,
            Self::DEFAULT_COOLDOWN_MS,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SchedulerLock {
    Free,
    /// A burst is running.
    Held,
    /// The burst finished; triggers stay ignored until `until_ms`.
    CoolingDown { until_ms: u64 },
}

/// Why a trigger did not start a burst.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The event belongs to an observation that has since been torn down.
    StaleObservation,
    NotIntersecting,
    Locked,
    NoNextPage,
    FetchInFlight,
}

/// Permission to run one burst, returned by [`FetchScheduler::try_trigger`].
///
/// Hand it back to [`FetchScheduler::finish_burst`] when the burst is over.
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct BurstPermit {
    pages: u32,
}

impl BurstPermit {
    /// Maximum number of pages this burst may request.
    pub fn pages(&self) -> u32 {
        self.pages
    }
}

/// Result of a completed burst.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Burst {
    /// Pages actually requested.
    pub fetched: u32,
    /// The failure that ended the burst early, if any.
    pub error: Option<FetchError>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    Ignored(IgnoreReason),
    Fired(Burst),
}

/// Decides when the next page is requested as the user scrolls toward the end of a list.
///
/// The scheduler does not hold any UI objects. Adapters drive it by calling:
/// - `attach` / `sync` whenever the list's flags may have changed
/// - `on_intersection` when the observer reports the sentinel
/// - `tick(now_ms)` from a timer, to release the cool-down lock
///
/// Adapters that own the I/O themselves use `try_trigger` / `finish_burst` instead of
/// `on_intersection`.
pub struct FetchScheduler<O> {
    observer: O,
    options: SchedulerOptions,
    now: NowFn,
    lock: SchedulerLock,
    observation: Option<ObservationId>,
    flags: Option<SchedulerFlags>,
}

impl<O: SentinelObserver> FetchScheduler<O> {
    pub fn new(observer: O, options: SchedulerOptions) -> Self {
        let origin = Instant::now();
        Self {
            observer,
            options,
            now: Arc::new(move || origin.elapsed().as_millis() as u64),
            lock: SchedulerLock::Free,
            observation: None,
            flags: None,
        }
    }

    pub fn with_now(mut self, now: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.now = Arc::new(now);
        self
    }

    pub fn options(&self) -> SchedulerOptions {
        self.options
    }

    pub fn lock(&self) -> SchedulerLock {
        self.lock
    }

    pub fn observation(&self) -> Option<ObservationId> {
        self.observation
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    fn now_ms(&self) -> u64 {
        (self.now)()
    }

    fn reobserve(&mut self) -> ObservationId {
        if let Some(old) = self.observation.take() {
            self.observer.unobserve(old);
        }
        let id = self.observer.observe(self.options.root_margin_px);
        self.observation = Some(id);
        id
    }

    /// Starts observing the sentinel, replacing any previous observation.
    pub fn attach(&mut self, flags: SchedulerFlags) -> ObservationId {
        self.flags = Some(flags);
        let id = self.reobserve();
        adebug!(observation = id.0, ?flags, "sentinel attached");
        id
    }

    /// Re-observes when `flags` differ from the last attached flags.
    ///
    /// Returns the new observation, or `None` when nothing changed.
    pub fn sync(&mut self, flags: SchedulerFlags) -> Option<ObservationId> {
        if self.flags == Some(flags) && self.observation.is_some() {
            return None;
        }
        self.flags = Some(flags);
        let id = self.reobserve();
        adebug!(observation = id.0, ?flags, "sentinel re-observed");
        Some(id)
    }

    /// Tears down the current observation.
    pub fn detach(&mut self) {
        if let Some(old) = self.observation.take() {
            self.observer.unobserve(old);
        }
        self.flags = None;
    }

    /// Releases the cool-down lock once it has elapsed. Returns `true` when the lock was
    /// released by this call.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        match self.lock {
            SchedulerLock::CoolingDown { until_ms } if now_ms >= until_ms => {
                self.lock = SchedulerLock::Free;
                atrace!(now_ms, "scheduler lock released");
                true
            }
            _ => false,
        }
    }

    /// Validates a trigger and takes the lock.
    pub fn try_trigger(
        &mut self,
        observation: ObservationId,
        is_intersecting: bool,
        flags: SchedulerFlags,
    ) -> Result<BurstPermit, IgnoreReason> {
        let now = self.now_ms();
        self.tick(now);

        let reason = if self.observation != Some(observation) {
            Some(IgnoreReason::StaleObservation)
        } else if !is_intersecting {
            Some(IgnoreReason::NotIntersecting)
        } else if self.lock != SchedulerLock::Free {
            Some(IgnoreReason::Locked)
        } else if !flags.has_next_page {
            Some(IgnoreReason::NoNextPage)
        } else if flags.is_fetching_next_page {
            Some(IgnoreReason::FetchInFlight)
        } else {
            None
        };
        if let Some(reason) = reason {
            atrace!(observation = observation.0, ?reason, "trigger ignored");
            return Err(reason);
        }

        self.lock = SchedulerLock::Held;
        adebug!(
            observation = observation.0,
            pages = self.options.burst_pages,
            "trigger accepted"
        );
        Ok(BurstPermit {
            pages: self.options.burst_pages,
        })
    }

    /// Ends the burst started by `permit`; the lock cools down from now.
    pub fn finish_burst(&mut self, _permit: BurstPermit) {
        self.cool_down();
    }

    fn cool_down(&mut self) {
        let until_ms = self.now_ms().saturating_add(self.options.cooldown_ms);
        self.lock = SchedulerLock::CoolingDown { until_ms };
        atrace!(until_ms, "scheduler cooling down");
    }

    /// Handles an observer event: runs one burst against `source` when the trigger is valid.
    ///
    /// The burst stops early when `source` runs out of pages or a request fails. The lock
    /// cools down afterwards either way, also when the returned future is dropped mid-burst.
    pub async fn on_intersection<P>(
        &mut self,
        observation: ObservationId,
        is_intersecting: bool,
        source: &mut P,
    ) -> Trigger
    where
        P: PagedSource + ?Sized,
    {
        let flags = SchedulerFlags::of(&*source);
        let permit = match self.try_trigger(observation, is_intersecting, flags) {
            Ok(permit) => permit,
            Err(reason) => return Trigger::Ignored(reason),
        };

        let pages = permit.pages();
        let _running = RunningBurst {
            scheduler: self,
            _permit: permit,
        };

        let mut burst = Burst {
            fetched: 0,
            error: None,
        };
        while burst.fetched < pages && source.has_next_page() {
            match source.fetch_next_page().await {
                Ok(true) => burst.fetched += 1,
                Ok(false) => break,
                Err(err) => {
                    awarn!(error = %err, fetched = burst.fetched, "burst stopped by failure");
                    burst.error = Some(err);
                    break;
                }
            }
        }

        Trigger::Fired(burst)
    }
}

/// Starts the cool-down when the burst ends, however it ends.
struct RunningBurst<'a, O: SentinelObserver> {
    scheduler: &'a mut FetchScheduler<O>,
    _permit: BurstPermit,
}

impl<O: SentinelObserver> Drop for RunningBurst<'_, O> {
    fn drop(&mut self) {
        if self.scheduler.lock == SchedulerLock::Held {
            self.scheduler.cool_down();
        }
    }
}

impl<O: core::fmt::Debug> core::fmt::Debug for FetchScheduler<O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FetchScheduler")
            .field("observer", &self.observer)
            .field("options", &self.options)
            .field("lock", &self.lock)
            .field("observation", &self.observation)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
