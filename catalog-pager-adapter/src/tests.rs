use crate::*;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use catalog_pager::model::{
    CatalogItem, CategoryCollection, CategoryMember, CollectionPage, Entity, EvolutionChain,
    NamedResource, Species,
};
use catalog_pager::{
    CacheOptions, CatalogClient, CatalogService, Completion, FetchError, FetchResult,
    InfiniteList, QueryCache, ServerCursorStrategy,
};

#[derive(Clone, Default)]
struct Clock(Arc<AtomicU64>);

impl Clock {
    fn set(&self, now_ms: u64) {
        self.0.store(now_ms, Ordering::SeqCst);
    }

    fn reader(&self) -> impl Fn() -> u64 + Send + Sync + 'static {
        let now = Arc::clone(&self.0);
        move || now.load(Ordering::SeqCst)
    }
}

/// A list with a fixed number of remaining pages.
#[derive(Debug, Default)]
struct FakeSource {
    remaining: u32,
    fetching: bool,
    calls: u32,
    fail: Option<FetchError>,
}

impl FakeSource {
    fn with_pages(remaining: u32) -> Self {
        Self {
            remaining,
            ..Self::default()
        }
    }
}

#[async_trait]
impl PagedSource for FakeSource {
    fn has_next_page(&self) -> bool {
        self.remaining > 0
    }

    fn is_fetching_next_page(&self) -> bool {
        self.fetching
    }

    async fn fetch_next_page(&mut self) -> FetchResult<bool> {
        self.calls += 1;
        if let Some(err) = self.fail.take() {
            return Err(err);
        }
        if self.remaining == 0 {
            return Ok(false);
        }
        self.remaining -= 1;
        Ok(true)
    }
}

/// A list whose page requests never resolve.
#[derive(Debug, Default)]
struct StalledSource {
    calls: u32,
}

#[async_trait]
impl PagedSource for StalledSource {
    fn has_next_page(&self) -> bool {
        true
    }

    fn is_fetching_next_page(&self) -> bool {
        false
    }

    async fn fetch_next_page(&mut self) -> FetchResult<bool> {
        self.calls += 1;
        std::future::pending::<()>().await;
        Ok(true)
    }
}

#[derive(Debug, Default)]
struct RecordingObserver {
    next: u64,
    observed: Vec<(ObservationId, u32)>,
    unobserved: Vec<ObservationId>,
}

impl SentinelObserver for RecordingObserver {
    fn observe(&mut self, root_margin_px: u32) -> ObservationId {
        self.next += 1;
        let id = ObservationId(self.next);
        self.observed.push((id, root_margin_px));
        id
    }

    fn unobserve(&mut self, id: ObservationId) {
        self.unobserved.push(id);
    }
}

fn scheduler(clock: &Clock) -> FetchScheduler<RecordingObserver> {
    FetchScheduler::new(RecordingObserver::default(), SchedulerOptions::default())
        .with_now(clock.reader())
}

fn fired(fetched: u32) -> Trigger {
    Trigger::Fired(Burst {
        fetched,
        error: None,
    })
}

#[test]
fn scheduler_defaults() {
    let options = SchedulerOptions::default();
    assert_eq!(options.root_margin_px, 1000);
    assert_eq!(options.burst_pages, 2);
    assert_eq!(options.cooldown_ms, 120);
    assert_eq!(SchedulerOptions::new(0, 0, 0).burst_pages, 1);
}

#[tokio::test]
async fn valid_trigger_runs_one_burst_then_cools_down() {
    let clock = Clock::default();
    clock.set(1_000);
    let mut s = scheduler(&clock);
    let mut source = FakeSource::with_pages(10);
    let id = s.attach(SchedulerFlags::of(&source));
    assert_eq!(s.observer().observed, [(id, 1000)]);

    assert_eq!(s.on_intersection(id, true, &mut source).await, fired(2));
    assert_eq!(source.calls, 2);
    assert_eq!(s.lock(), SchedulerLock::CoolingDown { until_ms: 1_120 });
}

#[tokio::test]
async fn triggers_during_cool_down_are_ignored() {
    let clock = Clock::default();
    let mut s = scheduler(&clock);
    let mut source = FakeSource::with_pages(10);
    let id = s.attach(SchedulerFlags::of(&source));
    s.on_intersection(id, true, &mut source).await;

    for now in [0, 50, 119] {
        clock.set(now);
        assert_eq!(
            s.on_intersection(id, true, &mut source).await,
            Trigger::Ignored(IgnoreReason::Locked)
        );
    }
    assert_eq!(source.calls, 2);

    assert!(!s.tick(119));
    assert!(s.tick(120));
    assert_eq!(s.lock(), SchedulerLock::Free);
    clock.set(120);
    assert_eq!(s.on_intersection(id, true, &mut source).await, fired(2));
    assert_eq!(source.calls, 4);
}

#[tokio::test]
async fn elapsed_cool_down_is_released_by_next_trigger() {
    let clock = Clock::default();
    let mut s = scheduler(&clock);
    let mut source = FakeSource::with_pages(10);
    let id = s.attach(SchedulerFlags::of(&source));
    s.on_intersection(id, true, &mut source).await;

    clock.set(500);
    assert_eq!(s.on_intersection(id, true, &mut source).await, fired(2));
}

#[tokio::test]
async fn burst_stops_when_source_is_exhausted() {
    let clock = Clock::default();
    let mut s = scheduler(&clock);
    let mut source = FakeSource::with_pages(1);
    let id = s.attach(SchedulerFlags::of(&source));

    assert_eq!(s.on_intersection(id, true, &mut source).await, fired(1));
    assert_eq!(source.calls, 1);
    assert_eq!(s.lock(), SchedulerLock::CoolingDown { until_ms: 120 });

    clock.set(1_000);
    assert_eq!(
        s.on_intersection(id, true, &mut source).await,
        Trigger::Ignored(IgnoreReason::NoNextPage)
    );
    assert_eq!(source.calls, 1);
}

#[tokio::test]
async fn burst_stops_on_failure_and_still_cools_down() {
    let clock = Clock::default();
    let mut s = scheduler(&clock);
    let mut source = FakeSource::with_pages(5);
    source.fail = Some(FetchError::from_status(500, "boom"));
    let id = s.attach(SchedulerFlags::of(&source));

    let trigger = s.on_intersection(id, true, &mut source).await;
    assert_eq!(
        trigger,
        Trigger::Fired(Burst {
            fetched: 0,
            error: Some(FetchError::from_status(500, "boom")),
        })
    );
    assert_eq!(source.calls, 1);
    assert!(matches!(s.lock(), SchedulerLock::CoolingDown { .. }));
}

#[tokio::test]
async fn trigger_needs_intersection_and_idle_source() {
    let clock = Clock::default();
    let mut s = scheduler(&clock);
    let mut source = FakeSource::with_pages(5);
    let id = s.attach(SchedulerFlags::of(&source));

    assert_eq!(
        s.on_intersection(id, false, &mut source).await,
        Trigger::Ignored(IgnoreReason::NotIntersecting)
    );
    source.fetching = true;
    assert_eq!(
        s.on_intersection(id, true, &mut source).await,
        Trigger::Ignored(IgnoreReason::FetchInFlight)
    );
    assert_eq!(source.calls, 0);
    assert_eq!(s.lock(), SchedulerLock::Free);
}

#[test]
fn lock_is_held_until_burst_finishes() {
    let clock = Clock::default();
    let mut s = scheduler(&clock);
    let flags = SchedulerFlags {
        has_next_page: true,
        is_fetching_next_page: false,
    };
    let id = s.attach(flags);

    let permit = s.try_trigger(id, true, flags).unwrap();
    assert_eq!(permit.pages(), 2);
    assert_eq!(s.lock(), SchedulerLock::Held);
    assert_eq!(s.try_trigger(id, true, flags), Err(IgnoreReason::Locked));
    assert!(!s.tick(10_000));

    clock.set(40);
    s.finish_burst(permit);
    assert_eq!(s.lock(), SchedulerLock::CoolingDown { until_ms: 160 });
}

#[tokio::test]
async fn dropped_burst_still_cools_down() {
    let clock = Clock::default();
    clock.set(1_000);
    let mut s = scheduler(&clock);
    let mut stalled = StalledSource::default();
    let id = s.attach(SchedulerFlags::of(&stalled));

    let burst = s.on_intersection(id, true, &mut stalled);
    assert!(tokio::time::timeout(Duration::from_millis(10), burst).await.is_err());
    assert_eq!(stalled.calls, 1);
    assert_eq!(s.lock(), SchedulerLock::CoolingDown { until_ms: 1_120 });

    assert!(s.tick(1_120));
    let mut source = FakeSource::with_pages(5);
    assert_eq!(s.sync(SchedulerFlags::of(&source)), None);
    clock.set(1_120);
    assert_eq!(s.on_intersection(id, true, &mut source).await, fired(2));
    assert_eq!(source.calls, 2);
}

#[tokio::test]
async fn flag_change_reobserves_and_old_events_are_ignored() {
    let clock = Clock::default();
    let mut s = scheduler(&clock);
    let mut source = FakeSource::with_pages(3);
    let old = s.attach(SchedulerFlags::of(&source));

    assert_eq!(s.sync(SchedulerFlags::of(&source)), None);

    source.fetching = true;
    let new = s.sync(SchedulerFlags::of(&source)).unwrap();
    assert_ne!(old, new);
    assert_eq!(s.observation(), Some(new));
    assert_eq!(s.observer().unobserved, [old]);

    source.fetching = false;
    s.sync(SchedulerFlags::of(&source));
    assert_eq!(
        s.on_intersection(old, true, &mut source).await,
        Trigger::Ignored(IgnoreReason::StaleObservation)
    );
    assert_eq!(source.calls, 0);

    s.detach();
    assert_eq!(s.observation(), None);
    assert_eq!(s.observer().unobserved.len(), 3);
}

#[test]
fn sentinel_range_includes_margin_on_both_sides() {
    let g = |sentinel_offset, scroll_offset| SentinelGeometry {
        sentinel_offset,
        scroll_offset,
        viewport: 600,
    };
    assert!(sentinel_in_range(g(1_600, 0), 1_000));
    assert!(!sentinel_in_range(g(1_601, 0), 1_000));
    assert!(sentinel_in_range(g(600, 0), 0));
    assert!(!sentinel_in_range(g(3_000, 5_000), 1_000));
    assert!(sentinel_in_range(g(4_000, 5_000), 1_000));
}

#[test]
fn geometry_observer_reports_transitions_only() {
    let near = SentinelGeometry {
        sentinel_offset: 1_200,
        scroll_offset: 0,
        viewport: 600,
    };
    let far = SentinelGeometry {
        sentinel_offset: 10_000,
        ..near
    };

    let mut o = GeometryObserver::new();
    assert_eq!(o.update(near), None);

    let first = o.observe(1_000);
    assert_eq!(
        o.update(near),
        Some(IntersectionEvent {
            observation: first,
            is_intersecting: true
        })
    );
    assert_eq!(o.update(near), None);
    assert_eq!(o.update(far).map(|e| e.is_intersecting), Some(false));

    o.unobserve(ObservationId(999));
    assert_eq!(o.active(), Some(first));
    o.unobserve(first);
    assert_eq!(o.update(near), None);

    let second = o.observe(1_000);
    assert_ne!(first, second);
    assert_eq!(o.update(far).map(|e| e.is_intersecting), Some(false));
}

// ---------------------------------------------------------------------------------------------
// browser
// ---------------------------------------------------------------------------------------------

fn items(prefix: &str, n: u32) -> Vec<CatalogItem> {
    (1..=n)
        .map(|i| {
            NamedResource::new(
                format!("{prefix}-{i}"),
                format!("https://catalog.test/api/v2/pokemon/{i}/"),
            )
        })
        .collect()
}

#[derive(Default)]
struct FakeService {
    all: Vec<CatalogItem>,
    categories: HashMap<String, Vec<CatalogItem>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    stall_collection: AtomicBool,
}

impl FakeService {
    fn new(n: u32) -> Self {
        Self {
            all: items("mon", n),
            ..Self::default()
        }
    }

    fn with_category(mut self, name: &str, n: u32) -> Self {
        self.categories.insert(name.to_owned(), items(name, n));
        self
    }

    fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    fn record(&self, op: &'static str) {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
    }
}

#[async_trait]
impl CatalogService for FakeService {
    async fn fetch_collection_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> FetchResult<CollectionPage> {
        self.record("collection");
        if self.stall_collection.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let end = (offset + limit).min(self.all.len());
        let start = offset.min(end);
        Ok(CollectionPage {
            count: self.all.len(),
            next: (end < self.all.len()).then(|| format!("?offset={end}")),
            previous: None,
            results: self.all[start..end].to_vec(),
        })
    }

    async fn fetch_category(&self, category: &str) -> FetchResult<CategoryCollection> {
        self.record("category");
        let members = self.categories.get(category).ok_or(FetchError::NotFound)?;
        Ok(CategoryCollection {
            id: 1,
            name: category.to_owned(),
            members: members
                .iter()
                .cloned()
                .map(|item| CategoryMember { item, slot: 1 })
                .collect(),
        })
    }

    async fn fetch_entity(&self, _id: u32) -> FetchResult<Entity> {
        Err(FetchError::NotFound)
    }

    async fn fetch_species(&self, _id: u32) -> FetchResult<Species> {
        Err(FetchError::NotFound)
    }

    async fn fetch_evolution_chain(&self, _id: u32) -> FetchResult<EvolutionChain> {
        Err(FetchError::NotFound)
    }
}

fn client_for(service: &Arc<FakeService>) -> CatalogClient {
    CatalogClient::new(service.clone(), QueryCache::new(CacheOptions::new()))
}

#[tokio::test]
async fn browser_loads_unfiltered_list() {
    let service = Arc::new(FakeService::new(150));
    let mut browser = Browser::new(client_for(&service));

    let snap = browser.snapshot();
    assert!(snap.is_initial_loading);
    assert!(PagedSource::has_next_page(&browser));
    assert!(snap.items.is_empty());

    assert!(browser.load_more().await.unwrap());
    assert!(browser.load_more().await.unwrap());
    let snap = browser.snapshot();
    assert_eq!(snap.items.len(), 100);
    assert_eq!(snap.total, 150);
    assert!(snap.has_next_page);
    assert!(!snap.is_initial_loading);
    assert!(!snap.all_caught_up);
    assert_eq!(snap.category, None);
}

#[tokio::test]
async fn previous_list_is_placeholder_until_first_page() {
    let service = Arc::new(FakeService::new(150).with_category("fire", 30));
    let mut browser = Browser::new(client_for(&service));
    browser.load_more().await.unwrap();
    let unfiltered = browser.active().id();

    assert!(browser.set_category(" Fire "));
    assert_eq!(browser.category(), Some("fire"));
    let snap = browser.snapshot();
    assert!(snap.is_placeholder);
    assert!(snap.is_initial_loading);
    assert_eq!(snap.list, unfiltered);
    assert_eq!(snap.items.len(), 60);

    browser.load_more().await.unwrap();
    let snap = browser.snapshot();
    assert!(!snap.is_placeholder);
    assert!(!browser.has_placeholder());
    assert_eq!(snap.category, Some("fire"));
    assert_eq!(snap.items.len(), 30);
    assert!(snap.all_caught_up);
    assert!(!snap.has_next_page);

    assert!(!browser.set_category("FIRE"));
    assert!(browser.set_category(""));
    browser.load_more().await.unwrap();
    assert_eq!(browser.snapshot().items.len(), 60);
    assert_eq!(service.calls("collection"), 1);
    assert_eq!(service.calls("category"), 1);
}

#[tokio::test]
async fn response_for_replaced_list_is_dropped() {
    let service = Arc::new(FakeService::new(150).with_category("fire", 30));
    let mut browser = Browser::new(client_for(&service));

    let ticket = browser.begin_load_more().unwrap();
    let pending = browser.fetch(&ticket);
    assert!(browser.set_category("fire"));

    let page = pending.await;
    assert!(page.is_ok());
    assert_eq!(browser.complete(&ticket, page), Ok(Completion::Ignored));
    assert!(browser.active().is_empty());
    assert!(!browser.has_placeholder());
    assert!(browser.snapshot().items.is_empty());
}

#[tokio::test]
async fn browser_tickets_append_to_active_list() {
    let service = Arc::new(FakeService::new(150));
    let mut browser = Browser::new(client_for(&service));

    let ticket = browser.begin_load_more().unwrap();
    assert!(ticket.is_first_page());
    assert!(browser.begin_load_more().is_none());
    let page = browser.fetch(&ticket).await;
    assert_eq!(
        browser.complete(&ticket, page),
        Ok(Completion::Appended { len: 60 })
    );
    assert!(!browser.begin_load_more().unwrap().is_first_page());
}

#[tokio::test]
async fn scheduler_drives_browser_from_geometry() {
    let clock = Clock::default();
    let service = Arc::new(FakeService::new(150));
    let mut browser = Browser::new(client_for(&service));
    let mut s = FetchScheduler::new(GeometryObserver::new(), SchedulerOptions::default())
        .with_now(clock.reader());
    s.attach(SchedulerFlags::of(&browser));

    let geometry = SentinelGeometry {
        sentinel_offset: 0,
        scroll_offset: 0,
        viewport: 800,
    };
    let event = s.observer_mut().update(geometry).unwrap();
    let trigger = s
        .on_intersection(event.observation, event.is_intersecting, &mut browser)
        .await;
    assert_eq!(trigger, fired(2));
    assert_eq!(browser.snapshot().items.len(), 100);
    assert_eq!(s.sync(SchedulerFlags::of(&browser)), None);

    clock.set(120);
    assert!(s.tick(120));
    let trigger = s
        .on_intersection(event.observation, true, &mut browser)
        .await;
    assert_eq!(trigger, fired(2));
    let snap = browser.snapshot();
    assert_eq!(snap.items.len(), 150);
    assert!(snap.all_caught_up);
}

#[tokio::test]
async fn idle_list_counts_as_having_a_next_page() {
    let service = Arc::new(FakeService::new(10));
    let mut list = InfiniteList::new(ServerCursorStrategy::new(client_for(&service)));
    assert!(PagedSource::has_next_page(&list));

    let clock = Clock::default();
    let mut s = scheduler(&clock);
    let id = s.attach(SchedulerFlags::of(&list));
    assert_eq!(s.on_intersection(id, true, &mut list).await, fired(1));
    assert!(list.is_exhausted());
    assert!(!PagedSource::has_next_page(&list));
}

#[tokio::test]
async fn category_switch_after_dropped_burst() {
    let clock = Clock::default();
    let service = Arc::new(FakeService::new(150).with_category("fire", 30));
    service.stall_collection.store(true, Ordering::SeqCst);
    let mut browser = Browser::new(client_for(&service));
    let mut s = scheduler(&clock);
    let id = s.attach(SchedulerFlags::of(&browser));

    let burst = s.on_intersection(id, true, &mut browser);
    assert!(tokio::time::timeout(Duration::from_millis(10), burst).await.is_err());
    assert_eq!(service.calls("collection"), 1);
    assert!(!PagedSource::is_fetching_next_page(&browser));
    assert_eq!(s.lock(), SchedulerLock::CoolingDown { until_ms: 120 });

    assert!(browser.set_category("fire"));
    assert!(!browser.has_placeholder());
    assert_eq!(s.sync(SchedulerFlags::of(&browser)), None);

    clock.set(120);
    assert_eq!(s.on_intersection(id, true, &mut browser).await, fired(1));
    let snap = browser.snapshot();
    assert_eq!(snap.category, Some("fire"));
    assert_eq!(snap.items.len(), 30);
    assert!(snap.all_caught_up);
}
