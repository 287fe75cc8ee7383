// Example: driving the browser from simulated scroll geometry.
use std::sync::Arc;

use async_trait::async_trait;
use catalog_pager::model::{
    CatalogItem, CategoryCollection, CollectionPage, Entity, EvolutionChain, NamedResource,
    Species,
};
use catalog_pager::{
    CacheOptions, CatalogClient, CatalogService, FetchError, FetchResult, QueryCache,
};
use catalog_pager_adapter::{
    Browser, FetchScheduler, GeometryObserver, SchedulerFlags, SchedulerOptions,
    SentinelGeometry,
};

const ROW_PX: u64 = 48;

struct InMemory(Vec<CatalogItem>);

#[async_trait]
impl CatalogService for InMemory {
    async fn fetch_collection_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> FetchResult<CollectionPage> {
        let end = (offset + limit).min(self.0.len());
        let start = offset.min(end);
        Ok(CollectionPage {
            count: self.0.len(),
            next: (end < self.0.len()).then(|| format!("?offset={end}")),
            previous: None,
            results: self.0[start..end].to_vec(),
        })
    }

    async fn fetch_category(&self, _category: &str) -> FetchResult<CategoryCollection> {
        Err(FetchError::NotFound)
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

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let items = (1..=300)
        .map(|i| {
            NamedResource::new(
                format!("mon-{i}"),
                format!("https://catalog.test/pokemon/{i}/"),
            )
        })
        .collect();
    let client = CatalogClient::new(
        Arc::new(InMemory(items)),
        QueryCache::new(CacheOptions::new()),
    );
    let mut browser = Browser::new(client);

    // The simulated clock advances one frame per scroll step.
    let mut now_ms = 0u64;
    let clock = Arc::new(std::sync::atomic::AtomicU64::new(0));
    let reader = Arc::clone(&clock);
    let mut scheduler = FetchScheduler::new(GeometryObserver::new(), SchedulerOptions::default())
        .with_now(move || reader.load(std::sync::atomic::Ordering::Relaxed));
    scheduler.attach(SchedulerFlags::of(&browser));

    let viewport = 800u32;
    for scroll_offset in (0..12_000u64).step_by(400) {
        now_ms += 16 * 10;
        clock.store(now_ms, std::sync::atomic::Ordering::Relaxed);
        scheduler.tick(now_ms);

        let sentinel_offset = browser.snapshot().items.len() as u64 * ROW_PX;
        let geometry = SentinelGeometry {
            sentinel_offset,
            scroll_offset,
            viewport,
        };
        let Some(event) = scheduler.observer_mut().update(geometry) else {
            continue;
        };
        let trigger = scheduler
            .on_intersection(event.observation, event.is_intersecting, &mut browser)
            .await;
        let snap = browser.snapshot();
        println!(
            "t={now_ms:>5} scroll={scroll_offset:>5} loaded={:>3} caught_up={} {trigger:?}",
            snap.items.len(),
            snap.all_caught_up
        );
        scheduler.sync(SchedulerFlags::of(&browser));
    }
}
