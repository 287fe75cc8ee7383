// Example: paging through an in-memory collection, unfiltered and by category.
use std::sync::Arc;

use async_trait::async_trait;
use catalog_pager::model::{
    CatalogItem, CategoryCollection, CategoryMember, CollectionPage, Entity, EvolutionChain,
    NamedResource, Species,
};
use catalog_pager::{
    CacheOptions, CatalogClient, CatalogService, CatalogStrategy, FetchError, FetchResult,
    InfiniteList, PageSizes, QueryCache,
};

struct InMemory {
    all: Vec<CatalogItem>,
}

impl InMemory {
    fn new(n: u32) -> Self {
        let all = (1..=n)
            .map(|i| {
                NamedResource::new(
                    format!("mon-{i}"),
                    format!("https://catalog.test/pokemon/{i}/"),
                )
            })
            .collect();
        Self { all }
    }
}

#[async_trait]
impl CatalogService for InMemory {
    async fn fetch_collection_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> FetchResult<CollectionPage> {
        let end = (offset + limit).min(self.all.len());
        let start = offset.min(end);
        Ok(CollectionPage {
            count: self.all.len(),
            next: (end < self.all.len()).then(|| format!("?offset={end}&limit={limit}")),
            previous: None,
            results: self.all[start..end].to_vec(),
        })
    }

    async fn fetch_category(&self, category: &str) -> FetchResult<CategoryCollection> {
        // Every third entry belongs to "odd".
        if category != "odd" {
            return Err(FetchError::NotFound);
        }
        let members = self
            .all
            .iter()
            .step_by(3)
            .cloned()
            .map(|item| CategoryMember { item, slot: 1 })
            .collect();
        Ok(CategoryCollection {
            id: 1,
            name: category.to_owned(),
            members,
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

#[tokio::main(flavor = "current_thread")]
async fn main() -> FetchResult<()> {
    let client = CatalogClient::new(
        Arc::new(InMemory::new(250)),
        QueryCache::new(CacheOptions::new()),
    );

    for category in ["", "odd"] {
        let strategy =
            CatalogStrategy::for_category(client.clone(), category, PageSizes::default());
        let mut list = InfiniteList::new(strategy);
        while list.fetch_next_page().await? {
            println!(
                "category={:?} loaded={} total={} phase={:?}",
                list.strategy().category(),
                list.len(),
                list.total(),
                list.phase()
            );
        }
    }

    println!("cache={:?}", client.cache());
    Ok(())
}
