use std::sync::Arc;

use crate::model::{CategoryCollection, CollectionPage, Entity, EvolutionChain, Species};
use crate::retry::retry;
use crate::{CatalogService, FetchResult, QueryCache, QueryKey, QueryOptions, RetryPolicy};

/// Cached, retrying access to a [`CatalogService`].
///
/// Every call goes through the shared [`QueryCache`] under a key naming the operation and its
/// parameters; the retry policy wraps the remote call inside the cache producer so a retried
/// request still counts as a single in-flight request.
#[derive(Clone)]
pub struct CatalogClient {
    service: Arc<dyn CatalogService>,
    cache: QueryCache,
    query: QueryOptions,
    retry: RetryPolicy,
}

impl CatalogClient {
    pub fn new(service: Arc<dyn CatalogService>, cache: QueryCache) -> Self {
        Self {
            service,
            cache,
            query: QueryOptions::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_query_options(mut self, query: QueryOptions) -> Self {
        self.query = query;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn query_options(&self) -> QueryOptions {
        self.query
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn collection_page_key(limit: usize, offset: usize) -> QueryKey {
        QueryKey::new("catalog").with("all").with(offset).with(limit)
    }

    pub fn category_key(category: &str) -> QueryKey {
        QueryKey::new("category").with(normalize_category(category))
    }

    pub async fn collection_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> FetchResult<CollectionPage> {
        let service = Arc::clone(&self.service);
        let policy = self.retry;
        self.cache
            .get(
                &Self::collection_page_key(limit, offset),
                move || async move {
                    retry(policy, || service.fetch_collection_page(limit, offset)).await
                },
                &self.query,
            )
            .await
    }

    pub async fn category(&self, category: &str) -> FetchResult<CategoryCollection> {
        let service = Arc::clone(&self.service);
        let policy = self.retry;
        let category = normalize_category(category);
        self.cache
            .get(
                &Self::category_key(&category),
                move || async move { retry(policy, || service.fetch_category(&category)).await },
                &self.query,
            )
            .await
    }

    pub async fn entity(&self, id: u32) -> FetchResult<Entity> {
        let service = Arc::clone(&self.service);
        let policy = self.retry;
        self.cache
            .get(
                &QueryKey::new("entity").with(id),
                move || async move { retry(policy, || service.fetch_entity(id)).await },
                &self.query,
            )
            .await
    }

    pub async fn species(&self, id: u32) -> FetchResult<Species> {
        let service = Arc::clone(&self.service);
        let policy = self.retry;
        self.cache
            .get(
                &QueryKey::new("species").with(id),
                move || async move { retry(policy, || service.fetch_species(id)).await },
                &self.query,
            )
            .await
    }

    pub async fn evolution_chain(&self, id: u32) -> FetchResult<EvolutionChain> {
        let service = Arc::clone(&self.service);
        let policy = self.retry;
        self.cache
            .get(
                &QueryKey::new("evolution-chain").with(id),
                move || async move { retry(policy, || service.fetch_evolution_chain(id)).await },
                &self.query,
            )
            .await
    }
}

impl core::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("cache", &self.cache)
            .field("query", &self.query)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Category filters are matched trimmed and lowercase.
pub fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}
