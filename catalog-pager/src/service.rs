use async_trait::async_trait;

use crate::FetchResult;
use crate::model::{CategoryCollection, CollectionPage, Entity, EvolutionChain, Species};

/// The remote collection service.
///
/// Implementations map transport failures with [`crate::FetchError::from_status`] so that a
/// 404 is classified as not-found and everything else as transient.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// One page of the whole collection, starting at `offset`.
    async fn fetch_collection_page(&self, limit: usize, offset: usize)
    -> FetchResult<CollectionPage>;

    /// Every member of one category (e.g. `"fire"`).
    async fn fetch_category(&self, category: &str) -> FetchResult<CategoryCollection>;

    async fn fetch_entity(&self, id: u32) -> FetchResult<Entity>;

    async fn fetch_species(&self, id: u32) -> FetchResult<Species>;

    async fn fetch_evolution_chain(&self, id: u32) -> FetchResult<EvolutionChain>;
}
