//! A headless pagination and caching engine for browsing a large remote catalog.
//!
//! For viewport-driven loading (sentinel scheduling, list switching), see the
//! `catalog-pager-adapter` crate.
//!
//! This crate focuses on the data side of an infinite catalog view:
//! - a keyed query cache with in-flight de-duplication, staleness and inactivity eviction
//! - a caller-side retry policy
//! - an incremental list accumulator, written once against a pluggable page strategy
//! - two strategies: server-driven cursor paging and client-side slicing of a bulk resource
//! - linearization of evolution trees for display
//!
//! It is UI-agnostic and executor-agnostic. The host provides:
//! - a [`CatalogService`] implementation (the transport)
//! - a millisecond clock and, optionally, a spawner for background revalidation
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod cache;
mod client;
mod detail;
mod error;
mod evolution;
mod key;
mod list;
pub mod model;
mod options;
mod retry;
mod service;
mod strategy;
mod types;


pub use cache::QueryCache;
pub use client::{CatalogClient, normalize_category};
pub use detail::{EntityDetail, EntityNav, evolution_steps, load_detail};
pub use error::{FetchError, FetchResult, FetchResultExt};
pub use evolution::{
    ChainStep, EvolutionCondition, Gender, StatComparison, conditions, connector_labels, flatten,
    humanize,
};
pub use key::QueryKey;
pub use list::{Completion, InfiniteList, ListId, PageTicket};
pub use options::{CacheOptions, NowFn, PageSizes, QueryOptions, SpawnFn};
pub use retry::{RetryPolicy, retry};
pub use service::CatalogService;
pub use strategy::{
    CatalogStrategy, ClientSliceStrategy, PageFuture, PageStrategy, ServerCursorStrategy,
};
pub use types::{CursorParam, ListPhase, Page, PageParam, SliceParam, loaded_len};
