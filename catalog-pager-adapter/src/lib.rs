//! Adapter utilities for the `catalog-pager` crate.
//!
//! The `catalog-pager` crate is UI-agnostic and focuses on data: caching, pagination and chain
//! flattening. This crate provides small, framework-neutral helpers commonly needed by
//! adapters:
//!
//! - A scroll-triggered fetch scheduler (lock, burst, cool-down) over an injected observer
//! - Sentinel geometry for adapters without a native intersection observer
//! - A browser controller that switches the active list when the category filter changes
//!
//! This crate is intentionally framework-agnostic (no DOM/ratatui/egui bindings).
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod browser;
mod scheduler;
mod sentinel;

#[cfg(test)]
mod tests;

pub use browser::{Browser, ListSnapshot};
pub use scheduler::{
    Burst, BurstPermit, FetchScheduler, IgnoreReason, ObservationId, PagedSource,
    SchedulerFlags, SchedulerLock, SchedulerOptions, SentinelObserver, Trigger,
};
pub use sentinel::{GeometryObserver, IntersectionEvent, SentinelGeometry, sentinel_in_range};
