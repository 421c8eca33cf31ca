//! Multi-request operations
//!
//! - [`metrics`] - Billable usage record and its merge
//! - [`pagination`] - Page-based and cursor-based listing
//! - [`batch`] - Continue-on-error batches of independent items

pub mod batch;
pub mod metrics;
pub mod pagination;

pub use batch::{BatchExecutor, ProcessFuture, MAX_BATCH_ITEMS};
pub use metrics::{Metered, Metrics};
pub use pagination::{
    FetchFuture, Listing, Page, PageInfo, PageRequest, Paginated, TotalPages, DEFAULT_PER_PAGE,
};
