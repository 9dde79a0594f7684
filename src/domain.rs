//! Domain module - Core harvesting logic and entities
//!
//! This module contains the record model, the metric normalizer, the
//! deduplication index, pagination bookkeeping and the collaborator ports.
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod dedup;
pub mod metrics;
pub mod pagination;
pub mod record;
pub mod services;

// Re-export commonly used items for convenience
pub use dedup::DedupIndex;
pub use metrics::normalize;
pub use pagination::{CrawlState, HeightObservation, PaginationState, Termination};
pub use record::{Engagement, FeedRow, IdentityKey, Record, TimestampSource, UNKNOWN_AUTHOR};
pub use services::{
    CollaboratorError, CollaboratorResult, DocumentTree, MemorySink, RecordNode, RecordSink,
    SelectorRole,
};
