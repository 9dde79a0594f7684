//! feed-harvester - incremental harvesting of infinite-scroll feeds
//!
//! Drives a paginating document tree, extracts structured records from each
//! rendered post with ordered fallback strategies, deduplicates them across
//! the session and hands the result to a sink.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export the main entry points
pub use application::{CrawlController, CrawlOutcome, SearchQuery};
pub use domain::{DocumentTree, Record, RecordNode, RecordSink, SelectorRole, Termination};
pub use infrastructure::{AppConfig, FieldExtractor, HtmlSnapshotFeed, JsonLinesSink};
