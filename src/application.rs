//! Application layer module
//!
//! Orchestrates the domain logic: the crawl state machine and search query
//! construction.

pub mod crawl_controller;
pub mod search;

pub use crawl_controller::{CrawlController, CrawlOutcome};
pub use search::SearchQuery;
