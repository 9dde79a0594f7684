//! HTML feed parsing infrastructure
//!
//! Selector configuration, the per-record field extractor and a snapshot
//! backed document tree.

pub mod config;
pub mod field_extractor;
pub mod html_feed;

// Re-export public types
pub use super::parsing_error::{ExtractionError, ExtractionResult};
pub use config::{ExtractionConfig, FeedSelectors};
pub use field_extractor::{FieldExtractor, StrategyChain};
pub use html_feed::{CompiledSelectors, HtmlRecordNode, HtmlSnapshotFeed};
