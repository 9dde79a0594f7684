//! Infrastructure layer for parsing, configuration, logging and output
//!
//! Adapters behind the domain ports: the HTML snapshot document tree, the
//! field extractor, the JSON-lines sink and process-level setup.

pub mod config;
pub mod json_sink;
pub mod logging;
pub mod parsing;
pub mod parsing_error;

// Re-export commonly used items
pub use config::{AppConfig, ConfigManager, CrawlConfig, LoggingConfig};
pub use json_sink::JsonLinesSink;
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use parsing::{
    ExtractionConfig, FeedSelectors, FieldExtractor, HtmlRecordNode, HtmlSnapshotFeed,
};
pub use parsing_error::{ExtractionError, ExtractionResult};
