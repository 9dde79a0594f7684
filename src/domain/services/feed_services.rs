//! Collaborator ports of the harvesting core
//!
//! The rendering layer (browser automation, snapshot replay, ...) sits behind
//! [`DocumentTree`]; persistence sits behind [`RecordSink`]. The core never
//! assumes a fixed document schema: everything it reads goes through
//! [`SelectorRole`] lookups on an opaque [`RecordNode`].

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::domain::record::Record;

/// Logical sub-element of a rendered post, resolved by the collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorRole {
    /// Text spans of the author block (display name, `@handle`, ...)
    UserNameSpans,
    /// Profile link inside the author block
    UserNameLink,
    /// Body text of the post
    TweetText,
    /// Element carrying the machine-readable timestamp
    Time,
    LikeButton,
    RepostButton,
    ReplyButton,
    /// Link to the post's analytics (view count)
    AnalyticsLink,
    /// Loose spans in the action bar
    EngagementSpans,
}

impl SelectorRole {
    pub const ALL: [Self; 9] = [
        Self::UserNameSpans,
        Self::UserNameLink,
        Self::TweetText,
        Self::Time,
        Self::LikeButton,
        Self::RepostButton,
        Self::ReplyButton,
        Self::AnalyticsLink,
        Self::EngagementSpans,
    ];
}

/// Failure of a document-tree call. Always recoverable from the core's view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("Document tree unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Document tree call '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Snapshot error: {message}")]
    Snapshot { message: String },
}

impl CollaboratorError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot {
            message: message.into(),
        }
    }
}

pub type CollaboratorResult<T> = std::result::Result<T, CollaboratorError>;

/// Opaque handle to one rendered feed item.
///
/// Lookups are pure reads; `None`/empty means "not rendered (yet)".
pub trait RecordNode: Send + Sync {
    /// Trimmed text of the first element playing `role`
    fn find_text(&self, role: SelectorRole) -> Option<String>;

    /// Attribute `attr_name` of the first element playing `role`
    fn find_attribute(&self, role: SelectorRole, attr_name: &str) -> Option<String>;

    /// Trimmed, non-empty texts of every element playing `role`, in document order
    fn find_texts(&self, role: SelectorRole) -> Vec<String>;
}

/// Queryable, paginating view of the rendered feed
#[async_trait]
pub trait DocumentTree: Send + Sync {
    type Node: RecordNode;

    /// Current rendered height of the document
    async fn current_height(&self) -> CollaboratorResult<u64>;

    /// Record nodes currently present in the document, in document order
    async fn visible_record_nodes(&self) -> CollaboratorResult<Vec<Self::Node>>;

    /// Trigger loading of the next page (e.g. scroll to bottom); may block
    async fn advance(&self) -> CollaboratorResult<()>;
}

/// Consumer of the finalized record sequence
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Receive the ordered, duplicate-free records of one crawl
    async fn accept(&self, records: &[Record]) -> Result<()>;
}

/// Sink keeping records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Record>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything accepted so far
    pub async fn records(&self) -> Vec<Record> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn accept(&self, records: &[Record]) -> Result<()> {
        self.records.lock().await.extend_from_slice(records);
        Ok(())
    }
}
