//! JSON-lines record sink
//!
//! Writes one [`FeedRow`] object per line, in record order.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::domain::{FeedRow, Record, RecordSink};

/// Sink writing `FeedRow` lines to a file, replacing earlier contents
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render records as newline-terminated JSON objects
    pub fn render(records: &[Record]) -> Result<String> {
        let mut out = String::new();
        for record in records {
            let line = serde_json::to_string(&FeedRow::from(record))
                .context("Failed to serialize feed row")?;
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }
}

#[async_trait]
impl RecordSink for JsonLinesSink {
    async fn accept(&self, records: &[Record]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
        }

        let content = Self::render(records)?;
        let mut file = fs::File::create(&self.path)
            .await
            .with_context(|| format!("Failed to create output file {}", self.path.display()))?;
        file.write_all(content.as_bytes())
            .await
            .context("Failed to write feed rows")?;
        file.flush().await.context("Failed to flush feed rows")?;

        info!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Engagement, TimestampSource};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn record(author: &str, text: &str) -> Record {
        Record::new(
            author,
            text,
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            TimestampSource::Document,
            Engagement { likes: 3, ..Engagement::default() },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_writes_one_row_per_line() {
        let dir = TempDir::new().unwrap();
        let sink = JsonLinesSink::new(dir.path().join("out/feed.jsonl"));

        sink.accept(&[record("alice", "first #a"), record("bob", "second @alice")])
            .await
            .unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let rows: Vec<FeedRow> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].username, "alice");
        assert_eq!(rows[0].hashtags, "#a");
        assert_eq!(rows[0].date, "2024-01-02");
        assert_eq!(rows[1].mentions, "alice");
        assert_eq!(rows[1].likes, 3);
    }

    #[tokio::test]
    async fn test_empty_crawl_writes_empty_file() {
        let dir = TempDir::new().unwrap();
        let sink = JsonLinesSink::new(dir.path().join("feed.jsonl"));
        sink.accept(&[]).await.unwrap();
        assert_eq!(std::fs::read_to_string(sink.path()).unwrap(), "");
    }
}
