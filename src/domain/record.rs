//! Harvested feed records and their tabular projection

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Sentinel author used when no identifier could be extracted
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Marker prefixing a tag token in post text
pub const TAG_MARKER: char = '#';

/// Marker prefixing a mention token in post text
pub const MENTION_MARKER: char = '@';

static TAG_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\w+").expect("tag pattern is valid"));
static MENTION_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@\w+").expect("mention pattern is valid"));

/// Where a record's timestamp came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampSource {
    /// Machine-readable attribute on the rendered post
    Document,
    /// Wall clock at extraction time (approximation)
    ExtractionTime,
}

/// Engagement counters shown under a post
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: u64,
    pub reposts: u64,
    pub replies: u64,
    pub views: u64,
}

/// One harvested post.
///
/// Only constructed through [`Record::new`], which refuses blank text, so every
/// `Record` in the pipeline is valid for dedup and emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    author: String,
    text: String,
    timestamp: DateTime<Utc>,
    timestamp_source: TimestampSource,
    tags: Vec<String>,
    mentions: Vec<String>,
    likes: u64,
    reposts: u64,
    replies: u64,
    views: u64,
}

impl Record {
    /// Build a record; tags and mentions are always derived from `text`.
    ///
    /// Returns `None` when `text` is empty or whitespace only. A blank
    /// `author` is replaced with [`UNKNOWN_AUTHOR`].
    pub fn new(
        author: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
        timestamp_source: TimestampSource,
        engagement: Engagement,
    ) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return None;
        }

        let author = author.into();
        let author = if author.trim().is_empty() {
            UNKNOWN_AUTHOR.to_string()
        } else {
            author
        };

        Some(Self {
            tags: scan_tags(&text),
            mentions: scan_mentions(&text),
            author,
            text,
            timestamp,
            timestamp_source,
            likes: engagement.likes,
            reposts: engagement.reposts,
            replies: engagement.replies,
            views: engagement.views,
        })
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub const fn timestamp_source(&self) -> TimestampSource {
        self.timestamp_source
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn mentions(&self) -> &[String] {
        &self.mentions
    }

    pub const fn likes(&self) -> u64 {
        self.likes
    }

    pub const fn reposts(&self) -> u64 {
        self.reposts
    }

    pub const fn replies(&self) -> u64 {
        self.replies
    }

    pub const fn views(&self) -> u64 {
        self.views
    }

    pub const fn engagement(&self) -> Engagement {
        Engagement {
            likes: self.likes,
            reposts: self.reposts,
            replies: self.replies,
            views: self.views,
        }
    }

    /// Session-wide identity of this post
    pub fn identity_key(&self) -> IdentityKey<'_> {
        IdentityKey::new(&self.author, &self.text)
    }
}

/// `(author, text)` pair identifying one logical post across re-renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityKey<'a> {
    pub author: &'a str,
    pub text: &'a str,
}

impl<'a> IdentityKey<'a> {
    pub const fn new(author: &'a str, text: &'a str) -> Self {
        Self { author, text }
    }

    /// Fixed-size digest of the pair.
    ///
    /// Both parts are length-prefixed so `("ab", "c")` and `("a", "bc")`
    /// never collide.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.author.len() as u64).to_le_bytes());
        hasher.update(self.author.as_bytes());
        hasher.update(&(self.text.len() as u64).to_le_bytes());
        hasher.update(self.text.as_bytes());
        *hasher.finalize().as_bytes()
    }
}

/// Tag tokens in `text`, marker kept, in order of appearance
pub fn scan_tags(text: &str) -> Vec<String> {
    TAG_TOKEN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Mention tokens in `text`, marker stripped, in order of appearance
pub fn scan_mentions(text: &str) -> Vec<String> {
    MENTION_TOKEN
        .find_iter(text)
        .map(|m| m.as_str().trim_start_matches(MENTION_MARKER).to_string())
        .collect()
}

/// Flat row handed to tabular sinks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRow {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Tweet")]
    pub tweet: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Mentions")]
    pub mentions: String,
    #[serde(rename = "Hashtags")]
    pub hashtags: String,
    #[serde(rename = "Likes")]
    pub likes: u64,
    #[serde(rename = "Retweets")]
    pub retweets: u64,
    #[serde(rename = "Comments")]
    pub comments: u64,
    #[serde(rename = "Replies")]
    pub replies: u64,
    #[serde(rename = "Views")]
    pub views: u64,
}

impl From<&Record> for FeedRow {
    fn from(record: &Record) -> Self {
        Self {
            username: record.author.clone(),
            tweet: record.text.clone(),
            date: record.timestamp.format("%Y-%m-%d").to_string(),
            time: record.timestamp.format("%H:%M:%S").to_string(),
            mentions: record.mentions.join(","),
            hashtags: record.tags.join(","),
            likes: record.likes,
            retweets: record.reposts,
            // The feed exposes a single reply counter
            comments: record.replies,
            replies: record.replies,
            views: record.views,
        }
    }
}
