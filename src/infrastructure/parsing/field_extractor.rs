//! Per-record field extraction with ordered fallback strategies
//!
//! Every field is resolved through a [`StrategyChain`]: named pure functions
//! `node -> Option<value>` tried in order, first non-empty result wins.
//! Optional fields fall back to defaults; only a missing `text` rejects the
//! whole node.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{debug, trace};
use url::Url;

use super::config::ExtractionConfig;
use super::{ExtractionError, ExtractionResult};
use crate::domain::metrics::normalize;
use crate::domain::record::{Engagement, MENTION_MARKER, Record, TimestampSource, UNKNOWN_AUTHOR};
use crate::domain::{RecordNode, SelectorRole};

type StrategyFn<N, T> = Box<dyn Fn(&N) -> Option<T> + Send + Sync>;

/// One named way of reading a field from a node
pub struct Strategy<N, T> {
    name: &'static str,
    run: StrategyFn<N, T>,
}

/// Ordered fallback list for one field
pub struct StrategyChain<N, T> {
    field: &'static str,
    strategies: Vec<Strategy<N, T>>,
}

impl<N, T> StrategyChain<N, T> {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            strategies: Vec::new(),
        }
    }

    /// Append a strategy tried after the existing ones
    #[must_use]
    pub fn then<F>(mut self, name: &'static str, run: F) -> Self
    where
        F: Fn(&N) -> Option<T> + Send + Sync + 'static,
    {
        self.strategies.push(Strategy {
            name,
            run: Box::new(run),
        });
        self
    }

    /// First strategy yielding a value, with its name
    pub fn resolve(&self, node: &N) -> Option<(&'static str, T)> {
        self.strategies
            .iter()
            .find_map(|strategy| (strategy.run)(node).map(|value| (strategy.name, value)))
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name).collect()
    }
}

/// Builds [`Record`]s out of record nodes
pub struct FieldExtractor<N> {
    author: StrategyChain<N, String>,
    text: StrategyChain<N, String>,
    timestamp: StrategyChain<N, DateTime<Utc>>,
    likes: StrategyChain<N, u64>,
    reposts: StrategyChain<N, u64>,
    replies: StrategyChain<N, u64>,
    views: StrategyChain<N, u64>,
    parallel: bool,
}

impl<N: RecordNode + 'static> FieldExtractor<N> {
    /// Create an extractor with the default heuristics
    pub fn new() -> Self {
        Self::with_config(&ExtractionConfig::default())
    }

    /// Create an extractor with custom keywords and base URL
    pub fn with_config(config: &ExtractionConfig) -> Self {
        let base_url = Url::parse(&config.base_url).ok();
        let view_keyword = config.view_keyword.to_lowercase();
        let span_view_keyword = view_keyword.clone();

        Self {
            author: StrategyChain::new("author")
                .then("user_name_spans", handle_from_spans::<N>)
                .then("profile_link", move |node: &N| {
                    handle_from_profile_link(node, base_url.as_ref())
                }),
            text: StrategyChain::new("text").then("tweet_text", |node: &N| {
                node.find_text(SelectorRole::TweetText)
                    .filter(|t| !t.trim().is_empty())
            }),
            timestamp: StrategyChain::new("timestamp").then("time_datetime", |node: &N| {
                node.find_attribute(SelectorRole::Time, "datetime")
                    .and_then(|raw| parse_timestamp(&raw))
            }),
            likes: labelled_counter("likes", SelectorRole::LikeButton, &config.like_keyword),
            reposts: labelled_counter("reposts", SelectorRole::RepostButton, &config.repost_keyword),
            replies: labelled_counter("replies", SelectorRole::ReplyButton, &config.reply_keyword),
            views: StrategyChain::new("views")
                .then("analytics_label", move |node: &N| {
                    node.find_attribute(SelectorRole::AnalyticsLink, "aria-label")
                        .filter(|label| label.to_lowercase().contains(&view_keyword))
                        .map(|label| normalize(&label))
                })
                // Bare counters in the action bar belong to other buttons
                .then("engagement_spans", move |node: &N| {
                    node.find_texts(SelectorRole::EngagementSpans)
                        .into_iter()
                        .find(|text| {
                            text.to_lowercase().contains(&span_view_keyword)
                                && text.chars().any(|c| c.is_ascii_digit())
                        })
                        .map(|text| normalize(&text))
                }),
            parallel: config.parallel_extraction,
        }
    }

    /// Extract one record, or skip the node when its text is missing
    pub fn extract(&self, node: &N) -> Option<Record> {
        match self.extract_detailed(node) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Skipping record node: {}", e);
                None
            }
        }
    }

    /// Extract one record, exposing why a node was rejected
    pub fn extract_detailed(&self, node: &N) -> ExtractionResult<Record> {
        let Some((_, text)) = self.text.resolve(node) else {
            return Err(ExtractionError::required_field_missing(
                self.text.field(),
                &self.text.strategy_names(),
            ));
        };

        let author = resolve_or_default(&self.author, node, || UNKNOWN_AUTHOR.to_string());

        let (timestamp, timestamp_source) = match self.timestamp.resolve(node) {
            Some((_, ts)) => (ts, TimestampSource::Document),
            None => {
                trace!("timestamp unavailable, using extraction time");
                (Utc::now(), TimestampSource::ExtractionTime)
            }
        };

        let engagement = Engagement {
            likes: resolve_or_default(&self.likes, node, || 0),
            reposts: resolve_or_default(&self.reposts, node, || 0),
            replies: resolve_or_default(&self.replies, node, || 0),
            views: resolve_or_default(&self.views, node, || 0),
        };

        Record::new(author, text, timestamp, timestamp_source, engagement).ok_or_else(|| {
            ExtractionError::required_field_missing(
                self.text.field(),
                &self.text.strategy_names(),
            )
        })
    }

    /// Extract a poll's worth of nodes, keeping node order and dropping skips
    pub fn extract_batch(&self, nodes: &[N]) -> Vec<Record> {
        if self.parallel {
            let extracted: Vec<Option<Record>> =
                nodes.par_iter().map(|node| self.extract(node)).collect();
            extracted.into_iter().flatten().collect()
        } else {
            nodes.iter().filter_map(|node| self.extract(node)).collect()
        }
    }
}

impl<N: RecordNode + 'static> Default for FieldExtractor<N> {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_or_default<N, T>(chain: &StrategyChain<N, T>, node: &N, default: impl FnOnce() -> T) -> T {
    match chain.resolve(node) {
        Some((strategy, value)) => {
            trace!("{} resolved by {}", chain.field(), strategy);
            value
        }
        None => {
            trace!("{} unavailable, using default", chain.field());
            default()
        }
    }
}

/// Counter read from a button's `aria-label`, accepted only when the label
/// names this counter
fn labelled_counter<N: RecordNode>(
    field: &'static str,
    role: SelectorRole,
    keyword: &str,
) -> StrategyChain<N, u64> {
    let keyword = keyword.to_lowercase();
    StrategyChain::new(field).then("aria_label", move |node: &N| {
        node.find_attribute(role, "aria-label")
            .filter(|label| label.to_lowercase().contains(&keyword))
            .map(|label| normalize(&label))
    })
}

/// `@handle` shown in the author block, marker stripped
fn handle_from_spans<N: RecordNode>(node: &N) -> Option<String> {
    node.find_texts(SelectorRole::UserNameSpans)
        .into_iter()
        .find(|text| text.starts_with(MENTION_MARKER))
        .map(|text| text.trim_start_matches(MENTION_MARKER).trim().to_string())
        .filter(|handle| !handle.is_empty())
}

/// Last path segment of the author's profile link
fn handle_from_profile_link<N: RecordNode>(node: &N, base_url: Option<&Url>) -> Option<String> {
    let href = node.find_attribute(SelectorRole::UserNameLink, "href")?;
    let url = match base_url {
        Some(base) => base.join(&href).ok()?,
        None => Url::parse(&href).ok()?,
    };
    url.path_segments()?
        .rev()
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::StaticNode;
    use chrono::TimeZone;

    fn full_node() -> StaticNode {
        StaticNode::new()
            .with_texts(SelectorRole::UserNameSpans, &["Alice Doe", "@alice", "·"])
            .with_attribute(SelectorRole::UserNameLink, "href", "/alice")
            .with_text(SelectorRole::TweetText, "Now hiring #jobs #remote cc @bob")
            .with_attribute(SelectorRole::Time, "datetime", "2024-03-05T14:07:09.000Z")
            .with_attribute(SelectorRole::LikeButton, "aria-label", "12 Likes. Like")
            .with_attribute(SelectorRole::RepostButton, "aria-label", "1.2K reposts. Retweet")
            .with_attribute(SelectorRole::ReplyButton, "aria-label", "3 Replies. Reply")
            .with_attribute(SelectorRole::AnalyticsLink, "aria-label", "45,678 views. View post analytics")
    }

    #[test]
    fn test_full_extraction() {
        let extractor = FieldExtractor::new();
        let record = extractor.extract(&full_node()).unwrap();

        assert_eq!(record.author(), "alice");
        assert_eq!(record.text(), "Now hiring #jobs #remote cc @bob");
        assert_eq!(
            record.timestamp(),
            Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
        );
        assert_eq!(record.timestamp_source(), TimestampSource::Document);
        assert_eq!(record.tags(), ["#jobs", "#remote"]);
        assert_eq!(record.mentions(), ["bob"]);
        assert_eq!(record.likes(), 12);
        assert_eq!(record.reposts(), 1200);
        assert_eq!(record.replies(), 3);
        assert_eq!(record.views(), 45_678);
    }

    #[test]
    fn test_missing_text_rejects_node() {
        let extractor = FieldExtractor::new();
        let node = StaticNode::new().with_texts(SelectorRole::UserNameSpans, &["@alice"]);

        assert!(extractor.extract(&node).is_none());
        let err = extractor.extract_detailed(&node).unwrap_err();
        assert_eq!(
            err,
            ExtractionError::required_field_missing("text", &["tweet_text"])
        );
    }

    #[test]
    fn test_whitespace_text_rejects_node() {
        let extractor = FieldExtractor::new();
        let node = StaticNode::new().with_text(SelectorRole::TweetText, "   ");
        assert!(extractor.extract(&node).is_none());
    }

    #[test]
    fn test_author_falls_back_to_profile_link() {
        let extractor = FieldExtractor::new();
        let node = StaticNode::new()
            .with_texts(SelectorRole::UserNameSpans, &["Alice Doe"])
            .with_attribute(SelectorRole::UserNameLink, "href", "https://twitter.com/alice_dev/?ref=x")
            .with_text(SelectorRole::TweetText, "hello");

        assert_eq!(extractor.extract(&node).unwrap().author(), "alice_dev");
    }

    #[test]
    fn test_author_defaults_to_unknown() {
        let extractor = FieldExtractor::new();
        let node = StaticNode::new().with_text(SelectorRole::TweetText, "anonymous post");
        assert_eq!(extractor.extract(&node).unwrap().author(), UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_timestamp_falls_back_to_now() {
        let extractor = FieldExtractor::new();
        let before = Utc::now();
        let node = StaticNode::new()
            .with_text(SelectorRole::TweetText, "no time element")
            .with_attribute(SelectorRole::Time, "datetime", "yesterday-ish");

        let record = extractor.extract(&node).unwrap();
        assert_eq!(record.timestamp_source(), TimestampSource::ExtractionTime);
        assert!(record.timestamp() >= before);
    }

    #[test]
    fn test_reply_label_without_keyword_stays_zero() {
        let extractor = FieldExtractor::new();
        let node = StaticNode::new()
            .with_text(SelectorRole::TweetText, "post")
            .with_text(SelectorRole::ReplyButton, "57")
            .with_attribute(SelectorRole::ReplyButton, "aria-label", "57 Likes");

        let record = extractor.extract(&node).unwrap();
        assert_eq!(record.replies(), 0);
    }

    #[test]
    fn test_views_fall_back_to_action_bar_spans() {
        let extractor = FieldExtractor::new();
        let node = StaticNode::new()
            .with_text(SelectorRole::TweetText, "post")
            .with_texts(SelectorRole::EngagementSpans, &["4", "Reply", "2.5K views"]);

        assert_eq!(extractor.extract(&node).unwrap().views(), 2500);
    }

    #[test]
    fn test_like_count_span_is_not_taken_for_views() {
        let extractor = FieldExtractor::new();
        let node = StaticNode::new()
            .with_text(SelectorRole::TweetText, "post")
            .with_attribute(SelectorRole::LikeButton, "aria-label", "1.2K Likes. Like")
            .with_texts(SelectorRole::EngagementSpans, &["4", "10", "1.2K"]);

        let record = extractor.extract(&node).unwrap();
        assert_eq!(record.likes(), 1200);
        assert_eq!(record.views(), 0);
    }

    #[test]
    fn test_tags_ignore_dedicated_sub_elements() {
        let extractor = FieldExtractor::new();
        let node = StaticNode::new()
            .with_text(SelectorRole::TweetText, "only #one here")
            .with_texts(SelectorRole::EngagementSpans, &["#two", "#three"]);

        assert_eq!(extractor.extract(&node).unwrap().tags(), ["#one"]);
    }

    #[test]
    fn test_custom_keyword_config() {
        let config = ExtractionConfig {
            like_keyword: "gefällt".to_string(),
            ..ExtractionConfig::default()
        };
        let extractor = FieldExtractor::with_config(&config);
        let node = StaticNode::new()
            .with_text(SelectorRole::TweetText, "post")
            .with_attribute(SelectorRole::LikeButton, "aria-label", "8 Gefällt mir");

        assert_eq!(extractor.extract(&node).unwrap().likes(), 8);
    }

    #[test]
    fn test_batch_preserves_order_and_skips() {
        let nodes = vec![
            StaticNode::new().with_text(SelectorRole::TweetText, "first"),
            StaticNode::new(),
            StaticNode::new().with_text(SelectorRole::TweetText, "third"),
        ];

        for parallel in [false, true] {
            let config = ExtractionConfig {
                parallel_extraction: parallel,
                ..ExtractionConfig::default()
            };
            let extractor = FieldExtractor::with_config(&config);
            let texts: Vec<String> = extractor
                .extract_batch(&nodes)
                .iter()
                .map(|r| r.text().to_string())
                .collect();
            assert_eq!(texts, ["first", "third"]);
        }
    }

    #[test]
    fn test_strategy_chain_order() {
        let chain: StrategyChain<u32, &str> = StrategyChain::new("demo")
            .then("never", |_| None)
            .then("even", |n: &u32| (n % 2 == 0).then_some("even"))
            .then("any", |_| Some("any"));

        assert_eq!(chain.resolve(&4), Some(("even", "even")));
        assert_eq!(chain.resolve(&3), Some(("any", "any")));
        assert_eq!(chain.strategy_names(), ["never", "even", "any"]);
    }
}
