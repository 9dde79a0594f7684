//! Parsing configuration for feed extraction
//!
//! Centralized configuration for CSS selectors and field heuristics.

use serde::{Deserialize, Serialize};

use crate::domain::SelectorRole;

/// Field extraction heuristics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Base URL for resolving relative profile links
    pub base_url: String,

    /// Keyword the like button label must contain
    pub like_keyword: String,

    /// Keyword the repost button label must contain
    pub repost_keyword: String,

    /// Keyword the reply button label must contain
    pub reply_keyword: String,

    /// Keyword the analytics link label must contain
    pub view_keyword: String,

    /// Extract the nodes of one poll on the rayon pool
    pub parallel_extraction: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://twitter.com".to_string(),
            like_keyword: "like".to_string(),
            repost_keyword: "retweet".to_string(),
            reply_keyword: "repl".to_string(),
            view_keyword: "view".to_string(),
            parallel_extraction: false,
        }
    }
}

/// CSS selectors for the rendered feed - multiple fallbacks per role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSelectors {
    /// Selectors for one post container
    pub record_container: Vec<String>,

    /// Spans of the author block
    pub user_name_spans: Vec<String>,

    /// Profile link of the author block
    pub user_name_link: Vec<String>,

    /// Post body
    pub tweet_text: Vec<String>,

    /// Timestamp element
    pub time: Vec<String>,

    pub like_button: Vec<String>,
    pub repost_button: Vec<String>,
    pub reply_button: Vec<String>,

    /// Analytics (view count) link
    pub analytics_link: Vec<String>,

    /// Loose spans in the action bar
    pub engagement_spans: Vec<String>,
}

impl FeedSelectors {
    /// Fallback list for one role
    pub fn for_role(&self, role: SelectorRole) -> &[String] {
        match role {
            SelectorRole::UserNameSpans => &self.user_name_spans,
            SelectorRole::UserNameLink => &self.user_name_link,
            SelectorRole::TweetText => &self.tweet_text,
            SelectorRole::Time => &self.time,
            SelectorRole::LikeButton => &self.like_button,
            SelectorRole::RepostButton => &self.repost_button,
            SelectorRole::ReplyButton => &self.reply_button,
            SelectorRole::AnalyticsLink => &self.analytics_link,
            SelectorRole::EngagementSpans => &self.engagement_spans,
        }
    }
}

impl Default for FeedSelectors {
    fn default() -> Self {
        Self {
            record_container: vec![
                "[data-testid='tweet']".to_string(),
                "article[role='article']".to_string(),
            ],
            user_name_spans: vec!["[data-testid='User-Name'] span".to_string()],
            user_name_link: vec!["[data-testid='User-Name'] a".to_string()],
            tweet_text: vec!["[data-testid='tweetText']".to_string()],
            time: vec!["time".to_string()],
            like_button: vec![
                "[data-testid='like']".to_string(),
                "[data-testid='unlike']".to_string(),
            ],
            repost_button: vec![
                "[data-testid='retweet']".to_string(),
                "[data-testid='unretweet']".to_string(),
            ],
            reply_button: vec!["[data-testid='reply']".to_string()],
            analytics_link: vec!["[href*='analytics']".to_string()],
            engagement_spans: vec![
                "[role='group'] span, [role='button'] span".to_string(),
            ],
        }
    }
}
