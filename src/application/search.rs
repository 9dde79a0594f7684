//! Live-search query for a set of tags

use anyhow::{Context, Result, bail};
use url::Url;

use crate::domain::record::TAG_MARKER;

/// `#a OR #b` query over one or more tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    tags: Vec<String>,
}

impl SearchQuery {
    /// Build a query; tags may be given with or without the `#` marker
    pub fn from_tags<I, S>(tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tags: Vec<String> = tags
            .into_iter()
            .map(|tag| tag.as_ref().trim().trim_start_matches(TAG_MARKER).to_string())
            .filter(|tag| !tag.is_empty())
            .collect();

        if tags.is_empty() {
            bail!("At least one tag is required");
        }
        Ok(Self { tags })
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Query text, e.g. `#jobs OR #vacancy`
    pub fn query(&self) -> String {
        self.tags
            .iter()
            .map(|tag| format!("{TAG_MARKER}{tag}"))
            .collect::<Vec<_>>()
            .join(" OR ")
    }

    /// Live-search URL under `base_url`
    pub fn url(&self, base_url: &str) -> Result<Url> {
        let base = Url::parse(base_url).with_context(|| format!("Invalid base URL: {base_url}"))?;
        let mut url = base.join("/search").context("Failed to build search URL")?;
        url.query_pairs_mut()
            .append_pair("q", &self.query())
            .append_pair("src", "typed_query")
            .append_pair("f", "live");
        Ok(url)
    }
}
