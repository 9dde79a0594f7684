//! Test utilities for feed-harvester
//!
//! In-memory collaborators so controller and extractor tests run without a
//! rendered page: [`StaticNode`] answers role lookups from fixed data and
//! [`ScriptedFeed`] replays a fixed sequence of pages.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::{CollaboratorError, CollaboratorResult, DocumentTree, RecordNode, SelectorRole};

/// Record node backed by fixed role data
#[derive(Debug, Clone, Default)]
pub struct StaticNode {
    texts: HashMap<SelectorRole, Vec<String>>,
    attributes: HashMap<(SelectorRole, String), String>,
}

impl StaticNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node rendering `@author` in the author block and `text` as the body
    pub fn post(author: &str, text: &str) -> Self {
        Self::new()
            .with_texts(SelectorRole::UserNameSpans, &[author, &format!("@{author}")])
            .with_text(SelectorRole::TweetText, text)
    }

    #[must_use]
    pub fn with_text(mut self, role: SelectorRole, text: &str) -> Self {
        self.texts.entry(role).or_default().push(text.to_string());
        self
    }

    #[must_use]
    pub fn with_texts(mut self, role: SelectorRole, texts: &[&str]) -> Self {
        self.texts
            .entry(role)
            .or_default()
            .extend(texts.iter().map(|t| (*t).to_string()));
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, role: SelectorRole, name: &str, value: &str) -> Self {
        self.attributes
            .insert((role, name.to_string()), value.to_string());
        self
    }
}

impl RecordNode for StaticNode {
    fn find_text(&self, role: SelectorRole) -> Option<String> {
        self.texts
            .get(&role)
            .and_then(|texts| texts.first())
            .map(|t| t.trim().to_string())
    }

    fn find_attribute(&self, role: SelectorRole, attr_name: &str) -> Option<String> {
        self.attributes
            .get(&(role, attr_name.to_string()))
            .cloned()
    }

    fn find_texts(&self, role: SelectorRole) -> Vec<String> {
        self.texts
            .get(&role)
            .map(|texts| {
                texts
                    .iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One rendered state of a scripted feed
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub height: u64,
    pub nodes: Vec<StaticNode>,
}

impl FeedPage {
    pub fn new(height: u64, nodes: Vec<StaticNode>) -> Self {
        Self { height, nodes }
    }
}

/// Document-tree call that can be scripted to fail or hang
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedCall {
    Height,
    Nodes,
    Advance,
}

/// Document tree replaying a fixed list of pages.
///
/// `advance` moves to the next page and stays on the last one once the
/// script runs out, so the height stops changing.
#[derive(Debug, Default)]
pub struct ScriptedFeed {
    pages: Vec<FeedPage>,
    cursor: AtomicUsize,
    advances: AtomicUsize,
    failures: Mutex<HashSet<(FeedCall, usize)>>,
    hanging: HashSet<FeedCall>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ScriptedFeed {
    pub fn new(pages: Vec<FeedPage>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    /// Feed whose every page shows `nodes` at a constant height
    pub fn repeating(nodes: Vec<StaticNode>, height: u64) -> Self {
        Self::new(vec![FeedPage::new(height, nodes)])
    }

    /// Fail `call` once while page `page` is current
    #[must_use]
    pub fn fail_once(self, call: FeedCall, page: usize) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert((call, page));
        }
        self
    }

    /// Never complete `call`, as a stalled page would
    #[must_use]
    pub fn hang(mut self, call: FeedCall) -> Self {
        self.hanging.insert(call);
        self
    }

    /// Cancel `token` when the `count`-th advance happens
    #[must_use]
    pub fn cancel_after_advances(mut self, count: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((count, token));
        self
    }

    /// Number of `advance` calls served so far
    pub fn advance_count(&self) -> usize {
        self.advances.load(Ordering::SeqCst)
    }

    fn current(&self) -> Option<&FeedPage> {
        let index = self.cursor.load(Ordering::SeqCst);
        self.pages.get(index).or_else(|| self.pages.last())
    }

    async fn stall_if_hanging(&self, call: FeedCall) {
        if self.hanging.contains(&call) {
            std::future::pending::<()>().await;
        }
    }

    fn take_failure(&self, call: FeedCall) -> CollaboratorResult<()> {
        let page = self.cursor.load(Ordering::SeqCst);
        let failed = self
            .failures
            .lock()
            .map(|mut failures| failures.remove(&(call, page)))
            .unwrap_or(false);
        if failed {
            Err(CollaboratorError::unavailable(format!("scripted {call:?} failure on page {page}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentTree for ScriptedFeed {
    type Node = StaticNode;

    async fn current_height(&self) -> CollaboratorResult<u64> {
        self.stall_if_hanging(FeedCall::Height).await;
        self.take_failure(FeedCall::Height)?;
        Ok(self.current().map_or(0, |page| page.height))
    }

    async fn visible_record_nodes(&self) -> CollaboratorResult<Vec<StaticNode>> {
        self.stall_if_hanging(FeedCall::Nodes).await;
        self.take_failure(FeedCall::Nodes)?;
        Ok(self.current().map(|page| page.nodes.clone()).unwrap_or_default())
    }

    async fn advance(&self) -> CollaboratorResult<()> {
        let served = self.advances.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((count, token)) = &self.cancel_after {
            if served >= *count {
                token.cancel();
            }
        }
        self.stall_if_hanging(FeedCall::Advance).await;
        self.take_failure(FeedCall::Advance)?;

        let last = self.pages.len().saturating_sub(1);
        let next = (self.cursor.load(Ordering::SeqCst) + 1).min(last);
        self.cursor.store(next, Ordering::SeqCst);
        Ok(())
    }
}

/// Build a [`StaticNode`] post: `post!("alice", "hello")`
#[macro_export]
macro_rules! post {
    ($author:expr, $text:expr) => {{ $crate::test_utils::StaticNode::post($author, $text) }};
}
