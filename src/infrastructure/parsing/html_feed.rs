//! Document tree backed by saved HTML snapshots of the feed
//!
//! Each snapshot is one rendered state of the page, in scroll order.
//! `advance` moves to the next snapshot; the last one repeats once the
//! sequence runs out, so the reported height stops changing and the crawl
//! sees a stagnant feed.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use super::config::FeedSelectors;
use super::{ExtractionError, ExtractionResult};
use crate::domain::{CollaboratorError, CollaboratorResult, DocumentTree, RecordNode, SelectorRole};

static SCROLL_HEIGHT: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("body[data-scroll-height]").expect("scroll height selector is valid")
});

/// Selector fallback lists compiled once per feed
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    container: Vec<Selector>,
    roles: HashMap<SelectorRole, Vec<Selector>>,
}

impl CompiledSelectors {
    /// Compile every role; a role with no valid selector is an error
    pub fn compile(selectors: &FeedSelectors) -> ExtractionResult<Self> {
        let container = compile_selectors("record_container", &selectors.record_container)?;
        let mut roles = HashMap::new();
        for role in SelectorRole::ALL {
            let name = format!("{role:?}");
            roles.insert(role, compile_selectors(&name, selectors.for_role(role))?);
        }
        Ok(Self { container, roles })
    }

    fn for_role(&self, role: SelectorRole) -> &[Selector] {
        self.roles.get(&role).map_or(&[], Vec::as_slice)
    }
}

/// Compile selectors, warning about invalid ones
fn compile_selectors(role: &str, selector_strings: &[String]) -> ExtractionResult<Vec<Selector>> {
    let mut selectors = Vec::new();
    let mut rejected = Vec::new();

    for selector_str in selector_strings {
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push(selector),
            Err(e) => {
                let err = ExtractionError::invalid_selector(role, selector_str, &e.to_string());
                warn!("{}", err);
                rejected.push(selector_str.clone());
            }
        }
    }

    if selectors.is_empty() {
        return Err(ExtractionError::NoUsableSelector {
            role: role.to_string(),
            rejected,
        });
    }

    Ok(selectors)
}

/// One element captured from a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CapturedElement {
    text: String,
    attributes: HashMap<String, String>,
}

impl CapturedElement {
    fn capture(element: ElementRef<'_>) -> Self {
        Self {
            text: element.text().collect::<String>().trim().to_string(),
            attributes: element
                .value()
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }
}

/// Owned copy of one post container.
///
/// For each role, holds every match of the first fallback selector that
/// matched anything inside the container.
#[derive(Debug, Clone, Default)]
pub struct HtmlRecordNode {
    roles: HashMap<SelectorRole, Vec<CapturedElement>>,
}

impl HtmlRecordNode {
    fn capture(container: ElementRef<'_>, selectors: &CompiledSelectors) -> Self {
        let mut roles = HashMap::new();
        for role in SelectorRole::ALL {
            let matched = selectors.for_role(role).iter().find_map(|selector| {
                let elements: Vec<CapturedElement> = container
                    .select(selector)
                    .map(CapturedElement::capture)
                    .collect();
                (!elements.is_empty()).then_some(elements)
            });
            if let Some(elements) = matched {
                roles.insert(role, elements);
            }
        }
        Self { roles }
    }

    fn first(&self, role: SelectorRole) -> Option<&CapturedElement> {
        self.roles.get(&role).and_then(|elements| elements.first())
    }
}

impl RecordNode for HtmlRecordNode {
    fn find_text(&self, role: SelectorRole) -> Option<String> {
        self.first(role).map(|element| element.text.clone())
    }

    fn find_attribute(&self, role: SelectorRole, attr_name: &str) -> Option<String> {
        self.first(role)
            .and_then(|element| element.attributes.get(attr_name))
            .cloned()
    }

    fn find_texts(&self, role: SelectorRole) -> Vec<String> {
        self.roles
            .get(&role)
            .map(|elements| {
                elements
                    .iter()
                    .filter(|element| !element.text.is_empty())
                    .map(|element| element.text.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Replays saved snapshots of a rendered feed
#[derive(Debug)]
pub struct HtmlSnapshotFeed {
    snapshots: Vec<String>,
    selectors: CompiledSelectors,
    cursor: AtomicUsize,
}

impl HtmlSnapshotFeed {
    /// Create a feed from in-memory snapshots, in scroll order
    pub fn from_snapshots(snapshots: Vec<String>, selectors: &FeedSelectors) -> Result<Self> {
        let selectors = CompiledSelectors::compile(selectors)?;
        debug!("Loaded {} feed snapshots", snapshots.len());
        Ok(Self {
            snapshots,
            selectors,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Load every `*.html` file in `dir`, ordered by file name
    pub async fn from_dir(dir: &Path, selectors: &FeedSelectors) -> Result<Self> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to read snapshot directory {}", dir.display()))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("html")) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut snapshots = Vec::with_capacity(paths.len());
        for path in &paths {
            let html = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
            snapshots.push(html);
        }

        info!("Loaded {} snapshots from {}", snapshots.len(), dir.display());
        Self::from_snapshots(snapshots, selectors)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    fn current(&self) -> CollaboratorResult<&str> {
        let index = self.cursor.load(Ordering::SeqCst);
        self.snapshots
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| CollaboratorError::snapshot("no snapshots loaded"))
    }

    // Parsing stays in sync helpers: `Html` is not `Send`.
    fn measure(html: &str) -> u64 {
        let document = Html::parse_document(html);
        document
            .select(&SCROLL_HEIGHT)
            .next()
            .and_then(|body| body.value().attr("data-scroll-height"))
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(html.len() as u64)
    }

    fn capture_nodes(html: &str, selectors: &CompiledSelectors) -> Vec<HtmlRecordNode> {
        let document = Html::parse_document(html);
        selectors
            .container
            .iter()
            .map(|selector| {
                document
                    .select(selector)
                    .map(|container| HtmlRecordNode::capture(container, selectors))
                    .collect::<Vec<_>>()
            })
            .find(|nodes| !nodes.is_empty())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentTree for HtmlSnapshotFeed {
    type Node = HtmlRecordNode;

    async fn current_height(&self) -> CollaboratorResult<u64> {
        self.current().map(Self::measure)
    }

    async fn visible_record_nodes(&self) -> CollaboratorResult<Vec<HtmlRecordNode>> {
        let html = self.current()?;
        Ok(Self::capture_nodes(html, &self.selectors))
    }

    async fn advance(&self) -> CollaboratorResult<()> {
        if self.snapshots.is_empty() {
            return Err(CollaboratorError::snapshot("no snapshots loaded"));
        }
        let last = self.snapshots.len() - 1;
        let next = (self.cursor.load(Ordering::SeqCst) + 1).min(last);
        self.cursor.store(next, Ordering::SeqCst);
        Ok(())
    }
}
