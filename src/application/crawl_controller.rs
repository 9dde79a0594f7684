//! Crawl controller: drives the pagination state machine
//!
//! `Initializing → Polling → Extracting → Advancing → (Polling …) → Terminated`
//!
//! One controller runs one crawl at a time on a single task. The dedup index
//! and pagination state live inside [`CrawlController::run`], so every
//! invocation starts from a clean session.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{
    CollaboratorError, CollaboratorResult, CrawlState, DedupIndex, DocumentTree, HeightObservation,
    PaginationState, Record, RecordSink, Termination,
};
use crate::infrastructure::config::{AppConfig, CrawlConfig};
use crate::infrastructure::parsing::{ExtractionConfig, FieldExtractor};

/// Final result of one crawl
#[derive(Debug, Clone, Serialize)]
pub struct CrawlOutcome {
    /// Unique records in first-seen order, never more than the target
    pub records: Vec<Record>,
    pub termination: Termination,
    /// Number of polls of the document tree
    pub polls: u32,
    pub session_id: Uuid,
}

/// Paginating harvester over a [`DocumentTree`]
pub struct CrawlController<D: DocumentTree> {
    document: Arc<D>,
    extractor: FieldExtractor<D::Node>,
    config: CrawlConfig,
    cancellation_token: CancellationToken,
}

impl<D> CrawlController<D>
where
    D: DocumentTree,
    D::Node: 'static,
{
    pub fn new(document: Arc<D>, config: CrawlConfig, extraction: &ExtractionConfig) -> Self {
        Self {
            document,
            extractor: FieldExtractor::with_config(extraction),
            config,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Controller using the crawl and extraction sections of `config`
    pub fn from_config(document: Arc<D>, config: &AppConfig) -> Self {
        Self::new(document, config.crawl.clone(), &config.extraction)
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Token that stops the crawl at the next state transition
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Collect up to `target_count` unique records
    pub async fn crawl(&self, target_count: usize, stagnation_ceiling: u32) -> Vec<Record> {
        self.run(target_count, stagnation_ceiling).await.records
    }

    /// Crawl with the configured target and ceiling, then hand the records to `sink`
    pub async fn crawl_into<S>(&self, sink: &S) -> Result<CrawlOutcome>
    where
        S: RecordSink + ?Sized,
    {
        self.config.validate()?;
        let outcome = self
            .run(self.config.target_count, self.config.stagnation_ceiling)
            .await;
        sink.accept(&outcome.records).await?;
        Ok(outcome)
    }

    /// Run the state machine until the target is reached, the feed is
    /// exhausted or the crawl is cancelled
    pub async fn run(&self, target_count: usize, stagnation_ceiling: u32) -> CrawlOutcome {
        let session_id = Uuid::new_v4();
        let mut records = Vec::new();
        let mut polls = 0_u32;

        info!(
            %session_id,
            target_count, stagnation_ceiling, "Starting crawl session"
        );

        let termination = self
            .drive(target_count, stagnation_ceiling, &mut records, &mut polls)
            .await;
        Self::transition(CrawlState::Terminated);

        info!(
            %session_id,
            ?termination,
            total = records.len(),
            polls,
            "Crawl session finished"
        );

        CrawlOutcome {
            records,
            termination,
            polls,
            session_id,
        }
    }

    async fn drive(
        &self,
        target_count: usize,
        stagnation_ceiling: u32,
        records: &mut Vec<Record>,
        polls: &mut u32,
    ) -> Termination {
        Self::transition(CrawlState::Initializing);
        if self.is_cancelled() {
            return Termination::Cancelled;
        }

        let baseline = match self.call("current_height", self.document.current_height()).await {
            Ok(height) => height,
            Err(e) => {
                warn!("Baseline height unavailable, starting from 0: {}", e);
                0
            }
        };
        let mut pagination = PaginationState::new(baseline);
        let mut index = DedupIndex::new();

        loop {
            Self::transition(CrawlState::Polling);
            if self.is_cancelled() {
                return Termination::Cancelled;
            }

            let nodes = match self
                .call("visible_record_nodes", self.document.visible_record_nodes())
                .await
            {
                Ok(nodes) => nodes,
                Err(e) => {
                    warn!("Poll failed, treating as empty: {}", e);
                    Vec::new()
                }
            };
            *polls += 1;

            Self::transition(CrawlState::Extracting);
            if self.is_cancelled() {
                return Termination::Cancelled;
            }

            let mut new_records = 0_usize;
            for record in self.extractor.extract_batch(&nodes) {
                if pagination.target_reached(target_count) {
                    break;
                }
                if index.insert_if_new(&record.identity_key()) {
                    records.push(record);
                    pagination.record_accepted();
                    new_records += 1;
                }
            }

            info!(
                poll = *polls,
                nodes = nodes.len(),
                new = new_records,
                total = pagination.total_accepted_count,
                target = target_count,
                "Poll processed"
            );

            Self::transition(CrawlState::Advancing);
            if self.is_cancelled() {
                return Termination::Cancelled;
            }
            if pagination.target_reached(target_count) {
                return Termination::TargetReached;
            }

            let advanced = self.call("advance", self.document.advance()).await;
            if let Err(e) = &advanced {
                warn!("Advance failed, counting as stagnant step: {}", e);
            }
            if !self.pause(self.config.settle_delay_ms).await {
                return Termination::Cancelled;
            }

            let height = if advanced.is_ok() {
                match self.call("current_height", self.document.current_height()).await {
                    Ok(height) => Some(height),
                    Err(e) => {
                        warn!("Height unavailable, counting as stagnant step: {}", e);
                        None
                    }
                }
            } else {
                None
            };

            match pagination.observe_height(height) {
                HeightObservation::Grew => {
                    debug!(
                        height = pagination.last_known_document_height,
                        "Document grew"
                    );
                }
                HeightObservation::Stagnant(steps) => {
                    debug!(steps, ceiling = stagnation_ceiling, "Document height unchanged");
                    if pagination.is_exhausted(stagnation_ceiling) {
                        info!("No new content after {} attempts, feed exhausted", steps);
                        return Termination::FeedExhausted;
                    }
                    if !self.pause(self.config.stagnation_backoff_ms).await {
                        return Termination::Cancelled;
                    }
                }
            }
        }
    }

    fn transition(state: CrawlState) {
        debug!(?state, "Crawl state transition");
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Sleep unless cancelled first; `false` when cancelled
    async fn pause(&self, millis: u64) -> bool {
        if millis == 0 {
            return !self.is_cancelled();
        }
        tokio::select! {
            () = self.cancellation_token.cancelled() => false,
            () = tokio::time::sleep(Duration::from_millis(millis)) => true,
        }
    }

    /// Bound one collaborator call by the configured timeout
    async fn call<T, F>(&self, operation: &str, fut: F) -> CollaboratorResult<T>
    where
        F: Future<Output = CollaboratorResult<T>>,
    {
        let timeout_ms = self.config.call_timeout_ms;
        tokio::time::timeout(Duration::from_millis(timeout_ms), fut)
            .await
            .unwrap_or_else(|_| {
                Err(CollaboratorError::Timeout {
                    operation: operation.to_string(),
                    timeout_ms,
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MemorySink;
    use crate::post;
    use crate::test_utils::{FeedCall, FeedPage, ScriptedFeed};

    fn fast_config() -> CrawlConfig {
        CrawlConfig {
            settle_delay_ms: 0,
            stagnation_backoff_ms: 0,
            ..CrawlConfig::default()
        }
    }

    fn controller(feed: ScriptedFeed) -> CrawlController<ScriptedFeed> {
        CrawlController::new(Arc::new(feed), fast_config(), &ExtractionConfig::default())
    }

    fn texts(records: &[Record]) -> Vec<&str> {
        records.iter().map(Record::text).collect()
    }

    #[tokio::test]
    async fn test_overlapping_polls_yield_unique_records_in_order() {
        let feed = ScriptedFeed::new(vec![
            FeedPage::new(1000, vec![post!("a", "one"), post!("b", "two"), post!("c", "three")]),
            FeedPage::new(2000, vec![post!("b", "two"), post!("c", "three"), post!("d", "four")]),
            FeedPage::new(3000, vec![post!("e", "five")]),
        ]);
        let outcome = controller(feed).run(4, 3).await;

        assert_eq!(texts(&outcome.records), ["one", "two", "three", "four"]);
        assert_eq!(outcome.termination, Termination::TargetReached);
        assert_eq!(outcome.polls, 2);
    }

    #[tokio::test]
    async fn test_acceptance_stops_at_target_within_a_poll() {
        let feed = ScriptedFeed::repeating(
            vec![post!("a", "1"), post!("b", "2"), post!("c", "3")],
            100,
        );
        let outcome = controller(feed).run(2, 3).await;

        assert_eq!(texts(&outcome.records), ["1", "2"]);
        assert_eq!(outcome.termination, Termination::TargetReached);
    }

    #[tokio::test]
    async fn test_stagnant_feed_terminates_at_ceiling() {
        let feed = Arc::new(ScriptedFeed::repeating(vec![post!("a", "only")], 500));
        let controller =
            CrawlController::new(feed.clone(), fast_config(), &ExtractionConfig::default());

        let outcome = controller.run(10, 3).await;

        assert_eq!(texts(&outcome.records), ["only"]);
        assert_eq!(outcome.termination, Termination::FeedExhausted);
        assert_eq!(feed.advance_count(), 3);
        assert_eq!(outcome.polls, 3);
    }

    #[tokio::test]
    async fn test_height_change_without_new_records_is_progress() {
        let same = vec![post!("a", "only")];
        let feed = Arc::new(ScriptedFeed::new(vec![
            FeedPage::new(100, same.clone()),
            FeedPage::new(200, same.clone()),
            FeedPage::new(300, same),
        ]));
        let controller =
            CrawlController::new(feed.clone(), fast_config(), &ExtractionConfig::default());

        let outcome = controller.run(5, 1).await;

        // Two growing steps, then one stagnant step on the last page
        assert_eq!(feed.advance_count(), 3);
        assert_eq!(outcome.termination, Termination::FeedExhausted);
        assert_eq!(outcome.records.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_poll() {
        let feed = ScriptedFeed::repeating(vec![post!("a", "one")], 100);
        let controller = controller(feed);
        controller.cancellation_token().cancel();

        let outcome = controller.run(5, 3).await;
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.termination, Termination::Cancelled);
        assert_eq!(outcome.polls, 0);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_settle_delay() {
        let token = CancellationToken::new();
        let feed = ScriptedFeed::new(vec![
            FeedPage::new(100, vec![post!("a", "one")]),
            FeedPage::new(200, vec![post!("b", "two")]),
        ])
        .cancel_after_advances(1, token.clone());
        let config = CrawlConfig {
            settle_delay_ms: 60_000,
            ..fast_config()
        };
        let controller = CrawlController::new(Arc::new(feed), config, &ExtractionConfig::default())
            .with_cancellation_token(token);

        let outcome = tokio::time::timeout(Duration::from_secs(5), controller.run(5, 3))
            .await
            .unwrap();

        assert_eq!(texts(&outcome.records), ["one"]);
        assert_eq!(outcome.termination, Termination::Cancelled);
    }

    #[tokio::test]
    async fn test_collaborator_failures_do_not_abort() {
        let feed = ScriptedFeed::new(vec![
            FeedPage::new(100, vec![post!("a", "one")]),
            FeedPage::new(200, vec![post!("b", "two")]),
            FeedPage::new(300, vec![post!("c", "three")]),
        ])
        .fail_once(FeedCall::Height, 0)
        .fail_once(FeedCall::Nodes, 1)
        .fail_once(FeedCall::Advance, 1);

        let outcome = controller(feed).run(3, 5).await;

        assert_eq!(texts(&outcome.records), ["one", "two", "three"]);
        assert_eq!(outcome.termination, Termination::TargetReached);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_advance_times_out_as_stagnant_step() {
        let feed = Arc::new(
            ScriptedFeed::repeating(vec![post!("a", "one"), post!("b", "two")], 100)
                .hang(FeedCall::Advance),
        );
        let config = CrawlConfig {
            call_timeout_ms: 1_000,
            ..fast_config()
        };
        let controller =
            CrawlController::new(feed.clone(), config, &ExtractionConfig::default());

        let outcome = tokio::time::timeout(Duration::from_secs(10), controller.run(10, 3))
            .await
            .unwrap();

        assert_eq!(outcome.termination, Termination::FeedExhausted);
        assert_eq!(texts(&outcome.records), ["one", "two"]);
        assert_eq!(outcome.polls, 3);
        assert_eq!(feed.advance_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_height_reads_time_out() {
        let feed = ScriptedFeed::new(vec![
            FeedPage::new(100, vec![post!("a", "one")]),
            FeedPage::new(200, vec![post!("b", "two")]),
        ])
        .hang(FeedCall::Height);
        let config = CrawlConfig {
            call_timeout_ms: 1_000,
            ..fast_config()
        };
        let controller = CrawlController::new(Arc::new(feed), config, &ExtractionConfig::default());

        let outcome = tokio::time::timeout(Duration::from_secs(10), controller.run(10, 2))
            .await
            .unwrap();

        // Baseline falls back to 0 and every later height read is a stagnant step
        assert_eq!(outcome.termination, Termination::FeedExhausted);
        assert_eq!(texts(&outcome.records), ["one", "two"]);
        assert_eq!(outcome.polls, 2);
    }

    #[tokio::test]
    async fn test_crawl_into_hands_records_to_sink() {
        let feed = ScriptedFeed::repeating(vec![post!("a", "one"), post!("b", "two")], 100);
        let config = CrawlConfig {
            target_count: 2,
            ..fast_config()
        };
        let controller = CrawlController::new(Arc::new(feed), config, &ExtractionConfig::default());
        let sink = MemorySink::new();

        let outcome = tokio_test::assert_ok!(controller.crawl_into(&sink).await);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(sink.records().await, outcome.records);
    }

    #[tokio::test]
    async fn test_crawl_into_rejects_zero_target() {
        let feed = ScriptedFeed::repeating(vec![post!("a", "one")], 100);
        let config = CrawlConfig {
            target_count: 0,
            ..fast_config()
        };
        let controller = CrawlController::new(Arc::new(feed), config, &ExtractionConfig::default());

        assert!(controller.crawl_into(&MemorySink::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let feed = Arc::new(ScriptedFeed::repeating(vec![post!("a", "one")], 100));
        let controller = CrawlController::new(feed, fast_config(), &ExtractionConfig::default());

        let first = controller.run(1, 1).await;
        let second = controller.run(1, 1).await;
        assert_eq!(texts(&first.records), ["one"]);
        assert_eq!(texts(&second.records), ["one"]);
        assert_eq!(
            first.records[0].identity_key().fingerprint(),
            second.records[0].identity_key().fingerprint()
        );
        assert_ne!(first.session_id, second.session_id);
    }
}
