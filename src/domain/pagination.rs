//! Pagination state of one crawl session.
//!
//! Responsibility:
//! - document height bookkeeping between scroll steps
//! - stagnation counting (unchanged height = one stagnant step)
//! - accepted-record count against the target

use serde::{Deserialize, Serialize};

/// States of the crawl state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlState {
    Initializing,
    Polling,
    Extracting,
    Advancing,
    Terminated,
}

/// Why a crawl stopped. None of these is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// `target_count` records accepted
    TargetReached,
    /// Height stayed unchanged for `stagnation_ceiling` consecutive steps
    FeedExhausted,
    /// External cancellation signal
    Cancelled,
}

/// Result of measuring the document after one pagination step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightObservation {
    /// New content rendered; stagnation counter reset
    Grew,
    /// Height unchanged (or unmeasurable); carries the consecutive count
    Stagnant(u32),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationState {
    pub last_known_document_height: u64,
    pub consecutive_stagnant_steps: u32,
    pub total_accepted_count: usize,
}

impl PaginationState {
    /// Fresh state anchored at the baseline height
    pub const fn new(baseline_height: u64) -> Self {
        Self {
            last_known_document_height: baseline_height,
            consecutive_stagnant_steps: 0,
            total_accepted_count: 0,
        }
    }

    /// Record the height measured after advancing.
    ///
    /// `None` means the collaborator could not report a height, which counts
    /// as a stagnant step. Any change in height (including a shrink after a
    /// re-render) counts as progress.
    pub fn observe_height(&mut self, height: Option<u64>) -> HeightObservation {
        match height {
            Some(h) if h != self.last_known_document_height => {
                self.last_known_document_height = h;
                self.consecutive_stagnant_steps = 0;
                HeightObservation::Grew
            }
            _ => {
                self.consecutive_stagnant_steps = self.consecutive_stagnant_steps.saturating_add(1);
                HeightObservation::Stagnant(self.consecutive_stagnant_steps)
            }
        }
    }

    /// Whether the feed should be treated as exhausted
    pub const fn is_exhausted(&self, stagnation_ceiling: u32) -> bool {
        self.consecutive_stagnant_steps >= stagnation_ceiling
    }

    pub const fn target_reached(&self, target_count: usize) -> bool {
        self.total_accepted_count >= target_count
    }

    pub fn record_accepted(&mut self) {
        self.total_accepted_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_resets_stagnation() {
        let mut state = PaginationState::new(1000);
        assert_eq!(state.observe_height(Some(1000)), HeightObservation::Stagnant(1));
        assert_eq!(state.observe_height(Some(1000)), HeightObservation::Stagnant(2));
        assert_eq!(state.observe_height(Some(1800)), HeightObservation::Grew);
        assert_eq!(state.consecutive_stagnant_steps, 0);
        assert_eq!(state.last_known_document_height, 1800);
    }

    #[test]
    fn test_unmeasurable_height_is_stagnant() {
        let mut state = PaginationState::new(500);
        assert_eq!(state.observe_height(None), HeightObservation::Stagnant(1));
        assert_eq!(state.last_known_document_height, 500);
    }

    #[test]
    fn test_exhaustion_at_ceiling() {
        let mut state = PaginationState::new(10);
        state.observe_height(Some(10));
        assert!(!state.is_exhausted(2));
        state.observe_height(Some(10));
        assert!(state.is_exhausted(2));
    }

    #[test]
    fn test_target_tracking() {
        let mut state = PaginationState::new(0);
        state.record_accepted();
        state.record_accepted();
        assert!(!state.target_reached(3));
        state.record_accepted();
        assert!(state.target_reached(3));
    }
}
