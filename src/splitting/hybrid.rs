/*!
 * Hybrid segmentation.
 *
 * The rule splitter produces sentences; every sentence still over the hard
 * cap walks a small state machine:
 *
 * ```text
 * Pending -> RuleSplit -> Done                        (under the cap)
 *                      -> AwaitingOracle -> OracleSplit -> recurse on both halves
 *                                        -> ForceSplit  -> Done
 * ```
 *
 * Oracle calls for sibling sentences run concurrently behind a semaphore,
 * each with its own timeout. Results are reassembled in input order. When the
 * oracle fails, is rejected, or the recursion depth is exhausted, the
 * sentence is force-split deterministically at the word boundary nearest its
 * middle, so the hard cap always holds.
 */

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::errors::OracleError;
use crate::segment::TextSegment;
use crate::text_utils;
use crate::timeline::WordTimeline;

use super::oracle::{SemanticSplitOracle, SplitSuggestion};
use super::rules::RuleSplitter;

/// Settings for the hybrid segmenter
#[derive(Debug, Clone)]
pub struct HybridConfig {
    /// Hard cap in length units
    pub max_segment_length: usize,
    /// Minimum oracle score for a suggestion to be used
    pub acceptance_threshold: f32,
    /// Oracle splits allowed along one branch before force-splitting
    pub max_recursion_depth: usize,
    /// Timeout of a single oracle call
    pub oracle_timeout: Duration,
    /// Concurrent oracle calls
    pub concurrent_requests: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            max_segment_length: 20,
            acceptance_threshold: 0.9,
            max_recursion_depth: 4,
            oracle_timeout: Duration::from_secs(30),
            concurrent_requests: 4,
        }
    }
}

/// Per-sentence processing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    Pending,
    RuleSplit,
    AwaitingOracle,
    OracleSplit { offset: usize },
    ForceSplit,
    Done,
}

/// Counters describing how sentences were resolved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SegmenterStats {
    /// Sentences out of the rule splitter
    pub rule_pieces: usize,
    /// Oracle suggestions used
    pub oracle_accepted: usize,
    /// Oracle suggestions scored below the threshold
    pub oracle_rejected: usize,
    /// Oracle calls that errored, timed out or were unusable
    pub oracle_failed: usize,
    /// Deterministic fallback splits
    pub force_splits: usize,
}

impl SegmenterStats {
    fn merge(&mut self, other: &SegmenterStats) {
        self.rule_pieces += other.rule_pieces;
        self.oracle_accepted += other.oracle_accepted;
        self.oracle_rejected += other.oracle_rejected;
        self.oracle_failed += other.oracle_failed;
        self.force_splits += other.force_splits;
    }
}

/// Pieces and counters of one resolved sentence
#[derive(Debug, Default)]
struct Resolution {
    pieces: Vec<String>,
    stats: SegmenterStats,
}

impl Resolution {
    fn absorb(&mut self, other: Resolution) {
        self.pieces.extend(other.pieces);
        self.stats.merge(&other.stats);
    }
}

/// Orchestrates the rule splitter and the semantic oracle
#[derive(Debug)]
pub struct HybridSegmenter {
    rules: RuleSplitter,
    oracle: Arc<dyn SemanticSplitOracle>,
    config: HybridConfig,
    permits: Arc<Semaphore>,
}

impl HybridSegmenter {
    pub fn new(rules: RuleSplitter, oracle: Arc<dyn SemanticSplitOracle>, config: HybridConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.concurrent_requests.max(1)));
        Self {
            rules,
            oracle,
            config,
            permits,
        }
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    /// Split text into sentences no longer than the hard cap
    pub async fn segment(&self, text: &str) -> (Vec<String>, SegmenterStats) {
        let sentences = self.rules.split(text);
        let mut stats = SegmenterStats {
            rule_pieces: sentences.len(),
            ..Default::default()
        };

        let mut results = stream::iter(sentences.into_iter().enumerate())
            .map(|(index, sentence)| async move { (index, self.resolve(sentence, 0).await) })
            .buffer_unordered(self.config.concurrent_requests.max(1))
            .collect::<Vec<_>>()
            .await;

        // Concurrency must not change the order
        results.sort_by_key(|(index, _)| *index);

        let mut pieces = Vec::new();
        for (_, resolution) in results {
            pieces.extend(resolution.pieces);
            stats.merge(&resolution.stats);
        }

        info!(
            "Segmented into {} pieces ({} rule sentences, {} oracle splits, {} fallback splits)",
            pieces.len(),
            stats.rule_pieces,
            stats.oracle_accepted,
            stats.force_splits
        );
        (pieces, stats)
    }

    /// Segment a whole transcript into indexed text segments
    pub async fn segment_timeline(&self, timeline: &WordTimeline) -> (Vec<TextSegment>, SegmenterStats) {
        let (pieces, stats) = self.segment(&timeline.transcript()).await;
        let segments = pieces
            .into_iter()
            .enumerate()
            .map(|(index, text)| TextSegment::new(index, text))
            .collect();
        (segments, stats)
    }

    fn resolve(&self, text: String, depth: usize) -> BoxFuture<'_, Resolution> {
        async move {
            let mut resolution = Resolution::default();
            let mut state = SegmentState::Pending;

            loop {
                state = match state {
                    SegmentState::Pending => SegmentState::RuleSplit,
                    SegmentState::RuleSplit => {
                        if text_utils::length_units(&text) <= self.config.max_segment_length {
                            resolution.pieces.push(text.clone());
                            SegmentState::Done
                        } else if depth >= self.config.max_recursion_depth {
                            debug!("Recursion depth {} reached, force-splitting", depth);
                            SegmentState::ForceSplit
                        } else {
                            SegmentState::AwaitingOracle
                        }
                    }
                    SegmentState::AwaitingOracle => match self.consult(&text).await {
                        Ok(suggestion) => {
                            resolution.stats.oracle_accepted += 1;
                            SegmentState::OracleSplit {
                                offset: suggestion.offset,
                            }
                        }
                        Err(OracleError::Rejected { score, threshold }) => {
                            debug!("Oracle split rejected ({:.2} < {:.2})", score, threshold);
                            resolution.stats.oracle_rejected += 1;
                            SegmentState::ForceSplit
                        }
                        Err(e) => {
                            if !matches!(e, OracleError::Unavailable) {
                                warn!(
                                    "Oracle failed for '{}': {}",
                                    text_utils::truncate_text(&text, 40),
                                    e
                                );
                            }
                            resolution.stats.oracle_failed += 1;
                            SegmentState::ForceSplit
                        }
                    },
                    SegmentState::OracleSplit { offset } => {
                        let (left, right) = text_utils::split_at_offset(&text, offset);
                        let (left, right) =
                            futures::join!(self.resolve(left, depth + 1), self.resolve(right, depth + 1));
                        resolution.absorb(left);
                        resolution.absorb(right);
                        SegmentState::Done
                    }
                    SegmentState::ForceSplit => {
                        let pieces = self.force_split(&text);
                        resolution.stats.force_splits += pieces.len().saturating_sub(1);
                        resolution.pieces.extend(pieces);
                        SegmentState::Done
                    }
                    SegmentState::Done => return resolution,
                };
            }
        }
        .boxed()
    }

    /// One oracle call with timeout and validation
    async fn consult(&self, text: &str) -> Result<SplitSuggestion, OracleError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| OracleError::Unavailable)?;

        let max_len = self.config.max_segment_length;
        let suggestion = tokio::time::timeout(self.config.oracle_timeout, self.oracle.suggest_split(text, max_len))
            .await
            .map_err(|_| OracleError::Timeout(self.config.oracle_timeout.as_millis() as u64))??;

        if !text_utils::splits_into_units(text, suggestion.offset) {
            return Err(OracleError::MalformedResponse(format!(
                "offset {} is not a usable split point",
                suggestion.offset
            )));
        }
        if suggestion.score < self.config.acceptance_threshold {
            return Err(OracleError::Rejected {
                score: suggestion.score,
                threshold: self.config.acceptance_threshold,
            });
        }
        Ok(suggestion)
    }

    /// Deterministic split until every piece fits the hard cap
    pub fn force_split(&self, text: &str) -> Vec<String> {
        force_split(text, self.config.max_segment_length)
    }
}

/// Recursively cut at the word boundary nearest the middle until each piece
/// has at most `max_len` length units.
///
/// Boundaries inside protected spans are avoided while any other exists. A
/// piece without any viable boundary is kept whole.
pub fn force_split(text: &str, max_len: usize) -> Vec<String> {
    let units = text_utils::length_units(text);
    if units <= max_len.max(1) {
        return vec![text.to_string()];
    }

    let viable: Vec<usize> = text_utils::word_boundaries(text)
        .into_iter()
        .filter(|&b| text_utils::splits_into_units(text, b))
        .collect();
    let spans = text_utils::protected_spans(text);
    let preferred: Vec<usize> = viable
        .iter()
        .copied()
        .filter(|&b| !text_utils::is_protected(&spans, b))
        .collect();
    let candidates = if preferred.is_empty() { &viable } else { &preferred };

    let middle = units / 2;
    let Some(offset) = candidates
        .iter()
        .copied()
        .min_by_key(|&b| text_utils::length_units(&text[..b]).abs_diff(middle))
    else {
        return vec![text.to_string()];
    };

    let (left, right) = text_utils::split_at_offset(text, offset);
    let mut pieces = force_split(&left, max_len);
    pieces.extend(force_split(&right, max_len));
    pieces
}
