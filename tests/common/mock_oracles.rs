/*!
 * Scripted split oracles for tests.
 *
 * None of these touch the network; each one models a single oracle
 * behavior the hybrid segmenter has to cope with.
 */

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use subsplit::errors::OracleError;
use subsplit::splitting::{SemanticSplitOracle, SplitSuggestion};
use subsplit::text_utils;

/// Word boundary closest to the middle of `text`, in length units
pub fn midpoint_offset(text: &str) -> Option<usize> {
    let middle = text_utils::length_units(text) / 2;
    text_utils::word_boundaries(text)
        .into_iter()
        .filter(|&b| text_utils::length_units(&text[..b]) > 0 && text_utils::length_units(&text[b..]) > 0)
        .min_by_key(|&b| text_utils::length_units(&text[..b]).abs_diff(middle))
}

/// Always suggests the midpoint with a fixed score
#[derive(Debug, Clone)]
pub struct FixedOracle {
    score: f32,
    calls: Arc<AtomicUsize>,
}

impl FixedOracle {
    pub fn new(score: f32) -> Self {
        Self {
            score,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SemanticSplitOracle for FixedOracle {
    async fn suggest_split(&self, text: &str, _max_len: usize) -> Result<SplitSuggestion, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        midpoint_offset(text)
            .map(|offset| SplitSuggestion {
                offset,
                score: self.score,
            })
            .ok_or_else(|| OracleError::MalformedResponse("no boundary".to_string()))
    }
}

/// Answers only after a delay, long enough to hit any sensible timeout
#[derive(Debug, Clone)]
pub struct SlowOracle {
    delay: Duration,
}

impl SlowOracle {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl SemanticSplitOracle for SlowOracle {
    async fn suggest_split(&self, text: &str, _max_len: usize) -> Result<SplitSuggestion, OracleError> {
        tokio::time::sleep(self.delay).await;
        Ok(SplitSuggestion {
            offset: midpoint_offset(text).unwrap_or(0),
            score: 1.0,
        })
    }
}

/// Always errors
#[derive(Debug, Clone, Default)]
pub struct FailingOracle;

#[async_trait]
impl SemanticSplitOracle for FailingOracle {
    async fn suggest_split(&self, _text: &str, _max_len: usize) -> Result<SplitSuggestion, OracleError> {
        Err(OracleError::MalformedResponse("scripted failure".to_string()))
    }
}

/// Returns the same offset for every text
#[derive(Debug, Clone)]
pub struct FixedOffsetOracle {
    pub offset: usize,
}

#[async_trait]
impl SemanticSplitOracle for FixedOffsetOracle {
    async fn suggest_split(&self, _text: &str, _max_len: usize) -> Result<SplitSuggestion, OracleError> {
        Ok(SplitSuggestion {
            offset: self.offset,
            score: 1.0,
        })
    }
}
