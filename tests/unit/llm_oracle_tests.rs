/*!
 * Tests for the LLM split oracle driven by the mock provider
 */

use std::sync::Arc;
use std::time::Duration;

use subsplit::providers::mock::{MockProvider, MockRequest};
use subsplit::splitting::LlmSplitOracle;
use subsplit::splitting::oracle::SuggestionCache;
use subsplit::text_utils;

use crate::common::segmenter;

const LONG_SENTENCE: &str = "Every morning the old fisherman carried his nets down to the quiet harbour";

#[tokio::test]
async fn test_hybrid_withWorkingModel_shouldUseModelSplits() {
    let provider = MockProvider::working();
    let oracle = LlmSplitOracle::new(provider.clone(), "mock-model", "en");
    let segmenter = segmenter("en", Arc::new(oracle), 7, Duration::from_secs(5));

    let (pieces, stats) = segmenter.segment(LONG_SENTENCE).await;

    assert_eq!(pieces.join(" "), LONG_SENTENCE);
    assert!(pieces.iter().all(|p| text_utils::length_units(p) <= 7));
    assert!(stats.oracle_accepted >= 1);
    assert_eq!(stats.force_splits, 0);
    assert_eq!(provider.request_count(), stats.oracle_accepted);
}

#[tokio::test]
async fn test_hybrid_withFailingModel_shouldStillRespectCap() {
    let oracle = LlmSplitOracle::new(MockProvider::failing(), "mock-model", "en");
    let segmenter = segmenter("en", Arc::new(oracle), 5, Duration::from_secs(5));

    let (pieces, stats) = segmenter.segment(LONG_SENTENCE).await;

    assert_eq!(pieces.join(" "), LONG_SENTENCE);
    assert!(pieces.iter().all(|p| text_utils::length_units(p) <= 5));
    assert_eq!(stats.oracle_accepted, 0);
    assert!(stats.force_splits > 0);
}

#[tokio::test]
async fn test_hybrid_withParaphrasingModel_shouldRejectLowScore() {
    fn paraphrase(_request: &MockRequest) -> String {
        MockProvider::split_response("A fisherman went out early with nets", "to the harbour")
    }
    let provider = MockProvider::working().with_custom_response(paraphrase);
    let oracle = LlmSplitOracle::new(provider, "mock-model", "en");
    let segmenter = segmenter("en", Arc::new(oracle), 7, Duration::from_secs(5));

    let (pieces, stats) = segmenter.segment(LONG_SENTENCE).await;

    assert_eq!(stats.oracle_accepted, 0);
    assert!(stats.oracle_rejected >= 1);
    assert_eq!(pieces.join(" "), LONG_SENTENCE);
}

#[tokio::test]
async fn test_hybrid_withSlowModel_shouldTimeOut() {
    let oracle = LlmSplitOracle::new(MockProvider::slow(10_000), "mock-model", "en");
    let segmenter = segmenter("en", Arc::new(oracle), 7, Duration::from_millis(50));

    let (pieces, stats) = segmenter.segment(LONG_SENTENCE).await;

    assert_eq!(stats.oracle_failed, 1);
    assert!(pieces.iter().all(|p| text_utils::length_units(p) <= 7));
}

#[tokio::test]
async fn test_hybrid_repeatedSentence_shouldHitCache() {
    let provider = MockProvider::working();
    let cache = Arc::new(SuggestionCache::default());
    let oracle = LlmSplitOracle::new(provider.clone(), "mock-model", "en").with_cache(cache.clone());
    let segmenter = segmenter("en", Arc::new(oracle), 7, Duration::from_secs(5));
    let text = format!("{}. {}.", LONG_SENTENCE, LONG_SENTENCE);

    let (first, _) = segmenter.segment(&text).await;
    let requests_after_first = provider.request_count();
    let (second, _) = segmenter.segment(&text).await;

    assert_eq!(first, second);
    assert_eq!(provider.request_count(), requests_after_first);
    assert!(!cache.is_empty());
}
