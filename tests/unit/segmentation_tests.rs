/*!
 * Tests for the hybrid segmenter with scripted oracles
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use subsplit::splitting::NoopOracle;
use subsplit::text_utils;

use crate::common::mock_oracles::{FailingOracle, FixedOffsetOracle, FixedOracle, SlowOracle};
use crate::common::segmenter;

const SENTENCE: &str = "My brother painted the fence bright blue";

#[tokio::test]
async fn test_segment_acceptedOracleSplit_shouldSplitIntoHalves() {
    let oracle = FixedOracle::new(1.0);
    let segmenter = segmenter("en", Arc::new(oracle.clone()), 4, Duration::from_secs(5));

    let (pieces, stats) = segmenter.segment(SENTENCE).await;

    assert_eq!(pieces, vec!["My brother painted", "the fence bright blue"]);
    assert_eq!(stats.oracle_accepted, 1);
    assert_eq!(stats.force_splits, 0);
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn test_segment_lowScore_shouldRejectAndForceSplit() {
    let segmenter = segmenter("en", Arc::new(FixedOracle::new(0.5)), 4, Duration::from_secs(5));

    let (pieces, stats) = segmenter.segment(SENTENCE).await;

    assert_eq!(stats.oracle_rejected, 1);
    assert_eq!(stats.oracle_accepted, 0);
    assert!(stats.force_splits >= 1);
    assert!(pieces.iter().all(|p| text_utils::length_units(p) <= 4));
}

#[tokio::test]
async fn test_segment_oracleTimeout_shouldFallBackQuickly() {
    let segmenter = segmenter(
        "en",
        Arc::new(SlowOracle::new(Duration::from_secs(30))),
        4,
        Duration::from_millis(50),
    );

    let started = Instant::now();
    let (pieces, stats) = segmenter.segment(SENTENCE).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(stats.oracle_failed, 1);
    assert_eq!(pieces.join(" "), SENTENCE);
    assert!(pieces.iter().all(|p| text_utils::length_units(p) <= 4));
}

#[tokio::test]
async fn test_segment_invalidOffset_shouldCountAsFailure() {
    let segmenter = segmenter("en", Arc::new(FixedOffsetOracle { offset: 0 }), 4, Duration::from_secs(5));

    let (pieces, stats) = segmenter.segment(SENTENCE).await;

    assert_eq!(stats.oracle_accepted, 0);
    assert_eq!(stats.oracle_failed, 1);
    assert_eq!(pieces.join(" "), SENTENCE);
}

#[tokio::test]
async fn test_segment_offsetInsideMultibyteChar_shouldBeIgnored() {
    let text = "今天天气很好我们去公园散步吧";
    let segmenter = segmenter("zh", Arc::new(FixedOffsetOracle { offset: 1 }), 5, Duration::from_secs(5));

    let (pieces, stats) = segmenter.segment(text).await;

    assert_eq!(stats.oracle_accepted, 0);
    assert_eq!(pieces.concat(), text);
    assert!(pieces.iter().all(|p| text_utils::length_units(p) <= 5));
}

#[tokio::test]
async fn test_segment_failingOracle_shouldBeDeterministic() {
    let text = "The committee reviewed every single proposal submitted during the long autumn session. \
                Nobody expected the final vote to take place before midnight on Friday evening.";
    let segmenter = segmenter("en", Arc::new(FailingOracle), 6, Duration::from_secs(5));

    let (first, _) = segmenter.segment(text).await;
    let (second, _) = segmenter.segment(text).await;

    assert_eq!(first, second);
    assert!(first.iter().all(|p| text_utils::length_units(p) <= 6));
}

#[tokio::test]
async fn test_segment_manySentences_shouldKeepOrderUnderConcurrency() {
    let sentences: Vec<String> = (0..12)
        .map(|i| format!("Sentence number {} has quite a few words in it to split.", i))
        .collect();
    let text = sentences.join(" ");
    let segmenter = segmenter("en", Arc::new(FixedOracle::new(1.0)), 5, Duration::from_secs(5));

    let (pieces, _) = segmenter.segment(&text).await;

    assert_eq!(
        text_utils::normalize_text(&pieces.join(" ")),
        text_utils::normalize_text(&text)
    );
    let numbers: Vec<usize> = pieces
        .iter()
        .filter_map(|p| p.strip_prefix("Sentence number "))
        .filter_map(|rest| rest.split_whitespace().next()?.parse().ok())
        .collect();
    assert_eq!(numbers, (0..12).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_segment_noopOracle_shouldMatchRuleOnlyOutputUnderCap() {
    let text = "Hello world. How are you today?";
    let segmenter = segmenter("en", Arc::new(NoopOracle), 20, Duration::from_secs(5));

    let (pieces, stats) = segmenter.segment(text).await;

    assert_eq!(pieces, vec!["Hello world.", "How are you today?"]);
    assert_eq!(stats.oracle_failed, 0);
}
