/*!
 * Tests for alignment through the pipeline, including error isolation
 */

use std::sync::Arc;

use subsplit::errors::SegmentError;
use subsplit::segment::TextSegment;
use subsplit::splitting::NoopOracle;
use subsplit::timeline::WordTimeline;

use crate::common::{evenly_timed, pipeline, words};

#[tokio::test]
async fn test_run_helloWorld_shouldProduceOneSegment() {
    let timeline = WordTimeline::new(words(&[("Hello", 0.0, 0.4), ("world", 0.4, 0.8), (".", 0.8, 0.9)]), "en").unwrap();
    let pipeline = pipeline("en", Arc::new(NoopOracle), 20);

    let output = pipeline.run(&timeline, &["Bonjour le monde.".to_string()]).await.unwrap();

    assert_eq!(output.display.len(), 1);
    let segment = &output.display[0];
    assert_eq!(segment.source_text(), "Hello world.");
    assert_eq!(segment.translation_text(), "Bonjour le monde.");
    assert_eq!(segment.start(), 0.0);
    assert!((segment.end() - 0.9).abs() < 1e-9);
    assert_eq!(segment.segment.confidence, 1.0);
    assert!(output.skipped.is_empty());
}

#[tokio::test]
async fn test_run_trailingPunctuationWord_shouldStayInPreviousSegment() {
    let timeline = WordTimeline::new(words(&[("你好。", 0.0, 1.0), ("……", 1.0, 1.5)]), "zh").unwrap();
    let output = pipeline("zh", Arc::new(NoopOracle), 20).run(&timeline, &[]).await.unwrap();

    assert_eq!(output.display.len(), 1);
    assert_eq!(output.display[0].source_text(), "你好。……");
    assert_eq!(output.display[0].start(), 0.0);
    assert!(output.skipped.is_empty());

    let timeline = WordTimeline::new(
        words(&[("Hello", 0.0, 0.4), ("world.", 0.4, 0.9), ("-", 1.0, 1.1), ("--", 1.1, 1.3)]),
        "en",
    )
    .unwrap();
    let output = pipeline("en", Arc::new(NoopOracle), 20).run(&timeline, &[]).await.unwrap();

    assert_eq!(output.display.len(), 1);
    assert!(output.skipped.is_empty());
}

#[test]
fn test_processSegments_unmatchableSegment_shouldBeSkippedAndReported() {
    let timeline = WordTimeline::new(words(&[("Hello", 0.0, 0.4), ("world", 0.4, 0.8), (".", 0.8, 0.9)]), "en").unwrap();
    let pipeline = pipeline("en", Arc::new(NoopOracle), 20);
    let segments = vec![TextSegment::new(0, "Hello world."), TextSegment::new(1, "Hello")];

    let output = pipeline.process_segments(&segments, &timeline).unwrap();

    assert_eq!(output.display.len(), 1);
    assert_eq!(output.skipped.len(), 1);
    assert_eq!(output.skipped[0].index, 1);
    assert_eq!(output.stats.skipped, 1);
}

#[test]
fn test_processSegments_foreignSegment_shouldAbortWithIndex() {
    let timeline = evenly_timed("one two three four", "en", 0.3, 0.1);
    let pipeline = pipeline("en", Arc::new(NoopOracle), 20);
    let segments = vec![TextSegment::new(0, "one two"), TextSegment::new(1, "completely unrelated")];

    let result = pipeline.process_segments(&segments, &timeline);

    assert!(matches!(result, Err(SegmentError::MalformedInput { index: Some(1), .. })));
}

#[tokio::test]
async fn test_run_translationCountMismatch_shouldBeMalformed() {
    let timeline = evenly_timed("Good morning. Good night.", "en", 0.3, 0.1);
    let pipeline = pipeline("en", Arc::new(NoopOracle), 20);

    let result = pipeline.run(&timeline, &["Bonjour.".to_string()]).await;

    assert!(matches!(result, Err(SegmentError::MalformedInput { .. })));
}

#[test]
fn test_timeline_empty_shouldBeMalformed() {
    let result = WordTimeline::new(Vec::new(), "en");
    assert!(matches!(result, Err(SegmentError::MalformedInput { index: None, .. })));
}

#[test]
fn test_processSegments_noisyTranscript_shouldLowerConfidence() {
    let timeline = WordTimeline::new(
        words(&[
            ("I", 0.0, 0.2),
            ("uh", 0.2, 0.4),
            ("think", 0.4, 0.7),
            ("so.", 0.7, 1.0),
        ]),
        "en",
    )
    .unwrap();
    let pipeline = pipeline("en", Arc::new(NoopOracle), 20);

    let output = pipeline.process_segments(&[TextSegment::new(0, "I think so.")], &timeline).unwrap();

    let segment = &output.display[0];
    assert_eq!(segment.start(), 0.0);
    assert_eq!(segment.end(), 1.0);
    assert!(segment.segment.confidence < 1.0);
}
