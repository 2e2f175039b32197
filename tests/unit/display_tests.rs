/*!
 * Tests for display line budgets and the two projections
 */

use std::sync::Arc;
use std::time::Duration;

use subsplit::alignment::TimestampAligner;
use subsplit::display::{line_weight, DisplayConfig, DisplaySplitter, Projection};
use subsplit::gaps::GapOptimizer;
use subsplit::pipeline::SegmentationPipeline;
use subsplit::segment::{TextSegment, TimedSegment};
use subsplit::splitting::NoopOracle;
use subsplit::text_utils;

use crate::common::{evenly_timed, per_character, segmenter};

fn pipeline_with_display(language: &str, max_segment_length: usize, display: DisplayConfig) -> SegmentationPipeline {
    SegmentationPipeline::new(
        segmenter(language, Arc::new(NoopOracle), max_segment_length, Duration::from_secs(1)),
        TimestampAligner::default(),
        DisplaySplitter::new(display),
        GapOptimizer::default(),
    )
}

#[tokio::test]
async fn test_display_cjkTranscript_shouldRespectBudget() {
    let text = "今天天气很好，我们一起去公园散步吧。然后我们去吃晚饭。";
    let timeline = per_character(text, "zh", 0.2);
    let pipeline = pipeline_with_display(
        "zh",
        30,
        DisplayConfig {
            max_line_weight: 16,
            ..Default::default()
        },
    );

    let output = pipeline.run(&timeline, &[]).await.unwrap();

    assert!(!output.display.is_empty());
    for segment in &output.display {
        for line in &segment.source_lines {
            assert!(line.weight <= 16, "line '{}' weighs {}", line.text, line.weight);
            assert_eq!(line.weight, line_weight(&line.text));
        }
    }
    let rebuilt: String = output
        .display
        .iter()
        .flat_map(|s| s.source_lines.iter().map(|l| l.text.clone()))
        .collect();
    assert_eq!(rebuilt, text);
}

#[tokio::test]
async fn test_display_bilingualLines_shouldRespectBudget() {
    let timeline = evenly_timed(
        "The delegation arrived late but the negotiations continued well into the night.",
        "en",
        0.3,
        0.05,
    );
    let pipeline = pipeline_with_display(
        "en",
        20,
        DisplayConfig {
            max_line_weight: 24,
            ..Default::default()
        },
    );

    let (segments, _) = pipeline.segment(&timeline).await;
    let translations: Vec<String> = segments
        .iter()
        .map(|_| "La délégation est arrivée en retard mais les négociations ont continué.".to_string())
        .collect();
    let output = pipeline.run(&timeline, &translations).await.unwrap();

    for segment in &output.display {
        for line in segment.source_lines.iter().chain(&segment.translation_lines) {
            assert!(line.weight <= 24, "line '{}' weighs {}", line.text, line.weight);
        }
    }
}

#[tokio::test]
async fn test_resplit_compliantOutput_shouldBeIdempotent() {
    let timeline = evenly_timed(
        "Please close the door quietly. The baby is finally asleep upstairs in her little room.",
        "en",
        0.25,
        0.05,
    );
    let display = DisplaySplitter::new(DisplayConfig {
        max_line_weight: 20,
        ..Default::default()
    });
    let pipeline = SegmentationPipeline::new(
        segmenter("en", Arc::new(NoopOracle), 20, Duration::from_secs(1)),
        TimestampAligner::default(),
        display.clone(),
        GapOptimizer::default(),
    );

    let output = pipeline.run(&timeline, &[]).await.unwrap();

    for segment in output.display.iter().chain(&output.dubbing) {
        assert_eq!(&display.resplit(segment), segment);
    }
}

#[test]
fn test_dubbingCapped_shouldInterpolateWithinParentSpan() {
    let display = DisplaySplitter::new(DisplayConfig {
        max_line_weight: 42,
        dubbing_max_line_weight: Some(20),
        interpolation_confidence_factor: 0.8,
    });
    let timed = vec![TimedSegment::new(
        TextSegment::new(3, "I never thought we would make it this far together")
            .with_translation("Je n'ai jamais cru que nous irions si loin ensemble"),
        10.0,
        14.0,
        1.0,
    )];

    let dubbing = display.project(&timed, Projection::Dubbing);

    assert!(dubbing.len() > 1);
    assert_eq!(dubbing.first().unwrap().start(), 10.0);
    assert_eq!(dubbing.last().unwrap().end(), 14.0);
    for pair in dubbing.windows(2) {
        assert!(pair[0].end() <= pair[1].start() + 1e-9);
    }
    for piece in &dubbing {
        assert_eq!(piece.index(), 3);
        assert!(piece.dual_use);
        assert!((piece.segment.confidence - 0.8).abs() < 1e-6);
        assert!(piece.translation_lines.iter().all(|l| l.weight <= 20));
    }
    let translation: Vec<String> = dubbing.iter().map(|s| s.segment.text.translated_text.clone()).collect();
    assert_eq!(
        text_utils::normalize_text(&translation.join(" ")),
        text_utils::normalize_text("Je n'ai jamais cru que nous irions si loin ensemble")
    );
}

#[test]
fn test_displayProjection_shouldShareTimedList() {
    let display = DisplaySplitter::default();
    let timed = vec![
        TimedSegment::new(TextSegment::new(0, "First line of dialogue"), 0.0, 2.0, 1.0),
        TimedSegment::new(TextSegment::new(1, "Second line"), 2.5, 3.5, 0.75),
    ];

    let on_screen = display.project(&timed, Projection::Display);
    let dubbing = display.project(&timed, Projection::Dubbing);

    assert_eq!(on_screen.len(), 2);
    assert_eq!(dubbing.len(), 2);
    for (a, b) in on_screen.iter().zip(&dubbing) {
        assert_eq!(a.segment, b.segment);
        assert!(!a.dual_use);
        assert!(b.dual_use);
    }
}
