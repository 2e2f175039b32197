/*!
 * End-to-end pipeline scenarios and properties.
 *
 * Each test drives the full chain: segmentation, alignment, both
 * projections and gap optimization.
 */

use std::sync::Arc;
use std::time::Duration;

use subsplit::alignment::TimestampAligner;
use subsplit::display::DisplaySplitter;
use subsplit::gaps::{GapConfig, GapOptimizer};
use subsplit::pipeline::SegmentationPipeline;
use subsplit::segment::{DisplayLine, FinalSegment, TextSegment, TimedSegment};
use subsplit::splitting::{NoopOracle, SemanticSplitOracle};
use subsplit::text_utils;

use crate::common::mock_oracles::{FailingOracle, FixedOffsetOracle, FixedOracle, SlowOracle};
use crate::common::{evenly_timed, init_logging, pipeline, segmenter};

const STORY: &str = "My brother painted the fence bright blue. \
    Our neighbours were not impressed, so they complained to the council the very next morning. \
    The council sent an inspector who measured the fence, took photographs and left without a word. \
    Three weeks later a letter arrived.";

fn oracles() -> Vec<(&'static str, Arc<dyn SemanticSplitOracle>)> {
    vec![
        ("noop", Arc::new(NoopOracle)),
        ("fixed", Arc::new(FixedOracle::new(1.0))),
        ("rejected", Arc::new(FixedOracle::new(0.2))),
        ("failing", Arc::new(FailingOracle)),
        ("bad-offset", Arc::new(FixedOffsetOracle { offset: 3 })),
    ]
}

#[tokio::test]
async fn test_oracleSplit_fortyCharSentence_shouldCoverOriginalSpan() {
    let timeline = evenly_timed("My brother painted the fence bright blue", "en", 0.4, 0.1);
    let pipeline = pipeline("en", Arc::new(FixedOracle::new(0.95)), 4);

    let (segments, stats) = pipeline.segment(&timeline).await;
    assert_eq!(stats.oracle_accepted, 1);
    assert_eq!(segments.len(), 2);

    let translations = vec!["Mon frère a peint".to_string(), "la clôture en bleu vif".to_string()];
    let output = pipeline.run(&timeline, &translations).await.unwrap();

    assert_eq!(output.display.len(), 2);
    assert_eq!(output.display[0].start(), timeline.start());
    assert_eq!(output.display[1].end(), timeline.end());
    assert_eq!(output.display[0].source_text(), "My brother painted");
    assert_eq!(output.display[1].source_text(), "the fence bright blue");
    // Independently aligned: the second half starts at its own first word
    assert_eq!(output.display[1].start(), timeline.words()[3].start);
}

#[tokio::test]
async fn test_oracleTimeout_shouldCompleteWithForceSplit() {
    init_logging();
    let timeline = evenly_timed("My brother painted the fence bright blue", "en", 0.4, 0.1);
    let pipeline = SegmentationPipeline::new(
        segmenter("en", Arc::new(SlowOracle::new(Duration::from_secs(60))), 4, Duration::from_millis(30)),
        TimestampAligner::default(),
        DisplaySplitter::default(),
        GapOptimizer::default(),
    );

    let output = pipeline.run(&timeline, &[]).await.unwrap();

    assert_eq!(output.stats.segmenter.oracle_failed, 1);
    assert_eq!(output.stats.segmenter.force_splits, 1);
    let texts: Vec<String> = output.display.iter().map(|s| s.source_text()).collect();
    assert_eq!(texts, vec!["My brother painted", "the fence bright blue"]);
}

#[test]
fn test_gapOptimizer_fiftyMillisecondGap_shouldBeClosed() {
    let segment = |index: usize, start: f64, end: f64| FinalSegment {
        segment: TimedSegment::new(TextSegment::new(index, "line"), start, end, 1.0),
        source_lines: vec![DisplayLine {
            text: "line".to_string(),
            weight: 4,
        }],
        translation_lines: Vec::new(),
        dual_use: false,
    };
    let optimizer = GapOptimizer::new(GapConfig {
        min_gap_secs: 0.2,
        min_duration_secs: 0.0,
        max_duration_secs: 6.0,
    });

    let (result, report) = optimizer.optimize(&[segment(0, 1.0, 2.0), segment(1, 2.05, 3.0)], 3.0);

    assert_eq!(result[0].end(), 2.05);
    assert_eq!(result[1].start(), 2.05);
    assert_eq!(report.closed_gaps, 1);
}

#[tokio::test]
async fn test_coverage_everyOracle_shouldKeepEveryWordOnce() {
    init_logging();
    let timeline = evenly_timed(STORY, "en", 0.3, 0.05);
    let transcript = text_utils::normalize_text(&timeline.transcript());

    for (name, oracle) in oracles() {
        let (segments, _) = pipeline("en", oracle, 6).segment(&timeline).await;
        let rebuilt: Vec<&str> = segments.iter().map(|s| s.source_text.as_str()).collect();
        assert_eq!(
            text_utils::normalize_text(&rebuilt.join(" ")),
            transcript,
            "coverage broken with the {} oracle",
            name
        );
        assert!(
            segments.iter().all(|s| text_utils::length_units(&s.source_text) <= 6),
            "hard cap broken with the {} oracle",
            name
        );
    }
}

#[tokio::test]
async fn test_monotonicity_afterGapOptimization_shouldHold() {
    let timeline = evenly_timed(STORY, "en", 0.3, 0.05);

    for (name, oracle) in oracles() {
        let output = pipeline("en", oracle, 6).run(&timeline, &[]).await.unwrap();
        for projection in [&output.display, &output.dubbing] {
            for pair in projection.windows(2) {
                assert!(
                    pair[0].end() <= pair[1].start() + 1e-9,
                    "{} oracle: segment {} ends at {} after next start {}",
                    name,
                    pair[0].index(),
                    pair[0].end(),
                    pair[1].start()
                );
            }
            for segment in projection.iter() {
                assert!(segment.start() < segment.end());
                assert!(segment.start() >= timeline.start() && segment.end() <= timeline.end() + 1e-9);
            }
        }
    }
}

#[tokio::test]
async fn test_fallbackDeterminism_failingOracle_shouldGiveIdenticalRuns() {
    let timeline = evenly_timed(STORY, "en", 0.3, 0.05);
    let pipeline = pipeline("en", Arc::new(FailingOracle), 5);

    let first = pipeline.run(&timeline, &[]).await.unwrap();
    let second = pipeline.run(&timeline, &[]).await.unwrap();

    assert_eq!(first.display, second.display);
    assert_eq!(first.dubbing, second.dubbing);
}
