/*!
 * End-to-end segmentation pipeline.
 *
 * WordTimeline + translations -> HybridSegmenter -> TimestampAligner ->
 * DisplaySplitter (display and dubbing projections) -> GapOptimizer.
 *
 * Only segmentation suspends (oracle calls); every later stage is a pure
 * transformation over the complete list produced by the stage before.
 */

use log::{error, info};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::alignment::{AlignerConfig, TimestampAligner};
use crate::app_config::Config;
use crate::display::{DisplayConfig, DisplaySplitter, Projection};
use crate::errors::SegmentError;
use crate::gaps::{GapConfig, GapOptimizer, GapReport};
use crate::segment::{FinalSegment, SkippedSegment, TextSegment};
use crate::splitting::{
    HeuristicAnnotator, HybridConfig, HybridSegmenter, RuleSplitter, RuleSplitterConfig, SegmenterStats,
    SemanticSplitOracle,
};
use crate::timeline::WordTimeline;

/// Counters of one pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    pub segmenter: SegmenterStats,
    pub aligned: usize,
    pub skipped: usize,
    pub display_gaps: GapReport,
    pub dubbing_gaps: GapReport,
}

/// Result of a run: both projections plus the segments that were dropped
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    /// On-screen projection, lines capped at the display budget
    pub display: Vec<FinalSegment>,
    /// Dubbing projection, timing-oriented
    pub dubbing: Vec<FinalSegment>,
    /// Segments that could not be aligned, with reasons
    pub skipped: Vec<SkippedSegment>,
    pub stats: PipelineStats,
}

/// All stages wired together
#[derive(Debug)]
pub struct SegmentationPipeline {
    segmenter: HybridSegmenter,
    aligner: TimestampAligner,
    display: DisplaySplitter,
    gaps: GapOptimizer,
}

impl SegmentationPipeline {
    pub fn new(segmenter: HybridSegmenter, aligner: TimestampAligner, display: DisplaySplitter, gaps: GapOptimizer) -> Self {
        Self {
            segmenter,
            aligner,
            display,
            gaps,
        }
    }

    /// Build every stage from the application configuration
    pub fn from_config(config: &Config, oracle: Arc<dyn SemanticSplitOracle>) -> Self {
        let seg = &config.segmentation;
        let annotator = HeuristicAnnotator::new(&config.source_language, seg.context_words, seg.min_phrase_length);
        let rules = RuleSplitter::new(
            RuleSplitterConfig {
                language: config.source_language.clone(),
                max_sentence_length: seg.rule_max_sentence_length,
                min_sentence_length: seg.rule_min_sentence_length,
                enable_mark_split: seg.enable_mark_split,
                enable_connector_split: seg.enable_connector_split,
                enable_comma_split: seg.enable_comma_split,
                enable_root_split: seg.enable_root_split,
            },
            Arc::new(annotator),
        );
        let segmenter = HybridSegmenter::new(
            rules,
            oracle,
            HybridConfig {
                max_segment_length: seg.max_segment_length,
                acceptance_threshold: config.oracle.acceptance_threshold,
                max_recursion_depth: seg.max_recursion_depth,
                oracle_timeout: Duration::from_secs(config.oracle.timeout_secs),
                concurrent_requests: config.oracle.concurrent_requests,
            },
        );
        let aligner = TimestampAligner::new(AlignerConfig {
            search_window: config.alignment.search_window,
            fuzzy_token_threshold: config.alignment.fuzzy_token_threshold,
        });
        let display = DisplaySplitter::new(DisplayConfig {
            max_line_weight: config.display.max_line_weight,
            dubbing_max_line_weight: config.display.dubbing_max_line_weight,
            interpolation_confidence_factor: config.display.interpolation_confidence_factor,
        });
        let gaps = GapOptimizer::new(GapConfig {
            min_gap_secs: config.gaps.min_gap_secs,
            min_duration_secs: config.gaps.min_duration_secs,
            max_duration_secs: config.gaps.max_duration_secs,
        });

        Self::new(segmenter, aligner, display, gaps)
    }

    /// Segment the transcript into source sentences
    pub async fn segment(&self, timeline: &WordTimeline) -> (Vec<TextSegment>, SegmenterStats) {
        self.segmenter.segment_timeline(timeline).await
    }

    /// Segment, attach translations by index and align
    pub async fn run(&self, timeline: &WordTimeline, translations: &[String]) -> Result<PipelineOutput, SegmentError> {
        let (segments, segmenter_stats) = self.segment(timeline).await;
        let segments = attach_translations(segments, translations)?;
        let mut output = self.process_segments(&segments, timeline)?;
        output.stats.segmenter = segmenter_stats;
        Ok(output)
    }

    /// Align, project and re-time segments that already carry their text
    pub fn process_segments(&self, segments: &[TextSegment], timeline: &WordTimeline) -> Result<PipelineOutput, SegmentError> {
        let report = self.aligner.align_all(segments, timeline).inspect_err(|e| {
            error!("Aborting run: {}", e);
        })?;

        let display = self.display.project(&report.timed, Projection::Display);
        let dubbing = self.display.project(&report.timed, Projection::Dubbing);
        let (display, display_gaps) = self.gaps.optimize(&display, timeline.end());
        let (dubbing, dubbing_gaps) = self.gaps.optimize(&dubbing, timeline.end());

        info!(
            "Pipeline finished: {} aligned, {} skipped, {} display / {} dubbing segments",
            report.timed.len(),
            report.skipped.len(),
            display.len(),
            dubbing.len()
        );

        Ok(PipelineOutput {
            stats: PipelineStats {
                segmenter: SegmenterStats::default(),
                aligned: report.timed.len(),
                skipped: report.skipped.len(),
                display_gaps,
                dubbing_gaps,
            },
            display,
            dubbing,
            skipped: report.skipped,
        })
    }
}

/// Attach translated chunks to segments by position.
///
/// An empty translation list leaves segments untranslated; any other count
/// mismatch is malformed input.
pub fn attach_translations(segments: Vec<TextSegment>, translations: &[String]) -> Result<Vec<TextSegment>, SegmentError> {
    if translations.is_empty() {
        return Ok(segments);
    }
    if translations.len() != segments.len() {
        return Err(SegmentError::MalformedInput {
            index: Some(segments.len().min(translations.len())),
            reason: format!(
                "{} translations for {} segments",
                translations.len(),
                segments.len()
            ),
        });
    }
    Ok(segments
        .into_iter()
        .zip(translations)
        .map(|(segment, translation)| segment.with_translation(translation.trim()))
        .collect())
}
