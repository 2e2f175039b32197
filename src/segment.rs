/*!
 * Segment types passed between pipeline stages.
 *
 * Each stage consumes the previous stage's list and builds a new one:
 * [`TextSegment`] from the segmenter, [`TimedSegment`] from the aligner and
 * [`FinalSegment`] from the display splitter.
 */

use serde::{Deserialize, Serialize};

/// Sentence-level text produced by the hybrid segmenter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    /// Position in the segment list
    pub index: usize,
    /// Source-language text, a contiguous slice of the transcript
    pub source_text: String,
    /// Target-language text, attached by index
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub translated_text: String,
}

impl TextSegment {
    pub fn new(index: usize, source_text: impl Into<String>) -> Self {
        Self {
            index,
            source_text: source_text.into(),
            translated_text: String::new(),
        }
    }

    pub fn with_translation(mut self, translated_text: impl Into<String>) -> Self {
        self.translated_text = translated_text.into();
        self
    }
}

/// A text segment with its position on the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSegment {
    #[serde(flatten)]
    pub text: TextSegment,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// 1.0 for an exact match, lower when recovery was needed
    pub confidence: f32,
}

impl TimedSegment {
    pub fn new(text: TextSegment, start: f64, end: f64, confidence: f32) -> Self {
        Self {
            text,
            start,
            end,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// One rendered line and its display weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayLine {
    pub text: String,
    pub weight: usize,
}

/// Display-ready segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalSegment {
    pub segment: TimedSegment,
    pub source_lines: Vec<DisplayLine>,
    pub translation_lines: Vec<DisplayLine>,
    /// True for the dubbing projection, false for on-screen display
    pub dual_use: bool,
}

impl FinalSegment {
    pub fn start(&self) -> f64 {
        self.segment.start
    }

    pub fn end(&self) -> f64 {
        self.segment.end
    }

    pub fn index(&self) -> usize {
        self.segment.text.index
    }

    /// Source lines joined for rendering
    pub fn source_text(&self) -> String {
        join_lines(&self.source_lines)
    }

    /// Translation lines joined for rendering
    pub fn translation_text(&self) -> String {
        join_lines(&self.translation_lines)
    }
}

fn join_lines(lines: &[DisplayLine]) -> String {
    lines
        .iter()
        .map(|l| l.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// A segment dropped from the run and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSegment {
    pub index: usize,
    pub reason: String,
}
