/*!
 * Timestamp alignment.
 *
 * Maps each text segment back onto the run of transcript words it came from.
 * Both sides go through the same normalization and tokenization, then a
 * cursor walks the transcript greedily and never moves backward. Mismatches
 * are recovered inside a bounded window:
 *
 * - tokens merged or split differently on each side
 * - near-identical spellings (normalized Levenshtein)
 * - extra tokens on either side, skipped at a confidence cost
 *
 * A word written in an unspaced script contributes one unit per character;
 * each unit gets an even share of the word's time span.
 */

use log::{debug, warn};
use std::collections::HashSet;

use crate::errors::SegmentError;
use crate::segment::{SkippedSegment, TextSegment, TimedSegment};
use crate::text_utils;
use crate::timeline::WordTimeline;

use super::fuzzy::FuzzyMatcher;

/// Penalty for a merged, split or fuzzy token match
const SOFT_MATCH_PENALTY: f32 = 0.5;

/// Settings for the aligner
#[derive(Debug, Clone)]
pub struct AlignerConfig {
    /// Look-ahead window K, in units
    pub search_window: usize,
    /// Minimum similarity for a fuzzy token match
    pub fuzzy_token_threshold: f32,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            search_window: 8,
            fuzzy_token_threshold: 0.8,
        }
    }
}

/// Comparison unit of the transcript with its share of time
#[derive(Debug, Clone)]
struct TimelineUnit {
    unit: String,
    word: usize,
    start: f64,
    end: f64,
    /// Whether this is the last unit of its word
    closes_word: bool,
}

/// Aligned segments plus the ones that could not be placed
#[derive(Debug, Clone, Default)]
pub struct AlignmentReport {
    pub timed: Vec<TimedSegment>,
    pub skipped: Vec<SkippedSegment>,
}

/// Greedy monotonic aligner
#[derive(Debug, Clone)]
pub struct TimestampAligner {
    config: AlignerConfig,
    matcher: FuzzyMatcher,
}

impl Default for TimestampAligner {
    fn default() -> Self {
        Self::new(AlignerConfig::default())
    }
}

impl TimestampAligner {
    pub fn new(config: AlignerConfig) -> Self {
        let matcher = FuzzyMatcher::new(config.fuzzy_token_threshold);
        Self { config, matcher }
    }

    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    /// Start a cursor at the beginning of the timeline
    pub fn cursor<'a>(&'a self, timeline: &'a WordTimeline) -> AlignmentCursor<'a> {
        AlignmentCursor::new(self, timeline)
    }

    /// Align a single segment from the start of the timeline
    pub fn align(&self, segment: &TextSegment, timeline: &WordTimeline) -> Result<TimedSegment, SegmentError> {
        self.cursor(timeline).align_next(segment)
    }

    /// Align segments in order.
    ///
    /// Alignment failures are recorded and skipped; malformed input aborts.
    pub fn align_all(&self, segments: &[TextSegment], timeline: &WordTimeline) -> Result<AlignmentReport, SegmentError> {
        let mut cursor = self.cursor(timeline);
        let mut report = AlignmentReport::default();

        for segment in segments {
            match cursor.align_next(segment) {
                Ok(timed) => report.timed.push(timed),
                Err(SegmentError::AlignmentFailure { index, reason }) => {
                    warn!("Skipping segment {}: {}", index, reason);
                    report.skipped.push(SkippedSegment { index, reason });
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            "Aligned {} segments, skipped {}",
            report.timed.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}

/// Position of the aligner on one timeline
#[derive(Debug)]
pub struct AlignmentCursor<'a> {
    aligner: &'a TimestampAligner,
    timeline: &'a WordTimeline,
    units: Vec<TimelineUnit>,
    vocabulary: HashSet<String>,
    position: usize,
}

/// Outcome of walking one segment
struct Walk {
    first: Option<usize>,
    last: Option<usize>,
    next_position: usize,
    penalty: f32,
}

impl<'a> AlignmentCursor<'a> {
    fn new(aligner: &'a TimestampAligner, timeline: &'a WordTimeline) -> Self {
        let mut units = Vec::new();
        for (index, word) in timeline.words().iter().enumerate() {
            let tokens = text_utils::tokenize(&word.text);
            let share = word.duration() / tokens.len().max(1) as f64;
            let count = tokens.len();
            for (i, unit) in tokens.into_iter().enumerate() {
                units.push(TimelineUnit {
                    unit,
                    word: index,
                    start: word.start + share * i as f64,
                    end: if i + 1 == count { word.end } else { word.start + share * (i + 1) as f64 },
                    closes_word: i + 1 == count,
                });
            }
        }
        let vocabulary = units.iter().map(|u| u.unit.clone()).collect();

        Self {
            aligner,
            timeline,
            units,
            vocabulary,
            position: 0,
        }
    }

    /// Units consumed so far
    pub fn position(&self) -> usize {
        self.position
    }

    /// Align the next segment and advance past it
    pub fn align_next(&mut self, segment: &TextSegment) -> Result<TimedSegment, SegmentError> {
        let tokens = text_utils::tokenize(&segment.source_text);
        if tokens.is_empty() {
            return Err(SegmentError::malformed_at(segment.index, "segment has no alignable tokens"));
        }
        if !tokens.iter().any(|t| self.vocabulary.contains(t)) {
            return Err(SegmentError::malformed_at(
                segment.index,
                format!(
                    "'{}' does not occur in the transcript",
                    text_utils::truncate_text(&segment.source_text, 40)
                ),
            ));
        }

        let walk = self.walk(&tokens);
        let (Some(first), Some(last)) = (walk.first, walk.last) else {
            return Err(SegmentError::AlignmentFailure {
                index: segment.index,
                reason: format!("no transcript word matched after unit {}", self.position),
            });
        };

        let start = self.units[first].start;
        let mut end = self.units[last].end;

        // Trailing punctuation words belong to the segment that ends with punctuation
        let ends_with_mark = segment
            .source_text
            .trim_end()
            .chars()
            .last()
            .is_some_and(|c| !c.is_alphanumeric());
        if ends_with_mark && self.units[last].closes_word {
            end = self.timeline.words()[self.units[last].word + 1..]
                .iter()
                .take_while(|w| text_utils::is_punctuation_only(&w.text))
                .last()
                .map(|w| w.end)
                .unwrap_or(end);
        }

        let total = tokens.len() as f32;
        let confidence = (1.0 - walk.penalty / (total + walk.penalty)).clamp(0.0, 1.0);
        if walk.penalty > 0.0 {
            debug!(
                "Segment {} aligned with recovery (penalty {:.1}, confidence {:.2})",
                segment.index, walk.penalty, confidence
            );
        }

        self.position = walk.next_position;
        Ok(TimedSegment::new(segment.clone(), start, end, confidence))
    }

    fn walk(&self, tokens: &[String]) -> Walk {
        let window = self.aligner.config.search_window.max(1);
        let matcher = &self.aligner.matcher;
        let units = &self.units;

        let mut walk = Walk {
            first: None,
            last: None,
            next_position: self.position,
            penalty: 0.0,
        };
        let mut pos = self.position;
        let mut j = 0;

        let consume = |walk: &mut Walk, from: usize, to: usize| {
            walk.first.get_or_insert(from);
            walk.last = Some(to);
            walk.next_position = to + 1;
        };

        while j < tokens.len() {
            if pos >= units.len() {
                walk.penalty += (tokens.len() - j) as f32;
                break;
            }
            let expected = tokens[j].as_str();
            let actual = units[pos].unit.as_str();

            if expected == actual {
                consume(&mut walk, pos, pos);
                pos += 1;
                j += 1;
                continue;
            }

            // One segment token spread over several transcript units
            if let Some(n) = concat_length(units[pos..].iter().map(|u| u.unit.as_str()), expected, window) {
                consume(&mut walk, pos, pos + n - 1);
                walk.penalty += SOFT_MATCH_PENALTY;
                pos += n;
                j += 1;
                continue;
            }

            // Several segment tokens merged into one transcript unit
            if let Some(m) = concat_length(tokens[j..].iter().map(String::as_str), actual, window) {
                consume(&mut walk, pos, pos);
                walk.penalty += SOFT_MATCH_PENALTY;
                pos += 1;
                j += m;
                continue;
            }

            if matcher.matches(expected, actual) {
                consume(&mut walk, pos, pos);
                walk.penalty += SOFT_MATCH_PENALTY;
                pos += 1;
                j += 1;
                continue;
            }

            let transcript_skip = (1..=window)
                .take_while(|k| pos + k < units.len())
                .find(|k| units[pos + k].unit == expected);
            let segment_skip = (1..=window)
                .take_while(|k| j + k < tokens.len())
                .find(|k| tokens[j + k] == actual);

            match (transcript_skip, segment_skip) {
                (Some(k), Some(m)) if m < k => {
                    walk.penalty += m as f32;
                    j += m;
                }
                (Some(k), _) => {
                    // Transcript noise, skipped but kept inside the segment span
                    walk.penalty += k as f32;
                    consume(&mut walk, pos + k, pos + k);
                    pos += k + 1;
                    j += 1;
                }
                (None, Some(m)) => {
                    walk.penalty += m as f32;
                    j += m;
                }
                (None, None) => {
                    walk.penalty += 1.0;
                    j += 1;
                }
            }
        }

        walk
    }
}

/// Number of leading parts (at least two, at most `window`) whose
/// concatenation equals `target`
fn concat_length<'s, I>(parts: I, target: &str, window: usize) -> Option<usize>
where
    I: Iterator<Item = &'s str>,
{
    let mut joined = String::new();
    for (i, part) in parts.take(window.max(2)).enumerate() {
        joined.push_str(part);
        if joined.len() > target.len() || !target.starts_with(joined.as_str()) {
            return None;
        }
        if i > 0 && joined == target {
            return Some(i + 1);
        }
    }
    None
}
