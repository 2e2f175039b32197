/*!
 * Display line splitting.
 *
 * Width model: wide and ideographic characters weigh 2, combining marks and
 * joiners 0, everything else 1. A line over the budget is cut at the break
 * point nearest its weight midpoint, recursively.
 *
 * Two projections share the timed segment list:
 * - display: lines capped at `max_line_weight`, all lines share the segment timing
 * - dubbing: uncapped unless `dubbing_max_line_weight` is set; when a segment
 *   is cut, every piece becomes its own segment with timing interpolated by
 *   weight and a reduced confidence. Speech rate is not linear in character
 *   count, so interpolated times are approximate.
 */

use log::debug;
use serde::Serialize;

use crate::segment::{DisplayLine, FinalSegment, TextSegment, TimedSegment};
use crate::text_utils;

/// Smallest usable line budget, one wide character
pub const MIN_LINE_WEIGHT: usize = 2;

/// Display weight of a single character
pub fn char_weight(c: char) -> usize {
    if text_utils::is_combining_mark(c) {
        0
    } else if is_wide_char(c) {
        2
    } else {
        1
    }
}

/// Display weight of a text
pub fn line_weight(text: &str) -> usize {
    text.chars().map(char_weight).sum()
}

fn is_wide_char(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F         // Hangul Jamo
        | 0x2E80..=0x303E       // CJK radicals, punctuation
        | 0x3041..=0x33FF       // kana, CJK compatibility
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA000..=0xA4CF       // Yi
        | 0xAC00..=0xD7A3       // Hangul syllables
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F       // CJK compatibility forms
        | 0xFF00..=0xFF60       // fullwidth forms
        | 0xFFE0..=0xFFE6
        | 0x1F300..=0x1F64F     // emoji
        | 0x1F900..=0x1F9FF
        | 0x20000..=0x3FFFD)
}

/// Which consumer a projection is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Projection {
    Display,
    Dubbing,
}

/// Settings for the display splitter
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// Weight budget of an on-screen line
    pub max_line_weight: usize,
    /// Optional budget for the dubbing projection
    pub dubbing_max_line_weight: Option<usize>,
    /// Confidence multiplier for interpolated timings
    pub interpolation_confidence_factor: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_line_weight: 42,
            dubbing_max_line_weight: None,
            interpolation_confidence_factor: 0.8,
        }
    }
}

/// Splits timed segments into weighted display lines
#[derive(Debug, Clone, Default)]
pub struct DisplaySplitter {
    config: DisplayConfig,
}

impl DisplaySplitter {
    pub fn new(config: DisplayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// Split text into lines of at most `budget` weight; `None` keeps one line.
    ///
    /// Budgets below [`MIN_LINE_WEIGHT`] are raised to it.
    pub fn split_text(&self, text: &str, budget: Option<usize>) -> Vec<DisplayLine> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        let mut pieces = Vec::new();
        match budget {
            Some(budget) => split_recursive(text, budget.max(MIN_LINE_WEIGHT), &mut pieces),
            None => pieces.push(text.to_string()),
        }
        pieces
            .into_iter()
            .map(|text| DisplayLine {
                weight: line_weight(&text),
                text,
            })
            .collect()
    }

    /// Build one projection of the timed segment list
    pub fn project(&self, segments: &[TimedSegment], projection: Projection) -> Vec<FinalSegment> {
        let result: Vec<FinalSegment> = match projection {
            Projection::Display => segments.iter().map(|s| self.display_segment(s)).collect(),
            Projection::Dubbing => segments.iter().flat_map(|s| self.dubbing_segments(s)).collect(),
        };
        debug!(
            "{:?} projection: {} segments from {} timed segments",
            projection,
            result.len(),
            segments.len()
        );
        result
    }

    /// Re-split the lines of an existing segment against its projection's budget
    pub fn resplit(&self, segment: &FinalSegment) -> FinalSegment {
        let budget = if segment.dual_use {
            self.config.dubbing_max_line_weight
        } else {
            Some(self.config.max_line_weight)
        };
        let resplit_lines = |lines: &[DisplayLine]| -> Vec<DisplayLine> {
            lines.iter().flat_map(|l| self.split_text(&l.text, budget)).collect()
        };
        FinalSegment {
            segment: segment.segment.clone(),
            source_lines: resplit_lines(&segment.source_lines),
            translation_lines: resplit_lines(&segment.translation_lines),
            dual_use: segment.dual_use,
        }
    }

    fn display_segment(&self, segment: &TimedSegment) -> FinalSegment {
        let budget = Some(self.config.max_line_weight);
        FinalSegment {
            segment: segment.clone(),
            source_lines: self.split_text(&segment.text.source_text, budget),
            translation_lines: self.split_text(&segment.text.translated_text, budget),
            dual_use: false,
        }
    }

    fn dubbing_segments(&self, segment: &TimedSegment) -> Vec<FinalSegment> {
        let budget = self.config.dubbing_max_line_weight;
        let source = &segment.text.source_text;
        let translation = &segment.text.translated_text;

        // Dubbed audio follows the translation when there is one
        let translation_driven = !translation.trim().is_empty();
        let driver = if translation_driven { translation } else { source };
        let driver_lines = self.split_text(driver, budget);

        if driver_lines.len() <= 1 {
            return vec![FinalSegment {
                segment: segment.clone(),
                source_lines: self.split_text(source, None),
                translation_lines: self.split_text(translation, None),
                dual_use: true,
            }];
        }

        let total: usize = driver_lines.iter().map(|l| l.weight).sum();
        let count = driver_lines.len();
        let fractions: Vec<f64> = driver_lines
            .iter()
            .scan(0usize, |acc, line| {
                *acc += line.weight;
                Some(if total > 0 { *acc as f64 / total as f64 } else { 0.0 })
            })
            .enumerate()
            .map(|(i, f)| if total > 0 { f } else { (i + 1) as f64 / count as f64 })
            .collect();

        let other = if translation_driven { source } else { translation };
        let other_pieces = split_at_fractions(other, &fractions[..count - 1]);

        let duration = segment.duration();
        let confidence = segment.confidence * self.config.interpolation_confidence_factor;
        let mut previous = 0.0;

        driver_lines
            .into_iter()
            .zip(other_pieces)
            .zip(fractions.iter().copied())
            .enumerate()
            .map(|(i, ((line, other_piece), fraction))| {
                let start = segment.start + duration * previous;
                let end = if i + 1 == count {
                    segment.end
                } else {
                    segment.start + duration * fraction
                };
                previous = fraction;

                let (source_text, translated_text) = if translation_driven {
                    (other_piece, line.text.clone())
                } else {
                    (line.text.clone(), other_piece)
                };
                let other_lines = self.split_text(
                    if translation_driven { &source_text } else { &translated_text },
                    budget,
                );
                let (source_lines, translation_lines) = if translation_driven {
                    (other_lines, vec![line])
                } else {
                    (vec![line], other_lines)
                };

                FinalSegment {
                    segment: TimedSegment::new(
                        TextSegment {
                            index: segment.text.index,
                            source_text,
                            translated_text,
                        },
                        start,
                        end,
                        confidence,
                    ),
                    source_lines,
                    translation_lines,
                    dual_use: true,
                }
            })
            .collect()
    }
}

fn split_recursive(text: &str, budget: usize, out: &mut Vec<String>) {
    let weight = line_weight(text);
    if weight <= budget {
        out.push(text.to_string());
        return;
    }
    let middle = weight / 2;
    let Some(offset) = break_candidates(text)
        .into_iter()
        .min_by_key(|&b| line_weight(&text[..b]).abs_diff(middle))
    else {
        out.push(text.to_string());
        return;
    };
    let (left, right) = text_utils::split_at_offset(text, offset);
    split_recursive(&left, budget, out);
    split_recursive(&right, budget, out);
}

/// Break points of a line, best kind first.
///
/// Whitespace and clause punctuation come first, then any word boundary, then
/// any character boundary that does not split a grapheme cluster.
fn break_candidates(text: &str) -> Vec<usize> {
    let words = word_break_candidates(text);
    if !words.is_empty() {
        return words;
    }

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    chars
        .windows(2)
        .filter(|w| !text_utils::is_combining_mark(w[1].1) && w[0].1 != '\u{200D}')
        .map(|w| w[1].0)
        .filter(|&b| text_utils::is_interior_offset(text, b))
        .collect()
}

/// Whitespace and clause punctuation breaks, else any word boundary
fn word_break_candidates(text: &str) -> Vec<usize> {
    let usable = |b: &usize| text_utils::is_interior_offset(text, *b);

    let boundaries: Vec<usize> = text_utils::word_boundaries(text).into_iter().filter(usable).collect();
    let preferred: Vec<usize> = boundaries
        .iter()
        .copied()
        .filter(|&b| {
            text[b..].starts_with(char::is_whitespace)
                || text[..b]
                    .chars()
                    .last()
                    .is_some_and(|c| text_utils::is_clause_punctuation(c) || text_utils::is_sentence_terminator(c))
        })
        .collect();
    if preferred.is_empty() {
        boundaries
    } else {
        preferred
    }
}

/// Cut text into `fractions.len() + 1` pieces near the given weight fractions.
///
/// Cuts only fall on word or clause boundaries; pieces that cannot be placed
/// stay empty.
fn split_at_fractions(text: &str, fractions: &[f64]) -> Vec<String> {
    let text = text.trim();
    let total = line_weight(text) as f64;
    let candidates = word_break_candidates(text);
    let mut pieces = Vec::with_capacity(fractions.len() + 1);
    let mut last_cut = 0;

    for fraction in fractions {
        let target = fraction * total;
        let cut = candidates
            .iter()
            .copied()
            .filter(|&b| b > last_cut)
            .min_by(|&a, &b| {
                let da = (line_weight(&text[..a]) as f64 - target).abs();
                let db = (line_weight(&text[..b]) as f64 - target).abs();
                da.total_cmp(&db)
            });
        match cut {
            Some(cut) => {
                pieces.push(text[last_cut..cut].trim().to_string());
                last_cut = cut;
            }
            None => break,
        }
    }
    pieces.push(text[last_cut..].trim().to_string());
    pieces.resize(fractions.len() + 1, String::new());
    pieces
}
