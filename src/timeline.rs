/*!
 * Word-level transcript timeline.
 *
 * A [`WordTimeline`] is the immutable, time-ordered list of transcript words
 * produced by speech recognition. It is validated once on construction and
 * only read afterwards.
 */

use serde::{Deserialize, Serialize};

use crate::errors::SegmentError;
use crate::text_utils;

/// Tolerance for floating point comparisons of timestamps
pub const TIME_EPSILON: f64 = 1e-6;

/// A single time-coded transcript word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// Word text as recognized, possibly with punctuation
    pub text: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

impl Word {
    /// Create a new word
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Ordered, validated sequence of transcript words
#[derive(Debug, Clone)]
pub struct WordTimeline {
    words: Vec<Word>,
    language: String,
}

impl WordTimeline {
    /// Build a timeline, rejecting empty or disordered input.
    ///
    /// Words must satisfy `start < end`, be non-decreasing in `start` and must
    /// not overlap (touching at a boundary is allowed).
    pub fn new(words: Vec<Word>, language: impl Into<String>) -> Result<Self, SegmentError> {
        if words.is_empty() {
            return Err(SegmentError::malformed("empty word timeline"));
        }

        for (i, word) in words.iter().enumerate() {
            if !word.start.is_finite() || !word.end.is_finite() || word.start >= word.end {
                return Err(SegmentError::malformed(format!(
                    "word {} ('{}') has invalid time range {:.3}-{:.3}",
                    i, word.text, word.start, word.end
                )));
            }
            if i > 0 {
                let previous = &words[i - 1];
                if word.start + TIME_EPSILON < previous.start {
                    return Err(SegmentError::malformed(format!(
                        "word {} starts before word {}",
                        i,
                        i - 1
                    )));
                }
                if word.start + TIME_EPSILON < previous.end {
                    return Err(SegmentError::malformed(format!(
                        "word {} overlaps word {} ({:.3} < {:.3})",
                        i,
                        i - 1,
                        word.start,
                        previous.end
                    )));
                }
            }
        }

        Ok(Self {
            words,
            language: language.into(),
        })
    }

    /// All words in order
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Source language code of the transcript
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Start of the first word
    pub fn start(&self) -> f64 {
        self.words.first().map(|w| w.start).unwrap_or(0.0)
    }

    /// End of the last word
    pub fn end(&self) -> f64 {
        self.words.last().map(|w| w.end).unwrap_or(0.0)
    }

    /// The full transcript as running text
    pub fn transcript(&self) -> String {
        text_utils::join_words(self.words.iter().map(|w| w.text.as_str()), &self.language)
    }
}
