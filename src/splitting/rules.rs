/*!
 * Rule-based sentence splitting.
 *
 * Four tiers run in order, each over the pieces the previous tier produced:
 *
 * 1. strong terminators (`.`, `?`, `!` and their CJK forms)
 * 2. connective words at clause boundaries
 * 3. commas separating two complete clauses
 * 4. root-anchored recursive split of pieces still over the soft limit
 *
 * No tier cuts inside a quote, an abbreviation or a number. The result aims
 * at the soft sentence length; the hard cap belongs to the hybrid segmenter.
 */

use log::debug;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::text_utils::{self, ProtectedSpan};

use super::annotator::{self, ClauseAnnotator};

/// Priority tier of a boundary candidate, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BoundaryTier {
    Terminator,
    Connector,
    Comma,
    Root,
}

impl BoundaryTier {
    const ALL: [BoundaryTier; 4] = [
        BoundaryTier::Terminator,
        BoundaryTier::Connector,
        BoundaryTier::Comma,
        BoundaryTier::Root,
    ];
}

/// A possible cut point, as a byte offset into the scanned text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub offset: usize,
    pub tier: BoundaryTier,
}

/// Settings for the rule splitter
#[derive(Debug, Clone)]
pub struct RuleSplitterConfig {
    /// Source language code
    pub language: String,
    /// Soft limit in length units above which the root tier splits
    pub max_sentence_length: usize,
    /// Minimum length units of each half produced by the root tier
    pub min_sentence_length: usize,
    pub enable_mark_split: bool,
    pub enable_connector_split: bool,
    pub enable_comma_split: bool,
    pub enable_root_split: bool,
}

impl Default for RuleSplitterConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            max_sentence_length: 40,
            min_sentence_length: 8,
            enable_mark_split: true,
            enable_connector_split: true,
            enable_comma_split: true,
            enable_root_split: true,
        }
    }
}

/// Lazy iterator over the boundary candidates of a text, tier by tier.
///
/// Candidates of a tier are only computed once the previous tier is
/// exhausted. Connector and comma candidates are raw positions; whether they
/// hold up is decided against the piece they end up in. Cloning or calling
/// [`BoundaryCandidates::restart`] starts the sequence over.
#[derive(Debug, Clone)]
pub struct BoundaryCandidates<'a> {
    text: &'a str,
    language: &'a str,
    annotator: &'a dyn ClauseAnnotator,
    spans: Vec<ProtectedSpan>,
    tier_index: usize,
    pending: VecDeque<Boundary>,
}

impl<'a> BoundaryCandidates<'a> {
    fn new(text: &'a str, language: &'a str, annotator: &'a dyn ClauseAnnotator) -> Self {
        Self {
            text,
            language,
            annotator,
            spans: text_utils::protected_spans(text),
            tier_index: 0,
            pending: VecDeque::new(),
        }
    }

    /// Rewind to the first candidate
    pub fn restart(&mut self) {
        self.tier_index = 0;
        self.pending.clear();
    }

    fn compute_tier(&self, tier: BoundaryTier) -> Vec<usize> {
        match tier {
            BoundaryTier::Terminator => terminator_offsets(self.text, &self.spans),
            BoundaryTier::Connector => connector_offsets(self.text, self.language, &self.spans),
            BoundaryTier::Comma => comma_offsets(self.text, &self.spans),
            BoundaryTier::Root => self
                .annotator
                .root_offset(self.text)
                .filter(|&o| text_utils::is_interior_offset(self.text, o) && !text_utils::is_protected(&self.spans, o))
                .into_iter()
                .collect(),
        }
    }
}

impl Iterator for BoundaryCandidates<'_> {
    type Item = Boundary;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pending.is_empty() {
            let tier = *BoundaryTier::ALL.get(self.tier_index)?;
            self.tier_index += 1;
            self.pending = self
                .compute_tier(tier)
                .into_iter()
                .map(|offset| Boundary { offset, tier })
                .collect();
        }
        self.pending.pop_front()
    }
}

/// Offsets just past sentence-final punctuation (and any closing quotes)
fn terminator_offsets(text: &str, spans: &[ProtectedSpan]) -> Vec<usize> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut offsets = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (position, c) = chars[i];
        // Terminators inside quotes end the quoted speech, not the sentence
        let inside_span = spans.iter().any(|s| s.range.contains(&position));
        if !text_utils::is_sentence_terminator(c) || inside_span {
            i += 1;
            continue;
        }
        // Ellipses continue the sentence
        let previous_dot = i > 0 && chars[i - 1].1 == '.';
        let next_dot = chars.get(i + 1).is_some_and(|(_, n)| *n == '.');
        if c == '.' && (previous_dot || next_dot) {
            i += 1;
            continue;
        }

        // Swallow "?!" runs and closing quotes
        let mut j = i + 1;
        while j < chars.len()
            && (text_utils::is_sentence_terminator(chars[j].1) || text_utils::is_closing_punctuation(chars[j].1))
        {
            j += 1;
        }
        let offset = chars.get(j).map(|(o, _)| *o).unwrap_or(text.len());
        let followed_by_break = match chars.get(j) {
            None => false,
            Some((_, next)) => {
                next.is_whitespace() || !c.is_ascii() || text_utils::is_unspaced_char(*next)
            }
        };

        if followed_by_break
            && text_utils::is_interior_offset(text, offset)
            && !text_utils::is_protected(spans, offset)
        {
            offsets.push(offset);
        }
        i = j;
    }

    offsets
}

/// Offsets at the start of connective words
fn connector_offsets(text: &str, language: &str, spans: &[ProtectedSpan]) -> Vec<usize> {
    let connectors = annotator::connectors_for(language);
    let mut offsets = Vec::new();

    for connector in connectors {
        let unspaced = connector.chars().next().is_some_and(text_utils::is_unspaced_char);
        if unspaced {
            offsets.extend(text.match_indices(connector).map(|(o, _)| o));
            continue;
        }
        let mut position = 0;
        for word in text.split_inclusive(char::is_whitespace) {
            let start = position;
            position += word.len();
            if text_utils::normalize_text(word) == *connector
                && word.trim_start().len() == word.len()
                && start > 0
            {
                offsets.push(start);
            }
        }
    }

    offsets.retain(|&o| text_utils::is_interior_offset(text, o) && !text_utils::is_protected(spans, o));
    offsets.sort_unstable();
    offsets.dedup();
    offsets
}

/// Offsets just past commas that are not part of a number
fn comma_offsets(text: &str, spans: &[ProtectedSpan]) -> Vec<usize> {
    text.char_indices()
        .filter(|(position, c)| {
            matches!(c, ',' | '，' | '、') && !text_utils::is_inside_token_span(spans, *position)
        })
        .map(|(position, c)| position + c.len_utf8())
        .filter(|&o| text_utils::is_interior_offset(text, o) && !text_utils::is_protected(spans, o))
        .collect()
}

/// Multi-pass rule splitter
#[derive(Debug, Clone)]
pub struct RuleSplitter {
    config: RuleSplitterConfig,
    annotator: Arc<dyn ClauseAnnotator>,
}

impl RuleSplitter {
    pub fn new(config: RuleSplitterConfig, annotator: Arc<dyn ClauseAnnotator>) -> Self {
        Self { config, annotator }
    }

    pub fn config(&self) -> &RuleSplitterConfig {
        &self.config
    }

    /// Lazily enumerate boundary candidates of `text`, strongest tier first
    pub fn candidates<'a>(&'a self, text: &'a str) -> BoundaryCandidates<'a> {
        BoundaryCandidates::new(text, &self.config.language, self.annotator.as_ref())
    }

    /// Split text into sentences by running all enabled tiers
    pub fn split(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let mut pieces = vec![text.to_string()];

        if self.config.enable_mark_split {
            pieces = self.apply_tier(pieces, BoundaryTier::Terminator);
        }
        if self.config.enable_connector_split {
            pieces = self.apply_tier(pieces, BoundaryTier::Connector);
        }
        if self.config.enable_comma_split {
            pieces = self.apply_tier(pieces, BoundaryTier::Comma);
        }
        if self.config.enable_root_split {
            pieces = pieces
                .into_iter()
                .flat_map(|piece| self.root_split(piece))
                .collect();
        }

        debug!("Rule splitter produced {} pieces", pieces.len());
        pieces
    }

    /// Cut every piece at the accepted boundaries of one tier, left to right
    fn apply_tier(&self, pieces: Vec<String>, tier: BoundaryTier) -> Vec<String> {
        let mut result = Vec::with_capacity(pieces.len());

        for piece in pieces {
            let mut remainder = piece;
            loop {
                let cut = self
                    .candidates(&remainder)
                    .filter(|b| b.tier == tier)
                    .filter(|b| text_utils::splits_into_units(&remainder, b.offset))
                    .find(|b| self.accepts(&remainder, *b));
                match cut {
                    Some(boundary) => {
                        let (left, right) = text_utils::split_at_offset(&remainder, boundary.offset);
                        debug!(
                            "{:?} split: '{}' | '{}'",
                            tier,
                            text_utils::truncate_text(&left, 30),
                            text_utils::truncate_text(&right, 30)
                        );
                        result.push(left);
                        remainder = right;
                    }
                    None => {
                        result.push(remainder);
                        break;
                    }
                }
            }
        }

        result.retain(|p| !p.is_empty());
        result
    }

    fn accepts(&self, text: &str, boundary: Boundary) -> bool {
        match boundary.tier {
            BoundaryTier::Terminator => true,
            BoundaryTier::Connector | BoundaryTier::Comma => {
                self.annotator.is_valid_clause_boundary(text, boundary.offset)
            }
            BoundaryTier::Root => false,
        }
    }

    /// Recursively split an over-long piece near its root verb
    fn root_split(&self, piece: String) -> Vec<String> {
        let units = text_utils::length_units(&piece);
        if units <= self.config.max_sentence_length {
            return vec![piece];
        }

        let spans = text_utils::protected_spans(&piece);
        let min = self.config.min_sentence_length;
        let viable: Vec<usize> = text_utils::word_boundaries(&piece)
            .into_iter()
            .filter(|&b| !text_utils::is_protected(&spans, b))
            .filter(|&b| {
                text_utils::length_units(&piece[..b]) >= min && text_utils::length_units(&piece[b..]) >= min
            })
            .collect();

        let anchor = self
            .candidates(&piece)
            .find(|b| b.tier == BoundaryTier::Root)
            .map(|b| b.offset);

        let chosen = match anchor {
            Some(root) => viable.iter().copied().min_by_key(|&b| b.abs_diff(root)),
            None => viable
                .iter()
                .copied()
                .min_by_key(|&b| text_utils::length_units(&piece[..b]).abs_diff(units / 2)),
        };

        match chosen {
            Some(offset) => {
                let (left, right) = text_utils::split_at_offset(&piece, offset);
                debug!("Root split at byte {} of {} units", offset, units);
                let mut result = self.root_split(left);
                result.extend(self.root_split(right));
                result
            }
            None => vec![piece],
        }
    }
}
