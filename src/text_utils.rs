/*!
 * Shared text helpers.
 *
 * Every stage that compares transcript text with segment text goes through
 * [`normalize_text`] and [`tokenize`], so the splitter's view of a segment and
 * the aligner's view of the word timeline can never disagree.
 *
 * Length units: languages written with spaces are measured in words, scripts
 * without inter-word spacing (Han, kana, Thai, ...) in characters.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use unicode_normalization::UnicodeNormalization;

static QUOTE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""[^"]*"|“[^”]*”|「[^」]*」|『[^』]*』|«[^»]*»"#).unwrap()
});

static ABBREVIATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?i:mr|mrs|ms|dr|prof|sr|jr|st|vs|inc|ltd|e\.g|i\.e)\.|\b(?:[A-Z]\.){2,}").unwrap()
});

static NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:[.,:]\d+)+").unwrap());

/// Kind of span that must never be split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// Quoted speech or title
    Quote,
    /// Abbreviation or initialism ending in a dot
    Abbreviation,
    /// Decimal number, time or version string
    Number,
}

/// Byte range of text that no splitter may cut
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedSpan {
    pub range: Range<usize>,
    pub kind: SpanKind,
}

/// Find quoted strings, abbreviations and numbers in the text
pub fn protected_spans(text: &str) -> Vec<ProtectedSpan> {
    let mut spans = Vec::new();
    for (regex, kind) in [
        (&*QUOTE_REGEX, SpanKind::Quote),
        (&*ABBREVIATION_REGEX, SpanKind::Abbreviation),
        (&*NUMBER_REGEX, SpanKind::Number),
    ] {
        spans.extend(regex.find_iter(text).map(|m| ProtectedSpan {
            range: m.start()..m.end(),
            kind,
        }));
    }
    spans.sort_by_key(|s| s.range.start);
    spans
}

/// True when a cut at `offset` would land strictly inside a protected span
pub fn is_protected(spans: &[ProtectedSpan], offset: usize) -> bool {
    spans
        .iter()
        .any(|s| s.range.start < offset && offset < s.range.end)
}

/// True when the character at `position` belongs to an abbreviation or number
pub fn is_inside_token_span(spans: &[ProtectedSpan], position: usize) -> bool {
    spans.iter().any(|s| {
        s.kind != SpanKind::Quote && s.range.start <= position && position < s.range.end
    })
}

/// Characters of scripts that do not separate words with spaces
pub fn is_unspaced_char(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF     // Hiragana, Katakana
        | 0x3400..=0x4DBF   // CJK extension A
        | 0x4E00..=0x9FFF   // CJK unified ideographs
        | 0xF900..=0xFAFF   // CJK compatibility ideographs
        | 0x0E00..=0x0E7F   // Thai
        | 0x0E80..=0x0EFF   // Lao
        | 0x1000..=0x109F   // Myanmar
        | 0x1780..=0x17FF   // Khmer
        | 0x20000..=0x2FFFD)
}

/// Combining marks and joiners that must stay attached to the previous character
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32,
        0x0300..=0x036F
        | 0x0483..=0x0489
        | 0x0591..=0x05BD
        | 0x0610..=0x061A
        | 0x064B..=0x065F
        | 0x0E31 | 0x0E34..=0x0E3A | 0x0E47..=0x0E4E
        | 0x1AB0..=0x1AFF
        | 0x1DC0..=0x1DFF
        | 0x200C..=0x200D
        | 0x20D0..=0x20FF
        | 0x3099..=0x309A
        | 0xFE00..=0xFE0F
        | 0xFE20..=0xFE2F
        | 0xE0100..=0xE01EF)
}

/// Sentence-final punctuation
pub fn is_sentence_terminator(c: char) -> bool {
    matches!(c, '.' | '?' | '!' | '。' | '？' | '！' | '‼' | '⁇' | '؟' | '।')
}

/// Clause-level punctuation used as soft break points
pub fn is_clause_punctuation(c: char) -> bool {
    matches!(c, ',' | ';' | ':' | '，' | '、' | '；' | '：')
}

/// Closing quotes and brackets that stay attached to the preceding sentence
pub fn is_closing_punctuation(c: char) -> bool {
    matches!(c, '"' | '\'' | '”' | '’' | '」' | '』' | '»' | ')' | ']' | '）' | '】')
}

/// Joiner used to glue words of a language back together
pub fn joiner_for(language: &str) -> &'static str {
    match language.trim().to_lowercase().as_str() {
        "zh" | "ja" | "th" | "lo" | "my" | "km" | "zho" | "jpn" | "tha" => "",
        _ => " ",
    }
}

/// NFKC-normalize, case-fold, strip punctuation and collapse whitespace.
///
/// NFKC composes decomposed accents and folds full-width and compatibility
/// forms. This is the one normalization used for every text comparison in
/// the crate.
pub fn normalize_text(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.nfkc() {
        if c.is_alphanumeric() {
            if pending_space && !normalized.is_empty() {
                normalized.push(' ');
            }
            pending_space = false;
            normalized.extend(c.to_lowercase());
        } else if c.is_whitespace() {
            pending_space = true;
        } else if is_combining_mark(c) && !normalized.is_empty() {
            normalized.push(c);
        }
        // Other punctuation and symbols are dropped without breaking the token
    }

    normalized
}

/// Split normalized text into comparison units.
///
/// Words for spaced scripts, single characters for unspaced ones.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut units = Vec::new();
    for word in normalize_text(text).split_whitespace() {
        let mut run = String::new();
        for c in word.chars() {
            if is_unspaced_char(c) {
                if !run.is_empty() {
                    units.push(std::mem::take(&mut run));
                }
                units.push(c.to_string());
            } else if is_combining_mark(c) && run.is_empty() {
                if let Some(last) = units.last_mut() {
                    last.push(c);
                }
            } else {
                run.push(c);
            }
        }
        if !run.is_empty() {
            units.push(run);
        }
    }
    units
}

/// Length of a text in length units
pub fn length_units(text: &str) -> usize {
    tokenize(text).len()
}

/// True when the word contains nothing that survives normalization
pub fn is_punctuation_only(text: &str) -> bool {
    normalize_text(text).is_empty()
}

/// Join transcript words into running text.
///
/// Punctuation-only words attach to their neighbour, and words of unspaced
/// scripts are glued without a separator.
pub fn join_words<'a, I>(words: I, language: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let joiner = joiner_for(language);
    let mut text = String::new();

    for word in words {
        let word = word.trim();
        if word.is_empty() {
            continue;
        }
        if !text.is_empty() && needs_separator(&text, word, joiner) {
            text.push(' ');
        }
        text.push_str(word);
    }

    text
}

fn needs_separator(previous: &str, word: &str, joiner: &str) -> bool {
    let (Some(last), Some(first)) = (previous.chars().last(), word.chars().next()) else {
        return false;
    };
    if joiner.is_empty() || is_unspaced_char(last) || is_unspaced_char(first) {
        return false;
    }
    if is_punctuation_only(word) {
        // Opening quotes and brackets take a space before them, the rest attach
        return matches!(first, '"' | '“' | '(' | '[' | '«' | '¿' | '¡' | '-' | '—');
    }
    !matches!(last, '(' | '[' | '“' | '«' | '¿' | '¡')
}

/// Byte offsets where text may be cut between words.
///
/// For spaced scripts this is the start of every whitespace run; between two
/// unspaced characters every character boundary qualifies. Offsets never fall
/// in front of a combining mark, a joiner or closing punctuation.
pub fn word_boundaries(text: &str) -> Vec<usize> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut boundaries = Vec::new();

    for i in 1..chars.len() {
        let (offset, current) = chars[i];
        let previous = chars[i - 1].1;

        if current.is_whitespace() {
            if !previous.is_whitespace() {
                boundaries.push(offset);
            }
            continue;
        }
        if previous.is_whitespace() {
            continue;
        }
        if is_combining_mark(current) || previous == '\u{200D}' {
            continue;
        }
        let unspaced_pair = is_unspaced_char(previous) || is_unspaced_char(current);
        let after_clause_mark = is_sentence_terminator(previous) || is_clause_punctuation(previous);
        if (unspaced_pair || after_clause_mark)
            && !is_sentence_terminator(current)
            && !is_clause_punctuation(current)
            && !is_closing_punctuation(current)
        {
            boundaries.push(offset);
        }
    }

    boundaries.retain(|&b| b > 0 && b < text.trim_end().len());
    boundaries
}

/// Cut text at a byte offset and trim both halves
pub fn split_at_offset(text: &str, offset: usize) -> (String, String) {
    let (left, right) = text.split_at(offset);
    (left.trim().to_string(), right.trim().to_string())
}

/// True when cutting at `offset` leaves non-empty text on both sides
pub fn is_interior_offset(text: &str, offset: usize) -> bool {
    offset > 0
        && offset < text.len()
        && text.is_char_boundary(offset)
        && !text[..offset].trim().is_empty()
        && !text[offset..].trim().is_empty()
}

/// True when cutting at `offset` leaves at least one length unit on each side.
///
/// Punctuation-only pieces have nothing to align, so no splitter may produce one.
pub fn splits_into_units(text: &str, offset: usize) -> bool {
    is_interior_offset(text, offset) && length_units(&text[..offset]) > 0 && length_units(&text[offset..]) > 0
}

/// Shorten text for log output
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
