/*!
 * Linguistic annotation capability used by the rule splitter.
 *
 * The splitter never parses text itself; it asks a [`ClauseAnnotator`] whether
 * a cut point separates two self-contained clauses and where the main verb of
 * a sentence sits. [`HeuristicAnnotator`] answers from word lists,
 * [`NullAnnotator`] rejects everything so that only punctuation splits remain.
 */

use std::fmt::Debug;

use crate::text_utils;

/// Clause-level linguistic judgements over raw text
pub trait ClauseAnnotator: Send + Sync + Debug {
    /// Whether cutting `text` at byte `offset` leaves a complete clause on each side
    fn is_valid_clause_boundary(&self, text: &str, offset: usize) -> bool;

    /// Byte offset just past the main verb of `text`, if one can be found
    fn root_offset(&self, _text: &str) -> Option<usize> {
        None
    }
}

/// Annotator that accepts no clause boundary and knows no root
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAnnotator;

impl ClauseAnnotator for NullAnnotator {
    fn is_valid_clause_boundary(&self, _text: &str, _offset: usize) -> bool {
        false
    }
}

/// Word-list driven annotator for the languages the connector tier knows
#[derive(Debug, Clone)]
pub struct HeuristicAnnotator {
    language: String,
    /// Words required on each side of a connector
    context_words: usize,
    /// Words a comma-separated phrase must exceed
    min_phrase_length: usize,
}

/// Connective words that may open a new clause in the given language
pub fn connectors_for(language: &str) -> &'static [&'static str] {
    match language.trim().to_lowercase().as_str() {
        "en" => &["that", "which", "where", "when", "because", "but", "and", "or"],
        "zh" => &["因为", "所以", "但是", "而且", "虽然", "如果", "即使", "尽管"],
        "ja" => &["けれども", "しかし", "だから", "それで", "ので", "のに", "ため"],
        "fr" => &["que", "qui", "où", "quand", "parce", "mais", "et", "ou"],
        "ru" => &["что", "который", "где", "когда", "потому", "но", "и", "или"],
        "es" => &["que", "cual", "donde", "cuando", "porque", "pero", "y", "o"],
        "de" => &["dass", "welche", "wo", "wann", "weil", "aber", "und", "oder"],
        "it" => &["che", "quale", "dove", "quando", "perché", "ma", "e", "o"],
        _ => &[],
    }
}

/// Look-ahead window for comma clauses
const PHRASE_WINDOW: usize = 9;

impl HeuristicAnnotator {
    pub fn new(language: impl Into<String>, context_words: usize, min_phrase_length: usize) -> Self {
        Self {
            language: language.into().trim().to_lowercase(),
            context_words,
            min_phrase_length,
        }
    }

    /// Language code this annotator was built for
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Connector words that may open a new clause
    pub fn connectors(&self) -> &'static [&'static str] {
        connectors_for(&self.language)
    }

    fn subject_words(&self) -> &'static [&'static str] {
        match self.language.as_str() {
            "en" => &["i", "you", "he", "she", "it", "we", "they", "this", "that", "there", "someone", "everyone", "nobody"],
            "fr" => &["je", "tu", "il", "elle", "on", "nous", "vous", "ils", "elles", "ce", "cela"],
            "es" => &["yo", "tú", "él", "ella", "nosotros", "vosotros", "ellos", "ellas", "usted", "esto"],
            "de" => &["ich", "du", "er", "sie", "es", "wir", "ihr", "man", "das"],
            "it" => &["io", "tu", "lui", "lei", "noi", "voi", "loro", "questo"],
            "ru" => &["я", "ты", "он", "она", "оно", "мы", "вы", "они", "это"],
            "zh" => &["我", "你", "他", "她", "它", "这", "那"],
            "ja" => &["私", "僕", "俺", "彼", "彼女", "これ", "それ"],
            _ => &[],
        }
    }

    fn verb_words(&self) -> &'static [&'static str] {
        match self.language.as_str() {
            "en" => &[
                "is", "are", "was", "were", "be", "been", "am", "have", "has", "had", "do", "does", "did",
                "will", "would", "can", "could", "should", "may", "might", "must", "said", "says", "think",
                "know", "want", "need", "go", "get", "got", "make", "made", "see", "saw",
            ],
            "fr" => &["est", "sont", "était", "a", "ont", "avait", "va", "fait", "peut", "doit", "suis"],
            "es" => &["es", "son", "está", "están", "fue", "era", "ha", "han", "tiene", "puede", "hay"],
            "de" => &["ist", "sind", "war", "waren", "hat", "haben", "wird", "kann", "muss", "bin"],
            "it" => &["è", "sono", "era", "ha", "hanno", "può", "deve", "sta"],
            "ru" => &["есть", "был", "была", "были", "будет", "может", "нужно"],
            _ => &[],
        }
    }

    /// Length units of a text span, lowercased and without punctuation
    fn words(text: &str) -> Vec<String> {
        text_utils::tokenize(text)
    }

    fn is_verb_like(&self, word: &str) -> bool {
        if self.verb_words().contains(&word) {
            return true;
        }
        self.language == "en" && word.len() > 4 && word.ends_with("ed")
    }

    /// Connector that opens `text`, if any
    fn leading_connector(&self, text: &str) -> Option<&'static str> {
        let normalized = text_utils::normalize_text(text);
        let first_word = normalized.split_whitespace().next()?;
        self.connectors().iter().copied().find(|connector| {
            let unspaced = connector.chars().next().is_some_and(text_utils::is_unspaced_char);
            *connector == first_word || (unspaced && first_word.starts_with(connector))
        })
    }

    fn check_connector(&self, left: &str, right: &str, connector: &str) -> bool {
        let left_words = Self::words(left);
        let right_words = Self::words(right);
        // The connector itself opens the right-hand side
        let after: Vec<&String> = right_words.iter().skip(Self::words(connector).len()).collect();

        if left_words.len() < self.context_words || after.len() < self.context_words {
            return false;
        }

        // Relative pronouns only open a clause when a new subject follows
        if self.language == "en" && matches!(connector, "that" | "which") {
            return after
                .first()
                .is_some_and(|w| self.subject_words().contains(&w.as_str()) || matches!(w.as_str(), "the" | "a" | "an"));
        }
        true
    }

    fn check_comma(&self, left: &str, right: &str) -> bool {
        let left_words = Self::words(left);
        // Right phrase stops at the next punctuation mark
        let right_phrase: String = right
            .trim_start()
            .chars()
            .take_while(|c| !text_utils::is_clause_punctuation(*c) && !text_utils::is_sentence_terminator(*c))
            .collect();
        let right_words: Vec<String> = Self::words(&right_phrase).into_iter().take(PHRASE_WINDOW).collect();

        if left_words.len() <= self.min_phrase_length || right_words.len() <= self.min_phrase_length {
            return false;
        }

        let subjects = self.subject_words();
        if subjects.is_empty() {
            return true;
        }
        let has_subject = right_words.iter().any(|w| subjects.contains(&w.as_str()));
        let has_verb = self.verb_words().is_empty() || right_words.iter().any(|w| self.is_verb_like(w));
        has_subject && has_verb
    }
}

impl ClauseAnnotator for HeuristicAnnotator {
    fn is_valid_clause_boundary(&self, text: &str, offset: usize) -> bool {
        if !text_utils::is_interior_offset(text, offset) {
            return false;
        }
        let (left, right) = text.split_at(offset);

        if left.trim_end().ends_with([',', '，', '、']) {
            return self.check_comma(left, right);
        }

        match self.leading_connector(right) {
            Some(connector) => self.check_connector(left, right, connector),
            None => {
                let min = self.min_phrase_length;
                Self::words(left).len() > min && Self::words(right).len() > min
            }
        }
    }

    fn root_offset(&self, text: &str) -> Option<usize> {
        let mut position = 0;
        for word in text.split_inclusive(char::is_whitespace) {
            let end = position + word.trim_end().len();
            let normalized = text_utils::normalize_text(word);
            if !normalized.is_empty() && self.is_verb_like(&normalized) {
                return Some(end);
            }
            position += word.len();
        }
        None
    }
}
