/*!
 * Semantic split oracle.
 *
 * An oracle is consulted for sentences the rule splitter left over the hard
 * length cap. It answers with one byte offset and a score; the hybrid
 * segmenter decides whether to trust it. Any failure is recovered by the
 * caller, so an oracle is free to time out or return garbage.
 *
 * [`LlmSplitOracle`] asks a language model for two alternative splits marked
 * with `[br]`, takes the one the model chose and maps it back onto the
 * original text by fuzzy similarity. [`NoopOracle`] always fails, which
 * yields pure rule-based segmentation.
 */

use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::alignment::fuzzy;
use crate::errors::OracleError;
use crate::providers::{CompletionPrompt, Provider};
use crate::text_utils;

/// Split marker the model places between the two parts
pub const SPLIT_MARKER: &str = "[br]";

/// One suggested cut point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitSuggestion {
    /// Byte offset into the text passed to the oracle
    pub offset: usize,
    /// Self-assessed quality in [0, 1]
    pub score: f32,
}

/// Capability that proposes where an over-long sentence should be cut
#[async_trait]
pub trait SemanticSplitOracle: Send + Sync + Debug {
    /// Suggest one split of `text` so that both halves move toward `max_len` length units
    async fn suggest_split(&self, text: &str, max_len: usize) -> Result<SplitSuggestion, OracleError>;
}

/// Oracle that is never available
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOracle;

#[async_trait]
impl SemanticSplitOracle for NoopOracle {
    async fn suggest_split(&self, _text: &str, _max_len: usize) -> Result<SplitSuggestion, OracleError> {
        Err(OracleError::Unavailable)
    }
}

const SPLIT_PROMPT: &str = r#"## Role
You are a professional Netflix subtitle splitter in **{language}**.

## Task
Split the given subtitle text into **2** parts, each less than **{limit}** {unit}.

1. Keep the meaning of each part coherent, following Netflix subtitle standards
2. Keep both parts roughly equal in length (at least 3 {unit} each)
3. Split at natural points such as punctuation marks or conjunctions
4. If the text repeats the same words, split in the middle of the repetition

## Steps
1. Analyze the sentence structure and what makes it hard to split
2. Write two alternative splits, marking the split position with [br]
3. Compare both alternatives
4. Choose the better one

## Given Text
<split_this_sentence>
{sentence}
</split_this_sentence>

## Output in only JSON format and no other text
```json
{
    "analysis": "Brief description of the sentence structure and splitting challenges",
    "split1": "First alternative with [br] at the split position",
    "split2": "Second alternative with [br] at the split position",
    "assess": "Comparison of both alternatives",
    "choice": "1 or 2"
}
```

Start your answer with ```json and end it with ```, do not add any other text."#;

/// Answer shape the split prompt asks for
#[derive(Debug, Deserialize)]
struct SplitAnswer {
    #[serde(default)]
    analysis: Option<String>,
    #[serde(default)]
    split1: Option<String>,
    #[serde(default)]
    split2: Option<String>,
    #[serde(default)]
    choice: Option<serde_json::Value>,
}

impl SplitAnswer {
    /// The alternative the model chose, defaulting to the first
    fn chosen(&self) -> Result<&str, OracleError> {
        let choice = match &self.choice {
            Some(serde_json::Value::String(s)) => s.trim().to_string(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => "1".to_string(),
        };
        let split = match choice.as_str() {
            "2" => self.split2.as_deref(),
            _ => self.split1.as_deref(),
        };
        let split = split.ok_or_else(|| {
            OracleError::MalformedResponse(format!("missing required key: split{}", choice))
        })?;
        if !split.contains(SPLIT_MARKER) {
            return Err(OracleError::MalformedResponse("no [br] marker in chosen split".to_string()));
        }
        Ok(split)
    }
}

/// Pull the JSON object out of a possibly fenced answer
fn extract_json(answer: &str) -> Option<&str> {
    let start = answer.find('{')?;
    let end = answer.rfind('}')?;
    (start < end).then(|| &answer[start..=end])
}

/// Parse a model answer into the chosen `[br]`-marked split
pub fn parse_split_answer(answer: &str) -> Result<String, OracleError> {
    let json = extract_json(answer)
        .ok_or_else(|| OracleError::MalformedResponse("no JSON object in answer".to_string()))?;
    let parsed: SplitAnswer = serde_json::from_str(json)
        .map_err(|e| OracleError::MalformedResponse(format!("invalid JSON: {}", e)))?;
    if let Some(analysis) = &parsed.analysis {
        debug!("Oracle analysis: {}", text_utils::truncate_text(analysis, 80));
    }
    parsed.chosen().map(str::to_string)
}

/// Map the left part of a `[br]` split back to a byte offset in `original`.
///
/// Every word boundary of the original is tried and the one whose left side is
/// most similar to the model's left part wins; the similarity is the score.
pub fn locate_split(original: &str, marked: &str) -> Option<SplitSuggestion> {
    let left = marked.split(SPLIT_MARKER).next()?;
    let target = text_utils::normalize_text(left);
    if target.is_empty() {
        return None;
    }

    let mut best: Option<SplitSuggestion> = None;
    for offset in text_utils::word_boundaries(original) {
        let candidate = text_utils::normalize_text(&original[..offset]);
        let score = fuzzy::similarity(&candidate, &target);
        if best.is_none_or(|b| score > b.score) {
            best = Some(SplitSuggestion { offset, score });
        }
    }
    best
}

/// Remembered suggestions keyed by text and length cap
#[derive(Debug, Default)]
pub struct SuggestionCache {
    entries: RwLock<HashMap<(String, usize), SplitSuggestion>>,
    hits: RwLock<usize>,
    misses: RwLock<usize>,
}

impl SuggestionCache {
    pub fn get(&self, text: &str, max_len: usize) -> Option<SplitSuggestion> {
        let found = self.entries.read().get(&(text.to_string(), max_len)).copied();
        match found {
            Some(_) => *self.hits.write() += 1,
            None => *self.misses.write() += 1,
        }
        found
    }

    pub fn store(&self, text: &str, max_len: usize, suggestion: SplitSuggestion) {
        self.entries.write().insert((text.to_string(), max_len), suggestion);
    }

    /// Hits, misses and hit rate
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = *self.hits.read();
        let misses = *self.misses.read();
        let total = hits + misses;
        let hit_rate = if total > 0 { hits as f64 / total as f64 } else { 0.0 };
        (hits, misses, hit_rate)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Oracle backed by a language model provider
#[derive(Debug)]
pub struct LlmSplitOracle<P: Provider> {
    provider: P,
    model: String,
    language: String,
    temperature: f32,
    /// Attempts per suggestion when the model answers with something unusable
    attempts: u32,
    cache: Option<Arc<SuggestionCache>>,
}

impl<P> LlmSplitOracle<P>
where
    P: Provider,
    P::Request: From<CompletionPrompt>,
{
    pub fn new(provider: P, model: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            language: language.into(),
            temperature: 0.3,
            attempts: 1,
            cache: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_cache(mut self, cache: Arc<SuggestionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Render the split prompt for one sentence
    pub fn build_prompt(&self, text: &str, max_len: usize) -> CompletionPrompt {
        let unit = if text_utils::joiner_for(&self.language).is_empty() {
            "characters"
        } else {
            "words"
        };
        let language = crate::language_utils::get_language_name(&self.language)
            .unwrap_or_else(|_| self.language.clone());
        let prompt = SPLIT_PROMPT
            .replace("{language}", &language)
            .replace("{limit}", &max_len.to_string())
            .replace("{unit}", unit)
            .replace("{sentence}", text);

        CompletionPrompt::new(&self.model, prompt, text)
            .temperature(self.temperature)
            .json_output(true)
    }

    async fn ask(&self, text: &str, max_len: usize) -> Result<SplitSuggestion, OracleError> {
        let request = P::Request::from(self.build_prompt(text, max_len));
        let response = self.provider.complete(request).await?;
        let answer = P::extract_text(&response);
        let marked = parse_split_answer(&answer)?;
        locate_split(text, &marked)
            .ok_or_else(|| OracleError::MalformedResponse("split does not match the sentence".to_string()))
    }
}

#[async_trait]
impl<P> SemanticSplitOracle for LlmSplitOracle<P>
where
    P: Provider,
    P::Request: From<CompletionPrompt>,
{
    async fn suggest_split(&self, text: &str, max_len: usize) -> Result<SplitSuggestion, OracleError> {
        if let Some(suggestion) = self.cache.as_ref().and_then(|c| c.get(text, max_len)) {
            return Ok(suggestion);
        }

        let mut last_error = OracleError::Unavailable;
        for attempt in 1..=self.attempts {
            match self.ask(text, max_len).await {
                Ok(suggestion) => {
                    debug!(
                        "Oracle suggests byte {} (score {:.2}) for '{}'",
                        suggestion.offset,
                        suggestion.score,
                        text_utils::truncate_text(text, 40)
                    );
                    if let Some(cache) = &self.cache {
                        cache.store(text, max_len, suggestion);
                    }
                    return Ok(suggestion);
                }
                // Transport failures were already retried by the provider
                Err(e @ OracleError::Provider(_)) => return Err(e),
                Err(e) => {
                    warn!("Unusable oracle answer (attempt {}/{}): {}", attempt, self.attempts, e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
