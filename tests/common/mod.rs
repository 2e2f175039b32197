/*!
 * Common test utilities for the subsplit test suite
 */

use anyhow::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use subsplit::alignment::{AlignerConfig, TimestampAligner};
use subsplit::display::{DisplayConfig, DisplaySplitter};
use subsplit::gaps::{GapConfig, GapOptimizer};
use subsplit::pipeline::SegmentationPipeline;
use subsplit::splitting::{
    HeuristicAnnotator, HybridConfig, HybridSegmenter, RuleSplitter, RuleSplitterConfig, SemanticSplitOracle,
};
use subsplit::timeline::{Word, WordTimeline};

// Re-export the mock oracles module
pub mod mock_oracles;

/// Route library logs to the test output, once per test binary
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Serializes `value` as JSON into `dir/filename`
pub fn write_json_file<T: Serialize>(dir: &Path, filename: &str, value: &T) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, serde_json::to_string_pretty(value)?)?;
    Ok(file_path)
}

/// Words with explicit timing
pub fn words(entries: &[(&str, f64, f64)]) -> Vec<Word> {
    entries.iter().map(|(text, start, end)| Word::new(*text, *start, *end)).collect()
}

/// Timeline of whitespace-separated `text`, each word `word_secs` long with
/// `gap_secs` of silence after it
pub fn evenly_timed(text: &str, language: &str, word_secs: f64, gap_secs: f64) -> WordTimeline {
    let mut time = 0.0;
    let words = text
        .split_whitespace()
        .map(|w| {
            let word = Word::new(w, time, time + word_secs);
            time += word_secs + gap_secs;
            word
        })
        .collect();
    WordTimeline::new(words, language).expect("valid test timeline")
}

/// Timeline of unspaced text, one word per character
pub fn per_character(text: &str, language: &str, char_secs: f64) -> WordTimeline {
    let words = text
        .chars()
        .enumerate()
        .map(|(i, c)| Word::new(c.to_string(), i as f64 * char_secs, (i + 1) as f64 * char_secs))
        .collect();
    WordTimeline::new(words, language).expect("valid test timeline")
}

/// Hybrid segmenter with the heuristic annotator and default rule settings
pub fn segmenter(
    language: &str,
    oracle: Arc<dyn SemanticSplitOracle>,
    max_segment_length: usize,
    oracle_timeout: Duration,
) -> HybridSegmenter {
    let rules = RuleSplitter::new(
        RuleSplitterConfig {
            language: language.to_string(),
            ..Default::default()
        },
        Arc::new(HeuristicAnnotator::new(language, 5, 3)),
    );
    HybridSegmenter::new(
        rules,
        oracle,
        HybridConfig {
            max_segment_length,
            oracle_timeout,
            ..Default::default()
        },
    )
}

/// Pipeline with default stage settings and the given cap and oracle
pub fn pipeline(language: &str, oracle: Arc<dyn SemanticSplitOracle>, max_segment_length: usize) -> SegmentationPipeline {
    SegmentationPipeline::new(
        segmenter(language, oracle, max_segment_length, Duration::from_secs(5)),
        TimestampAligner::new(AlignerConfig::default()),
        DisplaySplitter::new(DisplayConfig::default()),
        GapOptimizer::new(GapConfig::default()),
    )
}
