use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::{Config, OracleProvider};
use crate::language_utils;
use crate::pipeline::{PipelineOutput, PipelineStats, SegmentationPipeline};
use crate::providers::Provider;
use crate::providers::ollama::Ollama;
use crate::segment::{SkippedSegment, TextSegment};
use crate::splitting::oracle::SuggestionCache;
use crate::splitting::{LlmSplitOracle, NoopOracle, SegmenterStats, SemanticSplitOracle};
use crate::subtitle_writer::{self, SubtitleGenerationSummary};
use crate::timeline::{Word, WordTimeline};

// @module: Application controller for segmentation runs

/// Translated chunks as handed over by the translation collaborator
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TranslationInput {
    /// One translation per segment, paired by index
    Plain(Vec<String>),
    /// Segments that already carry their source text
    Paired(Vec<SegmentPair>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentPair {
    pub source: String,
    #[serde(default)]
    pub translation: String,
}

/// JSON report written next to the subtitles of an align run
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    summary: &'a SubtitleGenerationSummary,
    stats: &'a PipelineStats,
    skipped: &'a [SkippedSegment],
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        let mut config = Config::default();
        config.oracle.provider = OracleProvider::None;
        Self::with_config(config)
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(mut config: Config) -> Result<Self> {
        config.source_language = language_utils::normalize_to_part1_or_part2t(&config.source_language)
            .context("Invalid source language")?;
        config.target_language = language_utils::normalize_to_part1_or_part2t(&config.target_language)
            .context("Invalid target language")?;

        if language_utils::language_codes_match(&config.source_language, &config.target_language) {
            warn!("Source and target language are both '{}'", config.source_language);
        }

        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the configured split oracle
    pub async fn build_oracle(&self) -> Arc<dyn SemanticSplitOracle> {
        let settings = &self.config.oracle;
        match settings.provider {
            OracleProvider::None => {
                info!("Semantic oracle disabled, using rule splitting only");
                Arc::new(NoopOracle)
            }
            OracleProvider::Ollama => {
                let provider = Ollama::new_with_config(
                    &settings.endpoint,
                    settings.timeout_secs,
                    settings.retry_count,
                    settings.retry_backoff_ms,
                    settings.rate_limit,
                );
                let mut oracle = LlmSplitOracle::new(provider, &settings.model, &self.config.source_language)
                    .with_temperature(settings.temperature)
                    .with_attempts(settings.malformed_attempts);
                if settings.cache_suggestions {
                    oracle = oracle.with_cache(Arc::new(SuggestionCache::default()));
                }

                if let Err(e) = oracle.provider().test_connection().await {
                    warn!(
                        "{} at {} is not reachable ({}), long sentences will be force-split",
                        settings.provider.display_name(),
                        settings.endpoint,
                        e
                    );
                } else {
                    info!("Semantic oracle: {} - {}", settings.provider.display_name(), settings.model);
                }
                Arc::new(oracle)
            }
        }
    }

    /// Read a words JSON file into a validated timeline
    pub fn load_timeline(&self, path: &Path) -> Result<WordTimeline> {
        let file = File::open(path).with_context(|| format!("Failed to open words file: {}", path.display()))?;
        let words: Vec<Word> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse words file: {}", path.display()))?;
        debug!("Loaded {} words from {}", words.len(), path.display());

        WordTimeline::new(words, self.config.source_language.clone())
            .with_context(|| format!("Invalid word timeline in {}", path.display()))
    }

    /// Read a translations JSON file
    pub fn load_translations(&self, path: &Path) -> Result<TranslationInput> {
        let file =
            File::open(path).with_context(|| format!("Failed to open translations file: {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse translations file: {}", path.display()))
    }

    /// Segment the transcript and write the source segments as JSON
    pub async fn run_split(&self, words_path: &Path, output_path: Option<PathBuf>) -> Result<PathBuf> {
        let start_time = Instant::now();
        let timeline = self.load_timeline(words_path)?;
        let pipeline = SegmentationPipeline::from_config(&self.config, self.build_oracle().await);

        let progress_bar = Self::spinner("Segmenting transcript");
        let (segments, stats) = pipeline.segment(&timeline).await;
        progress_bar.finish_and_clear();

        let output_path = output_path.unwrap_or_else(|| Self::default_output_path(words_path, "segments.json"));
        Self::write_json(&output_path, &segments)?;

        info!(
            "Split {} words into {} segments ({} oracle splits, {} forced) in {}",
            timeline.len(),
            segments.len(),
            stats.oracle_accepted,
            stats.force_splits,
            Self::format_duration(start_time.elapsed())
        );
        Ok(output_path)
    }

    /// Read the source segments written by [`Controller::run_split`]
    pub fn load_segments(&self, path: &Path) -> Result<Vec<TextSegment>> {
        let file = File::open(path).with_context(|| format!("Failed to open segments file: {}", path.display()))?;
        let segments: Vec<TextSegment> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse segments file: {}", path.display()))?;

        if let Some((position, segment)) = segments.iter().enumerate().find(|(i, s)| s.index != *i) {
            return Err(anyhow!(
                "Segments file {} is out of order: entry {} has index {}",
                path.display(),
                position,
                segment.index
            ));
        }
        debug!("Loaded {} segments from {}", segments.len(), path.display());
        Ok(segments)
    }

    /// Source segments that plain translations are paired with.
    ///
    /// Uses the `split` output when there is one. Without it the transcript is
    /// segmented again, which only reproduces the `split` run when no oracle
    /// is involved.
    async fn source_segments(
        &self,
        words_path: &Path,
        segments_path: Option<PathBuf>,
        timeline: &WordTimeline,
    ) -> Result<(Vec<TextSegment>, SegmenterStats)> {
        let explicit = segments_path.is_some();
        let segments_path = segments_path.unwrap_or_else(|| Self::default_output_path(words_path, "segments.json"));

        if explicit || segments_path.exists() {
            info!("Pairing translations with segments from {}", segments_path.display());
            return Ok((self.load_segments(&segments_path)?, SegmenterStats::default()));
        }

        if self.config.oracle.provider != OracleProvider::None {
            return Err(anyhow!(
                "No segments file at {}. Run 'split' first or pass --segments, \
                 oracle splits cannot be reproduced reliably",
                segments_path.display()
            ));
        }

        warn!("No segments file at {}, segmenting the transcript again", segments_path.display());
        let pipeline = SegmentationPipeline::from_config(&self.config, Arc::new(NoopOracle));
        Ok(pipeline.segment(timeline).await)
    }

    /// Run the whole pipeline and write subtitles plus a report into `output_dir`
    pub async fn run_align(
        &self,
        words_path: &Path,
        translations_path: &Path,
        segments_path: Option<PathBuf>,
        output_dir: Option<PathBuf>,
    ) -> Result<SubtitleGenerationSummary> {
        let start_time = Instant::now();
        let timeline = self.load_timeline(words_path)?;
        let translations = self.load_translations(translations_path)?;
        let output_dir = output_dir.unwrap_or_else(|| {
            words_path.parent().unwrap_or(Path::new(".")).to_path_buf()
        });

        let (segments, segmenter_stats) = match translations {
            TranslationInput::Paired(pairs) => {
                debug!("Using {} pre-segmented pairs", pairs.len());
                let segments: Vec<TextSegment> = pairs
                    .into_iter()
                    .enumerate()
                    .map(|(i, pair)| TextSegment::new(i, pair.source.trim()).with_translation(pair.translation.trim()))
                    .collect();
                (segments, SegmenterStats::default())
            }
            TranslationInput::Plain(texts) => {
                let (segments, stats) = self.source_segments(words_path, segments_path, &timeline).await?;
                (crate::pipeline::attach_translations(segments, &texts)?, stats)
            }
        };

        let progress_bar = ProgressBar::new(2);
        progress_bar.set_style(Self::progress_style());
        progress_bar.set_message("Aligning");

        // Segments are final here, the oracle is never consulted
        let pipeline = SegmentationPipeline::from_config(&self.config, Arc::new(NoopOracle));
        let mut output = pipeline.process_segments(&segments, &timeline)?;
        output.stats.segmenter = segmenter_stats;
        progress_bar.inc(1);
        progress_bar.set_message("Writing subtitles");

        let summary = self.write_run(&output, &output_dir)?;
        progress_bar.inc(1);
        progress_bar.finish_and_clear();

        for skipped in &output.skipped {
            warn!("Segment {} skipped: {}", skipped.index, skipped.reason);
        }
        info!("{}", summary);
        info!("Completed in {}", Self::format_duration(start_time.elapsed()));
        Ok(summary)
    }

    /// Write SRT files and the JSON run report
    pub fn write_run(&self, output: &PipelineOutput, output_dir: &Path) -> Result<SubtitleGenerationSummary> {
        let written = subtitle_writer::write_outputs(output, output_dir)?;
        if written.is_empty() {
            return Err(anyhow!("No subtitles produced, every segment was skipped"));
        }

        let summary = SubtitleGenerationSummary::from_output(output);
        let report = RunReport {
            summary: &summary,
            stats: &output.stats,
            skipped: &output.skipped,
        };
        Self::write_json(&output_dir.join("report.json"), &report)?;
        Ok(summary)
    }

    fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
        let stem = input.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| "words".to_string());
        input.with_file_name(format!("{}.{}", stem, suffix))
    }

    fn progress_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} stages {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }

    fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }

    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
