use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::display::MIN_LINE_WEIGHT;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Sentence segmentation settings
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Semantic split oracle settings
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Timestamp alignment settings
    #[serde(default)]
    pub alignment: AlignmentConfig,

    /// Display line splitting settings
    #[serde(default)]
    pub display: DisplayLineConfig,

    /// Gap optimization settings
    #[serde(default)]
    pub gaps: GapSettings,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Semantic oracle backend
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OracleProvider {
    // @provider: rule splitting and forced cuts only
    None,
    // @provider: Ollama
    #[default]
    Ollama,
}

impl OracleProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::None => "None",
            Self::Ollama => "Ollama",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::None => "none".to_string(),
            Self::Ollama => "ollama".to_string(),
        }
    }
}

impl std::fmt::Display for OracleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for OracleProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "ollama" => Ok(Self::Ollama),
            _ => Err(anyhow!("Invalid oracle provider: {}", s)),
        }
    }
}

/// Sentence segmentation settings, lengths in length units
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SegmentationConfig {
    /// Hard cap on a segment's length
    #[serde(default = "default_max_segment_length")]
    pub max_segment_length: usize,

    /// Soft goal used by the root split tier
    #[serde(default = "default_rule_max_sentence_length")]
    pub rule_max_sentence_length: usize,

    /// Minimum length of each side of a rule split
    #[serde(default = "default_rule_min_sentence_length")]
    pub rule_min_sentence_length: usize,

    /// Words of context each side of a connector
    #[serde(default = "default_context_words")]
    pub context_words: usize,

    /// Minimum phrase length around a comma
    #[serde(default = "default_min_phrase_length")]
    pub min_phrase_length: usize,

    /// How many times the oracle may split pieces of one segment
    #[serde(default = "default_max_recursion_depth")]
    pub max_recursion_depth: usize,

    #[serde(default = "default_true")]
    pub enable_mark_split: bool,

    #[serde(default = "default_true")]
    pub enable_connector_split: bool,

    #[serde(default = "default_true")]
    pub enable_comma_split: bool,

    #[serde(default = "default_true")]
    pub enable_root_split: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_segment_length: default_max_segment_length(),
            rule_max_sentence_length: default_rule_max_sentence_length(),
            rule_min_sentence_length: default_rule_min_sentence_length(),
            context_words: default_context_words(),
            min_phrase_length: default_min_phrase_length(),
            max_recursion_depth: default_max_recursion_depth(),
            enable_mark_split: true,
            enable_connector_split: true,
            enable_comma_split: true,
            enable_root_split: true,
        }
    }
}

/// Semantic split oracle settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OracleConfig {
    /// Backend answering split requests
    #[serde(default)]
    pub provider: OracleProvider,

    /// Model name (e.g., "llama3.2:3b")
    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Service endpoint URL
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of oracle calls in flight
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Retry count for failed HTTP requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Rate limit in requests per minute (optional)
    #[serde(default)]
    pub rate_limit: Option<u32>,

    /// Minimum similarity for a suggestion to be accepted
    #[serde(default = "default_acceptance_threshold")]
    pub acceptance_threshold: f32,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Attempts per sentence when the model answers with malformed JSON
    #[serde(default = "default_malformed_attempts")]
    pub malformed_attempts: u32,

    /// Remember suggestions for sentences seen before in the same run
    #[serde(default = "default_true")]
    pub cache_suggestions: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: OracleProvider::default(),
            model: default_ollama_model(),
            endpoint: default_ollama_endpoint(),
            timeout_secs: default_timeout_secs(),
            concurrent_requests: default_concurrent_requests(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            rate_limit: None,
            acceptance_threshold: default_acceptance_threshold(),
            temperature: default_temperature(),
            malformed_attempts: default_malformed_attempts(),
            cache_suggestions: true,
        }
    }
}

/// Timestamp alignment settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AlignmentConfig {
    /// How many transcript words a recovery may skip
    #[serde(default = "default_search_window")]
    pub search_window: usize,

    /// Similarity above which two tokens count as the same word
    #[serde(default = "default_fuzzy_token_threshold")]
    pub fuzzy_token_threshold: f32,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            search_window: default_search_window(),
            fuzzy_token_threshold: default_fuzzy_token_threshold(),
        }
    }
}

/// Display line splitting settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DisplayLineConfig {
    /// Width budget of one on-screen line
    #[serde(default = "default_max_line_weight")]
    pub max_line_weight: usize,

    /// Width budget of the dubbing projection, uncapped when absent
    #[serde(default)]
    pub dubbing_max_line_weight: Option<usize>,

    /// Confidence multiplier for interpolated dubbing sub-segments
    #[serde(default = "default_interpolation_confidence_factor")]
    pub interpolation_confidence_factor: f32,
}

impl Default for DisplayLineConfig {
    fn default() -> Self {
        Self {
            max_line_weight: default_max_line_weight(),
            dubbing_max_line_weight: None,
            interpolation_confidence_factor: default_interpolation_confidence_factor(),
        }
    }
}

/// Gap optimization settings, all in seconds
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GapSettings {
    #[serde(default = "default_min_gap_secs")]
    pub min_gap_secs: f64,

    #[serde(default = "default_min_duration_secs")]
    pub min_duration_secs: f64,

    /// Reported, never enforced
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: f64,
}

impl Default for GapSettings {
    fn default() -> Self {
        Self {
            min_gap_secs: default_min_gap_secs(),
            min_duration_secs: default_min_duration_secs(),
            max_duration_secs: default_max_duration_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "fr".to_string()
}

fn default_max_segment_length() -> usize {
    20
}

fn default_rule_max_sentence_length() -> usize {
    40
}

fn default_rule_min_sentence_length() -> usize {
    8
}

fn default_context_words() -> usize {
    5
}

fn default_min_phrase_length() -> usize {
    3
}

fn default_max_recursion_depth() -> usize {
    4
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_acceptance_threshold() -> f32 {
    0.9
}

fn default_temperature() -> f32 {
    0.2
}

fn default_malformed_attempts() -> u32 {
    2
}

fn default_search_window() -> usize {
    8
}

fn default_fuzzy_token_threshold() -> f32 {
    0.8
}

fn default_max_line_weight() -> usize {
    42
}

fn default_interpolation_confidence_factor() -> f32 {
    0.8
}

fn default_min_gap_secs() -> f64 {
    0.3
}

fn default_min_duration_secs() -> f64 {
    1.0
}

fn default_max_duration_secs() -> f64 {
    6.0
}

fn default_true() -> bool {
    true
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

impl Config {
    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Load `path`, or write and return the defaults when it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        log::warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        let _source_name = crate::language_utils::get_language_name(&self.source_language)?;
        let _target_name = crate::language_utils::get_language_name(&self.target_language)?;

        let seg = &self.segmentation;
        if seg.max_segment_length == 0 {
            return Err(anyhow!("segmentation.max_segment_length must be positive"));
        }
        if seg.rule_max_sentence_length == 0 {
            return Err(anyhow!("segmentation.rule_max_sentence_length must be positive"));
        }
        if seg.rule_min_sentence_length == 0 {
            return Err(anyhow!("segmentation.rule_min_sentence_length must be positive"));
        }

        check_unit_interval("oracle.acceptance_threshold", self.oracle.acceptance_threshold)?;
        check_unit_interval("oracle.temperature", self.oracle.temperature)?;
        check_unit_interval("alignment.fuzzy_token_threshold", self.alignment.fuzzy_token_threshold)?;
        check_unit_interval(
            "display.interpolation_confidence_factor",
            self.display.interpolation_confidence_factor,
        )?;

        if self.oracle.concurrent_requests == 0 {
            return Err(anyhow!("oracle.concurrent_requests must be positive"));
        }
        if self.oracle.timeout_secs == 0 {
            return Err(anyhow!("oracle.timeout_secs must be positive"));
        }
        if self.oracle.malformed_attempts == 0 {
            return Err(anyhow!("oracle.malformed_attempts must be positive"));
        }
        if self.oracle.provider == OracleProvider::Ollama && self.oracle.model.trim().is_empty() {
            return Err(anyhow!("oracle.model is required for the Ollama provider"));
        }

        let too_narrow = |weight: usize| weight < MIN_LINE_WEIGHT;
        if too_narrow(self.display.max_line_weight) || self.display.dubbing_max_line_weight.is_some_and(too_narrow) {
            return Err(anyhow!(
                "display line weights must be at least {} to fit one wide character",
                MIN_LINE_WEIGHT
            ));
        }

        let gaps = &self.gaps;
        if gaps.min_gap_secs < 0.0 || gaps.min_duration_secs < 0.0 {
            return Err(anyhow!("gap settings must not be negative"));
        }
        if gaps.max_duration_secs < gaps.min_duration_secs {
            return Err(anyhow!("gaps.max_duration_secs is below gaps.min_duration_secs"));
        }

        Ok(())
    }
}

fn check_unit_interval(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
    }
    Ok(())
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            segmentation: SegmentationConfig::default(),
            oracle: OracleConfig::default(),
            alignment: AlignmentConfig::default(),
            display: DisplayLineConfig::default(),
            gaps: GapSettings::default(),
            log_level: LogLevel::default(),
        }
    }
}
