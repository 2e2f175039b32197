// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use subsplit::app_config::{self, Config, OracleProvider};
use subsplit::app_controller::Controller;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Segment a word transcript into subtitle-sized source sentences
    Split {
        /// Word timeline JSON: array of {text, start, end}
        #[arg(value_name = "WORDS_JSON")]
        words: PathBuf,

        /// Output file (default: <WORDS>.segments.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Align translated segments to the transcript and write SRT files
    Align {
        /// Word timeline JSON: array of {text, start, end}
        #[arg(value_name = "WORDS_JSON")]
        words: PathBuf,

        /// Translations JSON: array of strings or of {source, translation}
        #[arg(value_name = "TRANSLATIONS_JSON")]
        translations: PathBuf,

        /// Segments written by `split` that plain translations pair with
        /// (default: <WORDS>.segments.json)
        #[arg(long)]
        segments: Option<PathBuf>,

        /// Output directory (default: next to WORDS_JSON)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Generate shell completions for subsplit
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// subsplit - subtitle segmentation and timestamp alignment
///
/// Turns a word-level transcript into subtitle segments, aligns translated
/// text back to the transcript timing and writes display and dubbing SRT files.
#[derive(Parser, Debug)]
#[command(name = "subsplit")]
#[command(version)]
#[command(about = "Subtitle segmentation and timestamp alignment")]
#[command(long_about = "subsplit splits word-level transcripts into subtitle segments and aligns translations to them.

EXAMPLES:
    subsplit split words.json                       # Write words.segments.json
    subsplit align words.json translations.json     # Pair with words.segments.json, write SRT files
    subsplit --no-oracle align words.json t.json    # Rule splitting and forced cuts only
    subsplit -s ja -t en --max-line-weight 32 split words.json
    subsplit completions bash > subsplit.bash       # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Source language code (e.g., 'en', 'ja', 'fr')
    #[arg(short, long, global = true)]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'ja', 'fr')
    #[arg(short, long, global = true)]
    target_language: Option<String>,

    /// Width budget of one on-screen line
    #[arg(long, global = true)]
    max_line_weight: Option<usize>,

    /// Disable the semantic oracle
    #[arg(long, global = true)]
    no_oracle: bool,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Apply CLI overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, cli: &CommandLineOptions) {
    if let Some(source_lang) = &cli.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &cli.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(weight) = cli.max_line_weight {
        config.display.max_line_weight = weight;
    }
    if cli.no_oracle {
        config.oracle.provider = OracleProvider::None;
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "subsplit", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(cmd_log_level) = &cli.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&cli.config)?;
    apply_overrides(&mut config, &cli);
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?;

    match cli.command {
        Commands::Split { words, output } => {
            let path = controller.run_split(&words, output).await?;
            info!("Segments written to {}", path.display());
        }
        Commands::Align {
            words,
            translations,
            segments,
            output_dir,
        } => {
            controller.run_align(&words, &translations, segments, output_dir).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
