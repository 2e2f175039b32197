use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::pipeline::PipelineOutput;
use crate::segment::FinalSegment;

// @module: SRT rendering of pipeline projections

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    // @field: Sequence number, 1-based
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text, possibly multi-line
    pub text: String,
}

impl SubtitleEntry {
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    /// Format milliseconds as an SRT timestamp (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(
            f,
            "{} --> {}",
            Self::format_timestamp(self.start_time_ms),
            Self::format_timestamp(self.end_time_ms)
        )?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Which text of a segment goes into the subtitle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrtLayout {
    Source,
    Translation,
    SourceThenTranslation,
    TranslationThenSource,
}

impl SrtLayout {
    fn render(&self, segment: &FinalSegment) -> String {
        let source = segment.source_text();
        let translation = segment.translation_text();
        let pair = |first: String, second: String| {
            [first, second]
                .into_iter()
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        };
        match self {
            Self::Source => source,
            Self::Translation => translation,
            Self::SourceThenTranslation => pair(source, translation),
            Self::TranslationThenSource => pair(translation, source),
        }
    }
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

/// Turn a projection into numbered SRT entries, skipping empty text
pub fn to_entries(segments: &[FinalSegment], layout: SrtLayout) -> Vec<SubtitleEntry> {
    segments
        .iter()
        .map(|segment| (segment, layout.render(segment)))
        .filter(|(_, text)| !text.trim().is_empty())
        .enumerate()
        .map(|(i, (segment, text))| {
            SubtitleEntry::new(i + 1, seconds_to_ms(segment.start()), seconds_to_ms(segment.end()), text)
        })
        .collect()
}

/// Render entries as SRT text
pub fn render_srt(entries: &[SubtitleEntry]) -> String {
    entries.iter().map(|e| e.to_string()).collect()
}

/// Write subtitles to an SRT file
pub fn write_srt<P: AsRef<Path>>(entries: &[SubtitleEntry], path: P) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut file =
        File::create(path).with_context(|| format!("Failed to create subtitle file: {}", path.display()))?;
    for entry in entries {
        write!(file, "{}", entry)?;
    }

    debug!("Wrote {} entries to {}", entries.len(), path.display());
    Ok(())
}

/// File names of the display projection, by layout
pub const DISPLAY_OUTPUTS: [(&str, SrtLayout); 4] = [
    ("src.srt", SrtLayout::Source),
    ("trans.srt", SrtLayout::Translation),
    ("src_trans.srt", SrtLayout::SourceThenTranslation),
    ("trans_src.srt", SrtLayout::TranslationThenSource),
];

/// File names of the dubbing projection, by layout
pub const DUBBING_OUTPUTS: [(&str, SrtLayout); 2] = [
    ("src_subs_for_audio.srt", SrtLayout::Source),
    ("trans_subs_for_audio.srt", SrtLayout::Translation),
];

/// Write every SRT output of a run into `dir` and return the written paths
pub fn write_outputs<P: AsRef<Path>>(output: &PipelineOutput, dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut written = Vec::new();

    let jobs = DISPLAY_OUTPUTS
        .iter()
        .map(|(name, layout)| (name, layout, &output.display))
        .chain(DUBBING_OUTPUTS.iter().map(|(name, layout)| (name, layout, &output.dubbing)));

    for (name, layout, segments) in jobs {
        let entries = to_entries(segments, *layout);
        if entries.is_empty() {
            debug!("Skipping empty output {}", name);
            continue;
        }
        let path = dir.join(name);
        write_srt(&entries, &path)?;
        written.push(path);
    }

    info!("Wrote {} subtitle files to {}", written.len(), dir.display());
    Ok(written)
}

/// Summary of a generated subtitle set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubtitleGenerationSummary {
    /// Segments in the display projection
    pub total_segments: usize,
    /// Display segments rendered on more than one line
    pub split_segments: usize,
    /// Segments whose timing needed recovery or interpolation
    pub low_confidence_segments: usize,
    /// Average on-screen duration in seconds
    pub average_duration: f64,
    /// Segments in the dubbing projection
    pub dubbing_segments: usize,
    /// Segments dropped during alignment
    pub skipped_segments: usize,
}

impl SubtitleGenerationSummary {
    pub fn from_output(output: &PipelineOutput) -> Self {
        let total = output.display.len();
        let duration: f64 = output.display.iter().map(|s| s.segment.duration()).sum();

        Self {
            total_segments: total,
            split_segments: output
                .display
                .iter()
                .filter(|s| s.source_lines.len() > 1 || s.translation_lines.len() > 1)
                .count(),
            low_confidence_segments: output
                .display
                .iter()
                .filter(|s| s.segment.confidence < 1.0)
                .count(),
            average_duration: if total > 0 { duration / total as f64 } else { 0.0 },
            dubbing_segments: output.dubbing.len(),
            skipped_segments: output.skipped.len(),
        }
    }
}

impl fmt::Display for SubtitleGenerationSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Segments:          {}", self.total_segments)?;
        writeln!(f, "Multi-line:        {}", self.split_segments)?;
        writeln!(f, "Low confidence:    {}", self.low_confidence_segments)?;
        writeln!(f, "Average duration:  {:.2}s", self.average_duration)?;
        writeln!(f, "Dubbing segments:  {}", self.dubbing_segments)?;
        write!(f, "Skipped:           {}", self.skipped_segments)
    }
}
