/*!
 * Gap optimization.
 *
 * Adjusts segment timing after display splitting. Start times come from
 * alignment and are never moved; only end times change:
 *
 * - gaps shorter than `min_gap_secs` are closed by extending the earlier end
 * - segments shorter than `min_duration_secs` grow into the following gap,
 *   never past the next start
 * - overlaps left by alignment are clamped so each end is at most the next start
 *
 * Segments over `max_duration_secs` are only counted. Capping them would
 * corrupt dubbing timing.
 */

use log::debug;
use serde::Serialize;

use crate::segment::FinalSegment;
use crate::timeline::TIME_EPSILON;

/// Settings for the gap optimizer
#[derive(Debug, Clone)]
pub struct GapConfig {
    pub min_gap_secs: f64,
    pub min_duration_secs: f64,
    pub max_duration_secs: f64,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            min_gap_secs: 0.3,
            min_duration_secs: 1.0,
            max_duration_secs: 6.0,
        }
    }
}

/// What the optimizer changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GapReport {
    /// Gaps closed by extending the earlier segment
    pub closed_gaps: usize,
    /// Short segments extended toward the minimum duration
    pub extended: usize,
    /// Overlaps clamped to the next start
    pub clamped_overlaps: usize,
    /// Segments longer than the maximum duration, left as they are
    pub overlong: usize,
}

#[derive(Debug, Clone, Default)]
pub struct GapOptimizer {
    config: GapConfig,
}

impl GapOptimizer {
    pub fn new(config: GapConfig) -> Self {
        Self { config }
    }

    /// Return a re-timed copy of `segments`.
    ///
    /// `timeline_end` bounds how far the last segment may be extended.
    pub fn optimize(&self, segments: &[FinalSegment], timeline_end: f64) -> (Vec<FinalSegment>, GapReport) {
        let mut result = segments.to_vec();
        let mut report = GapReport::default();

        for i in 0..result.len() {
            let next_start = result.get(i + 1).map(|s| s.start());
            let limit = next_start.unwrap_or_else(|| timeline_end.max(result[i].end()));
            let segment = &mut result[i].segment;

            if let Some(next_start) = next_start {
                let gap = next_start - segment.end;
                if gap < -TIME_EPSILON {
                    // Alignment overlap, never cut below the start
                    segment.end = next_start.max(segment.start);
                    report.clamped_overlaps += 1;
                } else if gap > TIME_EPSILON && gap < self.config.min_gap_secs {
                    segment.end = next_start;
                    report.closed_gaps += 1;
                }
            }

            if segment.duration() + TIME_EPSILON < self.config.min_duration_secs && segment.end < limit {
                segment.end = (segment.start + self.config.min_duration_secs).min(limit);
                report.extended += 1;
            }

            if segment.duration() > self.config.max_duration_secs + TIME_EPSILON {
                report.overlong += 1;
            }
        }

        debug!(
            "Gap optimization: {} gaps closed, {} extended, {} overlaps clamped, {} over max duration",
            report.closed_gaps, report.extended, report.clamped_overlaps, report.overlong
        );
        (result, report)
    }
}
