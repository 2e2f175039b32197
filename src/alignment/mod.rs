/*!
 * Alignment of text segments onto the word timeline.
 */

pub mod aligner;
pub mod fuzzy;

pub use aligner::{AlignerConfig, AlignmentCursor, AlignmentReport, TimestampAligner};
pub use fuzzy::FuzzyMatcher;
