/*!
 * Sentence segmentation.
 *
 * - `annotator`: clause-boundary judgements used by the rules
 * - `rules`: multi-pass punctuation and clause splitter
 * - `oracle`: semantic split capability and its LLM implementation
 * - `hybrid`: hard-cap enforcement combining rules, oracle and fallback
 */

pub mod annotator;
pub mod hybrid;
pub mod oracle;
pub mod rules;

pub use annotator::{ClauseAnnotator, HeuristicAnnotator, NullAnnotator};
pub use hybrid::{HybridConfig, HybridSegmenter, SegmenterStats};
pub use oracle::{LlmSplitOracle, NoopOracle, SemanticSplitOracle, SplitSuggestion};
pub use rules::{Boundary, BoundaryCandidates, BoundaryTier, RuleSplitter, RuleSplitterConfig};
