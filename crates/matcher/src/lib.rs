//! # Doc Scout Matcher
//!
//! Two-stage relevance matching between a code diff and the built
//! documentation indexes.
//!
//! Stage 1 narrows the diff to documentation *areas* by batching area
//! indexes into bounded prompts; stage 2 narrows further to individual
//! *files* using per-file previews (full text for short files, cached
//! summaries for long ones). Both stages share the same defenses: verdicts
//! are filtered to the names actually offered in each batch, batches that
//! exhaust their retries contribute nothing instead of failing the match,
//! and aggregated verdicts are deduplicated in first-seen order.

mod matcher;
mod preview;
mod verdict;

pub use matcher::{MatchOutcome, MatcherConfig, RelevanceMatcher};
pub use preview::{build_previews, FilePreview, PreviewConfig};
pub use verdict::{dedup_preserving_order, filter_to_offered};
