use crate::preview::FilePreview;
use crate::verdict::{dedup_preserving_order, filter_to_offered};
use docscout_index::DOC_EXTENSIONS;
use docscout_oracle::{parse, prompt, Oracle, OracleError, RetryPolicy};
use std::sync::Arc;

/// Verdict the oracle may return to request an exhaustive scan.
const SCAN_ALL_TOKEN: &str = "*";

/// Result of the area-level matching stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Areas judged relevant; may legitimately be empty.
    Areas(Vec<String>),
    /// No usable indexes (or the oracle asked for everything): the caller
    /// must fall back to an exhaustive scan rather than assume "nothing
    /// relevant".
    ScanAll,
}

#[derive(Debug, Clone, Copy)]
pub struct MatcherConfig {
    /// Area indexes per stage-1 prompt.
    pub area_batch_size: usize,
    /// File previews per stage-2 prompt.
    pub file_batch_size: usize,
    /// Diff length cap applied to every prompt.
    pub max_diff_chars: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            area_batch_size: 5,
            file_batch_size: 10,
            max_diff_chars: 10_000,
        }
    }
}

/// Batched, two-stage relevance matcher over the built indexes.
///
/// Batches are evaluated sequentially; they are independent and read-only,
/// so the order of evaluation does not affect the aggregated verdict.
pub struct RelevanceMatcher {
    oracle: Arc<dyn Oracle>,
    retry: RetryPolicy,
    config: MatcherConfig,
}

impl RelevanceMatcher {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            retry: RetryPolicy::oracle_default(),
            config: MatcherConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Stage 1: which documentation areas does the diff plausibly touch?
    pub async fn find_relevant_areas(
        &self,
        diff: &str,
        indexes: &[(String, String)],
    ) -> MatchOutcome {
        if indexes.is_empty() {
            log::info!("No indexes found, falling back to full scan");
            return MatchOutcome::ScanAll;
        }

        let diff = truncate_chars(diff, self.config.max_diff_chars);
        let mut relevant = Vec::new();

        let total = indexes.len().div_ceil(self.config.area_batch_size.max(1));
        for (batch_num, batch) in indexes.chunks(self.config.area_batch_size.max(1)).enumerate() {
            log::debug!(
                "Matching areas, batch {}/{total} ({} indexes)",
                batch_num + 1,
                batch.len()
            );
            let prompt = prompt::area_match_prompt(diff, batch);
            let label = format!("area match batch {}", batch_num + 1);
            let Some(verdicts) = self.match_batch(&prompt, &label).await else {
                continue;
            };

            if verdicts.iter().any(|v| v == SCAN_ALL_TOKEN) {
                log::info!("Oracle requested full scan");
                return MatchOutcome::ScanAll;
            }

            let offered: Vec<String> = batch.iter().map(|(name, _)| name.clone()).collect();
            relevant.extend(filter_to_offered(verdicts, &offered));
        }

        MatchOutcome::Areas(dedup_preserving_order(relevant))
    }

    /// Stage 2: which individual files does the diff plausibly touch?
    pub async fn find_relevant_files(&self, diff: &str, previews: &[FilePreview]) -> Vec<String> {
        let diff = truncate_chars(diff, self.config.max_diff_chars);
        let mut relevant = Vec::new();

        let total = previews.len().div_ceil(self.config.file_batch_size.max(1));
        for (batch_num, batch) in previews.chunks(self.config.file_batch_size.max(1)).enumerate()
        {
            log::debug!(
                "Matching files, batch {}/{total} ({} files)",
                batch_num + 1,
                batch.len()
            );
            let rendered: Vec<(String, String)> = batch
                .iter()
                .map(|p| (p.path.clone(), p.preview.clone()))
                .collect();
            let prompt = prompt::file_match_prompt(diff, &rendered);
            let label = format!("file match batch {}", batch_num + 1);
            let Some(verdicts) = self.match_batch(&prompt, &label).await else {
                continue;
            };

            let offered: Vec<String> = batch.iter().map(|p| p.path.clone()).collect();
            let contained = filter_to_offered(verdicts, &offered);
            relevant.extend(contained.into_iter().filter(|path| is_doc_path(path)));
        }

        dedup_preserving_order(relevant)
    }

    /// Evaluate one batch, retrying transient and malformed responses.
    /// `None` means the batch exhausted its retries and contributes no
    /// verdicts; it never aborts the overall match.
    async fn match_batch(&self, prompt: &str, label: &str) -> Option<Vec<String>> {
        let outcome = self
            .retry
            .run(
                label,
                || async {
                    let text = self.oracle.generate(prompt).await?;
                    parse::parse_name_array(&text)
                },
                OracleError::is_transient,
            )
            .await;

        match outcome {
            Ok(verdicts) => Some(verdicts),
            Err(e) => {
                log::warn!("{label}: no verdicts after retries ({e})");
                None
            }
        }
    }
}

fn is_doc_path(path: &str) -> bool {
    DOC_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(&format!(".{ext}")))
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
