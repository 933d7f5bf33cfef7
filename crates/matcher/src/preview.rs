use docscout_index::SummaryCache;
use docscout_oracle::{prompt, Oracle, OracleError, RetryPolicy};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// One stage-2 candidate: a doc file path and the text the oracle will see
/// for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePreview {
    pub path: String,
    pub preview: String,
}

#[derive(Debug, Clone, Copy)]
pub struct PreviewConfig {
    /// Files longer than this many lines are summarized instead of inlined.
    pub long_file_lines: usize,
    /// Worker pool width for concurrent summary generation.
    pub workers: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            long_file_lines: 300,
            workers: 5,
        }
    }
}

/// Assemble previews for the stage-2 candidate files: full content for short
/// files, cached or freshly generated summaries for long ones.
///
/// Summary generation runs across files concurrently; the summary cache
/// serializes its own manifest updates. Unreadable files are warned about
/// and skipped. Results preserve the input file order.
pub async fn build_previews(
    docs_root: &Path,
    files: &[PathBuf],
    cache: Arc<SummaryCache>,
    oracle: Arc<dyn Oracle>,
    retry: RetryPolicy,
    config: PreviewConfig,
) -> Vec<FilePreview> {
    let semaphore = Arc::new(Semaphore::new(config.workers.max(1)));
    let mut tasks = JoinSet::new();

    for (position, rel) in files.iter().enumerate() {
        let semaphore = semaphore.clone();
        let cache = cache.clone();
        let oracle = oracle.clone();
        let docs_root = docs_root.to_path_buf();
        let rel = rel.clone();

        tasks.spawn(async move {
            // The semaphore is never closed; acquire failures are not expected.
            let _permit = semaphore
                .acquire_owned()
                .await
                .unwrap_or_else(|_| unreachable!("preview semaphore closed"));
            let preview =
                preview_one(&docs_root, &rel, &cache, oracle.as_ref(), retry, config).await;
            (position, preview)
        });
    }

    let mut indexed: Vec<(usize, FilePreview)> = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((position, Some(preview))) => indexed.push((position, preview)),
            Ok((_, None)) => {}
            Err(e) => log::warn!("Preview task panicked: {e}"),
        }
    }

    indexed.sort_by_key(|(position, _)| *position);
    indexed.into_iter().map(|(_, preview)| preview).collect()
}

async fn preview_one(
    docs_root: &Path,
    rel: &Path,
    cache: &SummaryCache,
    oracle: &dyn Oracle,
    retry: RetryPolicy,
    config: PreviewConfig,
) -> Option<FilePreview> {
    let rel_str = rel.to_string_lossy().to_string();
    let content = match tokio::fs::read_to_string(docs_root.join(rel)).await {
        Ok(content) => content,
        Err(e) => {
            log::warn!("Skipping file {rel_str}: {e}");
            return None;
        }
    };

    let line_count = content.lines().count();
    if line_count <= config.long_file_lines {
        log::debug!("Processed {rel_str}: {line_count} lines (full content)");
        return Some(FilePreview {
            path: rel_str,
            preview: content,
        });
    }

    let summary_prompt = prompt::file_summary_prompt(&rel_str, &content);
    let label = format!("summary {rel_str}");
    let generated = cache
        .get_or_generate(&rel_str, &content, || async {
            let text = retry
                .run(
                    &label,
                    || oracle.generate(&summary_prompt),
                    OracleError::is_transient,
                )
                .await?;
            Ok(text)
        })
        .await;

    let preview = match generated {
        Ok(summary) => {
            log::debug!("Processed {rel_str}: {line_count} lines (summary)");
            summary
        }
        Err(e) => {
            // Degrade to a head-of-file preview rather than dropping the
            // candidate entirely.
            log::warn!("Could not summarize {rel_str}: {e}; using truncated content");
            head_lines(&content, config.long_file_lines)
        }
    };

    Some(FilePreview {
        path: rel_str,
        preview,
    })
}

fn head_lines(content: &str, max_lines: usize) -> String {
    content
        .lines()
        .take(max_lines)
        .collect::<Vec<_>>()
        .join("\n")
}
