use crate::areas::DocArea;
use crate::error::Result;
use docscout_oracle::{prompt, Oracle, OracleError, RetryPolicy};
use std::path::PathBuf;
use std::sync::Arc;

const TRUNCATION_MARKER: &str = "\n\n[... truncated for length ...]";

/// Length caps applied before handing area content to the oracle.
#[derive(Debug, Clone, Copy)]
pub struct BuilderLimits {
    /// Cap on a file's content when read from disk.
    pub max_file_chars: usize,
    /// Cap per file inside the prompt body.
    pub prompt_file_chars: usize,
}

impl Default for BuilderLimits {
    fn default() -> Self {
        Self {
            max_file_chars: 15_000,
            prompt_file_chars: 5_000,
        }
    }
}

/// Builds the semantic index document for one documentation area by asking
/// the oracle to analyze the area's (capped) file contents.
pub struct IndexBuilder {
    oracle: Arc<dyn Oracle>,
    retry: RetryPolicy,
    docs_root: PathBuf,
    limits: BuilderLimits,
}

impl IndexBuilder {
    pub fn new(oracle: Arc<dyn Oracle>, retry: RetryPolicy, docs_root: impl Into<PathBuf>) -> Self {
        Self {
            oracle,
            retry,
            docs_root: docs_root.into(),
            limits: BuilderLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: BuilderLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Build the index for one area. `Ok(None)` means the area had no
    /// readable files ("empty"), which is distinct from failure.
    pub async fn build(&self, area: &DocArea) -> Result<Option<String>> {
        let mut files = Vec::new();
        for rel in &area.files {
            let path = self.docs_root.join(rel);
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    let capped = cap_content(&content, self.limits.max_file_chars);
                    files.push((rel.to_string_lossy().to_string(), capped));
                }
                Err(e) => log::warn!("Could not read {}: {e}", rel.display()),
            }
        }

        if files.is_empty() {
            return Ok(None);
        }

        let prompt_files: Vec<(String, String)> = files
            .into_iter()
            .map(|(path, content)| {
                let body = truncate_chars(&content, self.limits.prompt_file_chars).to_string();
                (path, body)
            })
            .collect();
        let prompt = prompt::area_index_prompt(&area.name, &prompt_files);

        let label = format!("index build {}", area.name);
        let text = self
            .retry
            .run(&label, || self.oracle.generate(&prompt), OracleError::is_transient)
            .await?;

        Ok(Some(text))
    }
}

fn cap_content(content: &str, max_chars: usize) -> String {
    let truncated = truncate_chars(content, max_chars);
    if truncated.len() == content.len() {
        content.to_string()
    } else {
        format!("{truncated}{TRUNCATION_MARKER}")
    }
}

/// Truncate at a char boundary after at most `max_chars` characters.
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscout_oracle::StubOracle;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;

    fn instant_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(0))
    }

    fn area(name: &str, files: &[&str]) -> DocArea {
        DocArea {
            name: name.to_string(),
            files: files.iter().map(PathBuf::from).collect(),
        }
    }

    async fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        tokio::fs::create_dir_all(path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn builds_index_from_readable_files() {
        let temp = tempdir().unwrap();
        write(temp.path(), "guides/a.md", "alpha content").await;

        let oracle = Arc::new(StubOracle::scripted(["# GUIDES index"]));
        let builder = IndexBuilder::new(oracle.clone(), instant_retry(), temp.path());

        let out = builder.build(&area("guides", &["guides/a.md"])).await.unwrap();
        assert_eq!(out.as_deref(), Some("# GUIDES index"));
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn area_without_readable_files_is_empty_not_error() {
        let temp = tempdir().unwrap();
        let oracle = Arc::new(StubOracle::new());
        let builder = IndexBuilder::new(oracle.clone(), instant_retry(), temp.path());

        let out = builder
            .build(&area("guides", &["guides/missing.md"]))
            .await
            .unwrap();
        assert_eq!(out, None);
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let temp = tempdir().unwrap();
        write(temp.path(), "guides/a.md", "alpha").await;

        let oracle = Arc::new(StubOracle::new());
        oracle.push_response(Err(docscout_oracle::OracleError::RateLimited("429".into())));
        oracle.push_response(Ok("recovered index".to_string()));

        let builder = IndexBuilder::new(oracle.clone(), instant_retry(), temp.path());
        let out = builder.build(&area("guides", &["guides/a.md"])).await.unwrap();
        assert_eq!(out.as_deref(), Some("recovered index"));
        assert_eq!(oracle.calls(), 2);
    }

    #[tokio::test]
    async fn fatal_failure_surfaces_as_error() {
        let temp = tempdir().unwrap();
        write(temp.path(), "guides/a.md", "alpha").await;

        let oracle = Arc::new(StubOracle::new());
        oracle.push_response(Err(docscout_oracle::OracleError::Fatal("bad".into())));

        let builder = IndexBuilder::new(oracle.clone(), instant_retry(), temp.path());
        assert!(builder.build(&area("guides", &["guides/a.md"])).await.is_err());
        assert_eq!(oracle.calls(), 1);
    }

    #[test]
    fn long_content_is_capped_with_marker() {
        let long = "x".repeat(20);
        let capped = cap_content(&long, 10);
        assert!(capped.starts_with("xxxxxxxxxx"));
        assert!(capped.ends_with(TRUNCATION_MARKER));
        assert_eq!(cap_content("short", 10), "short");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab", 5), "ab");
    }
}
