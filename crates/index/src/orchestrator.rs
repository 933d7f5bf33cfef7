use crate::areas::{AreaScanner, DocArea};
use crate::builder::IndexBuilder;
use crate::error::Result;
use crate::manifest::{area_doc_hashes, is_stale, FolderManifest, ManifestStore};
use crate::store::IndexStore;
use docscout_oracle::{Oracle, RetryPolicy};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

/// Per-area outcome of one build cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaStatus {
    /// Digest map unchanged; no oracle call made.
    Fresh,
    Built,
    /// No readable source files; not retried eagerly.
    Empty,
    Failed,
}

impl AreaStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AreaStatus::Fresh => "fresh",
            AreaStatus::Built => "built",
            AreaStatus::Empty => "empty",
            AreaStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Default)]
pub struct BuildReport {
    pub statuses: BTreeMap<String, AreaStatus>,
}

impl BuildReport {
    pub fn count(&self, status: AreaStatus) -> usize {
        self.statuses.values().filter(|s| **s == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(AreaStatus::Failed) > 0
    }
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Worker pool width; sized for the oracle's rate limits, not local CPU.
    pub workers: usize,
    /// Rebuild every area regardless of staleness.
    pub force: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            force: false,
        }
    }
}

/// Decides the minimal set of stale areas, rebuilds them across a bounded
/// worker pool, and commits results into the folder manifest.
///
/// Manifest mutation is serialized through a single mutex; the manifest file
/// itself is written once, after all workers finish.
pub struct BuildOrchestrator {
    docs_root: PathBuf,
    index_root: PathBuf,
    oracle: Arc<dyn Oracle>,
    retry: RetryPolicy,
    config: BuildConfig,
}

impl BuildOrchestrator {
    pub fn new(
        docs_root: impl AsRef<Path>,
        index_root: impl AsRef<Path>,
        oracle: Arc<dyn Oracle>,
        config: BuildConfig,
    ) -> Self {
        Self {
            docs_root: docs_root.as_ref().to_path_buf(),
            index_root: index_root.as_ref().to_path_buf(),
            oracle,
            retry: RetryPolicy::oracle_default(),
            config,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn index_dir_name(&self) -> String {
        self.index_root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| ".doc-index".to_string())
    }

    /// Run one build cycle and return the per-area status report.
    pub async fn run(&self) -> Result<BuildReport> {
        let scanner = AreaScanner::new(&self.docs_root, self.index_dir_name());
        let manifest_store = ManifestStore::new(&self.index_root);
        let manifest = manifest_store.load().await;

        let mut report = BuildReport::default();
        let mut to_build: Vec<DocArea> = Vec::new();

        for area in scanner.scan() {
            if self.config.force || is_stale(&self.docs_root, &area, &manifest).await {
                to_build.push(area);
            } else {
                log::info!("Skipping {} (no changes)", area.name);
                report.statuses.insert(area.name.clone(), AreaStatus::Fresh);
            }
        }

        if to_build.is_empty() {
            log::info!("All indexes are up to date");
            return Ok(report);
        }

        log::info!(
            "Building indexes for {} areas: {:?}",
            to_build.len(),
            to_build.iter().map(|a| a.name.as_str()).collect::<Vec<_>>()
        );

        let manifest = Arc::new(Mutex::new(manifest));
        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let builder = Arc::new(IndexBuilder::new(
            self.oracle.clone(),
            self.retry,
            self.docs_root.clone(),
        ));
        let index_store = Arc::new(IndexStore::new(&self.index_root));

        let mut tasks = JoinSet::new();
        for area in to_build {
            let semaphore = semaphore.clone();
            let builder = builder.clone();
            let index_store = index_store.clone();
            let manifest = manifest.clone();
            let docs_root = self.docs_root.clone();

            tasks.spawn(async move {
                // The semaphore is never closed; acquire failures are not expected.
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .unwrap_or_else(|_| unreachable!("build semaphore closed"));
                let status = build_one(&builder, &index_store, &manifest, &docs_root, &area).await;
                (area.name, status)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, status)) => {
                    report.statuses.insert(name, status);
                }
                Err(e) => log::warn!("Build task panicked: {e}"),
            }
        }

        let mut manifest = manifest.lock().await.clone();
        manifest_store.save(&mut manifest).await?;

        Ok(report)
    }
}

async fn build_one(
    builder: &IndexBuilder,
    index_store: &IndexStore,
    manifest: &Mutex<FolderManifest>,
    docs_root: &Path,
    area: &DocArea,
) -> AreaStatus {
    match builder.build(area).await {
        Ok(Some(content)) => {
            if let Err(e) = index_store.save(&area.name, &content).await {
                log::warn!("Failed to persist index for {}: {e}", area.name);
                return AreaStatus::Failed;
            }
            let hashes = area_doc_hashes(docs_root, area).await;
            manifest.lock().await.record_build(&area.name, hashes);
            log::info!("Built index for {}", area.name);
            AreaStatus::Built
        }
        Ok(None) => {
            log::warn!("No readable content for {}", area.name);
            AreaStatus::Empty
        }
        Err(e) => {
            // Manifest entry left untouched so the area is retried as stale
            // on the next run.
            log::warn!("Failed to build index for {}: {e}", area.name);
            AreaStatus::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscout_oracle::StubOracle;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::tempdir;

    fn instant_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(0))
    }

    async fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        tokio::fs::create_dir_all(path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(path, content).await.unwrap();
    }

    fn orchestrator(
        docs_root: &Path,
        oracle: Arc<StubOracle>,
        force: bool,
    ) -> BuildOrchestrator {
        let config = BuildConfig {
            workers: 2,
            force,
        };
        BuildOrchestrator::new(docs_root, docs_root.join(".doc-index"), oracle, config)
            .with_retry(instant_retry())
    }

    #[tokio::test]
    async fn first_run_builds_then_second_run_is_fresh() {
        let temp = tempdir().unwrap();
        write(temp.path(), "guides/a.md", "alpha").await;
        write(temp.path(), "guides/b.md", "bravo").await;

        let oracle = Arc::new(StubOracle::scripted(["# GUIDES index"]));
        let report = orchestrator(temp.path(), oracle.clone(), false)
            .run()
            .await
            .unwrap();
        assert_eq!(report.statuses.get("guides"), Some(&AreaStatus::Built));
        assert_eq!(oracle.calls(), 1);

        let manifest = ManifestStore::new(temp.path().join(".doc-index"))
            .load()
            .await;
        let entry = manifest.folders.get("guides").expect("manifest entry");
        assert_eq!(entry.doc_hashes.len(), 2);

        let index = IndexStore::new(temp.path().join(".doc-index"))
            .load("guides")
            .await
            .unwrap();
        assert_eq!(index.as_deref(), Some("# GUIDES index"));

        // Unchanged files: zero oracle calls on the rerun.
        let second = Arc::new(StubOracle::new());
        let report = orchestrator(temp.path(), second.clone(), false)
            .run()
            .await
            .unwrap();
        assert_eq!(report.statuses.get("guides"), Some(&AreaStatus::Fresh));
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn force_rebuilds_fresh_areas() {
        let temp = tempdir().unwrap();
        write(temp.path(), "guides/a.md", "alpha").await;

        let oracle = Arc::new(StubOracle::scripted(["v1"]));
        orchestrator(temp.path(), oracle, false).run().await.unwrap();

        let forced = Arc::new(StubOracle::scripted(["v2"]));
        let report = orchestrator(temp.path(), forced.clone(), true)
            .run()
            .await
            .unwrap();
        assert_eq!(report.statuses.get("guides"), Some(&AreaStatus::Built));
        assert_eq!(forced.calls(), 1);
    }

    #[tokio::test]
    async fn changed_file_marks_area_stale() {
        let temp = tempdir().unwrap();
        write(temp.path(), "guides/a.md", "alpha").await;

        let oracle = Arc::new(StubOracle::scripted(["v1"]));
        orchestrator(temp.path(), oracle, false).run().await.unwrap();

        write(temp.path(), "guides/a.md", "alpha changed").await;
        let second = Arc::new(StubOracle::scripted(["v2"]));
        let report = orchestrator(temp.path(), second.clone(), false)
            .run()
            .await
            .unwrap();
        assert_eq!(report.statuses.get("guides"), Some(&AreaStatus::Built));
        assert_eq!(second.calls(), 1);
    }

    #[tokio::test]
    async fn failed_area_leaves_manifest_untouched_and_retries_next_run() {
        let temp = tempdir().unwrap();
        write(temp.path(), "guides/a.md", "alpha").await;
        write(temp.path(), "reference/api.md", "api").await;

        // Areas build in name order within the stub script only when
        // workers=1; pin the pool width so the script lines up.
        let oracle = Arc::new(StubOracle::new());
        oracle.push_response(Ok("guides index".to_string()));
        oracle.push_response(Err(docscout_oracle::OracleError::Fatal("boom".into())));
        let config = BuildConfig {
            workers: 1,
            force: false,
        };
        let report =
            BuildOrchestrator::new(temp.path(), temp.path().join(".doc-index"), oracle, config)
                .with_retry(instant_retry())
                .run()
                .await
                .unwrap();

        assert_eq!(report.statuses.get("guides"), Some(&AreaStatus::Built));
        assert_eq!(report.statuses.get("reference"), Some(&AreaStatus::Failed));
        assert!(report.has_failures());

        let manifest = ManifestStore::new(temp.path().join(".doc-index"))
            .load()
            .await;
        assert!(manifest.folders.contains_key("guides"));
        assert!(!manifest.folders.contains_key("reference"));

        // The failed area is stale again on the next run; the built one is not.
        let second = Arc::new(StubOracle::scripted(["reference index"]));
        let report = orchestrator(temp.path(), second.clone(), false)
            .run()
            .await
            .unwrap();
        assert_eq!(report.statuses.get("guides"), Some(&AreaStatus::Fresh));
        assert_eq!(report.statuses.get("reference"), Some(&AreaStatus::Built));
        assert_eq!(second.calls(), 1);
    }

    #[tokio::test]
    async fn builds_multiple_areas_in_parallel() {
        let temp = tempdir().unwrap();
        write(temp.path(), "guides/a.md", "alpha").await;
        write(temp.path(), "reference/api.md", "api").await;
        write(temp.path(), "tutorials/intro.md", "intro").await;

        let oracle = Arc::new(StubOracle::scripted(["i1", "i2", "i3"]));
        let report = orchestrator(temp.path(), oracle.clone(), false)
            .run()
            .await
            .unwrap();

        assert_eq!(report.count(AreaStatus::Built), 3);
        assert_eq!(oracle.calls(), 3);
    }
}
