use docscout_index::{SummaryCache, SummaryManifest};
use docscout_vcs::{Result, Vcs, VcsError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const INDEX_COMMIT_MESSAGE: &str = "chore: update doc index cache [skip ci]";
const SUMMARY_COMMIT_MESSAGE: &str = "chore: update doc summary cache [skip ci]";

#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub remote: String,
    pub shared_branch: String,
    /// Index root, relative to the repository root.
    pub index_root: PathBuf,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            shared_branch: "main".to_string(),
            index_root: PathBuf::from(".doc-index"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Local branch was strictly ahead; the whole index root was pushed.
    Published,
    /// Diverged branch: only the named source files' summaries were pushed.
    SummariesOnly(Vec<String>),
    /// Nothing had changed locally.
    NothingToPublish,
    /// Publication was refused or failed; local cache state is unaffected.
    NotPublished,
}

/// Best-effort publication of locally rebuilt cache artifacts.
pub struct CachePublisher {
    vcs: Arc<dyn Vcs>,
    config: PublishConfig,
}

impl CachePublisher {
    pub fn new(vcs: Arc<dyn Vcs>, config: PublishConfig) -> Self {
        Self { vcs, config }
    }

    /// Publish whatever is safe to share. Never fails: any error along the
    /// way is logged and reported as [`PublishOutcome::NotPublished`].
    pub async fn publish(&self, summaries: &SummaryManifest) -> PublishOutcome {
        match self.try_publish(summaries).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("Cache publish failed: {e}; continuing without publishing");
                PublishOutcome::NotPublished
            }
        }
    }

    async fn try_publish(&self, summaries: &SummaryManifest) -> Result<PublishOutcome> {
        let remote_ref = format!("{}/{}", self.config.remote, self.config.shared_branch);
        if let Err(e) = self
            .vcs
            .fetch(&self.config.remote, &self.config.shared_branch)
            .await
        {
            log::warn!("Fetch of {remote_ref} failed: {e}; assessing with local view");
        }

        let Some(tip) = self.vcs.resolve_ref(&remote_ref).await? else {
            // No shared copy exists yet, so there is nothing to overwrite.
            log::info!("Remote branch {remote_ref} not found; publishing full index root");
            return self.publish_full().await;
        };

        let merge_base = self.vcs.merge_base("HEAD", &remote_ref).await?;
        if merge_base.as_deref() == Some(tip.as_str()) {
            log::debug!("Local branch is ahead of {remote_ref}");
            return self.publish_full().await;
        }

        log::info!("Local branch diverged from {remote_ref}; refusing to publish area indexes");
        self.publish_matching_summaries(&remote_ref, summaries)
            .await
    }

    async fn publish_full(&self) -> Result<PublishOutcome> {
        if !self.vcs.has_changes(&self.config.index_root).await? {
            log::debug!("Index root unchanged; nothing to publish");
            return Ok(PublishOutcome::NothingToPublish);
        }

        self.vcs.stage(&[self.config.index_root.as_path()]).await?;
        if !self.vcs.commit(INDEX_COMMIT_MESSAGE).await? {
            return Ok(PublishOutcome::NothingToPublish);
        }
        self.vcs
            .push(&self.config.remote, &self.config.shared_branch)
            .await?;
        log::info!("Published index root {}", self.config.index_root.display());
        Ok(PublishOutcome::Published)
    }

    /// A summary stays eligible on a diverged branch only when the file it
    /// summarizes is byte-identical on the shared branch, compared by
    /// content hash at the remote ref.
    async fn publish_matching_summaries(
        &self,
        remote_ref: &str,
        summaries: &SummaryManifest,
    ) -> Result<PublishOutcome> {
        let summaries_root = SummaryCache::summaries_root_for(&self.config.index_root);
        let mut eligible = Vec::new();
        let mut to_stage = Vec::new();

        for (source, entry) in &summaries.files {
            match self.vcs.hash_at_ref(remote_ref, source).await {
                Ok(Some(hash)) if hash == entry.digest => {
                    to_stage.push(summaries_root.join(&entry.artifact));
                    eligible.push(source.clone());
                }
                Ok(Some(_)) => {
                    log::debug!("Skipping summary of {source}: content differs on shared branch");
                }
                Ok(None) => {
                    log::debug!("Skipping summary of {source}: absent on shared branch");
                }
                Err(e) => {
                    log::warn!("Skipping summary of {source}: hash lookup failed ({e})");
                }
            }
        }

        if eligible.is_empty() {
            log::info!("No summaries eligible for publication on diverged branch");
            return Ok(PublishOutcome::NotPublished);
        }

        // The live manifest also names summaries of diverged sources. What
        // gets staged is the shared branch's manifest with only the eligible
        // entries merged in; the local file is put back afterwards.
        let manifest_path = SummaryCache::manifest_path_for(&self.config.index_root);
        let mut shared = self.shared_manifest(remote_ref, &manifest_path).await;
        for source in &eligible {
            if let Some(entry) = summaries.files.get(source) {
                shared.files.insert(source.clone(), entry.clone());
            }
        }

        let bytes = serde_json::to_vec_pretty(&shared)
            .map_err(|e| VcsError::Other(format!("serializing summary manifest: {e}")))?;
        let original = tokio::fs::read(&manifest_path).await.ok();
        if let Some(parent) = manifest_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&manifest_path, bytes).await?;
        to_stage.push(manifest_path.clone());

        let committed = self.stage_commit_push(&to_stage).await;

        match original {
            Some(bytes) => {
                if let Err(e) = tokio::fs::write(&manifest_path, bytes).await {
                    log::warn!("Could not restore local summary manifest: {e}");
                }
            }
            None => {
                if let Err(e) = tokio::fs::remove_file(&manifest_path).await {
                    log::warn!("Could not remove published summary manifest: {e}");
                }
            }
        }

        if !committed? {
            return Ok(PublishOutcome::NothingToPublish);
        }
        log::info!("Published {} summaries on diverged branch", eligible.len());
        Ok(PublishOutcome::SummariesOnly(eligible))
    }

    /// Summary manifest as it exists on the shared branch; missing or
    /// unreadable degrades to empty.
    async fn shared_manifest(&self, remote_ref: &str, manifest_path: &Path) -> SummaryManifest {
        let repo_path = manifest_path.to_string_lossy();
        match self.vcs.read_at_ref(remote_ref, &repo_path).await {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                log::warn!("Corrupt summary manifest at {remote_ref}: {e}; treating as empty");
                SummaryManifest::empty()
            }),
            Ok(None) => SummaryManifest::empty(),
            Err(e) => {
                log::warn!("Could not read summary manifest at {remote_ref}: {e}");
                SummaryManifest::empty()
            }
        }
    }

    async fn stage_commit_push(&self, to_stage: &[PathBuf]) -> Result<bool> {
        let paths: Vec<&Path> = to_stage.iter().map(PathBuf::as_path).collect();
        self.vcs.stage(&paths).await?;
        if !self.vcs.commit(SUMMARY_COMMIT_MESSAGE).await? {
            return Ok(false);
        }
        self.vcs
            .push(&self.config.remote, &self.config.shared_branch)
            .await?;
        Ok(true)
    }
}
