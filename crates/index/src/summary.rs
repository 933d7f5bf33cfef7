use crate::error::Result;
use crate::fingerprint::digest_bytes;
use crate::manifest::unix_now_ms;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const SUMMARIES_DIR_NAME: &str = "summaries";
const SUMMARY_MANIFEST_FILE_NAME: &str = "manifest.json";
const SUMMARY_FILE_SUFFIX: &str = ".summary.md";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryManifestEntry {
    /// Source file digest at summarization time.
    pub digest: String,
    /// Artifact file name under the summaries directory.
    pub artifact: String,
    pub generated_at_unix_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryManifest {
    pub version: String,
    /// Source file path → cache entry.
    #[serde(default)]
    pub files: BTreeMap<String, SummaryManifestEntry>,
}

impl SummaryManifest {
    pub fn empty() -> Self {
        Self {
            version: crate::manifest::MANIFEST_VERSION.to_string(),
            files: BTreeMap::new(),
        }
    }
}

/// Digest-validated cache of generated file summaries.
///
/// Summary generation runs concurrently across files, so the manifest's
/// read-modify-write region sits behind a single mutex; generation itself
/// happens outside the lock.
pub struct SummaryCache {
    summaries_root: PathBuf,
    state: Mutex<SummaryManifest>,
}

impl SummaryCache {
    pub fn summaries_root_for(index_root: &Path) -> PathBuf {
        index_root.join(SUMMARIES_DIR_NAME)
    }

    pub fn manifest_path_for(index_root: &Path) -> PathBuf {
        Self::summaries_root_for(index_root).join(SUMMARY_MANIFEST_FILE_NAME)
    }

    /// Open the cache under the given index root, loading the manifest if
    /// one exists. A corrupt manifest degrades to empty (rebuild
    /// everything) rather than failing.
    pub async fn open(index_root: &Path) -> Self {
        let summaries_root = Self::summaries_root_for(index_root);
        let manifest_path = summaries_root.join(SUMMARY_MANIFEST_FILE_NAME);
        let manifest = match tokio::fs::read(&manifest_path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(manifest) => manifest,
                Err(e) => {
                    log::warn!(
                        "Corrupt summary manifest {}: {e}; treating as empty",
                        manifest_path.display()
                    );
                    SummaryManifest::empty()
                }
            },
            Err(_) => SummaryManifest::empty(),
        };
        Self {
            summaries_root,
            state: Mutex::new(manifest),
        }
    }

    pub fn summaries_root(&self) -> &Path {
        &self.summaries_root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.summaries_root.join(SUMMARY_MANIFEST_FILE_NAME)
    }

    pub fn artifact_path(&self, artifact: &str) -> PathBuf {
        self.summaries_root.join(artifact)
    }

    /// Current manifest contents, for the publisher's per-file safety check.
    pub async fn snapshot(&self) -> SummaryManifest {
        self.state.lock().await.clone()
    }

    /// Return the cached summary when the file's digest is unchanged;
    /// otherwise invoke `generate`, persist the artifact, and update the
    /// manifest entry.
    pub async fn get_or_generate<F, Fut>(
        &self,
        rel_path: &str,
        content: &str,
        generate: F,
    ) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let digest = digest_bytes(content.as_bytes());

        {
            let state = self.state.lock().await;
            if let Some(entry) = state.files.get(rel_path) {
                if entry.digest == digest {
                    let path = self.artifact_path(&entry.artifact);
                    match tokio::fs::read_to_string(&path).await {
                        Ok(summary) => return Ok(summary),
                        Err(e) => {
                            log::warn!(
                                "Summary artifact {} missing ({e}); regenerating",
                                path.display()
                            );
                        }
                    }
                }
            }
        }

        log::info!("Generating summary for {rel_path}");
        let summary = generate().await?;

        let artifact = artifact_name(rel_path);
        let mut state = self.state.lock().await;
        tokio::fs::create_dir_all(&self.summaries_root).await?;

        let path = self.artifact_path(&artifact);
        let tmp = path.with_extension("md.tmp");
        tokio::fs::write(&tmp, &summary).await?;
        tokio::fs::rename(&tmp, &path).await?;

        state.files.insert(
            rel_path.to_string(),
            SummaryManifestEntry {
                digest,
                artifact,
                generated_at_unix_ms: unix_now_ms(),
            },
        );
        self.save_locked(&state).await?;

        Ok(summary)
    }

    async fn save_locked(&self, manifest: &SummaryManifest) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(manifest)?;
        let path = self.manifest_path();
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

fn artifact_name(rel_path: &str) -> String {
    let flattened: String = rel_path
        .chars()
        .map(|ch| match ch {
            '/' | '\\' => '-',
            ch => ch,
        })
        .collect();
    format!("{flattened}{SUMMARY_FILE_SUFFIX}")
}
