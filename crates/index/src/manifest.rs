use crate::areas::DocArea;
use crate::error::Result;
use crate::fingerprint::digest_file;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const MANIFEST_VERSION: &str = "1.0";
const MANIFEST_FILE_NAME: &str = "manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderManifestEntry {
    pub built_at_unix_ms: u64,
    /// Relative file path → content digest captured at last successful build.
    pub doc_hashes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderManifest {
    pub version: String,
    pub created_at_unix_ms: u64,
    pub updated_at_unix_ms: u64,
    #[serde(default)]
    pub folders: BTreeMap<String, FolderManifestEntry>,
}

impl FolderManifest {
    pub fn empty() -> Self {
        let now = unix_now_ms();
        Self {
            version: MANIFEST_VERSION.to_string(),
            created_at_unix_ms: now,
            updated_at_unix_ms: now,
            folders: BTreeMap::new(),
        }
    }

    pub fn record_build(&mut self, area: &str, doc_hashes: BTreeMap<String, String>) {
        self.folders.insert(
            area.to_string(),
            FolderManifestEntry {
                built_at_unix_ms: unix_now_ms(),
                doc_hashes,
            },
        );
    }
}

/// Persistence for the folder manifest under the index root.
pub struct ManifestStore {
    index_root: PathBuf,
}

impl ManifestStore {
    pub fn new(index_root: impl AsRef<Path>) -> Self {
        Self {
            index_root: index_root.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.index_root.join(MANIFEST_FILE_NAME)
    }

    /// Load the manifest. A missing file is the expected first-run state and
    /// a corrupt one degrades to "rebuild everything"; neither is an error.
    pub async fn load(&self) -> FolderManifest {
        let path = self.path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(_) => return FolderManifest::empty(),
        };
        match serde_json::from_slice(&bytes) {
            Ok(manifest) => manifest,
            Err(e) => {
                log::warn!(
                    "Corrupt folder manifest {}: {e}; treating as empty",
                    path.display()
                );
                FolderManifest::empty()
            }
        }
    }

    /// Save the manifest atomically, creating the index root if absent.
    pub async fn save(&self, manifest: &mut FolderManifest) -> Result<()> {
        manifest.updated_at_unix_ms = unix_now_ms();
        tokio::fs::create_dir_all(&self.index_root).await?;
        let bytes = serde_json::to_vec_pretty(&manifest)?;
        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// Digest every doc file in the area. Unreadable files are warned about and
/// left out of the map, which makes the area compare as stale rather than
/// silently unchanged.
pub async fn area_doc_hashes(docs_root: &Path, area: &DocArea) -> BTreeMap<String, String> {
    let mut hashes = BTreeMap::new();
    for rel in &area.files {
        match digest_file(docs_root.join(rel)).await {
            Ok(digest) => {
                hashes.insert(rel.to_string_lossy().to_string(), digest);
            }
            Err(e) => log::warn!("Could not hash {}: {e}", rel.display()),
        }
    }
    hashes
}

/// Staleness check: re-hash the area's current files and compare the map
/// exactly against the stored entry. Added, removed, or changed keys all
/// mark the area stale; an identical map marks it fresh.
pub async fn is_stale(docs_root: &Path, area: &DocArea, manifest: &FolderManifest) -> bool {
    let Some(entry) = manifest.folders.get(&area.name) else {
        return true;
    };
    let current = area_doc_hashes(docs_root, area).await;
    entry.doc_hashes != current
}

pub fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
