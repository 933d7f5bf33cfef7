//! In-memory [`Vcs`](crate::Vcs) for exercising orchestration and
//! publication logic without a git binary.

use crate::error::{Result, VcsError};
use crate::Vcs;
use async_trait::async_trait;
use docscout_index::digest_bytes;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Default)]
struct State {
    refs: HashMap<String, String>,
    merge_bases: HashMap<(String, String), String>,
    blob_hashes: HashMap<(String, String), String>,
    blobs: HashMap<(String, String), Vec<u8>>,
    diffs: HashMap<(String, String), (String, Vec<String>)>,
    dirty_paths: HashSet<PathBuf>,
    staged: Vec<PathBuf>,
    // Working-tree content captured when a path is staged; survives commits
    // so tests can assert on what was actually committed.
    stage_snapshots: HashMap<PathBuf, Vec<u8>>,
    commits: Vec<String>,
    pushes: Vec<(String, String)>,
    fetches: Vec<(String, String)>,
    fail_push: bool,
}

#[derive(Default)]
pub struct FakeVcs {
    state: Mutex<State>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_ref(&self, refname: &str, commit: &str) {
        self.lock()
            .refs
            .insert(refname.to_string(), commit.to_string());
    }

    pub fn set_merge_base(&self, a: &str, b: &str, base: &str) {
        self.lock()
            .merge_bases
            .insert((a.to_string(), b.to_string()), base.to_string());
    }

    pub fn set_blob_hash(&self, refname: &str, path: &str, hash: &str) {
        self.lock()
            .blob_hashes
            .insert((refname.to_string(), path.to_string()), hash.to_string());
    }

    /// Script a file's byte content at a ref; `hash_at_ref` digests it unless
    /// an explicit hash was scripted for the same key.
    pub fn set_blob(&self, refname: &str, path: &str, bytes: &[u8]) {
        self.lock()
            .blobs
            .insert((refname.to_string(), path.to_string()), bytes.to_vec());
    }

    pub fn set_diff(&self, base: &str, head: &str, text: &str, changed: &[&str]) {
        self.lock().diffs.insert(
            (base.to_string(), head.to_string()),
            (
                text.to_string(),
                changed.iter().map(|s| s.to_string()).collect(),
            ),
        );
    }

    pub fn mark_dirty(&self, path: impl AsRef<Path>) {
        self.lock().dirty_paths.insert(path.as_ref().to_path_buf());
    }

    pub fn fail_push(&self) {
        self.lock().fail_push = true;
    }

    pub fn staged_paths(&self) -> Vec<PathBuf> {
        self.lock().staged.clone()
    }

    /// Content a path held when it was staged, if the file existed on disk.
    pub fn staged_snapshot(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock().stage_snapshots.get(path.as_ref()).cloned()
    }

    pub fn commit_messages(&self) -> Vec<String> {
        self.lock().commits.clone()
    }

    pub fn pushes(&self) -> Vec<(String, String)> {
        self.lock().pushes.clone()
    }

    pub fn fetches(&self) -> Vec<(String, String)> {
        self.lock().fetches.clone()
    }
}

#[async_trait]
impl Vcs for FakeVcs {
    async fn hash_at_ref(&self, refname: &str, path: &str) -> Result<Option<String>> {
        let state = self.lock();
        let key = (refname.to_string(), path.to_string());
        if let Some(hash) = state.blob_hashes.get(&key) {
            return Ok(Some(hash.clone()));
        }
        Ok(state.blobs.get(&key).map(|bytes| digest_bytes(bytes)))
    }

    async fn read_at_ref(&self, refname: &str, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .lock()
            .blobs
            .get(&(refname.to_string(), path.to_string()))
            .cloned())
    }

    async fn changed_files(&self, base: &str, head: &str) -> Result<Vec<String>> {
        Ok(self
            .lock()
            .diffs
            .get(&(base.to_string(), head.to_string()))
            .map(|(_, files)| files.clone())
            .unwrap_or_default())
    }

    async fn diff(&self, base: &str, head: &str) -> Result<String> {
        Ok(self
            .lock()
            .diffs
            .get(&(base.to_string(), head.to_string()))
            .map(|(text, _)| text.clone())
            .unwrap_or_default())
    }

    async fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>> {
        let state = self.lock();
        let forward = state.merge_bases.get(&(a.to_string(), b.to_string()));
        let backward = state.merge_bases.get(&(b.to_string(), a.to_string()));
        Ok(forward.or(backward).cloned())
    }

    async fn resolve_ref(&self, refname: &str) -> Result<Option<String>> {
        Ok(self.lock().refs.get(refname).cloned())
    }

    async fn fetch(&self, remote: &str, refname: &str) -> Result<()> {
        self.lock()
            .fetches
            .push((remote.to_string(), refname.to_string()));
        Ok(())
    }

    async fn has_changes(&self, path: &Path) -> Result<bool> {
        let state = self.lock();
        Ok(state
            .dirty_paths
            .iter()
            .any(|dirty| dirty.starts_with(path) || path.starts_with(dirty)))
    }

    async fn stage(&self, paths: &[&Path]) -> Result<()> {
        let mut state = self.lock();
        for path in paths {
            if let Ok(bytes) = std::fs::read(path) {
                state.stage_snapshots.insert(path.to_path_buf(), bytes);
            }
            state.staged.push(path.to_path_buf());
        }
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<bool> {
        let mut state = self.lock();
        if state.staged.is_empty() {
            return Ok(false);
        }
        state.commits.push(message.to_string());
        state.staged.clear();
        Ok(true)
    }

    async fn push(&self, remote: &str, branch: &str) -> Result<()> {
        let mut state = self.lock();
        if state.fail_push {
            return Err(VcsError::Other("push rejected".to_string()));
        }
        state.pushes.push((remote.to_string(), branch.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn diff_since_merge_base_uses_configured_base() {
        let fake = FakeVcs::new();
        fake.set_merge_base("origin/main", "HEAD", "abc");
        fake.set_diff("abc", "HEAD", "diff text", &["src/lib.rs"]);

        let vcs: &dyn Vcs = &fake;
        let diff = vcs.diff_since_merge_base("origin/main").await.unwrap();
        assert_eq!(diff.text, "diff text");
        assert_eq!(diff.changed_files, vec!["src/lib.rs".to_string()]);
    }

    #[tokio::test]
    async fn commit_with_nothing_staged_is_a_noop() {
        let fake = FakeVcs::new();
        assert!(!fake.commit("msg").await.unwrap());
        fake.stage(&[Path::new("a")]).await.unwrap();
        assert!(fake.commit("msg").await.unwrap());
        assert_eq!(fake.commit_messages(), vec!["msg".to_string()]);
    }
}
