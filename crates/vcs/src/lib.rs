//! # Doc Scout VCS
//!
//! Narrow version-control interface consumed by the cache subsystem: hash a
//! file's content at a ref, list changed files, compute diffs and merge
//! bases, and stage/commit/push cache artifacts.
//!
//! The [`Vcs`] trait exists so the orchestration and publication logic can
//! be tested against [`fake::FakeVcs`] without invoking a real git binary.
//! All subprocess output surfaced in logs or errors is scrubbed of
//! configured secrets first.

mod error;
pub mod fake;
mod git;
mod scrub;

pub use error::{Result, VcsError};
pub use git::GitVcs;
pub use scrub::Scrubber;

use async_trait::async_trait;
use std::path::Path;

/// Diff of the working branch against a base ref, as used by the matcher.
#[derive(Debug, Clone, Default)]
pub struct BranchDiff {
    /// Full textual diff.
    pub text: String,
    /// Names of changed files, repo-relative.
    pub changed_files: Vec<String>,
}

#[async_trait]
pub trait Vcs: Send + Sync {
    /// SHA-256 of a file's byte content at the given ref, or `None` when the
    /// path does not exist there.
    async fn hash_at_ref(&self, refname: &str, path: &str) -> Result<Option<String>>;

    /// Raw byte content of a file at the given ref, or `None` when the path
    /// does not exist there.
    async fn read_at_ref(&self, refname: &str, path: &str) -> Result<Option<Vec<u8>>>;

    /// Changed file names between two refs.
    async fn changed_files(&self, base: &str, head: &str) -> Result<Vec<String>>;

    /// Full textual diff between two refs.
    async fn diff(&self, base: &str, head: &str) -> Result<String>;

    /// Merge base of two refs, or `None` when there is no common ancestor.
    async fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>>;

    /// Commit id a ref points at, or `None` when the ref is unknown.
    async fn resolve_ref(&self, refname: &str) -> Result<Option<String>>;

    async fn fetch(&self, remote: &str, refname: &str) -> Result<()>;

    /// Whether the given path has uncommitted changes.
    async fn has_changes(&self, path: &Path) -> Result<bool>;

    async fn stage(&self, paths: &[&Path]) -> Result<()>;

    /// Commit staged changes; `false` when there was nothing to commit.
    async fn commit(&self, message: &str) -> Result<bool>;

    async fn push(&self, remote: &str, branch: &str) -> Result<()>;
}

impl dyn Vcs {
    /// Diff of HEAD against the merge base with `base_ref`, falling back to
    /// a direct two-ref diff when no merge base can be computed.
    pub async fn diff_since_merge_base(&self, base_ref: &str) -> Result<BranchDiff> {
        let base = match self.merge_base(base_ref, "HEAD").await? {
            Some(merge_base) => {
                log::debug!("using merge-base {merge_base} for diff against {base_ref}");
                merge_base
            }
            None => {
                log::warn!("no merge-base with {base_ref}, using direct diff");
                base_ref.to_string()
            }
        };

        let text = self.diff(&base, "HEAD").await?;
        let changed_files = self.changed_files(&base, "HEAD").await?;
        Ok(BranchDiff {
            text,
            changed_files,
        })
    }
}
