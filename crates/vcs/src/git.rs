use crate::error::{Result, VcsError};
use crate::scrub::Scrubber;
use crate::Vcs;
use async_trait::async_trait;
use docscout_index::digest_bytes;
use std::path::{Path, PathBuf};
use std::process::Output;

/// Git-subprocess implementation of [`Vcs`].
pub struct GitVcs {
    root: PathBuf,
    scrubber: Scrubber,
}

impl GitVcs {
    pub fn new(root: impl AsRef<Path>, scrubber: Scrubber) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            scrubber,
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        let output = tokio::process::Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(args)
            .output()
            .await?;
        Ok(output)
    }

    /// Run a command that must succeed; returns trimmed stdout.
    async fn run_ok(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args).await?;
        if !output.status.success() {
            return Err(self.command_failed(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn command_failed(&self, args: &[&str], output: &Output) -> VcsError {
        let stderr = String::from_utf8_lossy(&output.stderr);
        VcsError::CommandFailed {
            command: args.join(" "),
            status: output.status.to_string(),
            stderr: self.scrubber.scrub(stderr.trim()),
        }
    }
}

#[async_trait]
impl Vcs for GitVcs {
    async fn hash_at_ref(&self, refname: &str, path: &str) -> Result<Option<String>> {
        Ok(self
            .read_at_ref(refname, path)
            .await?
            .map(|bytes| digest_bytes(&bytes)))
    }

    async fn read_at_ref(&self, refname: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let spec = format!("{refname}:{path}");
        let output = self.run(&["show", &spec]).await?;
        if !output.status.success() {
            // Path absent at that ref; not an error for callers.
            return Ok(None);
        }
        Ok(Some(output.stdout))
    }

    async fn changed_files(&self, base: &str, head: &str) -> Result<Vec<String>> {
        let range = format!("{base}...{head}");
        let stdout = self.run_ok(&["diff", "--name-only", &range]).await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    async fn diff(&self, base: &str, head: &str) -> Result<String> {
        let range = format!("{base}...{head}");
        self.run_ok(&["diff", &range]).await
    }

    async fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>> {
        let output = self.run(&["merge-base", a, b]).await?;
        if !output.status.success() {
            return Ok(None);
        }
        let base = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!base.is_empty()).then_some(base))
    }

    async fn resolve_ref(&self, refname: &str) -> Result<Option<String>> {
        let output = self.run(&["rev-parse", "--verify", refname]).await?;
        if !output.status.success() {
            return Ok(None);
        }
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!id.is_empty()).then_some(id))
    }

    async fn fetch(&self, remote: &str, refname: &str) -> Result<()> {
        self.run_ok(&["fetch", remote, refname]).await?;
        Ok(())
    }

    async fn has_changes(&self, path: &Path) -> Result<bool> {
        let path = path.to_string_lossy();
        let stdout = self
            .run_ok(&["status", "--porcelain", "--", path.as_ref()])
            .await?;
        Ok(!stdout.is_empty())
    }

    async fn stage(&self, paths: &[&Path]) -> Result<()> {
        let mut args = vec!["add", "--"];
        let rendered: Vec<String> = paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        args.extend(rendered.iter().map(String::as_str));
        self.run_ok(&args).await?;
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<bool> {
        let output = self.run(&["commit", "-m", message]).await?;
        if output.status.success() {
            return Ok(true);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stdout.contains("nothing to commit") || stderr.contains("nothing to commit") {
            return Ok(false);
        }
        Err(self.command_failed(&["commit"], &output))
    }

    async fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.run_ok(&["push", remote, branch]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vcs;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    async fn init_repo(dir: &Path) -> GitVcs {
        let vcs = GitVcs::new(dir, Scrubber::default());
        vcs.run_ok(&["init", "-b", "main"]).await.expect("git init");
        vcs.run_ok(&["config", "user.email", "test@example.com"])
            .await
            .expect("config email");
        vcs.run_ok(&["config", "user.name", "Test"])
            .await
            .expect("config name");
        vcs
    }

    async fn commit_file(vcs: &GitVcs, dir: &Path, name: &str, content: &str) -> String {
        tokio::fs::write(dir.join(name), content)
            .await
            .expect("write file");
        vcs.stage(&[Path::new(name)]).await.expect("stage");
        assert!(vcs.commit("test commit").await.expect("commit"));
        vcs.resolve_ref("HEAD")
            .await
            .expect("rev-parse")
            .expect("head exists")
    }

    #[tokio::test]
    async fn hash_at_ref_matches_content_digest() {
        let dir = TempDir::new().expect("tempdir");
        let vcs = init_repo(dir.path()).await;
        commit_file(&vcs, dir.path(), "doc.md", "hello docs\n").await;

        let hash = vcs
            .hash_at_ref("HEAD", "doc.md")
            .await
            .expect("hash_at_ref")
            .expect("present");
        assert_eq!(hash, digest_bytes(b"hello docs\n"));

        let content = vcs
            .read_at_ref("HEAD", "doc.md")
            .await
            .expect("read_at_ref")
            .expect("present");
        assert_eq!(content, b"hello docs\n");

        let missing = vcs.hash_at_ref("HEAD", "nope.md").await.expect("missing");
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn changed_files_and_merge_base() {
        let dir = TempDir::new().expect("tempdir");
        let vcs = init_repo(dir.path()).await;
        let c1 = commit_file(&vcs, dir.path(), "a.md", "alpha\n").await;
        let c2 = commit_file(&vcs, dir.path(), "b.md", "bravo\n").await;

        let changed = vcs.changed_files(&c1, &c2).await.expect("changed files");
        assert_eq!(changed, vec!["b.md".to_string()]);

        let base = vcs.merge_base(&c1, &c2).await.expect("merge-base");
        assert_eq!(base, Some(c1));
    }

    #[tokio::test]
    async fn commit_without_changes_returns_false() {
        let dir = TempDir::new().expect("tempdir");
        let vcs = init_repo(dir.path()).await;
        commit_file(&vcs, dir.path(), "a.md", "alpha\n").await;

        assert!(!vcs.commit("empty").await.expect("no-op commit"));
    }

    #[tokio::test]
    async fn has_changes_sees_dirty_path() {
        let dir = TempDir::new().expect("tempdir");
        let vcs = init_repo(dir.path()).await;
        commit_file(&vcs, dir.path(), "a.md", "alpha\n").await;

        assert!(!vcs.has_changes(Path::new("a.md")).await.expect("clean"));
        tokio::fs::write(dir.path().join("a.md"), "alpha2\n")
            .await
            .expect("modify");
        assert!(vcs.has_changes(Path::new("a.md")).await.expect("dirty"));
    }
}
