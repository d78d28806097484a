//! Content hashing of build contexts from committed git trees

use crate::{DragError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Abbreviation length requested from git, keeps image tags readable
pub const SUBTREE_HASH_LEN: usize = 30;

/// Produces a short, deterministic identifier for committed content at a path
#[async_trait]
pub trait ContentHasher: Send + Sync {
    /// Hash of `path` (relative to the project working directory) at HEAD
    async fn hash(&self, path: &Path) -> Result<String>;
}

/// Hashes a directory as the git tree object it has in `HEAD`
pub struct GitSubtreeHasher {
    git: PathBuf,
    working_dir: PathBuf,
}

impl GitSubtreeHasher {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self::with_binary("git", working_dir)
    }

    pub fn with_binary(git: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            git: git.into(),
            working_dir: working_dir.into(),
        }
    }
}

#[async_trait]
impl ContentHasher for GitSubtreeHasher {
    async fn hash(&self, path: &Path) -> Result<String> {
        let unavailable = || DragError::HashUnavailable {
            path: path.display().to_string(),
        };

        // `HEAD:./<path>` resolves against the current directory, not the repo root
        let rev = format!("HEAD:./{}", path.display());
        let output = Command::new(&self.git)
            .current_dir(&self.working_dir)
            .arg("rev-parse")
            .arg(format!("--short={}", SUBTREE_HASH_LEN))
            .arg(&rev)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|e| {
                debug!("Failed to run {}: {}", self.git.display(), e);
                unavailable()
            })?;

        if !output.status.success() {
            debug!(
                "git rev-parse {} failed: {}",
                rev,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(unavailable());
        }

        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if hash.is_empty() {
            return Err(unavailable());
        }
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) -> bool {
        std::process::Command::new("git")
            .current_dir(dir)
            .args(["-c", "user.name=drag", "-c", "user.email=drag@example.com"])
            .args(args)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Temp repo with one committed `web/` directory, `None` without git
    fn repo() -> Option<TempDir> {
        let tmp = TempDir::new().unwrap();
        if !git(tmp.path(), &["init", "-q"]) {
            return None;
        }
        fs::create_dir_all(tmp.path().join("web")).unwrap();
        fs::write(tmp.path().join("web/Dockerfile"), "FROM alpine\n").unwrap();
        assert!(git(tmp.path(), &["add", "."]));
        assert!(git(tmp.path(), &["commit", "-q", "-m", "init"]));
        Some(tmp)
    }

    #[tokio::test]
    async fn test_hash_is_deterministic() {
        let Some(tmp) = repo() else { return };
        let hasher = GitSubtreeHasher::new(tmp.path());

        let first = hasher.hash(Path::new("web")).await.unwrap();
        let second = hasher.hash(Path::new("web")).await.unwrap();
        assert_eq!(first, second);
        assert!(first.len() >= SUBTREE_HASH_LEN);
    }

    #[tokio::test]
    async fn test_hash_ignores_uncommitted_changes() {
        let Some(tmp) = repo() else { return };
        let hasher = GitSubtreeHasher::new(tmp.path());

        let before = hasher.hash(Path::new("web")).await.unwrap();
        fs::write(tmp.path().join("web/Dockerfile"), "FROM debian\n").unwrap();
        assert_eq!(hasher.hash(Path::new("web")).await.unwrap(), before);

        assert!(git(tmp.path(), &["commit", "-q", "-am", "change"]));
        assert_ne!(hasher.hash(Path::new("web")).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_hash_relative_to_working_dir() {
        let Some(tmp) = repo() else { return };
        let from_root = GitSubtreeHasher::new(tmp.path())
            .hash(Path::new("web"))
            .await
            .unwrap();
        let from_sub = GitSubtreeHasher::new(tmp.path().join("web"))
            .hash(Path::new(""))
            .await
            .unwrap();
        assert_eq!(from_root, from_sub);
    }

    #[tokio::test]
    async fn test_hash_of_sibling_directory() {
        let Some(tmp) = repo() else { return };
        fs::create_dir_all(tmp.path().join("app")).unwrap();
        let from_root = GitSubtreeHasher::new(tmp.path())
            .hash(Path::new("web"))
            .await
            .unwrap();
        let from_sibling = GitSubtreeHasher::new(tmp.path().join("app"))
            .hash(Path::new("../web"))
            .await
            .unwrap();
        assert_eq!(from_root, from_sibling);
    }

    #[tokio::test]
    async fn test_untracked_path_is_unavailable() {
        let Some(tmp) = repo() else { return };
        fs::create_dir_all(tmp.path().join("scratch")).unwrap();
        let err = GitSubtreeHasher::new(tmp.path())
            .hash(Path::new("scratch"))
            .await
            .unwrap_err();
        assert!(matches!(err, DragError::HashUnavailable { ref path } if path == "scratch"));
    }

    #[tokio::test]
    async fn test_missing_git_binary() {
        let tmp = TempDir::new().unwrap();
        let hasher = GitSubtreeHasher::with_binary("/nonexistent/git", tmp.path());
        assert!(matches!(
            hasher.hash(Path::new("web")).await,
            Err(DragError::HashUnavailable { .. })
        ));
    }
}
