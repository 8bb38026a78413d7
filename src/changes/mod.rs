//! Change tracker: enumerates locally modified files and captures their
//! content and diff against the last commit.
//!
//! Version control is reached through the [`VersionControl`] trait so the
//! review pipeline can be driven by a scripted implementation in tests;
//! [`GitCli`] is the production backend.

pub mod git;
pub mod status;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ChangeKind, FileChange};

pub use git::{GitCli, find_repo_root};
pub use status::{Rename, StatusEntry, WorkingTreeStatus};

/// Errors from change enumeration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChangeError {
    #[error("no workspace folder is open")]
    NoWorkspace,

    #[error("not a git repository: {0}")]
    NotARepository(String),

    #[error("git is not available: {0}")]
    VcsUnavailable(String),

    #[error("{0}")]
    Git(String),
}

/// The version-control operations the tracker needs.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Whether `root` lies inside a working tree.
    async fn is_repository(&self, root: &Path) -> Result<bool, ChangeError>;

    /// Changed paths relative to `root`.
    async fn status(&self, root: &Path) -> Result<WorkingTreeStatus, ChangeError>;

    /// Content of `path` at HEAD.
    async fn show_head(&self, root: &Path, path: &str) -> Result<String, ChangeError>;

    /// Unified diff of `paths` against HEAD.
    async fn diff_head(&self, root: &Path, paths: &[&str]) -> Result<String, ChangeError>;
}

/// Produces the [`FileChange`] batch for one review cycle.
#[derive(Clone)]
pub struct ChangeTracker {
    root: Option<PathBuf>,
    vcs: Arc<dyn VersionControl>,
}

impl ChangeTracker {
    pub fn new(root: Option<PathBuf>, vcs: Arc<dyn VersionControl>) -> Self {
        Self { root, vcs }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Confirm there is a workspace and that it is under version control.
    pub async fn check_environment(&self) -> Result<&Path, ChangeError> {
        let root = self.root.as_deref().ok_or(ChangeError::NoWorkspace)?;
        if !self.vcs.is_repository(root).await? {
            return Err(ChangeError::NotARepository(root.display().to_string()));
        }
        Ok(root)
    }

    /// Enumerate changed files.
    ///
    /// With `only`, the batch is restricted to those paths (absolute, or
    /// relative to the workspace root). Files that cannot be read are
    /// skipped with a warning; the rest of the batch still goes through.
    pub async fn changed_files(
        &self,
        only: Option<&[PathBuf]>,
    ) -> Result<Vec<FileChange>, ChangeError> {
        let root = self.check_environment().await?;
        let status = self.vcs.status(root).await?;

        let wanted: Option<Vec<PathBuf>> =
            only.map(|paths| paths.iter().map(|p| root.join(p)).collect());

        let mut changes = Vec::new();
        for entry in status.entries() {
            let absolute_path = root.join(&entry.path);
            if let Some(wanted) = &wanted {
                if !wanted.iter().any(|w| w == &absolute_path) {
                    continue;
                }
            }

            let current_content = match tokio::fs::read_to_string(&absolute_path).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(path = %entry.path, error = %e, "skipping unreadable file");
                    continue;
                }
            };

            changes.push(self.capture(root, entry, absolute_path, current_content).await);
        }

        tracing::debug!(count = changes.len(), "collected changed files");
        Ok(changes)
    }

    async fn capture(
        &self,
        root: &Path,
        entry: StatusEntry,
        absolute_path: PathBuf,
        current_content: String,
    ) -> FileChange {
        if entry.kind == ChangeKind::Added {
            return FileChange {
                path: entry.path,
                absolute_path,
                prior_content: None,
                current_content,
                diff_text: String::new(),
                kind: entry.kind,
            };
        }

        let head_path = entry.original_path.as_deref().unwrap_or(&entry.path);
        let prior_content = match self.vcs.show_head(root, head_path).await {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::debug!(path = %head_path, error = %e, "no committed version");
                None
            }
        };

        let mut diff_paths = vec![entry.path.as_str()];
        if let Some(original) = entry.original_path.as_deref() {
            diff_paths.insert(0, original);
        }
        let diff_text = match self.vcs.diff_head(root, &diff_paths).await {
            Ok(diff) if !diff.trim().is_empty() => diff,
            Ok(_) => current_content.clone(),
            Err(e) => {
                tracing::debug!(path = %entry.path, error = %e, "diff failed, using full content");
                current_content.clone()
            }
        };

        FileChange {
            path: entry.path,
            absolute_path,
            prior_content,
            current_content,
            diff_text,
            kind: entry.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Scripted VCS: fixed status, HEAD blobs and diffs keyed by path.
    #[derive(Default)]
    struct FakeVcs {
        repo: bool,
        status: WorkingTreeStatus,
        heads: HashMap<String, String>,
        diffs: HashMap<String, String>,
    }

    #[async_trait]
    impl VersionControl for FakeVcs {
        async fn is_repository(&self, _root: &Path) -> Result<bool, ChangeError> {
            Ok(self.repo)
        }

        async fn status(&self, _root: &Path) -> Result<WorkingTreeStatus, ChangeError> {
            Ok(self.status.clone())
        }

        async fn show_head(&self, _root: &Path, path: &str) -> Result<String, ChangeError> {
            self.heads
                .get(path)
                .cloned()
                .ok_or_else(|| ChangeError::Git(format!("no blob for {path}")))
        }

        async fn diff_head(&self, _root: &Path, paths: &[&str]) -> Result<String, ChangeError> {
            let key = paths.join(" ");
            self.diffs
                .get(&key)
                .cloned()
                .ok_or_else(|| ChangeError::Git(format!("no diff for {key}")))
        }
    }

    fn tracker(root: &Path, vcs: FakeVcs) -> ChangeTracker {
        ChangeTracker::new(Some(root.to_path_buf()), Arc::new(vcs))
    }

    #[tokio::test]
    async fn no_workspace_is_reported() {
        let tracker = ChangeTracker::new(None, Arc::new(FakeVcs::default()));
        assert_eq!(
            tracker.changed_files(None).await.unwrap_err(),
            ChangeError::NoWorkspace
        );
    }

    #[tokio::test]
    async fn non_repository_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = tracker(dir.path(), FakeVcs::default())
            .changed_files(None)
            .await
            .unwrap_err();
        assert!(matches!(err, ChangeError::NotARepository(_)));
    }

    #[tokio::test]
    async fn captures_content_and_diff_per_kind() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "let a = 2;\n").unwrap();
        std::fs::write(dir.path().join("b.ts"), "new file\n").unwrap();

        let vcs = FakeVcs {
            repo: true,
            status: WorkingTreeStatus {
                modified: vec!["a.ts".into()],
                untracked: vec!["b.ts".into()],
                ..Default::default()
            },
            heads: HashMap::from([("a.ts".into(), "let a = 1;\n".into())]),
            diffs: HashMap::from([(
                "a.ts".into(),
                "@@ -1 +1 @@\n-let a = 1;\n+let a = 2;\n".into(),
            )]),
        };

        let changes = tracker(dir.path(), vcs).changed_files(None).await.unwrap();
        assert_eq!(changes.len(), 2);

        let a = &changes[0];
        assert_eq!(a.kind, ChangeKind::Modified);
        assert_eq!(a.prior_content.as_deref(), Some("let a = 1;\n"));
        assert!(a.diff_text.contains("+let a = 2;"));
        assert_eq!(a.absolute_path, dir.path().join("a.ts"));

        let b = &changes[1];
        assert_eq!(b.kind, ChangeKind::Added);
        assert!(b.prior_content.is_none());
        assert!(b.diff_text.is_empty());
    }

    #[tokio::test]
    async fn failed_or_empty_diff_falls_back_to_full_content() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "body a\n").unwrap();
        std::fs::write(dir.path().join("b.ts"), "body b\n").unwrap();

        let vcs = FakeVcs {
            repo: true,
            status: WorkingTreeStatus {
                modified: vec!["a.ts".into(), "b.ts".into()],
                ..Default::default()
            },
            diffs: HashMap::from([("b.ts".into(), "  \n".into())]),
            ..Default::default()
        };

        let changes = tracker(dir.path(), vcs).changed_files(None).await.unwrap();
        assert_eq!(changes[0].diff_text, "body a\n");
        assert!(changes[0].prior_content.is_none());
        assert_eq!(changes[1].diff_text, "body b\n");
    }

    #[tokio::test]
    async fn unreadable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ok.ts"), "ok\n").unwrap();

        let vcs = FakeVcs {
            repo: true,
            status: WorkingTreeStatus {
                untracked: vec!["gone.ts".into(), "ok.ts".into()],
                ..Default::default()
            },
            ..Default::default()
        };

        let changes = tracker(dir.path(), vcs).changed_files(None).await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "ok.ts");
    }

    #[tokio::test]
    async fn rename_reads_head_side_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("new.ts"), "x\n").unwrap();

        let vcs = FakeVcs {
            repo: true,
            status: WorkingTreeStatus {
                renamed: vec![Rename {
                    from: "old.ts".into(),
                    to: "new.ts".into(),
                }],
                ..Default::default()
            },
            heads: HashMap::from([("old.ts".into(), "x\n".into())]),
            diffs: HashMap::from([(
                "old.ts new.ts".into(),
                "rename from old.ts\nrename to new.ts\n".into(),
            )]),
        };

        let changes = tracker(dir.path(), vcs).changed_files(None).await.unwrap();
        assert_eq!(changes[0].kind, ChangeKind::Renamed);
        assert_eq!(changes[0].prior_content.as_deref(), Some("x\n"));
        assert!(changes[0].diff_text.contains("rename to new.ts"));
    }

    #[tokio::test]
    async fn filter_restricts_batch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "a\n").unwrap();
        std::fs::write(dir.path().join("b.ts"), "b\n").unwrap();

        let vcs = FakeVcs {
            repo: true,
            status: WorkingTreeStatus {
                untracked: vec!["a.ts".into(), "b.ts".into()],
                ..Default::default()
            },
            ..Default::default()
        };

        let only = vec![dir.path().join("b.ts")];
        let changes = tracker(dir.path(), vcs)
            .changed_files(Some(&only))
            .await
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "b.ts");
    }

    #[tokio::test]
    async fn git_backed_tracker_end_to_end() {
        let dir = git::tests::init_repo().await;
        let p = dir.path();
        tokio::fs::write(p.join("file.txt"), "hello\nworld\n").await.unwrap();

        let tracker = ChangeTracker::new(Some(p.to_path_buf()), Arc::new(GitCli::new()));
        let changes = tracker.changed_files(None).await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Modified);
        assert_eq!(changes[0].prior_content.as_deref(), Some("hello\n"));
        assert!(changes[0].diff_text.contains("+world"));
    }
}
