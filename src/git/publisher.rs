//! Git-backed publisher.

use super::remote::{Credentials, RemoteManager};
use super::{PublishReport, Publisher};
use crate::config::{GitSettings, normalize_lexically};
use crate::{Error, Result};
use git2::{ErrorCode, Repository, Signature};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Commits published files to the blog's work tree and pushes them.
///
/// [`Publisher::sync`] fast-forwards the work tree from the remote, so the
/// store is read at the remote's state. Each publish then commits the
/// already written file as `"<path> updated by sarathi-bot."` and pushes.
/// An unchanged file produces no commit. Without the configured remote,
/// commits stay local.
pub struct GitPublisher {
    repo_path: PathBuf,
    remote: RemoteManager,
}

impl GitPublisher {
    /// Creates a publisher for the work tree at `repo_path`.
    #[must_use]
    pub fn new(repo_path: impl AsRef<Path>, settings: &GitSettings) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
            remote: RemoteManager::new(
                settings.remote.clone(),
                Credentials {
                    token: settings.token.clone(),
                },
            ),
        }
    }

    /// Returns the work tree path.
    #[must_use]
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    fn open_repo(&self) -> Result<Repository> {
        Repository::open(&self.repo_path).map_err(|e| Error::publish("open_repository", e))
    }

    fn relative_path(repo: &Repository, path: &Path) -> Result<PathBuf> {
        let workdir = repo
            .workdir()
            .ok_or_else(|| Error::publish("open_work_tree", "repository is bare"))?;
        let workdir = normalize_lexically(workdir);
        normalize_lexically(path)
            .strip_prefix(&workdir)
            .map(Path::to_path_buf)
            .map_err(|_| {
                Error::publish(
                    "stage_file",
                    format!("{} is outside the work tree {}", path.display(), workdir.display()),
                )
            })
    }

    fn commit_file(repo: &Repository, relative: &Path) -> Result<Option<git2::Oid>> {
        let mut index = repo.index().map_err(|e| Error::publish("open_index", e))?;
        index
            .add_path(relative)
            .map_err(|e| Error::publish("stage_file", e))?;
        index.write().map_err(|e| Error::publish("write_index", e))?;
        let tree_id = index
            .write_tree()
            .map_err(|e| Error::publish("write_tree", e))?;

        let parent = match repo.head() {
            Ok(head) => Some(
                head.peel_to_commit()
                    .map_err(|e| Error::publish("peel_to_commit", e))?,
            ),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(e) => return Err(Error::publish("get_head", e)),
        };

        if parent.as_ref().is_some_and(|p| p.tree_id() == tree_id) {
            return Ok(None);
        }

        let tree = repo
            .find_tree(tree_id)
            .map_err(|e| Error::publish("find_tree", e))?;
        let sig = signature(repo)?;
        let message = format!("{} updated by sarathi-bot.", relative.display());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = repo
            .commit(Some("HEAD"), &sig, &sig, &message, &tree, &parents)
            .map_err(|e| Error::publish("create_commit", e))?;
        Ok(Some(oid))
    }
}

impl Publisher for GitPublisher {
    #[instrument(skip(self), fields(operation = "git.sync"))]
    fn sync(&self) -> Result<()> {
        let repo = self.open_repo()?;
        let branch = current_branch(&repo)?;

        let result = if self.remote.is_configured(&repo) {
            self.remote.pull(&repo, &branch).map(|outcome| {
                tracing::debug!(?outcome, branch, "Pulled before reading");
            })
        } else {
            tracing::warn!(
                remote = self.remote.remote_name(),
                "Remote not configured, working from the local copy"
            );
            Ok(())
        };

        metrics::counter!(
            "til_sync_total",
            "status" => if result.is_ok() { "success" } else { "error" }
        )
        .increment(1);
        result
    }

    #[instrument(skip(self, _content), fields(operation = "git.publish", path = %path.display()))]
    fn publish(&self, path: &Path, _content: &str) -> Result<PublishReport> {
        let result = self.publish_inner(path);

        let target = path
            .file_name()
            .map_or_else(String::new, |name| name.to_string_lossy().into_owned());
        metrics::counter!(
            "til_publish_total",
            "target" => target,
            "status" => if result.is_ok() { "success" } else { "error" }
        )
        .increment(1);

        result
    }
}

impl GitPublisher {
    fn publish_inner(&self, path: &Path) -> Result<PublishReport> {
        let repo = self.open_repo()?;
        let relative = Self::relative_path(&repo, path)?;
        let branch = current_branch(&repo)?;
        let has_remote = self.remote.is_configured(&repo);

        let commit = Self::commit_file(&repo, &relative)?;
        match commit {
            Some(oid) => tracing::info!(commit = %oid, path = %relative.display(), "Committed"),
            None => tracing::debug!(path = %relative.display(), "No changes to commit"),
        }

        let head_exists = repo.head().is_ok();
        let pushed = has_remote && head_exists;
        if pushed {
            self.remote.push(&repo, &branch)?;
            tracing::info!(remote = self.remote.remote_name(), branch, "Pushed");
        }

        Ok(PublishReport {
            path: relative,
            committed: commit.is_some(),
            commit: commit.map(|oid| oid.to_string()),
            pushed,
        })
    }
}

fn signature(repo: &Repository) -> Result<Signature<'static>> {
    repo.signature().or_else(|_| {
        Signature::now("sarathi-bot", "sarathi-bot@localhost")
            .map_err(|e| Error::publish("create_signature", e))
    })
}

/// Name of the branch HEAD points at, even before its first commit.
fn current_branch(repo: &Repository) -> Result<String> {
    let head = repo
        .find_reference("HEAD")
        .map_err(|e| Error::publish("get_head", e))?;
    let target = head
        .symbolic_target()
        .ok_or_else(|| Error::publish("current_branch", "HEAD is detached"))?;
    Ok(target.strip_prefix("refs/heads/").unwrap_or(target).to_string())
}
