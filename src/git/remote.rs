//! Git remote operations.

use crate::{Error, Result};
use git2::build::CheckoutBuilder;
use git2::{Cred, CredentialType, FetchOptions, PushOptions, RemoteCallbacks, Repository};

/// Credential callbacks give up after this many rejected attempts.
const MAX_CREDENTIAL_ATTEMPTS: u8 = 3;

/// Credentials for talking to a remote.
///
/// SSH remotes authenticate through the running ssh-agent. HTTPS remotes
/// use the token when one is configured.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Token for HTTPS remotes.
    pub token: Option<String>,
}

/// What a pull did to the local branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// The remote has no such branch yet.
    NoUpstream,
    /// Nothing to do.
    UpToDate,
    /// The local branch moved forward.
    FastForwarded,
}

/// Manages fetch and push against one remote.
pub struct RemoteManager {
    remote_name: String,
    credentials: Credentials,
}

impl RemoteManager {
    /// Creates a manager for the named remote.
    #[must_use]
    pub fn new(remote_name: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            remote_name: remote_name.into(),
            credentials,
        }
    }

    /// Returns the remote name.
    #[must_use]
    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    /// Returns true if the repository has this remote.
    #[must_use]
    pub fn is_configured(&self, repo: &Repository) -> bool {
        repo.find_remote(&self.remote_name).is_ok()
    }

    /// Fetches the remote and fast-forwards `branch` to it.
    ///
    /// The checkout never overwrites local modifications.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Publish`] if the fetch fails, the local branch has
    /// diverged from the remote one, or an uncommitted local change is in
    /// the way of the update.
    pub fn pull(&self, repo: &Repository, branch: &str) -> Result<PullOutcome> {
        let mut remote = repo
            .find_remote(&self.remote_name)
            .map_err(|e| Error::publish("find_remote", e))?;

        let mut options = FetchOptions::new();
        options.remote_callbacks(self.callbacks());
        remote
            .fetch::<&str>(&[], Some(&mut options), None)
            .map_err(|e| Error::publish("git_fetch", e))?;

        let tracking = format!("refs/remotes/{}/{branch}", self.remote_name);
        let Ok(remote_ref) = repo.find_reference(&tracking) else {
            return Ok(PullOutcome::NoUpstream);
        };
        let target = repo
            .reference_to_annotated_commit(&remote_ref)
            .map_err(|e| Error::publish("resolve_upstream", e))?;

        let (analysis, _) = repo
            .merge_analysis(&[&target])
            .map_err(|e| Error::publish("merge_analysis", e))?;

        if analysis.is_up_to_date() {
            return Ok(PullOutcome::UpToDate);
        }

        let local_ref = format!("refs/heads/{branch}");
        let mut checkout = CheckoutBuilder::new();
        checkout.safe();

        if analysis.is_unborn() {
            repo.reference(&local_ref, target.id(), true, "sarathi: initial pull")
                .map_err(|e| Error::publish("create_branch", e))?;
            repo.set_head(&local_ref)
                .map_err(|e| Error::publish("set_head", e))?;
            repo.checkout_head(Some(&mut checkout))
                .map_err(|e| Error::publish("checkout", e))?;
            return Ok(PullOutcome::FastForwarded);
        }

        if !analysis.is_fast_forward() {
            return Err(Error::publish(
                "git_pull",
                format!("local branch '{branch}' has diverged from {tracking}"),
            ));
        }

        let commit = repo
            .find_object(target.id(), None)
            .map_err(|e| Error::publish("find_upstream_commit", e))?;
        repo.checkout_tree(&commit, Some(&mut checkout))
            .map_err(|e| Error::publish("checkout", e))?;
        repo.find_reference(&local_ref)
            .and_then(|mut reference| reference.set_target(target.id(), "sarathi: fast-forward"))
            .map_err(|e| Error::publish("fast_forward", e))?;
        repo.set_head(&local_ref)
            .map_err(|e| Error::publish("set_head", e))?;

        tracing::debug!(branch, remote = %self.remote_name, "Fast-forwarded");
        Ok(PullOutcome::FastForwarded)
    }

    /// Pushes `branch` to the same branch on the remote.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Publish`] if the push fails or the remote rejects it.
    pub fn push(&self, repo: &Repository, branch: &str) -> Result<()> {
        let mut remote = repo
            .find_remote(&self.remote_name)
            .map_err(|e| Error::publish("find_remote", e))?;

        let mut callbacks = self.callbacks();
        callbacks.push_update_reference(|refname, status| match status {
            Some(message) => Err(git2::Error::from_str(&format!(
                "{refname} rejected: {message}"
            ))),
            None => Ok(()),
        });

        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);

        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        remote
            .push(&[refspec.as_str()], Some(&mut options))
            .map_err(|e| Error::publish("git_push", e))
    }

    fn callbacks(&self) -> RemoteCallbacks<'static> {
        let token = self.credentials.token.clone();
        let mut attempts = 0u8;

        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |_url, username, allowed| {
            attempts += 1;
            if attempts > MAX_CREDENTIAL_ATTEMPTS {
                return Err(git2::Error::from_str("remote rejected the credentials"));
            }
            if allowed.contains(CredentialType::SSH_KEY) {
                return Cred::ssh_key_from_agent(username.unwrap_or("git"));
            }
            if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
                if let Some(token) = &token {
                    return Cred::userpass_plaintext(username.unwrap_or("x-access-token"), token);
                }
            }
            Cred::default()
        });
        callbacks
    }
}
