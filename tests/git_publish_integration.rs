//! Git publishing integration tests.
//!
//! Runs `til add` against a blog clone that shares a bare remote with a
//! second clone, the way the blog's owner edits it from another machine:
//! - Edits pushed elsewhere survive the bot's next change
//! - A local edit in the way of an update aborts the change

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::NaiveDate;
use git2::{Repository, Signature};
use sarathi::config::GitSettings;
use sarathi::fetch::TitleFetcher;
use sarathi::git::{GitPublisher, NoopPublisher, Publisher};
use sarathi::storage::to_json;
use sarathi::{AddRequest, EntryStore, Error, JsonFileStore, TilEntry, TilService};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

struct NoTitle;

impl TitleFetcher for NoTitle {
    fn fetch_title(&self, _url: &str) -> Option<String> {
        None
    }
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn entry(value: &str, added_on: &str) -> TilEntry {
    TilEntry::new(value, Vec::<String>::new(), date(added_on))
}

/// A bare remote plus the bot's clone of it, seeded with one entry.
struct Remote {
    bare: TempDir,
    bot: TempDir,
    branch: String,
}

impl Remote {
    fn seeded(entries: &[TilEntry]) -> Self {
        let bare = TempDir::new().unwrap();
        Repository::init_bare(bare.path()).unwrap();

        let bot = TempDir::new().unwrap();
        let repo = Repository::init(bot.path()).unwrap();
        {
            let sig = Signature::now("test", "test@test.com").unwrap();
            let tree_id = repo.index().unwrap().write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
                .unwrap();
        }
        repo.remote("origin", bare.path().to_str().unwrap()).unwrap();
        let branch = repo.head().unwrap().shorthand().unwrap().to_string();

        let remote = Self { bare, bot, branch };
        let path = remote.bot_store();
        fs::write(&path, to_json(entries).unwrap()).unwrap();
        remote.bot_publisher().publish(&path, "").unwrap();
        remote
    }

    fn bot_store(&self) -> PathBuf {
        self.bot.path().join("til.json")
    }

    fn bot_publisher(&self) -> GitPublisher {
        GitPublisher::new(self.bot.path(), &GitSettings::default())
    }

    fn bot_service(&self) -> TilService {
        let publisher: Arc<dyn Publisher> = Arc::new(self.bot_publisher());
        let store: Arc<dyn EntryStore> = Arc::new(JsonFileStore::new(
            self.bot_store(),
            self.bot.path(),
            Arc::clone(&publisher),
        ));
        TilService::new(store, Arc::new(NoTitle)).with_publisher(publisher)
    }

    /// Clones the remote elsewhere, rewrites the store, and pushes.
    fn push_edit(&self, entries: &[TilEntry]) -> TempDir {
        let owner = TempDir::new().unwrap();
        Repository::clone(self.bare.path().to_str().unwrap(), owner.path()).unwrap();
        let path = owner.path().join("til.json");
        fs::write(&path, to_json(entries).unwrap()).unwrap();
        let report = GitPublisher::new(owner.path(), &GitSettings::default())
            .publish(&path, "")
            .unwrap();
        assert!(report.pushed);
        owner
    }

    fn remote_store(&self) -> String {
        let repo = Repository::open_bare(self.bare.path()).unwrap();
        let commit = repo
            .find_reference(&format!("refs/heads/{}", self.branch))
            .unwrap()
            .peel_to_commit()
            .unwrap();
        let blob_id = commit
            .tree()
            .unwrap()
            .get_path(Path::new("til.json"))
            .unwrap()
            .id();
        String::from_utf8(repo.find_blob(blob_id).unwrap().content().to_vec()).unwrap()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_add_keeps_edits_pushed_from_elsewhere() {
    let remote = Remote::seeded(&[entry("foo", "2023-01-01")]);
    let _owner = remote.push_edit(&[entry("remote edit", "2023-01-02"), entry("foo", "2023-01-01")]);

    let outcome = remote
        .bot_service()
        .add_as_of(&AddRequest::value("bot add"), date("2023-01-03"))
        .unwrap();
    assert!(outcome.publish_error.is_none(), "{:?}", outcome.publish_error);

    let published = remote.remote_store();
    for value in ["remote edit", "bot add", "foo"] {
        assert!(published.contains(value), "{value} missing from {published}");
    }
    assert_eq!(fs::read_to_string(remote.bot_store()).unwrap(), published);

    let values: Vec<String> = JsonFileStore::new(
        remote.bot_store(),
        remote.bot.path(),
        Arc::new(NoopPublisher),
    )
    .load()
    .unwrap()
    .into_iter()
    .map(|entry| entry.value)
    .collect();
    assert_eq!(values, vec!["bot add", "remote edit", "foo"]);
}

#[test]
fn test_local_edit_in_the_way_aborts_add() {
    let remote = Remote::seeded(&[entry("foo", "2023-01-01")]);
    let _owner = remote.push_edit(&[entry("remote edit", "2023-01-02"), entry("foo", "2023-01-01")]);

    let hand_edited = to_json(&[entry("hand edit", "2023-01-02"), entry("foo", "2023-01-01")]).unwrap();
    fs::write(remote.bot_store(), &hand_edited).unwrap();

    let err = remote
        .bot_service()
        .add_as_of(&AddRequest::value("bot add"), date("2023-01-03"))
        .unwrap_err();
    assert!(matches!(err, Error::Publish { .. }), "{err}");

    assert_eq!(fs::read_to_string(remote.bot_store()).unwrap(), hand_edited);
    assert!(remote.remote_store().contains("remote edit"));
    assert!(!remote.remote_store().contains("bot add"));
}
