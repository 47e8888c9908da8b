//! Handler for `POST /api/repos/{user}`: creates or patches the configuration
//! document of one repository.

use crate::config_file::{self, document_key};
use crate::errors::{RepoApiError, Result};
use crate::form::RepoForm;
use crate::merge::{ConfigPatch, RepoDocument, create, merge};
use crate::metrics_defs::{REPO_CREATED, REPO_UPDATE_DURATION, REPO_UPDATE_REJECTED, REPO_UPDATED};
use config_store::{KeyLocks, Storage};
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    Created,
    Updated,
}

impl UpdateOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            UpdateOutcome::Created => "created",
            UpdateOutcome::Updated => "updated",
        }
    }
}

pub struct RepoUpdateHandler {
    storage: Arc<dyn Storage>,
    // Present when updates of one document must not interleave
    locks: Option<KeyLocks>,
}

impl RepoUpdateHandler {
    pub fn new(storage: Arc<dyn Storage>, serialize_updates: bool) -> Self {
        RepoUpdateHandler {
            storage,
            locks: serialize_updates.then(KeyLocks::new),
        }
    }

    /// Decodes a form body and applies the patch it carries to `user`'s
    /// repository. Returns the dashboard location of the repository.
    pub async fn handle(&self, user: &str, body: &[u8]) -> Result<String> {
        let start = Instant::now();
        let result = self.handle_form(user, body).await;

        let outcome = match &result {
            Ok((outcome, _)) => outcome.as_str(),
            Err(e) if e.is_client_error() => "rejected",
            Err(_) => "failed",
        };
        histogram!(REPO_UPDATE_DURATION, "outcome" => outcome).record(start.elapsed().as_secs_f64());

        match result {
            Ok((UpdateOutcome::Created, location)) => {
                counter!(REPO_CREATED).increment(1);
                Ok(location)
            }
            Ok((UpdateOutcome::Updated, location)) => {
                counter!(REPO_UPDATED).increment(1);
                Ok(location)
            }
            Err(e) => {
                if e.is_client_error() {
                    counter!(REPO_UPDATE_REJECTED).increment(1);
                }
                Err(e)
            }
        }
    }

    async fn handle_form(&self, user: &str, body: &[u8]) -> Result<(UpdateOutcome, String)> {
        let form = RepoForm::decode(body)?;
        let patch = form.patch()?;
        let outcome = self.apply(user, &form.repo, patch).await?;
        Ok((outcome, dashboard_location(user, &form.repo)))
    }

    /// Merges `patch` into the stored document of `user`'s repository `repo`,
    /// or creates that document, and writes the result back.
    ///
    /// Nothing is written when the patch is rejected.
    pub async fn apply(&self, user: &str, repo: &str, patch: ConfigPatch) -> Result<UpdateOutcome> {
        let key = document_key(user, repo)?;

        let _guard = match &self.locks {
            Some(locks) => Some(locks.lock(&key).await),
            None => None,
        };

        let (config, outcome) = match config_file::locate(self.storage.as_ref(), user, repo).await? {
            Some(existing) => {
                let bytes = self.storage.read(&existing).await?;
                let base = RepoDocument::from_slice(&bytes).map_err(|e| {
                    RepoApiError::CorruptDocument {
                        key: existing.clone(),
                        reason: e.to_string(),
                    }
                })?;
                (merge(base.repo, patch), UpdateOutcome::Updated)
            }
            None => {
                let config = create(patch).map_err(|e| RepoApiError::Validation(e.to_string()))?;
                (config, UpdateOutcome::Created)
            }
        };

        let yaml = RepoDocument { repo: config }.to_yaml()?;
        self.storage.write(&key, yaml.into_bytes()).await?;

        tracing::info!(
            user = %user,
            repo = %repo,
            key = %key,
            outcome = outcome.as_str(),
            "Stored repository configuration"
        );

        Ok(outcome)
    }
}

pub fn dashboard_location(user: &str, repo: &str) -> String {
    format!("/dashboard/{user}/{repo}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use config_store::{Key, MemoryStorage, StorageError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Memory storage counting writes, with optionally slow reads.
    #[derive(Default)]
    struct TestStorage {
        inner: MemoryStorage,
        writes: AtomicUsize,
        read_delay: Option<Duration>,
    }

    impl TestStorage {
        fn slow(read_delay: Duration) -> Self {
            TestStorage {
                read_delay: Some(read_delay),
                ..Default::default()
            }
        }

        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        async fn seed(&self, key: &str, content: &str) {
            self.inner
                .write(&key.parse().unwrap(), content.as_bytes().to_vec())
                .await
                .unwrap();
        }

        async fn text(&self, key: &str) -> String {
            let bytes = self.inner.read(&key.parse().unwrap()).await.unwrap();
            String::from_utf8(bytes).unwrap()
        }
    }

    #[async_trait]
    impl Storage for TestStorage {
        async fn exists(&self, key: &Key) -> Result<bool, StorageError> {
            self.inner.exists(key).await
        }

        async fn read(&self, key: &Key) -> Result<Vec<u8>, StorageError> {
            let content = self.inner.read(key).await;
            // Delay after reading, so concurrent readers all see the same content
            if let Some(delay) = self.read_delay {
                tokio::time::sleep(delay).await;
            }
            content
        }

        async fn write(&self, key: &Key, content: Vec<u8>) -> Result<(), StorageError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.write(key, content).await
        }

        async fn list(&self, prefix: Option<&Key>) -> Result<Vec<Key>, StorageError> {
            self.inner.list(prefix).await
        }
    }

    fn form(repo: &str, config: &str) -> Vec<u8> {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("repo", repo)
            .append_pair("config", config)
            .finish()
            .into_bytes()
    }

    fn patch(s: &str) -> ConfigPatch {
        ConfigPatch::parse(s).unwrap()
    }

    const EXISTING: &str = r#"
repo:
  type: maven
  storage: local-fs
  permissions:
    read: ["*"]
  settings:
    x: 1
"#;

    #[tokio::test]
    async fn test_create_new_document() {
        let storage = Arc::new(TestStorage::default());
        let handler = RepoUpdateHandler::new(storage.clone(), false);

        let location = handler
            .handle(
                "alice",
                &form("maven-local", "repo:\n  type: maven\n  storage: local-fs\n"),
            )
            .await
            .unwrap();

        assert_eq!(location, "/dashboard/alice/maven-local");
        assert_eq!(storage.writes(), 1);
        assert_eq!(
            storage.text("alice/maven-local.yaml").await,
            "repo:\n  type: maven\n  storage: local-fs\n"
        );
    }

    #[tokio::test]
    async fn test_create_requires_type() {
        let storage = Arc::new(TestStorage::default());
        let handler = RepoUpdateHandler::new(storage.clone(), false);

        let result = handler
            .handle("alice", &form("maven-local", "repo:\n  storage: local-fs\n"))
            .await;

        assert!(matches!(result, Err(RepoApiError::Validation(_))));
        assert_eq!(storage.writes(), 0);
    }

    #[tokio::test]
    async fn test_malformed_requests_write_nothing() {
        let storage = Arc::new(TestStorage::default());
        let handler = RepoUpdateHandler::new(storage.clone(), false);

        for (user, body) in [
            ("alice", b"repo=maven-local".to_vec()),
            ("alice", form("maven-local", "repo: [")),
            ("alice", form("maven-local", "type: maven")),
            ("al.ice", form("maven-local", "repo: {type: maven, storage: fs}")),
        ] {
            assert!(matches!(
                handler.handle(user, &body).await,
                Err(RepoApiError::MalformedInput(_))
            ));
        }
        assert_eq!(storage.writes(), 0);
    }

    #[tokio::test]
    async fn test_update_existing_document() {
        let storage = Arc::new(TestStorage::default());
        storage.seed("alice/maven-local.yaml", EXISTING).await;
        let handler = RepoUpdateHandler::new(storage.clone(), false);

        let outcome = handler
            .apply(
                "alice",
                "maven-local",
                patch("repo: {storage: {inline: true}, permissions: {read: []}}"),
            )
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Updated);
        // Inline storage is ignored and settings go away along with the new permissions
        assert_eq!(
            storage.text("alice/maven-local.yaml").await,
            "repo:\n  type: maven\n  storage: local-fs\n  permissions:\n    read: []\n"
        );
    }

    #[tokio::test]
    async fn test_update_does_not_require_type() {
        let storage = Arc::new(TestStorage::default());
        storage.seed("alice/maven-local.yaml", EXISTING).await;
        let handler = RepoUpdateHandler::new(storage.clone(), false);

        handler
            .apply("alice", "maven-local", patch("repo: {storage: s3}"))
            .await
            .unwrap();

        let stored =
            RepoDocument::from_slice(storage.text("alice/maven-local.yaml").await.as_bytes())
                .unwrap();
        assert_eq!(stored.repo.storage, serde_yaml::Value::from("s3"));
        assert_eq!(stored.repo.r#type, serde_yaml::Value::from("maven"));
        assert!(stored.repo.settings.is_some());
    }

    #[tokio::test]
    async fn test_update_yml_document() {
        let storage = Arc::new(TestStorage::default());
        storage.seed("alice/npm.yml", "repo: {type: npm, storage: default}").await;
        let handler = RepoUpdateHandler::new(storage.clone(), false);

        let outcome = handler
            .apply("alice", "npm", patch("repo: {storage: s3}"))
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Updated);
        assert_eq!(
            storage.text("alice/npm.yaml").await,
            "repo:\n  type: npm\n  storage: s3\n"
        );
        assert_eq!(
            storage.text("alice/npm.yml").await,
            "repo: {type: npm, storage: default}"
        );
    }

    #[tokio::test]
    async fn test_corrupt_stored_document() {
        let storage = Arc::new(TestStorage::default());
        storage.seed("alice/npm.yaml", "repo: {storage: default}").await;
        let handler = RepoUpdateHandler::new(storage.clone(), false);

        let result = handler
            .apply("alice", "npm", patch("repo: {type: npm}"))
            .await;

        assert!(matches!(result, Err(RepoApiError::CorruptDocument { .. })));
        assert_eq!(storage.writes(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_updates_lose_one_patch() {
        // Unserialized read-merge-write: both requests read the same base and the
        // last write wins.
        let storage = Arc::new(TestStorage::slow(Duration::from_millis(50)));
        storage.seed("alice/maven.yaml", EXISTING).await;
        let handler = RepoUpdateHandler::new(storage.clone(), false);

        let (a, b) = tokio::join!(
            handler.apply("alice", "maven", patch("repo: {type: gradle}")),
            handler.apply("alice", "maven", patch("repo: {storage: s3}")),
        );
        a.unwrap();
        b.unwrap();

        let stored =
            RepoDocument::from_slice(storage.text("alice/maven.yaml").await.as_bytes()).unwrap();
        let type_changed = stored.repo.r#type == serde_yaml::Value::from("gradle");
        let storage_changed = stored.repo.storage == serde_yaml::Value::from("s3");
        assert!(type_changed != storage_changed);
    }

    #[tokio::test]
    async fn test_serialized_updates_apply_both_patches() {
        let storage = Arc::new(TestStorage::slow(Duration::from_millis(50)));
        storage.seed("alice/maven.yaml", EXISTING).await;
        let handler = RepoUpdateHandler::new(storage.clone(), true);

        let (a, b) = tokio::join!(
            handler.apply("alice", "maven", patch("repo: {type: gradle}")),
            handler.apply("alice", "maven", patch("repo: {storage: s3}")),
        );
        a.unwrap();
        b.unwrap();

        let stored =
            RepoDocument::from_slice(storage.text("alice/maven.yaml").await.as_bytes()).unwrap();
        assert_eq!(stored.repo.r#type, serde_yaml::Value::from("gradle"));
        assert_eq!(stored.repo.storage, serde_yaml::Value::from("s3"));
        assert_eq!(storage.writes(), 2);
    }
}
