//! Where repository configuration documents live in the store.
//!
//! The document of repository `repo` owned by `user` is `{user}/{repo}.yaml`.
//! Documents written by other tools may use the `.yml` extension instead; those
//! are found on lookup but every write goes to the `.yaml` key.

use crate::errors::{RepoApiError, Result};
use config_store::{Key, Storage};

const EXTENSION: &str = "yaml";
const ALT_EXTENSION: &str = "yml";

/// Canonical key of the configuration document of `user`'s repository `repo`.
pub fn document_key(user: &str, repo: &str) -> Result<Key> {
    key_with_extension(user, repo, EXTENSION)
}

fn key_with_extension(user: &str, repo: &str, extension: &str) -> Result<Key> {
    validate_user(user)?;
    validate_repo(repo)?;
    let file_name = format!("{repo}.{extension}");
    Key::from_parts([user, file_name.as_str()])
        .map_err(|e| RepoApiError::MalformedInput(e.to_string()))
}

// Both names end up in a redirect location, so keep them to visible ASCII
fn validate_user(user: &str) -> Result<()> {
    let valid = !user.is_empty()
        && user
            .chars()
            .all(|c| c.is_ascii_graphic() && c != '/' && c != '.');
    if !valid {
        return Err(RepoApiError::MalformedInput(format!(
            "invalid user name {user:?}"
        )));
    }
    Ok(())
}

fn validate_repo(repo: &str) -> Result<()> {
    let valid = !repo.is_empty()
        && !repo.starts_with('.')
        && repo.chars().all(|c| c.is_ascii_graphic() && c != '/');
    if !valid {
        return Err(RepoApiError::MalformedInput(format!(
            "invalid repository name {repo:?}"
        )));
    }
    Ok(())
}

/// Finds the stored document for `user`'s repository `repo`, trying the
/// canonical `.yaml` key first.
pub async fn locate(storage: &dyn Storage, user: &str, repo: &str) -> Result<Option<Key>> {
    for extension in [EXTENSION, ALT_EXTENSION] {
        let key = key_with_extension(user, repo, extension)?;
        if storage.exists(&key).await? {
            return Ok(Some(key));
        }
    }
    Ok(None)
}

/// Repository name of a configuration document key, `None` for other keys.
///
/// Files starting with `_` hold service data (credentials, global permissions)
/// and are not repositories.
pub fn repository_name(key: &Key) -> Option<&str> {
    let file_name = key.name();
    if file_name.starts_with('_') {
        return None;
    }

    let (stem, extension) = file_name.rsplit_once('.')?;
    if stem.is_empty() || (extension != EXTENSION && extension != ALT_EXTENSION) {
        return None;
    }
    Some(stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_store::MemoryStorage;

    #[test]
    fn test_document_key() {
        assert_eq!(
            document_key("alice", "maven-local").unwrap().as_str(),
            "alice/maven-local.yaml"
        );
    }

    #[test]
    fn test_document_key_rejects_bad_names() {
        for (user, repo) in [
            ("", "maven"),
            ("al.ice", "maven"),
            ("alice/bob", "maven"),
            ("al\nice", "maven"),
            ("al ice", "maven"),
            ("alïce", "maven"),
            ("alice", ""),
            ("alice", "a/b"),
            ("alice", "../maven"),
            ("alice", ".hidden"),
            ("alice", "with space"),
            ("alice", "dépôt"),
        ] {
            assert!(
                matches!(
                    document_key(user, repo),
                    Err(RepoApiError::MalformedInput(_))
                ),
                "{user:?} {repo:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_locate() {
        let storage = MemoryStorage::new();
        assert_eq!(locate(&storage, "alice", "maven").await.unwrap(), None);

        let yml: Key = "alice/maven.yml".parse().unwrap();
        storage.write(&yml, vec![]).await.unwrap();
        assert_eq!(
            locate(&storage, "alice", "maven").await.unwrap(),
            Some(yml)
        );

        // The canonical key shadows the alternative one
        let yaml: Key = "alice/maven.yaml".parse().unwrap();
        storage.write(&yaml, vec![]).await.unwrap();
        assert_eq!(
            locate(&storage, "alice", "maven").await.unwrap(),
            Some(yaml)
        );
    }

    #[test]
    fn test_repository_name() {
        let name = |s: &str| repository_name(&s.parse().unwrap()).map(str::to_string);

        assert_eq!(name("alice/maven-local.yaml"), Some("maven-local".into()));
        assert_eq!(name("alice/docker.yml"), Some("docker".into()));
        assert_eq!(name("npm.yaml"), Some("npm".into()));
        assert_eq!(name("my.repo.yaml"), Some("my.repo".into()));
        assert_eq!(name("_credentials.yaml"), None);
        assert_eq!(name("alice/readme.md"), None);
        assert_eq!(name("alice/noext"), None);
    }
}
