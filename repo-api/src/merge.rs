//! Patch-merge of repository configuration documents.
//!
//! A stored document looks like
//!
//! ```yaml
//! repo:
//!   type: maven
//!   storage: local-fs
//!   permissions: {read: ["*"]}
//!   settings: {x: 1}
//! ```
//!
//! A patch has the same shape with every field optional. Field rules when a
//! document already exists:
//! - `type` and `permissions`: the patch value wins when present.
//! - `storage`: the patch value wins only when it is a scalar; an inline
//!   storage definition in a patch is ignored.
//! - `settings`: replaced by the patch value (possibly nothing) whenever the
//!   patch carries `permissions`, kept otherwise.
//!
//! Creating a document requires scalar `type` and `storage`; `settings` is
//! never taken from the patch on creation.

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Root of a stored configuration document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepoDocument {
    pub repo: RepoConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepoConfig {
    pub r#type: Value,
    pub storage: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

/// Caller supplied partial `repo` mapping. Explicit nulls count as absent.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ConfigPatch {
    pub r#type: Option<Value>,
    pub storage: Option<Value>,
    pub permissions: Option<Value>,
    pub settings: Option<Value>,
}

#[derive(Deserialize)]
struct PatchDocument {
    repo: Value,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum CreateError {
    #[error("repository type required")]
    MissingType,
    #[error("repository storage required")]
    MissingStorage,
}

#[derive(thiserror::Error, Debug)]
pub enum DocumentError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("`repo.{0}` is null")]
    NullField(&'static str),
}

impl ConfigPatch {
    /// Parses the patch out of a document whose root holds a `repo` mapping.
    /// An empty `repo:` is not a mapping and is rejected.
    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        let document: PatchDocument = serde_yaml::from_str(text)?;
        match document.repo {
            repo @ Value::Mapping(_) => serde_yaml::from_value(repo),
            _ => Err(serde_yaml::Error::custom("`repo` must be a mapping")),
        }
    }
}

impl RepoDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DocumentError> {
        let document: RepoDocument = serde_yaml::from_slice(bytes)?;
        if document.repo.r#type.is_null() {
            return Err(DocumentError::NullField("type"));
        }
        if document.repo.storage.is_null() {
            return Err(DocumentError::NullField("storage"));
        }
        Ok(document)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Leaf values. Tagged nodes are judged by the value they wrap.
pub fn is_scalar(value: &Value) -> bool {
    match value {
        Value::Bool(_) | Value::Number(_) | Value::String(_) => true,
        Value::Tagged(tagged) => is_scalar(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => false,
    }
}

/// Applies `patch` on top of an existing configuration.
pub fn merge(base: RepoConfig, patch: ConfigPatch) -> RepoConfig {
    let ConfigPatch {
        r#type,
        storage,
        permissions,
        settings,
    } = patch;

    // `settings` follows the presence of `permissions` in the patch, not its own
    let settings = if permissions.is_some() {
        settings
    } else {
        base.settings
    };

    RepoConfig {
        r#type: r#type.unwrap_or(base.r#type),
        storage: match storage {
            Some(storage) if is_scalar(&storage) => storage,
            _ => base.storage,
        },
        permissions: permissions.or(base.permissions),
        settings,
    }
}

/// Builds a brand new configuration from `patch`.
pub fn create(patch: ConfigPatch) -> Result<RepoConfig, CreateError> {
    let r#type = patch
        .r#type
        .filter(is_scalar)
        .ok_or(CreateError::MissingType)?;
    let storage = patch
        .storage
        .filter(is_scalar)
        .ok_or(CreateError::MissingStorage)?;

    Ok(RepoConfig {
        r#type,
        storage,
        permissions: patch.permissions,
        settings: None,
    })
}
