//! Artifactory compatible `GET /api/security/permissions`: one permission
//! target per repository.

use crate::config_file::repository_name;
use crate::errors::Result;
use crate::metrics_defs::PERMISSIONS_LIST_DURATION;
use async_trait::async_trait;
use config_store::Storage;
use serde::Serialize;
use shared::histogram;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Source of the repositories that have permission settings.
#[async_trait]
pub trait RepoPermissions: Send + Sync {
    async fn repositories(&self) -> Result<Vec<String>>;
}

/// Every repository configuration document in the store, in key order.
pub struct StoredPermissions {
    storage: Arc<dyn Storage>,
}

impl StoredPermissions {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        StoredPermissions { storage }
    }
}

#[async_trait]
impl RepoPermissions for StoredPermissions {
    async fn repositories(&self) -> Result<Vec<String>> {
        let keys = self.storage.list(None).await?;

        // The same name may exist for several users or under both extensions
        let mut seen = HashSet::new();
        Ok(keys
            .iter()
            .filter_map(repository_name)
            .filter(|name| seen.insert(*name))
            .map(str::to_string)
            .collect())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PermissionRecord {
    pub name: String,
    pub uri: String,
}

pub struct PermissionsListHandler {
    permissions: Arc<dyn RepoPermissions>,
    base_url: String,
}

impl PermissionsListHandler {
    pub fn new(permissions: Arc<dyn RepoPermissions>, base_url: &str) -> Self {
        PermissionsListHandler {
            permissions,
            base_url: base_url.strip_suffix('/').unwrap_or(base_url).to_string(),
        }
    }

    pub async fn list(&self) -> Result<Vec<PermissionRecord>> {
        let start = Instant::now();
        let names = self.permissions.repositories().await?;
        histogram!(PERMISSIONS_LIST_DURATION).record(start.elapsed().as_secs_f64());

        Ok(names
            .into_iter()
            .map(|name| PermissionRecord {
                uri: format!("{}/api/security/permissions/{}", self.base_url, name),
                name,
            })
            .collect())
    }
}
