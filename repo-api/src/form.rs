use crate::errors::{RepoApiError, Result};
use crate::merge::ConfigPatch;

/// Decoded body of a repository update request.
#[derive(Debug, PartialEq)]
pub struct RepoForm {
    /// Repository name
    pub repo: String,
    /// YAML text whose root holds the `repo` patch mapping
    pub config: String,
}

impl RepoForm {
    /// Decodes an `application/x-www-form-urlencoded` body. The first
    /// occurrence of a repeated field wins.
    pub fn decode(body: &[u8]) -> Result<Self> {
        let mut repo = None;
        let mut config = None;

        for (name, value) in url::form_urlencoded::parse(body) {
            match name.as_ref() {
                "repo" if repo.is_none() => repo = Some(value.into_owned()),
                "config" if config.is_none() => config = Some(value.into_owned()),
                _ => {}
            }
        }

        let repo = repo.ok_or_else(|| missing_field("repo"))?;
        let config = config.ok_or_else(|| missing_field("config"))?;

        if repo.is_empty() {
            return Err(RepoApiError::MalformedInput(
                "repository name is empty".to_string(),
            ));
        }

        Ok(RepoForm { repo, config })
    }

    pub fn patch(&self) -> Result<ConfigPatch> {
        ConfigPatch::parse(&self.config)
            .map_err(|e| RepoApiError::MalformedInput(format!("invalid `config` document: {e}")))
    }
}

fn missing_field(name: &str) -> RepoApiError {
    RepoApiError::MalformedInput(format!("required field `{name}` absent"))
}
