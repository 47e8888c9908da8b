use serde::Deserialize;

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum StorageConfig {
    Filesystem { path: String },
    // Only meant for tests and local experiments
    Memory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize() {
        let config: StorageConfig = serde_yaml::from_str(
            r#"
            type: filesystem
            path: /var/lib/repoman
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            StorageConfig::Filesystem {
                path: "/var/lib/repoman".into()
            }
        );

        let config: StorageConfig = serde_yaml::from_str("type: memory").unwrap();
        assert_eq!(config, StorageConfig::Memory);
    }

    #[test]
    fn test_deserialization_errors() {
        assert!(serde_yaml::from_str::<StorageConfig>("type: gcs").is_err());
        assert!(serde_yaml::from_str::<StorageConfig>("type: filesystem").is_err());
    }
}
