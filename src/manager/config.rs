use crate::core::{ManagerError, Result};
use crate::pager::DEFAULT_MAX_PER_PAGE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CLASS_NAME: &str = "RecordManager";

/// Record manager configuration
///
/// Normally produced by the application's service wiring, one per managed
/// entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Name reported in configuration errors
    pub class_name: String,

    /// Bundle name, the prefix of entity references (`Bundle:Entity`)
    pub bundle_name: String,

    /// Bundle namespace, the prefix of entity class names
    pub bundle_namespace: String,

    /// Managed entity reference
    pub entity: Option<String>,

    /// Page size used when a caller does not give one
    pub default_page_size: usize,

    /// Application root directory (informational)
    pub root_dir: Option<PathBuf>,

    /// Reject entity references outside the bundle instead of ignoring them
    pub strict_entity_refs: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            class_name: DEFAULT_CLASS_NAME.to_string(),
            bundle_name: String::new(),
            bundle_namespace: String::new(),
            entity: None,
            default_page_size: DEFAULT_MAX_PER_PAGE,
            root_dir: None,
            strict_entity_refs: false,
        }
    }
}

impl ManagerConfig {
    pub fn new(bundle_name: &str, bundle_namespace: &str) -> Self {
        Self {
            bundle_name: bundle_name.to_string(),
            bundle_namespace: bundle_namespace.to_string(),
            ..Self::default()
        }
    }

    pub fn entity(mut self, entity: &str) -> Self {
        self.entity = Some(entity.to_string());
        self
    }

    pub fn class_name(mut self, class_name: &str) -> Self {
        self.class_name = class_name.to_string();
        self
    }

    pub fn default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(root_dir.into());
        self
    }

    pub fn strict_entity_refs(mut self, strict: bool) -> Self {
        self.strict_entity_refs = strict;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.entity.is_some()
            && (self.bundle_name.is_empty() || self.bundle_namespace.is_empty())
        {
            return Err(ManagerError::Config(
                "bundle name and namespace are required to manage an entity".to_string(),
            ));
        }
        if self.default_page_size == 0 {
            return Err(ManagerError::Config(
                "default page size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ManagerConfig::new("Blog", "Acme::BlogBundle")
            .entity("Blog:Article")
            .class_name("ArticleManager")
            .default_page_size(25)
            .root_dir("/srv/app");

        assert_eq!(config.entity.as_deref(), Some("Blog:Article"));
        assert_eq!(config.class_name, "ArticleManager");
        assert_eq!(config.default_page_size, 25);
        assert!(!config.strict_entity_refs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_defaults() {
        let config = ManagerConfig::from_json_str(
            r#"{"bundle_name": "Blog", "bundle_namespace": "Acme::BlogBundle"}"#,
        )
        .unwrap();
        assert_eq!(config.class_name, DEFAULT_CLASS_NAME);
        assert_eq!(config.default_page_size, 10);
        assert!(config.entity.is_none());
    }

    #[test]
    fn test_entity_without_bundle_is_rejected() {
        let err = ManagerConfig::from_json_str(r#"{"entity": "Blog:Article"}"#).unwrap_err();
        assert!(matches!(err, ManagerError::Config(_)));

        let err = ManagerConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ManagerError::Config(_)));
    }
}
