//! Manifest loading.
//!
//! A manifest holds the provider settings and the namespaces it manages. It is
//! read from YAML, and a `.env` file next to it may supply the host and port.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};
use crate::model::ResourceSpec;

use super::provider::ProviderConfig;

/// Default manifest file names, in lookup order.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "temporal.provider.yaml",
    "temporal.provider.yml",
    "provider.yaml",
    "provider.yml",
];

/// Provider settings plus the namespaces under management.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Namespaces in declaration order.
    #[serde(default)]
    pub namespaces: Vec<ResourceSpec>,
}

impl Manifest {
    /// Looks up a namespace by name.
    #[must_use]
    pub fn namespace(&self, name: &str) -> Option<&ResourceSpec> {
        self.namespaces
            .iter()
            .find(|ns| ns.name.known().is_some_and(|n| n == name))
    }

    /// Returns the known namespace names in declaration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.namespaces
            .iter()
            .filter_map(|ns| ns.name.known().map(String::as_str))
            .collect()
    }

    fn check_duplicates(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for name in self.names() {
            if !seen.insert(name) {
                return Err(ConfigError::DuplicateName {
                    name: name.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Loads manifests and the optional `.env` file.
#[derive(Debug, Default)]
pub struct ConfigParser {
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a parser rooted at the current directory.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory searched for `.env`.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a manifest from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or invalid.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Manifest> {
        let path = path.as_ref();
        info!("Loading manifest from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            message: format!("Failed to read file: {e}"),
            location: Some(path.display().to_string()),
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a manifest from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or names a namespace twice.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<Manifest> {
        debug!("Parsing YAML manifest");

        let manifest: Manifest =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            })?;
        manifest.check_duplicates()?;

        debug!(
            namespaces = manifest.namespaces.len(),
            "Parsed manifest"
        );
        Ok(manifest)
    }

    /// Loads the `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| ConfigError::ParseError {
                message: format!("Failed to load .env file: {e}"),
                location: Some(env_path.display().to_string()),
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Finds a manifest in `start_dir` or any of its parents.
///
/// # Errors
///
/// Returns [`ConfigError::FileNotFound`] if no manifest exists.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let candidate = current.join(filename);
            if candidate.exists() {
                info!("Found manifest: {}", candidate.display());
                return Ok(candidate);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ProviderError};
    use crate::model::AttrValue;

    #[test]
    fn test_parse_manifest() {
        let yaml = r#"
provider:
  host: localhost
  port: "7233"
namespaces:
  - name: billing
    description: Billing workflows
    owner_email: billing@example.com
  - name: orders
"#;
        let manifest = ConfigParser::new()
            .parse_yaml(yaml, None)
            .expect("valid manifest");

        assert_eq!(manifest.names(), vec!["billing", "orders"]);
        assert_eq!(manifest.provider.host, AttrValue::from("localhost"));

        let orders = manifest.namespace("orders").expect("orders");
        assert!(orders.description.is_null());
        assert!(manifest.namespace("payments").is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let yaml = "namespaces:\n  - name: billing\n  - name: billing\n";
        let err = ConfigParser::new()
            .parse_yaml(yaml, None)
            .expect_err("duplicate");

        assert!(matches!(
            err,
            ProviderError::Config(ConfigError::DuplicateName { ref name }) if name == "billing"
        ));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = ConfigParser::new()
            .parse_yaml("pods: []\n", None)
            .expect_err("unknown key");
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_load_file_and_find() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("team").join("service");
        std::fs::create_dir_all(&nested).expect("nested dirs");

        let path = dir.path().join(DEFAULT_CONFIG_FILES[0]);
        std::fs::write(&path, "namespaces:\n  - name: billing\n").expect("write manifest");

        let found = find_config_file(&nested).expect("found in parent");
        assert_eq!(found, path);

        let manifest = ConfigParser::new().load_file(&found).expect("loads");
        assert_eq!(manifest.names(), vec!["billing"]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = ConfigParser::new()
            .load_file(dir.path().join("absent.yaml"))
            .expect_err("missing");

        assert!(matches!(
            err,
            ProviderError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
