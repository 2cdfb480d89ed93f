//! Configuration types for vcrcache

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::proxy::Behaviors;
use crate::storage::FILE_EXTENSION;
use crate::{Result, VcrError};

/// Supplies where a handler reads and writes its cache file
///
/// No lookup path disables replay from disk; no update path disables
/// recording.
pub trait SettingsProvider {
    /// Cache file to populate from
    fn lookup_path(&self) -> Option<PathBuf>;

    /// Cache file to persist to
    fn update_path(&self) -> Option<PathBuf>;
}

/// Explicit cache file paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachePaths {
    /// Cache file to populate from
    pub lookup: Option<PathBuf>,
    /// Cache file to persist to
    pub update: Option<PathBuf>,
}

impl CachePaths {
    /// Read and write the same file
    #[must_use]
    pub fn same(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            lookup: Some(path.clone()),
            update: Some(path),
        }
    }
}

impl SettingsProvider for CachePaths {
    fn lookup_path(&self) -> Option<PathBuf> {
        self.lookup.clone()
    }

    fn update_path(&self) -> Option<PathBuf> {
        self.update.clone()
    }
}

/// Main configuration
///
/// ```toml
/// name = "payments_api"
/// lookup_dir = "tests/recordings"
/// update_dir = "tests/recordings"
///
/// [behaviors]
/// deny_network_calls = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cache name; the file is `<name>.vcr`
    pub name: String,
    /// Directory to read the cache file from
    #[serde(default)]
    pub lookup_dir: Option<PathBuf>,
    /// Directory to write the cache file to
    #[serde(default)]
    pub update_dir: Option<PathBuf>,
    /// Handler behaviors
    #[serde(default)]
    pub behaviors: Behaviors,
}

impl Config {
    /// Read and write `<dir>/<name>.vcr` with default behaviors
    #[must_use]
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            name: name.into(),
            lookup_dir: Some(dir.clone()),
            update_dir: Some(dir),
            behaviors: Behaviors::default(),
        }
    }

    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VcrError::Configuration(format!("Failed to read config file: {e}"))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns error if the text cannot be parsed or is invalid
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| VcrError::Configuration(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// Directories are not required to exist here; a missing update
    /// directory is reported when a response is first persisted.
    ///
    /// # Errors
    ///
    /// Returns error if the cache name is unusable as a file name
    pub fn validate(&self) -> Result<()> {
        validate_cache_name(&self.name)
    }

    /// Cache file name, `<name>.vcr`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.{FILE_EXTENSION}", self.name)
    }
}

impl SettingsProvider for Config {
    fn lookup_path(&self) -> Option<PathBuf> {
        self.lookup_dir.as_ref().map(|dir| dir.join(self.file_name()))
    }

    fn update_path(&self) -> Option<PathBuf> {
        self.update_dir.as_ref().map(|dir| dir.join(self.file_name()))
    }
}

/// Validate a cache name
fn validate_cache_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "cannot be empty"
    } else if name.len() > 255 {
        "is longer than 255 bytes"
    } else if name.contains(['/', '\\']) {
        "cannot contain path separators"
    } else if name.starts_with('.') {
        "cannot start with a dot"
    } else if name.contains('\0') {
        "cannot contain null bytes"
    } else {
        return Ok(());
    };

    Err(VcrError::Configuration(format!(
        "Invalid cache name {name:?}: {reason}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_parse() {
        let config = Config::from_toml(
            r#"
            name = "payments"
            lookup_dir = "/recordings"
            update_dir = "/out"

            [behaviors]
            deny_network_calls = true
        "#,
        )
        .unwrap();

        assert_eq!(config.name, "payments");
        assert!(config.behaviors.deny_network_calls);
        assert!(!config.behaviors.skip_cache_lookup);
        assert_eq!(
            config.lookup_path().unwrap(),
            PathBuf::from("/recordings/payments.vcr")
        );
        assert_eq!(config.update_path().unwrap(), PathBuf::from("/out/payments.vcr"));
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"name = \"search\"\nlookup_dir = \"/tmp\"\n")
            .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.behaviors, Behaviors::default());
        assert!(config.update_path().is_none(), "recording disabled");
        assert_eq!(config.lookup_path().unwrap(), PathBuf::from("/tmp/search.vcr"));
    }

    #[test]
    fn test_invalid_cache_names() {
        for name in ["", ".hidden", "a/b", "a\\b", "nul\0"] {
            let config = Config::new(name, "/tmp");
            assert!(config.validate().unwrap_err().is_configuration(), "{name:?}");
        }
        assert!(Config::new("valid_name-1", "/tmp").validate().is_ok());
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file(std::path::Path::new("/nonexistent/vcr.toml")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_cache_paths() {
        let paths = CachePaths::same("/tmp/a.vcr");
        assert_eq!(paths.lookup_path(), paths.update_path());
        assert!(CachePaths::default().lookup_path().is_none());
    }
}
