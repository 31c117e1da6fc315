use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Inspector settings, read from an optional TOML file.
///
/// Every field has a default, so an empty file (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    /// Header labels for the name, value and type columns
    pub columns: Vec<String>,
    /// Text of the "more children" row
    pub ellipsis_label: String,
    /// Name shown for the watches container
    pub watches_label: String,
    /// Value text shown while a variable reports an error
    pub error_label: String,
    /// Name shown for the finish-result pseudo-variable
    pub finish_result_label: String,
    /// Values equal to this are flagged as a likely null pointer
    pub null_pointer: String,
    /// How many children a session hands out per fetch
    pub child_page_size: usize,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        InspectorConfig {
            columns: vec!["Name".to_string(), "Value".to_string(), "Type".to_string()],
            ellipsis_label: "...".to_string(),
            watches_label: "Auto".to_string(),
            error_label: "Error".to_string(),
            finish_result_label: "$ret".to_string(),
            null_pointer: "0x0".to_string(),
            child_page_size: 20,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("expected 3 column labels (name, value, type), found {0}")]
    Columns(usize),
    #[error("child_page_size must be at least 1")]
    PageSize,
}

impl InspectorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: InspectorConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.columns.len() != 3 {
            return Err(ConfigError::Columns(self.columns.len()));
        }
        if self.child_page_size == 0 {
            return Err(ConfigError::PageSize);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = InspectorConfig::from_toml_str("").unwrap();
        assert_eq!(config, InspectorConfig::default());
        assert_eq!(config.null_pointer, "0x0");
    }

    #[test]
    fn test_partial_override() {
        let config = InspectorConfig::from_toml_str(
            "null_pointer = \"(nil)\"\nchild_page_size = 4\n",
        )
        .unwrap();
        assert_eq!(config.null_pointer, "(nil)");
        assert_eq!(config.child_page_size, 4);
        assert_eq!(config.watches_label, "Auto");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            InspectorConfig::from_toml_str("columns = [\"Name\"]"),
            Err(ConfigError::Columns(1))
        ));
        assert!(matches!(
            InspectorConfig::from_toml_str("child_page_size = 0"),
            Err(ConfigError::PageSize)
        ));
        assert!(matches!(
            InspectorConfig::from_toml_str("columns = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ellipsis_label = \"more\"").unwrap();
        let config = InspectorConfig::load(file.path()).unwrap();
        assert_eq!(config.ellipsis_label, "more");

        let missing = InspectorConfig::load(Path::new("/nonexistent/inspector.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
