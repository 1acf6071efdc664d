//! Toolkit configuration.
//!
//! Loaded from TOML. Everything is optional; an empty file yields the
//! defaults.
//!
//! ```toml
//! language = "ENGLISH"
//! strict_hierarchy = true
//!
//! [globals]
//! DEFAULTFONT = "Sans, 10"
//!
//! [language_strings]
//! FILE_MENU = "File"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Options applied by `Toolkit::open`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolkitConfig {
    /// Initial value of the LANGUAGE global.
    pub language: Option<String>,

    /// Global attributes set at open time.
    pub globals: BTreeMap<String, String>,

    /// Table used to substitute `_@KEY` attribute values.
    pub language_strings: BTreeMap<String, String>,

    /// Overrides the driver's answer to "does detaching unmap?".
    pub strict_hierarchy: Option<bool>,
}

impl ToolkitConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded toolkit config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_is_default() {
        let config = ToolkitConfig::from_toml_str("").unwrap();
        assert_eq!(config, ToolkitConfig::default());
    }

    #[test]
    fn test_parse_sections() {
        let config = ToolkitConfig::from_toml_str(
            r#"
            language = "PORTUGUESE"
            strict_hierarchy = false

            [globals]
            UTF8MODE = "YES"

            [language_strings]
            OK = "Confirmar"
            "#,
        )
        .unwrap();

        assert_eq!(config.language.as_deref(), Some("PORTUGUESE"));
        assert_eq!(config.strict_hierarchy, Some(false));
        assert_eq!(config.globals.get("UTF8MODE").map(String::as_str), Some("YES"));
        assert_eq!(
            config.language_strings.get("OK").map(String::as_str),
            Some("Confirmar")
        );
    }

    #[test]
    fn test_invalid_toml() {
        let err = ToolkitConfig::from_toml_str("language = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "language = \"ENGLISH\"").unwrap();

        let config = ToolkitConfig::load(file.path()).unwrap();
        assert_eq!(config.language.as_deref(), Some("ENGLISH"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ToolkitConfig::load("/nonexistent/portkit.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
