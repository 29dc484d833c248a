//! Configuration handling for retalk

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::RetalkError;

/// Name of the configuration file looked up at the workspace root.
pub const CONFIG_FILE: &str = "retalk.toml";

/// Retalk configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Workspace discovery settings
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Formatting of synthesized code
    #[serde(default)]
    pub format: FormatConfig,
}

/// Workspace discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Source file extensions (without the dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Glob patterns of paths to skip
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Files larger than this many bytes are skipped
    #[serde(default)]
    pub max_file_size: Option<u64>,
}

/// Formatting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Indentation unit for synthesized directives and clauses
    #[serde(default = "default_indent")]
    pub indent: String,

    /// Emit an `info/1` directive in newly created entities
    #[serde(default = "default_new_entity_info")]
    pub new_entity_info: bool,

    /// Author recorded in synthesized entity info
    #[serde(default)]
    pub author: Option<String>,
}

fn default_extensions() -> Vec<String> {
    vec!["lgt".to_string(), "logtalk".to_string()]
}

fn default_indent() -> String {
    "\t".to_string()
}

fn default_new_entity_info() -> bool {
    true
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude: Vec::new(),
            max_file_size: None,
        }
    }
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            new_entity_info: default_new_entity_info(),
            author: None,
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, RetalkError> {
        toml::from_str(content).map_err(|e| RetalkError::ConfigError {
            message: format!("failed to parse config file: {}", e),
        })
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, RetalkError> {
        let content = fs::read_to_string(path).map_err(|e| RetalkError::ConfigError {
            message: format!("failed to read config file: {}", e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `retalk.toml` from the workspace root, or defaults if absent
    pub fn load_from_workspace(root: &Path) -> Result<Self, RetalkError> {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.workspace.extensions, vec!["lgt", "logtalk"]);
        assert_eq!(config.format.indent, "\t");
        assert!(config.format.new_entity_info);
        assert!(config.format.author.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
[workspace]
exclude = ["tests/**"]

[format]
author = "Jane Doe"
"#,
        )
        .unwrap();
        assert_eq!(config.workspace.extensions, vec!["lgt", "logtalk"]);
        assert_eq!(config.workspace.exclude, vec!["tests/**"]);
        assert_eq!(config.format.author.as_deref(), Some("Jane Doe"));
        assert_eq!(config.format.indent, "\t");
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml_str("[workspace\n").unwrap_err();
        assert!(matches!(err, RetalkError::ConfigError { .. }));
    }

    #[test]
    fn test_load_from_workspace_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_from_workspace(dir.path()).unwrap();
        assert_eq!(config.workspace.extensions.len(), 2);
    }

    #[test]
    fn test_load_from_workspace_file() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[workspace]\nextensions = [\"lgt\", \"pl\"]\n",
        )
        .unwrap();
        let config = Config::load_from_workspace(dir.path()).unwrap();
        assert_eq!(config.workspace.extensions, vec!["lgt", "pl"]);
    }
}
