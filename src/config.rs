// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration management for Roster

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, RosterError};

/// Main configuration structure for Roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Roster instance name
    pub name: String,

    /// Version of the configuration format
    #[serde(default = "default_version")]
    pub version: String,

    /// Group whose membership confers elevated access
    #[serde(default = "default_privilege_group")]
    pub privilege_group: String,

    /// Account store configuration
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Account store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Create a home directory when adding an account
    #[serde(default = "default_true")]
    pub create_home: bool,

    /// Login shell for new accounts
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Remove the home directory when deleting an account
    #[serde(default = "default_true")]
    pub purge_home_on_delete: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log file path (optional)
    pub file: Option<std::path::PathBuf>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            create_home: true,
            shell: default_shell(),
            purge_home_on_delete: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "roster".to_string(),
            version: default_version(),
            privilege_group: default_privilege_group(),
            directory: DirectoryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(RosterError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(RosterError::InvalidConfig {
                message: "Roster name cannot be empty".to_string(),
            });
        }

        if self.privilege_group.is_empty() {
            return Err(RosterError::InvalidConfig {
                message: "privilege_group cannot be empty".to_string(),
            });
        }

        if self.directory.shell.is_empty() {
            return Err(RosterError::InvalidConfig {
                message: "directory.shell cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

// Default value functions

fn default_version() -> String {
    "1.0".to_string()
}

fn default_privilege_group() -> String {
    "sudo".to_string()
}

fn default_shell() -> String {
    "/bin/bash".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.name, "roster");
        assert_eq!(config.version, "1.0");
        assert_eq!(config.privilege_group, "sudo");
        assert!(config.directory.create_home);
        assert_eq!(config.directory.shell, "/bin/bash");
    }

    #[test]
    fn test_config_validation_empty_name() {
        let mut config = Config::default();
        config.name = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_privilege_group() {
        let mut config = Config::default();
        config.privilege_group = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_toml_config() {
        let toml_content = r#"
            name = "test-roster"
            version = "1.0"
            privilege_group = "wheel"

            [directory]
            create_home = false
            shell = "/bin/sh"
            purge_home_on_delete = false

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.name, "test-roster");
        assert_eq!(config.privilege_group, "wheel");
        assert!(!config.directory.create_home);
        assert_eq!(config.directory.shell, "/bin/sh");
        assert!(!config.directory.purge_home_on_delete);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_parse_toml_config_defaults() {
        let config: Config = toml::from_str(r#"name = "minimal""#).unwrap();
        assert_eq!(config.privilege_group, "sudo");
        assert!(config.directory.create_home);
        assert!(config.directory.purge_home_on_delete);
        assert_eq!(config.logging.level, "info");
    }
}
