// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for Roster

use thiserror::Error;

/// Result type alias for Roster operations
pub type Result<T> = std::result::Result<T, RosterError>;

/// Errors that can occur during Roster operations
#[derive(Error, Debug)]
pub enum RosterError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration format
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Role string outside the accepted set
    #[error("Invalid role '{role}': expected 'admin', 'user', or 'standard'")]
    InvalidRole { role: String },

    /// Credential encoding failed (randomness source or parameter failure)
    #[error("Failed to encode credential: {message}")]
    Encoding { message: String },

    /// The host account store refused or failed an operation
    #[error("Directory operation '{operation}' failed for '{username}': {message}")]
    Directory {
        operation: String,
        username: String,
        message: String,
    },

    /// Import source file not found
    #[error("Record source not found: {path}")]
    SourceNotFound { path: String },

    /// Import source is missing a required column
    #[error("Record source is missing required column '{column}'")]
    SourceMissingColumn { column: String },

    /// Import source could not be read
    #[error("Failed to read record source: {0}")]
    SourceRead(#[from] csv::Error),

    /// IO error wrapper
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}
