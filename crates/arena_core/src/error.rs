//! Error types for the combatant core.
//!
//! Gameplay operations never fail: invalid or premature actions are no-ops
//! that report success or failure through their return value. The only
//! errors surfaced here are setup-time configuration problems and
//! snapshot (de)serialization failures.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for the combatant core.
#[derive(Debug, Error)]
pub enum GameError {
    /// A configuration value is missing or out of range.
    #[error("Invalid configuration for '{field}': {message}")]
    InvalidConfig {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Data file parsing error.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(u64),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}

impl GameError {
    /// Shorthand for an [`GameError::InvalidConfig`] error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}
