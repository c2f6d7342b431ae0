//! Custom error types for clickscript.
//!
//! This module provides structured error types using `thiserror` for better
//! error handling and more informative error messages.

use std::io;
use thiserror::Error;

/// Main error type for clickscript operations.
#[derive(Error, Debug)]
pub enum ClickScriptError {
    /// A keybind capture finished without capturing any keys.
    #[error("keybind capture failed: {reason}")]
    CaptureFailed { reason: String },

    /// Error parsing a key combination string.
    #[error("invalid keybind '{combo}': {reason}")]
    InvalidKeybind { combo: String, reason: String },

    /// Script validation error.
    #[error("script error: {0}")]
    ScriptValidation(String),

    /// Error reading or parsing a script file.
    #[error("failed to load scripts from '{path}': {reason}")]
    ScriptLoad { path: String, reason: String },

    /// Error writing a script file.
    #[error("failed to save scripts to '{path}': {reason}")]
    ScriptSave { path: String, reason: String },

    /// A pointer primitive (move, click, position) failed.
    #[error("pointer {action} failed: {reason}")]
    Pointer { action: String, reason: String },

    /// The global key-event subscription failed or was lost.
    #[error("key subscription error: {0}")]
    Subscription(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for clickscript operations.
pub type Result<T> = std::result::Result<T, ClickScriptError>;

impl ClickScriptError {
    /// Create a new CaptureFailed error.
    pub fn capture_failed(reason: impl Into<String>) -> Self {
        Self::CaptureFailed {
            reason: reason.into(),
        }
    }

    /// Create a new InvalidKeybind error.
    pub fn invalid_keybind(combo: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKeybind {
            combo: combo.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ScriptValidation error.
    pub fn script_validation(message: impl Into<String>) -> Self {
        Self::ScriptValidation(message.into())
    }

    /// Create a new ScriptLoad error.
    pub fn script_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ScriptLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ScriptSave error.
    pub fn script_save(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ScriptSave {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new Pointer error.
    pub fn pointer(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Pointer {
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Create a new Subscription error.
    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription(message.into())
    }
}
