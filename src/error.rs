//! Error types.
//!
//! Only structural operations (creation, tree edits, mapping, configuration)
//! report errors. Attribute dispatch is soft and never fails.

use thiserror::Error;

use crate::driver::DriverError;
use crate::types::ChildType;

/// Toolkit error type.
#[derive(Debug, Error)]
pub enum ToolkitError {
    /// No class registered under this name.
    #[error("unknown class: {0}")]
    UnknownClass(String),

    /// A class with this name is already registered.
    #[error("class already registered: {0}")]
    ClassExists(String),

    /// The handle was destroyed (or never existed in this toolkit).
    #[error("stale handle")]
    StaleHandle,

    /// The parent's child policy refuses another child.
    #[error("class {class} accepts {policy} children")]
    ChildPolicy { class: String, policy: ChildType },

    /// Appending would make an element its own ancestor.
    #[error("element cannot become a child of its own descendant")]
    WouldCycle,

    /// The reference element is not a child of the given parent.
    #[error("reference element is not a child of the parent")]
    NotAChild,

    /// Mapping requires the parent to be mapped first.
    #[error("parent of {0} is not mapped")]
    ParentNotMapped(String),

    /// The operation needs a native handle.
    #[error("element of class {0} is not mapped")]
    NotMapped(String),

    /// The driver could not create the native resource.
    #[error("failed to map element of class {class}: {source}")]
    MapFailed {
        class: String,
        #[source]
        source: DriverError,
    },

    /// A driver operation other than mapping failed.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Creation parameters do not match the class format.
    #[error("invalid creation parameters for {class}: {reason}")]
    InvalidParams { class: String, reason: String },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Specialized Result type for toolkit operations.
pub type Result<T> = std::result::Result<T, ToolkitError>;

impl ToolkitError {
    /// Create an invalid-parameters error.
    pub fn invalid_params(class: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            class: class.into(),
            reason: reason.into(),
        }
    }

    /// Numeric status used at the boundary (always `ERROR`).
    pub const fn code(&self) -> i32 {
        crate::types::ERROR
    }

    /// Configuration mistakes the caller can fix and retry.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownClass(_)
                | Self::ChildPolicy { .. }
                | Self::NotAChild
                | Self::InvalidParams { .. }
        )
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
