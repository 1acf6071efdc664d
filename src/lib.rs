//! # portkit
//!
//! Portable widget toolkit core for Rust.
//!
//! Controls are created from named classes, configured through string
//! attributes and mapped onto native elements by a pluggable driver. The
//! engine owns everything in one [`Toolkit`] context; there are no statics.
//!
//! ## Architecture
//!
//! ```text
//! ClassRegistry ─┐
//!                ├─ Toolkit ── Driver (headless / terminal / ...)
//! ControlRegistry┘     │
//!                      └─ attribute dispatch → class handlers → native
//! ```
//!
//! Attribute dispatch is soft: unknown names, stale handles and bad ids
//! degrade to a stored value or `None`. Structural operations (creation, tree
//! edits, mapping) return [`Result`].
//!
//! ## Modules
//!
//! - [`types`] - Status codes, callback results, native types, key codes
//! - [`engine`] - Classes, controls, dispatch, tree, lifecycle, events
//! - [`driver`] - The driver contract and the bundled backends
//! - [`controls`] - Standard classes (dialog, containers, menus, tree, matrix...)
//! - [`config`] - TOML configuration applied at open time

pub mod config;
pub mod controls;
pub mod driver;
pub mod engine;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::ToolkitConfig;
pub use error::{ConfigError, Result, ToolkitError};

pub use engine::{
    AttrFlags, Callback, CallbackArgs, ClassMethods, ControlClass, Handle, NativeEvent, Toolkit,
};

pub use driver::{Driver, DriverError, HeadlessDriver, MapRequest, TerminalDriver};
