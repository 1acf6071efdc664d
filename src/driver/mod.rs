//! Driver - The contract every native backend implements.
//!
//! The engine never talks to a platform directly. Mapping, native attribute
//! traffic, screen queries, timers and popups all go through `Driver`. Two
//! backends ship with the crate:
//!
//! - [`HeadlessDriver`] keeps natives in memory and records everything the
//!   engine asks for. Tests use its [`HeadlessProbe`] to look inside and to
//!   inject failures.
//! - [`TerminalDriver`] answers screen and cursor queries from the real
//!   terminal through crossterm.
//!
//! # Example
//!
//! ```ignore
//! let driver = HeadlessDriver::new();
//! let probe = driver.probe();
//! let mut tk = Toolkit::open(Box::new(driver), ToolkitConfig::default())?;
//!
//! probe.fail_class("dialog");
//! assert!(tk.map(dialog).is_err());
//! ```

mod headless;
mod terminal;

pub use headless::{HeadlessDriver, HeadlessProbe, NativeRecord};
pub use terminal::{TerminalDriver, translate_key};

use thiserror::Error;

use crate::engine::{ControlClass, Handle};
use crate::types::{NativeHandle, NativeType};

// =============================================================================
// Errors
// =============================================================================

/// Failures reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The backend declined to create the native element.
    #[error("driver refused to create a native {class} element")]
    Refused { class: String },

    /// The native parent the element needs does not exist.
    #[error("native parent is missing")]
    MissingParent,

    /// The handle does not name a live native element.
    #[error("unknown native handle {0}")]
    UnknownNative(NativeHandle),

    /// The backend does not support the operation.
    #[error("operation not supported by the {0} driver")]
    Unsupported(&'static str),

    #[error("{0}")]
    Backend(String),
}

// =============================================================================
// Map Request
// =============================================================================

/// Everything a backend needs to create one native element.
#[derive(Debug, Clone, PartialEq)]
pub struct MapRequest {
    pub handle: Handle,
    pub class: String,
    pub native_type: NativeType,
    /// Native of the nearest mapped ancestor (or owning dialog for menu bars).
    pub parent: Option<NativeHandle>,
    pub title: Option<String>,
}

// =============================================================================
// Driver Trait
// =============================================================================

/// Native backend.
///
/// Only `name`, `map`, `unmap`, `screen_size` and `cursor_pos` are required;
/// the remaining methods have inert defaults.
pub trait Driver {
    /// Value of the DRIVER global.
    fn name(&self) -> &str;

    /// Adjust a class before it is registered (override handlers, flags).
    fn init_class(&mut self, _class: &mut ControlClass) {}

    /// Create the native element.
    fn map(&mut self, request: &MapRequest) -> Result<NativeHandle, DriverError>;

    /// Destroy the native element.
    fn unmap(&mut self, native: NativeHandle);

    /// Push an attribute to the native element. Returns whether it was applied.
    fn set_native_attribute(&mut self, _native: NativeHandle, _name: &str, _value: Option<&str>) -> bool {
        false
    }

    fn get_native_attribute(&self, _native: NativeHandle, _name: &str) -> Option<String> {
        None
    }

    /// Natural size of a leaf control, in pixels.
    fn natural_size(&self, _class: &str, _title: Option<&str>) -> (i32, i32) {
        (0, 0)
    }

    fn screen_size(&self) -> (i32, i32);

    fn cursor_pos(&self) -> (i32, i32);

    fn screen_to_client(&self, _native: NativeHandle, x: i32, y: i32) -> (i32, i32) {
        (x, y)
    }

    /// Whether detaching an element must unmap it.
    fn strict_native_hierarchy(&self) -> bool {
        false
    }

    fn reparent(&mut self, _native: NativeHandle, _new_parent: Option<NativeHandle>) -> Result<(), DriverError> {
        Ok(())
    }

    fn set_focus(&mut self, _native: NativeHandle) {}

    /// Start a periodic timer. Returns a positive timer id.
    fn timer_start(&mut self, _interval_ms: u32) -> Option<i32> {
        None
    }

    fn timer_stop(&mut self, _timer_id: i32) {}

    /// Show a popup menu at screen coordinates.
    fn menu_popup(&mut self, _native: NativeHandle, _x: i32, _y: i32) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("popup"))
    }

    /// Ask the native event loop to return.
    fn exit_loop(&mut self) {}
}
