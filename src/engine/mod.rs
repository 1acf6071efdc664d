//! Engine - Classes, controls and the toolkit context.
//!
//! The engine manages the core data structures:
//! - Class registry: named control classes with attribute tables and methods
//! - Control registry: generational arena of control instances
//! - Toolkit: the context object that owns both plus the global tables
//!
//! # Architecture
//!
//! Controls are NOT referenced by pointer. They are generational handles into
//! the arena, so a destroyed control is detected instead of reused:
//!
//! ```text
//! Handle #0 g0: dialog (parent=-,  children=[#1])
//! Handle #1 g0: vbox   (parent=#0, children=[#2, #3])
//! Handle #2 g0: label  (parent=#1)
//! Handle #3 g1: button (parent=#1)   <- slot 3 reused once
//! ```
//!
//! The `Toolkit` methods are split by concern across the submodules: attribute
//! dispatch, names and globals, tree edits, native lifecycle, events and
//! layout.

pub mod attrib;
pub mod class;
mod control;
mod dispatch;
mod events;
mod globals;
mod layout;
mod lifecycle;
mod registry;
mod toolkit;
mod tree;

pub use attrib::AttributeStore;
pub use class::{
    AttrAccess, AttrFlags, AttributeDescriptor, ClassId, ClassMethods, ClassRegistry,
    ControlClass, Getter, Id2Getter, Id2Setter, IdGetter, IdSetter, Setter,
};
pub use control::{Control, ControlData};
pub use events::{Callback, CallbackArgs, NativeEvent};
pub use registry::{ControlRegistry, Handle};
pub use toolkit::Toolkit;
