//! Standard controls.
//!
//! Each submodule registers one class family on a [`Toolkit`]. Order matters:
//! `element` is the parent of most classes and must be registered first.

mod base;
mod containers;
pub mod dialog;
pub mod matrix;
pub mod menu;
mod timer;
pub mod tree;

use crate::engine::Toolkit;
use crate::error::Result;

/// Register every class that ships with the crate.
pub fn register_standard_classes(tk: &mut Toolkit) -> Result<()> {
    base::register(tk)?;
    containers::register(tk)?;
    dialog::register(tk)?;
    menu::register(tk)?;
    timer::register(tk)?;
    tree::register(tk)?;
    matrix::register(tk)?;
    Ok(())
}
