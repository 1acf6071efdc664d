//! Control instance state.

use std::collections::HashMap;
use std::fmt;

use super::attrib::AttributeStore;
use super::class::ClassId;
use super::events::Callback;
use super::registry::Handle;
use crate::controls::dialog::DialogData;
use crate::controls::matrix::MatrixData;
use crate::controls::menu::MenuData;
use crate::controls::tree::TreeState;
use crate::types::NativeHandle;

/// Class-private data attached by the class Create method.
#[derive(Debug, Default)]
pub enum ControlData {
    #[default]
    None,
    Dialog(DialogData),
    Menu(MenuData),
    Tree(TreeState),
    Matrix(MatrixData),
}

/// One control instance. Reached through its `Handle`.
pub struct Control {
    pub(crate) class: ClassId,
    pub(crate) parent: Option<Handle>,
    pub(crate) children: Vec<Handle>,
    pub(crate) native: Option<NativeHandle>,
    /// Containers and timers are mapped without a native.
    pub(crate) mapped: bool,
    pub(crate) attributes: AttributeStore,
    pub(crate) data: ControlData,
    /// Driver, child or timer id. -1 until assigned.
    pub(crate) serial: i32,
    pub(crate) callbacks: HashMap<String, Callback>,
    pub(crate) natural_size: (i32, i32),
    pub(crate) current_size: (i32, i32),
    pub(crate) position: (i32, i32),
}

impl Control {
    pub(crate) fn new(class: ClassId) -> Self {
        Self {
            class,
            parent: None,
            children: Vec::new(),
            native: None,
            mapped: false,
            attributes: AttributeStore::new(),
            data: ControlData::None,
            serial: -1,
            callbacks: HashMap::new(),
            natural_size: (0, 0),
            current_size: (0, 0),
            position: (0, 0),
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    pub(crate) fn dialog_data(&self) -> Option<&DialogData> {
        match &self.data {
            ControlData::Dialog(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn dialog_data_mut(&mut self) -> Option<&mut DialogData> {
        match &mut self.data {
            ControlData::Dialog(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn menu_data(&self) -> Option<&MenuData> {
        match &self.data {
            ControlData::Menu(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn menu_data_mut(&mut self) -> Option<&mut MenuData> {
        match &mut self.data {
            ControlData::Menu(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn tree(&self) -> Option<&TreeState> {
        match &self.data {
            ControlData::Tree(state) => Some(state),
            _ => None,
        }
    }

    pub(crate) fn tree_mut(&mut self) -> Option<&mut TreeState> {
        match &mut self.data {
            ControlData::Tree(state) => Some(state),
            _ => None,
        }
    }

    pub(crate) fn matrix(&self) -> Option<&MatrixData> {
        match &self.data {
            ControlData::Matrix(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn matrix_mut(&mut self) -> Option<&mut MatrixData> {
        match &mut self.data {
            ControlData::Matrix(data) => Some(data),
            _ => None,
        }
    }
}

impl fmt::Debug for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut callbacks: Vec<&String> = self.callbacks.keys().collect();
        callbacks.sort();
        f.debug_struct("Control")
            .field("class", &self.class)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("native", &self.native)
            .field("mapped", &self.mapped)
            .field("attributes", &self.attributes)
            .field("data", &self.data)
            .field("serial", &self.serial)
            .field("callbacks", &callbacks)
            .finish_non_exhaustive()
    }
}
